//! Seeding the graph from the world record.
//!
//! The graph is a derived cache of the record. `refresh` rebuilds it whenever
//! the record's structural signature (places, exits, who is where, who holds
//! what) differs from the one it was built from.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{OnConflict, WorldGraph};
use crate::entities::{
    Entity, EntityId, EntityKind, PredicateRegistry, RelationDraft, EXIT, HOLDS, LOCATED_IN,
    PART_OF, VISITED,
};
use crate::world_state::WorldRecord;

/// Tag carried by the entity seeded from `record.player`.
pub const PLAYER_TAG: &str = "player";

/// A stable string capturing the parts of the record the graph is built from.
pub fn structural_signature(record: &WorldRecord) -> String {
    let locations: Vec<Value> = record
        .locations
        .iter()
        .map(|(id, loc)| json!([id, loc.name, loc.coords, loc.exits, loc.region, loc.terrain]))
        .collect();
    let npcs: Vec<Value> = record
        .npcs
        .iter()
        .map(|(id, npc)| json!([id, npc.name, npc.location]))
        .collect();
    json!({
        "locations": locations,
        "npcs": npcs,
        "player": [
            record.player.id,
            record.player.location,
            record.player.pos,
            record.player.inventory,
            record.player.extra.get("visited"),
        ],
    })
    .to_string()
}

impl WorldGraph {
    /// Build a graph from the record's locations, exits, regions, player and npcs.
    ///
    /// Record entries that violate the registry are logged and skipped; the
    /// record stays authoritative.
    pub fn from_record(record: &WorldRecord, registry: Arc<PredicateRegistry>) -> Self {
        let mut graph = WorldGraph::new(registry);

        for (id, loc) in &record.locations {
            let mut entity = Entity::location(id.as_str())
                .with_property("name", loc.name.clone())
                .with_property("terrain", loc.terrain.clone());
            if let Some(coords) = loc.coords {
                entity = entity.with_coordinates(coords);
            }
            graph.seed_entity(entity);

            if let Some(region) = &loc.region {
                if !graph.contains_entity(&EntityId::from(region.as_str())) {
                    graph.seed_entity(Entity::new(region.as_str(), EntityKind::Region));
                }
                graph.seed_relation(RelationDraft::new(id.as_str(), PART_OF, region.as_str()));
            }
        }
        for (id, loc) in &record.locations {
            for (direction, target) in &loc.exits {
                graph.seed_relation(
                    RelationDraft::new(id.as_str(), EXIT, target.as_str())
                        .with_property("direction", direction.clone()),
                );
            }
        }

        for (id, npc) in &record.npcs {
            graph.seed_entity(Entity::actor(id.as_str()).with_property("name", npc.name.clone()));
            if !npc.location.is_empty() {
                graph.seed_relation(RelationDraft::new(id.as_str(), LOCATED_IN, npc.location.as_str()));
            }
        }

        let player = &record.player;
        graph.seed_entity(
            Entity::actor(player.id.as_str())
                .with_tag(PLAYER_TAG)
                .with_coordinates(player.pos),
        );
        if !player.location.is_empty() {
            graph.seed_relation(RelationDraft::new(player.id.as_str(), LOCATED_IN, player.location.as_str()));
            graph.seed_relation(
                RelationDraft::new(player.id.as_str(), VISITED, player.location.as_str())
                    .with_property("turn", record.meta.turn),
            );
        }
        let visited = player
            .extra
            .get("visited")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str);
        for place in visited {
            if place != player.location {
                graph.seed_relation(
                    RelationDraft::new(player.id.as_str(), VISITED, place).with_property("turn", 0),
                );
            }
        }
        for item in &player.inventory {
            if !graph.contains_entity(&EntityId::from(item.as_str())) {
                graph.seed_entity(Entity::item(item.as_str()));
            }
            graph.seed_relation(RelationDraft::new(player.id.as_str(), HOLDS, item.as_str()));
        }

        graph.signature = Some(structural_signature(record));
        debug!(
            entities = graph.entity_count(),
            relations = graph.relation_count(),
            "graph seeded from record"
        );
        graph
    }

    /// Rebuild from `record` if its structure changed since the last seed.
    ///
    /// Entities and relations added directly to the graph are dropped by a
    /// rebuild. Returns whether a rebuild happened.
    pub fn refresh(&mut self, record: &WorldRecord) -> bool {
        let signature = structural_signature(record);
        if self.signature.as_deref() == Some(signature.as_str()) {
            return false;
        }
        *self = WorldGraph::from_record(record, Arc::clone(&self.registry));
        true
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// The entity seeded from `record.player`.
    pub fn player(&self) -> Option<&Entity> {
        self.entities.values().find(|e| e.has_tag(PLAYER_TAG))
    }

    fn seed_entity(&mut self, entity: Entity) {
        if let Err(err) = self.add_entity(entity) {
            warn!(error = %err, "skipping record entity");
        }
    }

    fn seed_relation(&mut self, draft: RelationDraft) {
        if let Err(err) = self.create_relation(draft, OnConflict::Reject) {
            warn!(error = %err, "skipping record relation");
        }
    }
}
