//! What the player knows - a projection of the world graph.
//!
//! The summary holds:
//! - **Places**: visited locations, plus unvisited ones within sight range
//! - **Actors**: everyone sharing the player's location or linked by `knows`
//! - **Items**: what the player carries and what lies where they stand

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use world_rules::{EntityId, EntityKind, Position, WorldGraph, KNOWS, VISITED};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownPlace {
    pub id: EntityId,
    pub name: String,
    pub distance_m: Option<f64>,
    pub bearing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownActor {
    pub id: EntityId,
    pub name: String,
    pub location: Option<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnownItem {
    pub id: EntityId,
    pub name: String,
    /// Carried by the player rather than lying at their location.
    pub held: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSummary {
    pub current: Option<EntityId>,
    pub visited: Vec<KnownPlace>,
    pub nearby: Vec<KnownPlace>,
    pub known_actors: Vec<KnownActor>,
    pub known_items: Vec<KnownItem>,
}

/// Project the player-visible slice of the graph.
///
/// An unknown `player` yields an empty summary.
pub fn project_knowledge(graph: &WorldGraph, player: &EntityId, radius: f64) -> KnowledgeSummary {
    if !graph.contains_entity(player) {
        return KnowledgeSummary::default();
    }
    let here = graph.position(player);
    let current = graph.location_of(player).cloned();
    let place = |id: &EntityId| known_place(graph, id, here);

    let mut visited: Vec<KnownPlace> = graph
        .relations_by_subject(player)
        .into_iter()
        .filter(|r| r.predicate == VISITED)
        .map(|r| r.object.clone())
        .collect::<std::collections::BTreeSet<_>>()
        .iter()
        .map(place)
        .collect();
    visited.sort_by(|a, b| a.id.cmp(&b.id));

    let mut nearby: Vec<KnownPlace> = graph
        .entities_of_kind(&EntityKind::Location)
        .into_iter()
        .filter(|loc| Some(&loc.id) != current.as_ref())
        .map(|loc| place(&loc.id))
        .filter(|p| p.distance_m.is_some_and(|d| d <= radius))
        .collect();
    nearby.sort_by(|a, b| {
        let (da, db) = (a.distance_m.unwrap_or(f64::MAX), b.distance_m.unwrap_or(f64::MAX));
        da.total_cmp(&db).then_with(|| a.id.cmp(&b.id))
    });

    let mut actors: BTreeMap<EntityId, KnownActor> = BTreeMap::new();
    let co_located = current.iter().flat_map(|loc| graph.occupants(loc));
    let acquainted = graph
        .relations_by_subject(player)
        .into_iter()
        .filter(|r| r.predicate == KNOWS)
        .map(|r| &r.object);
    for id in co_located.chain(acquainted) {
        let Some(entity) = graph.entity(id) else { continue };
        if id == player || entity.kind != EntityKind::Actor {
            continue;
        }
        actors.entry(id.clone()).or_insert_with(|| KnownActor {
            id: id.clone(),
            name: entity.name().to_string(),
            location: graph.location_of(id).cloned(),
        });
    }

    let mut items: BTreeMap<EntityId, KnownItem> = BTreeMap::new();
    for id in graph.contents(player) {
        items.insert(id.clone(), known_item(graph, id, true));
    }
    for id in current.iter().flat_map(|loc| graph.occupants(loc)) {
        let is_item = graph.entity(id).is_some_and(|e| e.kind == EntityKind::Item);
        if is_item && !items.contains_key(id) {
            items.insert(id.clone(), known_item(graph, id, false));
        }
    }

    KnowledgeSummary {
        current,
        visited,
        nearby,
        known_actors: actors.into_values().collect(),
        known_items: items.into_values().collect(),
    }
}

fn known_place(graph: &WorldGraph, id: &EntityId, from: Option<Position>) -> KnownPlace {
    let name = graph
        .entity(id)
        .map(|e| e.name().to_string())
        .unwrap_or_else(|| id.to_string());
    let target = graph.position(id);
    let (distance_m, bearing) = match (from, target) {
        (Some(from), Some(to)) => (
            Some((from.distance_to(to) * 10.0).round() / 10.0),
            Some(from.compass_to(to).to_string()),
        ),
        _ => (None, None),
    };
    KnownPlace {
        id: id.clone(),
        name,
        distance_m,
        bearing,
    }
}

fn known_item(graph: &WorldGraph, id: &EntityId, held: bool) -> KnownItem {
    KnownItem {
        id: id.clone(),
        name: graph.entity(id).map(|e| e.name().to_string()).unwrap_or_default(),
        held,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_rules::{Entity, OnConflict, RelationDraft, HOLDS, LOCATED_IN};

    fn link(graph: &mut WorldGraph, subject: &str, predicate: &str, object: &str) {
        graph
            .create_relation(RelationDraft::new(subject, predicate, object), OnConflict::Reject)
            .unwrap();
    }

    fn village() -> WorldGraph {
        let mut graph = WorldGraph::default();
        for (id, x) in [("square", 0.0), ("mill", 0.0), ("tower", 5000.0)] {
            let y = if id == "mill" { 400.0 } else { 0.0 };
            graph
                .add_entity(Entity::location(id).with_property("name", id).with_coordinates(Position::new(x, y)))
                .unwrap();
        }
        graph.add_entity(Entity::actor("hero")).unwrap();
        graph.add_entity(Entity::actor("baker").with_property("name", "Old Baker")).unwrap();
        graph.add_entity(Entity::actor("sister")).unwrap();
        graph.add_entity(Entity::item("coin")).unwrap();
        graph.add_entity(Entity::item("lamp").with_property("name", "Brass Lamp")).unwrap();

        link(&mut graph, "hero", LOCATED_IN, "square");
        link(&mut graph, "baker", LOCATED_IN, "square");
        link(&mut graph, "sister", LOCATED_IN, "tower");
        link(&mut graph, "coin", LOCATED_IN, "square");
        link(&mut graph, "hero", HOLDS, "lamp");
        link(&mut graph, "hero", KNOWS, "sister");
        graph
            .create_relation(
                RelationDraft::new("hero", VISITED, "tower").with_property("turn", 0),
                OnConflict::Reject,
            )
            .unwrap();
        graph
    }

    #[test]
    fn test_projection() {
        let graph = village();
        let summary = project_knowledge(&graph, &EntityId::from("hero"), 1500.0);

        assert_eq!(summary.current, Some(EntityId::from("square")));

        assert_eq!(summary.visited.len(), 1);
        assert_eq!(summary.visited[0].id, EntityId::from("tower"));
        assert_eq!(summary.visited[0].distance_m, Some(5000.0));

        assert_eq!(summary.nearby.len(), 1);
        assert_eq!(summary.nearby[0].id, EntityId::from("mill"));
        assert_eq!(summary.nearby[0].bearing.as_deref(), Some("north"));

        let actors: Vec<_> = summary.known_actors.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(actors, vec!["baker", "sister"]);
        assert_eq!(summary.known_actors[0].name, "Old Baker");
        assert_eq!(summary.known_actors[1].location, Some(EntityId::from("tower")));

        let items: Vec<_> = summary.known_items.iter().map(|i| (i.id.as_str(), i.held)).collect();
        assert_eq!(items, vec![("coin", false), ("lamp", true)]);
    }

    #[test]
    fn test_unknown_player() {
        let graph = village();
        assert_eq!(
            project_knowledge(&graph, &EntityId::from("ghost"), 1500.0),
            KnowledgeSummary::default()
        );
    }
}
