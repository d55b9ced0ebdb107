//! World graph - typed entities and relations with subject, object and
//! predicate indices.
//!
//! Every relation id lives in exactly three index buckets: the one for its
//! subject, the one for its object and the one for its predicate. All
//! mutations go through `index_relation` / `unindex_relation` to keep that
//! true.

mod layout;
mod seed;

pub use layout::*;
pub use seed::*;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::entities::{
    Entity, EntityId, EntityKind, Invariant, PredicateRegistry, Properties, Relation,
    RelationDraft, RelationId, HOLDS, LOCATED_IN,
};
use crate::error::{Result, WorldError};
use crate::world_state::Position;

/// What to do when a new relation collides with a uniqueness invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnConflict {
    /// Fail with an invariant violation.
    #[default]
    Reject,
    /// Remove the conflicting relations first.
    Replace,
}

/// Combined lookup over the three indices. Unset fields match anything.
#[derive(Debug, Clone, Default)]
pub struct RelationFilter<'a> {
    pub subject: Option<&'a EntityId>,
    pub predicate: Option<&'a str>,
    pub object: Option<&'a EntityId>,
}

/// The in-memory entity/relation store.
#[derive(Debug, Clone)]
pub struct WorldGraph {
    registry: Arc<PredicateRegistry>,

    entities: HashMap<EntityId, Entity>,
    relations: HashMap<RelationId, Relation>,

    /// Index: subject -> relations leaving it.
    by_subject: HashMap<EntityId, BTreeSet<RelationId>>,
    /// Index: object -> relations arriving at it.
    by_object: HashMap<EntityId, BTreeSet<RelationId>>,
    /// Index: predicate -> relations of that predicate.
    by_predicate: HashMap<String, BTreeSet<RelationId>>,

    /// Relations created with a predicate the registry does not know.
    flagged: BTreeSet<RelationId>,

    /// Structural signature of the record this graph was seeded from.
    signature: Option<String>,
}

impl Default for WorldGraph {
    fn default() -> Self {
        Self::new(Arc::new(PredicateRegistry::standard()))
    }
}

impl WorldGraph {
    /// Create an empty graph checked against `registry`.
    pub fn new(registry: Arc<PredicateRegistry>) -> Self {
        Self {
            registry,
            entities: HashMap::new(),
            relations: HashMap::new(),
            by_subject: HashMap::new(),
            by_object: HashMap::new(),
            by_predicate: HashMap::new(),
            flagged: BTreeSet::new(),
            signature: None,
        }
    }

    /// The predicate registry relations are validated against.
    pub fn registry(&self) -> &Arc<PredicateRegistry> {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Add a new entity. Fails if the id is already taken.
    pub fn add_entity(&mut self, entity: Entity) -> Result<EntityId> {
        if self.entities.contains_key(&entity.id) {
            return Err(WorldError::DuplicateEntity(entity.id));
        }
        let id = entity.id.clone();
        debug!(entity = %id, kind = %entity.kind, "entity added");
        self.entities.insert(id.clone(), entity);
        Ok(id)
    }

    /// Shallow-merge `properties` into an entity's property map.
    pub fn update_entity(&mut self, id: &EntityId, properties: Properties) -> Result<()> {
        let entity = self.entities.get_mut(id).ok_or_else(|| WorldError::MissingEntity {
            id: id.clone(),
            context: "update_entity",
        })?;
        entity.properties.extend(properties);
        Ok(())
    }

    /// Remove an entity together with every relation touching it.
    pub fn remove_entity(&mut self, id: &EntityId) -> Result<Entity> {
        let entity = self.entities.remove(id).ok_or_else(|| WorldError::MissingEntity {
            id: id.clone(),
            context: "remove_entity",
        })?;
        let touching: BTreeSet<RelationId> = self
            .by_subject
            .get(id)
            .into_iter()
            .chain(self.by_object.get(id))
            .flatten()
            .copied()
            .collect();
        for rel in touching {
            self.unindex_relation(rel);
        }
        Ok(entity)
    }

    /// Get an entity by id.
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn contains_entity(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    /// All entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities of one kind, sorted by id.
    pub fn entities_of_kind(&self, kind: &EntityKind) -> Vec<&Entity> {
        let mut found: Vec<_> = self.entities.values().filter(|e| &e.kind == kind).collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------

    /// Validate and insert a relation.
    ///
    /// Registered predicates are checked for endpoint kinds, required
    /// properties and invariants. Unregistered predicates are accepted and
    /// flagged. Creating a relation that already exists returns its id.
    pub fn create_relation(&mut self, draft: RelationDraft, on_conflict: OnConflict) -> Result<RelationId> {
        let subject = self.entities.get(&draft.subject).ok_or_else(|| WorldError::MissingEntity {
            id: draft.subject.clone(),
            context: "relation subject",
        })?;
        let object = self.entities.get(&draft.object).ok_or_else(|| WorldError::MissingEntity {
            id: draft.object.clone(),
            context: "relation object",
        })?;

        let spec = self.registry.get(&draft.predicate).cloned();
        if let Some(spec) = &spec {
            spec.validate(subject, object, &draft.properties)?;
        }

        let id = draft.id();
        if self.relations.contains_key(&id) {
            return Ok(id);
        }

        let relation = draft.into_relation();
        if let Some(spec) = &spec {
            if relation.is_open() {
                let mut conflicts = Vec::new();
                if spec.has_invariant(Invariant::UniqueOutgoing) {
                    let existing = self.open_relations(&relation.predicate, Some(&relation.subject), None);
                    if !existing.is_empty() && on_conflict == OnConflict::Reject {
                        return Err(WorldError::InvariantViolation {
                            predicate: relation.predicate.clone(),
                            invariant: Invariant::UniqueOutgoing.name(),
                            entity: relation.subject.clone(),
                        });
                    }
                    conflicts.extend(existing);
                }
                if spec.has_invariant(Invariant::UniqueIncoming) {
                    let existing = self.open_relations(&relation.predicate, None, Some(&relation.object));
                    if !existing.is_empty() && on_conflict == OnConflict::Reject {
                        return Err(WorldError::InvariantViolation {
                            predicate: relation.predicate.clone(),
                            invariant: Invariant::UniqueIncoming.name(),
                            entity: relation.object.clone(),
                        });
                    }
                    conflicts.extend(existing);
                }
                for old in conflicts {
                    debug!(relation = %old, "replaced by unique invariant");
                    self.unindex_relation(old);
                }
            }
        } else {
            warn!(predicate = %relation.predicate, subject = %relation.subject, object = %relation.object, "unregistered predicate");
            self.flagged.insert(id);
        }

        self.index_relation(relation);
        Ok(id)
    }

    /// Remove a relation from the graph and all three indexes.
    pub fn remove_relation(&mut self, id: RelationId) -> Result<Relation> {
        self.unindex_relation(id).ok_or(WorldError::MissingRelation(id))
    }

    /// Get a relation by id.
    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    /// Total number of relations.
    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    /// Relations with `subject` on the left, ordered by relation id.
    pub fn relations_by_subject(&self, subject: &EntityId) -> Vec<&Relation> {
        self.resolve(self.by_subject.get(subject))
    }

    /// Relations pointing at `object`, ordered by relation id.
    pub fn relations_by_object(&self, object: &EntityId) -> Vec<&Relation> {
        self.resolve(self.by_object.get(object))
    }

    /// Relations using `predicate`.
    pub fn relations_by_predicate(&self, predicate: &str) -> Vec<&Relation> {
        self.resolve(self.by_predicate.get(predicate))
    }

    /// Relations matching every set field of the filter, starting from the
    /// narrowest index.
    pub fn find_relations(&self, filter: &RelationFilter<'_>) -> Vec<&Relation> {
        let candidates = [
            filter.subject.map(|s| self.by_subject.get(s)),
            filter.object.map(|o| self.by_object.get(o)),
            filter.predicate.map(|p| self.by_predicate.get(p)),
        ];
        let narrowest = candidates
            .into_iter()
            .flatten()
            .min_by_key(|bucket| bucket.map_or(0, |b| b.len()));

        let pool: Vec<&Relation> = match narrowest {
            Some(bucket) => self.resolve(bucket),
            None => {
                let mut all: Vec<_> = self.relations.values().collect();
                all.sort_by_key(|r| r.id);
                all
            }
        };
        pool.into_iter()
            .filter(|r| filter.subject.map_or(true, |s| &r.subject == s))
            .filter(|r| filter.object.map_or(true, |o| &r.object == o))
            .filter(|r| filter.predicate.map_or(true, |p| r.predicate == p))
            .collect()
    }

    /// Relations whose validity window contains `turn`.
    pub fn relations_active_at(&self, turn: u64) -> Vec<&Relation> {
        let mut active: Vec<_> = self.relations.values().filter(|r| r.active_at(turn)).collect();
        active.sort_by_key(|r| r.id);
        active
    }

    /// Whether a relation was created with an unregistered predicate.
    pub fn is_flagged(&self, id: RelationId) -> bool {
        self.flagged.contains(&id)
    }

    /// Relations created with unregistered predicates.
    pub fn flagged_relations(&self) -> Vec<&Relation> {
        self.flagged.iter().filter_map(|id| self.relations.get(id)).collect()
    }

    // ------------------------------------------------------------------
    // Movement and containment
    // ------------------------------------------------------------------

    /// Relocate an entity's `located_in` relation to `to`.
    ///
    /// Movement is coordinate based: no exit between the old and new place is
    /// required.
    pub fn move_entity(&mut self, entity: &EntityId, to: &EntityId) -> Result<RelationId> {
        let draft = RelationDraft::new(entity.clone(), LOCATED_IN, to.clone());
        let id = self.create_relation(draft, OnConflict::Replace)?;
        debug!(entity = %entity, to = %to, "entity moved");
        Ok(id)
    }

    /// Move a `holds` edge for `item` from one container to another.
    ///
    /// On error the graph is left as it was.
    pub fn transfer_item(&mut self, item: &EntityId, from: &EntityId, to: &EntityId) -> Result<RelationId> {
        for (id, context) in [(item, "transfer item"), (from, "transfer source"), (to, "transfer target")] {
            if !self.entities.contains_key(id) {
                return Err(WorldError::MissingEntity {
                    id: id.clone(),
                    context,
                });
            }
        }
        let held = self.open_relations(HOLDS, Some(from), Some(item));
        if held.is_empty() {
            return Err(WorldError::NotContained {
                container: from.clone(),
                item: item.clone(),
            });
        }
        let removed: Vec<Relation> = held.into_iter().filter_map(|rel| self.unindex_relation(rel)).collect();
        match self.create_relation(RelationDraft::new(to.clone(), HOLDS, item.clone()), OnConflict::Replace) {
            Ok(id) => {
                debug!(item = %item, from = %from, to = %to, "item transferred");
                Ok(id)
            }
            Err(err) => {
                // The new edge was rejected before anything else changed.
                for relation in removed {
                    self.index_relation(relation);
                }
                Err(err)
            }
        }
    }

    /// The place an entity is currently located in.
    pub fn location_of(&self, entity: &EntityId) -> Option<&EntityId> {
        self.open_relations(LOCATED_IN, Some(entity), None)
            .first()
            .and_then(|id| self.relations.get(id))
            .map(|r| &r.object)
    }

    /// Entities located in a place, sorted by id.
    pub fn occupants(&self, place: &EntityId) -> Vec<&EntityId> {
        let mut found: Vec<_> = self
            .open_relations(LOCATED_IN, None, Some(place))
            .into_iter()
            .filter_map(|id| self.relations.get(&id))
            .map(|r| &r.subject)
            .collect();
        found.sort();
        found
    }

    /// Items held by a container, sorted by id.
    pub fn contents(&self, container: &EntityId) -> Vec<&EntityId> {
        let mut found: Vec<_> = self
            .open_relations(HOLDS, Some(container), None)
            .into_iter()
            .filter_map(|id| self.relations.get(&id))
            .map(|r| &r.object)
            .collect();
        found.sort();
        found
    }

    /// An entity's own coordinates, else those of the place it is located in.
    pub fn position(&self, entity: &EntityId) -> Option<Position> {
        let found = self.entities.get(entity)?;
        found
            .coordinates()
            .or_else(|| self.location_of(entity).and_then(|loc| self.entities.get(loc)?.coordinates()))
    }

    /// Straight-line distance between two positioned entities.
    pub fn distance(&self, a: &EntityId, b: &EntityId) -> Option<f64> {
        Some(self.position(a)?.distance_to(self.position(b)?))
    }

    /// Write `x`/`y` coordinate properties onto an entity.
    pub fn set_coordinates(&mut self, id: &EntityId, pos: Position) -> Result<()> {
        let mut props = Properties::new();
        props.insert("x".into(), pos.x.into());
        props.insert("y".into(), pos.y.into());
        self.update_entity(id, props)
    }

    /// Check that every relation sits in exactly its three index buckets.
    pub fn index_consistent(&self) -> bool {
        let total = self.relations.len();
        if bucket_total(&self.by_subject) != total
            || bucket_total(&self.by_object) != total
            || bucket_total(&self.by_predicate) != total
        {
            return false;
        }
        self.relations.values().all(|r| {
            self.by_subject.get(&r.subject).is_some_and(|b| b.contains(&r.id))
                && self.by_object.get(&r.object).is_some_and(|b| b.contains(&r.id))
                && self.by_predicate.get(&r.predicate).is_some_and(|b| b.contains(&r.id))
        })
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn open_relations(
        &self,
        predicate: &str,
        subject: Option<&EntityId>,
        object: Option<&EntityId>,
    ) -> Vec<RelationId> {
        let filter = RelationFilter {
            subject,
            predicate: Some(predicate),
            object,
        };
        self.find_relations(&filter)
            .into_iter()
            .filter(|r| r.is_open())
            .map(|r| r.id)
            .collect()
    }

    fn resolve(&self, bucket: Option<&BTreeSet<RelationId>>) -> Vec<&Relation> {
        bucket
            .map(|ids| ids.iter().filter_map(|id| self.relations.get(id)).collect())
            .unwrap_or_default()
    }

    fn index_relation(&mut self, relation: Relation) {
        let id = relation.id;
        self.by_subject.entry(relation.subject.clone()).or_default().insert(id);
        self.by_object.entry(relation.object.clone()).or_default().insert(id);
        self.by_predicate.entry(relation.predicate.clone()).or_default().insert(id);
        self.relations.insert(id, relation);
    }

    fn unindex_relation(&mut self, id: RelationId) -> Option<Relation> {
        let relation = self.relations.remove(&id)?;
        remove_from_bucket(&mut self.by_subject, &relation.subject, id);
        remove_from_bucket(&mut self.by_object, &relation.object, id);
        remove_from_bucket(&mut self.by_predicate, &relation.predicate, id);
        self.flagged.remove(&id);
        Some(relation)
    }
}

fn bucket_total<K>(index: &HashMap<K, BTreeSet<RelationId>>) -> usize {
    index.values().map(BTreeSet::len).sum()
}

fn remove_from_bucket<K>(index: &mut HashMap<K, BTreeSet<RelationId>>, key: &K, id: RelationId)
where
    K: std::hash::Hash + Eq,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(&id);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{EXIT, KNOWS};
    use proptest::prelude::*;

    fn harbor_graph() -> WorldGraph {
        let mut graph = WorldGraph::default();
        graph
            .add_entity(Entity::location("harbor").with_coordinates(Position::new(0.0, 0.0)))
            .unwrap();
        graph
            .add_entity(Entity::location("lighthouse").with_coordinates(Position::new(300.0, 400.0)))
            .unwrap();
        graph.add_entity(Entity::location("market")).unwrap();
        graph.add_entity(Entity::actor("hero")).unwrap();
        graph.add_entity(Entity::actor("keeper")).unwrap();
        graph.add_entity(Entity::item("lantern")).unwrap();
        graph
    }

    fn e(id: &str) -> EntityId {
        EntityId::from(id)
    }

    #[test]
    fn test_add_entity_rejects_duplicates() {
        let mut graph = harbor_graph();
        let result = graph.add_entity(Entity::actor("hero"));
        assert!(matches!(result, Err(WorldError::DuplicateEntity(id)) if id == e("hero")));
    }

    #[test]
    fn test_update_entity_merges() {
        let mut graph = harbor_graph();
        let mut props = Properties::new();
        props.insert("name".into(), "Ada".into());
        graph.update_entity(&e("hero"), props).unwrap();

        let mut more = Properties::new();
        more.insert("mood".into(), "wary".into());
        graph.update_entity(&e("hero"), more).unwrap();

        let hero = graph.entity(&e("hero")).unwrap();
        assert_eq!(hero.name(), "Ada");
        assert_eq!(hero.properties.len(), 2);
        assert!(graph.update_entity(&e("ghost"), Properties::new()).is_err());
    }

    #[test]
    fn test_create_relation_missing_entity() {
        let mut graph = harbor_graph();
        let result = graph.create_relation(RelationDraft::new("ghost", LOCATED_IN, "harbor"), OnConflict::Reject);
        assert!(matches!(result, Err(WorldError::MissingEntity { context: "relation subject", .. })));
    }

    #[test]
    fn test_unique_outgoing_rejects_then_replaces() {
        let mut graph = harbor_graph();
        graph
            .create_relation(RelationDraft::new("hero", LOCATED_IN, "harbor"), OnConflict::Reject)
            .unwrap();

        let again = graph.create_relation(RelationDraft::new("hero", LOCATED_IN, "market"), OnConflict::Reject);
        assert!(matches!(
            again,
            Err(WorldError::InvariantViolation { invariant: "unique_outgoing", .. })
        ));
        assert_eq!(graph.location_of(&e("hero")), Some(&e("harbor")));

        graph
            .create_relation(RelationDraft::new("hero", LOCATED_IN, "market"), OnConflict::Replace)
            .unwrap();
        assert_eq!(graph.location_of(&e("hero")), Some(&e("market")));
        assert_eq!(graph.relations_by_predicate(LOCATED_IN).len(), 1);
        assert!(graph.index_consistent());
    }

    #[test]
    fn test_create_relation_is_idempotent() {
        let mut graph = harbor_graph();
        let draft = RelationDraft::new("harbor", EXIT, "market").with_property("direction", "north");
        let a = graph.create_relation(draft.clone(), OnConflict::Reject).unwrap();
        let b = graph.create_relation(draft, OnConflict::Reject).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.relation_count(), 1);
    }

    #[test]
    fn test_unregistered_predicate_is_flagged() {
        let mut graph = harbor_graph();
        let id = graph
            .create_relation(RelationDraft::new("keeper", "distrusts", "hero"), OnConflict::Reject)
            .unwrap();
        assert!(graph.is_flagged(id));
        assert_eq!(graph.flagged_relations().len(), 1);

        graph.remove_relation(id).unwrap();
        assert!(!graph.is_flagged(id));
    }

    #[test]
    fn test_indices_follow_removal() {
        let mut graph = harbor_graph();
        let id = graph
            .create_relation(RelationDraft::new("hero", KNOWS, "keeper"), OnConflict::Reject)
            .unwrap();
        assert_eq!(graph.relations_by_subject(&e("hero")).len(), 1);
        assert_eq!(graph.relations_by_object(&e("keeper")).len(), 1);
        assert_eq!(graph.relations_by_predicate(KNOWS).len(), 1);

        graph.remove_relation(id).unwrap();
        assert!(graph.relations_by_subject(&e("hero")).is_empty());
        assert!(graph.relations_by_object(&e("keeper")).is_empty());
        assert!(graph.relations_by_predicate(KNOWS).is_empty());
        assert!(graph.index_consistent());
        assert!(matches!(graph.remove_relation(id), Err(WorldError::MissingRelation(_))));
    }

    #[test]
    fn test_find_relations_filter() {
        let mut graph = harbor_graph();
        graph
            .create_relation(RelationDraft::new("hero", KNOWS, "keeper"), OnConflict::Reject)
            .unwrap();
        graph
            .create_relation(RelationDraft::new("hero", LOCATED_IN, "harbor"), OnConflict::Reject)
            .unwrap();

        let hero = e("hero");
        let found = graph.find_relations(&RelationFilter {
            subject: Some(&hero),
            predicate: Some(KNOWS),
            object: None,
        });
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].object, e("keeper"));
        assert_eq!(graph.find_relations(&RelationFilter::default()).len(), 2);
    }

    #[test]
    fn test_closed_relations_do_not_count_for_uniqueness() {
        let mut graph = harbor_graph();
        graph
            .create_relation(
                RelationDraft::new("hero", LOCATED_IN, "harbor").valid_between(0, Some(3)),
                OnConflict::Reject,
            )
            .unwrap();
        graph
            .create_relation(
                RelationDraft::new("hero", LOCATED_IN, "market").valid_between(3, None),
                OnConflict::Reject,
            )
            .unwrap();

        assert_eq!(graph.relations_active_at(1)[0].object, e("harbor"));
        assert_eq!(graph.relations_active_at(4)[0].object, e("market"));
        assert_eq!(graph.location_of(&e("hero")), Some(&e("market")));
    }

    #[test]
    fn test_transfer_item() {
        let mut graph = harbor_graph();
        graph
            .create_relation(RelationDraft::new("keeper", HOLDS, "lantern"), OnConflict::Reject)
            .unwrap();

        let wrong = graph.transfer_item(&e("lantern"), &e("hero"), &e("keeper"));
        assert!(matches!(wrong, Err(WorldError::NotContained { .. })));

        graph.transfer_item(&e("lantern"), &e("keeper"), &e("hero")).unwrap();
        assert_eq!(graph.contents(&e("hero")), vec![&e("lantern")]);
        assert!(graph.contents(&e("keeper")).is_empty());

        let missing = graph.transfer_item(&e("anchor"), &e("hero"), &e("keeper"));
        assert!(matches!(missing, Err(WorldError::MissingEntity { .. })));
    }

    #[test]
    fn test_rejected_transfer_keeps_holder() {
        let mut graph = harbor_graph();
        graph.add_entity(Entity::new("vale", EntityKind::Region)).unwrap();
        graph
            .create_relation(RelationDraft::new("keeper", HOLDS, "lantern"), OnConflict::Reject)
            .unwrap();
        let before = graph.relation_count();

        let result = graph.transfer_item(&e("lantern"), &e("keeper"), &e("vale"));
        assert!(matches!(result, Err(WorldError::SchemaViolation { .. })));
        assert_eq!(graph.contents(&e("keeper")), vec![&e("lantern")]);
        assert_eq!(graph.relation_count(), before);
        assert!(graph.index_consistent());
    }

    #[test]
    fn test_move_entity_and_position() {
        let mut graph = harbor_graph();
        graph.move_entity(&e("hero"), &e("harbor")).unwrap();
        graph.move_entity(&e("keeper"), &e("lighthouse")).unwrap();

        assert_eq!(graph.position(&e("hero")), Some(Position::new(0.0, 0.0)));
        assert!((graph.distance(&e("hero"), &e("keeper")).unwrap() - 500.0).abs() < 1e-9);

        graph.move_entity(&e("hero"), &e("lighthouse")).unwrap();
        assert_eq!(graph.occupants(&e("lighthouse")), vec![&e("hero"), &e("keeper")]);
        assert!(graph.occupants(&e("harbor")).is_empty());

        let into_item = graph.move_entity(&e("hero"), &e("lantern"));
        assert!(matches!(into_item, Err(WorldError::SchemaViolation { .. })));
    }

    #[test]
    fn test_remove_entity_drops_relations() {
        let mut graph = harbor_graph();
        graph.move_entity(&e("hero"), &e("harbor")).unwrap();
        graph
            .create_relation(RelationDraft::new("keeper", KNOWS, "hero"), OnConflict::Reject)
            .unwrap();

        graph.remove_entity(&e("hero")).unwrap();
        assert_eq!(graph.relation_count(), 0);
        assert!(graph.index_consistent());
    }

    proptest! {
        #[test]
        fn prop_moves_keep_single_location(moves in proptest::collection::vec((0usize..2, 0usize..3), 1..40)) {
            let mut graph = harbor_graph();
            let actors = ["hero", "keeper"];
            let places = ["harbor", "lighthouse", "market"];

            for (actor, place) in moves {
                graph.move_entity(&e(actors[actor]), &e(places[place])).unwrap();
            }

            for actor in actors {
                let located = graph
                    .relations_by_subject(&e(actor))
                    .into_iter()
                    .filter(|r| r.predicate == LOCATED_IN && r.is_open())
                    .count();
                prop_assert!(located <= 1);
            }
            prop_assert!(graph.index_consistent());
        }
    }
}
