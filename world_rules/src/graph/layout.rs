//! Best-effort coordinate assignment for locations authored without coordinates.

use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, warn};

use super::WorldGraph;
use crate::entities::{EntityId, EntityKind, EXIT};
use crate::world_state::{Direction, Position};

/// Default distance between two locations joined by an exit, in metres.
pub const DEFAULT_LAYOUT_STEP: f64 = 100.0;

impl WorldGraph {
    /// Assign coordinates to every location lacking them.
    ///
    /// Positions propagate breadth-first from `start` along `exit` relations,
    /// one `step` per hop in the exit's direction; incoming exits are followed
    /// in reverse. Locations that cannot be reached, including all of them
    /// when no directional relations exist, are placed at the origin.
    /// Locations that already carry coordinates keep them.
    ///
    /// Returns the number of locations that received coordinates.
    pub fn auto_layout(&mut self, start: &EntityId, step: f64) -> usize {
        let locations: Vec<EntityId> = self
            .entities_of_kind(&EntityKind::Location)
            .into_iter()
            .map(|e| e.id.clone())
            .collect();

        let mut placed: BTreeMap<EntityId, Position> = locations
            .iter()
            .filter_map(|id| Some((id.clone(), self.entity(id)?.coordinates()?)))
            .collect();
        let mut assigned: BTreeMap<EntityId, Position> = BTreeMap::new();

        if self.contains_entity(start) {
            if !placed.contains_key(start) {
                placed.insert(start.clone(), Position::ORIGIN);
                assigned.insert(start.clone(), Position::ORIGIN);
            }

            let mut visited: HashSet<EntityId> = HashSet::from([start.clone()]);
            let mut queue = VecDeque::from([start.clone()]);
            while let Some(current) = queue.pop_front() {
                let here = placed[&current];
                for (neighbor, (dx, dy)) in self.exit_neighbors(&current) {
                    if !visited.insert(neighbor.clone()) {
                        continue;
                    }
                    if !placed.contains_key(&neighbor) {
                        let pos = here.offset(dx * step, dy * step);
                        placed.insert(neighbor.clone(), pos);
                        assigned.insert(neighbor.clone(), pos);
                    }
                    queue.push_back(neighbor);
                }
            }
        }

        for id in &locations {
            if !placed.contains_key(id) {
                placed.insert(id.clone(), Position::ORIGIN);
                assigned.insert(id.clone(), Position::ORIGIN);
            }
        }

        let mut applied = 0;
        for (id, pos) in &assigned {
            match self.set_coordinates(id, *pos) {
                Ok(()) => applied += 1,
                Err(err) => warn!(error = %err, location = %id, "layout skipped location"),
            }
        }
        debug!(start = %start, assigned = applied, "auto layout");
        applied
    }

    /// Location neighbours reachable over exits, with the unit offset to them.
    fn exit_neighbors(&self, location: &EntityId) -> Vec<(EntityId, (f64, f64))> {
        let mut neighbors = Vec::new();
        for rel in self.relations_by_subject(location) {
            if let Some(dir) = exit_direction(rel.predicate.as_str(), &rel.properties) {
                neighbors.push((rel.object.clone(), dir.unit()));
            }
        }
        for rel in self.relations_by_object(location) {
            if let Some(dir) = exit_direction(rel.predicate.as_str(), &rel.properties) {
                let (dx, dy) = dir.unit();
                neighbors.push((rel.subject.clone(), (-dx, -dy)));
            }
        }
        neighbors
    }
}

fn exit_direction(predicate: &str, properties: &crate::entities::Properties) -> Option<Direction> {
    if predicate != EXIT {
        return None;
    }
    properties
        .get("direction")
        .and_then(|d| d.as_str())
        .and_then(Direction::parse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Entity, RelationDraft};
    use crate::graph::OnConflict;

    fn exit(graph: &mut WorldGraph, from: &str, to: &str, dir: &str) {
        graph
            .create_relation(
                RelationDraft::new(from, EXIT, to).with_property("direction", dir),
                OnConflict::Reject,
            )
            .unwrap();
    }

    #[test]
    fn test_layout_follows_exits() {
        let mut graph = WorldGraph::default();
        for id in ["square", "chapel", "docks", "well"] {
            graph.add_entity(Entity::location(id)).unwrap();
        }
        exit(&mut graph, "square", "chapel", "north");
        exit(&mut graph, "square", "docks", "east");
        // Only an incoming exit reaches the well.
        exit(&mut graph, "well", "square", "north");

        let assigned = graph.auto_layout(&EntityId::from("square"), DEFAULT_LAYOUT_STEP);
        assert_eq!(assigned, 4);

        let pos = |id: &str| graph.entity(&EntityId::from(id)).unwrap().coordinates().unwrap();
        assert_eq!(pos("square"), Position::new(0.0, 0.0));
        assert_eq!(pos("chapel"), Position::new(0.0, 100.0));
        assert_eq!(pos("docks"), Position::new(100.0, 0.0));
        assert_eq!(pos("well"), Position::new(0.0, -100.0));
    }

    #[test]
    fn test_layout_keeps_authored_coordinates() {
        let mut graph = WorldGraph::default();
        graph
            .add_entity(Entity::location("square").with_coordinates(Position::new(50.0, 50.0)))
            .unwrap();
        graph.add_entity(Entity::location("chapel")).unwrap();
        exit(&mut graph, "square", "chapel", "west");

        assert_eq!(graph.auto_layout(&EntityId::from("square"), 10.0), 1);
        let chapel = graph.entity(&EntityId::from("chapel")).unwrap();
        assert_eq!(chapel.coordinates(), Some(Position::new(40.0, 50.0)));
    }

    #[test]
    fn test_layout_defaults_to_origin_without_exits() {
        let mut graph = WorldGraph::default();
        graph.add_entity(Entity::location("a")).unwrap();
        graph.add_entity(Entity::location("b")).unwrap();

        assert_eq!(graph.auto_layout(&EntityId::from("a"), DEFAULT_LAYOUT_STEP), 2);
        for id in ["a", "b"] {
            let coords = graph.entity(&EntityId::from(id)).unwrap().coordinates();
            assert_eq!(coords, Some(Position::ORIGIN));
        }
    }

    #[test]
    fn test_layout_count_matches_updates() {
        let mut graph = WorldGraph::default();
        for id in ["square", "chapel", "island"] {
            graph.add_entity(Entity::location(id)).unwrap();
        }
        exit(&mut graph, "square", "chapel", "south");

        let assigned = graph.auto_layout(&EntityId::from("nowhere"), DEFAULT_LAYOUT_STEP);
        let placed = graph
            .entities_of_kind(&EntityKind::Location)
            .into_iter()
            .filter(|e| e.coordinates().is_some())
            .count();
        assert_eq!(assigned, placed);
        assert_eq!(assigned, 3);
        assert!(graph.index_consistent());
        assert_eq!(graph.auto_layout(&EntityId::from("square"), DEFAULT_LAYOUT_STEP), 0);
    }
}
