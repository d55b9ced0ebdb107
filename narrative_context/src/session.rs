//! One play session: the authoritative record and its derived graph.
//!
//! A session is single-threaded and owns everything it touches. Speculative
//! work happens on a [`ShadowTurn`], a deep copy that is either committed by
//! replaying its patches or dropped without a trace.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use world_rules::time::format_timestamp;
use world_rules::{apply_patches, EntityId, Patch, WorldConfig, WorldGraph, WorldRecord};

use crate::constraints::{build_turn_constraints_with, validate_patches_against_constraints, TurnConstraints};
use crate::error::{ContextError, Result};
use crate::knowledge::{project_knowledge, KnowledgeSummary};
use crate::telemetry::{TelemetryAssembler, TurnTelemetry};

pub struct Session {
    record: WorldRecord,
    graph: WorldGraph,
    config: WorldConfig,
}

impl Session {
    pub fn new(record: WorldRecord) -> Self {
        Self::with_config(record, WorldConfig::default())
    }

    pub fn with_config(record: WorldRecord, config: WorldConfig) -> Self {
        Self::with_clock(record, config, Utc::now())
    }

    /// Open a session. A record without `meta.startedAt` is stamped with
    /// `now`, so every later derivation in the session sees the same anchor.
    pub fn with_clock(mut record: WorldRecord, config: WorldConfig, now: DateTime<Utc>) -> Self {
        if record.meta.started_at.is_none() {
            record.meta.started_at = Some(format_timestamp(now));
        }
        let graph = WorldGraph::from_record(&record, Arc::new(config.registry()));
        let mut session = Self { record, graph, config };
        session.layout();
        debug!(turn = session.record.turn(), "session opened");
        session
    }

    pub fn record(&self) -> &WorldRecord {
        &self.record
    }

    pub fn graph(&self) -> &WorldGraph {
        &self.graph
    }

    /// Direct graph access. Additions are lost at the next structural rebuild.
    pub fn graph_mut(&mut self) -> &mut WorldGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn into_record(self) -> WorldRecord {
        self.record
    }

    pub fn player_id(&self) -> EntityId {
        EntityId::from(self.record.player.id.as_str())
    }

    /// Apply a batch to the authoritative record and refresh the graph.
    ///
    /// On error the record is left untouched.
    pub fn apply_patches(&mut self, patches: &[Patch], note: &str) -> Result<()> {
        self.record = apply_patches(&self.record, patches, note)?;
        self.refresh_graph();
        Ok(())
    }

    /// Rebuild the graph if the record's structure changed.
    pub fn refresh_graph(&mut self) -> bool {
        let rebuilt = self.graph.refresh(&self.record);
        if rebuilt {
            self.layout();
        }
        rebuilt
    }

    /// Telemetry for the current turn. The weather snapshot is kept as the
    /// record's one-turn cache.
    pub fn telemetry(&mut self) -> TurnTelemetry {
        let telemetry = TelemetryAssembler::new(&self.config).assemble(&self.record);
        if let (Some(system), Some(weather)) = (self.record.systems.weather.as_mut(), &telemetry.weather) {
            system.cache = Some(weather.clone());
        }
        telemetry
    }

    pub fn constraints(&self, telemetry: &TurnTelemetry) -> TurnConstraints {
        build_turn_constraints_with(&self.record, telemetry, &self.config)
    }

    pub fn validate(&self, patches: &[Patch], constraints: &TurnConstraints) -> Vec<String> {
        validate_patches_against_constraints(&self.record, patches, constraints)
    }

    pub fn knowledge(&self) -> KnowledgeSummary {
        project_knowledge(&self.graph, &self.player_id(), self.config.telemetry.nearby_radius_m)
    }

    pub fn begin_shadow(&self) -> ShadowTurn {
        ShadowTurn {
            base_turn: self.record.turn(),
            record: self.record.clone(),
            staged: Vec::new(),
        }
    }

    /// Replay a shadow's batches, in order, against the authoritative record.
    pub fn commit(&mut self, shadow: ShadowTurn) -> Result<()> {
        let actual = self.record.turn();
        if actual != shadow.base_turn {
            return Err(ContextError::StaleShadow {
                expected: shadow.base_turn,
                actual,
            });
        }
        let mut next = self.record.clone();
        for (patches, note) in &shadow.staged {
            next = apply_patches(&next, patches, note)?;
        }
        self.record = next;
        self.refresh_graph();
        debug!(batches = shadow.staged.len(), turn = self.record.turn(), "shadow committed");
        Ok(())
    }

    /// Place locations that were authored without coordinates and write the
    /// positions back, so telemetry and knowledge measure the same map.
    fn layout(&mut self) {
        let start = EntityId::from(self.record.player.location.as_str());
        if self.graph.auto_layout(&start, self.config.layout.step_m) == 0 {
            return;
        }
        for (id, loc) in self.record.locations.iter_mut().filter(|(_, loc)| loc.coords.is_none()) {
            loc.coords = self
                .graph
                .entity(&EntityId::from(id.as_str()))
                .and_then(|entity| entity.coordinates());
        }
        self.graph.refresh(&self.record);
    }
}

/// A speculative copy of the record for one turn.
#[derive(Debug, Clone)]
pub struct ShadowTurn {
    base_turn: u64,
    record: WorldRecord,
    staged: Vec<(Vec<Patch>, String)>,
}

impl ShadowTurn {
    pub fn record(&self) -> &WorldRecord {
        &self.record
    }

    pub fn base_turn(&self) -> u64 {
        self.base_turn
    }

    pub fn staged_batches(&self) -> usize {
        self.staged.len()
    }

    /// Apply a batch to the copy. A failing batch is not staged.
    pub fn stage(&mut self, patches: Vec<Patch>, note: impl Into<String>) -> Result<()> {
        let note = note.into();
        self.record = apply_patches(&self.record, &patches, &note)?;
        self.staged.push((patches, note));
        Ok(())
    }

    /// Violations `patches` would cause from the shadow's current state.
    pub fn violations(&self, patches: &[Patch], constraints: &TurnConstraints) -> Vec<String> {
        validate_patches_against_constraints(&self.record, patches, constraints)
    }
}
