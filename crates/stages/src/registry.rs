use std::collections::BTreeMap;

use tms_core::{DomainError, DomainResult};

use crate::stage::{Stage, StageId, StageQuery, StageType};

/// Read access to the configured stages.
pub trait StageProvider {
    /// Stages matching `query`, ordered by `sequence` then name, at most
    /// `limit` entries when given.
    fn search(&self, query: StageQuery, limit: Option<usize>) -> Vec<Stage>;

    fn get(&self, id: StageId) -> Option<Stage>;

    /// Lowest-sequence stage of the type.
    fn first_stage(&self, stage_type: StageType) -> DomainResult<Stage> {
        self.search(StageQuery::of_type(stage_type), Some(1))
            .into_iter()
            .next()
            .ok_or_else(|| missing(stage_type, "any"))
    }

    /// Lowest-sequence stage of the type flagged as default. Falls back to
    /// [`first_stage`](Self::first_stage) when none is flagged.
    fn default_stage(&self, stage_type: StageType) -> DomainResult<Stage> {
        match self.default_flagged_stage(stage_type) {
            Some(stage) => Ok(stage),
            None => self.first_stage(stage_type),
        }
    }

    fn default_flagged_stage(&self, stage_type: StageType) -> Option<Stage> {
        self.search(StageQuery::of_type(stage_type).default_flagged(), Some(1))
            .into_iter()
            .next()
    }

    fn transit_stage(&self, stage_type: StageType) -> DomainResult<Stage> {
        self.search(StageQuery::of_type(stage_type).transit(), Some(1))
            .into_iter()
            .next()
            .ok_or_else(|| missing(stage_type, "transit"))
    }

    fn closed_stage(&self, stage_type: StageType) -> DomainResult<Stage> {
        self.search(StageQuery::of_type(stage_type).closed(), Some(1))
            .into_iter()
            .next()
            .ok_or_else(|| missing(stage_type, "closed"))
    }

    fn is_closed(&self, id: StageId) -> bool {
        self.get(id).is_some_and(|s| s.is_closed)
    }
}

fn missing(stage_type: StageType, flag: &str) -> DomainError {
    DomainError::configuration(format!("no {flag} stage configured for {stage_type:?} records"))
}

/// In-memory stage table.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: BTreeMap<StageId, Stage>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Order stages Draft, Confirmed, In Transit, Completed and driver stages
    /// Available, On Trip.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.insert(Stage::new("Draft", 10, StageType::Order).default_stage());
        registry.insert(Stage::new("Confirmed", 20, StageType::Order));
        registry.insert(Stage::new("In Transit", 30, StageType::Order).transit());
        registry.insert(Stage::new("Completed", 40, StageType::Order).closed());
        registry.insert(Stage::new("Available", 10, StageType::Driver).default_stage());
        registry.insert(Stage::new("On Trip", 20, StageType::Driver).transit());
        registry
    }

    pub fn insert(&mut self, stage: Stage) -> StageId {
        let id = stage.id;
        self.stages.insert(id, stage);
        id
    }

    pub fn remove(&mut self, id: StageId) -> Option<Stage> {
        self.stages.remove(&id)
    }

    pub fn by_name(&self, stage_type: StageType, name: &str) -> Option<Stage> {
        self.stages
            .values()
            .find(|s| s.stage_type == stage_type && s.name == name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl StageProvider for StageRegistry {
    fn search(&self, query: StageQuery, limit: Option<usize>) -> Vec<Stage> {
        let mut found: Vec<Stage> = self
            .stages
            .values()
            .filter(|s| query.matches(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        found
    }

    fn get(&self, id: StageId) -> Option<Stage> {
        self.stages.get(&id).cloned()
    }
}
