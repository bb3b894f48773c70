use serde::{Deserialize, Serialize};

tms_core::record_id!(
    /// Stage identifier.
    StageId
);

/// Which records a stage applies to. `Order` stages are shared by orders and
/// shipments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageType {
    Driver,
    Order,
}

/// A workflow stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub name: String,
    pub sequence: i32,
    pub stage_type: StageType,
    pub is_default: bool,
    pub is_transit: bool,
    pub is_closed: bool,
    pub decoration: Option<String>,
    pub custom_color: Option<String>,
    /// Kanban labels per state.
    pub legend_normal: String,
    pub legend_blocked: String,
    pub legend_done: String,
}

impl Stage {
    /// Plain stage with standard kanban legends.
    pub fn new(name: impl Into<String>, sequence: i32, stage_type: StageType) -> Self {
        Self {
            id: StageId::generate(),
            name: name.into(),
            sequence,
            stage_type,
            is_default: false,
            is_transit: false,
            is_closed: false,
            decoration: None,
            custom_color: None,
            legend_normal: "In Progress".to_string(),
            legend_blocked: "Blocked".to_string(),
            legend_done: "Ready for Next Stage".to_string(),
        }
    }

    pub fn default_stage(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn transit(mut self) -> Self {
        self.is_transit = true;
        self
    }

    pub fn closed(mut self) -> Self {
        self.is_closed = true;
        self
    }
}

/// Stage search filter. Flag filters left as `None` match any value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageQuery {
    pub stage_type: Option<StageType>,
    pub transit: Option<bool>,
    pub closed: Option<bool>,
    pub default: Option<bool>,
}

impl StageQuery {
    pub fn of_type(stage_type: StageType) -> Self {
        Self {
            stage_type: Some(stage_type),
            ..Self::default()
        }
    }

    pub fn transit(mut self) -> Self {
        self.transit = Some(true);
        self
    }

    pub fn closed(mut self) -> Self {
        self.closed = Some(true);
        self
    }

    pub fn default_flagged(mut self) -> Self {
        self.default = Some(true);
        self
    }

    pub fn matches(&self, stage: &Stage) -> bool {
        self.stage_type.is_none_or(|t| t == stage.stage_type)
            && self.transit.is_none_or(|v| v == stage.is_transit)
            && self.closed.is_none_or(|v| v == stage.is_closed)
            && self.default.is_none_or(|v| v == stage.is_default)
    }
}
