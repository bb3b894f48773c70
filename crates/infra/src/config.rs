//! TMS settings.
//!
//! Defaults enable every feature group and module. `from_env` overlays
//! `TMS_*` variables on the defaults (or on the JSON document named by
//! `TMS_CONFIG`); unparsable values are logged and ignored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use tms_fleet::TimeUom;
use tms_shipments::CostModules;

pub const SHIPMENT_SEQUENCE: &str = "tms.shipment";
pub const ORDER_SEQUENCE: &str = "tms.order";
pub const SALE_SEQUENCE: &str = "sale.order";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid settings document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Optional feature groups. Disabled groups report no expiring documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Features {
    pub driver_license: bool,
    pub vehicle_insurance: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            driver_license: true,
            vehicle_insurance: true,
        }
    }
}

/// Extension modules installed next to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Modules {
    pub expense: bool,
    pub purchase: bool,
    pub advance_clearing: bool,
    pub order_pickup: bool,
    pub geoengine: bool,
}

impl Default for Modules {
    fn default() -> Self {
        Self {
            expense: true,
            purchase: true,
            advance_clearing: true,
            order_pickup: true,
            geoengine: true,
        }
    }
}

impl Modules {
    pub fn none() -> Self {
        Self {
            expense: false,
            purchase: false,
            advance_clearing: false,
            order_pickup: false,
            geoengine: false,
        }
    }

    pub fn cost_modules(&self) -> CostModules {
        CostModules {
            expense: self.expense,
            purchase: self.purchase,
            advance_clearing: self.expense && self.advance_clearing,
        }
    }

    fn set(&mut self, name: &str) -> bool {
        match name {
            "expense" => self.expense = true,
            "purchase" => self.purchase = true,
            "advance_clearing" => self.advance_clearing = true,
            "order_pickup" => self.order_pickup = true,
            "geoengine" => self.geoengine = true,
            _ => return false,
        }
        true
    }
}

/// Name format of a sequence: `prefix` followed by the counter padded with
/// zeros to `padding` digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFormat {
    pub prefix: String,
    pub padding: usize,
}

impl SequenceFormat {
    pub fn new(prefix: impl Into<String>, padding: usize) -> Self {
        Self {
            prefix: prefix.into(),
            padding,
        }
    }

    pub fn render(&self, number: u64) -> String {
        format!("{}{:0width$}", self.prefix, number, width = self.padding)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TmsSettings {
    pub driver_license_security_days: u32,
    pub vehicle_insurance_security_days: u32,
    pub time_uom: TimeUom,
    pub features: Features,
    pub modules: Modules,
    pub sequences: BTreeMap<String, SequenceFormat>,
}

impl Default for TmsSettings {
    fn default() -> Self {
        Self {
            driver_license_security_days: 30,
            vehicle_insurance_security_days: 30,
            time_uom: TimeUom::Hours,
            features: Features::default(),
            modules: Modules::default(),
            sequences: default_sequences(),
        }
    }
}

fn default_sequences() -> BTreeMap<String, SequenceFormat> {
    BTreeMap::from([
        (SHIPMENT_SEQUENCE.to_string(), SequenceFormat::new("SHP/", 5)),
        (ORDER_SEQUENCE.to_string(), SequenceFormat::new("TMS/", 5)),
        (SALE_SEQUENCE.to_string(), SequenceFormat::new("S", 5)),
    ])
}

impl TmsSettings {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let mut settings: TmsSettings = serde_json::from_str(raw)?;
        for (code, format) in default_sequences() {
            settings.sequences.entry(code).or_insert(format);
        }
        Ok(settings)
    }

    /// Load from the process environment.
    ///
    /// - `TMS_CONFIG`: path of a JSON settings document (optional)
    /// - `TMS_DRIVER_LICENSE_SECURITY_DAYS`, `TMS_VEHICLE_INSURANCE_SECURITY_DAYS`
    /// - `TMS_TIME_UOM`: `hours` or `days`
    /// - `TMS_MODULES`: comma-separated installed modules, replaces the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `from_env` over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = match lookup("TMS_CONFIG") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })?;
                Self::from_json(&raw)?
            }
            None => Self::default(),
        };

        if let Some(days) = parse_var(&lookup, "TMS_DRIVER_LICENSE_SECURITY_DAYS") {
            settings.driver_license_security_days = days;
        }
        if let Some(days) = parse_var(&lookup, "TMS_VEHICLE_INSURANCE_SECURITY_DAYS") {
            settings.vehicle_insurance_security_days = days;
        }
        if let Some(raw) = lookup("TMS_TIME_UOM") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "hours" => settings.time_uom = TimeUom::Hours,
                "days" => settings.time_uom = TimeUom::Days,
                other => warn!(value = other, "ignoring TMS_TIME_UOM, expected hours or days"),
            }
        }
        if let Some(raw) = lookup("TMS_MODULES") {
            let mut modules = Modules::none();
            for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if !modules.set(name) {
                    warn!(module = name, "ignoring unknown module in TMS_MODULES");
                }
            }
            settings.modules = modules;
        }

        Ok(settings)
    }

    pub fn sequence(&self, code: &str) -> Option<&SequenceFormat> {
        self.sequences.get(code)
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}
