use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use thiserror::Error;

use tms_core::TenantId;

use crate::config::SequenceFormat;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("no sequence configured for code {0}")]
    UnknownCode(String),
    #[error("sequence storage unavailable")]
    Unavailable,
}

/// Hands out document names per tenant and sequence code.
pub trait SequenceGenerator: Send + Sync {
    fn next_by_code(&self, tenant_id: TenantId, code: &str) -> Result<String, SequenceError>;
}

/// Counters start at 1 for every tenant.
#[derive(Debug)]
pub struct InMemorySequence {
    formats: BTreeMap<String, SequenceFormat>,
    counters: Mutex<HashMap<(TenantId, String), u64>>,
}

impl InMemorySequence {
    pub fn new(formats: BTreeMap<String, SequenceFormat>) -> Self {
        Self {
            formats,
            counters: Mutex::new(HashMap::new()),
        }
    }
}

impl SequenceGenerator for InMemorySequence {
    fn next_by_code(&self, tenant_id: TenantId, code: &str) -> Result<String, SequenceError> {
        let format = self
            .formats
            .get(code)
            .ok_or_else(|| SequenceError::UnknownCode(code.to_string()))?;
        let mut counters = self.counters.lock().map_err(|_| SequenceError::Unavailable)?;
        let counter = counters.entry((tenant_id, code.to_string())).or_insert(0);
        *counter += 1;
        Ok(format.render(*counter))
    }
}
