use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tms_core::{AggregateId, TenantId};

/// Record a message is attached to, e.g. `("tms.order", id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub model: String,
    pub id: AggregateId,
}

impl RecordRef {
    pub fn new(model: impl Into<String>, id: AggregateId) -> Self {
        Self {
            model: model.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub record: RecordRef,
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

/// Chatter-style log of notes posted on records.
pub trait ActivityLog: Send + Sync {
    fn post(&self, tenant_id: TenantId, record: RecordRef, body: String, posted_at: DateTime<Utc>);

    /// Messages of one record, oldest first.
    fn messages(&self, tenant_id: TenantId, record: &RecordRef) -> Vec<Message>;
}

#[derive(Debug, Default)]
pub struct InMemoryActivityLog {
    entries: RwLock<Vec<(TenantId, Message)>>,
}

impl InMemoryActivityLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn post(&self, tenant_id: TenantId, record: RecordRef, body: String, posted_at: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.push((
                tenant_id,
                Message {
                    record,
                    body,
                    posted_at,
                },
            ));
        }
    }

    fn messages(&self, tenant_id: TenantId, record: &RecordRef) -> Vec<Message> {
        let Ok(entries) = self.entries.read() else {
            return vec![];
        };
        entries
            .iter()
            .filter(|(t, m)| *t == tenant_id && &m.record == record)
            .map(|(_, m)| m.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_scoped_to_tenant_and_record() {
        let log = InMemoryActivityLog::new();
        let tenant_id = TenantId::new();
        let sale = RecordRef::new("sale.order", AggregateId::new());
        let order = RecordRef::new("tms.order", AggregateId::new());
        let now = Utc::now();

        log.post(tenant_id, sale.clone(), "first".to_string(), now);
        log.post(tenant_id, order.clone(), "other record".to_string(), now);
        log.post(TenantId::new(), sale.clone(), "other tenant".to_string(), now);
        log.post(tenant_id, sale.clone(), "second".to_string(), now);

        let bodies: Vec<String> = log.messages(tenant_id, &sale).into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }
}
