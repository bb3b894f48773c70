use std::collections::HashMap;
use std::sync::RwLock;

use thiserror::Error;

use tms_fleet::{Coordinates, Partner};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a location to coordinates. `Ok(None)` means the address is unknown.
pub trait Geocoder: Send + Sync {
    fn geo_localize(&self, location: &Partner) -> Result<Option<Coordinates>, GeocodeError>;
}

/// Fixed address table. Lookup is by address, then by name, ignoring case.
#[derive(Debug, Default)]
pub struct StaticGeocoder {
    table: RwLock<HashMap<String, Coordinates>>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, address: &str, coordinates: Coordinates) -> Self {
        self.insert(address, coordinates);
        self
    }

    pub fn insert(&self, address: &str, coordinates: Coordinates) {
        if let Ok(mut table) = self.table.write() {
            table.insert(normalize(address), coordinates);
        }
    }
}

fn normalize(key: &str) -> String {
    key.trim().to_lowercase()
}

impl Geocoder for StaticGeocoder {
    fn geo_localize(&self, location: &Partner) -> Result<Option<Coordinates>, GeocodeError> {
        let table = self
            .table
            .read()
            .map_err(|_| GeocodeError::Unavailable("lock poisoned".to_string()))?;
        let found = location
            .address()
            .and_then(|a| table.get(&normalize(a)))
            .or_else(|| table.get(&normalize(location.name())))
            .copied();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tms_core::TenantId;
    use tms_events::execute;
    use tms_fleet::{PartnerCommand, PartnerId, PartnerKind, RegisterPartner};

    fn location(name: &str, address: Option<&str>) -> Partner {
        let partner_id = PartnerId::generate();
        let mut partner = Partner::empty(partner_id);
        execute(
            &mut partner,
            &PartnerCommand::RegisterPartner(RegisterPartner {
                tenant_id: TenantId::new(),
                partner_id,
                kind: PartnerKind::Location,
                name: name.to_string(),
                address: address.map(str::to_string),
                driver_stage_id: None,
                coordinates: None,
                occurred_at: Utc::now(),
            }),
        )
        .unwrap();
        partner
    }

    #[test]
    fn looks_up_address_then_name() {
        let berlin = Coordinates::new(52.52, 13.405).unwrap();
        let hub = Coordinates::new(48.137, 11.575).unwrap();
        let geocoder = StaticGeocoder::new()
            .with("Alexanderplatz 1, Berlin", berlin)
            .with("Munich Hub", hub);

        let by_address = location("Depot", Some("alexanderplatz 1, berlin "));
        let by_name = location("Munich Hub", None);
        let unknown = location("Nowhere", Some("Unknown street"));

        assert_eq!(geocoder.geo_localize(&by_address).unwrap(), Some(berlin));
        assert_eq!(geocoder.geo_localize(&by_name).unwrap(), Some(hub));
        assert_eq!(geocoder.geo_localize(&unknown).unwrap(), None);
    }
}
