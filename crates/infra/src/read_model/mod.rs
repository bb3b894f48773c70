//! Tenant-isolated snapshots of aggregates, master data and derived figures.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
