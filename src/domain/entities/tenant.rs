use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A customer account; the unit of data partitioning. Every tenant-scoped
/// row carries this id and the row-security policies key off it.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}
