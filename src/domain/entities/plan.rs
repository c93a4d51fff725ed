use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Monthly,
    Yearly,
}

impl BillingInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingInterval::Monthly => "monthly",
            BillingInterval::Yearly => "yearly",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "yearly" | "year" => BillingInterval::Yearly,
            _ => BillingInterval::Monthly,
        }
    }
}

/// Catalog entry. Tenant-agnostic and read-mostly; prices are integer
/// minor-currency units, `max_seats` caps memberships under the plan.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i32,
    pub interval: BillingInterval,
    pub max_seats: i32,
    pub features: serde_json::Value,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
}
