use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "succeeded" => PaymentStatus::Succeeded,
            _ => PaymentStatus::Failed,
        }
    }
}

/// One attempt against an invoice. Retries and failures accumulate as rows;
/// a SUCCEEDED payment is what flips the invoice to PAID, exactly once.
#[derive(Debug, Clone, Serialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub tenant_id: Uuid,
    pub amount_cents: i32,
    pub status: PaymentStatus,
    pub idempotency_key: Option<String>,
    pub provider_ref: String,
    pub created_at: Option<DateTime<Utc>>,
}
