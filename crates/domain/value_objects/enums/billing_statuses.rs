use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillingStatus {
    Paid,
    Failed,
}

impl BillingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingStatus::Paid => "paid",
            BillingStatus::Failed => "failed",
        }
    }

    /// Description used when the invoice carries none.
    pub fn default_description(&self) -> &'static str {
        match self {
            BillingStatus::Paid => "Subscription payment",
            BillingStatus::Failed => "Failed subscription payment",
        }
    }
}

impl Display for BillingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
