use serde::{Deserialize, Serialize};

/// Outcome of the most recent charge attempt for a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LastPaymentStatus {
    Succeeded,
    Failed,
    None,
}

impl LastPaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LastPaymentStatus::Succeeded => "succeeded",
            LastPaymentStatus::Failed => "failed",
            LastPaymentStatus::None => "none",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LastPaymentStatus::Failed)
    }
}

impl Default for LastPaymentStatus {
    fn default() -> Self {
        LastPaymentStatus::None
    }
}

impl std::fmt::Display for LastPaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LastPaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "succeeded" => Ok(LastPaymentStatus::Succeeded),
            "failed" => Ok(LastPaymentStatus::Failed),
            "none" => Ok(LastPaymentStatus::None),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}
