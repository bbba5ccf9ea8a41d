use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// How the customer pays for the plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum PaymentMethod {
    CreditCard,
    Boleto,
    Pix,
}

impl PaymentMethod {
    /// Asaas `billingType` value
    pub fn asaas_billing_type(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "CREDIT_CARD",
            PaymentMethod::Boleto => "BOLETO",
            PaymentMethod::Pix => "PIX",
        }
    }

    /// Boleto and PIX charges are issued against a registered tax id.
    pub fn requires_customer_data(&self) -> bool {
        matches!(self, PaymentMethod::Boleto | PaymentMethod::Pix)
    }
}
