use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::payment_method::PaymentMethod;

/// Billing provider that issued a subscription state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum PaymentProvider {
    /// Hosted card checkout with HMAC-signed webhooks (Stripe).
    CardCheckout,
    /// Brazilian boleto/PIX billing (Asaas).
    BoletoPix,
}

impl PaymentProvider {
    /// Human-readable display name for the provider
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentProvider::CardCheckout => "Stripe",
            PaymentProvider::BoletoPix => "Asaas",
        }
    }

    /// Whether the provider can charge with the given method
    pub fn supports_method(&self, method: PaymentMethod) -> bool {
        match self {
            PaymentProvider::CardCheckout => method == PaymentMethod::CreditCard,
            PaymentProvider::BoletoPix => true,
        }
    }

    /// Whether the provider hands us the next due date on activation.
    /// Otherwise the paid period is derived from the billing cycle.
    pub fn supplies_period_end(&self) -> bool {
        matches!(self, PaymentProvider::BoletoPix)
    }

    pub fn all() -> &'static [PaymentProvider] {
        &[PaymentProvider::CardCheckout, PaymentProvider::BoletoPix]
    }
}
