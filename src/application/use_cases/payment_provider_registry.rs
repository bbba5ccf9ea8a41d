use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::{payment_method::PaymentMethod, payment_provider::PaymentProvider},
};

/// Holds the provider adapters this deployment has credentials for.
///
/// Providers without configuration are simply absent; asking for one
/// returns `ProviderNotConfigured`.
#[derive(Default, Clone)]
pub struct PaymentProviderRegistry {
    card_checkout: Option<Arc<dyn PaymentProviderPort>>,
    boleto_pix: Option<Arc<dyn PaymentProviderPort>>,
}

impl PaymentProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under the provider it reports.
    pub fn with_provider(mut self, adapter: Arc<dyn PaymentProviderPort>) -> Self {
        match adapter.provider() {
            PaymentProvider::CardCheckout => self.card_checkout = Some(adapter),
            PaymentProvider::BoletoPix => self.boleto_pix = Some(adapter),
        }
        self
    }

    pub fn get(&self, provider: PaymentProvider) -> AppResult<Arc<dyn PaymentProviderPort>> {
        let slot = match provider {
            PaymentProvider::CardCheckout => &self.card_checkout,
            PaymentProvider::BoletoPix => &self.boleto_pix,
        };
        slot.clone().ok_or(AppError::ProviderNotConfigured)
    }

    /// Card payments go through the card checkout when it is configured,
    /// otherwise through the boleto/PIX provider which also bills cards.
    pub fn for_method(&self, method: PaymentMethod) -> AppResult<Arc<dyn PaymentProviderPort>> {
        match method {
            PaymentMethod::CreditCard => self
                .get(PaymentProvider::CardCheckout)
                .or_else(|_| self.get(PaymentProvider::BoletoPix)),
            PaymentMethod::Boleto | PaymentMethod::Pix => self.get(PaymentProvider::BoletoPix),
        }
    }

    pub fn is_configured(&self, provider: PaymentProvider) -> bool {
        self.get(provider).is_ok()
    }

    pub fn configured(&self) -> Vec<PaymentProvider> {
        PaymentProvider::all()
            .iter()
            .copied()
            .filter(|p| self.is_configured(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakePaymentProvider;

    #[test]
    fn test_missing_provider_is_not_configured() {
        let registry = PaymentProviderRegistry::new();
        assert!(matches!(
            registry.get(PaymentProvider::CardCheckout),
            Err(AppError::ProviderNotConfigured)
        ));
        assert!(registry.configured().is_empty());
    }

    #[test]
    fn test_card_method_falls_back_to_boleto_pix() {
        let registry = PaymentProviderRegistry::new()
            .with_provider(Arc::new(FakePaymentProvider::new(PaymentProvider::BoletoPix)));
        let adapter = registry.for_method(PaymentMethod::CreditCard).unwrap();
        assert_eq!(adapter.provider(), PaymentProvider::BoletoPix);
    }

    #[test]
    fn test_method_routing_with_both_providers() {
        let registry = PaymentProviderRegistry::new()
            .with_provider(Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout)))
            .with_provider(Arc::new(FakePaymentProvider::new(PaymentProvider::BoletoPix)));

        assert_eq!(
            registry.for_method(PaymentMethod::CreditCard).unwrap().provider(),
            PaymentProvider::CardCheckout
        );
        assert_eq!(
            registry.for_method(PaymentMethod::Pix).unwrap().provider(),
            PaymentProvider::BoletoPix
        );
        assert_eq!(registry.configured().len(), 2);
    }

    #[test]
    fn test_boleto_without_provider_fails() {
        let registry = PaymentProviderRegistry::new()
            .with_provider(Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout)));
        assert!(matches!(
            registry.for_method(PaymentMethod::Boleto),
            Err(AppError::ProviderNotConfigured)
        ));
    }
}
