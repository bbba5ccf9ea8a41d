pub mod access_gate;
pub mod billing;
pub mod payment_provider_registry;
pub mod profile;
pub mod subscription_reconciler;
