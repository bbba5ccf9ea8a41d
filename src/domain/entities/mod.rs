pub mod access;
pub mod payment_event;
pub mod payment_method;
pub mod payment_provider;
pub mod payment_status;
pub mod plan;
pub mod professional_profile;
pub mod subscription_state;
pub mod user;
