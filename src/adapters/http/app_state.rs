use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        access_gate::AccessGateUseCases, billing::BillingUseCases, profile::ProfileUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub access_gate: Arc<AccessGateUseCases>,
    pub profile_use_cases: Arc<ProfileUseCases>,
}
