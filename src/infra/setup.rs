use crate::{
    adapters::http::app_state::AppState,
    application::ports::payment_provider::PaymentProviderPort,
    infra::{
        asaas_payment_adapter::AsaasPaymentAdapter, config::AppConfig, postgres_persistence,
        stripe_payment_adapter::StripePaymentAdapter,
    },
    use_cases::{
        access_gate::AccessGateUseCases,
        billing::{BillingUseCases, PlanRepoTrait, UserRepoTrait},
        payment_provider_registry::PaymentProviderRegistry,
        profile::{ProfessionalProfileRepoTrait, ProfileUseCases},
        subscription_reconciler::SubscriptionStateRepoTrait,
    },
};
use std::fs::File;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env()?;

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserRepoTrait>;
    let plan_repo_arc = postgres_arc.clone() as Arc<dyn PlanRepoTrait>;
    let subscription_repo_arc = postgres_arc.clone() as Arc<dyn SubscriptionStateRepoTrait>;
    let profile_repo_arc = postgres_arc.clone() as Arc<dyn ProfessionalProfileRepoTrait>;

    let providers = build_provider_registry(&config)?;

    let billing_use_cases = BillingUseCases::new(
        user_repo_arc,
        plan_repo_arc,
        subscription_repo_arc.clone(),
        providers,
        config.app_origin.clone(),
    );
    let access_gate = AccessGateUseCases::new(subscription_repo_arc, config.gate_read_timeout);
    let profile_use_cases = ProfileUseCases::new(profile_repo_arc);

    Ok(AppState {
        config: Arc::new(config),
        billing_use_cases: Arc::new(billing_use_cases),
        access_gate: Arc::new(access_gate),
        profile_use_cases: Arc::new(profile_use_cases),
    })
}

/// One adapter per configured provider, created once for the process.
pub fn build_provider_registry(config: &AppConfig) -> anyhow::Result<PaymentProviderRegistry> {
    let mut registry = PaymentProviderRegistry::new();

    if let Some(card) = &config.card_checkout {
        let adapter = StripePaymentAdapter::new(
            card.secret_key.clone(),
            card.webhook_secret.clone(),
            card.api_base.clone(),
        )?;
        registry = registry.with_provider(Arc::new(adapter) as Arc<dyn PaymentProviderPort>);
    }

    if let Some(boleto_pix) = &config.boleto_pix {
        let adapter = AsaasPaymentAdapter::new(
            boleto_pix.api_key.clone(),
            boleto_pix.webhook_token.clone(),
            boleto_pix.api_base.clone(),
        )?;
        registry = registry.with_provider(Arc::new(adapter) as Arc<dyn PaymentProviderPort>);
    }

    let configured = registry.configured();
    if configured.is_empty() {
        tracing::warn!("No payment provider configured; checkout is disabled");
    } else {
        tracing::info!(providers = ?configured, "Payment providers configured");
    }

    Ok(registry)
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketplace_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    // File (structured JSON logs), skipped when the working dir is read-only
    let json_layer = File::create("app.log").ok().map(|file| {
        fmt::layer()
            .json()
            .with_writer(file)
            .with_current_span(true)
            .with_span_list(true)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
