use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use url::Url;

pub const DEFAULT_CARD_CHECKOUT_API_BASE: &str = "https://api.stripe.com/v1";
pub const DEFAULT_BOLETO_PIX_API_BASE: &str = "https://api.asaas.com/v3";

/// Stripe credentials. Absent when `CARD_CHECKOUT_SECRET_KEY` is unset.
pub struct CardCheckoutConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
    pub api_base: String,
}

/// Asaas credentials. Absent when `BOLETO_PIX_API_KEY` is unset.
pub struct BoletoPixConfig {
    pub api_key: SecretString,
    pub webhook_token: SecretString,
    pub api_base: String,
}

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub app_origin: Url,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    /// Upper bound on the subscription read behind the access gate.
    pub gate_read_timeout: std::time::Duration,
    pub card_checkout: Option<CardCheckoutConfig>,
    pub boleto_pix: Option<BoletoPixConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret: SecretString = SecretString::from(get_env::<String>("JWT_SECRET"));
        let app_origin: Url = get_env("APP_ORIGIN");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|e| anyhow::anyhow!("CORS_ORIGIN must be a valid header value: {e}"))?;
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let database_url: String = get_env("DATABASE_URL");
        let gate_read_timeout_ms: u64 = get_env_default("GATE_READ_TIMEOUT_MS", 2000);

        let (card_checkout, boleto_pix) = provider_configs(|key| std::env::var(key).ok())?;

        Ok(Self {
            jwt_secret,
            app_origin,
            cors_origin,
            bind_addr,
            database_url,
            gate_read_timeout: std::time::Duration::from_millis(gate_read_timeout_ms),
            card_checkout,
            boleto_pix,
        })
    }
}

/// Reads provider credentials through `lookup`. A provider is enabled by its
/// API key; once enabled its webhook secret is mandatory.
pub fn provider_configs(
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<(Option<CardCheckoutConfig>, Option<BoletoPixConfig>)> {
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let card_checkout = match get("CARD_CHECKOUT_SECRET_KEY") {
        Some(secret_key) => {
            let webhook_secret = get("CARD_CHECKOUT_WEBHOOK_SECRET").ok_or_else(|| {
                anyhow::anyhow!("CARD_CHECKOUT_WEBHOOK_SECRET is required with CARD_CHECKOUT_SECRET_KEY")
            })?;
            Some(CardCheckoutConfig {
                secret_key: SecretString::from(secret_key),
                webhook_secret: SecretString::from(webhook_secret),
                api_base: get("CARD_CHECKOUT_API_BASE")
                    .unwrap_or_else(|| DEFAULT_CARD_CHECKOUT_API_BASE.to_string()),
            })
        }
        None => None,
    };

    let boleto_pix = match get("BOLETO_PIX_API_KEY") {
        Some(api_key) => {
            let webhook_token = get("BOLETO_PIX_WEBHOOK_TOKEN").ok_or_else(|| {
                anyhow::anyhow!("BOLETO_PIX_WEBHOOK_TOKEN is required with BOLETO_PIX_API_KEY")
            })?;
            Some(BoletoPixConfig {
                api_key: SecretString::from(api_key),
                webhook_token: SecretString::from(webhook_token),
                api_base: get("BOLETO_PIX_API_BASE")
                    .unwrap_or_else(|| DEFAULT_BOLETO_PIX_API_BASE.to_string()),
            })
        }
        None => None,
    };

    Ok((card_checkout, boleto_pix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_keys_means_no_providers() {
        let (card, boleto) = provider_configs(lookup(&[])).unwrap();
        assert!(card.is_none());
        assert!(boleto.is_none());
    }

    #[test]
    fn provider_defaults_api_base() {
        let (card, boleto) = provider_configs(lookup(&[
            ("CARD_CHECKOUT_SECRET_KEY", "sk_test_1"),
            ("CARD_CHECKOUT_WEBHOOK_SECRET", "whsec_1"),
            ("BOLETO_PIX_API_KEY", "aact_1"),
            ("BOLETO_PIX_WEBHOOK_TOKEN", "tok"),
            ("BOLETO_PIX_API_BASE", "https://sandbox.asaas.com/api/v3"),
        ]))
        .unwrap();
        assert_eq!(card.unwrap().api_base, DEFAULT_CARD_CHECKOUT_API_BASE);
        assert_eq!(boleto.unwrap().api_base, "https://sandbox.asaas.com/api/v3");
    }

    #[test]
    fn key_without_webhook_secret_is_an_error() {
        assert!(provider_configs(lookup(&[("CARD_CHECKOUT_SECRET_KEY", "sk_test_1")])).is_err());
        assert!(provider_configs(lookup(&[("BOLETO_PIX_API_KEY", "aact_1")])).is_err());
    }

    #[test]
    fn blank_key_is_treated_as_unset() {
        let (card, _) = provider_configs(lookup(&[("CARD_CHECKOUT_SECRET_KEY", "  ")])).unwrap();
        assert!(card.is_none());
    }
}
