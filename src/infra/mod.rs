use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod asaas_client;
pub mod asaas_payment_adapter;
pub mod config;
pub mod db;
pub mod http_client;
pub mod setup;
pub mod stripe_client;
pub mod stripe_payment_adapter;
pub mod webhook_signature;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
