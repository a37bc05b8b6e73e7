use std::{sync::Arc, time::Duration};

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn},
    db_access::QueryCache,
    dto::dresses::DressPage,
    payment_gateway::PaymentGateway,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub dress_cache: QueryCache<DressPage>,
    pub gateway: PaymentGateway,
}

impl AppState {
    pub fn new(pool: DbPool, orm: OrmConn, config: AppConfig) -> anyhow::Result<Self> {
        let dress_cache = QueryCache::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        );
        let gateway = PaymentGateway::new(&config.payment)?;
        Ok(Self {
            pool,
            orm,
            config: Arc::new(config),
            dress_cache,
            gateway,
        })
    }
}
