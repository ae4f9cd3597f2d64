use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use crate::aggregate::Aggregator;
use crate::app::error::{FreshetError, Result};
use crate::cache::ResponseCache;
use crate::config::Config;
use crate::fetcher::{ConditionalFetcher, HttpTransport, Transport};
use crate::sources::{Eonet, GitHubActivity};
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub cache: Arc<ResponseCache>,
    pub fetcher: Arc<ConditionalFetcher>,
    pub aggregator: Arc<Aggregator>,
    pub activity: GitHubActivity<SqliteStore>,
    pub eonet: Eonet,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>) -> Result<Self> {
        Self::check_endpoints(&config)?;

        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let transport: Arc<dyn Transport + Send + Sync> = Arc::new(HttpTransport::new(&config.http)?);
        Ok(Self::assemble(config, store, transport))
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        Self::check_endpoints(&config)?;

        let store = Arc::new(SqliteStore::in_memory()?);
        let transport: Arc<dyn Transport + Send + Sync> = Arc::new(HttpTransport::new(&config.http)?);
        Ok(Self::assemble(config, store, transport))
    }

    /// Wire every component around an existing store and transport.
    pub fn assemble(
        config: Config,
        store: Arc<SqliteStore>,
        transport: Arc<dyn Transport + Send + Sync>,
    ) -> Self {
        let cache = Arc::new(ResponseCache::new());
        let fetcher = Arc::new(
            ConditionalFetcher::new(transport, cache.clone()).with_policy(config.http.cache_policy),
        );
        let aggregator = Arc::new(Aggregator::with_workers(
            fetcher.clone(),
            config.aggregate.max_concurrent,
        ));
        let activity = GitHubActivity::new(
            config.github.clone(),
            aggregator.clone(),
            store.clone(),
            config.aggregate.window_capacity,
        );
        let eonet = Eonet::new(config.eonet.clone(), aggregator.clone());

        Self {
            config,
            store,
            cache,
            fetcher,
            aggregator,
            activity,
            eonet,
        }
    }

    /// Both API bases must parse before any request is built from them.
    fn check_endpoints(config: &Config) -> Result<()> {
        Url::parse(&config.github.api_base)?;
        Url::parse(&config.eonet.api_base)?;
        Ok(())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FreshetError::Other("Could not find data directory".into()))?;
        let freshet_dir = data_dir.join("freshet");
        std::fs::create_dir_all(&freshet_dir)?;
        Ok(freshet_dir.join("freshet.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::conditional::tests::StubTransport;
    use crate::fetcher::CachePolicy;

    #[test]
    fn test_assemble_shares_one_cache() {
        let mut config = Config::default();
        config.http.cache_policy = CachePolicy::Revalidate;
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let ctx = AppContext::assemble(config, store, Arc::new(StubTransport::default()));

        assert!(Arc::ptr_eq(&ctx.cache, ctx.fetcher.cache()));
        assert!(Arc::ptr_eq(&ctx.fetcher, ctx.aggregator.fetcher()));
        assert_eq!(ctx.fetcher.policy(), CachePolicy::Revalidate);
    }

    #[test]
    fn test_rejects_malformed_api_base() {
        let mut config = Config::default();
        config.eonet.api_base = "eonet.gsfc.nasa.gov/api".into();

        let result = AppContext::in_memory(config);
        assert!(matches!(result, Err(FreshetError::InvalidUrl(_))));
    }

    #[test]
    fn test_in_memory_context_builds() {
        let ctx = AppContext::in_memory(Config::default()).unwrap();
        assert!(ctx.cache.is_empty());
    }
}
