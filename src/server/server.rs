use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_mem::*;
use crate::infra_mysql::*;
use crate::logger::*;
use crate::settings::Settings;
use sqlx::MySqlPool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Composition root. Builds the hasher, token codec, cache, blacklist and
/// the selected store backend from settings, then hands them to the
/// services as plain constructor arguments. Also owns the background
/// sweeper that evicts expired blacklist entries.
pub struct Server {
    pub session_service: Arc<dyn SessionService>,
    pub profile_service: Arc<dyn ProfileService>,
    sweeper_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<MySqlPool>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let hasher: Arc<dyn CredentialHasher> = Arc::new(Argon2PasswordHasher);
        let codec: Arc<dyn TokenCodec> = Arc::new(JwtTokenCodec::new(JwtConfig {
            access_secret: settings.auth.access_secret.clone().into_bytes(),
            refresh_secret: settings.auth.refresh_secret.clone().into_bytes(),
            access_ttl: chrono::Duration::seconds(settings.auth.access_ttl_secs),
            refresh_ttl: chrono::Duration::seconds(settings.auth.refresh_ttl_secs),
        }));

        let cache: Arc<dyn ProfileCache> = Arc::new(InMemoryProfileCache::new(
            Duration::from_secs(settings.cache.ttl_secs),
        ));
        let blacklist = Arc::new(InMemoryTokenBlacklist::new());

        let (store, pool): (Arc<dyn UserStore>, Option<MySqlPool>) =
            match settings.store.backend.as_str() {
                "memory" => (Arc::new(MemoryUserStore::new()), None),
                "mysql" => {
                    let url = settings.store.mysql_url.as_deref().ok_or_else(|| {
                        anyhow::anyhow!("store.mysql_url is required for the mysql backend")
                    })?;
                    let pool = MySqlPool::connect(url).await?;
                    (Arc::new(MySqlUserStore::new(pool.clone())), Some(pool))
                }
                other => return Err(anyhow::anyhow!("Unknown store backend: {}", other)),
            };

        let session_service: Arc<dyn SessionService> = Arc::new(RealSessionService::new(
            store.clone(),
            hasher.clone(),
            codec,
            cache.clone(),
            blacklist.clone(),
        ));
        let profile_service: Arc<dyn ProfileService> =
            Arc::new(RealProfileService::new(store, hasher, cache));

        let cancel = CancellationToken::new();
        let sweep_every =
            Duration::from_secs(settings.blacklist.sweep_interval_secs.max(1));
        let sweep_cancel = cancel.clone();
        let sweep_blacklist = blacklist.clone();
        let sweeper_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = sweep_cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = sweep_blacklist.purge_expired();
                        if removed > 0 {
                            debug!(removed, "purged expired blacklist entries");
                        }
                    }
                }
            }
        });

        info!(backend = %settings.store.backend, "server assembled");

        Ok(Self {
            session_service,
            profile_service,
            sweeper_handle: Mutex::new(Some(sweeper_handle)),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self
            .sweeper_handle
            .lock()
            .ok()
            .and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("blacklist sweeper stopped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
