//! The edge engine: router, executors and generations behind the
//! [`Lifecycle`] triggers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use edge_cache_core::{AppConfig, CacheDb, Error, GenerationManager};
use futures_util::future::join_all;
use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{CacheMode, Network, canonicalize};
use crate::lifecycle::{
    ActivationOutcome, ClientInfo, ClientRegistry, ControlMessage, FetchDecision, InstallReport, Lifecycle,
    MessageOutcome, PrecacheFailure, WorkerState,
};
use crate::request::EdgeRequest;
use crate::router::{BypassReason, Route, Router};
use crate::strategy::{self, StrategyContext};
use crate::tasks::BackgroundTasks;

/// Edge caching engine for one deploy.
pub struct EdgeEngine {
    ctx: StrategyContext,
    router: Router,
    clients: ClientRegistry,
    precache: Vec<Url>,
    skip_waiting: bool,
    skip_requested: AtomicBool,
    state: RwLock<WorkerState>,
}

impl EdgeEngine {
    /// Build an engine from configuration.
    ///
    /// Relative pre-population paths resolve against the first application
    /// origin.
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let router = Router::from_config(config).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let origins = config.origin_urls().map_err(|e| Error::InvalidInput(e.to_string()))?;
        let base = origins.first();

        let precache = config
            .precache
            .iter()
            .map(|path| canonicalize(path, base).map_err(|e| Error::InvalidUrl(format!("precache {path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let generations =
            Arc::new(GenerationManager::new(db, config.cache_tag.clone()).with_max_entry_bytes(config.max_bytes));
        Ok(Self::from_parts(generations, network, router, precache, config.skip_waiting))
    }

    pub fn from_parts(
        generations: Arc<GenerationManager>, network: Arc<dyn Network>, router: Router, precache: Vec<Url>,
        skip_waiting: bool,
    ) -> Self {
        Self {
            ctx: StrategyContext { network, generations, tasks: BackgroundTasks::new() },
            router,
            clients: ClientRegistry::new(),
            precache,
            skip_waiting,
            skip_requested: AtomicBool::new(false),
            state: RwLock::new(WorkerState::Uninstalled),
        }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn generations(&self) -> &GenerationManager {
        &self.ctx.generations
    }

    pub fn precache_urls(&self) -> &[Url] {
        &self.precache
    }

    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.clients.list().await
    }

    /// Wait for detached revalidations to settle.
    pub async fn wait_idle(&self) {
        self.ctx.tasks.wait_idle().await;
    }

    /// Track a consumer. `controller` is the generation already serving it.
    pub async fn open_client(&self, id: &str, url: &str, controller: Option<String>) {
        tracing::debug!(client = id, %url, ?controller, "client opened");
        self.clients.open(id, url, controller).await;
    }

    /// Forget a consumer.
    ///
    /// Closing the last consumer held by an older generation releases a
    /// waiting install into activation, whose outcome is returned.
    pub async fn close_client(&self, id: &str) -> Result<Option<ActivationOutcome>, Error> {
        if self.clients.close(id).await.is_none() {
            return Ok(None);
        }
        tracing::debug!(client = id, "client closed");

        if self.state().await == WorkerState::Installed && self.clients.held_by_other(self.tag()).await == 0 {
            tracing::info!(generation = self.tag(), "last old client closed; activating");
            return self.activate().await;
        }
        Ok(None)
    }

    fn tag(&self) -> &str {
        self.ctx.generations.tag()
    }

    async fn may_skip_waiting(&self) -> bool {
        self.skip_waiting
            || self.skip_requested.load(Ordering::SeqCst)
            || self.clients.held_by_other(self.tag()).await == 0
    }

    async fn precache_one(&self, url: &Url) -> Result<(), Error> {
        let request = EdgeRequest::get(url.as_str())?;
        let response = self.ctx.network.fetch(&request, CacheMode::Default).await?;
        if !response.is_storable() {
            return Err(Error::BadStatus(format!("{url}: {}", response.status)));
        }
        strategy::store(&self.ctx.generations, &request, &response).await
    }

    /// Fetch every pre-population URL at once. Each one succeeds or fails
    /// on its own.
    async fn precache(&self) -> (Vec<String>, Vec<PrecacheFailure>) {
        let results = join_all(self.precache.iter().map(|url| async move { (url, self.precache_one(url).await) })).await;

        let mut stored = Vec::new();
        let mut failed = Vec::new();
        for (url, result) in results {
            match result {
                Ok(()) => stored.push(url.to_string()),
                Err(e) => {
                    tracing::warn!(%url, error = %e, "precache failed");
                    failed.push(PrecacheFailure { url: url.to_string(), reason: e.to_string() });
                }
            }
        }
        (stored, failed)
    }

    /// Make this deploy's generation current and claim every client.
    ///
    /// Returns `None` when another trigger is already activating; that
    /// activation covers this one.
    async fn activate(&self) -> Result<Option<ActivationOutcome>, Error> {
        let previous = {
            let mut state = self.state.write().await;
            match *state {
                WorkerState::Installed => {
                    *state = WorkerState::Activating;
                    WorkerState::Installed
                }
                WorkerState::Active => WorkerState::Active,
                WorkerState::Activating => {
                    tracing::debug!(generation = self.tag(), "activation already in progress");
                    return Ok(None);
                }
                other => return Err(Error::InvalidState(format!("cannot activate while {other}"))),
            }
        };

        let report = match self.ctx.generations.activate_generation(self.tag()).await {
            Ok(report) => report,
            Err(e) => {
                *self.state.write().await = previous;
                return Err(e);
            }
        };

        let claimed_clients = self.clients.claim(self.tag()).await;
        *self.state.write().await = WorkerState::Active;
        self.skip_requested.store(false, Ordering::SeqCst);

        tracing::info!(
            generation = %report.current,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            claimed_clients,
            "activated"
        );
        Ok(Some(ActivationOutcome { report, claimed_clients }))
    }
}

#[async_trait]
impl Lifecycle for EdgeEngine {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        let previous = {
            let mut state = self.state.write().await;
            match *state {
                WorkerState::Uninstalled | WorkerState::Installed => {
                    let previous = *state;
                    *state = WorkerState::Installing;
                    previous
                }
                other => return Err(Error::InvalidState(format!("cannot install while {other}"))),
            }
        };

        tracing::info!(generation = self.tag(), assets = self.precache.len(), "installing");
        if let Err(e) = self.ctx.generations.create_generation(self.tag()).await {
            *self.state.write().await = previous;
            return Err(e);
        }

        let (precached, failed) = self.precache().await;
        *self.state.write().await = WorkerState::Installed;
        tracing::info!(generation = self.tag(), precached = precached.len(), failed = failed.len(), "installed");

        let activation = if self.may_skip_waiting().await {
            self.activate().await?
        } else {
            tracing::info!(generation = self.tag(), "waiting for older clients to close");
            None
        };

        Ok(InstallReport { tag: self.tag().to_string(), precached, failed, activation })
    }

    async fn on_activate(&self) -> Result<ActivationOutcome, Error> {
        self.activate()
            .await?
            .ok_or_else(|| Error::InvalidState("activation already in progress".into()))
    }

    async fn on_message(&self, message: &serde_json::Value) -> Result<MessageOutcome, Error> {
        match ControlMessage::parse(message) {
            Some(ControlMessage::SkipWaiting) => {
                self.skip_requested.store(true, Ordering::SeqCst);
                let activation =
                    if self.state().await == WorkerState::Installed { self.activate().await? } else { None };
                Ok(MessageOutcome::SkipWaiting { activation })
            }
            None => {
                tracing::debug!(%message, "ignoring unknown message");
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    async fn on_fetch(&self, request: EdgeRequest) -> Result<FetchDecision, Error> {
        if self.state().await != WorkerState::Active {
            return Ok(FetchDecision::Bypass(BypassReason::NotActive));
        }

        match self.router.route(&request) {
            Route::Bypass(reason) => {
                tracing::debug!(url = %request.url, ?reason, "bypass");
                Ok(FetchDecision::Bypass(reason))
            }
            Route::Handle(chosen) => {
                tracing::debug!(url = %request.url, strategy = chosen.as_str(), "intercept");
                let served = strategy::execute(chosen, &self.ctx, &request).await?;
                Ok(FetchDecision::Respond { strategy: chosen, served })
            }
        }
    }
}
