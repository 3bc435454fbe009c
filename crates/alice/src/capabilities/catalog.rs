use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::builtin::builtin_tools;
use super::transport::{list_capabilities, ProviderCommand};
use crate::models::tool::Tool;

/// The set of capabilities the planner may use.
///
/// Discovery asks the live provider process once and keeps the answer, or the
/// builtin catalog if the provider could not be used, until [`CapabilityCatalog::rediscover`]
/// is called. Concurrent first callers wait for the same discovery.
pub struct CapabilityCatalog {
    provider: Option<ProviderCommand>,
    tools: Mutex<Option<Arc<[Tool]>>>,
    round_trips: AtomicUsize,
}

impl CapabilityCatalog {
    pub fn new(provider: Option<ProviderCommand>) -> Self {
        Self {
            provider,
            tools: Mutex::new(None),
            round_trips: AtomicUsize::new(0),
        }
    }

    /// A catalog that never spawns a provider
    pub fn builtin() -> Self {
        Self::new(None)
    }

    pub async fn discover(&self) -> Arc<[Tool]> {
        let mut cached = self.tools.lock().await;
        if let Some(tools) = cached.as_ref() {
            return Arc::clone(tools);
        }

        let tools: Arc<[Tool]> = self.load().await.into();
        *cached = Some(Arc::clone(&tools));
        tools
    }

    /// Forget the cached catalog and discover again
    pub async fn rediscover(&self) -> Arc<[Tool]> {
        self.tools.lock().await.take();
        self.discover().await
    }

    pub async fn find(&self, name: &str) -> Option<Tool> {
        self.discover()
            .await
            .iter()
            .find(|tool| tool.name == name)
            .cloned()
    }

    /// Number of tools discovered so far, without triggering discovery
    pub async fn discovered_count(&self) -> usize {
        self.tools.lock().await.as_ref().map_or(0, |tools| tools.len())
    }

    /// How many times the live provider has been asked for its catalog
    pub fn live_round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    async fn load(&self) -> Vec<Tool> {
        let Some(command) = &self.provider else {
            debug!("no capability provider configured, using builtin catalog");
            return builtin_tools();
        };

        self.round_trips.fetch_add(1, Ordering::SeqCst);
        match list_capabilities(command).await {
            Ok(tools) => {
                info!(count = tools.len(), program = %command.program, "discovered capabilities");
                tools
            }
            Err(e) => {
                warn!(error = %e, program = %command.program, "capability discovery failed, using builtin catalog");
                builtin_tools()
            }
        }
    }
}

impl Default for CapabilityCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
