use relay_agent::pipeline::MessageContext;
use relay_agent::provider::LlmProvider;
use relay_core::config::RelayConfig;
use relay_memory::HistoryStore;
use relay_users::IdentityResolver;

/// Central shared state, passed as `Arc<AppState>` to the Discord adapter.
pub struct AppState {
    pub config: RelayConfig,
    pub provider: Box<dyn LlmProvider>,
    pub store: HistoryStore,
    pub identities: IdentityResolver,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        provider: Box<dyn LlmProvider>,
        store: HistoryStore,
        identities: IdentityResolver,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            identities,
        }
    }
}

impl MessageContext for AppState {
    fn config(&self) -> &RelayConfig {
        &self.config
    }

    fn provider(&self) -> &dyn LlmProvider {
        self.provider.as_ref()
    }

    fn store(&self) -> &HistoryStore {
        &self.store
    }

    fn identities(&self) -> &IdentityResolver {
        &self.identities
    }
}
