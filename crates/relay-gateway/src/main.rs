use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use relay_agent::openai::OpenAiProvider;
use relay_agent::provider::LlmProvider;
use relay_core::config::RelayConfig;
use relay_discord::DiscordAdapter;
use relay_memory::HistoryStore;
use relay_users::IdentityResolver;

mod app;

#[derive(Parser)]
#[command(name = "relay-gateway")]
#[command(about = "Discord relay to a language-model API with per-user memory", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./relay.toml).
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relay_gateway=info,relay_discord=info,relay_agent=info,relay_memory=info".into()
            }),
        )
        .init();

    let cli = Cli::parse();
    let config = RelayConfig::load(cli.config.as_deref())?;

    let store = HistoryStore::load(&config.storage.history_path);

    let identities = IdentityResolver::from_config(&config.identity);
    let provider = build_provider(&config);

    let state = Arc::new(app::AppState::new(config, provider, store, identities));

    let adapter = DiscordAdapter::new(state)?;
    adapter.run().await;
    Ok(())
}

fn build_provider(config: &RelayConfig) -> Box<dyn LlmProvider> {
    let openai = &config.providers.openai;
    info!(model = %config.agent.model, base_url = %openai.base_url, "LLM provider: OpenAI");
    Box::new(OpenAiProvider::new(
        openai.api_key.clone(),
        Some(openai.base_url.clone()),
    ))
}
