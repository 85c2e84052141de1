use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tracing::{error, info, warn};

use relay_core::config::DiscordConfig;

use crate::context::DiscordAppContext;
use crate::error::DiscordError;
use crate::extract::Extractors;
use crate::handler::DiscordHandler;

/// Discord channel adapter.
///
/// Wraps a serenity `Client` and drives the event loop until the process exits.
/// Reconnects whenever the gateway drops.
pub struct DiscordAdapter<C: DiscordAppContext + 'static> {
    ctx: Arc<C>,
    config: DiscordConfig,
    extractors: Extractors,
}

impl<C: DiscordAppContext + 'static> DiscordAdapter<C> {
    pub fn new(ctx: Arc<C>) -> Result<Self, DiscordError> {
        let config = ctx.config().discord.clone();
        if config.bot_token.trim().is_empty() {
            return Err(DiscordError::NoToken);
        }
        let extractors = Extractors::from_config(&ctx.config().image);
        Ok(Self {
            ctx,
            config,
            extractors,
        })
    }

    /// Connect to Discord and keep reconnecting whenever the gateway drops.
    ///
    /// Never returns; runs for the lifetime of the process.
    pub async fn run(self) {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        info!(channel_id = self.config.allowed_channel_id, "Discord: listening on channel");

        loop {
            let mut client = loop {
                match self.build_client(intents).await {
                    Ok(c) => break c,
                    Err(e) => {
                        error!("Discord: connect failed ({e}), retrying in 30s");
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    }
                }
            };

            info!("Discord: gateway connecting");
            if let Err(e) = client.start().await {
                warn!("Discord: gateway error ({e}), reconnecting in 5s");
            } else {
                info!("Discord: gateway stopped cleanly, reconnecting in 5s");
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Build a fresh serenity `Client` with our event handler.
    async fn build_client(&self, intents: GatewayIntents) -> Result<Client, serenity::Error> {
        let handler = DiscordHandler {
            ctx: Arc::clone(&self.ctx),
            config: self.config.clone(),
            extractors: self.extractors.clone(),
            bot_id: OnceLock::new(),
        };

        Client::builder(&self.config.bot_token, intents)
            .event_handler(handler)
            .await
    }
}
