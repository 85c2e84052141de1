use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::prelude::{Context, EventHandler};
use tracing::{debug, error, info};

use relay_agent::pipeline::{process_turn, Outbound};
use relay_core::config::DiscordConfig;

use crate::attach;
use crate::context::DiscordAppContext;
use crate::extract::Extractors;
use crate::send::{failure_notice, ChannelOutbound};

/// Serenity event handler wired to the relay pipeline.
pub struct DiscordHandler<C: DiscordAppContext + 'static> {
    pub ctx: Arc<C>,
    pub config: DiscordConfig,
    pub extractors: Extractors,
    pub bot_id: OnceLock<UserId>,
}

#[async_trait]
impl<C: DiscordAppContext + 'static> EventHandler for DiscordHandler<C> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_id.set(ready.user.id).ok();
        info!(
            name = %ready.user.name,
            identities = self.ctx.store().len(),
            "Discord bot connected"
        );
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if self.bot_id.get() == Some(&msg.author.id) {
            return;
        }
        if msg.channel_id.get() != self.config.allowed_channel_id {
            return;
        }

        let content = msg.content.trim().to_string();
        if content.is_empty() && msg.attachments.is_empty() {
            return;
        }

        let display_name = display_name(&msg);
        let key = self.ctx.identities().resolve(&display_name);
        debug!(display_name = %display_name, identity = %key, "message accepted");

        let app = Arc::clone(&self.ctx);
        let outbound = ChannelOutbound::new(Arc::clone(&ctx.http), msg.channel_id);
        let extractors = self.extractors.clone();
        let max_bytes = self.config.max_attachment_bytes;
        let attachments = msg.attachments.clone();

        tokio::spawn(async move {
            let Some(turn) =
                attach::prepare_turn(&content, &attachments, max_bytes, &extractors).await
            else {
                debug!(identity = %key, "nothing usable in message, ignored");
                return;
            };

            if let Err(e) = process_turn(app.as_ref(), &outbound, &key, turn).await {
                error!(identity = %key, code = e.code(), error = %e, "exchange failed");
                let _ = outbound.say(&failure_notice(&e)).await;
            }
        });
    }
}

/// Server nickname if set, otherwise the account's display name.
fn display_name(msg: &Message) -> String {
    msg.member
        .as_ref()
        .and_then(|m| m.nick.clone())
        .unwrap_or_else(|| msg.author.display_name().to_string())
}
