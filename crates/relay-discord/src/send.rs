use std::sync::Arc;

use async_trait::async_trait;
use serenity::http::Http;
use serenity::model::id::ChannelId;

use relay_agent::pipeline::Outbound;
use relay_core::RelayError;

/// Posts pipeline output to one Discord channel over the REST API.
pub struct ChannelOutbound {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl ChannelOutbound {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl Outbound for ChannelOutbound {
    async fn say(&self, text: &str) -> Result<(), String> {
        self.channel_id
            .say(&self.http, text)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Generic notice sent when an exchange fails outside the model call.
pub fn failure_notice(err: &RelayError) -> String {
    format!("⚠️ An error occurred: {err}")
}
