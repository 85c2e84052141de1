//! One full exchange: user turn in, model reply out.
//!
//! The identity's lock is held from the first history read to the final
//! save, so two messages from the same person never interleave.

use relay_core::types::{ContentPart, History, IdentityKey, Role, Turn};
use relay_core::RelayError;
use tracing::{debug, info, warn};

use crate::provider::{ChatRequest, InputMessage, ProviderError};

use super::assemble::{PromptAssembler, NO_CONTENT_PLACEHOLDER};
use super::context::{MessageContext, Outbound};
use super::relay::format_reply;
use super::select::select_context;
use super::summarize::MapReduceSummarizer;

pub const API_ERROR_REPLY: &str = "⚠️ An error occurred while calling the API.";
pub const NO_RESPONSE_REPLY: &str = "⚠️ No response was received from the model.";
pub const PROGRESS_NOTICE: &str = "🔎 Analyzing your message... please wait a moment.";

pub fn welcome_notice(key: &IdentityKey) -> String {
    format!("Hello {key}! I will remember our conversations from now on 😊")
}

/// Run one exchange for `key` and relay the reply through `outbound`.
///
/// Model failures become placeholder replies and never abort the exchange.
/// The welcome and progress notices are best effort; once the user turn is
/// appended the exchange always records an assistant turn. Storage and reply
/// delivery failures are returned to the caller.
pub async fn process_turn<C: MessageContext + ?Sized>(
    ctx: &C,
    outbound: &dyn Outbound,
    key: &IdentityKey,
    turn: Turn,
) -> Result<(), RelayError> {
    let store = ctx.store();
    let _guard = store.lock_identity(key).await;

    if store.ensure_identity(key) {
        notify(outbound, key, &welcome_notice(key)).await;
    }

    store.append(key, turn);
    notify(outbound, key, PROGRESS_NOTICE).await;

    let reply = ask_model(ctx, key).await;

    store.append(key, Turn::assistant(reply.clone()));
    store.save().await?;

    for message in format_reply(key.as_str(), &reply) {
        say(outbound, &message).await?;
    }
    Ok(())
}

/// Build the request from the identity's current history and send it.
async fn ask_model<C: MessageContext + ?Sized>(ctx: &C, key: &IdentityKey) -> String {
    let config = &ctx.config().agent;
    let provider = ctx.provider();

    let history = ctx
        .store()
        .history(key)
        .unwrap_or_else(|| History::for_identity(key));
    let mut selected = select_context(history.turns(), config.context_limit);

    // The newest turn is always sent, whatever the selection kept of it.
    let newest = history.last().filter(|t| t.role == Role::User);
    let newest_selected = matches!(
        (newest, selected.last()),
        (Some(newest), Some(last)) if std::ptr::eq(newest, *last)
    );
    if newest_selected {
        selected.pop();
    }

    let summarizer = MapReduceSummarizer::new(
        provider,
        &config.model,
        config.max_output_tokens,
        ctx.config().map_delay(),
    );
    let assembler = PromptAssembler::new(summarizer, config.pdf_char_budget, config.chunk_size);

    let newest_parts = match newest {
        Some(newest) => assembler.assemble(newest).await,
        None => vec![ContentPart::text(NO_CONTENT_PLACEHOLDER)],
    };
    let req = build_request(&config.model, config.max_output_tokens, &selected, newest_parts);
    debug!(identity = %key, input_items = req.input.len(), "sending model request");

    match provider.send(&req).await {
        Ok(resp) => {
            info!(
                identity = %key,
                model = %resp.model,
                tokens_out = resp.tokens_out,
                "model replied"
            );
            resp.content
        }
        Err(ProviderError::EmptyResponse) => {
            warn!(identity = %key, provider = %provider.name(), "model returned no text");
            NO_RESPONSE_REPLY.to_string()
        }
        Err(e) => {
            warn!(identity = %key, provider = %provider.name(), error = %e, "model call failed");
            API_ERROR_REPLY.to_string()
        }
    }
}

/// System turn → instructions, prior turns → text items, then the newest
/// turn's assembled parts. `context` must not contain the newest turn.
pub fn build_request(
    model: &str,
    max_output_tokens: u32,
    context: &[&Turn],
    newest_parts: Vec<ContentPart>,
) -> ChatRequest {
    let (instructions, prior) = match context.split_first() {
        Some((first, rest)) if first.role == Role::System => (Some(first.text.clone()), rest),
        _ => (None, context),
    };

    let mut input: Vec<InputMessage> = prior
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .map(|t| InputMessage::text(t.role, t.text.clone()))
        .collect();
    input.push(InputMessage::user(newest_parts));

    ChatRequest {
        model: model.to_string(),
        instructions,
        input,
        max_output_tokens,
    }
}

/// Status messages must not abort an exchange that already touched history.
async fn notify(outbound: &dyn Outbound, key: &IdentityKey, text: &str) {
    if let Err(reason) = outbound.say(text).await {
        warn!(identity = %key, error = %reason, "status notice not delivered");
    }
}

async fn say(outbound: &dyn Outbound, text: &str) -> Result<(), RelayError> {
    outbound.say(text).await.map_err(|reason| RelayError::Channel {
        channel: "discord".to_string(),
        reason,
    })
}
