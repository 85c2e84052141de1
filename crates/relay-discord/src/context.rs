//! Discord context interface, re-exported from the shared pipeline.

pub use relay_agent::pipeline::MessageContext as DiscordAppContext;
