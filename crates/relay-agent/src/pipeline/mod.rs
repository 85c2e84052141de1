pub mod assemble;
pub mod chunk;
pub mod context;
pub mod process;
pub mod relay;
pub mod select;
pub mod summarize;

pub use assemble::PromptAssembler;
pub use chunk::{chunk, clean_text, ChunkedDocument};
pub use context::{MessageContext, Outbound};
pub use process::process_turn;
pub use relay::format_reply;
pub use select::select_context;
pub use summarize::MapReduceSummarizer;
