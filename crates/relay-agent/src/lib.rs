pub mod openai;
pub mod pipeline;
pub mod provider;
