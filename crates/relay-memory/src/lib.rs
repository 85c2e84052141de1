pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{load_histories, save_histories, Histories, HistoryStore};
