//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod index;
mod search;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use index::run_index;
pub use search::run_search;
