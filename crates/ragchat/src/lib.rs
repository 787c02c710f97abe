//! Client for a retrieval-augmented chat service.
//!
//! [`client::Client`] talks HTTP, [`decoder`] turns a streamed completion into
//! [`decoder::StreamEvent`]s and [`store::ChatStore`] folds answers into the conversation.

pub mod chats;
pub mod client;
pub mod decoder;
pub mod error;
mod ingest;
pub mod models;
pub mod query;
pub mod store;
mod users;

pub use chats::{Completions, EventStream};
pub use client::Client;
pub use decoder::StreamEvent;
pub use error::{Error, Result};
pub use models::{ChatBody, Completion, ContextFilter, Message, Role};
pub use query::QueryOptions;
pub use store::ChatStore;
