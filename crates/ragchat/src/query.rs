use serde::{Deserialize, Serialize};

use crate::models::{ChatBody, ContextFilter, Message};

/// Flags copied into every chat request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Answer using the ingested documents as context. Also turns on source citations.
    pub use_context: bool,
    /// Stream the answer as it is generated.
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_filter: Option<ContextFilter>,
}

/// Creates the chat request body from the conversation history.
pub fn chat_body(history: &[Message], options: &QueryOptions) -> ChatBody {
    ChatBody {
        messages: history.to_vec(),
        use_context: options.use_context,
        context_filter: options.context_filter.clone(),
        include_sources: options.use_context,
        stream: options.stream,
    }
}
