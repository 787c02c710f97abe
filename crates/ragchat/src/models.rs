use serde::{Deserialize, Serialize};

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    /// The person typing the prompt
    User,
    /// The model answering it
    Assistant,
}

/// Represents a chat message
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Creates a new message
    pub fn new(content: impl Into<String>, role: Role) -> Self {
        Self {
            content: content.into(),
            role,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content, Role::User)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(content, Role::Assistant)
    }
}

/// Restricts the retrieval step to a set of ingested documents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextFilter {
    pub docs_ids: Vec<String>,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatBody {
    pub messages: Vec<Message>,
    /// Answer using the ingested documents as context.
    pub use_context: bool,
    /// Always serialized, as `null` when no filter is set.
    pub context_filter: Option<ContextFilter>,
    /// Return the chunks used as context along with the answer.
    pub include_sources: bool,
    /// Stream back partial progress as `data:` lines, terminated by `data: [DONE]`.
    pub stream: bool,
}

/// Chat completion response. The same shape is used for each streamed chunk.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Completion {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub delta: Option<Delta>,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub sources: Option<Vec<Chunk>>,
    #[serde(default)]
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// A piece of an ingested document that was used as context for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub object: String,
    pub score: f64,
    pub document: IngestedDoc,
    pub text: String,
    #[serde(default)]
    pub previous_texts: Option<Vec<String>>,
    #[serde(default)]
    pub next_texts: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocMetadata {
    #[serde(default)]
    pub page_label: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestedDoc {
    pub object: String,
    pub doc_id: String,
    #[serde(default)]
    pub doc_metadata: Option<DocMetadata>,
}

/// Response of the ingestion endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub object: String,
    pub model: String,
    pub data: Vec<IngestedDoc>,
}

/// A user profile. Only the identifying fields are typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
