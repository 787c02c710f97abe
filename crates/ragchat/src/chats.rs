use std::future::Future;

use futures::stream::{BoxStream, StreamExt};

use crate::client::Client;
use crate::decoder::{decode, StreamEvent};
use crate::error::Result;
use crate::models::{ChatBody, Completion};

// Chat Completion API
const CHAT_API: &str = "/v1/chat/completions";

/// Stream of decoded completion events.
pub type EventStream = BoxStream<'static, Result<StreamEvent>>;

/// Something that can answer chat requests.
pub trait Completions {
    /// Sends the body and waits for the whole completion.
    fn complete(&self, body: &ChatBody) -> impl Future<Output = Result<Completion>>;

    /// Sends the body and returns the decoded event stream once the response headers arrive.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the request can't be sent or the API answers with a non-2xx status.
    /// Errors while reading the body are yielded by the stream.
    fn complete_stream(&self, body: &ChatBody) -> impl Future<Output = Result<EventStream>>;
}

impl Completions for Client {
    async fn complete(&self, body: &ChatBody) -> Result<Completion> {
        let request = serde_json::to_string(body)?;

        let text = self.post(CHAT_API, request).await?.text().await?;
        tracing::event!(tracing::Level::DEBUG, "text: {}", text);

        Ok(serde_json::from_str(&text)?)
    }

    async fn complete_stream(&self, body: &ChatBody) -> Result<EventStream> {
        let request = serde_json::to_string(body)?;

        let response = self.post(CHAT_API, request).await?;
        tracing::event!(tracing::Level::DEBUG, "Streaming output...");

        Ok(decode(response.bytes_stream()).boxed())
    }
}
