//! Conversation state and the send actions that mutate it.
//!
//! A `ChatStore` belongs to one chat session. Sends borrow it exclusively, and each send holds a
//! [`Flight`] for its whole duration: `loading` is true while the guard lives and is cleared when
//! it drops, whether the send succeeds, fails, or its future is dropped half-way.

use futures::stream::StreamExt;

use crate::chats::Completions;
use crate::decoder::StreamEvent;
use crate::error::{Error, Result};
use crate::models::{Chunk, Message};
use crate::query::{chat_body, QueryOptions};

/// In-flight request bookkeeping.
#[derive(Debug, Default)]
pub struct RequestState {
    loading: bool,
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Marks a request as started. Fails if one is already running.
    pub fn begin(&mut self) -> Result<Flight<'_>> {
        if self.loading {
            return Err(Error::InFlight);
        }

        tracing::event!(tracing::Level::DEBUG, "loading: true");
        self.loading = true;

        Ok(Flight { state: self })
    }
}

/// Releases the loading flag on drop.
#[derive(Debug)]
pub struct Flight<'a> {
    state: &'a mut RequestState,
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        tracing::event!(tracing::Level::DEBUG, "loading: false");
        self.state.loading = false;
    }
}

/// Holds the conversation of a chat session.
#[derive(Debug, Default)]
pub struct ChatStore {
    /// Input waiting to be sent. Taken by the next send.
    pub new_message: Option<String>,
    pub options: QueryOptions,
    history: Vec<Message>,
    sources: Vec<Chunk>,
    request: RequestState,
}

impl ChatStore {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Resumes a previous conversation.
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn into_history(self) -> Vec<Message> {
        self.history
    }

    /// Context chunks cited by the last answer.
    pub fn sources(&self) -> &[Chunk] {
        &self.sources
    }

    pub fn is_loading(&self) -> bool {
        self.request.is_loading()
    }

    /// Starts a new conversation.
    pub fn clear(&mut self) {
        self.history.clear();
        self.sources.clear();
        self.new_message = None;
    }

    /// Appends a user message. Empty text is ignored.
    pub fn append_user_message(&mut self, text: &str) {
        push_user(&mut self.history, text);
    }

    /// Sends the pending input using the streaming or the non-streaming path, following
    /// `options.stream`. `on_delta` only sees text on the streaming path.
    pub async fn send<C, F>(&mut self, api: &C, on_delta: F) -> Result<()>
    where
        C: Completions,
        F: FnMut(&str),
    {
        if self.options.stream {
            self.send_streaming(api, on_delta).await
        } else {
            self.send_non_streaming(api).await
        }
    }

    /// Sends the conversation and appends every returned choice's message, in order.
    pub async fn send_non_streaming<C: Completions>(&mut self, api: &C) -> Result<()> {
        let _flight = self.request.begin()?;

        if let Some(text) = self.new_message.take() {
            push_user(&mut self.history, &text);
        }

        let body = chat_body(&self.history, &self.options);
        let completion = api.complete(&body).await?;

        self.sources.clear();
        for choice in completion.choices {
            if let Some(sources) = choice.sources {
                self.sources.extend(sources);
            }

            match choice.message {
                Some(message) => self.history.push(message),
                None => tracing::event!(
                    tracing::Level::DEBUG,
                    "Skipping choice {} without a message",
                    choice.index
                ),
            }
        }

        Ok(())
    }

    /// Sends the conversation and folds the streamed deltas into a new assistant message.
    ///
    /// The assistant message is appended once the stream is open. If the stream fails half-way
    /// the text received so far stays in the history and the error is returned.
    pub async fn send_streaming<C, F>(&mut self, api: &C, mut on_delta: F) -> Result<()>
    where
        C: Completions,
        F: FnMut(&str),
    {
        let _flight = self.request.begin()?;

        if let Some(text) = self.new_message.take() {
            push_user(&mut self.history, &text);
        }

        let body = chat_body(&self.history, &self.options);
        let mut events = api.complete_stream(&body).await?;

        self.sources.clear();
        self.history.push(Message::assistant(String::new()));
        let placeholder = self.history.len() - 1;

        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Delta { content } => {
                    let text = content.unwrap_or_default();
                    self.history[placeholder].content.push_str(&text);
                    on_delta(&text);
                }
                StreamEvent::Completed {
                    finish_reason,
                    sources,
                } => {
                    tracing::event!(
                        tracing::Level::INFO,
                        "Stopping stream due to finish_reason: {finish_reason}"
                    );
                    if let Some(sources) = sources {
                        self.sources = sources;
                    }
                    break;
                }
                StreamEvent::Done => break,
            }
        }

        Ok(())
    }
}

fn push_user(history: &mut Vec<Message>, text: &str) {
    if text.is_empty() {
        return;
    }

    history.push(Message::user(text));
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::time::Duration;

    use futures::stream::StreamExt;

    use super::*;
    use crate::chats::EventStream;
    use crate::decoder::decode;
    use crate::models::{ChatBody, Choice, Completion, IngestedDoc, Role};

    const HI: &str = "data: {\"choices\":[{\"finish_reason\":null,\"delta\":{\"content\":\"Hi\"}}]}\n";
    const DONE: &str = "data: [DONE]\n";

    /// In-memory transport. `Err` fragments become connection errors mid-stream.
    #[derive(Default)]
    struct Fake {
        completion: Completion,
        fragments: Vec<std::result::Result<&'static str, &'static str>>,
        reject: bool,
        hang: bool,
        bodies: RefCell<Vec<ChatBody>>,
    }

    impl Fake {
        fn streaming(fragments: &[&'static str]) -> Self {
            Self {
                fragments: fragments.iter().map(|f| Ok(*f)).collect(),
                ..Default::default()
            }
        }

        fn answering(messages: &[&str]) -> Self {
            let choices = messages
                .iter()
                .enumerate()
                .map(|(index, content)| Choice {
                    finish_reason: Some("stop".to_string()),
                    message: Some(Message::assistant(*content)),
                    index: index as u32,
                    ..Default::default()
                })
                .collect();

            Self {
                completion: Completion {
                    choices,
                    ..Default::default()
                },
                ..Default::default()
            }
        }

        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Default::default()
            }
        }

        fn last_body(&self) -> ChatBody {
            self.bodies.borrow().last().cloned().unwrap()
        }
    }

    impl Completions for Fake {
        async fn complete(&self, body: &ChatBody) -> Result<Completion> {
            self.bodies.borrow_mut().push(body.clone());
            if self.reject {
                return Err(Error::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(self.completion.clone())
        }

        async fn complete_stream(&self, body: &ChatBody) -> Result<EventStream> {
            self.bodies.borrow_mut().push(body.clone());
            if self.reject {
                return Err(Error::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }
            if self.hang {
                return Ok(futures::stream::pending().boxed());
            }

            let reads: Vec<std::result::Result<Vec<u8>, std::io::Error>> = self
                .fragments
                .iter()
                .map(|fragment| match fragment {
                    Ok(text) => Ok(text.as_bytes().to_vec()),
                    Err(reason) => Err(std::io::Error::new(
                        std::io::ErrorKind::ConnectionReset,
                        *reason,
                    )),
                })
                .collect();

            Ok(decode(futures::stream::iter(reads)).boxed())
        }
    }

    fn store_with_input(text: &str, options: QueryOptions) -> ChatStore {
        let mut store = ChatStore::new(options);
        store.new_message = Some(text.to_string());
        store
    }

    fn streaming() -> QueryOptions {
        QueryOptions {
            stream: true,
            ..Default::default()
        }
    }

    #[test]
    fn append_user_message_adds_one_user_message() {
        let mut store = ChatStore::default().with_history(vec![Message::assistant("Hello")]);

        store.append_user_message("What is in the report?");

        assert_eq!(store.history().len(), 2);
        assert_eq!(store.history()[1].role, Role::User);
        assert_eq!(store.history()[0], Message::assistant("Hello"));
    }

    #[test]
    fn append_user_message_ignores_empty_text() {
        let mut store = ChatStore::default();

        store.append_user_message("");

        assert!(store.history().is_empty());
    }

    #[tokio::test]
    async fn non_streaming_appends_every_choice_in_order() {
        let api = Fake::answering(&["first", "second"]);
        let mut store = store_with_input("Hi", QueryOptions::default());

        store.send_non_streaming(&api).await.unwrap();

        assert_eq!(
            store.history(),
            &[
                Message::user("Hi"),
                Message::assistant("first"),
                Message::assistant("second")
            ]
        );
        assert!(!store.is_loading());
        assert_eq!(store.new_message, None);
        assert_eq!(api.last_body().messages, vec![Message::user("Hi")]);
    }

    #[tokio::test]
    async fn non_streaming_failure_propagates_and_releases_loading() {
        let api = Fake::rejecting();
        let mut store = store_with_input("Hi", QueryOptions::default());

        let err = store.send_non_streaming(&api).await.unwrap_err();

        assert!(matches!(err, Error::Status { status: 500, .. }));
        assert!(!store.is_loading());
        assert_eq!(store.history(), &[Message::user("Hi")]);
    }

    #[tokio::test]
    async fn non_streaming_without_input_sends_the_history_as_is() {
        let api = Fake::answering(&["again"]);
        let mut store = ChatStore::default().with_history(vec![Message::user("Hi")]);

        store.send_non_streaming(&api).await.unwrap();

        assert_eq!(api.last_body().messages, vec![Message::user("Hi")]);
        assert_eq!(store.history().len(), 2);
    }

    #[tokio::test]
    async fn non_streaming_records_sources() {
        let chunk = Chunk {
            object: "context.chunk".to_string(),
            score: 0.42,
            document: IngestedDoc {
                object: "ingest.document".to_string(),
                doc_id: "doc-1".to_string(),
                doc_metadata: None,
            },
            text: "Outbound sales increased 20%".to_string(),
            previous_texts: None,
            next_texts: None,
        };
        let mut api = Fake::answering(&["Sales went up."]);
        api.completion.choices[0].sources = Some(vec![chunk.clone()]);
        let options = QueryOptions {
            use_context: true,
            ..Default::default()
        };
        let mut store = store_with_input("How did sales do?", options);

        store.send_non_streaming(&api).await.unwrap();

        assert_eq!(store.sources(), &[chunk]);
        assert!(api.last_body().include_sources);
    }

    #[tokio::test]
    async fn streaming_folds_deltas_into_the_placeholder() {
        let api = Fake::streaming(&[HI, DONE]);
        let mut store = store_with_input("Hello", streaming());
        let mut seen = Vec::new();

        store
            .send_streaming(&api, |text| seen.push(text.to_string()))
            .await
            .unwrap();

        assert_eq!(
            store.history(),
            &[Message::user("Hello"), Message::assistant("Hi")]
        );
        assert_eq!(seen, vec!["Hi".to_string()]);
        assert!(!store.is_loading());
        assert_eq!(api.last_body().messages, vec![Message::user("Hello")]);
        assert!(api.last_body().stream);
    }

    #[tokio::test]
    async fn streaming_concatenates_fragments_split_mid_frame() {
        let api = Fake::streaming(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\ndata: {\"choi",
            "ces\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            DONE,
        ]);
        let mut store = store_with_input("Hi", streaming());

        store.send_streaming(&api, |_| {}).await.unwrap();

        assert_eq!(store.history()[1], Message::assistant("Hello"));
    }

    #[tokio::test]
    async fn streaming_stops_folding_at_the_first_completion() {
        let api = Fake::streaming(&[
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\
             data: {\"choices\":[{\"finish_reason\":\"stop\",\"delta\":{\"content\":\"x\"}}]}\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
            DONE,
        ]);
        let mut store = store_with_input("Hi", streaming());

        store.send_streaming(&api, |_| {}).await.unwrap();

        assert_eq!(store.history()[1].content, "a");
    }

    #[tokio::test]
    async fn streaming_treats_missing_content_as_empty() {
        let api = Fake::streaming(&[
            "data: {\"choices\":[{\"finish_reason\":null,\"delta\":{}}]}\n",
            HI,
            DONE,
        ]);
        let mut store = store_with_input("Hi", streaming());

        store.send_streaming(&api, |_| {}).await.unwrap();

        assert_eq!(store.history()[1].content, "Hi");
    }

    #[tokio::test]
    async fn streaming_keeps_partial_content_on_error() {
        let mut api = Fake::streaming(&[HI]);
        api.fragments.push(Err("connection reset"));
        let mut store = store_with_input("Hi", streaming());

        let err = store.send_streaming(&api, |_| {}).await.unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert_eq!(store.history()[1], Message::assistant("Hi"));
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn streaming_keeps_partial_content_on_malformed_frame() {
        let api = Fake::streaming(&[HI, "data: {not json}\n", HI]);
        let mut store = store_with_input("Hi", streaming());

        let err = store.send_streaming(&api, |_| {}).await.unwrap_err();

        assert!(matches!(err, Error::Frame { .. }));
        assert_eq!(store.history()[1].content, "Hi");
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn streaming_rejection_appends_no_placeholder() {
        let api = Fake::rejecting();
        let mut store = store_with_input("Hi", streaming());

        let err = store.send_streaming(&api, |_| {}).await.unwrap_err();

        assert!(matches!(err, Error::Status { status: 503, .. }));
        assert_eq!(store.history(), &[Message::user("Hi")]);
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn dropping_a_send_releases_loading() {
        let api = Fake {
            hang: true,
            ..Default::default()
        };
        let mut store = store_with_input("Hi", streaming());

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), store.send_streaming(&api, |_| {}))
                .await;

        assert!(timed_out.is_err());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn a_second_send_is_rejected_while_one_is_in_flight() {
        let api = Fake::answering(&["never"]);
        let mut store = store_with_input("Hi", QueryOptions::default());
        std::mem::forget(store.request.begin().unwrap());

        let err = store.send(&api, |_| {}).await.unwrap_err();

        assert!(matches!(err, Error::InFlight));
        assert!(store.history().is_empty());
        assert_eq!(store.new_message.as_deref(), Some("Hi"));
        assert!(api.bodies.borrow().is_empty());
    }

    #[tokio::test]
    async fn send_follows_the_stream_flag() {
        let api = Fake::streaming(&[HI, DONE]);
        let mut store = store_with_input("Hi", streaming());

        store.send(&api, |_| {}).await.unwrap();
        assert_eq!(store.history()[1].content, "Hi");

        let api = Fake::answering(&["Hey"]);
        store.options.stream = false;
        store.new_message = Some("Again".to_string());

        store.send(&api, |_| {}).await.unwrap();
        assert_eq!(store.history().last(), Some(&Message::assistant("Hey")));
        assert!(!api.last_body().stream);
    }

    #[test]
    fn clear_resets_the_conversation() {
        let mut store = ChatStore::default().with_history(vec![Message::user("Hi")]);
        store.new_message = Some("pending".to_string());

        store.clear();

        assert!(store.history().is_empty());
        assert_eq!(store.new_message, None);
    }
}
