/// Error type returned from this library's functions
#[derive(thiserror::Error)]
pub enum Error {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    /// The API answered with a non-2xx status.
    #[error("api error ({status}): {body}")]
    Status { status: u16, body: String },
    /// De/serialization error
    #[error("de/serialize error: {0}")]
    Serde(#[from] serde_json::Error),
    /// A `data:` line carried something other than a completion chunk.
    #[error("malformed stream frame: {line}")]
    Frame {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    /// A complete stream line was not valid UTF-8.
    #[error("stream line is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// A stream line that is not part of the event-stream framing.
    #[error("unknown stream field: {line}")]
    UnknownField { line: String },
    /// Another send is still in progress.
    #[error("a request is already in flight")]
    InFlight,
    #[error("invalid header value")]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    /// An Error occurred when performing an IO operation.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("infallible error")]
    Infallible(#[from] std::convert::Infallible),
}

pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn format_error(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter,
) -> std::fmt::Result {
    write!(f, "{e}")?;

    let mut source = e.source();

    if e.source().is_some() {
        writeln!(f, "\ncaused by:")?;
        let mut i: usize = 0;
        while let Some(inner) = source {
            writeln!(f, "{i: >5}: {inner}")?;
            source = inner.source();
            i += 1;
        }
    }

    Ok(())
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        format_error(self, f)
    }
}
