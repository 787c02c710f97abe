use std::io::Write;
use std::sync::{Arc, Mutex};

use clap::Parser;
use color_eyre::eyre::Result;
use ragchat::models::Chunk;
use ragchat::{ChatStore, ContextFilter, Message, QueryOptions};
use serde::Serialize;
use spinner::Spinner;

use crate::config::Globals;
use crate::session::Session;
use crate::utils::{print_structured, read_from_stdin};
use crate::Output;

#[derive(Default, Clone, Parser, Debug)]
pub struct CommandOptions {
    /// The content of the message to be sent. Use `-` to read it from stdin. Without a prompt
    /// the stored conversation is sent as is.
    pub prompt: Option<String>,
    /// Chat session name. Will be used to store previous session interactions.
    #[arg(long, env = "R_SESSION")]
    pub session: Option<String>,
    /// Answer using the ingested documents as context.
    #[arg(long, env = "R_USE_CONTEXT")]
    pub use_context: bool,
    /// Stream the answer as it is generated.
    #[arg(long, env = "R_STREAM")]
    pub stream: bool,
    /// Restrict the context to these documents. Can be repeated.
    #[arg(long = "doc-id")]
    pub doc_ids: Vec<String>,
    /// Don't show the loading spinner.
    #[arg(long, env = "R_QUIET")]
    pub quiet: bool,
    /// Forget the stored conversation before sending.
    #[arg(long)]
    pub clear: bool,
}

/// What the structured output formats print for a single exchange.
#[derive(Debug, Serialize)]
struct Answer<'a> {
    messages: &'a [Message],
    sources: &'a [Chunk],
}

/// Applies the command flags on top of the session options. Flags can only turn features on.
pub fn merge_options(mut options: QueryOptions, command: &CommandOptions) -> QueryOptions {
    if command.use_context {
        options.use_context = true;
    }

    if command.stream {
        options.stream = true;
    }

    if !command.doc_ids.is_empty() {
        options.context_filter = Some(ContextFilter {
            docs_ids: command.doc_ids.clone(),
        });
    }

    options
}

/// One line per cited chunk: `file (page N) [score]`.
pub fn source_label(chunk: &Chunk) -> String {
    let metadata = chunk.document.doc_metadata.clone().unwrap_or_default();
    let name = metadata
        .file_name
        .unwrap_or_else(|| chunk.document.doc_id.clone());

    match metadata.page_label {
        Some(page) => format!("{name} (page {page}) [{:.2}]", chunk.score),
        None => format!("{name} [{:.2}]", chunk.score),
    }
}

fn stop(spinner: &Arc<Mutex<Spinner>>) {
    if let Ok(mut spinner) = spinner.lock() {
        spinner.stop();
    }
}

fn fail(spinner: &Arc<Mutex<Spinner>>, msg: &str) {
    if let Ok(mut spinner) = spinner.lock() {
        spinner.error(msg);
    }
}

fn print_sources(sources: &[Chunk]) {
    if sources.is_empty() {
        return;
    }

    println!();
    println!("Sources:");
    for chunk in sources {
        println!("  - {}", source_label(chunk));
    }
}

pub async fn run(options: CommandOptions, globals: &Globals) -> Result<()> {
    let quiet = options.quiet || globals.config.quiet.unwrap_or_default();

    tracing::event!(tracing::Level::INFO, "Parsing prompt...");
    let prompt = match options.prompt.as_deref() {
        Some("-") => Some(read_from_stdin()?.trim().to_string()),
        Some(prompt) => Some(prompt.to_string()),
        None => None,
    };

    let mut session = Session::open(options.session.clone())?;
    if session.is_fresh() {
        session.options = globals.config.query_options();
    }
    session.options = merge_options(session.options.clone(), &options);
    tracing::event!(
        tracing::Level::DEBUG,
        "session {} options: {:?}",
        session.id(),
        session.options
    );

    let mut store = ChatStore::new(session.options.clone())
        .with_history(std::mem::take(&mut session.history));
    if options.clear {
        tracing::event!(tracing::Level::INFO, "Clearing conversation...");
        store.clear();
    }
    store.new_message = prompt;

    let spinner = if quiet {
        Arc::new(Mutex::new(Spinner::hidden()))
    } else {
        Spinner::with_phrases(2000)
    };

    let client = globals.client()?;
    let before = store.history().len();
    let stream = session.options.stream;
    let raw = globals.format == Output::Raw;

    let result = store
        .send(&client, |text| {
            stop(&spinner);
            if raw {
                print!("{text}");
                let _ = std::io::stdout().flush();
            }
        })
        .await;

    match &result {
        Ok(()) => stop(&spinner),
        Err(e) => fail(&spinner, &e.to_string()),
    }

    let sources = store.sources().to_vec();
    let history = store.into_history();
    // The new user message and every answer to it.
    let exchange = &history[before.min(history.len())..];

    if result.is_ok() {
        let answer = Answer {
            messages: exchange,
            sources: &sources,
        };

        if !print_structured(globals.format, &answer)? {
            if stream {
                println!();
            } else {
                for message in exchange.iter().filter(|m| m.role == ragchat::Role::Assistant) {
                    println!("{}", message.content.trim());
                }
            }

            if session.options.use_context {
                print_sources(&sources);
            }
        }
    }

    session.history = history;
    session.save()?;

    Ok(result?)
}
