use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use ragchat::models::IngestedDoc;

use crate::config::Globals;
use crate::utils::print_structured;

#[derive(Clone, Parser, Debug)]
pub struct CommandOptions {
    #[command(subcommand)]
    pub command: IngestCommand,
}

#[derive(Clone, Subcommand, Debug)]
pub enum IngestCommand {
    /// List the ingested documents
    #[clap(alias = "ls")]
    List,
    /// Upload files to be used as context
    Add {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Remove an ingested document
    #[clap(alias = "rm")]
    Delete {
        /// Document id, as shown by `ingest list`
        doc_id: String,
    },
}

/// `doc_id  file (page N)`
pub fn document_line(doc: &IngestedDoc) -> String {
    let metadata = doc.doc_metadata.clone().unwrap_or_default();
    let name = metadata.file_name.unwrap_or_else(|| "-".to_string());

    match metadata.page_label {
        Some(page) => format!("{}\t{name} (page {page})", doc.doc_id),
        None => format!("{}\t{name}", doc.doc_id),
    }
}

fn print_documents(docs: &[IngestedDoc]) {
    for doc in docs {
        println!("{}", document_line(doc));
    }
}

pub async fn run(options: CommandOptions, globals: &Globals) -> Result<()> {
    let client = globals.client()?;

    match options.command {
        IngestCommand::List => {
            let response = client.list_documents().await?;
            if !print_structured(globals.format, &response.data)? {
                print_documents(&response.data);
            }
        }
        IngestCommand::Add { files } => {
            let mut ingested = Vec::new();
            for file in files {
                tracing::event!(tracing::Level::INFO, "Ingesting {:?}...", file);
                let response = client
                    .ingest_file(&file)
                    .await
                    .with_context(|| format!("can't ingest {file:?}"))?;
                ingested.extend(response.data);
            }
            if !print_structured(globals.format, &ingested)? {
                print_documents(&ingested);
            }
        }
        IngestCommand::Delete { doc_id } => {
            client.delete_document(&doc_id).await?;
            tracing::event!(tracing::Level::INFO, "Deleted {}", doc_id);
        }
    }

    Ok(())
}
