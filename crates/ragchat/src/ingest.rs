use std::path::Path;

use crate::client::Client;
use crate::error::Result;
use crate::models::IngestResponse;

const INGEST_API: &str = "/v1/ingest";

impl Client {
    /// Lists the ingested documents with their ids and metadata.
    pub async fn list_documents(&self) -> Result<IngestResponse> {
        self.get_json(&format!("{INGEST_API}/list")).await
    }

    /// Uploads a file to be split into documents and used as context.
    pub async fn ingest_file(&self, path: impl AsRef<Path>) -> Result<IngestResponse> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        tracing::event!(tracing::Level::INFO, "Reading {:?}...", path);
        let data = tokio::fs::read(path).await?;

        let part = reqwest::multipart::Part::bytes(data).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let text = self.post_multipart(INGEST_API, form).await?.text().await?;
        tracing::event!(tracing::Level::DEBUG, "text: {}", text);

        Ok(serde_json::from_str(&text)?)
    }

    /// Deletes an ingested document from the context store.
    pub async fn delete_document(&self, doc_id: &str) -> Result<()> {
        self.delete(&format!("{INGEST_API}/{doc_id}")).await?;
        Ok(())
    }
}
