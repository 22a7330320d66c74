use crate::config::Config;
use crate::error::NotesError;
use crate::models::{self, CreateNote, NoteRecord};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Url};

/// Client for the Memos notes collection endpoint.
#[derive(Debug, Clone)]
pub struct NotesClient {
    client: Client,
    api_url: Url,
    authorization: String,
}

impl NotesClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_url: config.memos_api.clone(),
            authorization: config.memos_token.clone(),
        }
    }

    /// Fetches the collection. Order is whatever the server returns.
    pub async fn list(&self) -> Result<Vec<NoteRecord>, NotesError> {
        let response = self
            .client
            .get(self.api_url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(NotesError::Status { status, body });
        }

        Ok(models::parse_note_list(&body)?)
    }

    /// Appends a note. A non-success status carries the response body verbatim.
    pub async fn create(&self, content: &str) -> Result<(), NotesError> {
        let response = self
            .client
            .post(self.api_url.clone())
            .header(AUTHORIZATION, &self.authorization)
            .json(&CreateNote { content })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await?;
        Err(NotesError::Status { status, body })
    }
}
