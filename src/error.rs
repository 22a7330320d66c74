use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum NotesError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Invalid public URL {0}")]
    InvalidUrl(String),

    #[error("setWebhook request failed: {0}")]
    Request(#[source] reqwest::Error),
}
