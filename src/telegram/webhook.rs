use crate::config::Config;
use crate::error::WebhookError;
use crate::models::SetWebhook;
use reqwest::header::HeaderMap;
use reqwest::{Client, Url};

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Builds `<origin><webhook_path>?secret=<secret>`. Any path or query already on
/// `origin` is replaced.
pub fn callback_url(origin: &Url, webhook_path: &str, secret: &str) -> Url {
    let mut url = origin.clone();
    url.set_path(webhook_path);
    url.set_fragment(None);
    url.query_pairs_mut().clear().append_pair("secret", secret);
    url
}

/// The origin this relay is reachable at: the configured public URL, or the
/// request's `Host` header. Telegram only delivers to HTTPS, so that is the
/// scheme unless a proxy says otherwise.
pub fn request_origin(config: &Config, headers: &HeaderMap) -> Result<Url, WebhookError> {
    if let Some(ref public_url) = config.public_url {
        return Ok(public_url.clone());
    }

    let host = headers
        .get(reqwest::header::HOST)
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| WebhookError::InvalidUrl("(request has no Host header)".to_string()))?;
    let scheme = headers
        .get(FORWARDED_PROTO)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("https");

    let origin = format!("{scheme}://{host}");
    Url::parse(&origin).map_err(|e| WebhookError::InvalidUrl(format!("{origin}: {e}")))
}

/// Calls `setWebhook` and returns the upstream body as-is, whatever its status.
pub async fn register(client: &Client, config: &Config, origin: &Url) -> Result<String, WebhookError> {
    let callback = callback_url(origin, &config.webhook_path, &config.webhook_secret);
    let endpoint = format!(
        "{}/bot{}/setWebhook",
        config.telegram_api_url.as_str().trim_end_matches('/'),
        config.telegram_bot_token
    );

    let response = client
        .post(endpoint)
        .json(&SetWebhook {
            url: callback.as_str(),
        })
        .send()
        .await
        .map_err(redact)?;

    let status = response.status();
    let body = response.text().await.map_err(redact)?;
    tracing::info!(
        status = status.as_u16(),
        origin = %origin.origin().ascii_serialization(),
        path = %config.webhook_path,
        "setWebhook answered"
    );
    Ok(body)
}

/// The request URL embeds the bot token; keep it out of logs and responses.
fn redact(e: reqwest::Error) -> WebhookError {
    WebhookError::Request(e.without_url())
}
