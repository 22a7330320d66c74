use memos_relay::config::Config;
use memos_relay::server::{AppState, serve};
use memos_relay::telegram::formatter;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const CHAT_ID: i64 = 4242;

struct Relay {
    base: String,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<Result<(), memos_relay::error::RelayError>>,
    _config_dir: tempfile::TempDir,
}

impl Relay {
    async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.unwrap().unwrap();
    }
}

/// Starts the relay with both the Bot API and the Memos API pointed at `upstream`.
async fn start_relay(upstream: &MockServer) -> Relay {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
            telegram_bot_token = "123:ABC"
            telegram_api_url = "{uri}"
            webhook_path = "/endpoint"
            webhook_secret = "xyz"
            memos_api = "{uri}/api/v1/memos"
            memos_token = "memos-token"
            "#,
            uri = upstream.uri()
        ),
    )
    .unwrap();
    let config = Config::load_with_env(Some(&config_path), |_| None).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let cancel = CancellationToken::new();
    let state = Arc::new(AppState::new(config));
    let handle = tokio::spawn(serve(listener, state, cancel.clone()));

    Relay {
        base,
        cancel,
        handle,
        _config_dir: dir,
    }
}

async fn mount_send_message(upstream: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)^/bot123:ABC/sendmessage$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ok": true,
            "result": {
                "message_id": 1,
                "date": 1_700_000_000,
                "chat": {"id": CHAT_ID, "type": "private", "first_name": "Test"},
                "text": "reply"
            }
        })))
        .mount(upstream)
        .await;
}

fn text_update(text: &str) -> serde_json::Value {
    serde_json::json!({
        "update_id": 1,
        "message": {
            "message_id": 10,
            "date": 1_700_000_000,
            "chat": {"id": CHAT_ID, "type": "private"},
            "text": text
        }
    })
}

async fn post_update(relay: &Relay, secret: &str, update: &serde_json::Value) -> (u16, String) {
    let res = reqwest::Client::new()
        .post(format!("{}/endpoint?secret={secret}", relay.base))
        .json(update)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.text().await.unwrap())
}

fn is_send_message(request: &Request) -> bool {
    request
        .url
        .path()
        .to_ascii_lowercase()
        .ends_with("/sendmessage")
}

fn is_memos(request: &Request) -> bool {
    request.url.path() == "/api/v1/memos"
}

/// Bodies of every `sendMessage` call the relay made.
async fn sent_replies(upstream: &MockServer) -> Vec<serde_json::Value> {
    upstream
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| is_send_message(r))
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

async fn memos_calls(upstream: &MockServer) -> usize {
    upstream
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| is_memos(r))
        .count()
}

#[tokio::test]
async fn start_sends_welcome_without_touching_memos() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("/start")).await;
    assert_eq!(status, 200);
    assert_eq!(body, "ok");

    let replies = sent_replies(&upstream).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["chat_id"], CHAT_ID);
    assert_eq!(replies[0]["text"], formatter::WELCOME);
    assert_eq!(memos_calls(&upstream).await, 0);

    relay.stop().await;
}

#[tokio::test]
async fn list_replies_with_notes_in_server_order() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .and(header("authorization", "Bearer memos-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{"content": "a"}, {"content": "b"}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("/list")).await;
    assert_eq!((status, body.as_str()), (200, "ok"));

    let replies = sent_replies(&upstream).await;
    assert_eq!(replies.len(), 1);
    let text = replies[0]["text"].as_str().unwrap();
    assert!(text.contains("\u{1f4dd} a\n\n\u{1f4dd} b"), "{text}");

    relay.stop().await;
}

#[tokio::test]
async fn list_with_no_notes_uses_placeholder() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    post_update(&relay, "xyz", &text_update("/list")).await;

    let replies = sent_replies(&upstream).await;
    assert_eq!(replies.len(), 1);
    assert!(
        replies[0]["text"]
            .as_str()
            .unwrap()
            .contains(formatter::NO_NOTES)
    );

    relay.stop().await;
}

#[tokio::test]
async fn list_failure_is_reported_in_chat_and_acknowledged() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    Mock::given(method("GET"))
        .and(path("/api/v1/memos"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database is down"))
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("/list")).await;
    assert_eq!((status, body.as_str()), (200, "ok"));

    let replies = sent_replies(&upstream).await;
    let text = replies[0]["text"].as_str().unwrap();
    assert!(text.starts_with("\u{26a0}\u{fe0f} Failed to fetch Memos list:"));
    assert!(text.contains("database is down"));

    relay.stop().await;
}

#[tokio::test]
async fn plain_text_is_saved_and_confirmed() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memos"))
        .and(header("authorization", "Bearer memos-token"))
        .and(body_json(serde_json::json!({"content": "hello world"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "memos/1",
            "content": "hello world"
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("  hello world  ")).await;
    assert_eq!((status, body.as_str()), (200, "ok"));

    let replies = sent_replies(&upstream).await;
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["text"], formatter::SAVED);

    relay.stop().await;
}

#[tokio::test]
async fn rejected_save_embeds_upstream_body() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/memos"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"code":16,"message":"unauthenticated"}"#),
        )
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("hello world")).await;
    assert_eq!((status, body.as_str()), (200, "ok"));

    let replies = sent_replies(&upstream).await;
    assert_eq!(
        replies[0]["text"],
        "\u{274c} Save failed: {\"code\":16,\"message\":\"unauthenticated\"}"
    );

    relay.stop().await;
}

#[tokio::test]
async fn wrong_secret_is_forbidden_without_side_effects() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "wrong", &text_update("hello world")).await;
    assert_eq!(status, 403);
    assert_eq!(body, "Unauthorized");
    assert!(upstream.received_requests().await.unwrap().is_empty());

    relay.stop().await;
}

#[tokio::test]
async fn update_without_text_is_ignored() {
    let upstream = MockServer::start().await;
    mount_send_message(&upstream).await;
    let relay = start_relay(&upstream).await;

    let photo = serde_json::json!({
        "update_id": 2,
        "message": {
            "message_id": 11,
            "chat": {"id": CHAT_ID, "type": "private"},
            "photo": [{"file_id": "abc", "file_unique_id": "def", "width": 1, "height": 1}]
        }
    });
    let (status, body) = post_update(&relay, "xyz", &photo).await;
    assert_eq!((status, body.as_str()), (200, "No message"));

    let (status, body) = post_update(&relay, "xyz", &serde_json::json!({"update_id": 3})).await;
    assert_eq!((status, body.as_str()), (200, "No message"));

    assert!(upstream.received_requests().await.unwrap().is_empty());

    relay.stop().await;
}

#[tokio::test]
async fn failed_reply_still_acknowledges_webhook() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path_regex(r"(?i)^/bot123:ABC/sendmessage$"))
        .respond_with(ResponseTemplate::new(500).set_body_string("telegram is down"))
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let (status, body) = post_update(&relay, "xyz", &text_update("/start")).await;
    assert_eq!((status, body.as_str()), (200, "ok"));
    assert_eq!(sent_replies(&upstream).await.len(), 1);

    relay.stop().await;
}

#[tokio::test]
async fn register_webhook_targets_callback_with_secret() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/setWebhook"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"ok":true,"result":true,"description":"Webhook was set"}"#),
        )
        .expect(1)
        .mount(&upstream)
        .await;
    let relay = start_relay(&upstream).await;

    let res = reqwest::Client::new()
        .get(format!("{}/registerWebhook", relay.base))
        .header("x-forwarded-proto", "http")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers()["content-type"].to_str().unwrap(),
        "text/plain;charset=utf-8"
    );
    assert_eq!(
        res.text().await.unwrap(),
        r#"{"ok":true,"result":true,"description":"Webhook was set"}"#
    );

    let requests = upstream.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let host = relay.base.trim_start_matches("http://");
    assert_eq!(sent["url"], format!("http://{host}/endpoint?secret=xyz"));

    relay.stop().await;
}
