use crate::{error::NotifyError, Notifier};
use itertools::Itertools;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

pub const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub company: String,
    pub title: String,
    pub link: String,
}

/// Postings discovered during one run, in discovery order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NotificationBatch {
    postings: Vec<Posting>,
}

impl NotificationBatch {
    pub fn push(&mut self, company: &str, title: &str, link: &str) {
        self.postings.push(Posting {
            company: company.to_string(),
            title: title.to_string(),
            link: link.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn postings(&self) -> &[Posting] {
        self.postings.as_slice()
    }
}

impl fmt::Display for NotificationBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🔥 *New Job Openings Found*\n\n")?;
        for p in &self.postings {
            write!(f, "🏢 {}\n📌 {}\n🔗 {}\n\n", p.company, p.title, p.link)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

/// Posts the batch to a Telegram chat through the bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: &str) -> TelegramNotifier {
        Self::with_api(TELEGRAM_API, token, chat_id)
    }

    pub fn with_api(api: &str, token: &str, chat_id: &str) -> TelegramNotifier {
        TelegramNotifier {
            client: reqwest::Client::new(),
            endpoint: format!("{}/bot{}/sendMessage", api.trim_end_matches('/'), token),
            chat_id: chat_id.to_string(),
        }
    }

    pub async fn send(&self, text: String) -> Result<(), NotifyError> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            disable_web_page_preview: false,
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, batch: &NotificationBatch) {
        if batch.is_empty() {
            return;
        }

        match self.send(batch.to_string()).await {
            Ok(()) => info!("Sent notification with {} postings", batch.len()),
            Err(e) => warn!("Notification not delivered: {}", e),
        }
    }
}

/// Writes the message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, batch: &NotificationBatch) {
        if batch.is_empty() {
            return;
        }
        info!(
            "Would notify {} postings: {}",
            batch.len(),
            batch.postings().iter().map(|p| p.link.as_str()).join(", ")
        );
        info!("\n{}", batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    fn batch() -> NotificationBatch {
        let mut b = NotificationBatch::default();
        b.push("Site", "Backend Developer", "https://site.example/j/1");
        b.push("Other", "Rust Engineer", "https://other.example/x");
        b
    }

    #[test]
    fn message_format() {
        assert_eq!(
            batch().to_string(),
            "🔥 *New Job Openings Found*\n\n\
             🏢 Site\n📌 Backend Developer\n🔗 https://site.example/j/1\n\n\
             🏢 Other\n📌 Rust Engineer\n🔗 https://other.example/x\n\n"
        );
    }

    #[test]
    fn request_body() {
        let body = SendMessage {
            chat_id: "42",
            text: "hi".to_string(),
            disable_web_page_preview: false,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"chat_id": "42", "text": "hi", "disable_web_page_preview": false})
        );
    }

    #[test]
    fn endpoint_embeds_token() {
        let n = TelegramNotifier::new("123:abc", "42");
        assert_eq!(n.endpoint, "https://api.telegram.org/bot123:abc/sendMessage");

        let n = TelegramNotifier::with_api("http://127.0.0.1:8080/", "t", "42");
        assert_eq!(n.endpoint, "http://127.0.0.1:8080/bott/sendMessage");
    }

    /// Accepts a single request, answering with `status_line`, and hands back its raw text.
    async fn serve_once(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw).to_string();
                if n == 0 || request_complete(&text) {
                    let _ = tx.send(text);
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}",
                status_line
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });

        (format!("http://{}", addr), rx)
    }

    fn request_complete(raw: &str) -> bool {
        let Some((head, body)) = raw.split_once("\r\n\r\n") else {
            return false;
        };
        let length = head
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        body.len() >= length
    }

    #[tokio::test]
    async fn posts_message_to_bot_endpoint() {
        let (api, request) = serve_once("200 OK").await;
        let n = TelegramNotifier::with_api(&api, "secret", "42");
        n.notify(&batch()).await;

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /botsecret/sendMessage "));

        let (_, body) = request.split_once("\r\n\r\n").unwrap();
        let body: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(body["chat_id"], "42");
        assert_eq!(body["disable_web_page_preview"], false);
        assert_eq!(body["text"], batch().to_string());
    }

    #[tokio::test]
    async fn delivery_failure_is_reported_by_send_only() {
        let (api, _request) = serve_once("500 Internal Server Error").await;
        let n = TelegramNotifier::with_api(&api, "secret", "42");
        assert!(matches!(
            n.send("hi".to_string()).await,
            Err(NotifyError::Status(500))
        ));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        // Unreachable endpoint must not surface to the caller.
        TelegramNotifier::with_api(&api, "secret", "42")
            .notify(&batch())
            .await;
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api = format!("http://{}", listener.local_addr().unwrap());
        let n = TelegramNotifier::with_api(&api, "secret", "42");

        n.notify(&NotificationBatch::default()).await;
        let accepted =
            tokio::time::timeout(std::time::Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err());
    }
}
