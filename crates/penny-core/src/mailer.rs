//! Email delivery
//!
//! Fire-and-forget HTTP email API client. Delivery failures are logged and
//! counted by the calling job; they never abort a batch.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};

const DEFAULT_HOST: &str = "https://api.resend.com";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Concrete mailer enum: HTTP in production, a recording mock in tests.
#[derive(Clone)]
pub enum Mailer {
    Http(HttpMailer),
    Mock(MockMailer),
}

impl Mailer {
    /// Create from `MAILER_API_KEY` and `MAILER_FROM`, or None when unset.
    pub fn from_env() -> Option<Self> {
        HttpMailer::from_env().map(Mailer::Http)
    }

    pub fn mock() -> Self {
        Mailer::Mock(MockMailer::new())
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        match self {
            Mailer::Http(m) => m.send(to, subject, text).await,
            Mailer::Mock(m) => m.send(to, subject, text),
        }
    }
}

/// Client for a Resend-style `POST /emails` API.
#[derive(Clone)]
pub struct HttpMailer {
    api_key: String,
    from: String,
    host: String,
    client: reqwest::Client,
}

impl HttpMailer {
    pub fn new(api_key: &str, from: &str, host: &str) -> Self {
        HttpMailer {
            api_key: api_key.to_string(),
            from: from.to_string(),
            host: host.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("MAILER_API_KEY").ok()?;
        let from = std::env::var("MAILER_FROM").ok()?;
        if api_key.is_empty() || from.is_empty() {
            return None;
        }
        let host = std::env::var("MAILER_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Some(Self::new(&api_key, &from, &host))
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        let url = format!("{}/emails", self.host);
        let response = self
            .client
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "text": text,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InvalidData(format!(
                "mail API returned {} for {}",
                status, to
            )));
        }
        debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

/// A sent message captured by the mock mailer.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Records messages instead of sending them.
#[derive(Clone, Default)]
pub struct MockMailer {
    sent: Arc<Mutex<Vec<SentMail>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    fn send(&self, to: &str, subject: &str, text: &str) -> Result<()> {
        self.sent
            .lock()
            .expect("mock mailer lock")
            .push(SentMail {
                to: to.to_string(),
                subject: subject.to_string(),
                text: text.to_string(),
            });
        Ok(())
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().expect("mock mailer lock").clone()
    }
}
