//! The fetch capability the pipeline is built on, and its HTTP implementation.

use crate::config::{DEFAULT_API_URL, DEFAULT_REQUEST_DELAY_MS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::error::ApiError;
use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::sleep;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One GET against the wiki's action API. Implementations add the JSON format
/// envelope and enforce their own pacing; they never retry.
pub trait WikiApi {
    fn get(&self, params: &[(&str, String)]) -> Result<Value, ApiError>;
}

impl<F> WikiApi for F
where
    F: Fn(&[(&str, String)]) -> Result<Value, ApiError>,
{
    fn get(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        self(params)
    }
}

/// Issues a request and unwraps the wiki's `{"error": {...}}` envelope.
pub fn request<A: WikiApi + ?Sized>(api: &A, params: &[(&str, String)]) -> Result<Value, ApiError> {
    let payload = api.get(params)?;
    if let Some(error) = payload.get("error") {
        let code = error
            .get("code")
            .and_then(Value::as_str)
            .unwrap_or("unknown_error");
        let info = error
            .get("info")
            .and_then(Value::as_str)
            .unwrap_or("unknown info");
        return Err(ApiError::Remote {
            code: code.to_string(),
            info: info.to_string(),
        });
    }
    Ok(payload)
}

#[derive(Deserialize)]
struct ParseResponse {
    parse: ParsedPage,
}

#[derive(Deserialize)]
struct ParsedPage {
    title: String,
    wikitext: Wikitext,
}

/// `formatversion=2` returns a bare string, the legacy format wraps it.
#[derive(Deserialize)]
#[serde(untagged)]
enum Wikitext {
    Plain(String),
    Legacy {
        #[serde(rename = "*")]
        text: String,
    },
}

/// Raw markup of one page after redirects.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMarkup {
    pub title: String,
    pub wikitext: String,
}

pub fn fetch_wikitext<A: WikiApi + ?Sized>(api: &A, title: &str) -> Result<PageMarkup, ApiError> {
    let params = [
        ("action", "parse".to_string()),
        ("page", title.to_string()),
        ("prop", "wikitext".to_string()),
        ("redirects", "1".to_string()),
    ];
    let value = request(api, &params)?;
    let parsed: ParseResponse = serde_json::from_value(value)
        .map_err(|e| ApiError::Malformed(format!("parse response for '{}': {}", title, e)))?;
    let wikitext = match parsed.parse.wikitext {
        Wikitext::Plain(text) | Wikitext::Legacy { text } => text,
    };
    Ok(PageMarkup {
        title: parsed.parse.title,
        wikitext,
    })
}

/// Enforces a minimum gap between consecutive request starts.
pub struct Throttle {
    delay: Duration,
    last_request_at: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last_request_at: Mutex::new(None),
        }
    }

    pub fn wait(&self) {
        let mut last = match self.last_request_at.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                sleep(self.delay - elapsed);
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub request_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
        }
    }
}

pub struct MediaWikiClient {
    client: Client,
    api_url: reqwest::Url,
    throttle: Throttle,
    request_count: AtomicU64,
}

impl MediaWikiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let api_url = reqwest::Url::parse(&config.api_url)
            .with_context(|| format!("Invalid API URL: {}", config.api_url))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_url,
            throttle: Throttle::new(config.request_delay),
            request_count: AtomicU64::new(0),
        })
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

impl WikiApi for MediaWikiClient {
    fn get(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let mut pairs: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 2);
        pairs.push(("format", "json"));
        pairs.push(("formatversion", "2"));
        pairs.extend(params.iter().map(|(k, v)| (*k, v.as_str())));

        self.throttle.wait();
        self.request_count.fetch_add(1, Ordering::Relaxed);
        debug!(params = ?params, "API request");

        let response = self
            .client
            .get(self.api_url.clone())
            .query(&pairs)
            .send()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "API request failed");
            return Err(ApiError::Transport(format!("HTTP {}", status)));
        }

        response
            .json::<Value>()
            .map_err(|e| ApiError::Malformed(format!("invalid JSON body: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn closures_are_wiki_apis() {
        let api = |params: &[(&str, String)]| -> Result<Value, ApiError> {
            assert_eq!(params[0].0, "action");
            Ok(json!({"ok": true}))
        };
        assert_eq!(request(&api, &[("action", "query".to_string())]).unwrap()["ok"], true);
    }

    #[test]
    fn error_envelope_becomes_remote_error() {
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Ok(json!({"error": {"code": "missingtitle", "info": "The page doesn't exist."}}))
        };
        let err = fetch_wikitext(&api, "Nothing").unwrap_err();
        assert_eq!(
            err,
            ApiError::Remote {
                code: "missingtitle".into(),
                info: "The page doesn't exist.".into()
            }
        );
    }

    #[test]
    fn wikitext_in_both_formats() {
        let modern = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Ok(json!({"parse": {"title": "Rune sword", "pageid": 1, "wikitext": "{{Infobox Item}}"}}))
        };
        let legacy = |_: &[(&str, String)]| -> Result<Value, ApiError> {
            Ok(json!({"parse": {"title": "Rune sword", "wikitext": {"*": "{{Infobox Item}}"}}}))
        };
        for page in [fetch_wikitext(&modern, "Rune sword"), fetch_wikitext(&legacy, "Rune sword")] {
            let page = page.unwrap();
            assert_eq!(page.title, "Rune sword");
            assert_eq!(page.wikitext, "{{Infobox Item}}");
        }
    }

    #[test]
    fn unexpected_shape_is_malformed() {
        let api = |_: &[(&str, String)]| -> Result<Value, ApiError> { Ok(json!({"parse": 3})) };
        assert!(matches!(fetch_wikitext(&api, "X"), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn throttle_spaces_requests() {
        let throttle = Throttle::new(Duration::from_millis(30));
        let start = Instant::now();
        throttle.wait();
        throttle.wait();
        throttle.wait();
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn client_rejects_invalid_url() {
        let config = ClientConfig {
            api_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(MediaWikiClient::new(config).is_err());
    }
}
