//! Last.fm play-history client (Audioscrobbler 2.0 web API).
//!
//! The session key is obtained lazily with `auth.getMobileSession` on the first
//! submission and kept for the lifetime of the process.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ScrobbleConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::model::ListenRecord;
use crate::service::HistoryService;

const API_ROOT: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Deserialize)]
struct ApiError {
    error: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    session: SessionInfo,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    key: String,
}

pub struct LastFmScrobbler {
    http: reqwest::Client,
    api_root: String,
    username: String,
    password: String,
    api_key: String,
    api_secret: String,
    session_key: Mutex<Option<String>>,
}

/// `api_sig`: md5 over the alphabetically sorted `name value` pairs followed by
/// the shared secret.  `format` never takes part in the signature.
pub fn sign(params: &BTreeMap<&str, String>, secret: &str) -> String {
    let mut raw = String::new();
    for (name, value) in params.iter().filter(|(name, _)| **name != "format") {
        raw.push_str(name);
        raw.push_str(value);
    }
    raw.push_str(secret);
    format!("{:x}", md5::compute(raw.as_bytes()))
}

impl LastFmScrobbler {
    pub fn new(config: &ScrobbleConfig) -> HistoryResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tunebar/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_root: API_ROOT.to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            session_key: Mutex::new(None),
        })
    }

    async fn call(&self, mut params: BTreeMap<&str, String>) -> HistoryResult<serde_json::Value> {
        params.insert("api_key", self.api_key.clone());
        let sig = sign(&params, &self.api_secret);
        params.insert("api_sig", sig);
        params.insert("format", "json".to_string());

        let response = self.http.post(&self.api_root).form(&params).send().await?;
        let body = response.bytes().await?;
        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| HistoryError::Decode(e.to_string()))?;

        if let Ok(err) = serde_json::from_value::<ApiError>(value.clone()) {
            return Err(HistoryError::Api {
                code: err.error,
                message: err.message,
            });
        }
        Ok(value)
    }

    async fn session_key(&self) -> HistoryResult<String> {
        let mut cached = self.session_key.lock().await;
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }
        if self.username.is_empty() || self.api_key.is_empty() {
            return Err(HistoryError::NotConfigured);
        }

        let mut params = BTreeMap::new();
        params.insert("method", "auth.getMobileSession".to_string());
        params.insert("username", self.username.clone());
        params.insert("password", self.password.clone());
        let value = self.call(params).await?;
        let envelope: SessionEnvelope =
            serde_json::from_value(value).map_err(|e| HistoryError::Decode(e.to_string()))?;

        info!("last.fm: session established for {}", self.username);
        *cached = Some(envelope.session.key.clone());
        Ok(envelope.session.key)
    }
}

#[async_trait]
impl HistoryService for LastFmScrobbler {
    async fn submit(&self, record: &ListenRecord) -> HistoryResult<()> {
        let sk = self.session_key().await?;

        let mut params = BTreeMap::new();
        params.insert("method", "track.scrobble".to_string());
        params.insert("artist", record.artist.clone());
        params.insert("track", record.title.clone());
        params.insert("timestamp", record.started_at.to_string());
        if !record.album.is_empty() {
            params.insert("album", record.album.clone());
        }
        if record.length_secs > 0 {
            params.insert("duration", record.length_secs.to_string());
        }
        params.insert("sk", sk);

        self.call(params).await?;
        debug!("last.fm: scrobbled {} - {}", record.artist, record.title);
        Ok(())
    }
}
