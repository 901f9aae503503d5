//! HTTP/JSON radio-service client.
//!
//! Endpoint layout (all bodies JSON, all paths relative to the service base):
//!
//! ```text
//!   POST   /auth/login                {username, password} -> {auth_token, listener_id}
//!   GET    /stations                  -> {stations: [Station]}
//!   GET    /stations/{id}/playlist    -> {tracks: [Track]}
//!   GET    /genres                    -> {categories: [GenreCategory]}
//!   POST   /stations                  {kind, seed_id}
//!   POST   /stations/{id}/music       {music_id}
//!   DELETE /stations/{id}
//!   PATCH  /stations/{id}             {name}
//!   POST   /stations/{id}/transform
//!   POST   /tracks/{id}/rating        {station_id, rating}
//!   POST   /tracks/{id}/tired
//!   POST   /tracks/{id}/move          {from_station_id, to_station_id}
//!   PUT    /quickmix                  {station_ids}
//!   GET    /search?q=...              -> SearchResult
//! ```
//!
//! Login goes over `ServiceConfig::login_url`, everything else over
//! `ServiceConfig::api_url`.  Requests after login carry the auth token as a
//! bearer header.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{ProxyType, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};
use crate::model::{
    GenreCategory, Rating, SearchResult, Station, StationKind, Track,
};
use crate::service::RadioService;

#[derive(Debug, Clone, Deserialize)]
struct LoginResponse {
    auth_token: String,
    listener_id: String,
}

#[derive(Debug, Deserialize)]
struct StationsResponse {
    stations: Vec<Station>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    #[serde(default)]
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
struct GenresResponse {
    #[serde(default)]
    categories: Vec<GenreCategory>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct QuickmixBody<'a> {
    station_ids: Vec<&'a str>,
}

pub struct HttpRadioService {
    http: reqwest::Client,
    login_url: String,
    api_url: String,
    auth: RwLock<Option<LoginResponse>>,
}

impl HttpRadioService {
    pub fn new(config: &ServiceConfig) -> ServiceResult<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("tunebar/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let scheme = match config.proxy_type {
                ProxyType::Http => "http",
                ProxyType::Socks5 => "socks5",
            };
            let proxy_url = if proxy.contains("://") {
                proxy.to_string()
            } else {
                format!("{}://{}", scheme, proxy)
            };
            debug!("radio client: using control proxy {}", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
        }

        Ok(Self {
            http: builder.build()?,
            login_url: config.login_url(),
            api_url: config.api_url(),
            auth: RwLock::new(None),
        })
    }

    async fn request(&self, method: Method, path: &str) -> ServiceResult<RequestBuilder> {
        let auth = self.auth.read().await;
        let auth = auth.as_ref().ok_or(ServiceError::NotLoggedIn)?;
        Ok(self
            .http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&auth.auth_token)
            .header("Accept", "application/json"))
    }

    async fn send(&self, req: RequestBuilder) -> ServiceResult<Response> {
        let response = req.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        warn!("radio client: request failed with {}: {}", code, message);
        Err(ServiceError::Api { code, message })
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> ServiceResult<T> {
        let response = self.send(req).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ServiceError::Decode(e.to_string()))
    }

    async fn send_empty(&self, req: RequestBuilder) -> ServiceResult<()> {
        self.send(req).await.map(|_| ())
    }
}

fn rating_str(rating: Rating) -> &'static str {
    match rating {
        Rating::None => "none",
        Rating::Loved => "loved",
        Rating::Banned => "banned",
    }
}

#[async_trait]
impl RadioService for HttpRadioService {
    async fn login(&self, username: &str, password: &str) -> ServiceResult<()> {
        let req = self
            .http
            .post(format!("{}/auth/login", self.login_url))
            .json(&json!({ "username": username, "password": password }));

        let login: LoginResponse = match self.send_json(req).await {
            Ok(login) => login,
            Err(ServiceError::Api { code: 401 | 403, message }) => {
                return Err(ServiceError::Auth(message))
            }
            Err(e) => return Err(e),
        };
        debug!("radio client: logged in as listener {}", login.listener_id);
        *self.auth.write().await = Some(login);
        Ok(())
    }

    async fn fetch_stations(&self) -> ServiceResult<Vec<Station>> {
        let req = self.request(Method::GET, "/stations").await?;
        let resp: StationsResponse = self.send_json(req).await?;
        Ok(resp.stations)
    }

    async fn fetch_playlist(&self, station_id: &str) -> ServiceResult<Vec<Track>> {
        let path = format!("/stations/{}/playlist", station_id);
        let req = self.request(Method::GET, &path).await?;
        let resp: PlaylistResponse = self.send_json(req).await?;
        Ok(resp.tracks)
    }

    async fn fetch_genre_stations(&self) -> ServiceResult<Vec<GenreCategory>> {
        let req = self.request(Method::GET, "/genres").await?;
        let resp: GenresResponse = self.send_json(req).await?;
        Ok(resp.categories)
    }

    async fn create_station(&self, kind: StationKind, seed_id: &str) -> ServiceResult<()> {
        let req = self
            .request(Method::POST, "/stations")
            .await?
            .json(&json!({ "kind": kind.as_str(), "seed_id": seed_id }));
        self.send_empty(req).await
    }

    async fn add_music(&self, station: &Station, music_id: &str) -> ServiceResult<()> {
        let path = format!("/stations/{}/music", station.id);
        let req = self
            .request(Method::POST, &path)
            .await?
            .json(&json!({ "music_id": music_id }));
        self.send_empty(req).await
    }

    async fn delete_station(&self, station: &Station) -> ServiceResult<()> {
        let path = format!("/stations/{}", station.id);
        let req = self.request(Method::DELETE, &path).await?;
        self.send_empty(req).await
    }

    async fn rename_station(&self, station: &Station, name: &str) -> ServiceResult<()> {
        let path = format!("/stations/{}", station.id);
        let req = self
            .request(Method::PATCH, &path)
            .await?
            .json(&json!({ "name": name }));
        self.send_empty(req).await
    }

    async fn transform_to_owned(&self, station: &Station) -> ServiceResult<()> {
        let path = format!("/stations/{}/transform", station.id);
        let req = self.request(Method::POST, &path).await?;
        self.send_empty(req).await
    }

    async fn rate_track(&self, track: &Track, rating: Rating) -> ServiceResult<()> {
        let path = format!("/tracks/{}/rating", track.id);
        let req = self.request(Method::POST, &path).await?.json(&json!({
            "station_id": track.station_id,
            "rating": rating_str(rating),
        }));
        self.send_empty(req).await
    }

    async fn mark_tired(&self, track: &Track) -> ServiceResult<()> {
        let path = format!("/tracks/{}/tired", track.id);
        let req = self.request(Method::POST, &path).await?;
        self.send_empty(req).await
    }

    async fn move_track(
        &self,
        track: &Track,
        from: &Station,
        to: &Station,
    ) -> ServiceResult<()> {
        let path = format!("/tracks/{}/move", track.id);
        let req = self.request(Method::POST, &path).await?.json(&json!({
            "from_station_id": from.id,
            "to_station_id": to.id,
        }));
        self.send_empty(req).await
    }

    async fn set_quickmix(&self, stations: &[Station]) -> ServiceResult<()> {
        let body = QuickmixBody {
            station_ids: stations
                .iter()
                .filter(|s| s.use_quickmix)
                .map(|s| s.id.as_str())
                .collect(),
        };
        let req = self.request(Method::PUT, "/quickmix").await?.json(&body);
        self.send_empty(req).await
    }

    async fn search_music(&self, query: &str) -> ServiceResult<SearchResult> {
        let req = self
            .request(Method::GET, "/search")
            .await?
            .query(&[("q", query)]);
        self.send_json(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_socks_proxy() {
        let config = ServiceConfig {
            proxy: Some("127.0.0.1:1080".to_string()),
            proxy_type: ProxyType::Socks5,
            ..Default::default()
        };
        assert!(HttpRadioService::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_calls_before_login_fail() {
        let client = HttpRadioService::new(&ServiceConfig::default()).unwrap();
        let err = client.fetch_stations().await.unwrap_err();
        assert!(matches!(err, ServiceError::NotLoggedIn));
    }

    #[test]
    fn test_playlist_response_tolerates_missing_tracks() {
        let resp: PlaylistResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.tracks.is_empty());
    }
}
