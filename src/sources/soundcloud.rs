use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::info;

const API_URL: &str = "https://api-v2.soundcloud.com";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundCloudUser {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub permalink_url: Option<String>,
}

/// Track de SoundCloud. Dentro de una playlist pueden llegar stubs con solo `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundCloudTrack {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub permalink_url: Option<String>,
    pub artwork_url: Option<String>,
    /// Milisegundos
    #[serde(default)]
    pub duration: u64,
    pub playback_count: Option<u64>,
    pub user: Option<SoundCloudUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoundCloudPlaylist {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub permalink_url: Option<String>,
    pub artwork_url: Option<String>,
    pub user: Option<SoundCloudUser>,
    #[serde(default)]
    pub tracks: Vec<SoundCloudTrack>,
}

#[derive(Debug, Deserialize)]
struct SearchCollection {
    #[serde(default)]
    collection: Vec<SoundCloudTrack>,
}

/// Proveedor de metadata de SoundCloud
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SoundCloudProvider: Send + Sync {
    async fn track(&self, url: &str) -> Result<SoundCloudTrack>;

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SoundCloudTrack>>;

    async fn playlist(&self, url: &str, limit: usize) -> Result<SoundCloudPlaylist>;
}

/// Cliente de la API v2 de SoundCloud
pub struct SoundCloudClient {
    http: reqwest::Client,
    client_id: Option<String>,
}

impl SoundCloudClient {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self { http, client_id }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let client_id = self
            .client_id
            .as_deref()
            .context("Client ID de SoundCloud no configurado")?;

        self.http
            .get(format!("{}/{}", API_URL, path))
            .query(query)
            .query(&[("client_id", client_id)])
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("SoundCloud rechazó la petición a /{}", path))?
            .json()
            .await
            .context("Error al parsear respuesta de SoundCloud")
    }
}

#[async_trait]
impl SoundCloudProvider for SoundCloudClient {
    async fn track(&self, url: &str) -> Result<SoundCloudTrack> {
        info!("☁️ Resolviendo track de SoundCloud: {}", url);
        self.get("resolve", &[("url", url)]).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SoundCloudTrack>> {
        info!("🔍 Buscando en SoundCloud: {}", query);
        let limit = limit.to_string();
        let results: SearchCollection = self
            .get("search/tracks", &[("q", query), ("limit", limit.as_str())])
            .await?;
        Ok(results.collection)
    }

    async fn playlist(&self, url: &str, limit: usize) -> Result<SoundCloudPlaylist> {
        info!("📋 Resolviendo playlist de SoundCloud: {}", url);
        let mut playlist: SoundCloudPlaylist = self.get("resolve", &[("url", url)]).await?;
        playlist.tracks.truncate(limit);
        Ok(playlist)
    }
}
