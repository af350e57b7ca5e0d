use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::query::spotify_resource;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyExternalUrls {
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyAlbumRef {
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
}

/// Un track de Spotify (objeto completo o simplificado dentro de un álbum)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub album: Option<SpotifyAlbumRef>,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
    #[serde(default)]
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyOwner {
    pub id: Option<String>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotifyCollectionKind {
    Album,
    Playlist,
}

/// Elemento de la lista de tracks de un contenedor.
///
/// Los álbumes listan tracks directamente; las playlists los envuelven en
/// `{ "track": ... }` y pueden traer `null` para tracks eliminados.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpotifyItem {
    Track(SpotifyTrack),
    Entry { track: Option<SpotifyTrack> },
}

impl SpotifyItem {
    pub fn track(&self) -> Option<&SpotifyTrack> {
        match self {
            SpotifyItem::Track(track) => Some(track),
            SpotifyItem::Entry { track } => track.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpotifyPage {
    #[serde(default)]
    pub items: Vec<SpotifyItem>,
    pub next: Option<String>,
}

/// Álbum o playlist de Spotify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyCollection {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    #[serde(rename = "type")]
    pub kind: SpotifyCollectionKind,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
    pub owner: Option<SpotifyOwner>,
    #[serde(default)]
    pub external_urls: SpotifyExternalUrls,
    #[serde(default)]
    pub tracks: SpotifyPage,
}

/// Proveedor de metadata de Spotify
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpotifyProvider: Send + Sync {
    /// Un track individual a partir de su URL o URI
    async fn track(&self, url: &str) -> Result<SpotifyTrack>;

    /// Un álbum o playlist, con hasta `limit` elementos
    async fn collection(&self, url: &str, limit: usize) -> Result<SpotifyCollection>;
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Cliente de la Web API de Spotify con credenciales de aplicación
pub struct SpotifyClient {
    http: reqwest::Client,
    credentials: Option<(String, String)>,
    token: Mutex<Option<AccessToken>>,
}

impl SpotifyClient {
    pub fn new(http: reqwest::Client, client_id: Option<String>, client_secret: Option<String>) -> Self {
        Self {
            http,
            credentials: client_id.zip(client_secret),
            token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let cached = self
            .token
            .lock()
            .as_ref()
            .filter(|token| token.expires_at > Instant::now())
            .map(|token| token.value.clone());
        if let Some(token) = cached {
            return Ok(token);
        }

        let (client_id, client_secret) = self
            .credentials
            .as_ref()
            .context("Credenciales de Spotify no configuradas")?;

        let basic = STANDARD.encode(format!("{}:{}", client_id, client_secret));
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()
            .context("Spotify rechazó las credenciales")?
            .json()
            .await?;

        debug!("🔑 Token de Spotify renovado ({}s)", response.expires_in);

        // renovar un poco antes de que expire
        let lifetime = Duration::from_secs(response.expires_in.saturating_sub(30));
        *self.token.lock() = Some(AccessToken {
            value: response.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(response.access_token)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, kind: &str, id: &str) -> Result<T> {
        let token = self.access_token().await?;

        self.http
            .get(format!("{}/{}s/{}", API_URL, kind, id))
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Spotify no devolvió el {} {}", kind, id))?
            .json()
            .await
            .context("Error al parsear respuesta de Spotify")
    }
}

#[async_trait]
impl SpotifyProvider for SpotifyClient {
    async fn track(&self, url: &str) -> Result<SpotifyTrack> {
        let (kind, id) = spotify_resource(url).context("URL de Spotify inválida")?;
        if kind != "track" {
            anyhow::bail!("La URL de Spotify no es un track: {}", url);
        }

        info!("🎧 Obteniendo track de Spotify: {}", id);
        self.get("track", &id).await
    }

    async fn collection(&self, url: &str, limit: usize) -> Result<SpotifyCollection> {
        let (kind, id) = spotify_resource(url).context("URL de Spotify inválida")?;
        if kind == "track" {
            anyhow::bail!("La URL de Spotify no es un álbum ni una playlist: {}", url);
        }

        info!("📋 Obteniendo {} de Spotify: {}", kind, id);
        let mut collection: SpotifyCollection = self.get(kind, &id).await?;
        collection.tracks.items.truncate(limit);
        Ok(collection)
    }
}
