use anyhow::{Context, Result};
use async_process::Command;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Canal de YouTube que publicó un video o playlist
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YouTubeChannel {
    pub name: String,
    pub url: Option<String>,
}

/// Metadata de un video tal como la entrega el proveedor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YouTubeVideo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub thumbnail: Option<String>,
    pub channel: Option<YouTubeChannel>,
    pub views: Option<u64>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YouTubePlaylist {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub channel: Option<YouTubeChannel>,
    pub videos: Vec<YouTubeVideo>,
}

/// Proveedor de metadata de YouTube
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait YouTubeProvider: Send + Sync {
    /// Busca videos por palabras clave (o por id/URL)
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<YouTubeVideo>>;

    /// Obtiene una playlist con hasta `limit` videos
    async fn playlist(&self, url: &str, limit: usize) -> Result<YouTubePlaylist>;
}

/// Cliente de YouTube basado en yt-dlp
pub struct YtDlpClient {
    binary: String,
    // Limitar procesos concurrentes para evitar rate limiting
    rate_limiter: Semaphore,
}

/// Respuesta de `yt-dlp -J --flat-playlist`
#[derive(Debug, Deserialize)]
struct YtDlpListing {
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    channel_url: Option<String>,
    uploader_url: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtDlpThumbnail>,
    #[serde(default)]
    entries: Vec<YtDlpEntry>,
}

#[derive(Debug, Deserialize)]
struct YtDlpEntry {
    id: String,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
    duration: Option<f64>,
    channel: Option<String>,
    uploader: Option<String>,
    channel_url: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    thumbnails: Vec<YtDlpThumbnail>,
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct YtDlpThumbnail {
    url: String,
}

impl YtDlpClient {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            rate_limiter: Semaphore::new(3),
        }
    }

    /// Ejecuta yt-dlp y parsea el JSON único que imprime
    async fn dump(&self, target: &str, limit: usize) -> Result<YtDlpListing> {
        let _permit = self.rate_limiter.acquire().await?;

        let limit = limit.to_string();
        let output = Command::new(&self.binary)
            .args([
                "--flat-playlist",
                "--dump-single-json",
                "--skip-download",
                "--no-warnings",
                "--playlist-end",
                &limit,
                target,
            ])
            .output()
            .await
            .context("Error al ejecutar yt-dlp")?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp error: {}", error.trim());
        }

        serde_json::from_slice(&output.stdout).context("Error al parsear respuesta de yt-dlp")
    }
}

impl YtDlpEntry {
    fn into_video(self) -> YouTubeVideo {
        let url = self
            .webpage_url
            .or(self.url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", self.id));

        let thumbnail = self
            .thumbnail
            .or_else(|| self.thumbnails.last().map(|t| t.url.clone()));

        let channel = self.channel.or(self.uploader).map(|name| YouTubeChannel {
            name,
            url: self.channel_url,
        });

        YouTubeVideo {
            title: self.title.unwrap_or_default(),
            description: self.description,
            url,
            thumbnail,
            channel,
            views: self.view_count,
            duration_ms: self.duration.map(|secs| (secs * 1000.0) as u64),
            id: self.id,
        }
    }
}

#[async_trait]
impl YouTubeProvider for YtDlpClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<YouTubeVideo>> {
        info!("🔍 Buscando en YouTube: {}", query);

        let listing = self.dump(&format!("ytsearch{}:{}", limit, query), limit).await?;
        let videos: Vec<YouTubeVideo> = listing
            .entries
            .into_iter()
            .map(YtDlpEntry::into_video)
            .collect();

        debug!("yt-dlp devolvió {} resultados para '{}'", videos.len(), query);
        Ok(videos)
    }

    async fn playlist(&self, url: &str, limit: usize) -> Result<YouTubePlaylist> {
        info!("📋 Obteniendo playlist: {}", url);

        let listing = self.dump(url, limit).await?;
        let channel = listing
            .channel
            .or(listing.uploader)
            .map(|name| YouTubeChannel {
                name,
                url: listing.channel_url.or(listing.uploader_url),
            });

        Ok(YouTubePlaylist {
            id: listing.id.unwrap_or_default(),
            title: listing.title.unwrap_or_default(),
            url: listing.webpage_url.unwrap_or_else(|| url.to_string()),
            thumbnail: listing.thumbnails.last().map(|t| t.url.clone()),
            channel,
            videos: listing
                .entries
                .into_iter()
                .take(limit)
                .map(YtDlpEntry::into_video)
                .collect(),
        })
    }
}
