pub mod direct_url;
pub mod extractor;
pub mod query;
pub mod search;
pub mod soundcloud;
pub mod spotify;
pub mod youtube;

use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};

use crate::config::Config;

pub use direct_url::DirectUrlExtractor;
pub use extractor::{
    ExtractedTrack, Extractor, ExtractorData, ExtractorInfo, ExtractorModel, ExtractorRegistry, ExtractorSource,
};
pub use query::{classify, QueryKind, SearchEngine};
pub use search::{ResolveOptions, SearchPipeline, SearchQuery, SearchResult};
pub use soundcloud::{SoundCloudClient, SoundCloudProvider};
pub use spotify::{SpotifyClient, SpotifyProvider};
pub use youtube::{YouTubeProvider, YtDlpClient};

/// Autor por defecto cuando la fuente no lo informa
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const SPOTIFY_THUMBNAIL: &str = "https://www.scdn.co/i/_global/twitter_card-default.jpg";
pub const SOUNDCLOUD_THUMBNAIL: &str = "https://soundcloud.com/pwa-icon-192.png";
pub const GENERIC_THUMBNAIL: &str = "https://cdn.discordapp.com/embed/avatars/0.png";

/// Nombre bajo el que se registra el extractor de enlaces directos
pub const DEFAULT_EXTRACTOR: &str = "attachment";

/// Proveedores incorporados que usa el pipeline de búsqueda
#[derive(Clone)]
pub struct SourceProviders {
    pub youtube: Arc<dyn YouTubeProvider>,
    pub soundcloud: Arc<dyn SoundCloudProvider>,
    pub spotify: Arc<dyn SpotifyProvider>,
}

impl SourceProviders {
    /// Construye los clientes reales (yt-dlp, Spotify Web API, SoundCloud)
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(concat!("guild-music/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Error al crear cliente HTTP")?;

        Ok(Self {
            youtube: Arc::new(YtDlpClient::new(config.ytdlp_path.clone())),
            soundcloud: Arc::new(SoundCloudClient::new(
                http.clone(),
                config.soundcloud_client_id.clone(),
            )),
            spotify: Arc::new(SpotifyClient::new(
                http,
                config.spotify_client_id.clone(),
                config.spotify_client_secret.clone(),
            )),
        })
    }
}
