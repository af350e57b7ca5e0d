use anyhow::{Context, Result};
use std::{str::FromStr, time::Duration};

use crate::audio::session::{FetchOptions, SessionOptions};

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,

    // Sesiones
    pub leave_on_empty: bool,
    pub leave_on_empty_cooldown: Duration,
    pub max_queue_size: usize,

    // Búsqueda
    pub max_playlist_size: usize,
    pub search_limit: usize,
    pub enable_default_extractors: bool,

    // Fuentes
    pub ytdlp_path: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub soundcloud_client_id: Option<String>,

    // Descarga de audio (valor por defecto de cada sesión)
    pub fetch_quality: String,
    pub fetch_high_water_mark: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let config = Self {
            // Discord
            discord_token: std::env::var("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,

            // Sesiones
            leave_on_empty: env_or("LEAVE_ON_EMPTY", defaults.leave_on_empty)?,
            leave_on_empty_cooldown: match std::env::var("LEAVE_ON_EMPTY_COOLDOWN") {
                Ok(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())
                    .context("LEAVE_ON_EMPTY_COOLDOWN inválido")?,
                _ => defaults.leave_on_empty_cooldown,
            },
            max_queue_size: env_or("MAX_QUEUE_SIZE", defaults.max_queue_size)?,

            // Búsqueda
            max_playlist_size: env_or("MAX_PLAYLIST_SIZE", defaults.max_playlist_size)?,
            search_limit: env_or("SEARCH_LIMIT", defaults.search_limit)?,
            enable_default_extractors: env_or(
                "ENABLE_DEFAULT_EXTRACTORS",
                defaults.enable_default_extractors,
            )?,

            // Fuentes
            ytdlp_path: std::env::var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            spotify_client_id: optional_env("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: optional_env("SPOTIFY_CLIENT_SECRET"),
            soundcloud_client_id: optional_env("SOUNDCLOUD_CLIENT_ID"),

            // Descarga
            fetch_quality: std::env::var("FETCH_QUALITY").unwrap_or(defaults.fetch_quality),
            fetch_high_water_mark: env_or("FETCH_HIGH_WATER_MARK", defaults.fetch_high_water_mark)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Queue, playlist and search limits must be greater than 0
    /// - Spotify credentials must be provided together
    /// - The yt-dlp path must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.max_playlist_size == 0 {
            anyhow::bail!("Max playlist size must be greater than 0");
        }

        if self.search_limit == 0 {
            anyhow::bail!("Search limit must be greater than 0");
        }

        if self.spotify_client_id.is_some() != self.spotify_client_secret.is_some() {
            anyhow::bail!("SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET must be set together");
        }

        if self.ytdlp_path.trim().is_empty() {
            anyhow::bail!("YTDLP_PATH cannot be empty");
        }

        Ok(())
    }

    /// Opciones de descarga que heredan las sesiones que no traen las suyas
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            quality: self.fetch_quality.clone(),
            high_water_mark: self.fetch_high_water_mark,
        }
    }

    /// Opciones de sesión derivadas de la configuración global
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            leave_on_empty: self.leave_on_empty,
            leave_on_empty_cooldown: self.leave_on_empty_cooldown,
            max_queue_size: self.max_queue_size,
            fetch_options: None,
        }
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Tokens and client secrets are left out.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Sessions: leave_on_empty={} after {}, {} queue\n  \
            Search: {} results, {} playlist items, default extractors={}\n  \
            Sources: yt-dlp='{}', Spotify={}, SoundCloud={}",
            self.leave_on_empty,
            humantime::format_duration(self.leave_on_empty_cooldown),
            self.max_queue_size,
            self.search_limit,
            self.max_playlist_size,
            self.enable_default_extractors,
            self.ytdlp_path,
            self.spotify_client_id.is_some(),
            self.soundcloud_client_id.is_some(),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            discord_token: String::new(),

            leave_on_empty: true,
            leave_on_empty_cooldown: Duration::ZERO,
            max_queue_size: 1000,

            max_playlist_size: 100,
            search_limit: 10,
            enable_default_extractors: true,

            ytdlp_path: "yt-dlp".to_string(),
            spotify_client_id: None,
            spotify_client_secret: None,
            soundcloud_client_id: None,

            fetch_quality: "bestaudio".to_string(),
            fetch_high_water_mark: 1 << 25,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) if !val.trim().is_empty() => val
            .trim()
            .parse()
            .with_context(|| format!("Valor inválido para {}", key)),
        _ => Ok(default),
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|val| !val.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.leave_on_empty_cooldown, Duration::ZERO);
        assert!(config.session_options().fetch_options.is_none());
    }

    #[test]
    fn test_spotify_credentials_must_be_paired() {
        let config = Config {
            spotify_client_id: Some("id".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_secrets() {
        let config = Config {
            discord_token: "super-secret".to_string(),
            spotify_client_id: Some("id".to_string()),
            spotify_client_secret: Some("hidden".to_string()),
            ..Config::default()
        };
        let summary = config.summary();
        assert!(!summary.contains("super-secret"));
        assert!(!summary.contains("hidden"));
        assert!(summary.contains("Spotify=true"));
    }
}
