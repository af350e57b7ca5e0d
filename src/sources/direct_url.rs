use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use super::extractor::{ExtractedTrack, ExtractorInfo, Extractor};
use crate::audio::track::TrackSource;

const AUDIO_EXTENSIONS: [&str; 7] = [".mp3", ".wav", ".ogg", ".flac", ".m4a", ".opus", ".webm"];

/// Extractor por defecto para enlaces directos a archivos de audio
/// (adjuntos de Discord, CDNs, etc.)
#[derive(Debug, Default)]
pub struct DirectUrlExtractor;

impl DirectUrlExtractor {
    pub fn new() -> Self {
        Self
    }

    fn parse(query: &str) -> Option<Url> {
        let url = Url::parse(query.trim()).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        let path = url.path().to_lowercase();
        AUDIO_EXTENSIONS
            .iter()
            .any(|ext| path.ends_with(ext))
            .then_some(url)
    }
}

#[async_trait]
impl Extractor for DirectUrlExtractor {
    fn validate(&self, query: &str) -> bool {
        Self::parse(query).is_some()
    }

    async fn get_info(&self, query: &str) -> Result<Option<ExtractorInfo>> {
        let Some(url) = Self::parse(query) else {
            return Ok(None);
        };

        let file_name = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();
        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        let title = urlencoding::decode(stem)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| stem.to_string());

        Ok(Some(ExtractorInfo {
            playlist: None,
            tracks: vec![ExtractedTrack {
                title,
                author: url.host_str().unwrap_or_default().to_string(),
                url: url.to_string(),
                source: Some(TrackSource::Arbitrary),
                ..Default::default()
            }],
        }))
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }
}
