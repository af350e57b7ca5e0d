use regex::Regex;
use std::{convert::Infallible, fmt, str::FromStr, sync::LazyLock};

/// Tipo de consulta: qué proveedor y qué forma de recurso representa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    YouTubeSearch,
    YouTubeVideo,
    YouTubePlaylist,
    SoundCloudTrack,
    SoundCloudSearch,
    SoundCloudPlaylist,
    SpotifySong,
    SpotifyAlbum,
    SpotifyPlaylist,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKind::YouTubeSearch => "youtube_search",
            QueryKind::YouTubeVideo => "youtube_video",
            QueryKind::YouTubePlaylist => "youtube_playlist",
            QueryKind::SoundCloudTrack => "soundcloud_track",
            QueryKind::SoundCloudSearch => "soundcloud_search",
            QueryKind::SoundCloudPlaylist => "soundcloud_playlist",
            QueryKind::SpotifySong => "spotify_song",
            QueryKind::SpotifyAlbum => "spotify_album",
            QueryKind::SpotifyPlaylist => "spotify_playlist",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "youtube" | "youtube_search" => QueryKind::YouTubeSearch,
            "youtube_video" => QueryKind::YouTubeVideo,
            "youtube_playlist" => QueryKind::YouTubePlaylist,
            "soundcloud" | "soundcloud_search" => QueryKind::SoundCloudSearch,
            "soundcloud_track" => QueryKind::SoundCloudTrack,
            "soundcloud_playlist" => QueryKind::SoundCloudPlaylist,
            "spotify_song" | "spotify_track" => QueryKind::SpotifySong,
            "spotify_album" => QueryKind::SpotifyAlbum,
            "spotify_playlist" => QueryKind::SpotifyPlaylist,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Motor de búsqueda pedido por el llamador
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchEngine {
    /// Clasificar la consulta automáticamente
    #[default]
    Auto,
    /// Forzar un tipo concreto, aunque el texto no sea una URL
    Kind(QueryKind),
    /// Nombre no reconocido: la búsqueda no produce resultados
    Named(String),
}

impl From<QueryKind> for SearchEngine {
    fn from(kind: QueryKind) -> Self {
        SearchEngine::Kind(kind)
    }
}

impl FromStr for SearchEngine {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("auto") {
            return Ok(SearchEngine::Auto);
        }

        Ok(QueryKind::from_name(s)
            .map(SearchEngine::Kind)
            .unwrap_or_else(|| SearchEngine::Named(s.to_string())))
    }
}

static SPOTIFY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://open\.spotify\.com/(?:intl-[A-Za-z-]{0,6}/)?(?:user/[A-Za-z0-9_.-]+/)?|spotify:)(track|album|playlist)[/:]([A-Za-z0-9]+)",
    )
    .expect("spotify regex")
});

static SOUNDCLOUD_PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.|m\.)?soundcloud\.com/[^/\s?#]+/sets/[^/\s?#]+")
        .expect("soundcloud playlist regex")
});

static SOUNDCLOUD_TRACK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:(?:www\.|m\.)?soundcloud\.com/[^/\s?#]+/[^/\s?#]+|snd\.sc/[^/\s?#]+|on\.soundcloud\.com/[^/\s?#]+)/?(?:[?#]\S*)?$",
    )
    .expect("soundcloud track regex")
});

static YOUTUBE_PLAYLIST_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:https?://)?(?:www\.|m\.|music\.)?youtube\.com/playlist\?(?:\S*&)?list=[A-Za-z0-9_-]+")
        .expect("youtube playlist regex")
});

static YOUTUBE_VIDEO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:https?://)?(?:www\.|m\.|music\.)?(?:youtube\.com/(?:watch\?(?:\S*&)?v=|embed/|v/|shorts/)|youtu\.be/)[A-Za-z0-9_-]{11}",
    )
    .expect("youtube video regex")
});

static YOUTUBE_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("youtube id regex"));

/// Clasifica una consulta. Es total: cualquier texto tiene un tipo.
///
/// Orden de prioridad: Spotify, SoundCloud, YouTube y por último búsqueda
/// por palabras clave en YouTube.
pub fn classify(query: &str) -> QueryKind {
    let query = query.trim();

    if let Some(caps) = SPOTIFY_REGEX.captures(query) {
        return match &caps[1] {
            "track" => QueryKind::SpotifySong,
            "album" => QueryKind::SpotifyAlbum,
            _ => QueryKind::SpotifyPlaylist,
        };
    }

    if SOUNDCLOUD_PLAYLIST_REGEX.is_match(query) {
        return QueryKind::SoundCloudPlaylist;
    }

    if SOUNDCLOUD_TRACK_REGEX.is_match(query) {
        return QueryKind::SoundCloudTrack;
    }

    if YOUTUBE_PLAYLIST_REGEX.is_match(query) {
        return QueryKind::YouTubePlaylist;
    }

    if YOUTUBE_VIDEO_REGEX.is_match(query) || YOUTUBE_ID_REGEX.is_match(query) {
        return QueryKind::YouTubeVideo;
    }

    QueryKind::YouTubeSearch
}

/// Tipo de recurso de Spotify (`track`, `album`, `playlist`) e id de una URL o URI
pub fn spotify_resource(query: &str) -> Option<(&'static str, String)> {
    let caps = SPOTIFY_REGEX.captures(query.trim())?;
    let kind = match &caps[1] {
        "track" => "track",
        "album" => "album",
        _ => "playlist",
    };
    Some((kind, caps[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spotify_urls() {
        assert_eq!(
            classify("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC"),
            QueryKind::SpotifySong
        );
        assert_eq!(
            classify("https://open.spotify.com/intl-es/album/1DFixLWuPkv3KT3TnV35m3?si=x"),
            QueryKind::SpotifyAlbum
        );
        assert_eq!(
            classify("https://open.spotify.com/user/someone/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            QueryKind::SpotifyPlaylist
        );
        assert_eq!(classify("spotify:track:4uLU6hMCjMI75M1A2tKUQC"), QueryKind::SpotifySong);
        assert_eq!(
            spotify_resource("spotify:album:abc123"),
            Some(("album", "abc123".to_string()))
        );
    }

    #[test]
    fn test_soundcloud_urls() {
        assert_eq!(
            classify("https://soundcloud.com/artist/some-track"),
            QueryKind::SoundCloudTrack
        );
        assert_eq!(
            classify("https://soundcloud.com/artist/sets/summer-mix"),
            QueryKind::SoundCloudPlaylist
        );
        // un perfil no es un track
        assert_eq!(classify("https://soundcloud.com/artist"), QueryKind::YouTubeSearch);
    }

    #[test]
    fn test_youtube_urls() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            QueryKind::YouTubeVideo
        );
        assert_eq!(classify("https://youtu.be/dQw4w9WgXcQ"), QueryKind::YouTubeVideo);
        assert_eq!(classify("dQw4w9WgXcQ"), QueryKind::YouTubeVideo);
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI"),
            QueryKind::YouTubePlaylist
        );
    }

    #[test]
    fn test_anything_else_is_a_search() {
        assert_eq!(classify("never gonna give you up"), QueryKind::YouTubeSearch);
        assert_eq!(classify(""), QueryKind::YouTubeSearch);
        assert_eq!(classify("https://example.com/song"), QueryKind::YouTubeSearch);
    }

    #[test]
    fn test_search_engine_parsing() {
        assert_eq!("auto".parse::<SearchEngine>().unwrap(), SearchEngine::Auto);
        assert_eq!(
            "SoundCloud_Track".parse::<SearchEngine>().unwrap(),
            SearchEngine::Kind(QueryKind::SoundCloudTrack)
        );
        assert_eq!(
            "bandcamp".parse::<SearchEngine>().unwrap(),
            SearchEngine::Named("bandcamp".to_string())
        );
    }
}
