//! Resolution pipeline: turns a user query into tracks (and maybe a playlist).
//!
//! Registered extractors are consulted first, in registration order. When
//! none of them produce data the query is classified (or the forced kind is
//! used) and dispatched to exactly one built-in provider. Provider failures
//! never escape: they are logged and resolve to an empty result.

use serenity::model::id::UserId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    extractor::ExtractorRegistry,
    query::{classify, QueryKind, SearchEngine},
    soundcloud::{SoundCloudPlaylist, SoundCloudProvider, SoundCloudTrack, SoundCloudUser},
    spotify::{SpotifyCollection, SpotifyCollectionKind, SpotifyProvider, SpotifyTrack},
    youtube::{YouTubePlaylist, YouTubeProvider, YouTubeVideo},
    SourceProviders, GENERIC_THUMBNAIL, SOUNDCLOUD_THUMBNAIL, SPOTIFY_THUMBNAIL, UNKNOWN_ARTIST,
};
use crate::{
    audio::track::{Playlist, PlaylistAuthor, PlaylistInfo, PlaylistKind, Track, TrackInfo, TrackSource},
    bot::identity::{IdentityResolver, UserRef},
    error::{PlayerError, Result},
};

/// Lo que se puede resolver: texto libre o un track ya resuelto
#[derive(Debug, Clone)]
pub enum SearchQuery {
    Text(String),
    Track(Track),
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        SearchQuery::Text(text.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        SearchQuery::Text(text)
    }
}

impl From<Track> for SearchQuery {
    fn from(track: Track) -> Self {
        SearchQuery::Track(track)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Usuario que pidió la búsqueda. Obligatorio.
    pub requested_by: Option<UserRef>,
    pub search_engine: SearchEngine,
    /// Saltar los extractores registrados
    pub block_extractors: bool,
}

impl ResolveOptions {
    pub fn new(requested_by: impl Into<UserRef>) -> Self {
        Self {
            requested_by: Some(requested_by.into()),
            ..Default::default()
        }
    }

    pub fn with_engine(mut self, engine: impl Into<SearchEngine>) -> Self {
        self.search_engine = engine.into();
        self
    }

    pub fn without_extractors(mut self) -> Self {
        self.block_extractors = true;
        self
    }
}

/// Resultado de una resolución
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub playlist: Option<Arc<Playlist>>,
    pub tracks: Vec<Track>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

pub struct SearchPipeline {
    extractors: Arc<ExtractorRegistry>,
    identities: Arc<dyn IdentityResolver>,
    youtube: Arc<dyn YouTubeProvider>,
    soundcloud: Arc<dyn SoundCloudProvider>,
    spotify: Arc<dyn SpotifyProvider>,
    search_limit: usize,
    playlist_limit: usize,
}

impl SearchPipeline {
    pub fn new(
        extractors: Arc<ExtractorRegistry>,
        identities: Arc<dyn IdentityResolver>,
        providers: SourceProviders,
        search_limit: usize,
        playlist_limit: usize,
    ) -> Self {
        Self {
            extractors,
            identities,
            youtube: providers.youtube,
            soundcloud: providers.soundcloud,
            spotify: providers.spotify,
            search_limit,
            playlist_limit,
        }
    }

    pub async fn resolve(&self, query: impl Into<SearchQuery>, options: &ResolveOptions) -> Result<SearchResult> {
        let query = match query.into() {
            SearchQuery::Track(track) => {
                return Ok(SearchResult {
                    playlist: None,
                    tracks: vec![track],
                })
            }
            SearchQuery::Text(text) => text.trim().to_string(),
        };

        let requester = options
            .requested_by
            .as_ref()
            .ok_or(PlayerError::MissingOptions("requested_by"))?;
        let requested_by = self
            .identities
            .resolve_user(requester)
            .ok_or_else(|| PlayerError::UnknownUser(requester.to_string()))?;

        if !options.block_extractors {
            if let Some(result) = self.try_extractors(&query, requested_by).await {
                return Ok(result);
            }
        }

        let kind = match &options.search_engine {
            SearchEngine::Auto => classify(&query),
            SearchEngine::Kind(kind) => *kind,
            SearchEngine::Named(name) => {
                debug!("Motor de búsqueda desconocido '{}', sin resultados", name);
                return Ok(SearchResult::default());
            }
        };

        info!("🔎 Resolviendo '{}' como {}", query, kind);

        let result = match self.dispatch(kind, &query, requested_by).await {
            Ok(result) => result,
            Err(e) => {
                warn!("⚠️ Error del proveedor para '{}' ({}): {}", query, kind, e);
                SearchResult::default()
            }
        };

        debug!("'{}' resolvió {} tracks", query, result.tracks.len());
        Ok(result)
    }

    async fn try_extractors(&self, query: &str, requested_by: UserId) -> Option<SearchResult> {
        for extractor in self.extractors.snapshot() {
            if !extractor.validate(query) {
                continue;
            }

            debug!("🧩 Extractor '{}' acepta la consulta", extractor.name());
            match extractor.handle(query).await {
                Ok(data) if !data.tracks.is_empty() => {
                    info!(
                        "🧩 Extractor '{}' resolvió {} tracks",
                        extractor.name(),
                        data.tracks.len()
                    );
                    return Some(build_result(data.playlist, data.tracks, requested_by));
                }
                Ok(_) => debug!("Extractor '{}' sin resultados", extractor.name()),
                Err(e) => warn!("⚠️ Extractor '{}' falló: {}", extractor.name(), e),
            }
        }

        None
    }

    async fn dispatch(&self, kind: QueryKind, query: &str, requested_by: UserId) -> anyhow::Result<SearchResult> {
        let result = match kind {
            QueryKind::YouTubeSearch | QueryKind::YouTubeVideo => {
                let videos = self.youtube.search(query, self.search_limit).await?;
                build_result(None, videos.into_iter().map(youtube_track).collect(), requested_by)
            }
            QueryKind::YouTubePlaylist => {
                let playlist = self.youtube.playlist(query, self.playlist_limit).await?;
                let (info, tracks) = youtube_playlist(playlist);
                build_result(Some(info), tracks, requested_by)
            }
            QueryKind::SoundCloudTrack => {
                let track = self.soundcloud.track(query).await?;
                build_result(None, vec![soundcloud_track(track, query)], requested_by)
            }
            QueryKind::SoundCloudSearch => {
                let tracks = self.soundcloud.search(query, self.search_limit).await?;
                let tracks = tracks
                    .into_iter()
                    .filter(|track| track.title.is_some())
                    .map(|track| soundcloud_track(track, query))
                    .collect();
                build_result(None, tracks, requested_by)
            }
            QueryKind::SoundCloudPlaylist => {
                let playlist = self.soundcloud.playlist(query, self.playlist_limit).await?;
                let (info, tracks) = soundcloud_playlist(playlist, query);
                build_result(Some(info), tracks, requested_by)
            }
            QueryKind::SpotifySong => {
                let track = self.spotify.track(query).await?;
                let thumbnail = track
                    .album
                    .as_ref()
                    .and_then(|album| album.images.first())
                    .map(|image| image.url.clone());
                build_result(None, vec![spotify_track(&track, query, thumbnail)], requested_by)
            }
            QueryKind::SpotifyAlbum | QueryKind::SpotifyPlaylist => {
                let collection = self.spotify.collection(query, self.playlist_limit).await?;
                let (info, tracks) = spotify_collection(collection, query);
                build_result(Some(info), tracks, requested_by)
            }
        };

        Ok(result)
    }
}

/// Construye el resultado final. Con playlist, la playlist nace primero y
/// cada track recibe su referencia al crearse.
fn build_result(playlist: Option<PlaylistInfo>, tracks: Vec<TrackInfo>, requested_by: UserId) -> SearchResult {
    match playlist {
        Some(info) => {
            let playlist = Playlist::assemble(info, |handle| {
                tracks
                    .into_iter()
                    .map(|track| Track::new(track, requested_by, Some(handle.clone())))
                    .collect()
            });
            let tracks = playlist.tracks().to_vec();
            SearchResult {
                playlist: Some(playlist),
                tracks,
            }
        }
        None => SearchResult {
            playlist: None,
            tracks: tracks
                .into_iter()
                .map(|track| Track::new(track, requested_by, None))
                .collect(),
        },
    }
}

fn or_unknown(author: Option<String>) -> String {
    author
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string())
}

// YouTube

fn youtube_track(video: YouTubeVideo) -> TrackInfo {
    let raw = serde_json::to_value(&video).ok();
    TrackInfo {
        thumbnail: video
            .thumbnail
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video.id)),
        author: or_unknown(video.channel.map(|channel| channel.name)),
        description: video.description.unwrap_or_default(),
        duration_ms: video.duration_ms.unwrap_or_default(),
        views: video.views.unwrap_or_default(),
        title: video.title,
        url: video.url,
        source: TrackSource::YouTube,
        raw,
    }
}

fn youtube_playlist(playlist: YouTubePlaylist) -> (PlaylistInfo, Vec<TrackInfo>) {
    let raw = serde_json::to_value(&playlist).ok();
    let author = PlaylistAuthor {
        name: or_unknown(playlist.channel.as_ref().map(|channel| channel.name.clone())),
        url: playlist.channel.and_then(|channel| channel.url),
    };
    let thumbnail = playlist
        .thumbnail
        .or_else(|| {
            playlist
                .videos
                .first()
                .map(|video| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video.id))
        })
        .unwrap_or_else(|| GENERIC_THUMBNAIL.to_string());

    let info = PlaylistInfo {
        title: playlist.title,
        description: String::new(),
        thumbnail,
        kind: PlaylistKind::Playlist,
        source: TrackSource::YouTube,
        author,
        id: playlist.id,
        url: playlist.url,
        raw,
    };

    (info, playlist.videos.into_iter().map(youtube_track).collect())
}

// SoundCloud

fn soundcloud_author(user: Option<&SoundCloudUser>) -> String {
    or_unknown(user.and_then(|user| user.username.clone().or_else(|| user.full_name.clone())))
}

fn soundcloud_track(track: SoundCloudTrack, fallback_url: &str) -> TrackInfo {
    let raw = serde_json::to_value(&track).ok();
    TrackInfo {
        author: soundcloud_author(track.user.as_ref()),
        title: track.title.unwrap_or_default(),
        description: track.description.unwrap_or_default(),
        url: track.permalink_url.unwrap_or_else(|| fallback_url.to_string()),
        thumbnail: track.artwork_url.unwrap_or_else(|| SOUNDCLOUD_THUMBNAIL.to_string()),
        duration_ms: track.duration,
        views: track.playback_count.unwrap_or_default(),
        source: TrackSource::SoundCloud,
        raw,
    }
}

fn soundcloud_playlist(playlist: SoundCloudPlaylist, query: &str) -> (PlaylistInfo, Vec<TrackInfo>) {
    let raw = serde_json::to_value(&playlist).ok();
    let url = playlist.permalink_url.clone().unwrap_or_else(|| query.to_string());

    let info = PlaylistInfo {
        title: playlist.title.unwrap_or_default(),
        description: playlist.description.unwrap_or_default(),
        thumbnail: playlist
            .artwork_url
            .unwrap_or_else(|| SOUNDCLOUD_THUMBNAIL.to_string()),
        kind: PlaylistKind::Playlist,
        source: TrackSource::SoundCloud,
        author: PlaylistAuthor {
            name: soundcloud_author(playlist.user.as_ref()),
            url: playlist.user.as_ref().and_then(|user| user.permalink_url.clone()),
        },
        id: playlist.id.to_string(),
        url: url.clone(),
        raw,
    };

    // los stubs sin título no se pueden reproducir
    let tracks = playlist
        .tracks
        .into_iter()
        .filter(|track| track.title.is_some())
        .map(|track| soundcloud_track(track, &url))
        .collect();

    (info, tracks)
}

// Spotify

fn spotify_track(track: &SpotifyTrack, fallback_url: &str, thumbnail: Option<String>) -> TrackInfo {
    TrackInfo {
        title: track.name.clone(),
        description: track.description.clone().unwrap_or_default(),
        author: or_unknown(track.artists.first().map(|artist| artist.name.clone())),
        url: track
            .external_urls
            .spotify
            .clone()
            .unwrap_or_else(|| fallback_url.to_string()),
        thumbnail: thumbnail.unwrap_or_else(|| SPOTIFY_THUMBNAIL.to_string()),
        duration_ms: track.duration_ms,
        views: 0,
        source: TrackSource::Spotify,
        raw: serde_json::to_value(track).ok(),
    }
}

fn spotify_collection(collection: SpotifyCollection, query: &str) -> (PlaylistInfo, Vec<TrackInfo>) {
    let raw = serde_json::to_value(&collection).ok();
    let cover = collection.images.first().map(|image| image.url.clone());

    let (kind, author) = match collection.kind {
        SpotifyCollectionKind::Album => {
            let artist = collection.artists.first();
            (
                PlaylistKind::Album,
                PlaylistAuthor {
                    name: or_unknown(artist.map(|artist| artist.name.clone())),
                    url: artist.and_then(|artist| artist.external_urls.spotify.clone()),
                },
            )
        }
        SpotifyCollectionKind::Playlist => {
            let owner = collection.owner.as_ref();
            (
                PlaylistKind::Playlist,
                PlaylistAuthor {
                    name: or_unknown(owner.and_then(|owner| owner.display_name.clone().or_else(|| owner.id.clone()))),
                    url: owner.and_then(|owner| owner.external_urls.spotify.clone()),
                },
            )
        }
    };

    // los álbumes no traen portada por track; las playlists sí
    let tracks = collection
        .tracks
        .items
        .iter()
        .filter_map(|item| item.track())
        .map(|track| {
            let thumbnail = match collection.kind {
                SpotifyCollectionKind::Album => cover.clone(),
                SpotifyCollectionKind::Playlist => track
                    .album
                    .as_ref()
                    .and_then(|album| album.images.first())
                    .map(|image| image.url.clone()),
            };
            spotify_track(track, query, thumbnail)
        })
        .collect();

    let info = PlaylistInfo {
        title: collection.name.unwrap_or_default(),
        description: collection.description.unwrap_or_default(),
        thumbnail: cover.unwrap_or_else(|| SPOTIFY_THUMBNAIL.to_string()),
        kind,
        source: TrackSource::Spotify,
        author,
        id: collection.id,
        url: collection
            .external_urls
            .spotify
            .unwrap_or_else(|| query.to_string()),
        raw,
    };

    (info, tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        bot::identity::SnowflakeResolver,
        sources::{
            extractor::{ExtractedTrack, Extractor, ExtractorInfo},
            soundcloud::MockSoundCloudProvider,
            spotify::{
                MockSpotifyProvider, SpotifyArtist, SpotifyExternalUrls, SpotifyImage, SpotifyItem, SpotifyPage,
            },
            youtube::{MockYouTubeProvider, YouTubeChannel},
        },
    };
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    const ALBUM_URL: &str = "https://open.spotify.com/album/1DFixLWuPkv3KT3TnV35m3";

    fn pipeline(
        extractors: Arc<ExtractorRegistry>,
        youtube: MockYouTubeProvider,
        soundcloud: MockSoundCloudProvider,
        spotify: MockSpotifyProvider,
    ) -> SearchPipeline {
        SearchPipeline::new(
            extractors,
            Arc::new(SnowflakeResolver::new(None)),
            SourceProviders {
                youtube: Arc::new(youtube),
                soundcloud: Arc::new(soundcloud),
                spotify: Arc::new(spotify),
            },
            10,
            100,
        )
    }

    /// Pipeline cuyos proveedores fallan si se los llama
    fn untouched(extractors: Arc<ExtractorRegistry>) -> SearchPipeline {
        let mut youtube = MockYouTubeProvider::new();
        youtube.expect_search().never();
        youtube.expect_playlist().never();
        let mut soundcloud = MockSoundCloudProvider::new();
        soundcloud.expect_track().never();
        soundcloud.expect_search().never();
        soundcloud.expect_playlist().never();
        let mut spotify = MockSpotifyProvider::new();
        spotify.expect_track().never();
        spotify.expect_collection().never();
        pipeline(extractors, youtube, soundcloud, spotify)
    }

    fn options() -> ResolveOptions {
        ResolveOptions::new(UserId::new(42))
    }

    fn album() -> SpotifyCollection {
        SpotifyCollection {
            id: "alb".to_string(),
            name: Some("Album".to_string()),
            description: None,
            images: vec![SpotifyImage {
                url: "https://i.scdn.co/image/cover".to_string(),
            }],
            kind: SpotifyCollectionKind::Album,
            artists: vec![SpotifyArtist {
                name: "Band".to_string(),
                ..Default::default()
            }],
            owner: None,
            external_urls: SpotifyExternalUrls::default(),
            tracks: SpotifyPage {
                items: vec![
                    SpotifyItem::Track(SpotifyTrack {
                        name: "One".to_string(),
                        artists: vec![SpotifyArtist {
                            name: "Band".to_string(),
                            ..Default::default()
                        }],
                        duration_ms: 65_000,
                        ..Default::default()
                    }),
                    SpotifyItem::Track(SpotifyTrack {
                        name: "Two".to_string(),
                        duration_ms: 3_661_000,
                        ..Default::default()
                    }),
                ],
                next: None,
            },
        }
    }

    struct Claims {
        prefix: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl Extractor for Claims {
        fn validate(&self, query: &str) -> bool {
            query.starts_with(self.prefix)
        }

        async fn get_info(&self, query: &str) -> anyhow::Result<Option<ExtractorInfo>> {
            if self.fail {
                anyhow::bail!("caído");
            }
            Ok(Some(ExtractorInfo {
                playlist: Some(PlaylistInfo {
                    title: "custom".to_string(),
                    ..Default::default()
                }),
                tracks: vec![ExtractedTrack {
                    title: query.to_string(),
                    author: "me".to_string(),
                    ..Default::default()
                }],
            }))
        }
    }

    #[tokio::test]
    async fn test_spotify_album_dispatches_only_to_collection() {
        let mut youtube = MockYouTubeProvider::new();
        youtube.expect_search().never();
        youtube.expect_playlist().never();
        let mut soundcloud = MockSoundCloudProvider::new();
        soundcloud.expect_track().never();
        soundcloud.expect_search().never();
        soundcloud.expect_playlist().never();
        let mut spotify = MockSpotifyProvider::new();
        spotify.expect_track().never();
        spotify
            .expect_collection()
            .withf(|url, limit| url == ALBUM_URL && *limit == 100)
            .times(1)
            .returning(|_, _| Ok(album()));

        let pipeline = pipeline(Arc::new(ExtractorRegistry::new()), youtube, soundcloud, spotify);
        let result = pipeline.resolve(ALBUM_URL, &options()).await.unwrap();

        let playlist = result.playlist.expect("album playlist");
        assert_eq!(playlist.kind, PlaylistKind::Album);
        assert_eq!(playlist.author.name, "Band");
        assert_eq!(result.tracks.len(), 2);
        for track in &result.tracks {
            assert!(Arc::ptr_eq(&track.playlist().unwrap(), &playlist));
            assert_eq!(track.thumbnail(), "https://i.scdn.co/image/cover");
            assert_eq!(track.requested_by(), UserId::new(42));
        }
        assert_eq!(result.tracks[0].duration(), "1:05");
        assert_eq!(result.tracks[1].duration(), "1:01:01");
        assert_eq!(result.tracks[1].author(), UNKNOWN_ARTIST);
        assert_eq!(result.tracks[1].url(), ALBUM_URL);
    }

    #[tokio::test]
    async fn test_padded_query_is_fetched_trimmed() {
        let mut spotify = MockSpotifyProvider::new();
        spotify
            .expect_collection()
            .withf(|url, _| url == ALBUM_URL)
            .times(1)
            .returning(|_, _| Ok(album()));
        let mut youtube = MockYouTubeProvider::new();
        youtube.expect_search().never();

        let pipeline = pipeline(
            Arc::new(ExtractorRegistry::new()),
            youtube,
            MockSoundCloudProvider::new(),
            spotify,
        );
        let padded = format!("  {}\n", ALBUM_URL);
        let result = pipeline.resolve(padded, &options()).await.unwrap();

        assert_eq!(result.tracks.len(), 2);
        assert_eq!(result.tracks[1].url(), ALBUM_URL);
    }

    #[tokio::test]
    async fn test_provider_error_yields_empty_result() {
        let mut youtube = MockYouTubeProvider::new();
        youtube
            .expect_search()
            .times(1)
            .returning(|_, _| Err(anyhow::anyhow!("yt-dlp no disponible")));

        let pipeline = pipeline(
            Arc::new(ExtractorRegistry::new()),
            youtube,
            MockSoundCloudProvider::new(),
            MockSpotifyProvider::new(),
        );
        let result = pipeline.resolve("lofi beats", &options()).await.unwrap();

        assert!(result.playlist.is_none());
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_matching_extractor_takes_priority() {
        let extractors = Arc::new(ExtractorRegistry::new());
        extractors
            .register("broken", Arc::new(Claims { prefix: "custom:", fail: true }), false)
            .unwrap();
        extractors
            .register("custom", Arc::new(Claims { prefix: "custom:", fail: false }), false)
            .unwrap();

        let pipeline = untouched(extractors);
        let result = pipeline.resolve("custom:song", &options()).await.unwrap();

        let playlist = result.playlist.expect("extractor playlist");
        assert_eq!(playlist.title, "custom");
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].title(), "custom:song");
        assert_eq!(result.tracks[0].source(), TrackSource::Extractor);
        assert!(Arc::ptr_eq(&result.tracks[0].playlist().unwrap(), &playlist));
    }

    #[tokio::test]
    async fn test_blocked_extractors_are_skipped() {
        let extractors = Arc::new(ExtractorRegistry::new());
        extractors
            .register("custom", Arc::new(Claims { prefix: "custom:", fail: false }), false)
            .unwrap();

        let mut youtube = MockYouTubeProvider::new();
        youtube.expect_search().times(1).returning(|_, _| Ok(Vec::new()));

        let pipeline = pipeline(
            extractors,
            youtube,
            MockSoundCloudProvider::new(),
            MockSpotifyProvider::new(),
        );
        let result = pipeline
            .resolve("custom:song", &options().without_extractors())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_resolved_track_short_circuits() {
        let track = Track::new(
            TrackInfo {
                title: "known".to_string(),
                ..Default::default()
            },
            UserId::new(1),
            None,
        );

        // no hace falta requested_by para re-encolar un track conocido
        let result = untouched(Arc::new(ExtractorRegistry::new()))
            .resolve(track, &ResolveOptions::default())
            .await
            .unwrap();

        assert!(result.playlist.is_none());
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].title(), "known");
    }

    #[tokio::test]
    async fn test_caller_input_errors() {
        let pipeline = untouched(Arc::new(ExtractorRegistry::new()));

        let missing = pipeline.resolve("song", &ResolveOptions::default()).await;
        assert!(matches!(missing, Err(PlayerError::MissingOptions(_))));

        let unknown = pipeline.resolve("song", &ResolveOptions::new("not a user")).await;
        assert!(matches!(unknown, Err(PlayerError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn test_forced_engine_bypasses_classification() {
        let mut soundcloud = MockSoundCloudProvider::new();
        soundcloud
            .expect_track()
            .withf(|url| url == "just some words")
            .times(1)
            .returning(|_| {
                Ok(SoundCloudTrack {
                    id: 9,
                    title: Some("Forced".to_string()),
                    duration: 5_000,
                    ..Default::default()
                })
            });
        let mut youtube = MockYouTubeProvider::new();
        youtube.expect_search().never();

        let pipeline = pipeline(
            Arc::new(ExtractorRegistry::new()),
            youtube,
            soundcloud,
            MockSpotifyProvider::new(),
        );
        let result = pipeline
            .resolve("just some words", &options().with_engine(QueryKind::SoundCloudTrack))
            .await
            .unwrap();

        assert_eq!(result.tracks.len(), 1);
        let track = &result.tracks[0];
        assert_eq!(track.author(), UNKNOWN_ARTIST);
        assert_eq!(track.thumbnail(), SOUNDCLOUD_THUMBNAIL);
        assert_eq!(track.url(), "just some words");
        assert_eq!(track.duration(), "0:05");
        assert_eq!(track.source(), TrackSource::SoundCloud);
    }

    #[tokio::test]
    async fn test_named_engine_resolves_to_nothing() {
        let result = untouched(Arc::new(ExtractorRegistry::new()))
            .resolve("song", &options().with_engine(SearchEngine::Named("bandcamp".to_string())))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(result.playlist.is_none());
    }

    #[tokio::test]
    async fn test_youtube_search_fallbacks() {
        let mut youtube = MockYouTubeProvider::new();
        youtube
            .expect_search()
            .withf(|query, limit| query == "dQw4w9WgXcQ" && *limit == 10)
            .times(1)
            .returning(|_, _| {
                Ok(vec![
                    YouTubeVideo {
                        id: "dQw4w9WgXcQ".to_string(),
                        title: "Never Gonna Give You Up".to_string(),
                        url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
                        channel: Some(YouTubeChannel {
                            name: "Rick Astley".to_string(),
                            url: None,
                        }),
                        duration_ms: Some(212_000),
                        ..Default::default()
                    },
                    YouTubeVideo {
                        id: "abcdefghijk".to_string(),
                        ..Default::default()
                    },
                ])
            });

        let pipeline = pipeline(
            Arc::new(ExtractorRegistry::new()),
            youtube,
            MockSoundCloudProvider::new(),
            MockSpotifyProvider::new(),
        );
        let result = pipeline.resolve("dQw4w9WgXcQ", &options()).await.unwrap();

        assert!(result.playlist.is_none());
        assert_eq!(result.tracks[0].author(), "Rick Astley");
        assert_eq!(result.tracks[0].duration(), "3:32");
        assert_eq!(result.tracks[1].author(), UNKNOWN_ARTIST);
        assert_eq!(result.tracks[1].description(), "");
        assert_eq!(
            result.tracks[1].thumbnail(),
            "https://i.ytimg.com/vi/abcdefghijk/hqdefault.jpg"
        );
    }

    #[tokio::test]
    async fn test_spotify_playlist_uses_owner_and_track_art() {
        let mut spotify = MockSpotifyProvider::new();
        spotify.expect_collection().times(1).returning(|_, _| {
            Ok(SpotifyCollection {
                id: "pl".to_string(),
                name: Some("Mix".to_string()),
                description: None,
                images: Vec::new(),
                kind: SpotifyCollectionKind::Playlist,
                artists: Vec::new(),
                owner: Some(crate::sources::spotify::SpotifyOwner {
                    id: Some("owner-id".to_string()),
                    display_name: None,
                    external_urls: SpotifyExternalUrls::default(),
                }),
                external_urls: SpotifyExternalUrls::default(),
                tracks: SpotifyPage {
                    items: vec![
                        SpotifyItem::Entry {
                            track: Some(SpotifyTrack {
                                name: "Song".to_string(),
                                album: Some(crate::sources::spotify::SpotifyAlbumRef {
                                    images: vec![SpotifyImage {
                                        url: "https://i.scdn.co/image/song".to_string(),
                                    }],
                                }),
                                ..Default::default()
                            }),
                        },
                        SpotifyItem::Entry { track: None },
                    ],
                    next: None,
                },
            })
        });

        let pipeline = pipeline(
            Arc::new(ExtractorRegistry::new()),
            MockYouTubeProvider::new(),
            MockSoundCloudProvider::new(),
            spotify,
        );
        let result = pipeline
            .resolve("spotify:playlist:37i9dQZF1DXcBWIGoYBM5M", &options())
            .await
            .unwrap();

        let playlist = result.playlist.expect("playlist");
        assert_eq!(playlist.author.name, "owner-id");
        assert_eq!(playlist.thumbnail, SPOTIFY_THUMBNAIL);
        assert_eq!(playlist.description, "");
        assert_eq!(result.tracks.len(), 1);
        assert_eq!(result.tracks[0].thumbnail(), "https://i.scdn.co/image/song");
    }
}
