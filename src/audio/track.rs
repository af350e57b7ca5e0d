use serde::{Deserialize, Serialize};
use serde_json::Value;
use serenity::model::id::UserId;
use std::{
    fmt,
    sync::{Arc, Weak},
};

/// Proveedor de origen de un track o playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    YouTube,
    SoundCloud,
    Spotify,
    /// Resultado entregado por un extractor registrado
    Extractor,
    #[default]
    Arbitrary,
}

impl TrackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackSource::YouTube => "youtube",
            TrackSource::SoundCloud => "soundcloud",
            TrackSource::Spotify => "spotify",
            TrackSource::Extractor => "extractor",
            TrackSource::Arbitrary => "arbitrary",
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    #[default]
    Playlist,
    Album,
    /// Grupo de tracks de un mismo origen sin contenedor propio
    Group,
}

/// Datos normalizados de un track antes de asignarle solicitante y playlist.
///
/// La duración solo viaja en milisegundos: el texto `m:ss` lo genera
/// [`Track`] con [`format_duration`].
#[derive(Debug, Clone, Default)]
pub struct TrackInfo {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub thumbnail: String,
    pub duration_ms: u64,
    pub views: u64,
    pub source: TrackSource,
    pub raw: Option<Value>,
}

/// Una unidad reproducible ya resuelta
#[derive(Debug, Clone)]
pub struct Track {
    title: String,
    description: String,
    author: String,
    url: String,
    thumbnail: String,
    duration: String,
    duration_ms: u64,
    views: u64,
    source: TrackSource,
    requested_by: UserId,
    playlist: Option<Weak<Playlist>>,
    raw: Option<Value>,
}

impl Track {
    pub(crate) fn new(info: TrackInfo, requested_by: UserId, playlist: Option<Weak<Playlist>>) -> Self {
        Self {
            duration: format_duration(info.duration_ms),
            title: info.title,
            description: info.description,
            author: info.author,
            url: info.url,
            thumbnail: info.thumbnail,
            duration_ms: info.duration_ms,
            views: info.views,
            source: info.source,
            requested_by,
            playlist,
            raw: info.raw,
        }
    }

    // Getters
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn author(&self) -> &str {
        &self.author
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn thumbnail(&self) -> &str {
        &self.thumbnail
    }
    pub fn duration(&self) -> &str {
        &self.duration
    }
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
    pub fn views(&self) -> u64 {
        self.views
    }
    pub fn source(&self) -> TrackSource {
        self.source
    }
    pub fn requested_by(&self) -> UserId {
        self.requested_by
    }
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    /// Playlist a la que pertenece, mientras siga viva.
    ///
    /// La referencia es débil: quien guarda el `Arc<Playlist>` la mantiene.
    pub fn playlist(&self) -> Option<Arc<Playlist>> {
        self.playlist.as_ref().and_then(Weak::upgrade)
    }

    pub fn to_json(&self) -> TrackJson {
        TrackJson {
            title: self.title.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            url: self.url.clone(),
            thumbnail: self.thumbnail.clone(),
            duration: self.duration.clone(),
            duration_ms: self.duration_ms,
            views: self.views,
            source: self.source,
            requested_by: self.requested_by.to_string(),
            playlist: self.playlist().map(|p| p.id.clone()),
        }
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

/// Resumen serializable de un track, sin el payload nativo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackJson {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub thumbnail: String,
    pub duration: String,
    pub duration_ms: u64,
    pub views: u64,
    pub source: TrackSource,
    pub requested_by: String,
    pub playlist: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaylistAuthor {
    pub name: String,
    pub url: Option<String>,
}

/// Metadatos de una playlist antes de construirla
#[derive(Debug, Clone, Default)]
pub struct PlaylistInfo {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub kind: PlaylistKind,
    pub source: TrackSource,
    pub author: PlaylistAuthor,
    pub id: String,
    pub url: String,
    pub raw: Option<Value>,
}

/// Colección ordenada de tracks con un mismo origen
#[derive(Debug)]
pub struct Playlist {
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub kind: PlaylistKind,
    pub source: TrackSource,
    pub author: PlaylistAuthor,
    pub id: String,
    pub url: String,
    tracks: Vec<Track>,
    raw: Option<Value>,
}

impl Playlist {
    /// Construye la playlist en dos fases.
    ///
    /// El handle débil existe antes de que la lista de tracks esté llena, así
    /// cada track nace apuntando a su playlist y la referencia nunca queda
    /// vacía.
    pub(crate) fn assemble<F>(info: PlaylistInfo, build_tracks: F) -> Arc<Playlist>
    where
        F: FnOnce(&Weak<Playlist>) -> Vec<Track>,
    {
        Arc::new_cyclic(|playlist| Playlist {
            tracks: build_tracks(playlist),
            title: info.title,
            description: info.description,
            thumbnail: info.thumbnail,
            kind: info.kind,
            source: info.source,
            author: info.author,
            id: info.id,
            url: info.url,
            raw: info.raw,
        })
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    /// Duración total en milisegundos
    pub fn duration_ms(&self) -> u64 {
        self.tracks.iter().map(Track::duration_ms).sum()
    }

    pub fn to_json(&self, with_tracks: bool) -> PlaylistJson {
        PlaylistJson {
            id: self.id.clone(),
            url: self.url.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail: self.thumbnail.clone(),
            kind: self.kind,
            source: self.source,
            author: self.author.clone(),
            tracks: if with_tracks {
                self.tracks.iter().map(Track::to_json).collect()
            } else {
                Vec::new()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistJson {
    pub id: String,
    pub url: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
    pub source: TrackSource,
    pub author: PlaylistAuthor,
    pub tracks: Vec<TrackJson>,
}

const SECOND_UNITS: [u64; 4] = [86_400, 3_600, 60, 1];

/// Convierte milisegundos en un código de tiempo `m:ss`, `h:mm:ss` o `d:hh:mm:ss`.
///
/// Las unidades iniciales en cero se omiten, pero minutos y segundos
/// siempre aparecen.
pub fn format_duration(ms: u64) -> String {
    let total_secs = ms / 1000;
    let parts = [
        total_secs / 86_400,
        (total_secs / 3_600) % 24,
        (total_secs / 60) % 60,
        total_secs % 60,
    ];

    let first = parts.iter().position(|p| *p != 0).unwrap_or(2).min(2);

    parts[first..]
        .iter()
        .enumerate()
        .map(|(i, p)| if i == 0 { p.to_string() } else { format!("{:02}", p) })
        .collect::<Vec<_>>()
        .join(":")
}

/// Inversa de [`format_duration`]: `"1:05"` -> `65000`
pub fn parse_duration(timecode: &str) -> Option<u64> {
    let parts: Vec<&str> = timecode.trim().split(':').collect();
    if parts.is_empty() || parts.len() > SECOND_UNITS.len() {
        return None;
    }

    let units = &SECOND_UNITS[SECOND_UNITS.len() - parts.len()..];
    let mut secs = 0u64;
    for (part, unit) in parts.iter().zip(units) {
        let value: u64 = part.parse().ok()?;
        secs = secs.checked_add(value.checked_mul(*unit)?)?;
    }

    secs.checked_mul(1000)
}
