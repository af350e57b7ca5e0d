//! Guild Music: resolución de consultas en múltiples fuentes y ciclo de
//! vida de sesiones de voz por guild.

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;

pub use audio::{
    player::{MusicPlayer, PlayerEvent, VoiceTransition},
    session::{FetchOptions, Session, SessionOptions},
    track::{format_duration, parse_duration, Playlist, PlaylistKind, Track, TrackSource},
};
pub use config::Config;
pub use error::{PlayerError, Result};
pub use sources::{ResolveOptions, SearchEngine, SearchResult, SourceProviders};
