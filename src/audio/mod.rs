//! # Audio Module
//!
//! Per-guild playback state for Guild Music.
//!
//! ### [`track`] - Track/Playlist model
//! - Resolved playable units with requester and provenance
//! - Playlists built in two phases so every track points back to its owner
//! - Deterministic `m:ss` / `h:mm:ss` time codes
//!
//! ### [`session`] - Guild sessions
//! - Voice connection slot, queued tracks and the empty-channel timer
//! - Idempotent teardown
//!
//! ### [`player`] - Session registry and voice-state reactor
//! - At most one session per guild, first creation wins
//! - Empty-channel cooldowns and forced teardown when the bot is removed
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guild_music::{audio::player::MusicPlayer, config::Config, sources::SourceProviders};
//! use guild_music::bot::identity::SnowflakeResolver;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let providers = SourceProviders::from_config(&config)?;
//! let (player, events) = MusicPlayer::new(&config, providers, Arc::new(SnowflakeResolver::default()));
//!
//! let session = player.open_session("123456789", player.default_session_options())?;
//! println!("{} tracks en cola", session.len());
//! # Ok(())
//! # }
//! ```

pub mod player;
pub mod session;
pub mod track;
