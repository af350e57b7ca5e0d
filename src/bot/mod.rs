//! # Bot Module
//!
//! Glue between the Discord gateway and the session lifecycle.
//!
//! - [`identity`]: loose guild/user references and their resolution
//! - [`voice`]: voice connections (songbird) and voice-state snapshots
//! - [`VoiceStateRelay`]: Serenity [`EventHandler`] that feeds every
//!   `voice_state_update` into [`MusicPlayer::handle_voice_state_change`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use guild_music::bot::VoiceStateRelay;
//! # fn example(player: guild_music::MusicPlayer) {
//! let handler = VoiceStateRelay::new(player);
//! # }
//! ```

use serenity::{
    all::{Context, EventHandler, Ready, VoiceState},
    async_trait,
};
use tracing::{debug, info};

pub mod identity;
pub mod voice;

use crate::audio::player::{MusicPlayer, VoiceTransition};
use voice::VoiceStateSnapshot;

/// Reenvía los cambios de estado de voz al reproductor
pub struct VoiceStateRelay {
    player: MusicPlayer,
}

impl VoiceStateRelay {
    pub fn new(player: MusicPlayer) -> Self {
        Self { player }
    }
}

#[async_trait]
impl EventHandler for VoiceStateRelay {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let new = VoiceStateSnapshot::from(&new);
        // sin estado previo en caché se asume que el miembro no estaba en un canal
        let old = old
            .as_ref()
            .map(VoiceStateSnapshot::from)
            .unwrap_or_else(|| new.without_channel());

        let transition = self.player.handle_voice_state_change(&old, &new).await;
        if transition != VoiceTransition::Ignored {
            debug!(
                "Estado de voz de {} en guild {:?}: {:?}",
                new.user_id, new.guild_id, transition
            );
        }
    }
}
