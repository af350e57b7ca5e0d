use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serenity::{
    cache::Cache,
    model::{
        id::{ChannelId, GuildId, UserId},
        voice::VoiceState,
    },
};
use songbird::{Call, Songbird};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Conexión de voz activa de una sesión
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Canal al que está conectado el bot
    async fn channel_id(&self) -> Option<ChannelId>;

    /// `true` si no queda ningún humano en el canal del bot
    async fn is_channel_empty(&self) -> bool;

    async fn disconnect(&self) -> Result<()>;
}

/// Estado de voz de un miembro, reducido a lo que necesita el reactor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceStateSnapshot {
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    pub channel_id: Option<ChannelId>,
}

impl VoiceStateSnapshot {
    pub fn new(guild_id: GuildId, user_id: UserId, channel_id: Option<ChannelId>) -> Self {
        Self {
            guild_id: Some(guild_id),
            user_id,
            channel_id,
        }
    }

    /// Estado previo sintético cuando la plataforma no entrega el anterior
    pub fn without_channel(&self) -> Self {
        Self {
            channel_id: None,
            ..*self
        }
    }
}

impl From<&VoiceState> for VoiceStateSnapshot {
    fn from(state: &VoiceState) -> Self {
        Self {
            guild_id: state.guild_id,
            user_id: state.user_id,
            channel_id: state.channel_id,
        }
    }
}

/// Conexión de voz respaldada por songbird; la ocupación del canal se lee
/// de la caché de serenity.
pub struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    cache: Arc<Cache>,
}

impl SongbirdConnection {
    pub async fn join(
        manager: Arc<Songbird>,
        cache: Arc<Cache>,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Self> {
        let call = manager
            .join(guild_id, channel_id)
            .await
            .context("Error al conectar al canal de voz")?;

        info!("🔊 Conectado al canal {} en guild {}", channel_id, guild_id);

        Ok(Self {
            guild_id,
            manager,
            call,
            cache,
        })
    }

    pub fn call(&self) -> Arc<Mutex<Call>> {
        self.call.clone()
    }
}

/// `true` si algún humano ocupa `channel_id`. El bot propio nunca cuenta;
/// sin `member` se consulta `cached_is_bot` y un usuario desconocido cuenta
/// como humano.
fn channel_has_humans<'a, F>(
    states: impl IntoIterator<Item = &'a VoiceState>,
    channel_id: ChannelId,
    bot_id: UserId,
    cached_is_bot: F,
) -> bool
where
    F: Fn(UserId) -> Option<bool>,
{
    states.into_iter().any(|state| {
        if state.channel_id != Some(channel_id) || state.user_id == bot_id {
            return false;
        }

        match &state.member {
            Some(member) => !member.user.bot,
            None => !cached_is_bot(state.user_id).unwrap_or(false),
        }
    })
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn channel_id(&self) -> Option<ChannelId> {
        let call = self.call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn is_channel_empty(&self) -> bool {
        let Some(channel_id) = self.channel_id().await else {
            return true;
        };

        let bot_id = self.cache.current_user().id;
        let Some(guild) = self.cache.guild(self.guild_id) else {
            debug!("Guild {} fuera de caché, canal considerado vacío", self.guild_id);
            return true;
        };

        !channel_has_humans(guild.voice_states.values(), channel_id, bot_id, |user_id| {
            self.cache.user(user_id).map(|user| user.bot)
        })
    }

    async fn disconnect(&self) -> Result<()> {
        self.manager
            .remove(self.guild_id)
            .await
            .context("Error al salir del canal de voz")?;

        info!("👋 Desconectado del canal de voz en guild {}", self.guild_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BOT: u64 = 999;
    const VOICE: u64 = 10;

    fn state(user: u64, channel: Option<u64>) -> VoiceState {
        serde_json::from_value(json!({
            "guild_id": "1",
            "channel_id": channel.map(|id| id.to_string()),
            "user_id": user.to_string(),
            "member": null,
            "session_id": format!("session-{}", user),
            "deaf": false,
            "mute": false,
            "self_deaf": false,
            "self_mute": false,
            "self_stream": false,
            "self_video": false,
            "suppress": false,
            "request_to_speak_timestamp": null
        }))
        .unwrap()
    }

    fn occupied(states: &[VoiceState], bots: &[u64]) -> bool {
        channel_has_humans(states, ChannelId::new(VOICE), UserId::new(BOT), |user_id| {
            Some(bots.contains(&user_id.get()))
        })
    }

    #[test]
    fn test_channel_with_only_bots_is_empty() {
        let states = vec![state(BOT, Some(VOICE)), state(50, Some(VOICE)), state(5, Some(VOICE + 1))];
        assert!(!occupied(&states, &[50]));
        assert!(!occupied(&[], &[]));
    }

    #[test]
    fn test_channel_with_human_is_occupied() {
        let states = vec![state(BOT, Some(VOICE)), state(5, Some(VOICE))];
        assert!(occupied(&states, &[]));

        // un usuario fuera de caché cuenta como humano
        let unknown = channel_has_humans(&states, ChannelId::new(VOICE), UserId::new(BOT), |_| None);
        assert!(unknown);
    }

    #[test]
    fn test_snapshot_from_voice_state() {
        let snapshot = VoiceStateSnapshot::from(&state(5, Some(VOICE)));
        assert_eq!(
            snapshot,
            VoiceStateSnapshot::new(GuildId::new(1), UserId::new(5), Some(ChannelId::new(VOICE)))
        );
        assert_eq!(snapshot.without_channel().channel_id, None);
    }
}
