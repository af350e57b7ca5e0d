use dashmap::DashMap;
use serenity::model::id::GuildId;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    audio::session::{FetchOptions, Session, SessionOptions},
    bot::{
        identity::{GuildRef, IdentityResolver},
        voice::VoiceStateSnapshot,
    },
    config::Config,
    error::{PlayerError, Result},
    sources::{
        DirectUrlExtractor, ExtractorModel, ExtractorRegistry, ExtractorSource, ResolveOptions, SearchPipeline,
        SearchQuery, SearchResult, SourceProviders, DEFAULT_EXTRACTOR,
    },
};

/// Notificaciones que publica el reproductor
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    /// El bot fue sacado del canal de voz y la sesión se cerró
    BotDisconnected(Arc<Session>),
    /// El canal quedó vacío durante todo el cooldown y la sesión se cerró
    ChannelEmpty(Arc<Session>),
}

impl PlayerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerEvent::BotDisconnected(_) => "bot-disconnected",
            PlayerEvent::ChannelEmpty(_) => "empty-channel",
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        match self {
            PlayerEvent::BotDisconnected(session) | PlayerEvent::ChannelEmpty(session) => session,
        }
    }
}

/// Lo que hizo el reactor con un cambio de estado de voz
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    /// No hay sesión para ese guild
    Ignored,
    /// El bot salió del canal: sesión cerrada de inmediato
    BotDisconnected,
    /// Volvió alguien al canal y se canceló el temporizador
    CooldownCancelled,
    /// El canal quedó vacío y arrancó el temporizador
    CooldownStarted,
    Unchanged,
}

struct PlayerInner {
    sessions: DashMap<GuildId, Arc<Session>>,
    extractors: Arc<ExtractorRegistry>,
    search: SearchPipeline,
    identities: Arc<dyn IdentityResolver>,
    default_fetch: FetchOptions,
    default_session: SessionOptions,
    events: flume::Sender<PlayerEvent>,
}

/// Orquestador de sesiones por guild.
///
/// Clonarlo es barato: todos los clones comparten el mismo registro.
#[derive(Clone)]
pub struct MusicPlayer {
    inner: Arc<PlayerInner>,
}

impl MusicPlayer {
    pub fn new(
        config: &Config,
        providers: SourceProviders,
        identities: Arc<dyn IdentityResolver>,
    ) -> (Self, flume::Receiver<PlayerEvent>) {
        let extractors = Arc::new(ExtractorRegistry::new());
        if config.enable_default_extractors {
            if let Err(e) = extractors.register(DEFAULT_EXTRACTOR, Arc::new(DirectUrlExtractor::new()), false) {
                warn!("⚠️ No se pudo registrar el extractor por defecto: {}", e);
            }
        }

        let search = SearchPipeline::new(
            extractors.clone(),
            identities.clone(),
            providers,
            config.search_limit,
            config.max_playlist_size,
        );

        let (events, receiver) = flume::unbounded();

        let player = Self {
            inner: Arc::new(PlayerInner {
                sessions: DashMap::new(),
                extractors,
                search,
                identities,
                default_fetch: config.fetch_options(),
                default_session: config.session_options(),
                events,
            }),
        };

        info!("🎵 Reproductor inicializado ({} extractores)", player.inner.extractors.len());
        (player, receiver)
    }

    // Extractores

    pub fn register_extractor(
        &self,
        name: &str,
        source: impl Into<ExtractorSource>,
        force: bool,
    ) -> Result<Arc<ExtractorModel>> {
        self.inner.extractors.register(name, source, force)
    }

    pub fn unregister_extractor(&self, name: &str) -> Result<Arc<ExtractorModel>> {
        self.inner.extractors.unregister(name)
    }

    pub fn get_extractor(&self, name: &str) -> Option<Arc<ExtractorModel>> {
        self.inner.extractors.get(name)
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.inner.extractors
    }

    // Búsqueda

    pub async fn resolve(&self, query: impl Into<SearchQuery>, options: &ResolveOptions) -> Result<SearchResult> {
        self.inner.search.resolve(query, options).await
    }

    // Sesiones

    /// Opciones de sesión que vienen de la configuración
    pub fn default_session_options(&self) -> SessionOptions {
        self.inner.default_session.clone()
    }

    /// Devuelve la sesión del guild, creándola si no existe.
    ///
    /// Si ya existe se devuelve tal cual y `options` se ignora.
    pub fn open_session(&self, guild: impl Into<GuildRef>, options: SessionOptions) -> Result<Arc<Session>> {
        let guild_id = self.resolve_guild(guild.into())?;

        let session = self
            .inner
            .sessions
            .entry(guild_id)
            .or_insert_with(|| {
                info!("🆕 Nueva sesión para guild {}", guild_id);
                Arc::new(Session::new(guild_id, options, &self.inner.default_fetch))
            })
            .value()
            .clone();

        Ok(session)
    }

    pub fn get_session(&self, guild: impl Into<GuildRef>) -> Result<Option<Arc<Session>>> {
        let guild_id = self.resolve_guild(guild.into())?;
        Ok(self.inner.session(guild_id))
    }

    /// Cierra y elimina la sesión del guild. Los errores al desconectar se
    /// registran y no se propagan.
    pub async fn close_session(&self, guild: impl Into<GuildRef>) -> Result<Option<Arc<Session>>> {
        let guild_id = self.resolve_guild(guild.into())?;
        let Some(session) = self.inner.session(guild_id) else {
            return Ok(None);
        };

        self.inner.teardown(&session).await;
        self.inner.unregister(&session);
        Ok(Some(session))
    }

    pub fn sessions_count(&self) -> usize {
        self.inner.sessions.len()
    }

    fn resolve_guild(&self, guild: GuildRef) -> Result<GuildId> {
        self.inner
            .identities
            .resolve_guild(&guild)
            .ok_or_else(|| PlayerError::UnknownGuild(guild.to_string()))
    }

    // Reactor de estados de voz

    /// Procesa un cambio de estado de voz de cualquier miembro del guild.
    ///
    /// La única fuente de verdad para el temporizador es si el canal del bot
    /// está vacío en este momento.
    pub async fn handle_voice_state_change(
        &self,
        old: &VoiceStateSnapshot,
        new: &VoiceStateSnapshot,
    ) -> VoiceTransition {
        let Some(guild_id) = new.guild_id.or(old.guild_id) else {
            return VoiceTransition::Ignored;
        };
        let Some(session) = self.inner.session(guild_id) else {
            return VoiceTransition::Ignored;
        };

        if self.inner.identities.current_user() == Some(new.user_id) && new.channel_id.is_none() {
            if !self.inner.unregister(&session) {
                return VoiceTransition::Ignored;
            }

            warn!("🔌 Bot desconectado del canal de voz en guild {}", guild_id);
            self.inner.teardown(&session).await;
            self.inner.publish(PlayerEvent::BotDisconnected(session));
            return VoiceTransition::BotDisconnected;
        }

        if !session.options().leave_on_empty {
            return VoiceTransition::Unchanged;
        }
        let Some(connection) = session.connection() else {
            return VoiceTransition::Unchanged;
        };
        if connection.channel_id().await.is_none() {
            return VoiceTransition::Unchanged;
        }

        if !connection.is_channel_empty().await {
            if session.cancel_empty_cooldown() {
                info!("👥 Alguien volvió al canal en guild {}, cooldown cancelado", guild_id);
                return VoiceTransition::CooldownCancelled;
            }
            return VoiceTransition::Unchanged;
        }

        let departed = old.channel_id.is_some() && old.channel_id != new.channel_id;
        if !departed {
            return VoiceTransition::Unchanged;
        }

        let delay = session.options().leave_on_empty_cooldown;
        let player = Arc::downgrade(&self.inner);
        let target = Arc::downgrade(&session);
        let armed = session.arm_empty_cooldown(|id| {
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let (Some(player), Some(session)) = (player.upgrade(), target.upgrade()) {
                    player.expire_empty_cooldown(session, id).await;
                }
            })
        });

        // un temporizador pendiente conserva su plazo original
        if !armed {
            return VoiceTransition::Unchanged;
        }

        info!("⏳ Canal vacío en guild {}, saliendo en {:?}", guild_id, delay);
        VoiceTransition::CooldownStarted
    }
}

impl PlayerInner {
    fn session(&self, guild_id: GuildId) -> Option<Arc<Session>> {
        self.sessions.get(&guild_id).map(|entry| entry.value().clone())
    }

    /// Quita la sesión del registro solo si sigue siendo la registrada
    fn unregister(&self, session: &Arc<Session>) -> bool {
        self.sessions
            .remove_if(&session.guild_id(), |_, registered| Arc::ptr_eq(registered, session))
            .is_some()
    }

    async fn teardown(&self, session: &Session) {
        if let Err(e) = session.destroy().await {
            warn!("⚠️ Error al cerrar la sesión de guild {}: {}", session.guild_id(), e);
        }
    }

    fn publish(&self, event: PlayerEvent) {
        let name = event.name();
        if self.events.send(event).is_err() {
            debug!("Evento '{}' sin receptor", name);
        }
    }

    async fn expire_empty_cooldown(&self, session: Arc<Session>, id: u64) {
        let still_empty = match session.connection() {
            Some(connection) => connection.channel_id().await.is_some() && connection.is_channel_empty().await,
            None => false,
        };

        // a partir de aquí nadie puede abortar esta tarea
        if !session.detach_empty_cooldown(id) {
            return;
        }
        if !still_empty {
            debug!("Canal de guild {} ya no está vacío al vencer el cooldown", session.guild_id());
            return;
        }
        if !self.unregister(&session) {
            return;
        }

        info!("👋 Canal vacío en guild {}, cerrando sesión", session.guild_id());
        self.teardown(&session).await;
        self.publish(PlayerEvent::ChannelEmpty(session));
    }
}

impl std::fmt::Debug for MusicPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MusicPlayer")
            .field("sessions", &self.inner.sessions.len())
            .field("extractors", &self.inner.extractors.names())
            .finish()
    }
}
