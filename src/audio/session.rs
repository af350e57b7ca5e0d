use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serenity::model::id::GuildId;
use std::{
    collections::VecDeque,
    fmt,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    audio::track::{Playlist, Track},
    bot::voice::VoiceConnection,
};

/// Opciones de descarga de audio que el reproductor usa aguas abajo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub quality: String,
    pub high_water_mark: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            quality: "bestaudio".to_string(),
            high_water_mark: 1 << 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Salir del canal cuando se queda sin humanos
    pub leave_on_empty: bool,
    /// Espera antes de salir de un canal vacío
    pub leave_on_empty_cooldown: Duration,
    pub max_queue_size: usize,
    /// `None` hereda el valor global del reproductor
    pub fetch_options: Option<FetchOptions>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            leave_on_empty: true,
            leave_on_empty_cooldown: Duration::ZERO,
            max_queue_size: 1000,
            fetch_options: None,
        }
    }
}

/// Temporizador de canal vacío pendiente. Solo cabe uno por sesión.
struct EmptyCooldown {
    id: u64,
    handle: JoinHandle<()>,
}

/// Estado de reproducción de un guild
pub struct Session {
    guild_id: GuildId,
    options: SessionOptions,
    fetch_options: FetchOptions,
    connection: RwLock<Option<Arc<dyn VoiceConnection>>>,
    empty_cooldown: Mutex<Option<EmptyCooldown>>,
    tracks: Mutex<VecDeque<Track>>,
    playlists: Mutex<Vec<Arc<Playlist>>>,
    cooldown_seq: AtomicU64,
    destroyed: AtomicBool,
    created_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(guild_id: GuildId, mut options: SessionOptions, default_fetch: &FetchOptions) -> Self {
        let fetch_options = options
            .fetch_options
            .get_or_insert_with(|| default_fetch.clone())
            .clone();

        Self {
            guild_id,
            options,
            fetch_options,
            connection: RwLock::new(None),
            empty_cooldown: Mutex::new(None),
            tracks: Mutex::new(VecDeque::new()),
            playlists: Mutex::new(Vec::new()),
            cooldown_seq: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn fetch_options(&self) -> &FetchOptions {
        &self.fetch_options
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn set_connection(&self, connection: Arc<dyn VoiceConnection>) {
        *self.connection.write() = Some(connection);
    }

    pub fn connection(&self) -> Option<Arc<dyn VoiceConnection>> {
        self.connection.read().clone()
    }

    /// Agrega un track a la cola. Devuelve `false` si la cola está llena.
    pub fn add_track(&self, track: Track) -> bool {
        let mut tracks = self.tracks.lock();
        if tracks.len() >= self.options.max_queue_size {
            debug!("Cola llena en guild {}, se descarta: {}", self.guild_id, track.title());
            return false;
        }

        tracks.push_back(track);
        true
    }

    /// Agrega múltiples tracks respetando el máximo de la cola
    pub fn add_tracks<I>(&self, tracks: I) -> usize
    where
        I: IntoIterator<Item = Track>,
    {
        let mut queue = self.tracks.lock();
        let available = self.options.max_queue_size.saturating_sub(queue.len());
        let before = queue.len();
        queue.extend(tracks.into_iter().take(available));

        let added = queue.len() - before;
        info!("➕ Agregadas {} canciones a la cola de guild {}", added, self.guild_id);
        added
    }

    /// Agrega una playlist completa y la retiene para que sus tracks
    /// conserven la referencia a ella.
    pub fn add_playlist(&self, playlist: Arc<Playlist>) -> usize {
        let added = self.add_tracks(playlist.tracks().iter().cloned());
        if added > 0 {
            self.playlists.lock().push(playlist);
        }
        added
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracks.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.lock().is_empty()
    }

    pub fn clear(&self) {
        self.tracks.lock().clear();
        self.playlists.lock().clear();
    }

    pub fn has_pending_cooldown(&self) -> bool {
        self.empty_cooldown.lock().is_some()
    }

    /// Instala el temporizador de canal vacío si el slot está libre.
    ///
    /// Con un temporizador pendiente no se hace nada y se devuelve `false`:
    /// el plazo corre desde que el canal quedó vacío. `spawn` recibe el id del
    /// temporizador y se ejecuta con el slot bloqueado, así la tarea no puede
    /// vencer antes de quedar registrada.
    pub(crate) fn arm_empty_cooldown<F>(&self, spawn: F) -> bool
    where
        F: FnOnce(u64) -> JoinHandle<()>,
    {
        let mut slot = self.empty_cooldown.lock();
        if slot.is_some() {
            return false;
        }

        let id = self.cooldown_seq.fetch_add(1, Ordering::Relaxed) + 1;
        *slot = Some(EmptyCooldown { id, handle: spawn(id) });
        true
    }

    /// Cancela el temporizador pendiente, si lo hay
    pub(crate) fn cancel_empty_cooldown(&self) -> bool {
        match self.empty_cooldown.lock().take() {
            Some(cooldown) => {
                cooldown.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Libera el slot sin abortar la tarea. Lo llama el propio temporizador al
    /// vencer; devuelve `false` si el slot ya pertenece a otro temporizador.
    pub(crate) fn detach_empty_cooldown(&self, id: u64) -> bool {
        let mut slot = self.empty_cooldown.lock();
        match slot.as_ref() {
            Some(cooldown) if cooldown.id == id => {
                slot.take();
                true
            }
            _ => false,
        }
    }

    /// Cierra la sesión: cancela temporizadores, vacía la cola y sale del canal.
    ///
    /// Llamarla más de una vez no tiene efecto.
    pub async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.cancel_empty_cooldown();
        self.clear();

        let connection = self.connection.write().take();
        if let Some(connection) = connection {
            connection.disconnect().await?;
        }

        info!("🛑 Sesión destruida en guild {}", self.guild_id);
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("guild_id", &self.guild_id)
            .field("options", &self.options)
            .field("tracks", &self.len())
            .field("connected", &self.connection.read().is_some())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::{PlaylistInfo, TrackInfo};
    use async_trait::async_trait;
    use serenity::model::id::{ChannelId, UserId};
    use std::sync::atomic::AtomicUsize;

    struct CountingConnection {
        disconnects: AtomicUsize,
    }

    #[async_trait]
    impl VoiceConnection for CountingConnection {
        async fn channel_id(&self) -> Option<ChannelId> {
            Some(ChannelId::new(10))
        }

        async fn is_channel_empty(&self) -> bool {
            false
        }

        async fn disconnect(&self) -> Result<()> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn track(title: &str) -> Track {
        Track::new(
            TrackInfo {
                title: title.to_string(),
                ..Default::default()
            },
            UserId::new(1),
            None,
        )
    }

    #[test]
    fn test_unset_fetch_options_inherit_default() {
        let default = FetchOptions {
            quality: "lowestaudio".to_string(),
            high_water_mark: 42,
        };
        let inherited = Session::new(GuildId::new(1), SessionOptions::default(), &default);
        assert_eq!(inherited.fetch_options(), &default);
        assert_eq!(inherited.options().fetch_options.as_ref(), Some(&default));

        let own = FetchOptions::default();
        let explicit = Session::new(
            GuildId::new(1),
            SessionOptions {
                fetch_options: Some(own.clone()),
                ..Default::default()
            },
            &default,
        );
        assert_eq!(explicit.fetch_options(), &own);
    }

    #[test]
    fn test_queue_respects_max_size() {
        let session = Session::new(
            GuildId::new(1),
            SessionOptions {
                max_queue_size: 2,
                ..Default::default()
            },
            &FetchOptions::default(),
        );

        assert_eq!(session.add_tracks(vec![track("a"), track("b"), track("c")]), 2);
        assert!(!session.add_track(track("d")));
        assert_eq!(
            session.tracks().iter().map(|t| t.title().to_string()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_added_playlist_keeps_back_references_alive() {
        let session = Session::new(GuildId::new(1), SessionOptions::default(), &FetchOptions::default());
        let playlist = Playlist::assemble(PlaylistInfo::default(), |weak| {
            vec![Track::new(TrackInfo::default(), UserId::new(1), Some(weak.clone()))]
        });

        assert_eq!(session.add_playlist(playlist), 1);
        assert!(session.tracks()[0].playlist().is_some());
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let session = Session::new(GuildId::new(1), SessionOptions::default(), &FetchOptions::default());
        let connection = Arc::new(CountingConnection {
            disconnects: AtomicUsize::new(0),
        });
        session.set_connection(connection.clone());
        session.add_track(track("a"));

        session.destroy().await.unwrap();
        session.destroy().await.unwrap();

        assert!(session.is_destroyed());
        assert!(session.is_empty());
        assert!(session.connection().is_none());
        assert_eq!(connection.disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cooldown_slot_holds_one_timer() {
        let session = Session::new(GuildId::new(1), SessionOptions::default(), &FetchOptions::default());

        let (guard, released) = tokio::sync::oneshot::channel::<()>();
        assert!(session.arm_empty_cooldown(|id| {
            assert_eq!(id, 1);
            tokio::spawn(async move {
                let _guard = guard;
                std::future::pending::<()>().await;
            })
        }));

        // con uno pendiente no se lanza otro
        let mut spawned = false;
        assert!(!session.arm_empty_cooldown(|_| {
            spawned = true;
            tokio::spawn(std::future::pending::<()>())
        }));
        assert!(!spawned);
        assert!(session.has_pending_cooldown());

        assert!(session.cancel_empty_cooldown());
        assert!(!session.has_pending_cooldown());
        assert!(released.await.is_err());
        assert!(!session.detach_empty_cooldown(1));

        // el slot libre acepta un temporizador nuevo
        assert!(session.arm_empty_cooldown(|id| {
            assert_eq!(id, 2);
            tokio::spawn(std::future::pending::<()>())
        }));
        assert!(session.detach_empty_cooldown(2));
        assert!(!session.has_pending_cooldown());
    }
}
