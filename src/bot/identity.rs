use serenity::{
    cache::Cache,
    model::id::{GuildId, UserId},
};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

/// Referencia flexible a un guild: un id tipado o texto con el snowflake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildRef {
    Id(GuildId),
    Text(String),
}

/// Referencia flexible a un usuario: id, snowflake o mención `<@123>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Id(UserId),
    Text(String),
}

impl GuildRef {
    pub fn snowflake(&self) -> Option<u64> {
        match self {
            GuildRef::Id(id) => Some(id.get()),
            GuildRef::Text(text) => parse_snowflake(text),
        }
    }
}

impl UserRef {
    pub fn snowflake(&self) -> Option<u64> {
        match self {
            UserRef::Id(id) => Some(id.get()),
            UserRef::Text(text) => parse_snowflake(text),
        }
    }
}

impl From<GuildId> for GuildRef {
    fn from(id: GuildId) -> Self {
        GuildRef::Id(id)
    }
}

impl From<&str> for GuildRef {
    fn from(text: &str) -> Self {
        GuildRef::Text(text.to_string())
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(text: &str) -> Self {
        UserRef::Text(text.to_string())
    }
}

impl fmt::Display for GuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuildRef::Id(id) => write!(f, "{}", id),
            GuildRef::Text(text) => f.write_str(text),
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{}", id),
            UserRef::Text(text) => f.write_str(text),
        }
    }
}

/// Extrae un snowflake no nulo de `123`, `<@123>` o `<@!123>`
fn parse_snowflake(text: &str) -> Option<u64> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("<@!")
        .or_else(|| trimmed.strip_prefix("<@"))
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(trimmed);

    digits.parse::<u64>().ok().filter(|id| *id != 0)
}

/// Resolución de referencias contra la plataforma de voz
pub trait IdentityResolver: Send + Sync {
    fn resolve_guild(&self, guild: &GuildRef) -> Option<GuildId>;

    fn resolve_user(&self, user: &UserRef) -> Option<UserId>;

    /// Id del propio bot, si ya se conoce
    fn current_user(&self) -> Option<UserId>;
}

/// Acepta cualquier snowflake bien formado. Útil sin gateway (tests, scripts).
#[derive(Debug, Clone, Default)]
pub struct SnowflakeResolver {
    bot_user: Option<UserId>,
}

impl SnowflakeResolver {
    pub fn new(bot_user: Option<UserId>) -> Self {
        Self { bot_user }
    }
}

impl IdentityResolver for SnowflakeResolver {
    fn resolve_guild(&self, guild: &GuildRef) -> Option<GuildId> {
        guild.snowflake().map(GuildId::new)
    }

    fn resolve_user(&self, user: &UserRef) -> Option<UserId> {
        user.snowflake().map(UserId::new)
    }

    fn current_user(&self) -> Option<UserId> {
        self.bot_user
    }
}

/// Resolución sobre la caché de serenity: solo guilds donde está el bot.
///
/// La caché la crea el cliente de serenity, así que puede adjuntarse después
/// con [`CacheResolver::attach`]. Hasta entonces no resuelve guilds.
#[derive(Default)]
pub struct CacheResolver {
    cache: OnceLock<Arc<Cache>>,
}

impl CacheResolver {
    pub fn new(cache: Arc<Cache>) -> Self {
        let resolver = Self::default();
        resolver.attach(cache);
        resolver
    }

    /// Adjunta la caché. Solo la primera llamada tiene efecto.
    pub fn attach(&self, cache: Arc<Cache>) -> bool {
        self.cache.set(cache).is_ok()
    }
}

impl IdentityResolver for CacheResolver {
    fn resolve_guild(&self, guild: &GuildRef) -> Option<GuildId> {
        let id = GuildId::new(guild.snowflake()?);
        self.cache.get()?.guild(id).map(|_| id)
    }

    fn resolve_user(&self, user: &UserRef) -> Option<UserId> {
        // los usuarios no siempre están en caché (faltan intents de miembros)
        user.snowflake().map(UserId::new)
    }

    fn current_user(&self) -> Option<UserId> {
        let id = self.cache.get()?.current_user().id;
        (id.get() != 0).then_some(id)
    }
}
