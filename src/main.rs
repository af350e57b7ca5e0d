use anyhow::Result;
use serenity::{model::gateway::GatewayIntents, Client};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info};

use guild_music::{
    bot::{identity::CacheResolver, VoiceStateRelay},
    Config, MusicPlayer, PlayerEvent, SourceProviders,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guild_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Guild Music v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Config::load()?;

    if std::env::args().any(|arg| arg == "--health-check") {
        return health_check(&config).await;
    }

    info!("{}", config.summary());

    // La caché de serenity existe recién al construir el cliente
    let resolver = Arc::new(CacheResolver::default());
    let providers = SourceProviders::from_config(&config)?;
    let (player, events) = MusicPlayer::new(&config, providers, resolver.clone());

    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(VoiceStateRelay::new(player.clone()))
        .register_songbird()
        .await?;

    resolver.attach(client.cache.clone());

    tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            log_event(&event);
        }
    });

    // Manejar shutdown graceful
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de shutdown recibida, cerrando...");
        shard_manager.shutdown_all().await;
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}

fn log_event(event: &PlayerEvent) {
    let session = event.session();
    info!(
        "📣 {} en guild {} (sesión abierta desde {})",
        event.name(),
        session.guild_id(),
        session.created_at().format("%H:%M:%S")
    );
}

async fn health_check(config: &Config) -> Result<()> {
    let yt_dlp = async_process::Command::new(&config.ytdlp_path)
        .arg("--version")
        .output()
        .await?;

    if yt_dlp.status.success() {
        println!("OK");
        Ok(())
    } else {
        anyhow::bail!("yt-dlp no disponible en '{}'", config.ytdlp_path);
    }
}
