use thiserror::Error;

/// Errores de entrada del llamador.
///
/// Solo estos errores se propagan fuera del núcleo. Los fallos de los
/// proveedores externos y los fallos durante el cierre de una sesión se
/// absorben y se registran en el log.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Registro de extractor mal formado (nombre vacío)
    #[error("Extractor inválido: {0}")]
    InvalidExtractor(String),

    /// No existe un extractor con ese nombre
    #[error("Extractor no encontrado: {0}")]
    ExtractorNotFound(String),

    /// Faltan opciones obligatorias para la búsqueda
    #[error("Opciones de búsqueda faltantes: {0}")]
    MissingOptions(&'static str),

    /// Referencia de guild que no se pudo resolver
    #[error("Guild desconocido: {0}")]
    UnknownGuild(String),

    /// Referencia de usuario que no se pudo resolver
    #[error("Usuario desconocido: {0}")]
    UnknownUser(String),
}

pub type Result<T> = std::result::Result<T, PlayerError>;
