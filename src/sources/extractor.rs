use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::{fmt, sync::Arc};
use tracing::{debug, info};

use crate::{
    audio::track::{PlaylistInfo, TrackInfo, TrackSource},
    error::{PlayerError, Result},
};

use super::{GENERIC_THUMBNAIL, UNKNOWN_ARTIST};

/// Resultado individual entregado por un extractor
#[derive(Debug, Clone, Default)]
pub struct ExtractedTrack {
    pub title: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub thumbnail: String,
    pub duration_ms: u64,
    pub views: u64,
    /// `None` se normaliza a [`TrackSource::Extractor`]
    pub source: Option<TrackSource>,
    /// Payload nativo del extractor
    pub engine: Option<Value>,
}

/// Respuesta cruda de un extractor: tracks y, opcionalmente, su playlist
#[derive(Debug, Clone, Default)]
pub struct ExtractorInfo {
    pub playlist: Option<PlaylistInfo>,
    pub tracks: Vec<ExtractedTrack>,
}

/// Respuesta normalizada, lista para construir el modelo de tracks
#[derive(Debug, Clone, Default)]
pub struct ExtractorData {
    pub playlist: Option<PlaylistInfo>,
    pub tracks: Vec<TrackInfo>,
}

/// Resolvedor enchufable de consultas
#[async_trait]
pub trait Extractor: Send + Sync {
    /// `true` si el extractor sabe atender la consulta
    fn validate(&self, query: &str) -> bool;

    /// Obtiene la metadata. `Ok(None)` equivale a "sin resultados".
    async fn get_info(&self, query: &str) -> anyhow::Result<Option<ExtractorInfo>>;

    fn version(&self) -> &str {
        "0.0.0"
    }
}

/// Extractor registrado bajo un nombre
pub struct ExtractorModel {
    name: String,
    extractor: Arc<dyn Extractor>,
}

impl ExtractorModel {
    pub fn new(name: impl Into<String>, extractor: Arc<dyn Extractor>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PlayerError::InvalidExtractor(
                "el nombre del extractor no puede estar vacío".to_string(),
            ));
        }

        Ok(Self { name, extractor })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        self.extractor.version()
    }

    pub fn validate(&self, query: &str) -> bool {
        self.extractor.validate(query)
    }

    /// Ejecuta el extractor y normaliza su respuesta
    pub async fn handle(&self, query: &str) -> anyhow::Result<ExtractorData> {
        let Some(info) = self.extractor.get_info(query).await? else {
            return Ok(ExtractorData::default());
        };

        Ok(ExtractorData {
            playlist: info.playlist,
            tracks: info.tracks.into_iter().map(normalize).collect(),
        })
    }
}

impl fmt::Debug for ExtractorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorModel")
            .field("name", &self.name)
            .field("version", &self.version())
            .finish()
    }
}

fn normalize(track: ExtractedTrack) -> TrackInfo {
    TrackInfo {
        title: track.title,
        description: track.description,
        author: non_empty(track.author).unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
        url: track.url,
        thumbnail: non_empty(track.thumbnail).unwrap_or_else(|| GENERIC_THUMBNAIL.to_string()),
        duration_ms: track.duration_ms,
        views: track.views,
        source: track.source.unwrap_or(TrackSource::Extractor),
        raw: track.engine,
    }
}

fn non_empty(value: String) -> Option<String> {
    (!value.trim().is_empty()).then_some(value)
}

/// Lo que se puede registrar: un modelo ya construido o un extractor suelto
pub enum ExtractorSource {
    Model(ExtractorModel),
    Raw(Arc<dyn Extractor>),
}

impl From<ExtractorModel> for ExtractorSource {
    fn from(model: ExtractorModel) -> Self {
        ExtractorSource::Model(model)
    }
}

impl<E: Extractor + 'static> From<Arc<E>> for ExtractorSource {
    fn from(extractor: Arc<E>) -> Self {
        ExtractorSource::Raw(extractor)
    }
}

/// Registro ordenado de extractores. El orden de registro es el orden de consulta.
#[derive(Default)]
pub struct ExtractorRegistry {
    entries: RwLock<Vec<Arc<ExtractorModel>>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un extractor.
    ///
    /// Si el nombre ya existe y `force` es `false`, se devuelve el registro
    /// existente sin tocarlo. Con `force` se reemplaza en la misma posición.
    pub fn register(
        &self,
        name: &str,
        source: impl Into<ExtractorSource>,
        force: bool,
    ) -> Result<Arc<ExtractorModel>> {
        let extractor = match source.into() {
            ExtractorSource::Model(model) => model.extractor,
            ExtractorSource::Raw(extractor) => extractor,
        };
        let model = Arc::new(ExtractorModel::new(name, extractor)?);

        let mut entries = self.entries.write();
        match entries.iter().position(|entry| entry.name == name) {
            Some(index) if !force => {
                debug!("Extractor '{}' ya registrado, se conserva el original", name);
                Ok(entries[index].clone())
            }
            Some(index) => {
                info!("🔁 Extractor '{}' reemplazado", name);
                entries[index] = model.clone();
                Ok(model)
            }
            None => {
                info!("🧩 Extractor '{}' registrado (v{})", name, model.version());
                entries.push(model.clone());
                Ok(model)
            }
        }
    }

    pub fn unregister(&self, name: &str) -> Result<Arc<ExtractorModel>> {
        let mut entries = self.entries.write();
        let index = entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| PlayerError::ExtractorNotFound(name.to_string()))?;

        info!("🧩 Extractor '{}' eliminado", name);
        Ok(entries.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<Arc<ExtractorModel>> {
        self.entries.read().iter().find(|entry| entry.name == name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.read().iter().map(|entry| entry.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Copia del registro en orden, para recorrerlo sin mantener el lock
    pub(crate) fn snapshot(&self) -> Vec<Arc<ExtractorModel>> {
        self.entries.read().clone()
    }
}
