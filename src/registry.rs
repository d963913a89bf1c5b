use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

use crate::models::model_uri;
use crate::predictor::{OnnxPredictor, Predictor};

pub const ARTIFACT_FILE: &str = "model.onnx";

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid model name {0:?}")]
    InvalidModelName(String),

    #[error("invalid model version {0:?}")]
    InvalidVersion(String),

    #[error("model version not found: {uri}")]
    VersionNotFound { uri: String },

    #[error("model registry unreachable at {location}: {reason}")]
    Unreachable { location: String, reason: String },

    #[error("incompatible model artifact for {uri}: {reason}")]
    IncompatibleArtifact { uri: String, reason: String },
}

/// Resolves a (name, version) pair to a loaded predictor.
pub trait ModelRegistry: Send + Sync {
    fn load(
        &self,
        model_name: &str,
        model_version: &str,
    ) -> Result<Arc<dyn Predictor>, RegistryError>;
}

/// Directory-backed registry: `{root}/{name}/{version}/model.onnx`.
pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(
        &self,
        model_name: &str,
        model_version: &str,
    ) -> Result<PathBuf, RegistryError> {
        if !is_path_segment(model_name) {
            return Err(RegistryError::InvalidModelName(model_name.to_string()));
        }
        if !is_path_segment(model_version) {
            return Err(RegistryError::InvalidVersion(model_version.to_string()));
        }

        match self.root.metadata() {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(RegistryError::Unreachable {
                    location: self.root.display().to_string(),
                    reason: "not a directory".to_string(),
                })
            }
            Err(e) => {
                return Err(RegistryError::Unreachable {
                    location: self.root.display().to_string(),
                    reason: e.to_string(),
                })
            }
        }

        let path = self.root.join(model_name).join(model_version).join(ARTIFACT_FILE);
        match path.metadata() {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(RegistryError::VersionNotFound {
                uri: model_uri(model_name, model_version),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(RegistryError::VersionNotFound {
                uri: model_uri(model_name, model_version),
            }),
            Err(e) => Err(RegistryError::Unreachable {
                location: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

impl ModelRegistry for LocalRegistry {
    fn load(
        &self,
        model_name: &str,
        model_version: &str,
    ) -> Result<Arc<dyn Predictor>, RegistryError> {
        let path = self.artifact_path(model_name, model_version)?;
        let uri = model_uri(model_name, model_version);
        info!("loading {} from {}", uri, path.display());

        let predictor = OnnxPredictor::load(&path).map_err(|e| {
            RegistryError::IncompatibleArtifact {
                uri,
                reason: format!("{:#}", e),
            }
        })?;
        Ok(Arc::new(predictor))
    }
}

// Names and versions become path segments, so they must not escape the registry root.
fn is_path_segment(segment: &str) -> bool {
    let trimmed = segment.trim();
    !(trimmed.is_empty()
        || trimmed != segment
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\']))
}
