use std::sync::Arc;

use arc_swap::ArcSwap;
use log::info;

use crate::models::{model_uri, Features, IrisClass, ModelResponse};
use crate::predictor::{PredictError, Predictor};
use crate::registry::{ModelRegistry, RegistryError};

/// One published model: version, URI and predictor always belong together.
pub struct ServedModel {
    pub model_name: String,
    pub model_version: String,
    pub model_uri: String,
    predictor: Arc<dyn Predictor>,
}

impl ServedModel {
    fn new(model_name: &str, model_version: &str, predictor: Arc<dyn Predictor>) -> Self {
        ServedModel {
            model_name: model_name.to_string(),
            model_version: model_version.to_string(),
            model_uri: model_uri(model_name, model_version),
            predictor,
        }
    }

    pub fn describe(&self) -> ModelResponse {
        ModelResponse {
            model_name: self.model_name.clone(),
            model_version: self.model_version.clone(),
            model_uri: self.model_uri.clone(),
        }
    }

    /// Classifies the batch, rejecting anything that is not one known class per row.
    pub fn classify(&self, batch: &[Features]) -> Result<Vec<IrisClass>, PredictError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.predictor.predict(batch)?;
        if ids.len() != batch.len() {
            return Err(PredictError(format!(
                "{} returned {} predictions for {} samples",
                self.model_uri,
                ids.len(),
                batch.len()
            )));
        }

        ids.into_iter()
            .map(|id| {
                IrisClass::from_id(id).ok_or_else(|| {
                    PredictError(format!("{} returned unknown class id {}", self.model_uri, id))
                })
            })
            .collect()
    }
}

pub struct ServingState {
    model_name: String,
    registry: Arc<dyn ModelRegistry>,
    current: ArcSwap<ServedModel>,
}

impl ServingState {
    /// Loads the initial version; the service cannot start without it.
    pub fn open(
        registry: Arc<dyn ModelRegistry>,
        model_name: &str,
        model_version: &str,
    ) -> Result<Self, RegistryError> {
        let predictor = registry.load(model_name, model_version)?;
        let served = ServedModel::new(model_name, model_version, predictor);
        info!("serving {}", served.model_uri);

        Ok(ServingState {
            model_name: model_name.to_string(),
            registry,
            current: ArcSwap::from_pointee(served),
        })
    }

    /// Snapshot of the model in service right now. Holders keep using it
    /// even if a newer version is published meanwhile.
    pub fn current(&self) -> Arc<ServedModel> {
        self.current.load_full()
    }

    /// Loads `model_version` and publishes it. On error nothing changes.
    /// Concurrent callers race; the last one to publish wins.
    pub fn set_version(&self, model_version: &str) -> Result<Arc<ServedModel>, RegistryError> {
        let predictor = self.registry.load(&self.model_name, model_version)?;
        let served = Arc::new(ServedModel::new(&self.model_name, model_version, predictor));

        let previous = self.current.swap(served.clone());
        info!("switched {} -> {}", previous.model_uri, served.model_uri);
        Ok(served)
    }
}
