use std::path::Path;

use log::debug;
use tract_core::prelude::tract_ndarray::Axis;
use tract_onnx::prelude::*;

use crate::models::Features;

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PredictError(pub String);

/// A loaded model that maps feature vectors to class ids, one id per row.
pub trait Predictor: Send + Sync {
    fn predict(&self, batch: &[Features]) -> Result<Vec<i64>, PredictError>;
}

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

pub struct OnnxPredictor {
    model: OnnxPlan,
}

impl OnnxPredictor {
    pub fn load<P: AsRef<Path>>(model_path: P) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 4)))?
            .into_optimized()?;

        Self::from_typed(model)
    }

    /// Wraps an already typed graph taking one `(1, 4)` f32 input.
    pub fn from_typed(model: TypedModel) -> TractResult<Self> {
        Ok(Self {
            model: model.into_runnable()?,
        })
    }

    fn predict_one(&self, features: &Features) -> TractResult<i64> {
        let input = Tensor::from_shape(&[1, 4], features)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow::anyhow!("model produced no outputs"))?;

        // Classifiers exported with a label head emit int64 ids; bare networks emit scores.
        if output.datum_type() == i64::datum_type() {
            output
                .to_array_view::<i64>()?
                .iter()
                .next()
                .copied()
                .ok_or_else(|| anyhow::anyhow!("empty label output"))
        } else {
            let scores = output.cast_to::<f32>()?;
            let scores = scores.to_array_view::<f32>()?;
            let row = if scores.ndim() > 1 {
                if scores.shape()[0] == 0 {
                    anyhow::bail!("empty score output");
                }
                scores.index_axis(Axis(0), 0)
            } else {
                scores.view()
            };
            argmax(row.iter().copied())
                .map(|i| i as i64)
                .ok_or_else(|| anyhow::anyhow!("empty score output"))
        }
    }
}

impl Predictor for OnnxPredictor {
    fn predict(&self, batch: &[Features]) -> Result<Vec<i64>, PredictError> {
        batch
            .iter()
            .map(|features| {
                let id = self
                    .predict_one(features)
                    .map_err(|e| PredictError(format!("{:#}", e)))?;
                debug!("predicted {:?} -> {}", features, id);
                Ok(id)
            })
            .collect()
    }
}

fn argmax<I: IntoIterator<Item = f32>>(values: I) -> Option<usize> {
    values
        .into_iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, v)| match best {
            Some((_, b)) if b >= v || v.is_nan() => best,
            _ => Some((i, v)),
        })
        .map(|(i, _)| i)
}
