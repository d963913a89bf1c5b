//! In-memory registry and predictors for tests, plus a tiny ONNX model
//! encoder so the tract path can be exercised without binary fixtures.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{model_uri, Features};
use crate::predictor::{PredictError, Predictor};
use crate::registry::{ModelRegistry, RegistryError};

#[derive(Clone, Copy, Debug)]
pub enum FakePredictor {
    /// Same id for every row.
    Constant(i64),
    /// Crude petal-length rule that separates the three classes.
    PetalRule,
    /// Drops the last row.
    Truncating,
    Failing,
}

impl Predictor for FakePredictor {
    fn predict(&self, batch: &[Features]) -> Result<Vec<i64>, PredictError> {
        match self {
            FakePredictor::Constant(id) => Ok(vec![*id; batch.len()]),
            FakePredictor::PetalRule => Ok(batch
                .iter()
                .map(|f| match f[2] {
                    l if l < 2.5 => 0,
                    l if l < 5.0 => 1,
                    _ => 2,
                })
                .collect()),
            FakePredictor::Truncating => Ok(vec![0; batch.len().saturating_sub(1)]),
            FakePredictor::Failing => Err(PredictError("input rank mismatch".to_string())),
        }
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    versions: HashMap<String, FakePredictor>,
    unreachable: bool,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: &str, predictor: FakePredictor) -> Self {
        self.versions.insert(version.to_string(), predictor);
        self
    }

    /// Versions not registered up front fail as if the registry went away.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }
}

impl ModelRegistry for FakeRegistry {
    fn load(
        &self,
        model_name: &str,
        model_version: &str,
    ) -> Result<Arc<dyn Predictor>, RegistryError> {
        match self.versions.get(model_version) {
            Some(p) => Ok(Arc::new(*p)),
            None if self.unreachable => Err(RegistryError::Unreachable {
                location: "memory".to_string(),
                reason: "connection refused".to_string(),
            }),
            None => Err(RegistryError::VersionNotFound {
                uri: model_uri(model_name, model_version),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OnnxHead {
    /// `ArgMax` over the scores: one int64 id, shape `[1]`.
    Label,
    /// Raw float scores, shape `[1, 3]`.
    Scores,
}

// Nearest-centroid on petal length: score_k = mu_k * x - mu_k^2 / 2.
const PETAL_CENTROIDS: [f32; 3] = [1.5, 4.3, 5.6];

const FLOAT: i64 = 1;
const INT64: i64 = 7;
const ATTR_INT: i64 = 2;

/// Encodes an ONNX model (opset 13) with input `features: f32[1, 4]` that
/// computes `features x W + b`, optionally followed by `ArgMax(axis = 1)`.
pub fn iris_onnx(head: OnnxHead) -> Vec<u8> {
    let mut weights = [0f32; 12];
    weights[6..9].copy_from_slice(&PETAL_CENTROIDS);
    let bias = PETAL_CENTROIDS.map(|mu| -mu * mu / 2.0);

    let mut graph = Vec::new();
    message(&mut graph, 1, &node("MatMul", &["features", "W"], "xw", &[]));
    let scores = match head {
        OnnxHead::Label => "scores",
        OnnxHead::Scores => "output",
    };
    message(&mut graph, 1, &node("Add", &["xw", "b"], scores, &[]));
    if let OnnxHead::Label = head {
        let attrs = [int_attr("axis", 1), int_attr("keepdims", 0)];
        message(&mut graph, 1, &node("ArgMax", &["scores"], "output", &attrs));
    }
    string(&mut graph, 2, "iris");
    message(&mut graph, 5, &float_tensor("W", &[4, 3], &weights));
    message(&mut graph, 5, &float_tensor("b", &[3], &bias));
    message(&mut graph, 11, &value_info("features", FLOAT, &[1, 4]));
    let output = match head {
        OnnxHead::Label => value_info("output", INT64, &[1]),
        OnnxHead::Scores => value_info("output", FLOAT, &[1, 3]),
    };
    message(&mut graph, 12, &output);

    let mut opset = Vec::new();
    string(&mut opset, 1, "");
    int(&mut opset, 2, 13);

    let mut model = Vec::new();
    int(&mut model, 1, 7);
    string(&mut model, 2, "iris-serve-tests");
    message(&mut model, 7, &graph);
    message(&mut model, 8, &opset);
    model
}

fn node(op: &str, inputs: &[&str], output: &str, attrs: &[Vec<u8>]) -> Vec<u8> {
    let mut buf = Vec::new();
    for input in inputs {
        string(&mut buf, 1, input);
    }
    string(&mut buf, 2, output);
    string(&mut buf, 3, output);
    string(&mut buf, 4, op);
    for attr in attrs {
        message(&mut buf, 5, attr);
    }
    buf
}

fn int_attr(name: &str, value: i64) -> Vec<u8> {
    let mut buf = Vec::new();
    string(&mut buf, 1, name);
    int(&mut buf, 3, value);
    int(&mut buf, 20, ATTR_INT);
    buf
}

fn float_tensor(name: &str, dims: &[i64], data: &[f32]) -> Vec<u8> {
    let mut buf = Vec::new();
    for dim in dims {
        int(&mut buf, 1, *dim);
    }
    int(&mut buf, 2, FLOAT);
    string(&mut buf, 8, name);
    let raw: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
    bytes(&mut buf, 9, &raw);
    buf
}

fn value_info(name: &str, elem_type: i64, dims: &[i64]) -> Vec<u8> {
    let mut shape = Vec::new();
    for dim in dims {
        let mut d = Vec::new();
        int(&mut d, 1, *dim);
        message(&mut shape, 1, &d);
    }
    let mut tensor = Vec::new();
    int(&mut tensor, 1, elem_type);
    message(&mut tensor, 2, &shape);
    let mut ty = Vec::new();
    message(&mut ty, 1, &tensor);

    let mut buf = Vec::new();
    string(&mut buf, 1, name);
    message(&mut buf, 2, &ty);
    buf
}

fn varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn key(buf: &mut Vec<u8>, field: u64, wire_type: u64) {
    varint(buf, field << 3 | wire_type);
}

fn int(buf: &mut Vec<u8>, field: u64, value: i64) {
    key(buf, field, 0);
    varint(buf, value as u64);
}

fn bytes(buf: &mut Vec<u8>, field: u64, data: &[u8]) {
    key(buf, field, 2);
    varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

fn string(buf: &mut Vec<u8>, field: u64, value: &str) {
    bytes(buf, field, value.as_bytes());
}

fn message(buf: &mut Vec<u8>, field: u64, encoded: &[u8]) {
    bytes(buf, field, encoded);
}
