use serde::{Deserialize, Serialize};

/// Iris feature vector in model input order:
/// sepal length, sepal width, petal length, petal width.
pub type Features = [f32; 4];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IrisSample {
    pub sepal_length: f64,
    pub sepal_width: f64,
    pub petal_length: f64,
    pub petal_width: f64,
}

impl IrisSample {
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("sepal_length", self.sepal_length),
            ("sepal_width", self.sepal_width),
            ("petal_length", self.petal_length),
            ("petal_width", self.petal_width),
        ];

        for (name, value) in fields.iter() {
            if !value.is_finite() || *value < 0.0 {
                return Err(format!(
                    "{} must be a non-negative number (got {})",
                    name, value
                ));
            }
        }

        Ok(())
    }

    /// Narrows to the model's `f32` input; values beyond `f32::MAX` saturate.
    pub fn to_features(&self) -> Features {
        [
            narrow(self.sepal_length),
            narrow(self.sepal_width),
            narrow(self.petal_length),
            narrow(self.petal_width),
        ]
    }
}

fn narrow(value: f64) -> f32 {
    value.min(f32::MAX as f64) as f32
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PredictRequest {
    pub samples: Vec<IrisSample>,
}

impl PredictRequest {
    /// Checks every sample, reporting the first offending field with its index.
    pub fn validate(&self) -> Result<(), String> {
        for (i, sample) in self.samples.iter().enumerate() {
            sample
                .validate()
                .map_err(|e| format!("samples[{}].{}", i, e))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrisClass {
    Setosa,
    Versicolor,
    Virginica,
}

impl IrisClass {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            0 => Some(IrisClass::Setosa),
            1 => Some(IrisClass::Versicolor),
            2 => Some(IrisClass::Virginica),
            _ => None,
        }
    }

    pub fn id(self) -> i64 {
        match self {
            IrisClass::Setosa => 0,
            IrisClass::Versicolor => 1,
            IrisClass::Virginica => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            IrisClass::Setosa => "setosa",
            IrisClass::Versicolor => "versicolor",
            IrisClass::Virginica => "virginica",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PredictResponse {
    pub class_id: Vec<i64>,
    pub class_label: Vec<String>,
}

impl FromIterator<IrisClass> for PredictResponse {
    fn from_iter<I: IntoIterator<Item = IrisClass>>(iter: I) -> Self {
        let mut response = PredictResponse::default();
        for class in iter {
            response.class_id.push(class.id());
            response.class_label.push(class.label().to_string());
        }
        response
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VersionRequest {
    pub model_version: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ModelResponse {
    pub model_name: String,
    pub model_version: String,
    pub model_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub model_uri: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: String,
    pub status_message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            status_message: message.into(),
        }
    }
}

pub fn model_uri(model_name: &str, model_version: &str) -> String {
    format!("models:/{}/{}", model_name, model_version)
}
