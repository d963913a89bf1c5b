use actix_web::{error::JsonPayloadError, web, HttpRequest, HttpResponse};
use log::{debug, info, warn};

use crate::error::ApiError;
use crate::models::{
    Features, HealthResponse, IrisSample, PredictRequest, PredictResponse, VersionRequest,
};
use crate::state::ServingState;

const JSON_LIMIT: usize = 10 * 1024 * 1024;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(json_error),
    )
    .service(web::resource("/health").route(web::get().to(health)))
    .service(web::resource("/predict").route(web::post().to(predict)))
    .service(web::resource("/version").route(web::get().to(version)))
    .service(web::resource("/setModelVersion").route(web::post().to(set_model_version)));
}

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::BadRequest(err.to_string()).into()
}

pub async fn health(state: web::Data<ServingState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok".to_string(),
        model_uri: state.current().model_uri.clone(),
    })
}

pub async fn predict(
    state: web::Data<ServingState>,
    req: web::Json<PredictRequest>,
) -> Result<HttpResponse, ApiError> {
    let req = req.into_inner();
    debug!("predict request: {:?}", req.samples);

    req.validate().map_err(ApiError::Validation)?;

    // One snapshot per request: every sample sees the same model version.
    let served = state.current();
    let features: Vec<Features> = req.samples.iter().map(IrisSample::to_features).collect();
    let uri = served.model_uri.clone();

    let classes = match web::block(move || served.classify(&features)).await? {
        Ok(classes) => classes,
        Err(e) => {
            warn!("prediction with {} failed: {}", uri, e);
            return Err(e.into());
        }
    };

    let response: PredictResponse = classes.into_iter().collect();
    debug!("predict response ({}): {:?}", uri, response);
    Ok(HttpResponse::Ok().json(response))
}

pub async fn version(state: web::Data<ServingState>) -> HttpResponse {
    HttpResponse::Ok().json(state.current().describe())
}

pub async fn set_model_version(
    state: web::Data<ServingState>,
    req: web::Json<VersionRequest>,
) -> Result<HttpResponse, ApiError> {
    let requested = req.into_inner().model_version;
    info!("model version change requested: {:?}", requested);

    let version = requested.clone();
    match web::block(move || state.set_version(&version)).await? {
        Ok(served) => Ok(HttpResponse::Ok().json(served.describe())),
        Err(e) => {
            warn!("keeping current model, version {:?} rejected: {}", requested, e);
            Err(e.into())
        }
    }
}
