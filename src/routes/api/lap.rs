use rocket::http::uri::Origin;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{get, post};
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::modules::analysis::orchestrator::LapAnalysisOrchestrator;
use crate::modules::models::lap_record::{
    AnalysisResult, PersistenceReceipt, RecordSource, StorageTier,
};
use crate::modules::models::mistake::MistakeRecord;
use crate::modules::models::sample::{SampleSet, TelemetrySample};
use crate::modules::persistence::orchestrator::PersistenceOrchestrator;
use crate::modules::predictor::{HttpPredictor, NullPredictor, Predictor};
use crate::modules::redis::Redis;

use crate::macros::request_caching::{cache_response, read_cache_request};

/**************************************************************************************************/
/**************** ROUTES **************************************************************************/
/**************************************************************************************************/

/// # analyze and persist one closed lap
/// validates the upload, runs the analysis engine and walks the tiered
/// persistence chain. the receipt reports which tiers succeeded.
#[post("/laps", data = "<upload>")]
pub fn save_one(upload: Json<TelemetryUpload>) -> Result<Json<ApiLapSaved>, Status> {
    let upload = upload.into_inner();

    let samples = SampleSet::new(upload.lap_number, upload.samples).map_err(error_status)?;

    let http_predictor = HttpPredictor::from_env();
    let predictor: &dyn Predictor = match &http_predictor {
        Some(predictor) => predictor,
        None => &NullPredictor,
    };

    let analysis = LapAnalysisOrchestrator::new(predictor)
        .analyze(&samples)
        .map_err(error_status)?;

    let receipt = PersistenceOrchestrator::from_env()
        .persist(&samples, &analysis)
        .map_err(error_status)?;

    Ok(Json(ApiLapSaved { receipt, analysis }))
}

/// # list all persisted laps
/// backs lap selection in clients. summaries only, the heavy payloads
/// stay behind the per lap routes.
#[get("/laps")]
pub fn list_all() -> Result<Json<ApiLapList>, Status> {
    let records = PersistenceOrchestrator::from_env()
        .list()
        .map_err(error_status)?;

    let laps: Vec<ApiLapSummary> = records
        .iter()
        .map(|record| ApiLapSummary {
            lap_number: record.lap_number,
            actual_time: record.analysis.actual_time,
            performance_score: record.analysis.performance_score,
            storage_tier: record.storage_tier,
        })
        .collect();

    Ok(Json(ApiLapList {
        total: laps.len(),
        laps,
    }))
}

/// # get the analysis of a persisted lap
#[get("/laps/<lap_number>/analysis")]
pub fn get_analysis(lap_number: i32, origin: &Origin) -> Result<Json<ApiLapAnalysis>, Status> {
    read_cache_request!(origin);

    let retrieved = PersistenceOrchestrator::from_env()
        .get(lap_number)
        .map_err(error_status)?;

    let analysis = ApiLapAnalysis {
        lap_number,
        source: retrieved.source,
        predicted_time: retrieved.record.analysis.predicted_time,
        actual_time: retrieved.record.analysis.actual_time,
        delta: retrieved.record.analysis.delta,
        performance_score: retrieved.record.analysis.performance_score,
        mistakes: retrieved.record.analysis.mistakes,
        feedback: retrieved.record.analysis.feedback,
    };

    cache_response!(origin, analysis);
}

/// # get the raw telemetry of a persisted lap
/// large payloads, served straight from the stores.
#[get("/laps/<lap_number>/telemetry")]
pub fn get_telemetry(lap_number: i32) -> Result<Json<ApiLapTelemetry>, Status> {
    let retrieved = PersistenceOrchestrator::from_env()
        .get(lap_number)
        .map_err(error_status)?;

    Ok(Json(ApiLapTelemetry {
        lap_number,
        source: retrieved.source,
        samples: retrieved.record.samples,
    }))
}

/// # liveness and tier reachability
#[get("/health")]
pub fn health() -> Json<ApiHealth> {
    use crate::modules::models::general::establish_connection;

    Json(ApiHealth {
        primary_store: establish_connection().is_ok(),
        secondary_store: Redis::connect().is_ok(),
        ledger_configured: std::env::var("LEDGER_URL").is_ok(),
    })
}

/**************************************************************************************************/
/**************** HELPERS *************************************************************************/
/**************************************************************************************************/

fn error_status(error: Error) -> Status {
    match error {
        Error::ValidationError { .. } => Status::UnprocessableEntity,
        Error::NotFoundError { .. } => Status::NotFound,
        Error::IncompleteLapError { .. } | Error::DuplicateLapError { .. } => Status::Conflict,
        Error::StorageUnavailableError { .. } | Error::StoreUnreachableError { .. } => {
            Status::ServiceUnavailable
        }
        Error::LedgerError { .. } | Error::PredictorUnavailableError { .. } => {
            Status::InternalServerError
        }
    }
}

/// # json body of a lap upload
#[derive(Serialize, Deserialize)]
pub struct TelemetryUpload {
    pub lap_number: i32,
    pub samples: Vec<TelemetrySample>,
}

/// # Struct representing a json response for a saved lap
#[derive(Serialize, Deserialize)]
pub struct ApiLapSaved {
    pub receipt: PersistenceReceipt,
    pub analysis: AnalysisResult,
}

/// # Struct representing a json response for the lap listing
#[derive(Serialize, Deserialize)]
pub struct ApiLapList {
    pub laps: Vec<ApiLapSummary>,
    pub total: usize,
}

/// # Struct representing a json response for one listed lap
#[derive(Serialize, Deserialize)]
pub struct ApiLapSummary {
    pub lap_number: i32,
    pub actual_time: f64,
    pub performance_score: f64,
    pub storage_tier: StorageTier,
}

/// # Struct representing a json response for a lap analysis
#[derive(Serialize, Deserialize)]
pub struct ApiLapAnalysis {
    pub lap_number: i32,
    pub source: RecordSource,
    pub predicted_time: f64,
    pub actual_time: f64,
    pub delta: f64,
    pub performance_score: f64,
    pub mistakes: Vec<MistakeRecord>,
    pub feedback: Vec<String>,
}

/// # Struct representing a json response for a lap's telemetry
#[derive(Serialize, Deserialize)]
pub struct ApiLapTelemetry {
    pub lap_number: i32,
    pub source: RecordSource,
    pub samples: Vec<TelemetrySample>,
}

/// # Struct representing the health of the service's collaborators
#[derive(Serialize, Deserialize)]
pub struct ApiHealth {
    pub primary_store: bool,
    pub secondary_store: bool,
    pub ledger_configured: bool,
}
