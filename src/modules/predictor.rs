use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use log::error;
use serde::Deserialize;

use crate::errors::{CustomResult, Error};
use crate::modules::models::sample::SampleSet;

/// # the lap time predictor collaborator
/// `predict` returns the optimal lap time the car could have achieved
/// with the given samples. any failure makes the analysis orchestrator
/// fall back to its heuristic, so implementations report errors instead
/// of guessing.
pub trait Predictor {
    fn predict(&self, samples: &SampleSet) -> CustomResult<f64>;
}

#[derive(Deserialize, Debug)]
struct PredictionResponse {
    predicted_time: f64,
}

/// HTTP client for the external prediction service.
pub struct HttpPredictor {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpPredictor {
    /// # build the predictor client from the environment
    /// reads `PREDICTOR_URL`. returns None when the service is not
    /// configured, callers then run with the heuristic fallback only.
    pub fn from_env() -> Option<HttpPredictor> {
        dotenv().ok();

        let base_url = env::var("PREDICTOR_URL").ok()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .ok()?;

        Some(HttpPredictor { client, base_url })
    }
}

impl Predictor for HttpPredictor {
    fn predict(&self, samples: &SampleSet) -> CustomResult<f64> {
        let url = format!("{}/predict", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(samples)
            .send()
            .map_err(|err| {
                error!(target: "predictor:predict", "request failed: {}", err);
                Error::PredictorUnavailableError {
                    reason: err.to_string(),
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::PredictorUnavailableError {
                reason: format!("prediction service answered {}", response.status()),
            });
        }

        let prediction: PredictionResponse =
            response
                .json()
                .map_err(|err| Error::PredictorUnavailableError {
                    reason: format!("malformed prediction response: {}", err),
                })?;

        Ok(prediction.predicted_time)
    }
}

/// stand-in for an unconfigured prediction service. always fails, which
/// drives the orchestrator into its `actual - 0.5` heuristic.
pub struct NullPredictor;

impl Predictor for NullPredictor {
    fn predict(&self, _samples: &SampleSet) -> CustomResult<f64> {
        Err(Error::PredictorUnavailableError {
            reason: "no prediction service configured".to_string(),
        })
    }
}
