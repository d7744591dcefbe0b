use std::env;
use std::fs;

use dotenvy::dotenv;
use log::{error, info, warn};
use serde::Deserialize;

use f1_telemetry_analytics::errors::Error;
use f1_telemetry_analytics::modules::analysis::orchestrator::LapAnalysisOrchestrator;
use f1_telemetry_analytics::modules::helpers::logging::setup_logging;
use f1_telemetry_analytics::modules::models::sample::{SampleSet, TelemetrySample};
use f1_telemetry_analytics::modules::predictor::{HttpPredictor, NullPredictor, Predictor};

#[derive(Deserialize)]
struct LapFile {
    lap_number: i32,
    samples: Vec<TelemetrySample>,
}

/// # analyze a recorded lap without the server
/// reads a lap capture file (same shape as the upload body) and prints
/// the analysis as json. nothing is persisted.
fn main() {
    dotenv().ok();
    setup_logging().expect("failed to setup logging");

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            error!(target:"analyze_from_file", "usage: analyze_from_file <lap.json>");
            return;
        }
    };

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            error!(target:"analyze_from_file", "could not read {}: {}", path, err);
            return;
        }
    };

    let lap: LapFile = match serde_json::from_str(&raw) {
        Ok(lap) => lap,
        Err(err) => {
            error!(target:"analyze_from_file", "malformed lap file {}: {}", path, err);
            return;
        }
    };

    let samples = match SampleSet::new(lap.lap_number, lap.samples) {
        Ok(samples) => samples,
        Err(Error::ValidationError { lap_number, reason }) => {
            error!(target:"analyze_from_file", "invalid telemetry for lap {}: {}", lap_number, reason);
            return;
        }
        Err(err) => unreachable!("unexpected error: {:?}", err),
    };

    let http_predictor = HttpPredictor::from_env();
    let predictor: &dyn Predictor = match &http_predictor {
        Some(predictor) => predictor,
        None => {
            warn!(target:"analyze_from_file", "no predictor configured, using the heuristic fallback");
            &NullPredictor
        }
    };

    match LapAnalysisOrchestrator::new(predictor).analyze(&samples) {
        Ok(analysis) => {
            info!(target:"analyze_from_file", "analyzed lap {}: score {}", analysis.lap_number, analysis.performance_score);
            match serde_json::to_string_pretty(&analysis) {
                Ok(json) => println!("{}", json),
                Err(err) => error!(target:"analyze_from_file", "could not serialize analysis: {}", err),
            }
        }
        Err(Error::NotFoundError { lap_number }) => {
            error!(target:"analyze_from_file", "no samples for lap {}", lap_number);
        }
        Err(Error::IncompleteLapError { lap_number }) => {
            error!(target:"analyze_from_file", "lap {} has no terminal lap time", lap_number);
        }
        Err(err) => {
            error!(target:"analyze_from_file", "analysis failed: {}", err);
        }
    }
}
