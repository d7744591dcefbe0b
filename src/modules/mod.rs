pub mod redis;
pub mod predictor;

pub mod models {
    pub mod sample;
    pub mod mistake;
    pub mod lap_record;

    pub mod general;
}

pub mod analysis {
    pub mod detectors;
    pub mod scoring;
    pub mod feedback;
    pub mod orchestrator;
}

pub mod persistence {
    pub mod store;
    pub mod postgres;
    pub mod redis_store;
    pub mod memory;
    pub mod ledger;
    pub mod orchestrator;
}

pub mod helpers {
    pub mod math;
    pub mod logging;
}
