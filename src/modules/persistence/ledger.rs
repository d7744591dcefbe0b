use std::collections::HashMap;
use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use log::error;
use serde::{Deserialize, Serialize};

use crate::errors::{CustomResult, Error};
use crate::modules::models::lap_record::PersistedLapRecord;

/// default cap on the ledger confirmation wait, in seconds. a timeout
/// counts as a ledger failure and is never retried automatically, the
/// underlying transaction may already be pending.
const DEFAULT_LEDGER_TIMEOUT_SECONDS: u64 = 120;

/// # the verification ledger collaborator
/// a content-addressed blob store plus an immutable transaction log,
/// addressed as one collaborator. every operation is best-effort from
/// the persistence orchestrator's point of view: the engineer's
/// feedback loop must never depend on ledger availability.
pub trait VerificationLedger {
    /// upload the full record, returning its content reference.
    fn put_content(&self, record: &PersistedLapRecord) -> CustomResult<String>;

    /// fetch a record back by its content reference.
    fn get_content(&self, content_reference: &str) -> CustomResult<PersistedLapRecord>;

    /// record the lap transaction, blocking until the ledger confirms
    /// or the timeout elapses. returns the transaction reference.
    fn record_transaction(
        &self,
        lap_number: i32,
        content_reference: &str,
        performance_score: f64,
        sector_times: &HashMap<i32, f64>,
    ) -> CustomResult<String>;

    fn get_transaction(&self, lap_number: i32) -> CustomResult<Option<String>>;
}

#[derive(Serialize, Debug)]
struct TransactionRequest<'a> {
    lap_number: i32,
    content_reference: &'a str,
    performance_score: f64,
    sector_times: &'a HashMap<i32, f64>,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    content_reference: String,
}

#[derive(Deserialize, Debug)]
struct TransactionResponse {
    transaction_reference: String,
}

/// HTTP client for the ledger gateway.
pub struct HttpLedger {
    client: reqwest::blocking::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpLedger {
    /// # build the ledger client from the environment
    /// reads `LEDGER_URL` (None when unset, the persistence chain then
    /// skips verification entirely), `LEDGER_API_TOKEN` and
    /// `LEDGER_TIMEOUT_SECONDS`.
    pub fn from_env() -> Option<HttpLedger> {
        dotenv().ok();

        let base_url = env::var("LEDGER_URL").ok()?;
        let api_token = env::var("LEDGER_API_TOKEN").ok();

        let timeout = env::var("LEDGER_TIMEOUT_SECONDS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_LEDGER_TIMEOUT_SECONDS);

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .ok()?;

        Some(HttpLedger {
            client,
            base_url,
            api_token,
        })
    }

    fn request(&self, request: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn ledger_error(context: &str, err: impl std::fmt::Display) -> Error {
        error!(target: "persistence/ledger", "{}: {}", context, err);
        Error::LedgerError {
            reason: format!("{}: {}", context, err),
        }
    }
}

impl VerificationLedger for HttpLedger {
    fn put_content(&self, record: &PersistedLapRecord) -> CustomResult<String> {
        let url = format!("{}/content", self.base_url);

        let response = self
            .request(self.client.post(&url).json(record))
            .send()
            .map_err(|err| HttpLedger::ledger_error("content upload failed", err))?;

        if !response.status().is_success() {
            return Err(Error::LedgerError {
                reason: format!("content store answered {}", response.status()),
            });
        }

        let content: ContentResponse = response
            .json()
            .map_err(|err| HttpLedger::ledger_error("malformed content response", err))?;

        Ok(content.content_reference)
    }

    fn get_content(&self, content_reference: &str) -> CustomResult<PersistedLapRecord> {
        let url = format!("{}/content/{}", self.base_url, content_reference);

        let response = self
            .request(self.client.get(&url))
            .send()
            .map_err(|err| HttpLedger::ledger_error("content fetch failed", err))?;

        if !response.status().is_success() {
            return Err(Error::LedgerError {
                reason: format!("content store answered {}", response.status()),
            });
        }

        response
            .json()
            .map_err(|err| HttpLedger::ledger_error("malformed content blob", err))
    }

    fn record_transaction(
        &self,
        lap_number: i32,
        content_reference: &str,
        performance_score: f64,
        sector_times: &HashMap<i32, f64>,
    ) -> CustomResult<String> {
        let url = format!("{}/transactions", self.base_url);
        let body = TransactionRequest {
            lap_number,
            content_reference,
            performance_score,
            sector_times,
        };

        // blocks until the ledger confirms, capped by the client timeout
        let response = self
            .request(self.client.post(&url).json(&body))
            .send()
            .map_err(|err| HttpLedger::ledger_error("transaction failed", err))?;

        if !response.status().is_success() {
            return Err(Error::LedgerError {
                reason: format!("ledger answered {}", response.status()),
            });
        }

        let transaction: TransactionResponse = response
            .json()
            .map_err(|err| HttpLedger::ledger_error("malformed transaction response", err))?;

        Ok(transaction.transaction_reference)
    }

    fn get_transaction(&self, lap_number: i32) -> CustomResult<Option<String>> {
        let url = format!("{}/transactions/{}", self.base_url, lap_number);

        let response = self
            .request(self.client.get(&url))
            .send()
            .map_err(|err| HttpLedger::ledger_error("transaction lookup failed", err))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::LedgerError {
                reason: format!("ledger answered {}", response.status()),
            });
        }

        let transaction: TransactionResponse = response
            .json()
            .map_err(|err| HttpLedger::ledger_error("malformed transaction response", err))?;

        Ok(Some(transaction.transaction_reference))
    }
}
