use log::{info, warn};

use crate::errors::{CustomResult, Error};
use crate::modules::models::lap_record::{
    AnalysisResult, LedgerReference, PersistedLapRecord, PersistenceReceipt, RecordSource,
    RetrievedLap, StorageTier,
};
use crate::modules::models::sample::SampleSet;
use crate::modules::persistence::ledger::{HttpLedger, VerificationLedger};
use crate::modules::persistence::postgres::PostgresStore;
use crate::modules::persistence::redis_store::RedisStore;
use crate::modules::persistence::store::{LapStore, PutOutcome};

/// # the tiered persistence orchestrator
/// walks the store chain primary -> secondary for every write, then
/// performs the best-effort ledger verification. per lap the state
/// machine is Unseen -> Stored(tier) -> Verified | Unverified; lap
/// identity is write once, a second persist always fails.
///
/// correctness of the feedback loop never depends on the ledger: any
/// ledger failure degrades the receipt and nothing else. the ledger and
/// the stores may diverge after a partial failure, which is surfaced
/// through the receipt warnings rather than hidden.
pub struct PersistenceOrchestrator {
    primary: Box<dyn LapStore>,
    secondary: Box<dyn LapStore>,
    ledger: Option<Box<dyn VerificationLedger>>,
}

impl PersistenceOrchestrator {
    pub fn new(
        primary: Box<dyn LapStore>,
        secondary: Box<dyn LapStore>,
        ledger: Option<Box<dyn VerificationLedger>>,
    ) -> PersistenceOrchestrator {
        PersistenceOrchestrator {
            primary,
            secondary,
            ledger,
        }
    }

    /// the production wiring: postgres primary, redis secondary and the
    /// ledger gateway when `LEDGER_URL` is configured.
    pub fn from_env() -> PersistenceOrchestrator {
        let ledger = HttpLedger::from_env()
            .map(|ledger| Box::new(ledger) as Box<dyn VerificationLedger>);

        PersistenceOrchestrator::new(
            Box::new(PostgresStore::connect()),
            Box::new(RedisStore::connect()),
            ledger,
        )
    }

    /// # persist one analyzed lap
    /// uniqueness check, tier chain write, best-effort ledger write,
    /// receipt. see the type level docs for the failure policy.
    ///
    /// ## Arguments
    /// * `samples` - the lap's closed sample set
    /// * `analysis` - the analysis computed for exactly these samples
    ///
    /// ## Returns
    /// * `PersistenceReceipt` - which tiers succeeded and every warning
    /// * `Error::DuplicateLapError` - the lap is already persisted
    /// * `Error::StorageUnavailableError` - both tiers refused the write
    pub fn persist(
        &mut self,
        samples: &SampleSet,
        analysis: &AnalysisResult,
    ) -> CustomResult<PersistenceReceipt> {
        let lap_number = analysis.lap_number;
        let mut warnings: Vec<String> = Vec::new();

        // uniqueness pre-check across both tiers. an unreachable tier is
        // treated as absent with a warning, the atomic put is the real guard.
        self.check_not_persisted(lap_number, &mut warnings)?;

        let mut record = PersistedLapRecord {
            lap_number,
            samples: samples.samples().to_vec(),
            analysis: analysis.clone(),
            storage_tier: StorageTier::Primary,
            ledger: None,
        };

        let tier_used = match self.primary.put(&record) {
            PutOutcome::Stored => StorageTier::Primary,
            PutOutcome::Conflict => return Err(Error::DuplicateLapError { lap_number }),
            PutOutcome::Unavailable(primary_reason) => {
                warn!(
                    target: "persistence/orchestrator:persist",
                    "primary store degraded for lap {}: {}", lap_number, primary_reason
                );
                warnings.push(format!("primary store degraded: {}", primary_reason));

                record.storage_tier = StorageTier::Secondary;
                match self.secondary.put(&record) {
                    PutOutcome::Stored => StorageTier::Secondary,
                    PutOutcome::Conflict => return Err(Error::DuplicateLapError { lap_number }),
                    PutOutcome::Unavailable(secondary_reason) => {
                        return Err(Error::StorageUnavailableError {
                            primary: primary_reason,
                            secondary: secondary_reason,
                        });
                    }
                }
            }
        };

        info!(
            target: "persistence/orchestrator:persist",
            "lap {} stored on the {} tier", lap_number, tier_used
        );

        let (content_reference, transaction_reference) =
            self.verify_on_ledger(&record, tier_used, &mut warnings);

        Ok(PersistenceReceipt {
            lap_number,
            tier_used,
            ledger_verified: transaction_reference.is_some(),
            content_reference,
            transaction_reference,
            warnings,
        })
    }

    /// # retrieve a persisted lap
    /// prefers the ledger copy when the stored record is verified and
    /// the ledger answers, otherwise serves whichever tier holds the
    /// record, annotating the source. a record whose transaction never
    /// confirmed during persist is re-checked against the ledger here,
    /// the transaction may have gone through after the timeout.
    ///
    /// ## Returns
    /// * `RetrievedLap` - the record and where it was served from
    /// * `Error::NotFoundError` - no tier holds the lap
    pub fn get(&mut self, lap_number: i32) -> CustomResult<RetrievedLap> {
        let mut found: Option<(PersistedLapRecord, RecordSource)> = None;

        for store in [self.primary.as_mut(), self.secondary.as_mut()] {
            let tier = store.tier();
            match store.get(lap_number) {
                Ok(Some(record)) => {
                    found = Some((record, RecordSource::from(tier)));
                    break;
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(
                        target: "persistence/orchestrator:get",
                        "{} read failed for lap {}: {}", tier, lap_number, error
                    );
                }
            }
        }

        let (record, source) = found.ok_or(Error::NotFoundError { lap_number })?;

        if let (Some(ledger), Some(reference)) = (&self.ledger, &record.ledger) {
            let verified = reference.transaction_reference.is_some()
                || matches!(ledger.get_transaction(lap_number), Ok(Some(_)));

            if verified {
                match ledger.get_content(&reference.content_reference) {
                    Ok(ledger_record) => {
                        return Ok(RetrievedLap {
                            record: ledger_record,
                            source: RecordSource::Ledger,
                        });
                    }
                    Err(error) => {
                        warn!(
                            target: "persistence/orchestrator:get",
                            "ledger unreachable for lap {}, serving the {:?} tier: {}",
                            lap_number, source, error
                        );
                    }
                }
            }
        }

        Ok(RetrievedLap { record, source })
    }

    /// # list every persisted lap
    /// serves the primary tier's view, falling back to the secondary
    /// when the primary cannot be read. no cross tier merge: the tiers
    /// may diverge after a degraded persist and the listing reflects
    /// whichever tier answered.
    ///
    /// ## Returns
    /// * the stored records ordered by lap number
    /// * `Error::StorageUnavailableError` - neither tier could be read
    pub fn list(&mut self) -> CustomResult<Vec<PersistedLapRecord>> {
        match self.primary.list() {
            Ok(records) => Ok(records),
            Err(primary_error) => {
                warn!(
                    target: "persistence/orchestrator:list",
                    "primary listing failed, trying secondary: {}", primary_error
                );
                match self.secondary.list() {
                    Ok(records) => Ok(records),
                    Err(secondary_error) => Err(Error::StorageUnavailableError {
                        primary: primary_error.to_string(),
                        secondary: secondary_error.to_string(),
                    }),
                }
            }
        }
    }

    fn check_not_persisted(
        &mut self,
        lap_number: i32,
        warnings: &mut Vec<String>,
    ) -> CustomResult<()> {
        for store in [self.primary.as_mut(), self.secondary.as_mut()] {
            match store.exists(lap_number) {
                Ok(true) => return Err(Error::DuplicateLapError { lap_number }),
                Ok(false) => {}
                Err(error) => {
                    warnings.push(format!(
                        "uniqueness check skipped on {} tier: {}",
                        store.tier(),
                        error
                    ));
                }
            }
        }

        Ok(())
    }

    /// best-effort ledger verification. returns whichever references
    /// were obtained; every failure becomes a warning, never an error.
    fn verify_on_ledger(
        &mut self,
        record: &PersistedLapRecord,
        tier_used: StorageTier,
        warnings: &mut Vec<String>,
    ) -> (Option<String>, Option<String>) {
        let ledger = match &self.ledger {
            Some(ledger) => ledger,
            None => return (None, None),
        };

        let lap_number = record.lap_number;

        let content_reference = match ledger.put_content(record) {
            Ok(content_reference) => content_reference,
            Err(error) => {
                warn!(
                    target: "persistence/orchestrator:persist",
                    "content upload failed for lap {}: {}", lap_number, error
                );
                warnings.push(format!("ledger content upload failed: {}", error));
                return (None, None);
            }
        };

        let transaction_reference = match ledger.record_transaction(
            lap_number,
            &content_reference,
            record.analysis.performance_score,
            &record.analysis.sector_times,
        ) {
            Ok(transaction_reference) => transaction_reference,
            Err(error) => {
                warn!(
                    target: "persistence/orchestrator:persist",
                    "ledger transaction failed for lap {}: {}", lap_number, error
                );
                warnings.push(format!("ledger transaction failed: {}", error));

                // keep the content reference on the record so a later read
                // can re-check whether the transaction confirmed after all
                let partial = LedgerReference {
                    content_reference: content_reference.clone(),
                    transaction_reference: None,
                };
                let store = match tier_used {
                    StorageTier::Primary => self.primary.as_mut(),
                    StorageTier::Secondary => self.secondary.as_mut(),
                };
                if let Err(attach_error) = store.attach_ledger(lap_number, &partial) {
                    warnings.push(format!("ledger references not attached: {}", attach_error));
                }

                return (Some(content_reference), None);
            }
        };

        let reference = LedgerReference {
            content_reference: content_reference.clone(),
            transaction_reference: Some(transaction_reference.clone()),
        };

        let store = match tier_used {
            StorageTier::Primary => self.primary.as_mut(),
            StorageTier::Secondary => self.secondary.as_mut(),
        };
        if let Err(error) = store.attach_ledger(lap_number, &reference) {
            warn!(
                target: "persistence/orchestrator:persist",
                "could not attach ledger references for lap {}: {}", lap_number, error
            );
            warnings.push(format!("ledger references not attached: {}", error));
        }

        (Some(content_reference), Some(transaction_reference))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::modules::analysis::orchestrator::LapAnalysisOrchestrator;
    use crate::modules::models::sample::{TelemetrySample, TireCompound};
    use crate::modules::persistence::memory::MemoryStore;
    use crate::modules::predictor::Predictor;

    // stub ledger with per call failure switches. `late_confirmed`
    // simulates a transaction that went through after the persist call
    // gave up waiting.
    #[derive(Clone)]
    struct StubLedger {
        content_ok: Arc<AtomicBool>,
        transaction_ok: Arc<AtomicBool>,
        late_confirmed: Arc<AtomicBool>,
        contents: Arc<Mutex<HashMap<String, PersistedLapRecord>>>,
    }

    impl StubLedger {
        fn new() -> StubLedger {
            StubLedger {
                content_ok: Arc::new(AtomicBool::new(true)),
                transaction_ok: Arc::new(AtomicBool::new(true)),
                late_confirmed: Arc::new(AtomicBool::new(false)),
                contents: Arc::new(Mutex::new(HashMap::new())),
            }
        }
    }

    impl VerificationLedger for StubLedger {
        fn put_content(&self, record: &PersistedLapRecord) -> CustomResult<String> {
            if !self.content_ok.load(Ordering::SeqCst) {
                return Err(Error::LedgerError {
                    reason: "content store down".to_string(),
                });
            }
            let reference = format!("content-{}", record.lap_number);
            self.contents
                .lock()
                .unwrap()
                .insert(reference.clone(), record.clone());
            Ok(reference)
        }

        fn get_content(&self, content_reference: &str) -> CustomResult<PersistedLapRecord> {
            self.contents
                .lock()
                .unwrap()
                .get(content_reference)
                .cloned()
                .ok_or(Error::LedgerError {
                    reason: "unknown content reference".to_string(),
                })
        }

        fn record_transaction(
            &self,
            lap_number: i32,
            _content_reference: &str,
            _performance_score: f64,
            _sector_times: &HashMap<i32, f64>,
        ) -> CustomResult<String> {
            if !self.transaction_ok.load(Ordering::SeqCst) {
                return Err(Error::LedgerError {
                    reason: "ledger timeout".to_string(),
                });
            }
            Ok(format!("tx-{}", lap_number))
        }

        fn get_transaction(&self, lap_number: i32) -> CustomResult<Option<String>> {
            if self.transaction_ok.load(Ordering::SeqCst)
                || self.late_confirmed.load(Ordering::SeqCst)
            {
                Ok(Some(format!("tx-{}", lap_number)))
            } else {
                Ok(None)
            }
        }
    }

    struct StubPredictor(f64);

    impl Predictor for StubPredictor {
        fn predict(&self, _samples: &crate::modules::models::sample::SampleSet) -> CustomResult<f64> {
            Ok(self.0)
        }
    }

    fn lap_samples(lap_number: i32) -> crate::modules::models::sample::SampleSet {
        let mut samples: Vec<TelemetrySample> = (0..12)
            .map(|i| TelemetrySample {
                lap_number,
                sector: 1 + (i / 4) as i32,
                timestamp: i as f64 * 7.0,
                speed: 210.0,
                throttle: 97.0,
                brake: 0.0,
                steering_angle: 0.0,
                gear: 7,
                tire_compound: TireCompound::Hard,
                tire_wear: 12.0,
                track_temperature: 39.0,
                lap_time: None,
            })
            .collect();
        samples.last_mut().unwrap().lap_time = Some(88.9);
        crate::modules::models::sample::SampleSet::new(lap_number, samples).unwrap()
    }

    fn analyzed(lap_number: i32) -> (crate::modules::models::sample::SampleSet, AnalysisResult) {
        let samples = lap_samples(lap_number);
        let predictor = StubPredictor(88.5);
        let analysis = LapAnalysisOrchestrator::new(&predictor)
            .analyze(&samples)
            .unwrap();
        (samples, analysis)
    }

    fn orchestrator(
        primary: MemoryStore,
        secondary: MemoryStore,
        ledger: Option<StubLedger>,
    ) -> PersistenceOrchestrator {
        PersistenceOrchestrator::new(
            Box::new(primary),
            Box::new(secondary),
            ledger.map(|l| Box::new(l) as Box<dyn VerificationLedger>),
        )
    }

    #[test]
    fn happy_path_stores_on_primary_and_verifies() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let ledger = StubLedger::new();
        let mut orchestrator = orchestrator(primary.clone(), secondary, Some(ledger));

        let (samples, analysis) = analyzed(12);
        let receipt = orchestrator.persist(&samples, &analysis).unwrap();

        assert_eq!(receipt.tier_used, StorageTier::Primary);
        assert!(receipt.ledger_verified);
        assert_eq!(receipt.content_reference.as_deref(), Some("content-12"));
        assert_eq!(receipt.transaction_reference.as_deref(), Some("tx-12"));
        assert!(receipt.warnings.is_empty());

        // the stored record carries the ledger references
        let mut primary = primary;
        let stored = primary.get(12).unwrap().unwrap();
        assert_eq!(
            stored.ledger.unwrap().transaction_reference.as_deref(),
            Some("tx-12")
        );
    }

    #[test]
    fn second_persist_for_the_same_lap_is_a_duplicate() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let mut orchestrator = orchestrator(primary, secondary, None);

        let (samples, analysis) = analyzed(5);
        orchestrator.persist(&samples, &analysis).unwrap();

        let second = orchestrator.persist(&samples, &analysis);
        assert_eq!(second, Err(Error::DuplicateLapError { lap_number: 5 }));
    }

    #[test]
    fn primary_outage_falls_back_to_secondary_with_warning() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        primary.set_available(false);
        let mut orchestrator = orchestrator(primary, secondary.clone(), None);

        let (samples, analysis) = analyzed(9);
        let receipt = orchestrator.persist(&samples, &analysis).unwrap();

        assert_eq!(receipt.tier_used, StorageTier::Secondary);
        assert!(!receipt.warnings.is_empty());
        assert!(!receipt.ledger_verified);

        let mut secondary = secondary;
        let stored = secondary.get(9).unwrap().unwrap();
        assert_eq!(stored.storage_tier, StorageTier::Secondary);
    }

    #[test]
    fn both_tiers_down_is_fatal() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        primary.set_available(false);
        secondary.set_available(false);
        let mut orchestrator = orchestrator(primary, secondary, None);

        let (samples, analysis) = analyzed(2);
        let result = orchestrator.persist(&samples, &analysis);

        assert!(matches!(
            result,
            Err(Error::StorageUnavailableError { .. })
        ));
    }

    #[test]
    fn ledger_outage_degrades_the_receipt_only() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let ledger = StubLedger::new();
        ledger.content_ok.store(false, Ordering::SeqCst);
        let mut orchestrator = orchestrator(primary, secondary, Some(ledger));

        let (samples, analysis) = analyzed(3);
        let receipt = orchestrator.persist(&samples, &analysis).unwrap();

        assert_eq!(receipt.tier_used, StorageTier::Primary);
        assert!(!receipt.ledger_verified);
        assert_eq!(receipt.content_reference, None);
        assert!(!receipt.warnings.is_empty());
    }

    #[test]
    fn confirmed_transaction_failure_still_reports_the_content_reference() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let ledger = StubLedger::new();
        ledger.transaction_ok.store(false, Ordering::SeqCst);
        let mut orchestrator = orchestrator(primary, secondary, Some(ledger));

        let (samples, analysis) = analyzed(4);
        let receipt = orchestrator.persist(&samples, &analysis).unwrap();

        assert!(!receipt.ledger_verified);
        assert_eq!(receipt.content_reference.as_deref(), Some("content-4"));
        assert_eq!(receipt.transaction_reference, None);
    }

    #[test]
    fn get_prefers_the_verified_ledger_copy() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let ledger = StubLedger::new();
        let mut orchestrator =
            orchestrator(primary, secondary, Some(ledger));

        let (samples, analysis) = analyzed(8);
        orchestrator.persist(&samples, &analysis).unwrap();

        let retrieved = orchestrator.get(8).unwrap();
        assert_eq!(retrieved.source, RecordSource::Ledger);
        assert_eq!(retrieved.record.lap_number, 8);
    }

    #[test]
    fn get_without_ledger_serves_the_store_tier() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let mut orchestrator = orchestrator(primary, secondary, None);

        let (samples, analysis) = analyzed(6);
        orchestrator.persist(&samples, &analysis).unwrap();

        let retrieved = orchestrator.get(6).unwrap();
        assert_eq!(retrieved.source, RecordSource::Primary);
    }

    #[test]
    fn late_ledger_confirmation_upgrades_the_read() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let ledger = StubLedger::new();
        ledger.transaction_ok.store(false, Ordering::SeqCst);
        let mut orchestrator =
            orchestrator(primary, secondary, Some(ledger.clone()));

        let (samples, analysis) = analyzed(11);
        let receipt = orchestrator.persist(&samples, &analysis).unwrap();
        assert!(!receipt.ledger_verified);

        // while the transaction is still unconfirmed the tier copy is served
        let retrieved = orchestrator.get(11).unwrap();
        assert_eq!(retrieved.source, RecordSource::Primary);

        // the transaction confirms after the persist gave up waiting
        ledger.late_confirmed.store(true, Ordering::SeqCst);
        let retrieved = orchestrator.get(11).unwrap();
        assert_eq!(retrieved.source, RecordSource::Ledger);
        assert_eq!(retrieved.record.lap_number, 11);
    }

    #[test]
    fn list_returns_records_in_lap_order() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let mut orchestrator = orchestrator(primary, secondary, None);

        for lap in [14, 10, 12] {
            let (samples, analysis) = analyzed(lap);
            orchestrator.persist(&samples, &analysis).unwrap();
        }

        let laps: Vec<i32> = orchestrator
            .list()
            .unwrap()
            .iter()
            .map(|record| record.lap_number)
            .collect();
        assert_eq!(laps, vec![10, 12, 14]);
    }

    #[test]
    fn listing_falls_back_to_the_secondary_tier() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        primary.set_available(false);
        let mut orchestrator = orchestrator(primary.clone(), secondary, None);

        let (samples, analysis) = analyzed(21);
        orchestrator.persist(&samples, &analysis).unwrap();

        let records = orchestrator.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lap_number, 21);
        assert_eq!(records[0].storage_tier, StorageTier::Secondary);
    }

    #[test]
    fn listing_with_both_tiers_down_is_fatal() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        primary.set_available(false);
        secondary.set_available(false);
        let mut orchestrator = orchestrator(primary, secondary, None);

        assert!(matches!(
            orchestrator.list(),
            Err(Error::StorageUnavailableError { .. })
        ));
    }

    #[test]
    fn get_for_an_unknown_lap_is_not_found() {
        let primary = MemoryStore::new(StorageTier::Primary);
        let secondary = MemoryStore::new(StorageTier::Secondary);
        let mut orchestrator = orchestrator(primary, secondary, None);

        assert_eq!(
            orchestrator.get(99),
            Err(Error::NotFoundError { lap_number: 99 })
        );
    }
}
