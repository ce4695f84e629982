//! Background lookup dispatch
//!
//! Each accepted OCR text becomes its own tokio task. Tasks are never pooled
//! or cancelled; they run to completion or time out. Every dispatch takes a
//! generation number so a slow lookup finishing after a newer one can be
//! told apart and dropped. Applying a result and saving it happen under one
//! lock, so the log order matches the display order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{normalize_query, CardLookup};
use crate::error::ScanError;
use crate::shared::SharedSession;
use crate::storage::{RecordOutcome, ScanRecorder};

/// Spawns lookups and applies their results to the session
pub struct LookupDispatcher {
    lookup: Arc<dyn CardLookup>,
    recorder: Arc<ScanRecorder>,
    session: SharedSession,
    runtime: Handle,
    timeout: Duration,
    discard_stale: bool,
    generation: AtomicU64,
    apply_order: Arc<tokio::sync::Mutex<()>>,
}

impl LookupDispatcher {
    pub fn new(
        lookup: Arc<dyn CardLookup>,
        recorder: Arc<ScanRecorder>,
        session: SharedSession,
        runtime: Handle,
        timeout: Duration,
        discard_stale: bool,
    ) -> Self {
        Self {
            lookup,
            recorder,
            session,
            runtime,
            timeout,
            discard_stale,
            generation: AtomicU64::new(0),
            apply_order: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Start a lookup for `text` and return immediately
    pub fn dispatch(&self, text: &str) -> JoinHandle<()> {
        let query = normalize_query(text);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Dispatching lookup #{} for {:?}", generation, query);

        let lookup = self.lookup.clone();
        let recorder = self.recorder.clone();
        let session = self.session.clone();
        let timeout = self.timeout;
        let discard_stale = self.discard_stale;
        let apply_order = self.apply_order.clone();

        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, lookup.lookup(&query)).await {
                Ok(result) => result,
                Err(_) => Err(ScanError::LookupFailure(format!(
                    "timed out after {:?}",
                    timeout
                ))),
            };

            let _applying = apply_order.lock().await;
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!("Lookup for {:?} failed: {}", query, e);
                    if !session.write().apply_failure(generation, discard_stale) {
                        debug!("Ignoring failure of stale lookup #{}", generation);
                    }
                    return;
                }
            };

            let card = record.to_card_info();
            if !session.write().apply_card(generation, card.clone(), discard_stale) {
                debug!("Discarding stale lookup #{} ({})", generation, card.name);
                return;
            }
            info!("Found {} ({}) {}", card.name, card.set, card.price);

            match tokio::task::spawn_blocking(move || recorder.record(&card)).await {
                Ok(RecordOutcome::Failed) => {
                    debug!("Lookup #{} resolved but was not saved", generation)
                }
                Ok(_) => {}
                Err(e) => warn!("Scan recorder task failed: {}", e),
            }
        })
    }

    /// Number of lookups dispatched so far
    pub fn dispatched(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanResult;
    use crate::lookup::{CardRecord, Prices};
    use crate::shared::SessionState;
    use crate::storage::memory::MemoryScanLog;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Lookup answering from a table, with an optional per-query delay
    #[derive(Default)]
    struct FakeLookup {
        cards: HashMap<String, CardRecord>,
        delays: HashMap<String, Duration>,
        queries: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn with_card(mut self, query: &str, name: &str, set: &str, usd: Option<&str>) -> Self {
            self.cards.insert(
                query.to_string(),
                CardRecord {
                    name: name.to_string(),
                    set_name: set.to_string(),
                    prices: Prices {
                        usd: usd.map(str::to_string),
                        usd_foil: None,
                    },
                },
            );
            self
        }

        fn with_delay(mut self, query: &str, delay: Duration) -> Self {
            self.delays.insert(query.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl CardLookup for FakeLookup {
        async fn lookup(&self, query: &str) -> ScanResult<CardRecord> {
            self.queries.lock().push(query.to_string());
            if let Some(delay) = self.delays.get(query) {
                tokio::time::sleep(*delay).await;
            }
            self.cards
                .get(query)
                .cloned()
                .ok_or_else(|| ScanError::LookupFailure("404".to_string()))
        }
    }

    struct Harness {
        dispatcher: LookupDispatcher,
        session: SharedSession,
        log: Arc<Mutex<MemoryScanLog>>,
        lookup: Arc<FakeLookup>,
    }

    fn harness(lookup: FakeLookup, timeout: Duration, discard_stale: bool) -> Harness {
        let session = SessionState::new(25, 1.0).shared();
        let log = Arc::new(Mutex::new(MemoryScanLog::default()));
        let recorder = Arc::new(ScanRecorder::new(log.clone(), session.clone()));
        let lookup = Arc::new(lookup);
        let dispatcher = LookupDispatcher::new(
            lookup.clone(),
            recorder,
            session.clone(),
            Handle::current(),
            timeout,
            discard_stale,
        );
        Harness {
            dispatcher,
            session,
            log,
            lookup,
        }
    }

    #[tokio::test]
    async fn test_black_lotus_end_to_end() {
        let lookup = FakeLookup::default().with_card(
            "Black Lotus",
            "Black Lotus",
            "Vintage Masters",
            Some("5.00"),
        );
        let h = harness(lookup, Duration::from_secs(5), true);

        h.dispatcher.dispatch("Black Lotus").await.unwrap();
        {
            let state = h.session.read();
            assert!(state.card.found);
            assert_eq!(state.card.name, "Black Lotus");
            assert_eq!(state.card.set, "Vintage Masters");
            assert_eq!(state.card.price, "$5.00");
            assert_eq!(state.scanned_count, 1);
            assert_eq!(state.last_save_message, "ADDED: Black Lotus");
        }

        // same card resolved again right after
        h.dispatcher.dispatch("Black Lotus").await.unwrap();
        assert_eq!(h.session.read().scanned_count, 1);

        let log = h.log.lock();
        assert_eq!(log.entries.len(), 1);
        assert_eq!(log.entries[0].name, "Black Lotus");
        assert_eq!(log.entries[0].set, "Vintage Masters");
        assert_eq!(log.entries[0].price, "$5.00");
    }

    #[tokio::test]
    async fn test_query_is_normalized() {
        let lookup = FakeLookup::default().with_card("Black Lotus", "Black Lotus", "LEA", None);
        let h = harness(lookup, Duration::from_secs(5), true);

        h.dispatcher.dispatch("  Black\nLotus\n").await.unwrap();
        assert_eq!(*h.lookup.queries.lock(), vec!["Black Lotus".to_string()]);
        assert_eq!(h.session.read().card.price, "N/A");
    }

    #[tokio::test]
    async fn test_failure_marks_not_found_without_saving() {
        let lookup = FakeLookup::default().with_card("Mox Jet", "Mox Jet", "LEB", Some("1.00"));
        let h = harness(lookup, Duration::from_secs(5), true);

        h.dispatcher.dispatch("Mox Jet").await.unwrap();
        assert!(h.session.read().card.found);

        h.dispatcher.dispatch("Gibberish").await.unwrap();
        let state = h.session.read();
        assert!(!state.card.found);
        assert_eq!(state.scanned_count, 1);
        assert_eq!(h.log.lock().entries.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_failure() {
        let lookup = FakeLookup::default()
            .with_card("Slow Card", "Slow Card", "LEA", Some("1.00"))
            .with_delay("Slow Card", Duration::from_secs(30));
        let h = harness(lookup, Duration::from_secs(5), true);

        h.dispatcher.dispatch("Slow Card").await.unwrap();
        assert!(!h.session.read().card.found);
        assert!(h.log.lock().entries.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_result_is_discarded() {
        let lookup = FakeLookup::default()
            .with_card("Ancestral Recall", "Ancestral Recall", "LEA", Some("9.00"))
            .with_card("Time Walk", "Time Walk", "LEA", Some("8.00"))
            .with_delay("Ancestral Recall", Duration::from_secs(3));
        let h = harness(lookup, Duration::from_secs(5), true);

        let slow = h.dispatcher.dispatch("Ancestral Recall");
        let fast = h.dispatcher.dispatch("Time Walk");
        fast.await.unwrap();
        slow.await.unwrap();

        assert_eq!(h.dispatcher.dispatched(), 2);
        assert_eq!(h.session.read().card.name, "Time Walk");
        let names: Vec<String> = h.log.lock().entries.iter().map(|e| e.name.clone()).collect();
        assert_eq!(names, vec!["Time Walk"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_write_wins_when_allowed() {
        let lookup = FakeLookup::default()
            .with_card("Ancestral Recall", "Ancestral Recall", "LEA", Some("9.00"))
            .with_card("Time Walk", "Time Walk", "LEA", Some("8.00"))
            .with_delay("Ancestral Recall", Duration::from_secs(3));
        let h = harness(lookup, Duration::from_secs(5), false);

        let slow = h.dispatcher.dispatch("Ancestral Recall");
        let fast = h.dispatcher.dispatch("Time Walk");
        fast.await.unwrap();
        slow.await.unwrap();

        assert_eq!(h.session.read().card.name, "Ancestral Recall");
        assert_eq!(h.session.read().scanned_count, 2);
    }
}
