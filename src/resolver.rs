// 🧭 Classification Resolver - cache → escalation chain → cache write
//
// Never fails for classification reasons; only cache storage failures
// propagate. Misc answers are never written.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::cache::{normalize_item_key, CacheStore, ItemSource};
use crate::category::{title_case, Category};
use crate::escalation::{EscalationChain, Origin};

/// Which path produced a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPath {
    CacheHit,
    AiResolved,
    HeuristicResolved,
    /// Escalation failed unexpectedly or the item was blank
    Default,
}

impl ResolutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPath::CacheHit => "cache_hit",
            ResolutionPath::AiResolved => "ai_resolved",
            ResolutionPath::HeuristicResolved => "heuristic_resolved",
            ResolutionPath::Default => "default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub category: Category,
    pub normalized_name: String,
    pub source: ItemSource,
    pub path: ResolutionPath,
}

type KeyLock = Arc<Mutex<()>>;

pub struct ClassificationResolver {
    cache: Arc<dyn CacheStore>,
    chain: EscalationChain,
    /// One lock per key currently being resolved
    in_flight: Mutex<HashMap<String, KeyLock>>,
}

impl ClassificationResolver {
    pub fn new(cache: Arc<dyn CacheStore>, chain: EscalationChain) -> Self {
        ClassificationResolver {
            cache,
            chain,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn resolve(&self, item: &str) -> Result<Resolution> {
        let key = normalize_item_key(item);
        if key.is_empty() {
            return Ok(Self::fallback(item));
        }

        if let Some(hit) = self.lookup(&key)? {
            return Ok(hit);
        }

        // Single-flight: one escalation per key at a time. Late arrivals
        // re-check the cache once the first caller is done.
        let key_lock = self.acquire(&key);
        let outcome = {
            let _guard = key_lock.lock().unwrap_or_else(PoisonError::into_inner);
            match self.lookup(&key) {
                Ok(Some(hit)) => Ok(hit),
                Ok(None) => self.resolve_miss(item, &key),
                Err(e) => Err(e),
            }
        };
        self.release(&key, key_lock);

        outcome
    }

    fn lookup(&self, key: &str) -> Result<Option<Resolution>> {
        Ok(self.cache.get(key)?.map(|record| {
            log::debug!("cache hit for '{}' -> {}", key, record.category);
            Resolution {
                category: record.category,
                normalized_name: record.normalized_name,
                source: record.source,
                path: ResolutionPath::CacheHit,
            }
        }))
    }

    fn resolve_miss(&self, item: &str, key: &str) -> Result<Resolution> {
        let escalated = match panic::catch_unwind(AssertUnwindSafe(|| self.chain.escalate(item))) {
            Ok(escalated) => escalated,
            Err(_) => {
                log::error!("classification of '{}' panicked, using fallback", item);
                return Ok(Self::fallback(item));
            }
        };

        let path = match escalated.origin {
            Origin::Model(_) => ResolutionPath::AiResolved,
            Origin::Heuristic => ResolutionPath::HeuristicResolved,
        };
        let classification = escalated.classification;

        if classification.category.is_misc() {
            log::debug!("'{}' resolved to Misc, not caching", key);
        } else {
            let written = self.cache.put(
                key,
                classification.category,
                &classification.normalized_name,
                ItemSource::Ai,
            )?;
            if written {
                log::info!(
                    "cached '{}' -> {} ({})",
                    key,
                    classification.category,
                    classification.normalized_name
                );
            }
        }

        Ok(Resolution {
            category: classification.category,
            normalized_name: classification.normalized_name,
            source: ItemSource::Ai,
            path,
        })
    }

    fn fallback(item: &str) -> Resolution {
        Resolution {
            category: Category::Misc,
            normalized_name: title_case(&normalize_item_key(item)),
            source: ItemSource::Fallback,
            path: ResolutionPath::Default,
        }
    }

    fn acquire(&self, key: &str) -> KeyLock {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.entry(key.to_string()).or_default().clone()
    }

    fn release(&self, key: &str, key_lock: KeyLock) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        // Our clone plus the table's entry: nobody else is waiting
        if Arc::strong_count(&key_lock) <= 2 {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::escalation::tests::{answer, ScriptedClient};
    use crate::llm::{ModelClient, ModelOutcome, ModelTiers};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn heuristic_resolver() -> (Arc<Database>, ClassificationResolver) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let resolver = ClassificationResolver::new(db.clone(), EscalationChain::heuristic_only());
        (db, resolver)
    }

    fn model_resolver(client: Arc<dyn ModelClient>) -> (Arc<Database>, ClassificationResolver) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let chain = EscalationChain::new(Some(client), ModelTiers::default());
        (db.clone(), ClassificationResolver::new(db, chain))
    }

    struct PanickingClient;

    impl ModelClient for PanickingClient {
        fn generate(&self, _model: &str, _prompt: &str) -> ModelOutcome {
            panic!("provider library blew up");
        }
    }

    /// Slow client that counts calls, for single-flight checks
    struct CountingClient {
        calls: AtomicUsize,
    }

    impl ModelClient for CountingClient {
        fn generate(&self, _model: &str, _prompt: &str) -> ModelOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(50));
            answer("Pantry", "Saffron")
        }
    }

    #[test]
    fn test_second_resolution_comes_from_cache() {
        let (_db, resolver) = heuristic_resolver();

        let first = resolver.resolve("Greek Yogurt").unwrap();
        assert_eq!(first.path, ResolutionPath::HeuristicResolved);
        assert_eq!(first.category, Category::Dairy);
        assert_eq!(first.source, ItemSource::Ai);

        let second = resolver.resolve("  greek yogurt ").unwrap();
        assert_eq!(second.path, ResolutionPath::CacheHit);
        assert_eq!(
            (second.category, second.normalized_name.as_str(), second.source),
            (first.category, first.normalized_name.as_str(), first.source)
        );
    }

    #[test]
    fn test_model_answer_is_cached() {
        let client = ScriptedClient::new(vec![answer("Produce", "Quirky Item")]);
        let (db, resolver) = model_resolver(client.clone());

        let first = resolver.resolve("quirky item").unwrap();
        assert_eq!(first.path, ResolutionPath::AiResolved);
        assert_eq!(first.category, Category::Produce);

        let record = db.get("quirky item").unwrap().unwrap();
        assert_eq!(record.source, ItemSource::Ai);

        let second = resolver.resolve("quirky item").unwrap();
        assert_eq!(second.path, ResolutionPath::CacheHit);
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn test_manual_override_always_wins() {
        let client = ScriptedClient::new(vec![answer("Pantry", "Tofu")]);
        let (db, resolver) = model_resolver(client.clone());

        db.override_item("tofu", Category::Produce, "Tofu").unwrap();

        for _ in 0..3 {
            let resolution = resolver.resolve("Tofu").unwrap();
            assert_eq!(resolution.category, Category::Produce);
            assert_eq!(resolution.source, ItemSource::Manual);
            assert_eq!(resolution.path, ResolutionPath::CacheHit);
        }
        assert!(client.calls().is_empty());

        // A direct automated write is refused as well
        assert!(!db.put("tofu", Category::Pantry, "Tofu", ItemSource::Ai).unwrap());
    }

    #[test]
    fn test_misc_is_never_cached() {
        let (db, resolver) = heuristic_resolver();

        let first = resolver.resolve("quirky item").unwrap();
        assert_eq!(first.category, Category::Misc);
        assert!(db.get("quirky item").unwrap().is_none());

        let second = resolver.resolve("quirky item").unwrap();
        assert_eq!(second.path, ResolutionPath::HeuristicResolved);
        assert!(db.get("quirky item").unwrap().is_none());
    }

    #[test]
    fn test_misc_is_reclassified_later() {
        let client = ScriptedClient::new(vec![
            answer("Misc", "Saffron"),
            answer("Misc", "Saffron"),
            answer("Pantry", "Saffron"),
        ]);
        let (db, resolver) = model_resolver(client);

        assert_eq!(resolver.resolve("saffron").unwrap().category, Category::Misc);
        assert!(db.get("saffron").unwrap().is_none());

        let later = resolver.resolve("saffron").unwrap();
        assert_eq!(later.category, Category::Pantry);
        assert_eq!(later.path, ResolutionPath::AiResolved);
    }

    #[test]
    fn test_panicking_client_degrades_to_fallback() {
        let (db, resolver) = model_resolver(Arc::new(PanickingClient));

        let resolution = resolver.resolve("  Dragon Fruit ").unwrap();
        assert_eq!(resolution.category, Category::Misc);
        assert_eq!(resolution.normalized_name, "Dragon Fruit");
        assert_eq!(resolution.source, ItemSource::Fallback);
        assert_eq!(resolution.path, ResolutionPath::Default);
        assert!(db.get("dragon fruit").unwrap().is_none());
    }

    #[test]
    fn test_blank_item_is_default() {
        let (_db, resolver) = heuristic_resolver();
        let resolution = resolver.resolve("   ").unwrap();
        assert_eq!(resolution.path, ResolutionPath::Default);
        assert_eq!(resolution.category, Category::Misc);
    }

    #[test]
    fn test_concurrent_misses_share_one_escalation() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
        });
        let (_db, resolver) = model_resolver(client.clone());

        let results: Vec<Resolution> = thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| resolver.resolve("saffron").unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.category == Category::Pantry));
        assert_eq!(resolver.in_flight_len(), 0);
    }
}
