//! Symbol admission: validates new symbols, creates their persisted rows
//! and keeps per-symbol category metadata in memory for event enrichment.
//!
//! Admission never gates the feed. A symbol that cannot be validated is
//! simply not persisted this time; nothing is cached for it, so the next
//! request retries. Classification runs in the background and upgrades the
//! cached metadata once it lands.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classify::{DEFAULT_CATEGORY, SymbolClassifier};
use crate::db::{SymbolRecord, SymbolStore, SymbolUpsert};
use crate::pipeline::FetchPipeline;

/// Category metadata attached to outgoing price updates.
#[derive(Debug, Clone, Default)]
pub struct SymbolMeta {
    /// Persisted category id, when classified.
    pub category_id: Option<Uuid>,
    /// Category name, when classified.
    pub category_name: Option<String>,
    /// Company name, when classified.
    pub company_name: Option<String>,
}

impl SymbolMeta {
    fn from_record(record: &SymbolRecord) -> Self {
        Self {
            category_id: record.category_id,
            category_name: record.category_name.clone(),
            company_name: record.company_name.clone(),
        }
    }
}

/// Admits symbols into the persisted universe.
pub struct SymbolBootstrapper {
    store: Arc<dyn SymbolStore>,
    pipeline: Arc<FetchPipeline>,
    classifier: Option<Arc<SymbolClassifier>>,
    known: DashSet<String>,
    meta: Arc<DashMap<String, SymbolMeta>>,
}

impl SymbolBootstrapper {
    /// Creates a bootstrapper. The classifier is optional; without one,
    /// admitted symbols stay in the default category.
    #[must_use]
    pub fn new(
        store: Arc<dyn SymbolStore>,
        pipeline: Arc<FetchPipeline>,
        classifier: Option<Arc<SymbolClassifier>>,
    ) -> Self {
        Self {
            store,
            pipeline,
            classifier,
            known: DashSet::new(),
            meta: Arc::new(DashMap::new()),
        }
    }

    /// Ensures `symbol` has a persisted row, creating and classifying it on
    /// first sight. Returns whether the symbol is admitted; a `false` means
    /// nothing was cached and a later call will retry.
    pub async fn ensure_known(&self, symbol: &str) -> bool {
        if self.known.contains(symbol) {
            return true;
        }

        match self.store.find_symbol(symbol).await {
            Ok(Some(record)) => {
                let uncategorized = record
                    .category_name
                    .as_deref()
                    .is_none_or(|name| name == DEFAULT_CATEGORY);
                self.meta
                    .insert(symbol.to_string(), SymbolMeta::from_record(&record));
                self.known.insert(symbol.to_string());
                if uncategorized {
                    self.spawn_classification(symbol);
                }
                true
            }
            Ok(None) => self.admit_new(symbol).await,
            Err(e) => {
                warn!(symbol, error = %e, "symbol lookup failed, admission deferred");
                false
            }
        }
    }

    /// Category metadata for an admitted symbol.
    #[must_use]
    pub fn meta(&self, symbol: &str) -> Option<SymbolMeta> {
        self.meta.get(symbol).map(|entry| entry.clone())
    }

    /// Number of admitted symbols.
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    async fn admit_new(&self, symbol: &str) -> bool {
        if !self.pipeline.validate_symbol_exists(symbol).await {
            warn!(symbol, "symbol failed validation, not persisted");
            return false;
        }

        let category_id = match self.store.find_or_create_category(DEFAULT_CATEGORY).await {
            Ok(category) => Some(category.id),
            Err(e) => {
                warn!(symbol, error = %e, "default category unavailable");
                None
            }
        };

        let upsert = SymbolUpsert {
            symbol: symbol.to_string(),
            category_id,
            ..Default::default()
        };
        if let Err(e) = self.store.upsert_symbol_snapshot(&upsert).await {
            warn!(symbol, error = %e, "symbol row creation failed, admission deferred");
            return false;
        }

        self.meta.insert(
            symbol.to_string(),
            SymbolMeta {
                category_id,
                category_name: category_id.map(|_| DEFAULT_CATEGORY.to_string()),
                company_name: None,
            },
        );
        self.known.insert(symbol.to_string());
        self.spawn_classification(symbol);
        true
    }

    fn spawn_classification(&self, symbol: &str) {
        let Some(classifier) = self.classifier.clone() else {
            return;
        };
        let meta = Arc::clone(&self.meta);
        let symbol = symbol.to_string();
        tokio::spawn(async move {
            Self::reclassify(&classifier, &meta, &symbol).await;
        });
    }

    async fn reclassify(
        classifier: &SymbolClassifier,
        meta: &DashMap<String, SymbolMeta>,
        symbol: &str,
    ) {
        match classifier.classify(symbol).await {
            Ok(classification) => {
                meta.insert(
                    symbol.to_string(),
                    SymbolMeta {
                        category_id: Some(classification.category_id),
                        category_name: Some(classification.category_name),
                        company_name: classification.company_name,
                    },
                );
                debug!(symbol, "symbol classified");
            }
            Err(e) => {
                debug!(symbol, error = %e, "classification failed");
            }
        }
    }
}
