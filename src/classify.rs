//! Company profile lookup and sector classification.
//!
//! Providers report free-form industry strings ("Semiconductors", "Banks -
//! Regional"). The classifier normalizes them into a small set of canonical
//! categories by substring matching, falling back to the title-cased raw
//! string for industries the table does not know, and to the default
//! category when no profile is available at all. Fetched profiles are cached
//! with a TTL so repeated classifications stay cheap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::config::ClassificationConfig;
use crate::db::{StoreError, SymbolStore, SymbolUpsert};
use crate::providers::{CompanyProfile, QuoteProvider};
use uuid::Uuid;

/// Category assigned when no profile or industry is available.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Substring keyword to canonical category. Checked in order against the
/// lowercased industry string; first hit wins.
const CATEGORY_KEYWORDS: &[(&str, &str)] = &[
    ("software", "Technology"),
    ("semiconductor", "Technology"),
    ("internet", "Technology"),
    ("computer", "Technology"),
    ("electronics", "Technology"),
    ("technology", "Technology"),
    ("bank", "Financial Services"),
    ("insurance", "Financial Services"),
    ("asset management", "Financial Services"),
    ("capital market", "Financial Services"),
    ("financial", "Financial Services"),
    ("pharmaceutical", "Healthcare"),
    ("biotechnology", "Healthcare"),
    ("medical", "Healthcare"),
    ("health", "Healthcare"),
    ("oil", "Energy"),
    ("gas", "Energy"),
    ("solar", "Energy"),
    ("energy", "Energy"),
    ("retail", "Consumer"),
    ("apparel", "Consumer"),
    ("restaurant", "Consumer"),
    ("beverage", "Consumer"),
    ("food", "Consumer"),
    ("consumer", "Consumer"),
    ("airline", "Industrials"),
    ("aerospace", "Industrials"),
    ("defense", "Industrials"),
    ("machinery", "Industrials"),
    ("auto", "Industrials"),
    ("industrial", "Industrials"),
    ("telecom", "Communication Services"),
    ("media", "Communication Services"),
    ("entertainment", "Communication Services"),
    ("broadcasting", "Communication Services"),
    ("real estate", "Real Estate"),
    ("reit", "Real Estate"),
    ("mining", "Materials"),
    ("chemical", "Materials"),
    ("metals", "Materials"),
    ("paper", "Materials"),
    ("utilit", "Utilities"),
    ("electric", "Utilities"),
    ("water", "Utilities"),
];

/// Result of classifying one symbol.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Company name from the profile, when available.
    pub company_name: Option<String>,
    /// Listing exchange from the profile, when available.
    pub exchange: Option<String>,
    /// Persisted category id.
    pub category_id: Uuid,
    /// Canonical category name.
    pub category_name: String,
}

struct CachedProfile {
    profile: Option<CompanyProfile>,
    fetched_at: Instant,
}

/// Classifies symbols into categories and persists the result.
pub struct SymbolClassifier {
    providers: Vec<Arc<dyn QuoteProvider>>,
    store: Arc<dyn SymbolStore>,
    profiles: DashMap<String, CachedProfile>,
    ttl: Duration,
}

impl SymbolClassifier {
    /// Creates a classifier over the profile-capable provider chain.
    #[must_use]
    pub fn new(
        providers: Vec<Arc<dyn QuoteProvider>>,
        store: Arc<dyn SymbolStore>,
        config: &ClassificationConfig,
    ) -> Self {
        Self {
            providers,
            store,
            profiles: DashMap::new(),
            ttl: Duration::from_secs(config.profile_cache_hours * 3600),
        }
    }

    /// Classifies `symbol` and persists company name, exchange and category
    /// onto its row. Negative profile lookups are cached too, so symbols
    /// nobody can profile land in the default category without repeated
    /// upstream calls.
    ///
    /// # Errors
    /// Returns an error when the store rejects the category or symbol write.
    pub async fn classify(&self, symbol: &str) -> Result<Classification, StoreError> {
        let profile = self.profile(symbol).await;

        let category_name = profile
            .as_ref()
            .and_then(|p| p.industry.as_deref().or(p.sector.as_deref()))
            .map_or_else(|| DEFAULT_CATEGORY.to_string(), categorize_industry);

        let category = self.store.find_or_create_category(&category_name).await?;
        self.store
            .upsert_symbol_snapshot(&SymbolUpsert {
                symbol: symbol.to_string(),
                company_name: profile.as_ref().and_then(|p| p.name.clone()),
                exchange: profile.as_ref().and_then(|p| p.exchange.clone()),
                category_id: Some(category.id),
                ..Default::default()
            })
            .await?;

        Ok(Classification {
            company_name: profile.as_ref().and_then(|p| p.name.clone()),
            exchange: profile.and_then(|p| p.exchange),
            category_id: category.id,
            category_name,
        })
    }

    async fn profile(&self, symbol: &str) -> Option<CompanyProfile> {
        if let Some(entry) = self.profiles.get(symbol)
            && entry.fetched_at.elapsed() < self.ttl
        {
            return entry.profile.clone();
        }

        let mut profile = None;
        for provider in &self.providers {
            match provider.fetch_company_profile(symbol).await {
                Ok(Some(found)) => {
                    profile = Some(found);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(
                        provider = provider.name(),
                        symbol,
                        error = %e,
                        "profile fetch failed"
                    );
                }
            }
        }

        self.profiles.insert(
            symbol.to_string(),
            CachedProfile {
                profile: profile.clone(),
                fetched_at: Instant::now(),
            },
        );
        profile
    }
}

/// Maps a raw industry string to its canonical category, title-casing
/// industries the keyword table does not cover.
#[must_use]
pub fn categorize_industry(industry: &str) -> String {
    let lowered = industry.to_lowercase();
    for (keyword, category) in CATEGORY_KEYWORDS {
        if lowered.contains(keyword) {
            return (*category).to_string();
        }
    }
    title_case(industry)
}

fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::providers::{ProviderError, ProviderQuote};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_categorize_known_industries() {
        assert_eq!(categorize_industry("Software - Infrastructure"), "Technology");
        assert_eq!(categorize_industry("Semiconductors"), "Technology");
        assert_eq!(categorize_industry("Banks - Regional"), "Financial Services");
        assert_eq!(categorize_industry("Biotechnology"), "Healthcare");
        assert_eq!(categorize_industry("Oil & Gas Midstream"), "Energy");
        assert_eq!(categorize_industry("Specialty Retail"), "Consumer");
        assert_eq!(categorize_industry("Aerospace & Defense"), "Industrials");
        assert_eq!(categorize_industry("Telecom Services"), "Communication Services");
        assert_eq!(categorize_industry("REIT - Residential"), "Real Estate");
        assert_eq!(categorize_industry("Specialty Chemicals"), "Materials");
        assert_eq!(categorize_industry("Utilities - Regulated"), "Utilities");
    }

    #[test]
    fn test_categorize_is_case_insensitive() {
        assert_eq!(categorize_industry("SOFTWARE"), "Technology");
        assert_eq!(categorize_industry("regional banks"), "Financial Services");
    }

    #[test]
    fn test_unmatched_industry_is_title_cased() {
        assert_eq!(categorize_industry("shell companies"), "Shell Companies");
        assert_eq!(categorize_industry("CONGLOMERATES"), "Conglomerates");
    }

    struct ProfileStub {
        profile: Option<CompanyProfile>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuoteProvider for ProfileStub {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn fetch_quote(
            &self,
            _symbol: &str,
        ) -> Result<Option<ProviderQuote>, ProviderError> {
            Ok(None)
        }

        async fn fetch_company_profile(
            &self,
            _symbol: &str,
        ) -> Result<Option<CompanyProfile>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.profile.clone())
        }
    }

    fn apple_profile() -> CompanyProfile {
        CompanyProfile {
            name: Some("Apple Inc".to_string()),
            country: Some("US".to_string()),
            sector: None,
            industry: Some("Consumer Electronics".to_string()),
            exchange: Some("NASDAQ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_classify_persists_category_and_metadata() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ProfileStub {
            profile: Some(apple_profile()),
            calls: AtomicUsize::new(0),
        });
        let classifier = SymbolClassifier::new(
            vec![provider],
            store.clone(),
            &ClassificationConfig::default(),
        );

        let classification = classifier.classify("AAPL").await.expect("classify");
        assert_eq!(classification.category_name, "Technology");
        assert_eq!(classification.company_name.as_deref(), Some("Apple Inc"));

        let record = store
            .find_symbol("AAPL")
            .await
            .expect("query")
            .expect("row");
        assert_eq!(record.category_id, Some(classification.category_id));
        assert_eq!(record.exchange.as_deref(), Some("NASDAQ"));
    }

    #[tokio::test]
    async fn test_classify_without_profile_uses_default_category() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ProfileStub {
            profile: None,
            calls: AtomicUsize::new(0),
        });
        let classifier = SymbolClassifier::new(
            vec![provider],
            store.clone(),
            &ClassificationConfig::default(),
        );

        let classification = classifier.classify("ZZZZ").await.expect("classify");
        assert_eq!(classification.category_name, DEFAULT_CATEGORY);
        assert_eq!(classification.company_name, None);
    }

    #[tokio::test]
    async fn test_profile_cache_avoids_refetch() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ProfileStub {
            profile: Some(apple_profile()),
            calls: AtomicUsize::new(0),
        });
        let classifier = SymbolClassifier::new(
            vec![provider.clone()],
            store,
            &ClassificationConfig::default(),
        );

        classifier.classify("AAPL").await.expect("first");
        classifier.classify("AAPL").await.expect("second");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_negative_profile_lookup_is_cached() {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(ProfileStub {
            profile: None,
            calls: AtomicUsize::new(0),
        });
        let classifier = SymbolClassifier::new(
            vec![provider.clone()],
            store,
            &ClassificationConfig::default(),
        );

        classifier.classify("ZZZZ").await.expect("first");
        classifier.classify("ZZZZ").await.expect("second");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
