//! Cached catalog operations.
//!
//! Every remote read goes through the expiring cache first. Reads that
//! cannot reach the API fall back to the built-in offline records where the
//! screens would otherwise be empty.

use std::sync::Arc;

use async_trait::async_trait;
use bestiary_core::{
    BestiaryConfig, BestiaryError, BestiaryResult, CreatureDetail, CreatureSummary, FetchError,
    NamedResource, ResourceList,
};
use bestiary_storage::{CacheConfig, CacheOptions, ExpiringCache, RecordFetcher};
use bestiary_tasks::{CancellationToken, MapConfig, ParallelMapper, ProgressSink};
use tracing::{debug, info, warn};

use crate::api_client::RestClient;
use crate::error::ClientError;
use crate::fallback;
use crate::source::CatalogSource;
use crate::view;

/// Cache namespace of the catalog.
pub const CATALOG_NAMESPACE: &str = "poke";

/// Pseudo-types the type index lists but no creature has.
const HIDDEN_TYPES: [&str; 2] = ["unknown", "shadow"];

/// Members read per type before intersecting.
pub const TYPE_MEMBER_CAP: usize = 300;

/// Outcome of a bulk dataset load.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Loaded records, sorted by id.
    pub records: Vec<CreatureDetail>,
    /// Names whose detail could not be loaded, with the reason.
    pub failures: Vec<(String, FetchError)>,
    /// The listing was unreachable and the offline names were used.
    pub fell_back: bool,
    /// Loading stopped early on request.
    pub cancelled: bool,
    /// Names the load set out to fetch.
    pub total: usize,
}

impl Dataset {
    pub fn is_partial(&self) -> bool {
        self.fell_back || self.cancelled || !self.failures.is_empty()
    }

    /// Reject a load that has nothing usable.
    ///
    /// With `strict`, the first failure is an error. A load cancelled before
    /// any record arrived is always one.
    pub fn into_result(mut self, strict: bool) -> BestiaryResult<Self> {
        if strict && !self.failures.is_empty() {
            let (name, err) = self.failures.swap_remove(0);
            warn!(name = %name, "Load stopped at first failure");
            return Err(err.into());
        }
        if self.cancelled && self.records.is_empty() {
            return Err(BestiaryError::Cancelled {
                settled: self.failures.len(),
                total: self.total,
            });
        }
        Ok(self)
    }
}

/// Catalog reads backed by an expiring cache.
pub struct Catalog<S = RestClient> {
    source: S,
    cache: ExpiringCache,
    options: CacheOptions,
    continue_on_error: bool,
}

/// Detail lookups of a source, as seen by the cache.
struct DetailFetcher<'a, S>(&'a S);

#[async_trait]
impl<S: CatalogSource> RecordFetcher<CreatureDetail> for DetailFetcher<'_, S> {
    type Error = FetchError;

    async fn fetch(&self, id: &str) -> Result<CreatureDetail, FetchError> {
        self.0.detail(id).await
    }
}

impl Catalog<RestClient> {
    /// REST source and durable cache as configured.
    pub fn from_config(config: &BestiaryConfig) -> Result<Self, ClientError> {
        let source = RestClient::new(config)?;
        let cache = ExpiringCache::open(CacheConfig::from(&config.cache));
        info!(
            backend = ?cache.backend_kind(),
            namespace = %config.cache.namespace,
            "Catalog cache ready"
        );
        Ok(Self::new(source, cache, &config.cache.namespace)
            .with_continue_on_error(config.fetch.continue_on_error))
    }
}

impl<S: CatalogSource> Catalog<S> {
    pub fn new(source: S, cache: ExpiringCache, namespace: &str) -> Self {
        Self {
            source,
            cache,
            options: CacheOptions::in_namespace(namespace),
            continue_on_error: true,
        }
    }

    /// Whether [`load_dataset`](Self::load_dataset) keeps going past a
    /// failed detail. On by default.
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    pub fn namespace(&self) -> &str {
        self.options
            .namespace
            .as_deref()
            .unwrap_or(CATALOG_NAMESPACE)
    }

    /// One listing page, cached as `list_{limit}_{offset}`.
    pub async fn list_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<ResourceList, FetchError> {
        let key = format!("list_{limit}_{offset}");
        let read = self
            .cache
            .get_or_fetch(&key, &self.options, || self.source.list(limit, offset))
            .await?;
        Ok(read.into_value())
    }

    /// The first `limit` names.
    pub async fn list(&self, limit: usize) -> Result<Vec<NamedResource>, FetchError> {
        Ok(self.list_page(limit, 0).await?.results)
    }

    /// One record by id or name, cached as `detail_{id_or_name}`.
    ///
    /// If the API cannot be reached and an offline record matches, that
    /// record is returned instead (and not cached).
    pub async fn detail(&self, id_or_name: &str) -> Result<CreatureDetail, FetchError> {
        let wanted = id_or_name.trim().to_lowercase();
        let key = format!("detail_{wanted}");

        let fetcher = DetailFetcher(&self.source);

        match self
            .cache
            .read_through::<CreatureDetail, _>(&key, &wanted, &self.options, &fetcher)
            .await
        {
            Ok(read) => Ok(read.into_value()),
            Err(err) => match fallback::offline_detail(&wanted) {
                Some(record) => {
                    warn!(
                        id_or_name = %wanted,
                        error = %err,
                        "Detail fetch failed, using offline record"
                    );
                    Ok(record)
                }
                None => Err(err),
            },
        }
    }

    /// Real type names, without pseudo-types. Falls back to a fixed list.
    pub async fn type_names(&self) -> Vec<String> {
        match self
            .cache
            .get_or_fetch("types", &self.options, || self.source.types())
            .await
        {
            Ok(read) => {
                let names = read.map(|types| {
                    types
                        .into_iter()
                        .map(|t| t.name)
                        .filter(|name| !HIDDEN_TYPES.contains(&name.as_str()))
                        .collect::<Vec<_>>()
                });
                debug!(
                    cached = names.was_cache_hit(),
                    count = names.value().len(),
                    "Type index ready"
                );
                names.into_value()
            }
            Err(err) => {
                warn!(error = %err, "Type index fetch failed, using fallback types");
                fallback::fallback_types()
            }
        }
    }

    /// The first `cap` creatures of a type. Empty if the type cannot be loaded.
    pub async fn summaries_by_type(&self, type_name: &str, cap: usize) -> Vec<CreatureSummary> {
        let type_name = type_name.trim().to_lowercase();
        let key = format!("type_{type_name}");

        match self
            .cache
            .get_or_fetch(&key, &self.options, || self.source.by_type(&type_name))
            .await
        {
            Ok(read) => read
                .value()
                .iter()
                .filter_map(view::summarize)
                .take(cap)
                .collect(),
            Err(err) => {
                warn!(type_name = %type_name, error = %err, "Type listing fetch failed");
                Vec::new()
            }
        }
    }

    /// Creatures having every one of `types`, sorted by id, at most `cap`.
    pub async fn summaries_by_types(&self, types: &[String], cap: usize) -> Vec<CreatureSummary> {
        let mut lists = Vec::with_capacity(types.len());
        for type_name in types {
            lists.push(self.summaries_by_type(type_name, TYPE_MEMBER_CAP).await);
        }
        view::intersect_by_id(&lists, cap)
    }

    /// List `limit` names, then load every detail with bounded concurrency.
    ///
    /// Individual failures are collected rather than aborting the load,
    /// unless continue-on-error was turned off: then the first failure stops
    /// the load and is the only one reported.
    pub async fn load_dataset(
        &self,
        limit: usize,
        concurrency: usize,
        progress: Arc<dyn ProgressSink>,
        cancel: Option<CancellationToken>,
    ) -> Dataset {
        let (names, fell_back) = match self.list(limit).await {
            Ok(names) => (names, false),
            Err(err) => {
                warn!(error = %err, "Listing failed, loading the offline set");
                (fallback::offline_names(), true)
            }
        };
        let names: Vec<String> = names.into_iter().map(|n| n.name).collect();
        debug!(count = names.len(), fell_back, "Loading details");

        let config = MapConfig::new()
            .with_concurrency(concurrency)
            .with_continue_on_error(self.continue_on_error);
        let mut mapper = ParallelMapper::new(config).with_progress_arc(progress);
        if let Some(token) = cancel {
            mapper = mapper.with_cancellation(token);
        }

        let settled = match mapper
            .map(names.clone(), |name, _| async move { self.detail(&name).await })
            .await
        {
            Ok(settled) => settled,
            Err(err) => {
                warn!(error = %err, "Detail load stopped");
                let cancelled = err.is_cancelled();
                let failures = match (err.index(), err.into_source()) {
                    (Some(index), Some(source)) => vec![(names[index].clone(), source)],
                    _ => Vec::new(),
                };
                return Dataset {
                    failures,
                    fell_back,
                    cancelled,
                    total: names.len(),
                    ..Dataset::default()
                };
            }
        };

        let failures = settled
            .failures()
            .map(|(i, err)| (names[i].clone(), err.clone()))
            .collect();
        let cancelled = settled.cancelled;
        let mut records = settled.into_values();
        records.sort_by_key(|r| r.id);

        info!(
            loaded = records.len(),
            total = names.len(),
            cancelled,
            "Dataset loaded"
        );
        Dataset {
            records,
            failures,
            fell_back,
            cancelled,
            total: names.len(),
        }
    }

    /// Drop every cached catalog entry.
    pub fn clear_cache(&self) -> u64 {
        self.cache.clear_namespace(self.namespace())
    }
}
