//! Checkpointed Ingestion Pipeline.
//!
//! Categories are walked one after another and each title is taken through
//! fetch, extraction, variant scoping, filtering and image resolution. Every
//! accepted record is upserted into the result set and the whole set is
//! written to the working checkpoint before the next page is touched, so an
//! interrupted run loses at most the page in flight. Only after every
//! category has been walked is the checkpoint promoted to the final output.
//!
//! Nothing page-scoped is fatal: fetch failures, malformed responses and
//! filtered records all become [`Rejection`]s. The only error that stops a
//! run is a failed checkpoint write.

use crate::api::{self, PageMarkup, WikiApi};
use crate::category::CategoryWalker;
use crate::checkpoint::{CheckpointManager, CheckpointStore};
use crate::config::PipelineConfig;
use crate::error::ApiError;
use crate::extract::extract;
use crate::filter::FilterReason;
use crate::markup;
use crate::models::{CanonicalRecord, ResultSet, Upsert, VariantKey};
use crate::profile::{EntityProfile, ProfileKind};
use crate::resource;
use crate::stats::{RunStats, StatsSnapshot};
use crate::variants::scope_markup;
use anyhow::Result;
use indicatif::ProgressBar;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    FetchError(String),
    MalformedResponse(String),
    Disambiguation,
    Filtered(FilterReason),
    MissingIdentity,
    MissingResource,
}

impl RejectReason {
    /// Stable reason code for logs and reports.
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::FetchError(_) => "fetch_error",
            RejectReason::MalformedResponse(_) => "malformed_response",
            RejectReason::Disambiguation => "disambiguation",
            RejectReason::Filtered(FilterReason::CosmeticSuffix(_)) => "cosmetic_suffix",
            RejectReason::Filtered(FilterReason::CosmeticKeyword(_)) => "cosmetic_keyword",
            RejectReason::Filtered(FilterReason::NoSignal) => "no_signal",
            RejectReason::MissingIdentity => "missing_identity",
            RejectReason::MissingResource => "missing_resource",
        }
    }
}

impl From<ApiError> for RejectReason {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::Transport(_) => RejectReason::FetchError(e.to_string()),
            ApiError::Malformed(_) | ApiError::Remote { .. } => {
                RejectReason::MalformedResponse(e.to_string())
            }
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::FetchError(detail) | RejectReason::MalformedResponse(detail) => {
                write!(f, "{}: {}", self.code(), detail)
            }
            RejectReason::Filtered(reason) => write!(f, "{}: {}", self.code(), reason),
            _ => f.write_str(self.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub title: String,
    pub variant: String,
    pub code: &'static str,
    #[serde(flatten)]
    pub reason: RejectReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalkFailure {
    pub category: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub completed: bool,
    pub records: usize,
    pub rejections: Vec<Rejection>,
    pub walk_failures: Vec<WalkFailure>,
    pub stats: StatsSnapshot,
}

impl RunReport {
    pub fn rejections_with<'r>(&'r self, code: &'r str) -> impl Iterator<Item = &'r Rejection> + 'r {
        self.rejections.iter().filter(move |r| r.code == code)
    }
}

/// Result of taking one variant of a fetched page through the pipeline.
pub type VariantOutcome = (VariantKey, Result<CanonicalRecord, RejectReason>);

/// Fetches `title` and evaluates every variant it declares. Fetch failures
/// are returned as the page-level error.
pub fn evaluate_page<A: WikiApi + ?Sized>(
    api: &A,
    profile: &EntityProfile,
    title: &str,
    stats: &RunStats,
) -> Result<Vec<VariantOutcome>, RejectReason> {
    if let Some(reason) = profile.policy.check_title(title) {
        return Err(RejectReason::Filtered(reason));
    }

    let page = api::fetch_wikitext(api, title).inspect_err(|_| stats.inc_fetch_errors())?;
    stats.inc_pages_fetched();

    let wikitext = markup::strip_comments(&page.wikitext);
    if markup::is_disambiguation(&wikitext) {
        return Err(RejectReason::Disambiguation);
    }

    if profile.variants.is_truncated(&wikitext) {
        warn!(
            title = %page.title,
            bound = profile.variants.max_variants(),
            "Page has more variants than the configured bound"
        );
        stats.inc_truncated();
    }

    let page = PageMarkup {
        title: page.title,
        wikitext,
    };
    Ok(profile
        .variants
        .resolve(&page.wikitext)
        .into_iter()
        .map(|key| {
            let outcome = evaluate_variant(api, profile, &page, &key, stats);
            (key, outcome)
        })
        .collect())
}

fn evaluate_variant<A: WikiApi + ?Sized>(
    api: &A,
    profile: &EntityProfile,
    page: &PageMarkup,
    key: &VariantKey,
    stats: &RunStats,
) -> Result<CanonicalRecord, RejectReason> {
    let scoped = scope_markup(&page.wikitext, key);
    let mut record = extract(&scoped, &profile.fields);

    if let Some(reason) = profile.policy.evaluate(&page.title, &record) {
        return Err(RejectReason::Filtered(reason));
    }

    let id = record.integer(profile.identity_field);
    if id <= 0 {
        return Err(RejectReason::MissingIdentity);
    }

    let image = record.text(profile.image_field).to_string();
    let resource_url = match resource::resolve(api, Some(&image)) {
        Ok(Some(url)) => url,
        Ok(None) => return Err(RejectReason::MissingResource),
        Err(e) => {
            stats.inc_fetch_errors();
            return Err(e.into());
        }
    };
    stats.inc_images();

    record.remove(profile.identity_field);
    record.remove(profile.image_field);

    Ok(CanonicalRecord {
        name: key.display_name(&page.title),
        id: id as u64,
        resource_url,
        stats: record,
    })
}

/// Owns the result set and the checkpoint for one run.
pub struct Pipeline<'a, A: WikiApi + ?Sized, S: CheckpointStore> {
    api: &'a A,
    profile: &'a EntityProfile,
    store: S,
    results: ResultSet,
    stats: RunStats,
    limit: Option<u64>,
}

impl<'a, A: WikiApi + ?Sized, S: CheckpointStore> Pipeline<'a, A, S> {
    pub fn new(api: &'a A, profile: &'a EntityProfile, store: S) -> Self {
        Self {
            api,
            profile,
            store,
            results: ResultSet::new(),
            stats: RunStats::new(),
            limit: None,
        }
    }

    /// Starts from previously accepted records instead of an empty set.
    pub fn with_results(mut self, results: ResultSet) -> Self {
        self.results = results;
        self
    }

    /// Stops after `limit` pages. A limited run never promotes its checkpoint.
    pub fn with_limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    pub fn results(&self) -> &ResultSet {
        &self.results
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn into_results(self) -> ResultSet {
        self.results
    }

    pub fn run(&mut self) -> Result<RunReport> {
        let (api, profile) = (self.api, self.profile);
        let mut report = RunReport::default();
        let mut processed: FxHashSet<String> = FxHashSet::default();
        let pb = ProgressBar::new_spinner();
        let mut stopped = false;

        // The working checkpoint always reflects this run, even before the
        // first acceptance.
        self.store.write(&self.results)?;
        self.stats.inc_checkpoint_writes();

        'categories: for category in &profile.categories {
            info!(category = %category, "Walking category");
            let walker = CategoryWalker::new(api, category).with_sentinels(&profile.sentinels);

            for item in walker {
                let title = match item {
                    Ok(title) => title,
                    Err(e) => {
                        self.stats.inc_walk_errors();
                        report.walk_failures.push(WalkFailure {
                            category: category.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                };

                if !processed.insert(title.clone()) {
                    debug!(title = %title, "Already processed in this run");
                    continue;
                }

                if self.limit.is_some_and(|limit| self.stats.pages_seen() >= limit) {
                    info!(limit = ?self.limit, "Page limit reached, stopping");
                    stopped = true;
                    break 'categories;
                }

                self.stats.inc_pages_seen();
                pb.set_message(title.clone());
                pb.tick();
                self.process_title(&title, &mut report)?;
            }
        }

        pb.finish_and_clear();

        report.completed = !stopped && report.walk_failures.is_empty();
        if report.completed {
            self.store.promote(&self.results)?;
        } else {
            warn!(
                stopped,
                walk_failures = report.walk_failures.len(),
                "Run incomplete, checkpoint left in place"
            );
        }

        report.records = self.results.len();
        report.stats = self.stats.snapshot();
        Ok(report)
    }

    fn process_title(&mut self, title: &str, report: &mut RunReport) -> Result<()> {
        let outcomes = match evaluate_page(self.api, self.profile, title, &self.stats) {
            Ok(outcomes) => outcomes,
            Err(reason) => {
                self.reject(title, &VariantKey::base(), reason, report);
                return Ok(());
            }
        };

        for (key, outcome) in outcomes {
            match outcome {
                Ok(record) => self.accept(record)?,
                Err(reason) => self.reject(title, &key, reason, report),
            }
        }
        Ok(())
    }

    /// Upserts and persists before returning; a storage failure is fatal.
    fn accept(&mut self, record: CanonicalRecord) -> Result<()> {
        let (name, id) = (record.name.clone(), record.id);
        match self.results.upsert(record) {
            Upsert::Unchanged => {
                self.stats.inc_unchanged();
                debug!(name = %name, id, "Record unchanged");
            }
            change => {
                let replaced = change == Upsert::Replaced;
                self.stats.inc_accepted();
                self.store.write(&self.results)?;
                self.stats.inc_checkpoint_writes();
                info!(name = %name, id, replaced, "Accepted");
            }
        }
        Ok(())
    }

    fn reject(&self, title: &str, key: &VariantKey, reason: RejectReason, report: &mut RunReport) {
        self.stats.inc_rejected();
        match &reason {
            RejectReason::FetchError(_) | RejectReason::MalformedResponse(_) => {
                warn!(title = %title, variant = %key, reason = reason.code(), detail = %reason, "Rejected");
            }
            _ => {
                info!(title = %title, variant = %key, reason = reason.code(), "Rejected");
            }
        }
        report.rejections.push(Rejection {
            title: title.to_string(),
            variant: key.label.clone(),
            code: reason.code(),
            reason,
        });
    }
}

/// Builds the profile, opens the file-backed checkpoint next to
/// `config.output` and runs to completion or the page limit.
pub fn run_pipeline<A: WikiApi + ?Sized>(
    api: &A,
    kind: ProfileKind,
    config: &PipelineConfig,
) -> Result<RunReport> {
    let profile = EntityProfile::for_kind(kind)?
        .with_max_variants(config.max_variants)?
        .with_categories(config.categories.clone());

    let store = CheckpointManager::new(&config.output);
    let seed = if config.resume {
        match store.load()? {
            Some(results) => {
                info!(records = results.len(), "Resuming from checkpoint");
                results
            }
            None => {
                info!("No valid checkpoint found, starting fresh");
                ResultSet::new()
            }
        }
    } else {
        ResultSet::new()
    };

    info!(
        profile = profile.name,
        categories = profile.categories.len(),
        output = ?config.output,
        "Starting ingestion"
    );
    Pipeline::new(api, &profile, store)
        .with_results(seed)
        .with_limit(config.limit)
        .run()
}
