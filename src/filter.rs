//! Cosmetic/Triviality Filter. Pure function of title and record.

use crate::models::AttributeRecord;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::fmt;

/// Title suffixes of recolours, kits and game-mode copies. Matched against
/// the lowercased title; entries are lowercased on load.
pub const COSMETIC_SUFFIXES: &[&str] = &[
    "(g)",
    "(t)",
    "(or)",
    "(sk)",
    "(b)",
    "(cr)",
    "(u)",
    "(guthix)",
    "(saradomin)",
    "(zamorak)",
    "(armadyl)",
    "(bandos)",
    "(ancient)",
    "(amlodd)",
    "(cadarn)",
    "(crwys)",
    "(hefin)",
    "(iorwerth)",
    "(ithell)",
    "(meilyr)",
    "(trahaearn)",
    "(h1)",
    "(h2)",
    "(h3)",
    "(h4)",
    "(h5)",
    "(last man standing)",
    "(deadman mode)",
];

pub const COSMETIC_KEYWORDS: &[&str] = &[" ornament kit"];

/// Why a candidate was filtered out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FilterReason {
    CosmeticSuffix(String),
    CosmeticKeyword(String),
    NoSignal,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterReason::CosmeticSuffix(s) => write!(f, "cosmetic suffix {}", s),
            FilterReason::CosmeticKeyword(k) => write!(f, "cosmetic keyword '{}'", k.trim()),
            FilterReason::NoSignal => f.write_str("no combat signal"),
        }
    }
}

/// Filter policy for one entity type.
#[derive(Debug, Clone)]
pub struct CosmeticPolicy {
    suffixes: Vec<String>,
    keywords: Vec<String>,
    excluded_fields: FxHashSet<String>,
}

impl CosmeticPolicy {
    /// `excluded_fields` are left out of the no-signal sum (identity, image
    /// reference and descriptive numbers such as speed or range).
    pub fn new<S: AsRef<str>>(suffixes: &[S], keywords: &[S], excluded_fields: &[S]) -> Self {
        let lower = |items: &[S]| -> Vec<String> {
            let mut out: Vec<String> = Vec::with_capacity(items.len());
            for item in items {
                let item = item.as_ref().to_lowercase();
                if !out.contains(&item) {
                    out.push(item);
                }
            }
            out
        };
        Self {
            suffixes: lower(suffixes),
            keywords: lower(keywords),
            excluded_fields: excluded_fields
                .iter()
                .map(|f| f.as_ref().to_string())
                .collect(),
        }
    }

    pub fn with_default_tables<S: AsRef<str>>(excluded_fields: &[S]) -> Self {
        let excluded: Vec<&str> = excluded_fields.iter().map(|s| s.as_ref()).collect();
        Self::new(COSMETIC_SUFFIXES, COSMETIC_KEYWORDS, &excluded)
    }

    /// Title-only checks, usable before any page fetch.
    pub fn check_title(&self, title: &str) -> Option<FilterReason> {
        let lower = title.trim().to_lowercase();
        if let Some(suffix) = self.suffixes.iter().find(|s| lower.ends_with(s.as_str())) {
            return Some(FilterReason::CosmeticSuffix(suffix.clone()));
        }
        self.keywords
            .iter()
            .find(|k| lower.contains(k.as_str()))
            .map(|k| FilterReason::CosmeticKeyword(k.clone()))
    }

    pub fn evaluate(&self, title: &str, record: &AttributeRecord) -> Option<FilterReason> {
        if let Some(reason) = self.check_title(title) {
            return Some(reason);
        }
        if self.signal(record) == 0.0 {
            return Some(FilterReason::NoSignal);
        }
        None
    }

    pub fn accept(&self, title: &str, record: &AttributeRecord) -> bool {
        self.evaluate(title, record).is_none()
    }

    /// Sum of the numeric fields not excluded by the policy.
    fn signal(&self, record: &AttributeRecord) -> f64 {
        record
            .iter()
            .filter(|(name, _)| !self.excluded_fields.contains(*name))
            .filter_map(|(_, value)| value.as_number())
            .sum()
    }
}
