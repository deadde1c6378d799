//! Wikistat: wiki infobox extraction and checkpointed ingestion
//!
//! This crate walks categories of the Old School RuneScape wiki, pulls the
//! raw markup of every member page and turns each infobox form into a typed,
//! flat record keyed by its in-game id:
//!
//! 1. **Walk** -- Page through each configured category via continuation
//!    tokens, yielding every content title once
//! 2. **Extract** -- Fetch page markup, enumerate its forms and run a
//!    field-pattern table over each form's scoped markup
//! 3. **Filter** -- Drop cosmetic recolours and records with no combat signal
//! 4. **Resolve** -- Turn the image reference into a durable file URL
//! 5. **Checkpoint** -- Persist the whole result set after every accepted
//!    record, and promote it to the final output once every category is done
//!
//! # Key Modules
//!
//! - [`api`] -- Fetch capability and the rate-limited MediaWiki client
//! - [`markup`] -- Template location and parameter parsing with nesting support
//! - [`extract`] -- Field pattern tables and total, typed extraction
//! - [`variants`] -- Form enumeration and per-form markup scoping
//! - [`filter`] -- Cosmetic suffix/keyword and no-signal rejection
//! - [`category`] -- Paginated category walking
//! - [`resource`] -- Image reference to URL resolution
//! - [`profile`] -- Built-in equipment and monster extraction profiles
//! - [`pipeline`] -- The ingestion state machine and run reports
//! - [`checkpoint`] -- Atomic working checkpoint and final promotion
//! - [`models`] -- Core data types (AttributeRecord, CanonicalRecord, ResultSet)
//! - [`stats`] -- Atomic run counters
//! - [`config`] -- Defaults and runtime knobs
//!
//! # Example Usage
//!
//! ```bash
//! # Full equipment run
//! wikistat -v run --profile equipment -o items.json --report rejects.json
//!
//! # One category, first 50 pages
//! wikistat run --profile monsters -o monsters.json --category "Category:Bosses" --limit 50
//!
//! # What would this page produce?
//! wikistat inspect --profile equipment "Dragon defender"
//! ```

pub mod api;
pub mod category;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod extract;
pub mod filter;
pub mod markup;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod resource;
pub mod stats;
pub mod variants;
