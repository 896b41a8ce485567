//! # Deep Miner - exploratory data mining for anomaly-research records
//!
//! Deep Miner takes a collection of loosely structured investigation records
//! (UFO/UAP sightings, near-death experiences, ganzfeld sessions and similar),
//! discovers which fields behave like analyzable variables, and runs a
//! battery of statistical tests over them:
//!
//! - a **variable census** describing every discovered field,
//! - **cross-tabulations** with chi-square and Cramér's V for every pair of
//!   categorical variables,
//! - **subgroup analyses** comparing a target's rate or mean across the
//!   categories of a grouping variable,
//! - **temporal stability** of boolean rates across years, quarters or months.
//!
//! Every finding is persisted through a [`repository::ResultSink`] under a
//! mining session whose lifecycle is tracked in [`session`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use deep_miner::prelude::*;
//!
//! # async fn example() -> deep_miner::Result<()> {
//! let store = Arc::new(JsonFileRecordStore::new("records.jsonl"));
//! let sink = Arc::new(JsonLinesResultSink::create("mining-output").await?);
//! let config = MinerConfig::for_domain(Domain::Ufo)
//!     .with_max_cross_tabs(500)
//!     .with_worker_threads(4);
//!
//! let report = DeepMiner::new(store, sink, config).run().await?;
//! println!("{}", HumanFormatter::new().format(&report)?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Insufficient data
//!
//! Analyzers never fail because a variable is too sparse. They return a
//! [`analyzers::Finding`], whose error side names the reason (too few valid
//! records, a degenerate table, too few qualifying groups). Only
//! infrastructure problems surface as [`MinerError`].
//!
//! ## Logging
//!
//! All components emit `tracing` events. Install a subscriber with
//! [`logging::setup::init_logging`], and tune per-pair verbosity with
//! [`logging::LogConfig`].

pub mod analyzers;
pub mod config;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod miner;
pub mod prelude;
pub mod record;
pub mod repository;
pub mod session;
pub mod stats;

pub use config::{MinerConfig, TemporalPeriod};
pub use error::{MinerError, Result};
pub use miner::DeepMiner;
pub use record::{Domain, Record};
pub use session::{DeepMinerSession, SessionReport, SessionStatus};
