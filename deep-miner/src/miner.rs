//! Orchestration of a mining session.
//!
//! [`DeepMiner::run`] loads the records of one domain and runs four phases
//! in order: census, cross-tabulation, subgroups and temporal stability.
//! Every finding is persisted as soon as its phase finishes.
//!
//! Failure handling:
//!
//! - configuration errors are returned before any session row exists
//! - a record store, session write or cancellation failure marks the
//!   session failed and is returned to the caller
//! - a failing finding write is logged and counted; the phase continues
//! - a phase that fails internally is recorded in the report and the next
//!   phase still runs
//!
//! Pair evaluation is CPU-bound and runs on the blocking pool, split into
//! `worker_threads` contiguous chunks so results keep their enumeration
//! order.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use crate::analyzers::{
    candidate_pairs, census_entry, compute_cross_tab, compute_subgroup_analysis,
    compute_temporal_stability, locate_date_field, record_dates, subgroup_pairs,
    temporal_candidates, CrossTabulation, ExtractedVariable, Finding, SubgroupAnalysis,
    InsufficientData, TemporalStabilityAnalysis, VariableCensusEntry, VariableExtractor,
    DATE_FIELD_CANDIDATES,
};
use crate::config::MinerConfig;
use crate::error::{MinerError, Result};
use crate::record::Record;
use crate::repository::{RecordStore, ResultSink, SinkRow};
use crate::session::{
    CancellationFlag, DeepMinerSession, Phase, PhaseError, PhaseOutcome, SessionFindings,
    SessionReport,
};
use crate::stats::format_percent;
use crate::{log_detail, log_pair, log_sink_op};

/// Type alias for progress callback function.
///
/// Called after each phase with the phase and the completed fraction.
pub type ProgressCallback = Arc<dyn Fn(Phase, f64) + Send + Sync>;

/// Results of one batch of pair evaluations
struct PairBatch<T> {
    results: Vec<T>,
    evaluated: usize,
    insufficient: usize,
    stopped_early: bool,
    cancelled: bool,
}

impl<T> PairBatch<T> {
    fn empty() -> Self {
        Self {
            results: Vec::new(),
            evaluated: 0,
            insufficient: 0,
            stopped_early: false,
            cancelled: false,
        }
    }

    fn merge(&mut self, other: PairBatch<T>) {
        self.results.extend(other.results);
        self.evaluated += other.evaluated;
        self.insufficient += other.insufficient;
        self.stopped_early |= other.stopped_early;
        self.cancelled |= other.cancelled;
    }

    fn outcome(&self, phase: Phase) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::new(phase);
        outcome.evaluated = self.evaluated;
        outcome.computed = self.results.len();
        outcome.insufficient = self.insufficient;
        outcome.stopped_early = self.stopped_early;
        outcome
    }
}

/// Accumulates phase outcomes while a session runs
struct RunLedger {
    phases: Vec<PhaseOutcome>,
    phase_errors: Vec<PhaseError>,
}

impl RunLedger {
    /// Folds a phase result into the session, isolating non-fatal failures.
    fn settle<T>(
        &mut self,
        session: &mut DeepMinerSession,
        phase: Phase,
        result: Result<(PhaseOutcome, T)>,
    ) -> Result<Option<T>> {
        match result {
            Ok((outcome, rows)) => {
                session.stats.absorb(&outcome);
                session.truncated |= outcome.stopped_early;
                self.phases.push(outcome);
                Ok(Some(rows))
            }
            Err(MinerError::Cancelled) => Err(MinerError::Cancelled),
            Err(err) => {
                error!(phase = %phase, error = %err, "Phase failed; continuing with next phase");
                self.phase_errors.push(PhaseError {
                    phase,
                    message: err.to_string(),
                });
                Ok(None)
            }
        }
    }
}

/// Exploratory mining engine for one domain.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use deep_miner::prelude::*;
///
/// # async fn example() -> deep_miner::error::Result<()> {
/// let store = Arc::new(JsonFileRecordStore::new("exports/ufo.jsonl"));
/// let sink = Arc::new(InMemoryResultSink::new());
/// let config = MinerConfig::for_domain(Domain::Ufo).with_worker_threads(0);
///
/// let report = DeepMiner::new(store, sink, config)
///     .on_progress(|phase, done| println!("{phase}: {:.0}%", done * 100.0))
///     .run()
///     .await?;
/// println!("{}", report.session.summary.unwrap_or_default());
/// # Ok(())
/// # }
/// ```
pub struct DeepMiner {
    store: Arc<dyn RecordStore>,
    sink: Arc<dyn ResultSink>,
    config: MinerConfig,
    cancellation: CancellationFlag,
    on_progress: Option<ProgressCallback>,
}

impl DeepMiner {
    pub fn new(
        store: Arc<dyn RecordStore>,
        sink: Arc<dyn ResultSink>,
        config: MinerConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config,
            cancellation: CancellationFlag::new(),
            on_progress: None,
        }
    }

    /// Uses a caller-owned cancellation flag.
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.cancellation = flag;
        self
    }

    /// Sets a progress callback.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(Phase, f64) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// Flag that cancels this engine's sessions.
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Runs one session to completion.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any session row is written.
    /// Record store failures, session write failures and cancellation
    /// mark the session failed and are returned.
    #[instrument(
        skip(self),
        fields(domain = %self.config.domain, store = self.store.backend_name())
    )]
    pub async fn run(&self) -> Result<SessionReport> {
        self.config.validate()?;

        let mut session = DeepMinerSession::new(self.config.domain);
        session.start()?;
        self.sink.create_session(&session).await?;
        info!(session_id = %session.id, "Started deep mining session");

        let deadline = self.config.time_budget.map(|budget| Instant::now() + budget);
        let mut ledger = RunLedger {
            phases: Vec::new(),
            phase_errors: Vec::new(),
        };

        let findings = match self.execute(&mut session, &mut ledger, deadline).await {
            Ok(findings) => findings,
            Err(err) => return Err(self.abort(session, err).await),
        };

        let summary = build_summary(&session, &ledger.phase_errors, &self.config);
        session.complete(summary)?;
        if let Err(err) = self.sink.update_session(&session).await {
            error!(session_id = %session.id, error = %err, "Failed to record session completion");
            return Err(err);
        }

        info!(
            session_id = %session.id,
            records = session.stats.records_analyzed,
            variables = session.stats.variables_found,
            cross_tabs = session.stats.cross_tabs_computed,
            significant = session.stats.significant_associations,
            subgroups = session.stats.subgroups_analyzed,
            temporal = session.stats.temporal_analyses,
            truncated = session.truncated,
            "Completed deep mining session"
        );

        Ok(SessionReport {
            session,
            phases: ledger.phases,
            phase_errors: ledger.phase_errors,
            findings,
        })
    }

    async fn execute(
        &self,
        session: &mut DeepMinerSession,
        ledger: &mut RunLedger,
        deadline: Option<Instant>,
    ) -> Result<SessionFindings> {
        let records = self
            .store
            .load(self.config.domain, self.config.record_limit)
            .await?;
        session.stats.records_analyzed = records.len();
        info!(records = records.len(), "Loaded records");

        let mut findings = SessionFindings::default();

        self.check_cancelled()?;
        let (outcome, census, variables) = self.census_phase(session, &records).await;
        findings.census = census;
        ledger.settle(session, Phase::Census, Ok((outcome, ())))?;
        self.report_progress(Phase::Census);
        let variables = Arc::new(variables);

        self.check_cancelled()?;
        let result = self.cross_tab_phase(session, &variables, deadline).await;
        if let Some(rows) = ledger.settle(session, Phase::CrossTabulation, result)? {
            findings.cross_tabs = rows;
        }
        self.report_progress(Phase::CrossTabulation);

        self.check_cancelled()?;
        let result = self.subgroup_phase(session, &variables, deadline).await;
        if let Some(rows) = ledger.settle(session, Phase::Subgroups, result)? {
            findings.subgroups = rows;
        }
        self.report_progress(Phase::Subgroups);

        self.check_cancelled()?;
        let result = self
            .temporal_phase(session, &records, &variables, deadline)
            .await;
        if let Some((rows, date_field)) = ledger.settle(session, Phase::Temporal, result)? {
            findings.temporal = rows;
            findings.date_field = date_field;
        }
        self.report_progress(Phase::Temporal);

        Ok(findings)
    }

    /// Marks the session failed and hands back the cause.
    async fn abort(&self, mut session: DeepMinerSession, cause: MinerError) -> MinerError {
        error!(session_id = %session.id, error = %cause, "Deep mining session failed");
        if let Err(err) = session.fail(cause.to_string()) {
            return err;
        }
        if let Err(err) = self.sink.update_session(&session).await {
            error!(session_id = %session.id, error = %err, "Failed to record session failure");
        }
        cause
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancellation.is_cancelled() {
            Err(MinerError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report_progress(&self, phase: Phase) {
        if let Some(ref callback) = self.on_progress {
            let position = Phase::ALL.iter().position(|p| *p == phase).unwrap_or(0) + 1;
            callback(phase, position as f64 / Phase::ALL.len() as f64);
        }
    }

    fn record_write(&self, outcome: &mut PhaseOutcome, operation: &str, written: Result<()>) {
        match written {
            Ok(()) => {
                outcome.persisted += 1;
                log_sink_op!(self.config.logging, operation, "Persisted row");
            }
            Err(err) => {
                outcome.write_failures += 1;
                warn!(operation, error = %err, "Failed to persist finding; skipping");
            }
        }
    }

    #[instrument(skip_all, fields(phase = "census"))]
    async fn census_phase(
        &self,
        session: &DeepMinerSession,
        records: &[Record],
    ) -> (PhaseOutcome, Vec<VariableCensusEntry>, Vec<ExtractedVariable>) {
        let started = Instant::now();
        let extraction = VariableExtractor::new(&self.config).extract(records);
        let census: Vec<VariableCensusEntry> =
            extraction.variables.iter().map(census_entry).collect();

        let mut outcome = PhaseOutcome::new(Phase::Census);
        outcome.evaluated = census.len()
            + extraction.free_text_paths.len()
            + extraction.sparse_paths.len()
            + extraction.dropped_by_cap;
        outcome.computed = census.len();
        outcome.insufficient = extraction.sparse_paths.len();

        for entry in &census {
            let row = SinkRow::new(&session.id, session.domain, entry.clone());
            let written = self.sink.save_census_entry(row).await;
            self.record_write(&mut outcome, "save_census_entry", written);
        }
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            variables = outcome.computed,
            free_text = extraction.free_text_paths.len(),
            sparse = extraction.sparse_paths.len(),
            "Census complete"
        );
        (outcome, census, extraction.variables)
    }

    #[instrument(skip_all, fields(phase = "cross_tabulation"))]
    async fn cross_tab_phase(
        &self,
        session: &DeepMinerSession,
        variables: &Arc<Vec<ExtractedVariable>>,
        deadline: Option<Instant>,
    ) -> Result<(PhaseOutcome, Vec<CrossTabulation>)> {
        let started = Instant::now();
        let pairs = candidate_pairs(variables, self.config.max_cross_tabs);
        log_detail!(self.config.logging, pairs = pairs.len(), "Enumerated cross-tabulation pairs");

        let threshold = self.config.significance_threshold;
        let batch = self
            .evaluate_pairs(Phase::CrossTabulation, pairs, variables, deadline, move |a, b| {
                compute_cross_tab(a, b, threshold)
            })
            .await?;

        let mut outcome = batch.outcome(Phase::CrossTabulation);
        outcome.significant = batch.results.iter().filter(|c| c.is_significant).count();
        for cross_tab in &batch.results {
            let row = SinkRow::new(&session.id, session.domain, cross_tab.clone());
            let written = self.sink.save_cross_tab(row).await;
            self.record_write(&mut outcome, "save_cross_tab", written);
        }
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            evaluated = outcome.evaluated,
            computed = outcome.computed,
            significant = outcome.significant,
            stopped_early = outcome.stopped_early,
            "Cross-tabulation complete"
        );
        Ok((outcome, batch.results))
    }

    #[instrument(skip_all, fields(phase = "subgroups"))]
    async fn subgroup_phase(
        &self,
        session: &DeepMinerSession,
        variables: &Arc<Vec<ExtractedVariable>>,
        deadline: Option<Instant>,
    ) -> Result<(PhaseOutcome, Vec<SubgroupAnalysis>)> {
        let started = Instant::now();
        let pairs = subgroup_pairs(
            variables,
            self.config.max_group_cardinality,
            self.config.max_subgroup_analyses,
        );
        log_detail!(self.config.logging, pairs = pairs.len(), "Enumerated subgroup pairs");

        let min_sample = self.config.min_sample_for_subgroup;
        let batch = self
            .evaluate_pairs(Phase::Subgroups, pairs, variables, deadline, move |g, t| {
                compute_subgroup_analysis(g, t, min_sample)
            })
            .await?;

        let mut outcome = batch.outcome(Phase::Subgroups);
        for analysis in &batch.results {
            let row = SinkRow::new(&session.id, session.domain, analysis.clone());
            let written = self.sink.save_subgroup_analysis(row).await;
            self.record_write(&mut outcome, "save_subgroup_analysis", written);
        }
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            evaluated = outcome.evaluated,
            computed = outcome.computed,
            stopped_early = outcome.stopped_early,
            "Subgroup analysis complete"
        );
        Ok((outcome, batch.results))
    }

    #[instrument(skip_all, fields(phase = "temporal"))]
    async fn temporal_phase(
        &self,
        session: &DeepMinerSession,
        records: &[Record],
        variables: &Arc<Vec<ExtractedVariable>>,
        deadline: Option<Instant>,
    ) -> Result<(PhaseOutcome, (Vec<TemporalStabilityAnalysis>, Option<String>))> {
        let started = Instant::now();
        let mut outcome = PhaseOutcome::new(Phase::Temporal);

        let date_field = match locate_date_field(records, &DATE_FIELD_CANDIDATES)
            .ok_or(InsufficientData::NoDateField)
        {
            Ok(field) => field,
            Err(reason) => {
                info!(reason = %reason, "Skipping temporal analysis");
                return Ok((outcome, (Vec::new(), None)));
            }
        };
        let dates = record_dates(records, &date_field);
        let candidates =
            temporal_candidates(variables, &date_field, self.config.max_temporal_variables);
        log_detail!(
            self.config.logging,
            date_field = %date_field,
            candidates = candidates.len(),
            "Located date field"
        );

        let mut results = Vec::new();
        for index in candidates {
            self.check_cancelled()?;
            if deadline.is_some_and(|d| Instant::now() >= d) {
                outcome.stopped_early = true;
                break;
            }
            outcome.evaluated += 1;
            let variable = &variables[index];
            match compute_temporal_stability(
                variable,
                &dates,
                &date_field,
                self.config.temporal_periods,
            ) {
                Ok(analysis) => {
                    log_pair!(
                        self.config.logging,
                        variable = %self.config.logging.clip(&variable.path),
                        trend = %analysis.trend,
                        interpretation = %self.config.logging.clip(&analysis.interpretation),
                        "Computed temporal stability"
                    );
                    results.push(analysis);
                }
                Err(reason) => {
                    log_pair!(
                        self.config.logging,
                        variable = %self.config.logging.clip(&variable.path),
                        reason = %reason,
                        "No temporal finding"
                    );
                    outcome.insufficient += 1;
                }
            }
        }

        outcome.computed = results.len();
        for analysis in &results {
            let row = SinkRow::new(&session.id, session.domain, analysis.clone());
            let written = self.sink.save_temporal_analysis(row).await;
            self.record_write(&mut outcome, "save_temporal_analysis", written);
        }
        outcome.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            date_field = %date_field,
            evaluated = outcome.evaluated,
            computed = outcome.computed,
            "Temporal analysis complete"
        );
        Ok((outcome, (results, Some(date_field))))
    }

    /// Evaluates `pairs` on the blocking pool in contiguous chunks.
    ///
    /// Results come back in pair order. Every worker checks the
    /// cancellation flag and the deadline before each pair.
    async fn evaluate_pairs<T, F>(
        &self,
        phase: Phase,
        pairs: Vec<(usize, usize)>,
        variables: &Arc<Vec<ExtractedVariable>>,
        deadline: Option<Instant>,
        evaluate: F,
    ) -> Result<PairBatch<T>>
    where
        T: Send + 'static,
        F: Fn(&ExtractedVariable, &ExtractedVariable) -> Finding<T> + Send + Sync + 'static,
    {
        if pairs.is_empty() {
            return Ok(PairBatch::empty());
        }

        let workers = self.config.effective_workers().clamp(1, pairs.len());
        let chunk_size = (pairs.len() + workers - 1) / workers;
        let evaluate = Arc::new(evaluate);
        log_detail!(
            self.config.logging,
            phase = %phase,
            workers,
            chunk_size,
            "Dispatching pair evaluation"
        );

        let mut handles = Vec::with_capacity(workers);
        for chunk in pairs.chunks(chunk_size) {
            let chunk = chunk.to_vec();
            let variables = Arc::clone(variables);
            let evaluate = Arc::clone(&evaluate);
            let cancellation = self.cancellation.clone();
            let logging = self.config.logging.clone();

            handles.push(tokio::task::spawn_blocking(move || {
                let mut batch = PairBatch::empty();
                for (i, j) in chunk {
                    if cancellation.is_cancelled() {
                        batch.cancelled = true;
                        break;
                    }
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        batch.stopped_early = true;
                        break;
                    }
                    batch.evaluated += 1;
                    let (left, right) = (&variables[i], &variables[j]);
                    match evaluate(left, right) {
                        Ok(result) => {
                            log_pair!(
                                logging,
                                phase = %phase,
                                left = %logging.clip(&left.path),
                                right = %logging.clip(&right.path),
                                "Computed finding"
                            );
                            batch.results.push(result);
                        }
                        Err(reason) => {
                            log_pair!(
                                logging,
                                phase = %phase,
                                left = %logging.clip(&left.path),
                                right = %logging.clip(&right.path),
                                reason = %reason,
                                "No finding"
                            );
                            batch.insufficient += 1;
                        }
                    }
                }
                batch
            }));
        }

        let mut merged = PairBatch::empty();
        for handle in handles {
            let batch = handle
                .await
                .map_err(|e| MinerError::Internal(format!("{phase} worker failed: {e}")))?;
            merged.merge(batch);
        }

        if merged.cancelled {
            return Err(MinerError::Cancelled);
        }
        Ok(merged)
    }
}

fn build_summary(
    session: &DeepMinerSession,
    phase_errors: &[PhaseError],
    config: &MinerConfig,
) -> String {
    let stats = &session.stats;
    let mut summary = format!(
        "Analyzed {} {} records: {} variables, {} cross-tabulations ({} significant at p < {}), \
         {} subgroup analyses, {} temporal stability analyses.",
        stats.records_analyzed,
        session.domain.label(),
        stats.variables_found,
        stats.cross_tabs_computed,
        stats.significant_associations,
        config.significance_threshold,
        stats.subgroups_analyzed,
        stats.temporal_analyses,
    );
    if stats.cross_tabs_computed > 0 {
        let rate = stats.significant_associations as f64 / stats.cross_tabs_computed as f64;
        summary.push_str(&format!(
            " {} of tested pairs were significant.",
            format_percent(rate)
        ));
    }
    if session.truncated {
        summary.push_str(" Stopped early: time budget exhausted.");
    }
    if stats.write_failures > 0 {
        summary.push_str(&format!(
            " {} rows failed to persist.",
            stats.write_failures
        ));
    }
    if !phase_errors.is_empty() {
        let failed: Vec<&str> = phase_errors.iter().map(|e| e.phase.as_str()).collect();
        summary.push_str(&format!(" Failed phases: {}.", failed.join(", ")));
    }
    summary
}
