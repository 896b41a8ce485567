//! Mining sessions: lifecycle, counters and the report handed back to callers.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::analyzers::{
    CrossTabulation, SubgroupAnalysis, TemporalStabilityAnalysis, VariableCensusEntry,
};
use crate::error::{MinerError, Result};
use crate::record::Domain;

/// Lifecycle state of a session.
///
/// `Pending -> Running -> Completed | Failed`. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Pending, SessionStatus::Running)
                | (SessionStatus::Running, SessionStatus::Completed)
                | (SessionStatus::Running, SessionStatus::Failed)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four analysis phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Census,
    CrossTabulation,
    Subgroups,
    Temporal,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Census,
        Phase::CrossTabulation,
        Phase::Subgroups,
        Phase::Temporal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Census => "census",
            Phase::CrossTabulation => "cross_tabulation",
            Phase::Subgroups => "subgroups",
            Phase::Temporal => "temporal",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one phase did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    pub phase: Phase,
    /// Variables, pairs or series examined
    pub evaluated: usize,
    /// Findings produced
    pub computed: usize,
    /// Significant findings (cross-tabulation only)
    pub significant: usize,
    /// Evaluations that ended in insufficient data
    pub insufficient: usize,
    pub persisted: usize,
    pub write_failures: usize,
    /// The time budget ran out before the phase finished
    pub stopped_early: bool,
    pub elapsed_ms: u64,
}

impl PhaseOutcome {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            evaluated: 0,
            computed: 0,
            significant: 0,
            insufficient: 0,
            persisted: 0,
            write_failures: 0,
            stopped_early: false,
            elapsed_ms: 0,
        }
    }
}

/// A phase that failed without ending the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseError {
    pub phase: Phase,
    pub message: String,
}

/// Running totals of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub records_analyzed: usize,
    pub variables_found: usize,
    pub cross_tabs_computed: usize,
    pub significant_associations: usize,
    pub subgroups_analyzed: usize,
    pub temporal_analyses: usize,
    pub write_failures: usize,
}

impl SessionStats {
    /// Folds a phase outcome into the totals.
    pub fn absorb(&mut self, outcome: &PhaseOutcome) {
        match outcome.phase {
            Phase::Census => self.variables_found += outcome.computed,
            Phase::CrossTabulation => {
                self.cross_tabs_computed += outcome.computed;
                self.significant_associations += outcome.significant;
            }
            Phase::Subgroups => self.subgroups_analyzed += outcome.computed,
            Phase::Temporal => self.temporal_analyses += outcome.computed,
        }
        self.write_failures += outcome.write_failures;
    }
}

/// Session row as written to the result sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepMinerSession {
    pub id: String,
    pub domain: Domain,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub stats: SessionStats,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    /// The time budget cut at least one phase short
    pub truncated: bool,
}

impl DeepMinerSession {
    /// Creates a pending session with a fresh id.
    pub fn new(domain: Domain) -> Self {
        let started_at = Utc::now();
        Self {
            id: generate_session_id(domain, started_at),
            domain,
            status: SessionStatus::Pending,
            started_at,
            completed_at: None,
            stats: SessionStats::default(),
            summary: None,
            error_message: None,
            truncated: false,
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.transition(SessionStatus::Running)
    }

    pub fn complete(&mut self, summary: impl Into<String>) -> Result<()> {
        self.transition(SessionStatus::Completed)?;
        self.summary = Some(summary.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<()> {
        self.transition(SessionStatus::Failed)?;
        self.error_message = Some(message.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// Wall-clock time from start to completion, once terminal.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    fn transition(&mut self, to: SessionStatus) -> Result<()> {
        if !self.status.can_transition_to(to) {
            return Err(MinerError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Derives a 32-hex-character session id.
///
/// The digest covers the domain, the start time, the process id and a
/// process-wide sequence number, so two sessions started in the same
/// nanosecond still differ.
pub fn generate_session_id(domain: Domain, started_at: DateTime<Utc>) -> String {
    let sequence = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let mut hasher = Sha256::new();
    hasher.update(domain.as_str().as_bytes());
    hasher.update(
        started_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| started_at.timestamp_micros())
            .to_le_bytes(),
    );
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(sequence.to_le_bytes());
    hex::encode(&hasher.finalize()[..16])
}

/// Shared flag a caller sets to stop a running session.
///
/// The engine checks it between phases and between pair evaluations.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Findings produced by a session, in persistence order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionFindings {
    pub census: Vec<VariableCensusEntry>,
    pub cross_tabs: Vec<CrossTabulation>,
    pub subgroups: Vec<SubgroupAnalysis>,
    pub temporal: Vec<TemporalStabilityAnalysis>,
    /// Date field used for the temporal phase
    pub date_field: Option<String>,
}

/// Everything a completed session returns to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub session: DeepMinerSession,
    pub phases: Vec<PhaseOutcome>,
    pub phase_errors: Vec<PhaseError>,
    pub findings: SessionFindings,
}

impl SessionReport {
    /// Significant cross-tabulations, strongest association first.
    pub fn significant_cross_tabs(&self) -> Vec<&CrossTabulation> {
        let mut significant: Vec<&CrossTabulation> = self
            .findings
            .cross_tabs
            .iter()
            .filter(|c| c.is_significant)
            .collect();
        significant.sort_by(|a, b| b.cramers_v.total_cmp(&a.cramers_v));
        significant
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseOutcome> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}
