//! Import session progress tracking.
//!
//! A [`ProgressTracker`] carries the live counters for one session:
//! phase, processed/successful/failed/skipped counts, throughput, and an
//! ETA once throughput is established. Observers receive throttled
//! snapshots; terminal snapshots are always delivered. When the session
//! ends the tracker freezes into an [`ImportSummary`].
//!
//! The [`ProgressRegistry`] indexes live trackers by session id so a
//! caller holding only the id (a UI polling loop, a cancel request) can
//! reach the tracker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::RecordIssue;

/// Minimum interval between observer notifications.
const DEFAULT_EMIT_INTERVAL: Duration = Duration::from_millis(100);
/// Message groups retained in the frozen summary.
const SUMMARY_GROUP_LIMIT: usize = 10;
/// Record indices retained per message group.
const GROUP_INDEX_LIMIT: usize = 10;

/// Import session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Preparing,
    Parsing,
    Validating,
    Importing,
    Completed,
    Failed,
    Cancelled,
}

impl ImportStatus {
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Parsing => "parsing",
            Self::Validating => "validating",
            Self::Importing => "importing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a session handed to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub session_id: Uuid,
    pub status: ImportStatus,
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
    /// Records per second over the whole session so far.
    pub throughput_rps: f64,
    /// Estimated seconds remaining; `None` until throughput is known.
    pub eta_seconds: Option<f64>,
}

/// Issue messages grouped for the summary, with sample record indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageGroup {
    pub message: String,
    pub count: usize,
    /// Up to ten affected record indices, in first-seen order.
    pub indices: Vec<usize>,
}

/// Frozen end-of-session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub session_id: Uuid,
    pub status: ImportStatus,
    pub total: usize,
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub average_rps: f64,
    /// successful / processed, 1.0 for an empty session.
    pub success_rate: f64,
    pub error_groups: Vec<MessageGroup>,
    pub warning_groups: Vec<MessageGroup>,
}

type Observer = Box<dyn Fn(&ProgressSnapshot) + Send + Sync>;

struct TrackerState {
    status: ImportStatus,
    total: usize,
    processed: usize,
    successful: usize,
    failed: usize,
    skipped: usize,
    errors: Vec<RecordIssue>,
    warnings: Vec<RecordIssue>,
    observers: Vec<Observer>,
    last_emit: Option<Instant>,
}

/// Live progress state for one import session.
pub struct ProgressTracker {
    session_id: Uuid,
    started: Instant,
    cancelled: AtomicBool,
    emit_interval: Duration,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    pub fn new(session_id: Uuid) -> Self {
        Self::with_emit_interval(session_id, DEFAULT_EMIT_INTERVAL)
    }

    pub fn with_emit_interval(session_id: Uuid, emit_interval: Duration) -> Self {
        Self {
            session_id,
            started: Instant::now(),
            cancelled: AtomicBool::new(false),
            emit_interval,
            state: Mutex::new(TrackerState {
                status: ImportStatus::Preparing,
                total: 0,
                processed: 0,
                successful: 0,
                failed: 0,
                skipped: 0,
                errors: Vec::new(),
                warnings: Vec::new(),
                observers: Vec::new(),
                last_emit: None,
            }),
        }
    }

    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Request cooperative cancellation; the pipeline checks this at
    /// chunk boundaries.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Shared cancel flag, for stage helpers that poll it themselves.
    pub(crate) fn cancel_flag(&self) -> &AtomicBool {
        &self.cancelled
    }

    pub async fn subscribe(&self, observer: impl Fn(&ProgressSnapshot) + Send + Sync + 'static) {
        let mut state = self.state.lock().await;
        state.observers.push(Box::new(observer));
    }

    pub async fn set_total(&self, total: usize) {
        let mut state = self.state.lock().await;
        state.total = total;
        self.emit(&mut state, false);
    }

    /// Enter a new phase. Phase changes always notify observers.
    pub async fn set_status(&self, status: ImportStatus) {
        let mut state = self.state.lock().await;
        state.status = status;
        self.emit(&mut state, true);
    }

    pub async fn record_success(&self, count: usize) {
        let mut state = self.state.lock().await;
        state.processed += count;
        state.successful += count;
        self.emit(&mut state, false);
    }

    pub async fn record_skip(&self, count: usize) {
        let mut state = self.state.lock().await;
        state.processed += count;
        state.skipped += count;
        self.emit(&mut state, false);
    }

    pub async fn record_failure(&self, issue: RecordIssue) {
        let mut state = self.state.lock().await;
        state.processed += 1;
        state.failed += 1;
        state.errors.push(issue);
        self.emit(&mut state, false);
    }

    pub async fn record_warning(&self, issue: RecordIssue) {
        let mut state = self.state.lock().await;
        state.warnings.push(issue);
    }

    pub async fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock().await;
        self.snapshot_locked(&state)
    }

    /// Freeze the session into its final summary. The terminal snapshot
    /// is delivered to every observer regardless of throttling.
    pub async fn finish(&self, status: ImportStatus) -> ImportSummary {
        let mut state = self.state.lock().await;
        state.status = status;
        self.emit(&mut state, true);

        let duration = self.started.elapsed();
        let duration_secs = duration.as_secs_f64();
        let average_rps = if duration_secs > 0.0 {
            state.processed as f64 / duration_secs
        } else {
            0.0
        };
        let success_rate = if state.processed > 0 {
            state.successful as f64 / state.processed as f64
        } else {
            1.0
        };

        ImportSummary {
            session_id: self.session_id,
            status,
            total: state.total,
            processed: state.processed,
            successful: state.successful,
            failed: state.failed,
            skipped: state.skipped,
            duration_ms: duration.as_millis() as u64,
            average_rps,
            success_rate,
            error_groups: group_messages(&state.errors),
            warning_groups: group_messages(&state.warnings),
        }
    }

    fn snapshot_locked(&self, state: &TrackerState) -> ProgressSnapshot {
        let elapsed = self.started.elapsed();
        let elapsed_secs = elapsed.as_secs_f64();
        let throughput_rps = if elapsed_secs > 0.0 {
            state.processed as f64 / elapsed_secs
        } else {
            0.0
        };
        let remaining = state.total.saturating_sub(state.processed);
        let eta_seconds = if throughput_rps > 0.0 && state.total > 0 {
            Some(remaining as f64 / throughput_rps)
        } else {
            None
        };

        ProgressSnapshot {
            session_id: self.session_id,
            status: state.status,
            total: state.total,
            processed: state.processed,
            successful: state.successful,
            failed: state.failed,
            skipped: state.skipped,
            elapsed_ms: elapsed.as_millis() as u64,
            throughput_rps,
            eta_seconds,
        }
    }

    fn emit(&self, state: &mut TrackerState, force: bool) {
        if state.observers.is_empty() {
            return;
        }
        let now = Instant::now();
        let due = match state.last_emit {
            Some(last) => now.duration_since(last) >= self.emit_interval,
            None => true,
        };
        if !force && !due && !state.status.is_terminal() {
            return;
        }
        state.last_emit = Some(now);
        let snapshot = self.snapshot_locked(state);
        for observer in &state.observers {
            observer(&snapshot);
        }
    }
}

/// Group issues by message, keeping first-seen order of groups, capped at
/// the ten most frequent, with up to ten sample indices each.
fn group_messages(issues: &[RecordIssue]) -> Vec<MessageGroup> {
    let mut groups: Vec<MessageGroup> = Vec::new();
    for issue in issues {
        match groups.iter_mut().find(|group| group.message == issue.message) {
            Some(group) => {
                group.count += 1;
                if let Some(index) = issue.index {
                    if group.indices.len() < GROUP_INDEX_LIMIT {
                        group.indices.push(index);
                    }
                }
            }
            None => groups.push(MessageGroup {
                message: issue.message.clone(),
                count: 1,
                indices: issue.index.into_iter().collect(),
            }),
        }
    }
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(SUMMARY_GROUP_LIMIT);
    groups
}

/// Index of live trackers keyed by session id.
#[derive(Default)]
pub struct ProgressRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<ProgressTracker>>>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, tracker: Arc<ProgressTracker>) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(tracker.session_id(), tracker);
    }

    pub async fn get(&self, session_id: Uuid) -> Option<Arc<ProgressTracker>> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).cloned()
    }

    pub async fn remove(&self, session_id: Uuid) -> Option<Arc<ProgressTracker>> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&session_id)
    }

    pub async fn active_sessions(&self) -> Vec<Uuid> {
        let sessions = self.sessions.read().await;
        sessions.keys().copied().collect()
    }
}
