use crate::domain::model::{ProgressEntry, ProgressKind, Stage, StepState};
use crate::utils::error::{ReconError, Result};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::Level;

/// 某一時刻的階段狀態與進度紀錄
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrackerSnapshot {
    pub states: [StepState; 3],
    pub log: Vec<ProgressEntry>,
}

impl TrackerSnapshot {
    pub fn state(&self, stage: Stage) -> StepState {
        self.states[stage.index()]
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(|entry| entry.text.as_str())
    }
}

#[derive(Debug, Default)]
struct TrackerInner {
    states: [StepState; 3],
    log: Vec<ProgressEntry>,
}

impl TrackerInner {
    fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot {
            states: self.states,
            log: self.log.clone(),
        }
    }
}

/// 追蹤每個階段的狀態，並保存只能追加的進度紀錄。
///
/// 所有修改都經過內部 mutex，因此 Stage1 與 Stage2 並行時仍能保持順序。
/// 每次修改後都會透過 watch channel 發布新的快照給觀察者。
pub struct StepTracker {
    inner: Mutex<TrackerInner>,
    updates: watch::Sender<TrackerSnapshot>,
}

impl StepTracker {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(TrackerSnapshot::default());
        Self {
            inner: Mutex::new(TrackerInner::default()),
            updates,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.updates.subscribe()
    }

    /// 新的一次執行：所有階段回到 Pending，紀錄清空
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = TrackerInner::default();
        self.publish(&inner);
    }

    pub fn begin(&self, stage: Stage) -> Result<()> {
        self.transition(stage, StepState::Running, "begin")
    }

    pub fn succeed(&self, stage: Stage) -> Result<()> {
        self.transition(stage, StepState::Succeeded, "succeed")
    }

    pub fn fail(&self, stage: Stage) -> Result<()> {
        self.transition(stage, StepState::Failed, "fail")
    }

    pub fn log(&self, kind: ProgressKind, message: &str) {
        let entry = ProgressEntry::new(kind, message);
        match kind.log_level() {
            Some(Level::ERROR) => tracing::error!("{}", entry.text),
            Some(Level::WARN) => tracing::warn!("{}", entry.text),
            Some(_) => tracing::info!("{}", entry.text),
            None => {}
        }
        self.push(entry);
    }

    pub fn blank_line(&self) {
        self.push(ProgressEntry::blank());
    }

    pub fn state(&self, stage: Stage) -> StepState {
        self.lock().states[stage.index()]
    }

    pub fn snapshot(&self) -> TrackerSnapshot {
        self.lock().snapshot()
    }

    fn push(&self, entry: ProgressEntry) {
        let mut inner = self.lock();
        inner.log.push(entry);
        self.publish(&inner);
    }

    fn transition(&self, stage: Stage, next: StepState, action: &'static str) -> Result<()> {
        let mut inner = self.lock();
        let current = inner.states[stage.index()];

        let allowed = match next {
            StepState::Running => current == StepState::Pending,
            StepState::Succeeded | StepState::Failed => current == StepState::Running,
            StepState::Pending => false,
        };
        if !allowed {
            return Err(ReconError::StepTransition {
                stage,
                from: current,
                action,
            });
        }

        tracing::debug!("{}: {} -> {}", stage, current, next);
        inner.states[stage.index()] = next;
        self.publish(&inner);
        Ok(())
    }

    fn publish(&self, inner: &TrackerInner) {
        self.updates.send_replace(inner.snapshot());
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for StepTracker {
    fn default() -> Self {
        Self::new()
    }
}
