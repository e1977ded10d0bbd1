use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{info, warn};

use warden_core::proto::BackupSettings;

use crate::error::BackupError;
use crate::pipeline::BackupPipeline;
use crate::schedule;
use crate::settings::SettingsStore;

/// Owns the one recurring backup job. Either disabled or armed with a
/// concrete next fire time; reconfiguration cancels-then-rearms under a
/// single lock so a concurrent fire can never observe the swap half-done.
pub struct BackupScheduler {
    pipeline: Arc<BackupPipeline>,
    store: SettingsStore,
    inner: Arc<Mutex<SchedulerState>>,
}

struct SchedulerState {
    settings: BackupSettings,
    job: Option<ArmedJob>,
}

struct ArmedJob {
    next_fire: DateTime<Local>,
    task: JoinHandle<()>,
}

impl BackupScheduler {
    pub fn new(pipeline: Arc<BackupPipeline>, store: SettingsStore) -> Self {
        let settings = store.load().unwrap_or_default();
        Self {
            pipeline,
            store,
            inner: Arc::new(Mutex::new(SchedulerState {
                settings,
                job: None,
            })),
        }
    }

    /// Arm from the stored settings at process start. No persist: nothing
    /// was mutated.
    pub async fn start(&self) {
        let mut state = self.inner.lock().await;
        let settings = state.settings.clone();
        if !settings.enabled {
            info!("scheduled backups disabled");
            return;
        }
        match schedule::next_fire(settings.interval, settings.time, Local::now()) {
            Some(at) => {
                info!("scheduled backups armed ({}), next at {at}", settings.interval);
                state.job = Some(self.spawn_job(settings, at));
            }
            None => warn!("could not arm scheduled backups: no computable fire time"),
        }
    }

    /// Replace the schedule. Persists first; cancels the old job and arms
    /// the new one only once the new settings are durable. On any failure
    /// the previous schedule stays in effect untouched.
    pub async fn configure(
        &self,
        new: BackupSettings,
    ) -> Result<Option<DateTime<Local>>, BackupError> {
        new.validate()
            .map_err(|err| BackupError::InvalidSettings(err.to_string()))?;

        let mut state = self.inner.lock().await;

        let next = if new.enabled {
            let at = schedule::next_fire(new.interval, new.time, Local::now())
                .ok_or(BackupError::ScheduleCompute)?;
            Some(at)
        } else {
            None
        };

        self.store.save(&new)?;

        if let Some(job) = state.job.take() {
            job.task.abort();
        }
        if let Some(at) = next {
            info!("schedule reconfigured ({}), next at {at}", new.interval);
            state.job = Some(self.spawn_job(new.clone(), at));
        } else {
            info!("scheduled backups disabled");
        }
        state.settings = new;
        Ok(next)
    }

    /// In-memory stop for process exit. Settings on disk are untouched.
    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        if let Some(job) = state.job.take() {
            job.task.abort();
            info!("scheduled backups disarmed");
        }
    }

    pub async fn status(&self) -> (BackupSettings, Option<DateTime<Local>>) {
        let state = self.inner.lock().await;
        (
            state.settings.clone(),
            state.job.as_ref().map(|job| job.next_fire),
        )
    }

    pub async fn settings(&self) -> BackupSettings {
        self.inner.lock().await.settings.clone()
    }

    fn spawn_job(&self, settings: BackupSettings, first_fire: DateTime<Local>) -> ArmedJob {
        let pipeline = Arc::clone(&self.pipeline);
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(run_job(pipeline, inner, settings, first_fire));
        ArmedJob {
            next_fire: first_fire,
            task,
        }
    }
}

/// The armed job: sleep until the deadline, fire the pipeline exactly once,
/// re-arm. A failed run is logged and never disarms the schedule.
async fn run_job(
    pipeline: Arc<BackupPipeline>,
    inner: Arc<Mutex<SchedulerState>>,
    settings: BackupSettings,
    first_fire: DateTime<Local>,
) {
    let mut fire_at = first_fire;
    loop {
        let wait = (fire_at - Local::now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        sleep(wait).await;

        info!("scheduled backup firing");
        let outcome = pipeline.run(&settings).await;
        if outcome.success {
            info!("scheduled backup finished: {}", outcome.message);
        } else {
            warn!("scheduled backup failed: {}", outcome.message);
        }

        fire_at = loop {
            match schedule::next_fire(settings.interval, settings.time, Local::now()) {
                Some(next) => break next,
                None => {
                    warn!("could not compute next fire time, retrying in 60s");
                    sleep(Duration::from_secs(60)).await;
                }
            }
        };
        let mut state = inner.lock().await;
        if let Some(job) = state.job.as_mut() {
            job.next_fire = fire_at;
        }
    }
}
