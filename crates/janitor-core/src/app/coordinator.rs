//! Job coordinator: lifecycle of the single recurring cleanup job.
//!
//! All state transitions (external calls and timer fires alike) serialize
//! through one mutex, and the mutex is never held across a run. A generation
//! counter invalidates timers armed before a reconfiguration: a fired timer
//! whose generation no longer matches is a no-op.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::app::executor::RetentionExecutor;
use crate::app::schedule;
use crate::app::status::CoordinatorStatus;
use crate::domain::{
    CleanupReport, CoordinatorState, JanitorError, RunId, ScheduleSpec,
};
use crate::ports::{Clock, ReportSink};

/// The single live recurring job. Owned exclusively by the coordinator.
#[derive(Debug)]
struct JobHandle {
    state: CoordinatorState,
    spec: Option<ScheduleSpec>,

    /// Bumped on every start/reconfigure/stop; stale timer fires check it
    /// and bail.
    generation: u64,

    next_deadline: Option<DateTime<Utc>>,
    timer: Option<JoinHandle<()>>,
}

impl JobHandle {
    fn new() -> Self {
        Self {
            state: CoordinatorState::Idle,
            spec: None,
            generation: 0,
            next_deadline: None,
            timer: None,
        }
    }

    /// Bump the generation and disarm any pending timer.
    ///
    /// A timer task that already passed its sleep only ever aborts here
    /// while it waits for the handle lock: once it transitions to Running it
    /// has cleared `self.timer`, so an in-flight run is never cancelled.
    fn invalidate_timer(&mut self) {
        self.generation += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.next_deadline = None;
    }
}

struct Shared {
    handle: Mutex<JobHandle>,
    executor: RetentionExecutor,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn ReportSink>,
}

impl Shared {
    /// Arm a timer task for `deadline`, tagged with `generation`.
    fn arm_timer(self: &Arc<Self>, deadline: DateTime<Utc>, generation: u64) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            // A deadline already behind the clock fires immediately.
            let sleep_for = (deadline - shared.clock.now()).to_std().unwrap_or_default();
            tokio::time::sleep(sleep_for).await;
            shared.timer_fired(generation).await;
        })
    }

    /// Timer callback, generation-checked.
    async fn timer_fired(self: &Arc<Self>, generation: u64) {
        let retention_days = {
            let mut handle = self.handle.lock().await;
            if handle.generation != generation
                || handle.state != CoordinatorState::Scheduled
            {
                tracing::debug!(
                    generation,
                    current = handle.generation,
                    "stale timer fire ignored"
                );
                return;
            }
            let Some(spec) = handle.spec.as_ref() else {
                // Scheduled without a spec cannot happen; park rather than
                // panic in a background task.
                handle.state = CoordinatorState::Idle;
                return;
            };
            let days = spec.retention_days;
            handle.state = CoordinatorState::Running;
            handle.next_deadline = None;
            handle.timer = None;
            days
        };

        // Lock released: reconfigure/stop stay callable while the run is in
        // flight. Run failures never halt the schedule.
        let _ = self.execute_and_report(retention_days).await;

        // Reschedule from the *current* spec; it may have been replaced
        // while the run was in flight.
        let mut handle = self.handle.lock().await;
        if handle.state != CoordinatorState::Running {
            // stop() parked us mid-run; nothing more to schedule.
            return;
        }
        match handle.spec.clone().filter(|spec| spec.enabled) {
            None => {
                handle.state = CoordinatorState::Idle;
                tracing::info!("schedule disabled during run, going idle");
            }
            Some(spec) => match schedule::next_deadline(&spec, self.clock.now()) {
                Ok(deadline) => {
                    let generation = handle.generation;
                    handle.state = CoordinatorState::Scheduled;
                    handle.next_deadline = Some(deadline);
                    handle.timer = Some(self.arm_timer(deadline, generation));
                    tracing::debug!(%deadline, "next cleanup scheduled");
                }
                Err(e) => {
                    // The spec was validated before it got here; if it still
                    // fails, parking beats a hot rearm loop.
                    tracing::error!(error = %e, "failed to reschedule, going idle");
                    handle.state = CoordinatorState::Idle;
                }
            },
        }
    }

    /// Run the executor and deliver the outcome to the sink, failed runs
    /// included.
    async fn execute_and_report(
        &self,
        retention_days: u32,
    ) -> Result<CleanupReport, JanitorError> {
        let started_at = self.clock.now();
        match self.executor.run_once(retention_days).await {
            Ok(report) => {
                self.sink.deliver(report.clone()).await;
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "cleanup run failed");
                self.sink
                    .deliver(CleanupReport::aborted(
                        RunId::new(),
                        started_at,
                        self.clock.now(),
                    ))
                    .await;
                Err(e)
            }
        }
    }
}

/// Owns the lifecycle of at most one active recurring cleanup job.
pub struct JobCoordinator {
    shared: Arc<Shared>,
}

impl JobCoordinator {
    pub fn new(
        executor: RetentionExecutor,
        clock: Arc<dyn Clock>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                handle: Mutex::new(JobHandle::new()),
                executor,
                clock,
                sink,
            }),
        }
    }

    /// Start the recurring job. Valid only from `Idle`.
    ///
    /// A disabled spec is accepted and leaves the coordinator idle.
    pub async fn start(&self, spec: ScheduleSpec) -> Result<(), JanitorError> {
        spec.validate()?;

        let mut handle = self.shared.handle.lock().await;
        if !handle.state.is_idle() {
            return Err(JanitorError::NotIdle);
        }
        if !spec.enabled {
            handle.spec = Some(spec);
            tracing::info!("cleanup schedule disabled, staying idle");
            return Ok(());
        }

        let deadline = schedule::next_deadline(&spec, self.shared.clock.now())?;
        handle.generation += 1;
        let generation = handle.generation;
        handle.spec = Some(spec);
        handle.state = CoordinatorState::Scheduled;
        handle.next_deadline = Some(deadline);
        handle.timer = Some(self.shared.arm_timer(deadline, generation));
        tracing::info!(%deadline, generation, "cleanup schedule armed");
        Ok(())
    }

    /// Replace the spec. Valid from any state.
    ///
    /// The generation bump makes any pending timer fire a no-op. An
    /// in-flight run is never interrupted: while `Running`, only the spec is
    /// replaced and the completion path schedules the next run from it.
    pub async fn reconfigure(&self, spec: ScheduleSpec) -> Result<(), JanitorError> {
        spec.validate()?;

        let mut handle = self.shared.handle.lock().await;
        handle.invalidate_timer();

        if !spec.enabled {
            if handle.state != CoordinatorState::Running {
                handle.state = CoordinatorState::Idle;
            }
            handle.spec = Some(spec);
            tracing::info!("cleanup schedule disabled");
            return Ok(());
        }

        if handle.state == CoordinatorState::Running {
            handle.spec = Some(spec);
            tracing::info!("reconfigured mid-run, next run follows the new spec");
            return Ok(());
        }

        let deadline = schedule::next_deadline(&spec, self.shared.clock.now())?;
        let generation = handle.generation;
        handle.spec = Some(spec);
        handle.state = CoordinatorState::Scheduled;
        handle.next_deadline = Some(deadline);
        handle.timer = Some(self.shared.arm_timer(deadline, generation));
        tracing::info!(%deadline, generation, "cleanup schedule reconfigured");
        Ok(())
    }

    /// Cancel any pending timer and go idle, unconditionally.
    ///
    /// An in-flight run finishes but schedules nothing afterwards.
    pub async fn stop(&self) {
        let mut handle = self.shared.handle.lock().await;
        handle.invalidate_timer();
        handle.state = CoordinatorState::Idle;
        tracing::info!("cleanup schedule stopped");
    }

    /// Manual one-shot run.
    ///
    /// Bypasses the schedule state machine entirely; shares the executor and
    /// the sink with scheduled runs.
    pub async fn run_now(&self, retention_days: u32) -> Result<CleanupReport, JanitorError> {
        self.shared.execute_and_report(retention_days).await
    }

    pub async fn status(&self) -> CoordinatorStatus {
        let handle = self.shared.handle.lock().await;
        CoordinatorStatus {
            state: handle.state,
            generation: handle.generation,
            next_deadline: handle.next_deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::app::executor::ExecutorConfig;
    use crate::domain::{AttachmentRef, Interval, RunOutcome, Weekday};
    use crate::impls::{InMemoryAttachmentStore, MemorySink};
    use crate::ports::FixedClock;

    // 2026-08-03 is a Monday.
    fn monday_5am() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 3, 5, 0, 0).unwrap()
    }

    fn daily_spec(start_hour: u8) -> ScheduleSpec {
        ScheduleSpec {
            enabled: true,
            retention_days: 30,
            interval: Interval::Daily,
            start_hour,
            start_weekday: Weekday::Monday,
        }
    }

    struct Fixture {
        coordinator: JobCoordinator,
        store: Arc<InMemoryAttachmentStore>,
        sink: Arc<MemorySink>,
    }

    fn fixture(now: DateTime<Utc>) -> Fixture {
        let store = Arc::new(InMemoryAttachmentStore::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::at(now));
        let sink = Arc::new(MemorySink::new());
        let store_port: Arc<dyn crate::ports::AttachmentStore> = store.clone();
        let sink_port: Arc<dyn ReportSink> = sink.clone();
        let executor = RetentionExecutor::new(
            store_port,
            Arc::clone(&clock),
            ExecutorConfig {
                workers: 2,
                delete_timeout: None,
            },
        );
        let coordinator = JobCoordinator::new(executor, clock, sink_port);
        Fixture {
            coordinator,
            store,
            sink,
        }
    }

    async fn seed_old(store: &InMemoryAttachmentStore, id: &str) {
        store
            .insert(AttachmentRef {
                id: id.to_string(),
                size_bytes: 100,
                created_at: monday_5am() - Duration::days(400),
            })
            .await;
    }

    #[tokio::test]
    async fn disabled_start_stays_idle() {
        let f = fixture(monday_5am());
        let spec = ScheduleSpec {
            enabled: false,
            ..daily_spec(0)
        };

        f.coordinator.start(spec).await.unwrap();

        let status = f.coordinator.status().await;
        assert_eq!(status.state, CoordinatorState::Idle);
        assert!(status.next_deadline.is_none());
    }

    #[tokio::test]
    async fn start_arms_a_strictly_future_deadline() {
        let f = fixture(monday_5am());

        f.coordinator.start(daily_spec(0)).await.unwrap();

        let status = f.coordinator.status().await;
        assert_eq!(status.state, CoordinatorState::Scheduled);
        assert_eq!(
            status.next_deadline,
            Some(Utc.with_ymd_and_hms(2026, 8, 4, 0, 0, 0).unwrap())
        );
        assert!(status.next_deadline.unwrap() > monday_5am());
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let f = fixture(monday_5am());

        f.coordinator.start(daily_spec(0)).await.unwrap();
        let err = f.coordinator.start(daily_spec(6)).await.unwrap_err();

        assert!(matches!(err, JanitorError::NotIdle));
    }

    #[tokio::test]
    async fn invalid_spec_is_rejected_before_arming() {
        let f = fixture(monday_5am());
        let spec = ScheduleSpec {
            start_hour: 24,
            ..daily_spec(0)
        };

        assert!(matches!(
            f.coordinator.start(spec).await,
            Err(JanitorError::InvalidSpec(_))
        ));
        assert_eq!(f.coordinator.status().await.state, CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn reconfigure_twice_keeps_only_the_latest_schedule() {
        let f = fixture(monday_5am());
        f.coordinator.start(daily_spec(0)).await.unwrap();
        let gen_after_start = f.coordinator.status().await.generation;

        f.coordinator.reconfigure(daily_spec(6)).await.unwrap();
        f.coordinator.reconfigure(daily_spec(12)).await.unwrap();

        let status = f.coordinator.status().await;
        assert_eq!(status.state, CoordinatorState::Scheduled);
        assert_eq!(status.generation, gen_after_start + 2);
        assert_eq!(
            status.next_deadline,
            Some(Utc.with_ymd_and_hms(2026, 8, 3, 12, 0, 0).unwrap())
        );

        // A fire from either earlier generation is a ghost: nothing runs.
        f.coordinator.shared.timer_fired(gen_after_start).await;
        f.coordinator.shared.timer_fired(gen_after_start + 1).await;
        assert!(f.sink.reports().await.is_empty());
        assert_eq!(
            f.coordinator.status().await.state,
            CoordinatorState::Scheduled
        );
    }

    #[tokio::test]
    async fn stale_fire_after_stop_is_a_noop() {
        let f = fixture(monday_5am());
        seed_old(&f.store, "att-1").await;

        f.coordinator.start(daily_spec(0)).await.unwrap();
        let armed_generation = f.coordinator.status().await.generation;

        f.coordinator.stop().await;
        f.coordinator.shared.timer_fired(armed_generation).await;

        assert!(f.sink.reports().await.is_empty());
        assert!(f.store.contains("att-1").await);
        assert_eq!(f.coordinator.status().await.state, CoordinatorState::Idle);
    }

    #[tokio::test]
    async fn reconfigure_to_disabled_goes_idle_and_pending_fire_noops() {
        let f = fixture(monday_5am());
        f.coordinator.start(daily_spec(0)).await.unwrap();
        let armed_generation = f.coordinator.status().await.generation;

        let disabled = ScheduleSpec {
            enabled: false,
            ..daily_spec(0)
        };
        f.coordinator.reconfigure(disabled).await.unwrap();

        let status = f.coordinator.status().await;
        assert_eq!(status.state, CoordinatorState::Idle);
        assert!(status.next_deadline.is_none());

        f.coordinator.shared.timer_fired(armed_generation).await;
        assert!(f.sink.reports().await.is_empty());
    }

    #[tokio::test]
    async fn fire_runs_the_executor_and_reschedules() {
        let f = fixture(monday_5am());
        seed_old(&f.store, "att-1").await;
        seed_old(&f.store, "att-2").await;

        f.coordinator.start(daily_spec(0)).await.unwrap();
        let generation = f.coordinator.status().await.generation;

        f.coordinator.shared.timer_fired(generation).await;

        let reports = f.sink.reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, RunOutcome::Completed);
        assert_eq!(reports[0].deleted, 2);
        assert!(!f.store.contains("att-1").await);

        // Back on the schedule, same generation, fresh deadline.
        let status = f.coordinator.status().await;
        assert_eq!(status.state, CoordinatorState::Scheduled);
        assert_eq!(status.generation, generation);
        assert!(status.next_deadline.unwrap() > monday_5am());
    }

    #[tokio::test]
    async fn failed_run_is_reported_and_the_schedule_continues() {
        let f = fixture(monday_5am());
        f.store.fail_listing(true).await;

        f.coordinator.start(daily_spec(0)).await.unwrap();
        let generation = f.coordinator.status().await.generation;

        f.coordinator.shared.timer_fired(generation).await;

        let reports = f.sink.reports().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].outcome, RunOutcome::Aborted);
        assert_eq!(reports[0].attempted, 0);

        // The outage did not kill the schedule.
        assert_eq!(
            f.coordinator.status().await.state,
            CoordinatorState::Scheduled
        );
    }

    #[tokio::test]
    async fn run_now_bypasses_the_schedule_state() {
        let f = fixture(monday_5am());
        seed_old(&f.store, "att-1").await;

        let report = f.coordinator.run_now(30).await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(f.sink.reports().await.len(), 1);
        // Still idle: manual runs do not touch scheduling.
        assert_eq!(f.coordinator.status().await.state, CoordinatorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_on_its_own() {
        let f = fixture(monday_5am());
        seed_old(&f.store, "att-1").await;

        f.coordinator.start(daily_spec(0)).await.unwrap();

        // Paused tokio time: sleeping 24h auto-advances through the timer's
        // 19h deadline (Tuesday 00:00) on the way, and the run drains before
        // time moves again.
        tokio::time::sleep(std::time::Duration::from_secs(24 * 3600)).await;

        assert_eq!(f.sink.reports().await.len(), 1);
        assert!(!f.store.contains("att-1").await);
        assert_eq!(
            f.coordinator.status().await.state,
            CoordinatorState::Scheduled
        );
    }
}
