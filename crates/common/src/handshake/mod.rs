//! Timed two-party handshake
//!
//! Once at least two sessions are live, the [`HandshakeCoordinator`] captures the
//! first two (in join order) and drives a [`HandshakeRun`] through three
//! broadcast steps:
//!
//! 1. `GenerateKeys`: announce both public keys
//! 2. `ExchangeKeys`: announce the same pairing again as the exchange
//! 3. `DeriveSecret`: compute and announce the shared secret
//!
//! Steps are paced by [`HandshakeConfig`] delays on the tokio clock, which tests
//! pause and advance instead of waiting in real time. Only one run is ever in
//! flight; population changes during a run are ignored, and a participant
//! disconnecting does not cancel it.

mod run;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::events::OutboundEvent;
use crate::hub::EventSink;
use crate::session::Session;

pub use run::{HandshakeRun, HandshakeStep};

/// Delay between a qualifying population change and step 1
pub const DEFAULT_START_DELAY: Duration = Duration::from_millis(1000);
/// Delay between consecutive steps
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub start_delay: Duration,
    pub step_delay: Duration,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            start_delay: DEFAULT_START_DELAY,
            step_delay: DEFAULT_STEP_DELAY,
        }
    }
}

#[derive(Clone)]
pub struct HandshakeCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: HandshakeConfig,
    sink: Arc<dyn EventSink>,
    running: AtomicBool,
    completed_runs: AtomicU64,
}

impl HandshakeCoordinator {
    pub fn new(config: HandshakeConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                sink,
                running: AtomicBool::new(false),
                completed_runs: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> HandshakeConfig {
        self.inner.config
    }

    /// Whether a run is currently between start and step 3
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Number of runs that reached their terminal step
    pub fn completed_runs(&self) -> u64 {
        self.inner.completed_runs.load(Ordering::Acquire)
    }

    /// Evaluate a new session population.
    ///
    /// Starts a run when `snapshot` holds at least two sessions and no run is
    /// in flight. Must be called from within a tokio runtime. Returns the
    /// handle of the spawned run, if any.
    pub fn on_population_changed(&self, snapshot: &[Session]) -> Option<JoinHandle<()>> {
        let [participant_a, participant_b, ..] = snapshot else {
            return None;
        };

        if self
            .inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("HANDSHAKE: run already in flight, ignoring population change");
            return None;
        }

        tracing::info!(
            "HANDSHAKE: starting between {} and {}",
            participant_a.username,
            participant_b.username
        );
        let run = HandshakeRun::new(participant_a.clone(), participant_b.clone());
        let inner = self.inner.clone();
        Some(tokio::spawn(async move { inner.drive(run).await }))
    }
}

impl CoordinatorInner {
    async fn drive(self: Arc<Self>, mut run: HandshakeRun) {
        let _running = RunningGuard(&self.running);

        tokio::time::sleep(self.config.start_delay).await;

        loop {
            let event = run.event();
            let delivered = self.sink.broadcast(OutboundEvent::HandshakeStep(event));
            tracing::info!(
                step = run.current_step().number(),
                delivered,
                "HANDSHAKE: {}",
                run.current_step().description()
            );

            match run.advance() {
                Ok(Some(_)) => tokio::time::sleep(self.config.step_delay).await,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("HANDSHAKE: aborting run: {}", e);
                    return;
                }
            }
        }

        if let Some(secret) = run.shared_secret() {
            tracing::info!("HANDSHAKE: complete, shared secret {}", secret);
        }
        self.completed_runs.fetch_add(1, Ordering::AcqRel);
    }
}

/// Returns the coordinator to idle however the run ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
