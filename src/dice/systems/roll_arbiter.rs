//! Roll arbitration
//!
//! The arbiter owns the roll session and guarantees at most one roll
//! sequence is in flight. A sequence is a spawned tokio task that shows
//! `roll_steps` random faces, one per `roll_tick`, then settles on a final
//! face. Shake and button triggers go through the same [`RollArbiter::try_roll`]
//! entry point and get the same Idle-only gating.
//!
//! The sequence task only holds a weak reference to the arbiter and checks a
//! cancellation flag under the session lock before every mutation. Sink
//! delivery is serialized with [`RollArbiter::shutdown`], so once shutdown
//! returns the sink is never called again.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use crate::dice::types::{
    DieFace, RollOutcome, RollSession, RollSnapshot, RollState, RollTrigger, ShakeSettings,
};

/// Observer of roll state changes. Must not block.
pub trait VisualSink: Send + Sync + 'static {
    fn on_roll_update(&self, snapshot: RollSnapshot);
}

impl<F> VisualSink for F
where
    F: Fn(RollSnapshot) + Send + Sync + 'static,
{
    fn on_roll_update(&self, snapshot: RollSnapshot) {
        self(snapshot)
    }
}

struct ArbiterCore {
    session: RollSession,
    rng: StdRng,
    sequence: Option<AbortHandle>,
}

thread_local! {
    /// Address of the arbiter whose sink is running on this thread
    static PUBLISHING: Cell<usize> = const { Cell::new(0) };
}

/// Marks this thread as inside an arbiter's sink until dropped.
struct PublishScope {
    outer: usize,
}

impl PublishScope {
    fn enter(id: usize) -> Self {
        Self {
            outer: PUBLISHING.with(|current| current.replace(id)),
        }
    }
}

impl Drop for PublishScope {
    fn drop(&mut self) {
        PUBLISHING.with(|current| current.set(self.outer));
    }
}

struct ArbiterInner {
    steps: u32,
    tick: Duration,
    cancelled: AtomicBool,
    delivery: Mutex<()>,
    core: Mutex<ArbiterCore>,
    sink: Box<dyn VisualSink>,
    updates: watch::Sender<RollSnapshot>,
}

impl ArbiterInner {
    fn lock_core(&self) -> MutexGuard<'_, ArbiterCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn id(&self) -> usize {
        self as *const Self as usize
    }

    /// `None` when called from inside this arbiter's own sink, where the
    /// delivery lock is already held by the caller further up the stack.
    fn lock_delivery(&self) -> Option<MutexGuard<'_, ()>> {
        if PUBLISHING.with(Cell::get) == self.id() {
            return None;
        }
        Some(self.delivery.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply `update` to the session and publish the snapshot it returns.
    ///
    /// Nothing happens once the arbiter is shut down. The sink runs without
    /// the core lock held so it may query the arbiter.
    fn update_and_publish(
        &self,
        update: impl FnOnce(&mut ArbiterCore) -> Option<RollSnapshot>,
    ) -> Option<RollSnapshot> {
        let _delivery = self.lock_delivery();
        let snapshot = {
            let mut core = self.lock_core();
            if self.is_cancelled() {
                return None;
            }
            update(&mut core)?
        };

        {
            let _scope = PublishScope::enter(self.id());
            self.sink.on_roll_update(snapshot);
        }
        // A sink that shut the arbiter down has already published the final state.
        if !self.is_cancelled() {
            self.updates.send_replace(snapshot);
        }
        Some(snapshot)
    }
}

impl Drop for ArbiterInner {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        let core = self.core.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(sequence) = core.sequence.take() {
            sequence.abort();
        }
    }
}

/// Shared handle to a roll session. Clones refer to the same session.
#[derive(Clone)]
pub struct RollArbiter {
    inner: Arc<ArbiterInner>,
}

impl RollArbiter {
    pub fn new(settings: &ShakeSettings, sink: impl VisualSink) -> Self {
        Self::with_rng(settings, sink, StdRng::from_entropy())
    }

    /// Arbiter drawing faces from a caller-provided generator
    pub fn with_rng(settings: &ShakeSettings, sink: impl VisualSink, rng: StdRng) -> Self {
        let session = RollSession::default();
        let (updates, _) = watch::channel(session.snapshot());
        Self {
            inner: Arc::new(ArbiterInner {
                steps: settings.roll_steps.max(1),
                tick: settings.roll_tick(),
                cancelled: AtomicBool::new(false),
                delivery: Mutex::new(()),
                core: Mutex::new(ArbiterCore {
                    session,
                    rng,
                    sequence: None,
                }),
                sink: Box::new(sink),
                updates,
            }),
        }
    }

    /// Start a roll if none is in flight.
    ///
    /// Must be called from within a tokio runtime; the sequence runs as a
    /// task on it. Triggers arriving mid-roll are dropped without effect.
    pub fn try_roll(&self, trigger: RollTrigger) -> RollOutcome {
        if self.inner.is_cancelled() {
            debug!(trigger = trigger.name(), "Arbiter shut down; ignoring trigger");
            return RollOutcome::IgnoredShutdown;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(trigger = trigger.name(), "No async runtime running; cannot roll");
            return RollOutcome::IgnoredNoRuntime;
        };

        let mut outcome = RollOutcome::IgnoredShutdown;
        self.inner.update_and_publish(|core| {
            if core.session.state == RollState::Rolling {
                outcome = RollOutcome::IgnoredRolling;
                return None;
            }
            core.session.state = RollState::Rolling;
            let task = runtime.spawn(run_sequence(
                Arc::downgrade(&self.inner),
                self.inner.steps,
                self.inner.tick,
            ));
            core.sequence = Some(task.abort_handle());
            outcome = RollOutcome::Started;
            Some(core.session.snapshot())
        });

        match outcome {
            RollOutcome::Started => info!(trigger = trigger.name(), "Roll started"),
            RollOutcome::IgnoredRolling => {
                debug!(trigger = trigger.name(), "Roll in flight; ignoring trigger")
            }
            _ => debug!(trigger = trigger.name(), "Arbiter shut down; ignoring trigger"),
        }
        outcome
    }

    pub fn snapshot(&self) -> RollSnapshot {
        self.inner.lock_core().session.snapshot()
    }

    pub fn state(&self) -> RollState {
        self.inner.lock_core().session.state
    }

    pub fn is_rolling(&self) -> bool {
        self.state() == RollState::Rolling
    }

    pub fn displayed_value(&self) -> DieFace {
        self.inner.lock_core().session.displayed_value
    }

    pub fn completed_rolls(&self) -> u64 {
        self.inner.lock_core().session.completed_rolls
    }

    /// Latest snapshot as a watch channel
    pub fn updates(&self) -> watch::Receiver<RollSnapshot> {
        self.inner.updates.subscribe()
    }

    /// Resolves once no roll is in flight.
    pub async fn wait_idle(&self) {
        let mut updates = self.updates();
        let _ = updates.wait_for(|snapshot| !snapshot.is_rolling).await;
    }

    /// Cancel any in-flight sequence and refuse further triggers.
    ///
    /// An abandoned sequence does not count as a completed roll, and the
    /// sink is not called again.
    pub fn shutdown(&self) {
        if self.inner.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        // Waits for a sink call in progress on another thread.
        let _delivery = self.inner.lock_delivery();
        let snapshot = {
            let mut core = self.inner.lock_core();
            if let Some(sequence) = core.sequence.take() {
                sequence.abort();
            }
            core.session.state = RollState::Idle;
            core.session.snapshot()
        };
        self.inner.updates.send_replace(snapshot);
        info!(
            completed_rolls = snapshot.completed_rolls,
            "Roll arbiter shut down"
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_cancelled()
    }
}

async fn run_sequence(inner: Weak<ArbiterInner>, steps: u32, tick: Duration) {
    for step in 1..=steps {
        tokio::time::sleep(tick).await;

        let Some(inner) = inner.upgrade() else {
            return;
        };

        let Some(intermediate) = inner.update_and_publish(|core| {
            let face = DieFace::roll(&mut core.rng);
            core.session.displayed_value = face;
            Some(core.session.snapshot())
        }) else {
            return;
        };
        debug!(step, value = intermediate.displayed_value.value(), "Roll step");

        if step < steps {
            continue;
        }
        let Some(settled) = inner.update_and_publish(|core| {
            let face = DieFace::roll(&mut core.rng);
            core.session.displayed_value = face;
            core.session.completed_rolls += 1;
            core.session.state = RollState::Idle;
            core.sequence = None;
            Some(core.session.snapshot())
        }) else {
            return;
        };
        info!(
            value = settled.displayed_value.value(),
            completed_rolls = settled.completed_rolls,
            "Roll settled"
        );
    }
}
