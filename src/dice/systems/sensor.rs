//! Motion sample sources
//!
//! A [`MotionSampleSource`] hands accelerometer samples to a subscriber
//! callback until the returned [`SubscriptionHandle`] is released. Sources
//! without a usable sensor still hand out a handle, an inert one, so callers
//! treat "no accelerometer" the same as "nobody is shaking".
//!
//! Implementations:
//! - [`PushMotionSource`]: the host pushes samples in (platform bridges, tests)
//! - [`IntervalMotionSource`]: a tokio ticker pulls from a [`SampleGenerator`]
//! - [`UnavailableMotionSource`]: a device without an accelerometer

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::dice::types::{MotionSample, SensorError};

/// Callback receiving each delivered sample
pub type SampleCallback = Box<dyn FnMut(MotionSample) + Send + 'static>;

struct Subscriber {
    active: bool,
    callback: SampleCallback,
}

type SharedSubscriber = Arc<Mutex<Subscriber>>;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Hand one sample to a subscriber. Returns false once it has been released.
///
/// The subscriber lock is held while the callback runs, so a release that
/// races a delivery waits for that delivery to finish and nothing is
/// delivered after the release returns. Callbacks must not release their own
/// subscription.
fn deliver(subscriber: &SharedSubscriber, sample: MotionSample) -> bool {
    let Ok(mut guard) = subscriber.lock() else {
        return false;
    };
    if !guard.active {
        return false;
    }
    (guard.callback)(sample);
    true
}

/// Disposable subscription. Dropping it is the same as unsubscribing.
#[must_use = "dropping a subscription handle unsubscribes it"]
pub struct SubscriptionHandle {
    id: u64,
    subscriber: Option<SharedSubscriber>,
    ticker: Option<AbortHandle>,
}

impl SubscriptionHandle {
    /// A handle that never delivers anything
    pub fn inert() -> Self {
        Self {
            id: 0,
            subscriber: None,
            ticker: None,
        }
    }

    fn live(subscriber: SharedSubscriber, ticker: Option<AbortHandle>) -> Self {
        Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            subscriber: Some(subscriber),
            ticker,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_inert(&self) -> bool {
        self.id == 0
    }

    /// Whether samples can still reach the callback
    pub fn is_active(&self) -> bool {
        self.subscriber
            .as_ref()
            .and_then(|s| s.lock().ok().map(|guard| guard.active))
            .unwrap_or(false)
    }

    fn release(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(subscriber) = self.subscriber.take() {
            let mut guard = subscriber.lock().unwrap_or_else(PoisonError::into_inner);
            guard.active = false;
            debug!(subscription = self.id, "Accelerometer subscription released");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Anything that can deliver [`MotionSample`]s to a subscriber.
pub trait MotionSampleSource {
    /// Raw capability check. May fail.
    fn probe(&self) -> Result<bool, SensorError>;

    /// Capability check with probe failures folded into `false`.
    fn is_available(&self) -> bool {
        match self.probe() {
            Ok(available) => available,
            Err(err) => {
                warn!("{err}; treating accelerometer as unavailable");
                false
            }
        }
    }

    /// Start delivering samples. Unavailable sources return an inert handle.
    fn subscribe(&self, on_sample: SampleCallback) -> SubscriptionHandle;

    /// Stop delivering samples. No callback runs after this returns.
    fn unsubscribe(&self, mut handle: SubscriptionHandle) {
        handle.release();
    }
}

// ============================================================================
// Push source
// ============================================================================

/// Source fed by the host: every [`push`](PushMotionSource::push) is
/// delivered synchronously, in call order, to each live subscriber.
///
/// Clones share the same subscriber list, so one clone can be handed to a
/// detector while another stays with the platform bridge.
#[derive(Clone)]
pub struct PushMotionSource {
    available: bool,
    subscribers: Arc<Mutex<Vec<Weak<Mutex<Subscriber>>>>>,
}

impl Default for PushMotionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PushMotionSource {
    pub fn new() -> Self {
        Self {
            available: true,
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A source that reports no sensor and ignores pushes
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Deliver a sample; returns how many subscribers received it.
    pub fn push(&self, sample: MotionSample) -> usize {
        let live: Vec<SharedSubscriber> = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        live.iter()
            .filter(|subscriber| deliver(subscriber, sample))
            .count()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

impl MotionSampleSource for PushMotionSource {
    fn probe(&self) -> Result<bool, SensorError> {
        Ok(self.available)
    }

    fn subscribe(&self, on_sample: SampleCallback) -> SubscriptionHandle {
        if !self.available {
            return SubscriptionHandle::inert();
        }
        let subscriber = Arc::new(Mutex::new(Subscriber {
            active: true,
            callback: on_sample,
        }));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&subscriber));
        SubscriptionHandle::live(subscriber, None)
    }
}

// ============================================================================
// Interval source
// ============================================================================

/// Produces the next accelerometer reading. `None` ends the stream.
pub trait SampleGenerator: Send + 'static {
    fn next_sample(&mut self) -> Option<MotionSample>;
}

/// Source that polls a [`SampleGenerator`] on a fixed tokio interval.
///
/// Each subscription runs its own ticker task on the ambient runtime; the
/// generator is shared between subscriptions.
pub struct IntervalMotionSource<G> {
    generator: Arc<Mutex<G>>,
    interval: Duration,
}

impl<G: SampleGenerator> IntervalMotionSource<G> {
    pub fn new(generator: G, interval: Duration) -> Self {
        Self {
            generator: Arc::new(Mutex::new(generator)),
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl<G: SampleGenerator> MotionSampleSource for IntervalMotionSource<G> {
    fn probe(&self) -> Result<bool, SensorError> {
        Ok(true)
    }

    fn subscribe(&self, on_sample: SampleCallback) -> SubscriptionHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime running; accelerometer subscription is inert");
            return SubscriptionHandle::inert();
        };

        let subscriber = Arc::new(Mutex::new(Subscriber {
            active: true,
            callback: on_sample,
        }));
        let weak = Arc::downgrade(&subscriber);
        let generator = Arc::clone(&self.generator);
        let period = self.interval;

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(subscriber) = weak.upgrade() else {
                    break;
                };
                let next = generator
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .next_sample();
                let Some(sample) = next else {
                    debug!("Sample generator exhausted");
                    subscriber
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .active = false;
                    break;
                };
                if !deliver(&subscriber, sample) {
                    break;
                }
            }
        });

        SubscriptionHandle::live(subscriber, Some(task.abort_handle()))
    }
}

// ============================================================================
// Unavailable source
// ============================================================================

/// A device with no accelerometer, or one whose probe fails.
#[derive(Debug, Clone, Default)]
pub struct UnavailableMotionSource {
    probe_error: Option<String>,
}

impl UnavailableMotionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose capability probe itself fails
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            probe_error: Some(reason.into()),
        }
    }
}

impl MotionSampleSource for UnavailableMotionSource {
    fn probe(&self) -> Result<bool, SensorError> {
        match &self.probe_error {
            Some(reason) => Err(SensorError::ProbeFailed(reason.clone())),
            None => Ok(false),
        }
    }

    fn subscribe(&self, _on_sample: SampleCallback) -> SubscriptionHandle {
        SubscriptionHandle::inert()
    }
}

// ============================================================================
// Generators
// ============================================================================

/// Replays a fixed list of samples, optionally looping.
#[derive(Debug, Clone, Default)]
pub struct ScriptedMotion {
    samples: Vec<MotionSample>,
    cursor: usize,
    looping: bool,
}

impl ScriptedMotion {
    pub fn new(samples: Vec<MotionSample>) -> Self {
        Self {
            samples,
            cursor: 0,
            looping: false,
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Parse a JSON array of `{"x":..,"y":..,"z":..}` objects.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let samples: Vec<MotionSample> =
            serde_json::from_str(json).map_err(|e| format!("Invalid motion script: {e}"))?;
        Ok(Self::new(samples))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleGenerator for ScriptedMotion {
    fn next_sample(&mut self) -> Option<MotionSample> {
        if self.cursor >= self.samples.len() {
            if !self.looping || self.samples.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let sample = self.samples[self.cursor];
        self.cursor += 1;
        Some(sample)
    }
}

/// A phone resting face-up with sensor noise, shaken at regular intervals.
///
/// At rest the reading is gravity on Z (about 1.0) plus small noise. Every
/// `shake_every` ticks a burst of `burst_len` samples swings hard along X.
#[derive(Debug, Clone)]
pub struct SimulatedShaker {
    rng: StdRng,
    tick: u64,
    pub noise: f32,
    pub shake_every: u64,
    pub burst_len: u64,
    pub burst_strength: f32,
}

impl SimulatedShaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            tick: 0,
            noise: 0.05,
            shake_every: 20,
            burst_len: 4,
            burst_strength: 2.5,
        }
    }

    fn jitter(&mut self) -> f32 {
        if self.noise.is_finite() && self.noise > 0.0 {
            self.rng.gen_range(-self.noise..self.noise)
        } else {
            0.0
        }
    }

    fn in_burst(&self) -> bool {
        if self.shake_every == 0 {
            return false;
        }
        let burst_len = self.burst_len.min(self.shake_every);
        self.tick % self.shake_every >= self.shake_every - burst_len
    }
}

impl SampleGenerator for SimulatedShaker {
    fn next_sample(&mut self) -> Option<MotionSample> {
        let sample = if self.in_burst() {
            let direction = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            MotionSample::new(
                direction * self.burst_strength + self.jitter(),
                self.jitter(),
                1.0 + self.jitter(),
            )
        } else {
            MotionSample::new(self.jitter(), self.jitter(), 1.0 + self.jitter())
        };
        self.tick += 1;
        Some(sample)
    }
}
