//! Shake detection
//!
//! Wires a [`MotionSampleSource`] through the threshold check and a
//! [`DebounceGate`] into a single "shake detected" callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::time::Instant;
use tracing::{debug, info};

use super::debounce::DebounceGate;
use super::sensor::{MotionSampleSource, SubscriptionHandle};
use crate::dice::types::{is_shaking_with, MotionSample, ShakeSettings};

/// Counters kept by a running detector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShakeStats {
    /// Samples evaluated while enabled
    pub samples_seen: u64,
    /// Samples whose magnitude exceeded the threshold
    pub above_threshold: u64,
    /// Shakes that passed the cooldown gate
    pub shakes_accepted: u64,
}

struct DetectorState {
    gate: DebounceGate,
    stats: ShakeStats,
}

struct DetectorShared {
    enabled: AtomicBool,
    state: Mutex<DetectorState>,
}

impl DetectorShared {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, DetectorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Emits one callback per accepted shake.
///
/// Dropping the detector unsubscribes from the source.
pub struct ShakeDetector {
    available: bool,
    threshold: f32,
    shared: Arc<DetectorShared>,
    subscription: Option<SubscriptionHandle>,
}

impl ShakeDetector {
    /// Probe `source` once and, if it has a sensor, start evaluating samples.
    ///
    /// `on_shake` runs on the source's delivery context, once per sample that
    /// is above the threshold and clears the cooldown.
    pub fn start<S, F>(source: &S, settings: &ShakeSettings, mut on_shake: F) -> Self
    where
        S: MotionSampleSource + ?Sized,
        F: FnMut() + Send + 'static,
    {
        let threshold = settings.threshold;
        let shared = Arc::new(DetectorShared {
            enabled: AtomicBool::new(settings.shake_enabled),
            state: Mutex::new(DetectorState {
                gate: DebounceGate::new(settings.cooldown()),
                stats: ShakeStats::default(),
            }),
        });

        let available = source.is_available();
        if !available {
            info!("Accelerometer not available; shake detection disabled");
            return Self {
                available,
                threshold,
                shared,
                subscription: None,
            };
        }

        let evaluator = Arc::clone(&shared);
        let subscription = source.subscribe(Box::new(move |sample: MotionSample| {
            if !evaluator.enabled.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            let accepted = {
                let mut state = evaluator.lock_state();
                state.stats.samples_seen += 1;
                if !is_shaking_with(&sample, threshold) {
                    false
                } else {
                    state.stats.above_threshold += 1;
                    let accepted = state.gate.try_accept(now);
                    if accepted {
                        state.stats.shakes_accepted += 1;
                    }
                    accepted
                }
            };
            if accepted {
                debug!(magnitude = sample.magnitude(), "Shake detected");
                on_shake();
            }
        }));

        info!(threshold, "Shake detection started");
        Self {
            available,
            threshold,
            shared,
            subscription: Some(subscription),
        }
    }

    /// Whether the source had a sensor when the detector started
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether samples are still being delivered
    pub fn is_running(&self) -> bool {
        self.subscription
            .as_ref()
            .is_some_and(SubscriptionHandle::is_active)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Passive hint for the host UI
    pub fn availability_notice(&self) -> &'static str {
        if self.available {
            "Shake your phone!"
        } else {
            "Use the button"
        }
    }

    /// Pause or resume evaluation. Disabled samples do not touch the gate.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> ShakeStats {
        self.shared.lock_state().stats
    }

    pub fn last_shake_at(&self) -> Option<Instant> {
        self.shared.lock_state().gate.last_accepted_at()
    }

    /// Unsubscribe from the source. No callback runs after this returns.
    pub fn stop(&mut self) {
        if self.subscription.take().is_some() {
            info!("Shake detection stopped");
        }
    }
}

impl Drop for ShakeDetector {
    fn drop(&mut self) {
        self.stop();
    }
}
