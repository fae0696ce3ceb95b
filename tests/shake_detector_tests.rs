//! Shake detector integration tests
//!
//! Samples are pushed by hand and the paused tokio clock is advanced between
//! them, so the cooldown decisions are fully deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use shakedice::dice::{
    IntervalMotionSource, MotionSample, MotionSampleSource, PushMotionSource, RollArbiter,
    RollSnapshot, ScriptedMotion, ShakeDetector, ShakeSettings, ShakeStats,
    UnavailableMotionSource,
};

const SHAKE: MotionSample = MotionSample::new(1.5, 1.0, 1.0);
const REST: MotionSample = MotionSample::new(0.0, 0.0, 1.0);

fn counting_detector<S: MotionSampleSource>(
    source: &S,
    settings: &ShakeSettings,
) -> (ShakeDetector, Arc<AtomicUsize>) {
    let shakes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&shakes);
    let detector = ShakeDetector::start(source, settings, move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    (detector, shakes)
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_scenario() {
    let source = PushMotionSource::new();
    let (detector, shakes) = counting_detector(&source, &ShakeSettings::default());
    assert!(detector.is_available());
    assert!(detector.is_running());

    source.push(SHAKE);
    assert_eq!(shakes.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    source.push(SHAKE);
    assert_eq!(shakes.load(Ordering::SeqCst), 1);

    tokio::time::advance(Duration::from_millis(500)).await;
    source.push(SHAKE);
    assert_eq!(shakes.load(Ordering::SeqCst), 2);

    assert_eq!(
        detector.stats(),
        ShakeStats {
            samples_seen: 3,
            above_threshold: 3,
            shakes_accepted: 2,
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_samples_at_or_below_threshold_never_fire() {
    let source = PushMotionSource::new();
    let (detector, shakes) = counting_detector(&source, &ShakeSettings::default());

    for sample in [
        REST,
        MotionSample::new(0.0, 0.0, 1.78),
        MotionSample::new(1.0, 1.0, 1.0),
    ] {
        source.push(sample);
        tokio::time::advance(Duration::from_millis(1500)).await;
    }

    assert_eq!(shakes.load(Ordering::SeqCst), 0);
    assert_eq!(detector.stats().samples_seen, 3);
    assert_eq!(detector.stats().above_threshold, 0);
    assert!(detector.last_shake_at().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_sustained_shake_fires_once_per_window() {
    let source = PushMotionSource::new();
    let (_detector, shakes) = counting_detector(&source, &ShakeSettings::default());

    // 2.5 seconds of continuous shaking at the default 100 ms sensor rate.
    for _ in 0..25 {
        source.push(SHAKE);
        tokio::time::advance(Duration::from_millis(100)).await;
    }

    // Accepted at 0 ms, 1000 ms and 2000 ms.
    assert_eq!(shakes.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stop_ends_delivery() {
    let source = PushMotionSource::new();
    let (mut detector, shakes) = counting_detector(&source, &ShakeSettings::default());
    assert_eq!(source.subscriber_count(), 1);

    detector.stop();
    assert!(!detector.is_running());
    assert_eq!(source.subscriber_count(), 0);
    assert_eq!(source.push(SHAKE), 0);
    assert_eq!(shakes.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_detector_unsubscribes() {
    let source = PushMotionSource::new();
    let (detector, _) = counting_detector(&source, &ShakeSettings::default());
    assert_eq!(source.subscriber_count(), 1);
    drop(detector);
    assert_eq!(source.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_detector_leaves_gate_untouched() {
    let source = PushMotionSource::new();
    let (detector, shakes) = counting_detector(&source, &ShakeSettings::default());

    detector.set_enabled(false);
    assert!(!detector.is_enabled());
    source.push(SHAKE);
    assert_eq!(shakes.load(Ordering::SeqCst), 0);
    assert_eq!(detector.stats().samples_seen, 0);

    tokio::time::advance(Duration::from_millis(100)).await;
    detector.set_enabled(true);
    source.push(SHAKE);
    assert_eq!(shakes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_settings_can_start_disabled() {
    let source = PushMotionSource::new();
    let settings = ShakeSettings {
        shake_enabled: false,
        ..ShakeSettings::default()
    };
    let (detector, shakes) = counting_detector(&source, &settings);
    source.push(SHAKE);
    assert!(!detector.is_enabled());
    assert_eq!(shakes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unavailable_source_never_fires() {
    let source = UnavailableMotionSource::new();
    let (detector, shakes) = counting_detector(&source, &ShakeSettings::default());
    assert!(!detector.is_available());
    assert!(!detector.is_running());
    assert_eq!(detector.availability_notice(), "Use the button");
    assert_eq!(shakes.load(Ordering::SeqCst), 0);

    let push = PushMotionSource::unavailable();
    let (detector, shakes) = counting_detector(&push, &ShakeSettings::default());
    push.push(SHAKE);
    assert!(!detector.is_available());
    assert_eq!(shakes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_probe_failure_is_treated_as_unavailable() {
    let source = UnavailableMotionSource::failing("permission denied");
    let (detector, _) = counting_detector(&source, &ShakeSettings::default());
    assert!(!detector.is_available());
}

#[test]
fn test_availability_notice() {
    let source = PushMotionSource::new();
    let (detector, _) = counting_detector(&source, &ShakeSettings::default());
    assert_eq!(detector.availability_notice(), "Shake your phone!");
}

#[tokio::test(start_paused = true)]
async fn test_shake_while_rolling_is_ignored_by_arbiter() {
    // No cooldown, so only the arbiter stands between shakes and rolls.
    let settings = ShakeSettings {
        cooldown_ms: 0,
        ..ShakeSettings::default()
    };
    let arbiter = RollArbiter::with_rng(&settings, |_: RollSnapshot| {}, StdRng::seed_from_u64(9));
    let source = PushMotionSource::new();
    let trigger = arbiter.clone();
    let detector = ShakeDetector::start(&source, &settings, move || {
        trigger.try_roll(shakedice::dice::RollTrigger::Shake);
    });

    source.push(SHAKE);
    assert!(arbiter.is_rolling());

    tokio::time::sleep(Duration::from_millis(200)).await;
    source.push(SHAKE);
    assert_eq!(detector.stats().shakes_accepted, 2);

    arbiter.wait_idle().await;
    assert_eq!(arbiter.completed_rolls(), 1);

    source.push(SHAKE);
    arbiter.wait_idle().await;
    assert_eq!(arbiter.completed_rolls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_interval_source_feeds_detector() {
    let mut samples = vec![REST; 3];
    samples.extend([SHAKE; 5]);
    samples.extend([REST; 12]);
    samples.extend([SHAKE; 2]);
    let script_len = samples.len();
    let source = IntervalMotionSource::new(
        ScriptedMotion::new(samples),
        ShakeSettings::default().sensor_interval(),
    );

    let (detector, shakes) = counting_detector(&source, &ShakeSettings::default());
    assert!(detector.is_running());

    tokio::time::sleep(Duration::from_millis(100 * script_len as u64 + 500)).await;

    // The first burst fires once; the second lands after the cooldown.
    assert_eq!(shakes.load(Ordering::SeqCst), 2);
    assert_eq!(detector.stats().samples_seen, script_len as u64);
    assert_eq!(detector.stats().above_threshold, 7);

    // The script has run out, so nothing is delivered any more.
    assert!(!detector.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_stopping_cancels_pending_interval_ticks() {
    let settings = ShakeSettings {
        cooldown_ms: 0,
        ..ShakeSettings::default()
    };
    let source = IntervalMotionSource::new(
        ScriptedMotion::new(vec![SHAKE]).looping(true),
        settings.sensor_interval(),
    );
    let (mut detector, shakes) = counting_detector(&source, &settings);

    tokio::time::sleep(Duration::from_millis(350)).await;
    let before = shakes.load(Ordering::SeqCst);
    assert_eq!(before, 4);

    detector.stop();
    assert!(!detector.is_running());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(shakes.load(Ordering::SeqCst), before);
    assert_eq!(detector.stats().samples_seen, before as u64);
}
