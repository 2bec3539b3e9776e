use tui_lightshow::audio::AudioFeatures;
use tui_lightshow::beat::{beat_energy, BeatDetector, DEFAULT_COOLDOWN_MS, DEFAULT_SENSITIVITY};

const FRAME_MS: f64 = 16.0;

/// Feeds `samples` at one per frame starting at `start_frame`; returns the
/// frame indices that fired.
fn feed(
    det: &mut BeatDetector,
    start_frame: usize,
    samples: &[f32],
    sensitivity: f32,
    cooldown: f64,
) -> Vec<usize> {
    samples
        .iter()
        .enumerate()
        .filter_map(|(i, &e)| {
            let frame = start_frame + i;
            det.update(e, frame as f64 * FRAME_MS, sensitivity, cooldown)
                .then_some(frame)
        })
        .collect()
}

#[test]
fn flat_zero_stream_never_fires() {
    let mut det = BeatDetector::new();
    let fired = feed(&mut det, 0, &[0.0; 200], DEFAULT_SENSITIVITY, DEFAULT_COOLDOWN_MS);
    assert!(fired.is_empty(), "silence fired at {fired:?}");
    assert_eq!(det.ema(), 0.0);
}

#[test]
fn single_spike_fires_exactly_once() {
    let mut det = BeatDetector::new();
    // The first baseline sample rises from silence above the 0.066 gate.
    let warmup = feed(&mut det, 0, &[0.08; 120], 0.6, 120.0);
    assert_eq!(warmup, vec![0], "only the first rising sample fires during warm-up");

    let mut tail = vec![0.8];
    tail.extend(std::iter::repeat_n(0.08, 60));
    let fired = feed(&mut det, 120, &tail, 0.6, 120.0);
    assert_eq!(fired, vec![120], "spike should fire once, at the spike");
}

#[test]
fn cooldown_blocks_close_spikes() {
    let mut det = BeatDetector::new();
    feed(&mut det, 0, &[0.08; 120], 0.6, 120.0);
    // Second spike 48 ms after the first, inside the refractory period.
    let fired = feed(&mut det, 120, &[0.8, 0.08, 0.08, 0.8, 0.08], 0.6, 120.0);
    assert_eq!(fired, vec![120]);
    assert_eq!(det.last_beat_ms(), 120.0 * FRAME_MS);
}

#[test]
fn spikes_beyond_cooldown_both_fire() {
    let mut det = BeatDetector::new();
    feed(&mut det, 0, &[0.08; 120], 0.6, 120.0);
    let mut samples = vec![0.8];
    samples.extend(std::iter::repeat_n(0.08, 11));
    samples.push(0.8);
    let fired = feed(&mut det, 120, &samples, 0.6, 120.0);
    assert_eq!(fired, vec![120, 132], "192 ms apart clears a 120 ms cooldown");
}

#[test]
fn steady_loud_signal_adapts_away() {
    let mut det = BeatDetector::new();
    let jitter: Vec<f32> = (0..400).map(|i| if i % 2 == 0 { 0.88 } else { 0.92 }).collect();
    feed(&mut det, 0, &jitter[..200], 0.6, 120.0);
    let late = feed(&mut det, 200, &jitter[200..], 0.6, 120.0);
    assert!(late.is_empty(), "steady loud signal kept firing: {late:?}");
    assert!(det.threshold() > 0.92, "threshold {} sits under the signal", det.threshold());
}

#[test]
fn gate_rejects_quiet_pulses() {
    let mut det = BeatDetector::new();
    let quiet: Vec<f32> = (0..200).map(|i| if i % 20 == 0 { 0.05 } else { 0.0 }).collect();
    let fired = feed(&mut det, 0, &quiet, 0.6, 120.0);
    assert!(fired.is_empty(), "pulses under the gate fired at {fired:?}");

    let loud: Vec<f32> = (0..200).map(|i| if i % 20 == 0 { 0.3 } else { 0.0 }).collect();
    let fired = feed(&mut det, 200, &loud, 0.6, 120.0);
    assert_eq!(fired.len(), 10, "clear pulses after silence should all fire");
}

#[test]
fn higher_sensitivity_lowers_threshold() {
    let mut det = BeatDetector::new();
    let history: Vec<f32> = (0..300).map(|i| 0.2 + 0.1 * ((i as f32) * 0.37).sin()).collect();
    feed(&mut det, 0, &history, 0.5, 120.0);
    assert!(det.threshold_for(1.0) < det.threshold_for(0.0));
    assert!(det.threshold_for(0.3) < det.threshold_for(0.2));
}

#[test]
fn reset_clears_state_and_refractory_block() {
    let mut det = BeatDetector::new();
    feed(&mut det, 0, &[0.08, 0.8], 0.6, 120.0);
    det.reset();
    assert_eq!(det.ema(), 0.0);
    assert_eq!(det.dev(), 0.0);
    assert_eq!(det.last_beat_ms(), f64::NEG_INFINITY);
    // Right after reset a rising sample above the gate fires immediately.
    assert!(det.update(0.5, 2.0 * FRAME_MS, 0.6, 120.0));
}

#[test]
fn beat_energy_mixes_bass_and_amplitude() {
    let f = AudioFeatures {
        amplitude: 0.8,
        bass: 0.4,
        ..AudioFeatures::default()
    };
    assert!((beat_energy(&f, 1.0) - 0.5).abs() < 1e-6);
    assert!((beat_energy(&f, 2.0) - 1.0).abs() < 1e-6);
    let hot = AudioFeatures {
        amplitude: 1.0,
        bass: 1.0,
        ..AudioFeatures::default()
    };
    assert_eq!(beat_energy(&hot, 2.0), 2.0, "clamp happens before the gain");
    assert_eq!(beat_energy(&AudioFeatures::default(), 3.0), 0.0);
    assert_eq!(beat_energy(&f, f32::NAN), 0.0);
}
