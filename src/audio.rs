use crate::config::AudioSource;
use anyhow::{anyhow, Context};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat};
use ringbuf::traits::{Consumer as _, Producer as _, Split as _};
use ringbuf::HeapRb;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f32::consts::{PI, TAU};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Per-frame audio snapshot. Every field is normalized to roughly 0..=1.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFeatures {
    pub amplitude: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub centroid: f32,
}

/// Seqlock-published features: one writer (the analyzer), any number of readers.
pub struct AtomicAudioFeatures {
    seq: AtomicU64,
    amplitude: AtomicU32,
    bass: AtomicU32,
    mid: AtomicU32,
    treble: AtomicU32,
    centroid: AtomicU32,
    updated_ms: AtomicU64,
}

impl Default for AtomicAudioFeatures {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicAudioFeatures {
    pub fn new() -> Self {
        Self {
            seq: AtomicU64::new(0),
            amplitude: AtomicU32::new(0),
            bass: AtomicU32::new(0),
            mid: AtomicU32::new(0),
            treble: AtomicU32::new(0),
            centroid: AtomicU32::new(0),
            updated_ms: AtomicU64::new(0),
        }
    }

    pub fn store(&self, f: AudioFeatures) {
        self.seq.fetch_add(1, Ordering::Release); // odd => write in progress
        self.amplitude.store(f.amplitude.to_bits(), Ordering::Relaxed);
        self.bass.store(f.bass.to_bits(), Ordering::Relaxed);
        self.mid.store(f.mid.to_bits(), Ordering::Relaxed);
        self.treble.store(f.treble.to_bits(), Ordering::Relaxed);
        self.centroid.store(f.centroid.to_bits(), Ordering::Relaxed);
        self.updated_ms.store(now_ms(), Ordering::Relaxed);
        self.seq.fetch_add(1, Ordering::Release); // even => stable
    }

    pub fn load(&self) -> AudioFeatures {
        loop {
            let v1 = self.seq.load(Ordering::Acquire);
            if v1 & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let f = AudioFeatures {
                amplitude: f32::from_bits(self.amplitude.load(Ordering::Relaxed)),
                bass: f32::from_bits(self.bass.load(Ordering::Relaxed)),
                mid: f32::from_bits(self.mid.load(Ordering::Relaxed)),
                treble: f32::from_bits(self.treble.load(Ordering::Relaxed)),
                centroid: f32::from_bits(self.centroid.load(Ordering::Relaxed)),
            };
            let v2 = self.seq.load(Ordering::Acquire);
            if v1 == v2 {
                return f;
            }
        }
    }

    /// Milliseconds since the last store; 0 before the first one.
    pub fn age_ms(&self) -> f32 {
        let t = self.updated_ms.load(Ordering::Relaxed);
        if t == 0 {
            return 0.0;
        }
        now_ms().saturating_sub(t) as f32
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_millis(0))
        .as_millis() as u64
}

pub fn list_input_devices() -> anyhow::Result<()> {
    let host = cpal::default_host();
    let devices = host.input_devices().context("enumerate input devices")?;

    let mut out = io::stdout();
    writeln!(out, "Input devices:")?;
    for dev in devices {
        let name = dev.name().unwrap_or_else(|_| "<unknown>".to_string());
        writeln!(out, "  - {}", name)?;
    }
    Ok(())
}

enum AudioBackend {
    Cpal(cpal::Stream),
    Tone(thread::JoinHandle<()>),
    Silent,
}

pub struct AudioSystem {
    backend: AudioBackend,
    stop: Arc<AtomicBool>,
    analyzer_handle: Option<thread::JoinHandle<()>>,
    features: Arc<AtomicAudioFeatures>,
    pub sample_rate_hz: u32,
    pub source: AudioSource,
}

const TONE_SAMPLE_RATE: u32 = 48_000;

impl AudioSystem {
    pub fn new(source: AudioSource, device_query: Option<&str>) -> anyhow::Result<Self> {
        let system = match source {
            AudioSource::Mic => Self::new_mic(device_query)?,
            AudioSource::Tone => Self::new_tone(),
            AudioSource::None => Self::silent(),
        };
        tracing::info!(
            source = ?system.source,
            sample_rate_hz = system.sample_rate_hz,
            "audio source started"
        );
        Ok(system)
    }

    fn silent() -> Self {
        Self {
            backend: AudioBackend::Silent,
            stop: Arc::new(AtomicBool::new(false)),
            analyzer_handle: None,
            features: Arc::new(AtomicAudioFeatures::new()),
            sample_rate_hz: 0,
            source: AudioSource::None,
        }
    }

    fn new_mic(device_query: Option<&str>) -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = select_mic_input_device(&host, device_query)?;
        let supported = device
            .default_input_config()
            .context("get default input config")?;
        let sample_rate_hz = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: cpal::StreamConfig = supported.clone().into();

        let rb_capacity = (sample_rate_hz as usize).saturating_mul(4);
        let rb = HeapRb::<f32>::new(rb_capacity);
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let features = Arc::new(AtomicAudioFeatures::new());
        let features_for_thread = Arc::clone(&features);
        let stop_for_thread = Arc::clone(&stop);

        let err_fn = |err| tracing::error!("audio stream error: {err}");

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &config,
                move |data: &[u16], _| push_interleaved(data, channels, &mut prod),
                err_fn,
                None,
            )?,
            fmt => return Err(anyhow!("unsupported sample format: {fmt:?}")),
        };

        stream.play().context("start input stream")?;

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(
                &mut cons,
                sample_rate_hz,
                &stop_for_thread,
                &features_for_thread,
            )
        });

        Ok(Self {
            backend: AudioBackend::Cpal(stream),
            stop,
            analyzer_handle: Some(analyzer_handle),
            features,
            sample_rate_hz,
            source: AudioSource::Mic,
        })
    }

    fn new_tone() -> Self {
        let sample_rate_hz = TONE_SAMPLE_RATE;
        let rb = HeapRb::<f32>::new(sample_rate_hz as usize);
        let (mut prod, mut cons) = rb.split();

        let stop = Arc::new(AtomicBool::new(false));
        let features = Arc::new(AtomicAudioFeatures::new());
        let features_for_thread = Arc::clone(&features);
        let stop_for_analyzer = Arc::clone(&stop);
        let stop_for_tone = Arc::clone(&stop);

        let tone_handle = thread::spawn(move || {
            let mut tone = TestTone::new(sample_rate_hz);
            let chunk = (sample_rate_hz / 100) as usize;
            let start = Instant::now();
            let mut produced = 0u64;
            while !stop_for_tone.load(Ordering::Relaxed) {
                // Pace to wall clock so the analyzer sees real-time audio.
                let due = start.elapsed().as_secs_f64() * sample_rate_hz as f64;
                while (produced as f64) < due {
                    for _ in 0..chunk {
                        let _ = prod.try_push(tone.next_sample());
                    }
                    produced += chunk as u64;
                }
                thread::sleep(Duration::from_millis(5));
            }
        });

        let analyzer_handle = thread::spawn(move || {
            analyze_loop(
                &mut cons,
                sample_rate_hz,
                &stop_for_analyzer,
                &features_for_thread,
            )
        });

        Self {
            backend: AudioBackend::Tone(tone_handle),
            stop,
            analyzer_handle: Some(analyzer_handle),
            features,
            sample_rate_hz,
            source: AudioSource::Tone,
        }
    }

    pub fn features(&self) -> Arc<AtomicAudioFeatures> {
        Arc::clone(&self.features)
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.analyzer_handle.take() {
            let _ = h.join();
        }

        match std::mem::replace(&mut self.backend, AudioBackend::Silent) {
            AudioBackend::Cpal(stream) => drop(stream),
            AudioBackend::Tone(handle) => {
                let _ = handle.join();
            }
            AudioBackend::Silent => {}
        }
    }
}

fn select_mic_input_device(
    host: &cpal::Host,
    device_query: Option<&str>,
) -> anyhow::Result<cpal::Device> {
    let devices = host
        .input_devices()
        .context("enumerate input devices")?
        .collect::<Vec<_>>();

    let want = device_query.map(|s| s.to_lowercase());
    if let Some(want) = want.as_deref() {
        if let Some(dev) = devices.iter().find(|d| {
            d.name()
                .map(|n| n.to_lowercase().contains(want))
                .unwrap_or(false)
        }) {
            return Ok(dev.clone());
        }
        return Err(anyhow!("no input device matching: {want}"));
    }

    host.default_input_device()
        .ok_or_else(|| anyhow!("no default input device found"))
}

fn push_interleaved<T: Sample<Float = f32> + Copy>(
    data: &[T],
    channels: usize,
    prod: &mut ringbuf::HeapProd<f32>,
) {
    for frame in data.chunks(channels) {
        let mut acc = 0.0f32;
        for s in frame {
            acc += (*s).to_float_sample();
        }
        let mono = acc / channels as f32;
        let _ = prod.try_push(mono);
    }
}

/// Synthetic 120 BPM groove: kick on every beat, hat on the off-beats and a
/// quiet sustained pad.
pub struct TestTone {
    sample_rate: f32,
    n: u64,
    rng: fastrand::Rng,
}

impl TestTone {
    pub const BPM: f32 = 120.0;

    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate: sample_rate_hz.max(1) as f32,
            n: 0,
            rng: fastrand::Rng::with_seed(0x7e57),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let t = self.n as f32 / self.sample_rate;
        self.n += 1;
        let beat_len = 60.0 / Self::BPM;
        let in_beat = t % beat_len;
        let off_beat = (t + beat_len * 0.5) % beat_len;

        // Pitch-dropping sine for the kick.
        let kick_env = (-in_beat * 18.0).exp();
        let kick_freq = 50.0 + 90.0 * (-in_beat * 30.0).exp();
        let kick = (TAU * kick_freq * in_beat).sin() * kick_env * 0.9;

        let hat_env = (-off_beat * 60.0).exp();
        let hat = (self.rng.f32() * 2.0 - 1.0) * hat_env * 0.25;

        let pad = [220.0f32, 277.18, 329.63]
            .iter()
            .map(|f| (TAU * f * (t % 100.0)).sin())
            .sum::<f32>()
            * 0.03;

        (kick + hat + pad).clamp(-1.0, 1.0)
    }
}

const BASS_HZ: (f32, f32) = (20.0, 250.0);
const MID_HZ: (f32, f32) = (250.0, 4000.0);
const TREBLE_HZ: (f32, f32) = (4000.0, 16000.0);

fn analyze_loop(
    cons: &mut ringbuf::HeapCons<f32>,
    sample_rate_hz: u32,
    stop: &AtomicBool,
    features: &AtomicAudioFeatures,
) {
    let n = 1024usize;
    let hop = 256usize;

    let mut scratch = vec![0.0f32; n];
    let mut write_pos = 0usize;
    let mut filled = 0usize;
    let mut since_last = 0usize;

    let hann = (0..n)
        .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
        .collect::<Vec<_>>();

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n);
    let mut fft_buf = vec![Complex { re: 0.0, im: 0.0 }; n];
    let mut mags = vec![0.0f32; n / 2];

    let mut smoothed = AudioFeatures::default();

    while !stop.load(Ordering::Relaxed) {
        let mut got_any = false;
        while let Some(s) = cons.try_pop() {
            got_any = true;
            scratch[write_pos] = s;
            write_pos = (write_pos + 1) % n;
            if filled < n {
                filled += 1;
            }
            since_last += 1;
            if filled == n && since_last >= hop {
                since_last = 0;
                let raw = analyze_window(
                    &scratch,
                    write_pos,
                    &hann,
                    &fft,
                    &mut fft_buf,
                    &mut mags,
                    sample_rate_hz,
                );
                smoothed = smooth_features(smoothed, raw);
                features.store(smoothed);
            }
        }

        if !got_any {
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Fast attack, slower release, so onsets survive into the frame loop.
fn smooth_features(prev: AudioFeatures, raw: AudioFeatures) -> AudioFeatures {
    fn follow(prev: f32, next: f32) -> f32 {
        let k = if next > prev { 0.6 } else { 0.15 };
        prev + (next - prev) * k
    }
    AudioFeatures {
        amplitude: follow(prev.amplitude, raw.amplitude),
        bass: follow(prev.bass, raw.bass),
        mid: follow(prev.mid, raw.mid),
        treble: follow(prev.treble, raw.treble),
        centroid: prev.centroid * 0.9 + raw.centroid * 0.1,
    }
}

fn analyze_window(
    scratch: &[f32],
    write_pos: usize,
    hann: &[f32],
    fft: &Arc<dyn rustfft::Fft<f32>>,
    fft_buf: &mut [Complex<f32>],
    mags: &mut [f32],
    sample_rate_hz: u32,
) -> AudioFeatures {
    let n = fft_buf.len();
    let half = mags.len();

    let mut rms_acc = 0.0f32;
    for i in 0..n {
        let s = scratch[(write_pos + i) % n];
        rms_acc += s * s;
        fft_buf[i].re = s * hann[i];
        fft_buf[i].im = 0.0;
    }
    let rms = (rms_acc / n as f32).sqrt();

    fft.process(fft_buf);
    for (i, c) in fft_buf.iter().take(half).enumerate() {
        mags[i] = (c.re * c.re + c.im * c.im).sqrt();
    }

    let sr = sample_rate_hz.max(1) as f32;
    let band = |(lo, hi): (f32, f32)| {
        let mut acc = 0.0f32;
        let mut count = 0u32;
        for (i, m) in mags.iter().enumerate().skip(1) {
            let f = i as f32 * sr / n as f32;
            if f >= hi {
                break;
            }
            if f >= lo {
                acc += m;
                count += 1;
            }
        }
        // Log-ish compression -> 0..1
        (acc / count.max(1) as f32 * 0.02).tanh()
    };

    let mut num = 0.0f32;
    let mut den = 0.0f32;
    for (i, m) in mags.iter().enumerate().skip(1) {
        let f = i as f32 * sr / n as f32;
        num += f * m;
        den += m;
    }
    let centroid = if den > 1e-6 {
        (num / den / 8000.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    AudioFeatures {
        amplitude: (rms * 2.0).tanh(),
        bass: band(BASS_HZ),
        mid: band(MID_HZ),
        treble: band(TREBLE_HZ),
        centroid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seqlock_round_trips() {
        let a = AtomicAudioFeatures::new();
        assert_eq!(a.load(), AudioFeatures::default());
        let f = AudioFeatures {
            amplitude: 0.5,
            bass: 0.25,
            mid: 0.125,
            treble: 0.0625,
            centroid: 0.3,
        };
        a.store(f);
        assert_eq!(a.load(), f);
    }

    #[test]
    fn tone_kick_drives_bass_band() {
        let sr = TONE_SAMPLE_RATE;
        let n = 1024usize;
        let mut tone = TestTone::new(sr);
        let scratch: Vec<f32> = (0..n).map(|_| tone.next_sample()).collect();
        let hann = (0..n)
            .map(|i| 0.5 - 0.5 * ((2.0 * PI * i as f32) / (n as f32)).cos())
            .collect::<Vec<_>>();
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let mut buf = vec![Complex { re: 0.0, im: 0.0 }; n];
        let mut mags = vec![0.0f32; n / 2];
        let f = analyze_window(&scratch, 0, &hann, &fft, &mut buf, &mut mags, sr);
        assert!(f.bass > f.treble, "bass {} treble {}", f.bass, f.treble);
        assert!(f.amplitude > 0.1);
    }

    #[test]
    fn silence_is_all_zero() {
        let n = 256usize;
        let hann = vec![1.0f32; n];
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        let mut buf = vec![Complex { re: 0.0, im: 0.0 }; n];
        let mut mags = vec![0.0f32; n / 2];
        let f = analyze_window(&vec![0.0; n], 0, &hann, &fft, &mut buf, &mut mags, 48_000);
        assert_eq!(f, AudioFeatures::default());
    }
}
