//! Audio feedback using the Web Audio API
//!
//! Procedurally generated sound effects - no external files needed!
//!
//! The output device is opened lazily on the first sound and then reused for
//! the rest of the session. Every failure is swallowed: sound is a nicety,
//! never a reason to interrupt the card.

use rand::Rng;
use thiserror::Error;

use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Foil being scratched
    Scratch,
    /// Winning reveal
    WinningChime,
}

/// Anything that can play a [`SoundEffect`]
pub trait SoundBoard {
    fn play(&mut self, effect: SoundEffect);
}

/// Band-passed white noise with an exponential decay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseBurst {
    pub duration_s: f32,
    /// Peak sample value of the raw noise
    pub amplitude: f32,
    pub band_hz: f32,
    pub q: f32,
    pub peak_gain: f32,
    /// Gain at the end of the decay (must stay above zero)
    pub floor_gain: f32,
}

/// Scratch noise
pub const SCRATCH_BURST: NoiseBurst = NoiseBurst {
    duration_s: 0.08,
    amplitude: 0.15,
    band_hz: 3000.0,
    q: 0.5,
    peak_gain: 0.3,
    floor_gain: 0.001,
};

impl NoiseBurst {
    /// Raw noise for one burst at `sample_rate`
    pub fn samples<R: Rng + ?Sized>(&self, sample_rate: f32, rng: &mut R) -> Vec<f32> {
        let len = (sample_rate * self.duration_s).round() as usize;
        (0..len)
            .map(|_| (rng.random::<f32>() * 2.0 - 1.0) * self.amplitude)
            .collect()
    }

    /// Envelope gain `t` seconds after the start
    pub fn gain_at(&self, t: f32) -> f32 {
        exp_decay(self.peak_gain, self.floor_gain, t, self.duration_s)
    }
}

/// A sine note with a linear attack and exponential release
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneNote {
    pub freq_hz: f32,
    /// Offset from the start of the sequence
    pub start_s: f32,
    pub attack_s: f32,
    pub peak_gain: f32,
    /// Length of the note from its own start
    pub length_s: f32,
    pub floor_gain: f32,
}

impl ToneNote {
    /// Envelope gain `t` seconds after the note starts
    pub fn gain_at(&self, t: f32) -> f32 {
        if t < 0.0 || t > self.length_s {
            0.0
        } else if t < self.attack_s {
            self.peak_gain * t / self.attack_s
        } else {
            exp_decay(
                self.peak_gain,
                self.floor_gain,
                t - self.attack_s,
                self.length_s - self.attack_s,
            )
        }
    }
}

/// C5, E5, G5, C6
pub const CHIME_FREQS: [f32; 4] = [523.25, 659.25, 783.99, 1046.5];
pub const CHIME_STAGGER_S: f32 = 0.15;

/// The ascending winning arpeggio
pub fn chime_notes() -> [ToneNote; 4] {
    std::array::from_fn(|i| ToneNote {
        freq_hz: CHIME_FREQS[i],
        start_s: i as f32 * CHIME_STAGGER_S,
        attack_s: 0.05,
        peak_gain: 0.4,
        length_s: 0.5,
        floor_gain: 0.001,
    })
}

/// Web Audio style exponential ramp from `from` to `to` over `span` seconds
fn exp_decay(from: f32, to: f32, t: f32, span: f32) -> f32 {
    if t <= 0.0 || span <= 0.0 {
        return from;
    }
    if t >= span {
        return to;
    }
    from * (to / from).powf(t / span)
}

/// Audio backend failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
    #[error("audio playback failed: {0}")]
    Playback(String),
}

/// A device that can render the synthesized effects
pub trait AudioOutput: Sized {
    /// Acquire the device; called at most once per synth
    fn open() -> Result<Self, AudioError>;

    fn play_noise(&self, burst: &NoiseBurst, volume: f32) -> Result<(), AudioError>;

    fn play_tone(&self, note: &ToneNote, volume: f32) -> Result<(), AudioError>;
}

/// Lazily opened output
#[derive(Debug)]
enum OutputSlot<O> {
    Unopened,
    Ready(O),
    /// Opening failed; never retried
    Unavailable,
}

/// Audio synthesizer for the card
pub struct AudioSynth<O: AudioOutput> {
    slot: OutputSlot<O>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl<O: AudioOutput> Default for AudioSynth<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: AudioOutput> AudioSynth<O> {
    /// Nothing is opened until the first sound
    pub fn new() -> Self {
        Self {
            slot: OutputSlot::Unopened,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Pick up volume and mute from user settings
    pub fn configure(&mut self, settings: &Settings) {
        self.set_master_volume(settings.master_volume);
        self.set_sfx_volume(settings.sfx_volume);
        self.set_muted(!settings.sound);
    }

    /// Set master volume (0.0 - 1.0)
    pub fn set_master_volume(&mut self, vol: f32) {
        self.master_volume = vol.clamp(0.0, 1.0);
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Whether the device has been opened successfully
    pub fn is_open(&self) -> bool {
        matches!(self.slot, OutputSlot::Ready(_))
    }

    fn output(&mut self) -> Option<&O> {
        if let OutputSlot::Unopened = self.slot {
            self.slot = match O::open() {
                Ok(out) => OutputSlot::Ready(out),
                Err(e) => {
                    log::warn!("{e} - audio disabled");
                    OutputSlot::Unavailable
                }
            };
        }
        match &self.slot {
            OutputSlot::Ready(out) => Some(out),
            _ => None,
        }
    }

    pub fn play_scratch_sound(&mut self) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(out) = self.output() else { return };
        if let Err(e) = out.play_noise(&SCRATCH_BURST, vol) {
            log::debug!("scratch sound skipped: {e}");
        }
    }

    pub fn play_winning_chime(&mut self) {
        let vol = self.effective_volume();
        if vol <= 0.0 {
            return;
        }
        let Some(out) = self.output() else { return };
        for note in chime_notes() {
            if let Err(e) = out.play_tone(&note, vol) {
                log::debug!("chime note {} Hz skipped: {e}", note.freq_hz);
            }
        }
    }
}

impl<O: AudioOutput> SoundBoard for AudioSynth<O> {
    fn play(&mut self, effect: SoundEffect) {
        match effect {
            SoundEffect::Scratch => self.play_scratch_sound(),
            SoundEffect::WinningChime => self.play_winning_chime(),
        }
    }
}

/// Output used by the shipped build
#[cfg(target_arch = "wasm32")]
pub type DefaultOutput = web::WebAudioOutput;

#[cfg(not(target_arch = "wasm32"))]
pub type DefaultOutput = NoDevice;

/// Native builds have no audio device
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct NoDevice;

#[cfg(not(target_arch = "wasm32"))]
impl AudioOutput for NoDevice {
    fn open() -> Result<Self, AudioError> {
        Err(AudioError::Unavailable("no audio device on this target".into()))
    }

    fn play_noise(&self, _burst: &NoiseBurst, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }

    fn play_tone(&self, _note: &ToneNote, _volume: f32) -> Result<(), AudioError> {
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::Cell;

    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use wasm_bindgen::JsValue;
    use web_sys::{AudioContext, BiquadFilterType, GainNode, OscillatorNode, OscillatorType};

    use super::{AudioError, AudioOutput, NoiseBurst, ToneNote};

    fn playback(e: JsValue) -> AudioError {
        AudioError::Playback(format!("{e:?}"))
    }

    /// Web Audio context plus a noise seed
    pub struct WebAudioOutput {
        ctx: AudioContext,
        noise_seed: Cell<u64>,
    }

    impl WebAudioOutput {
        /// Resume context if suspended (browsers require user gesture)
        fn resume(&self) {
            if self.ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = self.ctx.resume();
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Result<(OscillatorNode, GainNode), AudioError> {
            let osc = self.ctx.create_oscillator().map_err(playback)?;
            let gain = self.ctx.create_gain().map_err(playback)?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).map_err(playback)?;
            gain.connect_with_audio_node(&self.ctx.destination())
                .map_err(playback)?;

            Ok((osc, gain))
        }
    }

    impl AudioOutput for WebAudioOutput {
        fn open() -> Result<Self, AudioError> {
            // May fail outside a secure context
            let ctx = AudioContext::new().map_err(|e| AudioError::Unavailable(format!("{e:?}")))?;
            Ok(Self {
                ctx,
                noise_seed: Cell::new(js_sys::Date::now() as u64),
            })
        }

        fn play_noise(&self, burst: &NoiseBurst, volume: f32) -> Result<(), AudioError> {
            self.resume();
            let ctx = &self.ctx;
            let rate = ctx.sample_rate();

            let seed = self.noise_seed.get();
            self.noise_seed.set(seed.wrapping_add(1));
            let mut samples = burst.samples(rate, &mut Pcg32::seed_from_u64(seed));
            if samples.is_empty() {
                return Ok(());
            }

            let buffer = ctx
                .create_buffer(1, samples.len() as u32, rate)
                .map_err(playback)?;
            buffer
                .copy_to_channel(&mut samples[..], 0)
                .map_err(playback)?;
            let source = ctx.create_buffer_source().map_err(playback)?;
            source.set_buffer(Some(&buffer));

            let filter = ctx.create_biquad_filter().map_err(playback)?;
            filter.set_type(BiquadFilterType::Bandpass);
            filter.frequency().set_value(burst.band_hz);
            filter.q().set_value(burst.q);

            let gain = ctx.create_gain().map_err(playback)?;
            let t = ctx.current_time();
            gain.gain()
                .set_value_at_time(burst.peak_gain * volume, t)
                .map_err(playback)?;
            gain.gain()
                .exponential_ramp_to_value_at_time(burst.floor_gain, t + burst.duration_s as f64)
                .map_err(playback)?;

            source.connect_with_audio_node(&filter).map_err(playback)?;
            filter.connect_with_audio_node(&gain).map_err(playback)?;
            gain.connect_with_audio_node(&ctx.destination())
                .map_err(playback)?;
            source.start().map_err(playback)?;
            Ok(())
        }

        fn play_tone(&self, note: &ToneNote, volume: f32) -> Result<(), AudioError> {
            self.resume();
            let (osc, gain) = self.create_osc(note.freq_hz, OscillatorType::Sine)?;
            let t = self.ctx.current_time() + note.start_s as f64;

            gain.gain().set_value_at_time(0.0, t).map_err(playback)?;
            gain.gain()
                .linear_ramp_to_value_at_time(note.peak_gain * volume, t + note.attack_s as f64)
                .map_err(playback)?;
            gain.gain()
                .exponential_ramp_to_value_at_time(note.floor_gain, t + note.length_s as f64)
                .map_err(playback)?;

            osc.start_with_when(t).map_err(playback)?;
            osc.stop_with_when(t + note.length_s as f64)
                .map_err(playback)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::cell::RefCell;

    thread_local! {
        static OPENS: RefCell<u32> = const { RefCell::new(0) };
        static PLAYED: RefCell<Vec<(String, f32)>> = const { RefCell::new(Vec::new()) };
    }

    struct FakeOutput;

    impl AudioOutput for FakeOutput {
        fn open() -> Result<Self, AudioError> {
            OPENS.with(|n| *n.borrow_mut() += 1);
            Ok(FakeOutput)
        }

        fn play_noise(&self, burst: &NoiseBurst, volume: f32) -> Result<(), AudioError> {
            PLAYED.with(|p| p.borrow_mut().push(("noise".into(), burst.peak_gain * volume)));
            Ok(())
        }

        fn play_tone(&self, note: &ToneNote, volume: f32) -> Result<(), AudioError> {
            PLAYED.with(|p| p.borrow_mut().push((format!("{}", note.freq_hz), volume)));
            Err(AudioError::Playback("node limit".into()))
        }
    }

    struct BrokenOutput;

    impl AudioOutput for BrokenOutput {
        fn open() -> Result<Self, AudioError> {
            OPENS.with(|n| *n.borrow_mut() += 1);
            Err(AudioError::Unavailable("insecure context".into()))
        }

        fn play_noise(&self, _: &NoiseBurst, _: f32) -> Result<(), AudioError> {
            unreachable!()
        }

        fn play_tone(&self, _: &ToneNote, _: f32) -> Result<(), AudioError> {
            unreachable!()
        }
    }

    fn opens() -> u32 {
        OPENS.with(|n| *n.borrow())
    }

    #[test]
    fn test_output_opened_once_on_first_sound() {
        let mut synth = AudioSynth::<FakeOutput>::new();
        assert_eq!(opens(), 0);
        assert!(!synth.is_open());

        synth.play(SoundEffect::Scratch);
        synth.play(SoundEffect::Scratch);
        synth.play(SoundEffect::WinningChime);
        assert_eq!(opens(), 1);
        assert!(synth.is_open());

        let played = PLAYED.with(|p| p.borrow().clone());
        assert_eq!(played.len(), 6);
        assert_eq!(played[0].0, "noise");
        assert_eq!(played[2].0, "523.25");
    }

    #[test]
    fn test_failures_are_swallowed() {
        let mut synth = AudioSynth::<BrokenOutput>::new();
        synth.play_scratch_sound();
        synth.play_winning_chime();
        synth.play_scratch_sound();
        // Open is attempted once and never retried
        assert_eq!(opens(), 1);
        assert!(!synth.is_open());
    }

    #[test]
    fn test_muted_never_opens() {
        let mut synth = AudioSynth::<FakeOutput>::new();
        synth.configure(&Settings {
            sound: false,
            ..Settings::default()
        });
        synth.play(SoundEffect::WinningChime);
        assert_eq!(opens(), 0);
    }

    #[test]
    fn test_volume_scales_peak() {
        let mut synth = AudioSynth::<FakeOutput>::new();
        synth.set_master_volume(0.5);
        synth.set_sfx_volume(2.0);
        synth.play_scratch_sound();
        let played = PLAYED.with(|p| p.borrow().clone());
        assert!((played[0].1 - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_noise_burst_shape() {
        let mut rng = Pcg32::seed_from_u64(3);
        let samples = SCRATCH_BURST.samples(48_000.0, &mut rng);
        assert_eq!(samples.len(), 3840);
        assert!(samples.iter().all(|s| s.abs() <= 0.15));
        assert!(samples.iter().any(|s| *s < 0.0) && samples.iter().any(|s| *s > 0.0));

        assert_eq!(SCRATCH_BURST.gain_at(0.0), 0.3);
        assert_eq!(SCRATCH_BURST.gain_at(0.08), 0.001);
        assert!(SCRATCH_BURST.gain_at(0.04) < 0.3 && SCRATCH_BURST.gain_at(0.04) > 0.001);
    }

    #[test]
    fn test_chime_is_ascending_and_staggered() {
        let notes = chime_notes();
        assert!(notes.windows(2).all(|w| w[1].freq_hz > w[0].freq_hz));
        for (i, note) in notes.iter().enumerate() {
            assert!((note.start_s - i as f32 * 0.15).abs() < 1e-6);
            assert_eq!(note.length_s, 0.5);
        }

        let n = notes[0];
        assert_eq!(n.gain_at(0.0), 0.0);
        assert!((n.gain_at(0.025) - 0.2).abs() < 1e-6);
        assert!((n.gain_at(0.05) - 0.4).abs() < 1e-6);
        assert!((n.gain_at(0.5) - 0.001).abs() < 1e-6);
        assert_eq!(n.gain_at(0.6), 0.0);
    }
}
