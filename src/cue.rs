//! Audible tones and spoken announcements for timer events.
//!
//! Both channels are fire-and-forget: a missing audio device or speech
//! engine is logged and swallowed, never surfaced to the state machine.
//! The audio output is owned by the emitter instance, created lazily on
//! the first tone and released when the emitter is dropped.

use crate::timer::Effect;
use rodio::source::{SineWave, Source};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::time::Duration;
use tracing::{debug, warn};

pub struct CueEmitter {
    sound_enabled: bool,
    voice_enabled: bool,
    audio: Option<(OutputStream, OutputStreamHandle)>,
    #[cfg(not(target_os = "linux"))]
    tts: Option<tts::Tts>,
    #[cfg(target_os = "linux")]
    speech: Option<std::process::Child>,
}

impl CueEmitter {
    pub fn new(sound_enabled: bool, voice_enabled: bool) -> Self {
        #[cfg(not(target_os = "linux"))]
        let tts = match tts::Tts::default() {
            Ok(engine) => Some(engine),
            Err(e) => {
                debug!("speech synthesis unavailable: {e}");
                None
            }
        };

        Self {
            sound_enabled,
            voice_enabled,
            audio: None,
            #[cfg(not(target_os = "linux"))]
            tts,
            #[cfg(target_os = "linux")]
            speech: None,
        }
    }

    pub fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_enabled
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }

    pub fn set_voice_enabled(&mut self, enabled: bool) {
        self.voice_enabled = enabled;
    }

    fn output(&mut self) -> Option<&OutputStreamHandle> {
        if self.audio.is_none() {
            match OutputStream::try_default() {
                Ok(pair) => self.audio = Some(pair),
                Err(e) => {
                    debug!("no audio output available: {e}");
                    return None;
                }
            }
        }
        self.audio.as_ref().map(|(_, handle)| handle)
    }

    /// Schedule a single sine pulse. No-op when the sound channel is off.
    pub fn tone(&mut self, frequency_hz: f32, duration_secs: f32, delay_secs: f32) {
        if !self.sound_enabled {
            return;
        }
        let Some(handle) = self.output() else { return };
        let source = SineWave::new(frequency_hz)
            .take_duration(Duration::from_secs_f32(duration_secs))
            .amplify(0.25)
            .delay(Duration::from_secs_f32(delay_secs));
        match Sink::try_new(handle) {
            Ok(sink) => {
                sink.append(source);
                sink.detach();
            }
            Err(e) => warn!("failed to play tone: {e}"),
        }
    }

    /// Schedule `count` pulses, 0.3s apart, 0.15s each.
    pub fn tone_burst(&mut self, count: u32, frequency_hz: f32) {
        for i in 0..count {
            self.tone(frequency_hz, 0.15, i as f32 * 0.3);
        }
    }

    /// Rising three-beep start sequence.
    pub fn start_sequence(&mut self) {
        self.tone(600.0, 0.2, 0.0);
        self.tone(800.0, 0.2, 0.3);
        self.tone(1000.0, 0.3, 0.6);
    }

    /// Speak `text`, cancelling any announcement still in progress. At most
    /// one utterance is ever active. No-op when the voice channel is off.
    #[cfg(not(target_os = "linux"))]
    pub fn announce(&mut self, text: &str) {
        if !self.voice_enabled {
            return;
        }
        if let Some(ref mut tts) = self.tts {
            if let Err(e) = tts.speak(text, true) {
                warn!("speech synthesis failed: {e}");
            }
        }
    }

    /// Linux has no portable speech API; shell out to espeak and replace
    /// any still-running utterance.
    #[cfg(target_os = "linux")]
    pub fn announce(&mut self, text: &str) {
        use std::process::{Command, Stdio};

        if !self.voice_enabled {
            return;
        }
        if let Some(mut prev) = self.speech.take() {
            if prev.try_wait().ok().flatten().is_none() {
                let _ = prev.kill();
                let _ = prev.wait();
            }
        }
        match Command::new("espeak")
            .arg(text)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => self.speech = Some(child),
            Err(e) => debug!("espeak unavailable: {e}"),
        }
    }

    #[cfg(all(test, target_os = "linux"))]
    fn set_speech_child(&mut self, child: std::process::Child) {
        self.speech = Some(child);
    }

    /// Map engine effects to the cue set. Phase changes are a UI concern
    /// and produce no audio here.
    pub fn apply(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Warning(_) => self.tone(800.0, 0.1, 0.0),
                Effect::PhaseEnd => self.tone_burst(3, 1200.0),
                Effect::StartSequence => self.start_sequence(),
                Effect::Announce(text) => self.announce(text),
                Effect::Completed(_) => self.tone(1000.0, 0.3, 0.0),
                Effect::PhaseChange { .. } => {}
            }
        }
    }
}

// An utterance can outlive the emitter; reap it so no zombie lingers
// until process exit.
#[cfg(target_os = "linux")]
impl Drop for CueEmitter {
    fn drop(&mut self) {
        if let Some(mut child) = self.speech.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl std::fmt::Debug for CueEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CueEmitter")
            .field("sound_enabled", &self.sound_enabled)
            .field("voice_enabled", &self.voice_enabled)
            .field("audio_open", &self.audio.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CompletionReport;
    use crate::timer::Phase;

    #[test]
    fn disabled_channels_are_silent_no_ops() {
        let mut cues = CueEmitter::new(false, false);
        cues.tone(800.0, 0.1, 0.0);
        cues.tone_burst(3, 1200.0);
        cues.announce("Rest");
        assert!(cues.audio.is_none());
    }

    #[test]
    fn apply_handles_every_effect_without_audio() {
        let mut cues = CueEmitter::new(false, false);
        cues.apply(&[
            Effect::StartSequence,
            Effect::Warning(3),
            Effect::PhaseEnd,
            Effect::PhaseChange {
                phase: Phase::Work,
                round: 1,
                interval: 1,
            },
            Effect::Announce("Work time".into()),
            Effect::Completed(CompletionReport {
                completed: 8,
                total: 8,
                duration_minutes: 4,
            }),
        ]);
    }

    #[test]
    fn channel_toggles() {
        let mut cues = CueEmitter::new(true, true);
        assert!(cues.sound_enabled());
        assert!(cues.voice_enabled());
        cues.set_sound_enabled(false);
        cues.set_voice_enabled(false);
        assert!(!cues.sound_enabled());
        assert!(!cues.voice_enabled());
    }

    #[test]
    fn tone_with_no_device_is_swallowed() {
        // On a headless machine output() fails; the call must still return.
        let mut cues = CueEmitter::new(true, false);
        cues.tone(800.0, 0.05, 0.0);
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn drop_reaps_a_pending_utterance() {
        use std::process::Command;

        let child = Command::new("sleep").arg("60").spawn().unwrap();
        let pid = child.id();

        let mut cues = CueEmitter::new(false, true);
        cues.set_speech_child(child);
        drop(cues);

        // killed and waited: the pid is gone, not a zombie
        assert!(!std::path::Path::new(&format!("/proc/{pid}")).exists());
    }
}
