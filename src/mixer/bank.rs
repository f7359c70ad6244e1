// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The voice table and everything a sequencer is allowed to touch.

use std::sync::Arc;

use tracing::{debug, warn};

use super::command::VoiceCommand;
use super::declicker::Declicker;
use super::error::VoiceError;
use super::pan::PanningLaw;
use super::voice::Voice;
use super::FRAC_BITS;
use crate::samples::{SampleAllocator, SampleDescriptor, SampleError, SampleHandle, SampleStore};

/// Voices, the sample pool and the declicker.
///
/// This is the control surface handed to the sequencer on every tick. All
/// calls are bounded and allocation free. Failures are logged and returned,
/// and never leave a voice half updated.
#[derive(Debug)]
pub struct VoiceBank {
    voices: Vec<Voice>,
    samples: SampleStore,
    declicker: Declicker,
    panning_law: PanningLaw,
    sample_rate: u32,
}

impl VoiceBank {
    pub(super) fn new(
        max_voices: usize,
        max_samples: usize,
        sample_rate: u32,
        panning_law: PanningLaw,
        allocator: Arc<dyn SampleAllocator>,
    ) -> Self {
        Self {
            voices: vec![Voice::default(); max_voices],
            samples: SampleStore::new(max_samples, allocator),
            declicker: Declicker::new(),
            panning_law,
            sample_rate,
        }
    }

    /// Registers a sample with the pool.
    pub fn register_sample(
        &mut self,
        descriptor: SampleDescriptor,
    ) -> Result<SampleHandle, SampleError> {
        self.samples.register(descriptor)
    }

    /// Unregisters a sample. Voices still playing it are silenced at once,
    /// without a declick tail, since the data is about to be released.
    pub fn unregister_sample(&mut self, handle: SampleHandle) -> Result<(), SampleError> {
        if self.samples.get(handle).is_some() {
            let mut stopped = 0;
            for voice in self
                .voices
                .iter_mut()
                .filter(|v| v.is_active() && v.sample() == Some(handle))
            {
                voice.deactivate();
                stopped += 1;
            }
            if stopped > 0 {
                debug!(sample = %handle, stopped, "Stopped voices playing unregistered sample");
            }
        }
        self.samples.unregister(handle)
    }

    /// Starts a voice on a sample at the given frame. Restarting an active
    /// voice stops it first so its tail is declicked. An offset at or beyond
    /// the end of the sample leaves the voice stopped.
    pub fn voice_start(
        &mut self,
        voice: usize,
        sample: SampleHandle,
        frame_offset: usize,
    ) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        let length = match self.samples.lookup(sample) {
            Ok(entry) => {
                if !entry.format().is_mixable() {
                    debug!(voice, sample = %sample, format = %entry.format(), "Format plays as silence");
                }
                entry.length()
            }
            Err(e) => {
                warn!(voice, sample = %sample, error = %e, "Cannot start voice");
                return Err(e.into());
            }
        };

        self.stop_voice(voice);

        if frame_offset >= length {
            debug!(
                voice,
                sample = %sample,
                frame_offset,
                length,
                "Start offset is past the end of the sample, voice left stopped"
            );
            return Ok(());
        }

        self.voices[voice].start(sample, frame_offset);
        debug!(voice, sample = %sample, frame_offset, "Voice started");
        Ok(())
    }

    /// Stops a voice, declicking it if it was moving.
    pub fn voice_stop(&mut self, voice: usize) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        if self.stop_voice(voice) {
            debug!(voice, "Voice stopped");
        }
        Ok(())
    }

    /// Sets the volume (0-255) of an active voice.
    pub fn voice_set_volume(&mut self, voice: usize, volume: u8) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        if let Some(v) = self.active_mut(voice) {
            v.set_volume(volume);
        }
        Ok(())
    }

    /// Sets the pan (0 left, 255 right) of an active voice.
    pub fn voice_set_pan(&mut self, voice: usize, pan: u8) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        if let Some(v) = self.active_mut(voice) {
            v.set_pan(pan);
        }
        Ok(())
    }

    /// Sets the playback frequency of an active voice. A voice playing at the
    /// mixing rate plays at its native pitch. Direction is left unchanged.
    pub fn voice_set_speed(&mut self, voice: usize, frequency: u32) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        let step = self.step_for(frequency);
        if let Some(v) = self.active_mut(voice) {
            v.set_step(step);
        }
        Ok(())
    }

    /// Sets the direction of an active voice. Has no effect until a speed
    /// has been set, since a still voice has no direction.
    pub fn voice_set_reverse(&mut self, voice: usize, reversed: bool) -> Result<(), VoiceError> {
        self.check_voice(voice)?;
        if let Some(v) = self.active_mut(voice) {
            v.set_reversed(reversed);
        }
        Ok(())
    }

    /// Returns true if the voice is playing. Out of range voices are reported
    /// as not playing.
    pub fn voice_is_active(&self, voice: usize) -> bool {
        match self.voices.get(voice) {
            Some(v) => v.is_active(),
            None => {
                warn!(
                    voice,
                    max_voices = self.voices.len(),
                    "Voice index out of range"
                );
                false
            }
        }
    }

    /// Stops every active voice with a declick tail.
    pub fn voice_stop_all(&mut self) {
        let mut stopped = 0;
        for voice in 0..self.voices.len() {
            if self.stop_voice(voice) {
                stopped += 1;
            }
        }
        debug!(stopped, "Stopped all voices");
    }

    /// Returns every voice to its initial state and discards pending tails.
    pub fn reset(&mut self) {
        self.voices.fill(Voice::default());
        self.declicker.reset();
        debug!("Voices reset");
    }

    /// Gets a voice by index.
    pub fn voice(&self, voice: usize) -> Option<&Voice> {
        self.voices.get(voice)
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Returns the number of voices currently playing.
    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| v.is_active()).count()
    }

    pub fn max_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn samples(&self) -> &SampleStore {
        &self.samples
    }

    pub fn declicker(&self) -> &Declicker {
        &self.declicker
    }

    pub fn panning_law(&self) -> PanningLaw {
        self.panning_law
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Mixes every active voice and any pending declick tails into the
    /// accumulator.
    pub(super) fn mix_voices(&mut self, accumulator: &mut [i32]) {
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if !voice.is_active() {
                continue;
            }
            match voice.sample().and_then(|s| self.samples.get(s)) {
                Some(entry) => voice.mix(entry, accumulator, self.panning_law),
                None => {
                    warn!(voice = index, "Voice references a missing sample, stopping it");
                    voice.deactivate();
                }
            }
        }
        self.declicker.apply_and_drain(accumulator);
    }

    /// Applies a queued command.
    pub(super) fn apply(&mut self, command: VoiceCommand) -> Result<(), VoiceError> {
        match command {
            VoiceCommand::Start {
                voice,
                sample,
                frame_offset,
            } => self.voice_start(voice, sample, frame_offset),
            VoiceCommand::Stop { voice } => self.voice_stop(voice),
            VoiceCommand::SetVolume { voice, volume } => self.voice_set_volume(voice, volume),
            VoiceCommand::SetPan { voice, pan } => self.voice_set_pan(voice, pan),
            VoiceCommand::SetSpeed { voice, frequency } => self.voice_set_speed(voice, frequency),
            VoiceCommand::SetReverse { voice, reversed } => {
                self.voice_set_reverse(voice, reversed)
            }
            VoiceCommand::StopAll => {
                self.voice_stop_all();
                Ok(())
            }
        }
    }

    /// Fixed-point step for a playback frequency, rounded to nearest.
    fn step_for(&self, frequency: u32) -> i64 {
        let rate = self.sample_rate as i64;
        (((frequency as i64) << FRAC_BITS) + rate / 2) / rate
    }

    fn check_voice(&self, voice: usize) -> Result<(), VoiceError> {
        if voice < self.voices.len() {
            return Ok(());
        }
        warn!(
            voice,
            max_voices = self.voices.len(),
            "Voice index out of range"
        );
        Err(VoiceError::InvalidVoice {
            voice,
            max_voices: self.voices.len(),
        })
    }

    fn active_mut(&mut self, voice: usize) -> Option<&mut Voice> {
        self.voices.get_mut(voice).filter(|v| v.is_active())
    }

    /// Captures a declick tail and deactivates. Returns false if the voice
    /// was not playing.
    fn stop_voice(&mut self, index: usize) -> bool {
        let voice = &mut self.voices[index];
        if !voice.is_active() {
            return false;
        }
        if let Some(entry) = voice.sample().and_then(|s| self.samples.get(s)) {
            self.declicker.capture(voice, entry, self.panning_law);
        }
        voice.deactivate();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples::SystemAllocator;
    use crate::testutil::{pcm16_constant, CountingAllocator};

    fn bank() -> VoiceBank {
        VoiceBank::new(
            4,
            8,
            44100,
            PanningLaw::Centered,
            Arc::new(SystemAllocator),
        )
    }

    #[test]
    fn test_start_rejects_bad_voice_and_sample() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(10, 1)))
            .unwrap();

        assert_eq!(
            bank.voice_start(4, handle, 0),
            Err(VoiceError::InvalidVoice {
                voice: 4,
                max_voices: 4
            })
        );
        assert_eq!(
            bank.voice_start(0, SampleHandle::from_index(3), 0),
            Err(VoiceError::Sample(SampleError::NotRegistered(3)))
        );
        assert_eq!(
            bank.voice_start(0, SampleHandle::from_index(99), 0),
            Err(VoiceError::Sample(SampleError::InvalidHandle(99)))
        );
        assert_eq!(bank.active_voice_count(), 0);
    }

    #[test]
    fn test_out_of_range_voice_is_rejected() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(100, 1000)))
            .unwrap();
        bank.voice_start(3, handle, 0).unwrap();
        bank.voice_set_speed(3, 44100).unwrap();
        let voices = format!("{:?}", bank.voices());
        let silent = bank.declicker().is_silent();

        let invalid = Err(VoiceError::InvalidVoice {
            voice: 4,
            max_voices: 4,
        });
        assert_eq!(bank.voice_stop(4), invalid);
        assert_eq!(bank.voice_set_volume(4, 0), invalid);
        assert_eq!(bank.voice_set_pan(4, 0), invalid);
        assert_eq!(bank.voice_set_speed(4, 1000), invalid);
        assert_eq!(bank.voice_set_reverse(4, true), invalid);

        assert_eq!(format!("{:?}", bank.voices()), voices);
        assert_eq!(bank.declicker().is_silent(), silent);
    }

    #[test]
    fn test_start_past_end_leaves_voice_stopped() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(10, 1)))
            .unwrap();

        bank.voice_start(1, handle, 9).unwrap();
        assert!(bank.voice_is_active(1));
        bank.voice_start(1, handle, 10).unwrap();
        assert!(!bank.voice_is_active(1));
    }

    #[test]
    fn test_set_speed_rounds_to_nearest() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(10, 1)))
            .unwrap();
        bank.voice_start(0, handle, 0).unwrap();

        bank.voice_set_speed(0, 44100).unwrap();
        assert_eq!(bank.voice(0).unwrap().increment(), 1 << FRAC_BITS);

        bank.voice_set_speed(0, 22050).unwrap();
        assert_eq!(bank.voice(0).unwrap().increment(), 1 << (FRAC_BITS - 1));

        // 8363 * 65536 / 44100 = 12428.04...
        bank.voice_set_speed(0, 8363).unwrap();
        assert_eq!(bank.voice(0).unwrap().increment(), 12428);
    }

    #[test]
    fn test_set_speed_keeps_direction() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(10, 1)))
            .unwrap();
        bank.voice_start(0, handle, 5).unwrap();
        bank.voice_set_speed(0, 44100).unwrap();
        bank.voice_set_reverse(0, true).unwrap();
        bank.voice_set_speed(0, 22050).unwrap();

        let voice = bank.voice(0).unwrap();
        assert!(voice.is_reversed());
        assert_eq!(voice.increment(), -(1 << (FRAC_BITS - 1)));
    }

    #[test]
    fn test_setters_on_inactive_voice_change_nothing() {
        let mut bank = bank();
        let before = format!("{:?}", bank.voice(2).unwrap());

        bank.voice_set_volume(2, 3).unwrap();
        bank.voice_set_pan(2, 7).unwrap();
        bank.voice_set_speed(2, 1000).unwrap();
        bank.voice_set_reverse(2, true).unwrap();
        bank.voice_stop(2).unwrap();

        assert_eq!(format!("{:?}", bank.voice(2).unwrap()), before);
        assert!(bank.declicker().is_silent());
    }

    #[test]
    fn test_unregister_stops_voices_and_releases() {
        let allocator = Arc::new(CountingAllocator::default());
        let mut bank = VoiceBank::new(4, 8, 44100, PanningLaw::Centered, allocator.clone());
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(100, 1)))
            .unwrap();
        bank.voice_start(0, handle, 0).unwrap();
        bank.voice_start(3, handle, 0).unwrap();
        bank.voice_set_speed(3, 44100).unwrap();

        bank.unregister_sample(handle).unwrap();
        assert_eq!(bank.active_voice_count(), 0);
        assert_eq!(allocator.released(), 1);
        // Hard stop: nothing is left to fade.
        assert!(bank.declicker().is_silent());

        assert_eq!(
            bank.unregister_sample(handle),
            Err(SampleError::NotRegistered(handle.index()))
        );
    }

    #[test]
    fn test_voice_is_active_out_of_range() {
        let bank = bank();
        assert!(!bank.voice_is_active(100));
    }

    #[test]
    fn test_stop_all_and_reset() {
        let mut bank = bank();
        let handle = bank
            .register_sample(SampleDescriptor::new(pcm16_constant(100, 1000)))
            .unwrap();
        for voice in 0..4 {
            bank.voice_start(voice, handle, 0).unwrap();
            bank.voice_set_speed(voice, 44100).unwrap();
        }
        assert_eq!(bank.active_voice_count(), 4);

        bank.voice_stop_all();
        assert_eq!(bank.active_voice_count(), 0);
        assert!(!bank.declicker().is_silent());

        bank.reset();
        assert!(bank.declicker().is_silent());
    }
}
