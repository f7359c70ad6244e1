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

//! Top-level mixer that drives the sequencer and produces output frames.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use super::bank::VoiceBank;
use super::command::{self, CommandSender, VoiceCommand};
use super::restrictions::{RestrictionFlags, Restrictions};
use super::{MAX_CHUNK_FRAMES, OUTPUT_SHIFT};
use crate::config::{ConfigError, MixerConfig};
use crate::samples::{SampleAllocator, SystemAllocator};

/// Advances musical state once per callback interval.
///
/// Returning false ends the current [`VoiceMixer::mix_to_buffer`] call early.
pub trait Sequencer: Send {
    fn tick(&mut self, bank: &mut VoiceBank) -> bool;
}

impl<F> Sequencer for F
where
    F: FnMut(&mut VoiceBank) -> bool + Send,
{
    fn tick(&mut self, bank: &mut VoiceBank) -> bool {
        self(bank)
    }
}

/// A sample type the mixer can write. Mixed frames arrive clamped to 16 bits.
pub trait OutputSample: Copy {
    fn from_mixed(sample: i16) -> Self;
}

impl OutputSample for i16 {
    fn from_mixed(sample: i16) -> Self {
        sample
    }
}

impl OutputSample for i32 {
    fn from_mixed(sample: i16) -> Self {
        sample as i32
    }
}

impl OutputSample for f32 {
    fn from_mixed(sample: i16) -> Self {
        sample as f32 / 32768.0
    }
}

/// Software voice mixer producing interleaved stereo.
pub struct VoiceMixer {
    /// Voices, samples and declicker.
    bank: VoiceBank,
    /// Kept apart from the bank so it can borrow the bank mutably on tick.
    sequencer: Option<Box<dyn Sequencer>>,
    /// Handed out to other threads.
    sender: CommandSender,
    commands: Receiver<VoiceCommand>,
    /// Interleaved stereo scratch, always zeroed between chunks.
    accumulator: Vec<i32>,
    /// Output frames between sequencer ticks.
    callback_interval: usize,
    /// Frames left until the next tick.
    countdown: usize,
}

impl VoiceMixer {
    /// Creates a mixer that drops unregistered sample buffers.
    pub fn new(config: &MixerConfig) -> Result<Self, ConfigError> {
        Self::with_allocator(config, Arc::new(SystemAllocator))
    }

    /// Creates a mixer that hands unregistered sample buffers to `allocator`.
    pub fn with_allocator(
        config: &MixerConfig,
        allocator: Arc<dyn SampleAllocator>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let interval = config.callback_interval()?;
        let (sender, commands) = command::channel(config.command_queue_capacity());

        let mut mixer = Self {
            bank: VoiceBank::new(
                config.max_voices(),
                config.max_samples(),
                config.sample_rate(),
                config.panning_law(),
                allocator,
            ),
            sequencer: None,
            sender,
            commands,
            accumulator: vec![0; MAX_CHUNK_FRAMES * 2],
            callback_interval: 1,
            countdown: 0,
        };
        mixer.set_process_callback_interval(interval.as_micros().try_into().unwrap_or(u64::MAX));

        info!(
            sample_rate = config.sample_rate(),
            max_voices = config.max_voices(),
            max_samples = config.max_samples(),
            panning_law = %config.panning_law(),
            callback_interval_frames = mixer.callback_interval,
            "Voice mixer created"
        );
        Ok(mixer)
    }

    /// Installs the sequencer called once per callback interval.
    pub fn set_sequencer<S: Sequencer + 'static>(&mut self, sequencer: S) {
        self.sequencer = Some(Box::new(sequencer));
    }

    /// Removes the sequencer. Mixing continues with the voices as they are.
    pub fn clear_sequencer(&mut self) {
        self.sequencer = None;
    }

    /// Gets a sender for queueing voice commands from another thread.
    pub fn command_sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn bank(&self) -> &VoiceBank {
        &self.bank
    }

    /// Gets the voice control surface for single-threaded hosts.
    pub fn bank_mut(&mut self) -> &mut VoiceBank {
        &mut self.bank
    }

    /// Sets the time between sequencer ticks. The interval is rounded to
    /// whole output frames, with a minimum of one. A pending tick is never
    /// pushed further out.
    pub fn set_process_callback_interval(&mut self, micros: u64) {
        let rate = self.bank.sample_rate() as u64;
        let frames = micros.saturating_mul(rate).saturating_add(500_000) / 1_000_000;
        self.callback_interval = usize::try_from(frames).unwrap_or(usize::MAX).max(1);
        self.countdown = self.countdown.min(self.callback_interval);
        debug!(
            micros,
            frames = self.callback_interval,
            "Callback interval set"
        );
    }

    /// Returns the callback interval in output frames.
    pub fn callback_interval(&self) -> usize {
        self.callback_interval
    }

    /// Stops all voices without tails, clears the declicker and schedules a
    /// sequencer tick at the start of the next mix.
    pub fn reset_voices(&mut self) {
        self.bank.reset();
        self.accumulator.fill(0);
        self.countdown = 0;
    }

    /// Reports the fixed limits sample loaders must honor.
    pub fn restrictions(&self) -> Restrictions {
        Restrictions {
            flags: RestrictionFlags::all(),
            max_voices: self.bank.max_voices(),
            max_samples: self.bank.samples().capacity(),
            sample_rate: self.bank.sample_rate(),
        }
    }

    /// Mixes up to `frame_count` frames into interleaved stereo `out`.
    ///
    /// Returns the number of frames written, which is less than requested
    /// only when the sequencer asks to stop. Queued commands are applied and
    /// the sequencer ticked at chunk boundaries.
    pub fn mix_to_buffer<S: OutputSample>(&mut self, out: &mut [S], frame_count: usize) -> usize {
        let capacity = out.len() / 2;
        let frame_count = if frame_count > capacity {
            warn!(
                requested = frame_count,
                capacity, "Output buffer too small, mixing fewer frames"
            );
            capacity
        } else {
            frame_count
        };

        let mut produced = 0;
        while produced < frame_count {
            self.drain_commands();

            if self.countdown == 0 {
                if let Some(sequencer) = self.sequencer.as_mut() {
                    if !sequencer.tick(&mut self.bank) {
                        debug!(produced, "Sequencer finished");
                        return produced;
                    }
                }
                self.countdown = self.callback_interval;
            }

            let chunk = (frame_count - produced)
                .min(self.countdown)
                .min(MAX_CHUNK_FRAMES);
            let accumulator = &mut self.accumulator[..chunk * 2];
            self.bank.mix_voices(accumulator);

            let destination = &mut out[produced * 2..(produced + chunk) * 2];
            for (dst, src) in destination.iter_mut().zip(accumulator.iter_mut()) {
                let clamped = (*src >> OUTPUT_SHIFT).clamp(i16::MIN as i32, i16::MAX as i32);
                *dst = S::from_mixed(clamped as i16);
                *src = 0;
            }

            self.countdown -= chunk;
            produced += chunk;
        }
        produced
    }

    /// Fills `out` entirely, or until the sequencer stops.
    pub fn mix<S: OutputSample>(&mut self, out: &mut [S]) -> usize {
        let frames = out.len() / 2;
        self.mix_to_buffer(out, frames)
    }

    fn drain_commands(&mut self) {
        while let Ok(command) = self.commands.try_recv() {
            if let Err(e) = self.bank.apply(command) {
                debug!(?command, error = %e, "Queued voice command failed");
            }
        }
    }
}

impl fmt::Debug for VoiceMixer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceMixer")
            .field("bank", &self.bank)
            .field("has_sequencer", &self.sequencer.is_some())
            .field("callback_interval", &self.callback_interval)
            .field("countdown", &self.countdown)
            .field("queued_commands", &self.commands.len())
            .finish()
    }
}
