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
use super::pan::PanningLaw;
use super::voice::Voice;
use super::{DECLICKER_BUFFER_SIZE, DECLICKER_FADE_SIZE};
use crate::samples::SampleEntry;

/// Turns abrupt voice stops into short linear decays.
///
/// Stopped voices are rendered a little further into a scratch buffer, faded
/// out, and added into a ring that the output mix drains frame by frame.
#[derive(Debug, Clone)]
pub struct Declicker {
    /// Interleaved stereo ring of pending tail samples.
    ring: Vec<i32>,
    /// Scratch space for rendering a single tail.
    fade: Vec<i32>,
    /// Ring frame that lines up with the next output frame.
    read_pos: usize,
}

impl Default for Declicker {
    fn default() -> Self {
        Self::new()
    }
}

impl Declicker {
    pub fn new() -> Self {
        Self {
            ring: vec![0; DECLICKER_BUFFER_SIZE * 2],
            fade: vec![0; DECLICKER_FADE_SIZE * 2],
            read_pos: 0,
        }
    }

    /// Captures the tail of a voice that is about to stop. Voices that are
    /// inactive or not moving leave nothing to fade.
    pub(super) fn capture(&mut self, voice: &Voice, entry: &SampleEntry, law: PanningLaw) {
        if !voice.is_active() || voice.increment() == 0 {
            return;
        }

        self.fade.fill(0);
        let mut tail = *voice;
        tail.mix(entry, &mut self.fade, law);

        for (i, frame) in self.fade.chunks_exact(2).enumerate() {
            let weight = (DECLICKER_FADE_SIZE - i) as i64;
            let slot = ((self.read_pos + i) % DECLICKER_BUFFER_SIZE) * 2;
            for channel in 0..2 {
                let faded = (frame[channel] as i64 * weight / DECLICKER_FADE_SIZE as i64) as i32;
                self.ring[slot + channel] = self.ring[slot + channel].saturating_add(faded);
            }
        }
    }

    /// Adds pending tails into the accumulator, clearing each consumed slot.
    pub(super) fn apply_and_drain(&mut self, accumulator: &mut [i32]) {
        for frame in accumulator.chunks_exact_mut(2) {
            let slot = self.read_pos * 2;
            frame[0] = frame[0].saturating_add(self.ring[slot]);
            frame[1] = frame[1].saturating_add(self.ring[slot + 1]);
            self.ring[slot] = 0;
            self.ring[slot + 1] = 0;
            self.read_pos = (self.read_pos + 1) % DECLICKER_BUFFER_SIZE;
        }
    }

    /// Returns true if no tail is pending.
    pub fn is_silent(&self) -> bool {
        self.ring.iter().all(|&s| s == 0)
    }

    pub(super) fn reset(&mut self) {
        self.ring.fill(0);
        self.fade.fill(0);
        self.read_pos = 0;
    }
}
