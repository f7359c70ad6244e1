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

//! Voice control from threads other than the one doing the mixing.
//!
//! Commands queue up in a bounded channel and are applied by the mixer at
//! chunk boundaries, so the voice table only ever changes on the mixing thread.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::warn;

use super::error::CommandError;
use crate::samples::SampleHandle;

/// A deferred voice control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    Start {
        voice: usize,
        sample: SampleHandle,
        frame_offset: usize,
    },
    Stop {
        voice: usize,
    },
    SetVolume {
        voice: usize,
        volume: u8,
    },
    SetPan {
        voice: usize,
        pan: u8,
    },
    SetSpeed {
        voice: usize,
        frequency: u32,
    },
    SetReverse {
        voice: usize,
        reversed: bool,
    },
    StopAll,
}

/// Cloneable handle for queueing voice commands. Never blocks.
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<VoiceCommand>,
}

impl CommandSender {
    /// Queues a command for the next chunk boundary.
    pub fn send(&self, command: VoiceCommand) -> Result<(), CommandError> {
        self.tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(command) => {
                warn!(?command, "Voice command queue is full, dropping command");
                CommandError::QueueFull
            }
            TrySendError::Disconnected(_) => CommandError::Disconnected,
        })
    }

    pub fn start(
        &self,
        voice: usize,
        sample: SampleHandle,
        frame_offset: usize,
    ) -> Result<(), CommandError> {
        self.send(VoiceCommand::Start {
            voice,
            sample,
            frame_offset,
        })
    }

    pub fn stop(&self, voice: usize) -> Result<(), CommandError> {
        self.send(VoiceCommand::Stop { voice })
    }

    pub fn set_volume(&self, voice: usize, volume: u8) -> Result<(), CommandError> {
        self.send(VoiceCommand::SetVolume { voice, volume })
    }

    pub fn set_pan(&self, voice: usize, pan: u8) -> Result<(), CommandError> {
        self.send(VoiceCommand::SetPan { voice, pan })
    }

    pub fn set_speed(&self, voice: usize, frequency: u32) -> Result<(), CommandError> {
        self.send(VoiceCommand::SetSpeed { voice, frequency })
    }

    pub fn set_reverse(&self, voice: usize, reversed: bool) -> Result<(), CommandError> {
        self.send(VoiceCommand::SetReverse { voice, reversed })
    }

    pub fn stop_all(&self) -> Result<(), CommandError> {
        self.send(VoiceCommand::StopAll)
    }
}

/// Creates the sending and receiving halves of a command queue.
pub(super) fn channel(capacity: usize) -> (CommandSender, Receiver<VoiceCommand>) {
    let (tx, rx) = crossbeam_channel::bounded(capacity);
    (CommandSender { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_fails_when_full() {
        let (sender, rx) = channel(2);
        sender.stop(0).unwrap();
        sender.set_pan(1, 10).unwrap();
        assert_eq!(sender.stop_all(), Err(CommandError::QueueFull));

        assert_eq!(rx.try_recv().unwrap(), VoiceCommand::Stop { voice: 0 });
        sender.stop_all().unwrap();
    }

    #[test]
    fn test_send_fails_when_disconnected() {
        let (sender, rx) = channel(2);
        drop(rx);
        assert_eq!(sender.set_volume(0, 1), Err(CommandError::Disconnected));
    }

    #[test]
    fn test_senders_share_queue_across_threads() {
        let (sender, rx) = channel(16);
        let handles: Vec<_> = (0..4)
            .map(|voice| {
                let sender = sender.clone();
                std::thread::spawn(move || sender.set_speed(voice, 8363).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(rx.try_iter().count(), 4);
    }
}
