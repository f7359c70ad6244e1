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
use std::error::Error;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trackmix::config::MixerConfig;
use trackmix::mixer::{VoiceBank, VoiceMixer, PAN_CENTER};
use trackmix::samples::loader::load_wav;
use trackmix::samples::{LoopType, SampleDescriptor};

/// Frames rendered per mix call.
const RENDER_BLOCK_FRAMES: usize = 4096;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A software voice mixer for tracker playback."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prints the limits sample loaders must honor.
    Restrictions {
        /// The path to a mixer config.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Renders a single sample through the mixer into a 16-bit stereo WAV file.
    Render {
        /// The WAV file to play.
        sample: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// The path to a mixer config.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// The loop mode: none, forward or pingpong.
        #[arg(long = "loop", default_value = "none")]
        loop_mode: String,
        /// The first frame of the loop.
        #[arg(long, default_value_t = 0)]
        loop_begin: usize,
        /// The frame after the last frame of the loop. Defaults to the end of the sample.
        #[arg(long)]
        loop_end: Option<usize>,
        /// The playback frequency in Hz. Defaults to the sample's own rate.
        #[arg(short, long)]
        frequency: Option<u32>,
        /// The voice volume, 0-255.
        #[arg(long, default_value_t = u8::MAX)]
        volume: u8,
        /// The voice pan, 0 (left) to 255 (right).
        #[arg(long, default_value_t = PAN_CENTER)]
        pan: u8,
        /// How much audio to render at most, e.g. 2s or 500ms.
        #[arg(short, long, default_value = "2s")]
        duration: String,
    },
}

fn load_config(path: Option<&Path>) -> Result<MixerConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(MixerConfig::load(path)?),
        None => Ok(MixerConfig::default()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Restrictions { config } => {
            let config = load_config(config.as_deref())?;
            let mixer = VoiceMixer::new(&config)?;
            println!("{}", mixer.restrictions());
        }
        Commands::Render {
            sample,
            output,
            config,
            loop_mode,
            loop_begin,
            loop_end,
            frequency,
            volume,
            pan,
            duration,
        } => {
            let config = load_config(config.as_deref())?;
            let duration: Duration = DurationString::from_string(duration)?.into();
            let loop_type = LoopType::from_str(&loop_mode)?;

            let loaded = load_wav(&sample)?;
            let frequency = frequency.unwrap_or(loaded.sample_rate());
            let data = loaded.into_data();
            let loop_end = loop_end.unwrap_or(data.frames());

            let mut mixer = VoiceMixer::new(&config)?;
            let handle = mixer
                .bank_mut()
                .register_sample(SampleDescriptor::new(data).with_loop(loop_type, loop_begin, loop_end))?;

            let mut started = false;
            mixer.set_sequencer(move |bank: &mut VoiceBank| {
                if !started {
                    started = true;
                    return bank.voice_start(0, handle, 0).is_ok()
                        && bank.voice_set_speed(0, frequency).is_ok()
                        && bank.voice_set_volume(0, volume).is_ok()
                        && bank.voice_set_pan(0, pan).is_ok();
                }
                bank.voice_is_active(0) || !bank.declicker().is_silent()
            });

            let spec = WavSpec {
                channels: 2,
                sample_rate: config.sample_rate(),
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let mut writer = WavWriter::create(&output, spec)?;

            let total = (duration.as_secs_f64() * config.sample_rate() as f64) as usize;
            let mut buffer = vec![0i16; RENDER_BLOCK_FRAMES * 2];
            let mut rendered = 0;
            while rendered < total {
                let frames = (total - rendered).min(RENDER_BLOCK_FRAMES);
                let produced = mixer.mix_to_buffer(&mut buffer, frames);
                for &sample in &buffer[..produced * 2] {
                    writer.write_sample(sample)?;
                }
                rendered += produced;
                if produced < frames {
                    break;
                }
            }
            writer.finalize()?;

            info!(
                output = ?output,
                frames = rendered,
                duration_ms = rendered as u64 * 1000 / config.sample_rate() as u64,
                "Render complete"
            );
        }
    }

    Ok(())
}
