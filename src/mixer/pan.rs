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
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Pan value that places a voice in the middle of the stereo field.
pub const PAN_CENTER: u8 = 128;

/// Maps a voice's volume and pan to per-channel gains (0-255).
///
/// Content authored for one law sounds wrong under the other, so the law is
/// chosen once per mixer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanningLaw {
    /// Center splits the volume evenly between both channels.
    Legacy,
    /// Center plays at full volume on both channels; the opposite channel
    /// tapers linearly as the pan moves to an extreme.
    #[default]
    Centered,
}

impl PanningLaw {
    /// Returns the (left, right) gains for the given volume and pan.
    pub fn gains(self, volume: u8, pan: u8) -> (i32, i32) {
        let volume = volume as i32;
        let pan = pan as i32;
        let center = PAN_CENTER as i32;

        match self {
            PanningLaw::Legacy => (volume * (255 - pan) / 255, volume * pan / 255),
            PanningLaw::Centered => {
                if pan <= center {
                    (volume, volume * pan / center)
                } else {
                    (volume * (255 - pan) / (255 - center), volume)
                }
            }
        }
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            PanningLaw::Legacy => "legacy",
            PanningLaw::Centered => "centered",
        }
    }
}

impl FromStr for PanningLaw {
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s {
            "legacy" | "Legacy" => Ok(PanningLaw::Legacy),
            "centered" | "Centered" => Ok(PanningLaw::Centered),
            _ => Err(format!("Unsupported panning law: {}", s).into()),
        }
    }

    type Err = Box<dyn Error>;
}

impl fmt::Display for PanningLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_law() {
        let law = PanningLaw::Centered;
        assert_eq!(law.gains(255, PAN_CENTER), (255, 255));
        assert_eq!(law.gains(255, 0), (255, 0));
        assert_eq!(law.gains(255, 255), (0, 255));
        assert_eq!(law.gains(200, 64), (200, 100));
        assert_eq!(law.gains(0, 30), (0, 0));
    }

    #[test]
    fn test_legacy_law() {
        let law = PanningLaw::Legacy;
        let (left, right) = law.gains(255, PAN_CENTER);
        assert_eq!((left, right), (127, 128));
        assert_eq!(law.gains(255, 0), (255, 0));
        assert_eq!(law.gains(255, 255), (0, 255));
    }

    #[test]
    fn test_gains_never_exceed_volume() {
        for law in [PanningLaw::Legacy, PanningLaw::Centered] {
            for pan in 0..=255u8 {
                let (left, right) = law.gains(180, pan);
                assert!((0..=180).contains(&left), "{} pan {}", law, pan);
                assert!((0..=180).contains(&right), "{} pan {}", law, pan);
            }
        }
    }

    #[test]
    fn test_panning_law_from_str() {
        assert_eq!(
            PanningLaw::from_str("legacy").unwrap(),
            PanningLaw::Legacy
        );
        assert_eq!(
            PanningLaw::from_str("Centered").unwrap(),
            PanningLaw::Centered
        );
        assert!(PanningLaw::from_str("equal-power").is_err());
        assert_eq!(PanningLaw::default().to_string(), "centered");
    }
}
