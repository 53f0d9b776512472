//! Looping ambient beds, all synthesized from noise so the binary ships no
//! audio assets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rodio::Source;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AmbientSound {
    OceanSwell,
    SoftRain,
    WarmNoise,
}

impl AmbientSound {
    pub fn display_name(&self) -> &'static str {
        match self {
            AmbientSound::OceanSwell => "Ocean Swell",
            AmbientSound::SoftRain => "Soft Rain",
            AmbientSound::WarmNoise => "Warm Noise",
        }
    }
}

/// Low rumble: white noise through a leaky integrator. Clamped and slowly
/// bled off so the integral cannot drift into DC offset.
pub struct WarmNoise {
    level: f32,
    rng: StdRng,
}

impl WarmNoise {
    pub fn new() -> Self {
        Self {
            level: 0.0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for WarmNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for WarmNoise {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.level = (self.level + white * 0.035).clamp(-1.0, 1.0) * 0.9995;
        Some(self.level * 0.28)
    }
}

impl Source for WarmNoise {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Steady hiss with sparse droplet transients riding on top.
pub struct SoftRain {
    droplet: f32,
    rng: StdRng,
}

impl SoftRain {
    pub fn new() -> Self {
        Self {
            droplet: 0.0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for SoftRain {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for SoftRain {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let hiss: f32 = self.rng.gen_range(-1.0..1.0) * 0.06;

        // A few hundred droplets per second, each decaying fast.
        if self.rng.gen::<f32>() < 0.006 {
            self.droplet = self.rng.gen_range(0.3..1.0);
        }
        self.droplet *= 0.994;

        let patter: f32 = self.rng.gen_range(-1.0..1.0) * self.droplet * 0.2;
        Some(hiss + patter)
    }
}

impl Source for SoftRain {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Rumbling noise under a slow amplitude swell, about one wave each twelve
/// seconds.
pub struct OceanSwell {
    level: f32,
    num_sample: usize,
    rng: StdRng,
}

const SWELL_HZ: f32 = 0.085;

impl OceanSwell {
    pub fn new() -> Self {
        Self {
            level: 0.0,
            num_sample: 0,
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for OceanSwell {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for OceanSwell {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let white: f32 = self.rng.gen_range(-1.0..1.0);
        self.level = (self.level + white * 0.03).clamp(-1.0, 1.0) * 0.9996;

        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample = self.num_sample.wrapping_add(1);
        let swell = 0.55 + 0.45 * (2.0 * PI * SWELL_HZ * t).sin();

        Some(self.level * swell * 0.3)
    }
}

impl Source for OceanSwell {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generators_stay_within_unit_amplitude() {
        for sample in WarmNoise::new().take(44100) {
            assert!(sample.abs() <= 1.0);
        }
        for sample in SoftRain::new().take(44100) {
            assert!(sample.abs() <= 1.0);
        }
        for sample in OceanSwell::new().take(44100) {
            assert!(sample.abs() <= 1.0);
        }
    }

    #[test]
    fn generators_are_endless() {
        assert!(WarmNoise::new().total_duration().is_none());
        assert!(SoftRain::new().total_duration().is_none());
        assert!(OceanSwell::new().total_duration().is_none());
    }
}
