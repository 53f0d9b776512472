use rodio::Source;
use std::f32::consts::PI;
use std::time::Duration;

use super::ChimeKind;

const SAMPLE_RATE: u32 = 44100;
const CHIME_SECONDS: f32 = 1.6;

/// Synthesized session chime: two sine partials under an exponential decay
/// envelope, so it rings like a small bell instead of beeping.
pub struct ChimeTone {
    fundamental: f32,
    partial: f32,
    num_sample: usize,
    total_samples: usize,
}

impl ChimeTone {
    pub fn new(kind: ChimeKind) -> Self {
        // Start rises, end settles.
        let (fundamental, partial) = match kind {
            ChimeKind::SessionStart => (523.25, 784.0),
            ChimeKind::SessionEnd => (392.0, 523.25),
        };
        Self {
            fundamental,
            partial,
            num_sample: 0,
            total_samples: (SAMPLE_RATE as f32 * CHIME_SECONDS) as usize,
        }
    }
}

impl Iterator for ChimeTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.num_sample >= self.total_samples {
            return None;
        }
        let t = self.num_sample as f32 / SAMPLE_RATE as f32;
        self.num_sample += 1;

        let envelope = (-3.5 * t).exp();
        let tone = (2.0 * PI * self.fundamental * t).sin() * 0.7
            + (2.0 * PI * self.partial * t).sin() * 0.3;

        Some(tone * envelope * 0.25)
    }
}

impl Source for ChimeTone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples - self.num_sample)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f32(CHIME_SECONDS))
    }
}
