//! Stylized spectrum bars.
//!
//! Heights are not derived from the audio signal. They follow a sine sweep
//! keyed on playback progress, with a little noise, and fall back slowly
//! like a level meter.

use crate::model::{Bar, ColorTier, PlaybackPosition, VisualizerFrame};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

pub const MAX_HEIGHT: f64 = 100.0;

#[derive(Debug, Clone)]
pub struct VisualizationSampler {
    heights: Vec<f64>,
    decay_rate: f64,
    noise_amplitude: i32,
    rng: SmallRng,
}

impl VisualizationSampler {
    pub fn new(bar_count: usize, decay_rate: f64, noise_amplitude: i32, rng: SmallRng) -> Self {
        Self {
            heights: vec![0.0; bar_count],
            decay_rate: decay_rate.max(0.0),
            noise_amplitude: noise_amplitude.saturating_abs().min(MAX_HEIGHT as i32),
            rng,
        }
    }

    pub fn seeded(bar_count: usize, decay_rate: f64, noise_amplitude: i32, seed: u64) -> Self {
        Self::new(
            bar_count,
            decay_rate,
            noise_amplitude,
            SmallRng::seed_from_u64(seed),
        )
    }

    /// Advances one frame. `playing` is `None` while nothing plays, which
    /// drives every target to 0.
    pub fn tick(&mut self, playing: Option<PlaybackPosition>) -> VisualizerFrame {
        let targets = self.targets(playing);
        let decay = self.decay_rate * MAX_HEIGHT;

        for (current, target) in self.heights.iter_mut().zip(targets) {
            if target > *current {
                *current = target;
            } else {
                *current = (*current - decay).max(0.0);
            }
        }

        VisualizerFrame {
            bars: self
                .heights
                .iter()
                .map(|&height| Bar {
                    height,
                    tier: ColorTier::for_height(height),
                })
                .collect(),
        }
    }

    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    fn targets(&mut self, playing: Option<PlaybackPosition>) -> Vec<f64> {
        let Some(position) = playing else {
            return vec![0.0; self.heights.len()];
        };

        let progress = position.elapsed / position.total.max(1.0);
        (0..self.heights.len())
            .map(|bar| {
                let noise = self
                    .rng
                    .random_range(-self.noise_amplitude..=self.noise_amplitude);
                (base_height(progress, bar) + f64::from(noise)).clamp(0.0, MAX_HEIGHT)
            })
            .collect()
    }
}

pub fn base_height(progress: f64, bar: usize) -> f64 {
    20.0 + 60.0 * (progress * TAU + bar as f64 / 5.0).sin().abs()
}
