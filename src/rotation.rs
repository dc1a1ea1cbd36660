use crate::library;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artwork {
    Embedded,
    Placeholder,
}

impl Artwork {
    pub fn for_track(path: &Path) -> Self {
        if library::has_embedded_cover(path) {
            Self::Embedded
        } else {
            Self::Placeholder
        }
    }
}

/// Spins the album art while playback runs.
#[derive(Debug, Clone)]
pub struct RotationAnimator {
    angle: f64,
    speed: f64,
    artwork: Option<Artwork>,
}

impl RotationAnimator {
    pub fn new(speed: f64) -> Self {
        Self {
            angle: 0.0,
            speed,
            artwork: None,
        }
    }

    /// Binding any artwork, placeholder included, restarts from 0 degrees.
    pub fn bind(&mut self, artwork: Artwork) {
        self.artwork = Some(artwork);
        self.angle = 0.0;
    }

    /// Returns the new angle, or `None` when the angle did not change.
    pub fn tick(&mut self, playing: bool) -> Option<f64> {
        if !playing || self.artwork.is_none() {
            return None;
        }
        self.angle = (self.angle + self.speed).rem_euclid(360.0);
        Some(self.angle)
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn artwork(&self) -> Option<&Artwork> {
        self.artwork.as_ref()
    }
}
