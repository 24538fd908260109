use palette::{FromColor, Hsl, Srgb, Srgba, WithAlpha};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Minimum hue distance between two consecutive generated fills.
pub const MIN_HUE_DISTANCE: f64 = 20.0;
pub const FILL_SATURATION: f64 = 0.66;
pub const FILL_LIGHTNESS: f64 = 0.58;

/// Hands out slice colors, avoiding similar hues back to back. Each menu
/// owns one, so menus do not disturb each other's sequence.
#[derive(Debug, Clone)]
pub struct FillGenerator {
    rng: StdRng,
    last_hue: f64,
}

impl Default for FillGenerator {
    fn default() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }
}

impl FillGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self { rng, last_hue: 0.0 }
    }

    pub fn last_hue(&self) -> f64 {
        self.last_hue
    }

    pub fn next_hue(&mut self) -> f64 {
        let mut hue = f64::from(self.rng.random_range(0..360u16));
        while hue_distance(hue, self.last_hue) < MIN_HUE_DISTANCE {
            hue = f64::from(self.rng.random_range(0..360u16));
        }
        self.last_hue = hue;
        hue
    }

    pub fn next_fill(&mut self) -> Srgba<f64> {
        let hsl: Hsl<palette::encoding::Srgb, f64> =
            Hsl::new(self.next_hue(), FILL_SATURATION, FILL_LIGHTNESS);
        Srgb::<f64>::from_color(hsl).with_alpha(1.0)
    }
}

/// Distance between two hues in degrees, going the short way round.
pub fn hue_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
