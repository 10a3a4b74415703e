use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lightness of the backdrop's background colour.
pub const BACKGROUND_LIGHTNESS: f32 = 0.1;
/// Lightness of the backdrop's cloud colour.
pub const FOREGROUND_LIGHTNESS: f32 = 0.7;

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

/// Converts hue, saturation and lightness (all in `[0, 1]`) to RGB.
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s == 0.0 {
        return [l, l, l];
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    [
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    ]
}

/// The two colours the backdrop bands between; fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: [f32; 3],
    pub foreground: [f32; 3],
}

impl Palette {
    /// Draws hue and saturation for both colours from `rng`.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let background = hsl_to_rgb(rng.gen(), rng.gen(), BACKGROUND_LIGHTNESS);
        let foreground = hsl_to_rgb(rng.gen(), rng.gen(), FOREGROUND_LIGHTNESS);
        Self {
            background,
            foreground,
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::generate(&mut StdRng::seed_from_u64(seed)),
            None => Self::generate(&mut rand::thread_rng()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn achromatic_input_ignores_hue() {
        for hue in [0.0, 0.25, 0.5, 0.99] {
            assert_eq!(hsl_to_rgb(hue, 0.0, 0.4), [0.4, 0.4, 0.4]);
        }
    }

    #[test]
    fn pure_red_at_half_lightness() {
        assert!(approx(hsl_to_rgb(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
    }

    #[test]
    fn primary_hues_map_to_primaries() {
        assert!(approx(hsl_to_rgb(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
        assert!(approx(hsl_to_rgb(2.0 / 3.0, 1.0, 0.5), [0.0, 0.0, 1.0]));
    }

    #[test]
    fn seeded_palette_is_reproducible() {
        assert_eq!(Palette::from_seed(Some(42)), Palette::from_seed(Some(42)));
    }

    #[test]
    fn palette_respects_lightness_bounds() {
        let palette = Palette::from_seed(Some(7));
        // Lightness is (max + min) / 2 for any saturation.
        let lightness = |rgb: [f32; 3]| {
            let max = rgb.iter().cloned().fold(f32::MIN, f32::max);
            let min = rgb.iter().cloned().fold(f32::MAX, f32::min);
            (max + min) / 2.0
        };
        assert!((lightness(palette.background) - BACKGROUND_LIGHTNESS).abs() < 1e-5);
        assert!((lightness(palette.foreground) - FOREGROUND_LIGHTNESS).abs() < 1e-5);
    }
}
