//! Text decal rasterization.
//!
//! The render loop only needs a fixed-size RGBA buffer with the label drawn
//! in white; how the glyphs get there is behind [`TextDecalSource`].

use std::path::{Path, PathBuf};

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use image::{Rgba, RgbaImage};

use crate::types::{DECAL_HEIGHT, DECAL_WIDTH};

/// Pixel size of the label glyphs.
pub const DECAL_FONT_SIZE: f32 = 192.0;

/// Bold sans-serif faces probed when no font is configured.
pub const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/noto/NotoSans-Bold.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum DecalError {
    #[error("no usable font found (tried {tried} candidate paths); pass --font")]
    NoFont { tried: usize },
    #[error("failed to read font {path}: {source}")]
    ReadFont {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {reason}")]
    ParseFont { path: PathBuf, reason: String },
    #[error("decal must be {expected_width}x{expected_height}, got {width}x{height}")]
    Size {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
}

/// Fixed-size RGBA8 pixel buffer holding the rasterized label.
#[derive(Debug, Clone)]
pub struct DecalImage {
    pixels: RgbaImage,
}

impl DecalImage {
    /// Wraps a buffer, rejecting anything other than the fixed decal size.
    pub fn from_rgba(pixels: RgbaImage) -> Result<Self, DecalError> {
        let (width, height) = pixels.dimensions();
        if width != DECAL_WIDTH || height != DECAL_HEIGHT {
            return Err(DecalError::Size {
                expected_width: DECAL_WIDTH,
                expected_height: DECAL_HEIGHT,
                width,
                height,
            });
        }
        Ok(Self { pixels })
    }

    /// Fully transparent decal; the composite pass leaves the backdrop untouched.
    pub fn blank() -> Self {
        Self {
            pixels: RgbaImage::new(DECAL_WIDTH, DECAL_HEIGHT),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }
}

/// Produces the label buffer consumed by the render loop.
pub trait TextDecalSource {
    fn rasterize(&self, text: &str) -> Result<DecalImage, DecalError>;
}

/// Rasterizes labels with `fontdue`, centred horizontally with the baseline
/// half a font size below the middle row.
pub struct FontDecalSource {
    font: fontdue::Font,
    size: f32,
}

impl FontDecalSource {
    pub fn from_bytes(bytes: &[u8], origin: &Path) -> Result<Self, DecalError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
            |reason| DecalError::ParseFont {
                path: origin.to_path_buf(),
                reason: reason.to_string(),
            },
        )?;
        Ok(Self {
            font,
            size: DECAL_FONT_SIZE,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, DecalError> {
        let bytes = std::fs::read(path).map_err(|source| DecalError::ReadFont {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, path)
    }

    /// Loads `explicit` when given, otherwise the first readable entry of [`FONT_CANDIDATES`].
    pub fn discover(explicit: Option<&Path>) -> Result<Self, DecalError> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::from_path(path) {
                Ok(source) => {
                    tracing::debug!(font = %path.display(), "using system font for decal");
                    return Ok(source);
                }
                Err(err) => {
                    tracing::warn!(font = %path.display(), error = %err, "skipping unusable font");
                }
            }
        }

        Err(DecalError::NoFont {
            tried: FONT_CANDIDATES.len(),
        })
    }
}

impl TextDecalSource for FontDecalSource {
    fn rasterize(&self, text: &str) -> Result<DecalImage, DecalError> {
        let mut pixels = RgbaImage::new(DECAL_WIDTH, DECAL_HEIGHT);

        let ascent = self
            .font
            .horizontal_line_metrics(self.size)
            .map(|metrics| metrics.ascent)
            .unwrap_or(self.size);
        let baseline = DECAL_HEIGHT as f32 / 2.0 + self.size / 2.0;

        let mut layout: Layout<()> = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings {
            y: baseline - ascent,
            ..LayoutSettings::default()
        });
        layout.append(&[&self.font], &TextStyle::new(text, self.size, 0));

        let glyphs = layout.glyphs();
        let left = glyphs
            .iter()
            .filter(|glyph| glyph.width > 0)
            .map(|glyph| glyph.x)
            .fold(f32::INFINITY, f32::min);
        let right = glyphs
            .iter()
            .filter(|glyph| glyph.width > 0)
            .map(|glyph| glyph.x + glyph.width as f32)
            .fold(f32::NEG_INFINITY, f32::max);
        if !left.is_finite() || !right.is_finite() {
            tracing::warn!(text, "label produced no visible glyphs");
            return DecalImage::from_rgba(pixels);
        }
        let shift = (DECAL_WIDTH as f32 - (right - left)) / 2.0 - left;

        for glyph in glyphs {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let (metrics, coverage) = self.font.rasterize_config(glyph.key);
            blit_coverage(
                &mut pixels,
                (glyph.x + shift).round() as i64,
                glyph.y.round() as i64,
                metrics.width,
                &coverage,
            );
        }

        DecalImage::from_rgba(pixels)
    }
}

/// Writes a coverage bitmap as white pixels with coverage in alpha, clipping
/// at the buffer edges. Overlapping glyphs keep the stronger coverage.
pub(crate) fn blit_coverage(
    target: &mut RgbaImage,
    origin_x: i64,
    origin_y: i64,
    width: usize,
    coverage: &[u8],
) {
    if width == 0 {
        return;
    }
    let (target_width, target_height) = (target.width() as i64, target.height() as i64);
    for (row_index, row) in coverage.chunks(width).enumerate() {
        let y = origin_y + row_index as i64;
        if y < 0 || y >= target_height {
            continue;
        }
        for (column, &alpha) in row.iter().enumerate() {
            let x = origin_x + column as i64;
            if x < 0 || x >= target_width || alpha == 0 {
                continue;
            }
            let pixel = target.get_pixel_mut(x as u32, y as u32);
            let merged = pixel.0[3].max(alpha);
            *pixel = Rgba([255, 255, 255, merged]);
        }
    }
}
