use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, SurfaceError};

/// Fully transparent RGBA, the canonical form written for `PixelColor::Transparent`.
pub const TRANSPARENT_RGBA: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// PIXEL COLOR
// ============================================================================

/// Color of a single canvas pixel as seen by change records.
///
/// Every alpha-0 pixel reads as `Transparent` regardless of its RGB channels.
/// Opaque pixels are `Rgb`; translucent ones (only ever produced by imported
/// buffers, the editor itself paints opaque) keep their alpha in `Rgba`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PixelColor {
    #[default]
    Transparent,
    Rgb([u8; 3]),
    Rgba([u8; 4]),
}

impl PixelColor {
    pub const BLACK: PixelColor = PixelColor::Rgb([0, 0, 0]);
    pub const WHITE: PixelColor = PixelColor::Rgb([255, 255, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        PixelColor::Rgb([r, g, b])
    }

    pub fn from_rgba(px: Rgba<u8>) -> Self {
        let [r, g, b, a] = px.0;
        match a {
            0 => PixelColor::Transparent,
            255 => PixelColor::Rgb([r, g, b]),
            _ => PixelColor::Rgba([r, g, b, a]),
        }
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        match self {
            PixelColor::Transparent => TRANSPARENT_RGBA,
            PixelColor::Rgb([r, g, b]) => Rgba([r, g, b, 255]),
            PixelColor::Rgba([r, g, b, a]) => Rgba([r, g, b, a]),
        }
    }

    pub fn is_transparent(self) -> bool {
        matches!(self, PixelColor::Transparent)
    }
}

impl fmt::Display for PixelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelColor::Transparent => f.write_str("transparent"),
            PixelColor::Rgb([r, g, b]) => write!(f, "#{:02x}{:02x}{:02x}", r, g, b),
            PixelColor::Rgba([r, g, b, a]) => {
                write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
            }
        }
    }
}

impl FromStr for PixelColor {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("transparent") {
            return Ok(PixelColor::Transparent);
        }
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return Err(SurfaceError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| SurfaceError::InvalidColor(s.to_string()))
        };
        let r = channel(0)?;
        let g = channel(1)?;
        let b = channel(2)?;
        let a = if hex.len() == 8 { channel(3)? } else { 255 };
        Ok(PixelColor::from_rgba(Rgba([r, g, b, a])))
    }
}

impl From<PixelColor> for String {
    fn from(color: PixelColor) -> Self {
        color.to_string()
    }
}

impl TryFrom<String> for PixelColor {
    type Error = SurfaceError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

// ============================================================================
// PIXEL EDIT
// ============================================================================

/// One real pixel change. Never constructed with `old_color == new_color`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelEdit {
    pub x: u32,
    pub y: u32,
    pub old_color: PixelColor,
    pub new_color: PixelColor,
}

impl PixelEdit {
    /// The same change in the opposite direction.
    pub fn inverted(&self) -> Self {
        Self {
            x: self.x,
            y: self.y,
            old_color: self.new_color,
            new_color: self.old_color,
        }
    }
}

// ============================================================================
// LAYERS & FRAMES
// ============================================================================

/// Arena address of a layer inside a project: frame index, then layer index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerAddress {
    pub frame: usize,
    pub layer: usize,
}

impl LayerAddress {
    pub const fn new(frame: usize, layer: usize) -> Self {
        Self { frame, layer }
    }
}

/// Stable identity of a layer. Survives inserting, deleting and reordering
/// its neighbours; duplicates get a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A layer as recorded by the change tracker: where it was at record time,
/// and which layer it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerTarget {
    pub address: LayerAddress,
    pub id: LayerId,
}

#[derive(Clone, Debug)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub visible: bool,
    pub pixels: RgbaImage,
}

impl Layer {
    /// Blank (fully transparent) layer.
    pub fn new(name: String, width: u32, height: u32) -> Self {
        Self {
            id: LayerId::new(),
            name,
            visible: true,
            pixels: RgbaImage::from_pixel(width, height, TRANSPARENT_RGBA),
        }
    }

    /// Rebuild a layer from its canonical flat form: `width*height*4` bytes,
    /// row-major, top-to-bottom, R,G,B,A per pixel.
    pub fn from_rgba_bytes(name: String, width: u32, height: u32, bytes: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SurfaceError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        let actual = bytes.len();
        if actual != expected {
            return Err(SurfaceError::BufferSize {
                width,
                height,
                expected,
                actual,
            });
        }
        let pixels = RgbaImage::from_raw(width, height, bytes).ok_or(SurfaceError::BufferSize {
            width,
            height,
            expected,
            actual,
        })?;
        Ok(Self {
            id: LayerId::new(),
            name,
            visible: true,
            pixels,
        })
    }

    /// Canonical flat RGBA bytes of this layer.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.pixels.as_raw().clone()
    }

    /// Clone the content into a new, visible layer with another name.
    pub fn duplicate(&self, name: String) -> Self {
        Self {
            id: LayerId::new(),
            name,
            visible: true,
            pixels: self.pixels.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Color at `(x, y)`, `None` outside the buffer.
    pub fn color_at(&self, x: u32, y: u32) -> Option<PixelColor> {
        if x < self.width() && y < self.height() {
            Some(PixelColor::from_rgba(*self.pixels.get_pixel(x, y)))
        } else {
            None
        }
    }
}

/// One animation frame: layers in render order (later = on top).
#[derive(Clone, Debug)]
pub struct Frame {
    pub layers: Vec<Layer>,
    /// How long this frame is shown during playback.
    pub duration: Duration,
}

impl Frame {
    /// A frame with a single blank layer.
    pub fn new(width: u32, height: u32, duration: Duration) -> Self {
        Self {
            layers: vec![Layer::new("Layer 1".to_string(), width, height)],
            duration,
        }
    }

    /// Copy of this frame whose layers get fresh ids.
    pub fn duplicate(&self) -> Self {
        Self {
            layers: self
                .layers
                .iter()
                .map(|layer| Layer {
                    id: LayerId::new(),
                    ..layer.clone()
                })
                .collect(),
            duration: self.duration,
        }
    }

    /// Top-most visible, non-transparent color at `(x, y)`.
    pub fn sample(&self, x: u32, y: u32) -> Option<PixelColor> {
        self.layers
            .iter()
            .rev()
            .filter(|layer| layer.visible)
            .filter_map(|layer| layer.color_at(x, y))
            .find(|color| !color.is_transparent())
    }
}
