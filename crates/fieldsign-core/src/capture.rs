//! Signature capture: drawn, typed, or uploaded
//!
//! All three modes normalize to a single [`SignatureAsset`] consumed by the
//! compositor. Modes are mutually exclusive; switching discards whatever the
//! previous mode had captured.

use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use serde::{Deserialize, Serialize};

use crate::error::FieldsignError;

/// Offscreen capture surface size in pixels
pub const PAD_WIDTH: u32 = 400;
pub const PAD_HEIGHT: u32 = 150;

/// Typed signatures render at this size, vertically centered
const TYPED_FONT_SIZE: f32 = 32.0;

const STROKE_RADIUS: f64 = 1.0;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    Drawn,
    Typed,
    Uploaded,
}

/// The raster handed to the compositor: PNG or JPEG bytes plus provenance
#[derive(Debug, Clone)]
pub struct SignatureAsset {
    pub bytes: Vec<u8>,
    pub mode: CaptureMode,
}

impl SignatureAsset {
    pub fn is_png(&self) -> bool {
        self.bytes.starts_with(&PNG_MAGIC)
    }

    pub fn is_jpeg(&self) -> bool {
        self.bytes.starts_with(&JPEG_MAGIC)
    }
}

/// A script-style face used to render typed signatures
pub struct ScriptFace {
    font: Font<'static>,
}

impl ScriptFace {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FieldsignError> {
        let font = Font::try_from_vec(bytes).ok_or(FieldsignError::FontUnavailable)?;
        Ok(Self { font })
    }
}

#[derive(Debug)]
enum ModeState {
    Drawn {
        surface: RgbaImage,
        last: Option<(f64, f64)>,
    },
    Typed {
        text: String,
    },
    Uploaded {
        bytes: Option<Vec<u8>>,
    },
}

impl ModeState {
    fn fresh(mode: CaptureMode) -> Self {
        match mode {
            CaptureMode::Drawn => ModeState::Drawn {
                surface: RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BACKGROUND),
                last: None,
            },
            CaptureMode::Typed => ModeState::Typed {
                text: String::new(),
            },
            CaptureMode::Uploaded => ModeState::Uploaded { bytes: None },
        }
    }

    fn mode(&self) -> CaptureMode {
        match self {
            ModeState::Drawn { .. } => CaptureMode::Drawn,
            ModeState::Typed { .. } => CaptureMode::Typed,
            ModeState::Uploaded { .. } => CaptureMode::Uploaded,
        }
    }
}

/// Capture state machine for one signing session
pub struct SignatureCapture {
    state: ModeState,
    face: Option<ScriptFace>,
}

impl Default for SignatureCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureCapture {
    pub fn new() -> Self {
        Self {
            state: ModeState::fresh(CaptureMode::Drawn),
            face: None,
        }
    }

    /// Attach the face used to render typed signatures
    pub fn with_script_face(mut self, face: ScriptFace) -> Self {
        self.face = Some(face);
        self
    }

    pub fn mode(&self) -> CaptureMode {
        self.state.mode()
    }

    /// Switch capture modes, discarding the previous mode's state.
    /// Re-selecting the current mode keeps it.
    pub fn set_mode(&mut self, mode: CaptureMode) {
        if self.state.mode() != mode {
            self.state = ModeState::fresh(mode);
        }
    }

    /// Reset the current mode to its blank state
    pub fn clear(&mut self) {
        self.state = ModeState::fresh(self.state.mode());
    }

    /// Begin a freehand stroke at a surface position (drawn mode only)
    pub fn stroke_begin(&mut self, x: f64, y: f64) {
        if let ModeState::Drawn { surface, last } = &mut self.state {
            stamp(surface, x, y);
            *last = Some((x, y));
        }
    }

    /// Extend the current stroke to a new position
    pub fn stroke_to(&mut self, x: f64, y: f64) {
        if let ModeState::Drawn { surface, last } = &mut self.state {
            if let Some((lx, ly)) = *last {
                draw_segment(surface, lx, ly, x, y);
                *last = Some((x, y));
            }
        }
    }

    /// End the current stroke (pointer-up or leave)
    pub fn stroke_end(&mut self) {
        if let ModeState::Drawn { last, .. } = &mut self.state {
            *last = None;
        }
    }

    /// Set the typed signature text (typed mode only)
    pub fn set_text(&mut self, value: &str) {
        if let ModeState::Typed { text } = &mut self.state {
            *text = value.to_string();
        }
    }

    /// Provide an uploaded image file (uploaded mode only)
    pub fn set_uploaded(&mut self, data: Vec<u8>) {
        if let ModeState::Uploaded { bytes } = &mut self.state {
            *bytes = Some(data);
        }
    }

    /// True when the current mode holds a usable signature
    pub fn is_valid(&self) -> bool {
        match &self.state {
            ModeState::Drawn { surface, .. } => {
                surface.pixels().any(|p| *p != BACKGROUND)
            }
            ModeState::Typed { text } => !text.trim().is_empty(),
            ModeState::Uploaded { bytes } => bytes.is_some(),
        }
    }

    /// Normalize the captured state into the single submission asset
    pub fn finalize(&self) -> Result<SignatureAsset, FieldsignError> {
        match &self.state {
            ModeState::Drawn { surface, .. } => {
                if !self.is_valid() {
                    return Err(FieldsignError::EmptySignature);
                }
                Ok(SignatureAsset {
                    bytes: encode_png(surface)?,
                    mode: CaptureMode::Drawn,
                })
            }
            ModeState::Typed { text } => {
                if text.trim().is_empty() {
                    return Err(FieldsignError::EmptySignature);
                }
                let face = self.face.as_ref().ok_or(FieldsignError::FontUnavailable)?;
                let surface = render_typed(text.trim(), &face.font);
                Ok(SignatureAsset {
                    bytes: encode_png(&surface)?,
                    mode: CaptureMode::Typed,
                })
            }
            ModeState::Uploaded { bytes } => {
                let bytes = bytes.clone().ok_or(FieldsignError::EmptySignature)?;
                Ok(SignatureAsset {
                    bytes,
                    mode: CaptureMode::Uploaded,
                })
            }
        }
    }
}

fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>, FieldsignError> {
    let mut cursor = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(surface.clone())
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| FieldsignError::OperationError(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Stamp a round pen tip at one position
fn stamp(surface: &mut RgbaImage, x: f64, y: f64) {
    let r = STROKE_RADIUS;
    let (w, h) = (surface.width() as i64, surface.height() as i64);
    for py in (ifloor(y - r))..=(ifloor(y + r)) {
        for px in (ifloor(x - r))..=(ifloor(x + r)) {
            if px < 0 || py < 0 || px >= w || py >= h {
                continue;
            }
            let dx = px as f64 + 0.5 - x;
            let dy = py as f64 + 0.5 - y;
            if dx * dx + dy * dy <= (r + 0.5) * (r + 0.5) {
                surface.put_pixel(px as u32, py as u32, INK);
            }
        }
    }
}

fn ifloor(v: f64) -> i64 {
    v.floor() as i64
}

/// Draw a line segment by stamping the pen along it
fn draw_segment(surface: &mut RgbaImage, x0: f64, y0: f64, x1: f64, y1: f64) {
    let dist = ((x1 - x0).powi(2) + (y1 - y0).powi(2)).sqrt();
    let steps = (dist * 2.0).ceil().max(1.0) as u32;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        stamp(surface, x0 + (x1 - x0) * t, y0 + (y1 - y0) * t);
    }
}

/// Lay the text out in the script face, centered on a fresh surface
fn render_typed(text: &str, font: &Font<'static>) -> RgbaImage {
    let mut surface = RgbaImage::from_pixel(PAD_WIDTH, PAD_HEIGHT, BACKGROUND);
    let scale = Scale::uniform(TYPED_FONT_SIZE);
    let v_metrics = font.v_metrics(scale);

    let glyphs: Vec<_> = font.layout(text, scale, point(0.0, 0.0)).collect();
    let text_width = glyphs
        .iter()
        .filter_map(|g| g.pixel_bounding_box().map(|bb| bb.max.x))
        .max()
        .unwrap_or(0) as f32;

    let offset_x = ((PAD_WIDTH as f32 - text_width) / 2.0).max(0.0);
    let baseline = PAD_HEIGHT as f32 / 2.0 + (v_metrics.ascent + v_metrics.descent) / 2.0;

    for glyph in font.layout(text, scale, point(offset_x, baseline)) {
        if let Some(bb) = glyph.pixel_bounding_box() {
            glyph.draw(|gx, gy, coverage| {
                let px = bb.min.x + gx as i32;
                let py = bb.min.y + gy as i32;
                if px >= 0 && py >= 0 && (px as u32) < PAD_WIDTH && (py as u32) < PAD_HEIGHT {
                    let bg = surface.get_pixel(px as u32, py as u32);
                    let mut out = *bg;
                    for i in 0..3 {
                        out[i] = (INK[i] as f32 * coverage + bg[i] as f32 * (1.0 - coverage))
                            .round() as u8;
                    }
                    surface.put_pixel(px as u32, py as u32, out);
                }
            });
        }
    }
    surface
}
