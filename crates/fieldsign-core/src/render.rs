//! Page render pipeline with race-free cancellation
//!
//! Every trigger (initial load, page change, container resize) cancels the
//! in-flight render before issuing a new one. Cancellation is enforced with
//! a monotonically increasing generation counter on the pipeline rather than
//! state captured by callbacks: a completion that carries a stale generation
//! is a no-op even if it arrives after a newer task has started, so stale
//! rasters never paint.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::error::FieldsignError;

/// Raster output of one page render, RGBA8
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Page rotation metadata, degrees clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    /// Normalize a PDF /Rotate value (any multiple of 90, possibly negative)
    pub fn from_degrees(degrees: i64) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Quarter,
            180 => Rotation::Half,
            270 => Rotation::ThreeQuarter,
            _ => Rotation::None,
        }
    }

    /// True when the rotation swaps the page's visual width and height
    pub fn swaps_axes(&self) -> bool {
        matches!(self, Rotation::Quarter | Rotation::ThreeQuarter)
    }
}

/// Target canvas geometry for one render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub rotation: Rotation,
}

impl Viewport {
    /// Fit a page into a container at the given device pixel ratio.
    ///
    /// `scale = min(container_w / page_w, container_h / page_h) * dpr`,
    /// where the page dimensions are the rotated ones, so the canvas matches
    /// what the viewer shows and the fractional overlay still lines up.
    pub fn fit(
        container_width: f64,
        container_height: f64,
        page_width: f64,
        page_height: f64,
        rotation: Rotation,
        device_pixel_ratio: f64,
    ) -> Viewport {
        let (pw, ph) = if rotation.swaps_axes() {
            (page_height, page_width)
        } else {
            (page_width, page_height)
        };
        let scale = (container_width / pw).min(container_height / ph) * device_pixel_ratio;
        Viewport {
            width: (pw * scale).round().max(1.0) as u32,
            height: (ph * scale).round().max(1.0) as u32,
            scale,
            rotation,
        }
    }
}

/// Rendering backend contract. Implementations must be deterministic for a
/// given (bytes, page, viewport) and should poll the cancel flag between
/// expensive steps.
pub trait PageRasterizer {
    fn render(
        &self,
        bytes: &[u8],
        page_index: u32,
        viewport: &Viewport,
        cancel: &CancelFlag,
    ) -> Result<Raster, FieldsignError>;
}

/// Shared cancellation flag handed to the rasterizer
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Owned handle to one issued render task
#[derive(Debug, Clone)]
pub struct RenderTask {
    generation: u64,
    cancel: CancelFlag,
}

impl RenderTask {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Rendering,
    Completed,
    Cancelled,
    Failed,
}

/// Controller enforcing at most one live render per canvas
#[derive(Debug, Default)]
pub struct RenderPipeline {
    generation: u64,
    state: RenderState,
    active: Option<CancelFlag>,
}

impl RenderPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Issue a new render task, cancelling the in-flight one first
    pub fn begin(&mut self) -> RenderTask {
        if let Some(active) = self.active.take() {
            active.cancel();
            self.state = RenderState::Cancelled;
        }
        self.generation += 1;
        let cancel = CancelFlag::default();
        self.active = Some(cancel.clone());
        self.state = RenderState::Rendering;
        RenderTask {
            generation: self.generation,
            cancel,
        }
    }

    /// Deliver a finished raster for a task.
    ///
    /// Returns the raster only when the task is still the current one; a
    /// stale or cancelled completion returns `None` and leaves the pipeline
    /// untouched.
    pub fn complete(&mut self, task: &RenderTask, raster: Raster) -> Option<Raster> {
        if task.generation != self.generation || task.is_cancelled() {
            return None;
        }
        self.active = None;
        self.state = RenderState::Completed;
        Some(raster)
    }

    /// Record a failed render for the current task; stale failures are no-ops
    pub fn fail(&mut self, task: &RenderTask) -> bool {
        if task.generation != self.generation || task.is_cancelled() {
            return false;
        }
        self.active = None;
        self.state = RenderState::Failed;
        true
    }
}

/// One viewer's render state: current page, last viewport, live pipeline
#[derive(Debug)]
pub struct RenderSession {
    page: u32,
    page_count: u32,
    viewport: Viewport,
    pipeline: RenderPipeline,
}

impl RenderSession {
    pub fn new(page_count: u32, viewport: Viewport) -> Self {
        Self {
            page: 0,
            page_count,
            viewport,
            pipeline: RenderPipeline::new(),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pipeline(&mut self) -> &mut RenderPipeline {
        &mut self.pipeline
    }

    /// Page-change trigger; clamps to the document and issues a new task
    pub fn go_to_page(&mut self, page: u32) -> RenderTask {
        self.page = page.min(self.page_count.saturating_sub(1));
        self.pipeline.begin()
    }

    /// Resize trigger; recomputes the viewport and issues a new task
    pub fn resize(&mut self, viewport: Viewport) -> RenderTask {
        self.viewport = viewport;
        self.pipeline.begin()
    }

    /// Drive one render to completion against a rasterizer backend.
    ///
    /// A backend failure degrades to the placeholder raster instead of
    /// blocking the workflow. Returns `None` when the task went stale while
    /// rendering (a newer trigger superseded it).
    pub fn render(
        &mut self,
        rasterizer: &dyn PageRasterizer,
        bytes: &[u8],
        task: &RenderTask,
    ) -> Option<Raster> {
        let raster = match rasterizer.render(bytes, self.page, &self.viewport, task.cancel_flag())
        {
            Ok(raster) => raster,
            Err(_) => placeholder_raster(&self.viewport, self.page, self.page_count),
        };
        self.pipeline.complete(task, raster)
    }
}

const PLACEHOLDER_BG: Rgba<u8> = Rgba([255, 255, 255, 255]);
const PLACEHOLDER_BORDER: Rgba<u8> = Rgba([221, 221, 221, 255]);
const PLACEHOLDER_INK: Rgba<u8> = Rgba([68, 68, 68, 255]);

/// Deterministic fallback raster: flat background, border, page-index label
pub fn placeholder_raster(viewport: &Viewport, page_index: u32, page_count: u32) -> Raster {
    let mut img = RgbaImage::from_pixel(viewport.width, viewport.height, PLACEHOLDER_BG);

    let w = viewport.width;
    let h = viewport.height;
    for x in 0..w {
        img.put_pixel(x, 0, PLACEHOLDER_BORDER);
        img.put_pixel(x, h - 1, PLACEHOLDER_BORDER);
    }
    for y in 0..h {
        img.put_pixel(0, y, PLACEHOLDER_BORDER);
        img.put_pixel(w - 1, y, PLACEHOLDER_BORDER);
    }

    // "N / M" label near the top, drawn as segment digits
    let label = format!("{}/{}", page_index + 1, page_count.max(1));
    let glyph_w = (w / 24).clamp(4, 16);
    let glyph_h = glyph_w * 2;
    let total = label.len() as u32 * (glyph_w + glyph_w / 2);
    let mut cx = w.saturating_sub(total) / 2;
    let cy = (h / 12).max(2);
    for ch in label.chars() {
        draw_glyph(&mut img, ch, cx, cy, glyph_w, glyph_h);
        cx += glyph_w + glyph_w / 2;
    }

    Raster {
        width: w,
        height: h,
        pixels: img.into_raw(),
    }
}

/// Seven-segment digit bars: top, top-right, bottom-right, bottom,
/// bottom-left, top-left, middle
const SEGMENTS: [[bool; 7]; 10] = [
    [true, true, true, true, true, true, false],
    [false, true, true, false, false, false, false],
    [true, true, false, true, true, false, true],
    [true, true, true, true, false, false, true],
    [false, true, true, false, false, true, true],
    [true, false, true, true, false, true, true],
    [true, false, true, true, true, true, true],
    [true, true, true, false, false, false, false],
    [true, true, true, true, true, true, true],
    [true, true, true, true, false, true, true],
];

fn draw_glyph(img: &mut RgbaImage, ch: char, x: u32, y: u32, w: u32, h: u32) {
    let Some(digit) = ch.to_digit(10) else {
        // Separator: a single slash-like bar
        fill_rect(img, x + w / 2, y, 1.max(w / 8), h);
        return;
    };
    let seg = SEGMENTS[digit as usize];
    let t = 1.max(w / 8);
    let half = h / 2;
    if seg[0] {
        fill_rect(img, x, y, w, t);
    }
    if seg[1] {
        fill_rect(img, x + w - t, y, t, half);
    }
    if seg[2] {
        fill_rect(img, x + w - t, y + half, t, h - half);
    }
    if seg[3] {
        fill_rect(img, x, y + h - t, w, t);
    }
    if seg[4] {
        fill_rect(img, x, y + half, t, h - half);
    }
    if seg[5] {
        fill_rect(img, x, y, t, half);
    }
    if seg[6] {
        fill_rect(img, x, y + half - t / 2, w, t);
    }
}

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, PLACEHOLDER_INK);
        }
    }
}
