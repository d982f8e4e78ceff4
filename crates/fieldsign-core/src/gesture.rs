//! Drag and resize gestures over the field list
//!
//! One gesture may be active across the whole field set at a time. State is
//! captured on pointer-down and fully cleared on release, mirroring
//! listeners that are attached for the lifetime of a single gesture.

use crate::coords::FracRect;
use crate::fields::{FieldEditor, FieldId};

/// Minimum field size, as a fraction of the page
pub const MIN_FIELD_SIZE: f64 = 0.02;

/// Corner handle grabbed to resize a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Dragging {
        field: FieldId,
        start_px: (f64, f64),
        origin: (f64, f64),
    },
    Resizing {
        field: FieldId,
        handle: ResizeHandle,
        start_px: (f64, f64),
        rect: FracRect,
    },
}

/// Gesture state machine for one canvas
#[derive(Debug, Clone)]
pub struct GestureController {
    gesture: Gesture,
    canvas_width: f64,
    canvas_height: f64,
}

impl GestureController {
    pub fn new(canvas_width: f64, canvas_height: f64) -> Self {
        Self {
            gesture: Gesture::Idle,
            canvas_width,
            canvas_height,
        }
    }

    /// Update the canvas size on container resize. Fractional field state is
    /// scale independent, only the pixel-delta conversion changes.
    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.canvas_width = width;
        self.canvas_height = height;
    }

    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    /// Begin dragging a field. Ignored (returns false) when another gesture
    /// is already active or the field does not exist.
    pub fn begin_drag(&mut self, editor: &FieldEditor, id: FieldId, px: f64, py: f64) -> bool {
        if self.gesture != Gesture::Idle {
            return false;
        }
        let Some(field) = editor.get_field(id) else {
            return false;
        };
        self.gesture = Gesture::Dragging {
            field: id,
            start_px: (px, py),
            origin: (field.x, field.y),
        };
        true
    }

    /// Begin resizing a field from a corner handle. Ignored while another
    /// gesture is active.
    pub fn begin_resize(
        &mut self,
        editor: &FieldEditor,
        id: FieldId,
        handle: ResizeHandle,
        px: f64,
        py: f64,
    ) -> bool {
        if self.gesture != Gesture::Idle {
            return false;
        }
        let Some(field) = editor.get_field(id) else {
            return false;
        };
        self.gesture = Gesture::Resizing {
            field: id,
            handle,
            start_px: (px, py),
            rect: field.rect(),
        };
        true
    }

    /// Apply a pointer move to the active gesture
    pub fn pointer_move(&mut self, editor: &mut FieldEditor, px: f64, py: f64) {
        let (dx, dy) = match self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging { start_px, .. } | Gesture::Resizing { start_px, .. } => (
                (px - start_px.0) / self.canvas_width,
                (py - start_px.1) / self.canvas_height,
            ),
        };

        match self.gesture {
            Gesture::Dragging { field, origin, .. } => {
                let Some(f) = editor.get_field_mut(field) else {
                    return;
                };
                f.x = (origin.0 + dx).clamp(0.0, 1.0 - f.width);
                f.y = (origin.1 + dy).clamp(0.0, 1.0 - f.height);
            }
            Gesture::Resizing {
                field,
                handle,
                rect,
                ..
            } => {
                let Some(f) = editor.get_field_mut(field) else {
                    return;
                };
                f.set_rect(resize_rect(&rect, handle, dx, dy));
            }
            Gesture::Idle => {}
        }
    }

    /// Release the pointer, ending the gesture (pointer-up or leave)
    pub fn release(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

/// Compute a resized rect: the grabbed corner follows the pointer, the
/// opposite edges stay fixed, and the size floor wins over the delta.
fn resize_rect(rect: &FracRect, handle: ResizeHandle, dx: f64, dy: f64) -> FracRect {
    let right = rect.x + rect.width;
    let bottom = rect.y + rect.height;

    let (mut x, mut width) = match handle {
        ResizeHandle::TopLeft | ResizeHandle::BottomLeft => {
            // Left edge moves, right edge fixed
            let new_x = (rect.x + dx).clamp(0.0, (right - MIN_FIELD_SIZE).max(0.0));
            (new_x, right - new_x)
        }
        ResizeHandle::TopRight | ResizeHandle::BottomRight => {
            let new_right = (right + dx).clamp((rect.x + MIN_FIELD_SIZE).min(1.0), 1.0);
            (rect.x, new_right - rect.x)
        }
    };
    let (mut y, mut height) = match handle {
        ResizeHandle::TopLeft | ResizeHandle::TopRight => {
            // Top edge moves, bottom edge fixed
            let new_y = (rect.y + dy).clamp(0.0, (bottom - MIN_FIELD_SIZE).max(0.0));
            (new_y, bottom - new_y)
        }
        ResizeHandle::BottomLeft | ResizeHandle::BottomRight => {
            let new_bottom = (bottom + dy).clamp((rect.y + MIN_FIELD_SIZE).min(1.0), 1.0);
            (rect.y, new_bottom - rect.y)
        }
    };

    width = width.max(MIN_FIELD_SIZE);
    height = height.max(MIN_FIELD_SIZE);
    x = x.min(1.0 - width);
    y = y.min(1.0 - height);
    FracRect::new(x, y, width, height)
}
