//! Signature field placement and PDF compositing
//!
//! This crate provides the core of the FieldSign document-signing flow:
//! the fractional coordinate model shared by the editor and the compositor,
//! the cancellable page render pipeline, the interactive field editor, the
//! signature capture surface, and the compositor that stamps a captured
//! signature image into a PDF, producing a new signed artifact.

pub mod capture;
pub mod compositor;
pub mod coords;
pub mod error;
pub mod fields;
pub mod gesture;
pub mod render;

pub use capture::{CaptureMode, ScriptFace, SignatureAsset, SignatureCapture};
pub use compositor::{compose_signed_document, sanitize_filename};
pub use coords::{FracRect, PageRect, PixelRect};
pub use error::FieldsignError;
pub use fields::{FieldEditor, FieldId, SignatureField};
pub use gesture::{GestureController, ResizeHandle};
pub use render::{
    CancelFlag, PageRasterizer, Raster, RenderPipeline, RenderSession, RenderState, RenderTask,
    Rotation, Viewport,
};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, FieldsignError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| FieldsignError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::test_pdf::single_page_pdf;

    #[test]
    fn test_page_count_of_generated_pdf() {
        let bytes = single_page_pdf(612.0, 792.0);
        assert_eq!(get_page_count(&bytes).unwrap(), 1);
    }

    #[test]
    fn test_page_count_rejects_garbage() {
        assert!(get_page_count(b"not a pdf").is_err());
    }
}
