use thiserror::Error;

#[derive(Error, Debug)]
pub enum FieldsignError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Page {0} not found in document")]
    PageNotFound(u32),

    #[error("Unsupported signature image: {0}")]
    UnsupportedImage(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Render failed: {0}")]
    RenderError(String),

    #[error("No signature captured")]
    EmptySignature,

    #[error("No script face configured for typed signatures")]
    FontUnavailable,
}
