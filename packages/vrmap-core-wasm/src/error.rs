use thiserror::Error;

/// Everything that can go wrong between receiving map shapes and publishing a scene.
///
/// All variants are detected before any output buffer is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("cannot normalize empty geometry batch")]
    EmptyInput,

    #[error("non-finite coordinate in shape {shape} at point {point}")]
    NonFiniteCoordinate { shape: usize, point: usize },

    #[error("invalid pipeline config: {0}")]
    InvalidConfig(String),

    #[error("failed to parse feature set: {0}")]
    Parse(String),

    #[error("feature query request failed: {0}")]
    Fetch(String),

    #[error("packed buffer of {floats} floats exceeds u32 offsets")]
    BufferTooLarge { floats: usize },
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Parse(e.to_string())
    }
}

impl From<PipelineError> for wasm_bindgen::JsValue {
    fn from(e: PipelineError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
