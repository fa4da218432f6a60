use thiserror::Error;

use crate::expr::ExprError;

/// Everything that can go wrong while turning the declarative skin data into a presentation.
///
/// These only happen at build time. A presentation that was built successfully never fails
/// afterwards.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Could not decode image: {0}")]
    Decode(String),
    #[error("Invalid sprite region '{region}': {reason}")]
    Layout { region: String, reason: String },
    #[error("Could not find sprite '{sprite}' for clip with name '{clip}'")]
    SpriteNotFound { sprite: String, clip: String },
    #[error("{field} in '{expr}': {source}")]
    Expression {
        field: &'static str,
        expr: String,
        #[source]
        source: ExprError,
    },
    #[error("Clip '{clip}({occurrence})' not found")]
    ClipNotFound { clip: String, occurrence: usize },
    #[error("Layer '{0}' not found")]
    LayerNotFound(String),
    #[error("Scene '{0}' not found")]
    SceneNotFound(String),
    #[error("Malformed description: {0}")]
    Json(#[from] serde_json::Error),
}

impl StageError {
    pub(crate) fn layout(region: &str, reason: impl Into<String>) -> Self {
        Self::Layout {
            region: region.to_owned(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StageError>;
