use thiserror::Error;

#[derive(Error, Debug)]
pub enum NaturalCitiesError {
    /// Fewer than three distinct points, or all of them collinear.
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Input read error: {0}")]
    InputRead(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Non-finite coordinates reaching the geometry kernel.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Noding failed: {0}")]
    NodingError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NaturalCitiesError {
    /// Errors that end a single recursion branch instead of the whole run.
    pub fn is_branch_local(&self) -> bool {
        matches!(
            self,
            NaturalCitiesError::DegenerateInput(_)
                | NaturalCitiesError::InvalidGeometry(_)
                | NaturalCitiesError::NodingError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NaturalCitiesError>;
