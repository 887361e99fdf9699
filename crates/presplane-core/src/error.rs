use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlattenError {
    #[error("plane scale must be strictly positive, got {0}")]
    InvalidScale(f64),

    #[error("discretize spacing must be strictly positive, got {0}")]
    InvalidSpacing(f64),

    #[error("export failed: {0}")]
    Export(String),
}

pub type Result<T> = std::result::Result<T, FlattenError>;
