use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlockinessError {
    #[error("Image loading error: {0}")]
    ImageLoad(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Report serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Block must be {expected}x{expected}, got {rows}x{cols}")]
    BlockShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Image too small for blockiness estimation: {width}x{height}")]
    ImageTooSmall { width: usize, height: usize },

    #[error("Blockiness score undefined: zero baseline statistic at coefficient ({row}, {col})")]
    UndefinedScore { row: usize, col: usize },

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),
}

pub type Result<T> = std::result::Result<T, BlockinessError>;
