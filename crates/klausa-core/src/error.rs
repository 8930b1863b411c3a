use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown contract status: {0:?}")]
    UnknownStatus(String),

    #[error("unknown risk level: {0:?}")]
    UnknownRisk(String),

    #[error("analysis payload is not valid JSON: {0}")]
    Analysis(#[from] serde_json::Error),

    #[error("analysis payload has unexpected shape: {0}")]
    AnalysisShape(&'static str),
}
