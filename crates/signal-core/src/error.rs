use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl AnalysisError {
    /// True for errors that mean the evaluation never had usable inputs.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InsufficientData(_)
                | AnalysisError::InvalidData(_)
                | AnalysisError::ProviderError(_)
        )
    }
}
