use thiserror::Error;

#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {source}")]
    NetworkError {
        #[from]
        source: reqwest::Error,
    },

    #[error("Backend returned HTTP {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Response decoding error: {source}")]
    DecodeError {
        #[from]
        source: serde_json::Error,
    },

    #[error("CSV parsing system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV data format error: {0}")]
    CsvDataFormatError(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message_carries_backend_detail() {
        let err = ViewerError::StatusError { status: 400, message: "Invalid symbol".to_string() };
        assert_eq!(err.to_string(), "Backend returned HTTP 400: Invalid symbol");
    }

    #[test]
    fn test_decode_error_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ViewerError = source.into();
        assert!(err.to_string().starts_with("Response decoding error"));
    }
}
