#[derive(Debug, thiserror::Error)]
pub enum AqaError {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Timed out after {0:.2}s")]
    Timeout(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AqaError::Agent("test error".to_string());
        assert_eq!(err.to_string(), "Agent error: test error");

        let err = AqaError::Timeout(1.5);
        assert_eq!(err.to_string(), "Timed out after 1.50s");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let aqa_err: AqaError = io_err.into();
        assert!(matches!(aqa_err, AqaError::Io(_)));
    }

    #[test]
    fn test_result_type() {
        let ok_result: Result<i32> = Ok(42);
        assert_eq!(ok_result.unwrap(), 42);

        let err_result: Result<i32> = Err(AqaError::Config("invalid".to_string()));
        assert!(err_result.is_err());
    }
}
