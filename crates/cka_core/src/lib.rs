pub mod config;
pub mod corpus;
pub mod demo;
pub mod domain;
pub mod error;
pub mod trace;

#[cfg(test)]
mod tests {
    use super::error::AppError;

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("CORPUS_EMPTY", "no documents").with_retryable(false);
        assert_eq!(err.code, "CORPUS_EMPTY");
        assert_eq!(err.message, "no documents");
        assert!(!err.retryable);
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "[CORPUS_EMPTY] no documents");
    }

    #[test]
    fn config_codes_are_classified_as_configuration_errors() {
        let err = AppError::new("CONFIG_MODEL_NOT_ALLOWED", "nope").with_details("model=x");
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "[CONFIG_MODEL_NOT_ALLOWED] nope (model=x)");
    }
}
