use super::models::Config;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("download.pool_size must be at least 1")]
    EmptyPool,

    #[error("download.max_attempts must be at least 1")]
    NoAttempts,

    #[error("engine.{field} must not be empty")]
    EmptyEngineField { field: &'static str },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_download(config)?;
    validate_engine(config)?;
    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ValidationError> {
    if config.download.pool_size == 0 {
        return Err(ValidationError::EmptyPool);
    }
    if config.download.max_attempts == 0 {
        return Err(ValidationError::NoAttempts);
    }
    Ok(())
}

fn validate_engine(config: &Config) -> Result<(), ValidationError> {
    let engine = &config.engine;

    if engine.binary.as_os_str().is_empty() {
        return Err(ValidationError::EmptyEngineField { field: "binary" });
    }
    if engine.format.trim().is_empty() {
        return Err(ValidationError::EmptyEngineField { field: "format" });
    }
    if engine.audio_codec.trim().is_empty() {
        return Err(ValidationError::EmptyEngineField { field: "audio_codec" });
    }
    if engine.audio_quality.trim().is_empty() {
        return Err(ValidationError::EmptyEngineField { field: "audio_quality" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_pool_rejected() {
        let mut config = Config::default();
        config.download.pool_size = 0;

        assert!(matches!(validate(&config), Err(ValidationError::EmptyPool)));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = Config::default();
        config.download.max_attempts = 0;

        assert!(matches!(validate(&config), Err(ValidationError::NoAttempts)));
    }

    #[test]
    fn test_empty_codec_rejected() {
        let mut config = Config::default();
        config.engine.audio_codec = "  ".to_string();

        assert!(matches!(
            validate(&config),
            Err(ValidationError::EmptyEngineField { field: "audio_codec" })
        ));
    }
}
