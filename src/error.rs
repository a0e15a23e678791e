//! Error types for the salient_palette library

use thiserror::Error;

/// Result type alias for salient_palette operations
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Error types for palette extraction
///
/// Numeric degeneracies (uniform images, a Markov solve or a clustering run
/// that does not converge) are not represented here: they are logged and the
/// pipeline continues with its best iterate.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Input image or request is unusable (empty image, zero dimensions, bad K)
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Invalid configuration parameter
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// A color channel fell outside its defined domain
    #[error("Color value out of range: {channel} = {value} (expected {expected})")]
    InvalidColorRange {
        channel: &'static str,
        value: f32,
        expected: &'static str,
    },

    /// Image file could not be loaded or decoded
    #[error("Failed to load image: {message}")]
    ImageLoadError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration file could not be read, parsed or written
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Generic processing error
    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

impl AnalysisError {
    /// Create an invalid input error
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create an image load error with context
    pub fn image_load<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ImageLoadError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a configuration error with context
    pub fn config<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ConfigError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Check if this error indicates a recoverable condition
    ///
    /// Only configuration problems can be fixed by the caller without
    /// changing the input image.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidParameter { .. } | AnalysisError::ConfigError { .. }
        )
    }

    /// Get user-friendly error description for application display
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::ImageLoadError { .. } => {
                "Could not load the image. Please check the file format and try again.".to_string()
            }
            AnalysisError::InvalidInput { reason } => {
                format!("The image cannot be analyzed: {}.", reason)
            }
            AnalysisError::InvalidParameter { parameter, .. } => {
                format!("The setting '{}' has an unsupported value.", parameter)
            }
            AnalysisError::InvalidColorRange { .. } => {
                "The image contains malformed color data.".to_string()
            }
            _ => "Palette extraction failed. Please try with a different image.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalysisError::invalid_parameter("clustering.max_iterations", 0);
        assert_eq!(
            err.to_string(),
            "Invalid parameter: clustering.max_iterations = 0"
        );

        let err = AnalysisError::InvalidColorRange {
            channel: "red",
            value: 1.5,
            expected: "[0, 1]",
        };
        assert!(err.to_string().contains("red = 1.5"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(AnalysisError::invalid_parameter("k", 0).is_recoverable());
        assert!(!AnalysisError::invalid_input("empty image").is_recoverable());
    }

    #[test]
    fn test_user_message_mentions_reason() {
        let err = AnalysisError::invalid_input("image has zero width");
        assert!(err.user_message().contains("zero width"));
    }
}
