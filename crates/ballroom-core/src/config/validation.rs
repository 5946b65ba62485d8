//! Configuration validation utilities and rules

use crate::BallroomError;
use std::fmt;

/// Configuration validation result
pub type ValidationResult = Result<(), ValidationError>;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is out of acceptable range
    OutOfRange {
        /// Offending field
        field: String,
        /// Inclusive lower bound, if any
        min: Option<f64>,
        /// Inclusive upper bound, if any
        max: Option<f64>,
        /// Value that was supplied
        actual: f64,
    },
    /// Custom validation failed
    Custom {
        /// Offending field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for BallroomError {
    fn from(err: ValidationError) -> Self {
        BallroomError::config(err.to_string())
    }
}

/// Configuration validator that accumulates validation rules
#[derive(Debug, Default)]
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
}

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that a number is within range
    pub fn range<T>(&mut self, field_name: &str, value: T, min: Option<T>, max: Option<T>) -> &mut Self
    where
        T: PartialOrd + Copy + Into<f64>,
    {
        let below = min.is_some_and(|min| value < min);
        let above = max.is_some_and(|max| value > max);

        if below || above {
            self.errors.push(ValidationError::OutOfRange {
                field: field_name.to_string(),
                min: min.map(Into::into),
                max: max.map(Into::into),
                actual: value.into(),
            });
        }
        self
    }

    /// Validate using a custom predicate
    pub fn custom(&mut self, field_name: &str, holds: bool, message: &str) -> &mut Self {
        if !holds {
            self.errors.push(ValidationError::Custom {
                field: field_name.to_string(),
                message: message.to_string(),
            });
        }
        self
    }

    /// First error, if any
    pub fn result(self) -> ValidationResult {
        match self.errors.into_iter().next() {
            None => Ok(()),
            Some(first) => Err(first),
        }
    }

    /// Get all validation errors
    pub fn all_errors(self) -> Vec<ValidationError> {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_accumulates() {
        let mut validator = ConfigValidator::new();
        validator
            .range("leaders", 0u32, Some(1), None)
            .range("followers", 3u32, Some(1), Some(2))
            .range("ok", 5u32, Some(1), Some(10));

        let errors = validator.all_errors();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].to_string(),
            "Field 'leaders' must be at least 1 (got 0)"
        );
        assert_eq!(
            errors[1].to_string(),
            "Field 'followers' must be between 1 and 2 (got 3)"
        );
    }

    #[test]
    fn test_custom_rule() {
        let mut validator = ConfigValidator::new();
        validator.custom("cycles_per_dancer", false, "requires equal populations");
        let err = validator.result().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Field 'cycles_per_dancer': requires equal populations"
        );
    }
}
