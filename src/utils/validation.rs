use crate::utils::error::{CarbonationError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_finite(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive(field_name: &str, value: f64) -> Result<()> {
    validate_finite(field_name, value)?;
    if value <= 0.0 {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be greater than 0".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_negative(field_name: &str, value: f64) -> Result<()> {
    validate_finite(field_name, value)?;
    if value < 0.0 {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be negative".to_string(),
        });
    }
    Ok(())
}

/// Open interval (0, 1), as used for confidence levels.
pub fn validate_probability(field_name: &str, value: f64) -> Result<()> {
    validate_finite(field_name, value)?;
    if value <= 0.0 || value >= 1.0 {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must lie strictly between 0 and 1".to_string(),
        });
    }
    Ok(())
}

pub fn validate_strictly_increasing(field_name: &str, values: &[f64]) -> Result<()> {
    for pair in values.windows(2) {
        if pair[1] <= pair[0] {
            return Err(CarbonationError::ConfigValidationError {
                field: field_name.to_string(),
                message: format!(
                    "Values must be strictly increasing, found {} followed by {}",
                    pair[0], pair[1]
                ),
            });
        }
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| CarbonationError::MissingConfigError {
            field: field_name.to_string(),
        })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(CarbonationError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_probability() {
        assert!(validate_probability("confidence_level", 0.95).is_ok());
        assert!(validate_probability("confidence_level", 0.0).is_err());
        assert!(validate_probability("confidence_level", 1.0).is_err());
        assert!(validate_probability("confidence_level", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_strictly_increasing() {
        assert!(validate_strictly_increasing("bands", &[0.3, 0.4, 0.5]).is_ok());
        assert!(validate_strictly_increasing("bands", &[0.3, 0.3]).is_err());
        assert!(validate_strictly_increasing("bands", &[]).is_ok());
    }

    #[test]
    fn test_validate_positive_and_range() {
        assert!(validate_positive("exponent", 0.3).is_ok());
        assert!(validate_positive("exponent", 0.0).is_err());
        assert!(validate_non_negative("cv", 0.0).is_ok());
        assert!(validate_range("slope", 0.5, 0.0, 1.0).is_ok());
        assert!(validate_range("slope", 1.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("output.path", "./output").is_ok());
        assert!(validate_path("output.path", "").is_err());
    }
}
