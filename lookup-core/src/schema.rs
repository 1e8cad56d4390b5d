//! Structural validation of decoded JSON payloads.
//!
//! A payload is first deserialized into the model types, which settles field presence and
//! types, then checked against the range rules declared on those types. Either step reports
//! the first violation with the [`JsonPath`] of the offending value. Unknown fields are
//! ignored and `null` counts as an absent optional field.

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::{
    error::{JsonPath, ValidationError},
    model::{CurrentWeather, Forecast},
};

/// A response shape that can be validated out of a raw JSON document.
pub trait Schema: DeserializeOwned {
    /// Rules that the field types alone do not express.
    fn check(&self) -> Result<(), ValidationError>;

    fn parse(value: &Value) -> Result<Self, ValidationError> {
        let parsed: Self = serde_path_to_error::deserialize(value)?;
        parsed.check()?;
        Ok(parsed)
    }
}

impl Schema for CurrentWeather {
    fn check(&self) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| first_violation(JsonPath::root(), &errors))
    }
}

impl Schema for Forecast {
    fn check(&self) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| first_violation(JsonPath::root(), &errors))
    }
}

impl<T: Validate + DeserializeOwned> Schema for Vec<T> {
    fn check(&self) -> Result<(), ValidationError> {
        self.iter().enumerate().try_for_each(|(i, item)| {
            item.validate()
                .map_err(|errors| first_violation(JsonPath::root().index(i), &errors))
        })
    }
}

/// Reduces a validation report to a single violation, lowest field name first.
fn first_violation(path: JsonPath, errors: &ValidationErrors) -> ValidationError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    let Some((field, kind)) = fields.into_iter().next() else {
        return ValidationError::new(&path, "failed validation");
    };

    let path = path.key(field);
    match kind {
        ValidationErrorsKind::Field(violations) => {
            ValidationError::new(&path, describe(violations))
        }
        ValidationErrorsKind::Struct(inner) => first_violation(path, inner),
        ValidationErrorsKind::List(items) => match items.iter().next() {
            Some((index, inner)) => first_violation(path.index(*index), inner),
            None => ValidationError::new(&path, "failed validation"),
        },
    }
}

fn describe(violations: &[validator::ValidationError]) -> String {
    let Some(violation) = violations.first() else {
        return "failed validation".to_owned();
    };

    if let Some(message) = &violation.message {
        return message.to_string();
    }

    let mut params: Vec<String> = violation
        .params
        .iter()
        .map(|(name, value)| format!("{name} = {value}"))
        .collect();
    params.sort();

    format!("failed `{}` rule ({})", violation.code, params.join(", "))
}
