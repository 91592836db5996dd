//! Location input parsing
//!
//! The multipart `location` field is JSON text. Decoded, it is either an
//! object or (from clients that stringify twice) a string holding the object.
//! Both shapes go through [`LocationInput`] and a single normalization step
//! producing [`Location`]. Anything else is rejected instead of being guessed
//! at.

use crate::validation::{validate_location_part, FieldError, FieldErrors};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const FIELD: &str = "location";

/// Canonical location stored on a credential record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl Location {
    pub fn is_empty(&self) -> bool {
        self.city.is_empty() && self.country.is_empty()
    }
}

/// Accepted location payload shapes
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// `{"city": ..., "country": ...}`; `name` and `region` are accepted as
    /// aliases for `city` and `country`
    Object(Map<String, Value>),
    /// An object that was itself encoded as a JSON string
    Encoded(String),
}

impl LocationInput {
    /// Classify an arbitrary JSON value
    pub fn from_value(value: Value) -> Result<Self, FieldError> {
        match value {
            Value::Object(map) => Ok(LocationInput::Object(map)),
            Value::String(text) => Ok(LocationInput::Encoded(text)),
            other => Err(FieldError::new(
                FIELD,
                format!("Invalid location format: expected an object, got {}", json_kind(&other)),
            )),
        }
    }

    /// Produce the canonical location, validating lengths
    pub fn normalize(self) -> Result<Location, Vec<FieldError>> {
        let map = match self {
            LocationInput::Object(map) => map,
            LocationInput::Encoded(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(vec![FieldError::new(
                        FIELD,
                        format!(
                            "Invalid location format: expected an object, got {}",
                            json_kind(&other)
                        ),
                    )])
                }
                Err(_) => {
                    return Err(vec![FieldError::new(
                        FIELD,
                        "Invalid location format: expected a JSON object",
                    )])
                }
            },
        };

        let mut errors = FieldErrors::new();
        let city = pick(&map, &["city", "name"], &mut errors);
        let country = pick(&map, &["country", "region"], &mut errors);
        errors.check(FIELD, validate_location_part("City", &city));
        errors.check(FIELD, validate_location_part("Country", &country));
        errors.into_result()?;

        Ok(Location { city, country })
    }
}

/// Parse the raw text of a multipart `location` field
pub fn parse_location(raw: &str) -> Result<Location, Vec<FieldError>> {
    let value = serde_json::from_str::<Value>(raw).map_err(|_| {
        vec![FieldError::new(
            FIELD,
            "Invalid location format: expected a JSON object",
        )]
    })?;
    LocationInput::from_value(value)
        .map_err(|error| vec![error])?
        .normalize()
}

/// First non-empty string among `keys`; non-string values are errors
fn pick(map: &Map<String, Value>, keys: &[&str], errors: &mut FieldErrors) -> String {
    for key in keys {
        match map.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(s)) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
            Some(other) => errors.push(FieldError::new(
                FIELD,
                format!("Location {} must be a string, got {}", key, json_kind(other)),
            )),
        }
    }
    String::new()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
