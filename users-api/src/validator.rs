//! Field rules for client-supplied user payloads.
//!
//! The payload is checked as raw JSON so every broken field can be reported at
//! once, instead of stopping at the first serde error.

use serde_json::Value;

use crate::{error::ApiError, model::UserFields};

const INVALID_FIELDS_PREFIX: &str = "missing or incorrect - ";

/// Checks `candidate` and returns its typed fields.
///
/// Rules:
/// - `username` is a non-empty string
/// - `age` is a non-negative whole number (zero included); `36.0` and `1e2`
///   count as whole numbers
/// - `hobbies` is an array of strings (possibly empty)
///
/// Offending fields are listed in the order username, age, hobbies.
pub fn validate(candidate: &Value) -> Result<UserFields, ApiError> {
    let username = candidate
        .get("username")
        .and_then(Value::as_str)
        .filter(|username| !username.is_empty());
    let age = candidate.get("age").and_then(whole_number);
    let hobbies = candidate
        .get("hobbies")
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        });

    match (username, age, hobbies) {
        (Some(username), Some(age), Some(hobbies)) => Ok(UserFields {
            username: username.to_string(),
            age,
            hobbies,
        }),
        (username, age, hobbies) => {
            let mut invalid = Vec::with_capacity(3);
            if username.is_none() {
                invalid.push("username");
            }
            if age.is_none() {
                invalid.push("age");
            }
            if hobbies.is_none() {
                invalid.push("hobbies");
            }
            Err(ApiError::bad_request(format!(
                "{INVALID_FIELDS_PREFIX}{}",
                invalid.join(", ")
            )))
        }
    }
}

fn whole_number(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|age| *age >= 0.0 && age.fract() == 0.0)
            .map(|age| age as u64)
    })
}
