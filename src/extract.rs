use axum::{
    Json,
    extract::{FromRequest, Request, rejection::JsonRejection},
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::app_error::AppError;

const DATA_ERROR_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// JSON body that has passed its `validator` rules.
///
/// Malformed JSON becomes a 400 with the rejection text. A field with the
/// wrong shape (an unknown enum variant, a string where a number goes) and
/// rule violations both become a 400 carrying per-field messages.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(rejection_to_error)?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

fn rejection_to_error(rejection: JsonRejection) -> AppError {
    let text = rejection.body_text();
    match rejection {
        JsonRejection::JsonDataError(_) => match field_error(&text) {
            Some((field, message)) => AppError::InvalidField {
                field: field.to_string(),
                message: message.to_string(),
            },
            None => AppError::BadRequest(text),
        },
        _ => AppError::BadRequest(text),
    }
}

/// Splits `"<prefix>items[0].qty: invalid type ..."` into its path and message.
/// Root-level errors carry no path and yield `None`.
fn field_error(text: &str) -> Option<(&str, &str)> {
    let detail = text.strip_prefix(DATA_ERROR_PREFIX)?;
    let (path, message) = detail.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '[' | ']'));
    is_path.then_some((path, message))
}
