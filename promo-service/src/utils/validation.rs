use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::dtos::ErrorResponse;

/// Admin request body that parsed and passed its `validator` rules.
///
/// Unparseable bodies are 400 (415 without a JSON content type); rule
/// failures are 422 with one `field: message` entry per failure.
pub struct ValidatedJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(body_rejection)?;

        value.validate().map_err(|errors| {
            let error = format!("Validation error: {}", describe(&errors).join("; "));
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse { error })).into_response()
        })?;

        Ok(ValidatedJson(value))
    }
}

fn body_rejection(rejection: JsonRejection) -> Response {
    let status = match rejection {
        JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::BAD_REQUEST,
    };
    let error = format!("Invalid request body: {}", rejection.body_text());
    (status, Json(ErrorResponse { error })).into_response()
}

/// Flattens nested validator output into `field: message` lines.
fn describe(errors: &ValidationErrors) -> Vec<String> {
    let mut lines = Vec::new();
    collect(errors, "", &mut lines);
    lines.sort();
    lines
}

fn collect(errors: &ValidationErrors, prefix: &str, lines: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(failures) => {
                for failure in failures {
                    let message = failure
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| failure.code.to_string());
                    lines.push(format!("{}: {}", path, message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, lines),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    collect(nested, &format!("{}[{}]", path, index), lines);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "must not be empty"))]
        code: String,
        #[validate(range(min = 1))]
        max_usage: i64,
    }

    #[test]
    fn test_describe_lists_every_field() {
        let sample = Sample {
            code: String::new(),
            max_usage: 0,
        };
        let errors = sample.validate().unwrap_err();

        assert_eq!(
            describe(&errors),
            vec![
                "code: must not be empty".to_string(),
                "max_usage: range".to_string(),
            ]
        );
    }
}
