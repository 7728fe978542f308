//! Uniform response body for every request.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use scopekit_core::{CodedError, ErrorCode, SerialNum};

pub const SUCCESS_MESSAGE: &str = "SUC";

/// `{SerialNum, Code, Message, Data}`. `Code == 0` is success.
///
/// Always sent with HTTP 200; the envelope carries the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseEnvelope<T> {
    pub serial_num: SerialNum,
    pub code: ErrorCode,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn success(serial_num: SerialNum, data: T) -> Self {
        Self {
            serial_num,
            code: ErrorCode::OK,
            message: SUCCESS_MESSAGE.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(serial_num: SerialNum, error: CodedError) -> Self {
        let (code, message) = error.into_parts();
        Self {
            serial_num,
            code,
            message,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::OK
    }
}

impl<T: Serialize> IntoResponse for ResponseEnvelope<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Render an error envelope with no data.
pub fn failure_response(serial_num: SerialNum, error: CodedError) -> Response {
    ResponseEnvelope::<()>::failure(serial_num, error).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_shape() {
        let serial = SerialNum::generate();
        let env = ResponseEnvelope::success(serial.clone(), vec![1, 2]);
        assert_eq!(
            serde_json::to_value(&env).unwrap(),
            json!({ "SerialNum": serial.as_str(), "Code": 0, "Message": "SUC", "Data": [1, 2] })
        );
        assert!(env.is_success());
    }

    #[test]
    fn failure_has_null_data() {
        let serial = SerialNum::generate();
        let env = ResponseEnvelope::<String>::failure(
            serial,
            CodedError::from_text("[110002]: lookup failed"),
        );
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["Code"], 110_002);
        assert_eq!(json["Message"], "lookup failed");
        assert!(json["Data"].is_null());
    }

    #[test]
    fn rendered_with_status_ok() {
        let response = failure_response(SerialNum::generate(), CodedError::uncoded("boom"));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
