//! Response envelope types
//!
//! The backend answers with `{ success, data?, message? }` on success and
//! `{ success: false, error: { message, details? } }` on failure.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{DevSocialError, Result};

/// Response envelope returned by every API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Unwrap the payload, turning `success: false` into [`DevSocialError::Rejected`].
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            return Err(DevSocialError::Rejected(
                self.message
                    .unwrap_or_else(|| "request was not successful".to_string()),
            ));
        }
        self.data
            .ok_or_else(|| DevSocialError::InvalidResponse("missing `data` field".to_string()))
    }
}

impl ApiResponse<Value> {
    /// Parse a raw response body into an envelope.
    ///
    /// Bodies that are valid JSON but carry no `success` field are treated
    /// as a bare payload and wrapped as successful data.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| DevSocialError::InvalidResponse(format!("body is not JSON: {e}")))?;

        let has_envelope = value
            .as_object()
            .is_some_and(|obj| obj.get("success").is_some_and(Value::is_boolean));
        if !has_envelope {
            return Ok(ApiResponse::ok(value));
        }

        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|e| DevSocialError::InvalidResponse(format!("malformed envelope: {e}")))?;
        let message = raw.message.or_else(|| match raw.error {
            Some(Value::String(message)) => Some(message),
            Some(error) => error.get("message").and_then(Value::as_str).map(str::to_string),
            None => None,
        });
        Ok(ApiResponse {
            success: raw.success,
            data: raw.data,
            message,
        })
    }

    /// Validate the payload against `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<ApiResponse<T>> {
        let data = match self.data {
            Some(Value::Null) | None => None,
            Some(value) => Some(serde_json::from_value(value).map_err(|e| {
                DevSocialError::InvalidResponse(format!("unexpected payload shape: {e}"))
            })?),
        };
        Ok(ApiResponse {
            success: self.success,
            data,
            message: self.message,
        })
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<Value>,
}

impl ErrorBody {
    /// Extract the error payload from a non-2xx body, if it is JSON.
    ///
    /// Accepts `{ error: { message, details } }`, `{ error: "..." }` and
    /// `{ message }` shapes.
    pub fn parse(body: &[u8]) -> Option<Self> {
        let value: Value = serde_json::from_slice(body).ok()?;
        match value.get("error") {
            Some(Value::String(message)) => Some(ErrorBody {
                message: message.clone(),
                details: value.get("details").cloned(),
            }),
            Some(error @ Value::Object(_)) => serde_json::from_value(error.clone()).ok(),
            _ => value.get("message").and_then(Value::as_str).map(|m| ErrorBody {
                message: m.to_string(),
                details: value.get("details").cloned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_success_envelope() {
        let body = br#"{"success":true,"data":{"id":"1"},"message":"ok"}"#;
        let resp = ApiResponse::from_body(body).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(json!({ "id": "1" })));
        assert_eq!(resp.message.as_deref(), Some("ok"));
    }

    #[test]
    fn error_envelope_message_is_lifted() {
        let body = br#"{"success":false,"error":{"message":"nope"}}"#;
        let resp = ApiResponse::from_body(body).unwrap();
        assert!(!resp.success);
        assert_eq!(resp.message.as_deref(), Some("nope"));
    }

    #[test]
    fn bare_payload_is_wrapped() {
        let resp = ApiResponse::from_body(br#"[1,2,3]"#).unwrap();
        assert!(resp.success);
        assert_eq!(resp.data, Some(json!([1, 2, 3])));
    }

    #[test]
    fn non_json_is_invalid_response() {
        let err = ApiResponse::from_body(b"<html>oops</html>").unwrap_err();
        assert!(matches!(err, DevSocialError::InvalidResponse(_)));
    }

    #[test]
    fn into_result_rejects_unsuccessful() {
        let resp: ApiResponse<Value> = ApiResponse {
            success: false,
            data: None,
            message: Some("already liked".into()),
        };
        let err = resp.into_result().unwrap_err();
        assert!(err.to_string().contains("already liked"));
    }

    #[test]
    fn into_typed_reports_shape_mismatch() {
        let resp = ApiResponse::ok(json!({ "count": "not a number" }));
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Counter {
            count: u32,
        }
        let err = resp.into_typed::<Counter>().unwrap_err();
        assert!(matches!(err, DevSocialError::InvalidResponse(_)));
    }

    #[test]
    fn error_body_shapes() {
        let nested = ErrorBody::parse(br#"{"error":{"message":"bad","details":{"f":1}}}"#).unwrap();
        assert_eq!(nested.message, "bad");
        assert_eq!(nested.details, Some(json!({ "f": 1 })));

        let flat = ErrorBody::parse(br#"{"success":false,"message":"slow down"}"#).unwrap();
        assert_eq!(flat.message, "slow down");

        let string = ErrorBody::parse(br#"{"error":"Unauthorized"}"#).unwrap();
        assert_eq!(string.message, "Unauthorized");

        assert!(ErrorBody::parse(b"gateway timeout").is_none());
    }
}
