use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ids::SeatId;

/// Response envelope shared by every endpoint: `{success, message?, data?}`.
///
/// `success == false` is authoritative regardless of the HTTP status that
/// carried it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<FailureDetail> {
    pub fn failure(message: impl Into<String>, detail: FailureDetail) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: Some(detail),
        }
    }
}

/// Machine-readable reason attached to every failed envelope.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    Conflict,
    HoldExpired,
    NotHolder,
    PartialHold,
    NotHeld,
    NotFound,
    RequestPending,
    EmptySelection,
    TooManySeats,
    /// The request body or path could not be read.
    InvalidRequest,
    Unauthorized,
    Internal,
}

/// Payload of a failed envelope: the reason plus exactly the seats concerned
/// (rejected, expired or missing). May be empty for reasons that are not
/// about particular seats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetail {
    pub code: FailureCode,
    #[serde(default)]
    pub seat_ids: Vec<SeatId>,
}

impl FailureDetail {
    pub fn new(code: FailureCode, seat_ids: Vec<SeatId>) -> Self {
        Self { code, seat_ids }
    }

    pub fn bare(code: FailureCode) -> Self {
        Self::new(code, Vec::new())
    }
}

/// A decoded envelope whose `data` shape depends on `success`.
#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeOutcome<T> {
    Success {
        message: Option<String>,
        data: Option<T>,
    },
    Failure {
        message: Option<String>,
        detail: Option<FailureDetail>,
    },
}

impl ApiResponse<serde_json::Value> {
    /// Interpret a raw envelope. Success payloads decode into `T`; failure
    /// payloads decode into [`FailureDetail`] when they carry one, and a
    /// failure payload of any other shape is dropped rather than rejected.
    pub fn decode<T: DeserializeOwned>(self) -> Result<EnvelopeOutcome<T>, serde_json::Error> {
        if self.success {
            let data = match self.data {
                Some(serde_json::Value::Null) | None => None,
                Some(value) => Some(serde_json::from_value(value)?),
            };
            Ok(EnvelopeOutcome::Success {
                message: self.message,
                data,
            })
        } else {
            let detail = self
                .data
                .and_then(|value| serde_json::from_value::<FailureDetail>(value).ok());
            Ok(EnvelopeOutcome::Failure {
                message: self.message,
                detail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_envelope_shape() {
        let body = ApiResponse::failure(
            "Seats no longer available",
            FailureDetail::new(FailureCode::Conflict, vec![SeatId(2)]),
        );
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "message": "Seats no longer available",
                "data": { "code": "CONFLICT", "seatIds": [2] }
            })
        );
    }

    #[test]
    fn test_decode_success_payload() {
        let raw: ApiResponse<serde_json::Value> =
            serde_json::from_value(json!({ "success": true, "data": { "n": 3 } })).unwrap();

        #[derive(Debug, Deserialize, PartialEq)]
        struct Payload {
            n: u32,
        }

        match raw.decode::<Payload>().unwrap() {
            EnvelopeOutcome::Success { data, .. } => assert_eq!(data, Some(Payload { n: 3 })),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_decode_failure_is_authoritative_without_detail() {
        let raw: ApiResponse<serde_json::Value> = serde_json::from_value(json!({
            "success": false,
            "message": "nope",
            "data": { "unexpected": true }
        }))
        .unwrap();

        match raw.decode::<serde_json::Value>().unwrap() {
            EnvelopeOutcome::Failure { message, detail } => {
                assert_eq!(message.as_deref(), Some("nope"));
                assert!(detail.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
