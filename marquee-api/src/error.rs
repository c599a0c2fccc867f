use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use marquee_core::{ConfirmError, LockError};
use marquee_shared::{ApiResponse, FailureCode, FailureDetail};

/// Every failure leaves as a `success: false` envelope. The status code is a
/// hint; the envelope is what clients act on.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Lock(err) => match err {
                LockError::Conflict { .. } | LockError::NotHeld(_) => StatusCode::CONFLICT,
                LockError::ShowNotFound(_) | LockError::SeatsNotFound(_) => StatusCode::NOT_FOUND,
                LockError::EmptySelection | LockError::TooManySeats { .. } => {
                    StatusCode::BAD_REQUEST
                }
            },
            AppError::Confirm(err) => match err {
                ConfirmError::HoldExpired(_) => StatusCode::GONE,
                ConfirmError::NotHolder(_) | ConfirmError::PartialHold(_) => StatusCode::CONFLICT,
                ConfirmError::ShowNotFound(_) | ConfirmError::SeatsNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                ConfirmError::RequestPending => StatusCode::TOO_MANY_REQUESTS,
                ConfirmError::EmptySelection => StatusCode::BAD_REQUEST,
                ConfirmError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::AuthenticationError(_) => StatusCode::UNAUTHORIZED,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::NotFoundError(_) => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> FailureDetail {
        match self {
            AppError::Lock(err) => err.detail(),
            AppError::Confirm(err) => err.detail(),
            AppError::AuthenticationError(_) => FailureDetail::bare(FailureCode::Unauthorized),
            AppError::ValidationError(_) => FailureDetail::bare(FailureCode::InvalidRequest),
            AppError::NotFoundError(_) => FailureDetail::bare(FailureCode::NotFound),
            AppError::InternalServerError(_) => FailureDetail::bare(FailureCode::Internal),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ApiResponse::failure(message, self.detail()));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use marquee_core::SeatId;

    #[test]
    fn test_status_mapping() {
        let conflict = AppError::from(LockError::Conflict {
            rejected: vec![SeatId(2)],
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.detail().seat_ids, vec![SeatId(2)]);

        let expired = AppError::from(ConfirmError::HoldExpired(vec![SeatId(1)]));
        assert_eq!(expired.status(), StatusCode::GONE);
        assert_eq!(expired.detail().code, FailureCode::HoldExpired);

        let pending = AppError::from(ConfirmError::RequestPending);
        assert_eq!(pending.status(), StatusCode::TOO_MANY_REQUESTS);

        let malformed = AppError::ValidationError("missing field `seatIds`".into());
        assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(malformed.detail().code, FailureCode::InvalidRequest);
    }

    #[test]
    fn test_internal_errors_hide_their_cause() {
        let response =
            AppError::from(ConfirmError::Storage("disk on fire".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
