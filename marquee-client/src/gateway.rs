use async_trait::async_trait;
use marquee_shared::models::{
    BookingView, ConfirmData, LockData, ReleaseData, SeatSelectionRequest, SeatView,
};
use marquee_shared::{ApiResponse, BookingId, EnvelopeOutcome, ShowId};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The request never produced a response.
    #[error("Server unreachable: {0}")]
    Transport(String),
    /// A response arrived but could not be interpreted.
    #[error("Unreadable response: {0}")]
    Decode(String),
    #[error("Show {0} not found")]
    ShowNotFound(ShowId),
}

/// The booking endpoints as the reservation flow sees them. Envelope
/// endpoints resolve to an [`EnvelopeOutcome`] whatever the HTTP status; only
/// failure to obtain or read a response is an error.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn fetch_seats(&self, show_id: ShowId) -> Result<Vec<SeatView>, GatewayError>;

    async fn lock_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<LockData>, GatewayError>;

    async fn confirm_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<ConfirmData>, GatewayError>;

    async fn release_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<ReleaseData>, GatewayError>;

    async fn my_bookings(&self) -> Result<EnvelopeOutcome<Vec<BookingView>>, GatewayError>;

    async fn booking(&self, id: BookingId) -> Result<EnvelopeOutcome<BookingView>, GatewayError>;
}

/// [`BookingGateway`] over HTTP. The bearer token is read from the
/// [`SessionStore`] on every request so sign-in and sign-out take effect
/// immediately.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        session: SessionStore,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            session,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<EnvelopeOutcome<T>, GatewayError> {
        let status = response.status();
        let raw: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| GatewayError::Decode(format!("{} (HTTP {})", e, status)))?;
        raw.decode::<T>()
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }

    async fn post_envelope<B: Serialize + ?Sized + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<EnvelopeOutcome<T>, GatewayError> {
        let request = self.authorize(self.client.post(self.url(path)).json(body));
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::read_envelope(response).await
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<EnvelopeOutcome<T>, GatewayError> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::read_envelope(response).await
    }
}

#[async_trait]
impl BookingGateway for HttpGateway {
    async fn fetch_seats(&self, show_id: ShowId) -> Result<Vec<SeatView>, GatewayError> {
        let request = self.authorize(
            self.client
                .get(self.url(&format!("/shows/{}/seats", show_id))),
        );
        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GatewayError::ShowNotFound(show_id));
        }
        let status = response.status();
        response
            .json::<Vec<SeatView>>()
            .await
            .map_err(|e| GatewayError::Decode(format!("{} (HTTP {})", e, status)))
    }

    async fn lock_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<LockData>, GatewayError> {
        self.post_envelope("/bookings/lock", request).await
    }

    async fn confirm_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<ConfirmData>, GatewayError> {
        self.post_envelope("/bookings/confirm", request).await
    }

    async fn release_seats(
        &self,
        request: &SeatSelectionRequest,
    ) -> Result<EnvelopeOutcome<ReleaseData>, GatewayError> {
        self.post_envelope("/bookings/release", request).await
    }

    async fn my_bookings(&self) -> Result<EnvelopeOutcome<Vec<BookingView>>, GatewayError> {
        self.get_envelope("/bookings/my").await
    }

    async fn booking(&self, id: BookingId) -> Result<EnvelopeOutcome<BookingView>, GatewayError> {
        self.get_envelope(&format!("/bookings/{}", id)).await
    }
}
