use async_trait::async_trait;
use log::*;
use payin_common::{Money, Secret};
use payin_engine::{
    db_types::ChargeReceipt,
    traits::{
        AmbiguousFailure,
        CaptureRequest,
        CaptureResponse,
        Decline,
        DeclineCode,
        GatewayError,
        PaymentProviderGateway,
        ProviderBalance,
    },
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{config::ProviderConfig, errors::WorkerError};

/// HTTP client for the Stripe-flavoured payment provider.
///
/// The whole point of this client is outcome classification: 2xx is a capture, 4xx is a classified decline, and
/// everything that leaves the result in doubt (timeouts, transport failures, 5xx) is ambiguous. The engine never
/// sees a raw HTTP error.
pub struct StripeGateway {
    client: Client,
    base_url: String,
    secret_key: Secret<String>,
    timeout_ms: u64,
}

impl StripeGateway {
    pub fn new(config: &ProviderConfig) -> Result<Self, WorkerError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WorkerError::InitializeError(format!("Could not build the provider HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            timeout_ms: config.timeout.as_millis() as u64,
        })
    }

    async fn classify_capture(&self, request: CaptureRequest, response: reqwest::Response) -> CaptureResponse {
        let status = response.status();
        if status.is_success() {
            return match response.json::<ChargePayload>().await {
                Ok(payload) => {
                    let amount = payload.amount_received.map(Money::from).unwrap_or(request.amount);
                    let currency = payload.currency.unwrap_or_else(|| request.currency.clone());
                    CaptureResponse::Captured(ChargeReceipt::new(
                        request.idempotency_key,
                        request.intent_id,
                        payload.id,
                        amount,
                        currency,
                    ))
                },
                // The provider said yes but we could not read the body. The charge may well have gone through, so
                // only the ambiguous classification is safe here.
                Err(e) => CaptureResponse::Ambiguous(AmbiguousFailure::Transport(format!("unreadable response: {e}"))),
            };
        }
        if status.is_server_error() {
            return CaptureResponse::Ambiguous(AmbiguousFailure::ServerError(status.as_u16()));
        }
        let body = response.json::<ErrorPayload>().await.ok();
        CaptureResponse::Declined(decline_from(status, body))
    }
}

#[derive(Debug, Deserialize)]
struct ChargePayload {
    id: String,
    #[serde(default)]
    amount_received: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn decline_from(status: StatusCode, body: Option<ErrorPayload>) -> Decline {
    let (code, message) = match body {
        Some(payload) => (
            payload.error.code.as_deref().map(DeclineCode::from_provider_code).unwrap_or(DeclineCode::Other),
            payload.error.message.unwrap_or_else(|| format!("HTTP {status}")),
        ),
        None => (DeclineCode::Other, format!("HTTP {status}")),
    };
    Decline::new(code, message)
}

#[derive(Debug, Deserialize)]
struct BalancePayload {
    #[serde(default)]
    available: Vec<BalanceEntry>,
    #[serde(default)]
    pending: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct BalanceEntry {
    amount: i64,
    currency: String,
}

#[async_trait]
impl PaymentProviderGateway for StripeGateway {
    async fn capture(&self, request: CaptureRequest) -> CaptureResponse {
        let url = format!("{}/v1/payment_intents/{}/capture", self.base_url, request.intent_id);
        debug!("🌐️ POST {url} (idempotency key {})", request.idempotency_key);
        let result = self
            .client
            .post(&url)
            .bearer_auth(self.secret_key.reveal())
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&[("amount_to_capture", request.amount.value().to_string())])
            .send()
            .await;
        match result {
            Ok(response) => self.classify_capture(request, response).await,
            Err(e) if e.is_timeout() => CaptureResponse::Ambiguous(AmbiguousFailure::Timeout(self.timeout_ms)),
            Err(e) => CaptureResponse::Ambiguous(AmbiguousFailure::Transport(e.to_string())),
        }
    }

    async fn balance(&self) -> Result<ProviderBalance, GatewayError> {
        let url = format!("{}/v1/balance", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(self.secret_key.reveal())
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(GatewayError::Rejected(format!("HTTP {}", response.status())));
        }
        let payload = response.json::<BalancePayload>().await.map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        let currency =
            payload.available.first().map(|entry| entry.currency.clone()).unwrap_or_else(|| "usd".to_string());
        let available = payload.available.iter().map(|entry| entry.amount).sum::<i64>();
        let pending = payload.pending.iter().map(|entry| entry.amount).sum::<i64>();
        Ok(ProviderBalance { available: Money::from(available), pending: Money::from(pending), currency })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse_error(json: &str) -> ErrorPayload {
        serde_json::from_str(json).expect("error payload fixture")
    }

    #[test]
    fn known_provider_codes_map_onto_the_local_taxonomy() {
        let payload = parse_error(r#"{"error":{"code":"card_declined","message":"nope"}}"#);
        let decline = decline_from(StatusCode::PAYMENT_REQUIRED, Some(payload));
        assert_eq!(decline.code, DeclineCode::CardDeclined);
        assert_eq!(decline.message, "nope");

        let payload = parse_error(r#"{"error":{"code":"payment_intent_unexpected_state"}}"#);
        let decline = decline_from(StatusCode::BAD_REQUEST, Some(payload));
        assert_eq!(decline.code, DeclineCode::InvalidState);
        assert_eq!(decline.message, "HTTP 400 Bad Request");
    }

    #[test]
    fn unknown_codes_and_missing_bodies_degrade_to_other() {
        let payload = parse_error(r#"{"error":{"code":"brand_new_code"}}"#);
        let decline = decline_from(StatusCode::PAYMENT_REQUIRED, Some(payload));
        assert_eq!(decline.code, DeclineCode::Other);

        let decline = decline_from(StatusCode::FORBIDDEN, None);
        assert_eq!(decline.code, DeclineCode::Other);
        assert_eq!(decline.message, "HTTP 403 Forbidden");
    }
}
