//! Payment verification collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use common::{Money, TransactionId};

use crate::error::Result;

/// Which deal payment is being checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentKind {
    Earnest,
    Funding,
}

/// Question put to the payments collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCheck {
    pub transaction_id: TransactionId,
    pub kind: PaymentKind,
    pub amount: Money,
    pub payment_reference: String,
}

/// Confirms that an earnest or funding payment cleared
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// `Ok(false)` means the payment is known but not cleared yet
    async fn verify(&self, check: &PaymentCheck) -> Result<bool>;
}

// ==================== Static Implementation ====================

/// Verifier with a fixed answer
///
/// The default trusts the caller, for deployments where the payments
/// collaborator confirms clearance before calling the engine.
pub struct StaticPaymentVerifier {
    cleared: bool,
}

impl StaticPaymentVerifier {
    pub fn new() -> Self {
        Self { cleared: true }
    }

    /// Configure the fixed answer
    pub fn with_cleared(mut self, cleared: bool) -> Self {
        self.cleared = cleared;
        self
    }
}

impl Default for StaticPaymentVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentVerifier for StaticPaymentVerifier {
    async fn verify(&self, _check: &PaymentCheck) -> Result<bool> {
        Ok(self.cleared)
    }
}

// ==================== HTTP Implementation ====================

#[cfg(feature = "client")]
pub mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;
    use serde::Deserialize;

    use super::{PaymentCheck, PaymentVerifier};
    use crate::error::{Result, SettlementError};

    #[derive(Debug, Deserialize)]
    struct VerifyResponse {
        cleared: bool,
    }

    fn unavailable(e: reqwest::Error) -> SettlementError {
        if e.is_timeout() {
            SettlementError::PaymentUnavailable(format!("request timed out: {}", e))
        } else {
            SettlementError::PaymentUnavailable(e.to_string())
        }
    }

    /// HTTP-based payment verifier
    ///
    /// Every request is bounded by `timeout`; the deal lock is held while
    /// it runs.
    pub struct HttpPaymentVerifier {
        client: Client,
        base_url: String,
    }

    impl HttpPaymentVerifier {
        pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(unavailable)?;
            Ok(Self {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }
    }

    #[async_trait]
    impl PaymentVerifier for HttpPaymentVerifier {
        async fn verify(&self, check: &PaymentCheck) -> Result<bool> {
            let url = format!("{}/api/v1/payments/verify", self.base_url);

            let response = self
                .client
                .post(&url)
                .json(check)
                .send()
                .await
                .map_err(unavailable)?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(SettlementError::PaymentUnavailable(format!("{}: {}", status, body)));
            }

            response
                .json::<VerifyResponse>()
                .await
                .map(|r| r.cleared)
                .map_err(unavailable)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use assert_matches::assert_matches;
        use common::{Money, TransactionId};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        use crate::payments::PaymentKind;

        fn check() -> PaymentCheck {
            PaymentCheck {
                transaction_id: TransactionId::new(),
                kind: PaymentKind::Earnest,
                amount: Money::from_minor(25_000),
                payment_reference: "ACH-90114".to_string(),
            }
        }

        #[tokio::test]
        async fn test_stalled_service_times_out() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            // Accept connections and never answer.
            let server = tokio::spawn(async move {
                let mut held = Vec::new();
                while let Ok((socket, _)) = listener.accept().await {
                    held.push(socket);
                }
            });

            let verifier =
                HttpPaymentVerifier::new(&format!("http://{}", addr), Duration::from_millis(100)).unwrap();
            let started = std::time::Instant::now();
            let result = verifier.verify(&check()).await;

            assert_matches!(result, Err(SettlementError::PaymentUnavailable(msg)) if msg.contains("timed out"));
            assert!(started.elapsed() < Duration::from_secs(5));
            server.abort();
        }

        #[tokio::test]
        async fn test_cleared_answer_is_read() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let server = tokio::spawn(async move {
                let (mut socket, _) = listener.accept().await.unwrap();
                // The request body is JSON, so it ends with a brace.
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    request.extend_from_slice(&buf[..n]);
                    if n == 0 || request.ends_with(b"}") {
                        break;
                    }
                }
                let body = r#"{"cleared":true}"#;
                let reply = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
            });

            let verifier = HttpPaymentVerifier::new(&format!("http://{}/", addr), Duration::from_secs(5)).unwrap();
            assert_eq!(verifier.verify(&check()).await, Ok(true));
            server.await.unwrap();
        }
    }
}
