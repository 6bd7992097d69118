//! Transports that carry push/pull requests to a sync server.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

use crate::protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use crate::services::SyncService;
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Header carrying the caller identity on deployments without a gateway
pub const AUTHENTICATED_USER_HEADER: &str = "X-Authenticated-User";

#[derive(Debug, Error)]
pub enum SyncTransportError {
    #[error("Invalid sync transport configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Sync HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Sync API error: {0}")]
    Api(String),
    #[error("Not signed in")]
    Unauthenticated,
    #[error(transparent)]
    Service(#[from] crate::Error),
}

pub type SyncTransportResult<T> = Result<T, SyncTransportError>;

/// The network side of one sync cycle.
#[allow(async_fn_in_trait)]
pub trait SyncTransport {
    /// Whether a user identity is available for requests
    fn is_authenticated(&self) -> bool;

    /// Cheap reachability check; never errors
    async fn probe(&self) -> bool;

    async fn push(&self, request: &PushRequest) -> SyncTransportResult<PushResponse>;

    async fn pull(&self, request: &PullRequest) -> SyncTransportResult<PullResponse>;
}

/// Credentials attached to every request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SyncCredentials {
    pub access_token: Option<String>,
    /// Sent as `X-Authenticated-User` when no gateway sits in front of the API
    pub user_id: Option<String>,
}

impl std::fmt::Debug for SyncCredentials {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncCredentials")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// JSON-over-HTTP transport for the repsync API.
#[derive(Clone)]
pub struct HttpSyncTransport {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
    credentials: SyncCredentials,
}

impl HttpSyncTransport {
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        credentials: SyncCredentials,
    ) -> SyncTransportResult<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            client: reqwest::Client::builder().build()?,
            probe_timeout,
            credentials: SyncCredentials {
                access_token: normalize_text_option(credentials.access_token),
                user_id: normalize_text_option(credentials.user_id),
            },
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> SyncTransportResult<reqwest::RequestBuilder> {
        let token = self
            .credentials
            .access_token
            .as_deref()
            .ok_or(SyncTransportError::Unauthenticated)?;
        let mut builder = builder
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(user_id) = &self.credentials.user_id {
            builder = builder.header(AUTHENTICATED_USER_HEADER, user_id);
        }
        Ok(builder)
    }

    async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> SyncTransportResult<Resp>
    where
        Req: serde::Serialize + Sync,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.authorized(self.client.post(url))?.json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncTransportError::Api(parse_api_error(status, &body)));
        }

        Ok(response.json::<Resp>().await?)
    }
}

impl SyncTransport for HttpSyncTransport {
    fn is_authenticated(&self) -> bool {
        self.credentials.access_token.is_some()
    }

    async fn probe(&self) -> bool {
        let url = format!("{}/healthz", self.base_url);
        match self
            .client
            .get(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(error) => {
                tracing::debug!("Sync probe failed: {error}");
                false
            }
        }
    }

    async fn push(&self, request: &PushRequest) -> SyncTransportResult<PushResponse> {
        self.post_json("/v1/sync/push", request).await
    }

    async fn pull(&self, request: &PullRequest) -> SyncTransportResult<PullResponse> {
        self.post_json("/v1/sync/pull", request).await
    }
}

/// Transport that calls a [`SyncService`] in the same process.
///
/// Serves embedded setups where the server store lives next to the client.
#[derive(Clone)]
pub struct InProcessTransport {
    service: SyncService,
    user_id: Option<String>,
}

impl InProcessTransport {
    pub fn new(service: SyncService, user_id: impl Into<String>) -> Self {
        Self {
            service,
            user_id: normalize_text_option(Some(user_id.into())),
        }
    }

    fn user_id(&self) -> SyncTransportResult<&str> {
        self.user_id
            .as_deref()
            .ok_or(SyncTransportError::Unauthenticated)
    }
}

impl SyncTransport for InProcessTransport {
    fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    async fn probe(&self) -> bool {
        self.service.ping().await.is_ok()
    }

    async fn push(&self, request: &PushRequest) -> SyncTransportResult<PushResponse> {
        Ok(self.service.push(self.user_id()?, request).await?)
    }

    async fn pull(&self, request: &PullRequest) -> SyncTransportResult<PullResponse> {
        Ok(self.service.pull(self.user_id()?, request).await?)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> SyncTransportResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        SyncTransportError::InvalidConfiguration("API base URL must not be empty".to_string())
    })?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(SyncTransportError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::SyncServiceOptions;

    #[test]
    fn normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url(" https://api.example.com/ ".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn parse_api_error_prefers_message_field() {
        assert_eq!(
            parse_api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"error":"validation","message":"routineExercises 'E1' references missing routines 'R9'"}"#
            ),
            "routineExercises 'E1' references missing routines 'R9' (422)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, "  "), "HTTP 502");
    }

    #[test]
    fn credentials_debug_redacts_token() {
        let credentials = SyncCredentials {
            access_token: Some("secret".to_string()),
            user_id: Some("user-a".to_string()),
        };
        let debug = format!("{credentials:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn http_transport_without_token_is_unauthenticated() {
        let transport = HttpSyncTransport::new(
            "https://api.example.com",
            Duration::from_secs(4),
            SyncCredentials::default(),
        )
        .unwrap();
        assert!(!transport.is_authenticated());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn in_process_transport_requires_user() {
        let service = SyncService::open_in_memory(SyncServiceOptions::default())
            .await
            .unwrap();
        let transport = InProcessTransport::new(service, "  ");

        assert!(!transport.is_authenticated());
        assert!(transport.probe().await);
        assert!(matches!(
            transport.pull(&PullRequest::default()).await,
            Err(SyncTransportError::Unauthenticated)
        ));
    }
}
