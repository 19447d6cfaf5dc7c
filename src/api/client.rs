use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::api::models::{
    ChatReply, ChatRequest, CsrfReply, ErrorBody, LanguageBody, LanguageReply, LoginRequest,
    RegisterRequest,
};

pub const SESSION_HEADER: &str = "X-Session-ID";
pub const CSRF_HEADER: &str = "X-CSRF-Token";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network Error: {0}")]
    Network(String),
    #[error("Unauthorized")]
    Unauthorized(Option<String>),
    #[error("Request rejected with HTTP {status}")]
    Rejected { status: u16, message: Option<String> },
    #[error("Decode Error: {0}")]
    Decode(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// The `error` field of the server's response body, when it sent one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Unauthorized(message) | ApiError::Rejected { message, .. } => {
                message.as_deref()
            }
            _ => None,
        }
    }
}

/// The REST surface of the chat server.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn csrf_token(&self) -> Result<String, ApiError>;

    async fn chat(
        &self,
        request: &ChatRequest,
        csrf_token: Option<&str>,
    ) -> Result<ChatReply, ApiError>;

    async fn stats(&self) -> Result<Value, ApiError>;

    async fn context(&self, session_id: &str) -> Result<Value, ApiError>;

    async fn clear(&self, session_id: Option<&str>) -> Result<(), ApiError>;

    async fn set_language(
        &self,
        code: &str,
        session_id: Option<&str>,
    ) -> Result<LanguageReply, ApiError>;

    async fn register(
        &self,
        request: &RegisterRequest,
        csrf_token: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn login(&self, request: &LoginRequest, csrf_token: Option<&str>) -> Result<(), ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
    cookies: Arc<Jar>,
}

impl ApiClient {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, ApiError> {
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            cookies,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Cookie header currently held for the server origin, for persistence.
    pub fn export_cookies(&self) -> Option<String> {
        self.cookies
            .cookies(&self.base_url)
            .and_then(|header| header.to_str().ok().map(str::to_string))
    }

    pub fn import_cookies(&self, header: &str) {
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies.add_cookie_str(pair, &self.base_url);
        }
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        check_status(response).await
    }
}

fn with_session(request: RequestBuilder, session_id: Option<&str>) -> RequestBuilder {
    match session_id {
        Some(id) => request.header(SESSION_HEADER, id),
        None => request,
    }
}

fn with_csrf(request: RequestBuilder, csrf_token: Option<&str>) -> RequestBuilder {
    match csrf_token {
        Some(token) => request.header(CSRF_HEADER, token),
        None => request,
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: ErrorBody = response.json().await.unwrap_or_default();
    debug!("Server answered {} ({:?})", status, body.error);
    if status == StatusCode::UNAUTHORIZED {
        Err(ApiError::Unauthorized(body.error))
    } else {
        Err(ApiError::Rejected {
            status: status.as_u16(),
            message: body.error,
        })
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn csrf_token(&self) -> Result<String, ApiError> {
        let response = self.send(self.client.get(self.url("/api/csrf")?)).await?;
        let reply: CsrfReply = read_json(response).await?;
        Ok(reply.csrf_token)
    }

    async fn chat(
        &self,
        request: &ChatRequest,
        csrf_token: Option<&str>,
    ) -> Result<ChatReply, ApiError> {
        let builder = self.client.post(self.url("/api/chat")?).json(request);
        let builder = with_csrf(with_session(builder, request.session_id.as_deref()), csrf_token);
        let response = self.send(builder).await?;
        read_json(response).await
    }

    async fn stats(&self) -> Result<Value, ApiError> {
        let response = self.send(self.client.get(self.url("/api/stats")?)).await?;
        read_json(response).await
    }

    async fn context(&self, session_id: &str) -> Result<Value, ApiError> {
        let builder = self
            .client
            .get(self.url("/api/context")?)
            .query(&[("session_id", session_id)]);
        let response = self.send(builder).await?;
        read_json(response).await
    }

    async fn clear(&self, session_id: Option<&str>) -> Result<(), ApiError> {
        // The server expects the header even when empty.
        let builder = self
            .client
            .post(self.url("/api/clear")?)
            .header(SESSION_HEADER, session_id.unwrap_or_default());
        self.send(builder).await?;
        Ok(())
    }

    async fn set_language(
        &self,
        code: &str,
        session_id: Option<&str>,
    ) -> Result<LanguageReply, ApiError> {
        let builder = self
            .client
            .post(self.url("/api/lang")?)
            .query(&[("code", code)]);
        let body: LanguageBody = match self.send(with_session(builder, session_id)).await {
            Ok(response) => read_json(response).await?,
            Err(ApiError::Rejected {
                message: Some(message),
                ..
            }) => return Ok(LanguageReply::Refused(message)),
            Err(e) => return Err(e),
        };

        match (body.language, body.error) {
            (_, Some(error)) => Ok(LanguageReply::Refused(error)),
            (Some(language), None) => Ok(LanguageReply::Changed(language)),
            (None, None) => Err(ApiError::Decode("missing `language` field".to_string())),
        }
    }

    async fn register(
        &self,
        request: &RegisterRequest,
        csrf_token: Option<&str>,
    ) -> Result<(), ApiError> {
        let builder = self.client.post(self.url("/api/register")?).json(request);
        self.send(with_csrf(builder, csrf_token)).await?;
        Ok(())
    }

    async fn login(
        &self,
        request: &LoginRequest,
        csrf_token: Option<&str>,
    ) -> Result<(), ApiError> {
        let builder = self.client.post(self.url("/api/login")?).json(request);
        self.send(with_csrf(builder, csrf_token)).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send(self.client.post(self.url("/api/logout")?)).await?;
        Ok(())
    }
}
