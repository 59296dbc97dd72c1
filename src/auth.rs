use axum::extract::FromRequestParts;
use headers::{Header, HeaderMapExt};
use http::{HeaderName, HeaderValue, request::Parts};
use std::sync::Arc;

use crate::errors::ApiError;

static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// Shared secret every upload must present.
#[derive(Clone)]
pub struct ApiKey(pub Arc<str>);

/// The `X-API-KEY` request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XApiKey(HeaderValue);

impl XApiKey {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl Header for XApiKey {
    fn name() -> &'static HeaderName {
        &X_API_KEY
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, headers::Error>
    where
        I: Iterator<Item = &'i HeaderValue>,
    {
        values.next().cloned().map(XApiKey).ok_or_else(headers::Error::invalid)
    }

    fn encode<E: Extend<HeaderValue>>(&self, values: &mut E) {
        values.extend(std::iter::once(self.0.clone()));
    }
}

/// Extracting this succeeds only when `X-API-KEY` matches the configured key
/// byte for byte. Put it before any body extractor so rejected requests are
/// never read.
pub struct ApiKeyGuard;

impl<S> FromRequestParts<S> for ApiKeyGuard
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let expected = parts
            .extensions
            .get::<ApiKey>()
            .ok_or_else(|| ApiError::Internal("API key extension missing".into()))?;

        match parts.headers.typed_get::<XApiKey>() {
            Some(presented) if presented.as_bytes() == expected.0.as_bytes() => Ok(ApiKeyGuard),
            _ => Err(ApiError::Unauthorized),
        }
    }
}
