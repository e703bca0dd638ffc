use chatline_client::Request;
use http::HeaderMap;
use http::HeaderValue;

/// Supplies the bearer token attached to every request.
pub trait AuthProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// API key taken from [`crate::BackendConfig`].
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }
}

impl AuthProvider for ApiKeyAuth {
    fn bearer_token(&self) -> Option<String> {
        self.api_key.clone()
    }
}

pub(crate) fn add_auth_headers_to_header_map<A: AuthProvider + ?Sized>(
    auth: &A,
    headers: &mut HeaderMap,
) {
    if let Some(token) = auth.bearer_token()
        && let Ok(header) = HeaderValue::from_str(&format!("Bearer {token}"))
    {
        let _ = headers.insert(http::header::AUTHORIZATION, header);
    }
}

pub(crate) fn add_auth_headers<A: AuthProvider + ?Sized>(auth: &A, mut req: Request) -> Request {
    add_auth_headers_to_header_map(auth, &mut req.headers);
    req
}
