//! Access policy and CORS headers for the upstream-backed API routes
//!
//! A request is granted when it carries the custom auth header and either
//! comes from an allowed origin or presents a known API key.

use std::collections::HashSet;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::info;
use url::Url;

use crate::{config::SecuritySettings, errors::AppError, AppState};

const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const MAX_AGE_SECS: &str = "3600";

#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    allowed_domains: HashSet<String>,
    custom_header: HeaderName,
    api_key_header: HeaderName,
    api_keys: HashSet<String>,
    /// Keeps the configured casing of both header names.
    allow_headers: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    AllowedOrigin,
    ApiKey,
    Denied,
}

impl Decision {
    pub fn is_granted(self) -> bool {
        !matches!(self, Self::Denied)
    }

    fn reason(self) -> &'static str {
        match self {
            Self::AllowedOrigin => "allowed-origin + custom-header",
            Self::ApiKey => "api-key + custom-header (origin not allowed)",
            Self::Denied => "denied",
        }
    }
}

impl SecurityPolicy {
    pub fn new(settings: &SecuritySettings) -> Self {
        Self {
            allowed_domains: normalize_domains(&settings.allowed_domains),
            custom_header: settings.custom_header.name.clone(),
            api_key_header: settings.api_key_header.name.clone(),
            api_keys: settings.api_keys.iter().cloned().collect(),
            allow_headers: format!(
                "{}, {}, Content-Type",
                settings.custom_header.label, settings.api_key_header.label
            ),
        }
    }

    /// An origin passes if it is listed as a full origin, or its host is a
    /// listed bare domain or a subdomain of one.
    pub fn origin_allowed(&self, origin: &str) -> bool {
        if origin.is_empty() {
            return false;
        }

        let lowered = origin.to_ascii_lowercase();
        if self.allowed_domains.contains(&lowered) {
            return true;
        }

        let host = host_from_origin(origin);
        self.allowed_domains
            .iter()
            .filter(|domain| !domain.contains("://"))
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
    }

    pub fn decide(&self, headers: &HeaderMap) -> Decision {
        let origin = request_origin(headers);
        let has_custom = header_str(headers, &self.custom_header).is_some();
        if !has_custom {
            return Decision::Denied;
        }

        if origin.is_some_and(|origin| self.origin_allowed(origin)) {
            return Decision::AllowedOrigin;
        }

        match header_str(headers, &self.api_key_header) {
            Some(key) if self.api_keys.contains(key) => Decision::ApiKey,
            _ => Decision::Denied,
        }
    }

    /// Adds CORS headers. Only allowed origins are echoed back.
    pub fn apply_cors(&self, response: &mut Response, origin: Option<&str>) {
        let allow_origin = origin
            .filter(|origin| self.origin_allowed(origin))
            .and_then(|origin| HeaderValue::from_str(origin).ok())
            .unwrap_or_else(|| HeaderValue::from_static("null"));

        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        if let Ok(value) = HeaderValue::from_str(&self.allow_headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(MAX_AGE_SECS),
        );
    }
}

pub async fn secure_endpoint(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let policy = &state.security;
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let origin = request_origin(request.headers()).map(str::to_string);

    if method == Method::OPTIONS {
        info!(method = %method, path = %path, origin = ?origin, "cors preflight");
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.apply_cors(&mut response, origin.as_deref());
        return response;
    }

    let decision = policy.decide(request.headers());
    info!(
        method = %method,
        path = %path,
        origin = ?origin,
        custom_header_present = header_str(request.headers(), &policy.custom_header).is_some(),
        api_key_present = header_str(request.headers(), &policy.api_key_header).is_some(),
        reason = decision.reason(),
        "auth {}",
        if decision.is_granted() { "granted" } else { "denied" }
    );

    let mut response = if decision.is_granted() {
        next.run(request).await
    } else {
        AppError::Forbidden.into_response()
    };
    policy.apply_cors(&mut response, origin.as_deref());
    response
}

fn normalize_domains(raw: &[String]) -> HashSet<String> {
    raw.iter()
        .map(|domain| domain.trim().to_ascii_lowercase())
        .filter(|domain| !domain.is_empty())
        .collect()
}

fn host_from_origin(origin: &str) -> String {
    Url::parse(origin)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
        .unwrap_or_else(|| origin.to_ascii_lowercase())
}

fn request_origin(headers: &HeaderMap) -> Option<&str> {
    header_str(headers, &header::ORIGIN).or_else(|| header_str(headers, &header::REFERER))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}
