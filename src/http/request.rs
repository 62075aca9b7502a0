//! Request-phase host handle.
//!
//! # Responsibilities
//! - Expose request headers to the filter by name
//! - Let the filter append request headers before forwarding
//! - Capture a terminal response the filter sends instead of forwarding
//!
//! # Design Decisions
//! - Header lookups go through `HeaderMap`, so names are case-insensitive
//! - Response headers cannot be touched until the response phase

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};

use crate::host::{HostError, HttpHost};

/// Header carrying the gRPC status on a terminal response.
const GRPC_STATUS: &str = "grpc-status";

/// Host handle for `on_http_request_headers`.
pub struct RequestExchange<'a> {
    headers: &'a mut HeaderMap,
    local_response: Option<Response>,
    resumed: bool,
}

impl<'a> RequestExchange<'a> {
    pub fn new(headers: &'a mut HeaderMap) -> Self {
        Self {
            headers,
            local_response: None,
            resumed: false,
        }
    }

    /// Whether the filter explicitly resumed the request.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    /// The terminal response, if the filter sent one.
    pub fn into_local_response(self) -> Option<Response> {
        self.local_response
    }
}

pub(crate) fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), HostError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| HostError::InvalidArgument(format!("header name {name:?}: {e}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| HostError::InvalidArgument(format!("header value for {name}: {e}")))?;
    Ok((name, value))
}

impl HttpHost for RequestExchange<'_> {
    fn request_header(&self, name: &str) -> Result<Option<String>, HostError> {
        match self.headers.get(name) {
            Some(value) => value
                .to_str()
                .map(|v| Some(v.to_string()))
                .map_err(|e| {
                    HostError::InvalidArgument(format!("header {name} is not visible ASCII: {e}"))
                }),
            None => Ok(None),
        }
    }

    fn add_request_header(&mut self, name: &str, value: &str) -> Result<(), HostError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    fn add_response_header(&mut self, _name: &str, _value: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable(
            "response headers are not available during the request phase".into(),
        ))
    }

    fn send_http_response(
        &mut self,
        status: u16,
        headers: &[(&str, &str)],
        body: &[u8],
        grpc_status: Option<i32>,
    ) -> Result<(), HostError> {
        if self.local_response.is_some() {
            return Err(HostError::Unavailable("a local response was already sent".into()));
        }
        let status = StatusCode::from_u16(status)
            .map_err(|e| HostError::InvalidArgument(format!("status {status}: {e}")))?;

        let mut response = Response::new(Body::from(body.to_vec()));
        *response.status_mut() = status;
        for (name, value) in headers {
            let (name, value) = header_pair(name, value)?;
            response.headers_mut().append(name, value);
        }
        if let Some(code) = grpc_status {
            response
                .headers_mut()
                .insert(GRPC_STATUS, HeaderValue::from(code));
        }

        self.local_response = Some(response);
        Ok(())
    }

    fn resume_http_request(&mut self) -> Result<(), HostError> {
        self.resumed = true;
        Ok(())
    }
}
