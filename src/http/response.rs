//! Response-phase host handle.

use axum::http::HeaderMap;

use crate::host::{HostError, HttpHost};
use crate::http::request::header_pair;

/// Host handle for `on_http_response_headers`.
pub struct ResponseExchange<'a> {
    headers: &'a mut HeaderMap,
}

impl<'a> ResponseExchange<'a> {
    pub fn new(headers: &'a mut HeaderMap) -> Self {
        Self { headers }
    }
}

impl HttpHost for ResponseExchange<'_> {
    fn request_header(&self, _name: &str) -> Result<Option<String>, HostError> {
        Err(HostError::Unavailable(
            "request headers are not available during the response phase".into(),
        ))
    }

    fn add_request_header(&mut self, _name: &str, _value: &str) -> Result<(), HostError> {
        Err(HostError::Unavailable("request already forwarded".into()))
    }

    fn add_response_header(&mut self, name: &str, value: &str) -> Result<(), HostError> {
        let (name, value) = header_pair(name, value)?;
        self.headers.append(name, value);
        Ok(())
    }

    fn send_http_response(
        &mut self,
        _status: u16,
        _headers: &[(&str, &str)],
        _body: &[u8],
        _grpc_status: Option<i32>,
    ) -> Result<(), HostError> {
        Err(HostError::Unavailable("response already started".into()))
    }

    fn resume_http_request(&mut self) -> Result<(), HostError> {
        Ok(())
    }
}
