//! Lifecycle callbacks exchanged between the host and an extension.

use super::HostError;

/// What the host should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep processing the stream.
    Continue,
    /// Stop iterating; the extension has replied or will resume later.
    Pause,
}

/// Host calls available to an HTTP context during a callback.
pub trait HttpHost {
    /// Read a request header. `Ok(None)` when the header is absent.
    fn request_header(&self, name: &str) -> Result<Option<String>, HostError>;

    fn add_request_header(&mut self, name: &str, value: &str) -> Result<(), HostError>;

    fn add_response_header(&mut self, name: &str, value: &str) -> Result<(), HostError>;

    /// Reply locally instead of forwarding the request.
    fn send_http_response(
        &mut self,
        status: u16,
        headers: &[(&str, &str)],
        body: &[u8],
        grpc_status: Option<i32>,
    ) -> Result<(), HostError>;

    /// Unblock a request previously paused by the extension.
    fn resume_http_request(&mut self) -> Result<(), HostError>;
}

/// Per-request callbacks.
pub trait HttpContext: Send {
    fn on_http_request_headers(
        &mut self,
        _host: &mut dyn HttpHost,
        _num_headers: usize,
        _end_of_stream: bool,
    ) -> Action {
        Action::Continue
    }

    fn on_http_response_headers(
        &mut self,
        _host: &mut dyn HttpHost,
        _num_headers: usize,
        _end_of_stream: bool,
    ) -> Action {
        Action::Continue
    }

    fn on_done(&mut self) {}
}

/// Long-lived context owned by one listener attachment on one worker.
pub trait RootContext: Send + Sync {
    /// Called once after creation. Returning `false` rejects the configuration.
    fn on_configure(&mut self) -> bool {
        true
    }

    fn create_http_context(&self, context_id: u32) -> Box<dyn HttpContext>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Passthrough;

    impl HttpContext for Passthrough {}

    struct NullHost;

    impl HttpHost for NullHost {
        fn request_header(&self, _name: &str) -> Result<Option<String>, HostError> {
            Ok(None)
        }
        fn add_request_header(&mut self, _name: &str, _value: &str) -> Result<(), HostError> {
            Ok(())
        }
        fn add_response_header(&mut self, _name: &str, _value: &str) -> Result<(), HostError> {
            Ok(())
        }
        fn send_http_response(
            &mut self,
            _status: u16,
            _headers: &[(&str, &str)],
            _body: &[u8],
            _grpc_status: Option<i32>,
        ) -> Result<(), HostError> {
            Ok(())
        }
        fn resume_http_request(&mut self) -> Result<(), HostError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_callbacks_continue() {
        let mut ctx = Passthrough;
        let mut host = NullHost;
        assert_eq!(ctx.on_http_request_headers(&mut host, 0, true), Action::Continue);
        assert_eq!(ctx.on_http_response_headers(&mut host, 0, true), Action::Continue);
        ctx.on_done();
    }
}
