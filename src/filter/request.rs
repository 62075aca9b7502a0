//! Per-request context.

use std::sync::{Arc, Mutex};

use crate::admission::{Admission, THROTTLE_BODY, THROTTLE_HEADER, THROTTLE_STATUS};
use crate::classifier::HeaderView;
use crate::cohort::CohortDecision;
use crate::filter::extension::ExtensionState;
use crate::cohort::GRAY_MARKER;
use crate::filter::{DIAGNOSTIC_HEADERS, GRAY_RESPONSE_HEADER};
use crate::host::{Action, HttpContext, HttpHost};
use crate::observability::metrics;

/// Header view over host calls; unreadable headers count as absent.
struct HostHeaders<'a> {
    host: &'a dyn HttpHost,
    context_id: u32,
}

impl HeaderView for HostHeaders<'_> {
    fn header(&self, name: &str) -> Option<String> {
        match self.host.request_header(name) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    context_id = self.context_id,
                    header = name,
                    error = %e,
                    "Failed to read request header"
                );
                None
            }
        }
    }
}

/// HTTP context for one request, bound to its owning extension.
pub struct GrayRequest {
    context_id: u32,
    extension: Arc<Mutex<ExtensionState>>,
    decision: CohortDecision,
}

impl GrayRequest {
    pub fn new(context_id: u32, extension: Arc<Mutex<ExtensionState>>) -> Self {
        Self {
            context_id,
            extension,
            decision: CohortDecision::Unknown,
        }
    }

    pub fn decision(&self) -> CohortDecision {
        self.decision
    }

    /// Send the throttle response, or unblock the request if that fails.
    fn reject(&self, host: &mut dyn HttpHost) -> Action {
        let sent =
            host.send_http_response(THROTTLE_STATUS, &[THROTTLE_HEADER], THROTTLE_BODY, None);
        match sent {
            Ok(()) => Action::Pause,
            Err(e) => {
                tracing::error!(
                    context_id = self.context_id,
                    error = %e,
                    "Failed to send throttle response; resuming request"
                );
                if let Err(e) = host.resume_http_request() {
                    tracing::error!(
                        context_id = self.context_id,
                        error = %e,
                        "Failed to resume request"
                    );
                }
                Action::Continue
            }
        }
    }
}

impl HttpContext for GrayRequest {
    fn on_http_request_headers(
        &mut self,
        host: &mut dyn HttpHost,
        _num_headers: usize,
        _end_of_stream: bool,
    ) -> Action {
        let (admission, tag) = {
            let mut state = self.extension.lock().expect("extension state mutex poisoned");
            let headers = HostHeaders {
                host: &*host,
                context_id: self.context_id,
            };
            self.decision = state.decide(self.context_id, &headers);
            let tag = state
                .classifier()
                .missing_marker(self.decision, &headers)
                .map(str::to_owned);
            (state.admit(), tag)
        };
        metrics::record_decision(self.decision.as_str());

        if let Some(name) = tag {
            if let Err(e) = host.add_request_header(&name, GRAY_MARKER) {
                tracing::warn!(
                    context_id = self.context_id,
                    error = %e,
                    "Failed to tag gray request"
                );
            }
        }

        match admission {
            Admission::Admit => {
                metrics::record_admission("admitted");
                Action::Continue
            }
            Admission::Reject => {
                tracing::warn!(
                    context_id = self.context_id,
                    decision = %self.decision,
                    "Rate limit exceeded"
                );
                metrics::record_admission("throttled");
                self.reject(host)
            }
        }
    }

    fn on_http_response_headers(
        &mut self,
        host: &mut dyn HttpHost,
        _num_headers: usize,
        _end_of_stream: bool,
    ) -> Action {
        let gray = self.decision.is_gray().then_some(GRAY_RESPONSE_HEADER);
        for (name, value) in DIAGNOSTIC_HEADERS.into_iter().chain(gray) {
            if let Err(e) = host.add_response_header(name, value) {
                tracing::debug!(
                    context_id = self.context_id,
                    header = name,
                    error = %e,
                    "Failed to add response header"
                );
            }
        }
        Action::Continue
    }

    fn on_done(&mut self) {
        tracing::trace!(context_id = self.context_id, decision = %self.decision, "Request done");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::admission::FixedWindowLimiter;
    use crate::classifier::{Classifier, RuleSet};
    use crate::correlation::{
        CorrelationStore, LocalCorrelationStore, SharedCorrelationStore, VersionToken,
    };
    use crate::host::{Cas, Clock, HostError, ManualClock, Retention, SharedData, SystemClock};

    const USER_RULE: &str = r#"[[{"header_key":"x-user"}]]"#;

    #[derive(Default)]
    struct MockHost {
        request_headers: HashMap<String, String>,
        added_request: Vec<(String, String)>,
        added_response: Vec<(String, String)>,
        sent: Option<(u16, Vec<(String, String)>, Vec<u8>)>,
        fail_send: bool,
        resumed: bool,
    }

    impl MockHost {
        fn with_headers(pairs: &[(&str, &str)]) -> Self {
            Self {
                request_headers: pairs
                    .iter()
                    .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl HttpHost for MockHost {
        fn request_header(&self, name: &str) -> Result<Option<String>, HostError> {
            Ok(self.request_headers.get(&name.to_lowercase()).cloned())
        }
        fn add_request_header(&mut self, name: &str, value: &str) -> Result<(), HostError> {
            self.added_request.push((name.into(), value.into()));
            Ok(())
        }
        fn add_response_header(&mut self, name: &str, value: &str) -> Result<(), HostError> {
            self.added_response.push((name.into(), value.into()));
            Ok(())
        }
        fn send_http_response(
            &mut self,
            status: u16,
            headers: &[(&str, &str)],
            body: &[u8],
            _grpc_status: Option<i32>,
        ) -> Result<(), HostError> {
            if self.fail_send {
                return Err(HostError::Unavailable("stream reset".into()));
            }
            self.sent = Some((
                status,
                headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body.to_vec(),
            ));
            Ok(())
        }
        fn resume_http_request(&mut self) -> Result<(), HostError> {
            self.resumed = true;
            Ok(())
        }
    }

    /// Shared data whose lookups can fail and whose writes always lose the race.
    #[derive(Default)]
    struct ContendedData {
        fail_get: bool,
        puts: AtomicUsize,
    }

    impl SharedData for ContendedData {
        fn get(&self, _key: &str) -> Result<Option<(Vec<u8>, Cas)>, HostError> {
            if self.fail_get {
                return Err(HostError::Unavailable("shared data offline".into()));
            }
            Ok(None)
        }

        fn put(&self, _key: &str, _value: &[u8], _expected: Option<Cas>) -> Result<(), HostError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            Err(HostError::CasMismatch)
        }
    }

    fn local_store() -> Box<dyn CorrelationStore> {
        Box::new(local_map())
    }

    fn local_map() -> LocalCorrelationStore {
        let retention = Retention::new(64, Duration::from_secs(60));
        LocalCorrelationStore::new(retention, Arc::new(SystemClock))
    }

    fn extension(
        rules: &str,
        capacity: u32,
        store: Box<dyn CorrelationStore>,
    ) -> (Arc<Mutex<ExtensionState>>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let state = ExtensionState::new(
            Classifier::new(
                RuleSet::from_json_or_empty(Some(rules)),
                "X-B3-Traceid",
                "gray",
            ),
            store,
            FixedWindowLimiter::new(capacity, Duration::from_secs(1), clock.now()),
            clock.clone(),
        );
        (Arc::new(Mutex::new(state)), clock)
    }

    #[test]
    fn test_no_rule_match_is_admitted_not_gray() {
        let (ext, _) = extension("[]", 10, local_store());
        let mut host = MockHost::with_headers(&[("x-b3-traceid", "t1")]);
        let mut ctx = GrayRequest::new(1, ext.clone());

        assert_eq!(ctx.on_http_request_headers(&mut host, 1, true), Action::Continue);
        assert_eq!(ctx.decision(), CohortDecision::NotGray);
        assert!(host.added_request.is_empty());
        assert_eq!(ext.lock().unwrap().remaining_tokens(), 9);
    }

    #[test]
    fn test_prior_gray_wins_over_rules() {
        let mut store = local_map();
        store.record("t1", CohortDecision::Gray, VersionToken::ABSENT).unwrap();
        let (ext, _) = extension(r#"[[{"header_key":"x-never"}]]"#, 10, Box::new(store));

        let mut host = MockHost::with_headers(&[("x-b3-traceid", "t1")]);
        let mut ctx = GrayRequest::new(1, ext);
        ctx.on_http_request_headers(&mut host, 1, true);
        ctx.on_http_response_headers(&mut host, 0, true);

        assert_eq!(ctx.decision(), CohortDecision::Gray);
        assert_eq!(host.added_request, vec![("gray".to_string(), "true".to_string())]);
        assert!(host
            .added_response
            .contains(&("app".to_string(), "gray".to_string())));
    }

    #[test]
    fn test_gray_decision_propagates_to_later_requests() {
        let (ext, _) = extension(USER_RULE, 10, local_store());

        let mut first = MockHost::with_headers(&[("x-b3-traceid", "t1"), ("x-user", "alice")]);
        let mut ctx = GrayRequest::new(1, ext.clone());
        ctx.on_http_request_headers(&mut first, 2, true);
        assert_eq!(ctx.decision(), CohortDecision::Gray);

        // Downstream hop of the same transaction without the user header.
        let mut second = MockHost::with_headers(&[("x-b3-traceid", "t1")]);
        let mut ctx = GrayRequest::new(2, ext.clone());
        ctx.on_http_request_headers(&mut second, 1, true);
        assert_eq!(ctx.decision(), CohortDecision::Gray);

        // A different transaction is unaffected.
        let mut other = MockHost::with_headers(&[("x-b3-traceid", "t2")]);
        let mut ctx = GrayRequest::new(3, ext);
        ctx.on_http_request_headers(&mut other, 1, true);
        assert_eq!(ctx.decision(), CohortDecision::NotGray);
    }

    #[test]
    fn test_missing_key_still_classifies() {
        let (ext, _) = extension(USER_RULE, 10, local_store());
        let mut host = MockHost::with_headers(&[("x-user", "alice")]);
        let mut ctx = GrayRequest::new(1, ext);

        assert_eq!(ctx.on_http_request_headers(&mut host, 1, true), Action::Continue);
        assert_eq!(ctx.decision(), CohortDecision::Gray);
    }

    #[test]
    fn test_throttle_after_capacity() {
        let (ext, clock) = extension("[]", 2, local_store());

        for id in 0..2 {
            let mut host = MockHost::default();
            let mut ctx = GrayRequest::new(id, ext.clone());
            assert_eq!(ctx.on_http_request_headers(&mut host, 0, true), Action::Continue);
            clock.advance(Duration::from_millis(40));
        }

        let mut host = MockHost::default();
        let mut ctx = GrayRequest::new(2, ext.clone());
        assert_eq!(ctx.on_http_request_headers(&mut host, 0, true), Action::Pause);
        let (status, headers, body) = host.sent.unwrap();
        assert_eq!(status, 429);
        assert_eq!(headers, vec![("powered-by".to_string(), "gray-proxy".to_string())]);
        assert_eq!(body, b"rate limited, wait and retry.");

        clock.advance(Duration::from_secs(1));
        let mut host = MockHost::default();
        let mut ctx = GrayRequest::new(3, ext.clone());
        assert_eq!(ctx.on_http_request_headers(&mut host, 0, true), Action::Continue);
        assert_eq!(ext.lock().unwrap().remaining_tokens(), 1);
    }

    #[test]
    fn test_failed_throttle_response_resumes() {
        let (ext, _) = extension("[]", 0, local_store());
        let mut host = MockHost {
            fail_send: true,
            ..Default::default()
        };
        let mut ctx = GrayRequest::new(1, ext);

        assert_eq!(ctx.on_http_request_headers(&mut host, 0, true), Action::Continue);
        assert!(host.resumed);
        assert!(host.sent.is_none());
    }

    #[test]
    fn test_diagnostic_headers_on_every_response() {
        let (ext, _) = extension("[]", 10, local_store());
        let mut host = MockHost::default();
        let mut ctx = GrayRequest::new(1, ext);
        ctx.on_http_request_headers(&mut host, 0, true);
        ctx.on_http_response_headers(&mut host, 0, true);

        assert_eq!(
            host.added_response,
            vec![
                ("who-am-i".to_string(), "gray-filter".to_string()),
                ("injected-by".to_string(), "gray-proxy".to_string()),
            ]
        );
    }

    #[test]
    fn test_already_marked_request_is_not_tagged_twice() {
        let (ext, _) = extension("[]", 10, local_store());
        let mut host = MockHost::with_headers(&[("x-b3-traceid", "t1"), ("gray", "true")]);
        let mut ctx = GrayRequest::new(1, ext);

        assert_eq!(ctx.on_http_request_headers(&mut host, 2, true), Action::Continue);
        assert_eq!(ctx.decision(), CohortDecision::Gray);
        assert!(host.added_request.is_empty());
    }

    #[test]
    fn test_failed_lookup_keeps_fresh_gray_verdict_without_write() {
        let data = Arc::new(ContendedData {
            fail_get: true,
            ..Default::default()
        });
        let store = Box::new(SharedCorrelationStore::new(data.clone()));
        let (ext, _) = extension(USER_RULE, 10, store);

        let mut host = MockHost::with_headers(&[("x-b3-traceid", "t1"), ("x-user", "alice")]);
        let mut ctx = GrayRequest::new(1, ext.clone());

        assert_eq!(ctx.on_http_request_headers(&mut host, 2, true), Action::Continue);
        assert_eq!(ctx.decision(), CohortDecision::Gray);
        assert_eq!(host.added_request, vec![("gray".to_string(), "true".to_string())]);
        assert_eq!(data.puts.load(Ordering::SeqCst), 0);
        assert_eq!(ext.lock().unwrap().remaining_tokens(), 9);
    }

    #[test]
    fn test_write_conflict_keeps_verdict_without_retry() {
        let data = Arc::new(ContendedData::default());
        let store = Box::new(SharedCorrelationStore::new(data.clone()));
        let (ext, _) = extension(USER_RULE, 10, store);

        let mut host = MockHost::with_headers(&[("x-b3-traceid", "t1"), ("x-user", "alice")]);
        let mut ctx = GrayRequest::new(1, ext);

        assert_eq!(ctx.on_http_request_headers(&mut host, 2, true), Action::Continue);
        assert_eq!(ctx.decision(), CohortDecision::Gray);
        assert_eq!(data.puts.load(Ordering::SeqCst), 1);

        ctx.on_http_response_headers(&mut host, 0, true);
        assert!(host
            .added_response
            .contains(&("app".to_string(), "gray".to_string())));
    }
}
