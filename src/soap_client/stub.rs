//! Provides an implementation of a SOAP client that returns stubbed responses.
//! Useful for testing.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::{StatisticsEngine, TransportError};

use super::{SoapClient, SoapResponse, encode_envelope};

/// Response key that fails the request as if the simulator were down.
pub(crate) const UNREACHABLE: &str = "unreachable";

/// Replays canned responses from `testdata/responses/<key>.xml`.
///
/// Keys end in the HTTP status to report, e.g. `reset-aircraft-200`. Keys are consumed
/// in order; the last one repeats once the list is exhausted.
pub(crate) struct StubSoapClient {
    responses: Mutex<VecDeque<String>>,
    pub(crate) statistics: Option<Arc<StatisticsEngine>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubSoapClient {
    pub fn new(responses: Vec<String>) -> Self {
        StubSoapClient {
            responses: Mutex::new(responses.into()),
            statistics: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Handle on the recorded requests that outlives the client.
    pub(crate) fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }

    fn add_request(&self, request: &str) {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.to_string());
    }

    fn next_response(&self) -> String {
        let mut responses = self.responses.lock().unwrap();
        if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses
                .front()
                .cloned()
                .expect("stub has no responses configured")
        }
    }
}

impl SoapClient for StubSoapClient {
    fn send_action(&self, action: &str, body: &str) -> Result<SoapResponse, TransportError> {
        let envelope = encode_envelope(action, body);
        self.add_request(&envelope);

        let response_key = self.next_response();
        if response_key == UNREACHABLE {
            if let Some(statistics) = &self.statistics {
                statistics.increment_error_count();
            }
            return Err(TransportError::Unavailable {
                waited: Duration::ZERO,
                reason: format!("stubbed failure for {}", action),
            });
        }

        if let Some(statistics) = &self.statistics {
            statistics.increment_request_count();
        }

        let code = response_key.rsplit('-').next().unwrap();

        Ok(SoapResponse {
            status_code: code.parse().unwrap(),
            body: load_response(&response_key),
        })
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) fn load_response(response_key: &str) -> String {
    use std::path::PathBuf;

    let response_path: PathBuf = [
        env!("CARGO_MANIFEST_DIR"),
        "testdata",
        "responses",
        &format!("{}.xml", response_key),
    ]
    .iter()
    .collect();

    std::fs::read_to_string(&response_path)
        .unwrap_or_else(|e| panic!("missing stub response {:?}: {}", response_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_responses_in_order_and_repeats_the_last() {
        let stub = StubSoapClient::new(vec![
            "reset-aircraft-200".to_string(),
            "return-data-500".to_string(),
        ]);

        assert_eq!(stub.send_action("ResetAircraft", "").unwrap().status_code, 200);
        assert_eq!(stub.send_action("ExchangeData", "").unwrap().status_code, 500);
        assert_eq!(stub.send_action("ExchangeData", "").unwrap().status_code, 500);
        assert_eq!(stub.requests().len(), 3);
    }

    #[test]
    fn unreachable_key_fails_the_request() {
        let stub = StubSoapClient::new(vec![UNREACHABLE.to_string()]);
        let result = stub.send_action("InjectUAVControllerInterface", "");
        assert!(matches!(result, Err(TransportError::Unavailable { .. })));
    }

    #[test]
    fn request_log_is_shared() {
        let stub = StubSoapClient::new(vec!["reset-aircraft-200".to_string()]);
        let log = stub.request_log();

        stub.send_action("ResetAircraft", "").unwrap();
        drop(stub);

        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
