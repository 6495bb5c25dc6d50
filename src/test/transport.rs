//! A scripted transport for unit tests: responses are queued up front and
//! every request is recorded so tests can assert on the exact RPC traffic.
//! A response can also be stalled to stand in for a node that stopped
//! answering.

use jsonrpc_core::{Call, Error as RpcError, ErrorCode, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use web3::error::Error;
use web3::futures::future::{self, Either, Pending, Ready};
use web3::helpers;
use web3::{RequestId, Transport};

/// Type alias for request method and value pairs
type Requests = Vec<(String, Vec<Value>)>;

#[derive(Debug)]
enum Response {
    Ready(Result<Value, Error>),
    Stalled,
}

#[derive(Debug, Default)]
struct Inner {
    asserted: usize,
    requests: Requests,
    responses: VecDeque<Response>,
}

/// Test transport
#[derive(Debug, Default, Clone)]
pub struct TestTransport {
    inner: Arc<Mutex<Inner>>,
}

impl Transport for TestTransport {
    type Out = Either<Ready<Result<Value, Error>>, Pending<Result<Value, Error>>>;

    fn prepare(&self, method: &str, params: Vec<Value>) -> (RequestId, Call) {
        let request = helpers::build_request(1, method, params.clone());
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push((method.into(), params));
        (inner.requests.len(), request)
    }

    fn send(&self, id: RequestId, request: Call) -> Self::Out {
        let response = self.inner.lock().unwrap().responses.pop_front();
        match response {
            Some(Response::Ready(response)) => Either::Left(future::ready(response)),
            Some(Response::Stalled) => Either::Right(future::pending()),
            None => {
                println!("Unexpected request (id: {:?}): {:?}", id, request);
                Either::Left(future::err(Error::Unreachable))
            }
        }
    }
}

impl TestTransport {
    /// Create a new test transport instance.
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a response to an eventual request.
    pub fn add_response(&mut self, value: Value) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(Response::Ready(Ok(value)));
    }

    /// Add a JSON-RPC error response to an eventual request.
    pub fn add_error(&mut self, code: i64, message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(Response::Ready(Err(Error::Rpc(RpcError {
            code: ErrorCode::from(code),
            message: message.to_owned(),
            data: None,
        }))));
    }

    /// Add a response that never resolves.
    pub fn add_stalled_response(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(Response::Stalled);
    }

    /// Assert that a request was made.
    pub fn assert_request(&mut self, method: &str, params: &[Value]) {
        let (m, p) = self.next_request();
        assert_eq!(&m, method);
        assert_eq!(&p[..], params);
    }

    /// Assert that a request with the given method was made, regardless of
    /// its parameters.
    pub fn assert_request_method(&mut self, method: &str) {
        let (m, _) = self.next_request();
        assert_eq!(&m, method);
    }

    /// The number of requests made so far.
    pub fn request_count(&self) -> usize {
        self.inner.lock().unwrap().requests.len()
    }

    /// Assert that there are no more pending requests.
    pub fn assert_no_more_requests(&self) {
        let inner = self.inner.lock().unwrap();
        assert_eq!(
            inner.asserted,
            inner.requests.len(),
            "Expected no more requests, got: {:?}",
            &inner.requests[inner.asserted..]
        );
    }

    fn next_request(&mut self) -> (String, Vec<Value>) {
        let mut inner = self.inner.lock().unwrap();
        let idx = inner.asserted;
        inner.asserted += 1;

        inner.requests.get(idx).expect("Expected result.").clone()
    }
}
