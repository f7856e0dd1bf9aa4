//! Connection handler that evaluates framed requests.

use std::os::unix::net::UnixStream;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::completion;
use crate::evaluator::EvaluatorProvider;
use crate::protocol::{self, Request};
use crate::session::SessionRegistry;
use crate::transport::ConnectionHandler;

use super::DISPATCH_TARGET;

/// Connection handler that evaluates one request per connection.
pub struct EvalConnectionHandler<P: EvaluatorProvider> {
    registry: Arc<SessionRegistry<P>>,
}

impl<P: EvaluatorProvider> EvalConnectionHandler<P> {
    /// Creates a handler that resolves sessions through `registry`.
    #[must_use]
    pub const fn new(registry: Arc<SessionRegistry<P>>) -> Self {
        Self { registry }
    }

    fn dispatch(&self, mut stream: UnixStream) {
        let request = match protocol::read_request(&mut stream) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(target: DISPATCH_TARGET, "client disconnected before sending a full request");
                return;
            }
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "failed to read request");
                return;
            }
        };

        let Some(response) = self.evaluate(&request) else {
            return;
        };

        if let Err(error) = protocol::write_response(&mut stream, &response) {
            warn!(
                target: DISPATCH_TARGET,
                session = %request.session_key,
                %error,
                "failed to write response"
            );
        }
    }

    fn evaluate(&self, request: &Request) -> Option<String> {
        debug!(
            target: DISPATCH_TARGET,
            session = %request.session_key,
            timeout_millis = request.timeout_millis,
            code_bytes = request.code.len(),
            "evaluating request"
        );
        match self.registry.with_context(&request.session_key, |context| {
            completion::process(context, &request.code)
        }) {
            Ok(response) => Some(response),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    session = %request.session_key,
                    %error,
                    "session unavailable"
                );
                None
            }
        }
    }
}

impl<P: EvaluatorProvider> ConnectionHandler for EvalConnectionHandler<P> {
    fn handle(&self, stream: UnixStream) {
        self.dispatch(stream);
    }
}
