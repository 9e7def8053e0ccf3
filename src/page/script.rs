//! JavaScript evaluation.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::{LoaderId, MessageId};
use crate::protocol::Message;
use crate::transport::ResponseReader;

use super::Page;
use super::frames::LoaderWatch;

// ============================================================================
// Page - Script
// ============================================================================

impl Page {
    /// Evaluates `expression` in the main frame.
    ///
    /// Sends `Runtime.evaluate` with `awaitPromise` and `returnByValue` and
    /// returns at once. The handle remembers the generation in effect when
    /// the command was sent. No pump happens before the send.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let evaluation = page.evaluate("document.title").await?;
    /// let result = evaluation.wait_for_result(5_000).await?;
    /// let title = result.value_if_current()?;
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the command cannot be transmitted.
    pub async fn evaluate(&self, expression: &str) -> Result<EvaluationHandle> {
        let generation_at_send = self.latest_loader_id();

        let message = Message::new("Runtime.evaluate")
            .param("expression", expression)
            .param("awaitPromise", true)
            .param("returnByValue", true);
        let reader = self.session.send_deferred(&message).await?;

        debug!(id = %reader.id(), loader_id = ?generation_at_send, "Evaluating script");

        Ok(EvaluationHandle {
            reader,
            watch: self.loader_watch(),
            generation_at_send,
        })
    }
}

// ============================================================================
// EvaluationHandle
// ============================================================================

/// Pending result of [`Page::evaluate`].
#[derive(Debug)]
pub struct EvaluationHandle {
    reader: ResponseReader,
    watch: LoaderWatch,
    generation_at_send: Option<LoaderId>,
}

impl EvaluationHandle {
    /// Returns the message ID of the evaluation.
    #[inline]
    #[must_use]
    pub fn id(&self) -> MessageId {
        self.reader.id()
    }

    /// Returns the generation in effect when the evaluation was sent.
    #[inline]
    #[must_use]
    pub fn generation_at_send(&self) -> Option<&LoaderId> {
        self.generation_at_send.as_ref()
    }

    /// Checks for the reply, pumping at most once.
    pub async fn is_resolved(&mut self) -> Result<bool> {
        Ok(self.reader.poll().await?.is_some())
    }

    /// Waits for the evaluation to finish.
    ///
    /// # Errors
    ///
    /// - [`Error::ResponseHasError`] if the command itself failed
    /// - [`Error::Evaluation`] if the script threw
    /// - [`Error::OperationTimedOut`] if no reply arrives in time
    pub async fn wait_for_result(mut self, timeout_ms: u64) -> Result<EvaluationResult> {
        self.reader.wait_for_response(timeout_ms).await?;
        let generation_at_resolve = self.watch.latest_loader_id();

        let id = self.reader.id();
        let response = self
            .reader
            .into_response()
            .ok_or_else(|| Error::no_response(id, "Runtime.evaluate"))?;
        let result = response.into_result()?;

        if let Some(exception) = result.get("exceptionDetails") {
            return Err(Error::evaluation(describe_exception(exception)));
        }

        let value = result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null);

        let evaluation = EvaluationResult {
            value,
            generation_at_send: self.generation_at_send,
            generation_at_resolve,
        };

        if evaluation.navigated_during_evaluation() {
            warn!(
                id = %id,
                sent = ?evaluation.generation_at_send,
                resolved = ?evaluation.generation_at_resolve,
                "Evaluation raced a navigation"
            );
        }

        Ok(evaluation)
    }
}

fn describe_exception(exception: &Value) -> String {
    exception
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| exception.get("text").and_then(Value::as_str))
        .unwrap_or("unknown exception")
        .to_string()
}

// ============================================================================
// EvaluationResult
// ============================================================================

/// Value of a finished evaluation and the generations around it.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    value: Value,
    generation_at_send: Option<LoaderId>,
    generation_at_resolve: Option<LoaderId>,
}

impl EvaluationResult {
    /// Returns the value without checking provenance.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consumes the result, returning the value without checking provenance.
    #[inline]
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Generation in effect when the evaluation was sent.
    #[inline]
    #[must_use]
    pub fn generation_at_send(&self) -> Option<&LoaderId> {
        self.generation_at_send.as_ref()
    }

    /// Generation in effect when the reply was read.
    #[inline]
    #[must_use]
    pub fn generation_at_resolve(&self) -> Option<&LoaderId> {
        self.generation_at_resolve.as_ref()
    }

    /// Returns `true` if the main frame changed generation in between, so
    /// the value may come from a different document.
    #[inline]
    #[must_use]
    pub fn navigated_during_evaluation(&self) -> bool {
        self.generation_at_send != self.generation_at_resolve
    }

    /// Returns the value only if no navigation happened in between.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EvaluationRaced`] if the generation changed.
    pub fn value_if_current(&self) -> Result<&Value> {
        if self.navigated_during_evaluation() {
            return Err(Error::evaluation_raced(
                self.generation_at_send.as_ref(),
                self.generation_at_resolve.as_ref(),
            ));
        }
        Ok(&self.value)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::page::fixtures::page_with_clock;
    use crate::testing::{error_frame, frame_navigated, ok_frame};
    use crate::transport::mock::MockTransport;

    use super::*;

    #[tokio::test]
    async fn test_evaluate_sends_by_value_request() {
        let mock = MockTransport::new();
        let (page, _clock) = page_with_clock(&mock, "L1");

        let handle = page.evaluate("1 + 1").await.expect("send");

        let sent = mock.sent();
        let sent = &sent[0];
        assert_eq!(sent["method"], "Runtime.evaluate");
        assert_eq!(sent["params"]["expression"], "1 + 1");
        assert_eq!(sent["params"]["awaitPromise"], true);
        assert_eq!(sent["params"]["returnByValue"], true);
        // Sending does not pump.
        assert_eq!(mock.reads(), 0);
        assert_eq!(handle.generation_at_send(), Some(&LoaderId::new("L1")));
    }

    #[tokio::test]
    async fn test_wait_for_result_value() {
        let mock = MockTransport::new();
        mock.respond_to("Runtime.evaluate", |id, _| {
            vec![ok_frame(id, json!({"result": {"type": "number", "value": 2}}))]
        });
        let (page, _clock) = page_with_clock(&mock, "L1");

        let result = page
            .evaluate("1 + 1")
            .await
            .expect("send")
            .wait_for_result(1_000)
            .await
            .expect("result");

        assert_eq!(result.value(), &json!(2));
        assert!(!result.navigated_during_evaluation());
        assert_eq!(result.value_if_current().expect("current"), &json!(2));
    }

    #[tokio::test]
    async fn test_undefined_result_is_null() {
        let mock = MockTransport::new();
        mock.respond_to("Runtime.evaluate", |id, _| {
            vec![ok_frame(id, json!({"result": {"type": "undefined"}}))]
        });
        let (page, _clock) = page_with_clock(&mock, "L1");

        let result = page
            .evaluate("void 0")
            .await
            .expect("send")
            .wait_for_result(1_000)
            .await
            .expect("result");
        assert_eq!(result.into_value(), Value::Null);
    }

    #[tokio::test]
    async fn test_exception_becomes_evaluation_error() {
        let mock = MockTransport::new();
        mock.respond_to("Runtime.evaluate", |id, _| {
            vec![ok_frame(
                id,
                json!({
                    "result": {"type": "object", "subtype": "error"},
                    "exceptionDetails": {
                        "text": "Uncaught",
                        "exception": {"description": "ReferenceError: nope is not defined"}
                    }
                }),
            )]
        });
        let (page, _clock) = page_with_clock(&mock, "L1");

        let err = page
            .evaluate("nope")
            .await
            .expect("send")
            .wait_for_result(1_000)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Evaluation { ref message } if message.contains("ReferenceError")));
    }

    #[tokio::test]
    async fn test_protocol_error_surfaces() {
        let mock = MockTransport::new();
        mock.respond_to("Runtime.evaluate", |id, _| vec![error_frame(id, "Cannot find context")]);
        let (page, _clock) = page_with_clock(&mock, "L1");

        let err = page
            .evaluate("1")
            .await
            .expect("send")
            .wait_for_result(1_000)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ResponseHasError { .. }));
    }

    #[tokio::test]
    async fn test_navigation_race_is_detected() {
        let mock = MockTransport::new();
        let (page, _clock) = page_with_clock(&mock, "L1");

        let handle = page.evaluate("document.title").await.expect("send");
        let id = handle.id().as_u64();

        // The page navigates before the reply is read.
        mock.push(frame_navigated("MAIN", "L2", "https://example.com/other"));
        mock.push(ok_frame(id, json!({"result": {"type": "string", "value": "Old"}})));

        let result = handle.wait_for_result(1_000).await.expect("result");

        assert_eq!(result.generation_at_send(), Some(&LoaderId::new("L1")));
        assert_eq!(result.generation_at_resolve(), Some(&LoaderId::new("L2")));
        assert!(result.navigated_during_evaluation());
        assert!(matches!(
            result.value_if_current(),
            Err(Error::EvaluationRaced { .. })
        ));
        assert_eq!(result.value(), &json!("Old"));
    }

    #[tokio::test]
    async fn test_is_resolved_polls() {
        let mock = MockTransport::new();
        let (page, _clock) = page_with_clock(&mock, "L1");

        let mut handle = page.evaluate("1").await.expect("send");
        assert!(!handle.is_resolved().await.expect("poll"));

        mock.push(ok_frame(handle.id().as_u64(), json!({"result": {"value": 1}})));
        assert!(handle.is_resolved().await.expect("poll"));
    }
}
