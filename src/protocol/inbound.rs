//! Classification of inbound frames.
//!
//! A frame with an `id` is a reply to a command; a frame with a `method` and
//! no `id` is an event. Anything else is malformed.

use serde_json::Value;

use crate::error::{Error, Result};

use super::{Event, Response};

// ============================================================================
// Inbound
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Reply correlated to a command ID.
    Response(Response),
    /// Unsolicited event.
    Event(Event),
}

impl Inbound {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the frame is not JSON, is not an
    /// object, or is neither a reply nor an event.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::invalid_response(format!("frame is not JSON: {e}")))?;

        if !value.is_object() {
            return Err(Error::invalid_response("frame is not a JSON object"));
        }

        if value.get("id").is_some() {
            let response = serde_json::from_value(value)
                .map_err(|e| Error::invalid_response(format!("malformed reply: {e}")))?;
            return Ok(Self::Response(response));
        }

        if value.get("method").is_some() {
            let event = serde_json::from_value(value)
                .map_err(|e| Error::invalid_response(format!("malformed event: {e}")))?;
            return Ok(Self::Event(event));
        }

        Err(Error::invalid_response("frame has neither id nor method"))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::MessageId;

    #[test]
    fn test_parse_reply() {
        match Inbound::parse(r#"{"id": 9, "result": {}}"#).expect("parse") {
            Inbound::Response(r) => assert_eq!(r.id, MessageId::new(9)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_event() {
        match Inbound::parse(r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1}}"#)
            .expect("parse")
        {
            Inbound::Event(e) => assert_eq!(e.method, "Page.loadEventFired"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_without_params() {
        match Inbound::parse(r#"{"method": "Page.domContentEventFired"}"#).expect("parse") {
            Inbound::Event(e) => assert_eq!(e.params, Value::Null),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Inbound::parse("not json"),
            Err(Error::InvalidResponse { .. })
        ));
        assert!(matches!(
            Inbound::parse("[1, 2]"),
            Err(Error::InvalidResponse { .. })
        ));
        assert!(matches!(
            Inbound::parse(r#"{"params": {}}"#),
            Err(Error::InvalidResponse { .. })
        ));
        assert!(matches!(
            Inbound::parse(r#"{"id": "not-a-number"}"#),
            Err(Error::InvalidResponse { .. })
        ));
    }
}
