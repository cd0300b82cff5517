//! Boolean accept/reject checks for inbound traffic.
//!
//! The host channel is shared with unrelated traffic, so rejection is the
//! normal outcome for foreign messages. These helpers never panic.

use serde_json::Value;

use crate::Envelope;

/// Whether `value` is a well-formed protocol message.
pub fn validate(value: &Value) -> bool {
    Envelope::from_value(value).is_ok()
}

/// Whether `text` is JSON for a well-formed protocol message.
pub fn validate_str(text: &str) -> bool {
    Envelope::decode(text).is_ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_catalogue_messages() {
        assert!(validate(&json!({ "type": "SCAN_DEVICES", "payload": {} })));
        assert!(validate(&json!({
            "type": "ERROR",
            "payload": { "code": "HOST_FAILURE", "message": "boom", "details": { "retry": false } }
        })));
    }

    #[test]
    fn rejects_foreign_traffic() {
        assert!(!validate(&json!({ "source": "react-devtools", "payload": {} })));
        assert!(!validate(&json!(null)));
        assert!(!validate_str("webpackHotUpdate"));
        assert!(!validate_str(""));
    }

    #[test]
    fn rejects_payload_that_is_not_an_object() {
        assert!(!validate(&json!({ "type": "SCAN_DEVICES", "payload": [] })));
    }
}
