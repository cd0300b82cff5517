//! Fuzz target for inbound message decoding
//!
//! The host channel carries arbitrary page traffic, so every inbound string
//! is untrusted.
//!
//! # Strategy
//!
//! - Raw text: arbitrary strings straight into `Envelope::decode`
//! - Shaped JSON: objects with known or unknown `type`, any `requestId`
//!   shape, and payloads of every JSON type
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - `validate_str` agrees with `Envelope::decode`
//! - Accepted responses always carry a non-empty request id
//! - Accepted messages re-encode and decode to the same envelope

#![no_main]

use arbitrary::Arbitrary;
use castlink_proto::{Envelope, MessageKind, validate, validate_str};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Raw(String),
    Shaped { kind: KindChoice, request_id: IdChoice, payload: PayloadChoice },
}

#[derive(Debug, Clone, Arbitrary)]
enum KindChoice {
    Known(u8),
    Unknown(String),
    NotAString(i64),
    Missing,
}

#[derive(Debug, Clone, Arbitrary)]
enum IdChoice {
    Text(String),
    Number(u32),
    Null,
    Missing,
}

#[derive(Debug, Clone, Arbitrary)]
enum PayloadChoice {
    Empty,
    Missing,
    Fields(Vec<(String, FieldValue)>),
    Array(Vec<i64>),
    Text(String),
}

#[derive(Debug, Clone, Arbitrary)]
enum FieldValue {
    Bool(bool),
    Int(i64),
    Text(String),
    Null,
    Devices(Vec<(String, String, Option<bool>)>),
}

impl FieldValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => json!(b),
            Self::Int(i) => json!(i),
            Self::Text(s) => json!(s),
            Self::Null => Value::Null,
            Self::Devices(devices) => Value::Array(
                devices
                    .iter()
                    .map(|(id, name, connected)| {
                        json!({ "id": id, "name": name, "type": "chromecast", "isConnected": connected })
                    })
                    .collect(),
            ),
        }
    }
}

fn shaped(kind: &KindChoice, request_id: &IdChoice, payload: &PayloadChoice) -> Value {
    let mut object = Map::new();
    match kind {
        KindChoice::Known(n) => {
            let kind = MessageKind::ALL[*n as usize % MessageKind::ALL.len()];
            object.insert("type".into(), json!(kind.as_str()));
        },
        KindChoice::Unknown(name) => {
            object.insert("type".into(), json!(name));
        },
        KindChoice::NotAString(n) => {
            object.insert("type".into(), json!(n));
        },
        KindChoice::Missing => {},
    }
    match request_id {
        IdChoice::Text(id) => {
            object.insert("requestId".into(), json!(id));
        },
        IdChoice::Number(n) => {
            object.insert("requestId".into(), json!(n));
        },
        IdChoice::Null => {
            object.insert("requestId".into(), Value::Null);
        },
        IdChoice::Missing => {},
    }
    match payload {
        PayloadChoice::Empty => {
            object.insert("payload".into(), json!({}));
        },
        PayloadChoice::Missing => {},
        PayloadChoice::Fields(fields) => {
            let fields: Map<String, Value> =
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
            object.insert("payload".into(), Value::Object(fields));
        },
        PayloadChoice::Array(items) => {
            object.insert("payload".into(), json!(items));
        },
        PayloadChoice::Text(text) => {
            object.insert("payload".into(), json!(text));
        },
    }
    Value::Object(object)
}

fn check(text: &str) {
    let decoded = Envelope::decode(text);
    assert_eq!(decoded.is_ok(), validate_str(text), "validate_str disagrees with decode");

    let Ok(envelope) = decoded else {
        return;
    };

    if envelope.kind().is_response() {
        let id = envelope.request_id.as_ref().expect("response accepted without request id");
        assert!(!id.as_str().is_empty());
    }

    let encoded = envelope.encode().expect("accepted message must encode");
    let again = Envelope::decode(&encoded).expect("re-encoded message must decode");
    assert_eq!(again, envelope);
}

fuzz_target!(|input: Input| {
    match input {
        Input::Raw(text) => check(&text),
        Input::Shaped { kind, request_id, payload } => {
            let value = shaped(&kind, &request_id, &payload);
            assert_eq!(validate(&value), Envelope::from_value(&value).is_ok());
            check(&value.to_string());
        },
    }
});
