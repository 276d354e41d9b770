//! Nostr wire protocol
//!
//! The frames this client exchanges with relays, reproduced bit-exact:
//! - Outbound: `["REQ", <sub_id>, <filter>]` and `["CLOSE", <sub_id>]`
//! - Inbound: `["EVENT", <sub_id>, <event>]`; every other inbound frame
//!   type (EOSE, NOTICE, OK, ...) is ignored by this engine.
//!
//! Records are untrusted relay input: deserialization ignores unknown
//! fields and tag access goes through the typed accessors below rather
//! than positional indexing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{EmblemError, Result};

/// Profile metadata (kind 0)
pub const KIND_PROFILE: u32 = 0;
/// Badge award (NIP-58 kind 8)
pub const KIND_BADGE_AWARD: u32 = 8;
/// Badge definition (NIP-58 kind 30008)
pub const KIND_BADGE_DEFINITION: u32 = 30008;
/// Profile badges listing (NIP-58 kind 30009)
pub const KIND_PROFILE_BADGES: u32 = 30009;

// =============================================================================
// Outbound: queries and frames
// =============================================================================

/// One relay query. Immutable once issued; built with the chained
/// constructors below.
#[derive(Debug, Clone, Serialize)]
pub struct Filter {
    /// Event kinds to match
    pub kinds: Vec<u32>,
    /// Author pubkeys (hex), if constrained
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<String>>,
    /// Tag filters, keyed `"#<letter>"` on the wire
    #[serde(flatten)]
    pub tags: BTreeMap<String, Vec<String>>,
    /// Result-count bound
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl Filter {
    pub fn new<I: IntoIterator<Item = u32>>(kinds: I) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
            authors: None,
            tags: BTreeMap::new(),
            limit: None,
        }
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authors = Some(authors.into_iter().map(Into::into).collect());
        self
    }

    /// Add a `#<letter>` tag filter.
    pub fn tag<I, S>(mut self, letter: char, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.insert(
            format!("#{letter}"),
            values.into_iter().map(Into::into).collect(),
        );
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// An outbound client frame.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    /// Open a subscription: `["REQ", <sub_id>, <filter>]`
    Req { sub_id: String, filter: Filter },
    /// Cancel a subscription: `["CLOSE", <sub_id>]`
    Close { sub_id: String },
}

impl ClientMessage {
    /// Serialize to the wire text frame.
    pub fn frame(&self) -> String {
        match self {
            ClientMessage::Req { sub_id, filter } => {
                serde_json::to_string(&("REQ", sub_id, filter)).expect("Failed to encode REQ frame")
            }
            ClientMessage::Close { sub_id } => {
                serde_json::to_string(&("CLOSE", sub_id)).expect("Failed to encode CLOSE frame")
            }
        }
    }
}

// =============================================================================
// Inbound: records and frame parsing
// =============================================================================

/// One relay-delivered record. Only the fields this engine reads are
/// kept; everything else in the JSON is dropped on deserialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: u32,
    pub pubkey: String,
    #[serde(default)]
    pub tags: Vec<Vec<String>>,
    #[serde(default)]
    pub content: String,
}

impl Event {
    /// Values of every `[name, value, ...]` tag with the given name, in
    /// tag order. Tags without a value slot are skipped.
    pub fn tag_values<'s, 'n>(&'s self, name: &'n str) -> impl Iterator<Item = &'s str> + use<'s, 'n> {
        self.tags
            .iter()
            .filter(move |tag| tag.first().map(|n| n == name).unwrap_or(false))
            .filter_map(|tag| tag.get(1).map(String::as_str))
    }

    /// Value of the first tag with the given name.
    pub fn tag_value(&self, name: &str) -> Option<&str> {
        self.tag_values(name).next()
    }

    /// Whether any tag with the given name carries the given value.
    pub fn has_tag_value(&self, name: &str, value: &str) -> bool {
        self.tag_values(name).any(|v| v == value)
    }
}

/// Kind-0 profile content, the subset this client reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileMetadata {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub picture: Option<String>,
    pub about: Option<String>,
}

/// A parsed inbound frame.
#[derive(Debug, Clone)]
pub enum RelayMessage {
    /// `["EVENT", <sub_id>, <event>]`
    Event { sub_id: String, event: Event },
    /// Any other frame type; dropped at the pool boundary
    Other,
}

/// Parse one inbound text frame.
pub fn parse_frame(text: &str) -> Result<RelayMessage> {
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| EmblemError::Protocol(format!("Invalid frame JSON: {e}")))?;

    let arr = value
        .as_array()
        .ok_or_else(|| EmblemError::Protocol("Frame is not an array".to_string()))?;

    match arr.first().and_then(|v| v.as_str()) {
        Some("EVENT") => {
            if arr.len() < 3 {
                return Err(EmblemError::Protocol("Truncated EVENT frame".to_string()));
            }
            let sub_id = arr[1]
                .as_str()
                .ok_or_else(|| EmblemError::Protocol("EVENT subscription id is not a string".to_string()))?
                .to_string();
            let event: Event = serde_json::from_value(arr[2].clone())
                .map_err(|e| EmblemError::Protocol(format!("Invalid event payload: {e}")))?;
            Ok(RelayMessage::Event { sub_id, event })
        }
        Some(_) => Ok(RelayMessage::Other),
        None => Err(EmblemError::Protocol("Missing frame type".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_req_frame_wire_format() {
        let filter = Filter::new([KIND_BADGE_DEFINITION])
            .authors(["ISSUER"])
            .tag('d', ["d1"])
            .limit(1);
        let frame = ClientMessage::Req {
            sub_id: "30008-abc123".to_string(),
            filter,
        }
        .frame();

        assert_eq!(
            frame,
            r##"["REQ","30008-abc123",{"kinds":[30008],"authors":["ISSUER"],"#d":["d1"],"limit":1}]"##
        );
    }

    #[test]
    fn test_close_frame_wire_format() {
        let frame = ClientMessage::Close {
            sub_id: "0-deadbeef".to_string(),
        }
        .frame();
        assert_eq!(frame, r#"["CLOSE","0-deadbeef"]"#);
    }

    #[test]
    fn test_filter_omits_absent_fields() {
        let frame = ClientMessage::Req {
            sub_id: "s".to_string(),
            filter: Filter::new([0]),
        }
        .frame();
        assert_eq!(frame, r#"["REQ","s",{"kinds":[0]}]"#);
    }

    #[test]
    fn test_parse_event_frame() {
        let text = r#"["EVENT","sub-1",{"kind":8,"pubkey":"ab","tags":[["a","30008:x:y"]],"content":""}]"#;
        match parse_frame(text).unwrap() {
            RelayMessage::Event { sub_id, event } => {
                assert_eq!(sub_id, "sub-1");
                assert_eq!(event.kind, 8);
                assert_eq!(event.tag_value("a"), Some("30008:x:y"));
            }
            other => panic!("Expected Event, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_event_ignores_unknown_fields() {
        let text = r#"["EVENT","s",{"id":"ff","kind":0,"pubkey":"ab","created_at":1,"sig":"00","tags":[],"content":"{}"}]"#;
        assert!(matches!(
            parse_frame(text).unwrap(),
            RelayMessage::Event { .. }
        ));
    }

    #[test]
    fn test_parse_other_frame_types() {
        assert!(matches!(
            parse_frame(r#"["EOSE","sub-1"]"#).unwrap(),
            RelayMessage::Other
        ));
        assert!(matches!(
            parse_frame(r#"["NOTICE","slow down"]"#).unwrap(),
            RelayMessage::Other
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_frame("not json").is_err());
        assert!(parse_frame(r#"{"kind":1}"#).is_err());
        assert!(parse_frame(r#"["EVENT","sub-1"]"#).is_err());
        assert!(parse_frame(r#"[42]"#).is_err());
    }

    #[test]
    fn test_tag_accessors() {
        let event = Event {
            kind: 30008,
            pubkey: "ab".to_string(),
            tags: vec![
                vec!["d".to_string(), "bravery".to_string()],
                vec!["name".to_string(), "Medal of Bravery".to_string()],
                vec!["d".to_string(), "second".to_string()],
                vec!["empty".to_string()],
            ],
            content: String::new(),
        };
        assert_eq!(event.tag_value("d"), Some("bravery"));
        assert_eq!(event.tag_values("d").count(), 2);
        assert_eq!(event.tag_value("empty"), None);
        assert!(event.has_tag_value("name", "Medal of Bravery"));
        assert!(!event.has_tag_value("name", "Other"));
    }
}
