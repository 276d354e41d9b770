//! Badge domain types
//!
//! A [`BadgeKey`] is the composite natural key (issuer pubkey plus d-tag
//! identifier) that names one badge definition regardless of which relay
//! delivered it or how many awards reference it. A [`BadgeDefinition`]
//! is the displayable metadata derived from a definition record's tags.

use serde::Serialize;
use std::fmt;

use crate::protocol::{Event, KIND_BADGE_DEFINITION};

/// Composite key of one badge definition, serialized `"issuer:identifier"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BadgeKey {
    /// Issuer pubkey (hex)
    pub issuer: String,
    /// The definition's d-tag identifier
    pub identifier: String,
}

impl BadgeKey {
    pub fn new(issuer: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            identifier: identifier.into(),
        }
    }

    /// Parse a composite reference tag value,
    /// `"30008:<issuer>:<identifier>"`. Returns `None` when the kind
    /// component is not the definition kind or a component is missing.
    pub fn parse_ref(value: &str) -> Option<Self> {
        let mut parts = value.splitn(3, ':');
        let kind = parts.next()?;
        let issuer = parts.next()?;
        let identifier = parts.next()?;

        if kind != KIND_BADGE_DEFINITION.to_string() {
            return None;
        }
        if issuer.is_empty() || identifier.is_empty() {
            return None;
        }
        Some(Self::new(issuer, identifier))
    }

    /// Key of a definition record itself: author plus `d` tag.
    pub fn from_definition(event: &Event) -> Option<Self> {
        let identifier = event.tag_value("d")?;
        if identifier.is_empty() {
            return None;
        }
        Some(Self::new(event.pubkey.clone(), identifier))
    }
}

impl fmt::Display for BadgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.issuer, self.identifier)
    }
}

/// Displayable badge metadata, derived once from the first definition
/// record seen for a key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeDefinition {
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Issuer pubkey (hex)
    pub issuer: String,
}

impl BadgeDefinition {
    /// Derive from a definition record's tags, with the wire defaults:
    /// missing name becomes "Unnamed", the image falls back to the
    /// thumb tag.
    pub fn from_event(event: &Event) -> Self {
        Self {
            name: event.tag_value("name").unwrap_or("Unnamed").to_string(),
            description: event.tag_value("description").unwrap_or_default().to_string(),
            image_url: event
                .tag_value("image")
                .or_else(|| event.tag_value("thumb"))
                .unwrap_or_default()
                .to_string(),
            issuer: event.pubkey.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition_event(tags: &[&[&str]]) -> Event {
        Event {
            kind: KIND_BADGE_DEFINITION,
            pubkey: "issuer-pk".to_string(),
            tags: tags
                .iter()
                .map(|t| t.iter().map(|s| s.to_string()).collect())
                .collect(),
            content: String::new(),
        }
    }

    #[test]
    fn test_parse_ref() {
        let key = BadgeKey::parse_ref("30008:abc:bravery").unwrap();
        assert_eq!(key.issuer, "abc");
        assert_eq!(key.identifier, "bravery");
        assert_eq!(key.to_string(), "abc:bravery");
    }

    #[test]
    fn test_parse_ref_keeps_colons_in_identifier() {
        let key = BadgeKey::parse_ref("30008:abc:a:b:c").unwrap();
        assert_eq!(key.identifier, "a:b:c");
    }

    #[test]
    fn test_parse_ref_rejects_wrong_kind() {
        assert!(BadgeKey::parse_ref("8:abc:bravery").is_none());
        assert!(BadgeKey::parse_ref("30009:abc:bravery").is_none());
    }

    #[test]
    fn test_parse_ref_rejects_missing_components() {
        assert!(BadgeKey::parse_ref("30008").is_none());
        assert!(BadgeKey::parse_ref("30008:abc").is_none());
        assert!(BadgeKey::parse_ref("30008::bravery").is_none());
        assert!(BadgeKey::parse_ref("30008:abc:").is_none());
    }

    #[test]
    fn test_from_definition() {
        let event = definition_event(&[&["d", "bravery"]]);
        let key = BadgeKey::from_definition(&event).unwrap();
        assert_eq!(key.issuer, "issuer-pk");
        assert_eq!(key.identifier, "bravery");
    }

    #[test]
    fn test_from_definition_requires_d_tag() {
        assert!(BadgeKey::from_definition(&definition_event(&[])).is_none());
        assert!(BadgeKey::from_definition(&definition_event(&[&["d", ""]])).is_none());
    }

    #[test]
    fn test_definition_from_event_with_defaults() {
        let event = definition_event(&[&["d", "x"]]);
        let def = BadgeDefinition::from_event(&event);
        assert_eq!(def.name, "Unnamed");
        assert_eq!(def.description, "");
        assert_eq!(def.image_url, "");
        assert_eq!(def.issuer, "issuer-pk");
    }

    #[test]
    fn test_definition_image_falls_back_to_thumb() {
        let event = definition_event(&[
            &["d", "x"],
            &["name", "Medal"],
            &["thumb", "https://example.com/t.png"],
        ]);
        let def = BadgeDefinition::from_event(&event);
        assert_eq!(def.name, "Medal");
        assert_eq!(def.image_url, "https://example.com/t.png");

        let event = definition_event(&[
            &["d", "x"],
            &["image", "https://example.com/i.png"],
            &["thumb", "https://example.com/t.png"],
        ]);
        assert_eq!(
            BadgeDefinition::from_event(&event).image_url,
            "https://example.com/i.png"
        );
    }
}
