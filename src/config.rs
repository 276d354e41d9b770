//! Configuration for emblem
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;

/// Relays queried when none are configured
pub const DEFAULT_RELAYS: &[&str] = &[
    "wss://relay.damus.io",
    "wss://relay.nostr.band",
    "wss://nos.lol",
    "wss://relay.snort.social",
    "wss://yabu.me",
    "wss://r.kojira.io",
    "wss://relay-jp.nostr.wirednet.jp",
    "wss://nostr-pub.wellorder.net",
    "wss://relay.primal.net",
    "wss://nostr.wine",
];

/// emblem - multi-relay Nostr badge viewer
#[derive(Parser, Debug, Clone)]
#[command(name = "emblem")]
#[command(about = "Fetches a subject's profile and NIP-58 badges from multiple relays")]
pub struct Args {
    /// Subject to load, as an npub string
    pub npub: String,

    /// Comma-separated relay WebSocket URLs (defaults to the built-in set)
    #[arg(long, env = "RELAYS")]
    pub relays: Option<String>,

    /// Result-count bound for award and definition queries
    #[arg(long, env = "REQUEST_LIMIT", default_value = "100")]
    pub request_limit: u32,

    /// How long to keep listening for relay answers, in seconds
    #[arg(long, env = "WAIT_SECS", default_value = "15")]
    pub wait_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// The relay list to connect to: the --relays value split on
    /// commas, or the built-in default set.
    pub fn relay_list(&self) -> Vec<String> {
        match &self.relays {
            Some(relays) => relays
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
            None => DEFAULT_RELAYS.iter().map(|url| url.to_string()).collect(),
        }
    }

    /// Validate the configuration, returning a human-readable error.
    pub fn validate(&self) -> Result<(), String> {
        if self.relay_list().is_empty() {
            return Err("No relay URLs configured".to_string());
        }
        for url in self.relay_list() {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(format!("Relay URL must be ws:// or wss://: {url}"));
            }
        }
        if self.request_limit == 0 {
            return Err("Request limit must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(relays: Option<&str>) -> Args {
        Args {
            npub: "npub1example".to_string(),
            relays: relays.map(|s| s.to_string()),
            request_limit: 100,
            wait_secs: 15,
            log_level: "info".to_string(),
        }
    }

    #[test]
    fn test_default_relay_list() {
        let list = args(None).relay_list();
        assert_eq!(list.len(), 10);
        assert!(list.contains(&"wss://relay.damus.io".to_string()));
    }

    #[test]
    fn test_relay_list_parsing() {
        let list = args(Some("wss://a.example, wss://b.example ,,")).relay_list();
        assert_eq!(list, vec!["wss://a.example", "wss://b.example"]);
    }

    #[test]
    fn test_validate() {
        assert!(args(None).validate().is_ok());
        assert!(args(Some(",")).validate().is_err());
        assert!(args(Some("http://not-a-relay")).validate().is_err());

        let mut zero_limit = args(None);
        zero_limit.request_limit = 0;
        assert!(zero_limit.validate().is_err());
    }
}
