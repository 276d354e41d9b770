//! NIP-19 identity codec
//!
//! Converts between user-facing `npub` strings and the raw hex public
//! keys used on the wire. Only the npub form is handled; other NIP-19
//! entities are rejected.

use bech32::{Bech32, Hrp};

use crate::types::{EmblemError, Result};

const NPUB_HRP: &str = "npub";

/// Decode an npub into a 64-char lowercase hex public key.
pub fn decode_npub(input: &str) -> Result<String> {
    let (hrp, data) = bech32::decode(input.trim())
        .map_err(|e| EmblemError::Decode(format!("Not a bech32 string: {e}")))?;

    if hrp.to_string().to_lowercase() != NPUB_HRP {
        return Err(EmblemError::Decode(format!(
            "Expected an npub, got '{hrp}'"
        )));
    }
    if data.len() != 32 {
        return Err(EmblemError::Decode(format!(
            "Unexpected key length: {} bytes",
            data.len()
        )));
    }

    Ok(hex::encode(data))
}

/// Encode a hex public key as an npub, for display only.
pub fn encode_npub(pubkey_hex: &str) -> Result<String> {
    let bytes = hex::decode(pubkey_hex)
        .map_err(|e| EmblemError::Decode(format!("Invalid hex public key: {e}")))?;
    if bytes.len() != 32 {
        return Err(EmblemError::Decode(format!(
            "Unexpected key length: {} bytes",
            bytes.len()
        )));
    }

    let hrp = Hrp::parse(NPUB_HRP).map_err(|e| EmblemError::Internal(format!("Bad hrp: {e}")))?;
    bech32::encode::<Bech32>(hrp, &bytes)
        .map_err(|e| EmblemError::Internal(format!("Bech32 encoding failed: {e}")))
}
