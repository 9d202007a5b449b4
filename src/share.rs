//! # Share-Link Codec Module
//!
//! ## Purpose
//! Encodes a search state (free text + filter rules) into a portable URL
//! parameter and decodes it back. A decode failure means "no query",
//! never an error on the search path.
//!
//! ## Input/Output Specification
//! - **Input**: `ShareState` / URL-safe base64 strings
//! - **Output**: Compact encoded parameter / decoded state or `None`
//!
//! The payload is the JSON wire shape, so shared links survive client
//! versions as long as the condition vocabulary does.

use crate::errors::Result;
use crate::query::RawFilterRules;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Portable search state carried inside a share link.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_rules: Option<RawFilterRules>,
}

/// Encode a search state into a URL-safe parameter value.
pub fn encode(state: &ShareState) -> Result<String> {
    let json = serde_json::to_vec(state)?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Decode a share parameter. Anything unparseable (bad base64, bad JSON,
/// truncated payloads) is treated as "no query".
pub fn decode(encoded: &str) -> Option<ShareState> {
    let bytes = URL_SAFE_NO_PAD.decode(encoded.trim()).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(state) => Some(state),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring undecodable share link");
            None
        }
    }
}
