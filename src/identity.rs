//! Message identity hashing.
//!
//! This module provides the [`MessageId`] type: a stable SHA-256 digest of a
//! message's `(text, domain, context)` triple. The digest is the canonical
//! catalog key and the lookup key handed to backends at runtime, so it must
//! be identical across processes, machines, and toolchain versions.
//!
//! # Examples
//!
//! ```
//! use transmark::identity::MessageId;
//!
//! let id = MessageId::compute("Hello {name}!", "default", "");
//! assert_eq!(id, MessageId::compute("Hello {name}!", "default", ""));
//! assert_eq!(id.as_str().len(), 64);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version tag mixed into every digest; bump when the encoding changes.
const IDENTITY_TAG: &[u8] = b"msgid.v1";
const HEX_LEN: usize = 64;

/// Stable fingerprint identifying one logical message.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(String);

impl MessageId {
    /// Compute the identity of a message.
    ///
    /// Each field is length-prefixed so `("ab", "c")` and `("a", "bc")`
    /// never collide.
    #[must_use]
    pub fn compute(text: &str, domain: &str, context: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(IDENTITY_TAG);
        Self::update_with_len(&mut hasher, text.as_bytes());
        Self::update_with_len(&mut hasher, domain.as_bytes());
        Self::update_with_len(&mut hasher, context.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Borrow the lowercase hexadecimal digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn update_with_len(hasher: &mut Sha256, bytes: &[u8]) {
        let len = bytes.len();
        hasher.update(format!("{len}:").as_bytes());
        hasher.update(bytes);
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a string is not a well-formed message identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a 64-character lowercase hexadecimal message id")]
pub struct ParseMessageIdError {
    value: String,
}

impl FromStr for MessageId {
    type Err = ParseMessageIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == HEX_LEN
            && s
                .bytes()
                .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte));
        if well_formed {
            Ok(Self(s.to_owned()))
        } else {
            Err(ParseMessageIdError {
                value: s.to_owned(),
            })
        }
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
