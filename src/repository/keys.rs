//! Node and binary identifiers

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifies a node's storage slot in the document cache.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Content-addressed identifier of a binary value: the lowercase hex
/// SHA-256 of its bytes.
///
/// Deserialization goes through [`BinaryKey::parse`], so a key read from a
/// backup is always well formed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BinaryKey(String);

impl BinaryKey {
    /// Number of hex characters in a key
    pub const LENGTH: usize = 64;

    /// Compute the key for `content`.
    pub fn for_content(content: &[u8]) -> Self {
        let digest = Sha256::digest(content);
        let mut hex = String::with_capacity(Self::LENGTH);
        for byte in digest.iter() {
            hex.push_str(&format!("{:02x}", byte));
        }
        Self(hex)
    }

    /// Parse a key from its hex form. Returns `None` unless the input is
    /// exactly [`Self::LENGTH`] lowercase hex characters.
    pub fn parse(hex: &str) -> Option<Self> {
        let valid = hex.len() == Self::LENGTH
            && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BinaryKey {
    type Error = String;

    fn try_from(hex: String) -> Result<Self, Self::Error> {
        Self::parse(&hex).ok_or_else(|| format!("invalid binary key: {:?}", hex))
    }
}

impl From<BinaryKey> for String {
    fn from(key: BinaryKey) -> Self {
        key.0
    }
}

impl fmt::Display for BinaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_key_serde_validates() {
        let key = BinaryKey::for_content(b"abc");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", key));
        assert_eq!(serde_json::from_str::<BinaryKey>(&json).unwrap(), key);

        assert!(serde_json::from_str::<BinaryKey>("\"ab\"").is_err());
        assert!(serde_json::from_str::<BinaryKey>(&json.to_uppercase()).is_err());
    }

    #[test]
    fn test_binary_key_is_sha256_hex() {
        let key = BinaryKey::for_content(b"abc");
        assert_eq!(
            key.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_binary_key_parse() {
        let key = BinaryKey::for_content(b"hello");
        assert_eq!(BinaryKey::parse(key.as_str()), Some(key));
        assert_eq!(BinaryKey::parse("abc"), None);
        assert_eq!(BinaryKey::parse(&"G".repeat(64)), None);
        assert_eq!(BinaryKey::parse(&"A".repeat(64)), None);
    }

    #[test]
    fn test_node_key_serializes_as_string() {
        let key = NodeKey::new("ws1/node-7");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"ws1/node-7\"");
    }
}
