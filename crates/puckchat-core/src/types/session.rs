use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token correlating this client's messages across requests.
///
/// Never empty; not an auth credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new globally unique id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap a persisted value; blank values are rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First characters of the id, for headers and logs
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(idx, _)| idx)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(SessionId::parse("").is_none());
        assert!(SessionId::parse("   ").is_none());
        assert_eq!(SessionId::parse(" abc ").unwrap().as_str(), "abc");
    }

    #[test]
    fn test_short() {
        let id = SessionId::parse("0123456789abcdef").unwrap();
        assert_eq!(id.short(), "01234567");
        assert_eq!(SessionId::parse("abc").unwrap().short(), "abc");
    }
}
