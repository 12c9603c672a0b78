//! Match identity.
//!
//! Powers are a closed enum and need no identifier; the only generated
//! identity is the match itself. It wraps a UUID v7, so log lines and
//! exported records sort by creation time.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one match, from the opening phase to its
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(Uuid);

impl MatchId {
    /// A fresh time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The wrapped UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_ids_are_unique() {
        let a = MatchId::new();
        let b = MatchId::new();
        assert_ne!(a, b);
        assert_ne!(*a.as_uuid(), Uuid::nil());
    }

    #[test]
    fn serializes_as_a_bare_uuid() {
        let id = MatchId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }
}
