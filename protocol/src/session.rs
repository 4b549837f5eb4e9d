//! Session-identity bookkeeping (`spec.md` §9: "treat as external; the
//! core does not depend on it for correctness"). An opaque id assigned
//! per connection, carried only into `tracing` spans for request
//! correlation — no handler or engine method ever inspects it.

use std::fmt;

use uuid::Uuid;

/// An opaque per-connection correlation id. Nothing outside logging reads
/// its value, so it is deliberately not `Serialize`/`Deserialize` — it
/// has no wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_session_id_is_distinct() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
