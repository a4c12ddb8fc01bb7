use uuid::Uuid;

/// Identifier of one signed-in session, carried on every tracing span the engine opens
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Creates a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = SessionId::new();
        let b = SessionId::default();
        assert_ne!(a, b);
        assert_eq!(a.to_string(), a.0.to_string());
    }
}
