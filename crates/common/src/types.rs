use serde::{Deserialize, Serialize};

/// Stream key grouping all stored events belonging to one logical entity
/// instance.
///
/// Aggregate ids are derived deterministically from domain identifiers,
/// e.g. `"product-42"` or `"cart-u1"`, so that every event for the same
/// entity lands on the same stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates an aggregate id from a raw stream key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the underlying stream key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the stream key is empty (invalid for appends).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AggregateId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&str> for AggregateId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

/// Metadata about who (or what) caused a domain event.
///
/// Captured at event creation time and carried through to the audit
/// record. All fields are optional; a system-initiated operation carries
/// none of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier of the acting user, if any.
    pub user_id: Option<String>,

    /// Display name of the acting user.
    pub user_name: Option<String>,

    /// Origin IP address of the request.
    pub ip_address: Option<String>,

    /// User agent string of the originating client.
    pub user_agent: Option<String>,
}

impl Actor {
    /// An actor with no user attribution (system-initiated operation).
    pub fn system() -> Self {
        Self::default()
    }

    /// Creates an actor for a known user.
    pub fn user(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            user_name: Some(user_name.into()),
            ip_address: None,
            user_agent: None,
        }
    }

    /// Attaches request origin details.
    pub fn with_request(
        mut self,
        ip_address: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}
