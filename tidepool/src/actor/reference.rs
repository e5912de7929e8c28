//! Actor addressing: type, identity and the reference pair.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Name of an actor contract, e.g. `"Test"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorType(Cow<'static, str>);

impl ActorType {
    /// Create an actor type from a static name, usable in `const` position.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Create an actor type from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The contract name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque 128-bit identity of a logical actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorIdentity(Uuid);

impl ActorIdentity {
    /// A fresh random identity.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ActorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for ActorIdentity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Stable address of a logical actor.
///
/// Two references with the same type and identity always reach the same
/// actor. References are the only way one actor names another: they are
/// passed around as plain values, never as handles to a live instance.
///
/// # String Format
///
/// `actor_type/identity`, e.g. `Test/1b4e28ba-2fa1-11d2-883f-0016d3cca427`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorReference {
    /// Contract implemented by the actor.
    pub actor_type: ActorType,
    /// Identity within the contract.
    pub identity: ActorIdentity,
}

impl ActorReference {
    /// Create a reference from its parts.
    pub fn new(actor_type: ActorType, identity: ActorIdentity) -> Self {
        Self {
            actor_type,
            identity,
        }
    }

    /// Reference a never-before-seen actor of the given type.
    pub fn random(actor_type: ActorType) -> Self {
        Self::new(actor_type, ActorIdentity::random())
    }

    /// Encode the reference as a call argument.
    pub fn to_value(&self) -> Value {
        json!({
            "actor_type": self.actor_type.as_str(),
            "identity": self.identity.to_string(),
        })
    }

    /// Decode a reference passed as a call argument.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

impl fmt::Display for ActorReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.actor_type, self.identity)
    }
}

impl From<ActorReference> for Value {
    fn from(reference: ActorReference) -> Self {
        reference.to_value()
    }
}
