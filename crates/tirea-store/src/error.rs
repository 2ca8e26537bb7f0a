//! Error types for tirea-store operations.

use std::fmt;
use thiserror::Error;

/// Result type alias for tirea-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// The kind of member a name resolves to on an accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// A raw state field.
    State,
    /// A computed, read-only getter.
    Getter,
    /// A state-transition function.
    Mutation,
    /// An orchestration function.
    Action,
}

impl MemberKind {
    /// Kind name with its indefinite article, for messages.
    pub fn with_article(self) -> &'static str {
        match self {
            MemberKind::State => "a state field",
            MemberKind::Getter => "a getter",
            MemberKind::Mutation => "a mutation",
            MemberKind::Action => "an action",
        }
    }

    /// Whether the member is invoked rather than read.
    pub fn is_callable(self) -> bool {
        matches!(self, MemberKind::Mutation | MemberKind::Action)
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MemberKind::State => "state field",
            MemberKind::Getter => "getter",
            MemberKind::Mutation => "mutation",
            MemberKind::Action => "action",
        })
    }
}

/// Errors that can occur during tirea-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The accessor could not be constructed from its configuration.
    #[error("construction failed: {message}")]
    Construction {
        /// Description of what went wrong.
        message: String,
    },

    /// Attempted to write a member that has no setter.
    #[error("cannot assign to {kind} `{member}`: read-only")]
    ImmutableWrite {
        /// The member that was written.
        member: String,
        /// What the member is.
        kind: MemberKind,
    },

    /// The name does not exist on the accessor or view.
    #[error("unknown member `{name}`")]
    UnknownMember {
        /// The name that was looked up.
        name: String,
    },

    /// The name exists but is a different kind of member than the
    /// operation needs (reading a mutation, committing a getter, ...).
    #[error("`{name}` is {} and cannot be {usage}", .kind.with_article())]
    WrongKind {
        /// The name that was looked up.
        name: String,
        /// What the member actually is.
        kind: MemberKind,
        /// How the caller tried to use it.
        usage: &'static str,
    },

    /// A mutation tried to touch a field outside the fixed state shape.
    #[error("state has no field `{field}`; fields are fixed at construction")]
    UnknownField {
        /// The field that was written.
        field: String,
    },

    /// A payload could not be decoded into the handler's parameter type.
    #[error("invalid payload for `{member}`: {source}")]
    Payload {
        /// The mutation or action that received the payload.
        member: String,
        /// The decode failure.
        #[source]
        source: serde_json::Error,
    },

    /// `load` was given something other than an object.
    #[error("invalid snapshot: expected object, found {found}")]
    InvalidSnapshot {
        /// The JSON type that was supplied.
        found: &'static str,
    },

    /// A view outlived the accessor it projects.
    #[error("accessor for view over `{name}` has been dropped")]
    Detached {
        /// The name that was being read or invoked.
        name: String,
    },

    /// The state cell lock was poisoned by a panicking mutation.
    #[error("state cell lock poisoned")]
    Poisoned,

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a construction error.
    #[inline]
    pub fn construction(message: impl Into<String>) -> Self {
        StoreError::Construction {
            message: message.into(),
        }
    }

    /// Create an immutable write error.
    #[inline]
    pub fn immutable_write(member: impl Into<String>, kind: MemberKind) -> Self {
        StoreError::ImmutableWrite {
            member: member.into(),
            kind,
        }
    }

    /// Create an unknown member error.
    #[inline]
    pub fn unknown_member(name: impl Into<String>) -> Self {
        StoreError::UnknownMember { name: name.into() }
    }

    /// Create a wrong-kind error.
    #[inline]
    pub fn wrong_kind(name: impl Into<String>, kind: MemberKind, usage: &'static str) -> Self {
        StoreError::WrongKind {
            name: name.into(),
            kind,
            usage,
        }
    }

    /// Create an unknown field error.
    #[inline]
    pub fn unknown_field(field: impl Into<String>) -> Self {
        StoreError::UnknownField {
            field: field.into(),
        }
    }

    /// Create a payload decode error.
    #[inline]
    pub fn payload(member: impl Into<String>, source: serde_json::Error) -> Self {
        StoreError::Payload {
            member: member.into(),
            source,
        }
    }

    /// Create a detached view error.
    #[inline]
    pub fn detached(name: impl Into<String>) -> Self {
        StoreError::Detached { name: name.into() }
    }

    /// Whether this error is a rejected write to a read-only member.
    pub fn is_immutable_write(&self) -> bool {
        matches!(self, StoreError::ImmutableWrite { .. })
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
