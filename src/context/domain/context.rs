//! Context records and the data merge rules shared by inheritance and
//! delegation.

use super::{ContextDomainError, ContextId, ContextLevel};
use chrono::{DateTime, Duration, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Level-qualified pointer to a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContextRef {
    /// Hierarchy level.
    pub level: ContextLevel,
    /// Context identifier.
    pub id: ContextId,
}

impl ContextRef {
    /// Creates a reference.
    #[must_use]
    pub const fn new(level: ContextLevel, id: ContextId) -> Self {
        Self { level, id }
    }

    /// Reference to the global singleton.
    #[must_use]
    pub const fn global() -> Self {
        Self::new(ContextLevel::Global, ContextId::GLOBAL)
    }
}

impl fmt::Display for ContextRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level, self.id)
    }
}

/// Context record at one hierarchy level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    id: ContextId,
    level: ContextLevel,
    parent: Option<ContextRef>,
    data: Map<String, Value>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted context.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedContextData {
    /// Persisted identifier.
    pub id: ContextId,
    /// Persisted level.
    pub level: ContextLevel,
    /// Persisted parent pointer.
    pub parent: Option<ContextRef>,
    /// Persisted payload.
    pub data: Map<String, Value>,
    /// Persisted version counter.
    pub version: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Context {
    /// Creates the global singleton context.
    #[must_use]
    pub fn global(data: Map<String, Value>, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: ContextId::GLOBAL,
            level: ContextLevel::Global,
            parent: None,
            data,
            version: 1,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Creates a context below `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextDomainError`] when a global context is requested
    /// with the wrong identifier or a parent, when a non-global context has
    /// no parent, or when the parent does not sit strictly above `level`.
    pub fn new(
        level: ContextLevel,
        id: ContextId,
        parent: Option<ContextRef>,
        data: Map<String, Value>,
        clock: &impl Clock,
    ) -> Result<Self, ContextDomainError> {
        if level == ContextLevel::Global {
            if !id.is_global() {
                return Err(ContextDomainError::InvalidGlobalId(id));
            }
            if parent.is_some() {
                return Err(ContextDomainError::GlobalWithParent);
            }
            return Ok(Self::global(data, clock));
        }

        let parent_ref = parent.ok_or(ContextDomainError::MissingParent(level))?;
        if !parent_ref.level.is_above(level) {
            return Err(ContextDomainError::InvalidParentLevel {
                child: level,
                parent: parent_ref.level,
            });
        }

        let timestamp = clock.utc();
        Ok(Self {
            id,
            level,
            parent: Some(parent_ref),
            data,
            version: 1,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a context from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedContextData) -> Self {
        Self {
            id: data.id,
            level: data.level,
            parent: data.parent,
            data: data.data,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> ContextId {
        self.id
    }

    /// Returns the level.
    #[must_use]
    pub const fn level(&self) -> ContextLevel {
        self.level
    }

    /// Returns the level-qualified reference to this context.
    #[must_use]
    pub const fn reference(&self) -> ContextRef {
        ContextRef::new(self.level, self.id)
    }

    /// Returns the parent pointer.
    #[must_use]
    pub const fn parent(&self) -> Option<ContextRef> {
        self.parent
    }

    /// Returns the payload owned by this level.
    #[must_use]
    pub const fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the version counter; it increases on every data change.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Deep-merges `changes` into the payload and bumps the version.
    pub fn merge(&mut self, changes: &Map<String, Value>, clock: &impl Clock) {
        deep_merge(&mut self.data, changes);
        self.version = self.version.saturating_add(1);
        self.updated_at = clock.utc();
    }

    /// Marks the context as refreshed without changing its payload.
    pub fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }

    /// Returns `true` when the context changed within `max_age` of `now`.
    #[must_use]
    pub fn is_fresh(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.updated_at) <= max_age
    }
}

/// Merges `overlay` into `base`.
///
/// Nested objects merge key by key; any other value in `overlay` replaces
/// the one in `base`.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: &Map<String, Value>) {
    for (key, incoming) in overlay {
        match (base.get_mut(key), incoming) {
            (Some(Value::Object(existing)), Value::Object(nested)) => deep_merge(existing, nested),
            _ => {
                base.insert(key.clone(), incoming.clone());
            }
        }
    }
}
