//! Domain model for the four-level context hierarchy and upward delegation.
//!
//! Data inherits downward (global, project, branch, task) and insights are
//! delegated upward. Contexts share the identifier of the entity they
//! describe, so tasks reference them weakly.

mod context;
mod delegation;
mod error;
mod ids;
mod level;

pub use context::{Context, ContextRef, PersistedContextData, deep_merge};
pub use delegation::{
    Delegation, DelegationRequest, DelegationStatus, DelegationTrigger, ImpactAssessment,
    PersistedDelegationData, Recommendation,
};
pub use error::{
    ContextDomainError, ParseContextLevelError, ParseDelegationStatusError,
    ParseDelegationTriggerError,
};
pub use ids::{ContextId, DelegationId};
pub use level::ContextLevel;
