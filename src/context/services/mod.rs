//! Context services: hierarchy management and upward delegation.

pub mod delegation;
pub mod hierarchy;
pub mod patterns;

pub use delegation::{
    ContextDelegationService, DelegationResult, DelegationServiceError, QueueHealth, QueueStatus,
};
pub use hierarchy::{
    ContextHierarchyService, ContextServiceError, ContextServiceResult, ContextUpdate,
    ResolvedContext,
};
pub use patterns::{DelegationConfig, DelegationPattern, QualityIndicator};
