//! Domain layer for tenant custom-domain resolution.
//!
//! Everything in this crate is synchronous and free of I/O so the decision
//! logic can be exercised without a network.
pub mod classifier;
pub mod controller;
pub mod types;

pub use classifier::{normalize_host, ClassifierConfig, DomainClassifier};
pub use controller::{ControllerState, RedirectController, TransitionError, View};
pub use types::{
    admin_url, decide, HostClassification, LookupResult, RedirectDecision, SlugError, TenantSlug,
};
