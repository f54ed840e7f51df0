pub mod client;

pub use client::{DomainLookupClient, DomainLookupResponse, LookupError, LOOKUP_DOMAIN_PATH};
