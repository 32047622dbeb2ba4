//! Core traits defined in `snowball-core` and implemented by other crates.
//!
//! The collaborator traits describe everything the background core consumes
//! from the outside world; production implementations live in
//! `snowball-service::clients`, test doubles live next to the tests.

pub mod cache;
pub mod collaborators;

pub use cache::CacheProvider;
pub use collaborators::{
    DomainReputationService, EmailVerificationService, EventPublisher, NotificationSender,
};
