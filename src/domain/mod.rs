//! Domain layer public interface.
//!
//! This module defines domain-level abstractions that are independent of
//! the IPC substrate, service manager, or infrastructure concerns.
//!
//! All domain consumers must import symbols via this module, not by
//! referencing individual files directly.

mod service;

// --- Service domain re-exports ---

pub use service::{
    //
    Connection,
    ConnectionPtr,
    DeathObserver,
    DeathRecipient,
    HalVersion,
    ResponseSink,
    ServiceProvider,
    ServiceProviderPtr,
};
