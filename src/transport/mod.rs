//! Service substrate implementations.
//!
//! Concrete implementations of the domain-level [`ServiceProvider`] and
//! [`Connection`] traits. Domain code must not depend on substrate-specific
//! types.
//!
//! [`ServiceProvider`]: crate::ServiceProvider
//! [`Connection`]: crate::Connection

mod memory;

pub use memory::{MemoryHub, MemoryService, ServiceRequest};
