//! # Types
//!
//! Architecture-agnostic value types used throughout the resource manager.
//!
//! These types abstract away kernel-object and register-file details so the
//! aggregate bookkeeping can reason about "a process", "a thread", and "an
//! address range" without caring which architecture backs them.

pub mod address;
pub mod ids;

// Re-export all public types
pub use address::{Address, AddressRange};
pub use ids::{BreakpointId, ProcessKoid, ThreadKoid};
