//! Shared Kernel - Domain-crossing minimal core
//!
//! The vocabulary every crate in the framework agrees on:
//! - Unified error type and result alias
//! - Typed identifiers for storage-assigned keys
//!
//! Nothing HTTP- or storage-engine specific lives here except the
//! feature-gated conversions in [`error::conversions`].

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
