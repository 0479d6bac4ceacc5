//! # piecework-std
//!
//! Stores and standard building blocks for the Piecework runtime.
//!
//! This crate provides:
//! - **Generic store**: [`Store`](store::Store), piece sources and [`StoreHandle`](store::StoreHandle)
//! - **Specialized stores**: guard chains, filter dispatch, event fan-out,
//!   finalizers and tasks in [`stores`]
//! - **Layers**: [`Timeout`](layers::Timeout) (feature `timeout`)
//! - **Testing doubles** in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core traits
pub use piecework_core;

// Modules
#[cfg(feature = "timeout")]
pub mod layers;
pub mod store;
pub mod stores;
pub mod testing;
