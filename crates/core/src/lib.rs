//! `forgecart-core`: catalog foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::{Entity, Lifecycle};
pub use error::{DomainError, DomainResult};
pub use id::{ProductId, ProductOptionId, ProductOptionValueId, ProductRootId, VariantBridgeId};
