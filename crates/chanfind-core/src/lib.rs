//! # chanfind-core
//!
//! Core types, traits, and reconciliation logic for the chanfind channel
//! directory service.
//!
//! This crate provides:
//! - The [`Channel`]/[`Property`]/[`Tag`] data model with embedded instance
//!   lists
//! - Repository traits over the channel and property/tag stores
//! - Ownership and role authorization predicates
//! - The pure association-reconciliation functions (diff, tombstones,
//!   response shaping)
//! - Structural payload validation

pub mod auth;
pub mod error;
pub mod logging;
pub mod models;
pub mod reconcile;
pub mod traits;
pub mod validate;

pub use auth::{AuthorizationService, Principal, RoleClass};
pub use error::{Error, Result};
pub use models::{Channel, Owned, Property, PropertyInstance, Tag, TagInstance};
pub use traits::{ChannelRepository, PropertyRepository, TagRepository};
pub use validate::ValidationMode;
