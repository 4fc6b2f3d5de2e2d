//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `subscription` - Subscription aggregate and lifecycle transitions
//! - `notification` - Signed notification verification, classification and audit

pub mod foundation;
pub mod notification;
pub mod subscription;
