//! Subscription Lifecycle - Signed billing notification processor
//!
//! This crate authenticates nested-JWS subscription notifications against a
//! pinned certificate chain, applies them to subscription state through an
//! idempotent lifecycle state machine, and keeps an append-only audit trail
//! of every processing attempt.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
