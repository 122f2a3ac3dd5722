//! # Party Planner Testing
//!
//! Testing utilities and mock collaborators for the party admission engine.
//!
//! This crate provides deterministic stand-ins for every environment seam
//! the engine consumes:
//!
//! - [`mocks::InMemoryPartyStore`] — versioned record storage with real
//!   optimistic-concurrency semantics, so conflict handling is exercised in
//!   tests exactly as it would be against a production store
//! - [`mocks::FixedClock`] — frozen time for reproducible timestamps
//! - [`mocks::SequenceCodeIssuer`] — scripted invite codes (`ABC123`, ...)
//! - [`mocks::RecordingSink`] / [`mocks::FailingSink`] — notification
//!   capture and failure injection

pub mod mocks;

pub use mocks::{
    FailingSink, FixedClock, InMemoryPartyStore, RecordingSink, SequenceCodeIssuer, test_clock,
};
