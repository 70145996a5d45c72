//! Behavioral specifications for the access bot substrate.
//!
//! These tests exercise the public crates together through in-memory and
//! fake adapters: record store guarantees, supervision semantics and the
//! stream/callback race.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// store/
#[path = "specs/store/create.rs"]
mod store_create;
#[path = "specs/store/update.rs"]
mod store_update;

// supervisor/
#[path = "specs/supervisor/failure.rs"]
mod supervisor_failure;
#[path = "specs/supervisor/readiness.rs"]
mod supervisor_readiness;

// reconcile/
#[path = "specs/reconcile/race.rs"]
mod reconcile_race;
