// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Shared per-request records on top of a conditional document store

mod documents;
mod record;
mod state;
mod wal;

pub use documents::WalDocuments;
pub use record::{RecordStore, StoreConfig, StoreError};
pub use state::DocumentState;
pub use wal::{DocWrite, Wal, WalError};
