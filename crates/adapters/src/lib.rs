// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the message transport peers talk over

pub mod traced;
pub mod transport;

pub use traced::{TracedInbox, TracedTransport};
pub use transport::{Inbox, LocalInbox, LocalNetwork, LocalTransport, Transport, TransportError};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use transport::{FakeInbox, FakeInboxHandle, FakeTransport, TransportCall};
