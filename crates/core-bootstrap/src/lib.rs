// SPDX-License-Identifier: Apache-2.0
//! Wiring & Lifecycle (C9): ordered startup of every process-level
//! singleton the orchestration core owns, and its failure-tolerant,
//! reverse-order shutdown.

mod error;
mod exit_code;
mod wiring;

pub use error::StartupError;
pub use exit_code::ExitCode;
pub use wiring::Wiring;
