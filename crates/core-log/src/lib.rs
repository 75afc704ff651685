// SPDX-License-Identifier: Apache-2.0
//! Structured logging: the `LogRecord` model, its categorizing router,
//! and a size-rotating file sink (§4.1, §6.5).
//!
//! Ordinary `tracing` instrumentation elsewhere in the workspace reaches
//! [`LogSink`] via [`CategoryRouterLayer`]; components that build records
//! by hand (subprocess stderr capture, for instance) call [`emit`]
//! directly against the sink handle the wiring layer constructed for
//! them — there is no global logger to reach for instead.

mod handler;
mod record;
mod router;
mod rotate;
mod sink;

pub use record::{Category, Level, LogRecord};
pub use router::CategoryRouterLayer;
pub use rotate::RotatingFileWriter;
pub use sink::LogSink;

/// Delegates to [`LogSink::emit`]. Exists as a free function for call
/// sites that hold only a borrowed sink and prefer a verb over a method,
/// matching the shape spec.md's C1 contract names (`emit(record)`).
pub fn emit(sink: &LogSink, record: LogRecord) {
    sink.emit(record);
}
