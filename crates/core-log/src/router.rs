// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::Event;
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use crate::record::{Level, LogRecord};
use crate::sink::LogSink;

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = Some(rendered);
        } else {
            self.metadata.insert(field.name().to_string(), rendered);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.metadata.insert(field.name().to_string(), value.to_string());
        }
    }
}

/// A `tracing_subscriber::Layer` that mirrors every event into the
/// categorized [`LogSink`] (§4.1), independent of whatever console layer
/// the binary also attaches. The event's `target` (e.g. `"core_mcp"`) and
/// message text together seed the router's keyword classification, so a
/// plain `tracing::info!(target: "TOOL", ...)` at any call site lands in
/// the right category file without callers building `LogRecord`s by hand.
pub struct CategoryRouterLayer {
    sink: Arc<LogSink>,
}

impl CategoryRouterLayer {
    pub fn new(sink: Arc<LogSink>) -> Self {
        Self { sink }
    }
}

impl<S> Layer<S> for CategoryRouterLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let heading = format!("{} {}", event.metadata().target(), event.metadata().name());
        let body = collector.message.unwrap_or_default();

        let mut record = LogRecord::new(Level::from(*event.metadata().level()), heading, body);
        record.metadata = collector.metadata;
        self.sink.emit(record);
    }
}
