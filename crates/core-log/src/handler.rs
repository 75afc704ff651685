// SPDX-License-Identifier: Apache-2.0
use std::io::Write;
use std::sync::Mutex;

use crate::record::{Category, LogRecord};
use crate::rotate::RotatingFileWriter;

/// A single category's file handler. `should_handle` is kept as an
/// explicit predicate (rather than a dense match in the router) so a
/// record can fan out to more than one handler, per §4.1.
pub struct CategoryHandler {
    category: Category,
    writer: Mutex<RotatingFileWriter>,
}

impl CategoryHandler {
    pub fn new(log_dir: &std::path::Path, category: Category, max_bytes: u64) -> std::io::Result<Self> {
        let path = log_dir.join(category.file_name());
        Ok(Self {
            category,
            writer: Mutex::new(RotatingFileWriter::open(path, max_bytes)?),
        })
    }

    pub fn should_handle(&self, record: &LogRecord) -> bool {
        record.category == self.category
    }

    pub fn handle(&self, record: &LogRecord) {
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let line = record.format_line();
        let _ = writeln!(writer, "{line}");
        let _ = writer.flush();
    }
}
