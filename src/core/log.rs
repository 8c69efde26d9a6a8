//! Build log line sink
//!
//! Makers write their diagnostic output into a [`BuildLog`], either line by
//! line or through [`std::io::Write`]. Lines are append-only; each one is
//! also emitted as a `debug` event under the `modbuild::make` target.

use std::io::{self, Write};

/// Append-only sink collecting one unit's build output
#[derive(Debug)]
pub struct BuildLog {
    module: String,
    lines: Vec<String>,
    partial: Vec<u8>,
}

impl BuildLog {
    /// Create an empty log for a module
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            lines: Vec::new(),
            partial: Vec::new(),
        }
    }

    /// Append one complete line
    pub fn line(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!(target: "modbuild::make", module = %self.module, "{line}");
        self.lines.push(line);
    }

    /// Append raw output, splitting it into lines
    pub fn append_output(&mut self, output: &[u8]) {
        self.push_bytes(output);
        self.flush_partial();
    }

    /// Lines collected so far
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Finish the log, returning every line including a trailing partial one
    pub fn finish(mut self) -> Vec<String> {
        self.flush_partial();
        self.lines
    }

    fn push_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            if byte == b'\n' {
                let bytes = std::mem::take(&mut self.partial);
                let text = String::from_utf8_lossy(&bytes);
                self.line(text.trim_end_matches('\r').to_string());
            } else {
                self.partial.push(byte);
            }
        }
    }

    fn flush_partial(&mut self) {
        if !self.partial.is_empty() {
            let bytes = std::mem::take(&mut self.partial);
            self.line(String::from_utf8_lossy(&bytes).into_owned());
        }
    }
}

impl Write for BuildLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push_bytes(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
