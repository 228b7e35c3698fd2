//! User-facing diagnostic stream
//!
//! Hints such as "No apps found" and call-id acknowledgements go here.
//! Function output and decoded error messages go to the caller's output
//! sink instead, and internal logging goes through `tracing`.

use std::io::Write;
use std::sync::{Arc, Mutex};

pub trait Diagnostics: Send + Sync {
    /// Write `text` verbatim
    fn emit(&self, text: &str);

    /// Write `text` followed by a newline
    fn line(&self, text: &str) {
        self.emit(&format!("{}\n", text));
    }
}

/// Writes to the process stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn emit(&self, text: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentDiagnostics;

impl Diagnostics for SilentDiagnostics {
    fn emit(&self, _text: &str) {}
}

/// Captures everything in memory; clones share the buffer
#[derive(Debug, Clone, Default)]
pub struct BufferDiagnostics {
    buf: Arc<Mutex<String>>,
}

impl BufferDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => buf.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Diagnostics for BufferDiagnostics {
    fn emit(&self, text: &str) {
        match self.buf.lock() {
            Ok(mut buf) => buf.push_str(text),
            Err(poisoned) => poisoned.into_inner().push_str(text),
        }
    }
}

pub type SharedDiagnostics = Arc<dyn Diagnostics>;
