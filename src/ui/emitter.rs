//! Buildpack-style progress output
//!
//! ```text
//! Ruby Bundle Install 0.3.0
//!   Executing build environment install process
//!     Running 'bundle install'
//!       Completed in 1.204s
//!
//!   Configuring build environment
//!     BUNDLE_USER_CONFIG -> "/layers/build-gems/config"
//! ```

use super::context::UiContext;
use console::style;
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Writes indented progress lines to stdout or an injected writer
#[derive(Clone)]
pub struct LogEmitter {
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    ctx: UiContext,
}

impl std::fmt::Debug for LogEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEmitter").field("ctx", &self.ctx).finish()
    }
}

impl LogEmitter {
    /// Emit to an arbitrary writer
    pub fn new(writer: impl Write + Send + 'static, ctx: UiContext) -> Self {
        Self {
            writer: Arc::new(Mutex::new(Box::new(writer))),
            ctx,
        }
    }

    /// Emit to stdout
    pub fn stdout(ctx: UiContext) -> Self {
        Self::new(std::io::stdout(), ctx)
    }

    /// Emit into an in-memory buffer, unstyled
    pub fn buffered() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::new(buffer.clone(), UiContext::plain()), buffer)
    }

    fn line(&self, indent: usize, text: &str) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{:indent$}{}", "", text, indent = indent).ok();
    }

    /// Buildpack name and version
    pub fn title(&self, name: &str, version: &str) {
        let text = format!("{} {}", name, version);
        if self.ctx.use_color() {
            self.line(0, &style(text).bold().to_string());
        } else {
            self.line(0, &text);
        }
    }

    /// A top-level step
    pub fn process(&self, text: &str) {
        self.line(2, text);
    }

    /// A subprocess or detail of the current step
    pub fn subprocess(&self, text: &str) {
        if self.ctx.use_color() {
            self.line(4, &style(text).dim().to_string());
        } else {
            self.line(4, text);
        }
    }

    /// Outcome of a subprocess
    pub fn action(&self, text: &str) {
        self.line(6, text);
    }

    pub fn break_line(&self) {
        self.line(0, "");
    }

    /// Environment variables a slot exposes to a phase
    pub fn environment(&self, phase: &str, env: &BTreeMap<String, String>) {
        self.process(&format!("Configuring {} environment", phase));
        for (file, value) in env {
            let name = file.split('.').next().unwrap_or(file);
            self.subprocess(&format!("{} -> {:?}", name, value));
        }
        self.break_line();
    }
}

/// Cloneable in-memory writer
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Render a duration rounded to milliseconds
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.3}s", millis as f64 / 1000.0)
    }
}
