//! Logging trait for Gemini client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log all API interactions passing through the [`Gemini`](crate::Gemini) client.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use serde_json::json;

use crate::error::{Error, Result};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// A trait for logging Gemini client operations.
///
/// Implement this trait to capture and record every exchange with the API.  Loggers must not
/// fail the request they observe, so the methods return nothing.
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, model: &str, request: &GenerateContentRequest);

    /// Log a successful response.
    fn log_response(&self, model: &str, response: &GenerateContentResponse);

    /// Log a failed exchange.
    fn log_error(&self, model: &str, error: &Error);
}

/// A [`ClientLogger`] that appends one JSON object per line to a file.
pub struct FileLogger {
    writer: Mutex<BufWriter<File>>,
}

impl FileLogger {
    /// Opens `path` for appending, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|err| Error::io("failed to open client log", err))?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    fn write_line(&self, value: serde_json::Value) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{value}");
            let _ = writer.flush();
        }
    }
}

impl ClientLogger for FileLogger {
    fn log_request(&self, model: &str, request: &GenerateContentRequest) {
        self.write_line(json!({"event": "request", "model": model, "body": request}));
    }

    fn log_response(&self, model: &str, response: &GenerateContentResponse) {
        self.write_line(json!({"event": "response", "model": model, "body": response}));
    }

    fn log_error(&self, model: &str, error: &Error) {
        self.write_line(json!({"event": "error", "model": model, "error": error.to_string()}));
    }
}
