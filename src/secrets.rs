//! Secret redaction
//!
//! Components that handle the upload token receive a `SecretMask` and run
//! anything they log or return through it. The same mask wraps the log sink
//! so a token that slips into a formatted event is still replaced.

use std::io::{self, Write};
use std::sync::{Arc, RwLock};
use tracing_subscriber::fmt::MakeWriter;

/// Replacement text for redacted values
pub const REDACTED: &str = "***";

/// Shared set of secret values to redact
#[derive(Debug, Clone, Default)]
pub struct SecretMask {
    secrets: Arc<RwLock<Vec<String>>>,
}

impl SecretMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value that must never be emitted. Empty values are ignored.
    pub fn register(&self, secret: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        if let Ok(mut secrets) = self.secrets.write() {
            if !secrets.contains(&secret) {
                secrets.push(secret);
                // Longest first so a secret containing another is fully replaced
                secrets.sort_by_key(|s| std::cmp::Reverse(s.len()));
            }
        }
    }

    /// Replace every registered secret in `text`
    pub fn redact(&self, text: &str) -> String {
        let Ok(secrets) = self.secrets.read() else {
            return text.to_string();
        };
        secrets
            .iter()
            .fold(text.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
    }

    /// Log sink writing redacted events to stderr
    pub fn stderr_writer(&self) -> MaskedWriter<fn() -> io::Stderr> {
        MaskedWriter::new(self.clone(), io::stderr as fn() -> io::Stderr)
    }
}

/// `MakeWriter` that redacts each formatted event before passing it on
pub struct MaskedWriter<M> {
    mask: SecretMask,
    inner: M,
}

impl<M> MaskedWriter<M> {
    pub fn new(mask: SecretMask, inner: M) -> Self {
        Self { mask, inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for MaskedWriter<M> {
    type Writer = MaskedEvent<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskedEvent {
            mask: self.mask.clone(),
            inner: self.inner.make_writer(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one event and writes it redacted when dropped
pub struct MaskedEvent<W: Write> {
    mask: SecretMask,
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> Write for MaskedEvent<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: Write> Drop for MaskedEvent<W> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        let redacted = self.mask.redact(&text);
        let _ = self.inner.write_all(redacted.as_bytes());
        let _ = self.inner.flush();
    }
}
