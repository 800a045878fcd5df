//! Stream-stack configuration resolved from the environment.
//!
//! A single struct captures the defaults `open()` and the typed buffers use.
//! It is resolved once and then passed by reference, so nothing on the hot
//! path consults the environment.

use crate::io::DEFAULT_BUFFER_SIZE;
use crate::io::text::{Encoding, Errors};

/// Default number of bytes a text wrapper requests per decode step.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

// =============================================================================
// IoConfig
// =============================================================================

/// Defaults for buffer sizes, text encoding and allocation limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoConfig {
    /// Capacity of buffered layers when `buffering` is negative.
    pub buffer_size: usize,

    /// Bytes read per decode step by `TextIOWrapper`.
    pub text_chunk_size: usize,

    /// Encoding used when `open()` is not given one.
    pub encoding: Encoding,

    /// Error policy used when `open()` is not given one.
    pub errors: Errors,

    /// Flush text writes immediately (`PRISM_IO_UNBUFFERED`).
    pub write_through: bool,

    /// Upper bound on the byte size of a replicated typed buffer.
    pub max_array_bytes: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            text_chunk_size: DEFAULT_CHUNK_SIZE,
            encoding: Encoding::Utf8,
            errors: Errors::Strict,
            write_through: false,
            max_array_bytes: isize::MAX as usize,
        }
    }
}

impl IoConfig {
    /// Resolve configuration from `PRISM_IO_*` environment variables.
    ///
    /// Unset or unparsable variables leave the default in place.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(size) = Self::env_size("PRISM_IO_BUFFER_SIZE") {
            config.buffer_size = size;
        }
        if let Some(size) = Self::env_size("PRISM_IO_CHUNK_SIZE") {
            config.text_chunk_size = size;
        }
        if let Ok(spec) = std::env::var("PRISM_IO_ENCODING") {
            config.apply_encoding_spec(&spec);
        }
        config.write_through = Self::env_bool("PRISM_IO_UNBUFFERED");

        log::debug!("resolved io config: {config:?}");
        config
    }

    /// Apply an `encoding[:errors]` setting, keeping defaults for
    /// unknown names.
    fn apply_encoding_spec(&mut self, spec: &str) {
        let (name, errors) = match spec.split_once(':') {
            Some((name, errors)) => (name, Some(errors)),
            None => (spec, None),
        };
        if !name.is_empty() {
            match Encoding::from_name(name) {
                Some(encoding) => self.encoding = encoding,
                None => log::warn!("ignoring unknown encoding {name:?} in PRISM_IO_ENCODING"),
            }
        }
        if let Some(errors) = errors.filter(|e| !e.is_empty()) {
            match Errors::from_name(errors) {
                Some(errors) => self.errors = errors,
                None => log::warn!("ignoring unknown error handler {errors:?} in PRISM_IO_ENCODING"),
            }
        }
    }

    /// Check if an environment variable is set to a non-empty, truthy value.
    #[inline]
    fn env_bool(var: &str) -> bool {
        std::env::var(var)
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false)
    }

    /// Read a strictly positive size from an environment variable.
    fn env_size(var: &str) -> Option<usize> {
        std::env::var(var)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
    }
}

// =============================================================================
// Tests
// =============================================================================
