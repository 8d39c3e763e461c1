//! Endpoint registration plumbing.
//!
//! The filesystem that publishes the dump (debugfs or similar) is outside
//! this crate. It implements [`Registrar`]; this module only describes what
//! gets published and provides the text format of the selector files.

use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;

use axerrno::AxResult;

use crate::config::{Selector, Selectors};
use crate::reader::TraceReader;

/// Namespace holding every endpoint.
pub const DIR_NAME: &str = "htmdump";

/// Name of the trace stream endpoint.
pub const TRACE_NAME: &str = "trace";

/// Permission bits of the published endpoints.
pub mod mode {
    /// Selector files: owner read/write.
    pub const SELECTOR: u16 = 0o600;
    /// Trace stream: owner read-only.
    pub const TRACE: u16 = 0o400;
}

/// Publishes endpoints on behalf of [`crate::init`].
pub trait Registrar {
    /// Handle to a created namespace.
    type Dir;

    fn create_dir(&mut self, name: &'static str) -> AxResult<Self::Dir>;

    fn create_selector(&mut self, dir: &Self::Dir, mode: u16, file: SelectorFile) -> AxResult<()>;

    fn create_trace(
        &mut self,
        dir: &Self::Dir,
        name: &'static str,
        mode: u16,
        reader: TraceReader,
    ) -> AxResult<()>;

    /// Remove a namespace and everything created under it.
    fn remove_recursive(&mut self, dir: Self::Dir);
}

/// One selector exposed as an unsigned integer text file.
#[derive(Debug, Clone)]
pub struct SelectorFile {
    selectors: Arc<Selectors>,
    which: Selector,
}

impl SelectorFile {
    pub fn new(selectors: Arc<Selectors>, which: Selector) -> Self {
        Self { selectors, which }
    }

    pub fn name(&self) -> &'static str {
        self.which.name()
    }

    pub fn selector(&self) -> Selector {
        self.which
    }

    pub fn get(&self) -> u32 {
        self.selectors.get(self.which)
    }

    pub fn set(&self, value: u32) {
        self.selectors.set(self.which, value)
    }

    pub fn read_text(&self) -> String {
        format!("{}\n", self.get())
    }

    /// Parse and store a value. On error the selector keeps its old value.
    pub fn write_text(&self, text: &str) -> AxResult<()> {
        let value = parse_u32(text)?;
        self.set(value);
        Ok(())
    }
}

/// Parse an unsigned integer with C-style radix prefixes.
fn parse_u32(text: &str) -> AxResult<u32> {
    let s = text.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let hex = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"));
    let (digits, radix) = if let Some(hex) = hex {
        (hex, 16)
    } else if s.len() > 1 && s.starts_with('0') {
        (&s[1..], 8)
    } else {
        (s, 10)
    };
    // from_str_radix takes its own sign; only bare digits are valid here.
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return axerrno::ax_err!(InvalidInput, "htmdump: bad selector value");
    }
    u32::from_str_radix(digits, radix)
        .or_else(|_| axerrno::ax_err!(InvalidInput, "htmdump: bad selector value"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_radix() {
        assert_eq!(parse_u32("42\n").unwrap(), 42);
        assert_eq!(parse_u32("0").unwrap(), 0);
        assert_eq!(parse_u32("0x1f").unwrap(), 31);
        assert_eq!(parse_u32("0X1F").unwrap(), 31);
        assert_eq!(parse_u32("017").unwrap(), 15);
        assert_eq!(parse_u32("  4294967295 ").unwrap(), u32::MAX);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "abc", "-1", "0x", "4294967296", "08", "1 2", "0+7", "0x+1f", "++1"] {
            assert!(parse_u32(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_write_text_keeps_value_on_error() {
        let file = SelectorFile::new(Arc::new(Selectors::new()), Selector::CoreIndexOnChip);
        file.write_text("7\n").unwrap();
        assert!(file.write_text("seven").is_err());
        assert_eq!(file.get(), 7);
        assert_eq!(file.read_text(), "7\n");
    }
}
