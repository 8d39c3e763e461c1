//! Hardware Trace Macro dump reader
//!
//! Exposes the hypervisor-maintained HTM trace buffer as a seekable byte
//! stream, plus four selectors choosing which trace macro is dumped.
//!
//! # Layout
//!
//! - `config` - the four trace source selectors
//! - `hcall` - H_HTM argument encoding and status codes
//! - `classify` - status to read outcome
//! - `buffer` - the shared trace page
//! - `reader` - paged reads and stream handles
//! - `endpoint` - what gets published, and the selector text format
//!
//! # Quick Start
//!
//! ```ignore
//! use alloc::sync::Arc;
//!
//! // `hv` issues the platform's raw hypercall, `fs` publishes endpoints.
//! let dump = htmdump::init(Arc::new(hv), &mut fs)?;
//!
//! dump.selectors().set(htmdump::Selector::NodeIndex, 1);
//!
//! let mut stream = dump.open();
//! let mut page = [0u8; 4096];
//! while stream.read(&mut page)? != 0 {
//!     // consume trace bytes
//! }
//! ```

#![no_std]

extern crate alloc;

#[macro_use]
extern crate log;

// =============================================================================
// Platform Abstraction (for testing support)
// =============================================================================

pub mod platform;

// =============================================================================
// Trace Source
// =============================================================================

pub mod config;

pub mod hcall;

pub mod classify;

// =============================================================================
// Read Engine
// =============================================================================

pub mod buffer;

pub mod reader;

// =============================================================================
// Publication
// =============================================================================

pub mod endpoint;

pub mod dump;

// Re-export key types for convenience
pub use buffer::TraceBuffer;
pub use classify::{FetchOutcome, classify};
pub use config::{Selector, SelectorValues, Selectors};
pub use dump::{Error as InitError, HtmDump, init};
pub use endpoint::{Registrar, SelectorFile};
pub use hcall::{HcallStatus, Hypervisor};
pub use platform::PAGE_SIZE;
pub use reader::{SeekFrom, TraceReader, TraceStream};
