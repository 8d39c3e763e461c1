//! Initialized dump handle and startup errors.

use alloc::sync::Arc;

use axerrno::AxError;

use crate::buffer::TraceBuffer;
use crate::config::{Selector, Selectors};
use crate::endpoint::{self, Registrar, SelectorFile};
use crate::hcall::Hypervisor;
use crate::reader::{TraceReader, TraceStream};

/// Error types for initialization.
#[derive(Debug, Clone)]
pub enum Error {
    /// The trace page could not be allocated.
    Allocation(AxError),
    /// The namespace or one of its endpoints could not be created.
    Registration {
        name: &'static str,
        source: AxError,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Allocation(e) => write!(f, "Failed to allocate trace buffer: {:?}", e),
            Self::Registration { name, source } => {
                write!(f, "Failed to register {}: {:?}", name, source)
            }
        }
    }
}

impl core::error::Error for Error {}

impl From<Error> for AxError {
    fn from(e: Error) -> Self {
        match e {
            Error::Allocation(source) | Error::Registration { source, .. } => source,
        }
    }
}

/// A published HTM dump: the shared selectors, the shared trace page and
/// the namespace they are registered under.
pub struct HtmDump<D> {
    reader: TraceReader,
    dir: D,
}

impl<D> HtmDump<D> {
    pub fn selectors(&self) -> &Arc<Selectors> {
        self.reader.selectors()
    }

    pub fn reader(&self) -> &TraceReader {
        &self.reader
    }

    /// Open a stream on the trace, as the `trace` endpoint does.
    pub fn open(&self) -> TraceStream {
        self.reader.open()
    }

    /// Unpublish every endpoint.
    pub fn remove<R: Registrar<Dir = D>>(self, registrar: &mut R) {
        registrar.remove_recursive(self.dir);
        info!("htmdump: removed");
    }
}

/// Allocate the trace page and publish the namespace with its five
/// endpoints. Either everything is published or nothing is.
pub fn init<R: Registrar>(
    hv: Arc<dyn Hypervisor>,
    registrar: &mut R,
) -> Result<HtmDump<R::Dir>, Error> {
    let buffer = TraceBuffer::new().map_err(|e| {
        error!("htmdump: failed to allocate trace buffer");
        Error::Allocation(e)
    })?;

    let reader = TraceReader::new(Arc::new(Selectors::new()), Arc::new(buffer), hv);

    let dir = registrar
        .create_dir(endpoint::DIR_NAME)
        .map_err(|source| registration_failed(endpoint::DIR_NAME, source))?;

    if let Err(e) = publish(registrar, &dir, &reader) {
        warn!("htmdump: rolling back partial registration");
        registrar.remove_recursive(dir);
        return Err(e);
    }

    info!("htmdump: initialized");
    Ok(HtmDump { reader, dir })
}

fn publish<R: Registrar>(
    registrar: &mut R,
    dir: &R::Dir,
    reader: &TraceReader,
) -> Result<(), Error> {
    for which in Selector::ALL {
        let file = SelectorFile::new(reader.selectors().clone(), which);
        registrar
            .create_selector(dir, endpoint::mode::SELECTOR, file)
            .map_err(|source| registration_failed(which.name(), source))?;
        debug!("htmdump: registered {}", which.name());
    }

    registrar
        .create_trace(dir, endpoint::TRACE_NAME, endpoint::mode::TRACE, reader.clone())
        .map_err(|source| registration_failed(endpoint::TRACE_NAME, source))?;
    debug!("htmdump: registered {}", endpoint::TRACE_NAME);
    Ok(())
}

fn registration_failed(name: &'static str, source: AxError) -> Error {
    error!("htmdump: failed to register {}: {:?}", name, source);
    Error::Registration { name, source }
}
