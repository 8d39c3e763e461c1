//! Paged reads over the hypervisor trace.
//!
//! A read at any byte offset refetches the whole page containing it, then
//! copies out the tail of that page starting at the offset. Nothing is
//! cached between reads: the hypervisor is asked again every time, even for
//! zero-length reads.

use alloc::sync::Arc;

use axerrno::AxResult;

use crate::buffer::TraceBuffer;
use crate::classify::{FetchOutcome, classify};
use crate::config::Selectors;
use crate::hcall::{DumpRequest, Hypervisor, htm_get_dump_hardware};
use crate::platform::PAGE_SIZE;

const PAGE_MASK: u64 = !(PAGE_SIZE as u64 - 1);

/// Largest position a stream may seek to.
const MAX_POS: u64 = i64::MAX as u64;

/// Start of the page containing `offset`.
#[inline]
pub const fn page_base(offset: u64) -> u64 {
    offset & PAGE_MASK
}

/// Read engine shared by every stream opened on one dump.
#[derive(Clone)]
pub struct TraceReader {
    selectors: Arc<Selectors>,
    buffer: Arc<TraceBuffer>,
    hv: Arc<dyn Hypervisor>,
}

impl TraceReader {
    pub fn new(
        selectors: Arc<Selectors>,
        buffer: Arc<TraceBuffer>,
        hv: Arc<dyn Hypervisor>,
    ) -> Self {
        Self {
            selectors,
            buffer,
            hv,
        }
    }

    pub fn selectors(&self) -> &Arc<Selectors> {
        &self.selectors
    }

    /// Read trace bytes at `offset` into `dst`.
    ///
    /// Returns the number of bytes copied, which never crosses the end of
    /// the page containing `offset`. `Ok(0)` means there is no trace data
    /// at this offset. Every other non-success status, busy included, is
    /// reported as `InvalidInput` without retrying.
    pub fn read_at(&self, offset: u64, dst: &mut [u8]) -> AxResult<usize> {
        let intra = (offset - page_base(offset)) as usize;

        let page = self.buffer.lock();
        let req = DumpRequest {
            selectors: self.selectors.snapshot(),
            addr: self.buffer.phys_addr(),
            size: PAGE_SIZE as u64,
            offset: page_base(offset),
        };

        match classify(htm_get_dump_hardware(&*self.hv, &req)) {
            FetchOutcome::Ready => {}
            FetchOutcome::EndOfStream => return Ok(0),
            FetchOutcome::Busy { wait_ms } => {
                debug!("htmdump: hypervisor busy (suggested wait {} ms), not retrying", wait_ms);
                return axerrno::ax_err!(InvalidInput, "htmdump: trace source busy");
            }
            FetchOutcome::Fatal(status) => {
                debug!("htmdump: dump at {:#x} rejected, status {}", req.offset, status.raw());
                return axerrno::ax_err!(InvalidInput, "htmdump: trace dump rejected");
            }
        }

        let n = dst.len().min(PAGE_SIZE - intra);
        dst[..n].copy_from_slice(&page.as_slice()[intra..intra + n]);
        Ok(n)
    }

    /// Open a new stream positioned at offset 0.
    pub fn open(&self) -> TraceStream {
        TraceStream {
            reader: self.clone(),
            pos: 0,
        }
    }
}

/// Seek origin for [`TraceStream::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekFrom {
    Start(u64),
    /// The trace endpoint reports a size of 0, so this is relative to 0.
    End(i64),
    Current(i64),
}

/// An open reading session with its own cursor.
pub struct TraceStream {
    reader: TraceReader,
    pos: u64,
}

impl TraceStream {
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Read at the cursor and advance it by the bytes copied.
    pub fn read(&mut self, buf: &mut [u8]) -> AxResult<usize> {
        let n = self.reader.read_at(self.pos, buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    pub fn seek(&mut self, pos: SeekFrom) -> AxResult<u64> {
        let new = match pos {
            SeekFrom::Start(off) => Some(off),
            SeekFrom::End(delta) => 0u64.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match new {
            Some(new) if new <= MAX_POS => {
                self.pos = new;
                Ok(new)
            }
            _ => axerrno::ax_err!(InvalidInput, "htmdump: seek out of range"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_base() {
        assert_eq!(page_base(0), 0);
        assert_eq!(page_base(4095), 0);
        assert_eq!(page_base(4096), 4096);
        assert_eq!(page_base(12298), 12288);
        assert_eq!(page_base(u64::MAX), u64::MAX - 4095);
    }
}
