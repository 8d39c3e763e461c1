//! H_HTM hypercall binding.
//!
//! Encodes the "dump hardware trace data" request and hands it to the
//! platform's raw hypercall entry. The full PAPR status set is kept here;
//! the rest of the crate only sees [`crate::classify::FetchOutcome`].

use crate::config::SelectorValues;

/// Hypercall opcode for the Hardware Trace Macro interface.
pub const H_HTM: u64 = 0x458;

/// Target is addressed by hardware node/chip/core indices. PAPR bit 0 is
/// the MSB.
const H_HTM_FLAGS_HARDWARE_TARGET: u64 = 1 << 63;

/// Operation code for "dump trace data".
const H_HTM_OP_DUMP_DATA: u64 = 0x09;

const HTM_OP_SHIFT: u32 = 63 - 15;
const HTM_TYPE_SHIFT: u32 = 63 - 31;
const HTM_NODE_SHIFT: u32 = 63 - 15;
const HTM_CHIP_SHIFT: u32 = 63 - 31;
const HTM_CORE_SHIFT: u32 = 63 - 47;

/// Raw hypercall entry provided by the platform.
///
/// Implementations trap into the hypervisor and return the status it
/// leaves in r3. The call may block for the duration of the remote query.
pub trait Hypervisor: Send + Sync {
    fn hcall_norets(&self, opcode: u64, args: &[u64]) -> i64;
}

/// Status codes returned by the hypervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HcallStatus {
    Success,
    Busy,
    Closed,
    NotAvailable,
    Constrained,
    Partial,
    InProgress,
    Continue,
    /// H_LONG_BUSY_ORDER_*: busy, retry after roughly `10^order` ms.
    LongBusy { order: u8 },
    Hardware,
    Function,
    Privilege,
    Parameter,
    BadMode,
    NotFound,
    NoMem,
    Authority,
    Permission,
    Dropped,
    Resource,
    /// H_P1..H_P9: the numbered argument was rejected.
    BadArg(u8),
    Noop,
    TooBig,
    Unsupported,
    Overlap,
    Interrupt,
    BadData,
    NotActive,
    OpMode,
    State,
    InUse,
    Other(i64),
}

const H_LONG_BUSY_ORDER_1_MSEC: i64 = 9900;
const H_LONG_BUSY_ORDER_100_SEC: i64 = 9905;
const H_P1: i64 = -54;
const H_P9: i64 = -62;

impl HcallStatus {
    pub fn from_raw(rc: i64) -> Self {
        match rc {
            0 => Self::Success,
            1 => Self::Busy,
            2 => Self::Closed,
            3 => Self::NotAvailable,
            4 => Self::Constrained,
            5 => Self::Partial,
            14 => Self::InProgress,
            18 => Self::Continue,
            H_LONG_BUSY_ORDER_1_MSEC..=H_LONG_BUSY_ORDER_100_SEC => Self::LongBusy {
                order: (rc - H_LONG_BUSY_ORDER_1_MSEC) as u8,
            },
            -1 => Self::Hardware,
            -2 => Self::Function,
            -3 => Self::Privilege,
            -4 => Self::Parameter,
            -5 => Self::BadMode,
            -7 => Self::NotFound,
            -9 => Self::NoMem,
            -10 => Self::Authority,
            -11 => Self::Permission,
            -12 => Self::Dropped,
            -16 => Self::Resource,
            H_P9..=H_P1 => Self::BadArg((H_P1 - rc + 1) as u8),
            -63 => Self::Noop,
            -64 => Self::TooBig,
            -67 => Self::Unsupported,
            -68 => Self::Overlap,
            -69 => Self::Interrupt,
            -70 => Self::BadData,
            -71 => Self::NotActive,
            -73 => Self::OpMode,
            -75 => Self::State,
            -77 => Self::InUse,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> i64 {
        match self {
            Self::Success => 0,
            Self::Busy => 1,
            Self::Closed => 2,
            Self::NotAvailable => 3,
            Self::Constrained => 4,
            Self::Partial => 5,
            Self::InProgress => 14,
            Self::Continue => 18,
            Self::LongBusy { order } => H_LONG_BUSY_ORDER_1_MSEC + order as i64,
            Self::Hardware => -1,
            Self::Function => -2,
            Self::Privilege => -3,
            Self::Parameter => -4,
            Self::BadMode => -5,
            Self::NotFound => -7,
            Self::NoMem => -9,
            Self::Authority => -10,
            Self::Permission => -11,
            Self::Dropped => -12,
            Self::Resource => -16,
            Self::BadArg(n) => H_P1 - (n as i64 - 1),
            Self::Noop => -63,
            Self::TooBig => -64,
            Self::Unsupported => -67,
            Self::Overlap => -68,
            Self::Interrupt => -69,
            Self::BadData => -70,
            Self::NotActive => -71,
            Self::OpMode => -73,
            Self::State => -75,
            Self::InUse => -77,
            Self::Other(rc) => rc,
        }
    }

    /// Suggested wait before retrying, for the busy family.
    pub fn busy_wait_ms(self) -> Option<u64> {
        match self {
            Self::Busy => Some(0),
            Self::LongBusy { order } => Some(10u64.pow(order as u32)),
            _ => None,
        }
    }
}

/// One "dump hardware trace data" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpRequest {
    pub selectors: SelectorValues,
    /// Physical address of the destination buffer.
    pub addr: u64,
    /// Bytes to fill.
    pub size: u64,
    /// Page-aligned offset into the trace.
    pub offset: u64,
}

impl DumpRequest {
    /// Argument words following the opcode.
    pub fn encode(&self) -> [u64; 6] {
        let s = &self.selectors;
        let target = ((s.node_index as u64) << HTM_NODE_SHIFT)
            | ((s.nodal_chip_index as u64) << HTM_CHIP_SHIFT)
            | ((s.core_index_on_chip as u64) << HTM_CORE_SHIFT);
        let operation =
            (H_HTM_OP_DUMP_DATA << HTM_OP_SHIFT) | ((s.htm_type as u64) << HTM_TYPE_SHIFT);
        [
            H_HTM_FLAGS_HARDWARE_TARGET,
            target,
            operation,
            self.addr,
            self.size,
            self.offset,
        ]
    }
}

/// Ask the hypervisor to copy `size` bytes of trace, starting at `offset`,
/// into the physical buffer at `addr`.
pub fn htm_get_dump_hardware<H: Hypervisor + ?Sized>(hv: &H, req: &DumpRequest) -> HcallStatus {
    let rc = hv.hcall_norets(H_HTM, &req.encode());
    log::trace!(
        "htmdump: H_HTM dump addr={:#x} size={:#x} offset={:#x} rc={}",
        req.addr,
        req.size,
        req.offset,
        rc
    );
    HcallStatus::from_raw(rc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(HcallStatus::from_raw(0), HcallStatus::Success);
        assert_eq!(HcallStatus::from_raw(3), HcallStatus::NotAvailable);
        assert_eq!(HcallStatus::from_raw(5), HcallStatus::Partial);
        assert_eq!(HcallStatus::from_raw(-4), HcallStatus::Parameter);
        assert_eq!(HcallStatus::from_raw(-55), HcallStatus::BadArg(2));
        assert_eq!(HcallStatus::from_raw(-59), HcallStatus::BadArg(6));
        assert_eq!(HcallStatus::from_raw(9903), HcallStatus::LongBusy { order: 3 });
        assert_eq!(HcallStatus::from_raw(-1000), HcallStatus::Other(-1000));
    }

    #[test]
    fn test_raw_matches_from_raw() {
        for rc in [-77, -75, -62, -54, -10, -4, -1, 0, 1, 3, 5, 9900, 9905, 12345] {
            assert_eq!(HcallStatus::from_raw(rc).raw(), rc);
        }
    }

    #[test]
    fn test_busy_wait_hint() {
        assert_eq!(HcallStatus::from_raw(9900).busy_wait_ms(), Some(1));
        assert_eq!(HcallStatus::from_raw(9902).busy_wait_ms(), Some(100));
        assert_eq!(HcallStatus::from_raw(9905).busy_wait_ms(), Some(100_000));
        assert_eq!(HcallStatus::Busy.busy_wait_ms(), Some(0));
        assert_eq!(HcallStatus::Parameter.busy_wait_ms(), None);
    }

    #[test]
    fn test_encode_dump_request() {
        let req = DumpRequest {
            selectors: SelectorValues {
                node_index: 1,
                nodal_chip_index: 2,
                core_index_on_chip: 3,
                htm_type: 4,
            },
            addr: 0x8000_0000,
            size: 0x1000,
            offset: 0x3000,
        };
        let words = req.encode();
        assert_eq!(words[0], 1 << 63);
        assert_eq!(words[1], (1 << 48) | (2 << 32) | (3 << 16));
        assert_eq!(words[2], (0x09 << 48) | (4 << 32));
        assert_eq!(&words[3..], &[0x8000_0000, 0x1000, 0x3000]);
    }
}
