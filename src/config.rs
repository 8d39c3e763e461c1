//! Trace source selectors.
//!
//! Four operator-settable values pick which hardware trace macro the next
//! dump is read from. No combination is validated here; a bad one surfaces
//! as an error status from the hypervisor on the next read.

use core::sync::atomic::{AtomicU32, Ordering};

/// One of the four selector fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Index of the source node.
    NodeIndex,
    /// Chip index within the node.
    NodalChipIndex,
    /// Core index within the chip.
    CoreIndexOnChip,
    /// Trace type.
    HtmType,
}

impl Selector {
    /// All selectors, in registration order.
    pub const ALL: [Selector; 4] = [
        Selector::NodeIndex,
        Selector::NodalChipIndex,
        Selector::CoreIndexOnChip,
        Selector::HtmType,
    ];

    /// Endpoint name for this selector.
    pub const fn name(self) -> &'static str {
        match self {
            Selector::NodeIndex => "nodeindex",
            Selector::NodalChipIndex => "nodalchipindex",
            Selector::CoreIndexOnChip => "coreindexonchip",
            Selector::HtmType => "htmtype",
        }
    }
}

/// Point-in-time copy of the selectors, as handed to the hypervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectorValues {
    pub node_index: u32,
    pub nodal_chip_index: u32,
    pub core_index_on_chip: u32,
    pub htm_type: u32,
}

/// Shared selector store. Every field defaults to 0.
#[derive(Debug, Default)]
pub struct Selectors {
    node_index: AtomicU32,
    nodal_chip_index: AtomicU32,
    core_index_on_chip: AtomicU32,
    htm_type: AtomicU32,
}

impl Selectors {
    pub const fn new() -> Self {
        Self {
            node_index: AtomicU32::new(0),
            nodal_chip_index: AtomicU32::new(0),
            core_index_on_chip: AtomicU32::new(0),
            htm_type: AtomicU32::new(0),
        }
    }

    fn slot(&self, which: Selector) -> &AtomicU32 {
        match which {
            Selector::NodeIndex => &self.node_index,
            Selector::NodalChipIndex => &self.nodal_chip_index,
            Selector::CoreIndexOnChip => &self.core_index_on_chip,
            Selector::HtmType => &self.htm_type,
        }
    }

    pub fn get(&self, which: Selector) -> u32 {
        self.slot(which).load(Ordering::Acquire)
    }

    pub fn set(&self, which: Selector, value: u32) {
        self.slot(which).store(value, Ordering::Release);
        log::debug!("htmdump: {} = {}", which.name(), value);
    }

    /// Read all four fields for one fetch.
    ///
    /// Fields are loaded independently; a concurrent writer may be seen
    /// half-applied.
    pub fn snapshot(&self) -> SelectorValues {
        SelectorValues {
            node_index: self.get(Selector::NodeIndex),
            nodal_chip_index: self.get(Selector::NodalChipIndex),
            core_index_on_chip: self.get(Selector::CoreIndexOnChip),
            htm_type: self.get(Selector::HtmType),
        }
    }
}
