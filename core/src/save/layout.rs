//! Fixed offsets inside `ER0000.sl2`.
//!
//! The container holds ten character slots. Each slot has a large data region
//! near the start of the file and a small summary header (name, level,
//! playtime) packed together near the end, next to one active byte per slot.

pub const SLOT_START_INDEX: u64 = 0x310;
pub const SLOT_LENGTH: u64 = 0x28_0000;
/// Bounded prefix of each slot region searched for the death counter.
pub const SLOT_SCAN_SIZE: usize = 0x4_0000;
pub const NUM_SLOTS: usize = 10;

pub const SAVE_HEADER_START_INDEX: u64 = 0x190_1D0E;
pub const SAVE_HEADER_LENGTH: usize = 0x24C;
pub const CHAR_ACTIVE_STATUS_START_INDEX: u64 = 0x190_1D04;

// Offsets within a save header
pub const CHAR_NAME_LENGTH: usize = 0x22;
pub const CHAR_LEVEL_OFFSET: usize = 0x22;
pub const CHAR_PLAYTIME_OFFSET: usize = 0x26;

/// Absolute offsets for one character slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    slot: usize,
}

impl SlotLayout {
    /// Returns `None` for slots outside `0..NUM_SLOTS`.
    pub fn new(slot: usize) -> Option<Self> {
        (slot < NUM_SLOTS).then_some(Self { slot })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn active_offset(&self) -> u64 {
        CHAR_ACTIVE_STATUS_START_INDEX + self.slot as u64
    }

    pub fn header_offset(&self) -> u64 {
        SAVE_HEADER_START_INDEX + (self.slot * SAVE_HEADER_LENGTH) as u64
    }

    pub fn region_offset(&self) -> u64 {
        SLOT_START_INDEX + self.slot as u64 * SLOT_LENGTH
    }

    /// Smallest container length that holds every field this slot needs.
    pub fn required_len(&self) -> u64 {
        let active_end = self.active_offset() + 1;
        let header_end = self.header_offset() + SAVE_HEADER_LENGTH as u64;
        let scan_end = self.region_offset() + SLOT_SCAN_SIZE as u64;
        active_end.max(header_end).max(scan_end)
    }
}

/// Iterate the layouts of every slot in slot order.
pub fn all_slots() -> impl Iterator<Item = SlotLayout> {
    (0..NUM_SLOTS).map(|slot| SlotLayout { slot })
}
