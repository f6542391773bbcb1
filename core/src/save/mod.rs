//! Save file decoding
//!
//! Reads character summaries and the death counter out of an `ER0000.sl2`
//! container. Only the slot header and a bounded window of the slot region are
//! decoded; everything else in the container is opaque.

mod decoder;
pub mod layout;
mod source;

#[cfg(test)]
pub(crate) mod fixture;

pub use decoder::{decode_name, decode_slot, find_deaths, list_profiles};
pub use layout::{NUM_SLOTS, SlotLayout};
pub use source::SaveSource;

use memmap2::Mmap;
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::Path;

/// One character's summary, recomputed on every successful read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Profile {
    pub slot_index: usize,
    pub name: String,
    pub level: u16,
    /// Seconds played
    pub play_time: u32,
    /// Zero when the counter signature is not found
    pub deaths: u32,
    pub active: bool,
}

/// Open the save and decode one slot with positioned reads.
///
/// `Err` means the file could not be opened; `Ok(None)` means the slot is
/// unused or the file was too short (typically a write in progress).
pub fn read_profile(path: &Path, slot: usize) -> io::Result<Option<Profile>> {
    let file = File::open(path)?;
    Ok(decode_slot(&file, slot))
}

/// Map the whole save into memory and list every active character.
pub fn read_save_file(path: &Path) -> io::Result<Vec<Profile>> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(list_profiles(&mmap[..]))
}
