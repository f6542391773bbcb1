use encoding_rs::UTF_16LE;
use memchr::memmem;

use super::Profile;
use super::layout::{
    CHAR_LEVEL_OFFSET, CHAR_NAME_LENGTH, CHAR_PLAYTIME_OFFSET, SAVE_HEADER_LENGTH,
    SLOT_SCAN_SIZE, SlotLayout, all_slots,
};
use super::source::SaveSource;

/// Marker that immediately follows the little-endian death counter.
///
/// This is an observed memory-layout signature, not a documented field.
const DEATH_SENTINEL: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x08, 0x00, 0x00];
const COUNTER_WIDTH: usize = 4;

/// Decode one character slot.
///
/// Returns `None` when the slot is out of range, its active byte is not 1, or
/// the source is too short for the active byte, the header, or the scan window.
pub fn decode_slot<S: SaveSource + ?Sized>(source: &S, slot: usize) -> Option<Profile> {
    let layout = SlotLayout::new(slot)?;

    let mut active = [0u8; 1];
    source.read_exact_at(layout.active_offset(), &mut active).ok()?;
    if active[0] != 1 {
        return None;
    }

    let mut header = [0u8; SAVE_HEADER_LENGTH];
    source.read_exact_at(layout.header_offset(), &mut header).ok()?;

    let mut window = vec![0u8; SLOT_SCAN_SIZE];
    source.read_exact_at(layout.region_offset(), &mut window).ok()?;

    Some(Profile {
        slot_index: slot,
        name: decode_name(&header[..CHAR_NAME_LENGTH]),
        level: le_u16(&header, CHAR_LEVEL_OFFSET)?,
        play_time: le_u32(&header, CHAR_PLAYTIME_OFFSET)?,
        deaths: find_deaths(&window),
        active: true,
    })
}

/// Decode every active slot, in slot order.
pub fn list_profiles<S: SaveSource + ?Sized>(source: &S) -> Vec<Profile> {
    all_slots()
        .filter_map(|layout| decode_slot(source, layout.slot()))
        .collect()
}

/// Scan a slot window for the death counter.
///
/// The lowest-offset sentinel preceded by a full counter wins. No match
/// yields 0.
pub fn find_deaths(window: &[u8]) -> u32 {
    memmem::find_iter(window, &DEATH_SENTINEL)
        .find(|&pos| pos >= COUNTER_WIDTH)
        .and_then(|pos| le_u32(window, pos - COUNTER_WIDTH))
        .unwrap_or(0)
}

/// Decode a NUL-padded UTF-16LE name field.
///
/// Truncation happens after decoding so surrogate pairs are never split.
pub fn decode_name(bytes: &[u8]) -> String {
    let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
    match text.find('\0') {
        Some(end) => text[..end].to_string(),
        None => text.into_owned(),
    }
}

fn le_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let raw = bytes.get(offset..offset + 2)?;
    Some(u16::from_le_bytes(raw.try_into().ok()?))
}

fn le_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(raw.try_into().ok()?))
}
