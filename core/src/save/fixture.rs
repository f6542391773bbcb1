//! Synthetic save containers for tests.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use super::layout::{
    CHAR_LEVEL_OFFSET, CHAR_NAME_LENGTH, CHAR_PLAYTIME_OFFSET, NUM_SLOTS, SAVE_HEADER_LENGTH,
    SAVE_HEADER_START_INDEX, SlotLayout,
};

/// Offset of the counter inside the slot region.
pub const DEATHS_OFFSET: u64 = 120;

const SENTINEL: [u8; 8] = [0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x08, 0x00, 0x00];

/// Encode a name as a NUL-padded UTF-16LE header field.
pub fn encode_name(name: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    bytes.resize(CHAR_NAME_LENGTH, 0);
    bytes
}

/// Builder for a minimal container with a handful of populated slots.
#[derive(Debug, Default, Clone)]
pub struct SaveFixture {
    patches: Vec<(u64, Vec<u8>)>,
}

impl SaveFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full container length (through the last slot header).
    pub fn len() -> u64 {
        SAVE_HEADER_START_INDEX + (NUM_SLOTS * SAVE_HEADER_LENGTH) as u64
    }

    pub fn character(
        self,
        slot: usize,
        name: &str,
        level: u16,
        play_time: u32,
        deaths: Option<u32>,
    ) -> Self {
        let layout = SlotLayout::new(slot).expect("fixture slot in range");
        let mut fixture = self.header(layout, 1, name, level, play_time);
        if let Some(deaths) = deaths {
            let mut counter = deaths.to_le_bytes().to_vec();
            counter.extend_from_slice(&SENTINEL);
            fixture
                .patches
                .push((layout.region_offset() + DEATHS_OFFSET, counter));
        }
        fixture
    }

    pub fn inactive(self, slot: usize, name: &str, level: u16) -> Self {
        let layout = SlotLayout::new(slot).expect("fixture slot in range");
        self.header(layout, 0, name, level, 0)
    }

    fn header(mut self, layout: SlotLayout, active: u8, name: &str, level: u16, play_time: u32) -> Self {
        let mut header = vec![0u8; SAVE_HEADER_LENGTH];
        header[..CHAR_NAME_LENGTH].copy_from_slice(&encode_name(name));
        header[CHAR_LEVEL_OFFSET..CHAR_LEVEL_OFFSET + 2].copy_from_slice(&level.to_le_bytes());
        header[CHAR_PLAYTIME_OFFSET..CHAR_PLAYTIME_OFFSET + 4]
            .copy_from_slice(&play_time.to_le_bytes());

        self.patches.push((layout.active_offset(), vec![active]));
        self.patches.push((layout.header_offset(), header));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = vec![0u8; Self::len() as usize];
        for (offset, bytes) in &self.patches {
            let start = *offset as usize;
            data[start..start + bytes.len()].copy_from_slice(bytes);
        }
        data
    }

    /// Write a sparse file with the same contents as `to_bytes`.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        file.set_len(Self::len())?;
        for (offset, bytes) in &self.patches {
            file.seek(SeekFrom::Start(*offset))?;
            file.write_all(bytes)?;
        }
        file.sync_all()
    }
}
