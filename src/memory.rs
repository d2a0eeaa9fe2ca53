/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Bounds-checked Chip-8 memory.

use std::default::Default;

use MEM_SIZE;
use PROG_START;
use display::{FONT_HEIGHT, FONT_SPRITES};
use instruction::{Address, AddressOutOfBoundsError};

/// The location at which to put the font glyphs.
pub const FONT_START: usize = 0x0;

/// The Chip-8's 4 KiB of memory.
///
/// Every access goes through a bounds check, so malformed programs (for
/// example, one that points `I` at the last byte of memory and then stores
/// sixteen registers) produce an `AddressOutOfBoundsError` instead of
/// touching anything outside the array.
pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Memory {
    /// Returns a freshly reset memory.
    pub fn new() -> Self {
        let mut mem = Memory {
            data: [0; MEM_SIZE],
        };
        mem.reset();
        mem
    }

    /// Zeroes all of memory and reinstalls the font glyphs.
    pub fn reset(&mut self) {
        for b in self.data.iter_mut() {
            *b = 0;
        }
        for (i, sprite) in FONT_SPRITES.iter().enumerate() {
            let start = FONT_START + i * FONT_HEIGHT;
            self.data[start..start + FONT_HEIGHT].copy_from_slice(sprite);
        }
    }

    /// Copies a program into memory at `PROG_START`.
    ///
    /// The caller is responsible for checking that the program fits.
    pub(crate) fn load_program(&mut self, program: &[u8]) {
        self.data[PROG_START..PROG_START + program.len()].copy_from_slice(program);
    }

    /// Returns the whole of memory.
    pub fn data(&self) -> &[u8; MEM_SIZE] {
        &self.data
    }

    /// Reads the byte at the given address.
    pub fn read(&self, addr: usize) -> Result<u8, AddressOutOfBoundsError> {
        self.data
            .get(addr)
            .cloned()
            .ok_or(AddressOutOfBoundsError(addr))
    }

    /// Reads the 16-bit big-endian word starting at the given address.
    pub fn read_word(&self, addr: Address) -> Result<u16, AddressOutOfBoundsError> {
        let high = self.read(addr.addr())?;
        let low = self.read(addr.addr() + 1)?;
        Ok((high as u16) << 8 | low as u16)
    }

    /// Returns `len` bytes starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<&[u8], AddressOutOfBoundsError> {
        check_range(start, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Returns `len` mutable bytes starting at `start`.
    pub fn slice_mut(
        &mut self,
        start: usize,
        len: usize,
    ) -> Result<&mut [u8], AddressOutOfBoundsError> {
        check_range(start, len)?;
        Ok(&mut self.data[start..start + len])
    }
}

impl Default for Memory {
    fn default() -> Self {
        Memory::new()
    }
}

/// Checks that `len` bytes starting at `start` are all addressable, reporting
/// the first address that isn't.
fn check_range(start: usize, len: usize) -> Result<(), AddressOutOfBoundsError> {
    if start + len > MEM_SIZE {
        Err(AddressOutOfBoundsError(start.max(MEM_SIZE)))
    } else {
        Ok(())
    }
}
