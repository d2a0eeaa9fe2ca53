// Copyright 2018 Ian Johnson

// This file is part of Chip-8.

// Chip-8 is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Chip-8 is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Chip-8.  If not, see <http://www.gnu.org/licenses/>.

//! The Chip-8 display buffer.

use std::default::Default;

/// The width of the display.
pub const WIDTH: usize = 64;
/// The height of the display.
pub const HEIGHT: usize = 32;

/// The height of a font glyph.
pub const FONT_HEIGHT: usize = 5;

/// The hex digit glyphs, installed at the start of memory.
pub const FONT_SPRITES: [[u8; FONT_HEIGHT]; 16] = [
    [0xF0, 0x90, 0x90, 0x90, 0xF0],
    [0x20, 0x60, 0x20, 0x20, 0x70],
    [0xF0, 0x10, 0xF0, 0x80, 0xF0],
    [0xF0, 0x10, 0xF0, 0x10, 0xF0],
    [0x90, 0x90, 0xF0, 0x10, 0x10],
    [0xF0, 0x80, 0xF0, 0x10, 0xF0],
    [0xF0, 0x80, 0xF0, 0x90, 0xF0],
    [0xF0, 0x10, 0x20, 0x40, 0x40],
    [0xF0, 0x90, 0xF0, 0x90, 0xF0],
    [0xF0, 0x90, 0xF0, 0x10, 0xF0],
    [0xF0, 0x90, 0xF0, 0x90, 0x90],
    [0xE0, 0x90, 0xE0, 0x90, 0xE0],
    [0xF0, 0x80, 0x80, 0x80, 0xF0],
    [0xE0, 0x90, 0x90, 0x90, 0xE0],
    [0xF0, 0x80, 0xF0, 0x80, 0xF0],
    [0xF0, 0x80, 0xF0, 0x80, 0x80],
];

/// A Chip-8 display buffer.
///
/// Cells are stored row-major, so the pixel at `(x, y)` lives at index
/// `x + y * WIDTH` of `cells()`.
pub struct Buffer {
    /// The underlying pixel data.
    data: [bool; WIDTH * HEIGHT],
    /// Whether the display needs to be refreshed.
    needs_refresh: bool,
}

impl Buffer {
    /// Returns a new display buffer with all pixels clear.
    ///
    /// A fresh buffer always needs a refresh, so that whatever the frontend
    /// was showing before gets wiped.
    pub fn new() -> Self {
        Buffer {
            data: [false; WIDTH * HEIGHT],
            needs_refresh: true,
        }
    }

    /// Clears the display.
    pub fn clear(&mut self) {
        for elem in self.data.iter_mut() {
            *elem = false;
        }
        self.needs_refresh = true;
    }

    /// Returns the row-major pixel data.
    pub fn cells(&self) -> &[bool] {
        &self.data
    }

    /// Returns whether the pixel at the given position is on.
    ///
    /// Coordinates wrap around the edges of the screen.
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[index(x, y)]
    }

    /// Returns whether the buffer has changed since the last refresh.
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    /// Draws the given sprite with its top-left corner at the given position.
    ///
    /// Each byte of `sprite` is one row of eight pixels, most significant bit
    /// leftmost.  Pixels that fall off the right or bottom edge wrap around to
    /// the opposite side.  Returns whether any pixel was switched off.
    pub fn draw_sprite(&mut self, sprite: &[u8], x: usize, y: usize) -> bool {
        let mut collision = false;

        for (j, row) in sprite.iter().enumerate() {
            for i in 0..8 {
                if row & (0x80 >> i) != 0 && self.toggle(x + i, y + j) {
                    collision = true;
                }
            }
        }

        collision
    }

    /// Forces a refresh on the next call to `refresh`, even if no draw
    /// operation has been performed.
    pub fn force_refresh(&mut self) {
        self.needs_refresh = true;
    }

    /// Refreshes the display using the given refresh function.
    ///
    /// If a refresh is unnecessary, nothing will be done.  The refresh
    /// function receives a "snapshot" of the display, and should draw that to
    /// whatever user-facing display buffer is currently being used.  If it
    /// fails, the buffer stays dirty.
    pub fn refresh<F, E>(&mut self, f: F) -> Result<(), E>
    where
        F: FnOnce(&Self) -> Result<(), E>,
    {
        if self.needs_refresh {
            f(self)?;
            self.needs_refresh = false;
        }
        Ok(())
    }

    /// Renders the buffer as text, one line per row, using `on` and `off`
    /// for the two pixel states.
    pub fn render_ascii(&self, on: char, off: char) -> String {
        let mut out = String::with_capacity((WIDTH + 1) * HEIGHT);
        for row in self.data.chunks(WIDTH) {
            out.extend(row.iter().map(|&p| if p { on } else { off }));
            out.push('\n');
        }
        out
    }

    /// Flips the on/off state of the given pixel, returning whether it was
    /// flipped off from the on state.
    fn toggle(&mut self, x: usize, y: usize) -> bool {
        let idx = index(x, y);
        let old = self.data[idx];
        self.data[idx] = !old;
        self.needs_refresh = true;

        old
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

/// Returns the cell index of the given position, wrapped onto the screen.
fn index(x: usize, y: usize) -> usize {
    x % WIDTH + (y % HEIGHT) * WIDTH
}
