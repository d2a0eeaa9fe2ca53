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

//! Input handling for the Chip-8 interpreter.
//!
//! Key events usually come from a different thread than the one running the
//! interpreter (a UI event loop, or a terminal reader).  The `Latch` is the
//! only piece of state shared between the two: the host presses and releases
//! keys on its copy, and the interpreter takes a `State` snapshot whenever an
//! instruction needs to look at the keypad.

use std::collections::HashMap;
use std::default::Default;
use std::sync::{Arc, Mutex, MutexGuard};

use num::traits::FromPrimitive;

/// The number of keys on the Chip-8 controller.
pub const N_KEYS: usize = 16;

enum_from_primitive!{
/// The keys on the Chip-8 controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    K0 = 0,
    K1,
    K2,
    K3,
    K4,
    K5,
    K6,
    K7,
    K8,
    K9,
    KA,
    KB,
    KC,
    KD,
    KE,
    KF
}
}

impl Key {
    /// Returns the key corresponding to the lowest four bits of the given
    /// byte.
    pub fn from_byte(b: u8) -> Key {
        // Every 4-bit value names a key.
        Key::from_u8(b % N_KEYS as u8).unwrap()
    }

    /// Returns the key with the given index, if there is one.
    pub fn from_index(idx: usize) -> Option<Key> {
        Key::from_usize(idx)
    }
}

/// A snapshot of the state of the input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct State {
    /// The key states (`true` means "pressed").
    keys: [bool; N_KEYS],
}

impl State {
    /// Returns a new input state with all keys unpressed.
    pub fn new() -> Self {
        State::default()
    }

    /// Returns whether the given key is pressed.
    pub fn is_pressed(&self, key: Key) -> bool {
        self.keys[key as usize]
    }

    /// Returns whether any key is pressed.
    pub fn any_pressed(&self) -> bool {
        self.keys.iter().any(|&k| k)
    }

    /// Returns the highest-numbered key that is pressed, if any.
    ///
    /// When several keys are held at once, `KF` beats `KE` and so on down to
    /// `K0`.
    pub fn highest_pressed(&self) -> Option<Key> {
        self.keys
            .iter()
            .rposition(|&k| k)
            .and_then(Key::from_index)
    }

    fn set(&mut self, key: Key, pressed: bool) {
        self.keys[key as usize] = pressed;
    }
}

/// The keypad latch shared between the interpreter and the host.
///
/// Cloning a latch produces another handle to the same keypad.  All updates
/// and snapshots take the same lock, so the interpreter never sees a
/// half-applied key event.
///
/// # Examples
///
/// ```
/// use std::thread;
/// use chip8vm::{Key, Latch};
///
/// let latch = Latch::new();
/// let host = latch.clone();
/// thread::spawn(move || host.press(Key::KA)).join().unwrap();
/// assert!(latch.snapshot().is_pressed(Key::KA));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Latch {
    state: Arc<Mutex<State>>,
}

impl Latch {
    /// Returns a new latch with all keys unpressed.
    pub fn new() -> Self {
        Latch::default()
    }

    /// Presses the given key.
    pub fn press(&self, key: Key) {
        self.lock().set(key, true);
    }

    /// Releases the given key.
    pub fn release(&self, key: Key) {
        self.lock().set(key, false);
    }

    /// Sets the state of the key with the given index.
    ///
    /// Indices outside `0..16` don't name a key and are ignored.
    pub fn set_key_pressed(&self, idx: usize, pressed: bool) {
        match Key::from_index(idx) {
            Some(key) => self.lock().set(key, pressed),
            None => debug!("ignoring event for nonexistent key {}", idx),
        }
    }

    /// Releases every key.
    pub fn clear(&self) {
        *self.lock() = State::new();
    }

    /// Returns a copy of the current key states.
    pub fn snapshot(&self) -> State {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<State> {
        // A panic while holding the lock can't leave a `State` half-written,
        // so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A map from host key symbols to Chip-8 keys.
#[derive(Debug, Clone)]
pub struct Keymap {
    map: HashMap<char, Key>,
}

impl Keymap {
    /// Returns the keymap which maps the hex digits `0`-`9` and `a`-`f` to
    /// the keys of the same name.
    pub fn hex() -> Self {
        use self::Key::*;

        Keymap::with_map(hashmap![
            '0' => K0,
            '1' => K1,
            '2' => K2,
            '3' => K3,
            '4' => K4,
            '5' => K5,
            '6' => K6,
            '7' => K7,
            '8' => K8,
            '9' => K9,
            'a' => KA,
            'b' => KB,
            'c' => KC,
            'd' => KD,
            'e' => KE,
            'f' => KF,
        ])
    }

    /// Returns the keymap laid out on the left-hand side of a QWERTY
    /// keyboard, mirroring the shape of the original hex keypad.
    pub fn qwerty() -> Self {
        use self::Key::*;

        Keymap::with_map(hashmap![
            '1' => K1,
            '2' => K2,
            '3' => K3,
            '4' => KC,
            'q' => K4,
            'w' => K5,
            'e' => K6,
            'r' => KD,
            'a' => K7,
            's' => K8,
            'd' => K9,
            'f' => KE,
            'z' => KA,
            'x' => K0,
            'c' => KB,
            'v' => KF,
        ])
    }

    /// Returns a keymap using the given map.  Symbols should be lowercase.
    pub fn with_map(map: HashMap<char, Key>) -> Self {
        Keymap { map }
    }

    /// Returns the key for the given symbol, ignoring case.
    pub fn lookup(&self, symbol: char) -> Option<Key> {
        symbol
            .to_lowercase()
            .next()
            .and_then(|c| self.map.get(&c).cloned())
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highest_key_wins() {
        let latch = Latch::new();
        assert_eq!(latch.snapshot().highest_pressed(), None);

        latch.press(Key::K3);
        latch.press(Key::KB);
        latch.press(Key::K7);
        assert_eq!(latch.snapshot().highest_pressed(), Some(Key::KB));

        latch.release(Key::KB);
        assert_eq!(latch.snapshot().highest_pressed(), Some(Key::K7));
    }

    #[test]
    fn out_of_range_index_ignored() {
        let latch = Latch::new();
        latch.set_key_pressed(16, true);
        latch.set_key_pressed(1000, true);
        assert!(!latch.snapshot().any_pressed());

        latch.set_key_pressed(0xF, true);
        assert!(latch.snapshot().is_pressed(Key::KF));
        latch.set_key_pressed(0xF, false);
        assert!(!latch.snapshot().any_pressed());
    }

    #[test]
    fn clones_share_state() {
        let latch = Latch::new();
        let other = latch.clone();
        other.press(Key::K0);
        assert!(latch.snapshot().is_pressed(Key::K0));
        latch.clear();
        assert!(!other.snapshot().any_pressed());
    }

    #[test]
    fn key_from_byte_uses_low_nibble() {
        assert_eq!(Key::from_byte(0x1A), Key::KA);
        assert_eq!(Key::from_index(16), None);
    }

    #[test]
    fn keymap_lookup() {
        let hex = Keymap::hex();
        assert_eq!(hex.lookup('7'), Some(Key::K7));
        assert_eq!(hex.lookup('C'), Some(Key::KC));
        assert_eq!(hex.lookup('g'), None);

        let qwerty = Keymap::qwerty();
        assert_eq!(qwerty.lookup('x'), Some(Key::K0));
        assert_eq!(qwerty.lookup('V'), Some(Key::KF));
        assert_eq!(qwerty.lookup('0'), None);
    }
}
