/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! A Chip-8 virtual machine core.
//!
//! The crate is split the same way the machine is: `memory` and the register
//! file in `interpreter` hold the state, `instruction` decodes opcodes,
//! `timer` provides the 60 Hz tick, `input` holds the key latch shared with
//! the host, and `run` ties everything together into a stoppable loop that
//! reports redraws and beeps to a `Frontend`.

#[macro_use]
extern crate enum_primitive;
extern crate failure;
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate maplit;
extern crate num;
extern crate rand;
extern crate time;

/// The size of the Chip-8's memory, in bytes.
pub const MEM_SIZE: usize = 0x1000;
/// The address where programs should be loaded.
pub const PROG_START: usize = 0x200;
/// The maximum size of a Chip-8 program, in bytes.
pub const PROG_SIZE: usize = MEM_SIZE - PROG_START;
/// The maximum subroutine nesting depth.
pub const STACK_SIZE: usize = 64;

pub mod display;
pub mod input;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod run;
mod timer;

pub use input::{Key, Keymap, Latch};
pub use instruction::{Address, AddressOutOfBoundsError, Instruction, InvalidOpcodeError, Opcode,
                      Register};
pub use interpreter::{Cycle, Interpreter};
pub use run::{Frontend, Runner, StopHandle};
