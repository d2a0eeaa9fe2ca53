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

//! The Chip-8 interpreter.
//!
//! The main focus of this module is the `Interpreter` struct, which owns the
//! entire state of the machine (memory, registers, call stack, timers,
//! display and keypad latch) and executes one instruction per call to
//! `step`.  The interpreter never blocks: the `LD Vx, K` instruction reports
//! `Cycle::WaitingForKey` and leaves the program counter where it is, so the
//! caller can keep ticking timers and redrawing while the program waits.

use std::cmp;
use std::default::Default;
use std::io::Read;
use std::num::Wrapping;
use std::u8;

use failure::{Error, Fail, ResultExt};
use rand;

use PROG_SIZE;
use PROG_START;
use Register;
use STACK_SIZE;
use display::{self, FONT_HEIGHT};
use input::{Key, Latch};
use instruction::{Address, Instruction, Opcode};
use memory::{Memory, FONT_START};
use timer::Timer;

/// An error resulting from a bad `RET` instruction.
#[derive(Debug, Fail)]
#[fail(display = "no subroutine to return from")]
pub struct NotInSubroutineError;

/// An error resulting from nesting subroutines too deeply.
#[derive(Debug, Fail)]
#[fail(display = "call stack overflow (more than {} nested subroutines)", _0)]
pub struct StackOverflowError(pub usize);

/// An error resulting from an input program being too large.
#[derive(Debug, Fail)]
#[fail(display = "input program is too large (more than {} bytes)", _0)]
pub struct ProgramTooLargeError(pub usize);

/// An error resulting from an input program with no data.
#[derive(Debug, Fail)]
#[fail(display = "input program is empty")]
pub struct EmptyProgramError;

/// The outcome of a single execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// An instruction was executed (or skipped as invalid).
    Advanced,
    /// The program is waiting for a key press; nothing changed.
    WaitingForKey,
}

/// Options for the interpreter.
pub struct Options {
    /// Whether to enable the timer (default `true`).
    pub enable_timer: bool,
    /// The frequency at which the delay and sound timers count down, in Hz
    /// (default 60).
    pub timer_freq: u32,
}

impl Options {
    /// Returns the default set of options.
    pub fn new() -> Self {
        Options {
            enable_timer: true,
            timer_freq: 60,
        }
    }

    /// Returns a set of options useful for testing (e.g. no timer).
    pub fn testing() -> Self {
        Options {
            enable_timer: false,
            timer_freq: 60,
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

/// A Chip-8 interpreter.
///
/// This struct contains the entire state of a Chip-8 interpreter and provides
/// all the expected methods for interacting with an interpreter, such as
/// stepping through execution and inspecting the internal state.
///
/// # Examples
///
/// ```
/// use chip8vm::{Cycle, Interpreter, Register};
/// use chip8vm::interpreter::Options;
///
/// let mut interpreter = Interpreter::with_options(Options::testing());
/// // LD V3, #2A
/// interpreter.load_bytes(&[0x63, 0x2A]).unwrap();
/// assert_eq!(interpreter.step().unwrap(), Cycle::Advanced);
/// assert_eq!(interpreter.register(Register::V3), 0x2A);
/// assert_eq!(interpreter.pc().addr(), 0x202);
/// ```
pub struct Interpreter {
    /// The internal memory.
    mem: Memory,
    /// The display buffer.
    display: display::Buffer,
    /// The keypad latch, shared with the host.
    input: Latch,
    /// The general-purpose registers `V0`-`VF`.
    regs: [Wrapping<u8>; 16],
    /// The special register `I`.
    reg_i: u16,
    /// The internal timer that drives `DT` and `ST`.
    timer: Timer,
    /// The delay timer.
    reg_dt: u8,
    /// The sound timer.
    reg_st: u8,
    /// The program counter.
    pc: Address,
    /// The call stack (return addresses).
    call_stack: Vec<Address>,
}

impl Interpreter {
    /// Returns a new interpreter with the default options.
    pub fn new() -> Self {
        Interpreter::with_options(Options::default())
    }

    /// Returns a new interpreter using the given options.
    pub fn with_options(options: Options) -> Self {
        Interpreter {
            mem: Memory::new(),
            display: display::Buffer::new(),
            input: Latch::new(),
            regs: [Wrapping(0); 16],
            reg_i: 0,
            timer: if options.enable_timer {
                Timer::new(options.timer_freq)
            } else {
                Timer::new_disabled(options.timer_freq)
            },
            reg_dt: 0,
            reg_st: 0,
            pc: start_address(),
            call_stack: Vec::with_capacity(STACK_SIZE),
        }
    }

    /// Puts the machine back into its power-on state.
    ///
    /// Memory is cleared (including any loaded program) and the font is
    /// reinstalled; registers, timers, the call stack, the display and the
    /// keypad are all cleared, and execution restarts at `PROG_START`.
    pub fn reset(&mut self) {
        self.mem.reset();
        self.display = display::Buffer::new();
        self.input.clear();
        self.regs = [Wrapping(0); 16];
        self.reg_i = 0;
        self.reg_dt = 0;
        self.reg_st = 0;
        self.pc = start_address();
        self.call_stack.clear();
        self.timer.restart();
    }

    /// Loads program data from the specified source.
    ///
    /// See `load_bytes` for the conditions under which loading fails.
    pub fn load_program<R: Read>(&mut self, input: &mut R) -> Result<(), Error> {
        let mut program = Vec::with_capacity(PROG_SIZE);
        // One extra byte is enough to tell whether the program is too big.
        input
            .take(PROG_SIZE as u64 + 1)
            .read_to_end(&mut program)
            .context("could not read program data")?;
        self.load_bytes(&program)
    }

    /// Resets the machine and loads the given program at `PROG_START`.
    ///
    /// Empty programs and programs larger than `PROG_SIZE` are rejected
    /// rather than truncated.  If loading fails, the machine is left exactly
    /// as it was.
    pub fn load_bytes(&mut self, program: &[u8]) -> Result<(), Error> {
        if program.is_empty() {
            return Err(EmptyProgramError.into());
        }
        if program.len() > PROG_SIZE {
            return Err(ProgramTooLargeError(PROG_SIZE).into());
        }

        self.reset();
        self.mem.load_program(program);
        debug!("loaded {} byte program", program.len());
        Ok(())
    }

    /// Returns a reference to the display buffer.
    pub fn display(&self) -> &display::Buffer {
        &self.display
    }

    /// Returns a mutable reference to the display buffer.
    pub fn display_mut(&mut self) -> &mut display::Buffer {
        &mut self.display
    }

    /// Returns the keypad latch.
    ///
    /// Clone it to hand a copy to whatever thread is producing key events.
    pub fn input(&self) -> &Latch {
        &self.input
    }

    /// Returns a reference to the internal memory.
    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    /// Returns the value of register `I`.
    pub fn i(&self) -> u16 {
        self.reg_i
    }

    /// Sets the value of register `I`.
    pub fn set_i(&mut self, val: u16) {
        self.reg_i = val;
    }

    /// Returns the value of the delay timer.
    pub fn dt(&self) -> u8 {
        self.reg_dt
    }

    /// Sets the value of the delay timer.
    pub fn set_dt(&mut self, val: u8) {
        self.reg_dt = val;
    }

    /// Returns the value of the sound timer.
    pub fn st(&self) -> u8 {
        self.reg_st
    }

    /// Sets the value of the sound timer.
    pub fn set_st(&mut self, val: u8) {
        self.reg_st = val;
    }

    /// Returns the value in the given register.
    pub fn register(&self, reg: Register) -> u8 {
        self.regs[reg as usize].0
    }

    /// Sets the given register to the given value.
    pub fn set_register(&mut self, reg: Register, val: u8) {
        self.regs[reg as usize].0 = val
    }

    /// Returns the value of the program counter.
    pub fn pc(&self) -> Address {
        self.pc
    }

    /// Returns the number of subroutines currently being executed.
    pub fn stack_depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Returns the opcode at the program counter.
    pub fn current_opcode(&self) -> Result<Opcode, Error> {
        let word = self.mem
            .read_word(self.pc)
            .with_context(|_| format!("could not fetch instruction at {}", self.pc))?;
        Ok(Opcode(word))
    }

    /// Returns the instruction at the program counter.
    pub fn current_instruction(&self) -> Result<Instruction, Error> {
        Ok(Instruction::from_opcode(self.current_opcode()?)?)
    }

    /// Performs a single execution step.
    ///
    /// Opcodes that don't correspond to any instruction are logged and
    /// skipped.
    pub fn step(&mut self) -> Result<Cycle, Error> {
        let opcode = self.current_opcode()?;
        match Instruction::from_opcode(opcode) {
            Ok(ins) => {
                trace!("{}: {}", self.pc, ins);
                self.execute(ins)
            }
            Err(e) => {
                warn!("skipping {} at {}", e, self.pc);
                self.pc = (self.pc + 2).context("program counter overflowed")?;
                Ok(Cycle::Advanced)
            }
        }
    }

    /// Executes the given instruction in the current interpreter context.
    ///
    /// The interpreter will behave as if the given instruction were executed
    /// at the current program location in memory.
    pub fn execute(&mut self, ins: Instruction) -> Result<Cycle, Error> {
        use self::Instruction::*;

        // Anything that doesn't set the program counter itself needs
        // somewhere to continue to before it touches any other state.
        let next = match ins {
            Ret | Jp(_) | Call(_) | JpV0(_) => None,
            _ => Some((self.pc + 2).context("program counter overflowed")?),
        };

        match ins {
            Cls => self.display.clear(),
            Ret => {
                self.pc = self.call_stack
                    .pop()
                    .ok_or(NotInSubroutineError)
                    .with_context(|_| format!("error executing {}", ins))?;
                return Ok(Cycle::Advanced);
            }
            Jp(addr) => {
                self.pc = addr;
                return Ok(Cycle::Advanced);
            }
            Call(addr) => {
                if self.call_stack.len() >= STACK_SIZE {
                    return Err(StackOverflowError(STACK_SIZE)
                        .context(format!("error executing {}", ins))
                        .into());
                }
                let ret = (self.pc + 2).context("program counter overflowed")?;
                self.call_stack.push(ret);
                self.pc = addr;
                return Ok(Cycle::Advanced);
            }
            SeByte(reg, b) => if self.register(reg) == b {
                return self.skip();
            },
            SneByte(reg, b) => if self.register(reg) != b {
                return self.skip();
            },
            SeReg(reg1, reg2) => if self.register(reg1) == self.register(reg2) {
                return self.skip();
            },
            LdByte(reg, b) => self.set_register(reg, b),
            AddByte(reg, b) => self.regs[reg as usize] += Wrapping(b),
            LdReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.set_register(reg1, r2);
            }
            Or(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 | r2);
            }
            And(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 & r2);
            }
            Xor(reg1, reg2) => {
                let r1 = self.register(reg1);
                let r2 = self.register(reg2);
                self.set_register(reg1, r1 ^ r2);
            }
            AddReg(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.add(reg1, r2);
            }
            Sub(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.sub(reg1, r2);
            }
            Shr(reg) => self.shr(reg),
            Subn(reg1, reg2) => {
                let r2 = self.register(reg2);
                self.subn(reg1, r2);
            }
            Shl(reg) => self.shl(reg),
            SneReg(reg1, reg2) => if self.register(reg1) != self.register(reg2) {
                return self.skip();
            },
            LdI(addr) => self.reg_i = addr.addr() as u16,
            JpV0(addr) => {
                self.pc = (addr + self.register(Register::V0) as usize)
                    .context("attempted to jump to out of bounds address")?;
                return Ok(Cycle::Advanced);
            }
            Rnd(reg, b) => self.set_register(reg, rand::random::<u8>() & b),
            Drw(reg1, reg2, n) => self.drw(reg1, reg2, n)
                .with_context(|_| format!("error executing {}", ins))?,
            Skp(reg) => if self.input.snapshot().is_pressed(Key::from_byte(self.register(reg))) {
                return self.skip();
            },
            Sknp(reg) => if !self.input.snapshot().is_pressed(Key::from_byte(self.register(reg))) {
                return self.skip();
            },
            LdRegDt(reg) => {
                let dt = self.dt();
                self.set_register(reg, dt);
            }
            LdKey(reg) => match self.input.snapshot().highest_pressed() {
                Some(key) => self.set_register(reg, key as u8),
                None => return Ok(Cycle::WaitingForKey),
            },
            LdDtReg(reg) => {
                let r = self.register(reg);
                self.set_dt(r);
            }
            LdSt(reg) => {
                let r = self.register(reg);
                self.set_st(r);
            }
            AddI(reg) => {
                let r = self.register(reg) as u16;
                self.reg_i = self.reg_i.wrapping_add(r);
            }
            LdF(reg) => {
                let r = self.register(reg) as usize;
                self.reg_i = (FONT_START + FONT_HEIGHT * r) as u16;
            }
            LdB(reg) => self.ld_b(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdDerefIReg(reg) => self.ld_deref_i_reg(reg)
                .with_context(|_| format!("error executing {}", ins))?,
            LdRegDerefI(reg) => self.ld_reg_deref_i(reg)
                .with_context(|_| format!("error executing {}", ins))?,
        }

        if let Some(next) = next {
            self.pc = next;
        }
        Ok(Cycle::Advanced)
    }

    /// Counts the delay and sound timers down by the given number of ticks,
    /// stopping at zero.
    ///
    /// Returns `true` if the sound timer ran out during these ticks, which is
    /// the moment the buzzer should sound.
    pub fn tick_timers(&mut self, ticks: u32) -> bool {
        let ticks = cmp::min(ticks, u8::MAX as u32) as u8;
        let old_st = self.reg_st;
        self.reg_dt = self.reg_dt.saturating_sub(ticks);
        self.reg_st = old_st.saturating_sub(ticks);
        old_st != 0 && self.reg_st == 0
    }

    /// Counts the timers down by however many ticks of the wall clock have
    /// passed since the last update.
    ///
    /// Returns `true` if the sound timer ran out.
    pub fn update_timers(&mut self) -> bool {
        let ticks = self.timer.lap();
        self.tick_timers(ticks)
    }

    /// Skips the next instruction.
    fn skip(&mut self) -> Result<Cycle, Error> {
        self.pc = (self.pc + 4).context("program counter overflowed")?;
        Ok(Cycle::Advanced)
    }

    /// Adds the given byte to the given register, setting `VF` to 1 on carry
    /// or 0 otherwise.
    fn add(&mut self, reg: Register, val: u8) {
        let carry = val > u8::MAX - self.register(reg);
        self.regs[reg as usize] += Wrapping(val);
        self.set_register(Register::VF, carry as u8);
    }

    /// Implements the `DRW` operation.
    fn drw(&mut self, reg1: Register, reg2: Register, n: u8) -> Result<(), Error> {
        let x = self.register(reg1) as usize;
        let y = self.register(reg2) as usize;
        let sprite = self.mem.slice(self.reg_i as usize, n as usize)?;

        let collision = self.display.draw_sprite(sprite, x, y);
        self.set_register(Register::VF, collision as u8);
        Ok(())
    }

    /// Implements the `LD B, Vx` operation.
    fn ld_b(&mut self, reg: Register) -> Result<(), Error> {
        let val = self.register(reg);
        let dest = self.mem.slice_mut(self.reg_i as usize, 3)?;

        dest[0] = val / 100;
        dest[1] = val / 10 % 10;
        dest[2] = val % 10;
        Ok(())
    }

    /// Implements the `LD [I], Vx` operation.
    ///
    /// Registers `V0` through `Vx` (inclusive) are stored, and `I` is left
    /// pointing just past the last byte written.
    fn ld_deref_i_reg(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        {
            let dest = self.mem.slice_mut(self.reg_i as usize, count)?;
            for (dest, src) in dest.iter_mut().zip(self.regs[..count].iter()) {
                *dest = src.0;
            }
        }
        self.reg_i = self.reg_i.wrapping_add(count as u16);
        Ok(())
    }

    /// Implements the `LD Vx, [I]` operation.
    fn ld_reg_deref_i(&mut self, reg: Register) -> Result<(), Error> {
        let count = reg as usize + 1;
        {
            let src = self.mem.slice(self.reg_i as usize, count)?;
            for (dest, src) in self.regs[..count].iter_mut().zip(src.iter()) {
                *dest = Wrapping(*src);
            }
        }
        self.reg_i = self.reg_i.wrapping_add(count as u16);
        Ok(())
    }

    /// Shifts `reg` left by one, setting `VF` to the old highest bit.
    fn shl(&mut self, reg: Register) {
        let r = self.register(reg);
        self.set_register(reg, r << 1);
        self.set_register(Register::VF, r >> 7);
    }

    /// Shifts `reg` right by one, setting `VF` to the old lowest bit.
    fn shr(&mut self, reg: Register) {
        let r = self.register(reg);
        self.set_register(reg, r >> 1);
        self.set_register(Register::VF, r & 1);
    }

    /// Subtracts the given byte from the given register, setting `VF` to 0 on
    /// borrow or 1 otherwise.
    fn sub(&mut self, reg: Register, val: u8) {
        let borrow = val > self.register(reg);
        self.regs[reg as usize] -= Wrapping(val);
        self.set_register(Register::VF, !borrow as u8);
    }

    /// Sets `reg` to `val - reg`, setting `VF` to 0 on borrow or 1 otherwise.
    fn subn(&mut self, reg: Register, val: u8) {
        let borrow = self.register(reg) > val;
        self.regs[reg as usize] = Wrapping(val) - self.regs[reg as usize];
        self.set_register(Register::VF, !borrow as u8);
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

/// Returns the address where execution starts.
fn start_address() -> Address {
    // PROG_START is well inside memory.
    Address::from_usize(PROG_START).unwrap()
}
