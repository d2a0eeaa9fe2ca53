/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! The interpreter's main loop.
//!
//! Each pass through the loop executes one instruction, counts the timers
//! down by however much wall-clock time has passed, tells the frontend to
//! beep or redraw if needed, and then sleeps until the next cycle is due.
//! The loop checks a `StopHandle` once per pass, so another thread can end
//! it cleanly.

use std::default::Default;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use failure::{Error, ResultExt};

use display;
use interpreter::{Cycle, Interpreter};

/// The host side of the interpreter: whatever actually shows pixels and
/// plays sounds.
pub trait Frontend {
    /// Presents the given display buffer.
    ///
    /// Only called when the buffer has changed since the last redraw.
    fn redraw(&mut self, buffer: &display::Buffer) -> Result<(), Error>;

    /// Sounds the buzzer once.
    fn beep(&mut self) -> Result<(), Error>;
}

/// A handle that can be used to stop a running `Runner` from any thread.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Returns a new handle which has not been stopped.
    pub fn new() -> Self {
        StopHandle::default()
    }

    /// Asks the runner to stop after the current cycle.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Returns whether a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Options for the run loop.
pub struct RunOptions {
    /// The number of instructions to execute per second (default 500).
    pub cycle_freq: u32,
    /// The number of cycles after which to stop, if any (default `None`).
    pub cycle_limit: Option<u64>,
}

impl RunOptions {
    /// Returns the default set of options.
    pub fn new() -> Self {
        RunOptions {
            cycle_freq: 500,
            cycle_limit: None,
        }
    }

    /// Returns the time each cycle should take.
    fn cycle_time(&self) -> Duration {
        if self.cycle_freq == 0 {
            Duration::from_secs(0)
        } else {
            Duration::from_secs(1) / self.cycle_freq
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions::new()
    }
}

/// Drives an interpreter, reporting redraws and beeps to a frontend.
pub struct Runner {
    interpreter: Interpreter,
    options: RunOptions,
    stop: StopHandle,
    cycles: u64,
}

impl Runner {
    /// Returns a runner for the given interpreter.
    pub fn new(interpreter: Interpreter, options: RunOptions) -> Self {
        Runner {
            interpreter,
            options,
            stop: StopHandle::new(),
            cycles: 0,
        }
    }

    /// Returns a handle which can be used to stop the runner.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns a reference to the interpreter.
    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    /// Returns a mutable reference to the interpreter.
    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Returns the number of cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Runs a single cycle without sleeping.
    ///
    /// The timers and display are serviced even when the program is waiting
    /// for a key.
    pub fn cycle<F: Frontend>(&mut self, frontend: &mut F) -> Result<Cycle, Error> {
        // The necessary context for any error in 'step' should be provided
        // from the method itself.
        let outcome = self.interpreter.step()?;
        self.cycles += 1;

        if self.interpreter.update_timers() {
            frontend.beep().context("could not sound buzzer")?;
        }
        self.interpreter
            .display_mut()
            .refresh(|buf| frontend.redraw(buf))
            .context("could not refresh display")?;

        Ok(outcome)
    }

    /// Runs cycles until stopped, the cycle limit is reached or an error
    /// occurs.
    pub fn run<F: Frontend>(&mut self, frontend: &mut F) -> Result<(), Error> {
        let cycle_time = self.options.cycle_time();

        loop {
            if self.stop.is_stopped() {
                info!("interpreter was stopped after {} cycles", self.cycles);
                return Ok(());
            }
            if let Some(limit) = self.options.cycle_limit {
                if self.cycles >= limit {
                    info!("cycle limit of {} reached", limit);
                    return Ok(());
                }
            }

            self.cycle(frontend)?;
            thread::sleep(cycle_time);
        }
    }
}
