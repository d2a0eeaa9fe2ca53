/*
 * Copyright 2018 Ian Johnson
 *
 * This is free software, distributed under the MIT license.  A copy of the
 * license can be found in the LICENSE file in the project root, or at
 * https://opensource.org/licenses/MIT.
 */

//! Drives whole programs through the run loop, with key events and stop
//! requests coming from other threads the way a real frontend would send
//! them.

extern crate chip8vm;
extern crate failure;

use std::thread;
use std::time::Duration;

use failure::Error;

use chip8vm::display::{self, WIDTH};
use chip8vm::interpreter::Options;
use chip8vm::run::RunOptions;
use chip8vm::{Frontend, Interpreter, Key, Runner};

/// A frontend which remembers the last frame it was shown.
#[derive(Default)]
struct Recorder {
    frame: Vec<bool>,
    redraws: usize,
    beeps: usize,
}

impl Frontend for Recorder {
    fn redraw(&mut self, buffer: &display::Buffer) -> Result<(), Error> {
        self.frame = buffer.cells().to_vec();
        self.redraws += 1;
        Ok(())
    }

    fn beep(&mut self) -> Result<(), Error> {
        self.beeps += 1;
        Ok(())
    }
}

fn runner(program: &[u8], options: Options, run_options: RunOptions) -> Runner {
    let mut interpreter = Interpreter::with_options(options);
    interpreter.load_bytes(program).unwrap();
    Runner::new(interpreter, run_options)
}

#[test]
fn key_press_from_another_thread() {
    let program = [
        0xF1, 0x0A, // LD V1, K
        0xF1, 0x29, // LD F, V1
        0xD0, 0x05, // DRW V0, V0, 5
        0x12, 0x06, // JP #206
    ];
    let mut runner = runner(
        &program,
        Options::testing(),
        RunOptions {
            cycle_freq: 1000,
            cycle_limit: Some(200),
        },
    );
    let latch = runner.interpreter().input().clone();
    let presser = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        latch.press(Key::KA);
    });

    let mut frontend = Recorder::default();
    runner.run(&mut frontend).unwrap();
    presser.join().unwrap();

    // The glyph for A: F0 90 F0 90 90.
    let row = |y: usize| -> Vec<bool> { frontend.frame[y * WIDTH..y * WIDTH + 8].to_vec() };
    let full = vec![true, true, true, true, false, false, false, false];
    let sides = vec![true, false, false, true, false, false, false, false];
    assert_eq!(row(0), full);
    assert_eq!(row(1), sides);
    assert_eq!(row(2), full);
    assert_eq!(row(3), sides);
    assert_eq!(row(4), sides);
    assert_eq!(runner.interpreter().register(chip8vm::Register::V1), 0xA);
    // Once for the fresh screen, once for the glyph.
    assert_eq!(frontend.redraws, 2);
}

#[test]
fn sound_timer_beeps_once() {
    let program = [
        0x60, 0x03, // LD V0, #03
        0xF0, 0x18, // LD ST, V0
        0x12, 0x04, // JP #204
    ];
    let mut runner = runner(
        &program,
        Options {
            enable_timer: true,
            timer_freq: 1000,
        },
        RunOptions {
            cycle_freq: 1000,
            cycle_limit: Some(100),
        },
    );

    let mut frontend = Recorder::default();
    runner.run(&mut frontend).unwrap();
    assert_eq!(frontend.beeps, 1);
    assert_eq!(runner.interpreter().st(), 0);
}

#[test]
fn stop_from_another_thread() {
    // JP #200
    let mut runner = runner(&[0x12, 0x00], Options::testing(), RunOptions::new());
    let stop = runner.stop_handle();
    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        stop.stop();
    });

    let mut frontend = Recorder::default();
    runner.run(&mut frontend).unwrap();
    stopper.join().unwrap();
    assert!(runner.cycles() > 0);
    assert_eq!(runner.interpreter().pc().addr(), 0x200);
}

#[test]
fn fatal_errors_are_reported() {
    let program = [
        0x22, 0x00, // CALL #200, forever
    ];
    let mut runner = runner(
        &program,
        Options::testing(),
        RunOptions {
            cycle_freq: 0,
            cycle_limit: Some(1000),
        },
    );

    let err = runner.run(&mut Recorder::default()).unwrap_err();
    assert!(format!("{}", err).contains("CALL #200"));
    assert_eq!(runner.cycles(), 64);
}
