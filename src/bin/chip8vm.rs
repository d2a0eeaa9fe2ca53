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

//! The `chip8vm` binary program.
//!
//! This is a terminal frontend: frames are printed as text, the buzzer is the
//! terminal bell, and keys are fed in on standard input one line at a time.
//! A line starting with `+` presses the keys named by the rest of the line,
//! one starting with `-` releases them, and `quit` stops the machine.

extern crate chip8vm;
extern crate clap;
extern crate env_logger;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

use std::fs::File;
use std::io::{self, BufRead, Write};
use std::process;
use std::thread;

use clap::{App, Arg, ArgMatches};
use failure::{Error, ResultExt};
use log::LevelFilter;

use chip8vm::display;
use chip8vm::interpreter::{Interpreter, Options};
use chip8vm::run::RunOptions;
use chip8vm::{Frontend, Keymap, Latch, Runner, StopHandle};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Draws frames and rings the bell on standard output.
struct Terminal {
    out: io::Stdout,
}

impl Terminal {
    fn new() -> Self {
        Terminal { out: io::stdout() }
    }
}

impl Frontend for Terminal {
    fn redraw(&mut self, buffer: &display::Buffer) -> Result<(), Error> {
        let mut out = self.out.lock();
        // Home the cursor so each frame overwrites the last.
        write!(out, "\x1B[H{}", buffer.render_ascii('#', ' '))?;
        out.flush()?;
        Ok(())
    }

    fn beep(&mut self) -> Result<(), Error> {
        let mut out = self.out.lock();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

/// Applies one line of keypad commands to the latch.
///
/// Returns `false` if the line asks to quit.
fn process_line(line: &str, keymap: &Keymap, latch: &Latch) -> bool {
    let line = line.trim();
    if line == "quit" {
        return false;
    }

    let mut chars = line.chars();
    let pressed = match chars.next() {
        Some('+') => true,
        Some('-') => false,
        _ => {
            warn!("ignoring input line '{}'", line);
            return true;
        }
    };
    for symbol in chars {
        match keymap.lookup(symbol) {
            Some(key) => if pressed {
                latch.press(key)
            } else {
                latch.release(key)
            },
            None => debug!("no key is mapped to '{}'", symbol),
        }
    }
    true
}

/// Reads keypad commands from standard input until it closes or asks to
/// quit, then stops the runner.
fn spawn_input_reader(keymap: Keymap, latch: Latch, stop: StopHandle) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => if !process_line(&line, &keymap, &latch) {
                    break;
                },
                Err(e) => {
                    error!("could not read input: {}", e);
                    break;
                }
            }
        }
        stop.stop();
    });
}

fn main() {
    let matches = App::new("chip8vm")
        .version(VERSION)
        .author("Ian Johnson <ianprime0509@gmail.com>")
        .about("A Chip-8 interpreter for the terminal")
        .help_message("show this help message and exit")
        .version_message("show version information and exit")
        .arg(
            Arg::with_name("cycles")
                .short("c")
                .long("cycles")
                .value_name("N")
                .help("stop after executing N instructions")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("frequency")
                .long("frequency")
                .value_name("FREQ")
                .help("set game timer frequency (in Hz)")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("keymap")
                .short("k")
                .long("keymap")
                .value_name("LAYOUT")
                .possible_values(&["hex", "qwerty"])
                .help("set the keyboard layout")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("speed")
                .short("s")
                .long("speed")
                .value_name("FREQ")
                .help("set instructions executed per second")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("increase verbosity"),
        )
        .arg(
            Arg::with_name("FILE")
                .help("set the program file to run")
                .required(true)
                .index(1),
        )
        .get_matches();

    let verbosity = matches.occurrences_of("verbose");
    let filter = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter(None, filter)
        .format(|buf, record| writeln!(buf, "{}: {}", record.level(), record.args()))
        .init();

    if let Err(e) = run(&matches) {
        error!("{}", e);
        for cause in e.causes().skip(1) {
            info!("caused by: {}", cause);
        }
        trace!("backtrace: {}", e.backtrace());
        process::exit(1);
    }
}

fn run(matches: &ArgMatches) -> Result<(), Error> {
    let mut opts = Options::new();
    let mut run_opts = RunOptions::new();
    process_opts(&mut opts, &mut run_opts, matches)?;
    let keymap = match matches.value_of("keymap") {
        Some("qwerty") => Keymap::qwerty(),
        Some("hex") | None => Keymap::hex(),
        Some(other) => bail!("unknown keymap '{}'", other),
    };

    let filename = matches.value_of("FILE").unwrap();
    let mut input =
        File::open(filename).with_context(|_| format!("could not open file '{}'", filename))?;
    let mut interpreter = Interpreter::with_options(opts);
    interpreter
        .load_program(&mut input)
        .with_context(|_| format!("could not load program from file '{}'", filename))?;

    let mut runner = Runner::new(interpreter, run_opts);
    spawn_input_reader(
        keymap,
        runner.interpreter().input().clone(),
        runner.stop_handle(),
    );

    let mut terminal = Terminal::new();
    // Clear the screen once; frames after this just overwrite each other.
    print!("\x1B[2J");
    runner.run(&mut terminal)
}

/// Processes the command-line arguments and changes the necessary fields of
/// the given options.
fn process_opts(
    opts: &mut Options,
    run_opts: &mut RunOptions,
    matches: &ArgMatches,
) -> Result<(), Error> {
    if let Some(freq) = matches.value_of("frequency") {
        opts.timer_freq = freq.parse::<u32>().context("invalid frequency argument")?;
    }
    if let Some(speed) = matches.value_of("speed") {
        run_opts.cycle_freq = speed.parse::<u32>().context("invalid speed argument")?;
    }
    if let Some(cycles) = matches.value_of("cycles") {
        run_opts.cycle_limit = Some(cycles.parse::<u64>().context("invalid cycles argument")?);
    }

    Ok(())
}
