use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use console::style;

const QUIET: u8 = 0;
const NORMAL: u8 = 1;
const VERBOSE: u8 = 2;

static LEVEL: AtomicU8 = AtomicU8::new(NORMAL);

pub fn init(quiet: bool, verbose: u8, no_color: bool) {
    let level = if quiet {
        QUIET
    } else {
        NORMAL.saturating_add(verbose)
    };
    LEVEL.store(level, Ordering::Relaxed);
    if no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }
}

pub fn is_quiet() -> bool {
    LEVEL.load(Ordering::Relaxed) == QUIET
}

pub fn debug(message: &str) {
    if LEVEL.load(Ordering::Relaxed) >= VERBOSE {
        let _ = writeln!(io::stderr(), "{}", style(message).dim());
    }
}

pub fn warn(message: &str) {
    if !is_quiet() {
        let _ = writeln!(io::stderr(), "{}", style(message).yellow());
    }
}

pub fn error(message: &str) {
    let _ = writeln!(io::stderr(), "{}", style(message).red());
}

pub fn success(message: &str) {
    if !is_quiet() {
        let _ = writeln!(io::stderr(), "{} {}", style("wrote").green(), message);
    }
}
