//! Terminal renditions of the display, telemetry and restart.

use std::process;

use crossterm::style::Stylize;
use selftest_core::display::{DISPLAY_ROWS, DisplayText, display_text};
use selftest_core::hw::{DisplaySink, Restart};
use selftest_core::telemetry::{SelfTestEvent, TelemetrySink};

#[allow(clippy::cast_lossless)]
const ROWS: usize = DISPLAY_ROWS as usize;

/// Character display mirrored to stdout.
#[derive(Debug)]
pub struct ConsoleDisplay {
    attached: bool,
    faulty: bool,
    ready: bool,
    rows: [DisplayText; ROWS],
}

impl ConsoleDisplay {
    pub fn new(attached: bool, faulty: bool) -> Self {
        Self {
            attached,
            faulty,
            ready: false,
            rows: Default::default(),
        }
    }

    fn row_mut(&mut self, row: u8) -> Option<&mut DisplayText> {
        self.rows.get_mut(usize::from(row))
    }
}

impl DisplaySink for ConsoleDisplay {
    fn is_present(&self) -> bool {
        self.ready
    }

    fn initialize(&mut self) -> bool {
        self.ready = self.attached && !self.faulty;
        self.ready
    }

    fn write_line(&mut self, row: u8, text: &str) {
        if let Some(slot) = self.row_mut(row) {
            *slot = display_text(text);
            println!("{} {}", format!("[lcd {row}]").cyan(), slot.as_str().bold());
        }
    }

    fn clear(&mut self, row: u8) {
        if let Some(slot) = self.row_mut(row) {
            slot.clear();
        }
    }
}

/// Prints every pipeline event with its timestamp.
#[derive(Debug, Default)]
pub struct ConsoleTelemetry {
    events: usize,
}

impl ConsoleTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> usize {
        self.events
    }
}

impl TelemetrySink for ConsoleTelemetry {
    fn record(&mut self, timestamp: std::time::Duration, event: SelfTestEvent) {
        self.events += 1;
        let stamp = format!("{:>9.3}s", timestamp.as_secs_f64()).dark_grey();
        let line = event.to_string();
        match event {
            SelfTestEvent::StageFailed(..) | SelfTestEvent::VerdictReached { passed: false } => {
                println!("{stamp} {}", line.red());
            }
            SelfTestEvent::StagePassed(_) | SelfTestEvent::VerdictReached { passed: true } => {
                println!("{stamp} {}", line.green());
            }
            SelfTestEvent::StageSkipped(_) | SelfTestEvent::NonceReceived { .. } => {
                println!("{stamp} {}", line.dim());
            }
            _ => println!("{stamp} {line}"),
        }
    }
}

/// Ends the emulator process in place of a device reset.
#[derive(Debug, Default)]
pub struct ProcessRestart;

impl Restart for ProcessRestart {
    fn restart(&mut self) -> ! {
        println!("{}", "Restarting into normal operation.".yellow());
        process::exit(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faulty_panel_never_becomes_present() {
        let mut display = ConsoleDisplay::new(true, true);
        assert!(!display.initialize());
        assert!(!display.is_present());

        let mut detached = ConsoleDisplay::new(false, false);
        assert!(!detached.initialize());
    }

    #[test]
    fn rows_are_truncated_to_panel_width() {
        let mut display = ConsoleDisplay::new(true, false);
        assert!(display.initialize());
        display.write_line(2, "ASIC:FAIL 0 CHIPS AND THEN SOME");
        assert_eq!(display.rows[2].as_str(), "ASIC:FAIL 0 CHIPS AN");

        display.clear(2);
        assert!(display.rows[2].is_empty());
        display.write_line(9, "ignored");
    }
}
