//! Fixed-width diagnostic text for the character display.

use core::fmt::Write as _;

use heapless::String;

use crate::thresholds::RegulatorFamily;

/// Characters per display row.
pub const DISPLAY_COLUMNS: usize = 20;
/// Rows on the panel.
pub const DISPLAY_ROWS: u8 = 4;

pub const TITLE_ROW: u8 = 0;
/// Stage diagnostic kept on screen once the verdict replaces the message row.
pub const DIAGNOSTIC_ROW: u8 = 1;
pub const MESSAGE_ROW: u8 = 2;
pub const INSTRUCTION_ROW: u8 = 3;

pub const TITLE: &str = "BITAXE SELF TESTING";
pub const PASS_MESSAGE: &str = "TESTS PASS!";
pub const FAIL_MESSAGE: &str = "TESTS FAIL!";
pub const LONG_PRESS_INSTRUCTION: &str = "LONG PRESS BOOT";

pub const HASHRATE_FAIL: &str = "HASHRATE:FAIL";
pub const VCORE_FAIL: &str = "VCORE:FAIL";
pub const POWER_FAIL: &str = "POWER:FAIL";
pub const FAN_WARN: &str = "FAN:WARN";
pub const DISPLAY_FAIL: &str = "DISPLAY:FAIL";

/// One display row worth of text.
pub type DisplayText = String<DISPLAY_COLUMNS>;

/// Copies `text` into a [`DisplayText`], dropping whatever does not fit.
pub fn display_text(text: &str) -> DisplayText {
    let mut line = DisplayText::new();
    for ch in text.chars() {
        if line.push(ch).is_err() {
            break;
        }
    }
    line
}

pub fn regulator_failure(family: RegulatorFamily) -> DisplayText {
    let mut line = DisplayText::new();
    // Both part names fit well inside one row.
    let _ = write!(line, "{}:FAIL", family.part());
    line
}

pub fn chip_count_failure(detected: u8) -> DisplayText {
    let mut line = DisplayText::new();
    let _ = write!(line, "ASIC:FAIL {detected} CHIPS");
    line
}
