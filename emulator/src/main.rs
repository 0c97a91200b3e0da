mod bench;
mod console;
mod grammar;
mod scenario;
mod terminal;
mod timer;

use std::io::{self, BufRead, Write};
use std::process;
use std::thread;

use crossterm::style::Stylize;
use selftest_core::config::{ConfigKey, MemoryConfigStore, SelfTestSettings, should_run_self_test};
use selftest_core::orchestrator::{Verdict, run_self_test};
use selftest_core::watchdog::{ButtonLevel, PressTransition};

use bench::{HostClock, SimulatedBench};
use console::{ConsoleDisplay, ConsoleTelemetry};
use grammar::{ConsoleCommand, HELP_TOPICS};
use scenario::{Scenario, USAGE};
use terminal::TerminalState;
use timer::WATCHDOG;

fn main() -> io::Result<()> {
    let scenario = Scenario::from_env().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let profile = scenario.profile;
    let config = MemoryConfigStore::new().with(ConfigKey::SelfTest, 1);

    if !should_run_self_test(&profile, &config) {
        writeln!(
            writer,
            "Self-test is not available on {} ({}); booting normally.",
            profile.variant, profile.asic_model
        )?;
        return Ok(());
    }

    writeln!(
        writer,
        "Self-test emulator: {} rev {} with {} chip(s) expected.",
        profile.variant, profile.board_revision, profile.expected_chip_count
    )?;
    drop(writer);

    let clock = HostClock::new();
    let settings = SelfTestSettings::load(&config, &profile);
    let mut telemetry = ConsoleTelemetry::new();
    let (verdict, display) = run_self_test(
        &profile,
        settings,
        SimulatedBench::new(&scenario),
        ConsoleDisplay::new(scenario.display, scenario.display_fault),
        clock,
        &mut telemetry,
    );

    let mut writer = stdout.lock();
    writeln!(writer, "{}", summary(&verdict))?;
    writeln!(
        writer,
        "{} events recorded. Type `help` for commands; a long press acknowledges the verdict.",
        telemetry.events()
    )?;
    drop(writer);

    let status_line = summary(&verdict);
    terminal::spawn(TerminalState {
        verdict,
        display,
        config,
        telemetry,
        clock,
    });

    prompt(&status_line)
}

fn summary(verdict: &Verdict) -> String {
    if verdict.passed {
        format!("Verdict: {}", "PASS".green().bold())
    } else {
        let stage = verdict
            .failing_stage
            .map_or_else(|| "unknown stage".to_string(), |stage| stage.to_string());
        format!(
            "Verdict: {} at {stage} ({})",
            "FAIL".red().bold(),
            verdict.message.as_str()
        )
    }
}

fn prompt(status_line: &str) -> io::Result<()> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut line = String::new();

    loop {
        line.clear();
        {
            let mut writer = stdout.lock();
            write!(writer, "> ")?;
            writer.flush()?;
        }

        if reader.read_line(&mut line)? == 0 {
            println!();
            return Ok(());
        }
        if line.trim().is_empty() {
            continue;
        }

        let mut writer = stdout.lock();
        match grammar::parse(&line) {
            Ok(ConsoleCommand::Exit) => {
                writeln!(writer, "Session closed.")?;
                return Ok(());
            }
            Ok(ConsoleCommand::Help) => {
                for (usage, about) in HELP_TOPICS {
                    writeln!(writer, "  {usage:<18} {about}")?;
                }
            }
            Ok(ConsoleCommand::Status) => {
                writeln!(writer, "{status_line}")?;
                writeln!(
                    writer,
                    "button: {:?}, long press pending: {}",
                    WATCHDOG.state(),
                    WATCHDOG.long_press_pending()
                )?;
            }
            Ok(ConsoleCommand::Press) => report(&mut writer, WATCHDOG.on_edge(ButtonLevel::Pressed))?,
            Ok(ConsoleCommand::Release) => {
                report(&mut writer, WATCHDOG.on_edge(ButtonLevel::Released))?;
            }
            Ok(ConsoleCommand::Hold(duration)) => {
                report(&mut writer, WATCHDOG.on_edge(ButtonLevel::Pressed))?;
                drop(writer);
                thread::sleep(duration);
                writer = stdout.lock();
                report(&mut writer, WATCHDOG.on_edge(ButtonLevel::Released))?;
            }
            Err(err) => writeln!(writer, "{}", format!("error: {err}").red())?,
        }
    }
}

fn report(writer: &mut impl Write, transition: PressTransition) -> io::Result<()> {
    writeln!(writer, "button: {transition:?}")
}
