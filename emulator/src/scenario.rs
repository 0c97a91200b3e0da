//! Command-line description of the simulated board.

use std::env;

use selftest_core::profile::{DeviceProfile, DeviceVariant};
use selftest_core::thresholds::thresholds_for;

pub const USAGE: &str = "Usage: selftest-emulator [--variant <max|ultra|supra|gamma>] [--revision <n>] \
[--chips <n>] [--vcore <mV>] [--power <W>] [--fan <rpm>] [--nonce-rate <per-second>] \
[--no-display] [--display-fault]";

const DEFAULT_REVISION: u16 = 601;
const DEFAULT_CORE_VOLTAGE_MV: u16 = 1_150;
const DEFAULT_FAN_RPM: u16 = 4_200;
/// Results per second; enough for every variant's minimum at mask 8.
const DEFAULT_NONCE_RATE: f64 = 40.0;

/// Readings and faults injected into the simulated hardware.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    pub profile: DeviceProfile,
    pub chips: u8,
    pub core_voltage_mv: u16,
    pub power_watts: f32,
    pub fan_rpm: u16,
    pub nonce_rate: f64,
    pub display: bool,
    pub display_fault: bool,
}

impl Scenario {
    /// Healthy readings for `profile`.
    pub fn healthy(profile: DeviceProfile) -> Self {
        let power_watts = thresholds_for(&profile)
            .power
            .map_or(0.0, |window| window.target_watts);
        Self {
            profile,
            chips: profile.expected_chip_count,
            core_voltage_mv: DEFAULT_CORE_VOLTAGE_MV,
            power_watts,
            fan_rpm: DEFAULT_FAN_RPM,
            nonce_rate: DEFAULT_NONCE_RATE,
            display: true,
            display_fault: false,
        }
    }

    pub fn from_env() -> Result<Self, String> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut args = args.into_iter();
        let mut variant = DeviceVariant::Gamma;
        let mut revision = DEFAULT_REVISION;
        let mut overrides = Overrides::default();

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };

            match flag.as_str() {
                "--no-display" => overrides.display = Some(false),
                "--display-fault" => overrides.display_fault = true,
                "--variant" => {
                    let value = take_value(&flag, inline, &mut args)?;
                    variant = DeviceVariant::from_tag(&value)
                        .ok_or_else(|| format!("Unknown device variant `{value}`"))?;
                }
                "--revision" => revision = parse_number(&flag, inline, &mut args)?,
                "--chips" => overrides.chips = Some(parse_number(&flag, inline, &mut args)?),
                "--vcore" => overrides.vcore = Some(parse_number(&flag, inline, &mut args)?),
                "--power" => overrides.power = Some(parse_number(&flag, inline, &mut args)?),
                "--fan" => overrides.fan = Some(parse_number(&flag, inline, &mut args)?),
                "--nonce-rate" => {
                    overrides.nonce_rate = Some(parse_number(&flag, inline, &mut args)?);
                }
                other => return Err(format!("Unknown argument `{other}`")),
            }
        }

        let profile = DeviceProfile::single_chip(variant, revision)
            .ok_or_else(|| format!("No production profile for `{variant}`"))?;
        Ok(overrides.apply(Self::healthy(profile)))
    }
}

#[derive(Default)]
struct Overrides {
    chips: Option<u8>,
    vcore: Option<u16>,
    power: Option<f32>,
    fan: Option<u16>,
    nonce_rate: Option<f64>,
    display: Option<bool>,
    display_fault: bool,
}

impl Overrides {
    fn apply(self, mut scenario: Scenario) -> Scenario {
        scenario.chips = self.chips.unwrap_or(scenario.chips);
        scenario.core_voltage_mv = self.vcore.unwrap_or(scenario.core_voltage_mv);
        scenario.power_watts = self.power.unwrap_or(scenario.power_watts);
        scenario.fan_rpm = self.fan.unwrap_or(scenario.fan_rpm);
        scenario.nonce_rate = self.nonce_rate.unwrap_or(scenario.nonce_rate).max(0.0);
        scenario.display = self.display.unwrap_or(scenario.display);
        scenario.display_fault = self.display_fault;
        scenario
    }
}

fn take_value(
    flag: &str,
    inline: Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<String, String> {
    inline
        .or_else(|| args.next())
        .ok_or_else(|| format!("Expected value after {flag}"))
}

fn parse_number<T: std::str::FromStr>(
    flag: &str,
    inline: Option<String>,
    args: &mut impl Iterator<Item = String>,
) -> Result<T, String> {
    let value = take_value(flag, inline, args)?;
    value
        .parse()
        .map_err(|_| format!("Invalid value `{value}` for {flag}"))
}
