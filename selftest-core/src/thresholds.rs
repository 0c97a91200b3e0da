//! Acceptance ranges for each device variant and board revision.
//!
//! All the per-variant branching of the self-test lives here. The
//! orchestrator calls [`thresholds_for`] once per run and then only asks the
//! resulting [`ThresholdSet`] whether a reading is acceptable.

use crate::profile::{DeviceProfile, DeviceVariant};

/// Fan tachometer reading must exceed this value.
pub const FAN_RPM_MIN: u16 = 1_000;
/// Core voltage must be strictly above this value (mV).
pub const CORE_VOLTAGE_MIN_MV: u16 = 1_000;
/// Core voltage must be strictly below this value (mV).
pub const CORE_VOLTAGE_MAX_MV: u16 = 1_300;

/// First board revision fitted with the digital power stage.
pub const DIGITAL_REGULATOR_FIRST_REVISION: u16 = 402;
/// Last board revision fitted with the digital power stage.
pub const DIGITAL_REGULATOR_LAST_REVISION: u16 = 499;

/// Expected draw for boards with the DAC-controlled regulator (W).
pub const POWER_TARGET_DAC: f32 = 12.0;
/// Expected draw for Max/Ultra/Supra boards with the digital power stage (W).
pub const POWER_TARGET_DIGITAL: f32 = 5.0;
/// Expected draw for Gamma boards (W).
pub const POWER_TARGET_GAMMA: f32 = 11.0;
/// Allowed deviation either side of the power target (W).
pub const POWER_MARGIN: f32 = 3.0;

/// Minimum benchmark result for Supra boards (GH/s).
pub const HASHRATE_MIN_SUPRA: f64 = 500.0;
/// Minimum benchmark result for Gamma boards (GH/s).
pub const HASHRATE_MIN_GAMMA: f64 = 900.0;

/// Physical core-voltage regulator fitted to the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegulatorFamily {
    /// PMBus power stage (TPS546).
    DigitalPowerStage,
    /// Fixed regulator trimmed by a current DAC (DS4432U).
    DacControlled,
}

impl RegulatorFamily {
    /// Part name shown in diagnostics.
    pub const fn part(self) -> &'static str {
        match self {
            RegulatorFamily::DigitalPowerStage => "TPS546",
            RegulatorFamily::DacControlled => "DS4432U",
        }
    }

    /// Where the power reading for this family comes from.
    pub const fn power_source(self) -> PowerSource {
        match self {
            RegulatorFamily::DigitalPowerStage => PowerSource::RegulatorTelemetry,
            RegulatorFamily::DacControlled => PowerSource::PowerMonitor,
        }
    }
}

/// Subsystem that supplies the power-draw measurement.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerSource {
    /// Output voltage times output current reported by the power stage.
    RegulatorTelemetry,
    /// Dedicated power monitor IC (INA260).
    PowerMonitor,
}

/// Accepted power-draw window.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PowerWindow {
    pub target_watts: f32,
    pub margin_watts: f32,
    pub source: PowerSource,
}

impl PowerWindow {
    pub const fn new(target_watts: f32, margin_watts: f32, source: PowerSource) -> Self {
        Self {
            target_watts,
            margin_watts,
            source,
        }
    }

    /// Returns `true` when `watts` lies strictly inside `target ± margin`.
    pub fn contains(&self, watts: f32) -> bool {
        watts > self.target_watts - self.margin_watts && watts < self.target_watts + self.margin_watts
    }
}

/// Acceptance ranges for one run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ThresholdSet {
    pub fan_rpm_min: u16,
    pub core_voltage_min_mv: u16,
    pub core_voltage_max_mv: u16,
    /// `None` when the board has no regulator check (unrecognised combination).
    pub regulator: Option<RegulatorFamily>,
    /// `None` when no power check applies.
    pub power: Option<PowerWindow>,
    /// `None` when the benchmark result is reported but not judged.
    pub hashrate_min_ghs: Option<f64>,
}

impl ThresholdSet {
    pub fn fan_ok(&self, rpm: u16) -> bool {
        rpm > self.fan_rpm_min
    }

    pub fn core_voltage_ok(&self, millivolts: u16) -> bool {
        millivolts > self.core_voltage_min_mv && millivolts < self.core_voltage_max_mv
    }

    pub fn power_ok(&self, watts: f32) -> bool {
        self.power.is_none_or(|window| window.contains(watts))
    }

    pub fn hashrate_ok(&self, ghs: f64) -> bool {
        self.hashrate_min_ghs.is_none_or(|min| ghs >= min)
    }
}

/// Regulator family fitted to `profile`, if the combination is recognised.
pub const fn regulator_family(profile: &DeviceProfile) -> Option<RegulatorFamily> {
    match profile.variant {
        DeviceVariant::Max | DeviceVariant::Ultra | DeviceVariant::Supra => {
            let revision = profile.board_revision;
            if revision >= DIGITAL_REGULATOR_FIRST_REVISION
                && revision <= DIGITAL_REGULATOR_LAST_REVISION
            {
                Some(RegulatorFamily::DigitalPowerStage)
            } else {
                Some(RegulatorFamily::DacControlled)
            }
        }
        DeviceVariant::Gamma => Some(RegulatorFamily::DigitalPowerStage),
        DeviceVariant::Unknown => None,
    }
}

/// Returns `true` when power is read from a dedicated monitor IC.
pub const fn uses_power_monitor(profile: &DeviceProfile) -> bool {
    matches!(
        regulator_family(profile),
        Some(RegulatorFamily::DacControlled)
    )
}

/// Computes the acceptance ranges for `profile`.
pub fn thresholds_for(profile: &DeviceProfile) -> ThresholdSet {
    let regulator = regulator_family(profile);

    let power = match (profile.variant, regulator) {
        (DeviceVariant::Gamma, Some(family)) => Some(PowerWindow::new(
            POWER_TARGET_GAMMA,
            POWER_MARGIN,
            family.power_source(),
        )),
        (_, Some(RegulatorFamily::DigitalPowerStage)) => Some(PowerWindow::new(
            POWER_TARGET_DIGITAL,
            POWER_MARGIN,
            PowerSource::RegulatorTelemetry,
        )),
        (_, Some(RegulatorFamily::DacControlled)) => Some(PowerWindow::new(
            POWER_TARGET_DAC,
            POWER_MARGIN,
            PowerSource::PowerMonitor,
        )),
        (_, None) => None,
    };

    let hashrate_min_ghs = match profile.variant {
        DeviceVariant::Supra => Some(HASHRATE_MIN_SUPRA),
        DeviceVariant::Gamma => Some(HASHRATE_MIN_GAMMA),
        DeviceVariant::Max | DeviceVariant::Ultra | DeviceVariant::Unknown => None,
    };

    ThresholdSet {
        fan_rpm_min: FAN_RPM_MIN,
        core_voltage_min_mv: CORE_VOLTAGE_MIN_MV,
        core_voltage_max_mv: CORE_VOLTAGE_MAX_MV,
        regulator,
        power,
        hashrate_min_ghs,
    }
}
