//! Persisted settings consumed by the self-test.

use core::{fmt, time::Duration};

use crate::benchmark::BenchmarkConfig;
use crate::profile::{AsicModel, DeviceProfile};

/// Pause after switching the ASIC link to its negotiated baud rate.
pub const DEFAULT_BAUD_SETTLE: Duration = Duration::from_millis(10);
/// Pause before the first job is sent to the ASIC.
pub const DEFAULT_ASIC_SETTLE: Duration = Duration::from_secs(1);

/// Persisted keys the self-test reads or writes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigKey {
    /// Non-zero when the next boot should run the self-test.
    SelfTest,
    /// Best share difficulty ever found; non-zero means the unit has mined.
    BestDifficulty,
    /// Target core voltage in millivolts.
    AsicVoltage,
    /// Hashing frequency in MHz.
    AsicFrequency,
    InvertFanPolarity,
}

impl ConfigKey {
    pub const COUNT: usize = 5;

    pub const fn index(self) -> usize {
        match self {
            ConfigKey::SelfTest => 0,
            ConfigKey::BestDifficulty => 1,
            ConfigKey::AsicVoltage => 2,
            ConfigKey::AsicFrequency => 3,
            ConfigKey::InvertFanPolarity => 4,
        }
    }

    /// Storage name of the key.
    pub const fn name(self) -> &'static str {
        match self {
            ConfigKey::SelfTest => "selftest",
            ConfigKey::BestDifficulty => "bestdiff",
            ConfigKey::AsicVoltage => "asicvoltage",
            ConfigKey::AsicFrequency => "asicfrequency",
            ConfigKey::InvertFanPolarity => "invertfanpol",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key/value store backed by non-volatile memory.
///
/// Reads never fail: a missing or unreadable key yields `default`.
pub trait ConfigStore {
    fn get_u16(&self, key: ConfigKey, default: u16) -> u16;

    fn get_u64(&self, key: ConfigKey, default: u64) -> u64;

    fn set_u16(&mut self, key: ConfigKey, value: u16);
}

/// Volatile store used by the emulator and tests.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MemoryConfigStore {
    values: [Option<u64>; ConfigKey::COUNT],
}

impl MemoryConfigStore {
    pub const fn new() -> Self {
        Self {
            values: [None; ConfigKey::COUNT],
        }
    }

    /// Builder-style setter for seeding a store.
    #[must_use]
    pub const fn with(mut self, key: ConfigKey, value: u64) -> Self {
        self.values[key.index()] = Some(value);
        self
    }

    pub fn get(&self, key: ConfigKey) -> Option<u64> {
        self.values[key.index()]
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_u16(&self, key: ConfigKey, default: u16) -> u16 {
        self.get(key)
            .and_then(|value| u16::try_from(value).ok())
            .unwrap_or(default)
    }

    fn get_u64(&self, key: ConfigKey, default: u64) -> u64 {
        self.get(key).unwrap_or(default)
    }

    fn set_u16(&mut self, key: ConfigKey, value: u16) {
        self.values[key.index()] = Some(u64::from(value));
    }
}

/// Tunables for one self-test run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SelfTestSettings {
    pub core_voltage_mv: u16,
    pub asic_frequency_mhz: u16,
    pub invert_fan_polarity: bool,
    pub benchmark: BenchmarkConfig,
    pub baud_settle: Duration,
    pub asic_settle: Duration,
}

impl SelfTestSettings {
    /// Factory settings for `model`.
    pub fn for_asic(model: AsicModel) -> Self {
        Self {
            core_voltage_mv: model.default_core_voltage_mv(),
            asic_frequency_mhz: model.default_frequency_mhz(),
            invert_fan_polarity: true,
            benchmark: BenchmarkConfig::default(),
            baud_settle: DEFAULT_BAUD_SETTLE,
            asic_settle: DEFAULT_ASIC_SETTLE,
        }
    }

    /// Reads the persisted overrides, falling back to the factory settings.
    pub fn load<S: ConfigStore + ?Sized>(store: &S, profile: &DeviceProfile) -> Self {
        let defaults = Self::for_asic(profile.asic_model);
        Self {
            core_voltage_mv: store.get_u16(ConfigKey::AsicVoltage, defaults.core_voltage_mv),
            asic_frequency_mhz: store.get_u16(ConfigKey::AsicFrequency, defaults.asic_frequency_mhz),
            invert_fan_polarity: store.get_u16(
                ConfigKey::InvertFanPolarity,
                u16::from(defaults.invert_fan_polarity),
            ) != 0,
            ..defaults
        }
    }
}

impl Default for SelfTestSettings {
    fn default() -> Self {
        Self::for_asic(AsicModel::Bm1366)
    }
}

/// Decides at boot whether the self-test should run instead of normal mining.
///
/// Units that have already found a share, and BM1397 boards, never self-test.
pub fn should_run_self_test<S: ConfigStore + ?Sized>(profile: &DeviceProfile, store: &S) -> bool {
    let requested = store.get_u16(ConfigKey::SelfTest, 0) == 1;
    let has_mined = store.get_u64(ConfigKey::BestDifficulty, 0) >= 1;
    requested && profile.asic_model != AsicModel::Bm1397 && !has_mined
}
