//! Device identity and the capability predicates derived from it.
//!
//! A [`DeviceProfile`] is read once at start-up and never changes for the
//! lifetime of the process. Every stage that needs to know "does this board
//! have X" consults [`Capabilities`] instead of re-matching on the variant.

use core::fmt;

/// Product family the board belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeviceVariant {
    Max,
    Ultra,
    Supra,
    Gamma,
    Unknown,
}

impl DeviceVariant {
    /// Parses a variant tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            DeviceVariant::Max,
            DeviceVariant::Ultra,
            DeviceVariant::Supra,
            DeviceVariant::Gamma,
        ]
        .into_iter()
        .find(|variant| variant.label().eq_ignore_ascii_case(tag))
    }

    /// Human readable tag.
    pub const fn label(self) -> &'static str {
        match self {
            DeviceVariant::Max => "max",
            DeviceVariant::Ultra => "ultra",
            DeviceVariant::Supra => "supra",
            DeviceVariant::Gamma => "gamma",
            DeviceVariant::Unknown => "unknown",
        }
    }

    /// ASIC model fitted to production boards of this variant.
    pub const fn default_asic(self) -> Option<AsicModel> {
        match self {
            DeviceVariant::Max => Some(AsicModel::Bm1397),
            DeviceVariant::Ultra => Some(AsicModel::Bm1366),
            DeviceVariant::Supra => Some(AsicModel::Bm1368),
            DeviceVariant::Gamma => Some(AsicModel::Bm1370),
            DeviceVariant::Unknown => None,
        }
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hashing ASIC fitted to the board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AsicModel {
    Bm1397,
    Bm1366,
    Bm1368,
    Bm1370,
}

impl AsicModel {
    pub const fn label(self) -> &'static str {
        match self {
            AsicModel::Bm1397 => "BM1397",
            AsicModel::Bm1366 => "BM1366",
            AsicModel::Bm1368 => "BM1368",
            AsicModel::Bm1370 => "BM1370",
        }
    }

    /// Factory default core voltage in millivolts.
    pub const fn default_core_voltage_mv(self) -> u16 {
        match self {
            AsicModel::Bm1397 => 1_400,
            AsicModel::Bm1366 => 1_200,
            AsicModel::Bm1368 => 1_166,
            AsicModel::Bm1370 => 1_150,
        }
    }

    /// Factory default hashing frequency in MHz.
    pub const fn default_frequency_mhz(self) -> u16 {
        match self {
            AsicModel::Bm1397 => 425,
            AsicModel::Bm1366 => 485,
            AsicModel::Bm1368 => 490,
            AsicModel::Bm1370 => 525,
        }
    }
}

impl fmt::Display for AsicModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Immutable identity of the unit under test.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DeviceProfile {
    pub variant: DeviceVariant,
    pub board_revision: u16,
    pub asic_model: AsicModel,
    pub expected_chip_count: u8,
}

impl DeviceProfile {
    pub const fn new(
        variant: DeviceVariant,
        board_revision: u16,
        asic_model: AsicModel,
        expected_chip_count: u8,
    ) -> Self {
        Self {
            variant,
            board_revision,
            asic_model,
            expected_chip_count,
        }
    }

    /// Builds a single-chip profile using the variant's production ASIC.
    ///
    /// Returns `None` for [`DeviceVariant::Unknown`], which has no default ASIC.
    pub const fn single_chip(variant: DeviceVariant, board_revision: u16) -> Option<Self> {
        match variant.default_asic() {
            Some(model) => Some(Self::new(variant, board_revision, model, 1)),
            None => None,
        }
    }

    /// Capability predicates for this board.
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities::for_profile(self)
    }
}

/// Optional peripherals present on a given board.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Capabilities {
    pub has_display: bool,
    pub has_fan_controller: bool,
    /// Dedicated power monitor IC; boards without one report power through the regulator.
    pub has_power_monitor: bool,
    /// Fan controller needs the Gamma temperature-diode tuning.
    pub thermal_tuning: bool,
    /// ASIC power must be switched on through the enable line.
    pub asic_power_switch: bool,
}

impl Capabilities {
    /// Capability set of a board we do not recognise.
    pub const NONE: Self = Self {
        has_display: false,
        has_fan_controller: false,
        has_power_monitor: false,
        thermal_tuning: false,
        asic_power_switch: false,
    };

    const fn for_profile(profile: &DeviceProfile) -> Self {
        let known = !matches!(profile.variant, DeviceVariant::Unknown);
        if !known {
            return Self::NONE;
        }

        Self {
            has_display: true,
            has_fan_controller: true,
            has_power_monitor: crate::thresholds::uses_power_monitor(profile),
            thermal_tuning: matches!(profile.variant, DeviceVariant::Gamma),
            asic_power_switch: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_tags_parse_case_insensitively() {
        assert_eq!(DeviceVariant::from_tag("GAMMA"), Some(DeviceVariant::Gamma));
        assert_eq!(DeviceVariant::from_tag("supra"), Some(DeviceVariant::Supra));
        assert_eq!(DeviceVariant::from_tag("unknown"), None);
        assert_eq!(DeviceVariant::from_tag("hex"), None);
    }

    #[test]
    fn unknown_variant_has_no_capabilities() {
        let profile = DeviceProfile::new(DeviceVariant::Unknown, 0, AsicModel::Bm1366, 1);
        assert_eq!(profile.capabilities(), Capabilities::NONE);
        assert!(DeviceProfile::single_chip(DeviceVariant::Unknown, 0).is_none());
    }

    #[test]
    fn power_monitor_follows_regulator_family() {
        let legacy = DeviceProfile::single_chip(DeviceVariant::Ultra, 204).unwrap();
        let digital = DeviceProfile::single_chip(DeviceVariant::Ultra, 450).unwrap();
        let gamma = DeviceProfile::single_chip(DeviceVariant::Gamma, 601).unwrap();

        assert!(legacy.capabilities().has_power_monitor);
        assert!(!digital.capabilities().has_power_monitor);
        assert!(!gamma.capabilities().has_power_monitor);
        assert!(gamma.capabilities().thermal_tuning);
    }
}
