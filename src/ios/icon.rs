//! Material Design icon selection for battery sensors.

use super::device::{Battery, BatteryState};

pub const DEFAULT_ICON_LEVEL: &str = "mdi:battery";
pub const DEFAULT_ICON_STATE: &str = "mdi:power-plug";

/// Icon for a battery at `battery_level` percent.
///
/// `None` means the level is not known.
pub fn icon_for_battery_level(battery_level: Option<i32>, charging: bool) -> String {
    let Some(level) = battery_level else {
        return format!("{DEFAULT_ICON_LEVEL}-unknown");
    };

    if charging && level > 10 {
        format!("{DEFAULT_ICON_LEVEL}-charging-{}", round_down_to_step(level, 20))
    } else if charging {
        format!("{DEFAULT_ICON_LEVEL}-outline")
    } else if level <= 5 {
        format!("{DEFAULT_ICON_LEVEL}-alert")
    } else if level < 95 {
        format!("{DEFAULT_ICON_LEVEL}-{}", round_down_to_step(level, 10))
    } else {
        DEFAULT_ICON_LEVEL.to_string()
    }
}

/// `round(level / step - 0.01) * step`; the offset keeps exact halves from
/// rounding up to the next icon.
fn round_down_to_step(level: i32, step: i32) -> i32 {
    ((level as f64 / step as f64 - 0.01).round() as i32) * step
}

/// Icon inputs derived from a battery sub-record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryIcons {
    /// Icon for the textual state sensor.
    pub state_icon: String,
    /// Level to show; `None` when the state is unknown.
    pub level: Option<i32>,
    pub charging: bool,
}

impl BatteryIcons {
    pub fn for_battery(battery: &Battery) -> Self {
        match battery.state {
            BatteryState::Full | BatteryState::Unplugged => Self {
                state_icon: format!("{DEFAULT_ICON_STATE}-off"),
                level: Some(battery.level),
                charging: false,
            },
            BatteryState::Unknown => Self {
                state_icon: format!("{DEFAULT_ICON_LEVEL}-unknown"),
                level: None,
                charging: false,
            },
            // Charging and anything unrecognised
            BatteryState::Charging | BatteryState::Other(_) => Self {
                state_icon: DEFAULT_ICON_STATE.to_string(),
                level: Some(battery.level),
                charging: true,
            },
        }
    }

    /// Icon for the level sensor.
    pub fn level_icon(&self) -> String {
        icon_for_battery_level(self.level, self.charging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn battery(level: i32, state: BatteryState) -> Battery {
        Battery { level, state }
    }

    #[test]
    fn test_level_icon_thresholds() {
        assert_eq!(icon_for_battery_level(None, false), "mdi:battery-unknown");
        assert_eq!(icon_for_battery_level(None, true), "mdi:battery-unknown");
        assert_eq!(icon_for_battery_level(Some(5), false), "mdi:battery-alert");
        assert_eq!(icon_for_battery_level(Some(0), false), "mdi:battery-alert");
        assert_eq!(icon_for_battery_level(Some(6), false), "mdi:battery-10");
        assert_eq!(icon_for_battery_level(Some(15), false), "mdi:battery-10");
        assert_eq!(icon_for_battery_level(Some(16), false), "mdi:battery-20");
        assert_eq!(icon_for_battery_level(Some(94), false), "mdi:battery-90");
        assert_eq!(icon_for_battery_level(Some(95), false), "mdi:battery");
        assert_eq!(icon_for_battery_level(Some(100), false), "mdi:battery");
    }

    #[test]
    fn test_charging_level_icons() {
        assert_eq!(icon_for_battery_level(Some(10), true), "mdi:battery-outline");
        assert_eq!(icon_for_battery_level(Some(11), true), "mdi:battery-charging-20");
        assert_eq!(icon_for_battery_level(Some(30), true), "mdi:battery-charging-20");
        assert_eq!(icon_for_battery_level(Some(31), true), "mdi:battery-charging-40");
        assert_eq!(icon_for_battery_level(Some(50), true), "mdi:battery-charging-40");
        assert_eq!(icon_for_battery_level(Some(100), true), "mdi:battery-charging-100");
    }

    #[test]
    fn test_full_battery_is_not_charging() {
        let icons = BatteryIcons::for_battery(&battery(100, BatteryState::Full));
        assert_eq!(icons.state_icon, "mdi:power-plug-off");
        assert!(!icons.charging);
        assert_eq!(icons.level_icon(), "mdi:battery");
    }

    #[test]
    fn test_unplugged_battery() {
        let icons = BatteryIcons::for_battery(&battery(42, BatteryState::Unplugged));
        assert_eq!(icons.state_icon, "mdi:power-plug-off");
        assert_eq!(icons.level_icon(), "mdi:battery-40");
    }

    #[test]
    fn test_unknown_state_ignores_level() {
        for level in [0, 50, 100] {
            let icons = BatteryIcons::for_battery(&battery(level, BatteryState::Unknown));
            assert_eq!(icons.state_icon, "mdi:battery-unknown");
            assert_eq!(icons.level, None);
            assert_eq!(icons.level_icon(), "mdi:battery-unknown");
        }
    }

    #[test]
    fn test_charging_and_unrecognised_states_take_charging_path() {
        let charging = BatteryIcons::for_battery(&battery(64, BatteryState::Charging));
        assert_eq!(charging.state_icon, "mdi:power-plug");
        assert_eq!(charging.level_icon(), "mdi:battery-charging-60");

        let other = BatteryIcons::for_battery(&battery(64, BatteryState::Other("Bogus".into())));
        assert_eq!(other, charging);
    }
}
