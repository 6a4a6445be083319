use glam::Vec3;

/// How much one `]` or `[` press changes the spin speed.
pub const SPEED_STEP: f32 = 0.01;

/// Local axis the spin parts rotate around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinAxis {
    X,
    Y,
    Z,
}

impl SpinAxis {
    /// Cycle X -> Y -> Z -> X.
    pub fn next(self) -> Self {
        match self {
            SpinAxis::X => SpinAxis::Y,
            SpinAxis::Y => SpinAxis::Z,
            SpinAxis::Z => SpinAxis::X,
        }
    }

    pub fn unit(self) -> Vec3 {
        match self {
            SpinAxis::X => Vec3::X,
            SpinAxis::Y => Vec3::Y,
            SpinAxis::Z => Vec3::Z,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpinAxis::X => "X",
            SpinAxis::Y => "Y",
            SpinAxis::Z => "Z",
        }
    }
}

/// Spin axis + speed in radians per frame. Speed 0 stops the parts.
#[derive(Debug, Clone, Copy)]
pub struct SpinSettings {
    pub axis: SpinAxis,
    pub speed: f32,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            axis: SpinAxis::X,
            speed: 0.0,
        }
    }
}

impl SpinSettings {
    pub fn cycle_axis(&mut self) {
        self.axis = self.axis.next();
        log::info!("Spin axis set to {}", self.axis.label());
    }

    pub fn increase_speed(&mut self) {
        self.speed = (self.speed + SPEED_STEP).min(1.0);
        log::info!("Spin speed: {:.3}", self.speed);
    }

    pub fn decrease_speed(&mut self) {
        self.speed = (self.speed - SPEED_STEP).max(0.0);
        log::info!("Spin speed: {:.3}", self.speed);
    }
}

/// Load-time predicate over node names. Matches "fan" and "propeller" as
/// case-insensitive substrings.
pub fn is_spin_part(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("fan") || lower.contains("propeller")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cycle_has_length_three() {
        let mut settings = SpinSettings::default();
        let start = settings.axis;
        settings.cycle_axis();
        assert_ne!(settings.axis, start);
        settings.cycle_axis();
        assert_ne!(settings.axis, start);
        settings.cycle_axis();
        assert_eq!(settings.axis, start);
    }

    #[test]
    fn speed_saturates_at_one() {
        let mut settings = SpinSettings::default();
        for _ in 0..200 {
            settings.increase_speed();
        }
        assert_eq!(settings.speed, 1.0);
    }

    #[test]
    fn speed_never_goes_negative() {
        let mut settings = SpinSettings::default();
        settings.decrease_speed();
        assert_eq!(settings.speed, 0.0);
        settings.increase_speed();
        settings.decrease_speed();
        settings.decrease_speed();
        assert_eq!(settings.speed, 0.0);
    }

    #[test]
    fn name_predicate_is_case_insensitive_substring() {
        assert!(is_spin_part("LeftFanBlade"));
        assert!(is_spin_part("Propeller_01"));
        assert!(is_spin_part("CEILING_FAN"));
        assert!(!is_spin_part("Body"));
        assert!(!is_spin_part(""));
    }
}
