//! Host-supplied control descriptors and the step<->value conversion per
//! control kind. A `Control` is owned by exactly one binding slot; moving
//! one in displaces (and returns) the previous occupant.

use heapless::{String, Vec};
// F32Ext backs the no_std float math; the host-test build resolves the
// same calls through std and reports the import unused.
#[cfg_attr(test, allow(unused_imports))]
use micromath::F32Ext;

pub const MAX_SCALE_POINTS: usize = 12;
pub const LABEL_SIZE: usize = 16;
pub const UNIT_SIZE: usize = 8;

/// Control kind bitset, mirrored from the host's `control_add` payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Properties(pub u16);

impl Properties {
    pub const NONE: Properties = Properties(0);
    pub const BYPASS: Properties = Properties(0x001);
    pub const TAP_TEMPO: Properties = Properties(0x002);
    pub const ENUMERATION: Properties = Properties(0x004);
    pub const SCALE_POINTS: Properties = Properties(0x008);
    pub const TRIGGER: Properties = Properties(0x010);
    pub const TOGGLED: Properties = Properties(0x020);
    pub const LOGARITHMIC: Properties = Properties(0x040);
    pub const INTEGER: Properties = Properties(0x080);
    pub const REVERSE: Properties = Properties(0x100);
    pub const MOMENTARY: Properties = Properties(0x200);

    /// Any of the list-like kinds that index into scale points.
    pub const ANY_ENUMERATED: Properties =
        Properties(Self::REVERSE.0 | Self::ENUMERATION.0 | Self::SCALE_POINTS.0);

    pub fn intersects(self, other: Properties) -> bool {
        self.0 & other.0 != 0
    }
}

/// Window hints attached to an enumerated control's scale-point list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScalePointFlags(pub u8);

impl ScalePointFlags {
    pub const PAGINATED: ScalePointFlags = ScalePointFlags(0x01);
    pub const WRAP_AROUND: ScalePointFlags = ScalePointFlags(0x02);
    pub const END_PAGE: ScalePointFlags = ScalePointFlags(0x04);
    pub const ALT_LED_COLOR: ScalePointFlags = ScalePointFlags(0x08);

    pub fn intersects(self, other: ScalePointFlags) -> bool {
        self.0 & other.0 != 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScalePoint {
    pub label: String<LABEL_SIZE>,
    pub value: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlError {
    MissingToken,
    BadToken,
    TooManyScalePoints,
}

#[derive(Clone, Debug)]
pub struct Control {
    pub hw_id: u8,
    pub label: String<LABEL_SIZE>,
    pub properties: Properties,
    pub unit: String<UNIT_SIZE>,
    pub value: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub step: u16,
    pub steps: u16,
    pub scale_points: Vec<ScalePoint, MAX_SCALE_POINTS>,
    /// Index of the current scale point within the host's full list, which
    /// may be longer than the locally-held window.
    pub scale_point_index: u16,
    pub scale_points_flags: ScalePointFlags,
    /// Last actuation direction; 2 means "refreshing, not user-driven".
    pub scroll_dir: u8,
}

impl Control {
    /// Parses the argument tokens of a `control_add` line, laid out as
    /// `hw_id label properties unit value max min steps sp_flags sp_index
    /// sp_count [sp_label sp_value]...`.
    pub fn from_tokens(args: &[&str]) -> Result<Control, ControlError> {
        fn arg<'a>(args: &[&'a str], index: usize) -> Result<&'a str, ControlError> {
            args.get(index).copied().ok_or(ControlError::MissingToken)
        }
        fn int<T: core::str::FromStr>(token: &str) -> Result<T, ControlError> {
            token.parse().map_err(|_| ControlError::BadToken)
        }
        fn float(token: &str) -> Result<f32, ControlError> {
            token.parse().map_err(|_| ControlError::BadToken)
        }
        fn text<const N: usize>(token: &str) -> String<N> {
            // silently truncate over-long labels, same as the display does
            let mut out = String::new();
            for c in token.chars() {
                if out.push(c).is_err() {
                    break;
                }
            }
            out
        }

        let mut control = Control {
            hw_id: int(arg(args, 0)?)?,
            label: text(arg(args, 1)?),
            properties: Properties(int(arg(args, 2)?)?),
            unit: text(arg(args, 3)?),
            value: float(arg(args, 4)?)?,
            maximum: float(arg(args, 5)?)?,
            minimum: float(arg(args, 6)?)?,
            steps: int(arg(args, 7)?)?,
            step: 0,
            scale_points: Vec::new(),
            scale_point_index: int(arg(args, 9)?)?,
            scale_points_flags: ScalePointFlags(int(arg(args, 8)?)?),
            scroll_dir: 0,
        };

        let scale_point_count: usize = int(arg(args, 10)?)?;
        for pair in 0..scale_point_count {
            let point = ScalePoint {
                label: text(arg(args, 11 + pair * 2)?),
                value: float(arg(args, 12 + pair * 2)?)?,
            };
            control
                .scale_points
                .push(point)
                .map_err(|_| ControlError::TooManyScalePoints)?;
        }

        Ok(control)
    }

    pub fn is(&self, properties: Properties) -> bool {
        self.properties.intersects(properties)
    }

    pub fn is_enumerated(&self) -> bool {
        self.properties.intersects(Properties::ANY_ENUMERATED)
    }

    /// Computes the discretized step from the continuous value, fixing up
    /// `steps` for the kinds that imply their own step count. Ran when a
    /// control is first installed into a slot.
    pub fn update_step_from_value(&mut self) {
        if self.is(Properties::LOGARITHMIC) {
            if self.minimum == 0.0 {
                self.minimum = f32::MIN_POSITIVE;
            }
            if self.maximum == 0.0 {
                self.maximum = f32::MIN_POSITIVE;
            }
            if self.value == 0.0 {
                self.value = f32::MIN_POSITIVE;
            }
            self.step = ((self.steps - 1) as f32 * (self.value / self.minimum).ln()
                / (self.maximum / self.minimum).ln()) as u16;
        } else if self.is_enumerated() {
            self.step = self
                .scale_points
                .iter()
                .position(|point| point.value == self.value)
                .unwrap_or(0) as u16;
            self.steps = self.scale_points.len() as u16;
        } else if self.is(Properties::INTEGER) {
            self.steps = (self.maximum - self.minimum) as u16 + 1;
            self.step = ((self.value - self.minimum)
                / ((self.maximum - self.minimum) / self.steps as f32))
                .round() as u16;
        } else if self.is(Properties::BYPASS) || self.is(Properties::TOGGLED) {
            self.steps = 1;
            self.step = self.value as u16;
        } else {
            self.step =
                ((self.value - self.minimum) / ((self.maximum - self.minimum) / self.steps as f32)) as u16;
        }
    }

    /// Inverse of `update_step_from_value` for the continuous kinds;
    /// rangeSteps background: http://lv2plug.in/ns/ext/port-props/#rangeSteps
    pub fn update_value_from_step(&mut self) {
        if self.is(Properties::LOGARITHMIC) {
            let p_step = self.step as f32 / (self.steps - 1) as f32;
            self.value = self.minimum * (self.maximum / self.minimum).powf(p_step);
        } else if self.is_enumerated() {
            if let Some(point) = self.scale_points.get(self.step as usize) {
                self.value = point.value;
            }
        } else if !self.is(Properties::TRIGGER)
            && !self.is(Properties::TOGGLED)
            && !self.is(Properties::BYPASS)
        {
            self.value =
                self.minimum + self.step as f32 * ((self.maximum - self.minimum) / self.steps as f32);
            if self.is(Properties::INTEGER) {
                self.value = self.value.round();
            }
        }

        if self.value > self.maximum {
            self.value = self.maximum;
        }
        if self.value < self.minimum {
            self.value = self.minimum;
        }
    }

    pub fn current_scale_point(&self) -> Option<&ScalePoint> {
        self.scale_points.get(self.step as usize)
    }
}

/// Converts a control value in its native unit into milliseconds.
pub fn convert_to_ms(unit: &str, value: f32) -> f32 {
    if unit.eq_ignore_ascii_case("bpm") {
        60000.0 / value
    } else if unit.eq_ignore_ascii_case("hz") {
        1000.0 / value
    } else if unit.eq_ignore_ascii_case("s") {
        value * 1000.0
    } else {
        value
    }
}

/// Converts milliseconds back into a control's native unit.
pub fn convert_from_ms(unit: &str, ms: f32) -> f32 {
    if unit.eq_ignore_ascii_case("bpm") {
        60000.0 / ms
    } else if unit.eq_ignore_ascii_case("hz") {
        1000.0 / ms
    } else if unit.eq_ignore_ascii_case("s") {
        ms / 1000.0
    } else {
        ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_control() -> Control {
        let mut control = Control::from_tokens(&[
            "0", "Gain", "0", "dB", "5.0", "10.0", "0.0", "10", "0", "0", "0",
        ])
        .unwrap();
        control.update_step_from_value();
        control
    }

    #[test]
    fn from_tokens_should_parse_scale_points() {
        let control = Control::from_tokens(&[
            "3", "Mode", "12", "", "1.0", "2.0", "0.0", "3", "0", "1", "3", "Off", "0.0", "Low",
            "1.0", "High", "2.0",
        ])
        .unwrap();
        assert_eq!(3, control.hw_id);
        assert_eq!(3, control.scale_points.len());
        assert_eq!("Low", control.scale_points[1].label.as_str());
        assert_eq!(1, control.scale_point_index);
        assert!(control.is_enumerated());
    }

    #[test]
    fn from_tokens_should_reject_short_lines() {
        assert!(matches!(
            Control::from_tokens(&["0", "Gain", "0"]),
            Err(ControlError::MissingToken)
        ));
    }

    #[test]
    fn linear_step_value_round_trip_should_be_stable() {
        let mut control = linear_control();
        assert_eq!(5, control.step);
        control.update_value_from_step();
        assert!((control.value - 5.0).abs() < 1e-6);
    }

    #[test]
    fn logarithmic_step_value_round_trip_should_be_stable() {
        let mut control = Control::from_tokens(&[
            "1", "Freq", "64", "Hz", "100.0", "1000.0", "10.0", "33", "0", "0", "0",
        ])
        .unwrap();
        control.update_step_from_value();
        assert_eq!(16, control.step);
        control.update_value_from_step();
        assert!((control.value - 100.0).abs() < 0.5);
    }

    #[test]
    fn integer_kind_should_imply_its_step_count() {
        let mut control = Control::from_tokens(&[
            "2", "Octave", "128", "", "2.0", "4.0", "-4.0", "1", "0", "0", "0",
        ])
        .unwrap();
        control.update_step_from_value();
        assert_eq!(9, control.steps);
        control.update_value_from_step();
        assert!((control.value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn enumerated_kind_should_take_matching_scale_point_index() {
        let mut control = Control::from_tokens(&[
            "0", "Mode", "12", "", "1.0", "2.0", "0.0", "3", "0", "1", "3", "Off", "0.0", "Low",
            "1.0", "High", "2.0",
        ])
        .unwrap();
        control.update_step_from_value();
        assert_eq!(1, control.step);
        assert_eq!(3, control.steps);
    }

    #[test]
    fn toggled_kind_should_have_a_single_step() {
        let mut control = Control::from_tokens(&[
            "4", "Enable", "32", "", "1.0", "1.0", "0.0", "10", "0", "0", "0",
        ])
        .unwrap();
        control.update_step_from_value();
        assert_eq!(1, control.steps);
        assert_eq!(1, control.step);
    }

    #[test]
    fn unit_conversions_should_invert_each_other() {
        assert!((convert_to_ms("bpm", 120.0) - 500.0).abs() < 1e-6);
        assert!((convert_from_ms("bpm", 500.0) - 120.0).abs() < 1e-6);
        assert!((convert_to_ms("Hz", 4.0) - 250.0).abs() < 1e-6);
        assert!((convert_to_ms("s", 1.5) - 1500.0).abs() < 1e-6);
        assert!((convert_from_ms("s", 1500.0) - 1.5).abs() < 1e-6);
        assert!((convert_to_ms("ms", 42.0) - 42.0).abs() < 1e-6);
    }
}
