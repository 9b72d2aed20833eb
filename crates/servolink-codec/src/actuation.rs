//! Actuation value domain of the control command.
//!
//! The regulation range does not cover the whole 16-bit actuation field, so
//! values just below `i16::MAX` select special device modes instead of a target.

/// Smallest regulated angle (0°).
pub const ANGLE_MIN: i16 = 0;
/// Largest regulated angle (307.6°).
pub const ANGLE_MAX: i16 = 14000;
/// Offset added to angles so they can be adjusted in both directions.
pub const ANGLE_OFFSET: i16 = 1000;
/// Degrees covered by [`ANGLE_MIN`]..=[`ANGLE_MAX`].
pub const ANGLE_RANGE_DEGREES: f32 = 307.6;

/// Zero PWM. Values within [`PWM_SPAN`] of it are passed straight to the PWM.
pub const PWM_CENTRAL: i16 = 20000;
pub const PWM_SPAN: i16 = 4000;

/// Special modes selected by reserved actuation values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialMode {
    /// Drive PWM switched off.
    Free,
    /// Hold the current position.
    Hold,
    /// Hold the current position but let it be moved by hand.
    Soft,
    /// No value set.
    None,
    /// Latch the zero position.
    SetZero,
    /// Release the latched zero position.
    ZeroUnlock,
    /// Enable the zero-position setup function.
    ZeroSetupUnlock,
    /// Disable the zero-position setup function.
    ZeroSetupLock,
    /// Restore the factory zero angle and ±150° range.
    ZeroSetupFactory,
    /// Set the zero angle relative to the factory zero.
    ZeroSetupNull,
    /// Set the begin travel limit relative to zero.
    ZeroSetupBegin,
    /// Set the end travel limit relative to zero.
    ZeroSetupEnd,
}

impl SpecialMode {
    pub const ALL: [SpecialMode; 12] = [
        SpecialMode::Free,
        SpecialMode::Hold,
        SpecialMode::Soft,
        SpecialMode::None,
        SpecialMode::SetZero,
        SpecialMode::ZeroUnlock,
        SpecialMode::ZeroSetupUnlock,
        SpecialMode::ZeroSetupLock,
        SpecialMode::ZeroSetupFactory,
        SpecialMode::ZeroSetupNull,
        SpecialMode::ZeroSetupBegin,
        SpecialMode::ZeroSetupEnd,
    ];

    /// Actuation value that selects this mode.
    pub fn value(self) -> i16 {
        match self {
            SpecialMode::Free => 32767,
            SpecialMode::Hold => 32766,
            SpecialMode::Soft => 32765,
            SpecialMode::None => 32764,
            SpecialMode::SetZero => 32763,
            SpecialMode::ZeroUnlock => 32762,
            SpecialMode::ZeroSetupUnlock => 32761,
            SpecialMode::ZeroSetupLock => 32760,
            SpecialMode::ZeroSetupFactory => 32759,
            SpecialMode::ZeroSetupNull => 32758,
            SpecialMode::ZeroSetupBegin => 32757,
            SpecialMode::ZeroSetupEnd => 32756,
        }
    }

    /// Mode selected by `value`, if it is one of the reserved sentinels.
    pub fn from_value(value: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.value() == value)
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialMode::Free => "free",
            SpecialMode::Hold => "hold",
            SpecialMode::Soft => "soft",
            SpecialMode::None => "none",
            SpecialMode::SetZero => "set-zero",
            SpecialMode::ZeroUnlock => "zero-unlock",
            SpecialMode::ZeroSetupUnlock => "zp-unlock",
            SpecialMode::ZeroSetupLock => "zp-lock",
            SpecialMode::ZeroSetupFactory => "zp-set-factory",
            SpecialMode::ZeroSetupNull => "zp-set-null",
            SpecialMode::ZeroSetupBegin => "zp-set-begin",
            SpecialMode::ZeroSetupEnd => "zp-set-end",
        }
    }
}

/// How a device interprets an actuation value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Actuation {
    /// Reserved sentinel.
    Special(SpecialMode),
    /// Raw PWM pass-through, relative to [`PWM_CENTRAL`].
    Pwm(i16),
    /// Regulated target angle in degrees.
    Angle(f32),
    /// Anything else.
    Other(i16),
}

impl Actuation {
    pub fn classify(value: i16) -> Self {
        if let Some(mode) = SpecialMode::from_value(value) {
            return Actuation::Special(mode);
        }
        let offset = i32::from(value) - i32::from(PWM_CENTRAL);
        if offset.abs() <= i32::from(PWM_SPAN) {
            return Actuation::Pwm(offset as i16);
        }
        if (ANGLE_MIN..=ANGLE_MAX).contains(&value) {
            return Actuation::Angle(angle_to_degrees(value));
        }
        Actuation::Other(value)
    }
}

/// Whether `value` is a reserved sentinel.
pub fn is_special(value: i16) -> bool {
    SpecialMode::from_value(value).is_some()
}

/// Convert a regulated angle value to degrees.
pub fn angle_to_degrees(value: i16) -> f32 {
    f32::from(value) * ANGLE_RANGE_DEGREES / f32::from(ANGLE_MAX)
}

/// Convert degrees to the nearest regulated angle value, clamped to the range.
pub fn degrees_to_angle(degrees: f32) -> i16 {
    let raw = (degrees * f32::from(ANGLE_MAX) / ANGLE_RANGE_DEGREES).round();
    raw.clamp(f32::from(ANGLE_MIN), f32::from(ANGLE_MAX)) as i16
}
