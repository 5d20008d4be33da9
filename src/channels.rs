//! RC channel vector and the conversion from motion intents to channel values.

use log::debug;
use serde::Deserialize;

/// Number of RC channels understood by RealFlight Link.
pub const CHANNEL_COUNT: usize = 12;

pub const ROLL: usize = 0;
pub const PITCH: usize = 1;
pub const THROTTLE: usize = 2;
pub const YAW: usize = 3;
pub const FLIGHT_MODE: usize = 7;

/// Stick value representing hover on roll, pitch, throttle and yaw.
pub const CENTER: f32 = 0.5;

/// Flight-mode marker sent on channel 8.
pub const DEFAULT_FLIGHT_MODE: f32 = 1.0;

/// The "no command" vector: all sticks centered, flight mode 1.
pub const NEUTRAL_CHANNELS: ChannelVector = ChannelVector {
    channels: [0.5, 0.5, 0.5, 0.5, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
};

/// Vector sent after a reset. Throttle is pulled to zero so the simulator registers
/// a throttle movement once the first real command arrives.
pub const STARTUP_CHANNELS: ChannelVector = ChannelVector {
    channels: [0.5, 0.5, 0.0, 0.5, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
};

/// Transmitter state sent to the simulator.
///
/// Channel layout:
///
/// | index | meaning     |
/// |-------|-------------|
/// | 0     | roll        |
/// | 1     | pitch       |
/// | 2     | throttle    |
/// | 3     | yaw         |
/// | 4–6   | unused      |
/// | 7     | flight mode |
/// | 8–11  | unused      |
///
/// Roll, pitch, throttle and yaw are normalized to `0.0..=1.0` with `0.5` as hover.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelVector {
    pub channels: [f32; CHANNEL_COUNT],
}

impl Default for ChannelVector {
    fn default() -> Self {
        NEUTRAL_CHANNELS
    }
}

impl ChannelVector {
    pub fn roll(&self) -> f32 {
        self.channels[ROLL]
    }

    pub fn pitch(&self) -> f32 {
        self.channels[PITCH]
    }

    pub fn throttle(&self) -> f32 {
        self.channels[THROTTLE]
    }

    pub fn yaw(&self) -> f32 {
        self.channels[YAW]
    }

    pub fn flight_mode(&self) -> f32 {
        self.channels[FLIGHT_MODE]
    }
}

/// Desired motion of the aircraft.
///
/// Positive `forward` is forward, positive `lateral` is left, positive `vertical` is up
/// and positive `yaw_rate` turns left.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionIntent {
    /// Forward/back velocity in m/s.
    pub forward: f32,
    /// Left/right velocity in m/s.
    pub lateral: f32,
    /// Vertical velocity in m/s.
    pub vertical: f32,
    /// Yaw rate, in the unit the yaw scale expects.
    pub yaw_rate: f32,
}

impl MotionIntent {
    pub fn new(forward: f32, lateral: f32, vertical: f32, yaw_rate: f32) -> Self {
        MotionIntent {
            forward,
            lateral,
            vertical,
            yaw_rate,
        }
    }

    /// Hold position.
    pub fn hover() -> Self {
        MotionIntent::default()
    }

    pub fn forward(velocity: f32) -> Self {
        MotionIntent {
            forward: velocity,
            ..Default::default()
        }
    }

    pub fn lateral(velocity: f32) -> Self {
        MotionIntent {
            lateral: velocity,
            ..Default::default()
        }
    }

    pub fn vertical(velocity: f32) -> Self {
        MotionIntent {
            vertical: velocity,
            ..Default::default()
        }
    }

    pub fn turn(yaw_rate: f32) -> Self {
        MotionIntent {
            yaw_rate,
            ..Default::default()
        }
    }
}

/// Factors mapping physical velocities onto stick deflection.
///
/// A stick deflection of `velocity * scale` is applied around the center, so a
/// velocity of `1 / scale` moves the stick to its end stop. Ascent and descent use
/// separate factors because thrust response is asymmetric.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionScales {
    pub forward: f32,
    pub lateral: f32,
    pub ascend: f32,
    pub descend: f32,
    pub yaw: f32,
}

impl Default for ConversionScales {
    fn default() -> Self {
        ConversionScales {
            forward: 3.6 / 9.5,
            lateral: 3.6 / 9.5,
            ascend: 3.6 / 13.5,
            descend: 3.6 / 7.0,
            yaw: 1.0,
        }
    }
}

/// Converts a motion intent into a channel vector.
///
/// Values are not clamped. Intents outside the aircraft envelope produce channel
/// values outside `0.0..=1.0`; limiting the intent is the caller's job.
pub fn convert(intent: &MotionIntent, scales: &ConversionScales) -> ChannelVector {
    let roll = CENTER - (intent.lateral * scales.lateral) / 2.0;
    let pitch = CENTER + (intent.forward * scales.forward) / 2.0;
    let throttle = if intent.vertical >= 0.0 {
        CENTER + (intent.vertical * scales.ascend) / 2.0
    } else {
        CENTER + (intent.vertical * scales.descend) / 2.0
    };
    let yaw = CENTER + (intent.yaw_rate * scales.yaw) / 2.0;

    let mut vector = NEUTRAL_CHANNELS;
    vector.channels[ROLL] = roll;
    vector.channels[PITCH] = pitch;
    vector.channels[THROTTLE] = throttle;
    vector.channels[YAW] = yaw;
    vector.channels[FLIGHT_MODE] = DEFAULT_FLIGHT_MODE;

    debug!("channel values for {:?}: {:?}", intent, vector.channels);

    vector
}
