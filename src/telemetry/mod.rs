//! Telemetry records and the sinks that persist them.
//!
//! Every exchange produces a [TelemetryRecord]. The [ControlLink](crate::ControlLink)
//! keeps the latest one and forwards it to a [TelemetrySink] unless the channel vector
//! that produced it is idle according to its [IdlePredicate].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channels::{ChannelVector, NEUTRAL_CHANNELS};
use crate::decoders::AircraftState;

mod sink;

pub use sink::{CsvTelemetrySink, MemoryTelemetrySink, TelemetrySink};

/// Status reported by the simulator while the aircraft is airborne.
pub const FLYING_STATUS: &str = "CAS-FLYING";

/// Column names of the telemetry log, in order.
pub const COLUMNS: [&str; 9] = [
    "T",
    "Airspeed",
    "Aircraft X",
    "Aircraft Y",
    "Altitude above Ground",
    "Roll",
    "Pitch",
    "Yaw",
    "Flying",
];

/// Snapshot of the aircraft for one exchange cycle.
///
/// Numeric values are rounded to two decimals, the timestamp to three.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Seconds since the last reset.
    pub timestamp: f64,
    /// Airspeed in m/s.
    pub airspeed: f64,
    /// World X position in meters.
    pub position_x: f64,
    /// World Y position in meters.
    pub position_y: f64,
    /// Altitude above ground in meters.
    pub altitude_agl: f64,
    /// Roll in degrees.
    pub roll: f64,
    /// Pitch in degrees, from the simulator's inclination.
    pub pitch: f64,
    /// Yaw in degrees, from the simulator's azimuth.
    pub yaw: f64,
    /// Simulator status string.
    pub status: String,
}

impl TelemetryRecord {
    pub fn from_state(elapsed: Duration, state: &AircraftState) -> Self {
        TelemetryRecord {
            timestamp: round_to(elapsed.as_secs_f64(), 3),
            airspeed: round_to(state.airspeed, 2),
            position_x: round_to(state.position_x, 2),
            position_y: round_to(state.position_y, 2),
            altitude_agl: round_to(state.altitude_agl, 2),
            roll: round_to(state.roll, 2),
            pitch: round_to(state.inclination, 2),
            yaw: round_to(state.azimuth, 2),
            status: state.status.clone(),
        }
    }

    pub fn is_flying(&self) -> bool {
        self.status == FLYING_STATUS
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    // Adding zero turns -0.0 into 0.0.
    (value * factor).round() / factor + 0.0
}

/// Decides whether a channel vector carries no command.
///
/// Records produced by idle vectors are not written to the telemetry log.
pub struct IdlePredicate(Box<dyn Fn(&ChannelVector) -> bool + Send>);

impl IdlePredicate {
    pub fn new(predicate: impl Fn(&ChannelVector) -> bool + Send + 'static) -> Self {
        IdlePredicate(Box::new(predicate))
    }

    /// Idle when the vector equals the neutral vector exactly.
    pub fn neutral() -> Self {
        Self::matching(NEUTRAL_CHANNELS)
    }

    /// Idle when the vector equals `reference` exactly.
    pub fn matching(reference: ChannelVector) -> Self {
        Self::new(move |vector| *vector == reference)
    }

    /// Nothing is idle; every record is logged.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    pub fn is_idle(&self, vector: &ChannelVector) -> bool {
        (self.0)(vector)
    }
}

impl Default for IdlePredicate {
    fn default() -> Self {
        Self::neutral()
    }
}

impl fmt::Debug for IdlePredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdlePredicate")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::STARTUP_CHANNELS;

    fn state() -> AircraftState {
        AircraftState {
            airspeed: 1.23456,
            position_x: -10.006,
            position_y: 3.14159,
            altitude_agl: 2.0,
            roll: 0.004,
            inclination: -4.2151,
            azimuth: 179.999,
            status: "CAS-FLYING".to_string(),
        }
    }

    #[test]
    fn maps_inclination_to_pitch_and_azimuth_to_yaw() {
        let record = TelemetryRecord::from_state(Duration::from_millis(500), &state());

        assert_eq!(record.pitch, -4.22);
        assert_eq!(record.yaw, 180.0);
        assert_eq!(record.timestamp, 0.5);
    }

    fn csv_row(record: &TelemetryRecord) -> String {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.serialize(record).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn serializes_columns_in_order() {
        let record = TelemetryRecord::from_state(Duration::from_millis(1500), &state());
        assert_eq!(
            csv_row(&record),
            "1.5,1.23,-10.01,3.14,2.0,0.0,-4.22,180.0,CAS-FLYING\n"
        );
    }

    #[test]
    fn column_count_matches_record() {
        let record = TelemetryRecord::default();
        assert_eq!(csv_row(&record).trim_end().split(',').count(), COLUMNS.len());
    }

    #[test]
    fn small_negative_values_round_to_positive_zero() {
        let level = AircraftState {
            roll: -0.004,
            inclination: -0.001,
            ..state()
        };
        let record = TelemetryRecord::from_state(Duration::ZERO, &level);

        assert!(record.roll.is_sign_positive());
        assert!(record.pitch.is_sign_positive());
        assert!(csv_row(&record).contains(",0.0,0.0,"));
    }

    #[test]
    fn neutral_predicate_matches_only_neutral() {
        let idle = IdlePredicate::default();

        assert!(idle.is_idle(&NEUTRAL_CHANNELS));
        assert!(!idle.is_idle(&STARTUP_CHANNELS));
    }

    #[test]
    fn never_predicate_logs_everything() {
        let idle = IdlePredicate::never();
        assert!(!idle.is_idle(&NEUTRAL_CHANNELS));
    }

    #[test]
    fn custom_predicate_with_tolerance() {
        let idle = IdlePredicate::new(|vector| {
            vector
                .channels
                .iter()
                .zip(NEUTRAL_CHANNELS.channels.iter())
                .all(|(a, b)| (a - b).abs() < 0.01)
        });

        let mut nearly_neutral = NEUTRAL_CHANNELS;
        nearly_neutral.channels[1] = 0.505;

        assert!(idle.is_idle(&nearly_neutral));
        assert!(!idle.is_idle(&STARTUP_CHANNELS));
    }
}
