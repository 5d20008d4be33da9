//! Decoding of RealFlight Link responses.
//!
//! ExchangeData responses carry the aircraft state in an `m-aircraftState` element and
//! echo the last control inputs in `m-previousInputs`. Only the fields needed for a
//! [TelemetryRecord] are decoded; a missing element or an unparsable value is an error,
//! never a silent zero.

use std::time::Duration;

use crate::channels::{CHANNEL_COUNT, ChannelVector, NEUTRAL_CHANNELS};
use crate::{LinkError, TelemetryRecord};

pub const AIRCRAFT_STATE: &str = "m-aircraftState";
pub const CHANNEL_VALUES: &str = "m-channelValues-0to1";

pub const AIRSPEED: &str = "m-airspeed-MPS";
pub const POSITION_X: &str = "m-aircraftPositionX-MTR";
pub const POSITION_Y: &str = "m-aircraftPositionY-MTR";
pub const ALTITUDE_AGL: &str = "m-altitudeAGL-MTR";
pub const ROLL: &str = "m-roll-DEG";
pub const INCLINATION: &str = "m-inclination-DEG";
pub const AZIMUTH: &str = "m-azimuth-DEG";
pub const AIRCRAFT_STATUS: &str = "m-currentAircraftStatus";

/// Aircraft state as reported by the simulator, before rounding.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AircraftState {
    /// Airspeed in m/s.
    pub airspeed: f64,
    /// Position along the world X axis in meters.
    pub position_x: f64,
    /// Position along the world Y axis in meters.
    pub position_y: f64,
    /// Altitude above ground in meters.
    pub altitude_agl: f64,
    /// Roll in degrees.
    pub roll: f64,
    /// Pitch (inclination) in degrees.
    pub inclination: f64,
    /// Heading (azimuth) in degrees.
    pub azimuth: f64,
    /// Simulator status, e.g. `CAS-FLYING` or `CAS-WAITINGTOLAUNCH`.
    pub status: String,
}

/// Decodes the `m-aircraftState` element of an ExchangeData response.
pub fn decode_aircraft_state(xml: &str) -> Result<AircraftState, LinkError> {
    let state = element_content(AIRCRAFT_STATE, xml)
        .ok_or_else(|| LinkError::decode(AIRCRAFT_STATE, "element not found in response"))?;

    Ok(AircraftState {
        airspeed: as_double(state, AIRSPEED)?,
        position_x: as_double(state, POSITION_X)?,
        position_y: as_double(state, POSITION_Y)?,
        altitude_agl: as_double(state, ALTITUDE_AGL)?,
        roll: as_double(state, ROLL)?,
        inclination: as_double(state, INCLINATION)?,
        azimuth: as_double(state, AZIMUTH)?,
        status: as_string(state, AIRCRAFT_STATUS)?,
    })
}

/// Decodes a response into a rounded [TelemetryRecord] stamped with `elapsed`.
pub fn decode_telemetry(xml: &str, elapsed: Duration) -> Result<TelemetryRecord, LinkError> {
    let state = decode_aircraft_state(xml)?;
    Ok(TelemetryRecord::from_state(elapsed, &state))
}

/// Decodes the first `m-channelValues-0to1` list of a request or response.
///
/// The list must hold exactly 12 numeric items.
pub fn decode_channel_values(xml: &str) -> Result<ChannelVector, LinkError> {
    let list = element_content(CHANNEL_VALUES, xml)
        .ok_or_else(|| LinkError::decode(CHANNEL_VALUES, "element not found"))?;

    let mut vector = NEUTRAL_CHANNELS;
    let mut count = 0;
    let mut rest = list;

    while let Some((content, remainder)) = next_element("item", rest) {
        if count == CHANNEL_COUNT {
            return Err(LinkError::decode(
                CHANNEL_VALUES,
                format!("more than {} items", CHANNEL_COUNT),
            ));
        }
        vector.channels[count] = content.trim().parse::<f32>().map_err(|e| {
            LinkError::decode(CHANNEL_VALUES, format!("item {} '{}': {}", count, content, e))
        })?;
        count += 1;
        rest = remainder;
    }

    if count != CHANNEL_COUNT {
        return Err(LinkError::decode(
            CHANNEL_VALUES,
            format!("expected {} items, found {}", CHANNEL_COUNT, count),
        ));
    }

    Ok(vector)
}

/// Returns the text between the first `<name>` and the matching `</name>`.
///
/// Empty elements yield `None`.
pub fn extract_element(name: &str, xml: &str) -> Option<String> {
    element_content(name, xml).map(|content| content.to_string())
}

fn element_content<'a>(name: &str, xml: &'a str) -> Option<&'a str> {
    next_element(name, xml).map(|(content, _)| content)
}

/// Finds the next `name` element, tolerating attributes on the start tag.
/// Returns its content and the text following its end tag.
fn next_element<'a>(name: &str, xml: &'a str) -> Option<(&'a str, &'a str)> {
    let open = format!("<{}", name);
    let close = format!("</{}>", name);

    let mut search_from = 0;
    let content_start = loop {
        let tag_start = search_from + xml[search_from..].find(&open)?;
        let after_name = tag_start + open.len();
        match xml[after_name..].chars().next()? {
            '>' => break after_name + 1,
            c if c.is_whitespace() => {
                let tag_end = after_name + xml[after_name..].find('>')?;
                if xml[..tag_end].ends_with('/') {
                    return None;
                }
                break tag_end + 1;
            }
            // A longer name sharing the prefix, e.g. <item> vs <items>
            _ => search_from = after_name,
        }
    };

    let content_end = content_start + xml[content_start..].find(&close)?;
    if content_start >= content_end {
        return None;
    }

    Some((
        &xml[content_start..content_end],
        &xml[content_end + close.len()..],
    ))
}

fn as_double(xml: &str, name: &str) -> Result<f64, LinkError> {
    let value =
        element_content(name, xml).ok_or_else(|| LinkError::decode(name, "field not found"))?;
    let parsed = value
        .trim()
        .parse::<f64>()
        .map_err(|e| LinkError::decode(name, format!("'{}' is not numeric: {}", value, e)))?;
    if !parsed.is_finite() {
        return Err(LinkError::decode(name, format!("'{}' is not finite", value)));
    }
    Ok(parsed)
}

fn as_string(xml: &str, name: &str) -> Result<String, LinkError> {
    element_content(name, xml)
        .map(|value| value.trim().to_string())
        .ok_or_else(|| LinkError::decode(name, "field not found"))
}
