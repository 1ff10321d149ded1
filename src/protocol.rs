//! Simulator wire protocol.
//!
//! The simulator speaks socket.io-style event frames over a WebSocket:
//!
//! ```text
//! 42["telemetry",{"cte":"0.7598","speed":"0.4380","steering_angle":"0.0000",...}]
//! 42["steer",{"steering_angle":-0.19,"throttle":0.3}]
//! ```
//!
//! `4` marks a message and `2` an event. Telemetry numbers arrive as strings;
//! numeric JSON values are accepted too.

use serde::Serialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// Prefix of every socket.io event frame.
pub const EVENT_PREFIX: &str = "42";

/// Extract the JSON array payload of an event frame.
///
/// Returns `None` for a frame without usable data: one containing `null`
/// anywhere, or missing either bracket. The caller answers that with
/// [`Command::Manual`]. Frames that are not events at all should be filtered
/// with [`is_event_frame`] first.
pub fn extract_payload(frame: &str) -> Option<&str> {
    if frame.contains("null") {
        return None;
    }
    let start = frame.find('[')?;
    let end = frame.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&frame[start..=end])
}

/// `true` for a socket.io event frame (`42...` with something after it).
pub fn is_event_frame(frame: &str) -> bool {
    frame.len() > EVENT_PREFIX.len() && frame.starts_with(EVENT_PREFIX)
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// One telemetry sample from the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    /// Cross-track error.
    pub cte: f64,
    pub speed: f64,
    /// Current steering angle in degrees; not used for control.
    pub steering_angle: f64,
}

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Telemetry(Telemetry),
    /// Any other event name; ignored.
    Other(String),
}

/// Decode the `[name, data]` payload returned by [`extract_payload`].
pub fn decode_event(payload: &str) -> Result<Inbound, ProtocolError> {
    let value: Value = serde_json::from_str(payload)?;
    let items = value.as_array().ok_or(ProtocolError::NotAnEvent)?;
    let name = items
        .first()
        .and_then(Value::as_str)
        .ok_or(ProtocolError::NotAnEvent)?;

    if name != "telemetry" {
        return Ok(Inbound::Other(name.to_string()));
    }

    let data = items.get(1).ok_or(ProtocolError::MissingField("cte"))?;
    let cte = number_field(data, "cte")?.ok_or(ProtocolError::MissingField("cte"))?;
    if !cte.is_finite() {
        return Err(ProtocolError::NonFinite { field: "cte", value: cte });
    }

    Ok(Inbound::Telemetry(Telemetry {
        cte,
        speed: number_field(data, "speed")?.unwrap_or(0.0),
        steering_angle: number_field(data, "steering_angle")?.unwrap_or(0.0),
    }))
}

/// Read `data[field]` as a number, accepting `"1.5"` as well as `1.5`.
fn number_field(data: &Value, field: &'static str) -> Result<Option<f64>, ProtocolError> {
    match data.get(field) {
        None => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| ProtocolError::InvalidNumber { field, value: n.to_string() }),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ProtocolError::InvalidNumber { field, value: s.clone() }),
        Some(other) => Err(ProtocolError::InvalidNumber { field, value: other.to_string() }),
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SteerPayload {
    steering_angle: f64,
    throttle: f64,
}

/// A command sent back to the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Normal control output.
    Steer { steering_angle: f64, throttle: f64 },
    /// Put the vehicle back at the start; sent before each new tuning trial.
    Reset,
    /// No telemetry available; hand control to the simulator.
    Manual,
}

impl Command {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Steer { .. } => "steer",
            Command::Reset        => "reset",
            Command::Manual       => "manual",
        }
    }

    /// Encode as a socket.io event frame.
    pub fn encode(&self) -> String {
        let data = match *self {
            Command::Steer { steering_angle, throttle } => {
                serde_json::to_value(SteerPayload { steering_angle, throttle })
                    .unwrap_or_else(|_| serde_json::json!({}))
            }
            Command::Reset | Command::Manual => serde_json::json!({}),
        };
        format!("{}{}", EVENT_PREFIX, serde_json::json!([self.name(), data]))
    }
}
