//! Messages exchanged with the decision service.

use crate::error::DecisionError;
use crate::math::Point2d;
use serde::{Deserialize, Serialize};

/// A position in network coordinates, in m.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl From<Point2d> for Position {
    fn from(p: Point2d) -> Self {
        Self { x: p.x, y: p.y }
    }
}

/// Sent once when an emergency vehicle begins its approach to an RSU's junction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriorityEvent {
    pub ev_id: String,
    pub rsu_id: String,
    /// The junction served by the RSU.
    pub tls_id: String,
    pub position: Position,
    /// Speed in m/s.
    pub speed: f64,
    /// Straight-line distance to the junction, in m.
    pub distance: f64,
    /// Estimated time to reach the junction, in s.
    pub eta_seconds: f64,
    /// Simulation time at detection, in s.
    pub sim_time: f64,
    /// Wall-clock time at detection, RFC 3339.
    pub timestamp: String,
}

/// Sent every tick for every emergency vehicle, naming the nearest RSU.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingUpdate {
    pub ev_id: String,
    pub location: [f64; 2],
    /// Simulation time in s.
    pub time: f64,
    pub lane: String,
    pub edge: String,
    pub rsu: Option<String>,
}

/// A message on the outbound stream to the decision service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "EV_PRIORITY_REQ")]
    Priority(PriorityEvent),
    #[serde(rename = "EV_UPDATE")]
    Tracking(TrackingUpdate),
}

impl OutboundMessage {
    /// Encodes the message as a single line of JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// What the decision service asks a junction to do.
#[derive(Clone, Debug, PartialEq)]
pub enum DecisionAction {
    /// The request was seen; no change.
    Ack,
    /// Lengthen the current phase by the given number of seconds.
    ExtendGreen(f64),
    /// An action this coordinator does not know how to apply.
    Unknown(String),
}

impl DecisionAction {
    /// Parses an action token such as `"ack"` or `"extend_green_10s"`.
    /// `duration` is the separate duration field some services send with `"extend_green"`.
    /// An extension that is negative or not finite is not an extension, and parses as
    /// [DecisionAction::Unknown].
    pub fn parse(action: &str, duration: Option<f64>) -> Self {
        if action == "ack" {
            return DecisionAction::Ack;
        }
        if action == "extend_green" {
            if let Some(secs) = duration.filter(|secs| is_extension(*secs)) {
                return DecisionAction::ExtendGreen(secs);
            }
        }
        let secs = action
            .strip_prefix("extend_green_")
            .and_then(|rest| rest.strip_suffix('s'))
            .and_then(|n| n.parse::<u32>().ok());
        match secs {
            Some(secs) => DecisionAction::ExtendGreen(secs as f64),
            None => DecisionAction::Unknown(action.to_string()),
        }
    }

    /// Gets the action token as sent on the wire.
    ///
    /// Whole-second extensions use the `extend_green_<N>s` token. Any other extension is
    /// sent as `extend_green` with its length in the separate [DecisionAction::duration].
    pub fn token(&self) -> String {
        match self {
            DecisionAction::Ack => "ack".to_string(),
            DecisionAction::ExtendGreen(secs) => match whole_secs(*secs) {
                Some(secs) => format!("extend_green_{}s", secs),
                None => "extend_green".to_string(),
            },
            DecisionAction::Unknown(token) => token.clone(),
        }
    }

    /// Gets the duration field sent alongside the token, if the token can't carry it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            DecisionAction::ExtendGreen(secs) if whole_secs(*secs).is_none() => Some(*secs),
            _ => None,
        }
    }
}

/// Whether `secs` is a usable extension length.
pub(crate) fn is_extension(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

fn whole_secs(secs: f64) -> Option<u32> {
    (is_extension(secs) && secs.fract() == 0.0 && secs <= u32::MAX as f64).then(|| secs as u32)
}

/// An instruction from the decision service targeting one junction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireDecision", into = "WireDecision")]
pub struct PriorityDecision {
    /// A junction ID or the ID of the RSU serving it.
    pub target: String,
    pub action: DecisionAction,
}

#[derive(Clone, Serialize, Deserialize)]
struct WireDecision {
    tls_id: String,
    action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
}

impl From<WireDecision> for PriorityDecision {
    fn from(wire: WireDecision) -> Self {
        Self {
            action: DecisionAction::parse(&wire.action, wire.duration),
            target: wire.tls_id,
        }
    }
}

impl From<PriorityDecision> for WireDecision {
    fn from(decision: PriorityDecision) -> Self {
        Self {
            tls_id: decision.target,
            action: decision.action.token(),
            duration: decision.action.duration(),
        }
    }
}

impl PriorityDecision {
    pub fn new(target: impl Into<String>, action: DecisionAction) -> Self {
        Self {
            target: target.into(),
            action,
        }
    }

    /// Decodes a decision message.
    pub fn from_json(json: &str) -> Result<Self, DecisionError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_action_tokens() {
        assert_eq!(DecisionAction::parse("ack", None), DecisionAction::Ack);
        assert_eq!(
            DecisionAction::parse("extend_green_10s", None),
            DecisionAction::ExtendGreen(10.0)
        );
        assert_eq!(
            DecisionAction::parse("extend_green", Some(5.0)),
            DecisionAction::ExtendGreen(5.0)
        );
        assert_eq!(
            DecisionAction::parse("extend_green_xs", None),
            DecisionAction::Unknown("extend_green_xs".into())
        );
        assert_eq!(
            DecisionAction::parse("extend_green", None),
            DecisionAction::Unknown("extend_green".into())
        );
    }

    #[test]
    fn rejects_negative_and_non_finite_extensions() {
        for secs in [-50.0, -1e300, f64::NAN, f64::INFINITY] {
            assert_eq!(
                DecisionAction::parse("extend_green", Some(secs)),
                DecisionAction::Unknown("extend_green".into())
            );
        }
        let decision =
            PriorityDecision::from_json(r#"{"tls_id":"J1","action":"extend_green","duration":-50}"#)
                .unwrap();
        assert!(matches!(decision.action, DecisionAction::Unknown(_)));
    }

    #[test]
    fn fractional_extension_keeps_its_length() {
        let decision = PriorityDecision::new("J1", DecisionAction::ExtendGreen(2.5));
        let json = serde_json::to_value(&decision).unwrap();
        assert_eq!(json["action"], "extend_green");
        assert_eq!(json["duration"], 2.5);
        let decoded: PriorityDecision = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, decision);

        let whole = serde_json::to_value(PriorityDecision::new("J1", DecisionAction::ExtendGreen(10.0)))
            .unwrap();
        assert_eq!(whole["action"], "extend_green_10s");
        assert!(whole.get("duration").is_none());
    }

    #[test]
    fn decodes_both_decision_shapes() {
        let a = PriorityDecision::from_json(r#"{"tls_id":"J4","action":"extend_green_10s"}"#).unwrap();
        let b = PriorityDecision::from_json(
            r#"{"type":"RSU_RESPONSE","tls_id":"J4","action":"extend_green","duration":10,"reason":"EV arriving soon"}"#,
        )
        .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.target, "J4");
    }

    #[test]
    fn rejects_decision_without_target() {
        assert!(matches!(
            PriorityDecision::from_json(r#"{"action":"ack"}"#),
            Err(DecisionError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_messages_are_tagged() {
        let msg = OutboundMessage::Tracking(TrackingUpdate {
            ev_id: "ev0".into(),
            location: [1.0, 2.0],
            time: 3.0,
            lane: "a_0".into(),
            edge: "a".into(),
            rsu: Some("RSU_J1".into()),
        });
        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "EV_UPDATE");
        assert_eq!(json["rsu"], "RSU_J1");
    }
}
