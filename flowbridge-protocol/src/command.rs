//! Inbound command decoding

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which metric governs a calibration session's automatic stop and the
/// shape of its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorMode {
    #[default]
    Flow,
    Scale,
}

/// Parameters accepted by the `start` command.
///
/// Every target is independently optional; an absent target means that axis
/// never triggers an automatic stop. Non-positive or non-numeric values on
/// the wire are treated as absent, not as errors.
#[derive(Debug, Clone, PartialEq)]
pub struct StartParams {
    /// Calibration volume in litres, used for the pulses-per-litre result.
    pub volume_litres: f64,
    /// Stop automatically once this many pulses accumulate (flow mode).
    pub target_pulses: Option<u64>,
    /// Stop automatically once the scale gains this many grams (scale mode).
    pub target_weight_grams: Option<f64>,
    /// Stop automatically after this many seconds (either mode).
    pub target_seconds: Option<f64>,
    pub sensor: SensorMode,
}

impl Default for StartParams {
    fn default() -> Self {
        Self {
            volume_litres: 1.0,
            target_pulses: None,
            target_weight_grams: None,
            target_seconds: None,
            sensor: SensorMode::Flow,
        }
    }
}

impl StartParams {
    fn from_json(params: &Map<String, Value>) -> Self {
        Self {
            volume_litres: positive_f64(params, "volume").unwrap_or(1.0),
            target_pulses: positive_f64(params, "pulses").map(|v| v as u64),
            target_weight_grams: positive_f64(params, "weightTarget"),
            target_seconds: positive_f64(params, "seconds"),
            sensor: match params.get("sensor").and_then(Value::as_str) {
                Some(s) if s.eq_ignore_ascii_case("scale") => SensorMode::Scale,
                _ => SensorMode::Flow,
            },
        }
    }
}

/// Pull a strictly positive number out of a JSON object field.
///
/// Anything else (absent, non-numeric, zero, negative) is `None`.
fn positive_f64(params: &Map<String, Value>, key: &str) -> Option<f64> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// A decoded client command, ready for the calibration engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    Start(StartParams),
    Stop,
    Reset,
    Unrecognized,
}

impl ClientCommand {
    /// Decode one inbound text frame.
    ///
    /// Structured decode first; if the frame is not a JSON object carrying a
    /// string `cmd` field, the raw trimmed text is treated as a bare command
    /// name with default parameters.
    pub fn decode(text: &str) -> Self {
        if let Ok(Value::Object(params)) = serde_json::from_str::<Value>(text) {
            if let Some(name) = params.get("cmd").and_then(Value::as_str) {
                return Self::named(name, &params);
            }
        }
        Self::named(text, &Map::new())
    }

    fn named(name: &str, params: &Map<String, Value>) -> Self {
        match name.trim().to_lowercase().as_str() {
            "start" => Self::Start(StartParams::from_json(params)),
            "stop" => Self::Stop,
            "reset" => Self::Reset,
            _ => Self::Unrecognized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_commands() {
        assert_eq!(ClientCommand::decode("stop"), ClientCommand::Stop);
        assert_eq!(ClientCommand::decode("  Reset\n"), ClientCommand::Reset);
        assert_eq!(
            ClientCommand::decode("START"),
            ClientCommand::Start(StartParams::default())
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(ClientCommand::decode("pause"), ClientCommand::Unrecognized);
        assert_eq!(ClientCommand::decode(""), ClientCommand::Unrecognized);
        assert_eq!(
            ClientCommand::decode(r#"{"cmd":"calibrate"}"#),
            ClientCommand::Unrecognized
        );
    }

    #[test]
    fn test_structured_start() {
        let cmd = ClientCommand::decode(
            r#"{"cmd":"start","volume":2.5,"pulses":500,"sensor":"flow"}"#,
        );
        let ClientCommand::Start(params) = cmd else {
            panic!("expected start");
        };
        assert_eq!(params.volume_litres, 2.5);
        assert_eq!(params.target_pulses, Some(500));
        assert_eq!(params.target_weight_grams, None);
        assert_eq!(params.sensor, SensorMode::Flow);
    }

    #[test]
    fn test_structured_start_scale() {
        let cmd = ClientCommand::decode(
            r#"{"cmd":"start","weightTarget":1000.0,"seconds":30,"sensor":"scale"}"#,
        );
        let ClientCommand::Start(params) = cmd else {
            panic!("expected start");
        };
        assert_eq!(params.volume_litres, 1.0);
        assert_eq!(params.target_weight_grams, Some(1000.0));
        assert_eq!(params.target_seconds, Some(30.0));
        assert_eq!(params.sensor, SensorMode::Scale);
    }

    #[test]
    fn test_bad_targets_are_not_armed() {
        let cmd = ClientCommand::decode(
            r#"{"cmd":"start","pulses":-5,"weightTarget":"lots","seconds":0}"#,
        );
        let ClientCommand::Start(params) = cmd else {
            panic!("expected start");
        };
        assert_eq!(params.target_pulses, None);
        assert_eq!(params.target_weight_grams, None);
        assert_eq!(params.target_seconds, None);
    }

    #[test]
    fn test_malformed_json_falls_back_to_bare_name() {
        // Truncated JSON is not a decode error, just not a command either.
        assert_eq!(
            ClientCommand::decode(r#"{"cmd":"start""#),
            ClientCommand::Unrecognized
        );
        // A JSON string literal decodes as a bare name.
        assert_eq!(ClientCommand::decode("stop "), ClientCommand::Stop);
    }
}
