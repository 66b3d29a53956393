//! JSONL input and output records.

use anyhow::{anyhow, Context};
use drift_engine::DetectionResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Deserialize)]
struct InputLine {
    instrument: String,
    #[serde(default)]
    channels: Map<String, Value>,
    #[serde(default)]
    reset: bool,
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Observe {
        instrument: String,
        channels: Vec<(String, Option<f64>)>,
    },
    Reset {
        instrument: String,
    },
}

impl Command {
    pub fn instrument(&self) -> &str {
        match self {
            Command::Observe { instrument, .. } | Command::Reset { instrument } => instrument,
        }
    }
}

/// A command tagged with its position in the input stream.
#[derive(Debug, Clone)]
pub struct Job {
    pub seq: u64,
    pub command: Command,
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord {
    pub seq: u64,
    pub instrument: String,
    pub result: DetectionResult,
}

/// Parses one JSONL line.
///
/// Channel values that are not JSON numbers (null, strings, booleans, ...)
/// become unavailable readings. Channel order follows the input object.
pub fn parse_line(line: &str) -> anyhow::Result<Command> {
    let input: InputLine = serde_json::from_str(line).context("malformed record")?;
    if input.instrument.is_empty() {
        return Err(anyhow!("record has an empty instrument"));
    }
    if input.reset {
        return Ok(Command::Reset {
            instrument: input.instrument,
        });
    }
    let channels = input
        .channels
        .into_iter()
        .map(|(name, value)| (name, value.as_f64()))
        .collect();
    Ok(Command::Observe {
        instrument: input.instrument,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_observe_keeps_channel_order() {
        let cmd = parse_line(
            r#"{"instrument":"BTCUSDT","channels":{"vol":0.5,"flip":null,"spread":"n/a","depth":3}}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            Command::Observe {
                instrument: "BTCUSDT".to_string(),
                channels: vec![
                    ("vol".to_string(), Some(0.5)),
                    ("flip".to_string(), None),
                    ("spread".to_string(), None),
                    ("depth".to_string(), Some(3.0)),
                ],
            }
        );
    }

    #[test]
    fn test_parse_reset() {
        let cmd = parse_line(r#"{"instrument":"ETHUSDT","reset":true}"#).unwrap();
        assert_eq!(
            cmd,
            Command::Reset {
                instrument: "ETHUSDT".to_string()
            }
        );
        assert_eq!(cmd.instrument(), "ETHUSDT");
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(parse_line("not json").is_err());
        assert!(parse_line(r#"{"channels":{}}"#).is_err());
        assert!(parse_line(r#"{"instrument":""}"#).is_err());
    }
}
