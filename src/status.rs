//! Status evaluation for sensor values.
//!
//! Each sensor key maps to a [`StatusRule`] in a [`ThresholdTable`]. Keys with
//! no rule (HUM, LIGHT and anything unrecognised) are always `Normal`.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity derived from a sensor's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StatusLevel {
    Normal,
    Warning,
    Critical,
    /// Evaluation failed, or no value has been received yet
    #[default]
    Unknown,
}

impl StatusLevel {
    /// Display color used by the dashboard.
    pub fn color(self) -> &'static str {
        match self {
            Self::Normal => "lime",
            Self::Warning => "orange",
            Self::Critical => "red",
            Self::Unknown => "gray",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub level: StatusLevel,
    pub color: &'static str,
}

impl From<StatusLevel> for Evaluation {
    fn from(level: StatusLevel) -> Self {
        Self {
            level,
            color: level.color(),
        }
    }
}

/// How a single sensor key is classified.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusRule {
    /// Numeric value in degrees; `<= warn_above` is Normal, `<= critical_above`
    /// is Warning, anything higher is Critical.
    Temperature {
        warn_above: f64,
        critical_above: f64,
    },
    /// Case-insensitive match against `trigger` yields `level`, anything else
    /// is Normal.
    Matches {
        trigger: &'static str,
        level: StatusLevel,
    },
    /// Always Normal.
    AlwaysNormal,
}

impl StatusRule {
    fn apply(&self, key: &str, value: &str) -> Result<StatusLevel> {
        match self {
            Self::Temperature {
                warn_above,
                critical_above,
            } => {
                let celsius = parse_temperature(value).ok_or_else(|| {
                    MonitorError::evaluation_error(key, value, "not a finite number")
                })?;
                Ok(if celsius > *critical_above {
                    StatusLevel::Critical
                } else if celsius > *warn_above {
                    StatusLevel::Warning
                } else {
                    StatusLevel::Normal
                })
            }
            Self::Matches { trigger, level } => Ok(if value.to_lowercase() == *trigger {
                *level
            } else {
                StatusLevel::Normal
            }),
            Self::AlwaysNormal => Ok(StatusLevel::Normal),
        }
    }
}

/// Unit suffixes the board appends to temperatures.
const DEGREE_SUFFIXES: [&str; 2] = ["°C", "°"];

/// Parse a temperature such as `36.5°C`. Non-finite values are rejected.
fn parse_temperature(value: &str) -> Option<f64> {
    let mut number = value.trim();
    for suffix in DEGREE_SUFFIXES {
        if let Some(stripped) = number.strip_suffix(suffix) {
            number = stripped.trim_end();
            break;
        }
    }
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Lookup table from sensor key to rule.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    rules: Vec<(&'static str, StatusRule)>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        use StatusLevel::{Critical, Warning};

        Self {
            rules: vec![
                (
                    "TEMP",
                    StatusRule::Temperature {
                        warn_above: 35.0,
                        critical_above: 38.0,
                    },
                ),
                (
                    "FLAME",
                    StatusRule::Matches {
                        trigger: "fire detected",
                        level: Critical,
                    },
                ),
                (
                    "SHOCK",
                    StatusRule::Matches {
                        trigger: "impact",
                        level: Warning,
                    },
                ),
                (
                    "BALL",
                    StatusRule::Matches {
                        trigger: "active",
                        level: Warning,
                    },
                ),
                (
                    "SOUND",
                    StatusRule::Matches {
                        trigger: "loud",
                        level: Warning,
                    },
                ),
                (
                    "REED",
                    StatusRule::Matches {
                        trigger: "open",
                        level: Warning,
                    },
                ),
                (
                    "TOUCH",
                    StatusRule::Matches {
                        trigger: "touched",
                        level: Warning,
                    },
                ),
                ("HUM", StatusRule::AlwaysNormal),
            ],
        }
    }
}

impl ThresholdTable {
    /// Build a table from explicit rules.
    pub fn new(rules: Vec<(&'static str, StatusRule)>) -> Self {
        Self { rules }
    }

    /// Rule for `key`, falling back to [`StatusRule::AlwaysNormal`].
    pub fn rule_for(&self, key: &str) -> &StatusRule {
        self.rules
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, rule)| rule)
            .unwrap_or(&StatusRule::AlwaysNormal)
    }

    /// Classify a value, reporting failures instead of masking them.
    pub fn try_evaluate(&self, key: &str, value: &str) -> Result<StatusLevel> {
        self.rule_for(key).apply(key, value)
    }

    /// Classify a value. Failures become [`StatusLevel::Unknown`].
    pub fn evaluate(&self, key: &str, value: &str) -> Evaluation {
        match self.try_evaluate(key, value) {
            Ok(level) => level.into(),
            Err(err) => {
                tracing::debug!("{}", err);
                StatusLevel::Unknown.into()
            }
        }
    }
}

/// Classify a value against the default table.
pub fn evaluate(key: &str, value: &str) -> Evaluation {
    ThresholdTable::default().evaluate(key, value)
}
