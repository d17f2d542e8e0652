//! Configuration types deserialized from `hwtk.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// The whole toolkit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ToolkitConfig {
    /// Naming rules used while flattening units.
    #[serde(default)]
    pub elaborate: ElaborateConfig,
    /// Simulator limits.
    #[serde(default)]
    pub sim: SimConfig,
}

/// Naming rules used while flattening units into netlists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ElaborateConfig {
    /// Joins hierarchical interface names (`axi` + `ar_valid` → `axi_ar_valid`).
    pub name_separator: String,
    /// Prefix of the nets that bridge a parent to a sub-unit port.
    pub bridge_prefix: String,
    /// Prefix of auto-named operator results and constants.
    pub anonymous_prefix: String,
    /// Name of every generated architecture body.
    pub architecture_name: String,
    /// Emit W400/W401 for interfaces and parameters nobody uses.
    pub warn_unconnected: bool,
}

impl Default for ElaborateConfig {
    fn default() -> Self {
        Self {
            name_separator: "_".to_string(),
            bridge_prefix: "sig_".to_string(),
            anonymous_prefix: "sig_".to_string(),
            architecture_name: "rtl".to_string(),
            warn_unconnected: true,
        }
    }
}

/// Simulator limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimConfig {
    /// Maximum number of delta cycles one settle may take before the
    /// design is declared oscillating.
    pub max_deltas: u32,
    /// Emit a `tracing` event for every signal write.
    pub log: bool,
    /// Default clock period used by clock-driving helpers.
    #[serde(deserialize_with = "deserialize_period")]
    pub clock_period: Period,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_deltas: 10_000,
            log: false,
            clock_period: Period::from_ps(10_000),
        }
    }
}

/// A span of simulated time, stored in picoseconds.
///
/// Parses from strings like `"10ns"`, `"2.5ns"`, `"500ps"`, `"1us"`, and
/// bare integers (picoseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Period(u64);

impl Period {
    /// Creates a period from picoseconds.
    pub const fn from_ps(ps: u64) -> Self {
        Self(ps)
    }

    /// Creates a period from nanoseconds.
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns * 1_000)
    }

    /// Returns the period in picoseconds.
    pub fn as_ps(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 >= 1_000 && self.0 % 1_000 == 0 {
            write!(f, "{}ns", self.0 / 1_000)
        } else {
            write!(f, "{}ps", self.0)
        }
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let number: f64 = number
            .parse()
            .map_err(|_| format!("invalid time value '{s}'"))?;
        let scale = match unit.trim() {
            "" | "ps" => 1.0,
            "ns" => 1_000.0,
            "us" => 1_000_000.0,
            "ms" => 1_000_000_000.0,
            other => return Err(format!("unknown time unit '{other}'")),
        };
        let ps = number * scale;
        if ps.fract() != 0.0 || ps < 0.0 {
            return Err(format!("'{s}' is not a whole number of picoseconds"));
        }
        Ok(Period(ps as u64))
    }
}

fn deserialize_period<'de, D>(deserializer: D) -> Result<Period, D::Error>
where
    D: Deserializer<'de>,
{
    struct PeriodVisitor;

    impl<'de> Visitor<'de> for PeriodVisitor {
        type Value = Period;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a time like \"10ns\" or an integer number of picoseconds")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.parse().map_err(E::custom)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v)
                .map(Period)
                .map_err(|_| E::custom("period must not be negative"))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Period(v))
        }
    }

    deserializer.deserialize_any(PeriodVisitor)
}
