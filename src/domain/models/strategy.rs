use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a `set` propagates to the remote tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteStrategy {
    /// Both tiers are written before `set` returns.
    #[default]
    WriteThrough,
    /// Memory tier is written synchronously; the remote write is queued.
    WriteBack,
}

impl WriteStrategy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WriteThrough => "write_through",
            Self::WriteBack => "write_back",
        }
    }
}

impl fmt::Display for WriteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "write_through" | "through" => Ok(Self::WriteThrough),
            "write_back" | "back" => Ok(Self::WriteBack),
            other => Err(format!(
                "Invalid write strategy: {other}. Must be one of: write_through, write_back"
            )),
        }
    }
}

/// What happens to queued write-backs when the manager shuts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Wait for every queued write-back to reach the remote tier.
    #[default]
    Drain,
    /// Stop the worker immediately; pending writes are reported as abandoned.
    Abandon,
}
