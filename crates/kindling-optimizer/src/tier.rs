use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Plot size, which fixes how many slots one template line may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotTier {
    #[default]
    Basic,
    Large,
    Massive,
}

impl PlotTier {
    pub const ALL: [PlotTier; 3] = [Self::Basic, Self::Large, Self::Massive];

    pub fn capacity(self) -> usize {
        match self {
            Self::Basic => 50,
            Self::Large => 100,
            Self::Massive => 300,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Large => "large",
            Self::Massive => "massive",
        }
    }
}

impl fmt::Display for PlotTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PlotTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown plot tier `{s}` (expected basic, large or massive)"))
    }
}
