use serde::Serialize;

/// Totals at or above this recommend green.
pub const GREEN_MIN_VEHICLES: u64 = 15;
/// Totals at or above this (and below green) recommend amber.
pub const AMBER_MIN_VEHICLES: u64 = 8;

/// Signal phase recommended for a lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Green,
    Amber,
    Red,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Green => "green",
            Phase::Amber => "amber",
            Phase::Red => "red",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(total: u64) -> Phase {
    if total >= GREEN_MIN_VEHICLES {
        Phase::Green
    } else if total >= AMBER_MIN_VEHICLES {
        Phase::Amber
    } else {
        Phase::Red
    }
}
