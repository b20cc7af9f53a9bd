use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitPatterns {
    pub long: &'static str,
    pub abbrev: &'static str,
}

impl TimeUnit {
    pub const ALL: [TimeUnit; 4] = [TimeUnit::Day, TimeUnit::Week, TimeUnit::Month, TimeUnit::Year];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Day => "day",
            TimeUnit::Week => "week",
            TimeUnit::Month => "month",
            TimeUnit::Year => "year",
        }
    }

    pub fn patterns(&self) -> UnitPatterns {
        match self {
            TimeUnit::Day => UnitPatterns {
                long: "day",
                abbrev: "d",
            },
            TimeUnit::Week => UnitPatterns {
                long: "week",
                abbrev: "wk",
            },
            TimeUnit::Month => UnitPatterns {
                long: "month",
                abbrev: "mo",
            },
            TimeUnit::Year => UnitPatterns {
                long: "year",
                abbrev: "yr",
            },
        }
    }

    pub fn range_flag_threshold(&self) -> f64 {
        match self {
            TimeUnit::Day => 84.0,
            TimeUnit::Week => 12.0,
            TimeUnit::Month => 3.0,
            TimeUnit::Year => 0.25,
        }
    }

    pub fn coefficient(&self, to: TimeUnit) -> f64 {
        coefficient(*self, to)
    }
}

// Month and year are bridged through weeks: 4 per month, 52 per year.
pub fn coefficient(from: TimeUnit, to: TimeUnit) -> f64 {
    use TimeUnit::*;

    match (from, to) {
        (a, b) if a == b => 1.0,
        (Day, Week) => 1.0 / 7.0,
        (Day, Month) => 1.0 / 30.0,
        (Day, Year) => 1.0 / 365.0,
        (Week, Day) => 7.0,
        (Week, Month) => 1.0 / 4.0,
        (Week, Year) => 1.0 / 52.0,
        (Month, Day) => 30.0,
        (Month, Week) => 4.0,
        (Year, Day) => 365.0,
        (Year, Week) => 52.0,
        (Month, Year) => coefficient(Month, Week) * coefficient(Week, Year),
        (Year, Month) => coefficient(Year, Week) * coefficient(Week, Month),
        _ => unreachable!("same-unit pairs are handled above"),
    }
}

pub fn parse_units<S: AsRef<str>>(values: &[S]) -> Result<Vec<TimeUnit>, KiraError> {
    values.iter().map(|value| value.as_ref().parse()).collect()
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_lowercase();
        let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
        match singular {
            "day" => Ok(TimeUnit::Day),
            "week" => Ok(TimeUnit::Week),
            "month" => Ok(TimeUnit::Month),
            "year" => Ok(TimeUnit::Year),
            _ => Err(KiraError::InvalidUnit(value.to_string())),
        }
    }
}
