use serde::Serialize;

use crate::error::KiraError;
use crate::matcher::{Candidates, extract_candidates};
use crate::normalize::normalize;
use crate::units::{TimeUnit, parse_units};

pub const DEFAULT_NULL_SENTINEL: &str = "n/a";

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Conversion {
    pub value: Option<f64>,
    pub flagged: bool,
}

impl Conversion {
    pub fn none() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeConverter {
    to: TimeUnit,
    from_units: Vec<TimeUnit>,
    flag_range: bool,
    null_sentinel: String,
}

impl Default for TimeConverter {
    fn default() -> Self {
        Self::new(TimeUnit::Week, TimeUnit::ALL.to_vec())
    }
}

impl TimeConverter {
    pub fn new(to: TimeUnit, from_units: Vec<TimeUnit>) -> Self {
        Self {
            to,
            from_units,
            flag_range: true,
            null_sentinel: DEFAULT_NULL_SENTINEL.to_string(),
        }
    }

    pub fn from_names<S: AsRef<str>>(to: &str, from_units: &[S]) -> Result<Self, KiraError> {
        let to = to.parse::<TimeUnit>()?;
        let from_units = parse_units(from_units)?;
        Ok(Self::new(to, from_units))
    }

    pub fn with_flag_range(mut self, flag_range: bool) -> Self {
        self.flag_range = flag_range;
        self
    }

    pub fn with_null_sentinel(mut self, sentinel: impl Into<String>) -> Self {
        self.null_sentinel = sentinel.into();
        self
    }

    pub fn to(&self) -> TimeUnit {
        self.to
    }

    pub fn from_units(&self) -> &[TimeUnit] {
        &self.from_units
    }

    pub fn null_sentinel(&self) -> &str {
        &self.null_sentinel
    }

    pub fn convert(&self, text: &str) -> Conversion {
        if text == self.null_sentinel {
            return Conversion::none();
        }
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Conversion::none();
        }

        let mut found = Candidates::default();
        for from in &self.from_units {
            found.extend(extract_candidates(&normalized, *from, self.to));
        }

        let flagged = self.flag_range && (self.wide(&found.ages) || self.wide(&found.durations));
        let value = aggregate(&found);
        tracing::debug!(
            text = normalized.as_str(),
            ages = ?found.ages,
            durations = ?found.durations,
            ?value,
            flagged,
            "converted time phrase"
        );
        Conversion { value, flagged }
    }

    fn wide(&self, values: &[f64]) -> bool {
        let threshold = self.to.range_flag_threshold();
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted
            .windows(2)
            .any(|pair| pair[1] - pair[0] > threshold)
    }
}

pub fn convert(text: &str, to: TimeUnit, from_units: &[TimeUnit], flag_range: bool) -> Conversion {
    TimeConverter::new(to, from_units.to_vec())
        .with_flag_range(flag_range)
        .convert(text)
}

fn aggregate(found: &Candidates) -> Option<f64> {
    let durations = found.durations.iter().sum::<f64>();
    let total = match (found.ages.is_empty(), found.durations.is_empty()) {
        (true, true) => return None,
        (true, false) => durations,
        (false, _) => found.ages.iter().sum::<f64>() / found.ages.len() as f64 + durations,
    };
    (total != 0.0).then_some(total)
}
