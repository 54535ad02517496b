use anyhow::{Context, Result};
use regex::Regex;

/// Longer durations are treated as unparseable page noise.
pub const MAX_RECIPE_MINUTES: u32 = 7 * 24 * 60;

pub struct DurationPatterns {
    iso: Regex,
    hours: Regex,
    minutes: Regex,
    labelled: Regex,
    servings: Regex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecipeTimes {
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub total_minutes: Option<u32>,
}

impl DurationPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            iso: Regex::new(
                r"(?i)^P(?:(?P<d>\d+)D)?(?:T(?:(?P<h>\d+(?:\.\d+)?)H)?(?:(?P<m>\d+(?:\.\d+)?)M)?(?:(?P<s>\d+(?:\.\d+)?)S)?)?$",
            )
            .context("failed to compile iso duration regex")?,
            hours: Regex::new(r"(?i)(?P<n>\d+(?:\.\d+)?)\s*(?:hours?|hrs?)\b")
                .context("failed to compile hours regex")?,
            minutes: Regex::new(r"(?i)(?P<n>\d+)\s*(?:minutes?|mins?)\b")
                .context("failed to compile minutes regex")?,
            labelled: Regex::new(
                r"(?i)\b(?P<label>prep(?:aration)?|cook(?:ing)?|total)(?:\s*time)?\s*[:\-]?\s*(?P<value>PT[0-9.HMS]+|\d+(?:\.\d+)?\s*(?:hours?|hrs?|minutes?|mins?)\b(?:\s*(?:and\s+)?\d+\s*(?:minutes?|mins?)\b)?)",
            )
            .context("failed to compile labelled time regex")?,
            servings: Regex::new(
                r"(?i)\b(?:serves|servings|yields?|makes)\b\s*[:\-]?\s*(?:about\s+)?(?P<n>\d{1,3})\b",
            )
            .context("failed to compile servings regex")?,
        })
    }

    /// Parses either compact ISO 8601 notation (`PT1H30M`) or free text (`1 hour 30 minutes`).
    pub fn parse_minutes(&self, value: &str) -> Option<u32> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        if let Some(captures) = self.iso.captures(trimmed) {
            let part = |name: &str| {
                captures
                    .name(name)
                    .and_then(|m| m.as_str().parse::<f64>().ok())
                    .unwrap_or(0.0)
            };
            let minutes = part("d") * 1440.0 + part("h") * 60.0 + part("m") + part("s") / 60.0;
            return positive_minutes(minutes);
        }

        let hours = self
            .hours
            .captures(trimmed)
            .and_then(|c| c["n"].parse::<f64>().ok())
            .unwrap_or(0.0);
        let minutes = self
            .minutes
            .captures(trimmed)
            .and_then(|c| c["n"].parse::<f64>().ok())
            .unwrap_or(0.0);

        positive_minutes(hours * 60.0 + minutes)
    }

    pub fn find_times(&self, text: &str) -> RecipeTimes {
        let mut times = RecipeTimes::default();

        for captures in self.labelled.captures_iter(text) {
            let label = captures["label"].to_ascii_lowercase();
            let Some(minutes) = self.parse_minutes(&captures["value"]) else {
                continue;
            };
            let slot = if label.starts_with("prep") {
                &mut times.prep_minutes
            } else if label.starts_with("cook") {
                &mut times.cook_minutes
            } else {
                &mut times.total_minutes
            };
            if slot.is_none() {
                *slot = Some(minutes);
            }
        }

        if times.total_minutes.is_none() {
            if let (Some(prep), Some(cook)) = (times.prep_minutes, times.cook_minutes) {
                times.total_minutes = total_of(prep, cook);
            }
        }

        times
    }

    pub fn find_servings(&self, text: &str) -> Option<u32> {
        self.servings
            .captures(text)
            .and_then(|c| c["n"].parse::<u32>().ok())
            .filter(|value| *value > 0)
    }
}

pub fn total_of(prep: u32, cook: u32) -> Option<u32> {
    prep.checked_add(cook)
        .filter(|total| *total <= MAX_RECIPE_MINUTES)
}

fn positive_minutes(minutes: f64) -> Option<u32> {
    let rounded = minutes.round();
    if !rounded.is_finite() || rounded <= 0.0 || rounded > f64::from(MAX_RECIPE_MINUTES) {
        return None;
    }
    Some(rounded as u32)
}
