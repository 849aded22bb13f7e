//! Human-readable fallback names for raw SMC keys

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// First match wins, so specific keys must precede the generic patterns.
static NAME_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"^TC0P$", "CPU Proximity"),
        (r"^TC0D$", "CPU Die"),
        (r"^TG0D$", "GPU Die"),
        (r"^TC(\d)E$", "CPU Efficiency Core {n}"),
        (r"^TC(\d)P$", "CPU Performance Core {n}"),
        (r"^TC(\d)C$", "CPU Core {n}"),
        (r"^TG(\d)P$", "GPU Cluster {n}"),
        (r"^TB(\d)T$", "Battery {n}"),
        (r"^TA(\d)P$", "Ambient {n}"),
        (r"^F(\d)Ac$", "Fan {n}"),
        (r"^Th(\d)H$", "Heatsink {n}"),
        (r"^Tm(\d)P$", "Mainboard {n}"),
        (r"^Ts(\d)P$", "Palm Rest {n}"),
    ]
    .into_iter()
    .filter_map(|(pattern, template)| match Regex::new(pattern) {
        Ok(regex) => Some((regex, template)),
        Err(e) => {
            tracing::error!(pattern, error = %e, "invalid SMC name pattern");
            None
        },
    })
    .collect()
});

fn render(template: &str, captures: &Captures<'_>) -> String {
    match captures.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
        // Keys are zero-based, display names one-based
        Some(index) => template.replace("{n}", &(index + 1).to_string()),
        None => template.to_string(),
    }
}

/// Display name for an SMC key, or `None` when no pattern matches
pub fn friendly_name(key: &str) -> Option<String> {
    NAME_PATTERNS
        .iter()
        .find_map(|(regex, template)| regex.captures(key).map(|captures| render(template, &captures)))
}
