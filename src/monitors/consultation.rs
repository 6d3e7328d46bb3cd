//! Tribal consultation signal detection.
//!
//! Three signal tiers over the scored items: Dear Tribal Leader letters,
//! Executive Order 13175 references, and consultation-notice phrasing
//! (extended by configured keywords). At most one alert per signal type per
//! item; consultation signals are informational and never threaten programs.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::{Alert, AlertMetadata, Monitor, MonitorContext, Severity};
use crate::error::Result;

static DTLL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)dear tribal leader|\bDTLL\b").expect("Invalid regex")
});

static EO_13175_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)executive order 13175|e\.?\s?o\.?\s?13175").expect("Invalid regex")
});

static CONSULTATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tribal consultation|consultation (session|period|policy)|government-to-government")
        .expect("Invalid regex")
});

pub struct TribalConsultationMonitor;

impl Monitor for TribalConsultationMonitor {
    fn name(&self) -> &'static str {
        "tribal_consultation"
    }

    fn run(&self, ctx: &mut MonitorContext<'_>) -> Result<Vec<Alert>> {
        let mut alerts = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        for item in ctx.items {
            let text = item.search_text();

            let mut signals: Vec<&'static str> = Vec::new();
            if DTLL_PATTERN.is_match(&item.title) || DTLL_PATTERN.is_match(&item.abstract_text) {
                signals.push("dtll");
            }
            if EO_13175_PATTERN.is_match(&text) {
                signals.push("eo_13175");
            }
            if CONSULTATION_PATTERN.is_match(&text)
                || ctx
                    .config
                    .tribal_consultation
                    .keywords
                    .iter()
                    .any(|kw| text.contains(&kw.to_lowercase()))
            {
                signals.push("consultation_notice");
            }

            for signal in signals {
                let key = (signal.to_string(), item.key().to_string());
                if !seen.insert(key) {
                    continue;
                }
                alerts.push(
                    Alert::new(
                        self.name(),
                        Severity::Info,
                        format!("Consultation signal ({signal}): {}", item.title),
                        format!("{} item {} carries a {signal} signal.", item.source, item.source_id),
                    )
                    .with_programs(item.matched_programs.iter().cloned().collect())
                    .with_metadata(AlertMetadata::Consultation {
                        signal_type: signal.to_string(),
                        item: item.key().to_string(),
                    }),
                );
            }
        }

        Ok(alerts)
    }
}
