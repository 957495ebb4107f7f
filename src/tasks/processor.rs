use crate::domain::Verdict;

use super::registry::SeenRegistry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub suppressed: usize,
    pub detached: usize,
    pub missing: usize,
}

/// Resolves verdicts back to registered items and suppresses them.
///
/// A verdict that cannot be resolved is logged and skipped; it never stops
/// the remaining verdicts from being applied.
pub fn apply_verdicts(registry: &SeenRegistry, verdicts: &[Verdict], opacity: f32) -> ApplyReport {
    let mut report = ApplyReport::default();

    for verdict in verdicts {
        let Some(item) = registry.get(verdict.id) else {
            tracing::error!(
                target: "applier",
                id = %verdict.id,
                topic = %verdict.topic,
                "couldn't find flagged item"
            );
            report.missing += 1;
            continue;
        };

        if !item.handle.suppress(opacity) {
            tracing::warn!(
                target: "applier",
                id = %item.id,
                topic = %verdict.topic,
                "flagged item is no longer displayed"
            );
            report.detached += 1;
            continue;
        }

        tracing::info!(
            target: "applier",
            id = %item.id,
            text = %item.text,
            topic = %verdict.topic,
            "item suppressed"
        );
        report.suppressed += 1;
    }

    report
}
