//! Tier to percentage mapping.

use overuse_core::RiskTier;

/// What places a score inside its tier's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBasis {
    /// Model probability of the predicted class, in `[0, 1]`.
    Confidence(f64),
    /// Completed visits, used when the heuristic produced the tier.
    CompletedVisits(u32),
}

/// Inclusive percentage range for a known tier.
pub fn tier_bounds(tier: &RiskTier) -> Option<(u32, u32)> {
    match tier {
        RiskTier::NoRisk => Some((5, 15)),
        RiskTier::ModerateUse => Some((30, 50)),
        RiskTier::ModerateUseTrendingExcessive => Some((50, 75)),
        RiskTier::ExcessiveUse => Some((80, 100)),
        RiskTier::Unrecognized(_) => None,
    }
}

/// Completed-visit band of each tier under the heuristic thresholds.
fn visit_band(tier: &RiskTier) -> (u32, u32) {
    match tier {
        RiskTier::NoRisk => (0, 2),
        RiskTier::ModerateUse => (3, 4),
        RiskTier::ModerateUseTrendingExcessive => (5, 9),
        _ => (10, 20),
    }
}

/// Deterministic percentage inside the tier's bounds; 0 for unknown tiers.
pub fn risk_percent(tier: &RiskTier, basis: ScoreBasis) -> u32 {
    let Some((low, high)) = tier_bounds(tier) else {
        return 0;
    };

    let position = match basis {
        ScoreBasis::Confidence(p) if p.is_finite() => p,
        ScoreBasis::Confidence(_) => 0.5,
        ScoreBasis::CompletedVisits(done) => {
            let (first, last) = visit_band(tier);
            f64::from(done.saturating_sub(first)) / f64::from(last - first)
        }
    }
    .clamp(0.0, 1.0);

    low + (position * f64::from(high - low)).round() as u32
}

pub fn format_percent(percent: u32) -> String {
    format!("{percent}%")
}
