//! Shared statistic computation
//!
//! Both the team-side and player aggregators feed their populations through
//! the accumulators here, so kills/errors/efficiency/hit-type-percentage
//! logic exists exactly once. Ratios are undefined (None) whenever the
//! denominator is zero; no rounding happens here, only at report rendering.

use crate::{AttackStats, HitType, RallyOutcome};

/// Raw quotient, or None when the denominator is zero
pub fn ratio(numerator: i64, denominator: i64) -> Option<f64> {
    if denominator > 0 {
        Some(numerator as f64 / denominator as f64)
    } else {
        None
    }
}

/// Accumulates attacking results over a population of rows
#[derive(Debug, Clone, Default)]
pub struct AttackLine {
    kills: i64,
    hit_errors: i64,
    hits: i64,
    by_type: [i64; 7],
}

impl AttackLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row's outcome and hit classification
    ///
    /// Only rows with a non-null hit type count toward total hits, so the
    /// per-type percentages sum to exactly one whenever hits were recorded.
    pub fn record(&mut self, win_reason: Option<RallyOutcome>, hit_type: Option<HitType>) {
        match win_reason {
            Some(RallyOutcome::Kill) => self.kills += 1,
            Some(RallyOutcome::HitError) => self.hit_errors += 1,
            _ => {}
        }
        if let Some(ht) = hit_type {
            self.hits += 1;
            self.by_type[ht.index()] += 1;
        }
    }

    pub fn hits(&self) -> i64 {
        self.hits
    }

    /// (kills − hit errors) / hits
    pub fn hitting_efficiency(&self) -> Option<f64> {
        ratio(self.kills - self.hit_errors, self.hits)
    }

    /// Share of total hits for one hit type
    pub fn pct(&self, hit_type: HitType) -> Option<f64> {
        ratio(self.by_type[hit_type.index()], self.hits)
    }

    /// Snapshot into the column shape stored on the aggregate tables
    pub fn stats(&self) -> AttackStats {
        let mut pct = [None; 7];
        for ht in HitType::ALL {
            pct[ht.index()] = self.pct(ht);
        }
        AttackStats {
            total_kills: self.kills,
            total_hit_errors: self.hit_errors,
            total_hits: self.hits,
            hitting_efficiency: self.hitting_efficiency(),
            pct,
        }
    }
}

/// Accumulates serving results for one side
#[derive(Debug, Clone, Default)]
pub struct ServeLine {
    pub aces: i64,
    pub errors: i64,
}

impl ServeLine {
    pub fn record_ace(&mut self) {
        self.aces += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Aces per serve error, undefined with no errors
    pub fn ace_error_ratio(&self) -> Option<f64> {
        ratio(self.aces, self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(3, 0), None);
        assert_eq!(ratio(0, 0), None);
        assert_eq!(ratio(3, 4), Some(0.75));
        assert_eq!(ratio(-2, 4), Some(-0.5));
    }

    #[test]
    fn test_attack_line_scenario() {
        // One kill with a typed hit, one hit error without a hit type,
        // one tip with no outcome.
        let mut line = AttackLine::new();
        line.record(Some(RallyOutcome::Kill), Some(HitType::Hit));
        line.record(Some(RallyOutcome::HitError), None);
        line.record(None, Some(HitType::Tip));

        let stats = line.stats();
        assert_eq!(stats.total_kills, 1);
        assert_eq!(stats.total_hit_errors, 1);
        assert_eq!(stats.total_hits, 2);
        assert_eq!(stats.hitting_efficiency, Some(0.0));
        assert_eq!(stats.pct_of(HitType::Tip), Some(0.5));
        assert_eq!(stats.pct_of(HitType::Hit), Some(0.5));
        assert_eq!(stats.pct_of(HitType::Blocked), Some(0.0));
    }

    #[test]
    fn test_percentages_sum_to_one() {
        let mut line = AttackLine::new();
        line.record(None, Some(HitType::Tip));
        line.record(None, Some(HitType::Tip));
        line.record(Some(RallyOutcome::Kill), Some(HitType::Hit));
        line.record(None, Some(HitType::Overpass));
        // Outcome-only rows leave the denominator alone
        line.record(Some(RallyOutcome::HitError), None);
        line.record(Some(RallyOutcome::Tool), None);

        let stats = line.stats();
        assert_eq!(stats.total_hits, 4);
        let sum: f64 = HitType::ALL
            .iter()
            .filter_map(|ht| stats.pct_of(*ht))
            .sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_efficiency_formula_consistency() {
        let mut line = AttackLine::new();
        line.record(Some(RallyOutcome::Kill), Some(HitType::Hit));
        line.record(Some(RallyOutcome::Kill), Some(HitType::RollShot));
        line.record(Some(RallyOutcome::HitError), Some(HitType::Hit));
        line.record(None, Some(HitType::FreeBall));

        let stats = line.stats();
        let eff = stats.hitting_efficiency.unwrap();
        let recovered = eff * stats.total_hits as f64;
        assert!((recovered - (stats.total_kills - stats.total_hit_errors) as f64).abs() < 1e-9);
    }

    #[test]
    fn test_no_hits_means_undefined() {
        let mut line = AttackLine::new();
        line.record(Some(RallyOutcome::Kill), None);

        let stats = line.stats();
        assert_eq!(stats.total_kills, 1);
        assert_eq!(stats.total_hits, 0);
        assert_eq!(stats.hitting_efficiency, None);
        for ht in HitType::ALL {
            assert_eq!(stats.pct_of(ht), None);
        }
    }

    #[test]
    fn test_serve_line_ratio() {
        let mut serve = ServeLine::default();
        serve.record_ace();
        serve.record_ace();
        assert_eq!(serve.ace_error_ratio(), None);

        serve.record_error();
        assert_eq!(serve.ace_error_ratio(), Some(2.0));
    }
}
