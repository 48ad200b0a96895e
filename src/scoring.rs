//! Pure prioritization math: RICE scores and OKR progress.
//!
//! Both functions are total over their numeric domain. The division guards
//! mean a degenerate input (zero effort, zero target) yields 0 rather than
//! an error or infinity, so callers never have to handle a failure path.

/// Classic RICE: Reach x Impact x Confidence / Effort.
///
/// No upper clamp is applied; scores above 100 are legitimate. A zero or
/// negative effort yields 0.
pub fn rice_score(reach: f64, impact: f64, confidence: f64, effort: f64) -> f64 {
    if effort > 0.0 {
        (reach * impact * confidence) / effort
    } else {
        0.0
    }
}

/// OKR completion as an integer percentage, clamped to 100.
///
/// Overshooting the target reports 100, not more. A zero or negative target
/// yields 0.
pub fn okr_progress(current: f64, target: f64) -> i64 {
    if target > 0.0 {
        (current / target * 100.0).round().min(100.0) as i64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rice_score_matches_formula() {
        assert_eq!(rice_score(2.0, 4.0, 5.0, 2.0), 20.0);
        assert_eq!(rice_score(8.0, 9.0, 7.0, 4.0), 126.0);
    }

    #[test]
    fn rice_score_is_zero_for_nonpositive_effort() {
        for reach in [0.0, 1.0, 10.0, 500.0] {
            for impact in [0.0, 3.0, 10.0] {
                assert_eq!(rice_score(reach, impact, 5.0, 0.0), 0.0);
                assert_eq!(rice_score(reach, impact, 5.0, -1.0), 0.0);
            }
        }
    }

    #[test]
    fn rice_score_is_not_clamped() {
        assert!(rice_score(10.0, 10.0, 10.0, 1.0) > 100.0);
    }

    #[test]
    fn rice_score_is_monotonic_in_each_input() {
        let samples = [1.0, 2.0, 5.0, 9.0];
        for &lo in &samples {
            for &hi in &samples {
                if lo > hi {
                    continue;
                }
                // Non-decreasing in reach, impact, confidence.
                assert!(rice_score(lo, 4.0, 4.0, 2.0) <= rice_score(hi, 4.0, 4.0, 2.0));
                assert!(rice_score(4.0, lo, 4.0, 2.0) <= rice_score(4.0, hi, 4.0, 2.0));
                assert!(rice_score(4.0, 4.0, lo, 2.0) <= rice_score(4.0, 4.0, hi, 2.0));
                // Non-increasing in effort.
                assert!(rice_score(4.0, 4.0, 4.0, lo) >= rice_score(4.0, 4.0, 4.0, hi));
            }
        }
    }

    #[test]
    fn progress_is_a_rounded_percentage() {
        assert_eq!(okr_progress(50.0, 100.0), 50);
        assert_eq!(okr_progress(1.0, 3.0), 33);
        assert_eq!(okr_progress(2.0, 3.0), 67);
        assert_eq!(okr_progress(50.0, 200.0), 25);
    }

    #[test]
    fn progress_clamps_at_one_hundred() {
        assert_eq!(okr_progress(150.0, 100.0), 100);
        assert_eq!(okr_progress(250.0, 200.0), 100);
        assert_eq!(okr_progress(100.0, 100.0), 100);
    }

    #[test]
    fn progress_is_zero_for_nonpositive_target() {
        assert_eq!(okr_progress(5.0, 0.0), 0);
        assert_eq!(okr_progress(5.0, -10.0), 0);
        assert_eq!(okr_progress(0.0, 0.0), 0);
    }
}
