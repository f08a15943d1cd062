//! Best-candidate tracking as a fold over iteration results

use crate::scoring::Score;

/// A generated document together with how it scored
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub iteration: u32,
    pub html: String,
    pub score: Score,
}

/// Keep whichever candidate has the lower summed mismatch. Ties keep
/// `best`, the earlier one.
pub fn keep_better(best: Option<Candidate>, next: Candidate) -> Candidate {
    match best {
        Some(best) if best.score.total() <= next.score.total() => best,
        _ => next,
    }
}

/// Best candidate of a whole sequence
pub fn best_of(candidates: impl IntoIterator<Item = Candidate>) -> Option<Candidate> {
    candidates
        .into_iter()
        .fold(None, |best, next| Some(keep_better(best, next)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(iteration: u32, desktop: f64, mobile: f64) -> Candidate {
        Candidate {
            iteration,
            html: format!("<p>{}</p>", iteration),
            score: Score { desktop, mobile, passed: false },
        }
    }

    #[test]
    fn running_best_equals_prefix_minimum() {
        let sums = [(9.0, 4.0), (3.0, 5.0), (12.0, 1.0), (2.5, 5.5), (1.0, 1.0)];
        let mut best = None;
        for (k, (d, m)) in sums.iter().enumerate() {
            let next = candidate(k as u32 + 1, *d, *m);
            best = Some(keep_better(best, next));
            let prefix_min = sums[..=k]
                .iter()
                .map(|(d, m)| d + m)
                .fold(f64::INFINITY, f64::min);
            assert_eq!(best.as_ref().unwrap().score.total(), prefix_min);
        }
    }

    #[test]
    fn ties_keep_the_earlier_candidate() {
        let best = best_of(vec![candidate(1, 4.0, 4.0), candidate(2, 3.0, 5.0), candidate(3, 8.0, 0.0)]).unwrap();
        assert_eq!(best.iteration, 1);
    }

    #[test]
    fn empty_sequence_has_no_best() {
        assert!(best_of(Vec::new()).is_none());
    }
}
