//! Satisfiability solving and the memoizing decision cache.

pub mod dpll;

pub use dpll::DpllSolver;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::MatchResult;

/// Decides satisfiability of a problem in DIMACS CNF text form
pub trait SatSolver: Send + Sync {
    fn is_satisfiable(&self, problem: &str) -> MatchResult<bool>;
}

/// Memoizes solver verdicts by exact problem text.
///
/// Entries are never evicted and keys are not normalized: two problems that
/// differ only in formatting are solved separately. Two callers missing on
/// the same text at the same time may both invoke the solver; the verdicts
/// are equal, so the later insert is harmless.
pub struct SatDecisionCache {
    solver: Arc<dyn SatSolver>,
    verdicts: DashMap<String, bool>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SatDecisionCache {
    pub fn new(solver: Arc<dyn SatSolver>) -> Self {
        Self {
            solver,
            verdicts: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_satisfiable(&self, problem: &str) -> MatchResult<bool> {
        // the map guard must be released before the solver runs
        if let Some(verdict) = self.verdicts.get(problem).map(|v| *v.value()) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(verdict);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let verdict = self.solver.is_satisfiable(problem)?;
        tracing::debug!(
            problem_len = problem.len(),
            verdict,
            "sat cache miss"
        );
        self.verdicts.insert(problem.to_owned(), verdict);
        Ok(verdict)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of cached verdicts
    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }
}

impl SatSolver for SatDecisionCache {
    fn is_satisfiable(&self, problem: &str) -> MatchResult<bool> {
        SatDecisionCache::is_satisfiable(self, problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use std::sync::atomic::AtomicUsize;

    struct CountingSolver {
        calls: AtomicUsize,
        verdict: bool,
    }

    impl CountingSolver {
        fn new(verdict: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                verdict,
            }
        }
    }

    impl SatSolver for CountingSolver {
        fn is_satisfiable(&self, _problem: &str) -> MatchResult<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.verdict)
        }
    }

    struct FailingSolver;

    impl SatSolver for FailingSolver {
        fn is_satisfiable(&self, _problem: &str) -> MatchResult<bool> {
            Err(MatchError::Solver("engine crashed".into()))
        }
    }

    #[test]
    fn repeated_problem_hits_cache() {
        let solver = Arc::new(CountingSolver::new(true));
        let cache = SatDecisionCache::new(solver.clone());

        let first = cache.is_satisfiable("p").unwrap();
        let second = cache.is_satisfiable("p").unwrap();

        assert_eq!(first, second);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_are_verbatim() {
        let solver = Arc::new(CountingSolver::new(false));
        let cache = SatDecisionCache::new(solver.clone());

        cache.is_satisfiable("p cnf 1 1\n1 0\n").unwrap();
        cache.is_satisfiable("p cnf 1 1\n 1 0\n").unwrap();

        assert_eq!(solver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn solver_error_is_forwarded_and_not_cached() {
        let cache = SatDecisionCache::new(Arc::new(FailingSolver));
        let err = cache.is_satisfiable("p").unwrap_err();
        assert!(matches!(err, MatchError::Solver(_)));
        assert!(cache.is_empty());
    }

    #[test]
    fn concurrent_callers_share_verdicts() {
        let solver = Arc::new(CountingSolver::new(true));
        let cache = Arc::new(SatDecisionCache::new(solver.clone()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        assert!(cache.is_satisfiable(&format!("problem {i}")).unwrap());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 50);
        // racing misses may solve a problem more than once, never less
        let calls = solver.calls.load(Ordering::SeqCst);
        assert!((50..=400).contains(&calls));
        assert_eq!(cache.hits() + cache.misses(), 400);
    }

    #[test]
    fn cache_stacks_as_solver() {
        let inner = Arc::new(SatDecisionCache::new(Arc::new(DpllSolver::new())));
        let outer = SatDecisionCache::new(inner.clone());
        assert!(!outer.is_satisfiable("p cnf 1 2\n1 0\n-1 0\n").unwrap());
        assert_eq!(inner.len(), 1);
    }
}
