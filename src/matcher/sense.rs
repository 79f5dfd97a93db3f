//! Concept-based node matcher.
//!
//! The concept of a node is the conjunction of the atomic concepts on its
//! root path. Sense relations between source and target atomic concepts
//! become background axioms, and each candidate relation is decided by an
//! unsatisfiability test:
//!
//! | Relation      | Unsatisfiable problem |
//! |---------------|-----------------------|
//! | LessGeneral   | axioms ∧ S ∧ ¬T       |
//! | MoreGeneral   | axioms ∧ T ∧ ¬S       |
//! | Equivalence   | both of the above     |
//! | Disjoint      | axioms ∧ S ∧ T        |

use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::MatchResult;
use crate::oracle::{SenseOracle, SenseRelation};
use crate::solver::SatSolver;
use crate::tree::AtomicConcept;
use crate::types::Relation;

use super::{NodeMatcher, NodeRef};

pub struct SenseNodeMatcher {
    oracle: Arc<dyn SenseOracle>,
    solver: Arc<dyn SatSolver>,
}

impl SenseNodeMatcher {
    /// `solver` is usually a shared [`crate::solver::SatDecisionCache`]
    pub fn new(oracle: Arc<dyn SenseOracle>, solver: Arc<dyn SatSolver>) -> Self {
        Self { oracle, solver }
    }

    /// Strongest relation over all sense pairs of two atomic concepts
    fn concept_relation(
        &self,
        source: &AtomicConcept,
        target: &AtomicConcept,
    ) -> MatchResult<SenseRelation> {
        if source.senses.is_empty() || target.senses.is_empty() {
            return Ok(if source.token.eq_ignore_ascii_case(&target.token) {
                SenseRelation::Synonym
            } else {
                SenseRelation::Unrelated
            });
        }

        let mut best = SenseRelation::Unrelated;
        for s in &source.senses {
            for t in &target.senses {
                let relation = self.oracle.relation(s, t)?;
                if rank(relation) > rank(best) {
                    best = relation;
                }
                if best == SenseRelation::Synonym {
                    return Ok(best);
                }
            }
        }
        Ok(best)
    }

    fn unsatisfiable(&self, problem: &Problem, extra: &[Vec<i32>]) -> MatchResult<bool> {
        Ok(!self.solver.is_satisfiable(&problem.dimacs(extra))?)
    }
}

fn rank(relation: SenseRelation) -> u8 {
    match relation {
        SenseRelation::Synonym => 4,
        SenseRelation::Hyponym => 3,
        SenseRelation::Hypernym => 2,
        SenseRelation::Antonym => 1,
        SenseRelation::Unrelated => 0,
    }
}

/// Variables `1..=source` belong to source concepts, the rest to target ones
struct Problem {
    source: i32,
    target: i32,
    axioms: Vec<Vec<i32>>,
}

impl Problem {
    fn source_vars(&self) -> impl Iterator<Item = i32> {
        1..=self.source
    }

    fn target_vars(&self) -> impl Iterator<Item = i32> {
        (self.source + 1)..=(self.source + self.target)
    }

    fn dimacs(&self, extra: &[Vec<i32>]) -> String {
        let clauses = self.axioms.iter().chain(extra);
        let mut out = format!(
            "p cnf {} {}\n",
            self.source + self.target,
            self.axioms.len() + extra.len()
        );
        for clause in clauses {
            for literal in clause {
                let _ = write!(out, "{literal} ");
            }
            out.push_str("0\n");
        }
        out
    }

    /// All vars of one side as unit clauses, plus the negation of the other side
    fn implication_test(
        holds: impl Iterator<Item = i32>,
        fails: impl Iterator<Item = i32>,
    ) -> Vec<Vec<i32>> {
        let mut clauses: Vec<Vec<i32>> = holds.map(|v| vec![v]).collect();
        clauses.push(fails.map(|v| -v).collect());
        clauses
    }
}

impl NodeMatcher for SenseNodeMatcher {
    fn match_nodes(&self, source: NodeRef<'_>, target: NodeRef<'_>) -> MatchResult<Relation> {
        let source_concepts = source.path_concepts();
        let target_concepts = target.path_concepts();
        if source_concepts.is_empty() || target_concepts.is_empty() {
            return Ok(Relation::Unknown);
        }

        let offset = source_concepts.len() as i32;
        let mut problem = Problem {
            source: offset,
            target: target_concepts.len() as i32,
            axioms: Vec::new(),
        };
        for (i, s) in source_concepts.iter().enumerate() {
            let a = i as i32 + 1;
            for (j, t) in target_concepts.iter().enumerate() {
                let b = offset + j as i32 + 1;
                match self.concept_relation(s, t)? {
                    SenseRelation::Synonym => {
                        problem.axioms.push(vec![-a, b]);
                        problem.axioms.push(vec![a, -b]);
                    }
                    SenseRelation::Hyponym => problem.axioms.push(vec![-a, b]),
                    SenseRelation::Hypernym => problem.axioms.push(vec![a, -b]),
                    SenseRelation::Antonym => problem.axioms.push(vec![-a, -b]),
                    SenseRelation::Unrelated => {}
                }
            }
        }

        let less = self.unsatisfiable(
            &problem,
            &Problem::implication_test(problem.source_vars(), problem.target_vars()),
        )?;
        let more = self.unsatisfiable(
            &problem,
            &Problem::implication_test(problem.target_vars(), problem.source_vars()),
        )?;

        let relation = match (less, more) {
            (true, true) => Relation::Equivalence,
            (true, false) => Relation::LessGeneral,
            (false, true) => Relation::MoreGeneral,
            (false, false) => {
                let both: Vec<Vec<i32>> = problem
                    .source_vars()
                    .chain(problem.target_vars())
                    .map(|v| vec![v])
                    .collect();
                if self.unsatisfiable(&problem, &both)? {
                    Relation::Disjoint
                } else {
                    Relation::Unknown
                }
            }
        };
        Ok(relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatchError;
    use crate::oracle::StaticOracle;
    use crate::solver::{DpllSolver, SatDecisionCache};
    use crate::tree::{NodeId, Tree};

    fn concept(token: &str) -> AtomicConcept {
        AtomicConcept::new(token).with_sense(format!("{token}#1"))
    }

    fn matcher(oracle: StaticOracle) -> SenseNodeMatcher {
        SenseNodeMatcher::new(
            Arc::new(oracle),
            Arc::new(SatDecisionCache::new(Arc::new(DpllSolver::new()))),
        )
    }

    fn single(label: &str, tokens: &[&str]) -> Tree {
        let mut tree = Tree::new(label);
        tree.annotate(tree.root(), tokens.iter().map(|t| concept(t)).collect())
            .unwrap();
        tree
    }

    fn classify(m: &SenseNodeMatcher, source: &Tree, s: NodeId, target: &Tree, t: NodeId) -> Relation {
        m.match_nodes(NodeRef::new(source, s), NodeRef::new(target, t))
            .unwrap()
    }

    #[test]
    fn same_concept_is_equivalent() {
        let m = matcher(StaticOracle::new());
        let a = single("Courses", &["course"]);
        let b = single("Course", &["course"]);
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::Equivalence);
    }

    #[test]
    fn deeper_target_is_less_general_than_source() {
        let m = matcher(StaticOracle::new());
        let source = single("Courses", &["course"]);
        let mut target = single("Course", &["course"]);
        let english = target.add_child(target.root(), "English").unwrap();
        target.annotate(english, vec![concept("english")]).unwrap();

        assert_eq!(
            classify(&m, &source, source.root(), &target, english),
            Relation::MoreGeneral
        );
        assert_eq!(
            classify(&m, &target, english, &source, source.root()),
            Relation::LessGeneral
        );
    }

    #[test]
    fn hyponym_sense_makes_less_general() {
        let oracle =
            StaticOracle::new().with("poodle#1", SenseRelation::Hyponym, "dog#1");
        let m = matcher(oracle);
        let a = single("Poodle", &["poodle"]);
        let b = single("Dog", &["dog"]);
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::LessGeneral);
        assert_eq!(classify(&m, &b, b.root(), &a, a.root()), Relation::MoreGeneral);
    }

    #[test]
    fn antonym_sense_makes_disjoint() {
        let oracle = StaticOracle::new().with("hot#1", SenseRelation::Antonym, "cold#1");
        let m = matcher(oracle);
        let a = single("Hot", &["hot"]);
        let b = single("Cold", &["cold"]);
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::Disjoint);
    }

    #[test]
    fn unrelated_concepts_are_unknown() {
        let m = matcher(StaticOracle::new());
        let a = single("Music", &["music"]);
        let b = single("Law", &["law"]);
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::Unknown);
    }

    #[test]
    fn nodes_without_concepts_are_unknown() {
        let m = matcher(StaticOracle::new());
        let a = Tree::new("Courses");
        let b = single("Course", &["course"]);
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::Unknown);
    }

    #[test]
    fn tokens_without_senses_compare_lexically() {
        let m = matcher(StaticOracle::new());
        let mut a = Tree::new("Course");
        a.annotate(a.root(), vec![AtomicConcept::new("Course")]).unwrap();
        let mut b = Tree::new("course");
        b.annotate(b.root(), vec![AtomicConcept::new("course")]).unwrap();
        assert_eq!(classify(&m, &a, a.root(), &b, b.root()), Relation::Equivalence);
    }

    #[test]
    fn identical_structures_reuse_cached_verdicts() {
        let cache = Arc::new(SatDecisionCache::new(Arc::new(DpllSolver::new())));
        let m = SenseNodeMatcher::new(Arc::new(StaticOracle::new()), cache.clone());
        let a = single("Courses", &["course"]);
        let b = single("Course", &["course"]);
        let c = single("Class", &["class"]);
        let d = single("Classes", &["class"]);

        classify(&m, &a, a.root(), &b, b.root());
        let misses = cache.misses();
        classify(&m, &c, c.root(), &d, d.root());
        assert_eq!(cache.misses(), misses);
        assert!(cache.hits() >= 2);
    }

    struct BrokenOracle;

    impl SenseOracle for BrokenOracle {
        fn relation(&self, _s: &str, _t: &str) -> MatchResult<SenseRelation> {
            Err(MatchError::Oracle("dictionary unavailable".into()))
        }
    }

    #[test]
    fn oracle_failure_propagates() {
        let m = SenseNodeMatcher::new(Arc::new(BrokenOracle), Arc::new(DpllSolver::new()));
        let a = single("Courses", &["course"]);
        let b = single("Course", &["course"]);
        let err = m
            .match_nodes(NodeRef::new(&a, a.root()), NodeRef::new(&b, b.root()))
            .unwrap_err();
        assert!(matches!(err, MatchError::Oracle(_)));
    }
}
