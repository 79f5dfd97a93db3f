//! Reference DIMACS CNF solver.
//!
//! Plain DPLL with unit propagation. Matching problems are small (a handful
//! of variables per node path), so no clause learning is attempted.

use crate::error::{MatchError, MatchResult};

use super::SatSolver;

type Clause = Vec<i32>;

#[derive(Debug, Clone, Default)]
pub struct DpllSolver;

impl DpllSolver {
    pub fn new() -> Self {
        Self
    }
}

impl SatSolver for DpllSolver {
    fn is_satisfiable(&self, problem: &str) -> MatchResult<bool> {
        let clauses = parse_dimacs(problem)?;
        Ok(solve(clauses))
    }
}

/// Parse `p cnf <vars> <clauses>` text into clause lists
pub fn parse_dimacs(problem: &str) -> MatchResult<Vec<Clause>> {
    let mut declared: Option<(usize, usize)> = None;
    let mut clauses = Vec::new();
    let mut current: Clause = Vec::new();

    for line in problem.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('c') {
            continue;
        }
        if line.starts_with('%') {
            break;
        }
        if let Some(header) = line.strip_prefix('p') {
            if declared.is_some() {
                return Err(MatchError::Solver("duplicate problem line".into()));
            }
            declared = Some(parse_header(header)?);
            continue;
        }
        let (vars, _) = declared
            .ok_or_else(|| MatchError::Solver("clause before problem line".into()))?;
        for token in line.split_whitespace() {
            let literal: i32 = token
                .parse()
                .map_err(|_| MatchError::Solver(format!("invalid literal {token:?}")))?;
            if literal == 0 {
                clauses.push(std::mem::take(&mut current));
            } else if literal.unsigned_abs() as usize > vars {
                return Err(MatchError::Solver(format!(
                    "literal {literal} exceeds declared variable count {vars}"
                )));
            } else {
                current.push(literal);
            }
        }
    }

    if declared.is_none() {
        return Err(MatchError::Solver("missing problem line".into()));
    }
    if !current.is_empty() {
        clauses.push(current);
    }
    Ok(clauses)
}

fn parse_header(header: &str) -> MatchResult<(usize, usize)> {
    let fields: Vec<&str> = header.split_whitespace().collect();
    match fields.as_slice() {
        ["cnf", vars, count] => {
            let vars = vars
                .parse()
                .map_err(|_| MatchError::Solver(format!("invalid variable count {vars:?}")))?;
            let count = count
                .parse()
                .map_err(|_| MatchError::Solver(format!("invalid clause count {count:?}")))?;
            Ok((vars, count))
        }
        _ => Err(MatchError::Solver(format!(
            "unsupported problem line: p{header}"
        ))),
    }
}

/// Assign `literal` true: drop satisfied clauses, shrink the rest.
/// Returns `None` when a clause becomes empty.
fn assign(clauses: &[Clause], literal: i32) -> Option<Vec<Clause>> {
    let mut out = Vec::with_capacity(clauses.len());
    for clause in clauses {
        if clause.contains(&literal) {
            continue;
        }
        let reduced: Clause = clause.iter().copied().filter(|&l| l != -literal).collect();
        if reduced.is_empty() {
            return None;
        }
        out.push(reduced);
    }
    Some(out)
}

fn solve(mut clauses: Vec<Clause>) -> bool {
    if clauses.iter().any(Vec::is_empty) {
        return false;
    }
    while let Some(unit) = clauses.iter().find(|c| c.len() == 1).map(|c| c[0]) {
        match assign(&clauses, unit) {
            Some(next) => clauses = next,
            None => return false,
        }
    }
    let Some(&branch) = clauses.first().and_then(|c| c.first()) else {
        return true;
    };
    [branch, -branch]
        .into_iter()
        .any(|literal| assign(&clauses, literal).is_some_and(solve))
}
