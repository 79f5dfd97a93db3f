use serde::{Deserialize, Serialize};

use crate::error::{MatchError, MatchResult};
use crate::store::StoreKind;

// ─── Relation ────────────────────────────────────────────────────────────────

/// Semantic relation between a source node and a target node.
///
/// `Unknown` is the default, absent value and is never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    LessGeneral,
    MoreGeneral,
    Equivalence,
    Disjoint,
    #[default]
    Unknown,
}

impl Relation {
    pub const ALL: [Relation; 5] = [
        Relation::LessGeneral,
        Relation::MoreGeneral,
        Relation::Equivalence,
        Relation::Disjoint,
        Relation::Unknown,
    ];

    /// Conventional one-character symbol
    pub fn symbol(self) -> char {
        match self {
            Relation::LessGeneral => '<',
            Relation::MoreGeneral => '>',
            Relation::Equivalence => '=',
            Relation::Disjoint => '!',
            Relation::Unknown => '?',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.symbol() == c)
    }

    /// The relation seen from the target's side
    pub fn inverse(self) -> Self {
        match self {
            Relation::LessGeneral => Relation::MoreGeneral,
            Relation::MoreGeneral => Relation::LessGeneral,
            other => other,
        }
    }

    pub fn is_known(self) -> bool {
        self != Relation::Unknown
    }

    /// Compact code used by the relation stores; `Unknown` is always 0.
    pub(crate) fn code(self) -> u8 {
        match self {
            Relation::Unknown => 0,
            Relation::LessGeneral => 1,
            Relation::MoreGeneral => 2,
            Relation::Equivalence => 3,
            Relation::Disjoint => 4,
        }
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => Relation::LessGeneral,
            2 => Relation::MoreGeneral,
            3 => Relation::Equivalence,
            4 => Relation::Disjoint,
            _ => Relation::Unknown,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for Relation {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_symbol(c)
                .ok_or_else(|| MatchError::Config(format!("Unknown relation symbol: {s:?}"))),
            _ => Err(MatchError::Config(format!("Unknown relation symbol: {s:?}"))),
        }
    }
}

// ─── Progress Events ─────────────────────────────────────────────────────────

/// Events emitted during a matching run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    Started { run_id: String, total: u64 },
    Progress { percent: u8 },
    Finished { entries: usize, total: u64 },
    Cancelled { completed: u64, total: u64 },
    Failed { message: String },
}

// ─── Match Configuration ─────────────────────────────────────────────────────

/// Configuration for the matching orchestrators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Worker pool size. `None` sizes the pool to the available parallelism.
    #[serde(default)]
    pub max_threads: Option<usize>,
    /// Progress is only reported when the pair count exceeds this
    #[serde(default = "default_large_task_threshold")]
    pub large_task_threshold: u64,
    #[serde(default = "default_progress_step_percent")]
    pub progress_step_percent: u8,
    #[serde(default)]
    pub store: StoreKind,
    /// Largest cell count for which `StoreKind::Auto` picks the dense store
    #[serde(default = "default_dense_cell_limit")]
    pub dense_cell_limit: usize,
}

fn default_large_task_threshold() -> u64 {
    10_000
}

fn default_progress_step_percent() -> u8 {
    5
}

fn default_dense_cell_limit() -> usize {
    4_000_000
}

impl MatchConfig {
    pub fn new() -> Self {
        Self {
            max_threads: None,
            large_task_threshold: default_large_task_threshold(),
            progress_step_percent: default_progress_step_percent(),
            store: StoreKind::default(),
            dense_cell_limit: default_dense_cell_limit(),
        }
    }

    pub fn with_max_threads(mut self, threads: usize) -> Self {
        self.max_threads = Some(threads);
        self
    }

    pub fn with_large_task_threshold(mut self, pairs: u64) -> Self {
        self.large_task_threshold = pairs;
        self
    }

    pub fn with_progress_step(mut self, percent: u8) -> Self {
        self.progress_step_percent = percent;
        self
    }

    pub fn with_store(mut self, store: StoreKind) -> Self {
        self.store = store;
        self
    }

    pub fn with_dense_cell_limit(mut self, cells: usize) -> Self {
        self.dense_cell_limit = cells;
        self
    }

    /// Pool size after resolving `None` against the machine
    pub fn thread_count(&self) -> usize {
        self.max_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn validate(&self) -> MatchResult<()> {
        if self.max_threads == Some(0) {
            return Err(MatchError::Config("max_threads must be at least 1".into()));
        }
        if !(1..=100).contains(&self.progress_step_percent) {
            return Err(MatchError::Config(format!(
                "progress_step_percent must be within 1..=100, got {}",
                self.progress_step_percent
            )));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_default_is_unknown() {
        assert_eq!(Relation::default(), Relation::Unknown);
        assert!(!Relation::Unknown.is_known());
        assert!(Relation::Disjoint.is_known());
    }

    #[test]
    fn relation_symbols() {
        assert_eq!(Relation::LessGeneral.to_string(), "<");
        assert_eq!(Relation::MoreGeneral.to_string(), ">");
        assert_eq!("=".parse::<Relation>().unwrap(), Relation::Equivalence);
        assert_eq!(Relation::from_symbol('!'), Some(Relation::Disjoint));
        assert!("x".parse::<Relation>().is_err());
        assert!("<>".parse::<Relation>().is_err());
    }

    #[test]
    fn relation_inverse() {
        assert_eq!(Relation::LessGeneral.inverse(), Relation::MoreGeneral);
        assert_eq!(Relation::MoreGeneral.inverse(), Relation::LessGeneral);
        assert_eq!(Relation::Equivalence.inverse(), Relation::Equivalence);
        assert_eq!(Relation::Unknown.inverse(), Relation::Unknown);
    }

    #[test]
    fn relation_codes_are_stable() {
        for relation in Relation::ALL {
            assert_eq!(Relation::from_code(relation.code()), relation);
        }
        assert_eq!(Relation::Unknown.code(), 0);
    }

    #[test]
    fn relation_serializes_snake_case() {
        let json = serde_json::to_string(&Relation::LessGeneral).unwrap();
        assert_eq!(json, "\"less_general\"");
    }

    #[test]
    fn match_event_serializes() {
        let event = MatchEvent::Progress { percent: 25 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"progress\""));
        let back: MatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn config_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.max_threads, None);
        assert_eq!(config.large_task_threshold, 10_000);
        assert_eq!(config.progress_step_percent, 5);
        assert_eq!(config.store, StoreKind::Auto);
        assert!(config.thread_count() >= 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_partial_json() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"max_threads": 3, "store": "sparse"}"#).unwrap();
        assert_eq!(config.thread_count(), 3);
        assert_eq!(config.store, StoreKind::Sparse);
        assert_eq!(config.progress_step_percent, 5);
    }

    #[test]
    fn config_rejects_invalid_values() {
        assert!(MatchConfig::new().with_max_threads(0).validate().is_err());
        assert!(MatchConfig::new().with_progress_step(0).validate().is_err());
        assert!(MatchConfig::new().with_progress_step(101).validate().is_err());
    }
}
