//! Sense oracle: lexical relations between word senses.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::MatchResult;

/// How a source sense relates to a target sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenseRelation {
    Synonym,
    /// The source sense is more general than the target sense
    Hypernym,
    /// The source sense is more specific than the target sense
    Hyponym,
    Antonym,
    Unrelated,
}

impl SenseRelation {
    pub fn inverse(self) -> Self {
        match self {
            SenseRelation::Hypernym => SenseRelation::Hyponym,
            SenseRelation::Hyponym => SenseRelation::Hypernym,
            other => other,
        }
    }
}

/// Linguistic backend consulted by node matchers
pub trait SenseOracle: Send + Sync {
    fn relation(&self, source_sense: &str, target_sense: &str) -> MatchResult<SenseRelation>;
}

/// In-memory oracle built from explicit sense pairs.
///
/// Every pair is stored once and answered in both directions; identical
/// senses are always synonyms.
#[derive(Debug, Clone, Default)]
pub struct StaticOracle {
    relations: HashMap<(String, String), SenseRelation>,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        source_sense: impl Into<String>,
        relation: SenseRelation,
        target_sense: impl Into<String>,
    ) -> Self {
        self.insert(source_sense, relation, target_sense);
        self
    }

    pub fn insert(
        &mut self,
        source_sense: impl Into<String>,
        relation: SenseRelation,
        target_sense: impl Into<String>,
    ) {
        let source = source_sense.into();
        let target = target_sense.into();
        self.relations
            .insert((target.clone(), source.clone()), relation.inverse());
        self.relations.insert((source, target), relation);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }
}

impl SenseOracle for StaticOracle {
    fn relation(&self, source_sense: &str, target_sense: &str) -> MatchResult<SenseRelation> {
        if source_sense == target_sense {
            return Ok(SenseRelation::Synonym);
        }
        let key = (source_sense.to_owned(), target_sense.to_owned());
        Ok(self
            .relations
            .get(&key)
            .copied()
            .unwrap_or(SenseRelation::Unrelated))
    }
}
