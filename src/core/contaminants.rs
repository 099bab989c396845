use aho_corasick::{AhoCorasick, MatchKind};
use memchr::memmem;

use crate::core::error::ReferenceError;

pub const NO_HIT: &str = "No Hit";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contaminant {
    pub name: String,
    pub seq: Vec<u8>,
}

/// Finds which known contaminant best explains an overrepresented sequence.
///
/// References at least as long as the query are checked first, in list
/// order, and the first one containing the query wins outright. Otherwise
/// the longest reference contained in the query is reported.
#[derive(Debug)]
pub struct ContaminantMatcher {
    refs: Vec<Contaminant>,
    automaton: Option<AhoCorasick>,
}

impl ContaminantMatcher {
    pub fn new(refs: Vec<Contaminant>) -> Result<Self, ReferenceError> {
        let refs: Vec<Contaminant> = refs.into_iter().filter(|c| !c.seq.is_empty()).collect();
        if refs.is_empty() {
            return Ok(Self::empty());
        }
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(refs.iter().map(|c| c.seq.as_slice()))?;
        Ok(Self {
            refs,
            automaton: Some(automaton),
        })
    }

    pub fn empty() -> Self {
        Self {
            refs: Vec::new(),
            automaton: None,
        }
    }

    pub fn len(&self) -> usize {
        self.refs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// Name of the best matching contaminant, or [`NO_HIT`].
    pub fn best_match(&self, seq: &[u8]) -> &str {
        if seq.is_empty() {
            return NO_HIT;
        }

        for c in &self.refs {
            if c.seq.len() >= seq.len() && memmem::find(&c.seq, seq).is_some() {
                return &c.name;
            }
        }

        let Some(automaton) = &self.automaton else {
            return NO_HIT;
        };
        let mut best: Option<usize> = None;
        for m in automaton.find_overlapping_iter(seq) {
            let idx = m.pattern().as_usize();
            let len = self.refs[idx].seq.len();
            if len >= seq.len() {
                continue;
            }
            best = match best {
                Some(b) if self.refs[b].seq.len() > len => Some(b),
                Some(b) if self.refs[b].seq.len() == len && b < idx => Some(b),
                _ => Some(idx),
            };
        }

        best.map_or(NO_HIT, |i| self.refs[i].name.as_str())
    }
}
