//! # Router Module
//!
//! The route index: a segment trie built once from the registry, matched
//! against decoded request paths on the hot path.
//!
//! A lookup returns *every* entry whose pattern covers the path, ordered by
//! specificity rank; the dispatcher walks that list to pick (or negotiate)
//! the handler. Rank is a pure function of the pattern: one class per
//! matchable segment (`0` literal, `1` param, `2` required rest, `3`
//! optional rest), compared lexicographically with shorter prefixes first,
//! registration order breaking exact ties. Group segments are invisible to
//! both the trie and the rank.

mod matcher;
mod trie;

pub use matcher::{rank_vector, MatchCandidate};
pub use trie::TrieIndex;

use smallvec::SmallVec;
use std::sync::Arc;

/// Bound path parameters for a match. Sized for the common case of a
/// handful of params without a heap allocation.
pub type ParamVec = SmallVec<[(Arc<str>, String); 8]>;

/// Specificity rank: one class per matchable segment.
pub type RankVec = SmallVec<[u8; 8]>;

pub(crate) const RANK_LITERAL: u8 = 0;
pub(crate) const RANK_PARAM: u8 = 1;
pub(crate) const RANK_REST_REQUIRED: u8 = 2;
pub(crate) const RANK_REST_OPTIONAL: u8 = 3;
