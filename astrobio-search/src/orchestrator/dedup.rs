//! Result deduplication by title similarity.
//!
//! Two results are duplicates when their titles are equal after
//! case-folding and whitespace normalisation, or when the Jaccard overlap of
//! their lowercase alphanumeric title tokens exceeds
//! [`TOKEN_OVERLAP_THRESHOLD`]. One result survives per duplicate group and
//! occupies the position of the group's first-encountered member.
//!
//! Token overlap is not transitive, so an exact folded-title match always
//! takes precedence over an overlap match when choosing the group. Each
//! folded title therefore belongs to exactly one group.

use std::collections::BTreeSet;

use crate::types::{SearchResult, SourceKind};

/// Token-overlap ratio above which two titles are considered the same work.
pub const TOKEN_OVERLAP_THRESHOLD: f64 = 0.85;

/// Comparison keys derived once per title.
#[derive(Debug, Clone)]
struct TitleKey {
    folded: String,
    tokens: BTreeSet<String>,
}

impl TitleKey {
    fn new(title: &str) -> Self {
        Self {
            folded: fold_title(title),
            tokens: title_tokens(title),
        }
    }

    fn overlaps(&self, other: &TitleKey) -> bool {
        token_overlap(&self.tokens, &other.tokens) > TOKEN_OVERLAP_THRESHOLD
    }
}

struct Group {
    winner: SearchResult,
    members: Vec<TitleKey>,
}

impl Group {
    fn has_title(&self, key: &TitleKey) -> bool {
        self.members.iter().any(|member| member.folded == key.folded)
    }

    fn overlaps(&self, key: &TitleKey) -> bool {
        self.members.iter().any(|member| member.overlaps(key))
    }
}

/// Lowercase and collapse whitespace.
pub fn fold_title(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_tokens(title: &str) -> BTreeSet<String> {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Jaccard ratio `|a ∩ b| / |a ∪ b|`; 0.0 when both sets are empty.
fn token_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// `true` when `candidate` should replace `incumbent` as the group winner.
///
/// Local beats external; between externals the higher score wins; anything
/// else keeps the incumbent.
fn prefers(candidate: &SearchResult, incumbent: &SearchResult) -> bool {
    match (candidate.source_kind, incumbent.source_kind) {
        (SourceKind::Local, SourceKind::External) => true,
        (SourceKind::External, SourceKind::External) => {
            candidate.relevance_score > incumbent.relevance_score
        }
        _ => false,
    }
}

/// Remove near-duplicate results, keeping input order of group slots.
pub fn deduplicate(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut groups: Vec<Group> = Vec::with_capacity(results.len());

    for result in results {
        let key = TitleKey::new(&result.title);
        let slot = groups
            .iter()
            .position(|group| group.has_title(&key))
            .or_else(|| groups.iter().position(|group| group.overlaps(&key)));
        match slot.and_then(|i| groups.get_mut(i)) {
            Some(group) => {
                tracing::trace!(
                    kept = %group.winner.id,
                    duplicate = %result.id,
                    "duplicate title"
                );
                group.members.push(key);
                if prefers(&result, &group.winner) {
                    group.winner = result;
                }
            }
            None => groups.push(Group {
                winner: result,
                members: vec![key],
            }),
        }
    }

    groups.into_iter().map(|group| group.winner).collect()
}
