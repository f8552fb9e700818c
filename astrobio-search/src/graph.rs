//! Knowledge-graph derivation for a single result.
//!
//! Summarises a result's tags and title as one central concept plus up to
//! [`MAX_CONNECTED_NODES`] connected nodes for graph-style display. Both the
//! category list and the keyword heuristics are plain data tables; the
//! functions here only walk them. Derivation is pure and deterministic.

use serde::{Deserialize, Serialize};

/// Central concept when no tag names a known category.
pub const DEFAULT_CENTRAL_CONCEPT: &str = "Space Research";

/// Upper bound on connected nodes.
pub const MAX_CONNECTED_NODES: usize = 4;

/// Priority of a tag-derived node that no rule names.
const UNRANKED_PRIORITY: u8 = 0;

/// Domain categories eligible as the central concept, highest priority first.
pub const CENTRAL_CATEGORIES: &[&str] = &[
    "Human Research",
    "Plant Biology",
    "Animal Biology",
    "Microbiology",
    "Cell Biology",
    "Space Radiation",
    "Physical Sciences",
    "Technology Development",
];

/// How a rule matches a title. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePredicate {
    /// Title contains any of the substrings.
    TitleContains(&'static [&'static str]),
    /// Title contains any of the words as a whole alphanumeric token.
    TitleWord(&'static [&'static str]),
}

impl NodePredicate {
    fn matches(&self, title_lower: &str, title_words: &[&str]) -> bool {
        match self {
            Self::TitleContains(needles) => needles.iter().any(|n| title_lower.contains(n)),
            Self::TitleWord(words) => words.iter().any(|w| title_words.contains(w)),
        }
    }
}

/// One keyword heuristic: when `predicate` matches, propose `node` with
/// `priority`. The priority also ranks a tag of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRule {
    pub predicate: NodePredicate,
    pub node: &'static str,
    pub priority: u8,
}

/// Keyword heuristics for connected nodes.
pub const NODE_RULES: &[NodeRule] = &[
    NodeRule {
        predicate: NodePredicate::TitleContains(&["technology", "hardware", "demonstration"]),
        node: "Technology Development",
        priority: 9,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["microgravity", "weightless"]),
        node: "Microgravity",
        priority: 8,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["radiation", "cosmic ray"]),
        node: "Space Radiation",
        priority: 7,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["plant", "arabidopsis", "seedling"]),
        node: "Plant Biology",
        priority: 6,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["cell"]),
        node: "Cell Biology",
        priority: 6,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["bone", "skeletal"]),
        node: "Bone Research",
        priority: 5,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["muscle"]),
        node: "Muscle Research",
        priority: 5,
    },
    NodeRule {
        predicate: NodePredicate::TitleWord(&["iss"]),
        node: "ISS Research",
        priority: 4,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["space station"]),
        node: "ISS Research",
        priority: 4,
    },
    NodeRule {
        predicate: NodePredicate::TitleWord(&["mice", "mouse", "rodent", "rodents", "rat", "rats"]),
        node: "Animal Biology",
        priority: 3,
    },
    NodeRule {
        predicate: NodePredicate::TitleContains(&["life support"]),
        node: "Life Support",
        priority: 3,
    },
];

/// Central concept and connected nodes for one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub central_concept: String,
    pub connected_nodes: Vec<String>,
}

/// Derive the graph using [`CENTRAL_CATEGORIES`] and [`NODE_RULES`].
pub fn derive_graph<T: AsRef<str>>(tags: &[T], title: &str) -> KnowledgeGraph {
    derive_graph_with(CENTRAL_CATEGORIES, NODE_RULES, tags, title)
}

/// Derive the graph from explicit tables.
///
/// The central concept is the first entry of `categories` named by any tag,
/// else [`DEFAULT_CENTRAL_CONCEPT`]. Connected node candidates are the
/// remaining tags in order, followed by the nodes of matching `rules` in
/// table order. Candidates are deduplicated case-insensitively, never repeat
/// the central concept, are stably sorted by priority (highest first) and
/// capped at [`MAX_CONNECTED_NODES`].
pub fn derive_graph_with<T: AsRef<str>>(
    categories: &[&str],
    rules: &[NodeRule],
    tags: &[T],
    title: &str,
) -> KnowledgeGraph {
    let tags: Vec<&str> = tags
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty())
        .collect();

    let central_concept = categories
        .iter()
        .find(|category| tags.iter().any(|tag| tag.eq_ignore_ascii_case(category)))
        .copied()
        .unwrap_or(DEFAULT_CENTRAL_CONCEPT)
        .to_owned();

    let title_lower = title.to_lowercase();
    let title_words: Vec<&str> = title_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let priority_of = |node: &str| {
        rules
            .iter()
            .find(|rule| rule.node.eq_ignore_ascii_case(node))
            .map_or(UNRANKED_PRIORITY, |rule| rule.priority)
    };

    let mut candidates: Vec<(String, u8)> = Vec::new();
    let mut push = |node: &str, priority: u8| {
        let duplicate = node.eq_ignore_ascii_case(&central_concept)
            || candidates
                .iter()
                .any(|(existing, _)| existing.eq_ignore_ascii_case(node));
        if !duplicate {
            candidates.push((node.to_owned(), priority));
        }
    };

    for tag in tags.iter().copied() {
        push(tag, priority_of(tag));
    }
    for rule in rules {
        if rule.predicate.matches(&title_lower, &title_words) {
            push(rule.node, rule.priority);
        }
    }

    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    let connected_nodes = candidates
        .into_iter()
        .take(MAX_CONNECTED_NODES)
        .map(|(node, _)| node)
        .collect();

    KnowledgeGraph {
        central_concept,
        connected_nodes,
    }
}
