//! Heuristic maximum common subgraph extraction
//!
//! Scores every residue pairing between the two glycans, then walks both
//! trees in lockstep from the best-scoring pair, copying the matched
//! branches into a new glycan. This is the tree-matching approach of Aoki
//! et al. (Genome Informatics, 2003) rather than an exhaustive search, so
//! the result is a good common subtree, not a guaranteed maximum

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use rust_decimal::Decimal;

use super::similarity::{best_assignment, monosaccharide_similarity, SimilarityOptions};
use crate::{CommonSubgraph, Glycan, NodeId, Result};

impl CommonSubgraph {
    /// The total similarity score of the matched residue pairs
    #[must_use]
    pub const fn score(&self) -> Decimal {
        self.score
    }

    /// The shared structure, copied out of the first glycan
    #[must_use]
    pub const fn tree(&self) -> &Glycan {
        &self.tree
    }
}

/// Finds the largest substructure the two glycans have in common
///
/// With `exact` set, residue pairs only count when they match perfectly;
/// otherwise each pair contributes its fractional similarity and the best
/// available partner is taken at every branch. Returns [`None`] when no
/// residue pair scores above zero
pub fn maximum_common_subgraph(
    a: &Glycan,
    b: &Glycan,
    exact: bool,
) -> Result<Option<CommonSubgraph>> {
    let mut best: Option<(Decimal, NodeId, NodeId)> = None;
    for &an in a.residue_ids() {
        for &bn in b.residue_ids() {
            let mut visited = HashSet::new();
            let score = compare_nodes(a, an, b, bn, exact, &mut visited)?;
            if score > Decimal::ZERO && best.is_none_or(|(top, _, _)| score > top) {
                best = Some((score, an, bn));
            }
        }
    }

    let Some((score, an, bn)) = best else {
        return Ok(None);
    };
    let tree = extract_common_subgraph(a, an, b, bn, exact)?;
    Ok(Some(CommonSubgraph { score, tree }))
}

// ---------------------------------------------------------------------------------------------------------------------

// Scores the rooted pair `(an, bn)` plus the best non-overlapping
// assignment of their children, deduplicated through `visited`
fn compare_nodes(
    a: &Glycan,
    an: NodeId,
    b: &Glycan,
    bn: NodeId,
    exact: bool,
    visited: &mut HashSet<(NodeId, NodeId)>,
) -> Result<Decimal> {
    if !visited.insert((an, bn)) {
        return Ok(Decimal::ZERO);
    }

    let options = SimilarityOptions::default();
    let (observed, expected) = monosaccharide_similarity(a, an, b, bn, &options)?;
    let mut score = if exact {
        Decimal::from(u32::from(observed == expected))
    } else if expected == 0 {
        Decimal::ZERO
    } else {
        Decimal::from(observed) / Decimal::from(expected)
    };

    let mut pair_scores = HashMap::new();
    for (_, a_child) in a.children(an) {
        for (_, b_child) in b.children(bn) {
            let child_score = compare_nodes(a, a_child, b, b_child, exact, visited)?;
            pair_scores.insert((a_child, b_child), child_score);
        }
    }
    for pair in best_assignment(&pair_scores, SimilarityOptions::DEFAULT_ASSIGNMENT_LIMIT)? {
        score += pair_scores.get(&pair).copied().unwrap_or_default();
    }
    Ok(score)
}

fn subtree_depth(glycan: &Glycan, node: NodeId) -> usize {
    1 + glycan
        .children(node)
        .into_iter()
        .map(|(_, child)| subtree_depth(glycan, child))
        .max()
        .unwrap_or(0)
}

// Walks both glycans together from the matched roots, claiming the best
// unclaimed partner for each branch, then copies the claimed residues (and
// their substituents) out of `a`
fn extract_common_subgraph(
    a: &Glycan,
    root_a: NodeId,
    b: &Glycan,
    root_b: NodeId,
    exact: bool,
) -> Result<Glycan> {
    let options = SimilarityOptions {
        include_children: true,
        ..SimilarityOptions::default()
    };

    let mut chosen = HashSet::new();
    chosen.insert(root_a);
    let mut b_taken = HashSet::new();
    let mut stack = vec![(root_a, root_b)];
    while let Some((node_a, node_b)) = stack.pop() {
        for (_, a_child) in a.children(node_a) {
            let b_children: Vec<_> = b
                .children(node_b)
                .into_iter()
                .filter(|(_, b_child)| !b_taken.contains(b_child))
                .collect();
            if b_children.is_empty() {
                continue;
            }

            let mut matched = None;
            let mut scored: Vec<(i64, NodeId)> = Vec::new();
            for (_, b_child) in b_children {
                let (observed, expected) =
                    monosaccharide_similarity(a, a_child, b, b_child, &options)?;
                if exact && observed == expected {
                    matched = Some(b_child);
                    break;
                }
                scored.push((i64::from(expected) - i64::from(observed), b_child));
            }
            // Outside of exact mode, take the closest candidate, breaking
            // ties towards the deeper subtree
            if !exact {
                if let Some(&(best_difference, first)) =
                    scored.iter().min_by_key(|&&(difference, _)| difference)
                {
                    let mut contestant = first;
                    for &(difference, candidate) in &scored {
                        if difference == best_difference
                            && subtree_depth(b, candidate) > subtree_depth(b, contestant)
                        {
                            contestant = candidate;
                        }
                    }
                    matched = Some(contestant);
                }
            }

            let Some(b_match) = matched else {
                continue;
            };
            b_taken.insert(b_match);
            chosen.insert(a_child);
            stack.push((a_child, b_match));
        }
    }

    // Substituents ride along with their residues
    let mut include = HashSet::new();
    let mut pending: Vec<_> = chosen.into_iter().collect();
    while let Some(node) = pending.pop() {
        if include.insert(node) {
            pending.extend(a.substituents(node).into_iter().map(|(_, id)| id));
        }
    }
    Ok(a.extract(&include, root_a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{exact_ordering_equal, topologically_equal};
    use crate::glycan::tests::{branched, hexose, trisaccharide};
    use crate::{Position, Substituent};

    use rust_decimal_macros::dec;

    #[test]
    fn identical_glycans_share_everything() {
        let a = trisaccharide();
        let b = trisaccharide();
        let result = maximum_common_subgraph(&a, &b, true).unwrap().unwrap();
        assert_eq!(result.score(), dec!(3));
        assert!(exact_ordering_equal(result.tree(), &a));
    }

    #[test]
    fn fuzzy_scores_count_fractional_matches() {
        let a = Glycan::new(hexose());
        let mut b = Glycan::new(hexose());
        b.add_substituent(
            b.root(),
            Position::Known(2),
            Substituent::new("n_acetyl").unwrap(),
            0,
        )
        .unwrap();

        // Four of five questions match, and exact mode won't take it
        let result = maximum_common_subgraph(&a, &b, false).unwrap().unwrap();
        assert_eq!(result.score(), dec!(0.8));
        assert_eq!(result.tree().residue_count(), 1);
        assert!(maximum_common_subgraph(&a, &b, true).unwrap().is_none());
    }

    #[test]
    fn shared_core_is_recovered() {
        // The branched structure and the linear chain share their
        // Hex-(1→4)-Hex-(1→4)-Hex backbone
        let a = trisaccharide();
        let b = branched();
        let result = maximum_common_subgraph(&a, &b, true).unwrap().unwrap();
        assert_eq!(result.tree().residue_count(), 3);
        assert!(topologically_equal(result.tree(), &a));
    }

    #[test]
    fn extraction_prefers_the_deeper_tie() {
        // The branched root offers two identical partners for the chain's
        // middle residue; claiming the deeper arm lets the walk continue
        // to a third residue instead of stalling at the leaf stub
        let a = trisaccharide();
        let b = branched();
        let result = maximum_common_subgraph(&a, &b, false).unwrap().unwrap();
        assert_eq!(result.tree().residue_count(), 3);
        assert!(exact_ordering_equal(result.tree(), &a));
    }

    #[test]
    fn disjoint_residues_share_nothing_exactly() {
        let a = Glycan::new(hexose());
        let mut b = Glycan::new(hexose());
        b.set_reduced(b.root()).unwrap();
        assert!(maximum_common_subgraph(&a, &b, true).unwrap().is_none());
    }
}
