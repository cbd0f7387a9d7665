//! Trait-counting similarity between monosaccharides
//!
//! Scores are reported as an `(observed, expected)` pair of counts:
//! `expected` grows with every feature the target residue asks about, and
//! `observed` with every feature the queried residue matches. A perfect
//! match has `observed == expected`

use std::collections::BTreeMap;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use super::substituent_list;
use crate::{
    Anomer, Configuration, Glycan, GlycanError, Modification, NodeId, Result, Stem, SuperClass,
};

/// Knobs controlling which features count towards a similarity score
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct SimilarityOptions {
    /// Count attached substituents
    pub include_substituents: bool,
    /// Count core modifications
    pub include_modifications: bool,
    /// Recursively score child residues, pairing them up optimally
    pub include_children: bool,
    /// Penalize features the queried residue has but the target lacks
    pub exact: bool,
    /// Discount the reduced state on both sides of the comparison
    pub ignore_reduction: bool,
    /// Upper bound on the children considered per side when pairing —
    /// the assignment search is exhaustive, so this caps its blowup
    pub assignment_limit: usize,
}

impl SimilarityOptions {
    pub const DEFAULT_ASSIGNMENT_LIMIT: usize = 8;
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            include_substituents: true,
            include_modifications: true,
            include_children: false,
            exact: true,
            ignore_reduction: false,
            assignment_limit: Self::DEFAULT_ASSIGNMENT_LIMIT,
        }
    }
}

/// Scores how alike two residues are, feature by feature
///
/// The comparison is directional: unknown traits on the *target* side
/// (`b`) act as wildcards, and only in `exact` mode do the queried
/// residue's surplus features count against it
pub fn monosaccharide_similarity(
    a: &Glycan,
    an: NodeId,
    b: &Glycan,
    bn: NodeId,
    options: &SimilarityOptions,
) -> Result<(u32, u32)> {
    let mut visited = HashSet::new();
    similarity_inner(a, an, b, bn, options, &mut visited)
}

/// Whether the two residues score within `tolerance` of a perfect match
/// in either comparison direction
pub fn commutative_similarity(
    a: &Glycan,
    an: NodeId,
    b: &Glycan,
    bn: NodeId,
    options: &SimilarityOptions,
    tolerance: u32,
) -> Result<bool> {
    let (observed, expected) = monosaccharide_similarity(a, an, b, bn, options)?;
    if within_tolerance(observed, expected, tolerance) {
        return Ok(true);
    }
    let (observed, expected) = monosaccharide_similarity(b, bn, a, an, options)?;
    Ok(within_tolerance(observed, expected, tolerance))
}

fn within_tolerance(observed: u32, expected: u32, tolerance: u32) -> bool {
    i64::from(observed) - i64::from(expected) >= -i64::from(tolerance)
}

// ---------------------------------------------------------------------------------------------------------------------

fn similarity_inner(
    a: &Glycan,
    an: NodeId,
    b: &Glycan,
    bn: NodeId,
    options: &SimilarityOptions,
    visited: &mut HashSet<(NodeId, NodeId)>,
) -> Result<(u32, u32)> {
    if !visited.insert((an, bn)) {
        return Ok((0, 0));
    }

    // A substituent on either side reduces to a bulk composition check
    if a.node(an)?.is_substituent() || b.node(bn)?.is_substituent() {
        let same = a.node_total_composition(an)? == b.node_total_composition(bn)?;
        return Ok((u32::from(same), 1));
    }

    let a_res = a.residue(an)?;
    let b_res = b.residue(bn)?;
    let mut observed = 0;
    let mut expected = 0;

    observed += u32::from(a_res.anomer() == b_res.anomer() || b_res.anomer() == Anomer::Unknown);
    expected += 1;
    observed += u32::from(
        a_res.superclass() == b_res.superclass() || b_res.superclass() == SuperClass::Unknown,
    );
    expected += 1;
    observed +=
        u32::from(a_res.stem() == b_res.stem() || b_res.stem().first() == Some(&Stem::Unknown));
    expected += 1;
    observed += u32::from(
        a_res.configuration() == b_res.configuration()
            || b_res.configuration().first() == Some(&Configuration::Unknown),
    );
    expected += 1;

    if options.include_modifications {
        let mut a_mods: Vec<Modification> = a_res.modifications().values().copied().collect();
        let mut a_reduced = false;
        let mut b_reduced = false;
        for &b_mod in b_res.modifications().values() {
            if b_mod == Modification::Alditol {
                b_reduced = true;
            }
            expected += 1;
            if let Some(at) = a_mods.iter().position(|&a_mod| a_mod == b_mod) {
                if b_mod == Modification::Alditol {
                    a_reduced = true;
                }
                observed += 1;
                a_mods.remove(at);
            }
        }
        if options.ignore_reduction {
            if b_reduced {
                expected -= 1;
            }
            if a_reduced {
                observed -= 1;
            }
        }
        if options.exact {
            expected += u32::try_from(a_mods.len()).unwrap_or(u32::MAX);
        }
    }

    if options.include_substituents {
        let mut a_subs = substituent_list(a, an);
        for (_, b_sub) in substituent_list(b, bn) {
            expected += 1;
            if let Some(at) = a_subs.iter().position(|&(_, a_sub)| a_sub == b_sub) {
                observed += 1;
                a_subs.remove(at);
            }
        }
        if options.exact {
            expected += u32::try_from(a_subs.len()).unwrap_or(u32::MAX);
        }
    }

    if options.include_children {
        let a_children: Vec<_> = a.children(an).into_iter().map(|(_, id)| id).collect();
        let b_children: Vec<_> = b.children(bn).into_iter().map(|(_, id)| id).collect();
        let mut match_index = HashMap::new();
        for &b_child in &b_children {
            for &a_child in &a_children {
                let score = similarity_inner(a, a_child, b, b_child, options, visited)?;
                match_index.insert((a_child, b_child), score);
            }
        }
        for pair in optimal_assignment(&match_index, options.assignment_limit)? {
            let (child_observed, child_expected) = match_index.get(&pair).copied().unwrap_or((0, 0));
            observed += child_observed;
            expected += child_expected;
        }
    }

    Ok((observed, expected))
}

/// Picks the set of non-overlapping `(a, b)` pairs maximizing the total of
/// `observed - expected` over the scored candidates
///
/// The search enumerates every maximal pairing, so both sides are capped at
/// `limit` distinct members
pub fn optimal_assignment(
    scores: &HashMap<(NodeId, NodeId), (u32, u32)>,
    limit: usize,
) -> Result<Vec<(NodeId, NodeId)>> {
    let margins: HashMap<_, _> = scores
        .iter()
        .map(|(&pair, &(observed, expected))| {
            (pair, i64::from(observed) - i64::from(expected))
        })
        .collect();
    best_assignment(&margins, limit)
}

// The pairing search itself, generic over the score being maximized
pub(super) fn best_assignment<S>(
    scores: &HashMap<(NodeId, NodeId), S>,
    limit: usize,
) -> Result<Vec<(NodeId, NodeId)>>
where
    S: Copy + Ord + Default + std::iter::Sum,
{
    let mut pairings: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
    let mut b_members = HashSet::new();
    for &(a, b) in scores.keys() {
        pairings.entry(a).or_default().push(b);
        b_members.insert(b);
    }
    for candidates in pairings.values_mut() {
        candidates.sort_unstable();
    }

    let a_count = pairings.len();
    let b_count = b_members.len();
    if a_count > limit || b_count > limit {
        return Err(Box::new(GlycanError::AssignmentOverflow {
            a_count,
            b_count,
            limit,
        }));
    }

    let best = build_unique_index_pairs(&pairings)
        .into_iter()
        .max_by_key(|assignment| {
            assignment
                .iter()
                .map(|pair| scores.get(pair).copied().unwrap_or_default())
                .sum::<S>()
        });
    Ok(best.unwrap_or_default())
}

// Enumerates every way to give each `a` exactly one unused `b`. Branches
// where an `a` finds all of its candidates taken are abandoned, so with
// more `a`s than `b`s the result is empty
fn build_unique_index_pairs(
    pairings: &BTreeMap<NodeId, Vec<NodeId>>,
) -> Vec<Vec<(NodeId, NodeId)>> {
    let mut complete = vec![Vec::new()];
    for (&a, candidates) in pairings {
        let mut extended = Vec::new();
        for partial in &complete {
            for &b in candidates {
                if partial.iter().all(|&(_, used)| used != b) {
                    let mut next = partial.clone();
                    next.push((a, b));
                    extended.push(next);
                }
            }
        }
        complete = extended;
    }
    complete
}
