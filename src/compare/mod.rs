//! Structural comparison of glycans: strict equality (with or without
//! branch ordering), subtree containment, trait-counting similarity, and a
//! heuristic maximum common subgraph

pub mod similarity;
pub mod subgraph;

use crate::{Glycan, Monosaccharide, NodeId, Stem, Substituent, SuperClass};
use crate::{Anomer, Configuration};

/// Whether two glycans are identical residue for residue, with branches in
/// the same order at every fork
#[must_use]
pub fn exact_ordering_equal(a: &Glycan, b: &Glycan) -> bool {
    nodes_exact_equal(a, a.root(), b, b.root())
}

/// Whether two glycans have the same residues and connectivity, allowing
/// branches to appear in any order at each fork
#[must_use]
pub fn topologically_equal(a: &Glycan, b: &Glycan) -> bool {
    nodes_topologically_equal(a, a.root(), b, b.root())
}

/// Searches `haystack` for a residue under which `needle` is fully
/// embedded, returning the first match in index order. Residues in
/// `haystack` may carry extra branches and substituents beyond what
/// `needle` requires, and `needle`'s unknown traits match anything
#[must_use]
pub fn subtree_of(needle: &Glycan, haystack: &Glycan) -> Option<NodeId> {
    haystack
        .residue_ids()
        .iter()
        .copied()
        .find(|&id| node_includes(haystack, id, needle, needle.root()))
}

// ---------------------------------------------------------------------------------------------------------------------

fn residue_traits_equal(a: &Monosaccharide, b: &Monosaccharide) -> bool {
    a.anomer() == b.anomer()
        && a.superclass() == b.superclass()
        && a.stem() == b.stem()
        && a.configuration() == b.configuration()
        && a.ring_start() == b.ring_start()
        && a.ring_end() == b.ring_end()
        && a.modifications() == b.modifications()
}

pub(super) fn substituent_list(
    glycan: &Glycan,
    node: NodeId,
) -> Vec<(crate::Position, &Substituent)> {
    glycan
        .substituents(node)
        .into_iter()
        .filter_map(|(position, id)| Some((position, glycan.node(id).ok()?.as_substituent()?)))
        .collect()
}

fn nodes_exact_equal(a: &Glycan, an: NodeId, b: &Glycan, bn: NodeId) -> bool {
    let (Ok(a_res), Ok(b_res)) = (a.residue(an), b.residue(bn)) else {
        return false;
    };
    if !residue_traits_equal(a_res, b_res) {
        return false;
    }
    if substituent_list(a, an) != substituent_list(b, bn) {
        return false;
    }

    let a_children = a.children(an);
    let b_children = b.children(bn);
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(&b_children)
            .all(|(&(a_position, a_child), &(b_position, b_child))| {
                a_position == b_position && nodes_exact_equal(a, a_child, b, b_child)
            })
}

fn nodes_topologically_equal(a: &Glycan, an: NodeId, b: &Glycan, bn: NodeId) -> bool {
    let (Ok(a_res), Ok(b_res)) = (a.residue(an), b.residue(bn)) else {
        return false;
    };
    if !residue_traits_equal(a_res, b_res) {
        return false;
    }
    // Substituents as a multiset
    let a_subs = substituent_list(a, an);
    let mut b_subs = substituent_list(b, bn);
    if a_subs.len() != b_subs.len() {
        return false;
    }
    for (_, a_sub) in a_subs {
        let Some(at) = b_subs.iter().position(|&(_, b_sub)| a_sub == b_sub) else {
            return false;
        };
        b_subs.remove(at);
    }

    // Children matched greedily under any permutation
    let a_children = a.children(an);
    let mut b_children: Vec<_> = b.children(bn).into_iter().map(|(_, id)| id).collect();
    if a_children.len() != b_children.len() {
        return false;
    }
    for (_, a_child) in a_children {
        let Some(at) = b_children
            .iter()
            .position(|&b_child| nodes_topologically_equal(a, a_child, b, b_child))
        else {
            return false;
        };
        b_children.remove(at);
    }
    true
}

// `needle` is the pattern: its unknown traits are wildcards, and `haystack`
// may carry extra attachments
fn residue_traits_include(haystack: &Monosaccharide, needle: &Monosaccharide) -> bool {
    (haystack.anomer() == needle.anomer() || needle.anomer() == Anomer::Unknown)
        && (haystack.superclass() == needle.superclass()
            || needle.superclass() == SuperClass::Unknown)
        && (haystack.stem() == needle.stem() || needle.stem().first() == Some(&Stem::Unknown))
        && (haystack.configuration() == needle.configuration()
            || needle.configuration().first() == Some(&Configuration::Unknown))
}

fn node_includes(haystack: &Glycan, hn: NodeId, needle: &Glycan, nn: NodeId) -> bool {
    let (Ok(h_res), Ok(n_res)) = (haystack.residue(hn), needle.residue(nn)) else {
        return false;
    };
    if !residue_traits_include(h_res, n_res) {
        return false;
    }

    let mut h_mods: Vec<_> = h_res.modifications().values().copied().collect();
    for &n_mod in n_res.modifications().values() {
        let Some(at) = h_mods.iter().position(|&h_mod| h_mod == n_mod) else {
            return false;
        };
        h_mods.remove(at);
    }

    let mut h_subs = substituent_list(haystack, hn);
    for (_, n_sub) in substituent_list(needle, nn) {
        let Some(at) = h_subs.iter().position(|&(_, h_sub)| h_sub == n_sub) else {
            return false;
        };
        h_subs.remove(at);
    }

    let mut h_children = haystack.children(hn);
    for (n_position, n_child) in needle.children(nn) {
        let Some(at) = h_children.iter().position(|&(h_position, h_child)| {
            h_position == n_position && node_includes(haystack, h_child, needle, n_child)
        }) else {
            return false;
        };
        h_children.remove(at);
    }
    true
}
