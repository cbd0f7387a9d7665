//! Traversal and canonical renumbering. Reindexing renumbers residues from
//! 1 in traversal order (substituents after them), renumbers bonds in the
//! same sweep, and then re-derives the branch labels that fragment naming
//! relies on

use std::cmp::Reverse;
use std::collections::VecDeque;

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use crate::{BondId, BranchLabel, Glycan, GlycanError, NodeId, Result, TraversalMethod};

// Children are visited bushiest first (highest out-degree, counting residue
// children and direct substituents), with attachment position breaking ties
fn sort_children(glycan: &Glycan, children: &mut [(crate::Position, NodeId)]) {
    children.sort_by_key(|&(position, child)| (Reverse(glycan.order(child)), position, child));
}

/// Depth-first residue traversal, visiting bushier children first
pub struct DepthFirst<'a> {
    glycan: &'a Glycan,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let mut children = self.glycan.children(node);
        sort_children(self.glycan, &mut children);
        // Reversed so that the first-ranked child is popped first
        self.stack
            .extend(children.into_iter().rev().map(|(_, child)| child));
        Some(node)
    }
}

/// Breadth-first residue traversal, visiting bushier children first
pub struct BreadthFirst<'a> {
    glycan: &'a Glycan,
    queue: VecDeque<NodeId>,
}

impl Iterator for BreadthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        let mut children = self.glycan.children(node);
        sort_children(self.glycan, &mut children);
        self.queue.extend(children.into_iter().map(|(_, child)| child));
        Some(node)
    }
}

impl Glycan {
    #[must_use]
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            glycan: self,
            stack: vec![self.root],
        }
    }

    #[must_use]
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            glycan: self,
            queue: VecDeque::from([self.root]),
        }
    }

    fn traversal_order(&self, method: TraversalMethod) -> Vec<NodeId> {
        match method {
            TraversalMethod::DepthFirst => self.depth_first().collect(),
            TraversalMethod::BreadthFirst => self.breadth_first().collect(),
        }
    }

    /// Renumbers the whole structure in `method` order and relabels its
    /// branches
    pub fn reindex(&mut self, method: TraversalMethod) {
        let order = self.traversal_order(method);
        self.apply_order(&order);
        self.label_branches();
    }

    /// [`reindex`](Self::reindex) with a caller-supplied residue order,
    /// which must cover this glycan's residues exactly once
    pub fn reindex_custom(&mut self, order: &[NodeId]) -> Result<()> {
        let expected: HashSet<_> = self.index.iter().copied().collect();
        let given: HashSet<_> = order.iter().copied().collect();
        if given.len() != order.len() || given != expected {
            return Err(GlycanError::InvalidOrder.into());
        }
        self.apply_order(order);
        self.label_branches();
        Ok(())
    }

    fn apply_order(&mut self, order: &[NodeId]) {
        // Residues take 1..=N in traversal order, then each residue's
        // substituent subtree, then anything disconnected
        let mut node_map: HashMap<NodeId, NodeId> = HashMap::new();
        let mut next_node = 1;
        let mut assign = |map: &mut HashMap<NodeId, NodeId>, id: NodeId| {
            if !map.contains_key(&id) {
                map.insert(id, NodeId(next_node));
                next_node += 1;
            }
        };
        for &id in order {
            assign(&mut node_map, id);
        }
        for &residue in order {
            let mut stack: Vec<_> = self
                .substituents(residue)
                .into_iter()
                .rev()
                .map(|(_, id)| id)
                .collect();
            while let Some(id) = stack.pop() {
                assign(&mut node_map, id);
                stack.extend(self.substituents(id).into_iter().rev().map(|(_, id)| id));
            }
        }
        let mut disconnected: Vec<_> = self
            .nodes
            .keys()
            .copied()
            .filter(|id| !node_map.contains_key(id))
            .collect();
        disconnected.sort_unstable();
        for id in disconnected {
            assign(&mut node_map, id);
        }

        // Glycosidic bonds renumber in traversal order, then substituent
        // bonds, then detached leftovers
        let mut bond_map: HashMap<BondId, BondId> = HashMap::new();
        let mut next_bond = 1;
        let mut link_index = Vec::new();
        for &residue in order {
            let mut child_bonds: Vec<_> = self
                .bond_ids_of(residue)
                .filter(|&id| {
                    self.bonds.get(&id).is_some_and(|bond| {
                        bond.is_parent(residue)
                            && self.nodes.get(&bond.child()).is_some_and(|n| !n.is_substituent())
                    })
                })
                .collect();
            child_bonds.sort_by_key(|&id| {
                self.bonds
                    .get(&id)
                    .map(|bond| (bond.parent_position(), bond.child()))
            });
            for id in child_bonds {
                bond_map.insert(id, BondId(next_bond));
                link_index.push(BondId(next_bond));
                next_bond += 1;
            }
        }
        let mut leftovers: Vec<_> = self
            .bonds
            .keys()
            .copied()
            .filter(|id| !bond_map.contains_key(id))
            .collect();
        leftovers.sort_unstable();
        for id in leftovers {
            bond_map.insert(id, BondId(next_bond));
            next_bond += 1;
        }

        // Rebuild every structure under the new numbering
        let remap_node = |id: NodeId| node_map.get(&id).copied().unwrap_or(id);
        let remap_bond = |id: BondId| bond_map.get(&id).copied().unwrap_or(id);

        let mut nodes = HashMap::with_capacity(self.nodes.len());
        for (id, mut node) in self.nodes.drain() {
            for bond_id in node_bond_values(&mut node) {
                *bond_id = remap_bond(*bond_id);
            }
            nodes.insert(remap_node(id), node);
        }
        let mut bonds = HashMap::with_capacity(self.bonds.len());
        for (id, mut bond) in self.bonds.drain() {
            bond.parent = remap_node(bond.parent);
            bond.child = remap_node(bond.child);
            bonds.insert(remap_bond(id), bond);
        }

        self.nodes = nodes;
        self.bonds = bonds;
        self.root = remap_node(self.root);
        self.index = order.iter().map(|&id| remap_node(id)).collect();
        self.link_index = link_index;
        self.next_node = next_node;
        self.next_bond = next_bond;
    }

    fn bond_ids_of(&self, node: NodeId) -> impl Iterator<Item = BondId> + '_ {
        self.nodes
            .get(&node)
            .into_iter()
            .flat_map(crate::Node::bond_ids)
    }

    /// Labels every glycosidic bond with its branch symbol and distance
    /// from the root. The main branch is `-`; each fork hands out fresh
    /// letters in traversal order. `branch_lengths` afterwards maps each
    /// symbol to the length of the longest branch passing through it, which
    /// is what anchors reducing-end fragment numbering
    pub fn label_branches(&mut self) {
        for bond in self.bonds.values_mut() {
            bond.label = None;
        }
        self.branch_lengths.clear();

        let mut branch_parent: HashMap<char, char> = HashMap::new();
        let mut node_branch: HashMap<NodeId, char> = HashMap::new();
        let mut last_branch = MAIN_BRANCH;
        node_branch.insert(self.root, MAIN_BRANCH);

        let order = self.index.clone();
        for node in order {
            let branch = node_branch.get(&node).copied().unwrap_or(MAIN_BRANCH);
            let child_bonds: Vec<_> = self
                .bond_ids_of(node)
                .filter(|&id| {
                    self.bonds.get(&id).is_some_and(|bond| {
                        bond.is_parent(node)
                            && self.nodes.get(&bond.child()).is_some_and(|n| !n.is_substituent())
                    })
                })
                .collect();

            if child_bonds.len() == 1 {
                // A lone child continues its parent's branch
                let id = child_bonds[0];
                let distance = self.branch_lengths.entry(branch).or_insert(0);
                *distance += 1;
                let label = BranchLabel {
                    branch,
                    distance: *distance,
                };
                if let Some(bond) = self.bonds.get_mut(&id) {
                    node_branch.insert(bond.child, branch);
                    bond.label = Some(label);
                }
            } else {
                for id in child_bonds {
                    let new_branch = next_branch_symbol(last_branch);
                    last_branch = new_branch;
                    branch_parent.insert(new_branch, branch);
                    let distance = self.branch_lengths.get(&branch).copied().unwrap_or(0) + 1;
                    self.branch_lengths.insert(new_branch, distance);
                    if let Some(bond) = self.bonds.get_mut(&id) {
                        node_branch.insert(bond.child, new_branch);
                        bond.label = Some(BranchLabel {
                            branch: new_branch,
                            distance,
                        });
                    }
                }
            }
        }

        // Propagate lengths up: every symbol ends up holding the longest
        // branch running through it
        let mut symbols: Vec<_> = self
            .branch_lengths
            .keys()
            .copied()
            .filter(|&s| s != MAIN_BRANCH)
            .collect();
        symbols.sort_unstable_by(|a, b| b.cmp(a));
        for symbol in symbols {
            let length = self.branch_lengths.get(&symbol).copied().unwrap_or(0);
            let parent = branch_parent.get(&symbol).copied().unwrap_or(MAIN_BRANCH);
            let parent_length = self.branch_lengths.get(&parent).copied().unwrap_or(0);
            self.branch_lengths.insert(parent, parent_length.max(length));
        }
        let longest = self.branch_lengths.values().copied().max().unwrap_or(0);
        self.branch_lengths.insert(MAIN_BRANCH, longest);
    }

    pub(crate) fn branch_length(&self, branch: char) -> u32 {
        self.branch_lengths.get(&branch).copied().unwrap_or(0)
    }
}

pub(crate) const MAIN_BRANCH: char = '-';

fn next_branch_symbol(last: char) -> char {
    if last == MAIN_BRANCH {
        'a'
    } else {
        char::from_u32(last as u32 + 1).unwrap_or(last)
    }
}

pub(super) fn node_bond_values(node: &mut crate::Node) -> impl Iterator<Item = &mut BondId> {
    let (links, substituent_links) = match node {
        crate::Node::Residue(residue) => (&mut residue.links, Some(&mut residue.substituent_links)),
        crate::Node::Substituent(substituent) => (&mut substituent.links, None),
    };
    links.values_mut().chain(
        substituent_links
            .into_iter()
            .flat_map(crate::PositionMap::values_mut),
    )
}
