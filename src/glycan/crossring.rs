//! Cross-ring (A/X series) fragmentation. The ring is unrolled into its
//! backbone carbons, cut at two of its bonds, and each side is packed into a
//! standalone fragment that keeps the substituents and neighbouring subtrees
//! anchored to its carbons. Cleavage sites number the ring bonds from the
//! anomeric closure: site 0 is the ring-oxygen–anomeric-carbon bond

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use crate::{
    Anomer, Bond, BondId, Composition, CrossRingFragment, Glycan, GlycanError, IonSeries, Mass,
    Massive, Modification, Monosaccharide, NodeId, Position, Result, RingType, Substituent,
    SuperClass, atoms::composition::composition,
};

use super::traversal::node_bond_values;

/// One backbone carbon of an unrolled ring, with everything anchored to it
struct Segment {
    position: u32,
    modifications: Vec<Modification>,
    substituent_bonds: Vec<BondId>,
    residue_bonds: Vec<BondId>,
}

impl Glycan {
    /// Every valid `(c1, c2)` cleavage pair for the ring of `node`. Cuts
    /// must leave more than one carbon between them and must not sever the
    /// whole ring in one pass
    pub fn enumerate_cleavage_pairs(&self, node: NodeId) -> Result<Vec<(u32, u32)>> {
        let (start, end) = self.ring_bounds(node)?;
        let ring_size = (end - start) + 2;
        let mut pairs = Vec::new();
        for c1 in 0..ring_size {
            for c2 in c1 + 1..ring_size {
                if c2 - c1 > 1 && (c2 - c1) + 1 != ring_size {
                    pairs.push((c1, c2));
                }
            }
        }
        Ok(pairs)
    }

    /// Cleaves the ring of `node` at sites `c1` and `c2`, returning the
    /// `(A, X)` fragment pair. The X fragment is whichever side retains the
    /// anomeric (ring-start) carbon; when the cut at `c2` severs the
    /// ring-closing bond, the ring oxygen goes with it
    pub fn crossring_fragments(
        &self,
        node: NodeId,
        c1: u32,
        c2: u32,
    ) -> Result<(CrossRingFragment, CrossRingFragment)> {
        let (start, end) = self.ring_bounds(node)?;
        let ring_size = (end - start) + 2;
        if c1 >= c2 || c2 >= ring_size || c2 - c1 <= 1 || (c2 - c1) + 1 == ring_size {
            return Err(GlycanError::CleavageSites { c1, c2, ring_size }.into());
        }

        let linear = self.unroll_ring(node)?;
        let window = &linear[(start - 1) as usize..end as usize];

        // The first side is the arc between the two cuts; the second wraps
        // around through the ring closure
        let mut first: Vec<&Segment> = window[c1 as usize..c2 as usize].iter().collect();
        let mut second: Vec<&Segment> = window[c2 as usize..]
            .iter()
            .chain(&window[..c1 as usize])
            .collect();

        let contains = |parts: &[&Segment], position: u32| {
            parts.iter().any(|segment| segment.position == position)
        };

        // Carbons outside the ring follow the ring carbon they hang off:
        // the pre-ring tail goes with the anomeric side, the post-ring tail
        // with whichever side kept the ring-closing carbon
        let pre = &linear[..(start - 1) as usize];
        if !pre.is_empty() {
            if contains(&first, start) {
                let mut extended: Vec<&Segment> = pre.iter().collect();
                extended.extend(first);
                first = extended;
            } else {
                let mut extended: Vec<&Segment> = pre.iter().collect();
                extended.extend(second);
                second = extended;
            }
        }
        let post = &linear[end as usize..];
        if contains(&second, end) {
            second.extend(post);
        } else {
            first.extend(post);
        }

        let first_is_x = contains(&first, start);
        let mut first = self.pack_fragment(node, &first, c1, c2)?;
        let mut second = self.pack_fragment(node, &second, c1, c2)?;

        // Cutting the ring-closing bond sends the ring oxygen around to the
        // wrapping side
        if end - (start - 1) == c2 {
            shift_root_composition(&mut first.tree, &-composition![O: 1]);
            shift_root_composition(&mut second.tree, &composition![O: 1]);
        }

        if first_is_x {
            first.series = IonSeries::X;
            second.series = IonSeries::A;
            Ok((second, first))
        } else {
            first.series = IonSeries::A;
            second.series = IonSeries::X;
            Ok((first, second))
        }
    }

    /// Every `(A, X)` pair from every valid cleavage of `node`'s ring
    pub fn all_crossring_fragments(
        &self,
        node: NodeId,
    ) -> Result<Vec<(CrossRingFragment, CrossRingFragment)>> {
        self.enumerate_cleavage_pairs(node)?
            .into_iter()
            .map(|(c1, c2)| self.crossring_fragments(node, c1, c2))
            .collect()
    }

    fn ring_bounds(&self, node: NodeId) -> Result<(u32, u32)> {
        let residue = self.residue(node)?;
        match residue.ring_type() {
            RingType::Pyranose | RingType::Furanose => {}
            RingType::Open | RingType::Unknown => {
                return Err(GlycanError::RingCleavage.into());
            }
        }
        match (residue.ring_start(), residue.ring_end()) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(GlycanError::RingCleavage.into()),
        }
    }

    fn unroll_ring(&self, node: NodeId) -> Result<Vec<Segment>> {
        let residue = self.residue(node)?;
        let carbons = residue
            .superclass()
            .carbons()
            .ok_or(GlycanError::RingCleavage)?;
        Ok((1..=carbons)
            .map(|i| {
                let position = Position::Known(i);
                Segment {
                    position: i,
                    modifications: residue.modifications().get(position).copied().collect(),
                    substituent_bonds: residue.substituent_links().get(position).copied().collect(),
                    residue_bonds: residue.links().get(position).copied().collect(),
                }
            })
            .collect())
    }

    /// Assembles one side of a cleaved ring into a standalone fragment.
    /// The backbone is rebuilt carbon by carbon (CH2O each, plus anchored
    /// modification shifts); substituents are reconstituted and re-bonded
    /// with their usual losses; neighbouring subtrees are copied as they
    /// stand, so re-anchoring them charges only the fragment's side of the
    /// original bond
    fn pack_fragment(
        &self,
        node: NodeId,
        parts: &[&Segment],
        c1: u32,
        c2: u32,
    ) -> Result<CrossRingFragment> {
        let source = self.residue(node)?;
        let mut root = Monosaccharide::new(
            Anomer::Unknown,
            source.configuration().to_vec(),
            source.stem().to_vec(),
            SuperClass::Unknown,
            None,
            None,
        );
        let mut backbone = Composition::new();
        for segment in parts {
            backbone += &composition![C: 1, H: 2, O: 1];
            for &modification in &segment.modifications {
                backbone += &modification.composition_shift();
                root.modifications
                    .push(Position::Known(segment.position), modification);
            }
        }
        root.composition = backbone;

        let mut tree = Glycan::new(root);
        let fragment_root = tree.root();

        for segment in parts {
            for &bond_id in &segment.substituent_bonds {
                let bond = self.bond(bond_id)?;
                let original = self.substituent(bond.child())?;
                let substituent = match Substituent::new(original.name()) {
                    Ok(substituent) => substituent,
                    // Not in the registry: rebuild its free composition by
                    // refunding the hydrogen it gave up when first bonded
                    Err(_) => Substituent::with_composition(
                        original.name(),
                        original.composition().clone() + composition![H: 1],
                        original.attachment_loss().clone(),
                    ),
                };
                tree.add_substituent(
                    fragment_root,
                    bond.parent_position(),
                    substituent,
                    usize::MAX,
                )?;
            }
        }

        let mut neighbours: HashSet<NodeId> = HashSet::new();
        for &bond_id in source.links().values() {
            if let Some(other) = self.bonds.get(&bond_id).and_then(|b| b.other(node).ok()) {
                neighbours.insert(other);
            }
        }
        for segment in parts {
            for &bond_id in &segment.residue_bonds {
                let bond = self.bond(bond_id)?;
                let neighbour = bond.other(node)?;

                // Copy the subtree hanging off this neighbour, walled off
                // from the cleaved residue and its other neighbours so no
                // path loops back around
                let mut blocked = neighbours.clone();
                blocked.insert(node);
                blocked.remove(&neighbour);
                let members: HashSet<_> = self
                    .component_blocked(neighbour, &blocked)
                    .into_iter()
                    .collect();
                let subtree = self.extract(&members, neighbour);
                let grafted = tree.graft(&subtree);

                let anchor = if bond.is_parent(node) {
                    Bond::new(
                        fragment_root,
                        grafted,
                        bond.parent_position(),
                        bond.child_position(),
                        bond.parent_loss().clone(),
                        Composition::new(),
                    )
                } else {
                    Bond::new(
                        grafted,
                        fragment_root,
                        bond.parent_position(),
                        bond.child_position(),
                        Composition::new(),
                        bond.child_loss().clone(),
                    )
                };
                let anchor_id = tree.fresh_bond_id();
                tree.bonds.insert(anchor_id, anchor);
                tree.attach_bond(anchor_id)?;
                tree.link_index.push(anchor_id);
            }
        }

        Ok(CrossRingFragment {
            series: IonSeries::A,
            cleave_1: c1,
            cleave_2: c2,
            contains: parts.iter().map(|segment| segment.position).collect(),
            tree,
        })
    }

    fn component_blocked(&self, start: NodeId, blocked: &HashSet<NodeId>) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        seen.insert(start);
        let mut stack = vec![start];
        let mut component = Vec::new();
        while let Some(current) = stack.pop() {
            component.push(current);
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for bond_id in node.bond_ids() {
                let neighbour = self
                    .bonds
                    .get(&bond_id)
                    .and_then(|bond| bond.other(current).ok());
                if let Some(neighbour) = neighbour {
                    if !blocked.contains(&neighbour) && seen.insert(neighbour) {
                        stack.push(neighbour);
                    }
                }
            }
        }
        component
    }

    /// Copies every node and bond of `other` into this glycan under fresh
    /// ids, returning the new id of `other`'s root
    fn graft(&mut self, other: &Glycan) -> NodeId {
        let mut node_map: HashMap<NodeId, NodeId> = HashMap::new();
        let mut order = other.index.clone();
        let mut rest: Vec<_> = other
            .nodes
            .keys()
            .copied()
            .filter(|id| !other.index.contains(id))
            .collect();
        rest.sort_unstable();
        order.extend(rest);
        for old in order {
            node_map.insert(old, self.fresh_node_id());
        }

        let mut bond_map: HashMap<BondId, BondId> = HashMap::new();
        let mut bond_order: Vec<_> = other.bonds.keys().copied().collect();
        bond_order.sort_unstable();
        for old in bond_order {
            bond_map.insert(old, self.fresh_bond_id());
        }

        let remap_node = |id: NodeId| node_map.get(&id).copied().unwrap_or(id);
        let remap_bond = |id: BondId| bond_map.get(&id).copied().unwrap_or(id);

        for (&old, node) in &other.nodes {
            let mut node = node.clone();
            for bond_id in node_bond_values(&mut node) {
                *bond_id = remap_bond(*bond_id);
            }
            self.nodes.insert(remap_node(old), node);
        }
        for (&old, bond) in &other.bonds {
            let mut bond = bond.clone();
            bond.parent = remap_node(bond.parent);
            bond.child = remap_node(bond.child);
            self.bonds.insert(remap_bond(old), bond);
        }
        self.index
            .extend(other.index.iter().map(|&id| remap_node(id)));
        self.link_index
            .extend(other.link_index.iter().map(|&id| remap_bond(id)));

        remap_node(other.root)
    }
}

fn shift_root_composition(tree: &mut Glycan, delta: &Composition) {
    let root = tree.root();
    if let Some(node) = tree.nodes.get_mut(&root) {
        *node.composition_mut() += delta;
    }
}

// =====================================================================================================================

impl CrossRingFragment {
    #[must_use]
    pub const fn series(&self) -> IonSeries {
        self.series
    }

    #[must_use]
    pub const fn cleave_1(&self) -> u32 {
        self.cleave_1
    }

    #[must_use]
    pub const fn cleave_2(&self) -> u32 {
        self.cleave_2
    }

    /// The backbone carbons this fragment retained, in packing order
    #[must_use]
    pub fn contains(&self) -> &[u32] {
        &self.contains
    }

    /// The fragment as a glycan: its ring remnant at the root, plus any
    /// substituents and neighbouring subtrees that came with it
    #[must_use]
    pub const fn tree(&self) -> &Glycan {
        &self.tree
    }

    /// Domon–Costello style name, e.g. `0,2A`
    #[must_use]
    pub fn name(&self) -> String {
        format!("{},{}{}", self.cleave_1, self.cleave_2, self.series)
    }
}

impl Massive for CrossRingFragment {
    fn monoisotopic_mass(&self) -> Mass {
        self.tree.monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.tree.average_mass()
    }
}

// =====================================================================================================================

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::glycan::tests::{hexose, trisaccharide};

    #[test]
    fn pyranose_cleavage_pairs() {
        let glycan = Glycan::new(hexose());
        let pairs = glycan.enumerate_cleavage_pairs(glycan.root()).unwrap();
        assert_eq!(
            pairs,
            [
                (0, 2),
                (0, 3),
                (0, 4),
                (1, 3),
                (1, 4),
                (1, 5),
                (2, 4),
                (2, 5),
                (3, 5)
            ]
        );
    }

    #[test]
    fn open_and_unknown_rings_cannot_be_cleaved() {
        let open_chain = Monosaccharide::new(
            Anomer::Uncyclized,
            vec![crate::Configuration::D],
            vec![crate::Stem::Glc],
            SuperClass::Hex,
            Some(0),
            Some(0),
        );
        let glycan = Glycan::new(open_chain);
        let err = glycan.enumerate_cleavage_pairs(glycan.root()).unwrap_err();
        assert!(matches!(*err, GlycanError::RingCleavage));
    }

    #[test]
    fn invalid_sites_are_rejected() {
        let glycan = Glycan::new(hexose());
        let root = glycan.root();
        for (c1, c2) in [(0, 1), (0, 5), (2, 2), (3, 1), (0, 6)] {
            let err = glycan.crossring_fragments(root, c1, c2).unwrap_err();
            assert!(
                matches!(*err, GlycanError::CleavageSites { .. }),
                "({c1}, {c2}) should be invalid"
            );
        }
    }

    #[test]
    fn zero_two_cleavage_of_a_free_hexose() {
        let glycan = Glycan::new(hexose());
        let (a, x) = glycan.crossring_fragments(glycan.root(), 0, 2).unwrap();

        // X keeps the anomeric side: carbons 1 and 2
        assert_eq!(x.series(), IonSeries::X);
        assert_eq!(x.contains(), [1, 2]);
        assert_eq!(
            x.tree().total_composition(),
            Composition::from_formula("C2H4O2").unwrap()
        );

        // A gets the rest of the ring plus the exocyclic carbon 6
        assert_eq!(a.series(), IonSeries::A);
        assert_eq!(a.contains(), [3, 4, 5, 6]);
        assert_eq!(
            a.tree().total_composition(),
            Composition::from_formula("C4H8O4").unwrap()
        );
        assert_eq!(a.monoisotopic_mass(), dec!(120.04225873480).into());

        assert_eq!(a.name(), "0,2A");
        assert_eq!(x.name(), "0,2X");
    }

    #[test]
    fn cutting_the_ring_closure_moves_the_ring_oxygen() {
        let glycan = Glycan::new(hexose());
        let (a, x) = glycan.crossring_fragments(glycan.root(), 1, 5).unwrap();

        // The wrapping side holds only the anomeric carbon, plus the ring
        // oxygen that came with the severed closure
        assert_eq!(x.contains(), [1]);
        assert_eq!(
            x.tree().total_composition(),
            Composition::from_formula("CH2O2").unwrap()
        );
        assert_eq!(
            a.tree().total_composition(),
            Composition::from_formula("C5H10O4").unwrap()
        );
    }

    #[test]
    fn fragments_conserve_the_residue_mass() {
        let glycan = Glycan::new(hexose());
        let total = glycan.monoisotopic_mass();
        for (c1, c2) in glycan.enumerate_cleavage_pairs(glycan.root()).unwrap() {
            let (a, x) = glycan.crossring_fragments(glycan.root(), c1, c2).unwrap();
            assert_eq!(
                a.monoisotopic_mass() + x.monoisotopic_mass(),
                total,
                "({c1}, {c2})"
            );
        }
    }

    #[test]
    fn anchored_substituents_travel_with_their_carbon() {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        glycan
            .add_substituent(
                root,
                Position::Known(2),
                Substituent::new("n_acetyl").unwrap(),
                0,
            )
            .unwrap();

        let (a, x) = glycan.crossring_fragments(root, 0, 2).unwrap();
        // C2 (and its N-acetyl) sits on the X side
        assert_eq!(
            x.tree().total_composition(),
            Composition::from_formula("C4H7NO2").unwrap()
        );
        assert_eq!(
            a.tree().total_composition(),
            Composition::from_formula("C4H8O4").unwrap()
        );

        // Together they still make up the whole GlcNAc
        assert_eq!(
            a.tree().total_composition() + x.tree().total_composition(),
            glycan.total_composition()
        );
    }

    #[test]
    fn neighbouring_subtrees_are_carried_and_masses_balance() {
        let glycan = trisaccharide();
        let middle = glycan.residue_ids()[1];
        let (a, x) = glycan.crossring_fragments(middle, 0, 2).unwrap();

        // X holds C1–C2 and, through the C1 linkage, the reducing-end
        // residue; A holds the rest of the ring and the non-reducing one
        assert_eq!(x.tree().residue_count(), 2);
        assert_eq!(a.tree().residue_count(), 2);
        assert_eq!(
            a.monoisotopic_mass() + x.monoisotopic_mass(),
            glycan.monoisotopic_mass()
        );

        let expected_x = dec!(180.06338810220) + dec!(60.02112936740) - dec!(18.01056468370);
        assert_eq!(x.monoisotopic_mass(), expected_x.into());
    }

    #[test]
    fn every_cleavage_balances_in_context() {
        let glycan = trisaccharide();
        let total = glycan.monoisotopic_mass();
        let middle = glycan.residue_ids()[1];
        for (c1, c2) in glycan.enumerate_cleavage_pairs(middle).unwrap() {
            let (a, x) = glycan.crossring_fragments(middle, c1, c2).unwrap();
            assert_eq!(
                a.monoisotopic_mass() + x.monoisotopic_mass(),
                total,
                "({c1}, {c2})"
            );
        }
    }
}
