//! The glycan arena: residue and substituent nodes joined by transactional
//! bonds. Attaching a bond deducts both endpoints' losses and registers the
//! bond with them; detaching reverses the registration and (optionally)
//! refunds the losses, which is what lets fragmentation take a structure
//! apart and put it back together without drift

pub mod crossring;
pub mod fragments;
pub mod traversal;

use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};

use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};

use crate::{
    Bond, BondId, BondState, Charge, Composition, GlycanError, Glycan, Mass, Massive,
    Modification, Monosaccharide, Node, NodeId, Position, PositionMap, Result, Substituent,
    atoms::composition::composition,
};

impl Node {
    #[must_use]
    pub const fn as_residue(&self) -> Option<&Monosaccharide> {
        match self {
            Self::Residue(residue) => Some(residue),
            Self::Substituent(_) => None,
        }
    }

    #[must_use]
    pub const fn as_substituent(&self) -> Option<&Substituent> {
        match self {
            Self::Residue(_) => None,
            Self::Substituent(substituent) => Some(substituent),
        }
    }

    #[must_use]
    pub const fn is_substituent(&self) -> bool {
        matches!(self, Self::Substituent(_))
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition {
        match self {
            Self::Residue(residue) => &residue.composition,
            Self::Substituent(substituent) => &substituent.composition,
        }
    }

    pub(crate) const fn composition_mut(&mut self) -> &mut Composition {
        match self {
            Self::Residue(residue) => &mut residue.composition,
            Self::Substituent(substituent) => &mut substituent.composition,
        }
    }

    #[must_use]
    pub fn is_occupied(&self, position: Position) -> usize {
        match self {
            Self::Residue(residue) => residue.is_occupied(position),
            Self::Substituent(substituent) => substituent.is_occupied(position),
        }
    }

    /// All bond ids registered with this node, parent- and child-side alike
    pub(crate) fn bond_ids(&self) -> impl Iterator<Item = BondId> + '_ {
        let (links, substituent_links) = match self {
            Self::Residue(residue) => (&residue.links, Some(&residue.substituent_links)),
            Self::Substituent(substituent) => (&substituent.links, None),
        };
        links
            .values()
            .chain(substituent_links.into_iter().flat_map(PositionMap::values))
            .copied()
    }

    fn register_parent_side(&mut self, position: Position, id: BondId, to_substituent: bool) {
        match self {
            Self::Residue(residue) if to_substituent => {
                residue.substituent_links.push(position, id);
            }
            Self::Residue(residue) => residue.links.push(position, id),
            Self::Substituent(substituent) => substituent.links.push(position, id),
        }
    }

    fn register_child_side(&mut self, position: Position, id: BondId) {
        match self {
            Self::Residue(residue) => residue.links.push(position, id),
            Self::Substituent(substituent) => substituent.links.push(position, id),
        }
    }

    fn deregister(&mut self, id: BondId) {
        match self {
            Self::Residue(residue) => {
                residue.links.remove_value(&id);
                residue.substituent_links.remove_value(&id);
            }
            Self::Substituent(substituent) => {
                substituent.links.remove_value(&id);
            }
        }
    }

    fn retain_bonds(&mut self, mut keep: impl FnMut(BondId) -> bool) {
        match self {
            Self::Residue(residue) => {
                residue.links.retain(|_, &id| keep(id));
                residue.substituent_links.retain(|_, &id| keep(id));
            }
            Self::Substituent(substituent) => substituent.links.retain(|_, &id| keep(id)),
        }
    }
}

impl Massive for Node {
    fn monoisotopic_mass(&self) -> Mass {
        self.composition().monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.composition().average_mass()
    }
}

// =====================================================================================================================

impl Glycan {
    /// Creates a glycan containing only `root`
    #[must_use]
    pub fn new(root: Monosaccharide) -> Self {
        let root_id = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(root_id, Node::Residue(root));
        Self {
            root: root_id,
            nodes,
            bonds: HashMap::new(),
            index: vec![root_id],
            link_index: Vec::new(),
            branch_lengths: HashMap::new(),
            next_node: 2,
            next_bond: 1,
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Residue ids in traversal order (root first)
    #[must_use]
    pub fn residue_ids(&self) -> &[NodeId] {
        &self.index
    }

    /// Residue–residue bond ids in traversal order
    #[must_use]
    pub fn link_ids(&self) -> &[BondId] {
        &self.link_index
    }

    #[must_use]
    pub fn residue_count(&self) -> usize {
        self.index.len()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| GlycanError::node_lookup(id).into())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| GlycanError::node_lookup(id).into())
    }

    pub fn residue(&self, id: NodeId) -> Result<&Monosaccharide> {
        self.node(id)?
            .as_residue()
            .ok_or_else(|| GlycanError::NotAResidue { id }.into())
    }

    pub(crate) fn residue_mut(&mut self, id: NodeId) -> Result<&mut Monosaccharide> {
        match self.node_mut(id)? {
            Node::Residue(residue) => Ok(residue),
            Node::Substituent(_) => Err(GlycanError::NotAResidue { id }.into()),
        }
    }

    pub fn substituent(&self, id: NodeId) -> Result<&Substituent> {
        self.node(id)?
            .as_substituent()
            .ok_or_else(|| GlycanError::NotASubstituent { id }.into())
    }

    pub fn bond(&self, id: BondId) -> Result<&Bond> {
        self.bonds
            .get(&id)
            .ok_or_else(|| GlycanError::bond_lookup(id).into())
    }

    pub fn residues(&self) -> impl Iterator<Item = (NodeId, &Monosaccharide)> {
        self.index
            .iter()
            .filter_map(|&id| Some((id, self.nodes.get(&id)?.as_residue()?)))
    }

    fn fresh_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        id
    }

    fn fresh_bond_id(&mut self) -> BondId {
        let id = BondId(self.next_bond);
        self.next_bond += 1;
        id
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Bond transactions

    /// Applies a detached bond: both endpoints lose their side of the bond's
    /// loss composition and gain a registration at their position. Also how
    /// a bond broken during fragmentation is reconnected
    pub fn attach_bond(&mut self, id: BondId) -> Result<()> {
        let bond = self.bond(id)?;
        if bond.is_attached() {
            return Err(GlycanError::BondAttached { id }.into());
        }
        let (parent, child) = (bond.parent, bond.child);
        let (parent_position, child_position) = (bond.parent_position, bond.child_position);
        let (parent_loss, child_loss) = (bond.parent_loss.clone(), bond.child_loss.clone());
        let to_substituent = self.node(child)?.is_substituent();

        let parent_node = self.node_mut(parent)?;
        *parent_node.composition_mut() -= &parent_loss;
        parent_node.register_parent_side(parent_position, id, to_substituent);

        let child_node = self.node_mut(child)?;
        *child_node.composition_mut() -= &child_loss;
        child_node.register_child_side(child_position, id);

        if let Some(bond) = self.bonds.get_mut(&id) {
            bond.state = BondState::Attached;
        }
        Ok(())
    }

    /// Severs an attached bond, deregistering it from both endpoints. With
    /// `refund`, both endpoints get their losses back, restoring their
    /// free compositions
    pub fn detach_bond(&mut self, id: BondId, refund: bool) -> Result<()> {
        let bond = self.bond(id)?;
        if !bond.is_attached() {
            return Err(GlycanError::BondDetached { id }.into());
        }
        let (parent, child) = (bond.parent, bond.child);
        let (parent_loss, child_loss) = (bond.parent_loss.clone(), bond.child_loss.clone());

        let parent_node = self.node_mut(parent)?;
        parent_node.deregister(id);
        if refund {
            *parent_node.composition_mut() += &parent_loss;
        }

        let child_node = self.node_mut(child)?;
        child_node.deregister(id);
        if refund {
            *child_node.composition_mut() += &child_loss;
        }

        if let Some(bond) = self.bonds.get_mut(&id) {
            bond.state = BondState::Detached;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Construction

    /// Bonds a new monosaccharide under `parent` with the standard
    /// glycosidic losses: the parent gives up a hydrogen and the child a
    /// hydroxyl, condensing out one water per bond
    pub fn add_monosaccharide(
        &mut self,
        parent: NodeId,
        parent_position: Position,
        child: Monosaccharide,
        child_position: Position,
        max_occupancy: usize,
    ) -> Result<NodeId> {
        self.add_monosaccharide_with_losses(
            parent,
            parent_position,
            child,
            child_position,
            composition![H: 1],
            composition![O: 1, H: 1],
            max_occupancy,
        )
    }

    /// [`add_monosaccharide`](Self::add_monosaccharide) with explicit losses
    #[allow(clippy::too_many_arguments)]
    pub fn add_monosaccharide_with_losses(
        &mut self,
        parent: NodeId,
        parent_position: Position,
        child: Monosaccharide,
        child_position: Position,
        parent_loss: Composition,
        child_loss: Composition,
        max_occupancy: usize,
    ) -> Result<NodeId> {
        self.check_occupancy(parent, parent_position, max_occupancy)?;
        let occupants = child.is_occupied(child_position);
        if occupants > max_occupancy {
            return Err(GlycanError::occupied(child_position, occupants, max_occupancy).into());
        }

        let child_id = self.fresh_node_id();
        self.nodes.insert(child_id, Node::Residue(child));
        let bond_id = self.fresh_bond_id();
        self.bonds.insert(
            bond_id,
            Bond::new(
                parent,
                child_id,
                parent_position,
                child_position,
                parent_loss,
                child_loss,
            ),
        );
        self.attach_bond(bond_id)?;
        self.index.push(child_id);
        self.link_index.push(bond_id);
        Ok(child_id)
    }

    /// Bonds a substituent to `node`: the node gives up the substituent's
    /// attachment loss and the substituent gives up a hydrogen
    pub fn add_substituent(
        &mut self,
        node: NodeId,
        position: Position,
        substituent: Substituent,
        max_occupancy: usize,
    ) -> Result<NodeId> {
        self.check_occupancy(node, position, max_occupancy)?;
        let parent_loss = substituent.attachment_loss.clone();

        let child_id = self.fresh_node_id();
        self.nodes.insert(child_id, Node::Substituent(substituent));
        let bond_id = self.fresh_bond_id();
        self.bonds.insert(
            bond_id,
            Bond::new(
                node,
                child_id,
                position,
                Position::Known(1),
                parent_loss,
                composition![H: 1],
            ),
        );
        self.attach_bond(bond_id)?;
        Ok(child_id)
    }

    fn check_occupancy(&self, node: NodeId, position: Position, max_occupancy: usize) -> Result<()> {
        let occupants = self.node(node)?.is_occupied(position);
        if occupants > max_occupancy {
            return Err(GlycanError::occupied(position, occupants, max_occupancy).into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Modifications

    /// Applies a backbone modification to a residue, shifting its
    /// composition. Occupancy-exempt markers (ketone, alditol) skip the
    /// occupancy check
    pub fn add_modification(
        &mut self,
        node: NodeId,
        position: Position,
        modification: Modification,
        max_occupancy: usize,
    ) -> Result<()> {
        self.residue(node)?;
        if !modification.is_occupancy_exempt() {
            self.check_occupancy(node, position, max_occupancy)?;
        }
        let residue = self.residue_mut(node)?;
        residue.composition += &modification.composition_shift();
        residue.modifications.push(position, modification);
        Ok(())
    }

    /// Removes a modification and reverses its composition shift
    pub fn drop_modification(
        &mut self,
        node: NodeId,
        position: Position,
        modification: Modification,
    ) -> Result<()> {
        let residue = self.residue_mut(node)?;
        residue
            .modifications
            .remove(position, &modification)
            .ok_or_else(|| GlycanError::attachment_lookup("modification", position))?;
        residue.composition -= &modification.composition_shift();
        Ok(())
    }

    /// Marks the residue as reduced (an alditol at the anomeric carbon),
    /// adding two hydrogens. A no-op on an already-reduced residue
    pub fn set_reduced(&mut self, node: NodeId) -> Result<()> {
        if self.residue(node)?.is_reduced() {
            return Ok(());
        }
        self.add_modification(node, Position::Known(1), Modification::Alditol, 0)
    }

    pub fn is_reduced(&self, node: NodeId) -> Result<bool> {
        Ok(self.residue(node)?.is_reduced())
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Removal

    /// Severs the residue–residue bond at `position` under `parent` (with a
    /// full refund on both sides) and returns the disconnected subtree as
    /// its own glycan
    pub fn drop_monosaccharide(&mut self, parent: NodeId, position: Position) -> Result<Glycan> {
        let residue = self.residue(parent)?;
        let bond_id = residue
            .links
            .get(position)
            .copied()
            .find(|&id| self.bonds.get(&id).is_some_and(|b| b.is_parent(parent)))
            .ok_or_else(|| GlycanError::attachment_lookup("monosaccharide", position))?;
        let child = self.bond(bond_id)?.child;

        self.detach_bond(bond_id, true)?;
        let component: HashSet<_> = self.component(child).into_iter().collect();
        let subtree = self.extract(&component, child);
        self.remove_nodes(&component);
        Ok(subtree)
    }

    /// Severs the substituent bond at `position` on `node` (with a full
    /// refund) and returns the substituent. Any substituents chained below
    /// it are discarded
    pub fn drop_substituent(&mut self, node: NodeId, position: Position) -> Result<Substituent> {
        let bond_id = self
            .node(node)?
            .bond_ids()
            .find(|&id| {
                self.bonds.get(&id).is_some_and(|b| {
                    b.is_parent(node)
                        && b.parent_position == position
                        && self.nodes.get(&b.child).is_some_and(Node::is_substituent)
                })
            })
            .ok_or_else(|| GlycanError::attachment_lookup("substituent", position))?;
        let child = self.bond(bond_id)?.child;

        self.detach_bond(bond_id, true)?;
        let component: HashSet<_> = self.component(child).into_iter().collect();
        let top = match self.nodes.get(&child) {
            Some(Node::Substituent(substituent)) => {
                let mut top = substituent.clone();
                top.links.clear();
                top
            }
            _ => return Err(GlycanError::NotASubstituent { id: child }.into()),
        };
        self.remove_nodes(&component);
        Ok(top)
    }

    fn remove_nodes(&mut self, removed: &HashSet<NodeId>) {
        self.nodes.retain(|id, _| !removed.contains(id));
        self.bonds
            .retain(|_, bond| !removed.contains(&bond.parent) && !removed.contains(&bond.child));
        self.index.retain(|id| !removed.contains(id));
        let bonds = &self.bonds;
        self.link_index.retain(|id| bonds.contains_key(id));
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Connectivity

    /// All nodes reachable from `start` over attached bonds, in BFS order
    #[must_use]
    pub fn component(&self, start: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        seen.insert(start);
        let mut queue = VecDeque::from([start]);
        let mut component = Vec::new();
        while let Some(node) = queue.pop_front() {
            component.push(node);
            let Some(node_data) = self.nodes.get(&node) else {
                continue;
            };
            for bond_id in node_data.bond_ids() {
                let neighbour = self
                    .bonds
                    .get(&bond_id)
                    .and_then(|bond| bond.other(node).ok());
                if let Some(neighbour) = neighbour {
                    if seen.insert(neighbour) {
                        queue.push_back(neighbour);
                    }
                }
            }
        }
        component
    }

    /// The residue children of `node`, as `(parent_position, child)` pairs
    /// in registration order
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<(Position, NodeId)> {
        let Some(Node::Residue(residue)) = self.nodes.get(&node) else {
            return Vec::new();
        };
        residue
            .links
            .iter()
            .filter_map(|(position, &id)| {
                let bond = self.bonds.get(&id)?;
                bond.is_parent(node).then_some((position, bond.child))
            })
            .collect()
    }

    /// The substituents attached directly to `node` (residue or substituent)
    #[must_use]
    pub fn substituents(&self, node: NodeId) -> Vec<(Position, NodeId)> {
        let map = match self.nodes.get(&node) {
            Some(Node::Residue(residue)) => &residue.substituent_links,
            Some(Node::Substituent(substituent)) => &substituent.links,
            None => return Vec::new(),
        };
        map.iter()
            .filter_map(|(position, &id)| {
                let bond = self.bonds.get(&id)?;
                bond.is_parent(node).then_some((position, bond.child))
            })
            .collect()
    }

    /// The bond connecting `node` up to its parent, if it has one
    #[must_use]
    pub fn parent_bond(&self, node: NodeId) -> Option<BondId> {
        self.nodes.get(&node)?.bond_ids().find(|&id| {
            self.bonds
                .get(&id)
                .is_some_and(|bond| bond.is_child(node))
        })
    }

    #[must_use]
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        let bond = self.bonds.get(&self.parent_bond(node)?)?;
        Some(bond.parent)
    }

    /// The out-degree of `node`: residue children plus direct substituents
    #[must_use]
    pub fn order(&self, node: NodeId) -> usize {
        self.children(node).len() + self.substituents(node).len()
    }

    #[must_use]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.children(node).is_empty()
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Compositions and masses

    /// The composition of the component containing the root. Bond losses
    /// were already deducted from each endpoint at attachment, so this is a
    /// plain sum over node compositions
    #[must_use]
    pub fn total_composition(&self) -> Composition {
        self.component(self.root)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .map(|node| node.composition().clone())
            .sum()
    }

    /// The composition of one residue together with every substituent
    /// hanging off it (but none of its residue children)
    pub fn node_total_composition(&self, node: NodeId) -> Result<Composition> {
        let mut total = self.node(node)?.composition().clone();
        let mut stack: Vec<_> = self.substituents(node).into_iter().map(|(_, id)| id).collect();
        while let Some(id) = stack.pop() {
            total += self.node(id)?.composition();
            stack.extend(self.substituents(id).into_iter().map(|(_, id)| id));
        }
        Ok(total)
    }

    pub fn calc_mass(&self, average: bool, charge: Charge) -> Result<Mass> {
        self.total_composition().calc_mass(average, charge)
    }

    // -----------------------------------------------------------------------------------------------------------------
    // Extraction

    /// Copies the nodes in `include` (and the attached bonds running wholly
    /// between them) into a new glycan rooted at `root`, preserving ids.
    /// Link-map entries referring to bonds outside the copy are stripped;
    /// compositions are copied as they stand
    pub(crate) fn extract(&self, include: &HashSet<NodeId>, root: NodeId) -> Glycan {
        let bonds: HashMap<BondId, Bond> = self
            .bonds
            .iter()
            .filter(|(_, bond)| {
                bond.is_attached()
                    && include.contains(&bond.parent)
                    && include.contains(&bond.child)
            })
            .map(|(&id, bond)| (id, bond.clone()))
            .collect();

        let mut nodes: HashMap<NodeId, Node> = self
            .nodes
            .iter()
            .filter(|(id, _)| include.contains(id))
            .map(|(&id, node)| (id, node.clone()))
            .collect();
        for node in nodes.values_mut() {
            node.retain_bonds(|id| bonds.contains_key(&id));
        }

        let mut index: Vec<_> = self
            .index
            .iter()
            .copied()
            .filter(|id| include.contains(id))
            .collect();
        // The new root leads its index
        if let Some(at) = index.iter().position(|&id| id == root) {
            index.remove(at);
            index.insert(0, root);
        }
        let link_index = self
            .link_index
            .iter()
            .copied()
            .filter(|id| bonds.contains_key(id))
            .collect();

        Glycan {
            root,
            nodes,
            bonds,
            index,
            link_index,
            branch_lengths: HashMap::new(),
            next_node: self.next_node,
            next_bond: self.next_bond,
        }
    }

    /// A copy of one residue and its substituent subtree, cut loose from
    /// the rest of the structure
    pub fn clone_residue(&self, node: NodeId) -> Result<Glycan> {
        self.residue(node)?;
        let mut include = HashSet::new();
        include.insert(node);
        let mut stack: Vec<_> = self.substituents(node).into_iter().map(|(_, id)| id).collect();
        while let Some(id) = stack.pop() {
            if include.insert(id) {
                stack.extend(self.substituents(id).into_iter().map(|(_, id)| id));
            }
        }
        Ok(self.extract(&include, node))
    }
}

impl Massive for Glycan {
    fn monoisotopic_mass(&self) -> Mass {
        self.total_composition().monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.total_composition().average_mass()
    }
}

// Renders the structure as a Graphviz digraph for eyeballing
impl Display for Glycan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "digraph {{")?;
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        for id in &ids {
            match &self.nodes[id] {
                Node::Residue(residue) => writeln!(
                    f,
                    "  {id} [label=\"{}-{}-{}\"]",
                    residue.anomer,
                    residue.stem.first().copied().unwrap_or_default(),
                    residue.superclass,
                )?,
                Node::Substituent(substituent) => {
                    writeln!(f, "  {id} [label=\"{}\" shape=box]", substituent.name)?;
                }
            }
        }
        let mut bond_ids: Vec<_> = self.bonds.keys().copied().collect();
        bond_ids.sort_unstable();
        for id in bond_ids {
            let bond = &self.bonds[&id];
            if bond.is_attached() {
                writeln!(
                    f,
                    "  {} -> {} [label=\"{}→{}\"]",
                    bond.parent, bond.child, bond.parent_position, bond.child_position
                )?;
            }
        }
        write!(f, "}}")
    }
}

// =====================================================================================================================

#[cfg(test)]
pub(crate) mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::{Anomer, Configuration, Stem, SuperClass};

    pub(crate) fn hexose() -> Monosaccharide {
        Monosaccharide::new(
            Anomer::Beta,
            vec![Configuration::D],
            vec![Stem::Glc],
            SuperClass::Hex,
            Some(1),
            Some(5),
        )
    }

    /// Hex-(1→4)-Hex-(1→4)-Hex, root first
    pub(crate) fn trisaccharide() -> Glycan {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        let middle = glycan
            .add_monosaccharide(root, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
            .add_monosaccharide(middle, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
    }

    /// A branched pentasaccharide: the root bears a linear arm of two
    /// residues at C4 and a single residue at C6, with the arm itself
    /// branching at C3
    pub(crate) fn branched() -> Glycan {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        let arm = glycan
            .add_monosaccharide(root, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
            .add_monosaccharide(arm, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
            .add_monosaccharide(arm, Position::Known(3), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
            .add_monosaccharide(root, Position::Known(6), hexose(), Position::Known(1), 0)
            .unwrap();
        glycan
    }

    #[test]
    fn single_residue() {
        let glycan = Glycan::new(hexose());
        assert_eq!(glycan.residue_count(), 1);
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C6H12O6").unwrap()
        );
        assert_eq!(glycan.monoisotopic_mass(), dec!(180.06338810220).into());
    }

    #[test]
    fn each_glycosidic_bond_condenses_water() {
        let glycan = trisaccharide();
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C18H32O16").unwrap()
        );
        // 3 × hexose − 2 × water
        let expected = dec!(180.06338810220) * dec!(3) - dec!(18.01056468370) * dec!(2);
        assert_eq!(glycan.monoisotopic_mass(), expected.into());
    }

    #[test]
    fn occupancy_is_enforced() {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        glycan
            .add_monosaccharide(root, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap();
        let err = glycan
            .add_monosaccharide(root, Position::Known(4), hexose(), Position::Known(1), 0)
            .unwrap_err();
        assert!(matches!(*err, GlycanError::Occupied { occupants: 1, .. }));

        // Raising the occupancy limit permits the doubled linkage
        glycan
            .add_monosaccharide(root, Position::Known(4), hexose(), Position::Known(1), 1)
            .unwrap();
    }

    #[test]
    fn detach_refund_restores_composition() {
        let mut glycan = trisaccharide();
        let before = glycan.total_composition();
        let bond = glycan.link_ids()[1];

        glycan.detach_bond(bond, true).unwrap();
        // The leaf is now its own component with its free composition back
        let leaf = glycan.bond(bond).unwrap().child();
        assert_eq!(glycan.component(leaf), [leaf]);
        assert_eq!(
            glycan.node(leaf).unwrap().composition(),
            &Composition::from_formula("C6H12O6").unwrap()
        );

        glycan.attach_bond(bond).unwrap();
        assert_eq!(glycan.total_composition(), before);
    }

    #[test]
    fn double_attach_and_detach_are_rejected() {
        let mut glycan = trisaccharide();
        let bond = glycan.link_ids()[0];
        let err = glycan.attach_bond(bond).unwrap_err();
        assert!(matches!(*err, GlycanError::BondAttached { .. }));

        glycan.detach_bond(bond, true).unwrap();
        let err = glycan.detach_bond(bond, true).unwrap_err();
        assert!(matches!(*err, GlycanError::BondDetached { .. }));
    }

    #[test]
    fn substituents_shift_composition() {
        // GlcNAc = Glc + N-acetyl: C6H12O6 − OH − H + C2H5NO = C8H15NO6
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
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C8H15NO6").unwrap()
        );
        assert_eq!(glycan.monoisotopic_mass(), dec!(221.08993720321).into());
    }

    #[test]
    fn node_total_composition_includes_substituents() {
        let mut glycan = trisaccharide();
        let root = glycan.root();
        glycan
            .add_substituent(
                root,
                Position::Known(2),
                Substituent::new("n_acetyl").unwrap(),
                0,
            )
            .unwrap();
        assert_eq!(
            glycan.node_total_composition(root).unwrap(),
            // Root has lost an H to its child bond on top of the N-acetyl's OH
            Composition::from_formula("C8H14NO6").unwrap()
        );
    }

    #[test]
    fn modifications_shift_composition() {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        glycan
            .add_modification(root, Position::Known(6), Modification::Deoxygenated, 0)
            .unwrap();
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C6H12O5").unwrap()
        );

        glycan
            .drop_modification(root, Position::Known(6), Modification::Deoxygenated)
            .unwrap();
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C6H12O6").unwrap()
        );

        let err = glycan
            .drop_modification(root, Position::Known(6), Modification::Deoxygenated)
            .unwrap_err();
        assert!(matches!(*err, GlycanError::AttachmentLookup { .. }));
    }

    #[test]
    fn reduction_is_idempotent() {
        let mut glycan = Glycan::new(hexose());
        let root = glycan.root();
        glycan.set_reduced(root).unwrap();
        glycan.set_reduced(root).unwrap();
        assert!(glycan.is_reduced(root).unwrap());
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C6H14O6").unwrap()
        );
    }

    #[test]
    fn connectivity_queries() {
        let glycan = branched();
        let root = glycan.root();
        let children = glycan.children(root);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].0, Position::Known(4));
        assert_eq!(children[1].0, Position::Known(6));
        assert_eq!(glycan.order(root), 2);
        assert_eq!(glycan.parent_of(root), None);

        let arm = children[0].1;
        assert_eq!(glycan.parent_of(arm), Some(root));
        assert_eq!(glycan.children(arm).len(), 2);
        assert_eq!(glycan.component(root).len(), 5);
    }

    #[test]
    fn drop_monosaccharide_splits_the_tree() {
        let mut glycan = branched();
        let root = glycan.root();
        let arm = glycan.children(root)[0].1;

        let subtree = glycan.drop_monosaccharide(root, Position::Known(4)).unwrap();
        assert_eq!(subtree.root(), arm);
        assert_eq!(subtree.residue_count(), 3);
        assert_eq!(glycan.residue_count(), 2);

        // Both sides got their bond losses back
        assert_eq!(
            glycan.total_composition() + subtree.total_composition(),
            Composition::from_formula("C6H12O6").unwrap() * 5
                - Composition::from_formula("H2O").unwrap() * 3
        );

        let err = glycan.drop_monosaccharide(root, Position::Known(4)).unwrap_err();
        assert!(matches!(*err, GlycanError::AttachmentLookup { .. }));
    }

    #[test]
    fn drop_substituent_refunds_the_residue() {
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

        let dropped = glycan.drop_substituent(root, Position::Known(2)).unwrap();
        assert_eq!(dropped, Substituent::new("n_acetyl").unwrap());
        assert_eq!(
            glycan.total_composition(),
            Composition::from_formula("C6H12O6").unwrap()
        );
    }

    #[test]
    fn clone_residue_carries_substituents_only() {
        let mut glycan = trisaccharide();
        let root = glycan.root();
        glycan
            .add_substituent(
                root,
                Position::Known(2),
                Substituent::new("n_acetyl").unwrap(),
                0,
            )
            .unwrap();

        let cloned = glycan.clone_residue(root).unwrap();
        assert_eq!(cloned.residue_count(), 1);
        assert_eq!(cloned.component(cloned.root()).len(), 2);
        // The composition keeps its bond deduction to the (absent) child
        assert_eq!(
            cloned.total_composition(),
            Composition::from_formula("C8H14NO6").unwrap()
        );
    }

    #[test]
    fn lookups_fail_cleanly() {
        let glycan = Glycan::new(hexose());
        assert!(matches!(
            *glycan.node(NodeId(99)).unwrap_err(),
            GlycanError::NodeLookup { .. }
        ));
        assert!(matches!(
            *glycan.bond(BondId(99)).unwrap_err(),
            GlycanError::BondLookup { .. }
        ));
        assert!(matches!(
            *glycan.substituent(glycan.root()).unwrap_err(),
            GlycanError::NotASubstituent { .. }
        ));
    }
}
