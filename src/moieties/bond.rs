use crate::{
    Bond, BondState, BranchLabel, Composition, GlycanError, Mass, Massive, NodeId, Position,
    Result,
};

impl Bond {
    /// Bonds start out detached; [`Glycan::attach_bond`] applies the losses
    /// and registers the bond with both endpoints
    ///
    /// [`Glycan::attach_bond`]: crate::Glycan::attach_bond
    pub(crate) const fn new(
        parent: NodeId,
        child: NodeId,
        parent_position: Position,
        child_position: Position,
        parent_loss: Composition,
        child_loss: Composition,
    ) -> Self {
        Self {
            parent,
            child,
            parent_position,
            child_position,
            parent_loss,
            child_loss,
            state: BondState::Detached,
            label: None,
        }
    }

    #[must_use]
    pub const fn parent(&self) -> NodeId {
        self.parent
    }

    #[must_use]
    pub const fn child(&self) -> NodeId {
        self.child
    }

    #[must_use]
    pub const fn parent_position(&self) -> Position {
        self.parent_position
    }

    #[must_use]
    pub const fn child_position(&self) -> Position {
        self.child_position
    }

    #[must_use]
    pub const fn parent_loss(&self) -> &Composition {
        &self.parent_loss
    }

    #[must_use]
    pub const fn child_loss(&self) -> &Composition {
        &self.child_loss
    }

    #[must_use]
    pub const fn state(&self) -> BondState {
        self.state
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        matches!(self.state, BondState::Attached)
    }

    #[must_use]
    pub const fn label(&self) -> Option<BranchLabel> {
        self.label
    }

    #[must_use]
    pub fn is_parent(&self, node: NodeId) -> bool {
        self.parent == node
    }

    #[must_use]
    pub fn is_child(&self, node: NodeId) -> bool {
        self.child == node
    }

    /// The endpoint opposite `node`
    pub fn other(&self, node: NodeId) -> Result<NodeId> {
        if node == self.parent {
            Ok(self.child)
        } else if node == self.child {
            Ok(self.parent)
        } else {
            Err(GlycanError::NotAnEndpoint { id: node }.into())
        }
    }

    /// Everything both endpoints give up when this bond is attached
    pub(crate) fn total_loss(&self) -> Composition {
        self.parent_loss.clone() + &self.child_loss
    }
}

// Branch labels are presentation metadata, so they're excluded from identity
impl PartialEq for Bond {
    fn eq(&self, other: &Self) -> bool {
        self.parent == other.parent
            && self.child == other.child
            && self.parent_position == other.parent_position
            && self.child_position == other.child_position
            && self.parent_loss == other.parent_loss
            && self.child_loss == other.child_loss
            && self.state == other.state
    }
}

impl Eq for Bond {}

// An attached bond's contribution to its component is the negation of what
// its endpoints lost
impl Massive for Bond {
    fn monoisotopic_mass(&self) -> Mass {
        -self.total_loss().monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        -self.total_loss().average_mass()
    }
}

impl BranchLabel {
    #[must_use]
    pub const fn branch(self) -> char {
        self.branch
    }

    #[must_use]
    pub const fn distance(self) -> u32 {
        self.distance
    }
}
