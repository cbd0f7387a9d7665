//! Chemically validated glycan structures: composition arithmetic, attachment
//! bookkeeping, glycosidic and cross-ring fragmentation, and topology
//! comparison

pub mod atoms;
pub mod compare;
pub mod errors;
pub mod glycan;
pub mod moieties;

use ahash::HashMap;
use derive_more::{Add, AddAssign, Display, From, Into, Neg, Sub, SubAssign, Sum};
use rust_decimal::Decimal;
use serde::Serialize;
use static_assertions::assert_impl_all;

pub use atoms::element::{Element, Isotope};
pub use errors::GlycanError;
pub use moieties::constants::{
    Anomer, Configuration, IonSeries, Modification, RingType, Stem, SuperClass,
};
pub use moieties::multimap::PositionMap;

pub type Result<T, E = Box<GlycanError>> = std::result::Result<T, E>;

// NOTE: This underlying `Id` type is just a synonym since it's private to this crate — only `Glycan` can forge new
// ids, so no newtype machinery is needed here
type Id = usize;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
pub struct NodeId(Id);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Display, Serialize)]
pub struct BondId(Id);

#[cfg(test)]
impl NodeId {
    pub(crate) const fn tester(id: Id) -> Self {
        Self(id)
    }
}

/// A backbone attachment position. `Unknown` sorts before every known
/// position, matching the original data format's `-1` sentinel
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum Position {
    Unknown,
    Known(u32),
}

impl Position {
    #[must_use]
    pub const fn known(self) -> Option<u32> {
        match self {
            Self::Unknown => None,
            Self::Known(p) => Some(p),
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => f.write_str("?"),
            Self::Known(p) => write!(f, "{p}"),
        }
    }
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Serialize, Add,
    AddAssign, Sub, SubAssign, Neg, Sum, From, Into,
)]
pub struct Mass(Decimal);

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Display, Serialize, Add,
    AddAssign, Sub, SubAssign, Neg, Sum, From, Into,
)]
pub struct Charge(i32);

/// An element, optionally pinned to a single mass number (e.g. `C[13]`)
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ElementSpec {
    element: Element,
    mass_number: Option<u32>,
}

/// A multiset of element counts. Entries with a count of zero are never
/// stored, so equality is equality of the non-zero counts
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Composition {
    counts: HashMap<ElementSpec, i32>,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct Monosaccharide {
    anomer: Anomer,
    configuration: Vec<Configuration>,
    stem: Vec<Stem>,
    superclass: SuperClass,
    // `None` = unknown, `Some(0)` = open chain
    ring_start: Option<u32>,
    ring_end: Option<u32>,
    composition: Composition,
    modifications: PositionMap<Modification>,
    links: PositionMap<BondId>,
    substituent_links: PositionMap<BondId>,
}

#[derive(Clone, Debug)]
pub struct Substituent {
    name: String,
    composition: Composition,
    attachment_loss: Composition,
    links: PositionMap<BondId>,
}

#[derive(Clone, Debug)]
pub enum Node {
    Residue(Monosaccharide),
    Substituent(Substituent),
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default, Serialize)]
pub enum BondState {
    Attached,
    #[default]
    Detached,
}

/// The place of a bond within the branch nomenclature: which branch it
/// belongs to (`-` is the main branch) and its distance from the root along
/// that branch
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize)]
pub struct BranchLabel {
    branch: char,
    distance: u32,
}

#[derive(Clone, Debug)]
pub struct Bond {
    parent: NodeId,
    child: NodeId,
    parent_position: Position,
    child_position: Position,
    parent_loss: Composition,
    child_loss: Composition,
    state: BondState,
    label: Option<BranchLabel>,
}

// ---------------------------------------------------------------------------------------------------------------------

/// An arena of residue and substituent nodes joined by bonds. Node and bond
/// ids are dense integers owned by the arena; cloning the arena clones the
/// whole structure with ids preserved
#[derive(Clone, Debug)]
pub struct Glycan {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    bonds: HashMap<BondId, Bond>,
    index: Vec<NodeId>,
    link_index: Vec<BondId>,
    branch_lengths: HashMap<char, u32>,
    next_node: Id,
    next_bond: Id,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum TraversalMethod {
    #[default]
    DepthFirst,
    BreadthFirst,
}

/// A single product ion from glycosidic cleavage
#[derive(Clone, Debug)]
pub struct Fragment {
    series: String,
    link_ids: Vec<(BondId, IonSeries)>,
    included_nodes: Vec<NodeId>,
    composition: Composition,
    name: String,
}

/// A re-rooted subtree produced by breaking glycosidic bonds, along with the
/// break records needed to turn it into fragments
#[derive(Clone, Debug)]
pub struct Substructure {
    tree: Glycan,
    include_nodes: Vec<NodeId>,
    link_ids: Vec<BondId>,
    parent_breaks: Vec<(BondId, NodeId)>,
    child_breaks: Vec<(BondId, NodeId)>,
}

/// One side of a ring cleaved at two backbone positions
#[derive(Clone, Debug)]
pub struct CrossRingFragment {
    series: IonSeries,
    cleave_1: u32,
    cleave_2: u32,
    contains: Vec<u32>,
    tree: Glycan,
}

/// A shared substructure found between two glycans, with the similarity
/// score that selected it
#[derive(Clone, Debug)]
pub struct CommonSubgraph {
    score: Decimal,
    tree: Glycan,
}

// ---------------------------------------------------------------------------------------------------------------------

pub trait Massive {
    fn monoisotopic_mass(&self) -> Mass;
    fn average_mass(&self) -> Mass;
}

pub trait Charged {
    fn charge(&self) -> Charge;
}

pub trait ChargedParticle: Massive + Charged {
    fn monoisotopic_mz(&self) -> Option<Mass> {
        self.monoisotopic_mass().checked_div(self.charge())
    }

    fn average_mz(&self) -> Option<Mass> {
        self.average_mass().checked_div(self.charge())
    }
}

impl<T: Massive> Massive for &T {
    fn monoisotopic_mass(&self) -> Mass {
        (**self).monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        (**self).average_mass()
    }
}

impl<T: Charged> Charged for &T {
    fn charge(&self) -> Charge {
        (**self).charge()
    }
}

impl<T: Massive + Charged> ChargedParticle for T {}

assert_impl_all!(Glycan: Send, Sync, Clone);
assert_impl_all!(Composition: Send, Sync);
