use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{BondId, Charge, IonSeries, NodeId, Position};

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum GlycanError {
    #[error("failed to parse the chemical formula")]
    #[diagnostic(
        code(glycochem::formula),
        help("formulas look like `C6H12O6`, `C[13]6H12O6`, or `(H2O)2H+2`")
    )]
    Formula {
        #[source_code]
        formula: String,
        #[label("couldn't be parsed from here")]
        span: SourceSpan,
    },

    #[error("{symbol:?} is not a recognised {kind}")]
    #[diagnostic(code(glycochem::lookup))]
    Lookup {
        kind: &'static str,
        symbol: String,
        #[help]
        help: String,
    },

    #[error("no node with id {id} exists in this glycan")]
    #[diagnostic(code(glycochem::node_lookup))]
    NodeLookup { id: NodeId },

    #[error("no bond with id {id} exists in this glycan")]
    #[diagnostic(code(glycochem::bond_lookup))]
    BondLookup { id: BondId },

    #[error("node {id} is a substituent, but a monosaccharide was required")]
    #[diagnostic(code(glycochem::not_a_residue))]
    NotAResidue { id: NodeId },

    #[error("node {id} is a monosaccharide, but a substituent was required")]
    #[diagnostic(code(glycochem::not_a_substituent))]
    NotASubstituent { id: NodeId },

    #[error("{position:?} already has {occupants} occupant(s), exceeding the limit of {max_occupancy}")]
    #[diagnostic(
        code(glycochem::occupied),
        help("try `open_attachment_sites()` to find a free position")
    )]
    Occupied {
        position: Position,
        occupants: usize,
        max_occupancy: usize,
    },

    #[error("bond {id} is already attached")]
    #[diagnostic(code(glycochem::bond_attached))]
    BondAttached { id: BondId },

    #[error("bond {id} is already detached")]
    #[diagnostic(code(glycochem::bond_detached))]
    BondDetached { id: BondId },

    #[error("node {id} is not an endpoint of this bond")]
    #[diagnostic(code(glycochem::not_an_endpoint))]
    NotAnEndpoint { id: NodeId },

    #[error("no {kind} was found at {position:?}")]
    #[diagnostic(code(glycochem::attachment_lookup))]
    AttachmentLookup {
        kind: &'static str,
        position: Position,
    },

    #[error(
        "cannot compute an m/z for a composition containing dissociated protons \
         when an explicit charge of {charge} is also given"
    )]
    #[diagnostic(
        code(glycochem::charged_composition),
        help("either drop the `H+` entries from the formula, or pass a charge of zero")
    )]
    ChargedComposition { charge: Charge },

    #[error("cannot cleave the ring of an open-chain or unknown-ring monosaccharide")]
    #[diagnostic(code(glycochem::ring_cleavage))]
    RingCleavage,

    #[error("({c1}, {c2}) is not a valid cleavage pair for a ring of size {ring_size}")]
    #[diagnostic(
        code(glycochem::cleavage_sites),
        help("sites must satisfy c1 < c2, leave more than one carbon between cuts, \
              and not sever the entire ring")
    )]
    CleavageSites { c1: u32, c2: u32, ring_size: u32 },

    #[error("{series} ions cannot be produced by glycosidic cleavage")]
    #[diagnostic(
        code(glycochem::unsupported_series),
        help("glycosidic fragments are limited to the B, C, Y, and Z series")
    )]
    UnsupportedSeries { series: IonSeries },

    #[error("refusing to brute-force an assignment of {a_count}×{b_count} children (limit {limit})")]
    #[diagnostic(
        code(glycochem::assignment_overflow),
        help("raise `SimilarityOptions::assignment_limit` if you really need this")
    )]
    AssignmentOverflow {
        a_count: usize,
        b_count: usize,
        limit: usize,
    },

    #[error("the supplied traversal order doesn't cover this glycan's residues exactly once")]
    #[diagnostic(code(glycochem::invalid_order))]
    InvalidOrder,
}

impl GlycanError {
    pub(crate) fn formula(formula: &str, remaining: usize) -> Self {
        let offset = formula.len() - remaining;
        Self::Formula {
            formula: formula.to_owned(),
            span: (offset, remaining).into(),
        }
    }

    pub(crate) fn lookup(kind: &'static str, symbol: &str, valid: &[&str]) -> Self {
        Self::Lookup {
            kind,
            symbol: symbol.to_owned(),
            help: format!("valid names are: {}", valid.join(", ")),
        }
    }

    pub(crate) const fn node_lookup(id: NodeId) -> Self {
        Self::NodeLookup { id }
    }

    pub(crate) const fn bond_lookup(id: BondId) -> Self {
        Self::BondLookup { id }
    }

    pub(crate) const fn occupied(
        position: Position,
        occupants: usize,
        max_occupancy: usize,
    ) -> Self {
        Self::Occupied {
            position,
            occupants,
            max_occupancy,
        }
    }

    pub(crate) const fn attachment_lookup(kind: &'static str, position: Position) -> Self {
        Self::AttachmentLookup { kind, position }
    }
}
