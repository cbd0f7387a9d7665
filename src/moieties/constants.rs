//! Closed vocabularies for describing monosaccharides. Free-text aliases
//! from the upstream data formats are resolved here, at the construction
//! boundary, so the rest of the crate only ever sees the enums

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::Serialize;

use crate::atoms::composition::composition;
use crate::{Composition, GlycanError, Result};

/// The configuration of the linkage at the anomeric carbon
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize)]
pub enum Anomer {
    Alpha,
    Beta,
    Uncyclized,
    #[default]
    Unknown,
}

/// Optical configuration of a stereocenter
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize)]
pub enum Configuration {
    D,
    L,
    #[default]
    Unknown,
}

/// The stereochemical family of the carbohydrate backbone
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize)]
pub enum Stem {
    Gro,
    Ery,
    Rib,
    Ara,
    All,
    Alt,
    Glc,
    Man,
    Tre,
    Xyl,
    Lyx,
    Gul,
    Ido,
    Gal,
    Tal,
    Thr,
    #[default]
    Unknown,
}

/// The number of carbon atoms in the carbohydrate backbone
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default, Serialize)]
pub enum SuperClass {
    Tri,
    Tet,
    Pen,
    Hex,
    Hep,
    Oct,
    Non,
    #[default]
    Unknown,
}

/// Small composition shifts on the backbone that don't warrant a full
/// substituent node
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum Modification {
    /// Deoxygenation (`d`): −O
    Deoxygenated,
    /// Ketone (`keto`): −H2
    Ketone,
    /// A double bond (`en`): −H2 −O
    DoubleBond,
    /// Acidic (`a`): −H2 +O
    Acidic,
    /// Alditol (`aldi`): +H2 — marks a reduced (reducing-end) residue
    Alditol,
}

/// The shape of the closed ring, derived from the ring bounds
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum RingType {
    Pyranose,
    Furanose,
    Open,
    Unknown,
}

/// Domon–Costello fragment series. A and X are cross-ring; the rest are
/// glycosidic. X, Y, and Z fragments retain the reducing end
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum IonSeries {
    A,
    B,
    C,
    X,
    Y,
    Z,
}

// ---------------------------------------------------------------------------------------------------------------------

macro_rules! aliases {
    ($type:ty, $kind:literal => $($variant:ident: $symbol:literal $(| $alias:literal)*),+ $(,)?) => {
        impl $type {
            #[must_use]
            pub const fn symbol(self) -> &'static str {
                match self {
                    $(Self::$variant => $symbol),+
                }
            }
        }

        impl Display for $type {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(self.symbol())
            }
        }

        impl FromStr for $type {
            type Err = Box<GlycanError>;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($symbol $(| $alias)* => Ok(Self::$variant),)+
                    _ => Err(GlycanError::lookup($kind, s, &[$($symbol),+]).into()),
                }
            }
        }
    };
}

aliases!(Anomer, "anomer" =>
    Alpha: "a" | "alpha",
    Beta: "b" | "beta",
    Uncyclized: "o" | "open-chain" | "uncyclized",
    Unknown: "x" | "?",
);

aliases!(Configuration, "configuration" =>
    D: "d" | "dextro",
    L: "l" | "levo",
    Unknown: "x" | "?",
);

aliases!(Stem, "stem" =>
    Gro: "gro" | "glyceraldehyde",
    Ery: "ery" | "erythrose",
    Rib: "rib" | "ribose",
    Ara: "ara" | "arabinose",
    All: "all" | "allose",
    Alt: "alt" | "altrose",
    Glc: "glc" | "glucose",
    Man: "man" | "mannose",
    Tre: "tre" | "threose",
    Xyl: "xyl" | "xylose",
    Lyx: "lyx" | "lyxose",
    Gul: "gul" | "gulose",
    Ido: "ido" | "idose",
    Gal: "gal" | "galactose",
    Tal: "tal" | "talose",
    Thr: "thr",
    Unknown: "x" | "?",
);

aliases!(SuperClass, "superclass" =>
    Tri: "tri" | "triose",
    Tet: "tet" | "tetrose",
    Pen: "pen" | "pentose",
    Hex: "hex" | "hexose",
    Hep: "hep" | "heptose",
    Oct: "oct" | "octose",
    Non: "non" | "nonose",
    Unknown: "x" | "?",
);

aliases!(Modification, "modification" =>
    Deoxygenated: "d" | "deoxygenated",
    Ketone: "keto" | "ketone",
    DoubleBond: "en" | "doublebond",
    Acidic: "a" | "acidic",
    Alditol: "aldi" | "alditol",
);

aliases!(IonSeries, "ion series" =>
    A: "A",
    B: "B",
    C: "C",
    X: "X",
    Y: "Y",
    Z: "Z",
);

// ---------------------------------------------------------------------------------------------------------------------

impl SuperClass {
    /// The number of backbone carbons, or `None` for the unknown superclass
    #[must_use]
    pub const fn carbons(self) -> Option<u32> {
        match self {
            Self::Tri => Some(3),
            Self::Tet => Some(4),
            Self::Pen => Some(5),
            Self::Hex => Some(6),
            Self::Hep => Some(7),
            Self::Oct => Some(8),
            Self::Non => Some(9),
            Self::Unknown => None,
        }
    }

    /// The unmodified backbone composition, `(CH2O)·n`
    #[must_use]
    pub fn base_composition(self) -> Composition {
        match self.carbons() {
            Some(n) => composition![C: 1, H: 2, O: 1] * n as i32,
            None => Composition::new(),
        }
    }
}

impl Modification {
    /// The composition delta this modification applies to its residue
    #[must_use]
    pub fn composition_shift(self) -> Composition {
        match self {
            Self::Deoxygenated => composition![O: -1],
            Self::Ketone => composition![H: -2],
            Self::DoubleBond => composition![H: -2, O: -1],
            Self::Acidic => composition![H: -2, O: 1],
            Self::Alditol => composition![H: 2],
        }
    }

    /// Ketones and alditols mark the state of the reducing carbon rather
    /// than occupying an attachment site
    #[must_use]
    pub const fn is_occupancy_exempt(self) -> bool {
        matches!(self, Self::Ketone | Self::Alditol)
    }
}

impl RingType {
    #[must_use]
    pub const fn from_bounds(ring_start: Option<u32>, ring_end: Option<u32>) -> Self {
        if let (Some(start), Some(end)) = (ring_start, ring_end) {
            if start == 0 && end == 0 {
                Self::Open
            } else if end >= start && end - start == 4 {
                Self::Pyranose
            } else if end >= start && end - start == 3 {
                Self::Furanose
            } else {
                Self::Unknown
            }
        } else {
            Self::Unknown
        }
    }
}

impl IonSeries {
    #[must_use]
    pub const fn is_crossring(self) -> bool {
        matches!(self, Self::A | Self::X)
    }

    #[must_use]
    pub const fn is_glycosidic(self) -> bool {
        !self.is_crossring()
    }

    /// Whether fragments of this series retain the reducing end
    #[must_use]
    pub const fn is_reducing(self) -> bool {
        matches!(self, Self::X | Self::Y | Self::Z)
    }

    /// The composition lost relative to the intact component: B and Z ions
    /// give up a water-equivalent at the cleaved bond, C and Y do not
    #[must_use]
    pub fn composition_shift(self) -> Composition {
        match self {
            Self::B | Self::Z => composition![H: 2, O: 1],
            _ => Composition::new(),
        }
    }
}
