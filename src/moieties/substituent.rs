use crate::{
    BondId, Composition, GlycanError, Mass, Massive, Position, PositionMap, Result, Substituent,
    atoms::composition::composition,
};

impl Substituent {
    /// Looks up a substituent by name. Names are case-insensitive, and
    /// spaces or hyphens are treated as underscores (`"N-Acetyl"` and
    /// `"n_acetyl"` name the same substituent)
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        let name = internalize_name(name.as_ref());
        let (composition, attachment_loss) =
            registry(&name).ok_or_else(|| GlycanError::lookup("substituent", &name, KNOWN))?;
        Ok(Self {
            name,
            composition,
            attachment_loss,
            links: PositionMap::new(),
        })
    }

    /// Creates a substituent outside the built-in registry. The attachment
    /// loss is what the *parent* residue gives up when this substituent is
    /// bonded to it
    #[must_use]
    pub fn with_composition(
        name: impl Into<String>,
        composition: Composition,
        attachment_loss: Composition,
    ) -> Self {
        Self {
            name: internalize_name(&name.into()),
            composition,
            attachment_loss,
            links: PositionMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition {
        &self.composition
    }

    #[must_use]
    pub const fn attachment_loss(&self) -> &Composition {
        &self.attachment_loss
    }

    #[must_use]
    pub const fn links(&self) -> &PositionMap<BondId> {
        &self.links
    }

    #[must_use]
    pub fn is_occupied(&self, position: Position) -> usize {
        if position == Position::Unknown {
            return 0;
        }
        self.links.count_at(position)
    }
}

// Identity is the name and free composition; bond bookkeeping is excluded
impl PartialEq for Substituent {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.composition == other.composition
    }
}

impl Eq for Substituent {}

impl Massive for Substituent {
    fn monoisotopic_mass(&self) -> Mass {
        self.composition.monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.composition.average_mass()
    }
}

fn internalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// The free (unbonded) composition of each named substituent, and the
/// composition its parent residue loses on attachment: nitrogen-linked
/// substituents displace a backbone hydroxyl (OH), oxygen-linked ones a
/// lone hydrogen
fn registry(name: &str) -> Option<(Composition, Composition)> {
    let h = || composition![H: 1];
    let oh = || composition![O: 1, H: 1];
    Some(match name {
        "n_acetyl" => (composition![C: 2, H: 5, N: 1, O: 1], oh()),
        "n_glycolyl" => (composition![C: 2, H: 5, N: 1, O: 2], oh()),
        "n_sulfate" => (composition![N: 1, S: 1, O: 3, H: 3], oh()),
        "amino" => (composition![N: 1, H: 3], oh()),
        "imino" => (composition![N: 1, H: 2], oh()),
        "sulfate" => (composition![S: 1, O: 3, H: 2], h()),
        "phosphate" => (composition![P: 1, O: 3, H: 3], h()),
        "acetyl" => (composition![C: 2, H: 4, O: 1], h()),
        "methyl" => (composition![C: 1, H: 4], h()),
        "thio" => (composition![S: 1, H: 2], h()),
        "fluoro" => (composition![F: 1, H: 1], h()),
        "chloro" => (composition![Cl: 1, H: 1], h()),
        "bromo" => (composition![Br: 1, H: 1], h()),
        "iodo" => (composition![I: 1, H: 1], h()),
        _ => return None,
    })
}

const KNOWN: &[&str] = &[
    "n_acetyl",
    "n_glycolyl",
    "n_sulfate",
    "amino",
    "imino",
    "sulfate",
    "phosphate",
    "acetyl",
    "methyl",
    "thio",
    "fluoro",
    "chloro",
    "bromo",
    "iodo",
];
