use crate::{
    Anomer, BondId, Composition, Configuration, Mass, Massive, Modification, Monosaccharide,
    Position, PositionMap, RingType, Stem, SuperClass,
};

impl Monosaccharide {
    /// Creates a free monosaccharide with the unmodified backbone
    /// composition of its superclass. Ring bounds of `None` are unknown;
    /// `Some(0)` marks an open chain
    #[must_use]
    pub fn new(
        anomer: Anomer,
        configuration: Vec<Configuration>,
        stem: Vec<Stem>,
        superclass: SuperClass,
        ring_start: Option<u32>,
        ring_end: Option<u32>,
    ) -> Self {
        Self {
            anomer,
            configuration,
            stem,
            superclass,
            ring_start,
            ring_end,
            composition: superclass.base_composition(),
            modifications: PositionMap::new(),
            links: PositionMap::new(),
            substituent_links: PositionMap::new(),
        }
    }

    #[must_use]
    pub const fn anomer(&self) -> Anomer {
        self.anomer
    }

    #[must_use]
    pub fn configuration(&self) -> &[Configuration] {
        &self.configuration
    }

    #[must_use]
    pub fn stem(&self) -> &[Stem] {
        &self.stem
    }

    #[must_use]
    pub const fn superclass(&self) -> SuperClass {
        self.superclass
    }

    #[must_use]
    pub const fn ring_start(&self) -> Option<u32> {
        self.ring_start
    }

    #[must_use]
    pub const fn ring_end(&self) -> Option<u32> {
        self.ring_end
    }

    #[must_use]
    pub const fn ring_type(&self) -> RingType {
        RingType::from_bounds(self.ring_start, self.ring_end)
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition {
        &self.composition
    }

    #[must_use]
    pub const fn modifications(&self) -> &PositionMap<Modification> {
        &self.modifications
    }

    #[must_use]
    pub const fn links(&self) -> &PositionMap<BondId> {
        &self.links
    }

    #[must_use]
    pub const fn substituent_links(&self) -> &PositionMap<BondId> {
        &self.substituent_links
    }

    /// Whether this residue carries the alditol (reduced-end) marker
    #[must_use]
    pub fn is_reduced(&self) -> bool {
        self.modifications
            .values()
            .any(|&m| m == Modification::Alditol)
    }

    /// The number of entities occupying `position`: bonds to other residues,
    /// bonds to substituents, and non-exempt modifications. Unknown
    /// positions never report occupants
    #[must_use]
    pub fn is_occupied(&self, position: Position) -> usize {
        if position == Position::Unknown {
            return 0;
        }
        self.links.count_at(position)
            + self.substituent_links.count_at(position)
            + self
                .modifications
                .get(position)
                .filter(|m| !m.is_occupancy_exempt())
                .count()
    }

    /// Lists the backbone positions still open for attachment, excluding the
    /// ring-closing carbon and the reducing (ring-start) carbon, alongside
    /// the number of occupants sitting at unknown positions. An
    /// unknown-position occupant could be blocking any slot, so whenever one
    /// exists (or the ring end itself is unknown) every returned position is
    /// [`Position::Unknown`] — only the number of free slots is certain.
    /// When the ring end is unknown the last backbone position is withheld
    /// too
    #[must_use]
    pub fn open_attachment_sites(&self, max_occupancy: usize) -> (Vec<Position>, usize) {
        let Some(carbons) = self.superclass.carbons() else {
            return (Vec::new(), 0);
        };

        let mut slots = vec![0_usize; carbons as usize];
        let mut unknowns = 0;
        let occupants = self
            .modifications
            .iter()
            .filter(|(_, m)| !m.is_occupancy_exempt())
            .map(|(position, _)| position)
            .chain(self.links.iter().map(|(position, _)| position))
            .chain(self.substituent_links.iter().map(|(position, _)| position));
        for position in occupants {
            match position {
                Position::Unknown => unknowns += 1,
                Position::Known(p) if (1..=carbons).contains(&p) => {
                    slots[p as usize - 1] += 1;
                }
                Position::Known(_) => {}
            }
        }

        let excluded = |i: u32| {
            Some(i) == self.ring_end || (self.ring_start.is_some_and(|s| s > 0 && s == i))
        };
        let mut open = (1..=carbons)
            .filter(|&i| slots[i as usize - 1] <= max_occupancy && !excluded(i))
            .collect::<Vec<_>>();
        if self.ring_end.is_none() {
            open.pop();
        }

        let open = if unknowns > 0 || self.ring_end.is_none() {
            vec![Position::Unknown; open.len()]
        } else {
            open.into_iter().map(Position::Known).collect()
        };
        (open, unknowns)
    }

    /// The total number of known-position occupants across the backbone
    #[must_use]
    pub fn total_occupancy(&self) -> usize {
        self.links.len()
            + self.substituent_links.len()
            + self
                .modifications
                .values()
                .filter(|m| !m.is_occupancy_exempt())
                .count()
    }
}

impl Massive for Monosaccharide {
    fn monoisotopic_mass(&self) -> Mass {
        self.composition.monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.composition.average_mass()
    }
}
