//! Glycosidic fragmentation. Bonds are broken with a full refund, the
//! disconnected components are read off, and then every bond is reattached
//! in reverse order, so the glycan always comes back exactly as it was —
//! even when fragment collection bails out early

use ahash::{HashSet, HashSetExt};
use itertools::Itertools;

use crate::{
    BondId, BranchLabel, Composition, Fragment, Glycan, GlycanError, IonSeries, Mass, Massive,
    NodeId, Result, Substructure,
};

use super::traversal::MAIN_BRANCH;

impl Glycan {
    /// Generates every glycosidic fragment (B, C, Y, and Z series) from
    /// `min_cleavages` up to `max_cleavages` simultaneous bond breaks.
    /// Fragments with the same name are produced once
    pub fn fragments(
        &mut self,
        kinds: &[IonSeries],
        min_cleavages: usize,
        max_cleavages: usize,
    ) -> Result<Vec<Fragment>> {
        for &series in kinds {
            if !series.is_glycosidic() {
                return Err(GlycanError::UnsupportedSeries { series }.into());
            }
        }
        self.label_branches();

        let mut fragments = Vec::new();
        let mut seen = HashSet::new();
        for cleavages in min_cleavages.max(1)..=max_cleavages {
            let combos: Vec<Vec<_>> = self
                .link_index
                .iter()
                .copied()
                .combinations(cleavages)
                .collect();
            for combo in combos {
                let produced = self.with_broken_links(&combo, |glycan| {
                    glycan.collect_fragments(&combo, kinds, &mut seen)
                })?;
                fragments.extend(produced);
            }
        }
        Ok(fragments)
    }

    /// The distinct connected substructures produced by `min_cleavages` up
    /// to `max_cleavages` simultaneous glycosidic breaks, with their break
    /// records. Unlike [`fragments`](Self::fragments), no ion series is
    /// assigned and no composition shift is applied
    pub fn substructures(
        &mut self,
        min_cleavages: usize,
        max_cleavages: usize,
    ) -> Result<Vec<Substructure>> {
        self.label_branches();

        let mut substructures = Vec::new();
        for cleavages in min_cleavages.max(1)..=max_cleavages {
            let combos: Vec<Vec<_>> = self
                .link_index
                .iter()
                .copied()
                .combinations(cleavages)
                .collect();
            for combo in combos {
                let produced = self.with_broken_links(&combo, |glycan| {
                    glycan.collect_substructures(&combo)
                })?;
                substructures.extend(produced);
            }
        }
        Ok(substructures)
    }

    /// Breaks `links` (with a refund), runs `f`, and reattaches them in
    /// reverse order whatever `f` returned. The reattachment lives in a
    /// guard's `Drop`, so it runs even if `f` panics
    fn with_broken_links<T>(
        &mut self,
        links: &[BondId],
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let mut guard = RestoreLinks {
            glycan: self,
            broken: Vec::with_capacity(links.len()),
        };
        let mut failure = None;
        for &id in links {
            match guard.glycan.detach_bond(id, true) {
                Ok(()) => guard.broken.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        let outcome = match failure {
            None => f(guard.glycan),
            Some(e) => Err(e),
        };

        guard.restore()?;
        outcome
    }

    /// The connected components left behind by breaking `links`, as
    /// `(nodes, root, parent_breaks, child_breaks)` records. A component's
    /// root is the child endpoint of the break that severed it from above,
    /// or the glycan root for the reducing-end component
    #[allow(clippy::type_complexity)]
    fn broken_components(
        &self,
        links: &[BondId],
    ) -> Result<Vec<(Vec<NodeId>, NodeId, Vec<(BondId, NodeId)>, Vec<(BondId, NodeId)>)>> {
        let mut claimed: HashSet<NodeId> = HashSet::new();
        let mut components = Vec::new();
        for &id in links {
            let bond = self.bond(id)?;
            for endpoint in [bond.parent(), bond.child()] {
                if claimed.contains(&endpoint) {
                    continue;
                }
                let nodes = self.component(endpoint);
                claimed.extend(nodes.iter().copied());

                let node_set: HashSet<_> = nodes.iter().copied().collect();
                let mut parent_breaks = Vec::new();
                let mut child_breaks = Vec::new();
                for &link in links {
                    let broken = self.bond(link)?;
                    if node_set.contains(&broken.parent()) {
                        parent_breaks.push((link, broken.parent()));
                    } else if node_set.contains(&broken.child()) {
                        child_breaks.push((link, broken.child()));
                    }
                }
                let root = child_breaks
                    .first()
                    .map_or(self.root, |&(_, child)| child);
                components.push((nodes, root, parent_breaks, child_breaks));
            }
        }
        Ok(components)
    }

    fn collect_fragments(
        &self,
        links: &[BondId],
        kinds: &[IonSeries],
        seen: &mut HashSet<String>,
    ) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::new();
        for (nodes, _, parent_breaks, child_breaks) in self.broken_components(links)? {
            let base: Composition = nodes
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .map(|node| node.composition().clone())
                .sum();

            // Breaks retaining the reducing side become Y/Z ions; breaks
            // retaining the non-reducing side become B/C ions
            let mut per_break: Vec<Vec<(BondId, IonSeries)>> = Vec::new();
            let mut viable = true;
            let choices = |id: BondId, allowed: [IonSeries; 2]| {
                allowed
                    .into_iter()
                    .filter(|series| kinds.contains(series))
                    .map(|series| (id, series))
                    .collect::<Vec<_>>()
            };
            for &(id, _) in &parent_breaks {
                let candidates = choices(id, [IonSeries::Y, IonSeries::Z]);
                viable &= !candidates.is_empty();
                per_break.push(candidates);
            }
            for &(id, _) in &child_breaks {
                let candidates = choices(id, [IonSeries::B, IonSeries::C]);
                viable &= !candidates.is_empty();
                per_break.push(candidates);
            }
            if !viable {
                continue;
            }

            let mut included_nodes = nodes.clone();
            included_nodes.sort_unstable();
            for assignment in per_break.iter().multi_cartesian_product() {
                let link_ids: Vec<_> = assignment.into_iter().copied().collect();
                let mut composition = base.clone();
                for &(_, series) in &link_ids {
                    composition -= &series.composition_shift();
                }
                let name = self.name_fragment(&link_ids)?;
                if !seen.insert(name.clone()) {
                    continue;
                }
                let series = link_ids.iter().map(|(_, s)| s.symbol()).collect();
                fragments.push(Fragment {
                    series,
                    link_ids,
                    included_nodes: included_nodes.clone(),
                    composition,
                    name,
                });
            }
        }
        Ok(fragments)
    }

    fn collect_substructures(&self, links: &[BondId]) -> Result<Vec<Substructure>> {
        self.broken_components(links)?
            .into_iter()
            .map(|(nodes, root, parent_breaks, child_breaks)| {
                let include: HashSet<_> = nodes.iter().copied().collect();
                let mut include_nodes = nodes;
                include_nodes.sort_unstable();
                Ok(Substructure {
                    tree: self.extract(&include, root),
                    include_nodes,
                    link_ids: links.to_vec(),
                    parent_breaks,
                    child_breaks,
                })
            })
            .collect()
    }

    /// Domon–Costello naming. Reducing-side series count from the root
    /// along the bond's branch label; non-reducing-side series count back
    /// from the end of that branch. Multi-break names are the sorted parts
    /// joined with `-`
    fn name_fragment(&self, link_ids: &[(BondId, IonSeries)]) -> Result<String> {
        let mut parts = Vec::with_capacity(link_ids.len());
        for &(id, series) in link_ids {
            let label = self.bond(id)?.label().unwrap_or(BranchLabel {
                branch: MAIN_BRANCH,
                distance: 0,
            });
            let branch = label.branch();
            let index = if series.is_reducing() {
                label.distance()
            } else {
                self.branch_length(branch) + 1 - label.distance()
            };
            let part = if branch == MAIN_BRANCH {
                format!("{series}{index}")
            } else {
                format!("{series}{branch}{index}")
            };
            parts.push(part);
        }
        parts.sort_unstable();
        Ok(parts.join("-"))
    }
}

// Reattaches the broken bonds in reverse order when dropped. The happy
// path goes through `restore` so attachment errors still surface; `Drop`
// itself covers unwinding, where errors have nowhere to go
struct RestoreLinks<'a> {
    glycan: &'a mut Glycan,
    broken: Vec<BondId>,
}

impl RestoreLinks<'_> {
    fn restore(mut self) -> Result<()> {
        let mut first_error = Ok(());
        while let Some(id) = self.broken.pop() {
            if let Err(e) = self.glycan.attach_bond(id) {
                if first_error.is_ok() {
                    first_error = Err(e);
                }
            }
        }
        first_error
    }
}

impl Drop for RestoreLinks<'_> {
    fn drop(&mut self) {
        while let Some(id) = self.broken.pop() {
            let _ = self.glycan.attach_bond(id);
        }
    }
}

// =====================================================================================================================

impl Fragment {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The concatenated series symbols of every break, e.g. `"BY"` for an
    /// internal double-cleavage fragment
    #[must_use]
    pub fn series(&self) -> &str {
        &self.series
    }

    #[must_use]
    pub fn link_ids(&self) -> &[(BondId, IonSeries)] {
        &self.link_ids
    }

    /// The ids of the nodes this fragment retained, in ascending order
    #[must_use]
    pub fn included_nodes(&self) -> &[NodeId] {
        &self.included_nodes
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition {
        &self.composition
    }
}

impl Massive for Fragment {
    fn monoisotopic_mass(&self) -> Mass {
        self.composition.monoisotopic_mass()
    }

    fn average_mass(&self) -> Mass {
        self.composition.average_mass()
    }
}

impl Substructure {
    #[must_use]
    pub const fn tree(&self) -> &Glycan {
        &self.tree
    }

    #[must_use]
    pub fn include_nodes(&self) -> &[NodeId] {
        &self.include_nodes
    }

    /// Every bond broken to produce this substructure (both sides)
    #[must_use]
    pub fn link_ids(&self) -> &[BondId] {
        &self.link_ids
    }

    /// Breaks where this substructure kept the parent (reducing) side
    #[must_use]
    pub fn parent_breaks(&self) -> &[(BondId, NodeId)] {
        &self.parent_breaks
    }

    /// Breaks where this substructure kept the child (non-reducing) side
    #[must_use]
    pub fn child_breaks(&self) -> &[(BondId, NodeId)] {
        &self.child_breaks
    }
}

// =====================================================================================================================

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::glycan::tests::{branched, trisaccharide};

    const ALL_GLYCOSIDIC: [IonSeries; 4] = [IonSeries::B, IonSeries::C, IonSeries::Y, IonSeries::Z];

    fn by_name<'a>(fragments: &'a [Fragment], name: &str) -> &'a Fragment {
        fragments
            .iter()
            .find(|f| f.name() == name)
            .unwrap_or_else(|| panic!("no fragment named {name}"))
    }

    #[test]
    fn crossring_series_are_rejected() {
        let mut glycan = trisaccharide();
        let err = glycan.fragments(&[IonSeries::A], 1, 1).unwrap_err();
        assert!(matches!(
            *err,
            GlycanError::UnsupportedSeries {
                series: IonSeries::A
            }
        ));
    }

    #[test]
    fn single_cleavage_by_ions() {
        let mut glycan = trisaccharide();
        let fragments = glycan
            .fragments(&[IonSeries::B, IonSeries::Y], 1, 1)
            .unwrap();
        let names: Vec<_> = fragments.iter().map(Fragment::name).collect();
        assert_eq!(names, ["Y1", "B2", "Y2", "B1"]);

        // A terminal B ion is one dehydrated hexose
        let b1 = by_name(&fragments, "B1");
        assert_eq!(b1.monoisotopic_mass(), dec!(162.05282341850).into());
        assert_eq!(b1.included_nodes().len(), 1);

        let b2 = by_name(&fragments, "B2");
        assert_eq!(
            b2.monoisotopic_mass(),
            Mass::from(dec!(180.06338810220) * dec!(2) - dec!(18.01056468370) * dec!(2))
        );

        // Y ions keep the water at the cleavage site
        let y1 = by_name(&fragments, "Y1");
        assert_eq!(y1.monoisotopic_mass(), dec!(180.06338810220).into());
        let y2 = by_name(&fragments, "Y2");
        assert_eq!(
            y2.monoisotopic_mass(),
            Mass::from(dec!(180.06338810220) * dec!(2) - dec!(18.01056468370))
        );
    }

    #[test]
    fn z_and_c_shifts() {
        let mut glycan = trisaccharide();
        let fragments = glycan
            .fragments(&[IonSeries::C, IonSeries::Z], 1, 1)
            .unwrap();

        // C keeps the full glycosidic oxygen; Z gives up a water
        let c1 = by_name(&fragments, "C1");
        assert_eq!(c1.monoisotopic_mass(), dec!(180.06338810220).into());
        let z1 = by_name(&fragments, "Z1");
        assert_eq!(
            z1.monoisotopic_mass(),
            Mass::from(dec!(180.06338810220) - dec!(18.01056468370))
        );
    }

    #[test]
    fn double_cleavage_internal_fragments() {
        let mut glycan = trisaccharide();
        let fragments = glycan
            .fragments(&[IonSeries::B, IonSeries::Y], 1, 2)
            .unwrap();

        // The middle residue shows up with one break on each side
        let internal = by_name(&fragments, "B2-Y2");
        assert_eq!(internal.series(), "YB");
        assert_eq!(internal.included_nodes().len(), 1);
        assert_eq!(
            internal.monoisotopic_mass(),
            Mass::from(dec!(180.06338810220) - dec!(18.01056468370))
        );
    }

    #[test]
    fn min_cleavages_skips_smaller_breaks() {
        let mut glycan = trisaccharide();
        let fragments = glycan
            .fragments(&[IonSeries::B, IonSeries::Y], 2, 2)
            .unwrap();

        // Only the both-bonds-broken products survive: the end pieces and
        // the internal fragment, never the two-residue B2/Y2 ions
        let names: HashSet<_> = fragments.iter().map(Fragment::name).collect();
        assert_eq!(names, HashSet::from_iter(["Y1", "B1", "B2-Y2"]));
    }

    #[test]
    fn branched_fragments_carry_branch_labels() {
        let mut glycan = branched();
        let fragments = glycan
            .fragments(&[IonSeries::B, IonSeries::Y], 1, 1)
            .unwrap();
        let names: HashSet<_> = fragments.iter().map(Fragment::name).collect();
        for name in ["Ya1", "Yb1", "Yc2", "Yd2", "Ba2", "Bb1", "Bc1", "Bd1"] {
            assert!(names.contains(name), "missing {name}");
        }
    }

    #[test]
    fn fragment_masses_balance_the_precursor() {
        let mut glycan = trisaccharide();
        let precursor = glycan.monoisotopic_mass();
        let fragments = glycan
            .fragments(&[IonSeries::B, IonSeries::Y], 1, 1)
            .unwrap();

        // Complementary B/Y pairs reassemble the precursor plus one water
        let water: Mass = dec!(18.01056468370).into();
        for (b, y) in [("B1", "Y2"), ("B2", "Y1")] {
            let b = by_name(&fragments, b);
            let y = by_name(&fragments, y);
            assert_eq!(
                b.monoisotopic_mass() + y.monoisotopic_mass() + water,
                precursor
            );
        }
    }

    #[test]
    fn fragmentation_restores_the_glycan() {
        let mut glycan = branched();
        let before_composition = glycan.total_composition();
        let before_bonds: Vec<_> = glycan.link_ids().to_vec();

        glycan.fragments(&ALL_GLYCOSIDIC, 1, 3).unwrap();

        assert_eq!(glycan.total_composition(), before_composition);
        for id in before_bonds {
            assert!(glycan.bond(id).unwrap().is_attached());
        }
    }

    #[test]
    fn broken_links_are_restored_across_a_panic() {
        let mut glycan = trisaccharide();
        let links: Vec<_> = glycan.link_ids().to_vec();

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            glycan.with_broken_links(&links, |_| -> Result<()> { panic!("mid-collection") })
        }));
        assert!(caught.is_err());

        for id in links {
            assert!(glycan.bond(id).unwrap().is_attached());
        }
    }

    #[test]
    fn substructures_split_and_record_breaks() {
        let mut glycan = trisaccharide();
        let substructures = glycan.substructures(1, 1).unwrap();
        // Two breaks, two components each
        assert_eq!(substructures.len(), 4);

        let reducing = substructures
            .iter()
            .find(|s| s.tree().root() == glycan.root() && s.include_nodes().len() == 1)
            .unwrap();
        assert_eq!(reducing.parent_breaks().len(), 1);
        assert!(reducing.child_breaks().is_empty());
        assert_eq!(
            reducing.tree().total_composition(),
            Composition::from_formula("C6H12O6").unwrap()
        );
    }
}
