use std::{
    fmt::{self, Display, Formatter},
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use ahash::HashMapExt;
use itertools::Itertools;
use rust_decimal::Decimal;

use super::formula;
use crate::{
    Charge, Charged, Composition, Element, ElementSpec, GlycanError, Mass, Massive, Result,
};

impl ElementSpec {
    #[must_use]
    pub const fn of(element: Element) -> Self {
        Self {
            element,
            mass_number: None,
        }
    }

    /// Pins `element` to a single mass number, failing if no such isotope is
    /// known
    pub fn with_isotope(element: Element, mass_number: u32) -> Result<Self> {
        if element.isotope(mass_number).is_none() {
            let known = element
                .isotopes()
                .iter()
                .map(|i| i.mass_number.to_string())
                .collect_vec();
            return Err(GlycanError::lookup(
                "isotope",
                &format!("{}[{mass_number}]", element.symbol()),
                &known.iter().map(String::as_str).collect_vec(),
            )
            .into());
        }
        Ok(Self {
            element,
            mass_number: Some(mass_number),
        })
    }

    #[must_use]
    pub const fn element(self) -> Element {
        self.element
    }

    #[must_use]
    pub const fn mass_number(self) -> Option<u32> {
        self.mass_number
    }

    fn isotope_mass(self) -> Option<Mass> {
        self.mass_number
            .and_then(|n| self.element.isotope(n))
            .map(|i| i.relative_mass.into())
    }
}

impl Massive for ElementSpec {
    fn monoisotopic_mass(&self) -> Mass {
        self.isotope_mass()
            .unwrap_or_else(|| self.element.monoisotopic_mass())
    }

    // A pinned isotope has no abundance distribution, so its average mass is
    // just that isotope's mass
    fn average_mass(&self) -> Mass {
        self.isotope_mass()
            .unwrap_or_else(|| self.element.average_mass())
    }
}

impl Display for ElementSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.mass_number {
            Some(n) => write!(f, "{}[{n}]", self.element),
            None => write!(f, "{}", self.element),
        }
    }
}

// ---------------------------------------------------------------------------------------------------------------------

/// Builds a [`Composition`] from `Element: count` pairs
macro_rules! composition {
    ($($element:ident: $count:expr),* $(,)?) => {
        [$((
            $crate::ElementSpec::of($crate::Element::$element),
            $count as i32,
        )),*]
            .into_iter()
            .collect::<$crate::Composition>()
    };
}
pub(crate) use composition;

impl Composition {
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: ahash::HashMap::new(),
        }
    }

    /// Parses a chemical formula like `C6H12O6`, `C[13]6H12O6`, `H-2O-1`, or
    /// `(H2O)2H+2`
    pub fn from_formula(formula: &str) -> Result<Self> {
        formula::parse(formula)
    }

    #[must_use]
    pub fn get(&self, spec: ElementSpec) -> i32 {
        self.counts.get(&spec).copied().unwrap_or_default()
    }

    pub fn increment(&mut self, spec: ElementSpec, delta: i32) {
        let count = self.counts.entry(spec).or_default();
        *count += delta;
        if *count == 0 {
            self.counts.remove(&spec);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementSpec, i32)> + '_ {
        self.counts.iter().map(|(&spec, &count)| (spec, count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Computes a mass the way the upstream mass-spectrometry tooling does:
    /// dissociated protons always contribute their mass; a non-zero `charge`
    /// adds that many further protons; and whenever the effective charge is
    /// non-zero the total is divided by its magnitude (an m/z). Passing both
    /// explicit `H+` entries and a non-zero `charge` is an error
    pub fn calc_mass(&self, average: bool, charge: Charge) -> Result<Mass> {
        let protons = self.charge();
        if charge.value() != 0 && protons.value() != 0 {
            return Err(Box::new(GlycanError::ChargedComposition { charge }));
        }

        let mut mass = if average {
            self.average_mass()
        } else {
            self.monoisotopic_mass()
        };
        if charge.value() != 0 {
            mass += Element::Proton.monoisotopic_mass() * charge.value();
        }

        let effective = if charge.value() != 0 { charge } else { protons };
        Ok(mass.checked_div(effective).unwrap_or(mass))
    }

    fn mass(&self, accessor: impl Fn(&ElementSpec) -> Mass) -> Mass {
        Mass::from(
            self.iter()
                .map(|(spec, count)| accessor(&spec).value() * Decimal::from(count))
                .sum::<Decimal>(),
        )
    }

    fn sorted_entries(&self) -> Vec<(ElementSpec, i32)> {
        self.iter().sorted_by_key(|&(spec, _)| spec).collect()
    }
}

impl Massive for Composition {
    fn monoisotopic_mass(&self) -> Mass {
        self.mass(Massive::monoisotopic_mass)
    }

    fn average_mass(&self) -> Mass {
        self.mass(Massive::average_mass)
    }
}

impl Charged for Composition {
    fn charge(&self) -> Charge {
        self.iter()
            .filter(|(spec, _)| spec.element() == Element::Proton)
            .map(|(_, count)| count)
            .sum::<i32>()
            .into()
    }
}

impl FromStr for Composition {
    type Err = Box<GlycanError>;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_formula(s)
    }
}

impl FromIterator<(ElementSpec, i32)> for Composition {
    fn from_iter<I: IntoIterator<Item = (ElementSpec, i32)>>(iter: I) -> Self {
        let mut composition = Self::new();
        for (spec, count) in iter {
            composition.increment(spec, count);
        }
        composition
    }
}

impl Display for Composition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (spec, count) in self.sorted_entries() {
            write!(f, "{spec}")?;
            if count != 1 {
                write!(f, "{count}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl AddAssign<&Self> for Composition {
    fn add_assign(&mut self, rhs: &Self) {
        for (spec, count) in rhs.iter() {
            self.increment(spec, count);
        }
    }
}

impl AddAssign for Composition {
    fn add_assign(&mut self, rhs: Self) {
        *self += &rhs;
    }
}

impl SubAssign<&Self> for Composition {
    fn sub_assign(&mut self, rhs: &Self) {
        for (spec, count) in rhs.iter() {
            self.increment(spec, -count);
        }
    }
}

impl SubAssign for Composition {
    fn sub_assign(&mut self, rhs: Self) {
        *self -= &rhs;
    }
}

impl Add for Composition {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += &rhs;
        self
    }
}

impl Add<&Self> for Composition {
    type Output = Self;

    fn add(mut self, rhs: &Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl Sub for Composition {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= &rhs;
        self
    }
}

impl Sub<&Self> for Composition {
    type Output = Self;

    fn sub(mut self, rhs: &Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl Neg for Composition {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.iter().map(|(spec, count)| (spec, -count)).collect()
    }
}

impl Mul<i32> for Composition {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self::Output {
        self.iter()
            .map(|(spec, count)| (spec, count * rhs))
            .collect()
    }
}

impl Sum for Composition {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::new(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::ChargedParticle;

    #[test]
    fn zero_entries_are_never_stored() {
        let mut water = composition![H: 2, O: 1];
        water.increment(ElementSpec::of(Element::H), -2);
        assert_eq!(water.get(ElementSpec::of(Element::H)), 0);
        assert_eq!(water.len(), 1);

        let empty = composition![H: 2] - composition![H: 2];
        assert!(empty.is_empty());
        assert_eq!(empty, Composition::new());
    }

    #[test]
    fn arithmetic() {
        let water = Composition::from_formula("H2O").unwrap();
        let peroxide = Composition::from_formula("H2O2").unwrap();
        assert_eq!(water.clone() + composition![O: 1], peroxide);
        assert_eq!(peroxide - composition![O: 1], water);
        assert_eq!(
            water.clone() * 3,
            Composition::from_formula("(H2O)3").unwrap()
        );
        assert_eq!(-water.clone() + water, Composition::new());
    }

    #[test]
    fn monoisotopic_masses() {
        let water = Composition::from_formula("H2O").unwrap();
        assert_eq!(water.monoisotopic_mass(), dec!(18.01056468370).into());

        let hexose = Composition::from_formula("C6H12O6").unwrap();
        assert_eq!(hexose.monoisotopic_mass(), dec!(180.06338810220).into());

        // Negative counts subtract mass
        let dehydrated = hexose - water;
        assert_eq!(dehydrated.monoisotopic_mass(), dec!(162.05282341850).into());
    }

    #[test]
    fn average_masses() {
        let water = Composition::from_formula("H2O").unwrap();
        let delta = (water.average_mass().value() - dec!(18.0153)).abs();
        assert!(delta < dec!(0.0001));
    }

    #[test]
    fn fixed_isotopes() {
        let labelled = Composition::from_formula("C[13]6H12O6").unwrap();
        let c13 = dec!(13.0033548378) * dec!(6);
        let hydrogens = dec!(1.00782503207) * dec!(12);
        let oxygens = dec!(15.99491461956) * dec!(6);
        assert_eq!(
            labelled.monoisotopic_mass(),
            (c13 + hydrogens + oxygens).into()
        );
        // Pinned isotopes have no distribution to average over
        let pinned = Composition::from_formula("C[13]").unwrap();
        assert_eq!(pinned.average_mass(), dec!(13.0033548378).into());
    }

    #[test]
    fn charges_and_mz() {
        let neutral = Composition::from_formula("H2O").unwrap();
        assert_eq!(neutral.charge(), Charge::new(0));
        assert_eq!(neutral.monoisotopic_mz(), None);

        let protonated = Composition::from_formula("H2OH+").unwrap();
        assert_eq!(protonated.charge(), Charge::new(1));
        assert_eq!(
            protonated.monoisotopic_mz(),
            Some(dec!(19.01784115047).into())
        );

        let doubly = Composition::from_formula("H+2").unwrap();
        assert_eq!(doubly.charge(), Charge::new(2));
        assert_eq!(doubly.monoisotopic_mz(), Some(dec!(1.00727646677).into()));
    }

    #[test]
    fn calc_mass() {
        let water = Composition::from_formula("H2O").unwrap();
        assert_eq!(
            water.calc_mass(false, Charge::new(0)).unwrap(),
            dec!(18.01056468370).into()
        );
        // An explicit charge adds protons and divides by |z|
        assert_eq!(
            water.calc_mass(false, Charge::new(1)).unwrap(),
            dec!(19.01784115047).into()
        );

        let conflicted = Composition::from_formula("H2OH+").unwrap();
        let err = conflicted.calc_mass(false, Charge::new(2)).unwrap_err();
        assert!(matches!(*err, GlycanError::ChargedComposition { .. }));
    }

    #[test]
    fn displays_roundtrip() {
        for formula in ["C6H12O6", "C8H15NO6", "C[13]6H12O6"] {
            let composition = Composition::from_formula(formula).unwrap();
            assert_eq!(composition.to_string(), formula);
            assert_eq!(
                Composition::from_formula(&composition.to_string()).unwrap(),
                composition
            );
        }
    }
}
