use std::fmt::{self, Display, Formatter};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::{GlycanError, Mass, Result};

/// The elements that occur in carbohydrate chemistry, plus the dissociated
/// proton pseudo-element `H+` used for charge bookkeeping
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
pub enum Element {
    C,
    H,
    N,
    O,
    P,
    S,
    F,
    Cl,
    Br,
    I,
    Proton,
}

/// A single isotope: its mass number, relative atomic mass, and natural
/// abundance. The first isotope in each element's table is the principal
/// (most abundant) one
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Isotope {
    pub mass_number: u32,
    pub relative_mass: Decimal,
    pub abundance: Decimal,
}

macro_rules! isotopes {
    ($($mass_number:literal: $mass:literal @ $abundance:literal),+ $(,)?) => {
        &[$(Isotope {
            mass_number: $mass_number,
            relative_mass: dec!($mass),
            abundance: dec!($abundance),
        }),+]
    };
}

// NIST relative atomic masses and isotopic abundances
static H: &[Isotope] = isotopes![1: 1.00782503207 @ 0.999885, 2: 2.0141017778 @ 0.000115];
static C: &[Isotope] = isotopes![12: 12 @ 0.9893, 13: 13.0033548378 @ 0.0107];
static N: &[Isotope] = isotopes![14: 14.0030740048 @ 0.99636, 15: 15.0001088982 @ 0.00364];
static O: &[Isotope] = isotopes![
    16: 15.99491461956 @ 0.99757,
    17: 16.99913170 @ 0.00038,
    18: 17.9991610 @ 0.00205,
];
static P: &[Isotope] = isotopes![31: 30.97376163 @ 1];
static S: &[Isotope] = isotopes![
    32: 31.97207100 @ 0.9499,
    33: 32.97145876 @ 0.0075,
    34: 33.96786690 @ 0.0425,
    36: 35.96708076 @ 0.0001,
];
static F: &[Isotope] = isotopes![19: 18.99840322 @ 1];
static CL: &[Isotope] = isotopes![35: 34.96885268 @ 0.7576, 37: 36.96590259 @ 0.2424];
static BR: &[Isotope] = isotopes![79: 78.9183371 @ 0.5069, 81: 80.9162906 @ 0.4931];
static I: &[Isotope] = isotopes![127: 126.904473 @ 1];
static PROTON: &[Isotope] = isotopes![1: 1.00727646677 @ 1];

impl Element {
    pub const ALL: [Self; 11] = [
        Self::C,
        Self::H,
        Self::N,
        Self::O,
        Self::P,
        Self::S,
        Self::F,
        Self::Cl,
        Self::Br,
        Self::I,
        Self::Proton,
    ];

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::H => "H",
            Self::C => "C",
            Self::N => "N",
            Self::O => "O",
            Self::P => "P",
            Self::S => "S",
            Self::F => "F",
            Self::Cl => "Cl",
            Self::Br => "Br",
            Self::I => "I",
            Self::Proton => "H+",
        }
    }

    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.symbol() == symbol)
    }

    pub fn lookup(symbol: &str) -> Result<Self> {
        Self::from_symbol(symbol).ok_or_else(|| {
            GlycanError::lookup("element", symbol, &Self::ALL.map(Self::symbol)).into()
        })
    }

    #[must_use]
    pub const fn isotopes(self) -> &'static [Isotope] {
        match self {
            Self::H => H,
            Self::C => C,
            Self::N => N,
            Self::O => O,
            Self::P => P,
            Self::S => S,
            Self::F => F,
            Self::Cl => CL,
            Self::Br => BR,
            Self::I => I,
            Self::Proton => PROTON,
        }
    }

    #[must_use]
    pub fn isotope(self, mass_number: u32) -> Option<&'static Isotope> {
        self.isotopes().iter().find(|i| i.mass_number == mass_number)
    }

    /// The mass of the principal (most abundant) isotope
    #[must_use]
    pub fn monoisotopic_mass(self) -> Mass {
        self.isotopes()[0].relative_mass.into()
    }

    /// The abundance-weighted mass over all isotopes
    #[must_use]
    pub fn average_mass(self) -> Mass {
        self.isotopes()
            .iter()
            .map(|i| i.relative_mass * i.abundance)
            .sum::<Decimal>()
            .into()
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_roundtrips() {
        for element in Element::ALL {
            assert_eq!(Element::from_symbol(element.symbol()), Some(element));
        }
        assert_eq!(Element::from_symbol("Xe"), None);
        assert_eq!(Element::from_symbol("h"), None);
    }

    #[test]
    fn lookup_errors() {
        let err = Element::lookup("Xe").unwrap_err();
        assert!(matches!(*err, GlycanError::Lookup { kind: "element", .. }));
    }

    #[test]
    fn monoisotopic_masses() {
        assert_eq!(Element::H.monoisotopic_mass(), dec!(1.00782503207).into());
        assert_eq!(Element::C.monoisotopic_mass(), dec!(12).into());
        assert_eq!(Element::O.monoisotopic_mass(), dec!(15.99491461956).into());
        assert_eq!(Element::Proton.monoisotopic_mass(), dec!(1.00727646677).into());
    }

    #[test]
    fn average_masses() {
        let close = |mass: Mass, expected: Decimal| (mass.value() - expected).abs() < dec!(0.0001);
        assert!(close(Element::H.average_mass(), dec!(1.00794)));
        assert!(close(Element::C.average_mass(), dec!(12.0107)));
        assert!(close(Element::O.average_mass(), dec!(15.9994)));
        assert!(close(Element::S.average_mass(), dec!(32.066)));
    }

    #[test]
    fn isotope_lookup() {
        let c13 = Element::C.isotope(13).unwrap();
        assert_eq!(c13.relative_mass, dec!(13.0033548378));
        assert_eq!(Element::C.isotope(14), None);
    }
}
