//! Elemental masses and isotope abundances.
//!
//! All isotope arithmetic in this crate reads element data from an explicit
//! [`ElementTable`] owned by the caller rather than a process-wide registry,
//! so two runs with different abundance tables never interfere.
use std::fmt::Display;
use std::str::FromStr;

use crate::error::FormulaError;

/// The mass difference between isotopes `C[13]` and `C[12]`. Not precisely universal, but the
/// majority of expected applications are carbon-based
pub const NEUTRON_SHIFT: f64 = 1.0033548378;

/// The mass of H+, a hydrogen atom minus an electron
pub const PROTON: f64 = 1.007276466812;

/// The rest mass of an electron
pub const ELECTRON: f64 = 0.00054857990946;

const ISOTOPIC_SHIFT: [f64; 10] = [
    NEUTRON_SHIFT / 1.0,
    NEUTRON_SHIFT / 2.0,
    NEUTRON_SHIFT / 3.0,
    NEUTRON_SHIFT / 4.0,
    NEUTRON_SHIFT / 5.0,
    NEUTRON_SHIFT / 6.0,
    NEUTRON_SHIFT / 7.0,
    NEUTRON_SHIFT / 8.0,
    NEUTRON_SHIFT / 9.0,
    NEUTRON_SHIFT / 10.0,
];

/// Get the m/z difference between isotopic peaks at a given charge state
#[inline(always)]
pub fn isotopic_shift(charge: i32) -> f64 {
    if charge > 0 && charge < 11 {
        ISOTOPIC_SHIFT[(charge - 1) as usize]
    } else {
        NEUTRON_SHIFT / charge as f64
    }
}

/// The elements that make up peptides and their common modifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    C,
    H,
    N,
    O,
    P,
    S,
}

impl Element {
    pub const COUNT: usize = 6;

    /// Every element, in Hill order
    pub const ALL: [Element; Self::COUNT] = [
        Element::C,
        Element::H,
        Element::N,
        Element::O,
        Element::P,
        Element::S,
    ];

    pub const fn symbol(&self) -> &'static str {
        match self {
            Element::C => "C",
            Element::H => "H",
            Element::N => "N",
            Element::O => "O",
            Element::P => "P",
            Element::S => "S",
        }
    }

    #[inline]
    pub(crate) const fn index(&self) -> usize {
        *self as usize
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Element {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "C" => Ok(Element::C),
            "H" => Ok(Element::H),
            "N" => Ok(Element::N),
            "O" => Ok(Element::O),
            "P" => Ok(Element::P),
            "S" => Ok(Element::S),
            _ => Err(FormulaError::UnknownElement(s.to_string())),
        }
    }
}

/// Mass and isotope abundance information for a single element
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub element: Element,
    /// The mass of the most abundant (and lightest) isotope
    pub monoisotopic_mass: f64,
    /// The abundance-weighted mean mass
    pub average_mass: f64,
    /// Isotope abundances indexed by nominal mass offset from the lightest isotope.
    /// Offsets with no stable isotope hold zero.
    pub abundances: Vec<f64>,
}

impl ElementRecord {
    pub fn new(
        element: Element,
        monoisotopic_mass: f64,
        average_mass: f64,
        abundances: Vec<f64>,
    ) -> Self {
        Self {
            element,
            monoisotopic_mass,
            average_mass,
            abundances,
        }
    }
}

/// The elemental mass table every isotope calculation draws from.
///
/// Build one per run with [`ElementTable::default`] and pass it by reference. Use
/// [`ElementTable::with_abundances`] to model isotopic labeling or alternative
/// natural abundance estimates.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementTable {
    records: Vec<ElementRecord>,
}

impl Default for ElementTable {
    fn default() -> Self {
        let records = vec![
            ElementRecord::new(Element::C, 12.0, 12.0107, vec![0.9893, 0.0107]),
            ElementRecord::new(
                Element::H,
                1.00782503207,
                1.00794,
                vec![0.999885, 0.000115],
            ),
            ElementRecord::new(
                Element::N,
                14.0030740048,
                14.0067,
                vec![0.99636, 0.00364],
            ),
            ElementRecord::new(
                Element::O,
                15.99491461956,
                15.9994,
                vec![0.99757, 0.00038, 0.00205],
            ),
            ElementRecord::new(Element::P, 30.97376163, 30.973762, vec![1.0]),
            ElementRecord::new(
                Element::S,
                31.97207100,
                32.065,
                vec![0.9499, 0.0075, 0.0425, 0.0, 0.0001],
            ),
        ];
        Self { records }
    }
}

impl ElementTable {
    #[inline]
    pub fn get(&self, element: Element) -> &ElementRecord {
        &self.records[element.index()]
    }

    #[inline]
    pub fn monoisotopic_mass(&self, element: Element) -> f64 {
        self.get(element).monoisotopic_mass
    }

    #[inline]
    pub fn average_mass(&self, element: Element) -> f64 {
        self.get(element).average_mass
    }

    #[inline]
    pub fn abundances(&self, element: Element) -> &[f64] {
        &self.get(element).abundances
    }

    /// Replace the isotope abundances of `element`, recomputing its average mass
    /// from the monoisotopic mass and nominal offsets
    pub fn with_abundances(mut self, element: Element, abundances: Vec<f64>) -> Self {
        let total: f64 = abundances.iter().sum();
        let rec = &mut self.records[element.index()];
        if total > 0.0 {
            rec.average_mass = abundances
                .iter()
                .enumerate()
                .map(|(i, a)| (rec.monoisotopic_mass + i as f64 * NEUTRON_SHIFT) * a)
                .sum::<f64>()
                / total;
        }
        rec.abundances = abundances;
        self
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ElementRecord> {
        self.records.iter()
    }
}
