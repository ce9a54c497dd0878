//! Peptide sequences, their ions and fragment ladders
use std::fmt::Display;
use std::str::FromStr;

use crate::composition::ElementalComposition;
use crate::elements::{isotopic_shift, Element, ElementTable, ELECTRON};
use crate::error::FormulaError;

/// The elemental composition of an amino acid residue, i.e. the free amino acid minus water
pub fn residue_composition(code: char) -> Option<ElementalComposition> {
    let comp = match code {
        'A' => ElementalComposition::from_chnops(3, 5, 1, 1, 0, 0),
        'R' => ElementalComposition::from_chnops(6, 12, 4, 1, 0, 0),
        'N' => ElementalComposition::from_chnops(4, 6, 2, 2, 0, 0),
        'D' => ElementalComposition::from_chnops(4, 5, 1, 3, 0, 0),
        'C' => ElementalComposition::from_chnops(3, 5, 1, 1, 0, 1),
        'E' => ElementalComposition::from_chnops(5, 7, 1, 3, 0, 0),
        'Q' => ElementalComposition::from_chnops(5, 8, 2, 2, 0, 0),
        'G' => ElementalComposition::from_chnops(2, 3, 1, 1, 0, 0),
        'H' => ElementalComposition::from_chnops(6, 7, 3, 1, 0, 0),
        'I' | 'L' => ElementalComposition::from_chnops(6, 11, 1, 1, 0, 0),
        'K' => ElementalComposition::from_chnops(6, 12, 2, 1, 0, 0),
        'M' => ElementalComposition::from_chnops(5, 9, 1, 1, 0, 1),
        'F' => ElementalComposition::from_chnops(9, 9, 1, 1, 0, 0),
        'P' => ElementalComposition::from_chnops(5, 7, 1, 1, 0, 0),
        'S' => ElementalComposition::from_chnops(3, 5, 1, 2, 0, 0),
        'T' => ElementalComposition::from_chnops(4, 7, 1, 2, 0, 0),
        'W' => ElementalComposition::from_chnops(11, 10, 2, 1, 0, 0),
        'Y' => ElementalComposition::from_chnops(9, 9, 1, 2, 0, 0),
        'V' => ElementalComposition::from_chnops(5, 9, 1, 1, 0, 0),
        _ => return None,
    };
    Some(comp)
}

/// An unmodified peptide sequence made of the standard amino acids
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeptideSequence(String);

impl PeptideSequence {
    pub fn new(sequence: &str) -> Result<Self, FormulaError> {
        if sequence.is_empty() {
            return Err(FormulaError::EmptySequence);
        }
        if let Some(residue) = sequence.chars().find(|c| residue_composition(*c).is_none()) {
            return Err(FormulaError::UnknownResidue {
                residue,
                sequence: sequence.to_string(),
            });
        }
        Ok(Self(sequence.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `n` residues
    pub fn prefix(&self, n: usize) -> PeptideSequence {
        Self(self.0[..n.min(self.len())].to_string())
    }

    /// The last `n` residues
    pub fn suffix(&self, n: usize) -> PeptideSequence {
        let n = n.min(self.len());
        Self(self.0[self.len() - n..].to_string())
    }

    /// The sum of the residue compositions, without terminal groups
    pub fn residue_composition(&self) -> ElementalComposition {
        self.0
            .chars()
            .filter_map(residue_composition)
            .fold(ElementalComposition::new(), |acc, r| acc + r)
    }

    /// The neutral composition of the full peptide, including both termini
    pub fn formula(&self) -> ElementalComposition {
        self.residue_composition() + ElementalComposition::WATER
    }
}

impl FromStr for PeptideSequence {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for PeptideSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of species an [`Ion`] represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IonType {
    Precursor,
    /// An N-terminal b ion
    PrefixFragment,
    /// A C-terminal y ion
    SuffixFragment,
}

impl IonType {
    pub const fn letter(&self) -> &'static str {
        match self {
            IonType::Precursor => "M",
            IonType::PrefixFragment => "B",
            IonType::SuffixFragment => "Y",
        }
    }
}

impl Display for IonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IonType::Precursor => "precursor",
            IonType::PrefixFragment => "b",
            IonType::SuffixFragment => "y",
        };
        f.write_str(s)
    }
}

/// A charged precursor or fragment species of a peptide.
///
/// The `formula` carries `charge` extra hydrogens, and the monoisotopic and average
/// weights subtract the mass of the `charge` electrons those protons lost.
#[derive(Debug, Clone, PartialEq)]
pub struct Ion {
    pub sequence: PeptideSequence,
    pub ion_type: IonType,
    pub charge: i32,
    pub formula: ElementalComposition,
    pub monoisotopic_weight: f64,
    pub average_weight: f64,
}

impl Ion {
    pub fn new(
        sequence: PeptideSequence,
        ion_type: IonType,
        charge: i32,
        table: &ElementTable,
    ) -> Result<Self, FormulaError> {
        if charge < 1 {
            return Err(FormulaError::InvalidCharge(charge));
        }
        let neutral = match ion_type {
            IonType::Precursor | IonType::SuffixFragment => sequence.formula(),
            IonType::PrefixFragment => sequence.residue_composition(),
        };
        let formula = neutral + ElementalComposition::HYDROGEN * charge;
        let electrons = ELECTRON * charge as f64;
        Ok(Self {
            monoisotopic_weight: formula.monoisotopic_mass(table) - electrons,
            average_weight: formula.average_mass(table) - electrons,
            sequence,
            ion_type,
            charge,
            formula,
        })
    }

    pub fn precursor(
        sequence: PeptideSequence,
        charge: i32,
        table: &ElementTable,
    ) -> Result<Self, FormulaError> {
        Self::new(sequence, IonType::Precursor, charge, table)
    }

    #[inline]
    pub fn mono_mz(&self) -> f64 {
        self.monoisotopic_weight / self.charge as f64
    }

    /// The m/z of the `index`-th isotopic peak of this ion
    #[inline]
    pub fn isotope_mz(&self, index: usize) -> f64 {
        self.mono_mz() + isotopic_shift(self.charge) * index as f64
    }

    #[inline]
    pub fn sulfur_count(&self) -> i32 {
        self.formula.get(Element::S)
    }

    /// A short label like `B5++`
    pub fn name(&self) -> String {
        let mut label = format!("{}{}", self.ion_type.letter(), self.sequence.len());
        for _ in 0..self.charge {
            label.push('+');
        }
        label
    }
}

/// Generate the b and y ion ladder of a precursor.
///
/// Every backbone cleavage `1..len` contributes one b and one y ion at each charge
/// from 1 up to one less than the precursor charge (at least 1).
pub fn fragment_ions(precursor: &Ion, table: &ElementTable) -> Vec<Ion> {
    let n = precursor.sequence.len();
    let max_charge = (precursor.charge - 1).max(1);
    let mut ions = Vec::with_capacity(n.saturating_sub(1) * 2 * max_charge as usize);
    for charge in 1..=max_charge {
        for i in 1..n {
            let b = precursor.sequence.prefix(i);
            let y = precursor.sequence.suffix(n - i);
            for (seq, kind) in [(b, IonType::PrefixFragment), (y, IonType::SuffixFragment)] {
                if let Ok(ion) = Ion::new(seq, kind, charge, table) {
                    ions.push(ion);
                }
            }
        }
    }
    ions
}
