/*! Estimating elemental compositions and isotope patterns from an average weight */
use crate::capture::CaptureSet;
use crate::composition::ElementalComposition;
use crate::elements::{Element, ElementTable};
use crate::isotopes::conditional_distribution;

/// A fractional elemental composition with non-ordinal element counts used to represent
/// "averaged" chemical compositions.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FractionalComposition([f64; Element::COUNT]);

impl FractionalComposition {
    pub const fn new() -> Self {
        Self([0.0; Element::COUNT])
    }

    #[inline]
    pub fn get(&self, element: Element) -> f64 {
        self.0[element.index()]
    }

    #[inline]
    pub fn set(&mut self, element: Element, count: f64) {
        self.0[element.index()] = count;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Element, f64)> + '_ {
        Element::ALL
            .iter()
            .map(|e| (*e, self.get(*e)))
            .filter(|(_, c)| *c != 0.0)
    }

    pub fn average_mass(&self, table: &ElementTable) -> f64 {
        self.iter().map(|(e, c)| table.average_mass(e) * c).sum()
    }
}

impl FromIterator<(Element, f64)> for FractionalComposition {
    fn from_iter<T: IntoIterator<Item = (Element, f64)>>(iter: T) -> Self {
        let mut this = Self::new();
        for (e, c) in iter {
            this.set(e, c);
        }
        this
    }
}

/// A model for converting an average weight into a plausible peptide composition based
/// upon an "average residue" and linear extension.
///
/// This is an implementation of Senko's Averagine [^1], with an additional mode that
/// pins the sulfur count and distributes the rest of the weight over the other elements.
///
/// # References
/// [^1]: Senko M, Beu S, McLafferty F: Determination of Monoisotopic Masses and Ion
///       Populations for Large Biomolecules from Resolved Isotopic Distributions.
///       Journal of the American Society for Mass Spectrometry 1995, 6:229-233
///       <https://doi.org/10.1016/1044-0305(95)00017-8>
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AveragineModel {
    /// The "average" residue composition
    pub base_composition: FractionalComposition,
}

impl Default for AveragineModel {
    fn default() -> Self {
        Self::new(
            [
                (Element::C, 4.9384),
                (Element::H, 7.7583),
                (Element::N, 1.3577),
                (Element::O, 1.4773),
                (Element::S, 0.0417),
            ]
            .into_iter()
            .collect(),
        )
    }
}

impl AveragineModel {
    pub fn new(base_composition: FractionalComposition) -> Self {
        Self { base_composition }
    }

    /// The average mass of one average residue
    pub fn base_mass(&self, table: &ElementTable) -> f64 {
        self.base_composition.average_mass(table)
    }

    /// Fill in hydrogens so the composition's average mass gets as close to `weight`
    /// as whole hydrogen atoms allow
    fn fill_hydrogen(scaled: &mut ElementalComposition, weight: f64, table: &ElementTable) {
        scaled.set(Element::H, 0);
        let remainder = weight - scaled.average_mass(table);
        let hydrogens = (remainder / table.average_mass(Element::H)).round().max(0.0);
        scaled.set(Element::H, hydrogens as i32);
    }

    /// Estimate a composition whose average mass is approximately `weight`
    pub fn scale(&self, weight: f64, table: &ElementTable) -> ElementalComposition {
        let factor = weight / self.base_mass(table);
        let mut scaled = ElementalComposition::new();
        for (elt, count) in self.base_composition.iter() {
            if elt != Element::H {
                scaled.set(elt, (count * factor).round() as i32);
            }
        }
        Self::fill_hydrogen(&mut scaled, weight, table);
        scaled
    }

    /// Estimate a composition whose average mass is approximately `weight` and which
    /// contains exactly `sulfurs` sulfur atoms
    pub fn scale_with_sulfur(
        &self,
        weight: f64,
        sulfurs: i32,
        table: &ElementTable,
    ) -> ElementalComposition {
        let sulfurs = sulfurs.max(0);
        let mut sulfur_free = self.base_composition;
        sulfur_free.set(Element::S, 0.0);
        let remaining = (weight - sulfurs as f64 * table.average_mass(Element::S)).max(0.0);
        let factor = remaining / sulfur_free.average_mass(table);

        let mut scaled = ElementalComposition::new();
        for (elt, count) in sulfur_free.iter() {
            if elt != Element::H {
                scaled.set(elt, (count * factor).round() as i32);
            }
        }
        scaled.set(Element::S, sulfurs);
        Self::fill_hydrogen(&mut scaled, weight, table);
        scaled
    }

    /// The isotope distribution of an averagine species of `weight`, to `depth` isotopes
    pub fn distribution(&self, weight: f64, depth: usize, table: &ElementTable) -> Vec<f64> {
        table.isotope_distribution(&self.scale(weight, table), depth)
    }

    /// As [`AveragineModel::distribution`], with a pinned sulfur count
    pub fn distribution_with_sulfur(
        &self,
        weight: f64,
        sulfurs: i32,
        depth: usize,
        table: &ElementTable,
    ) -> Vec<f64> {
        table.isotope_distribution(&self.scale_with_sulfur(weight, sulfurs, table), depth)
    }

    /// Estimate the isotope distribution of a fragment of average weight `fragment_weight`
    /// cleaved from a precursor of average weight `precursor_weight` when the precursor
    /// isotopes in `capture` were isolated
    pub fn fragment_distribution(
        &self,
        precursor_weight: f64,
        fragment_weight: f64,
        capture: &CaptureSet,
        table: &ElementTable,
    ) -> Vec<f64> {
        let depth = match capture.largest() {
            Some(largest) => largest + 1,
            None => return Vec::new(),
        };
        let fragment = self.distribution(fragment_weight, depth, table);
        let complement = self.distribution(precursor_weight - fragment_weight, depth, table);
        conditional_distribution(&fragment, &complement, capture)
    }

    /// As [`AveragineModel::fragment_distribution`], with the precursor and fragment
    /// sulfur counts known
    pub fn fragment_distribution_with_sulfur(
        &self,
        precursor_weight: f64,
        precursor_sulfurs: i32,
        fragment_weight: f64,
        fragment_sulfurs: i32,
        capture: &CaptureSet,
        table: &ElementTable,
    ) -> Vec<f64> {
        let depth = match capture.largest() {
            Some(largest) => largest + 1,
            None => return Vec::new(),
        };
        let fragment = self.distribution_with_sulfur(fragment_weight, fragment_sulfurs, depth, table);
        let complement = self.distribution_with_sulfur(
            precursor_weight - fragment_weight,
            precursor_sulfurs - fragment_sulfurs,
            depth,
            table,
        );
        conditional_distribution(&fragment, &complement, capture)
    }
}
