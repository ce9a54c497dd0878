//! Integer elemental compositions and their masses
use std::fmt::Display;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use std::str::FromStr;

use crate::elements::{Element, ElementTable};
use crate::error::FormulaError;

/// A signed count of atoms of each [`Element`].
///
/// Counts may go negative while composing differences (e.g. precursor minus fragment),
/// isotope calculations treat non-positive counts as absent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementalComposition([i32; Element::COUNT]);

impl ElementalComposition {
    pub const fn new() -> Self {
        Self([0; Element::COUNT])
    }

    /// Build a composition from counts given in Hill order (C, H, N, O, P, S)
    pub const fn from_chnops(c: i32, h: i32, n: i32, o: i32, p: i32, s: i32) -> Self {
        Self([c, h, n, o, p, s])
    }

    /// Water, lost on peptide bond formation and regained at the termini
    pub const WATER: Self = Self::from_chnops(0, 2, 0, 1, 0, 0);

    pub const HYDROGEN: Self = Self::from_chnops(0, 1, 0, 0, 0, 0);

    #[inline]
    pub fn get(&self, element: Element) -> i32 {
        self.0[element.index()]
    }

    #[inline]
    pub fn set(&mut self, element: Element, count: i32) {
        self.0[element.index()] = count;
    }

    #[inline]
    pub fn increment(&mut self, element: Element, count: i32) {
        self.0[element.index()] += count;
    }

    /// Iterate over the elements with a non-zero count, in Hill order
    pub fn iter(&self) -> impl Iterator<Item = (Element, i32)> + '_ {
        Element::ALL
            .iter()
            .map(|e| (*e, self.get(*e)))
            .filter(|(_, c)| *c != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| *c == 0)
    }

    pub fn monoisotopic_mass(&self, table: &ElementTable) -> f64 {
        self.iter()
            .map(|(e, c)| table.monoisotopic_mass(e) * c as f64)
            .sum()
    }

    pub fn average_mass(&self, table: &ElementTable) -> f64 {
        self.iter()
            .map(|(e, c)| table.average_mass(e) * c as f64)
            .sum()
    }
}

impl Add for ElementalComposition {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for ElementalComposition {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a += b;
        }
    }
}

impl Sub for ElementalComposition {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl SubAssign for ElementalComposition {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.0.iter_mut().zip(rhs.0) {
            *a -= b;
        }
    }
}

impl Mul<i32> for ElementalComposition {
    type Output = Self;

    fn mul(mut self, rhs: i32) -> Self::Output {
        for a in self.0.iter_mut() {
            *a *= rhs;
        }
        self
    }
}

impl Display for ElementalComposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (e, c) in self.iter() {
            f.write_str(e.symbol())?;
            if c != 1 {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for ElementalComposition {
    type Err = FormulaError;

    /// Parse a formula like `C6H12O6` or `H-2O-1`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut comp = Self::new();
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            if !c.is_ascii_uppercase() {
                return Err(FormulaError::MalformedCount(s.to_string()));
            }
            let mut symbol = String::new();
            symbol.push(c);
            while let Some(c) = chars.next_if(|c| c.is_ascii_lowercase()) {
                symbol.push(c);
            }
            let element: Element = symbol.parse()?;

            let mut count = String::new();
            if let Some(c) = chars.next_if(|c| *c == '-') {
                count.push(c);
            }
            while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                count.push(c);
            }
            let count = match count.as_str() {
                "" => 1,
                "-" => return Err(FormulaError::MalformedCount(s.to_string())),
                _ => count
                    .parse::<i32>()
                    .map_err(|_| FormulaError::MalformedCount(s.to_string()))?,
            };
            comp.increment(element, count);
        }
        Ok(comp)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let glucose: ElementalComposition = "C6H12O6".parse().unwrap();
        assert_eq!(glucose.get(Element::C), 6);
        assert_eq!(glucose.get(Element::H), 12);
        assert_eq!(glucose.get(Element::O), 6);
        assert_eq!(glucose.to_string(), "C6H12O6");

        let loss: ElementalComposition = "H-2O-1".parse().unwrap();
        assert_eq!(loss, ElementalComposition::WATER * -1);
        assert_eq!(loss.to_string(), "H-2O-1");

        assert!("C6h".parse::<ElementalComposition>().is_err());
        assert!("Xe2".parse::<ElementalComposition>().is_err());
        assert!("C-".parse::<ElementalComposition>().is_err());
    }

    #[test]
    fn test_arithmetic() {
        let a = ElementalComposition::from_chnops(3, 5, 1, 1, 0, 1);
        let b = ElementalComposition::from_chnops(1, 2, 0, 1, 0, 1);
        let c = a - b;
        assert_eq!(c, ElementalComposition::from_chnops(2, 3, 1, 0, 0, 0));
        assert_eq!(c + b, a);
        assert_eq!(c.to_string(), "C2H3N");
    }

    #[test]
    fn test_mass() {
        let table = ElementTable::default();
        let water = ElementalComposition::WATER;
        assert!((water.monoisotopic_mass(&table) - 18.0105646837).abs() < 1e-6);
        assert!((water.average_mass(&table) - 18.01528).abs() < 1e-4);
    }
}
