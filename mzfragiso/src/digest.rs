//! Protein sequence databases and their enzymatic digestion
use std::io::{self, BufRead};

/// One protein record from a FASTA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProteinEntry {
    pub identifier: String,
    pub description: String,
    pub sequence: String,
}

/// Read every record of a FASTA stream, in file order.
///
/// Sequence lines are concatenated with whitespace and `*` terminators removed. Text
/// before the first header is ignored.
pub fn read_fasta<R: BufRead>(reader: R) -> io::Result<Vec<ProteinEntry>> {
    let mut entries = Vec::new();
    let mut current: Option<ProteinEntry> = None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            let (identifier, description) = header
                .split_once(char::is_whitespace)
                .unwrap_or((header, ""));
            current = Some(ProteinEntry {
                identifier: identifier.to_string(),
                description: description.trim().to_string(),
                sequence: String::new(),
            });
        } else if let Some(entry) = current.as_mut() {
            entry.sequence.extend(
                line.chars()
                    .filter(|c| !c.is_whitespace() && *c != '*')
                    .map(|c| c.to_ascii_uppercase()),
            );
        }
    }
    if let Some(entry) = current.take() {
        entries.push(entry);
    }
    Ok(entries)
}

/// A specific protease digestion rule: cleave C-terminal to any residue in `cleave_at`
/// unless followed by `restrict`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Digestion {
    pub cleave_at: String,
    pub restrict: Option<char>,
    pub missed_cleavages: usize,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for Digestion {
    /// Fully tryptic, no missed cleavages, 5 to 80 residues
    fn default() -> Self {
        Self {
            cleave_at: "KR".to_string(),
            restrict: Some('P'),
            missed_cleavages: 0,
            min_len: 5,
            max_len: 80,
        }
    }
}

impl Digestion {
    /// The residue offsets at which `sequence` is cut, including both ends
    fn sites(&self, sequence: &str) -> Vec<usize> {
        let bytes = sequence.as_bytes();
        let mut sites = vec![0];
        for i in 0..bytes.len().saturating_sub(1) {
            let here = bytes[i] as char;
            let next = bytes[i + 1] as char;
            if self.cleave_at.contains(here) && self.restrict != Some(next) {
                sites.push(i + 1);
            }
        }
        if !sequence.is_empty() {
            sites.push(sequence.len());
        }
        sites
    }

    /// Digest `sequence` into peptides within the length bounds, in order of their
    /// position in the protein
    pub fn digest<'a>(&self, sequence: &'a str) -> Vec<&'a str> {
        if !sequence.is_ascii() {
            return Vec::new();
        }
        let sites = self.sites(sequence);
        let mut peptides = Vec::new();
        for (i, start) in sites.iter().enumerate() {
            for missed in 0..=self.missed_cleavages {
                let Some(end) = sites.get(i + 1 + missed) else {
                    break;
                };
                let len = end - start;
                if len >= self.min_len && len <= self.max_len {
                    peptides.push(&sequence[*start..*end]);
                }
            }
        }
        peptides
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const FASTA: &str = ">sp|P1|TEST first protein
MKWVTFISLLLLFSSAYSRGVFRRDTHK
SEIAHRFK*
>sp|P2|TEST second
PEPTIDEKPEPTIDER
";

    #[test]
    fn test_read_fasta() {
        let entries = read_fasta(FASTA.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].identifier, "sp|P1|TEST");
        assert_eq!(entries[0].description, "first protein");
        assert_eq!(entries[0].sequence, "MKWVTFISLLLLFSSAYSRGVFRRDTHKSEIAHRFK");
        assert_eq!(entries[1].sequence, "PEPTIDEKPEPTIDER");
    }

    #[test]
    fn test_tryptic() {
        let digestion = Digestion::default();
        let peptides = digestion.digest("MKWVTFISLLLLFSSAYSRGVFRRDTHKSEIAHRFK");
        assert_eq!(peptides, vec!["WVTFISLLLLFSSAYSR", "SEIAHR"]);
        // K followed by P is not a cleavage site
        assert_eq!(digestion.digest("PEPTIDEKPEPTIDER"), vec!["PEPTIDEKPEPTIDER"]);
    }

    #[test]
    fn test_missed_cleavages() {
        let digestion = Digestion {
            missed_cleavages: 1,
            min_len: 1,
            ..Default::default()
        };
        let peptides = digestion.digest("AAKBBRCC");
        assert_eq!(peptides, vec!["AAK", "AAKBBR", "BBR", "BBRCC", "CC"]);
    }
}
