use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;

use flate2::read::GzDecoder;
use mzdata::io::{infer_format, MassSpectrometryFormat};
use mzdata::prelude::*;
use mzdata::MZReader;
use tracing::{debug, warn};

use mzfragiso::digest::{read_fasta, ProteinEntry};
use mzfragiso::PeptideSpectrumMatch;

use crate::driver::MZFragIsoError;

/// Read a tab separated table of peptide-spectrum matches, grouped by spectrum index
pub fn read_psms(path: &Path) -> Result<HashMap<usize, Vec<PeptideSpectrumMatch>>, MZFragIsoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    let mut by_spectrum: HashMap<usize, Vec<PeptideSpectrumMatch>> = HashMap::new();
    for row in reader.deserialize() {
        let psm: PeptideSpectrumMatch = row?;
        by_spectrum.entry(psm.spectrum_index).or_default().push(psm);
    }
    Ok(by_spectrum)
}

/// Read a tab separated table of sulfur counts and how often each was observed.
///
/// A leading row that is not a pair of counts is taken to be a header.
pub fn read_sulfur_counts(path: &Path) -> Result<BTreeMap<usize, usize>, MZFragIsoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut counts = BTreeMap::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let parsed: Result<(usize, usize), csv::Error> = row.deserialize(None);
        match parsed {
            Ok((sulfurs, count)) => {
                counts.insert(sulfurs, count);
            }
            Err(e) if i == 0 => {
                warn!("Treating {:?} as a header: {e}", row.iter().collect::<Vec<_>>());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(counts)
}

pub fn read_fasta_file(path: &Path) -> io::Result<Vec<ProteinEntry>> {
    let handle = fs::File::open(path)?;
    let compressed = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if compressed {
        read_fasta(io::BufReader::new(GzDecoder::new(handle)))
    } else {
        read_fasta(io::BufReader::new(handle))
    }
}

/// Open an mzML or MGF file, possibly gzipped
pub fn open_spectra(path: &Path) -> Result<MZReader<fs::File>, MZFragIsoError> {
    let (ms_format, compressed) = infer_format(path)?;
    debug!("Detected {ms_format:?} from path (compressed? {compressed})");
    match ms_format {
        MassSpectrometryFormat::MGF | MassSpectrometryFormat::MzML => {
            Ok(MZReader::open_path(path)?)
        }
        _ => Err(MZFragIsoError::FormatUnknownOrNotSupportedError(
            path.display().to_string(),
            ms_format,
        )),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test_log::test]
    fn test_read_sulfur_counts() {
        let counts = read_sulfur_counts("tests/data/sulfur_counts.tsv".as_ref()).unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(counts[&0], 1000);
        assert_eq!(counts[&3], 5);
    }

    #[test]
    fn test_malformed_sulfur_counts() {
        let path = std::env::temp_dir().join("mzfragiso_malformed_sulfur_counts.tsv");
        fs::write(&path, "0\t1000\n1\tmany\n").unwrap();
        assert!(matches!(
            read_sulfur_counts(&path),
            Err(MZFragIsoError::CSVError(_))
        ));

        fs::write(&path, "1\t20\n2\t4\n").unwrap();
        let counts = read_sulfur_counts(&path).unwrap();
        assert_eq!(counts, BTreeMap::from([(1, 20), (2, 4)]));
    }
}
