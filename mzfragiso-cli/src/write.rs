use std::fs;
use std::io::{self, Write};
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;

/// Open `path` for writing, or STDOUT if it is `-`. Paths ending in `.gz` are compressed.
pub fn open_output(path: &Path) -> io::Result<Box<dyn Write + Send>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::BufWriter::new(io::stdout())));
    }
    let handle = io::BufWriter::new(fs::File::create(path)?);
    let compressed = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
    if compressed {
        Ok(Box::new(GzEncoder::new(handle, Compression::best())))
    } else {
        Ok(Box::new(handle))
    }
}

pub fn tsv_writer<W: Write>(handle: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(handle)
}

/// Write every row to a new tab separated table at `path`, returning the number of rows
pub fn write_table<'a, T: Serialize + 'a>(
    path: &Path,
    rows: impl IntoIterator<Item = &'a T>,
) -> Result<usize, csv::Error> {
    let mut writer = tsv_writer(open_output(path)?);
    let mut n = 0;
    for row in rows {
        writer.serialize(row)?;
        n += 1;
    }
    writer.flush()?;
    Ok(n)
}
