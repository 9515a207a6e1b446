use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use fxhash::FxHashMap;

use crate::models::raf::Raf;

///
/// Get a reader for either a gzip'd or non-gzip'd file.
///
/// # Arguments
///
/// - path: path to the file to read
///
pub fn get_dynamic_reader(path: &Path) -> Result<BufReader<Box<dyn Read>>> {
    let is_gzipped = path.extension() == Some(OsStr::new("gz"));
    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;
    let file: Box<dyn Read> = match is_gzipped {
        true => Box::new(MultiGzDecoder::new(file)),
        false => Box::new(file),
    };

    let reader = BufReader::new(file);

    Ok(reader)
}

///
/// Read a file of alignment records into a map keyed by the five character
/// structure code + chain prefix (e.g. `1abcA`, `101m_`).
///
/// Lines starting with `#` and blank lines are skipped.
///
/// # Arguments
///
/// - path: path to the (optionally gzip'd) record file
///
pub fn read_raf_file(path: &Path) -> Result<FxHashMap<String, Raf>> {
    let reader = get_dynamic_reader(path)?;
    let mut records = FxHashMap::default();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let key = line
            .get(0..5)
            .with_context(|| format!("Record on line {} is too short", line_number + 1))?
            .to_string();
        let raf: Raf = line.parse().with_context(|| {
            format!("Failed to parse record {} on line {}", key, line_number + 1)
        })?;
        records.insert(key, raf);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::raf_line;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use std::io::Write;

    fn records_text() -> String {
        format!(
            "# raf 0.02\n{}\n\n{}\n",
            raf_line("1abcA", "1", "2", &[("1", 'a', 'a'), ("2", 'c', 'c')]),
            raf_line("101m_", "0", "0", &[("B", '.', 'm'), ("0", 'v', 'v')]),
        )
    }

    #[rstest]
    fn test_read_raf_file_plain() {
        let mut file = tempfile::Builder::new().suffix(".raf").tempfile().unwrap();
        file.write_all(records_text().as_bytes()).unwrap();

        let records = read_raf_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["1abcA"].len(), 2);
        assert_eq!(records["101m_"].chain(), None);
    }

    #[rstest]
    fn test_read_raf_file_gzipped() {
        let file = tempfile::Builder::new().suffix(".raf.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(records_text().as_bytes()).unwrap();
        encoder.finish().unwrap();

        let records = read_raf_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["1abcA"].code(), "1abc");
    }

    #[rstest]
    fn test_read_raf_file_bad_record() {
        let mut file = tempfile::Builder::new().suffix(".raf").tempfile().unwrap();
        file.write_all(b"1abcA too short\n").unwrap();
        assert!(read_raf_file(file.path()).is_err());
    }

    #[rstest]
    fn test_read_raf_file_missing() {
        assert!(read_raf_file(Path::new("does/not/exist.raf")).is_err());
    }
}
