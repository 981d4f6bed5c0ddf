use std::{
    fs::File,
    io::{BufRead, BufReader, Write},
    path::Path,
};

use log::warn;

use crate::{dataset::batch::ScoreRecord, error::Result};

/// One `<path>\t<score>` line per record.
pub fn write_scores<W: Write>(mut writer: W, records: &[ScoreRecord]) -> Result<()> {
    for record in records {
        writeln!(writer, "{}\t{:?}", record.path.display(), record.score)?;
    }
    writer.flush()?;
    Ok(())
}

/// Scores from the second tab-separated column. A missing file reads as empty,
/// and a read error keeps the scores gathered before it.
pub fn read_scores<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("File not found: {}", path.display());
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(path)?);
    parse_scores(reader, &path.display().to_string())
}

/// Only the score column has to be valid UTF-8; paths are read lossily.
pub fn parse_scores<R: BufRead>(mut reader: R, source: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => line_no += 1,
            Err(e) => {
                warn!(
                    "{source}:{}: read failed, keeping {} scores: {e}",
                    line_no + 1,
                    values.len()
                );
                break;
            }
        }

        let line = String::from_utf8_lossy(&buf);
        let parts = line.trim().split('\t').collect::<Vec<_>>();
        if parts.len() < 2 {
            continue;
        }

        match parts[1].trim().parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) => warn!("{source}:{line_no}: cannot convert {:?} to a score", parts[1]),
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let text = "a.png\t12.5\nno-tab-here\nb.png\tabc\n\nc.png\t3\textra\nd.png\tNaN\n";
        let values = parse_scores(text.as_bytes(), "mem").unwrap();

        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 12.5);
        assert_eq!(values[1], 3.0);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_parse_tolerates_non_utf8_paths() {
        let bytes = b"a.png\t1.5\nb.png\t2.5\ncaf\xe9.png\t3.5\nd.png\t4.5\n";
        let values = parse_scores(&bytes[..], "mem").unwrap();

        assert_eq!(values, vec![1.5, 2.5, 3.5, 4.5]);
    }

    struct FailingReader {
        data: &'static [u8],
    }

    impl std::io::Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.data.is_empty() {
                return Err(std::io::Error::other("disk went away"));
            }
            let n = self.data.len().min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_parse_keeps_scores_before_read_error() {
        let reader = BufReader::new(FailingReader {
            data: b"a.png\t1.5\nb.png\t2.5\n",
        });
        let values = parse_scores(reader, "mem").unwrap();

        assert_eq!(values, vec![1.5, 2.5]);
    }

    #[test]
    fn test_read_scores_from_file_with_non_utf8_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("scores.txt");
        std::fs::write(&path, b"a.png\t1.5\ncaf\xe9.png\t3.5\n").unwrap();

        assert_eq!(read_scores(&path).unwrap(), vec![1.5, 3.5]);
    }

    #[test]
    fn test_write_format() {
        let records = vec![
            ScoreRecord {
                path: PathBuf::from("root/x.png"),
                score: 1.0,
            },
            ScoreRecord {
                path: PathBuf::from("root/y.png"),
                score: 0.25,
            },
        ];

        let mut out = Vec::new();
        write_scores(&mut out, &records).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "root/x.png\t1.0\nroot/y.png\t0.25\n");
    }
}
