// SPDX-License-Identifier: Apache-2.0

//! Whitespace-separated `0125` files: one header line, then one record per line.
//! Map rows are `name chromosome position`; sample rows are `id genotype`, where
//! the genotype string holds one character per marker.

use std::io::Write;
use std::path::Path;

use snpdb_model::{Attributes, FieldValues, MarkerRecord, SampleRecord};

use super::{
    count_data_lines, parse_position, write_line, FormatError, FormatErrorCode, FormatId,
    LineSource, MapReader, MapWriter, SampleReader, SampleWriter, MISSING_NAME, MISSING_NUMBER,
};

/// Field name of the packed genotype string.
pub const GENOTYPE_FIELD: &str = "g";

pub struct Zero125MapReader {
    source: LineSource,
    metadata: Attributes,
    count: usize,
    started: bool,
}

impl Zero125MapReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Ok(Self {
            count: count_data_lines(path, 1)?,
            source: LineSource::open(path)?,
            metadata: Attributes::new(),
            started: false,
        })
    }

    fn read_next(&mut self) -> Option<Result<MarkerRecord, FormatError>> {
        if !self.started {
            self.started = true;
            if let Err(err) = self.source.skip_header("map header") {
                return Some(Err(err));
            }
        }
        let line = match self.source.next_data_line()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        let cols: Vec<&str> = line.split_whitespace().collect();
        let [name, chromosome, position] = cols.as_slice() else {
            return Some(Err(self
                .source
                .error(format!("expected 3 columns, found {}", cols.len()))));
        };
        Some(
            parse_position(&self.source, position)
                .map(|pos| MarkerRecord::new(Some(*name), Some(*chromosome), Some(pos))),
        )
    }
}

impl Iterator for Zero125MapReader {
    type Item = Result<MarkerRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_next()
    }
}

impl MapReader for Zero125MapReader {
    fn format(&self) -> FormatId {
        FormatId::Zero125
    }

    fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    fn record_count(&self) -> usize {
        self.count
    }
}

pub struct Zero125SampleReader {
    source: LineSource,
    count: usize,
    started: bool,
}

impl Zero125SampleReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Ok(Self {
            count: count_data_lines(path, 1)?,
            source: LineSource::open(path)?,
            started: false,
        })
    }
}

impl Iterator for Zero125SampleReader {
    type Item = Result<SampleRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.started {
            self.started = true;
            if let Err(err) = self.source.skip_header("sample header") {
                return Some(Err(err));
            }
        }
        let line = match self.source.next_data_line()? {
            Ok(line) => line,
            Err(err) => return Some(Err(err)),
        };
        let cols: Vec<&str> = line.split_whitespace().collect();
        let [id, genotype] = cols.as_slice() else {
            return Some(Err(self
                .source
                .error(format!("expected 2 columns, found {}", cols.len()))));
        };
        Some(Ok(SampleRecord::new(*id)
            .with_field(GENOTYPE_FIELD, FieldValues::Chars((*genotype).to_string()))))
    }
}

impl SampleReader for Zero125SampleReader {
    fn format(&self) -> FormatId {
        FormatId::Zero125
    }

    fn sample_count(&self) -> usize {
        self.count
    }
}

pub struct Zero125MapWriter<W: Write> {
    out: W,
}

impl<W: Write> Zero125MapWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MapWriter for Zero125MapWriter<W> {
    fn write_map(&mut self, records: &[MarkerRecord]) -> Result<(), FormatError> {
        write_line(&mut self.out, "Name\tChromosome\tTEMPPOS")?;
        for record in records {
            let line = format!(
                "{}\t{}\t{}",
                record.name.as_deref().unwrap_or(MISSING_NAME),
                record.chromosome.as_deref().unwrap_or(MISSING_NUMBER),
                record
                    .position
                    .map_or_else(|| MISSING_NUMBER.to_string(), |p| p.to_string())
            );
            write_line(&mut self.out, &line)?;
        }
        self.out.flush().map_err(|e| FormatError::write(&e))
    }
}

pub struct Zero125SampleWriter<W: Write> {
    out: W,
}

impl<W: Write> Zero125SampleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> SampleWriter for Zero125SampleWriter<W> {
    fn write_samples(&mut self, samples: &[SampleRecord]) -> Result<(), FormatError> {
        write_line(&mut self.out, "ID\tGenotype")?;
        for sample in samples {
            let Some(values) = sample.fields.get(GENOTYPE_FIELD) else {
                return Err(FormatError::new(
                    FormatErrorCode::Unsupported,
                    format!(
                        "sample `{}` has no `{GENOTYPE_FIELD}` field to write as 0125",
                        sample.sample_id
                    ),
                ));
            };
            let genotype = values.to_values().concat();
            write_line(&mut self.out, &format!("{}\t{genotype}", sample.sample_id))?;
        }
        self.out.flush().map_err(|e| FormatError::write(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn map_reader_skips_header_and_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("m.txt");
        fs::write(&path, "Name Chr Pos\nrs1 1 100\n\nrs2 X 7\n").expect("write");
        let reader = Zero125MapReader::open(&path).expect("open");
        assert_eq!(reader.record_count(), 2);
        let records: Vec<MarkerRecord> = reader.map(|r| r.expect("record")).collect();
        assert_eq!(records[1], MarkerRecord::new(Some("rs2"), Some("X"), Some(7)));
    }

    #[test]
    fn bad_position_reports_line_number() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("m.txt");
        fs::write(&path, "h\nrs1 1 abc\n").expect("write");
        let err = Zero125MapReader::open(&path)
            .expect("open")
            .next()
            .expect("item")
            .expect_err("bad position");
        assert_eq!(err.code, FormatErrorCode::Parse);
        assert!(err.message.contains(":2:"), "{}", err.message);
    }

    #[test]
    fn sample_writer_emits_header_and_genotype() {
        let mut out = Vec::new();
        Zero125SampleWriter::new(&mut out)
            .write_samples(&[SampleRecord::new("S1")
                .with_field(GENOTYPE_FIELD, FieldValues::Chars("012".to_string()))])
            .expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), "ID\tGenotype\nS1\t012\n");
    }
}
