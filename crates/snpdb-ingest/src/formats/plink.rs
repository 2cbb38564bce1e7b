// SPDX-License-Identifier: Apache-2.0

//! PLINK text files. `.map` rows are `chromosome name distance position`;
//! `.ped` rows carry six id columns followed by two allele columns per marker.

use std::io::Write;
use std::path::Path;

use snpdb_model::serde_helpers::attribute_text;
use snpdb_model::{Attributes, FieldValues, MarkerRecord, SampleRecord};

use super::{
    count_data_lines, parse_position, write_line, FormatError, FormatErrorCode, FormatId,
    LineSource, MapReader, MapWriter, SampleReader, SampleWriter, MISSING_NAME, MISSING_NUMBER,
};

pub const DISTANCE_KEY: &str = "dist";
/// The genotype field: one joined allele pair per marker.
pub const GENOTYPE_FIELD: &str = "g";
/// Leading `.ped` columns. Column 1 is the sample id; the others become attributes.
pub const PED_ID_COLUMNS: [&str; 6] = ["fid", "sample", "pid", "mid", "sex", "aff"];

pub struct PlinkMapReader {
    source: LineSource,
    metadata: Attributes,
    count: usize,
}

impl PlinkMapReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Ok(Self {
            count: count_data_lines(path, 0)?,
            source: LineSource::open(path)?,
            metadata: Attributes::new(),
        })
    }

    fn parse(&self, line: &str) -> Result<MarkerRecord, FormatError> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let [chromosome, name, distance, position] = cols.as_slice() else {
            return Err(self
                .source
                .error(format!("expected 4 columns, found {}", cols.len())));
        };
        let position = parse_position(&self.source, position)?;
        let mut record = MarkerRecord::new(Some(*name), Some(*chromosome), Some(position));
        if *distance != "0" {
            let distance: i64 = distance
                .parse()
                .map_err(|_| self.source.error(format!("invalid distance `{distance}`")))?;
            record
                .extra
                .insert(DISTANCE_KEY.to_string(), serde_json::Value::from(distance));
        }
        Ok(record)
    }
}

impl Iterator for PlinkMapReader {
    type Item = Result<MarkerRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.source
                .next_data_line()?
                .and_then(|line| self.parse(&line)),
        )
    }
}

impl MapReader for PlinkMapReader {
    fn format(&self) -> FormatId {
        FormatId::Plink
    }

    fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    fn record_count(&self) -> usize {
        self.count
    }
}

pub struct PlinkSampleReader {
    source: LineSource,
    count: usize,
}

impl PlinkSampleReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        Ok(Self {
            count: count_data_lines(path, 0)?,
            source: LineSource::open(path)?,
        })
    }

    fn parse(&self, line: &str) -> Result<SampleRecord, FormatError> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < PED_ID_COLUMNS.len() {
            return Err(self.source.error(format!(
                "expected at least {} id columns, found {}",
                PED_ID_COLUMNS.len(),
                cols.len()
            )));
        }
        let (ids, alleles) = cols.split_at(PED_ID_COLUMNS.len());
        if alleles.len() % 2 != 0 {
            return Err(self
                .source
                .error(format!("odd number of allele columns ({})", alleles.len())));
        }
        let mut record = SampleRecord::new(ids[1]);
        for (name, value) in PED_ID_COLUMNS.iter().zip(ids) {
            if *name != "sample" && *value != MISSING_NUMBER {
                record
                    .attributes
                    .insert((*name).to_string(), serde_json::Value::from(*value));
            }
        }
        let pairs = alleles
            .chunks(2)
            .map(|pair| format!("{}{}", pair[0], pair[1]))
            .collect();
        Ok(record.with_field(GENOTYPE_FIELD, FieldValues::Values(pairs)))
    }
}

impl Iterator for PlinkSampleReader {
    type Item = Result<SampleRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.source
                .next_data_line()?
                .and_then(|line| self.parse(&line)),
        )
    }
}

impl SampleReader for PlinkSampleReader {
    fn format(&self) -> FormatId {
        FormatId::Plink
    }

    fn sample_count(&self) -> usize {
        self.count
    }
}

pub struct PlinkMapWriter<W: Write> {
    out: W,
}

impl<W: Write> PlinkMapWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> MapWriter for PlinkMapWriter<W> {
    fn write_map(&mut self, records: &[MarkerRecord]) -> Result<(), FormatError> {
        for record in records {
            let distance = record
                .extra
                .get(DISTANCE_KEY)
                .map_or_else(|| MISSING_NUMBER.to_string(), attribute_text);
            let line = format!(
                "{} {} {distance} {}",
                record.chromosome.as_deref().unwrap_or(MISSING_NUMBER),
                record.name.as_deref().unwrap_or(MISSING_NAME),
                record
                    .position
                    .map_or_else(|| MISSING_NUMBER.to_string(), |p| p.to_string())
            );
            write_line(&mut self.out, &line)?;
        }
        self.out.flush().map_err(|e| FormatError::write(&e))
    }
}

pub struct PlinkSampleWriter<W: Write> {
    out: W,
}

impl<W: Write> PlinkSampleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

/// Splits a joined allele pair back into its two columns.
fn split_pair(sample_id: &str, pair: &str) -> Result<(String, String), FormatError> {
    let mut chars = pair.chars();
    match (chars.next(), chars.as_str()) {
        (Some(first), rest) if !rest.is_empty() => Ok((first.to_string(), rest.to_string())),
        _ => Err(FormatError::new(
            FormatErrorCode::Unsupported,
            format!("sample `{sample_id}` value `{pair}` is not an allele pair"),
        )),
    }
}

impl<W: Write> SampleWriter for PlinkSampleWriter<W> {
    fn write_samples(&mut self, samples: &[SampleRecord]) -> Result<(), FormatError> {
        for sample in samples {
            let Some(values) = sample.fields.get(GENOTYPE_FIELD) else {
                return Err(FormatError::new(
                    FormatErrorCode::Unsupported,
                    format!(
                        "sample `{}` has no `{GENOTYPE_FIELD}` field to write as PLINK",
                        sample.sample_id
                    ),
                ));
            };
            let mut cols: Vec<String> = PED_ID_COLUMNS
                .iter()
                .map(|name| {
                    if *name == "sample" {
                        return sample.sample_id.clone();
                    }
                    sample
                        .attributes
                        .get(*name)
                        .map_or_else(|| MISSING_NUMBER.to_string(), attribute_text)
                })
                .collect();
            for pair in values.to_values() {
                let (a, b) = split_pair(&sample.sample_id, &pair)?;
                cols.push(a);
                cols.push(b);
            }
            write_line(&mut self.out, &cols.join(" "))?;
        }
        self.out.flush().map_err(|e| FormatError::write(&e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn nonzero_distance_is_kept_as_extra() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.map");
        fs::write(&path, "1 rs1 0 100\n1 rs2 3 200\n").expect("write");
        let records: Vec<MarkerRecord> = PlinkMapReader::open(&path)
            .expect("open")
            .map(|r| r.expect("record"))
            .collect();
        assert!(records[0].extra.is_empty());
        assert_eq!(records[1].extra[DISTANCE_KEY], serde_json::json!(3));
    }

    #[test]
    fn ped_rows_join_allele_pairs_and_drop_zero_ids() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("p.ped");
        fs::write(&path, "F1 S1 0 0 1 0 A G T T\n").expect("write");
        let mut reader = PlinkSampleReader::open(&path).expect("open");
        assert_eq!(reader.sample_count(), 1);
        let sample = reader.next().expect("item").expect("sample");
        assert_eq!(sample.sample_id, "S1");
        assert_eq!(
            sample.attributes.keys().cloned().collect::<Vec<_>>(),
            vec!["fid".to_string(), "sex".to_string()]
        );
        assert_eq!(
            sample.fields[GENOTYPE_FIELD],
            FieldValues::Values(vec!["AG".to_string(), "TT".to_string()])
        );
    }

    #[test]
    fn writer_restores_ped_columns() {
        let mut sample = SampleRecord::new("S1").with_field(
            GENOTYPE_FIELD,
            FieldValues::Values(vec!["AG".to_string(), "TT".to_string()]),
        );
        sample
            .attributes
            .insert("fid".to_string(), serde_json::json!("F1"));
        let mut out = Vec::new();
        PlinkSampleWriter::new(&mut out)
            .write_samples(&[sample])
            .expect("write");
        assert_eq!(
            String::from_utf8(out).expect("utf8"),
            "F1 S1 0 0 0 0 A G T T\n"
        );
    }
}
