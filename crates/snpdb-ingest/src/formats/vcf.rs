// SPDX-License-Identifier: Apache-2.0

//! VCF files. `##key=value` lines form the metadata bag, the `#CHROM` line
//! names the sample columns, and each data row describes one marker.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde_json::Value;
use snpdb_model::{Attributes, FieldValues, MarkerRecord, SampleRecord};

use super::{FormatError, FormatId, LineSource, MapReader, SampleReader};

const META_PREFIX: &str = "##";
const FIXED_COLUMNS: usize = 8;
const FIRST_SAMPLE_COLUMN: usize = 9;
/// Written for a FORMAT key a row does not carry.
pub const MISSING_VALUE: &str = ".";

/// Splits on commas that sit outside double quotes.
fn split_unquoted(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Parses one `##key=value` line. Structured `<k=v,...>` values become objects.
#[must_use]
pub fn parse_vcf_meta_line(line: &str) -> Option<(String, Value)> {
    let body = line.strip_prefix(META_PREFIX)?;
    let (key, value) = body.split_once('=')?;
    if key.is_empty() || value.is_empty() {
        return None;
    }
    let structured = value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .map(|inner| {
            split_unquoted(inner)
                .into_iter()
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.trim().to_string(), Value::from(v.trim_matches('"'))))
                .collect::<serde_json::Map<String, Value>>()
        });
    Some((
        key.to_string(),
        structured.map_or_else(|| Value::from(value), Value::Object),
    ))
}

/// Reads the `##` metadata lines and the `#CHROM` header, leaving `source` on the first data row.
fn read_preamble(source: &mut LineSource) -> Result<(Attributes, Vec<String>), FormatError> {
    let mut metadata = Attributes::new();
    loop {
        let line = match source.next_line() {
            Some(line) => line?,
            None => return Err(source.error("missing #CHROM header line")),
        };
        if !line.starts_with(META_PREFIX) {
            return Ok((metadata, line.split_whitespace().map(str::to_string).collect()));
        }
        let Some((key, value)) = parse_vcf_meta_line(&line) else {
            continue;
        };
        if value.is_object() {
            let entry = metadata
                .entry(key)
                .or_insert_with(|| Value::Array(Vec::new()));
            match entry {
                Value::Array(items) => items.push(value),
                other => *other = Value::Array(vec![value]),
            }
        } else {
            metadata.insert(key, value);
        }
    }
}

pub struct VcfMapReader {
    source: LineSource,
    metadata: Attributes,
    count: usize,
}

impl VcfMapReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let mut counter = LineSource::open(path)?;
        read_preamble(&mut counter)?;
        let mut count = 0;
        while let Some(line) = counter.next_data_line() {
            line?;
            count += 1;
        }
        let mut source = LineSource::open(path)?;
        let (metadata, _) = read_preamble(&mut source)?;
        Ok(Self {
            source,
            metadata,
            count,
        })
    }

    fn parse(&self, line: &str) -> Result<MarkerRecord, FormatError> {
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < FIXED_COLUMNS {
            return Err(self.source.error(format!(
                "expected at least {FIXED_COLUMNS} columns, found {}",
                cols.len()
            )));
        }
        let position: u64 = cols[1]
            .parse()
            .map_err(|_| self.source.error(format!("invalid position `{}`", cols[1])))?;
        let name = (cols[2] != MISSING_VALUE).then_some(cols[2]);
        let qual = if cols[5] == MISSING_VALUE {
            Value::Null
        } else {
            let qual: f64 = cols[5]
                .parse()
                .map_err(|_| self.source.error(format!("invalid QUAL `{}`", cols[5])))?;
            Value::from(qual)
        };
        let mut record = MarkerRecord::new(name, Some(cols[0]), Some(position));
        record.extra.insert("ref".to_string(), Value::from(cols[3]));
        record.extra.insert(
            "alt".to_string(),
            Value::Array(cols[4].split(',').map(Value::from).collect()),
        );
        record.extra.insert("qual".to_string(), qual);
        record.extra.insert("filter".to_string(), Value::from(cols[6]));
        record.extra.insert("info".to_string(), Value::from(cols[7]));
        Ok(record)
    }
}

impl Iterator for VcfMapReader {
    type Item = Result<MarkerRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.source
                .next_data_line()?
                .and_then(|line| self.parse(&line)),
        )
    }
}

impl MapReader for VcfMapReader {
    fn format(&self) -> FormatId {
        FormatId::Vcf
    }

    fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    fn record_count(&self) -> usize {
        self.count
    }
}

/// Sample columns are transposed into per-sample records, so the whole file
/// is read when the reader opens. Each FORMAT key becomes one field.
pub struct VcfSampleReader {
    samples: std::vec::IntoIter<SampleRecord>,
    count: usize,
}

impl VcfSampleReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let mut source = LineSource::open(path)?;
        let (_, header) = read_preamble(&mut source)?;
        let sample_ids: Vec<String> = header.iter().skip(FIRST_SAMPLE_COLUMN).cloned().collect();

        // per sample, per row: FORMAT key -> value
        let mut rows: Vec<Vec<BTreeMap<String, String>>> = vec![Vec::new(); sample_ids.len()];
        let mut keys = BTreeSet::new();
        while let Some(line) = source.next_data_line() {
            let line = line?;
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() != header.len() {
                return Err(source.error(format!(
                    "missing column value: expected {} columns, found {}",
                    header.len(),
                    cols.len()
                )));
            }
            if sample_ids.is_empty() {
                continue;
            }
            let format: Vec<&str> = cols[FIRST_SAMPLE_COLUMN - 1].split(':').collect();
            keys.extend(format.iter().map(|k| (*k).to_string()));
            for (slot, raw) in rows.iter_mut().zip(&cols[FIRST_SAMPLE_COLUMN..]) {
                slot.push(
                    format
                        .iter()
                        .zip(raw.split(':'))
                        .map(|(k, v)| ((*k).to_string(), v.to_string()))
                        .collect(),
                );
            }
        }

        let samples: Vec<SampleRecord> = sample_ids
            .into_iter()
            .zip(rows)
            .map(|(sample_id, per_row)| {
                let mut record = SampleRecord::new(sample_id);
                for key in &keys {
                    let values = per_row
                        .iter()
                        .map(|row| row.get(key).cloned().unwrap_or_else(|| MISSING_VALUE.to_string()))
                        .collect();
                    record = record.with_field(key.clone(), FieldValues::Values(values));
                }
                record
            })
            .collect();
        Ok(Self {
            count: samples.len(),
            samples: samples.into_iter(),
        })
    }
}

impl Iterator for VcfSampleReader {
    type Item = Result<SampleRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next().map(Ok)
    }
}

impl SampleReader for VcfSampleReader {
    fn format(&self) -> FormatId {
        FormatId::Vcf
    }

    fn sample_count(&self) -> usize {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    const VCF: &str = "##fileformat=VCFv4.2\n\
##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth, all reads\">\n\
##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">\n\
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tNA1\tNA2\n\
20\t14370\trs6054257\tG\tA\t29\tPASS\tDP=14\tGT:GQ\t0|0:48\t1|0:48\n\
20\t17330\t.\tT\tA,C\t.\tq10\tDP=11\tGT\t0|0\t0/1\n";

    fn fixture() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("calls.vcf");
        fs::write(&path, VCF).expect("write");
        (dir, path)
    }

    #[test]
    fn structured_meta_values_keep_quoted_commas() {
        let (key, value) = parse_vcf_meta_line(
            "##INFO=<ID=DP,Number=1,Description=\"Total Depth, all reads\">",
        )
        .expect("meta");
        assert_eq!(key, "INFO");
        assert_eq!(value["Description"], json!("Total Depth, all reads"));
        assert_eq!(value["ID"], json!("DP"));
    }

    #[test]
    fn map_reader_collects_metadata_and_extras() {
        let (_dir, path) = fixture();
        let reader = VcfMapReader::open(&path).expect("open");
        assert_eq!(reader.record_count(), 2);
        assert_eq!(reader.metadata()["fileformat"], json!("VCFv4.2"));
        assert_eq!(reader.metadata()["INFO"].as_array().map(Vec::len), Some(2));
        let records: Vec<MarkerRecord> = reader.map(|r| r.expect("record")).collect();
        assert_eq!(records[0].name.as_deref(), Some("rs6054257"));
        assert_eq!(records[1].name, None);
        assert_eq!(records[1].extra["alt"], json!(["A", "C"]));
        assert_eq!(records[1].extra["qual"], Value::Null);
    }

    #[test]
    fn sample_reader_fills_absent_format_keys() {
        let (_dir, path) = fixture();
        let reader = VcfSampleReader::open(&path).expect("open");
        assert_eq!(reader.sample_count(), 2);
        let samples: Vec<SampleRecord> = reader.map(|r| r.expect("sample")).collect();
        assert_eq!(samples[1].sample_id, "NA2");
        assert_eq!(
            samples[1].fields["GT"],
            FieldValues::Values(vec!["1|0".to_string(), "0/1".to_string()])
        );
        assert_eq!(
            samples[0].fields["GQ"],
            FieldValues::Values(vec!["48".to_string(), MISSING_VALUE.to_string()])
        );
    }
}
