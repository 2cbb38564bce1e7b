// SPDX-License-Identifier: Apache-2.0

//! Illumina final report files. Data rows follow the `[Data]` section marker
//! and its column header, one row per (marker, sample), grouped by sample.

use std::collections::BTreeMap;
use std::path::Path;

use snpdb_model::{Attributes, FieldValues, MarkerRecord, SampleRecord};

use super::{FormatError, FormatId, LineSource, MapReader, SampleReader};

const DATA_SECTION: &str = "[Data]";
/// Per-marker value columns after the marker name and sample id.
pub const FINAL_REPORT_FIELDS: [&str; 9] =
    ["a1f", "a2f", "a1t", "a2t", "a1ab", "a2ab", "gc", "x", "y"];
const NUMERIC_FIELDS: [&str; 3] = ["gc", "x", "y"];

/// Positions `source` on the first data row.
fn seek_data(source: &mut LineSource) -> Result<(), FormatError> {
    loop {
        match source.next_line() {
            Some(Ok(line)) if line.contains(DATA_SECTION) => break,
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err),
            None => return Err(source.error(format!("no {DATA_SECTION} section"))),
        }
    }
    source.skip_header("data column header")
}

/// Reads `(marker name, sample id, rest)` of the next data row.
fn next_row(source: &mut LineSource) -> Option<Result<(String, String, Vec<String>), FormatError>> {
    let line = match source.next_data_line()? {
        Ok(line) => line,
        Err(err) => return Some(Err(err)),
    };
    let mut cols = line.split_whitespace().map(str::to_string);
    match (cols.next(), cols.next()) {
        (Some(marker), Some(sample)) => Some(Ok((marker, sample, cols.collect()))),
        _ => Some(Err(source.error("expected marker and sample columns"))),
    }
}

/// Marker names of the first sample in the report. Carries no positions.
pub struct FinalReportMapReader {
    source: LineSource,
    metadata: Attributes,
    count: usize,
    first_sample: Option<String>,
    done: bool,
}

impl FinalReportMapReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let mut counter = Self::start(path)?;
        let mut count = 0;
        for record in counter.by_ref() {
            record?;
            count += 1;
        }
        let mut reader = Self::start(path)?;
        reader.count = count;
        Ok(reader)
    }

    fn start(path: &Path) -> Result<Self, FormatError> {
        let mut source = LineSource::open(path)?;
        seek_data(&mut source)?;
        Ok(Self {
            source,
            metadata: Attributes::new(),
            count: 0,
            first_sample: None,
            done: false,
        })
    }
}

impl Iterator for FinalReportMapReader {
    type Item = Result<MarkerRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (marker, sample, _) = match next_row(&mut self.source)? {
            Ok(row) => row,
            Err(err) => return Some(Err(err)),
        };
        match &self.first_sample {
            Some(first) if *first != sample => {
                self.done = true;
                return None;
            }
            Some(_) => {}
            None => self.first_sample = Some(sample),
        }
        Some(Ok(MarkerRecord::new(Some(&marker), None, None)))
    }
}

impl MapReader for FinalReportMapReader {
    fn format(&self) -> FormatId {
        FormatId::FinalReport
    }

    fn metadata(&self) -> &Attributes {
        &self.metadata
    }

    fn record_count(&self) -> usize {
        self.count
    }
}

struct PartialSample {
    sample_id: String,
    columns: BTreeMap<&'static str, Vec<String>>,
}

impl PartialSample {
    fn new(sample_id: String) -> Self {
        Self {
            sample_id,
            columns: FINAL_REPORT_FIELDS.iter().map(|f| (*f, Vec::new())).collect(),
        }
    }

    fn finish(self) -> SampleRecord {
        let mut record = SampleRecord::new(self.sample_id);
        for (name, values) in self.columns {
            record = record.with_field(name, FieldValues::Values(values));
        }
        record
    }
}

/// One sample per run of consecutive rows sharing a sample id.
pub struct FinalReportSampleReader {
    source: LineSource,
    count: usize,
    current: Option<PartialSample>,
}

impl FinalReportSampleReader {
    pub fn open(path: &Path) -> Result<Self, FormatError> {
        let mut source = LineSource::open(path)?;
        seek_data(&mut source)?;
        let mut count = 0;
        let mut previous: Option<String> = None;
        while let Some(row) = next_row(&mut source) {
            let (_, sample, _) = row?;
            if previous.as_deref() != Some(sample.as_str()) {
                count += 1;
                previous = Some(sample);
            }
        }
        let mut source = LineSource::open(path)?;
        seek_data(&mut source)?;
        Ok(Self {
            source,
            count,
            current: None,
        })
    }

    fn push_row(&self, sample: &mut PartialSample, values: Vec<String>) -> Result<(), FormatError> {
        if values.len() != FINAL_REPORT_FIELDS.len() {
            return Err(self.source.error(format!(
                "expected {} value columns, found {}",
                FINAL_REPORT_FIELDS.len(),
                values.len()
            )));
        }
        for (name, value) in FINAL_REPORT_FIELDS.iter().zip(values) {
            if NUMERIC_FIELDS.contains(name) && value.parse::<f64>().is_err() {
                return Err(self
                    .source
                    .error(format!("column `{name}` is not a number: `{value}`")));
            }
            if let Some(column) = sample.columns.get_mut(name) {
                column.push(value);
            }
        }
        Ok(())
    }
}

impl Iterator for FinalReportSampleReader {
    type Item = Result<SampleRecord, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(row) = next_row(&mut self.source) else {
                return self.current.take().map(|s| Ok(s.finish()));
            };
            let (_, sample_id, values) = match row {
                Ok(row) => row,
                Err(err) => return Some(Err(err)),
            };
            let mut completed = None;
            let mut current = match self.current.take() {
                Some(current) if current.sample_id == sample_id => current,
                Some(previous) => {
                    completed = Some(previous.finish());
                    PartialSample::new(sample_id)
                }
                None => PartialSample::new(sample_id),
            };
            if let Err(err) = self.push_row(&mut current, values) {
                return Some(Err(err));
            }
            self.current = Some(current);
            if let Some(done) = completed {
                return Some(Ok(done));
            }
        }
    }
}

impl SampleReader for FinalReportSampleReader {
    fn format(&self) -> FormatId {
        FormatId::FinalReport
    }

    fn sample_count(&self) -> usize {
        self.count
    }
}
