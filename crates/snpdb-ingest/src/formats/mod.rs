// SPDX-License-Identifier: Apache-2.0

//! File format adapters: lazy map/sample readers and their inverse writers.

mod final_report;
mod plink;
mod vcf;
mod zero125;

use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use snpdb_model::{Attributes, MarkerRecord, SampleRecord};

pub use final_report::{FinalReportMapReader, FinalReportSampleReader};
pub use plink::{PlinkMapReader, PlinkMapWriter, PlinkSampleReader, PlinkSampleWriter};
pub use vcf::{parse_vcf_meta_line, VcfMapReader, VcfSampleReader};
pub use zero125::{Zero125MapReader, Zero125MapWriter, Zero125SampleReader, Zero125SampleWriter};

/// Written for a missing marker name.
pub const MISSING_NAME: &str = ".";
/// Written for a missing chromosome, position or PLINK id column.
pub const MISSING_NUMBER: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatErrorCode {
    Io,
    Parse,
    Unsupported,
}

impl FormatErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Io => "io_error",
            Self::Parse => "parse_error",
            Self::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub code: FormatErrorCode,
    pub message: String,
}

impl FormatError {
    #[must_use]
    pub fn new(code: FormatErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: &Path, err: &std::io::Error) -> Self {
        Self::new(FormatErrorCode::Io, format!("{}: {err}", path.display()))
    }

    pub(crate) fn parse(path: &Path, line: usize, detail: impl Display) -> Self {
        Self::new(
            FormatErrorCode::Parse,
            format!("{}:{line}: {detail}", path.display()),
        )
    }

    pub(crate) fn write(err: &std::io::Error) -> Self {
        Self::new(FormatErrorCode::Io, format!("write failed: {err}"))
    }
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for FormatError {}

/// Supported file formats, by their command-line code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatId {
    Zero125,
    Plink,
    FinalReport,
    Vcf,
}

impl FormatId {
    pub const ALL: [Self; 4] = [Self::Zero125, Self::Plink, Self::FinalReport, Self::Vcf];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Zero125 => "0125",
            Self::Plink => "pl",
            Self::FinalReport => "fr",
            Self::Vcf => "vcf",
        }
    }

    /// Stored in the map document's `format` field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Zero125 => "0125",
            Self::Plink => "PLINK",
            Self::FinalReport => "FR",
            Self::Vcf => "VCF",
        }
    }

    #[must_use]
    pub const fn supports_export(self) -> bool {
        matches!(self, Self::Zero125 | Self::Plink)
    }
}

impl Display for FormatId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for FormatId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.code().eq_ignore_ascii_case(s) || f.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                FormatError::new(
                    FormatErrorCode::Unsupported,
                    format!("unknown format `{s}` (expected 0125, pl, fr or vcf)"),
                )
            })
    }
}

/// Lazy, finite, non-restartable sequence of marker records.
pub trait MapReader: Iterator<Item = Result<MarkerRecord, FormatError>> {
    fn format(&self) -> FormatId;
    /// Format-specific metadata bag stored on the map document.
    fn metadata(&self) -> &Attributes;
    fn record_count(&self) -> usize;
}

/// Lazy, finite, non-restartable sequence of sample records.
pub trait SampleReader: Iterator<Item = Result<SampleRecord, FormatError>> {
    fn format(&self) -> FormatId;
    fn sample_count(&self) -> usize;
}

pub trait MapWriter {
    fn write_map(&mut self, records: &[MarkerRecord]) -> Result<(), FormatError>;
}

pub trait SampleWriter {
    fn write_samples(&mut self, samples: &[SampleRecord]) -> Result<(), FormatError>;
}

pub fn open_map_reader(format: FormatId, path: &Path) -> Result<Box<dyn MapReader>, FormatError> {
    Ok(match format {
        FormatId::Zero125 => Box::new(Zero125MapReader::open(path)?),
        FormatId::Plink => Box::new(PlinkMapReader::open(path)?),
        FormatId::FinalReport => Box::new(FinalReportMapReader::open(path)?),
        FormatId::Vcf => Box::new(VcfMapReader::open(path)?),
    })
}

pub fn open_sample_reader(
    format: FormatId,
    path: &Path,
) -> Result<Box<dyn SampleReader>, FormatError> {
    Ok(match format {
        FormatId::Zero125 => Box::new(Zero125SampleReader::open(path)?),
        FormatId::Plink => Box::new(PlinkSampleReader::open(path)?),
        FormatId::FinalReport => Box::new(FinalReportSampleReader::open(path)?),
        FormatId::Vcf => Box::new(VcfSampleReader::open(path)?),
    })
}

fn export_unsupported(format: FormatId) -> FormatError {
    FormatError::new(
        FormatErrorCode::Unsupported,
        format!("format `{format}` has no writer"),
    )
}

pub fn map_writer<'w, W: Write + 'w>(
    format: FormatId,
    out: W,
) -> Result<Box<dyn MapWriter + 'w>, FormatError> {
    match format {
        FormatId::Zero125 => Ok(Box::new(Zero125MapWriter::new(out))),
        FormatId::Plink => Ok(Box::new(PlinkMapWriter::new(out))),
        other => Err(export_unsupported(other)),
    }
}

pub fn sample_writer<'w, W: Write + 'w>(
    format: FormatId,
    out: W,
) -> Result<Box<dyn SampleWriter + 'w>, FormatError> {
    match format {
        FormatId::Zero125 => Ok(Box::new(Zero125SampleWriter::new(out))),
        FormatId::Plink => Ok(Box::new(PlinkSampleWriter::new(out))),
        other => Err(export_unsupported(other)),
    }
}

/// Numbered line source shared by the readers. Line numbers start at 1.
pub(crate) struct LineSource {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line_no: usize,
}

impl LineSource {
    pub(crate) fn open(path: &Path) -> Result<Self, FormatError> {
        let file = File::open(path).map_err(|e| FormatError::io(path, &e))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_no: 0,
        })
    }

    /// Next raw line, or `None` at end of file.
    pub(crate) fn next_line(&mut self) -> Option<Result<String, FormatError>> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line.map_err(|e| FormatError::io(&self.path, &e)))
    }

    /// Next line with content, skipping blank ones.
    pub(crate) fn next_data_line(&mut self) -> Option<Result<String, FormatError>> {
        loop {
            match self.next_line()? {
                Ok(line) if line.trim().is_empty() => continue,
                other => return Some(other),
            }
        }
    }

    pub(crate) fn error(&self, detail: impl Display) -> FormatError {
        FormatError::parse(&self.path, self.line_no, detail)
    }

    /// Consumes one line that must exist, such as a header.
    pub(crate) fn skip_header(&mut self, what: &str) -> Result<(), FormatError> {
        match self.next_line() {
            Some(line) => line.map(|_| ()),
            None => Err(self.error(format!("missing {what}"))),
        }
    }
}

/// Counts non-blank lines after skipping `header_lines`.
pub(crate) fn count_data_lines(path: &Path, header_lines: usize) -> Result<usize, FormatError> {
    let mut source = LineSource::open(path)?;
    for _ in 0..header_lines {
        if let Some(line) = source.next_line() {
            line?;
        }
    }
    let mut count = 0;
    while let Some(line) = source.next_data_line() {
        line?;
        count += 1;
    }
    Ok(count)
}

pub(crate) fn parse_position(source: &LineSource, raw: &str) -> Result<u64, FormatError> {
    raw.parse()
        .map_err(|_| source.error(format!("invalid position `{raw}`")))
}

pub(crate) fn write_line<W: Write>(out: &mut W, line: &str) -> Result<(), FormatError> {
    writeln!(out, "{line}").map_err(|e| FormatError::write(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_codes_and_labels_parse() {
        assert_eq!("pl".parse::<FormatId>().expect("pl"), FormatId::Plink);
        assert_eq!("PLINK".parse::<FormatId>().expect("label"), FormatId::Plink);
        assert_eq!("0125".parse::<FormatId>().expect("0125"), FormatId::Zero125);
        let err = "bed".parse::<FormatId>().expect_err("unknown");
        assert_eq!(err.code, FormatErrorCode::Unsupported);
    }

    #[test]
    fn only_text_formats_have_writers() {
        assert!(map_writer(FormatId::Vcf, Vec::new()).is_err());
        assert!(sample_writer(FormatId::FinalReport, Vec::new()).is_err());
        assert!(map_writer(FormatId::Plink, Vec::new()).is_ok());
    }
}
