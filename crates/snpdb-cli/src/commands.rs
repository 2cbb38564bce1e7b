// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};
use snpdb_ingest::FormatId;

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Import a map file as a new named map.
    ImportMap {
        format: FormatId,
        mapfile: PathBuf,
        mapname: String,
        #[arg(long, conflicts_with = "force_use_existing")]
        force_create_new: bool,
        #[arg(long)]
        force_use_existing: bool,
        #[command(flatten)]
        conflicts: ConflictArgs,
    },
    /// Import samples into an existing map.
    ImportSamples {
        format: FormatId,
        samplefile: PathBuf,
        mapname: String,
        /// Whitespace-separated `sample tatoo` lines linking samples to individuals.
        #[arg(long)]
        idfile: Option<PathBuf>,
        #[command(flatten)]
        conflicts: ConflictArgs,
    },
    FindMarkers {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "chr")]
        chromosome: Option<String>,
        #[arg(long = "min-chr")]
        min_chromosome: Option<String>,
        #[arg(long = "max-chr")]
        max_chromosome: Option<String>,
        #[arg(long = "min-pos")]
        min_position: Option<u64>,
        #[arg(long = "max-pos")]
        max_position: Option<u64>,
        #[arg(long)]
        map: Option<String>,
    },
    FindMaps {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        min_size: Option<u64>,
        #[arg(long)]
        max_size: Option<u64>,
    },
    FindIndividuals(IndividualArgs),
    FindSamples {
        #[arg(long = "id")]
        sample_id: Option<String>,
        #[arg(long)]
        map: Option<String>,
    },
    /// Print a sample's genotype at one marker, or the whole sample without MARKER.
    GetGenotype {
        map: String,
        sample: String,
        marker: Option<u64>,
    },
    PutFile {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        individual: Option<u64>,
    },
    FindFiles(FileArgs),
    /// Download matching files into the working directory.
    GetFiles(FileArgs),
    ExportMap {
        format: FormatId,
        map: String,
        outfile: PathBuf,
    },
    /// Export samples of a map; no SAMPLE exports every sample of the map.
    ExportSamples {
        format: FormatId,
        map: String,
        outfile: PathBuf,
        samples: Vec<String>,
    },
    Summarize(IndividualArgs),
    /// Delete an individual with its samples and genotype blocks.
    DeleteIndividual { id: u64 },
}

#[derive(Args)]
pub(crate) struct ConflictArgs {
    /// How ambiguous matches are settled; `prompt` falls back to `fail` without a terminal.
    #[arg(long, value_enum, default_value_t = OnConflict::Prompt)]
    pub on_conflict: OnConflict,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OnConflict {
    Prompt,
    Create,
    Reuse,
    Fail,
}

#[derive(Args)]
pub(crate) struct IndividualArgs {
    #[arg(long)]
    pub id: Option<u64>,
    /// Match any of the individual's tatoos exactly.
    #[arg(long = "name")]
    pub tatoo: Option<String>,
    #[arg(long = "sample")]
    pub sample_id: Option<String>,
    #[arg(long = "map")]
    pub sample_map: Option<String>,
}

#[derive(Args)]
pub(crate) struct FileArgs {
    #[arg(long)]
    pub individual: Option<u64>,
    #[arg(long)]
    pub name: Option<String>,
}
