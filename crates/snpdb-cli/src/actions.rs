// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use snpdb_core::{ErrorCode, ExitCode};
use snpdb_ingest::formats::{map_writer, open_map_reader, open_sample_reader, sample_writer};
use snpdb_ingest::{
    delete_individual, import_map, import_samples, FormatId, ImportOutcome, MarkerPolicy,
    ResolutionStrategy, StorageLayout,
};
use snpdb_model::{
    FileFilter, IndividualFilter, IndividualId, MapFilter, MarkerFilter, MarkerId, SampleFilter,
};
use snpdb_query::{
    attach_file, download_files, export_map, export_samples, find_files, find_individuals,
    find_maps, find_markers, find_samples, lookup, sample_genotype, summarize,
};
use tracing::{info, warn};

use crate::commands::{Commands, FileArgs, IndividualArgs, OnConflict};
use crate::helpers::{emit_ok, open_store, parse_map_name, read_idfile};
use crate::prompt::LinePrompt;
use crate::{CliError, Context};

pub(crate) fn dispatch(ctx: &Context, command: Commands) -> Result<ExitCode, CliError> {
    match command {
        Commands::ImportMap {
            format,
            mapfile,
            mapname,
            force_create_new,
            force_use_existing,
            conflicts,
        } => {
            let policy = MarkerPolicy::from_flags(force_create_new, force_use_existing)?;
            run_import_map(ctx, format, &mapfile, &mapname, policy, conflicts.on_conflict)
        }
        Commands::ImportSamples {
            format,
            samplefile,
            mapname,
            idfile,
            conflicts,
        } => run_import_samples(
            ctx,
            format,
            &samplefile,
            &mapname,
            idfile.as_deref(),
            conflicts.on_conflict,
        ),
        Commands::FindMarkers {
            id,
            name,
            chromosome,
            min_chromosome,
            max_chromosome,
            min_position,
            max_position,
            map,
        } => {
            let filter = MarkerFilter {
                id: id.map(MarkerId),
                name,
                chromosome,
                min_chromosome,
                max_chromosome,
                min_position,
                max_position,
                map: map.as_deref().map(parse_map_name).transpose()?,
            };
            let store = open_store(&ctx.config)?;
            let markers = find_markers(&store, &filter)?;
            emit_list(ctx, "markers", &markers)
        }
        Commands::FindMaps {
            name,
            format,
            min_size,
            max_size,
        } => {
            let filter = MapFilter {
                name: name.as_deref().map(parse_map_name).transpose()?,
                format,
                min_size,
                max_size,
            };
            let store = open_store(&ctx.config)?;
            let maps = find_maps(&store, &filter)?;
            emit_list(ctx, "maps", &maps)
        }
        Commands::FindIndividuals(args) => {
            let filter = individual_filter(args)?;
            let store = open_store(&ctx.config)?;
            let individuals = find_individuals(&store, &filter)?;
            emit_list(ctx, "individuals", &individuals)
        }
        Commands::FindSamples { sample_id, map } => {
            let filter = SampleFilter {
                sample_id,
                map: map.as_deref().map(parse_map_name).transpose()?,
            };
            let store = open_store(&ctx.config)?;
            let samples = find_samples(&store, &filter)?;
            emit_list(ctx, "samples", &samples)
        }
        Commands::GetGenotype {
            map,
            sample,
            marker,
        } => run_get_genotype(ctx, &map, &sample, marker),
        Commands::PutFile { files, individual } => run_put_file(ctx, &files, individual),
        Commands::FindFiles(args) => {
            let store = open_store(&ctx.config)?;
            let files = find_files(&store, &file_filter(args))?;
            emit_list(ctx, "files", &files)
        }
        Commands::GetFiles(args) => {
            let store = open_store(&ctx.config)?;
            let written = download_files(&store, &file_filter(args), Path::new("."))?;
            emit_ok(
                ctx.output,
                json!({"command": "get-files", "status": "ok", "written": written}),
            )?;
            Ok(ExitCode::Success)
        }
        Commands::ExportMap {
            format,
            map,
            outfile,
        } => run_export_map(ctx, format, &map, &outfile),
        Commands::ExportSamples {
            format,
            map,
            outfile,
            samples,
        } => run_export_samples(ctx, format, &map, &outfile, &samples),
        Commands::Summarize(args) => {
            let filter = individual_filter(args)?;
            let store = open_store(&ctx.config)?;
            let summaries = summarize(&store, &filter)?;
            emit_list(ctx, "individuals", &summaries)
        }
        Commands::DeleteIndividual { id } => {
            let store = open_store(&ctx.config)?;
            let report = delete_individual(&store, IndividualId(id))?;
            emit_ok(
                ctx.output,
                json!({"command": "delete-individual", "status": "ok", "individual": id, "deleted": report}),
            )?;
            Ok(ExitCode::Success)
        }
    }
}

fn emit_list<T: serde::Serialize>(
    ctx: &Context,
    key: &str,
    items: &[T],
) -> Result<ExitCode, CliError> {
    let items = serde_json::to_value(items).map_err(|e| CliError::internal(e.to_string()))?;
    let mut payload = serde_json::Map::new();
    payload.insert("count".to_string(), json!(items.as_array().map_or(0, Vec::len)));
    payload.insert(key.to_string(), items);
    emit_ok(ctx.output, Value::Object(payload))?;
    Ok(ExitCode::Success)
}

fn individual_filter(args: IndividualArgs) -> Result<IndividualFilter, CliError> {
    Ok(IndividualFilter {
        id: args.id.map(IndividualId),
        tatoo: args.tatoo,
        sample_map: args.sample_map.as_deref().map(parse_map_name).transpose()?,
        sample_id: args.sample_id,
    })
}

fn file_filter(args: FileArgs) -> FileFilter {
    FileFilter {
        individual: args.individual.map(|id| id.to_string()),
        name: args.name,
    }
}

/// Runs `f` with the strategy selected by `--on-conflict`. Prompting needs a
/// terminal on stdin; without one conflicts fail the import.
fn with_strategy<T>(
    on_conflict: OnConflict,
    f: impl FnOnce(&mut ResolutionStrategy<'_>) -> Result<T, CliError>,
) -> Result<T, CliError> {
    match on_conflict {
        OnConflict::Create => f(&mut ResolutionStrategy::AutoCreate),
        OnConflict::Reuse => f(&mut ResolutionStrategy::AutoReuse),
        OnConflict::Fail => f(&mut ResolutionStrategy::FailFast),
        OnConflict::Prompt if std::io::stdin().is_terminal() => {
            let mut handler = LinePrompt::new(std::io::stdin().lock(), std::io::stderr());
            f(&mut ResolutionStrategy::Prompt(&mut handler))
        }
        OnConflict::Prompt => {
            warn!("stdin is not a terminal; conflicts will fail instead of prompting");
            f(&mut ResolutionStrategy::FailFast)
        }
    }
}

fn run_import_map(
    ctx: &Context,
    format: FormatId,
    path: &Path,
    mapname: &str,
    policy: MarkerPolicy,
    on_conflict: OnConflict,
) -> Result<ExitCode, CliError> {
    let name = parse_map_name(mapname)?;
    let layout = StorageLayout::from_config(&ctx.config)?;
    let mut reader = open_map_reader(format, path)?;
    let store = open_store(&ctx.config)?;
    let outcome = with_strategy(on_conflict, |strategy| {
        Ok(import_map(
            &store,
            layout,
            reader.as_mut(),
            &name,
            policy,
            strategy,
        )?)
    })?;
    match outcome {
        ImportOutcome::Completed(report) => {
            emit_ok(
                ctx.output,
                json!({"command": "import-map", "status": "ok", "report": report}),
            )?;
            Ok(ExitCode::Success)
        }
        ImportOutcome::Aborted => {
            info!(map = %name, "map import aborted; nothing stored");
            emit_ok(
                ctx.output,
                json!({"command": "import-map", "status": "aborted", "map": name}),
            )?;
            Ok(ExitCode::Aborted)
        }
    }
}

fn run_import_samples(
    ctx: &Context,
    format: FormatId,
    path: &Path,
    mapname: &str,
    idfile: Option<&Path>,
    on_conflict: OnConflict,
) -> Result<ExitCode, CliError> {
    let map = parse_map_name(mapname)?;
    let tatoos = match idfile {
        Some(idfile) => read_idfile(idfile)?,
        None => BTreeMap::new(),
    };
    let mut reader = open_sample_reader(format, path)?;
    let store = open_store(&ctx.config)?;
    let report = with_strategy(on_conflict, |strategy| {
        Ok(import_samples(
            &store,
            reader.as_mut(),
            &map,
            &tatoos,
            strategy,
        )?)
    })?;
    emit_ok(
        ctx.output,
        json!({"command": "import-samples", "status": "ok", "report": report}),
    )?;
    Ok(ExitCode::Success)
}

fn run_get_genotype(
    ctx: &Context,
    mapname: &str,
    sample: &str,
    marker: Option<u64>,
) -> Result<ExitCode, CliError> {
    let map = parse_map_name(mapname)?;
    let store = open_store(&ctx.config)?;
    let payload = match marker {
        Some(marker) => {
            let Some(genotype) = lookup(&store, &map, sample, MarkerId(marker))? else {
                return Err(CliError::coded(
                    ErrorCode::NotFound,
                    format!("no genotype for sample `{sample}` at marker {marker} in map `{map}`"),
                ));
            };
            json!({"map": map, "sample": sample, "marker": marker, "genotype": genotype})
        }
        None => {
            let fields = sample_genotype(&store, &map, sample)?;
            json!({"map": map, "sample": sample, "genotype": fields})
        }
    };
    emit_ok(ctx.output, payload)?;
    Ok(ExitCode::Success)
}

fn run_put_file(
    ctx: &Context,
    files: &[PathBuf],
    individual: Option<u64>,
) -> Result<ExitCode, CliError> {
    let store = open_store(&ctx.config)?;
    // owner reference is free text and is not checked against individuals
    let owner = individual.map(|id| id.to_string());
    let mut stored = Vec::with_capacity(files.len());
    for path in files {
        let id = attach_file(&store, path, owner.as_deref())?;
        stored.push(json!({"id": id, "path": path}));
    }
    emit_ok(
        ctx.output,
        json!({"command": "put-file", "status": "ok", "files": stored}),
    )?;
    Ok(ExitCode::Success)
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<(), CliError> {
    fs::write(path, bytes).map_err(|e| {
        CliError::coded(
            ErrorCode::FormatError,
            format!("failed to write {}: {e}", path.display()),
        )
    })
}

// Exports render into memory first so a failed export leaves no partial file.
fn run_export_map(
    ctx: &Context,
    format: FormatId,
    mapname: &str,
    outfile: &Path,
) -> Result<ExitCode, CliError> {
    let map = parse_map_name(mapname)?;
    let store = open_store(&ctx.config)?;
    let mut buffer = Vec::new();
    let markers = {
        let mut writer = map_writer(format, &mut buffer)?;
        export_map(&store, &map, writer.as_mut())?
    };
    write_output(outfile, &buffer)?;
    emit_ok(
        ctx.output,
        json!({"command": "export-map", "status": "ok", "map": map, "markers": markers, "out": outfile}),
    )?;
    Ok(ExitCode::Success)
}

fn run_export_samples(
    ctx: &Context,
    format: FormatId,
    mapname: &str,
    outfile: &Path,
    samples: &[String],
) -> Result<ExitCode, CliError> {
    let map = parse_map_name(mapname)?;
    let store = open_store(&ctx.config)?;
    let mut buffer = Vec::new();
    let written = {
        let mut writer = sample_writer(format, &mut buffer)?;
        export_samples(&store, &map, samples, writer.as_mut())?
    };
    write_output(outfile, &buffer)?;
    emit_ok(
        ctx.output,
        json!({"command": "export-samples", "status": "ok", "map": map, "samples": written, "out": outfile}),
    )?;
    Ok(ExitCode::Success)
}
