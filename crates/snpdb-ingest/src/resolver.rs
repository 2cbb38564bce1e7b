// SPDX-License-Identifier: Apache-2.0

use snpdb_model::{Marker, MarkerFilter, MarkerId, MarkerRecord, COUNTER_MARKERS};
use snpdb_store::DocumentStore;
use tracing::debug;

use crate::allocator::IdAllocator;
use crate::decision::{ConflictKind, ConflictPrompt, Decision, DecisionOptions, ResolutionStrategy};
use crate::ImportError;

/// How incoming markers are matched against stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkerPolicy {
    /// Every (chromosome, position) match goes through the resolution strategy.
    #[default]
    Ask,
    CreateAlwaysNew,
    /// A single match is reused silently; several matches still go through the strategy.
    UseExistingWhenAvailable,
}

impl MarkerPolicy {
    pub fn from_flags(force_create_new: bool, force_use_existing: bool) -> Result<Self, ImportError> {
        match (force_create_new, force_use_existing) {
            (true, true) => Err(ImportError::Configuration(
                "force-create-new and force-use-existing cannot be used together".to_string(),
            )),
            (true, false) => Ok(Self::CreateAlwaysNew),
            (false, true) => Ok(Self::UseExistingWhenAvailable),
            (false, false) => Ok(Self::Ask),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMarker {
    pub id: MarkerId,
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// One entry per input record, in input order.
    Resolved(Vec<ResolvedMarker>),
    Aborted,
}

fn fresh(next_id: &mut u64) -> ResolvedMarker {
    let id = MarkerId(*next_id);
    *next_id += 1;
    ResolvedMarker { id, is_new: true }
}

fn describe_record(record: &MarkerRecord) -> String {
    format!(
        "{} (chromosome {}, position {})",
        record.name.as_deref().unwrap_or("<unnamed>"),
        record.chromosome.as_deref().unwrap_or("?"),
        record
            .position
            .map_or_else(|| "?".to_string(), |p| p.to_string())
    )
}

fn describe_marker(marker: &Marker) -> String {
    let maps: Vec<&str> = marker.maps.iter().map(|m| m.as_str()).collect();
    format!(
        "marker {} {} (chromosome {}, position {}) in maps [{}]",
        marker.id,
        marker.name.as_deref().unwrap_or("<unnamed>"),
        marker.chromosome.as_deref().unwrap_or("?"),
        marker
            .position
            .map_or_else(|| "?".to_string(), |p| p.to_string()),
        maps.join(", ")
    )
}

/// Assigns a marker id to every record.
///
/// Reserves `records.len()` ids up front; ids of records later resolved to an
/// existing marker are left unused. Only already stored markers are candidates,
/// so two records of the same import never merge. Nothing but the counter is
/// written, so an abort leaves the documents untouched.
pub fn resolve_markers<S: DocumentStore + ?Sized>(
    store: &S,
    records: &[MarkerRecord],
    policy: MarkerPolicy,
    strategy: &mut ResolutionStrategy<'_>,
) -> Result<Resolution, ImportError> {
    let reserved = IdAllocator::new(store).reserve(COUNTER_MARKERS, records.len() as u64)?;
    let mut next_id = reserved.start;
    let mut policy = policy;
    let mut out = Vec::with_capacity(records.len());

    for record in records {
        if policy == MarkerPolicy::CreateAlwaysNew {
            out.push(fresh(&mut next_id));
            continue;
        }
        let similar = match record.locus() {
            Some((chromosome, position)) => {
                store.find_markers(&MarkerFilter::at_locus(chromosome, position))?
            }
            None => Vec::new(),
        };
        if similar.is_empty() {
            out.push(fresh(&mut next_id));
            continue;
        }
        if similar.len() == 1 && policy == MarkerPolicy::UseExistingWhenAvailable {
            out.push(ResolvedMarker {
                id: similar[0].id,
                is_new: false,
            });
            continue;
        }

        let open = policy != MarkerPolicy::UseExistingWhenAvailable;
        let prompt = ConflictPrompt {
            kind: ConflictKind::Marker,
            subject: describe_record(record),
            candidates: similar.iter().map(describe_marker).collect(),
            options: DecisionOptions {
                create_new: open,
                always_create_new: open,
                always_use_existing: open && similar.len() == 1,
            },
        };
        match strategy.resolve(&prompt)? {
            Decision::Abort => {
                debug!(subject = %prompt.subject, "marker resolution aborted");
                return Ok(Resolution::Aborted);
            }
            Decision::CreateNew => out.push(fresh(&mut next_id)),
            Decision::AlwaysCreateNew => {
                out.push(fresh(&mut next_id));
                policy = MarkerPolicy::CreateAlwaysNew;
            }
            Decision::AlwaysUseExisting => {
                out.push(ResolvedMarker {
                    id: similar[0].id,
                    is_new: false,
                });
                policy = MarkerPolicy::UseExistingWhenAvailable;
            }
            Decision::UseExisting(idx) => out.push(ResolvedMarker {
                id: similar[idx].id,
                is_new: false,
            }),
        }
    }
    Ok(Resolution::Resolved(out))
}
