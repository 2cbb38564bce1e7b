// SPDX-License-Identifier: Apache-2.0

//! Links imported samples to individuals through their tatoos, and removes
//! an individual together with everything it owns.

use serde::Serialize;
use snpdb_model::{Individual, IndividualFilter, IndividualId, SampleKey, COUNTER_INDIVIDUALS};
use snpdb_store::DocumentStore;
use tracing::{debug, info};

use crate::allocator::IdAllocator;
use crate::decision::{ConflictKind, ConflictPrompt, Decision, DecisionOptions, ResolutionStrategy};
use crate::ImportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "individual", rename_all = "snake_case")]
pub enum Association {
    Unlinked,
    Created(IndividualId),
    Updated(IndividualId),
}

fn describe_individual(individual: &Individual) -> String {
    let samples: Vec<String> = individual.samples.iter().map(ToString::to_string).collect();
    format!(
        "individual {} tatoos [{}] samples [{}]",
        individual.id,
        individual.tatoos.join(", "),
        samples.join(", ")
    )
}

fn create_individual<S: DocumentStore + ?Sized>(
    store: &S,
    key: &SampleKey,
    tatoo: &str,
) -> Result<Association, ImportError> {
    let id = IndividualId(IdAllocator::new(store).next(COUNTER_INDIVIDUALS)?);
    store.insert_individual(&Individual {
        id,
        tatoos: vec![tatoo.to_string()],
        samples: vec![key.clone()],
    })?;
    info!(individual = %id, tatoo, sample = %key, "individual created");
    Ok(Association::Created(id))
}

fn append_sample<S: DocumentStore + ?Sized>(
    store: &S,
    id: IndividualId,
    key: &SampleKey,
) -> Result<Association, ImportError> {
    store.append_individual_sample(id, key)?;
    debug!(individual = %id, sample = %key, "sample linked to individual");
    Ok(Association::Updated(id))
}

/// Links `key` to the individual carrying `tatoo`, creating one when none does.
pub fn associate_sample<S: DocumentStore + ?Sized>(
    store: &S,
    key: &SampleKey,
    tatoo: Option<&str>,
    strategy: &mut ResolutionStrategy<'_>,
) -> Result<Association, ImportError> {
    let Some(tatoo) = tatoo else {
        return Ok(Association::Unlinked);
    };
    let candidates = store.find_individuals(&IndividualFilter::by_tatoo(tatoo))?;
    match candidates.as_slice() {
        [] => create_individual(store, key, tatoo),
        [only] => append_sample(store, only.id, key),
        many => {
            let prompt = ConflictPrompt {
                kind: ConflictKind::Individual,
                subject: format!("tatoo {tatoo} for sample {key}"),
                candidates: many.iter().map(describe_individual).collect(),
                options: DecisionOptions {
                    create_new: true,
                    ..DecisionOptions::default()
                },
            };
            match strategy.resolve(&prompt)? {
                Decision::CreateNew => create_individual(store, key, tatoo),
                Decision::UseExisting(idx) => append_sample(store, many[idx].id, key),
                Decision::Abort => Err(ImportError::UserAborted(format!(
                    "individual association for sample {key} aborted"
                ))),
                other => Err(ImportError::InvalidDecision(format!(
                    "{other:?} is not an offered option for tatoo {tatoo}"
                ))),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub genotype_blocks: u64,
    pub samples: u64,
    pub individuals: u64,
}

/// Deletes an individual, its samples, and their genotype blocks.
pub fn delete_individual<S: DocumentStore + ?Sized>(
    store: &S,
    id: IndividualId,
) -> Result<DeletionReport, ImportError> {
    let Some(individual) = store.get_individual(id)? else {
        return Err(ImportError::NotFound(format!("individual {id}")));
    };
    let keys = individual.samples;
    let report = DeletionReport {
        genotype_blocks: store.delete_blocks(&keys)?,
        samples: store.delete_samples(&keys)?,
        individuals: store.delete_individual(id)?,
    };
    info!(
        individual = %id,
        genotype_blocks = report.genotype_blocks,
        samples = report.samples,
        "individual deleted"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use snpdb_model::MapName;
    use snpdb_store::MemoryStore;

    fn key(sample: &str) -> SampleKey {
        SampleKey::new(MapName::parse("M1").expect("name"), sample)
    }

    #[test]
    fn no_tatoo_leaves_sample_unlinked() {
        let store = MemoryStore::new();
        let outcome =
            associate_sample(&store, &key("S1"), None, &mut ResolutionStrategy::FailFast)
                .expect("associate");
        assert_eq!(outcome, Association::Unlinked);
        assert_eq!(store.mutation_count().expect("count"), 0);
    }

    #[test]
    fn second_sample_with_same_tatoo_joins_the_individual() {
        let store = MemoryStore::new();
        let mut strategy = ResolutionStrategy::FailFast;
        let first = associate_sample(&store, &key("S1"), Some("T-9"), &mut strategy).expect("first");
        let second = associate_sample(&store, &key("S2"), Some("T-9"), &mut strategy).expect("second");
        assert_eq!(first, Association::Created(IndividualId(0)));
        assert_eq!(second, Association::Updated(IndividualId(0)));
        let individual = store
            .get_individual(IndividualId(0))
            .expect("get")
            .expect("present");
        assert_eq!(individual.samples, vec![key("S1"), key("S2")]);
    }

    fn two_individuals_sharing(store: &MemoryStore, tatoo: &str) {
        store
            .increment_counter(COUNTER_INDIVIDUALS, 2)
            .expect("advance");
        for id in 0..2 {
            store
                .insert_individual(&Individual {
                    id: IndividualId(id),
                    tatoos: vec![tatoo.to_string()],
                    samples: Vec::new(),
                })
                .expect("insert");
        }
    }

    #[test]
    fn ambiguous_tatoo_is_settled_by_the_decision() {
        let store = MemoryStore::new();
        two_individuals_sharing(&store, "T-1");

        let mut handler = |_: &ConflictPrompt| Decision::UseExisting(1);
        let reused = associate_sample(
            &store,
            &key("S1"),
            Some("T-1"),
            &mut ResolutionStrategy::Prompt(&mut handler),
        )
        .expect("reuse");
        assert_eq!(reused, Association::Updated(IndividualId(1)));
        let second = store
            .get_individual(IndividualId(1))
            .expect("get")
            .expect("present");
        assert_eq!(second.samples, vec![key("S1")]);

        let created = associate_sample(
            &store,
            &key("S2"),
            Some("T-1"),
            &mut ResolutionStrategy::AutoCreate,
        )
        .expect("create");
        assert_eq!(created, Association::Created(IndividualId(2)));
        let fresh = store
            .get_individual(IndividualId(2))
            .expect("get")
            .expect("present");
        assert_eq!(fresh.tatoos, vec!["T-1".to_string()]);
        assert_eq!(fresh.samples, vec![key("S2")]);
    }

    #[test]
    fn ambiguous_tatoo_abort_is_a_user_abort() {
        let store = MemoryStore::new();
        two_individuals_sharing(&store, "T-1");
        let mut handler = |prompt: &ConflictPrompt| {
            assert!(prompt.options.create_new);
            assert!(!prompt.options.always_create_new);
            Decision::Abort
        };
        let err = associate_sample(
            &store,
            &key("S1"),
            Some("T-1"),
            &mut ResolutionStrategy::Prompt(&mut handler),
        )
        .expect_err("abort");
        assert!(matches!(err, ImportError::UserAborted(_)));
    }

    #[test]
    fn deleting_unknown_individual_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            delete_individual(&store, IndividualId(42)),
            Err(ImportError::NotFound(_))
        ));
    }
}
