//! # Job Comparison
//!
//! Decides whether an observed Job was built from the same specification as
//! the candidate Job for the current Migration.
//!
//! The comparison uses a content hash of the rendered pod template, stored in
//! the `spec-hash` annotation when the Job is built. The API server fills in
//! defaults on stored pod templates, so a structural comparison against the
//! observed Job would report drift that never happened.
//!
//! `SpecHashComparator` is the only comparator used by the reconciler.

use crate::crd::SPEC_HASH_ANNOTATION;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::PodTemplateSpec;
use sha2::{Digest, Sha256};

/// Compute the content hash of a pod template
///
/// Hashes the JSON serialization of the template. Field order is fixed by the
/// type definitions and every list the builder emits has a stable order, so
/// equal templates always produce equal hashes.
pub fn spec_hash(template: &PodTemplateSpec) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(template)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Equivalence check between the candidate Job and an observed Job
pub trait JobComparator: Send + Sync + std::fmt::Debug {
    /// `true` when `observed` was built from a spec equivalent to `candidate`
    fn equivalent(&self, candidate: &Job, observed: &Job) -> bool;
}

/// Compares the `spec-hash` annotations of both Jobs
///
/// A missing marker on either side is never equivalent.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpecHashComparator;

impl SpecHashComparator {
    /// Read the spec hash marker of a Job
    #[must_use]
    pub fn marker(job: &Job) -> Option<&str> {
        job.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(SPEC_HASH_ANNOTATION))
            .map(String::as_str)
            .filter(|hash| !hash.is_empty())
    }
}

impl JobComparator for SpecHashComparator {
    fn equivalent(&self, candidate: &Job, observed: &Job) -> bool {
        match (Self::marker(candidate), Self::marker(observed)) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::job::JobBuilder;
    use crate::controller::reconciler::view::tests::sample_migration;
    use crate::controller::reconciler::view::MigrationView;
    use std::collections::BTreeMap;

    fn build(migration: &crate::crd::Migration) -> Job {
        let view = MigrationView::parse(migration).unwrap();
        JobBuilder::new("flyway:default").build(&view).unwrap()
    }

    #[test]
    fn test_job_is_equivalent_to_itself() {
        let job = build(&sample_migration());
        assert!(SpecHashComparator.equivalent(&job, &job));
    }

    #[test]
    fn test_rebuild_from_same_spec_is_equivalent() {
        let first = build(&sample_migration());
        let second = build(&sample_migration());
        assert!(SpecHashComparator.equivalent(&first, &second));
    }

    #[test]
    fn test_generation_alone_does_not_diverge() {
        let first = build(&sample_migration());
        let mut bumped = sample_migration();
        bumped.metadata.generation = Some(9);
        let second = build(&bumped);
        assert!(SpecHashComparator.equivalent(&first, &second));
    }

    #[test]
    fn test_image_change_diverges() {
        let first = build(&sample_migration());
        let mut changed = sample_migration();
        changed.spec.migration_source.image_ref = "registry.local/orders-sql:2.0.0".to_string();
        assert!(!SpecHashComparator.equivalent(&build(&changed), &first));
    }

    #[test]
    fn test_non_image_fields_diverge() {
        let base = build(&sample_migration());

        let mut args = sample_migration();
        args.spec.flyway_configuration.commands = vec!["repair".to_string()];
        assert!(!SpecHashComparator.equivalent(&build(&args), &base));

        let mut placeholders = sample_migration();
        placeholders.spec.migration_source.placeholders =
            BTreeMap::from([("tenant".to_string(), "a".to_string())]);
        assert!(!SpecHashComparator.equivalent(&build(&placeholders), &base));

        let mut url = sample_migration();
        url.spec.database.jdbc_url = "jdbc:postgresql://replica:5432/orders".to_string();
        assert!(!SpecHashComparator.equivalent(&build(&url), &base));
    }

    #[test]
    fn test_placeholder_insertion_order_is_irrelevant() {
        let mut a = sample_migration();
        a.spec.migration_source.placeholders.insert("b".to_string(), "2".to_string());
        a.spec.migration_source.placeholders.insert("a".to_string(), "1".to_string());
        let mut b = sample_migration();
        b.spec.migration_source.placeholders.insert("a".to_string(), "1".to_string());
        b.spec.migration_source.placeholders.insert("b".to_string(), "2".to_string());
        assert!(SpecHashComparator.equivalent(&build(&a), &build(&b)));
    }

    #[test]
    fn test_missing_marker_is_divergent() {
        let candidate = build(&sample_migration());
        let mut observed = candidate.clone();
        observed.metadata.annotations = None;
        assert!(!SpecHashComparator.equivalent(&candidate, &observed));
        assert!(!SpecHashComparator.equivalent(&observed, &candidate));
    }
}
