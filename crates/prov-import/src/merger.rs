//! Import merge
//!
//! Turns an [`ImportPlan`] into one [`ChangeSet`] and commits it. Payloads of
//! new nodes are loaded before anything is committed, so a corrupt payload
//! leaves the store untouched.
//!
//! Archive links are committed with [`LinkValidation::Structural`]: the
//! producer already enforced its link-kind rules.

use crate::error::ImportResult;
use crate::plan::{ImportPlan, ImportSummary};
use prov_archive::{ArchiveResult, NodeRecord};
use prov_model::Repository;
use prov_store::{ChangeSet, LinkValidation, Store};

/// Applies import plans to a store
pub struct ImportMerger<'s, S: Store + ?Sized> {
    store: &'s S,
}

impl<'s, S: Store + ?Sized> ImportMerger<'s, S> {
    /// Merger writing into `store`
    #[inline]
    #[must_use]
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Create everything the plan marks as new, atomically
    ///
    /// `load` supplies the payload repository of each new node.
    ///
    /// # Errors
    /// Payload loading and store commit failures; on error nothing from the
    /// plan is visible in the store
    pub fn apply<F>(&self, plan: ImportPlan, mut load: F) -> ImportResult<ImportSummary>
    where
        F: FnMut(&NodeRecord) -> ArchiveResult<Repository>,
    {
        let summary = plan.summary();
        if plan.is_noop() {
            tracing::debug!("Nothing to merge; every record is already stored");
            return Ok(summary);
        }

        let mut changes = ChangeSet::new().with_link_validation(LinkValidation::Structural);
        changes.users = plan.users.into_iter().filter_map(|r| r.into_new()).collect();
        changes.computers = plan.computers.into_iter().filter_map(|r| r.into_new()).collect();
        for record in plan.nodes.into_iter().filter_map(|r| r.into_new()) {
            let repository = load(&record)?;
            changes.add_node(record.into_new_node(repository));
        }
        changes.links = plan.links.into_iter().filter_map(|r| r.into_new()).collect();
        changes.groups = plan.groups.into_iter().filter_map(|r| r.into_new()).collect();
        changes.memberships = plan
            .memberships
            .into_iter()
            .filter_map(|r| r.into_new())
            .collect();

        tracing::debug!("Committing {} changes", changes.len());
        self.store.commit(changes)?;
        Ok(summary)
    }
}
