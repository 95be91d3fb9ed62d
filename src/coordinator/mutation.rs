use crate::fragment::{Fragment, FragmentResult, Operation, PartialRecord};

/// A write that can be undone with a snapshot of the song director taken before it.
pub(super) enum Mutation<'a> {
    Remove,
    Update(&'a PartialRecord),
}

impl Mutation<'_> {
    pub(super) fn operation(&self) -> Operation {
        match self {
            Mutation::Remove => Operation::RemoveById,
            Mutation::Update(_) => Operation::Update,
        }
    }

    pub(super) fn undo_operation(&self) -> Operation {
        match self {
            Mutation::Remove => Operation::RollbackRemove,
            Mutation::Update(_) => Operation::Update,
        }
    }

    pub(super) async fn apply(&self, fragment: &dyn Fragment, id: &str) -> FragmentResult<()> {
        match self {
            Mutation::Remove => fragment.try_remove_by_id(id).await,
            Mutation::Update(record) => fragment.try_update(record).await,
        }
    }

    /// Writes the snapshot back: removed records are restored, updated ones get
    /// their previous values.
    pub(super) async fn undo(
        &self,
        fragment: &dyn Fragment,
        snapshot: &PartialRecord,
    ) -> FragmentResult<()> {
        match self {
            Mutation::Remove => fragment.try_rollback_remove(snapshot).await,
            Mutation::Update(_) => fragment.try_update(snapshot).await,
        }
    }
}
