use crate::{
    db::{
        query::predicate::{FieldPresence, Row},
        store::{DataRow, MemoryStore, Table},
    },
    model::EntityModel,
    value::Value,
};

///
/// BoundRow
///
/// A stored row bound to its entity model and store, so dotted field paths
/// can resolve one reference hop during evaluation.
///

#[derive(Clone, Copy)]
pub(crate) struct BoundRow<'a> {
    store: &'a MemoryStore,
    model: &'static EntityModel,
    row: &'a DataRow,
}

impl<'a> BoundRow<'a> {
    pub(crate) const fn new(
        store: &'a MemoryStore,
        model: &'static EntityModel,
        row: &'a DataRow,
    ) -> Self {
        Self { store, model, row }
    }

    pub(crate) fn key(&self) -> Value {
        self.local(self.model.primary_key).into_value()
    }

    /// Follow a reference field into `target`; `None` when the reference is
    /// null or does not resolve.
    pub(crate) fn follow(&self, field: &str, target: &'a Table) -> Option<Self> {
        let FieldPresence::Present(key) = self.local(field) else {
            return None;
        };
        let row = target.get(&key)?;

        Some(Self::new(self.store, target.model(), row))
    }

    fn local(&self, field: &str) -> FieldPresence {
        self.model
            .field_slot(field)
            .and_then(|slot| self.row.get(slot))
            .map_or(FieldPresence::Missing, |value| {
                FieldPresence::Present(value.clone())
            })
    }
}

impl Row for BoundRow<'_> {
    fn field(&self, path: &str) -> FieldPresence {
        let Some((head, tail)) = path.split_once('.') else {
            return self.local(path);
        };

        let Some(target) = self
            .model
            .field(head)
            .and_then(|field| field.kind.ref_target())
            .and_then(|target| self.store.table_by_path(target).ok())
        else {
            return FieldPresence::Missing;
        };

        self.follow(head, target)
            .map_or(FieldPresence::Missing, |row| row.local(tail))
    }
}
