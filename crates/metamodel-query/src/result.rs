//! Row cursors over executed selects.

use metamodel_core::{Connector, Object, Result, StatementHandle, Storable, Transaction};

/// Closes a statement handle when dropped.
pub(crate) struct HandleGuard<'t, C: Connector> {
    tx: &'t Transaction<C>,
    handle: StatementHandle,
}

impl<'t, C: Connector> HandleGuard<'t, C> {
    pub(crate) fn new(tx: &'t Transaction<C>, handle: StatementHandle) -> Self {
        Self { tx, handle }
    }

    pub(crate) fn handle(&self) -> StatementHandle {
        self.handle
    }
}

impl<C: Connector> Drop for HandleGuard<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.tx.close_statement(self.handle) {
            tracing::debug!(id = self.handle.id(), error = %e, "Statement was already closed");
        }
    }
}

/// Lazy cursor binding each row into the storable it was selected for.
///
/// The statement is prepared and executed by the first [`fetch_next`]; the
/// handle is closed when the cursor is dropped.
///
/// [`fetch_next`]: ResultSet::fetch_next
pub struct ResultSet<'s, 't, T: Object, C: Connector> {
    guard: HandleGuard<'t, C>,
    storable: &'s mut Storable<T>,
}

impl<'s, 't, T: Object, C: Connector> ResultSet<'s, 't, T, C> {
    pub(crate) fn new(guard: HandleGuard<'t, C>, storable: &'s mut Storable<T>) -> Self {
        Self { guard, storable }
    }

    pub fn handle(&self) -> StatementHandle {
        self.guard.handle()
    }

    /// Bind the next row into the record; `false` once rows are exhausted.
    pub fn fetch_next(&mut self) -> Result<bool> {
        let (record, meta) = self.storable.parts_mut();
        self.guard.tx.fetch_next(self.guard.handle, record, meta)
    }

    /// The record holding the most recently fetched row.
    pub fn current(&self) -> &T {
        self.storable.record()
    }

    /// Fetch every remaining row, cloning the record after each one.
    pub fn fetch_all(mut self) -> Result<Vec<T>>
    where
        T: Clone,
    {
        let mut rows = Vec::new();
        while self.fetch_next()? {
            rows.push(self.current().clone());
        }
        Ok(rows)
    }
}

impl<T: Object, C: Connector> std::fmt::Debug for ResultSet<'_, '_, T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultSet")
            .field("handle", &self.guard.handle)
            .field("object", &self.storable.meta().name())
            .finish()
    }
}
