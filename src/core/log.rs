use crate::core::record::RawQueryRecord;
use crate::core::task_ctx;
use parking_lot::RwLock;
use std::sync::Arc;

/// Shared, append-only query log written by the database layer.
///
/// Readers never own the log: a unit of work reads the suffix that starts at
/// the offset it recorded when it began. Writes made on a task that carries a
/// request log (see [`crate::core::task_ctx`]) are copied there too, so
/// concurrent requests never read each other's queries.
#[derive(Clone, Default)]
pub struct QueryLog(Arc<RwLock<Vec<RawQueryRecord>>>);

impl QueryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: RawQueryRecord) {
        task_ctx::mark(self, &record);
        self.append(record);
    }

    pub(crate) fn append(&self, record: RawQueryRecord) {
        self.0.write().push(record);
    }

    pub(crate) fn same_as(&self, other: &QueryLog) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Records in `[offset, len)`. An offset past the end yields nothing.
    pub fn since(&self, offset: usize) -> Vec<RawQueryRecord> {
        let log = self.0.read();
        log.get(offset..).map(<[_]>::to_vec).unwrap_or_default()
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }
}
