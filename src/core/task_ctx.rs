use crate::core::log::QueryLog;
use crate::core::record::RawQueryRecord;
use std::future::Future;
use tokio::task_local;

task_local! {
    /// The log of the request (or wrapped unit of work) running on this task.
    pub static REQUEST_LOG: QueryLog;
}

/// The log scoped to the current task, if any.
pub fn current_log() -> Option<QueryLog> {
    REQUEST_LOG.try_with(QueryLog::clone).ok()
}

/// Appends to the task's request log unless `origin` already is that log.
pub(crate) fn mark(origin: &QueryLog, record: &RawQueryRecord) {
    let _ = REQUEST_LOG.try_with(|log| {
        if !log.same_as(origin) {
            log.append(record.clone());
        }
    });
}

/// Runs `fut` with `log` as the task's request log.
pub async fn scope<F: Future>(log: QueryLog, fut: F) -> F::Output {
    REQUEST_LOG.scope(log, fut).await
}

/// Runs `f` on the current thread with `log` as the request log.
pub fn sync_scope<R>(log: QueryLog, f: impl FnOnce() -> R) -> R {
    REQUEST_LOG.sync_scope(log, f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_scope_no_log() {
        assert!(current_log().is_none());
        // outside any scope writes only reach the shared log
        let shared = QueryLog::new();
        shared.push(RawQueryRecord::new("SELECT 1", 0.1));
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_sync_scope_mirrors_writes() {
        let shared = QueryLog::new();
        let request = QueryLog::new();
        sync_scope(request.clone(), || {
            shared.push(RawQueryRecord::new("SELECT 1", 0.1));
            request.push(RawQueryRecord::new("SELECT 2", 0.1));
            assert!(current_log().is_some());
        });
        shared.push(RawQueryRecord::new("SELECT 3", 0.1));

        assert_eq!(shared.len(), 2);
        // the direct write is not counted twice
        assert_eq!(request.len(), 2);
    }

    #[tokio::test]
    async fn test_scopes_are_per_task() {
        let shared = QueryLog::new();
        let (a, b) = (QueryLog::new(), QueryLog::new());

        let first = {
            let shared = shared.clone();
            scope(a.clone(), async move {
                shared.push(RawQueryRecord::new("SELECT a", 0.1));
                tokio::task::yield_now().await;
                shared.push(RawQueryRecord::new("SELECT a", 0.1));
            })
        };
        let second = {
            let shared = shared.clone();
            scope(b.clone(), async move {
                shared.push(RawQueryRecord::new("SELECT b", 0.1));
            })
        };
        tokio::join!(first, second);

        assert_eq!(shared.len(), 3);
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert!(a.since(0).iter().all(|r| r.sql.as_deref() == Some("SELECT a")));
    }
}
