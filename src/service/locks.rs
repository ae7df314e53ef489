use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Upper bound on employees with a live lock entry
const MAX_TRACKED_EMPLOYEES: u64 = 100_000;

/// Per-employee async locks serializing the read-check-write sequence of
/// check-in/check-out. Entries expire once idle.
#[derive(Clone)]
pub struct EmployeeLocks {
    locks: Cache<u64, Arc<Mutex<()>>>,
}

impl EmployeeLocks {
    pub fn new(idle: Duration) -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(MAX_TRACKED_EMPLOYEES)
                .time_to_idle(idle)
                .build(),
        }
    }

    pub async fn acquire(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(employee_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn same_employee_shares_a_lock() {
        let locks = EmployeeLocks::new(Duration::from_secs(60));
        let guard = locks.acquire(7).await;

        let cached = locks.locks.get(&7).await.unwrap();
        assert!(cached.try_lock().is_err());

        drop(guard);
        assert!(cached.try_lock().is_ok());
    }

    #[actix_web::test]
    async fn different_employees_do_not_block() {
        let locks = EmployeeLocks::new(Duration::from_secs(60));
        let _a = locks.acquire(1).await;
        let _b = locks.acquire(2).await;
    }
}
