//! Lock helpers.
//!
//! Every lock in the crate guards plain bookkeeping that stays consistent
//! between statements, so a poisoned lock is recovered rather than propagated.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

fn recover<G>(poisoned: PoisonError<G>, lock_kind: &'static str) -> G {
    warn!(
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned cache lock; a listener or caller panicked while holding it"
    );
    poisoned.into_inner()
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| recover(poisoned, "mutex.lock"))
}

pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read()
        .unwrap_or_else(|poisoned| recover(poisoned, "rwlock.read"))
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write()
        .unwrap_or_else(|poisoned| recover(poisoned, "rwlock.write"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_poisoned_mutex_is_recovered() {
        let shared = Arc::new(Mutex::new(vec![1]));
        let poisoner = shared.clone();
        let result = thread::spawn(move || {
            let mut guard = poisoner.lock().unwrap();
            guard.push(2);
            panic!("poison the lock");
        })
        .join();

        assert!(result.is_err());
        assert!(shared.is_poisoned());
        assert_eq!(*lock(&shared), vec![1, 2]);
    }

    #[test]
    fn test_poisoned_rwlock_is_recovered() {
        let shared = Arc::new(RwLock::new(0));
        let poisoner = shared.clone();
        let _ = thread::spawn(move || {
            let mut guard = poisoner.write().unwrap();
            *guard = 5;
            panic!("poison the lock");
        })
        .join();

        assert!(shared.is_poisoned());
        *write(&shared) += 1;
        assert_eq!(*read(&shared), 6);
    }
}
