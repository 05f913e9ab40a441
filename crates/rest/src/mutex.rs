//! Client-specified mutexes.
//!
//! Clients lacking access to database transactions may serialise their own
//! requests by sending an `X-Mutex-Name` header. A single coordinator task
//! owns the lock table and serves lock/unlock requests over channels; on
//! release one arbitrary waiter is granted. This is a convenience for
//! clients, not a correctness mechanism.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

enum BrokerMessage {
    Lock {
        name: String,
        grant: oneshot::Sender<Uuid>,
    },
    Unlock {
        name: String,
        lock_id: Uuid,
    },
}

/// Handle to the coordinator task.
#[derive(Clone)]
pub struct MutexBroker {
    tx: mpsc::UnboundedSender<BrokerMessage>,
}

/// A held lock; release it with [`MutexBroker::unlock`].
pub struct LockGuard {
    name: String,
    lock_id: Uuid,
}

impl MutexBroker {
    /// Starts the coordinator task and returns its handle.
    pub fn spawn() -> MutexBroker {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            // mutex name -> waiters (the current holder stays listed with
            // its grant consumed)
            let mut mutexes: HashMap<String, Vec<(Uuid, Option<oneshot::Sender<Uuid>>)>> =
                HashMap::new();

            while let Some(message) = rx.recv().await {
                match message {
                    BrokerMessage::Lock { name, grant } => {
                        let lock_id = Uuid::new_v4();
                        let waiters = mutexes.entry(name.clone()).or_default();
                        if waiters.is_empty() {
                            tracing::debug!(mutex = %name, %lock_id, "lock granted");
                            let _ = grant.send(lock_id);
                            waiters.push((lock_id, None));
                        } else {
                            tracing::debug!(mutex = %name, %lock_id, "lock queued");
                            waiters.push((lock_id, Some(grant)));
                        }
                    }
                    BrokerMessage::Unlock { name, lock_id } => {
                        let Some(waiters) = mutexes.get_mut(&name) else {
                            tracing::warn!(mutex = %name, "unlock for unknown mutex");
                            continue;
                        };
                        waiters.retain(|(id, _)| *id != lock_id);
                        // grant the next waiter, if any
                        if let Some((next_id, grant)) =
                            waiters.iter_mut().find(|(_, g)| g.is_some())
                        {
                            tracing::debug!(mutex = %name, lock_id = %next_id, "lock released, waking waiter");
                            if let Some(grant) = grant.take() {
                                let _ = grant.send(*next_id);
                            }
                        } else if waiters.is_empty() {
                            tracing::debug!(mutex = %name, "lock released and freed");
                            mutexes.remove(&name);
                        }
                    }
                }
            }
        });
        MutexBroker { tx }
    }

    /// Acquires the named mutex, waiting until granted.
    pub async fn lock(&self, name: &str) -> LockGuard {
        let (grant_tx, grant_rx) = oneshot::channel();
        let _ = self.tx.send(BrokerMessage::Lock {
            name: name.to_string(),
            grant: grant_tx,
        });
        let lock_id = grant_rx.await.expect("mutex broker task is alive");
        LockGuard {
            name: name.to_string(),
            lock_id,
        }
    }

    /// Releases a held mutex.
    pub fn unlock(&self, guard: LockGuard) {
        let _ = self.tx.send(BrokerMessage::Unlock {
            name: guard.name,
            lock_id: guard.lock_id,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn grants_immediately_when_free() {
        let broker = MutexBroker::spawn();
        let guard = broker.lock("m1").await;
        broker.unlock(guard);
    }

    #[tokio::test]
    async fn serialises_competing_holders() {
        let broker = MutexBroker::spawn();
        let concurrent = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let broker = broker.clone();
            let concurrent = concurrent.clone();
            tasks.push(tokio::spawn(async move {
                let guard = broker.lock("shared").await;
                let now = concurrent.fetch_add(1, Ordering::SeqCst);
                assert_eq!(now, 0, "two holders inside the mutex");
                tokio::task::yield_now().await;
                concurrent.fetch_sub(1, Ordering::SeqCst);
                broker.unlock(guard);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
    }

    #[tokio::test]
    async fn distinct_names_do_not_contend() {
        let broker = MutexBroker::spawn();
        let a = broker.lock("a").await;
        // must not block even while "a" is held
        let b = broker.lock("b").await;
        broker.unlock(a);
        broker.unlock(b);
    }
}
