use std::collections::BTreeSet;

use sandworm_domain::WorkerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// A busy worker went back to the idle set.
    Returned,
    /// The worker was already idle; nothing changed.
    AlreadyIdle,
    /// The worker was never configured. It is added to the idle set anyway.
    Adopted,
}

/// 工作节点池：空闲与忙碌两个集合
///
/// 每个节点至多属于其中一个集合。`take` 总是取出标识最小的空闲节点，保证调度顺序可复现。
#[derive(Debug, Default)]
pub struct WorkerPool {
    idle: BTreeSet<WorkerId>,
    busy: BTreeSet<WorkerId>,
}

impl WorkerPool {
    pub fn new(workers: impl IntoIterator<Item = WorkerId>) -> Self {
        Self {
            idle: workers.into_iter().collect(),
            busy: BTreeSet::new(),
        }
    }

    /// 取出一个空闲节点并标记为忙碌
    pub fn take(&mut self) -> Option<WorkerId> {
        let worker = self.idle.pop_first()?;
        self.busy.insert(worker.clone());
        Some(worker)
    }

    pub fn release(&mut self, worker: WorkerId) -> ReleaseOutcome {
        if self.idle.contains(&worker) {
            return ReleaseOutcome::AlreadyIdle;
        }
        let outcome = if self.busy.remove(&worker) {
            ReleaseOutcome::Returned
        } else {
            ReleaseOutcome::Adopted
        };
        self.idle.insert(worker);
        outcome
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    pub fn busy_count(&self) -> usize {
        self.busy.len()
    }

    pub fn idle(&self) -> Vec<WorkerId> {
        self.idle.iter().cloned().collect()
    }

    pub fn busy(&self) -> Vec<WorkerId> {
        self.busy.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(ids: &[&str]) -> WorkerPool {
        WorkerPool::new(ids.iter().map(|id| WorkerId::from(*id)))
    }

    #[test]
    fn test_take_picks_lowest_and_marks_busy() {
        let mut pool = pool(&["w3", "w1", "w2"]);

        assert_eq!(pool.take(), Some(WorkerId::from("w1")));
        assert_eq!(pool.take(), Some(WorkerId::from("w2")));
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.busy_count(), 2);

        assert_eq!(pool.take(), Some(WorkerId::from("w3")));
        assert!(pool.is_empty());
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn test_duplicate_configuration_collapses() {
        let pool = pool(&["w1", "w1", "w2"]);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn test_release_outcomes() {
        let mut pool = pool(&["w1", "w2"]);
        let taken = pool.take().unwrap();

        assert_eq!(pool.release(taken.clone()), ReleaseOutcome::Returned);
        assert_eq!(pool.release(taken), ReleaseOutcome::AlreadyIdle);
        assert_eq!(pool.idle_count(), 2);

        assert_eq!(pool.release(WorkerId::from("w9")), ReleaseOutcome::Adopted);
        assert_eq!(pool.idle(), vec![
            WorkerId::from("w1"),
            WorkerId::from("w2"),
            WorkerId::from("w9"),
        ]);
        assert_eq!(pool.busy_count(), 0);
    }

    #[test]
    fn test_idle_plus_busy_is_conserved() {
        let mut pool = pool(&["w1", "w2", "w3"]);
        let a = pool.take().unwrap();
        let _b = pool.take().unwrap();
        assert_eq!(pool.idle_count() + pool.busy_count(), 3);

        pool.release(a);
        assert_eq!(pool.idle_count() + pool.busy_count(), 3);
        assert_eq!(pool.busy(), vec![WorkerId::from("w2")]);
    }
}
