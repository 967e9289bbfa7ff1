use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Allocator of small numeric ids.
///
/// Released ids are handed out again before fresh ones, lowest first, so the
/// ids in use stay dense.
#[derive(Debug, Default)]
pub struct IdPool {
    next: u64,
    free: BinaryHeap<Reverse<u64>>,
}

impl IdPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id.
    pub fn get(&mut self) -> u64 {
        if let Some(Reverse(id)) = self.free.pop() {
            return id;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    /// Return an id to the pool. The id must currently be allocated.
    pub fn put(&mut self, id: u64) {
        debug_assert!(id < self.next, "id {id} was never allocated");
        self.free.push(Reverse(id));
    }

    #[cfg(test)]
    fn in_use(&self) -> usize {
        self.next as usize - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_count_up() {
        let mut pool = IdPool::new();
        assert_eq!(pool.get(), 0);
        assert_eq!(pool.get(), 1);
        assert_eq!(pool.get(), 2);
        assert_eq!(pool.in_use(), 3);
    }

    #[test]
    fn lowest_released_id_is_reused_first() {
        let mut pool = IdPool::new();
        for _ in 0..5 {
            pool.get();
        }
        pool.put(3);
        pool.put(1);
        assert_eq!(pool.in_use(), 3);
        assert_eq!(pool.get(), 1);
        assert_eq!(pool.get(), 3);
        assert_eq!(pool.get(), 5);
    }
}
