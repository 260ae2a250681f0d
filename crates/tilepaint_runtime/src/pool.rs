//! Free list of scratch collider records reused across reduction passes

use tilepaint_core::{ContentHandle, TileCollider};

/// Collider facts gathered for one tile during a reduction pass
#[derive(Debug, Clone, Default)]
pub struct ColliderInfo {
    pub row: u32,
    pub column: u32,
    pub collider: Option<TileCollider>,
    /// Derived from the tile's solid flag rather than a real collider
    pub hypothetical: bool,
    /// Content carrying the real collider
    pub content: Option<ContentHandle>,
    pub merged: bool,
}

impl ColliderInfo {
    fn reset(&mut self) {
        self.row = 0;
        self.column = 0;
        self.collider = None;
        self.hypothetical = false;
        self.content = None;
        self.merged = false;
    }
}

#[derive(Debug, Default)]
pub struct ColliderInfoPool {
    free: Vec<ColliderInfo>,
    outstanding: usize,
}

impl ColliderInfoPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> ColliderInfo {
        self.outstanding += 1;
        self.free.pop().unwrap_or_default()
    }

    pub fn despawn(&mut self, mut info: ColliderInfo) {
        info.reset();
        self.outstanding = self.outstanding.saturating_sub(1);
        self.free.push(info);
    }

    /// Records spawned and not yet returned
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Borrow records for one pass; all of them return to the pool on drop
    pub fn scope(&mut self) -> PoolScope<'_> {
        PoolScope {
            pool: self,
            held: Vec::new(),
        }
    }
}

pub struct PoolScope<'p> {
    pool: &'p mut ColliderInfoPool,
    held: Vec<ColliderInfo>,
}

impl PoolScope<'_> {
    /// Spawn a record and return its index within the scope
    pub fn spawn(&mut self) -> usize {
        let info = self.pool.spawn();
        self.held.push(info);
        self.held.len() - 1
    }

    pub fn get(&self, index: usize) -> &ColliderInfo {
        &self.held[index]
    }

    pub fn get_mut(&mut self, index: usize) -> &mut ColliderInfo {
        &mut self.held[index]
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }
}

impl Drop for PoolScope<'_> {
    fn drop(&mut self) {
        for info in self.held.drain(..) {
            self.pool.despawn(info);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_returns_records() {
        let mut pool = ColliderInfoPool::new();
        {
            let mut scope = pool.scope();
            let a = scope.spawn();
            let b = scope.spawn();
            scope.get_mut(a).merged = true;
            scope.get_mut(b).row = 4;
            assert_eq!(scope.len(), 2);
        }
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.free_count(), 2);

        // Recycled records come back reset
        let mut scope = pool.scope();
        let index = scope.spawn();
        assert!(!scope.get(index).merged);
        assert_eq!(scope.get(index).row, 0);
        drop(scope);
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_early_exit_still_releases() {
        fn pass(pool: &mut ColliderInfoPool, bail: bool) -> Option<()> {
            let mut scope = pool.scope();
            scope.spawn();
            if bail {
                return None;
            }
            scope.spawn();
            Some(())
        }

        let mut pool = ColliderInfoPool::new();
        assert!(pass(&mut pool, true).is_none());
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.free_count(), 1);
    }
}
