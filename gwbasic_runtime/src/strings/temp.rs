//! Bounded pool of temporary string descriptors.
//!
//! Expression evaluation parks every intermediate string result here so the
//! collector sees it as live until the enclosing statement finishes. The
//! pool is deliberately small; blowing through it is the dialect's "String
//! formula too complex" condition, not a memory leak.

use crate::error::{BasicError, BasicResult};

use super::heap::{StrDesc, StringRootProvider};

pub const DEFAULT_TEMP_CAPACITY: usize = 32;

#[derive(Debug)]
pub struct TempStrPool {
    items: Vec<StrDesc>,
    capacity: usize,
}

impl TempStrPool {
    pub fn new(capacity: usize) -> Self {
        TempStrPool {
            items: Vec::with_capacity(capacity.min(DEFAULT_TEMP_CAPACITY)),
            capacity,
        }
    }

    /// Keep a descriptor alive until the pool is cleared.
    pub fn hold(&mut self, desc: StrDesc) -> BasicResult<()> {
        if self.items.len() >= self.capacity {
            return Err(BasicError::StringFormulaTooComplex);
        }
        self.items.push(desc);
        Ok(())
    }

    /// Release every slot. The heap bytes are reclaimed at the next
    /// collection, not here.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl StringRootProvider for TempStrPool {
    fn collect_string_roots(&self, roots: &mut Vec<StrDesc>) {
        roots.extend(self.items.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_capacity_enforced() {
        let mut pool = TempStrPool::new(2);
        pool.hold(StrDesc::empty()).unwrap();
        pool.hold(StrDesc::empty()).unwrap();
        assert_eq!(
            pool.hold(StrDesc::empty()),
            Err(BasicError::StringFormulaTooComplex)
        );
        pool.clear();
        assert!(pool.is_empty());
    }
}
