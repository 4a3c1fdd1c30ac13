//! High-level string operations over the shared heap.
//!
//! The manager owns the heap and the temporary descriptor pool, and exposes
//! the dialect's string primitives (concatenation, LEFT$/RIGHT$/MID$
//! slicing, INSTR search, relational comparison). Results are always fresh
//! allocations; sources are read into owned buffers before any allocation,
//! so a collection triggered mid-operation can never invalidate an operand.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};

use crate::error::BasicResult;

use super::heap::{GcPolicy, HeapStatistics, StrDesc, StringHeap, StringRootProvider, MAX_STR_LEN};
use super::temp::{TempStrPool, DEFAULT_TEMP_CAPACITY};

/// Tunables for the string subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StringConfig {
    pub heap_size: usize,
    pub gc_policy: GcPolicy,
    pub gc_threshold: f64,
    pub temp_capacity: usize,
}

impl Default for StringConfig {
    fn default() -> Self {
        StringConfig {
            heap_size: 8192,
            gc_policy: GcPolicy::OnDemand,
            gc_threshold: 0.2,
            temp_capacity: DEFAULT_TEMP_CAPACITY,
        }
    }
}

#[derive(Debug)]
pub struct StringManager {
    config: StringConfig,
    heap: Rc<RefCell<StringHeap>>,
    temp: Rc<RefCell<TempStrPool>>,
}

impl StringManager {
    pub fn new(config: StringConfig) -> Self {
        let mut heap = StringHeap::new(config.heap_size, config.gc_policy);
        heap.set_threshold(config.gc_threshold);
        let heap = Rc::new(RefCell::new(heap));
        let temp = Rc::new(RefCell::new(TempStrPool::new(config.temp_capacity)));
        let manager = StringManager { config, heap, temp };
        manager.register_temp_pool();
        manager
    }

    fn register_temp_pool(&self) {
        let provider: Rc<RefCell<dyn StringRootProvider>> = self.temp.clone();
        self.heap
            .borrow_mut()
            .add_root_provider(Rc::downgrade(&provider));
    }

    /// Shared handle to the underlying heap, for wiring storage components.
    pub fn heap(&self) -> Rc<RefCell<StringHeap>> {
        self.heap.clone()
    }

    /// Register an external root provider on the heap.
    pub fn register_provider(&self, provider: Weak<RefCell<dyn StringRootProvider>>) {
        self.heap.borrow_mut().add_root_provider(provider);
    }

    pub fn config(&self) -> &StringConfig {
        &self.config
    }

    // ---- creation ----

    pub fn create(&self, bytes: &[u8]) -> BasicResult<StrDesc> {
        self.heap.borrow_mut().alloc_copy(bytes)
    }

    pub fn create_str(&self, s: &str) -> BasicResult<StrDesc> {
        self.create(s.as_bytes())
    }

    // ---- reading ----

    pub fn bytes(&self, desc: &StrDesc) -> Vec<u8> {
        self.heap.borrow().bytes(desc).to_vec()
    }

    pub fn to_string(&self, desc: &StrDesc) -> String {
        self.heap.borrow().to_string(desc)
    }

    // ---- dialect primitives ----

    /// Concatenation; the combined length is limited to 255.
    pub fn concat(&self, left: &StrDesc, right: &StrDesc) -> BasicResult<StrDesc> {
        if left.len() + right.len() > MAX_STR_LEN {
            return Err(crate::error::BasicError::StringTooLong);
        }
        let mut buf = Vec::with_capacity(left.len() + right.len());
        {
            let heap = self.heap.borrow();
            buf.extend_from_slice(heap.bytes(left));
            buf.extend_from_slice(heap.bytes(right));
        }
        self.create(&buf)
    }

    /// Leftmost `count` bytes, clamped to the source length.
    pub fn left(&self, source: &StrDesc, count: usize) -> BasicResult<StrDesc> {
        let len = count.min(source.len());
        let buf = self.heap.borrow().bytes(source)[..len].to_vec();
        self.create(&buf)
    }

    /// Rightmost `count` bytes, clamped to the source length.
    pub fn right(&self, source: &StrDesc, count: usize) -> BasicResult<StrDesc> {
        let len = count.min(source.len());
        let buf = {
            let heap = self.heap.borrow();
            let bytes = heap.bytes(source);
            bytes[bytes.len() - len..].to_vec()
        };
        self.create(&buf)
    }

    /// Substring from 1-based `start1`; `count` of `None` runs to the end.
    /// A start before 1 or past the end yields the empty string.
    pub fn mid(&self, source: &StrDesc, start1: usize, count: Option<usize>) -> BasicResult<StrDesc> {
        if start1 < 1 || start1 > source.len() {
            return Ok(StrDesc::empty());
        }
        let start0 = start1 - 1;
        let remain = source.len() - start0;
        let len = count.map_or(remain, |c| c.min(remain));
        if len == 0 {
            return Ok(StrDesc::empty());
        }
        let buf = self.heap.borrow().bytes(source)[start0..start0 + len].to_vec();
        self.create(&buf)
    }

    /// 1-based position of `needle` in `source` at or after `start1`, 0 when
    /// absent.
    pub fn instr(&self, source: &StrDesc, needle: &StrDesc, start1: usize) -> usize {
        if needle.is_empty() || source.is_empty() || start1 < 1 || start1 > source.len() {
            return 0;
        }
        let heap = self.heap.borrow();
        let hay = heap.bytes(source);
        let pat = heap.bytes(needle);
        let start0 = start1 - 1;
        match memchr::memmem::find(&hay[start0..], pat) {
            Some(offset) => start0 + offset + 1,
            None => 0,
        }
    }

    /// Unsigned byte-wise lexicographic comparison; an equal prefix orders
    /// the shorter string first.
    pub fn compare(&self, left: &StrDesc, right: &StrDesc) -> Ordering {
        let heap = self.heap.borrow();
        heap.bytes(left).cmp(heap.bytes(right))
    }

    // ---- temporary descriptors ----

    /// Root an existing descriptor in the temp pool.
    pub fn hold_temp(&self, desc: &StrDesc) -> BasicResult<()> {
        self.temp.borrow_mut().hold(desc.clone())
    }

    /// Copy a string and root the copy in the temp pool.
    pub fn push_temp_copy(&self, source: &StrDesc) -> BasicResult<StrDesc> {
        let buf = self.bytes(source);
        let desc = self.create(&buf)?;
        self.hold_temp(&desc)?;
        Ok(desc)
    }

    pub fn clear_temp(&self) {
        self.temp.borrow_mut().clear();
    }

    pub fn temp_len(&self) -> usize {
        self.temp.borrow().len()
    }

    // ---- collection and diagnostics ----

    pub fn collect_garbage(&self) -> usize {
        self.heap.borrow_mut().collect_garbage()
    }

    pub fn protect(&self, desc: &StrDesc) {
        self.heap.borrow_mut().protect(desc);
    }

    pub fn clear_protected(&self) {
        self.heap.borrow_mut().clear_protected();
    }

    pub fn free_bytes(&self) -> usize {
        self.heap.borrow().free_bytes()
    }

    pub fn used_bytes(&self) -> usize {
        self.heap.borrow().used_bytes()
    }

    pub fn total_bytes(&self) -> usize {
        self.heap.borrow().total_bytes()
    }

    pub fn fragmentation(&self) -> f64 {
        self.heap.borrow().fragmentation()
    }

    pub fn statistics(&self) -> HeapStatistics {
        self.heap.borrow().statistics()
    }

    pub fn validate(&self) -> bool {
        self.heap.borrow().validate_integrity()
    }

    /// Empty the heap and the temp pool. Provider registrations are dropped
    /// by the heap reset; the temp pool re-registers itself, callers owning
    /// other providers must do the same.
    pub fn reset(&self) {
        self.temp.borrow_mut().clear();
        self.heap.borrow_mut().reset();
        self.register_temp_pool();
    }
}

/// Scope guard that clears the temp pool on exit, bounding the lifetime of
/// expression intermediates to one composite operation.
#[derive(Debug)]
pub struct TempScope<'a> {
    manager: &'a StringManager,
}

impl<'a> TempScope<'a> {
    pub fn new(manager: &'a StringManager) -> Self {
        TempScope { manager }
    }

    pub fn hold(&self, desc: &StrDesc) -> BasicResult<()> {
        self.manager.hold_temp(desc)
    }

    pub fn push_copy(&self, source: &StrDesc) -> BasicResult<StrDesc> {
        self.manager.push_temp_copy(source)
    }
}

impl Drop for TempScope<'_> {
    fn drop(&mut self) {
        self.manager.clear_temp();
    }
}
