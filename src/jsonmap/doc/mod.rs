//! Ephemeral JSON document tree.
//!
//! Every node and string copy lives in memory acquired from the active
//! strategy; nothing here touches the global allocator. The tree is built
//! either by the parser or from a schema, consumed once, and torn down
//! when the [`Document`] drops. Siblings form a singly linked list under
//! their container, which keeps nodes small and insertion order stable.

#![allow(unsafe_code)]

pub(crate) mod parse;
pub(crate) mod print;

use core::ptr::NonNull;

use crate::jsonmap::error::Error;
use crate::jsonmap::mem::MemoryContext;

pub(crate) type NodeRef = NonNull<Node>;

/// Borrowed view of bytes held in strategy memory. Always valid UTF-8; the
/// parser only stores decoded string contents.
pub(crate) struct Bytes {
    ptr: NonNull<u8>,
    len: usize,
}

impl Bytes {
    pub(crate) fn as_str(&self) -> &str {
        if self.len == 0 {
            return "";
        }
        // SAFETY: points at `len` live bytes the document wrote itself,
        // always from `&str` sources.
        unsafe {
            core::str::from_utf8_unchecked(core::slice::from_raw_parts(self.ptr.as_ptr(), self.len))
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        if self.len == 0 {
            return &mut [];
        }
        // SAFETY: a freshly acquired block of `len` bytes, exclusively
        // owned by this `Bytes`.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

#[derive(Clone, Copy, Default)]
pub(crate) struct Children {
    first: Option<NodeRef>,
    last: Option<NodeRef>,
    count: usize,
}

pub(crate) enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(Bytes),
    Array(Children),
    Object(Children),
}

pub(crate) struct Node {
    value: Value,
    key: Option<Bytes>,
    next: Option<NodeRef>,
}

/// One JSON document tied to the memory context it allocates from.
///
/// Dropping the document deletes the tree hanging off its root, returning
/// every block to the strategy.
pub(crate) struct Document<'m, 'b> {
    mem: &'m mut MemoryContext<'b>,
    root: Option<NodeRef>,
}

impl<'m, 'b> Document<'m, 'b> {
    pub(crate) fn new(mem: &'m mut MemoryContext<'b>) -> Self {
        // A fresh document invalidates whatever a previous operation left
        // behind in a bump arena.
        mem.reset();
        Self { mem, root: None }
    }

    pub(crate) fn root(&self) -> Option<NodeRef> {
        self.root
    }

    pub(crate) fn set_root(&mut self, node: NodeRef) {
        self.root = Some(node);
    }

    fn alloc_node(&mut self, value: Value) -> Result<NodeRef, Error> {
        let raw = self.mem.acquire(core::mem::size_of::<Node>())?;
        let node = raw.cast::<Node>();
        // SAFETY: the block is large enough for a `Node` and 8-aligned,
        // which satisfies the node layout.
        unsafe {
            node.as_ptr().write(Node {
                value,
                key: None,
                next: None,
            });
        }
        Ok(node)
    }

    pub(crate) fn create_null(&mut self) -> Result<NodeRef, Error> {
        self.alloc_node(Value::Null)
    }

    pub(crate) fn create_bool(&mut self, value: bool) -> Result<NodeRef, Error> {
        self.alloc_node(Value::Bool(value))
    }

    pub(crate) fn create_number(&mut self, value: f64) -> Result<NodeRef, Error> {
        self.alloc_node(Value::Number(value))
    }

    pub(crate) fn create_string(&mut self, s: &str) -> Result<NodeRef, Error> {
        let bytes = self.copy_str(s)?;
        self.create_string_from(bytes)
    }

    /// Wraps already-decoded bytes into a string node, releasing them if
    /// the node allocation itself fails.
    pub(crate) fn create_string_from(&mut self, bytes: Bytes) -> Result<NodeRef, Error> {
        match self.alloc_node(Value::Null) {
            Ok(node) => {
                // SAFETY: `node` was just allocated and is uniquely owned.
                unsafe { (*node.as_ptr()).value = Value::Str(bytes) };
                Ok(node)
            }
            Err(e) => {
                self.release_bytes(bytes);
                Err(e)
            }
        }
    }

    pub(crate) fn create_array(&mut self) -> Result<NodeRef, Error> {
        self.alloc_node(Value::Array(Children::default()))
    }

    pub(crate) fn create_object(&mut self) -> Result<NodeRef, Error> {
        self.alloc_node(Value::Object(Children::default()))
    }

    pub(crate) fn set_key(&mut self, node: NodeRef, name: &str) -> Result<(), Error> {
        let bytes = self.copy_str(name)?;
        self.set_key_bytes(node, bytes);
        Ok(())
    }

    pub(crate) fn set_key_bytes(&mut self, node: NodeRef, bytes: Bytes) {
        // SAFETY: `node` is live and uniquely owned by this document.
        unsafe {
            let slot = &mut (*node.as_ptr()).key;
            debug_assert!(slot.is_none());
            *slot = Some(bytes);
        }
    }

    /// Appends `child` to a container node. `child` must be detached.
    pub(crate) fn attach(&mut self, parent: NodeRef, child: NodeRef) {
        // SAFETY: both nodes are live; `child` has no sibling link yet.
        unsafe {
            match &mut (*parent.as_ptr()).value {
                Value::Array(children) | Value::Object(children) => {
                    match children.last {
                        Some(last) => (*last.as_ptr()).next = Some(child),
                        None => children.first = Some(child),
                    }
                    children.last = Some(child);
                    children.count += 1;
                }
                _ => debug_assert!(false, "attach target must be a container"),
            }
        }
    }

    pub(crate) fn value(&self, node: NodeRef) -> &Value {
        // SAFETY: nodes handed out by this document stay live until
        // deleted, and deletion consumes the reference.
        unsafe { &(*node.as_ptr()).value }
    }

    pub(crate) fn key(&self, node: NodeRef) -> Option<&str> {
        // SAFETY: as in `value`.
        unsafe { (*node.as_ptr()).key.as_ref().map(Bytes::as_str) }
    }

    pub(crate) fn next(&self, node: NodeRef) -> Option<NodeRef> {
        // SAFETY: as in `value`.
        unsafe { (*node.as_ptr()).next }
    }

    pub(crate) fn first_child(&self, node: NodeRef) -> Option<NodeRef> {
        match self.value(node) {
            Value::Array(children) | Value::Object(children) => children.first,
            _ => None,
        }
    }

    pub(crate) fn child_count(&self, node: NodeRef) -> usize {
        match self.value(node) {
            Value::Array(children) | Value::Object(children) => children.count,
            _ => 0,
        }
    }

    /// First member of `container` whose key equals `name` (case
    /// sensitive), or `None`.
    pub(crate) fn lookup(&self, container: NodeRef, name: &str) -> Option<NodeRef> {
        let mut cursor = self.first_child(container);
        while let Some(node) = cursor {
            if self.key(node) == Some(name) {
                return Some(node);
            }
            cursor = self.next(node);
        }
        None
    }

    /// Recursively deletes a detached subtree, returning all of its memory
    /// to the strategy.
    pub(crate) fn delete(&mut self, node: NodeRef) {
        // SAFETY: `node` is live and uniquely owned; reading it out moves
        // ownership of its key and value here before the block is freed.
        unsafe {
            let Node { value, key, next: _ } = node.as_ptr().read();
            if let Some(bytes) = key {
                self.release_bytes(bytes);
            }
            match value {
                Value::Str(bytes) => self.release_bytes(bytes),
                Value::Array(children) | Value::Object(children) => {
                    let mut cursor = children.first;
                    while let Some(child) = cursor {
                        cursor = (*child.as_ptr()).next;
                        self.delete(child);
                    }
                }
                _ => {}
            }
            self.mem.release(node.cast());
        }
    }

    /// Reserves `len` bytes of strategy memory for string contents. The
    /// caller fills them through [`Bytes::as_mut_slice`].
    pub(crate) fn alloc_bytes(&mut self, len: usize) -> Result<Bytes, Error> {
        if len == 0 {
            return Ok(Bytes {
                ptr: NonNull::dangling(),
                len: 0,
            });
        }
        let ptr = self.mem.acquire(len)?;
        Ok(Bytes { ptr, len })
    }

    pub(crate) fn release_bytes(&mut self, bytes: Bytes) {
        if bytes.len > 0 {
            self.mem.release(bytes.ptr);
        }
    }

    fn copy_str(&mut self, s: &str) -> Result<Bytes, Error> {
        let mut bytes = self.alloc_bytes(s.len())?;
        bytes.as_mut_slice().copy_from_slice(s.as_bytes());
        Ok(bytes)
    }
}

impl Drop for Document<'_, '_> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.delete(root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_walks_a_small_tree() {
        let mut buf = [0u8; 512];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();
        let mut doc = Document::new(&mut mem);

        let obj = doc.create_object().unwrap();
        let name = doc.create_string("Adam").unwrap();
        doc.set_key(name, "name").unwrap();
        doc.attach(obj, name);
        let age = doc.create_number(30.0).unwrap();
        doc.set_key(age, "age").unwrap();
        doc.attach(obj, age);
        doc.set_root(obj);

        assert_eq!(doc.child_count(obj), 2);
        let hit = doc.lookup(obj, "age").unwrap();
        assert!(matches!(doc.value(hit), Value::Number(n) if *n == 30.0));
        assert!(doc.lookup(obj, "Age").is_none());
    }

    #[test]
    fn drop_returns_everything_to_the_pool() {
        let mut buf = [0u8; 512];
        let mut mem = MemoryContext::pool(&mut buf).unwrap();

        {
            let mut doc = Document::new(&mut mem);
            let arr = doc.create_array().unwrap();
            for i in 0..4 {
                let item = doc.create_number(f64::from(i)).unwrap();
                doc.attach(arr, item);
            }
            doc.set_root(arr);
        }

        // After teardown one allocation can claim the whole pool again.
        mem.acquire(480).unwrap();
    }

    #[test]
    fn empty_strings_need_no_memory() {
        let mut buf = [0u8; 128];
        let mut mem = MemoryContext::arena(&mut buf).unwrap();
        let mut doc = Document::new(&mut mem);

        let node = doc.create_string("").unwrap();
        assert!(matches!(doc.value(node), Value::Str(s) if s.as_str().is_empty()));
        doc.delete(node);
    }
}
