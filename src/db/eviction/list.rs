//! Recency list with O(1) operations.
//
// Doubly-linked list over raw pointers plus a HashMap index from key to node:
// - push_front / move_to_front: O(1)
// - remove: O(1)
// - pop_tail: O(1)

use std::collections::HashMap;
use std::hash::Hash;
use std::ptr::{self, NonNull};

/// Node in the doubly-linked list.
struct Node<K> {
    key: K,
    prev: *mut Node<K>,
    next: *mut Node<K>,
}

impl<K> Node<K> {
    fn new(key: K) -> Box<Self> {
        Box::new(Node {
            key,
            prev: ptr::null_mut(),
            next: ptr::null_mut(),
        })
    }
}

/// Ordered key list, head = most recently placed, tail = next victim.
pub struct RecencyList<K: Eq + Hash + Clone> {
    head: *mut Node<K>,
    tail: *mut Node<K>,
    nodes: HashMap<K, NonNull<Node<K>>>,
}

// Safety: every pointer in the list refers to a live Box<Node<K>> owned by the list.
// Nodes are freed only in remove/pop_tail/clear, which unlink them first.
unsafe impl<K: Eq + Hash + Clone + Send> Send for RecencyList<K> {}
unsafe impl<K: Eq + Hash + Clone + Sync> Sync for RecencyList<K> {}

impl<K: Eq + Hash + Clone> RecencyList<K> {
    pub fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
            nodes: HashMap::new(),
        }
    }

    /// Moves a key to the front. If the key is not tracked yet, adds it to the front.
    pub fn move_to_front(&mut self, key: &K) {
        if let Some(node_ptr) = self.nodes.get(key).copied() {
            unsafe {
                let node = node_ptr.as_ptr();
                self.unlink(node);
                self.link_front(node);
            }
        } else {
            self.insert_front(key.clone());
        }
    }

    /// Adds a key to the front only if it is not tracked yet.
    /// Returns false if the key was already present (its position is untouched).
    pub fn push_front_if_absent(&mut self, key: &K) -> bool {
        if self.nodes.contains_key(key) {
            return false;
        }
        self.insert_front(key.clone());
        true
    }

    /// Removes a key from the list. Returns true on hit.
    pub fn remove(&mut self, key: &K) -> bool {
        match self.nodes.remove(key) {
            Some(node_ptr) => {
                unsafe {
                    let node = node_ptr.as_ptr();
                    self.unlink(node);
                    drop(Box::from_raw(node));
                }
                true
            }
            None => false,
        }
    }

    /// Pops the tail.
    pub fn pop_tail(&mut self) -> Option<K> {
        if self.tail.is_null() {
            return None;
        }

        unsafe {
            let node = self.tail;
            self.unlink(node);
            let node = Box::from_raw(node);
            self.nodes.remove(&node.key);
            Some(node.key)
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Keys from head (most recent) to tail.
    pub fn keys(&self) -> Vec<K> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut current = self.head;
        unsafe {
            while !current.is_null() {
                out.push((*current).key.clone());
                current = (*current).next;
            }
        }
        out
    }

    pub fn clear(&mut self) {
        unsafe {
            let mut current = self.head;
            while !current.is_null() {
                let next = (*current).next;
                drop(Box::from_raw(current));
                current = next;
            }
        }

        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
        self.nodes.clear();
    }

    fn insert_front(&mut self, key: K) {
        let node = NonNull::from(Box::leak(Node::new(key.clone())));
        self.nodes.insert(key, node);
        unsafe {
            self.link_front(node.as_ptr());
        }
    }

    /// Unlinks a node from its neighbours (does not deallocate).
    unsafe fn unlink(&mut self, node: *mut Node<K>) {
        let prev = (*node).prev;
        let next = (*node).next;

        if prev.is_null() {
            self.head = next;
        } else {
            (*prev).next = next;
        }

        if next.is_null() {
            self.tail = prev;
        } else {
            (*next).prev = prev;
        }

        (*node).prev = ptr::null_mut();
        (*node).next = ptr::null_mut();
    }

    unsafe fn link_front(&mut self, node: *mut Node<K>) {
        (*node).next = self.head;
        (*node).prev = ptr::null_mut();

        if !self.head.is_null() {
            (*self.head).prev = node;
        } else {
            self.tail = node;
        }

        self.head = node;
    }
}

impl<K: Eq + Hash + Clone> Default for RecencyList<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash + Clone> Drop for RecencyList<K> {
    fn drop(&mut self) {
        self.clear();
    }
}
