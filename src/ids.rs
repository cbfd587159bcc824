//! Per-document ID allocation
//!
//! Every numeric ID the engine hands out (bookmarks, drawing objects, media
//! file numbers, header/footer part numbers, relationship IDs per part) comes
//! from one [`IdManager`] owned by the document.

use crate::opc::PartUri;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

/// Namespace of an ID counter
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    /// `w:bookmarkStart/@w:id`
    Bookmark,
    /// `wp:docPr/@id`
    Drawing,
    /// `N` in `word/media/imageN.ext`
    Media,
    /// `N` in `word/headerN.xml`
    Header,
    /// `N` in `word/footerN.xml`
    Footer,
    /// `N` in `rIdN` of one part's relationship table
    Relationship(PartUri),
}

/// Thread-safe, monotonic ID allocator
#[derive(Debug, Default)]
pub struct IdManager {
    counters: RwLock<HashMap<IdNamespace, AtomicU64>>,
}

impl IdManager {
    /// Create a manager with every counter at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next ID in a namespace (first ID is 1)
    pub fn next_id(&self, namespace: &IdNamespace) -> u64 {
        {
            let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(counter) = counters.get(namespace) {
                let id = counter.fetch_add(1, Ordering::SeqCst) + 1;
                log::trace!("allocated {:?} id {}", namespace, id);
                return id;
            }
        }

        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        let counter = counters
            .entry(namespace.clone())
            .or_insert_with(|| AtomicU64::new(0));
        let id = counter.fetch_add(1, Ordering::SeqCst) + 1;
        log::trace!("allocated {:?} id {}", namespace, id);
        id
    }

    /// Reseed a namespace so the next ID is above `max_observed`.
    ///
    /// Counters only move forward: a lower value than the current one is ignored.
    pub fn initialize_from(&self, namespace: &IdNamespace, max_observed: u64) {
        let mut counters = self.counters.write().unwrap_or_else(|e| e.into_inner());
        counters
            .entry(namespace.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_max(max_observed, Ordering::SeqCst);
    }

    /// Last ID handed out (or seeded) in a namespace
    pub fn current(&self, namespace: &IdNamespace) -> u64 {
        let counters = self.counters.read().unwrap_or_else(|e| e.into_inner());
        counters
            .get(namespace)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}
