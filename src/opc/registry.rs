//! Per-document relationship registry
//!
//! Owns the relationship table of every source part in a document and hands
//! out part-scoped `rIdN` identifiers through the shared [`IdManager`].

use crate::error::{Error, Result};
use crate::ids::{IdManager, IdNamespace};
use crate::opc::{PartUri, Relationship, Relationships, TargetMode};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Relationship tables keyed by source part
#[derive(Debug)]
pub struct RelationshipRegistry {
    ids: Arc<IdManager>,
    parts: BTreeMap<PartUri, Relationships>,
}

impl RelationshipRegistry {
    /// Create an empty registry allocating IDs from `ids`
    pub fn new(ids: Arc<IdManager>) -> Self {
        Self {
            ids,
            parts: BTreeMap::new(),
        }
    }

    /// Declare a source part so relationships can be registered on it
    pub fn declare_part(&mut self, part: PartUri) {
        self.parts.entry(part).or_default();
    }

    /// Whether a part has been declared
    pub fn is_declared(&self, part: &PartUri) -> bool {
        self.parts.contains_key(part)
    }

    /// Register a relationship from `part` and return its ID.
    ///
    /// Registering the same target, type and mode twice from one part returns
    /// the ID of the first registration.
    pub fn register(
        &mut self,
        part: &PartUri,
        target: &str,
        rel_type: &str,
        mode: TargetMode,
    ) -> Result<String> {
        if target.trim().is_empty() {
            return Err(Error::Relationship(format!(
                "empty target for relationship from {}",
                part
            )));
        }

        let table = self.parts.get_mut(part).ok_or_else(|| {
            Error::Relationship(format!("unknown source part {}", part))
        })?;

        if let Some(existing) = table.find(rel_type, target, mode) {
            log::debug!("reusing {} -> {} from {}", existing.id, target, part);
            return Ok(existing.id.clone());
        }

        let namespace = IdNamespace::Relationship(part.clone());
        let id = loop {
            let candidate = format!("rId{}", self.ids.next_id(&namespace));
            if table.get(&candidate).is_none() {
                break candidate;
            }
        };

        table.add_with_id(&id, rel_type, target, mode)?;
        log::debug!("registered {} -> {} from {}", id, target, part);
        Ok(id)
    }

    /// Install a relationship table read from a package, reseeding the part's counter
    pub fn load(&mut self, part: PartUri, relationships: Relationships) {
        self.ids.initialize_from(
            &IdNamespace::Relationship(part.clone()),
            relationships.max_numeric_id(),
        );
        self.parts.insert(part, relationships);
    }

    /// Relationship table of a part
    pub fn get(&self, part: &PartUri) -> Option<&Relationships> {
        self.parts.get(part)
    }

    /// Look up one relationship
    pub fn resolve(&self, part: &PartUri, id: &str) -> Option<&Relationship> {
        self.parts.get(part)?.get(id)
    }

    /// Whether `id` exists in the table of `part`
    pub fn contains_id(&self, part: &PartUri, id: &str) -> bool {
        self.resolve(part, id).is_some()
    }

    /// Resolve an internal relationship to the part it points at
    pub fn target_part(&self, part: &PartUri, id: &str) -> Option<PartUri> {
        let rel = self.resolve(part, id)?;
        if rel.target_mode == TargetMode::External {
            return None;
        }
        part.resolve(&rel.target).ok()
    }

    /// Remove a relationship (its ID is never handed out again)
    pub fn remove(&mut self, part: &PartUri, id: &str) -> Option<Relationship> {
        self.parts.get_mut(part)?.remove(id)
    }

    /// Iterate over every declared part and its table
    pub fn parts(&self) -> impl Iterator<Item = (&PartUri, &Relationships)> {
        self.parts.iter()
    }
}
