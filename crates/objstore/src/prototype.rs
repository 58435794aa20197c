//! Prototype registry: the runtime type system of the store.
//!
//! Every persistent type is attached once, under a unique name, optionally
//! below a parent node. Attachment scans a blank instance to discover
//! relation container fields, so the registry knows, for each child type,
//! which owner field will eventually hold it. That metadata drives the
//! staging area used when rows arrive out of dependency order.

use crate::object::{Object, ObjectId, ObjectType};
use crate::visitor::{FieldWriter, LinkSequence, LinkSlot};
use objstore_core::{Error, PrototypeError, PrototypeErrorKind, Result};
use std::collections::HashMap;

/// Factory producing a blank instance of a registered type.
pub type ObjectFactory = Box<dyn Fn() -> Box<dyn Object>>;

/// One relation edge, stored on the *child* node and keyed by the owner's
/// type name: "when a `Track` references an `Album`, the album's `tracks`
/// container is the other end".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationEdge {
    /// Type owning the container field.
    pub owner_type: String,
    /// Name of the container field on the owner.
    pub field: String,
}

/// A node in the type tree: one registered persistent type.
pub struct PrototypeNode {
    type_name: String,
    parent: Option<String>,
    children: Vec<String>,
    factory: ObjectFactory,
    /// Keyed by the referenced (owner) type name.
    relations: HashMap<String, RelationEdge>,
    /// Children that arrived before their owner, keyed by
    /// (container field, owner id).
    staged: HashMap<(String, ObjectId), Vec<ObjectId>>,
}

impl PrototypeNode {
    fn new(type_name: &str, parent: Option<&str>, factory: ObjectFactory) -> Self {
        Self {
            type_name: type_name.to_string(),
            parent: parent.map(str::to_string),
            children: Vec::new(),
            factory,
            relations: HashMap::new(),
            staged: HashMap::new(),
        }
    }

    /// The registered type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The parent type name, if this node is not a root.
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Names of directly derived types, in attachment order.
    pub fn children(&self) -> &[String] {
        &self.children
    }

    /// Produce a blank instance of this type.
    pub fn create(&self) -> Box<dyn Object> {
        (self.factory)()
    }

    /// The relation edge back to `owner_type`, if this type is contained
    /// by it.
    pub fn relation(&self, owner_type: &str) -> Option<&RelationEdge> {
        self.relations.get(owner_type)
    }

    /// Number of child ids currently staged under this node.
    pub fn staged_count(&self) -> usize {
        self.staged.values().map(Vec::len).sum()
    }
}

impl std::fmt::Debug for PrototypeNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrototypeNode")
            .field("type_name", &self.type_name)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("relations", &self.relations)
            .finish_non_exhaustive()
    }
}

/// The registry of all attached prototype nodes.
#[derive(Default)]
pub struct PrototypeRegistry {
    nodes: HashMap<String, PrototypeNode>,
    roots: Vec<String>,
    /// Relation edges whose element type was not yet attached, keyed by
    /// that element type name.
    pending: HashMap<String, Vec<RelationEdge>>,
}

impl PrototypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `T` as a root type or below `parent`.
    pub fn attach<T: ObjectType>(&mut self, parent: Option<&str>) -> Result<&PrototypeNode> {
        self.attach_with(T::TYPE, parent, Box::new(|| Box::new(T::default())))
    }

    /// Attach a type by name with an explicit factory.
    ///
    /// The factory's blank instance is scanned for relation container
    /// fields; each discovered container installs an edge on the element
    /// type's node, or parks it until that type is attached.
    pub fn attach_with(
        &mut self,
        type_name: &str,
        parent: Option<&str>,
        factory: ObjectFactory,
    ) -> Result<&PrototypeNode> {
        if self.nodes.contains_key(type_name) {
            return Err(Error::Prototype(PrototypeError {
                kind: PrototypeErrorKind::DuplicateType,
                type_name: type_name.to_string(),
            }));
        }
        if let Some(parent_name) = parent {
            if !self.nodes.contains_key(parent_name) {
                return Err(Error::Prototype(PrototypeError {
                    kind: PrototypeErrorKind::UnknownParent,
                    type_name: parent_name.to_string(),
                }));
            }
        }

        let blank = factory();
        let mut scan = RelationScan::new(type_name);
        blank.write_fields(&mut scan)?;

        let node = PrototypeNode::new(type_name, parent, factory);
        self.nodes.insert(type_name.to_string(), node);
        match parent {
            Some(parent_name) => {
                if let Some(parent_node) = self.nodes.get_mut(parent_name) {
                    parent_node.children.push(type_name.to_string());
                }
            }
            None => self.roots.push(type_name.to_string()),
        }

        for (element_type, edge) in scan.containers {
            match self.nodes.get_mut(&element_type) {
                Some(element_node) => {
                    element_node.relations.insert(edge.owner_type.clone(), edge);
                }
                None => self.pending.entry(element_type).or_default().push(edge),
            }
        }

        // resolve edges that waited for this type
        if let Some(edges) = self.pending.remove(type_name) {
            if let Some(node) = self.nodes.get_mut(type_name) {
                for edge in edges {
                    node.relations.insert(edge.owner_type.clone(), edge);
                }
            }
        }

        tracing::debug!(type_name, parent, "prototype attached");
        self.nodes
            .get(type_name)
            .ok_or_else(|| Error::Prototype(PrototypeError {
                kind: PrototypeErrorKind::NotFound,
                type_name: type_name.to_string(),
            }))
    }

    /// Detach a leaf type. Fails when the type is unknown or still has
    /// derived types attached below it.
    pub fn detach(&mut self, type_name: &str) -> Result<()> {
        let node = self.nodes.get(type_name).ok_or_else(|| {
            Error::Prototype(PrototypeError {
                kind: PrototypeErrorKind::NotFound,
                type_name: type_name.to_string(),
            })
        })?;
        if !node.children.is_empty() {
            return Err(Error::Prototype(PrototypeError {
                kind: PrototypeErrorKind::HasChildren,
                type_name: type_name.to_string(),
            }));
        }

        let parent = node.parent.clone();
        self.nodes.remove(type_name);
        match parent {
            Some(parent_name) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_name) {
                    parent_node.children.retain(|c| c != type_name);
                }
            }
            None => self.roots.retain(|r| r != type_name),
        }

        // edges owned by the departing type are no longer reachable
        for node in self.nodes.values_mut() {
            node.relations.remove(type_name);
        }
        for edges in self.pending.values_mut() {
            edges.retain(|e| e.owner_type != type_name);
        }
        self.pending.retain(|_, edges| !edges.is_empty());

        tracing::debug!(type_name, "prototype detached");
        Ok(())
    }

    /// Look up a node by type name.
    pub fn find(&self, type_name: &str) -> Option<&PrototypeNode> {
        self.nodes.get(type_name)
    }

    pub(crate) fn find_mut(&mut self, type_name: &str) -> Option<&mut PrototypeNode> {
        self.nodes.get_mut(type_name)
    }

    /// Number of attached types.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Depth-first walk over the type tree, roots in attachment order,
    /// each parent before its children.
    pub fn iter(&self) -> PrototypeIter<'_> {
        let mut stack: Vec<&str> = self.roots.iter().map(String::as_str).collect();
        stack.reverse();
        PrototypeIter {
            registry: self,
            stack,
        }
    }

    /// Record that child `child_id` belongs in `field` of the owner
    /// object `owner_id`, to be delivered when that container is read.
    pub(crate) fn stage_child(
        &mut self,
        owner_type: &str,
        field: &str,
        owner_id: ObjectId,
        child_id: ObjectId,
    ) {
        if let Some(node) = self.nodes.get_mut(owner_type) {
            node.staged
                .entry((field.to_string(), owner_id))
                .or_default()
                .push(child_id);
        }
    }

    /// Take all children staged for `(field, owner_id)`. Draining is
    /// destructive: a second call returns nothing.
    pub(crate) fn drain_staged(
        &mut self,
        owner_type: &str,
        field: &str,
        owner_id: ObjectId,
    ) -> Vec<ObjectId> {
        self.nodes
            .get_mut(owner_type)
            .and_then(|node| node.staged.remove(&(field.to_string(), owner_id)))
            .unwrap_or_default()
    }

    /// Discard all staged relation data on every node.
    pub(crate) fn clear_staging(&mut self) {
        for node in self.nodes.values_mut() {
            node.staged.clear();
        }
    }
}

impl std::fmt::Debug for PrototypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrototypeRegistry")
            .field("roots", &self.roots)
            .field("types", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Depth-first iterator over prototype nodes.
pub struct PrototypeIter<'a> {
    registry: &'a PrototypeRegistry,
    stack: Vec<&'a str>,
}

impl<'a> Iterator for PrototypeIter<'a> {
    type Item = &'a PrototypeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.stack.pop()?;
        let node = self.registry.nodes.get(name)?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Write-side visitor that records relation container fields of a blank
/// instance and ignores everything else.
struct RelationScan {
    owner_type: String,
    containers: Vec<(String, RelationEdge)>,
}

impl RelationScan {
    fn new(owner_type: &str) -> Self {
        Self {
            owner_type: owner_type.to_string(),
            containers: Vec::new(),
        }
    }

    fn record(&mut self, field: &str, items: &dyn LinkSequence) {
        self.containers.push((
            items.element_type().to_string(),
            RelationEdge {
                owner_type: self.owner_type.clone(),
                field: field.to_string(),
            },
        ));
    }
}

impl FieldWriter for RelationScan {
    fn write_bool(&mut self, _field: &str, _value: bool) -> Result<()> {
        Ok(())
    }

    fn write_char(&mut self, _field: &str, _value: char) -> Result<()> {
        Ok(())
    }

    fn write_i8(&mut self, _field: &str, _value: i8) -> Result<()> {
        Ok(())
    }

    fn write_i16(&mut self, _field: &str, _value: i16) -> Result<()> {
        Ok(())
    }

    fn write_i32(&mut self, _field: &str, _value: i32) -> Result<()> {
        Ok(())
    }

    fn write_i64(&mut self, _field: &str, _value: i64) -> Result<()> {
        Ok(())
    }

    fn write_u8(&mut self, _field: &str, _value: u8) -> Result<()> {
        Ok(())
    }

    fn write_u16(&mut self, _field: &str, _value: u16) -> Result<()> {
        Ok(())
    }

    fn write_u32(&mut self, _field: &str, _value: u32) -> Result<()> {
        Ok(())
    }

    fn write_u64(&mut self, _field: &str, _value: u64) -> Result<()> {
        Ok(())
    }

    fn write_f32(&mut self, _field: &str, _value: f32) -> Result<()> {
        Ok(())
    }

    fn write_f64(&mut self, _field: &str, _value: f64) -> Result<()> {
        Ok(())
    }

    fn write_string(&mut self, _field: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn write_object(&mut self, _field: &str, _link: &dyn LinkSlot) -> Result<()> {
        Ok(())
    }

    fn write_list(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.record(field, items);
        Ok(())
    }

    fn write_vector(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.record(field, items);
        Ok(())
    }

    fn write_container(&mut self, field: &str, items: &dyn LinkSequence) -> Result<()> {
        self.record(field, items);
        Ok(())
    }
}
