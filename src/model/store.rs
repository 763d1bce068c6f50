//! Arena of finished shapes for the open document.

use super::shape::Shape;

/// Stable identifier of a shape within a [`ShapeStore`].
pub type ShapeId = u32;

/// Owns every finished shape of the current document.
///
/// Shapes are addressed by IDs that stay valid across reordering and removal
/// of other shapes. Vector order is z-order: later shapes are drawn on top
/// and win hit tests.
#[derive(Debug, Clone, Default)]
pub struct ShapeStore {
    shapes: Vec<(ShapeId, Shape)>,
    next_id: ShapeId,
}

impl ShapeStore {
    pub fn new() -> Self {
        Self {
            shapes: Vec::new(),
            next_id: 1,
        }
    }

    /// Add a shape on top and return its ID.
    pub fn add(&mut self, shape: Shape) -> ShapeId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.shapes.push((id, shape));
        id
    }

    /// Remove a shape by ID.
    pub fn remove(&mut self, id: ShapeId) -> Option<Shape> {
        let index = self.position(id)?;
        Some(self.shapes.remove(index).1)
    }

    pub fn get(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, id: ShapeId) -> Option<&mut Shape> {
        self.shapes.iter_mut().find(|(i, _)| *i == id).map(|(_, s)| s)
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.position(id).is_some()
    }

    /// Z-order position of a shape.
    pub fn position(&self, id: ShapeId) -> Option<usize> {
        self.shapes.iter().position(|(i, _)| *i == id)
    }

    /// ID of the most recently added shape still present.
    pub fn last_id(&self) -> Option<ShapeId> {
        self.shapes.last().map(|(id, _)| *id)
    }

    /// Iterate bottom to top.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (ShapeId, &Shape)> {
        self.shapes.iter().map(|(id, s)| (*id, s))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ShapeId, &mut Shape)> {
        self.shapes.iter_mut().map(|(id, s)| (*id, s))
    }

    pub fn ids(&self) -> Vec<ShapeId> {
        self.shapes.iter().map(|(id, _)| *id).collect()
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Copy of the whole collection, IDs included.
    pub fn snapshot(&self) -> Vec<(ShapeId, Shape)> {
        self.shapes.clone()
    }

    /// Replace the collection with a snapshot, keeping its IDs.
    ///
    /// IDs handed out later never collide with restored ones.
    pub fn restore(&mut self, shapes: Vec<(ShapeId, Shape)>) {
        let max_id = shapes.iter().map(|(id, _)| *id).max().unwrap_or(0);
        self.next_id = self.next_id.max(max_id + 1);
        self.shapes = shapes;
    }
}
