//! Entity store
//!
//! Typed component columns over generational entity slots, plus
//! [`EntityChunk`], a set of disjoint mutable borrows over a contiguous slot
//! range that the update strategies hand to worker threads.

use std::ops::Range;

use super::components::{
    Animation, Attachment, BoundingBox, Light, Position, RenderState, Renderable, Skeleton,
};
use super::storage::ComponentColumn;
use super::{Component, Entity};

/// A component type with a column in [`EntityStore`]
pub trait Stored: Component + Sized {
    /// Column holding this type
    fn column(store: &EntityStore) -> &ComponentColumn<Self>;
    /// Column holding this type, mutably
    fn column_mut(store: &mut EntityStore) -> &mut ComponentColumn<Self>;
}

macro_rules! stored {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl Stored for $ty {
                fn column(store: &EntityStore) -> &ComponentColumn<Self> {
                    &store.$field
                }

                fn column_mut(store: &mut EntityStore) -> &mut ComponentColumn<Self> {
                    &mut store.$field
                }
            }
        )*
    };
}

/// Registry of entities and their components
#[derive(Default)]
pub struct EntityStore {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    renderable: ComponentColumn<Renderable>,
    attachment: ComponentColumn<Attachment>,
    position: ComponentColumn<Position>,
    animation: ComponentColumn<Animation>,
    skeleton: ComponentColumn<Skeleton>,
    bounding_box: ComponentColumn<BoundingBox>,
    render_state: ComponentColumn<RenderState>,
    light: ComponentColumn<Light>,
}

stored! {
    Renderable => renderable,
    Attachment => attachment,
    Position => position,
    Animation => animation,
    Skeleton => skeleton,
    BoundingBox => bounding_box,
    RenderState => render_state,
    Light => light,
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity with no components, reusing a freed slot if any
    pub fn spawn(&mut self) -> Entity {
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return Entity::new(index, self.generations[slot]);
        }

        let index = self.generations.len();
        self.generations.push(0);
        self.alive.push(true);
        self.resize_columns(index + 1);
        Entity::new(index as u32, 0)
    }

    /// Remove an entity and all its components; stale handles are ignored
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.contains(entity) {
            return false;
        }
        let slot = entity.index() as usize;
        self.renderable.remove(slot);
        self.attachment.remove(slot);
        self.position.remove(slot);
        self.animation.remove(slot);
        self.skeleton.remove(slot);
        self.bounding_box.remove(slot);
        self.render_state.remove(slot);
        self.light.remove(slot);

        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push(entity.index());
        log::trace!("Despawned entity {:?}", entity);
        true
    }

    /// Whether `entity` refers to a live slot of the same generation
    pub fn contains(&self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        self.alive.get(slot).copied().unwrap_or(false) && self.generations[slot] == entity.generation()
    }

    /// Attach a component, replacing any previous one of the same type
    pub fn insert<T: Stored>(&mut self, entity: Entity, component: T) -> bool {
        if !self.contains(entity) {
            log::warn!("Ignoring component insert for stale entity {:?}", entity);
            return false;
        }
        T::column_mut(self).insert(entity.index() as usize, component);
        true
    }

    /// Detach a component
    pub fn remove<T: Stored>(&mut self, entity: Entity) -> Option<T> {
        if !self.contains(entity) {
            return None;
        }
        T::column_mut(self).remove(entity.index() as usize)
    }

    /// Component of `entity`
    pub fn get<T: Stored>(&self, entity: Entity) -> Option<&T> {
        if !self.contains(entity) {
            return None;
        }
        T::column(self).get(entity.index() as usize)
    }

    /// Mutable component of `entity`
    pub fn get_mut<T: Stored>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.contains(entity) {
            return None;
        }
        T::column_mut(self).get_mut(entity.index() as usize)
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Check if no entity is alive
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, the range the update strategies partition
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }

    /// Live entities carrying the [`Renderable`] marker
    pub fn renderables(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .enumerate()
            .filter(|(slot, _)| self.alive[*slot] && self.renderable.get(*slot).is_some())
            .map(|(slot, generation)| Entity::new(slot as u32, *generation))
    }

    /// Borrow every slot as one chunk
    pub fn chunk_all(&mut self) -> EntityChunk<'_> {
        EntityChunk {
            start: 0,
            renderable: self.renderable.as_slice(),
            attachment: self.attachment.as_slice(),
            position: self.position.as_slice(),
            light: self.light.as_slice(),
            animation: self.animation.as_mut_slice(),
            skeleton: self.skeleton.as_mut_slice(),
            bounding_box: self.bounding_box.as_mut_slice(),
            render_state: self.render_state.as_mut_slice(),
        }
    }

    fn resize_columns(&mut self, len: usize) {
        self.renderable.resize(len);
        self.attachment.resize(len);
        self.position.resize(len);
        self.animation.resize(len);
        self.skeleton.resize(len);
        self.bounding_box.resize(len);
        self.render_state.resize(len);
        self.light.resize(len);
    }
}

/// Disjoint borrows of every column over the slots `start..start + len()`
///
/// Read-only columns are shared, the columns the update phases write are
/// borrowed mutably, so two chunks from one [`EntityChunk::split`] may be
/// processed on different threads.
pub struct EntityChunk<'a> {
    start: usize,
    renderable: &'a [Option<Renderable>],
    attachment: &'a [Option<Attachment>],
    position: &'a [Option<Position>],
    light: &'a [Option<Light>],
    animation: &'a mut [Option<Animation>],
    skeleton: &'a mut [Option<Skeleton>],
    bounding_box: &'a mut [Option<BoundingBox>],
    render_state: &'a mut [Option<RenderState>],
}

impl<'a> EntityChunk<'a> {
    /// First slot covered
    pub fn start(&self) -> usize {
        self.start
    }

    /// Number of slots covered
    pub fn len(&self) -> usize {
        self.renderable.len()
    }

    /// Check if the chunk covers no slots
    pub fn is_empty(&self) -> bool {
        self.renderable.is_empty()
    }

    /// Split into `[0, mid)` and `[mid, len)` relative to this chunk
    pub fn split_at(self, mid: usize) -> (Self, Self) {
        let mid = mid.min(self.len());
        let (renderable_l, renderable_r) = self.renderable.split_at(mid);
        let (attachment_l, attachment_r) = self.attachment.split_at(mid);
        let (position_l, position_r) = self.position.split_at(mid);
        let (light_l, light_r) = self.light.split_at(mid);
        let (animation_l, animation_r) = self.animation.split_at_mut(mid);
        let (skeleton_l, skeleton_r) = self.skeleton.split_at_mut(mid);
        let (bounding_box_l, bounding_box_r) = self.bounding_box.split_at_mut(mid);
        let (render_state_l, render_state_r) = self.render_state.split_at_mut(mid);

        (
            Self {
                start: self.start,
                renderable: renderable_l,
                attachment: attachment_l,
                position: position_l,
                light: light_l,
                animation: animation_l,
                skeleton: skeleton_l,
                bounding_box: bounding_box_l,
                render_state: render_state_l,
            },
            Self {
                start: self.start + mid,
                renderable: renderable_r,
                attachment: attachment_r,
                position: position_r,
                light: light_r,
                animation: animation_r,
                skeleton: skeleton_r,
                bounding_box: bounding_box_r,
                render_state: render_state_r,
            },
        )
    }

    /// Split into consecutive chunks matching `ranges`
    ///
    /// Ranges are relative to this chunk and must be sorted and
    /// non-overlapping; gaps between them are dropped.
    pub fn split(self, ranges: &[Range<usize>]) -> Vec<Self> {
        let mut chunks = Vec::with_capacity(ranges.len());
        let mut rest = self;
        let mut consumed = 0;
        for range in ranges {
            let (_, tail) = rest.split_at(range.start.saturating_sub(consumed));
            let (chunk, tail) = tail.split_at(range.end.saturating_sub(range.start));
            consumed = range.end.max(consumed);
            chunks.push(chunk);
            rest = tail;
        }
        chunks
    }

    /// Renderable entities of this chunk with whatever components they carry
    pub fn entities(&mut self) -> impl Iterator<Item = EntityView<'_>> {
        let start = self.start;
        self.renderable
            .iter()
            .zip(self.attachment.iter())
            .zip(self.position.iter())
            .zip(self.light.iter())
            .zip(self.animation.iter_mut())
            .zip(self.skeleton.iter_mut())
            .zip(self.bounding_box.iter_mut())
            .zip(self.render_state.iter_mut())
            .enumerate()
            .filter_map(
                move |(offset, (((((((renderable, attachment), position), light), animation), skeleton), bounding_box), render_state))| {
                    renderable.as_ref()?;
                    Some(EntityView {
                        slot: start + offset,
                        attachment: attachment.as_ref(),
                        position: position.as_ref(),
                        light: light.as_ref(),
                        animation: animation.as_mut(),
                        skeleton: skeleton.as_mut(),
                        bounding_box: bounding_box.as_mut(),
                        render_state: render_state.as_mut(),
                    })
                },
            )
    }
}

/// One renderable entity inside a chunk
pub struct EntityView<'a> {
    /// Store slot
    pub slot: usize,
    /// Attached model
    pub attachment: Option<&'a Attachment>,
    /// Placement
    pub position: Option<&'a Position>,
    /// Light source
    pub light: Option<&'a Light>,
    /// Animation cursor
    pub animation: Option<&'a mut Animation>,
    /// Pose and bone offset
    pub skeleton: Option<&'a mut Skeleton>,
    /// World bounds
    pub bounding_box: Option<&'a mut BoundingBox>,
    /// Visibility and body light
    pub render_state: Option<&'a mut RenderState>,
}
