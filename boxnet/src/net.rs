// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The box container: the public handle type and the graph storage arena.

use alloc::vec::Vec;
use core::fmt;

use crate::dir::Dir;
use crate::junction::{EnqueuedMask, JRef, Junction, JunctionKind};

/// A handle to a box previously added to a [`Boxnet`].
///
/// Carries a generation counter so that a stale handle from a removed box is
/// never silently confused with whatever box is later allocated into the
/// same slot.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct BoxId(u32, u32);

impl fmt::Debug for BoxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoxId({}#{})", self.0, self.1)
    }
}

impl BoxId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "box arenas never exceed u32::MAX entries"
    )]
    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn raw(self) -> u32 {
        self.0
    }

    pub(crate) const fn generation(self) -> u32 {
        self.1
    }
}

/// The five junctions owned by one box, plus its AABB and payload.
pub(crate) struct BoxSlot<U> {
    pub(crate) generation: u32,
    pub(crate) posx: f64,
    pub(crate) posy: f64,
    pub(crate) right: f64,
    pub(crate) top: f64,
    pub(crate) user_data: U,
    pub(crate) center: Junction,
    pub(crate) rayend: [Junction; 4],
    /// Set during [`Boxnet::collide`] to the index of the box whose scan is
    /// currently visiting this one, to report each overlap pair once.
    pub(crate) marked: Option<u32>,
}

impl<U> BoxSlot<U> {
    fn new(own: u32, posx: f64, posy: f64, right: f64, top: f64, user_data: U) -> Self {
        Self {
            generation: 0,
            posx,
            posy,
            right,
            top,
            user_data,
            center: Junction::center(own),
            rayend: core::array::from_fn(|i| {
                Junction::detached_rayend(own, Dir::from_u8(i as u8))
            }),
            marked: None,
        }
    }
}

/// Scratch buffers reused across repair passes so steady-state operation
/// does no allocation.
#[derive(Default)]
pub(crate) struct RepairScratch {
    pub(crate) a: Vec<(JRef, Dir)>,
    pub(crate) b: Vec<(JRef, Dir)>,
}

/// Where a repair-queue append should land: a live queue, or nowhere.
///
/// Several graph rewrites (`flip`, `flip_one`) are shared between the
/// repair engine, which wants every affected junction re-checked, and
/// one-off structural maintenance (box removal, the pre-collision
/// normalization pass), which doesn't track the repair queue at all. The
/// original algorithm expresses this with a nullable queue pointer; this is
/// the borrow-checker-friendly equivalent; the `enqueued` bitmask is left
/// untouched whenever the sink is [`Sink::Discard`], matching the null-queue
/// behavior exactly.
pub(crate) enum Sink<'a> {
    Discard,
    Queue(&'a mut Vec<(JRef, Dir)>),
}

/// An incremental broadphase index of axis-aligned bounding boxes.
///
/// Boxes are added with [`Boxnet::add_box`] and removed with
/// [`Boxnet::remove`] or [`Boxnet::remove_by_user_data`]; [`Boxnet::collide`]
/// repairs the internal ray graph and reports every overlapping pair of
/// boxes exactly once.
pub struct Boxnet<U> {
    pub(crate) boxes: Vec<Option<BoxSlot<U>>>,
    pub(crate) free_list: Vec<usize>,
    pub(crate) repair_scratch: RepairScratch,
    pub(crate) collide_scratch: Vec<u32>,
}

impl<U> Default for Boxnet<U> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> Boxnet<U> {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self {
            boxes: Vec::new(),
            free_list: Vec::new(),
            repair_scratch: RepairScratch::default(),
            collide_scratch: Vec::new(),
        }
    }

    /// Number of live boxes.
    pub fn len(&self) -> usize {
        self.boxes.len() - self.free_list.len()
    }

    /// True if no boxes are currently stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shared access to a box's payload and bounds, if `id` is still live.
    pub fn get(&self, id: BoxId) -> Option<(&U, [f64; 4])> {
        let slot = self.boxes.get(id.idx())?.as_ref()?;
        if slot.generation != id.generation() {
            return None;
        }
        Some((&slot.user_data, [slot.posx, slot.posy, slot.right, slot.top]))
    }

    /// Mutable access to a box's payload, if `id` is still live.
    ///
    /// Does not touch bounds; use [`Boxnet::set_bounds`] to move a box.
    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut U> {
        let slot = self.boxes.get_mut(id.idx())?.as_mut()?;
        if slot.generation != id.generation() {
            return None;
        }
        Some(&mut slot.user_data)
    }

    /// Moves or resizes a live box in place, leaving the ray graph
    /// untouched until the next [`Boxnet::collide`] repairs it.
    ///
    /// This is the normal way to move a box: mutating the coordinates
    /// between `collide` calls, rather than removing and re-adding it, is
    /// what makes incremental repair cheap. Panics if `id` is not live or
    /// the new bounds are inverted.
    pub fn set_bounds(&mut self, id: BoxId, posx: f64, posy: f64, right: f64, top: f64) {
        assert!(right >= posx && top >= posy, "box bounds must be non-inverted");
        let idx = id.idx();
        let slot = self.boxes[idx]
            .as_mut()
            .filter(|slot| slot.generation == id.generation())
            .expect("set_bounds: stale or unknown BoxId");
        slot.posx = posx;
        slot.posy = posy;
        slot.right = right;
        slot.top = top;
    }

    /// Adds a box with the given AABB and payload, anchored near `near` (or
    /// an arbitrary existing box, if any, when `near` is `None`).
    ///
    /// The graph is left topologically valid but not necessarily spatially
    /// consistent; [`Boxnet::collide`] repairs it before reporting overlaps.
    pub fn add_box(
        &mut self,
        posx: f64,
        posy: f64,
        right: f64,
        top: f64,
        near: Option<BoxId>,
        user_data: U,
    ) -> BoxId {
        assert!(right >= posx && top >= posy, "box bounds must be non-inverted");
        let near = near
            .map(|id| id.raw())
            .or_else(|| self.first_live_index());
        let (idx, generation) = self.alloc_slot(posx, posy, right, top, user_data);
        if let Some(anchor) = near {
            self.insert_junction(idx, JRef::center(anchor));
        }
        BoxId::new(idx, generation)
    }

    fn alloc_slot(
        &mut self,
        posx: f64,
        posy: f64,
        right: f64,
        top: f64,
        user_data: U,
    ) -> (u32, u32) {
        if let Some(idx) = self.free_list.pop() {
            let generation = self.boxes[idx]
                .take()
                .map_or(0, |old| old.generation.wrapping_add(1));
            let mut slot = BoxSlot::new(idx as u32, posx, posy, right, top, user_data);
            slot.generation = generation;
            self.boxes[idx] = Some(slot);
            (idx as u32, generation)
        } else {
            let idx = self.boxes.len();
            self.boxes.push(Some(BoxSlot::new(
                idx as u32,
                posx,
                posy,
                right,
                top,
                user_data,
            )));
            (idx as u32, 0)
        }
    }

    fn first_live_index(&self) -> Option<u32> {
        self.boxes
            .iter()
            .position(Option::is_some)
            .map(|i| i as u32)
    }

    /// Removes a box, disconnecting its junctions from the graph.
    ///
    /// Panics if `id` does not refer to a currently live box.
    pub fn remove(&mut self, id: BoxId) {
        let idx = id.idx();
        let live = self.boxes[idx]
            .as_ref()
            .is_some_and(|slot| slot.generation == id.generation());
        assert!(live, "remove: stale or unknown BoxId");
        self.free_box(idx);
    }

    /// Removes the first live box whose payload equals `user_data`.
    ///
    /// Panics if no live box matches.
    pub fn remove_by_user_data(&mut self, user_data: &U)
    where
        U: PartialEq,
    {
        let idx = self
            .boxes
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|b| &b.user_data == user_data))
            .expect("remove_by_user_data: no live box with this payload");
        self.free_box(idx);
    }

    fn free_box(&mut self, idx: usize) {
        self.disconnect_box(idx as u32);
        self.boxes[idx] = None;
        self.free_list.push(idx);
    }

    fn disconnect_box(&mut self, b: u32) {
        let mut discard = Sink::Discard;
        for d in crate::dir::ALL_DIRS {
            let Some(nb) = self.nb(JRef::center(b), d) else {
                continue;
            };
            let is_own_terminus = matches!(
                self.kind(nb),
                JunctionKind::Terminus { term, .. } if term == d.opposite()
            );
            if !is_own_terminus {
                self.flip(nb, &mut discard);
            }
        }
        for d in crate::dir::ALL_DIRS {
            let r = JRef::rayend(b, d);
            if !matches!(self.kind(r), JunctionKind::Detached) {
                self.detach(r);
            }
        }
    }

    pub(crate) fn box_ref(&self, b: u32) -> &BoxSlot<U> {
        self.boxes[b as usize]
            .as_ref()
            .expect("dangling box index in ray graph")
    }

    pub(crate) fn box_mut(&mut self, b: u32) -> &mut BoxSlot<U> {
        self.boxes[b as usize]
            .as_mut()
            .expect("dangling box index in ray graph")
    }

    pub(crate) fn junction(&self, r: JRef) -> &Junction {
        let bx = self.box_ref(r.b);
        match r.slot {
            None => &bx.center,
            Some(d) => &bx.rayend[d.idx()],
        }
    }

    pub(crate) fn junction_mut(&mut self, r: JRef) -> &mut Junction {
        let bx = self.box_mut(r.b);
        match r.slot {
            None => &mut bx.center,
            Some(d) => &mut bx.rayend[d.idx()],
        }
    }

    pub(crate) fn nb(&self, r: JRef, d: Dir) -> Option<JRef> {
        self.junction(r).nb[d.idx()]
    }

    pub(crate) fn set_nb(&mut self, r: JRef, d: Dir, val: Option<JRef>) {
        self.junction_mut(r).nb[d.idx()] = val;
    }

    pub(crate) fn kind(&self, r: JRef) -> JunctionKind {
        self.junction(r).kind
    }

    pub(crate) fn terminus(&self, r: JRef) -> (Dir, Dir) {
        match self.kind(r) {
            JunctionKind::Terminus { term, beam } => (term, beam),
            other => panic!("expected a T-junction, found {other:?}"),
        }
    }

    pub(crate) fn set_terminus(&mut self, r: JRef, term: Dir, beam: Dir) {
        self.junction_mut(r).kind = JunctionKind::Terminus { term, beam };
    }

    pub(crate) fn set_detached(&mut self, r: JRef) {
        self.junction_mut(r).kind = JunctionKind::Detached;
    }

    pub(crate) fn pos_of(&self, r: JRef, axis: usize) -> u32 {
        self.junction(r).pos[axis]
    }

    pub(crate) fn set_pos(&mut self, r: JRef, axis: usize, owner: u32) {
        self.junction_mut(r).pos[axis] = owner;
    }

    pub(crate) fn axis_value(&self, b: u32, axis: usize) -> f64 {
        let bx = self.box_ref(b);
        if axis == 1 { bx.posy } else { bx.posx }
    }

    pub(crate) fn is_enqueued(&self, r: JRef, d: Dir) -> bool {
        self.junction(r).enqueued.contains(EnqueuedMask::bit(d))
    }

    pub(crate) fn clear_enqueued(&mut self, r: JRef, d: Dir) {
        self.junction_mut(r).enqueued.remove(EnqueuedMask::bit(d));
    }

    pub(crate) fn enqueue(&mut self, sink: &mut Sink<'_>, r: JRef, d: Dir) {
        if let Sink::Queue(q) = sink {
            if !self.is_enqueued(r, d) {
                q.push((r, d));
                self.junction_mut(r).enqueued.insert(EnqueuedMask::bit(d));
            }
        }
    }

    pub(crate) fn live_box_indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.boxes
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.is_some().then_some(i as u32))
    }
}
