// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Junction data model: the nodes of the boxnet ray graph.
//!
//! A junction is addressed by a [`JRef`] — `(box index, slot)` — rather than
//! a pointer, per the index-arena approach: every junction is owned inline by
//! exactly one [`crate::net::BoxSlot`], and the graph never heap-allocates a
//! standalone node.

use crate::dir::Dir;

bitflags::bitflags! {
    /// Per-direction "already queued for repair" marker on a [`Junction`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct EnqueuedMask: u8 {
        const UP = 0b0001;
        const LEFT = 0b0010;
        const DOWN = 0b0100;
        const RIGHT = 0b1000;
    }
}

impl EnqueuedMask {
    pub(crate) const fn bit(d: Dir) -> Self {
        Self::from_bits_truncate(1 << d.code())
    }
}

/// Address of a junction: the box that owns it, and which of the box's five
/// junctions it is.
///
/// `slot = None` selects the box's center junction; `slot = Some(d)` selects
/// the ray-end junction whose own terminating direction is `d` (equivalently,
/// `box.rayend[d]`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct JRef {
    pub(crate) b: u32,
    pub(crate) slot: Option<Dir>,
}

impl JRef {
    pub(crate) const fn center(b: u32) -> Self {
        Self { b, slot: None }
    }

    pub(crate) const fn rayend(b: u32, d: Dir) -> Self {
        Self { b, slot: Some(d) }
    }

    pub(crate) const fn is_center(self) -> bool {
        self.slot.is_none()
    }
}

/// What a junction currently represents.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum JunctionKind {
    /// The center of a box; rays depart in all four directions.
    Center,
    /// A T-junction: `term` is the direction in which this junction's own
    /// ray terminates; `beam` is the direction of the crossing ray that
    /// continues through it (the crossing ray also extends `beam.opposite()`).
    Terminus { term: Dir, beam: Dir },
    /// A ray-end slot with no live outgoing ray.
    Detached,
}

/// A node in the boxnet ray graph.
#[derive(Clone, Debug)]
pub(crate) struct Junction {
    /// Neighbor in each of the four directions, if any.
    pub(crate) nb: [Option<JRef>; 4],
    /// `pos[0]` owns this junction's x anchor, `pos[1]` its y anchor — each a
    /// box index. For a center junction both point at the owning box.
    pub(crate) pos: [u32; 2],
    pub(crate) kind: JunctionKind,
    pub(crate) enqueued: EnqueuedMask,
}

impl Junction {
    pub(crate) fn center(owner: u32) -> Self {
        Self {
            nb: [None; 4],
            pos: [owner, owner],
            kind: JunctionKind::Center,
            enqueued: EnqueuedMask::empty(),
        }
    }

    /// A fresh ray-end slot for direction `d`, not yet part of any ray.
    ///
    /// `pos[d.owner_pos_index()]` is fixed to `owner` for the slot's entire
    /// lifetime, live or not; the other axis is filled in whenever the slot
    /// becomes a live terminus.
    pub(crate) fn detached_rayend(owner: u32, d: Dir) -> Self {
        Self {
            nb: [None; 4],
            pos: [owner, owner],
            kind: JunctionKind::Detached,
            enqueued: EnqueuedMask::empty(),
        }
        .with_owner_axis(d, owner)
    }

    fn with_owner_axis(mut self, d: Dir, owner: u32) -> Self {
        self.pos[d.owner_pos_index()] = owner;
        self
    }
}
