// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broadphase collision enumeration: repairs the ray graph, then walks each
//! box's rays to find every other box whose AABB overlaps it, reporting
//! each overlapping pair exactly once.

use alloc::vec::Vec;

use crate::dir::Dir;
use crate::junction::{JRef, JunctionKind};
use crate::net::{BoxId, Boxnet, Sink};

impl<U> Boxnet<U> {
    /// Repairs the graph, then reports every overlapping pair of boxes to
    /// `on_pair` exactly once.
    ///
    /// Assumes `on_pair` does not call [`Boxnet::remove`] or
    /// [`Boxnet::remove_by_user_data`] — doing so during the scan would
    /// invalidate the ray walk.
    pub fn collide<F: FnMut(BoxId, BoxId)>(&mut self, mut on_pair: F) {
        self.repair();

        let indices: Vec<u32> = self.live_box_indices().collect();
        for &b in &indices {
            self.box_mut(b).marked = None;
            self.normalize_rightward(b);
        }
        for &b in &indices {
            self.boxcollisions(b, &mut on_pair);
        }
    }

    /// Flips any leftward-facing terminus found while walking rightward
    /// from `b`'s center, within `b`'s own right edge. `boxcollisions`
    /// assumes the lower edge of every box stands entirely on rays, which
    /// only holds once this pass has run.
    fn normalize_rightward(&mut self, b: u32) {
        let right = self.box_ref(b).right;
        let mut next = self.nb(JRef::center(b), Dir::Right);
        while let Some(n) = next {
            let owner = self.pos_of(n, 0);
            if self.axis_value(owner, 0) > right {
                break;
            }
            let cur = if matches!(self.kind(n), JunctionKind::Terminus { term: Dir::Left, .. }) {
                self.flip(n, &mut Sink::Discard)
            } else {
                n
            };
            next = self.nb(cur, Dir::Right);
        }
    }

    /// Finds every box overlapping `origin`'s AABB by flood-filling outward
    /// along rays from box centers already known to be in range, reporting
    /// each pair via `on_pair` the first time it's discovered.
    ///
    /// Does not find collisions symmetrically: a pair `(a, b)` is reported
    /// only while processing one of the two, never both.
    fn boxcollisions(&mut self, origin: u32, on_pair: &mut impl FnMut(BoxId, BoxId)) {
        let mut queue = core::mem::take(&mut self.collide_scratch);
        queue.clear();
        queue.push(origin);

        let origin_posx = self.box_ref(origin).posx;
        let origin_right = self.box_ref(origin).right;
        let origin_top = self.box_ref(origin).top;

        while let Some(cur) = queue.pop() {
            let jnc = JRef::center(cur);

            let mut root = Some(jnc);
            while let Some(r) = root {
                if matches!(self.kind(r), JunctionKind::Terminus { term: Dir::Right, .. }) {
                    break;
                }
                if self.axis_value(self.pos_of(r, 0), 0) <= origin_posx {
                    break;
                }
                if !matches!(self.kind(r), JunctionKind::Terminus { term: Dir::Down, .. }) {
                    let mut next = self.nb(r, Dir::Up);
                    while let Some(n) = next {
                        if self.axis_value(self.pos_of(n, 1), 1) > origin_top {
                            break;
                        }
                        if !matches!(self.kind(n), JunctionKind::Terminus { term: Dir::Right, .. })
                        {
                            let append = self.pos_of(n, 1);
                            self.queue_append(origin, append, &mut queue, on_pair);
                            break;
                        }
                        next = self.nb(n, Dir::Up);
                    }
                }
                root = self.nb(r, Dir::Left);
            }

            let mut root = Some(jnc);
            while let Some(r) = root {
                if matches!(self.kind(r), JunctionKind::Terminus { term: Dir::Left, .. }) {
                    break;
                }
                if self.axis_value(self.pos_of(r, 0), 0) > origin_right {
                    break;
                }
                if !matches!(self.kind(r), JunctionKind::Terminus { term: Dir::Down, .. }) {
                    let mut next = self.nb(r, Dir::Up);
                    while let Some(n) = next {
                        if self.axis_value(self.pos_of(n, 1), 1) > origin_top {
                            break;
                        }
                        if !matches!(self.kind(n), JunctionKind::Terminus { term: Dir::Left, .. }) {
                            let append = self.pos_of(n, 1);
                            self.queue_append(origin, append, &mut queue, on_pair);
                            break;
                        }
                        next = self.nb(n, Dir::Up);
                    }
                }
                root = self.nb(r, Dir::Right);
            }
        }

        self.collide_scratch = queue;
    }

    fn queue_append(
        &mut self,
        origin: u32,
        append: u32,
        queue: &mut Vec<u32>,
        on_pair: &mut impl FnMut(BoxId, BoxId),
    ) {
        if self.box_ref(append).marked == Some(origin) {
            return;
        }
        self.box_mut(append).marked = Some(origin);

        let origin_box = self.box_ref(origin);
        let (origin_posx, origin_right, origin_gen) =
            (origin_box.posx, origin_box.right, origin_box.generation);
        let append_box = self.box_ref(append);
        let (append_posx, append_right, append_gen) =
            (append_box.posx, append_box.right, append_box.generation);

        if append_posx <= origin_right && append_right >= origin_posx {
            on_pair(
                BoxId::new(origin, origin_gen),
                BoxId::new(append, append_gen),
            );
        }
        queue.push(append);
    }
}
