// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The repair engine: restores invariant 3 (topological order matches
//! numeric coordinates) after boxes move, without touching the coordinates
//! themselves.
//!
//! `flip` turns a T-junction's terminating ray into the continuing one and
//! vice versa; `slide` and `slide_T` locally swap a junction past its
//! neighbor along one axis. `repair` drives both from a double-buffered
//! work queue seeded from every box.

use alloc::vec::Vec;

use crate::dir::{ALL_DIRS, Dir};
use crate::junction::{JRef, JunctionKind};
use crate::net::{Boxnet, Sink};

impl<U> Boxnet<U> {
    /// Detaches a live T-junction from the graph, as if its ray had been
    /// removed. The caller is responsible for relinking or discarding it.
    pub(crate) fn detach(&mut self, r: JRef) {
        let (_, beam) = self.terminus(r);
        let next = self.nb(r, beam);
        let prev = self
            .nb(r, beam.opposite())
            .expect("detach: terminating ray has no predecessor");
        self.set_nb(prev, beam, next);
        if let Some(n) = next {
            self.set_nb(n, beam.opposite(), Some(prev));
        }
        self.set_detached(r);
    }

    /// True if `r` and its neighbor in direction `d` disagree with the
    /// numeric coordinates they're meant to reflect.
    pub(crate) fn needs_flip(&self, r: JRef, d: Dir) -> bool {
        let nb = self.nb(r, d).expect("needs_flip: missing neighbor");
        let axis = d.compare_axis();
        let nb_val = self.axis_value(self.pos_of(nb, axis), axis);
        let r_val = self.axis_value(self.pos_of(r, axis), axis);
        if nb_val == r_val {
            return false;
        }
        let wrong_side = matches!(d, Dir::Left | Dir::Down);
        (nb_val < r_val) != wrong_side
    }

    /// Swaps the positions of `start` and `next` along axis `d`, splicing
    /// each into where the other used to be.
    fn reconnect_linear(&mut self, start: JRef, next: JRef, d: Dir) {
        let next_far = self.nb(next, d);
        self.set_nb(start, d, next_far);
        if let Some(nf) = next_far {
            self.set_nb(nf, d.opposite(), Some(start));
        }
        let start_far = self.nb(start, d.opposite());
        self.set_nb(next, d.opposite(), start_far);
        if let Some(sf) = start_far {
            self.set_nb(sf, d, Some(next));
        }
        self.set_nb(start, d.opposite(), Some(next));
        self.set_nb(next, d, Some(start));
    }

    fn reinsert_should_stop(&self, dir: Dir, flipped: JRef, next: JRef) -> bool {
        let axis = dir.compare_axis();
        let fv = self.axis_value(self.pos_of(flipped, axis), axis);
        let nv = self.axis_value(self.pos_of(next, axis), axis);
        match dir {
            Dir::Up | Dir::Right => fv > nv,
            Dir::Left | Dir::Down => fv < nv,
        }
    }

    /// Flips the single T-junction `jnc`: its terminating ray becomes the
    /// one that continues, and the ray that used to continue through it now
    /// terminates here instead. Returns the junction's new address (flipping
    /// repurposes a different box's ray-end slot, so the address changes).
    fn flip_one(&mut self, jnc: JRef, sink: &mut Sink<'_>) -> JRef {
        let (term, beam) = self.terminus(jnc);

        if let Some(continuing) = self.nb(jnc, beam) {
            let (_, continuing_beam) = self.terminus(continuing);
            let reported = self
                .nb(continuing, continuing_beam.opposite())
                .expect("flip_one: continuing ray has no predecessor to report");
            self.enqueue(sink, reported, continuing_beam);
            self.detach(continuing);
        }

        let new_term = beam.opposite();
        let new_beam = term.opposite();

        let sel = term.compare_axis();
        let flip_owner = self.pos_of(jnc, sel);
        let flipped = JRef::rayend(flip_owner, new_term);
        debug_assert_eq!(self.pos_of(flipped, sel), flip_owner);
        self.set_pos(flipped, 1 - sel, self.pos_of(jnc, 1 - sel));
        self.set_terminus(flipped, new_term, new_beam);

        let far_through = self.nb(jnc, new_term);
        self.set_nb(flipped, new_term, far_through);
        if let Some(ft) = far_through {
            self.set_nb(ft, beam, Some(flipped));
        }
        let stub_back = self
            .nb(jnc, term)
            .expect("flip_one: terminating ray has no predecessor");
        self.set_nb(flipped, term, Some(stub_back));
        self.set_nb(stub_back, new_beam, Some(flipped));
        self.set_detached(jnc);

        // reconnect the loose end: walk past whatever shares our old
        // terminus direction, then find where the new beam ray belongs.
        let mut cur = far_through.expect("flip_one: flipped junction has no far-side neighbor");
        while let JunctionKind::Terminus { term: t, .. } = self.kind(cur) {
            if t != term {
                break;
            }
            cur = self
                .nb(cur, new_term)
                .expect("flip_one: ray runs off past same-direction termini");
        }
        loop {
            let Some(c) = self.nb(cur, new_beam) else {
                self.set_nb(flipped, new_beam, None);
                return flipped;
            };
            cur = c;
            if !matches!(self.kind(cur), JunctionKind::Terminus { term: t, .. } if t == new_term) {
                break;
            }
        }

        let mut next = self.nb(cur, beam);
        loop {
            let Some(n) = next else { break };
            let is_beam_term =
                matches!(self.kind(n), JunctionKind::Terminus { term: t, .. } if t == new_beam);
            if !is_beam_term || self.reinsert_should_stop(new_term, flipped, n) {
                break;
            }
            cur = n;
            next = self.nb(cur, beam);
        }

        let newjnc_beam = match self.kind(cur) {
            JunctionKind::Center => beam,
            JunctionKind::Terminus { term: t, .. } if t == beam => new_term,
            JunctionKind::Terminus { beam: b, .. } => b,
            JunctionKind::Detached => unreachable!("flip_one: cur cannot be detached mid-walk"),
        };

        let find_idx = new_beam.owner_pos_index();
        let njo = self.pos_of(flipped, find_idx);
        let newjnc = JRef::rayend(njo, new_beam.opposite());
        debug_assert_eq!(self.pos_of(newjnc, find_idx), njo);
        self.set_pos(newjnc, 1 - find_idx, self.pos_of(cur, 1 - find_idx));
        self.set_terminus(newjnc, new_beam.opposite(), newjnc_beam);

        self.set_nb(newjnc, term, Some(flipped));
        self.set_nb(flipped, new_beam, Some(newjnc));
        self.set_nb(newjnc, beam, next);
        if let Some(n) = next {
            self.set_nb(n, new_term, Some(newjnc));
        }
        self.set_nb(newjnc, new_term, Some(cur));
        self.set_nb(cur, beam, Some(newjnc));

        self.enqueue(sink, newjnc, newjnc_beam);
        self.enqueue(sink, flipped, new_beam);
        let far = self
            .nb(newjnc, newjnc_beam.opposite())
            .expect("flip_one: newjnc missing far neighbor for queueing");
        self.enqueue(sink, far, newjnc_beam);

        flipped
    }

    /// Flips an entire run of T-junctions sharing `jnc`'s beam direction, so
    /// that the ray terminating at the far end of the run now terminates at
    /// `jnc` instead.
    pub(crate) fn flip(&mut self, jnc: JRef, sink: &mut Sink<'_>) -> JRef {
        let (_, beam) = self.terminus(jnc);
        let mut cur = jnc;
        loop {
            let Some(next) = self.nb(cur, beam) else {
                break;
            };
            if matches!(self.kind(next), JunctionKind::Terminus { term, .. } if term == beam.opposite())
            {
                break;
            }
            cur = next;
        }
        loop {
            if cur == jnc {
                return self.flip_one(cur, sink);
            }
            cur = self.flip_one(cur, sink);
            cur = self.nb(cur, beam.opposite()).expect("flip: cascade lost its ray");
        }
    }

    /// Slides a center junction past its neighbor in direction `tdir`,
    /// trading places with it.
    fn slide(&mut self, jnc: JRef, tdir: Dir, sink: &mut Sink<'_>) {
        debug_assert!(jnc.is_center());
        debug_assert!(self.needs_flip(jnc, tdir));

        let mut bar = self.nb(jnc, tdir).expect("slide: no neighbor to slide past");
        if matches!(self.kind(bar), JunctionKind::Terminus { term, .. } if term == tdir.opposite())
        {
            bar = self.flip(bar, sink);
        }
        let ndir = match self.kind(bar) {
            JunctionKind::Terminus { term, .. } => term,
            other => panic!("slide: bar is not a T-junction: {other:?}"),
        };

        let mut next = self
            .nb(jnc, ndir)
            .expect("slide: jnc has no neighbor in bar's direction");
        if !matches!(self.kind(next), JunctionKind::Terminus { term, .. } if term == ndir.opposite())
        {
            next = self.flip(next, sink);
        }

        let (_, next_beam) = self.terminus(next);
        let reported = self
            .nb(next, next_beam.opposite())
            .expect("slide: removed ray has no predecessor to report");
        self.enqueue(sink, reported, next_beam);
        self.detach(next);

        self.reconnect_linear(jnc, bar, tdir);
        self.set_terminus(bar, ndir, tdir.opposite());
        self.enqueue(sink, jnc, tdir);
        self.enqueue(sink, bar, tdir.opposite());

        // reinsert the removed ray after the junction it was swapped past
        let mut cur = self
            .nb(bar, ndir)
            .expect("slide: bar has no neighbor to reinsert before");
        while let JunctionKind::Terminus { term, .. } = self.kind(cur) {
            if term != tdir.opposite() {
                break;
            }
            cur = self
                .nb(cur, ndir)
                .expect("slide: ray runs off while walking past reversed termini");
        }

        let newjnc_beam = match self.kind(cur) {
            JunctionKind::Center => tdir,
            JunctionKind::Terminus { term, .. } if term == tdir => tdir.opposite(),
            JunctionKind::Terminus { beam, .. } => beam,
            JunctionKind::Detached => unreachable!("slide: cur cannot be detached mid-walk"),
        };

        let assert_idx = tdir.compare_axis();
        let set_idx = tdir.owner_pos_index();
        let newjnc = JRef::rayend(jnc.b, ndir.opposite());
        debug_assert_eq!(self.pos_of(newjnc, assert_idx), self.pos_of(jnc, assert_idx));
        self.set_pos(newjnc, set_idx, self.pos_of(cur, set_idx));
        self.set_terminus(newjnc, ndir.opposite(), newjnc_beam);

        self.set_nb(newjnc, ndir.opposite(), Some(jnc));
        self.set_nb(jnc, ndir, Some(newjnc));
        let far = self.nb(cur, tdir);
        self.set_nb(newjnc, tdir, far);
        if let Some(f) = far {
            self.set_nb(f, tdir.opposite(), Some(newjnc));
        }
        self.set_nb(newjnc, tdir.opposite(), Some(cur));
        self.set_nb(cur, tdir, Some(newjnc));

        self.enqueue(sink, newjnc, newjnc_beam);
        let far2 = self
            .nb(newjnc, newjnc_beam.opposite())
            .expect("slide: newjnc missing far neighbor for queueing");
        self.enqueue(sink, far2, newjnc_beam);
        self.enqueue(sink, jnc, ndir);
    }

    /// Slides two T-junctions sharing a beam direction past each other.
    fn slide_t(&mut self, jnc: JRef, sink: &mut Sink<'_>) {
        let (term, beam) = self.terminus(jnc);
        debug_assert!(self.needs_flip(jnc, beam));

        let mut next = self.nb(jnc, beam).expect("slide_t: no neighbor to slide past");
        let (next_term, next_beam) = self.terminus(next);
        if next_term == term || next_beam == term.opposite() {
            return;
        }
        if beam != next_beam {
            next = self.flip(next, sink);
        }
        let (next_term, next_beam) = self.terminus(next);
        debug_assert_eq!(beam, next_beam);
        debug_assert_eq!(term, next_term.opposite());

        self.reconnect_linear(jnc, next, beam);
        self.enqueue(sink, jnc, beam);
        if let Some(far) = self.nb(next, beam.opposite()) {
            self.enqueue(sink, far, beam);
        }
    }

    fn dispatch(&mut self, r: JRef, d: Dir, sink: &mut Sink<'_>) {
        self.clear_enqueued(r, d);
        if matches!(self.kind(r), JunctionKind::Detached) {
            return;
        }
        if self.nb(r, d).is_none() {
            return;
        }
        if !self.needs_flip(r, d) {
            return;
        }
        match self.kind(r) {
            JunctionKind::Center => self.slide(r, d, sink),
            JunctionKind::Terminus { beam, .. } if beam == d => self.slide_t(r, sink),
            _ => {}
        }
    }

    /// Restores invariant 3 (topological order matches the boxes' actual
    /// coordinates) across the whole graph. Idempotent: repairing an
    /// already-consistent net is a no-op.
    pub(crate) fn repair(&mut self) {
        let mut q1 = core::mem::take(&mut self.repair_scratch.a);
        let mut q2 = core::mem::take(&mut self.repair_scratch.b);
        q1.clear();
        q2.clear();

        let boxes: Vec<u32> = self.live_box_indices().collect();
        for b in boxes {
            for d in ALL_DIRS {
                self.enqueue(&mut Sink::Queue(&mut q1), JRef::center(b), d);
                let r = JRef::rayend(b, d);
                if let JunctionKind::Terminus { beam, .. } = self.kind(r) {
                    self.enqueue(&mut Sink::Queue(&mut q1), r, beam);
                }
            }
            while !q1.is_empty() || !q2.is_empty() {
                while let Some((r, d)) = q1.pop() {
                    self.dispatch(r, d, &mut Sink::Queue(&mut q2));
                }
                while let Some((r, d)) = q2.pop() {
                    self.dispatch(r, d, &mut Sink::Queue(&mut q1));
                }
            }
        }

        self.repair_scratch.a = q1;
        self.repair_scratch.b = q2;
    }
}
