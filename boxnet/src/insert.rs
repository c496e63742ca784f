// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grafting a freshly allocated box's center junction onto an existing ray
//! graph, without yet knowing whether its coordinates are consistent with
//! its new neighbors — that's [`crate::Boxnet::collide`]'s job, via `repair`.

use crate::dir::Dir;
use crate::junction::{JRef, JunctionKind};
use crate::net::Boxnet;

impl<U> Boxnet<U> {
    /// Splices `new_box`'s center junction into the graph next to `start`,
    /// shooting a ray in all four directions from the insertion point.
    ///
    /// `start` must already be part of the graph; the new junction ends up
    /// topologically adjacent to it but not necessarily spatially correct.
    pub(crate) fn insert_junction(&mut self, new_box: u32, start: JRef) {
        let initdir = match self.kind(start) {
            JunctionKind::Center => Dir::Up,
            JunctionKind::Terminus { term, .. } => term,
            JunctionKind::Detached => panic!("insert_junction: start must be a live junction"),
        };
        // Shared across both sweeps, as in the original: once one sweep has
        // linked all four of the new center's sides, the other must do
        // nothing, or it would re-insert into already-live slots.
        let mut inserted = 0u8;
        self.insert_sweep(new_box, start, initdir, Dir::ccw, &mut inserted);
        self.insert_sweep(new_box, start, initdir.ccw(), Dir::cw, &mut inserted);
    }

    /// Walks from `start` in direction `start_dir`, stepping with `step`
    /// each time a ray gets inserted, until `inserted` reaches 4 (shared
    /// with the other sweep, since together they must place exactly four
    /// rays).
    fn insert_sweep(
        &mut self,
        new_box: u32,
        start: JRef,
        start_dir: Dir,
        step: fn(Dir) -> Dir,
        inserted: &mut u8,
    ) {
        let mut cur = start;
        let mut curdir = start_dir;
        while *inserted != 4 {
            let next = self.nb(cur, curdir);
            let should_insert = match next {
                None => true,
                Some(n) => {
                    let expected = step(curdir).opposite();
                    match self.kind(n) {
                        JunctionKind::Center => true,
                        JunctionKind::Terminus { term, .. } => term != expected,
                        JunctionKind::Detached => {
                            unreachable!("insert_junction: next cannot be detached")
                        }
                    }
                }
            };
            if should_insert {
                self.insert_one(new_box, cur, curdir, next, step);
                *inserted += 1;
                if next.is_none() {
                    return;
                }
                curdir = step(curdir);
            }
            cur = next.expect("insert_junction: walk ended before all four rays landed");
        }
    }

    /// Inserts one new ray-end junction between `cur` and `next` (which may
    /// be absent, meaning the open end of a ray), owning direction
    /// `step(curdir)` off of `new_box`'s center.
    fn insert_one(
        &mut self,
        new_box: u32,
        cur: JRef,
        curdir: Dir,
        next: Option<JRef>,
        step: fn(Dir) -> Dir,
    ) {
        let new_term = step(curdir);
        let newjnc = JRef::rayend(new_box, new_term);

        let new_beam = match self.kind(cur) {
            JunctionKind::Center => curdir,
            JunctionKind::Terminus { term, beam } => {
                if curdir == term {
                    curdir.opposite()
                } else {
                    beam
                }
            }
            JunctionKind::Detached => unreachable!("insert_junction: cur cannot be detached"),
        };
        self.set_terminus(newjnc, new_term, new_beam);

        let axis = curdir.owner_pos_index();
        self.set_pos(newjnc, axis, self.pos_of(cur, axis));

        self.set_nb(newjnc, curdir.opposite(), Some(cur));
        self.set_nb(cur, curdir, Some(newjnc));
        self.set_nb(newjnc, curdir, next);
        if let Some(n) = next {
            self.set_nb(n, curdir.opposite(), Some(newjnc));
        }
        self.set_nb(newjnc, new_term, Some(JRef::center(new_box)));
        self.set_nb(JRef::center(new_box), new_term.opposite(), Some(newjnc));
    }
}
