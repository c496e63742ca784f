// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Boxnet: an incremental broadphase index for axis-aligned bounding boxes.
//!
//! Boxes are connected by a planar graph of horizontal and vertical rays
//! shot from each box's corners. Moving a box only disturbs the rays near
//! it, so `collide` after a handful of small moves is much cheaper than
//! rebuilding a tree from scratch — the trade is a broadphase that only
//! reports overlapping pairs, with no spatial query API of its own.
//!
//! - Add and remove boxes with [`Boxnet::add_box`] and [`Boxnet::remove`].
//! - Find every overlapping pair with [`Boxnet::collide`].
//! - [`Boxnet::get`] reads back a live box's bounds and payload.
//!
//! It is generic over the payload type `U` attached to each box, and has no
//! opinion on what that payload is.
//!
//! # Example
//!
//! ```rust
//! use boxnet::Boxnet;
//!
//! let mut net: Boxnet<&str> = Boxnet::new();
//! let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, "a");
//! let _b = net.add_box(5.0, 5.0, 15.0, 15.0, Some(a), "b");
//! let _c = net.add_box(100.0, 100.0, 110.0, 110.0, Some(a), "c");
//!
//! let mut pairs = Vec::new();
//! net.collide(|x, y| pairs.push((x, y)));
//! assert_eq!(pairs.len(), 1);
//! ```
//!
//! ## Coordinates
//!
//! Boxes are given as `(posx, posy, right, top)` with `right >= posx` and
//! `top >= posy`; there is no constraint on sign or magnitude beyond that.
//! The graph only reasons about relative order between boxes, so it works
//! the same across any `f64` range a caller needs.

#![no_std]

extern crate alloc;

mod collide;
mod dir;
mod insert;
mod junction;
mod net;
mod repair;

pub use dir::{ALL_DIRS, Dir};
pub use net::{BoxId, Boxnet};

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[test]
    fn add_then_get_round_trips_bounds_and_payload() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, 7);
        let (payload, bounds) = net.get(a).expect("just-inserted box should be live");
        assert_eq!(*payload, 7);
        assert_eq!(bounds, [0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn get_returns_none_after_remove() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, 1);
        net.remove(a);
        assert!(net.get(a).is_none());
    }

    #[test]
    fn stale_handle_after_reuse_is_rejected() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let a = net.add_box(0.0, 0.0, 1.0, 1.0, None, 1);
        net.remove(a);
        let b = net.add_box(0.0, 0.0, 1.0, 1.0, None, 2);
        assert_eq!(a.raw(), b.raw(), "free list should reuse the freed slot");
        assert!(net.get(a).is_none());
        assert_eq!(net.get(b).map(|(u, _)| *u), Some(2));
    }

    #[test]
    fn disjoint_boxes_do_not_collide() {
        let mut net: Boxnet<u32> = Boxnet::new();
        net.add_box(0.0, 0.0, 1.0, 1.0, None, 1);
        net.add_box(100.0, 100.0, 101.0, 101.0, None, 2);
        let mut pairs = Vec::new();
        net.collide(|x, y| pairs.push((x, y)));
        assert!(pairs.is_empty());
    }

    #[test]
    fn overlapping_boxes_collide_exactly_once() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, 1);
        let b = net.add_box(5.0, 5.0, 15.0, 15.0, Some(a), 2);
        let mut pairs = Vec::new();
        net.collide(|x, y| pairs.push((x, y)));
        assert_eq!(pairs.len(), 1);
        let (p, q) = pairs[0];
        let mut ids = [p, q];
        ids.sort_by_key(BoxId::raw);
        let mut expected = [a, b];
        expected.sort_by_key(BoxId::raw);
        assert_eq!(ids, expected);
    }

    #[test]
    fn moving_a_box_in_place_stops_reporting_collisions() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, 1);
        let b = net.add_box(5.0, 5.0, 15.0, 15.0, Some(a), 2);
        net.set_bounds(b, 1000.0, 1000.0, 1010.0, 1010.0);
        let mut pairs = Vec::new();
        net.collide(|x, y| pairs.push((x, y)));
        assert!(pairs.is_empty());
    }

    #[test]
    fn many_boxes_in_a_row_each_collide_with_their_neighbor() {
        let mut net: Boxnet<u32> = Boxnet::new();
        let mut anchor = None;
        for i in 0..32u32 {
            #[allow(clippy::cast_precision_loss, reason = "test coordinates fit exactly in f64")]
            let x = (i * 5) as f64;
            let id = net.add_box(x, 0.0, x + 8.0, 10.0, anchor, i);
            anchor = Some(id);
        }
        let mut pairs = Vec::new();
        net.collide(|x, y| pairs.push((x, y)));
        // box i overlaps box i+1 (3-unit overlap) but box i+2 is two units clear.
        assert_eq!(pairs.len(), 31);
    }

    #[test]
    fn remove_by_user_data_finds_matching_box() {
        let mut net: Boxnet<&str> = Boxnet::new();
        net.add_box(0.0, 0.0, 1.0, 1.0, None, "keep");
        let target = net.add_box(2.0, 2.0, 3.0, 3.0, None, "drop");
        net.remove_by_user_data(&"drop");
        assert!(net.get(target).is_none());
        assert_eq!(net.len(), 1);
    }
}
