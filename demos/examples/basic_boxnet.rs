// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of boxnet: add boxes, move one, and find overlapping pairs.

use boxnet::Boxnet;

fn main() {
    let mut net: Boxnet<&str> = Boxnet::new();
    let a = net.add_box(0.0, 0.0, 10.0, 10.0, None, "a");
    let b = net.add_box(5.0, 5.0, 15.0, 15.0, Some(a), "b");
    let _c = net.add_box(100.0, 100.0, 110.0, 110.0, Some(a), "c");

    let mut pairs = Vec::new();
    net.collide(|x, y| pairs.push((x, y)));
    println!("overlaps before move: {}", pairs.len());

    // Move b far away from a and c in place; the graph stays valid until
    // the next `collide`, which repairs it before reporting overlaps.
    net.set_bounds(b, 500.0, 500.0, 510.0, 510.0);

    let mut pairs = Vec::new();
    net.collide(|x, y| pairs.push((x, y)));
    println!("overlaps after move: {}", pairs.len());
}
