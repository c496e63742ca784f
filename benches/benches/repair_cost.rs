// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use boxnet::Boxnet;
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_grid_boxes(n: usize, cell: f64) -> Vec<[f64; 4]> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            out.push([x0, y0, x0 + cell, y0 + cell]);
        }
    }
    out
}

fn gen_random_boxes(count: usize, max_w: f64, max_h: f64, w: f64, h: f64) -> Vec<[f64; 4]> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let x0 = rng.next_f64() * (max_w - w).max(1.0);
        let y0 = rng.next_f64() * (max_h - h).max(1.0);
        out.push([x0, y0, x0 + w, y0 + h]);
    }
    out
}

fn build(boxes: &[[f64; 4]]) -> Boxnet<u32> {
    let mut net = Boxnet::new();
    let mut anchor = None;
    for (i, b) in boxes.iter().enumerate() {
        let id = net.add_box(b[0], b[1], b[2], b[3], anchor, i as u32);
        anchor = Some(id);
    }
    net
}

fn bench_build_and_collide(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_and_collide");
    for &n in &[16usize, 32, 64] {
        let boxes = gen_grid_boxes(n, 10.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_function(format!("grid_n{n}"), |b| {
            b.iter_batched(
                || boxes.clone(),
                |boxes| {
                    let mut net = build(&boxes);
                    let mut pairs = 0usize;
                    net.collide(|_, _| pairs += 1);
                    black_box(pairs);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_move_and_recollide(c: &mut Criterion) {
    let mut group = c.benchmark_group("move_and_recollide");
    let boxes = gen_random_boxes(2048, 2000.0, 2000.0, 12.0, 12.0);
    for &step in &[1.0, 10.0, 100.0] {
        group.bench_function(format!("step_{step}"), |b| {
            b.iter_batched(
                || {
                    let mut net = build(&boxes);
                    let mut pairs = 0usize;
                    net.collide(|_, _| pairs += 1);
                    net
                },
                |mut net| {
                    let moved = net.add_box(step, step, step + 12.0, step + 12.0, None, u32::MAX);
                    let mut pairs = 0usize;
                    net.collide(|_, _| pairs += 1);
                    net.remove(moved);
                    black_box(pairs);
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_and_collide, bench_move_and_recollide);
criterion_main!(benches);
