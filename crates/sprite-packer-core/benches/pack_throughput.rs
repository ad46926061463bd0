use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use image::{Rgba, RgbaImage};
use sprite_packer_core::compositing::alpha_bleed;
use sprite_packer_core::prelude::*;

fn generate_arena(count: usize, min_size: u32, max_size: u32) -> SpriteArena {
    use rand::{Rng, SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
    let mut arena = SpriteArena::new();
    for i in 0..count {
        let w = rng.gen_range(min_size..=max_size);
        let h = rng.gen_range(min_size..=max_size);
        arena.insert_rgba(RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255])), format!("tex_{i}"));
    }
    arena
}

fn bench_rank_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank_strategies");

    for count in [50, 100, 200] {
        let arena = generate_arena(count, 16, 64);
        group.throughput(Throughput::Elements(count as u64));

        for (label, strategy) in [
            ("BSSF", RankStrategy::BestShortSideFit),
            ("BLSF", RankStrategy::BestLongSideFit),
            ("BAF", RankStrategy::BestAreaFit),
        ] {
            let settings = PackSettings::builder()
                .with_max_dimensions(2048, 2048)
                .rank_strategy(strategy)
                .build();
            group.bench_with_input(BenchmarkId::new(label, count), &arena, |b, arena| {
                b.iter(|| black_box(pack_sprites(arena, &settings)))
            });
        }
    }

    group.finish();
}

fn bench_expand_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("expand_strategies");
    let arena = generate_arena(150, 8, 96);

    for (label, strategy) in [
        ("Both", ExpandStrategy::ExpandBoth),
        ("ShortSide", ExpandStrategy::ExpandShortSide),
        ("LongSide", ExpandStrategy::ExpandLongSide),
    ] {
        for pot in [false, true] {
            let settings = PackSettings::builder()
                .with_max_dimensions(2048, 2048)
                .expand_strategy(strategy)
                .force_pot(pot)
                .build();
            let id = BenchmarkId::new(label, if pot { "pot" } else { "step" });
            group.bench_with_input(id, &arena, |b, arena| {
                b.iter(|| black_box(pack_sprites(arena, &settings)))
            });
        }
    }

    group.finish();
}

fn bench_alpha_bleed(c: &mut Criterion) {
    let mut group = c.benchmark_group("alpha_bleed");
    let mut base = RgbaImage::new(512, 512);
    for y in (0..512).step_by(32) {
        for x in (0..512).step_by(32) {
            for dy in 0..16 {
                for dx in 0..16 {
                    base.put_pixel(x + dx, y + dy, Rgba([200, 80, 40, 255]));
                }
            }
        }
    }
    for iterations in [1, 4, 8] {
        group.bench_with_input(BenchmarkId::from_parameter(iterations), &base, |b, base| {
            b.iter(|| {
                let mut img = base.clone();
                alpha_bleed(&mut img, iterations);
                black_box(img)
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_rank_strategies,
    bench_expand_strategies,
    bench_alpha_bleed
);
criterion_main!(benches);
