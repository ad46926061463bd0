use image::{DynamicImage, Rgba, RgbaImage};
use rand::{Rng, SeedableRng};
use sprite_packer_core::prelude::*;

fn solid(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([90, 160, 220, 255]))
}

fn arena_of(sizes: &[(u32, u32)]) -> SpriteArena {
    let mut arena = SpriteArena::new();
    for (i, &(w, h)) in sizes.iter().enumerate() {
        arena.insert_rgba(solid(w, h), format!("sprite_{i}.png"));
    }
    arena
}

fn random_sizes(seed: u64, n: usize) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (rng.gen_range(1..=48), rng.gen_range(1..=48)))
        .collect()
}

fn assert_well_formed(atlases: &[SealedAtlas], settings: &PackSettings) {
    let bp = settings.border_padding as i32;
    for atlas in atlases {
        assert!(atlas.width() <= settings.max_width);
        assert!(atlas.height() <= settings.max_height);
        let placed = atlas.placed();
        for p in placed {
            assert!(p.rect.left() >= bp && p.rect.top() >= bp, "{p:?}");
            assert!(p.rect.right() <= atlas.width() as i32 - bp, "{p:?}");
            assert!(p.rect.bottom() <= atlas.height() as i32 - bp, "{p:?}");
        }
        for i in 0..placed.len() {
            for j in (i + 1)..placed.len() {
                let a = atlas.footprint(&placed[i]);
                let b = atlas.footprint(&placed[j]);
                assert!(!a.overlaps(&b), "{a:?} overlaps {b:?}");
            }
        }
    }
}

#[test]
fn every_sprite_is_placed_once() {
    let sizes = random_sizes(7, 60);
    let arena = arena_of(&sizes);
    let settings = PackSettings::builder().with_max_dimensions(256, 256).build();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    let mut keys: Vec<SpriteKey> = atlases
        .iter()
        .flat_map(|a| a.placed().iter().map(|p| p.key))
        .collect();
    keys.sort();
    let expected: Vec<SpriteKey> = (0..60).map(SpriteKey).collect();
    assert_eq!(keys, expected);
}

#[test]
fn placements_respect_padding_and_bounds() {
    let sizes = random_sizes(1234, 80);
    let arena = arena_of(&sizes);
    let settings = PackSettings::builder()
        .with_max_dimensions(200, 160)
        .border_padding(3)
        .shape_padding(2)
        .build();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    assert_well_formed(&atlases, &settings);
}

#[test]
fn rotated_placements_respect_padding_and_bounds() {
    let sizes = random_sizes(99, 50);
    let arena = arena_of(&sizes);
    let settings = PackSettings::builder()
        .with_max_dimensions(128, 128)
        .allow_rotation(true)
        .rank_strategy(RankStrategy::BestShortSideFit)
        .build();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    assert_well_formed(&atlases, &settings);
    for atlas in &atlases {
        for p in atlas.placed() {
            let src = arena.get(p.key).unwrap().packing_rect();
            if p.rotated {
                assert_eq!((p.rect.width, p.rect.height), (src.height, src.width));
            } else {
                assert_eq!((p.rect.width, p.rect.height), (src.width, src.height));
            }
        }
    }
}

#[test]
fn same_input_same_layout() {
    let sizes = random_sizes(42, 100);
    let settings = PackSettings::builder().with_max_dimensions(300, 300).build();
    let a = pack_sprites(&arena_of(&sizes), &settings).expect("first");
    let b = pack_sprites(&arena_of(&sizes), &settings).expect("second");
    assert_eq!(a, b);
}

#[test]
fn overflow_opens_new_atlases() {
    let arena = arena_of(&[(100, 100); 5]);
    let settings = PackSettings::builder().with_max_dimensions(150, 150).build();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    assert_eq!(atlases.len(), 5);
    for atlas in &atlases {
        assert_eq!((atlas.width(), atlas.height()), (100, 100));
        assert_eq!(atlas.placed().len(), 1);
    }
}

#[test]
fn small_sprites_share_one_atlas() {
    let arena = arena_of(&[(10, 10); 16]);
    let settings = PackSettings::builder()
        .with_max_dimensions(64, 64)
        .shape_padding(0)
        .build();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    assert_eq!(atlases.len(), 1);
    assert_eq!(atlases[0].placed().len(), 16);
}

#[test]
fn larger_sprites_are_placed_first() {
    let arena = arena_of(&[(4, 4), (30, 2), (10, 10)]);
    let settings = PackSettings::default();
    let atlases = pack_sprites(&arena, &settings).expect("pack");
    let order: Vec<SpriteKey> = atlases[0].placed().iter().map(|p| p.key).collect();
    assert_eq!(order, vec![SpriteKey(1), SpriteKey(2), SpriteKey(0)]);
}

#[test]
fn sprite_larger_than_maximum_is_rejected() {
    let arena = arena_of(&[(200, 10)]);
    let settings = PackSettings::builder().with_max_dimensions(150, 150).build();
    match pack_sprites(&arena, &settings) {
        Err(PackError::SpriteTooLarge { name, width, .. }) => {
            assert_eq!(name, "sprite_0.png");
            assert_eq!(width, 200);
        }
        other => panic!("expected SpriteTooLarge, got {other:?}"),
    }
}

#[test]
fn transparent_sprite_is_rejected_when_trimming() {
    let inputs = vec![
        InputImage {
            key: "solid.png".into(),
            image: DynamicImage::ImageRgba8(solid(8, 8)),
        },
        InputImage {
            key: "ghost.png".into(),
            image: DynamicImage::ImageRgba8(RgbaImage::new(8, 8)),
        },
    ];
    let settings = PackSettings::builder().trim_alpha_threshold(1).build();
    match pack_images(inputs, settings) {
        Err(PackError::EmptySprite { name }) => assert_eq!(name, "ghost.png"),
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("expected EmptySprite"),
    }
}

#[test]
fn empty_input_is_an_error() {
    assert!(matches!(
        pack_sprites(&SpriteArena::new(), &PackSettings::default()),
        Err(PackError::Empty)
    ));
    assert!(matches!(
        pack_layout(Vec::new(), PackSettings::default()),
        Err(PackError::Empty)
    ));
}

#[test]
fn invalid_settings_fail_before_packing() {
    let arena = arena_of(&[(4, 4)]);
    let settings = PackSettings::builder().with_max_dimensions(0, 64).build();
    assert!(matches!(
        pack_sprites(&arena, &settings),
        Err(PackError::InvalidDimensions { .. })
    ));
}

#[test]
fn orchestrator_reports_atlas_index() {
    let arena = arena_of(&[(60, 60), (60, 60)]);
    let settings = PackSettings::builder().with_max_dimensions(64, 64).build();
    let mut orchestrator = PackingOrchestrator::new(&settings).expect("orchestrator");
    let (first, _) = orchestrator.add(arena.get(SpriteKey(0)).unwrap()).expect("first");
    let (second, placed) = orchestrator.add(arena.get(SpriteKey(1)).unwrap()).expect("second");
    assert_eq!((first, second), (0, 1));
    assert_eq!(placed.rect, Rect::new(0, 0, 60, 60));
    assert_eq!(orchestrator.atlases().len(), 2);
    let sealed = orchestrator.finish();
    assert_eq!(sealed.len(), 2);
}

#[test]
fn layout_matches_composited_pages() {
    let sizes = random_sizes(5, 20);
    let inputs = || {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &(w, h))| InputImage {
                key: format!("s{i}.png"),
                image: DynamicImage::ImageRgba8(solid(w, h)),
            })
            .collect::<Vec<_>>()
    };
    let settings = PackSettings::builder().with_max_dimensions(96, 96).build();
    let layout = pack_layout(inputs(), settings.clone()).expect("layout");
    let packed = pack_images(inputs(), settings).expect("pack");
    assert_eq!(layout.atlases.len(), packed.pages.len());
    for (l, p) in layout.atlases.iter().zip(&packed.pages) {
        assert_eq!(l.atlas, p.layout.atlas);
        assert_eq!(l.metadata, p.layout.metadata);
        assert_eq!(p.rgba.dimensions(), (l.atlas.width(), l.atlas.height()));
    }
    assert_eq!(layout.stats, packed.stats);
}
