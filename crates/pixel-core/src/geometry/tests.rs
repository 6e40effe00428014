use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn test_fit_and_fill_scale() {
    // 400x200 into 200x200
    assert!(approx(fit_scale((400.0, 200.0), (200.0, 200.0)), 0.5));
    assert!(approx(fill_scale((400.0, 200.0), (200.0, 200.0)), 1.0));
}

#[test]
fn test_viewport_scale_never_enlarges() {
    let small = Size::new(200, 100);
    assert!(approx(viewport_scale((1240.0, 840.0), small), 1.0));

    let large = Size::new(2400, 1600);
    // (1240-40)/2400 = 0.5, (840-40)/1600 = 0.5
    assert!(approx(viewport_scale((1240.0, 840.0), large), 0.5));
}

#[test]
fn test_placement_scale() {
    let canvas = Size::new(800, 600);
    // wider image fits by width
    assert!(approx(placement_scale(Size::new(1600, 600), canvas), 0.5));
    // taller image fits by height
    assert!(approx(placement_scale(Size::new(300, 1200), canvas), 0.5));
}

#[test]
fn test_cover_scale() {
    let canvas = Size::new(800, 600);
    assert!(approx(cover_scale(Size::new(400, 600), canvas), 2.0));
}

#[test]
fn test_aspect_locked_resize() {
    let original = Size::new(1920, 1080);
    assert_eq!(height_for_width(960, original), 540);
    assert_eq!(width_for_height(540, original), 960);
    assert_eq!(height_for_width(1000, original), 563);
}

#[test]
fn test_aspect_round_trip_converges() {
    let originals = [
        Size::new(1920, 1080),
        Size::new(800, 600),
        Size::new(333, 777),
        Size::new(851, 315),
    ];

    for original in originals {
        for width in [1u32, 7, 100, 250, 999, 1234, 5000] {
            let height = height_for_width(width, original);
            let back = width_for_height(height, original);
            let drift = (i64::from(back) - i64::from(width)).abs();
            assert!(drift <= 1, "{original}: {width} -> {height} -> {back}");
        }
    }
}

#[test]
fn test_aspect_round_trip_within_one_pixel_for_wide_sources() {
    let original = Size::new(800, 1200);
    for width in 100..=600 {
        let height = height_for_width(width, original);
        let back = width_for_height(height, original);
        assert!((i64::from(back) - i64::from(width)).abs() <= 1);
    }
}

#[test]
fn test_preset_preserves_area() {
    let original = Size::new(800, 600);
    let square = RESIZE_PRESETS[1].dimensions_for(original);
    assert_eq!(square, Size::new(693, 693));

    for preset in RESIZE_PRESETS {
        let size = preset.dimensions_for(original);
        let area_drift = (size.area() - original.area()).abs() / original.area();
        assert!(area_drift < 0.01, "{} drifted {}", preset.name, area_drift);
    }
}

#[test]
fn test_preset_lookup() {
    assert_eq!(AspectPreset::find("instagram post"), Some(&RESIZE_PRESETS[1]));
    assert_eq!(AspectPreset::find("16:9").map(|p| p.name), Some("Youtube Thumbnail"));
    assert!(AspectPreset::find("A4").is_none());

    assert_eq!(CropPreset::find("square").and_then(|p| p.ratio), Some(1.0));
    assert_eq!(CropPreset::find("Freeform").map(|p| p.ratio), Some(None));
    assert!(CropPreset::find("banner").is_none());
}

#[test]
fn test_aspect_locked_edge_edit() {
    let original = Size::new(800, 600);
    assert_eq!(aspect_locked(original, Some(400), None), Some(Size::new(400, 300)));
    assert_eq!(aspect_locked(original, None, Some(300)), Some(Size::new(400, 300)));
    assert_eq!(aspect_locked(original, Some(1000), Some(1)), Some(Size::new(1000, 750)));
    assert_eq!(aspect_locked(original, None, None), None);
}

#[test]
fn test_resize_plan_validation() {
    let from = Size::new(800, 600);
    assert!(ResizePlan::new(from, Size::new(1000, 750)).unwrap().expands());
    assert!(!ResizePlan::new(from, Size::new(400, 300)).unwrap().expands());
    assert!(ResizePlan::new(from, from).unwrap().is_noop());

    let err = ResizePlan::new(from, Size::new(99, 600)).unwrap_err();
    assert!(matches!(
        err,
        GeometryError::DimensionOutOfRange { value: 99, .. }
    ));
    assert!(ResizePlan::new(from, Size::new(800, 5001)).is_err());
}

#[test]
fn test_initial_crop_rect_inset() {
    let bounds = Rect::new(100.0, 50.0, 400.0, 200.0);
    let crop = initial_crop_rect(&bounds);
    assert!(approx(crop.left, 140.0));
    assert!(approx(crop.top, 70.0));
    assert!(approx(crop.width, 320.0));
    assert!(approx(crop.height, 160.0));
    assert!(bounds.contains(&crop));
}

#[test]
fn test_crop_aspect_constraint() {
    let rect = Rect::new(0.0, 0.0, 320.0, 100.0).with_aspect_ratio(16.0 / 9.0);
    assert!(approx(rect.height, 180.0));

    let unchanged = Rect::new(0.0, 0.0, 320.0, 100.0).with_aspect_ratio(0.0);
    assert!(approx(unchanged.height, 100.0));
}

#[test]
fn test_map_crop_into_source_space() {
    // 1000x500 source drawn at half scale
    let image = Rect::new(100.0, 100.0, 500.0, 250.0);
    let crop = Rect::new(150.0, 125.0, 200.0, 100.0);

    let region = map_crop(&crop, &image, (0.5, 0.5));
    assert!(approx(region.x, 100.0));
    assert!(approx(region.y, 50.0));
    assert!(approx(region.width, 400.0));
    assert!(approx(region.height, 200.0));
}

#[test]
fn test_map_crop_inside_stays_within_source() {
    let source = Size::new(1200, 900);
    for scale in [0.25, 0.5, 1.0, 1.5] {
        let image = Rect::new(
            30.0,
            40.0,
            f64::from(source.width) * scale,
            f64::from(source.height) * scale,
        );
        let crops = [
            initial_crop_rect(&image),
            image,
            Rect::new(image.left, image.top, 1.0, 1.0),
            Rect::new(image.right() - 10.0, image.bottom() - 10.0, 10.0, 10.0),
        ];
        for crop in crops {
            assert!(image.contains(&crop));
            let region = map_crop(&crop, &image, (scale, scale));
            assert!(region.x >= 0.0 && region.y >= 0.0);
            assert!(region.width >= 0.0 && region.height >= 0.0);
            assert!(region.x + region.width <= f64::from(source.width) + 1e-6);
            assert!(region.y + region.height <= f64::from(source.height) + 1e-6);
        }
    }
}

#[test]
fn test_map_crop_clamps_outside_origin() {
    let image = Rect::new(100.0, 100.0, 200.0, 200.0);
    let crop = Rect::new(50.0, 50.0, 400.0, 400.0);
    let region = map_crop(&crop, &image, (0.0, 0.0));
    assert!(approx(region.x, 0.0));
    assert!(approx(region.width, 200.0));
}

#[test]
fn test_extension_dimensions() {
    assert_eq!(
        extended_size((400.4, 300.0), Direction::Left, 200),
        Size::new(600, 300)
    );
    assert_eq!(
        extended_size((400.0, 300.0), Direction::Bottom, 200),
        Size::new(400, 500)
    );
}

#[test]
fn test_focus_tokens_point_away() {
    assert_eq!(Direction::Left.focus_token(), "fo-right");
    assert_eq!(Direction::Right.focus_token(), "fo-left");
    assert_eq!(Direction::Top.focus_token(), "fo-bottom");
    assert_eq!(Direction::Bottom.focus_token(), "fo-top");
}

#[test]
fn test_extension_fit_scale() {
    let canvas = Size::new(800, 600);
    assert!(approx(extension_fit_scale(Size::new(1600, 600), canvas), 0.5));
    assert!(approx(extension_fit_scale(Size::new(400, 300), canvas), 1.0));
}
