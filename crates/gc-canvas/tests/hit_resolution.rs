//! Integration tests: point → element resolution and pointer events
//! (gc-canvas).

use gc_canvas::{Canvas, FrameQueue, PointerEventKind, RawEvent, SceneMutation};
use gc_core::kurbo::Affine;
use gc_core::model::*;
use gc_core::{CanvasConfig, ElementId};
use gc_render::recording::RecordingSurface;
use pretty_assertions::assert_eq;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_canvas(quick_hit: bool) -> Canvas {
    init_logging();
    let mut config = CanvasConfig::new(120.0, 120.0);
    config.quick_hit = quick_hit;
    config.auto_draw = false;
    let mut surface = RecordingSurface::new(1.0);
    Canvas::new(config, &mut surface, Box::new(FrameQueue::new())).unwrap()
}

/// A scene exercising every hit-test path: fills, strokes, open lines,
/// overlaps, transformed groups, hidden and uncapturable nodes.
fn populate(canvas: &mut Canvas) -> Vec<ElementId> {
    let root = canvas.root();
    let mut ids = Vec::new();
    ids.push(
        canvas
            .add_shape(root, ShapeKind::rect(10.0, 10.0, 40.0, 30.0), Style::filled(Color::BLACK))
            .unwrap(),
    );
    ids.push(
        canvas
            .add_shape(root, ShapeKind::circle(45.0, 35.0, 15.0), Style::filled(Color::WHITE))
            .unwrap(),
    );
    ids.push(
        canvas
            .add_shape(root, ShapeKind::circle(90.0, 30.0, 12.0), Style::stroked(Color::BLACK, 4.0))
            .unwrap(),
    );
    ids.push(
        canvas
            .add_shape(
                root,
                ShapeKind::Line {
                    x1: 5.0,
                    y1: 100.0,
                    x2: 110.0,
                    y2: 80.0,
                },
                Style::stroked(Color::BLACK, 3.0),
            )
            .unwrap(),
    );

    let group = canvas
        .add_group(
            root,
            Style::default().with_matrix(Affine::translate((60.0, 60.0)) * Affine::rotate(0.5)),
        )
        .unwrap();
    ids.push(group);
    ids.push(
        canvas
            .add_shape(
                group,
                ShapeKind::Polygon {
                    points: vec![(0.0, 0.0), (30.0, 0.0), (15.0, 25.0)],
                },
                Style::filled(Color::BLACK),
            )
            .unwrap(),
    );
    ids.push(
        canvas
            .add_shape(
                group,
                ShapeKind::Marker {
                    x: -10.0,
                    y: 10.0,
                    r: 6.0,
                    symbol: MarkerSymbol::Diamond,
                },
                Style::filled(Color::WHITE),
            )
            .unwrap(),
    );

    let hidden = canvas
        .add_shape(root, ShapeKind::rect(0.0, 0.0, 120.0, 5.0), Style::filled(Color::BLACK))
        .unwrap();
    canvas
        .apply(SceneMutation::SetVisible {
            id: hidden,
            visible: false,
        })
        .unwrap();
    ids.push(hidden);

    let ghost = canvas
        .add_shape(root, ShapeKind::rect(100.0, 100.0, 20.0, 20.0), Style {
            fill: Some(Color::BLACK),
            capture: false,
            ..Style::default()
        })
        .unwrap();
    ids.push(ghost);
    ids
}

/// Pixel centres of the whole canvas.
fn sample_points() -> impl Iterator<Item = (f64, f64)> {
    (0..120).flat_map(|y| (0..120).map(move |x| (x as f64 + 0.5, y as f64 + 0.5)))
}

#[test]
fn background_misses() {
    let mut canvas = make_canvas(false);
    let root = canvas.root();
    canvas
        .add_shape(root, ShapeKind::rect(10.0, 10.0, 20.0, 20.0), Style::filled(Color::BLACK))
        .unwrap();
    assert_eq!(canvas.get_shape(5.0, 5.0), None);
    assert!(canvas.get_shape(15.0, 15.0).is_some());
    assert_eq!(canvas.get_shape(-3.0, 15.0), None);
    assert_eq!(canvas.get_shape(15.0, 500.0), None);
}

#[test]
fn overlapping_shapes_resolve_to_the_topmost() {
    let mut canvas = make_canvas(false);
    let ids = populate(&mut canvas);
    assert_eq!(canvas.get_shape(45.0, 35.0), Some(ids[1]));
    assert_eq!(canvas.get_shape(15.0, 15.0), Some(ids[0]));
    // Ring: the stroke hits, the unfilled middle does not.
    assert_eq!(canvas.get_shape(102.0, 30.0), Some(ids[2]));
    assert_eq!(canvas.get_shape(90.0, 30.0), None);
    // Hidden and uncapturable nodes are never returned.
    assert_eq!(canvas.get_shape(60.0, 2.0), None);
    assert_eq!(canvas.get_shape(110.0, 110.0), None);
}

#[test]
fn quick_and_precise_strategies_agree() {
    let mut precise = make_canvas(false);
    let mut quick = make_canvas(true);
    let ids = populate(&mut precise);
    assert_eq!(populate(&mut quick), ids);

    let mut hits = 0;
    for (x, y) in sample_points() {
        let expected = precise.get_shape(x, y);
        assert_eq!(quick.get_shape(x, y), expected, "disagreement at ({x}, {y})");
        hits += usize::from(expected.is_some());
    }
    assert!(hits > 1000, "scene should cover a fair share of the canvas");
}

#[test]
fn strategies_agree_between_pixel_centres() {
    let mut precise = make_canvas(false);
    let mut quick = make_canvas(true);
    for canvas in [&mut precise, &mut quick] {
        populate(canvas);
        let root = canvas.root();
        // Right edge at 20.4, bottom edge at 110.7.
        canvas
            .add_shape(root, ShapeKind::rect(10.0, 100.3, 10.4, 10.4), Style::filled(Color::WHITE))
            .unwrap();
    }

    assert!(quick.get_shape(20.2, 105.0).is_some());
    assert_eq!(quick.get_shape(20.2, 105.0), precise.get_shape(20.2, 105.0));
    assert_eq!(quick.get_shape(20.6, 105.0), None);

    let steps = (0..400).map(|i| f64::from(i) * 0.3 + 0.05);
    for y in steps.clone() {
        for x in steps.clone() {
            assert_eq!(
                quick.get_shape(x, y),
                precise.get_shape(x, y),
                "disagreement at ({x}, {y})"
            );
        }
    }
}

#[test]
fn oversized_canvas_resolves_without_an_index() {
    init_logging();
    let mut config = CanvasConfig::new(20_000.0, 20_000.0);
    config.quick_hit = true;
    config.auto_draw = false;
    let mut surface = RecordingSurface::new(1.0);
    let mut canvas = Canvas::new(config, &mut surface, Box::new(FrameQueue::new())).unwrap();
    let root = canvas.root();
    let far = canvas
        .add_shape(root, ShapeKind::rect(15_000.0, 15_000.0, 10.0, 10.0), Style::filled(Color::BLACK))
        .unwrap();

    assert_eq!(canvas.get_shape(5.0, 5.0), None);
    assert_eq!(canvas.get_shape(15_005.0, 15_005.0), Some(far));
}

#[test]
fn quick_hit_follows_mutations() {
    let mut canvas = make_canvas(true);
    let ids = populate(&mut canvas);
    let square = ids[0];
    assert_eq!(canvas.get_shape(15.0, 15.0), Some(square));

    canvas.translate(square, 0.0, 60.0).unwrap();
    assert_eq!(canvas.get_shape(15.0, 15.0), None);
    assert_eq!(canvas.get_shape(15.0, 75.0), Some(square));

    canvas.apply(SceneMutation::RemoveNode { id: square }).unwrap();
    for (x, y) in sample_points() {
        assert_ne!(canvas.get_shape(x, y), Some(square));
    }
}

#[test]
fn pointer_events_target_resolved_shapes() {
    let mut canvas = make_canvas(true);
    let ids = populate(&mut canvas);

    canvas.handle_event(&RawEvent::down(15.0, 15.0));
    canvas.handle_event(&RawEvent::up(16.0, 15.0));
    let events = canvas.take_events();
    let kinds: Vec<PointerEventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            PointerEventKind::MouseEnter,
            PointerEventKind::MouseDown,
            PointerEventKind::MouseUp,
            PointerEventKind::Click,
        ]
    );
    assert!(events.iter().all(|e| e.target == Some(ids[0])));

    canvas.destroy();
    canvas.handle_event(&RawEvent::down(15.0, 15.0));
    assert!(canvas.take_events().is_empty());
}

#[test]
fn removed_element_gets_no_late_events() {
    let mut canvas = make_canvas(false);
    let ids = populate(&mut canvas);
    let square = ids[0];

    canvas.handle_event(&RawEvent::down(15.0, 15.0));
    canvas.take_events();
    canvas.apply(SceneMutation::RemoveNode { id: square }).unwrap();

    canvas.handle_event(&RawEvent::moved(25.0, 15.0));
    canvas.handle_event(&RawEvent::leave(25.0, 15.0));
    let events = canvas.take_events();
    assert!(events.iter().any(|e| e.kind == PointerEventKind::DragEnd));
    assert!(events.iter().all(|e| e.target != Some(square)), "{events:?}");
}
