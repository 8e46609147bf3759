use image::Rgba;

use super::*;
use crate::encode::sink::InMemorySink;
use crate::layout::placement::{Anchor, Sizing};
use crate::test_support::solid_frames;
use crate::timeline::reconcile::{ReconcileConfig, reconcile};

const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn flat(count: u32, w: u32, h: u32, px: Rgba<u8>) -> AnimationSource {
    let frames = (0..count).map(|_| RgbaImage::from_pixel(w, h, px)).collect();
    AnimationSource::from_frames("flat", frames).unwrap()
}

fn at(x: i64, y: i64) -> Placement {
    Placement {
        x,
        y,
        ..Placement::default()
    }
}

fn sequential() -> CompositorThreading {
    CompositorThreading {
        parallel: false,
        ..CompositorThreading::default()
    }
}

fn run(spec: &CompositeSpec, threading: &CompositorThreading) -> (InMemorySink, CompositeStats) {
    let timeline = reconcile(&spec.native_counts(), &ReconcileConfig::default()).unwrap();
    let mut sink = InMemorySink::new();
    let stats = composite_into(spec, &timeline, threading, Verbosity::Quiet, &mut sink).unwrap();
    (sink, stats)
}

#[test]
fn corrupt_frame_is_skipped_not_fatal() {
    let mut frames = solid_frames(4, 4, 4);
    frames[2] = RgbaImage::new(0, 0);
    let broken = AnimationSource::from_frames("broken", frames).unwrap();
    let spec = CompositeSpec {
        canvas: Canvas::new(16, 8).unwrap(),
        layers: vec![
            Layer {
                source: AnimationSource::from_frames("a", solid_frames(4, 4, 4)).unwrap(),
                placement: at(0, 0),
            },
            Layer {
                source: broken,
                placement: at(5, 0),
            },
            Layer {
                source: AnimationSource::from_frames("c", solid_frames(4, 4, 4)).unwrap(),
                placement: at(10, 0),
            },
        ],
        background: None,
    };

    let (sink, stats) = run(&spec, &sequential());
    assert_eq!(sink.frames().len(), 4);
    assert_eq!(stats.frames_total, 4);
    assert_eq!(stats.frames_substituted, 1);
    assert_eq!(stats.layers, 3);

    let (_, blank) = &sink.frames()[2];
    assert_eq!(blank.get_pixel(6, 1)[3], 0);
    assert_eq!(blank.get_pixel(1, 1)[3], 255);
    assert_eq!(blank.get_pixel(11, 1)[3], 255);
}

#[test]
fn later_layers_draw_over_earlier_ones() {
    let spec = CompositeSpec {
        canvas: Canvas::new(8, 8).unwrap(),
        layers: vec![
            Layer {
                source: flat(2, 4, 4, RED),
                placement: at(0, 0),
            },
            Layer {
                source: flat(2, 4, 4, BLUE),
                placement: at(2, 2),
            },
        ],
        background: None,
    };
    let (sink, _) = run(&spec, &sequential());
    let (_, f0) = &sink.frames()[0];
    assert_eq!(*f0.get_pixel(0, 0), RED);
    assert_eq!(*f0.get_pixel(3, 3), BLUE);
    assert_eq!(f0.get_pixel(7, 0)[3], 0);
}

#[test]
fn anchored_multiplier_layer_lands_in_resolved_box() {
    let spec = CompositeSpec {
        canvas: Canvas::new(200, 220).unwrap(),
        layers: vec![Layer {
            source: flat(1, 40, 40, RED),
            placement: Placement {
                x: 100,
                y: 200,
                size: Sizing::Multiplier { x: 4.0, y: 4.0 },
                anchor: Anchor::BottomCenter,
            },
        }],
        background: None,
    };
    let (sink, _) = run(&spec, &sequential());
    let (_, f) = &sink.frames()[0];
    assert_eq!(f.get_pixel(19, 100)[3], 0);
    assert_eq!(*f.get_pixel(20, 40), RED);
    assert_eq!(*f.get_pixel(179, 199), RED);
    assert_eq!(f.get_pixel(180, 199)[3], 0);
    assert_eq!(f.get_pixel(100, 200)[3], 0);
}

#[test]
fn background_is_scaled_to_canvas() {
    let spec = CompositeSpec {
        canvas: Canvas::new(10, 6).unwrap(),
        layers: vec![Layer {
            source: flat(1, 1, 1, RED),
            placement: at(0, 0),
        }],
        background: Some(RgbaImage::from_pixel(5, 3, BLUE)),
    };
    let (sink, _) = run(&spec, &sequential());
    let (_, f) = &sink.frames()[0];
    assert_eq!(f.dimensions(), (10, 6));
    assert_eq!(*f.get_pixel(0, 0), RED);
    assert_eq!(*f.get_pixel(9, 5), BLUE);
}

#[test]
fn parallel_matches_sequential() {
    let spec = CompositeSpec {
        canvas: Canvas::new(12, 12).unwrap(),
        layers: vec![
            Layer {
                source: AnimationSource::from_frames("a", solid_frames(6, 5, 5)).unwrap(),
                placement: at(0, 0),
            },
            Layer {
                source: AnimationSource::from_frames("b", solid_frames(4, 3, 3)).unwrap(),
                placement: Placement {
                    x: 6,
                    y: 6,
                    size: Sizing::Explicit {
                        width: 6,
                        height: 6,
                    },
                    anchor: Anchor::TopLeft,
                },
            },
        ],
        background: None,
    };
    let (seq, _) = run(&spec, &sequential());
    let (par, stats) = run(
        &spec,
        &CompositorThreading {
            parallel: true,
            chunk_size: 5,
            threads: Some(2),
        },
    );
    assert_eq!(stats.frames_total, 12);
    assert_eq!(seq.frames(), par.frames());
}

#[test]
fn off_canvas_layers_are_clipped() {
    let spec = CompositeSpec {
        canvas: Canvas::new(4, 4).unwrap(),
        layers: vec![Layer {
            source: flat(1, 4, 4, RED),
            placement: at(-2, -2),
        }],
        background: None,
    };
    let (sink, stats) = run(&spec, &sequential());
    let (_, f) = &sink.frames()[0];
    assert_eq!(*f.get_pixel(1, 1), RED);
    assert_eq!(f.get_pixel(2, 2)[3], 0);
    assert_eq!(stats.frames_substituted, 0);
}

#[test]
fn invalid_specs_are_rejected() {
    let empty = CompositeSpec {
        canvas: Canvas {
            width: 4,
            height: 4,
        },
        layers: Vec::new(),
        background: None,
    };
    assert!(matches!(empty.validate(), Err(GifloomError::Input(_))));

    let zero_canvas = CompositeSpec {
        canvas: Canvas {
            width: 0,
            height: 4,
        },
        layers: vec![Layer {
            source: flat(1, 1, 1, RED),
            placement: at(0, 0),
        }],
        background: None,
    };
    assert!(zero_canvas.validate().is_err());
}

#[test]
fn timeline_must_cover_every_layer() {
    let spec = CompositeSpec {
        canvas: Canvas::new(4, 4).unwrap(),
        layers: vec![Layer {
            source: flat(2, 1, 1, RED),
            placement: at(0, 0),
        }],
        background: None,
    };
    let timeline = reconcile(&[2, 2], &ReconcileConfig::default()).unwrap();
    let mut sink = InMemorySink::new();
    let err = composite_into(&spec, &timeline, &sequential(), Verbosity::Quiet, &mut sink)
        .unwrap_err();
    assert!(matches!(err, GifloomError::Input(_)));
}

#[test]
fn zero_threads_rejected() {
    let t = CompositorThreading {
        threads: Some(0),
        ..CompositorThreading::default()
    };
    assert!(t.validate().is_err());
}

#[test]
fn truncated_sources_are_counted() {
    let mut cut = crate::test_support::gif_bytes(&solid_frames(4, 4, 4), 50);
    cut.truncate(cut.len() - 12);
    let spec = CompositeSpec {
        canvas: Canvas::new(8, 4).unwrap(),
        layers: vec![
            Layer {
                source: crate::source::decode::decode_animation("cut", cut).unwrap(),
                placement: at(0, 0),
            },
            Layer {
                source: flat(2, 4, 4, RED),
                placement: at(4, 0),
            },
        ],
        background: None,
    };
    assert_eq!(spec.truncated_sources(), 1);
    let (sink, stats) = run(&spec, &sequential());
    assert_eq!(stats.truncated_sources, 1);
    assert_eq!(stats.frames_substituted, 0);
    assert!(!sink.frames().is_empty());
}
