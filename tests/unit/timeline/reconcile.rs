use super::*;

fn exact(even_rounding: bool) -> ReconcileConfig {
    ReconcileConfig {
        strategy: ReconcileStrategy::ExactLcm,
        even_rounding,
        ..ReconcileConfig::default()
    }
}

fn assert_periodic(tl: &Timeline) {
    for (i, track) in tl.tracks.iter().enumerate() {
        for f in 0..tl.frame_count {
            let idx = tl.sample(i, FrameIndex(f)).unwrap();
            assert!(idx < track.native_count);
            if f + track.native_count < tl.frame_count {
                assert_eq!(
                    tl.sample(i, FrameIndex(f + track.native_count)),
                    Some(idx),
                    "track {i} not periodic at frame {f}"
                );
            }
        }
    }
}

#[test]
fn single_source_keeps_native_count() {
    let tl = reconcile(&[10], &ReconcileConfig::default()).unwrap();
    assert_eq!(tl.native_total, 10);
    assert_eq!(tl.frame_count, 10);
    assert_eq!(tl.frame_skip, 1);
    assert_eq!(tl.tracks[0].loop_multiplier, 1);
    assert_eq!(tl.tracks[0].end_drift, 0);
    assert_eq!(tl.sample(0, FrameIndex(3)), Some(3));
}

#[test]
fn single_odd_source_is_not_rounded() {
    let tl = reconcile(&[9], &ReconcileConfig::default()).unwrap();
    assert_eq!(tl.native_total, 9);
    assert_eq!(tl.tracks[0].period, 9);
}

#[test]
fn frame_skip_shortens_output_and_strides_samples() {
    let cfg = ReconcileConfig {
        frame_skip: 3,
        ..ReconcileConfig::default()
    };
    let tl = reconcile(&[10], &cfg).unwrap();
    assert_eq!(tl.native_total, 10);
    assert_eq!(tl.frame_count, 4);
    assert_eq!(tl.sample(0, FrameIndex(1)), Some(3));
    assert_eq!(tl.sample(0, FrameIndex(3)), Some(9));
    assert_eq!(tl.sample(0, FrameIndex(4)), Some(2));

    // Output loops after frame 3: the seam goes 9 -> 0, a shorter step than the stride.
    let samples: Vec<u32> = tl.frames().map(|f| tl.sample(0, f).unwrap()).collect();
    assert_eq!(samples, vec![0, 3, 6, 9]);
}

#[test]
fn loop_multiplier_rounds_up_to_cover_the_timeline() {
    let cfg = ReconcileConfig {
        even_rounding: false,
        max_drift: 0.15,
        ..ReconcileConfig::default()
    };
    // 100 frames over a 17-frame loop needs 6 loops, 5.88 of them in use.
    let tl = reconcile(&[20, 17], &cfg).unwrap();
    for t in &tl.tracks {
        assert!(t.loop_multiplier * t.native_count >= tl.native_total);
        assert!((t.loop_multiplier - 1) * t.native_count < tl.native_total);
    }
}

#[test]
fn exact_lcm_of_ten_and_fifteen_is_thirty() {
    let tl = reconcile(&[10, 15], &exact(false)).unwrap();
    assert_eq!(tl.native_total, 30);
    assert_eq!(tl.tracks[0].loop_multiplier, 3);
    assert_eq!(tl.tracks[1].loop_multiplier, 2);
    assert_periodic(&tl);

    let a: Vec<u32> = tl.frames().map(|f| tl.sample(0, f).unwrap()).collect();
    assert_eq!(&a[0..10], &a[10..20]);
    let b: Vec<u32> = tl.frames().map(|f| tl.sample(1, f).unwrap()).collect();
    assert_eq!(&b[0..15], &b[15..30]);
}

#[test]
fn exact_lcm_uses_even_rounded_periods() {
    let tl = reconcile(&[10, 15], &exact(true)).unwrap();
    assert_eq!(tl.tracks[1].period, 16);
    assert_eq!(tl.native_total, 80);
    assert_periodic(&tl);
}

#[test]
fn bounded_drift_finds_exact_multiple_when_available() {
    let cfg = ReconcileConfig {
        even_rounding: false,
        ..ReconcileConfig::default()
    };
    let tl = reconcile(&[10, 15], &cfg).unwrap();
    assert_eq!(tl.native_total, 30);
    assert!(tl.tracks.iter().all(|t| t.end_drift == 0));
}

#[test]
fn bounded_drift_accepts_small_remainders() {
    // 5 * 20 = 100 = 6 * 17 - 2: 2/17 of a loop off, accepted at 0.15 but not at 0.1.
    // 6 * 20 = 120 = 7 * 17 + 1 is the first multiple within 0.1.
    let strict = ReconcileConfig {
        even_rounding: false,
        ..ReconcileConfig::default()
    };
    let loose = ReconcileConfig {
        max_drift: 0.15,
        ..strict.clone()
    };

    let tl = reconcile(&[20, 17], &loose).unwrap();
    assert_eq!(tl.native_total, 100);
    assert_eq!(tl.tracks[1].end_drift, 2);
    assert_eq!(tl.tracks[1].loop_multiplier, 6);

    let tl = reconcile(&[20, 17], &strict).unwrap();
    assert_eq!(tl.native_total, 120);
    assert_eq!(tl.tracks[1].end_drift, 1);
    assert_eq!(tl.tracks[1].loop_multiplier, 8);
    assert_periodic(&tl);
}

#[test]
fn mutually_prime_counts_stay_under_ceiling() {
    let cfg = ReconcileConfig {
        even_rounding: false,
        ..ReconcileConfig::default()
    };
    let tl = reconcile(&[7, 11, 13], &cfg).unwrap();
    assert!(tl.native_total <= cfg.max_total_frames);
    assert_eq!(tl.native_total % 13, 0);
    assert_eq!(tl.native_total, 234);
    assert_periodic(&tl);

    let tl = reconcile(&[7, 11, 13], &exact(false)).unwrap();
    assert_eq!(tl.native_total, 234);
}

#[test]
fn oversized_source_is_clamped_to_ceiling() {
    let tl = reconcile(&[300, 10], &ReconcileConfig::default()).unwrap();
    assert_eq!(tl.native_total, 240);
    assert_periodic(&tl);
    assert_eq!(tl.tracks[0].loop_multiplier, 1);
}

#[test]
fn identical_counts_need_one_loop() {
    let tl = reconcile(&[8, 8, 8], &ReconcileConfig::default()).unwrap();
    assert_eq!(tl.native_total, 8);
    assert_eq!(tl.frame_count, 8);
    assert!(tl.tracks.iter().all(|t| t.loop_multiplier == 1));
}

#[test]
fn reconcile_is_pure() {
    let cfg = ReconcileConfig::default();
    let counts = [12, 17, 30, 9];
    assert_eq!(
        reconcile(&counts, &cfg).unwrap(),
        reconcile(&counts, &cfg).unwrap()
    );
}

#[test]
fn malformed_input_is_rejected() {
    let cfg = ReconcileConfig::default();
    assert!(matches!(reconcile(&[], &cfg), Err(GifloomError::Input(_))));
    assert!(matches!(
        reconcile(&[4, 0], &cfg),
        Err(GifloomError::Input(_))
    ));

    let bad = ReconcileConfig {
        frame_skip: 0,
        ..cfg.clone()
    };
    assert!(reconcile(&[4], &bad).is_err());
    let bad = ReconcileConfig {
        max_drift: 0.9,
        ..cfg
    };
    assert!(bad.validate().is_err());
}

#[test]
fn sample_out_of_range_track_is_none() {
    let tl = reconcile(&[4], &ReconcileConfig::default()).unwrap();
    assert_eq!(tl.sample(1, FrameIndex(0)), None);
}
