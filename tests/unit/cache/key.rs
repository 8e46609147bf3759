use super::*;
use crate::foundation::core::Canvas;
use crate::job::spec::LayerSpec;
use crate::source::fetch::MediaRef;

fn job() -> JobSpec {
    JobSpec {
        canvas: Canvas::new(1000, 500).unwrap(),
        background: Some(MediaRef::Url("https://cdn.example.com/bg.png".into())),
        layers: vec![LayerSpec {
            source: MediaRef::Path("a.gif".into()),
            x: 10,
            y: 20,
            size: Sizing::Native,
            anchor: Anchor::BottomCenter,
        }],
    }
}

fn inputs() -> JobInputs {
    JobInputs {
        layers: vec![b"GIF89a-sprite-a".to_vec()],
        background: Some(b"png-background".to_vec()),
    }
}

fn key(job: &JobSpec, inputs: &JobInputs, cfg: &JobConfig) -> CacheKey {
    CacheKey::for_job(job, inputs, cfg).unwrap()
}

#[test]
fn key_is_stable_and_named() {
    let cfg = JobConfig::default();
    let a = key(&job(), &inputs(), &cfg);
    let b = key(&job(), &inputs(), &cfg);
    assert_eq!(a, b);

    let name = a.file_name();
    assert!(name.starts_with("composite-"));
    assert!(name.ends_with(".gif"));
    assert_eq!(name.len(), "composite-".len() + 16 + ".gif".len());
    assert_eq!(a.to_string(), name);
}

#[test]
fn same_path_with_different_contents_gets_a_different_key() {
    let cfg = JobConfig::default();
    let base = key(&job(), &inputs(), &cfg);

    let mut other_dir = inputs();
    other_dir.layers[0] = b"GIF89a-sprite-from-another-dir".to_vec();
    assert_ne!(key(&job(), &other_dir, &cfg), base);

    let mut other_bg = inputs();
    other_bg.background = Some(b"png-background-2".to_vec());
    assert_ne!(key(&job(), &other_bg, &cfg), base);
}

#[test]
fn references_do_not_matter_when_contents_match() {
    let cfg = JobConfig::default();
    let base = key(&job(), &inputs(), &cfg);

    let mut as_url = job();
    as_url.layers[0].source = MediaRef::Url("https://cdn.example.com/a.gif".into());
    assert_eq!(key(&as_url, &inputs(), &cfg), base);
}

#[test]
fn output_affecting_changes_change_the_key() {
    let cfg = JobConfig::default();
    let base = key(&job(), &inputs(), &cfg);

    let mut moved = job();
    moved.layers[0].x += 1;
    assert_ne!(key(&moved, &inputs(), &cfg), base);

    let mut no_bg = job();
    no_bg.background = None;
    let mut no_bg_inputs = inputs();
    no_bg_inputs.background = None;
    assert_ne!(key(&no_bg, &no_bg_inputs, &cfg), base);

    let mut skip = JobConfig::default();
    skip.reconcile.frame_skip = 2;
    assert_ne!(key(&job(), &inputs(), &skip), base);

    let mut lossy = JobConfig::default();
    lossy.encoder.lossy = Some(40);
    assert_ne!(key(&job(), &inputs(), &lossy), base);

    let mut mode = JobConfig::default();
    mode.mode = CompositeMode::FilterGraph;
    assert_ne!(key(&job(), &inputs(), &mode), base);
}

#[test]
fn runtime_only_knobs_keep_the_key() {
    let base = key(&job(), &inputs(), &JobConfig::default());
    let mut cfg = JobConfig::default();
    cfg.threading.parallel = false;
    cfg.scratch_root = Some("/somewhere".into());
    cfg.encoder.timeout_secs = Some(30);
    cfg.encoder.ffmpeg = "/opt/ffmpeg/bin/ffmpeg".into();
    assert_eq!(key(&job(), &inputs(), &cfg), base);
}

#[test]
fn inputs_that_do_not_match_the_job_are_rejected() {
    let cfg = JobConfig::default();
    let mut short = inputs();
    short.layers.clear();
    let err = CacheKey::for_job(&job(), &short, &cfg).unwrap_err();
    assert_eq!(err.stage(), "cache");

    let mut no_bg = inputs();
    no_bg.background = None;
    assert!(CacheKey::for_job(&job(), &no_bg, &cfg).is_err());
}
