mod common;

use common::{find_system_font, silent_story, wav_data_uri};
use storyreel::{Progress, ProgressSink, RenderConfig, export_story, is_ffmpeg_on_path};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn export_story_writes_a_playable_mp4() {
    init_tracing();
    let Some(fonts) = find_system_font() else {
        return;
    };
    if !is_ffmpeg_on_path() {
        return;
    }

    let out_path = std::env::temp_dir().join(format!(
        "storyreel_e2e_{}_bedtime-story.mp4",
        std::process::id()
    ));
    let config = RenderConfig {
        page_duration_ms: 1_500,
        transition_ms: 400,
        caption_fade_ms: 200,
        out_path: out_path.clone(),
        ..RenderConfig::default()
    };

    let mut events = Vec::new();
    let report = {
        let mut progress = |p: &Progress| events.push(p.clone());
        let progress: &mut dyn ProgressSink = &mut progress;
        export_story(
            silent_story(2),
            config,
            fonts,
            wav_data_uri(0.5, 48_000),
            progress,
        )
        .unwrap()
    };

    assert_eq!(report.total_ms, 3_000);
    assert_eq!(events.last(), Some(&Progress::Done));

    let meta = std::fs::metadata(&out_path).expect("output mp4 missing");
    assert!(meta.len() > 0, "output mp4 is empty");
    std::fs::remove_file(&out_path).unwrap();
}

#[test]
fn failed_export_leaves_no_output_file() {
    init_tracing();
    let Some(fonts) = find_system_font() else {
        return;
    };

    let out_path = std::env::temp_dir().join(format!(
        "storyreel_e2e_fail_{}_bedtime-story.mp4",
        std::process::id()
    ));
    let config = RenderConfig {
        out_path: out_path.clone(),
        ..RenderConfig::default()
    };

    let mut story = silent_story(1);
    story.pages[0].image_url = "/no/such/illustration.png".to_string();

    let mut progress = storyreel::NullProgress;
    let err = export_story(
        story,
        config,
        fonts,
        wav_data_uri(0.2, 48_000),
        &mut progress,
    )
    .unwrap_err();
    assert!(err.to_string().contains("page 0 image"));
    assert!(!out_path.exists(), "failed export must not leave output");
}
