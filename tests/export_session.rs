mod common;

use common::{find_system_font, narrated_story, silent_story, wav_data_uri};
use storyreel::{
    ExportSession, InMemorySink, Progress, ReelError, RenderConfig, Story, StoryPage,
    is_ffmpeg_on_path,
};

fn fast_config() -> RenderConfig {
    RenderConfig {
        page_duration_ms: 2_000,
        transition_ms: 500,
        caption_fade_ms: 200,
        ..RenderConfig::default()
    }
}

struct Recorder(Vec<Progress>);

impl storyreel::ProgressSink for Recorder {
    fn report(&mut self, progress: &Progress) {
        self.0.push(progress.clone());
    }
}

fn phase_index(events: &[Progress], wanted: fn(&Progress) -> bool) -> usize {
    events
        .iter()
        .position(wanted)
        .expect("expected phase missing from progress stream")
}

#[test]
fn silent_story_renders_every_frame_in_order() {
    let Some(fonts) = find_system_font() else {
        return;
    };
    if !is_ffmpeg_on_path() {
        return;
    }

    let config = fast_config();
    let music = wav_data_uri(0.5, 48_000);
    let session = ExportSession::new(silent_story(2), config.clone(), fonts, music).unwrap();

    let mut sink = InMemorySink::new();
    let mut progress = Recorder(Vec::new());
    let report = session.run(&mut sink, &mut progress).unwrap();

    // 2 pages x 2s at 30fps.
    assert_eq!(report.total_ms, 4_000);
    assert_eq!(report.frames_encoded, 120);
    assert_eq!(sink.frames().len(), 120);
    assert!(sink.ended());
    for (i, (idx, frame)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.width, report.canvas.width);
        assert_eq!(frame.height, report.canvas.height);
    }

    // Phases arrive in order with none skipped, ending in Done.
    let events = &progress.0;
    let init = phase_index(events, |p| *p == Progress::Initializing);
    let images = phase_index(events, |p| *p == Progress::LoadingImages);
    let mixing = phase_index(events, |p| *p == Progress::MixingAudio);
    let encoding = phase_index(events, |p| matches!(p, Progress::Encoding { .. }));
    let finalizing = phase_index(events, |p| *p == Progress::Finalizing);
    assert!(init < images && images < mixing && mixing < encoding && encoding < finalizing);
    assert_eq!(events.last(), Some(&Progress::Done));

    // Encode progress fires once per whole elapsed second.
    let seconds: Vec<u64> = events
        .iter()
        .filter_map(|p| match p {
            Progress::Encoding { elapsed_secs, .. } => Some(*elapsed_secs),
            _ => None,
        })
        .collect();
    assert_eq!(seconds, vec![0, 1, 2, 3]);
}

#[test]
fn narrated_story_times_pages_by_their_clips() {
    let Some(fonts) = find_system_font() else {
        return;
    };
    if !is_ffmpeg_on_path() {
        return;
    }

    let config = fast_config();
    let story = narrated_story(&[1.0, 1.5], 48_000);
    let music = wav_data_uri(0.5, 48_000);
    let session = ExportSession::new(story, config, fonts, music).unwrap();

    let mut sink = InMemorySink::new();
    let mut progress = Recorder(Vec::new());
    let report = session.run(&mut sink, &mut progress).unwrap();

    assert_eq!(report.total_ms, 2_500);
    assert_eq!(report.frames_encoded, 75);
    assert_eq!(sink.frames().len(), 75);
}

#[test]
fn image_failure_fails_before_any_encoding() {
    let Some(fonts) = find_system_font() else {
        return;
    };

    let mut story = silent_story(3);
    story.pages[1].image_url = "data:image/png;base64,not-base64!".to_string();

    let session =
        ExportSession::new(story, fast_config(), fonts, wav_data_uri(0.2, 48_000)).unwrap();
    let mut sink = InMemorySink::new();
    let mut progress = Recorder(Vec::new());
    let err = session.run(&mut sink, &mut progress).unwrap_err();

    assert!(matches!(err, ReelError::AssetLoad(_)));
    assert!(err.to_string().contains("page 1 image"));

    // The sink never began; no partial frames exist.
    assert!(sink.config().is_none());
    assert!(sink.frames().is_empty());

    // The last progress event reports the failure, not an encode percentage.
    match progress.0.last() {
        Some(Progress::Failed { reason }) => assert!(reason.contains("page 1 image")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(
        !progress
            .0
            .iter()
            .any(|p| matches!(p, Progress::Encoding { .. }))
    );
}

#[test]
fn cancel_mid_encode_stops_the_loop_and_aborts_the_sink() {
    let Some(fonts) = find_system_font() else {
        return;
    };
    if !is_ffmpeg_on_path() {
        return;
    }

    let config = fast_config();
    let session = ExportSession::new(
        silent_story(2),
        config,
        fonts,
        wav_data_uri(0.2, 48_000),
    )
    .unwrap();
    let token = session.cancel_token();

    struct CancelOnFirstEncode {
        token: storyreel::CancelToken,
        events: Vec<Progress>,
    }
    impl storyreel::ProgressSink for CancelOnFirstEncode {
        fn report(&mut self, progress: &Progress) {
            if matches!(progress, Progress::Encoding { .. }) {
                self.token.cancel();
            }
            self.events.push(progress.clone());
        }
    }

    let mut sink = InMemorySink::new();
    let mut progress = CancelOnFirstEncode {
        token,
        events: Vec::new(),
    };
    let err = session.run(&mut sink, &mut progress).unwrap_err();

    assert!(matches!(err, ReelError::Canceled));
    assert!(sink.aborted());
    assert!(!sink.ended());

    // Exactly one encode event before the abort, then the failure report.
    let encode_events = progress
        .events
        .iter()
        .filter(|p| matches!(p, Progress::Encoding { .. }))
        .count();
    assert_eq!(encode_events, 1);
    assert!(matches!(progress.events.last(), Some(Progress::Failed { .. })));
}

#[test]
fn mixed_narration_is_rejected_at_construction() {
    let Some(fonts) = find_system_font() else {
        return;
    };

    let mut story = narrated_story(&[1.0, 1.5], 48_000);
    story.pages[1].narration = None;

    let err = ExportSession::new(story, fast_config(), fonts, wav_data_uri(0.2, 48_000))
        .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn empty_story_is_rejected_at_construction() {
    let Some(fonts) = find_system_font() else {
        return;
    };
    let err = ExportSession::new(
        Story::new("t", Vec::<StoryPage>::new()),
        fast_config(),
        fonts,
        "music.mp3",
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}
