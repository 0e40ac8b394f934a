#![allow(dead_code)] // each test binary uses a different subset of helpers

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use storyreel::{FontSet, NarrationClip, Story, StoryPage};

/// Encode a solid PNG as a data URI so tests need no network or fixtures.
pub fn png_data_uri(width: u32, height: u32, rgba: [u8; 4]) -> String {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", BASE64.encode(&buf))
}

/// Build a 16-bit PCM mono WAV of `secs` seconds as a data URI.
pub fn wav_data_uri(secs: f64, sample_rate: u32) -> String {
    let frames = (secs * f64::from(sample_rate)).round() as usize;
    let mut samples = Vec::<i16>::with_capacity(frames);
    for i in 0..frames {
        let t = i as f64 / f64::from(sample_rate);
        samples.push(((t * 440.0 * std::f64::consts::TAU).sin() * 8000.0) as i16);
    }

    let data_len = (samples.len() * 2) as u32;
    let mut wav = Vec::<u8>::with_capacity(44 + data_len as usize);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        wav.extend_from_slice(&s.to_le_bytes());
    }

    format!("data:audio/wav;base64,{}", BASE64.encode(&wav))
}

pub fn silent_story(pages: usize) -> Story {
    Story::new(
        "Test Story",
        (0..pages)
            .map(|i| StoryPage {
                text: format!("Once upon a page {i}"),
                image_url: png_data_uri(64, 36, [(i * 40) as u8, 80, 120, 255]),
                text_effect: String::new(),
                narration: None,
            })
            .collect(),
    )
}

pub fn narrated_story(durations: &[f64], sample_rate: u32) -> Story {
    Story::new(
        "Narrated Story",
        durations
            .iter()
            .enumerate()
            .map(|(i, &secs)| StoryPage {
                text: format!("Narrated page {i}"),
                image_url: png_data_uri(64, 36, [50, (i * 60) as u8, 90, 255]),
                text_effect: "gentle floating words".to_string(),
                narration: Some(NarrationClip {
                    audio_url: wav_data_uri(secs, sample_rate),
                    duration_secs: secs,
                }),
            })
            .collect(),
    )
}

/// Locate any usable system font so compositing tests can run without
/// bundled fixtures; tests skip when none parses.
pub fn find_system_font() -> Option<FontSet> {
    let roots = [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/System/Library/Fonts",
        "C:\\Windows\\Fonts",
    ];
    for root in roots {
        if let Some(fonts) = find_font_under(Path::new(root)) {
            return Some(fonts);
        }
    }
    None
}

fn find_font_under(dir: &Path) -> Option<FontSet> {
    let mut stack: Vec<PathBuf> = vec![dir.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase);
            if !matches!(ext.as_deref(), Some("ttf") | Some("otf")) {
                continue;
            }
            if let Ok(bytes) = std::fs::read(&path)
                && let Ok(fonts) = FontSet::from_bytes(&bytes, None, None)
            {
                return Some(fonts);
            }
        }
    }
    None
}
