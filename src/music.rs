//! Built-in background-music catalog. Selection is a pure keyword lookup;
//! the chosen URL feeds the export as the music bed.

/// One royalty-free track with the moods it suits.
#[derive(Clone, Copy, Debug)]
pub struct MusicTrack {
    pub name: &'static str,
    pub mood: &'static str,
    pub url: &'static str,
}

pub const MUSIC_TRACKS: &[MusicTrack] = &[
    MusicTrack {
        name: "Enchanted Lullaby",
        mood: "magical, gentle, dreamy, whimsical, sleepy, calm, soothing",
        url: "https://cdn.pixabay.com/download/audio/2025/08/12/audio_69862e2bf1.mp3?filename=lullaby-baby-sleep-music-388567.mp3",
    },
    MusicTrack {
        name: "Joyful Day",
        mood: "happy, cheerful, upbeat, playful, joyful, bright, fun",
        url: "https://cdn.pixabay.com/download/audio/2021/09/06/audio_1e760b4ae7.mp3?filename=twinkle-like-a-star-8026.mp3",
    },
    MusicTrack {
        name: "Funny Frolic",
        mood: "funny, quirky, silly, comical, playful, bouncy",
        url: "https://cdn.pixabay.com/download/audio/2025/06/26/audio_20abff189b.mp3?filename=lullaby-bells-baby-music-loop-366300.mp3",
    },
    MusicTrack {
        name: "Mysterious Meadow",
        mood: "mysterious, curious, wondrous, suspenseful, intriguing, thoughtful",
        url: "https://cdn.pixabay.com/download/audio/2025/08/29/audio_34f03dbf89.mp3?filename=lullaby-berceuse-du-petit-prince-et-de-la-princesse-french-393576.mp",
    },
];

/// Pick the track whose mood keywords best overlap the requested mood.
///
/// Deterministic: ties go to the earlier catalog entry, and a mood with no
/// overlap at all falls back to the first track.
pub fn pick_track(mood: &str) -> &'static MusicTrack {
    let wanted: Vec<String> = mood
        .to_ascii_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    let mut best = &MUSIC_TRACKS[0];
    let mut best_score = 0usize;
    for track in MUSIC_TRACKS {
        let score = track
            .mood
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .filter(|keyword| wanted.iter().any(|w| w == keyword))
            .count();
        if score > best_score {
            best = track;
            best_score = score;
        }
    }
    best
}
