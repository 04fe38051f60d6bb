// Extrahiert Dauer, Aufloesung und Audio-Sample-Rate aus der Diagnose-Ausgabe
// von `ffmpeg -i <datei>` (stderr, Header-Block vor dem Encoding).

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tokio::process::Command;

use crate::config;
use crate::error::{Error, Result};
use crate::ffmpeg::timecode::parse_timecode;

// "  Duration: 00:03:00.03, start: 0.000000, bitrate: 2234 kb/s"
// "  Duration: N/A, start: 0.000000, bitrate: N/A"
static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: ([0-9:.]+|N/A),").expect("ungueltige Duration-Regex")
});

// "Stream #0:0[0x1](und): Video: h264 (Baseline) (avc1 / 0x31637661), yuvj420p(pc, progressive), 4032x3024, 2045 kb/s, ..."
// "Stream #0:0[0x1](eng): Video: h264 (High) (avc1 / 0x31637661), yuv420p(tv, bt470bg/unknown/unknown, progressive), 1920x1080 [SAR 1:1 DAR 16:9], ..."
// "Stream #0:1: Video: flv1 (flv), yuv420p, 1080x1920, 200 kb/s, 60 fps, 60 tbr, 1k tbn"
static RESOLUTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #0:\d+[\w\[\]()]*: Video: .+ (\d+x\d+)[\s|,]")
        .expect("ungueltige Resolution-Regex")
});

// "Stream #0:0: Audio: mp3 (mp3float), 44100 Hz, stereo, fltp, 128 kb/s"
static SAMPLE_RATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #0:\d+[\w\[\]()]*: Audio: .+ (\d+) Hz").expect("ungueltige Sample-Rate-Regex")
});

const STREAM_PREFIX: &str = "Stream #0:";

/// Metadaten einer Mediendatei, wie FFmpeg sie im Header meldet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetadata {
    /// z.B. "00:03:00.03" oder "N/A"
    pub duration: String,
    /// z.B. 180.03, NaN bei "N/A"
    pub seconds: f64,
    /// z.B. "4032x3024", None bei reinen Audio-Dateien
    pub resolution: Option<String>,
    /// z.B. 44100, None ohne Audio-Stream
    pub audio_sample_rate: Option<u32>,
}

/// Parst die komplette Diagnose-Ausgabe eines FFmpeg-Aufrufs.
pub fn parse_video_metadata(output: &str) -> Result<VideoMetadata> {
    let caps = DURATION_RE.captures(output).ok_or(Error::MissingDuration)?;
    let duration = caps[1].to_string();
    let seconds = parse_timecode(&duration)?;

    let lines: Vec<&str> = output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let resolution = parse_resolution(&lines)?;
    let audio_sample_rate = parse_audio_sample_rate(&lines)?;

    Ok(VideoMetadata {
        duration,
        seconds,
        resolution,
        audio_sample_rate,
    })
}

fn has_stream(lines: &[&str], kind: &str) -> bool {
    lines
        .iter()
        .any(|line| line.starts_with(STREAM_PREFIX) && line.contains(kind))
}

fn parse_resolution(lines: &[&str]) -> Result<Option<String>> {
    if !has_stream(lines, " Video: ") {
        return Ok(None);
    }

    let resolution = lines
        .iter()
        .find_map(|line| RESOLUTION_RE.captures(line))
        .ok_or(Error::MissingResolution)?;
    Ok(Some(resolution[1].to_string()))
}

fn parse_audio_sample_rate(lines: &[&str]) -> Result<Option<u32>> {
    if !has_stream(lines, " Audio: ") {
        return Ok(None);
    }

    let caps = lines
        .iter()
        .find_map(|line| SAMPLE_RATE_RE.captures(line))
        .ok_or(Error::MissingSampleRate)?;

    let raw = &caps[1];
    match raw.parse::<u32>() {
        Ok(rate) if rate > 0 => Ok(Some(rate)),
        _ => Err(Error::InvalidSampleRate(raw.to_string())),
    }
}

/// Startet `ffmpeg -i <datei>` ohne Ausgabe und parst den Header auf stderr.
///
/// FFmpeg beendet sich dabei immer mit Fehler ("At least one output file must
/// be specified"), der Exit-Code wird deshalb ignoriert.
pub async fn scan_video(path: &Path) -> Result<VideoMetadata> {
    scan_video_with(Command::new(config::ffmpeg_path()), path).await
}

pub(crate) async fn scan_video_with(mut ffmpeg: Command, path: &Path) -> Result<VideoMetadata> {
    ffmpeg
        .arg("-hide_banner")
        .arg("-i")
        .arg(path.as_os_str())
        .stdin(std::process::Stdio::null());
    let result = ffmpeg.output().await;
    let output = result.map_err(|source| Error::spawn(&ffmpeg, source))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    parse_video_metadata(&stderr).inspect_err(|e| {
        tracing::debug!(path = %path.display(), error = %e, output = %stderr, "Header nicht parsebar");
    })
}
