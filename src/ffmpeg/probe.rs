// Hilfsaufrufe an externe Programme: Dauer via ffprobe, Aufloesung via
// extrahiertem Einzelbild + `file`.

use std::path::Path;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;

use crate::config;
use crate::error::{Error, Result};
use crate::ffmpeg::runner::check_exit_status;

/// Pixel-Aufloesung eines tatsaechlich dekodierten Frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Ermittelt die Dauer einer Mediendatei in Sekunden via ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64> {
    probe_duration_with(Command::new(config::ffprobe_path()), path).await
}

pub(crate) async fn probe_duration_with(mut ffprobe: Command, path: &Path) -> Result<f64> {
    ffprobe
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path.as_os_str())
        .stdin(Stdio::null());
    let result = ffprobe.output().await;
    let output = result.map_err(|source| Error::spawn(&ffprobe, source))?;

    if !output.status.success() {
        tracing::warn!(
            path = %path.display(),
            code = ?output.status.code(),
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "ffprobe fehlgeschlagen"
        );
    }

    parse_probed_duration(&String::from_utf8_lossy(&output.stdout))
}

/// Parst die rohe Dauer-Ausgabe von ffprobe, z.B. "23.400000\n".
pub fn parse_probed_duration(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds != 0.0 => Ok(seconds),
        _ => Err(Error::InvalidProbedDuration(trimmed.to_string())),
    }
}

/// Ermittelt die Aufloesung ueber ein extrahiertes Einzelbild.
///
/// Die Stream-Metadaten liefern die Aufloesung vor der Rotation; das
/// materialisierte Bild zeigt das tatsaechliche Pixelraster.
pub async fn probe_resolution(path: &Path) -> Result<Resolution> {
    let frame_path = std::env::temp_dir().join(format!("ffmpeg-progress-{}.jpg", uuid::Uuid::new_v4()));
    probe_resolution_with(
        Command::new(config::ffmpeg_path()),
        Command::new(config::file_path()),
        path,
        &frame_path,
    )
    .await
}

/// Das Einzelbild unter `frame_path` wird in jedem Fall wieder entfernt.
pub(crate) async fn probe_resolution_with(
    ffmpeg: Command,
    file: Command,
    path: &Path,
    frame_path: &Path,
) -> Result<Resolution> {
    let result = extract_frame_resolution(ffmpeg, file, path, frame_path).await;

    if let Err(e) = tokio::fs::remove_file(frame_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %frame_path.display(), error = %e, "Temporaeres Bild nicht geloescht");
        }
    }

    result
}

async fn extract_frame_resolution(
    mut ffmpeg: Command,
    mut file: Command,
    path: &Path,
    frame_path: &Path,
) -> Result<Resolution> {
    ffmpeg
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(path.as_os_str())
        .args(["-frames:v", "1"])
        .arg(frame_path.as_os_str())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    let result = ffmpeg.status().await;
    let status = result.map_err(|source| Error::spawn(&ffmpeg, source))?;

    check_exit_status(status)?;

    file.arg(frame_path.as_os_str()).stdin(Stdio::null());
    let result = file.output().await;
    let output = result.map_err(|source| Error::spawn(&file, source))?;

    parse_image_resolution(&String::from_utf8_lossy(&output.stdout))
}

/// Parst die Aufloesung aus der Beschreibung von `file`.
///
/// z.B. "frame.jpg: JPEG image data, JFIF standard 1.01, aspect ratio,
/// density 1x1, segment length 16, baseline, precision 8, 848x480, components 3"
///
/// Von hinten gesucht, damit "density 1x1" nicht gewinnt.
pub fn parse_image_resolution(text: &str) -> Result<Resolution> {
    text.trim()
        .rsplit(',')
        .find_map(|part| parse_dimensions(part.trim()))
        .ok_or_else(|| Error::InvalidImageResolutionText(text.trim().to_string()))
}

fn parse_dimensions(token: &str) -> Option<Resolution> {
    let (width, height) = token.split_once('x')?;
    Some(Resolution {
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}
