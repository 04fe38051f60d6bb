// NDJSON-Ausgabe fuer `--json` und `--probe`: ein JSON-Objekt pro Zeile auf stdout.

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::ffmpeg::metadata::VideoMetadata;
use crate::ffmpeg::probe::Resolution;
use crate::ffmpeg::progress::ProgressEvent;
use crate::metrics;

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Report {
    #[serde(rename = "duration")]
    Duration { duration: String },

    #[serde(rename = "progress")]
    Progress {
        time: String,
        duration: String,
        current_seconds: f64,
        total_seconds: f64,
        delta_seconds: f64,
        elapsed_seconds: f64,
        percent: f64,
        // NaN/inf werden von serde_json als null geschrieben
        speed: f64,
        eta_seconds: f64,
    },

    #[serde(rename = "done")]
    Done,

    #[serde(rename = "error")]
    Error { message: String },
}

impl Report {
    pub fn progress(event: &ProgressEvent, elapsed_seconds: f64) -> Self {
        Report::Progress {
            time: event.time.clone(),
            duration: event.duration.clone(),
            current_seconds: event.current_seconds,
            total_seconds: event.total_seconds,
            delta_seconds: event.delta_seconds,
            elapsed_seconds,
            percent: metrics::calculate_progress(event.current_seconds, event.total_seconds) * 100.0,
            speed: metrics::speed(event.current_seconds, elapsed_seconds),
            eta_seconds: metrics::eta(event.current_seconds, event.total_seconds, elapsed_seconds),
        }
    }
}

/// Ergebnis von `--probe`.
#[derive(Debug, Serialize)]
pub struct ProbeReport {
    #[serde(flatten)]
    pub metadata: VideoMetadata,
    /// Dauer laut ffprobe, None wenn nicht ermittelbar
    pub probed_duration: Option<f64>,
    /// Aufloesung des dekodierten ersten Frames (nach Rotation)
    pub frame_resolution: Option<Resolution>,
}

/// Schreibt Serde-Werte als NDJSON. Flush nach jeder Zeile, damit
/// ein Leser am anderen Ende der Pipe sofort etwas sieht.
pub struct NdjsonWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> NdjsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write<T: Serialize>(&mut self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string(value)?;
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
