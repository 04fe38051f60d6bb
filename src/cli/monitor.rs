// Verarbeitet die Events eines Laufs: Statuszeile bzw. NDJSON, Groessen-
// Waechter und gepufferte FFmpeg-Meldungen fuer den Fehlerfall.

use std::io::Write;
use std::time::Instant;

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::display::{format_progress, StatusLine};
use crate::cli::report::{NdjsonWriter, Report};
use crate::cli::size_guard::SizeGuard;
use crate::ffmpeg::progress::FfmpegEvent;

/// Sammelt die stderr-Chunks, die nicht als Fortschritt erkannt wurden.
#[derive(Debug, Default)]
pub struct StderrBuffer {
    chunks: Vec<Vec<u8>>,
}

impl StderrBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Die Overwrite-Frage muss sofort sichtbar sein und wird zurueckgegeben,
    /// alles andere wird fuer die Fehlerausgabe gepuffert.
    pub fn push(&mut self, chunk: Vec<u8>) -> Option<Vec<u8>> {
        if String::from_utf8_lossy(&chunk).contains("Overwrite?") {
            return Some(chunk);
        }
        self.chunks.push(chunk);
        None
    }

    /// Schreibt alle gepufferten Chunks in Eingangsreihenfolge.
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for chunk in &self.chunks {
            out.write_all(chunk)?;
        }
        out.flush()
    }
}

enum Output<W> {
    Json(NdjsonWriter<W>),
    Text(W),
}

pub struct Monitor<W> {
    out: Output<W>,
    line: StatusLine,
    started: Option<Instant>,
    stderr: StderrBuffer,
    size_guard: Option<SizeGuard>,
}

impl<W: AsyncWrite + Unpin> Monitor<W> {
    pub fn new(out: W, json: bool, size_guard: Option<SizeGuard>) -> Self {
        let out = if json {
            Output::Json(NdjsonWriter::new(out))
        } else {
            Output::Text(out)
        };
        Self {
            out,
            line: StatusLine::new(),
            started: None,
            stderr: StderrBuffer::new(),
            size_guard,
        }
    }

    /// Liest Events bis der Sender geschlossen wird.
    pub async fn consume(&mut self, mut rx: mpsc::Receiver<FfmpegEvent>) -> anyhow::Result<()> {
        while let Some(event) = rx.recv().await {
            match event {
                FfmpegEvent::Duration(duration) => {
                    tracing::debug!(%duration, "Gesamtdauer");
                    if let Output::Json(writer) = &mut self.out {
                        writer.write(&Report::Duration { duration }).await?;
                    }
                }
                FfmpegEvent::Time(_) => {}
                FfmpegEvent::Progress(progress) => {
                    // Uhr startet mit dem ersten Update, nicht mit dem Prozess
                    let started = *self.started.get_or_insert_with(Instant::now);
                    let elapsed = started.elapsed().as_secs_f64();

                    let aborted = match &self.size_guard {
                        Some(guard) => guard.check(&progress).await,
                        None => false,
                    };
                    if aborted {
                        self.size_guard = None;
                    }

                    match &mut self.out {
                        Output::Json(writer) => writer.write(&Report::progress(&progress, elapsed)).await?,
                        Output::Text(out) => {
                            let message = format_progress(progress.current_seconds, progress.total_seconds, elapsed);
                            out.write_all(self.line.redraw(&message).as_bytes()).await?;
                            out.flush().await?;
                        }
                    }
                }
                FfmpegEvent::Stderr(chunk) => {
                    if let Some(prompt) = self.stderr.push(chunk) {
                        let mut stderr = std::io::stderr();
                        stderr.write_all(&prompt)?;
                        stderr.flush()?;
                    }
                }
                FfmpegEvent::Stdout(_) => {}
            }
        }
        Ok(())
    }

    pub async fn finish(&mut self, message: &str) -> anyhow::Result<()> {
        match &mut self.out {
            Output::Json(writer) => writer.write(&Report::Done).await?,
            Output::Text(out) => {
                if self.line.is_dirty() {
                    out.write_all(b"\n").await?;
                    self.line.finish();
                }
                out.write_all(format!("{message}\n").as_bytes()).await?;
                out.flush().await?;
            }
        }
        Ok(())
    }

    /// Gibt die gepufferten FFmpeg-Meldungen und den Fehler auf `err` aus.
    pub async fn fail<E: Write>(&mut self, error: &crate::Error, err: &mut E) -> anyhow::Result<()> {
        if self.line.is_dirty() {
            writeln!(err)?;
            self.line.finish();
        }
        self.stderr.dump(err)?;
        writeln!(err, "ffmpeg process error: {error}")?;

        if let Output::Json(writer) = &mut self.out {
            writer
                .write(&Report::Error {
                    message: error.to_string(),
                })
                .await?;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        match self.out {
            Output::Json(writer) => writer.into_inner(),
            Output::Text(out) => out,
        }
    }
}

/// Verarbeitet die Events bis der Runner fertig ist.
///
/// Scheitert die eigene Ausgabe (z.B. EPIPE auf stdout), wird FFmpeg ueber
/// `cancel` beendet und der Runner abgewartet, bevor der Fehler zurueckkommt.
pub async fn watch<W>(
    monitor: &mut Monitor<W>,
    rx: mpsc::Receiver<FfmpegEvent>,
    runner: JoinHandle<crate::Result<()>>,
    cancel: &CancellationToken,
) -> anyhow::Result<crate::Result<()>>
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = monitor.consume(rx).await {
        tracing::debug!(error = %e, "Ausgabe fehlgeschlagen, FFmpeg wird abgebrochen");
        cancel.cancel();
        let _ = runner.await;
        return Err(e);
    }
    runner.await.context("FFmpeg-Task Panik")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context as TaskContext, Poll};
    use std::time::Duration;

    use crate::ffmpeg::progress::ProgressParser;

    /// Leser am anderen Ende der Pipe ist weg.
    struct ClosedPipe;

    impl AsyncWrite for ClosedPipe {
        fn poll_write(self: Pin<&mut Self>, _: &mut TaskContext<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::BrokenPipe.into()))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    async fn feed(events: Vec<FfmpegEvent>) -> mpsc::Receiver<FfmpegEvent> {
        let (tx, rx) = mpsc::channel(64);
        for event in events {
            tx.send(event).await.unwrap();
        }
        rx
    }

    fn parsed(stderr: &[u8]) -> Vec<FfmpegEvent> {
        ProgressParser::new(CancellationToken::new()).feed_chunk(stderr)
    }

    #[test]
    fn overwrite_prompt_is_echoed() {
        let mut buffer = StderrBuffer::new();
        let prompt = b"File 'out.mp4' already exists. Overwrite? [y/N] ".to_vec();

        assert_eq!(buffer.push(prompt.clone()), Some(prompt));
        assert_eq!(buffer.push(b"Unknown encoder 'x'\n".to_vec()), None);

        let mut out = Vec::new();
        buffer.dump(&mut out).unwrap();
        assert_eq!(out, b"Unknown encoder 'x'\n");
    }

    #[test]
    fn dump_keeps_order() {
        let mut buffer = StderrBuffer::new();
        buffer.push(b"first\n".to_vec());
        buffer.push(b"second\n".to_vec());

        let mut out = Vec::new();
        buffer.dump(&mut out).unwrap();
        assert_eq!(out, b"first\nsecond\n");
    }

    #[tokio::test]
    async fn text_status_line_and_finish() {
        let mut monitor = Monitor::new(Vec::new(), false, None);
        let rx = feed(parsed(b"  Duration: 00:00:10.00, start: 0.0\nframe=1 fps=30 time=00:00:05.00 \r")).await;

        monitor.consume(rx).await.unwrap();
        monitor.finish("ffmpeg process finished.").await.unwrap();

        let out = String::from_utf8(monitor.into_inner()).unwrap();
        assert!(out.starts_with("\rprogress=00:00:05/00:00:10 "));
        assert!(out.ends_with("\nffmpeg process finished.\n"));
    }

    #[tokio::test]
    async fn json_lines() {
        let mut monitor = Monitor::new(Vec::new(), true, None);
        let rx = feed(parsed(b"  Duration: 00:00:10.00, start: 0.0\nframe=1 fps=30 time=00:00:05.00 \r")).await;

        monitor.consume(rx).await.unwrap();
        monitor.finish("ignoriert").await.unwrap();

        let out = String::from_utf8(monitor.into_inner()).unwrap();
        let types: Vec<String> = out
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["type"].to_string())
            .collect();
        assert_eq!(types, [r#""duration""#, r#""progress""#, r#""done""#]);
    }

    #[tokio::test]
    async fn failure_dumps_buffered_stderr() {
        let mut monitor = Monitor::new(Vec::new(), false, None);
        let rx = feed(vec![
            FfmpegEvent::Stderr(b"in.mp4: No such file or directory\n".to_vec()),
            FfmpegEvent::Stderr(b"File 'out.mp4' already exists. Overwrite? [y/N] ".to_vec()),
        ])
        .await;
        monitor.consume(rx).await.unwrap();

        let error = crate::Error::AbnormalTermination {
            code: Some(1),
            signal: None,
        };
        let mut err = Vec::new();
        monitor.fail(&error, &mut err).await.unwrap();

        let err = String::from_utf8(err).unwrap();
        assert_eq!(
            err,
            "in.mp4: No such file or directory\nffmpeg process error: FFmpeg abnormal beendet, Exit-Code: 1, Signal: null\n"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn broken_output_stops_ffmpeg() {
        let child = crate::ffmpeg::stand_in(
            "ffmpeg",
            "printf 'frame=1 fps=30 time=00:00:01.00 \\r' >&2; exec sleep 30",
        )
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

        let cancel = CancellationToken::new();
        let (tx, rx) = mpsc::channel(64);
        let runner = tokio::spawn(crate::ffmpeg::runner::attach_child_process(child, tx, cancel.clone()));

        let mut monitor = Monitor::new(ClosedPipe, false, None);
        // Ohne Abbruch wuerde das 30 Sekunden dauern
        let result = tokio::time::timeout(Duration::from_secs(10), watch(&mut monitor, rx, runner, &cancel))
            .await
            .unwrap();

        assert!(result.is_err());
        assert!(cancel.is_cancelled());
    }
}
