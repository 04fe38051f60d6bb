// Haengt den ProgressParser an einen FFmpeg-Prozess (oder eine Pipe) und
// liefert die Events ueber einen mpsc channel zurueck.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config;
use crate::error::{Error, Result};
use crate::ffmpeg::progress::{FfmpegEvent, ProgressParser};

const CHUNK_SIZE: usize = 8 * 1024;

/// Drehung im Uhrzeigersinn fuer `rotate_video`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Akzeptiert 90, 180, 270 (und -90 als 270).
    pub fn from_degrees(angle: i32) -> Option<Self> {
        match angle.rem_euclid(360) {
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    fn filter(self) -> &'static str {
        match self {
            Self::Deg90 => "transpose=1",
            Self::Deg180 => "transpose=1,transpose=1",
            Self::Deg270 => "transpose=2",
        }
    }
}

/// Argumente fuer eine einfache Konvertierung `ffmpeg -y -i <in> <out>`.
pub fn build_convert_args(input_path: &Path, output_path: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Argumente fuer eine Drehung per transpose-Filter.
pub fn build_rotate_args(input_path: &Path, output_path: &Path, rotation: Rotation) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        input_path.to_string_lossy().to_string(),
        "-vf".to_string(),
        rotation.filter().to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Konvertiert `input_path` nach `output_path` und meldet den Fortschritt.
pub async fn convert_file(
    input_path: &Path,
    output_path: &Path,
    tx: mpsc::Sender<FfmpegEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let args = build_convert_args(input_path, output_path);
    run_ffmpeg(Command::new(config::ffmpeg_path()), &args, tx, cancel).await
}

/// Dreht ein Video und meldet den Fortschritt.
pub async fn rotate_video(
    input_path: &Path,
    output_path: &Path,
    rotation: Rotation,
    tx: mpsc::Sender<FfmpegEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let args = build_rotate_args(input_path, output_path, rotation);
    run_ffmpeg(Command::new(config::ffmpeg_path()), &args, tx, cancel).await
}

async fn run_ffmpeg(
    mut ffmpeg: Command,
    args: &[String],
    tx: mpsc::Sender<FfmpegEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    tracing::debug!(ffmpeg = ?ffmpeg.as_std().get_program(), ?args, "starte FFmpeg");
    ffmpeg
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let result = ffmpeg.spawn();
    let child = result.map_err(|source| Error::spawn(&ffmpeg, source))?;

    attach_child_process(child, tx, cancel).await
}

/// Liest stderr (wird geparst) und stdout (wird als `FfmpegEvent::Stdout`
/// durchgereicht) eines laufenden Prozesses bis beide geschlossen sind.
///
/// * `child` – Prozess mit `Stdio::piped()` fuer stderr; stdout ist optional
/// * `tx` – Channel fuer Events
/// * `cancel` – Abbruch: sendet SIGKILL, liest aber weiter bis der Prozess weg ist
///
/// Erfolgreich nur bei Exit-Code 0, sonst `Error::AbnormalTermination`.
/// Schlaegt das Lesen fehl, wird der Prozess beendet und abgewartet bevor
/// der Fehler zurueckkommt.
pub async fn attach_child_process(
    mut child: Child,
    tx: mpsc::Sender<FfmpegEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut stderr = child.stderr.take();
    let mut stdout = child.stdout.take();
    if stderr.is_none() {
        tracing::warn!("stderr nicht gepiped, es werden keine Fortschritts-Events erzeugt");
    }

    let mut parser = ProgressParser::new(cancel.clone());
    let mut stderr_buf = vec![0u8; CHUNK_SIZE];
    let mut stdout_buf = vec![0u8; CHUNK_SIZE];
    let mut kill_sent = false;
    let mut read_error = None;

    while stderr.is_some() || stdout.is_some() {
        tokio::select! {
            _ = cancel.cancelled(), if !kill_sent => {
                kill_sent = true;
                tracing::debug!(pid = ?child.id(), "Abbruch angefordert, sende SIGKILL");
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "FFmpeg konnte nicht beendet werden");
                }
            }
            read = read_chunk(&mut stderr, &mut stderr_buf), if stderr.is_some() => {
                match read {
                    Ok(0) => stderr = None,
                    Ok(n) => {
                        for event in parser.feed_chunk(&stderr_buf[..n]) {
                            let _ = tx.send(event).await;
                        }
                    }
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
            read = read_chunk(&mut stdout, &mut stdout_buf), if stdout.is_some() => {
                match read {
                    Ok(0) => stdout = None,
                    Ok(n) => {
                        let _ = tx.send(FfmpegEvent::Stdout(stdout_buf[..n].to_vec())).await;
                    }
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
        }
    }

    if let Some(e) = read_error {
        tracing::warn!(pid = ?child.id(), error = %e, "Lesen fehlgeschlagen, FFmpeg wird beendet");
        if !kill_sent {
            let _ = child.start_kill();
        }
        let _ = child.wait().await;
        return Err(e.into());
    }

    let status = child.wait().await?;
    check_exit_status(status)
}

/// Pipe-Modus: parst einen beliebigen Byte-Stream (z.B. stdin bei
/// `ffmpeg ... 2>&1 | ffmpeg-progress`) bis EOF.
/// Ohne Prozess gibt es keinen Exit-Code; Abbruch beendet nur das Lesen.
pub async fn attach_stream<R>(mut stream: R, tx: mpsc::Sender<FfmpegEvent>, cancel: CancellationToken) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut parser = ProgressParser::new(cancel.clone());
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("Abbruch angefordert, Stream wird nicht weiter gelesen");
                return Ok(());
            }
            read = stream.read(&mut buf) => {
                match read? {
                    0 => return Ok(()),
                    n => {
                        for event in parser.feed_chunk(&buf[..n]) {
                            let _ = tx.send(event).await;
                        }
                    }
                }
            }
        }
    }
}

async fn read_chunk<R>(reader: &mut Option<R>, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(r) => r.read(buf).await,
        None => Ok(0),
    }
}

pub(crate) fn check_exit_status(status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    #[cfg(unix)]
    let signal = std::os::unix::process::ExitStatusExt::signal(&status);
    #[cfg(not(unix))]
    let signal = None;

    Err(Error::AbnormalTermination {
        code: status.code(),
        signal,
    })
}
