// Fehlertypen der Bibliothek. Das Binary wickelt sie in anyhow ein.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Videodauer nicht gefunden")]
    MissingDuration,

    #[error("Video-Stream vorhanden, aber keine Aufloesung gefunden")]
    MissingResolution,

    #[error("Audio-Stream vorhanden, aber keine Sample-Rate gefunden")]
    MissingSampleRate,

    #[error("Sample-Rate nicht parsebar: {0:?}")]
    InvalidSampleRate(String),

    #[error("Ungueltiger Timecode: {0:?}")]
    InvalidTimeCode(String),

    #[error(
        "FFmpeg abnormal beendet, Exit-Code: {}, Signal: {}",
        display_code(.code),
        display_signal(.signal)
    )]
    AbnormalTermination {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("Aufloesung nicht in `file`-Ausgabe gefunden: {0:?}")]
    InvalidImageResolutionText(String),

    #[error("ffprobe Dauer nicht parsebar: {0:?}")]
    InvalidProbedDuration(String),

    #[error("{program:?} konnte nicht gestartet werden: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn spawn(command: &tokio::process::Command, source: std::io::Error) -> Self {
        Error::Spawn {
            program: PathBuf::from(command.as_std().get_program()),
            source,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "null".to_string(), |c| c.to_string())
}

fn display_signal(signal: &Option<i32>) -> String {
    signal.map_or_else(|| "null".to_string(), signal_name)
}

/// Name eines Unix-Signals, z.B. 9 → "SIGKILL". Unbekannte Nummern werden
/// als "SIG<n>" ausgegeben.
#[cfg(unix)]
pub fn signal_name(signal: i32) -> String {
    let name = match signal {
        libc::SIGHUP => "SIGHUP",
        libc::SIGINT => "SIGINT",
        libc::SIGQUIT => "SIGQUIT",
        libc::SIGABRT => "SIGABRT",
        libc::SIGKILL => "SIGKILL",
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGPIPE => "SIGPIPE",
        libc::SIGTERM => "SIGTERM",
        libc::SIGSTOP => "SIGSTOP",
        _ => return format!("SIG{signal}"),
    };
    name.to_string()
}

#[cfg(not(unix))]
pub fn signal_name(signal: i32) -> String {
    format!("SIG{signal}")
}
