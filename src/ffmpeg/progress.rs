// Parst FFmpeg stderr-Ausgabe chunkweise (Bytes wie sie aus der Pipe kommen).
// Erkennt die Duration-Zeile des Headers und die Statuszeilen
// "frame=... fps=... time=HH:MM:SS.xx ..." und erzeugt daraus Events.

use std::sync::LazyLock;

use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::ffmpeg::timecode::parse_timecode;

// Nur konkrete Timecodes: "Duration: N/A," laesst total_seconds auf 0.
static STREAM_DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Duration: ([0-9:.]+),").expect("ungueltige Duration-Regex"));

// "frame=  100 fps= 25 q=28.0 size=  1024kB time=00:00:04.00 bitrate=2097.2kbits/s speed=1.00x"
// Statuszeilen enden mit '\r', daher darf `.*` keine Zeilenumbrueche ueberspringen.
static STATUS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"frame=\s*\d+\s+fps=[^\r\n]*time=([0-9:.]+)\s").expect("ungueltige Status-Regex")
});

/// Ein Fortschritts-Update, erzeugt pro erkannter Statuszeile.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    /// Sekunden seit dem letzten Event (beim ersten Event seit 0)
    pub delta_seconds: f64,
    pub current_seconds: f64,
    /// 0 solange keine Duration-Zeile gesehen wurde
    pub total_seconds: f64,
    /// z.B. "00:00:05.00"
    pub time: String,
    /// z.B. "00:00:10.00", leer solange keine Duration-Zeile gesehen wurde
    pub duration: String,
    pub cancel: CancellationToken,
}

impl ProgressEvent {
    /// Fordert den Abbruch des FFmpeg-Prozesses an (SIGKILL).
    /// Weitere Events koennen trotzdem noch eintreffen.
    pub fn abort(&self) {
        self.cancel.cancel();
    }
}

/// Events die der Runner an den Aufrufer sendet.
#[derive(Debug, Clone)]
pub enum FfmpegEvent {
    /// Duration-Zeile erkannt, z.B. "00:00:10.00"
    Duration(String),
    /// Statuszeile erkannt, roher Timecode
    Time(String),
    Progress(ProgressEvent),
    /// stderr-Chunk ohne erkannte Zeile (z.B. fuer Fehlermeldungen puffern)
    Stderr(Vec<u8>),
    /// stdout-Chunk, unveraendert durchgereicht
    Stdout(Vec<u8>),
}

/// Zustand eines einzelnen Streams. Pro Prozess eine neue Instanz.
///
/// Jeder Chunk wird fuer sich dekodiert und durchsucht. Eine Statuszeile, die
/// genau auf einer Chunk-Grenze geteilt wird, geht dabei verloren; das naechste
/// Update holt den Stand wieder auf (die Deltas summieren sich weiterhin korrekt).
pub struct ProgressParser {
    duration: String,
    total_seconds: f64,
    last_seconds: f64,
    cancel: CancellationToken,
}

impl ProgressParser {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            duration: String::new(),
            total_seconds: 0.0,
            last_seconds: 0.0,
            cancel,
        }
    }

    /// Fuettert einen rohen stderr-Chunk.
    /// Gibt die Events in der Reihenfolge zurueck, in der sie zugestellt werden sollen.
    pub fn feed_chunk(&mut self, chunk: &[u8]) -> Vec<FfmpegEvent> {
        let text = String::from_utf8_lossy(chunk);
        let mut events = Vec::new();

        if let Some(caps) = STREAM_DURATION_RE.captures(&text) {
            let duration = &caps[1];
            match parse_timecode(duration) {
                Ok(seconds) => {
                    tracing::debug!(duration, seconds, "Duration erkannt");
                    self.duration = duration.to_string();
                    self.total_seconds = seconds;
                    events.push(FfmpegEvent::Duration(self.duration.clone()));
                }
                Err(e) => tracing::warn!(error = %e, "Duration-Zeile ignoriert"),
            }
        }

        for caps in STATUS_LINE_RE.captures_iter(&text) {
            let time = &caps[1];
            let current_seconds = match parse_timecode(time) {
                Ok(seconds) => seconds,
                Err(e) => {
                    tracing::warn!(error = %e, "Statuszeile ignoriert");
                    continue;
                }
            };

            let delta_seconds = current_seconds - self.last_seconds;
            self.last_seconds = current_seconds;

            events.push(FfmpegEvent::Time(time.to_string()));
            events.push(FfmpegEvent::Progress(ProgressEvent {
                delta_seconds,
                current_seconds,
                total_seconds: self.total_seconds,
                time: time.to_string(),
                duration: self.duration.clone(),
                cancel: self.cancel.clone(),
            }));
        }

        if events.is_empty() {
            events.push(FfmpegEvent::Stderr(chunk.to_vec()));
        }

        events
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }
}
