// FFmpeg-Anbindung: Timecodes, Header-Parsing, Streaming-Fortschritt,
// Prozess-Runner und Probes.

pub mod metadata;
pub mod probe;
pub mod progress;
pub mod runner;
pub mod timecode;

/// Ersatzprogramm fuer Tests: `sh -c <script> <name> <args...>`, die
/// angehaengten Argumente landen in `$1`, `$2`, ...
#[cfg(all(test, unix))]
pub(crate) fn stand_in(name: &str, script: &str) -> tokio::process::Command {
    let mut command = tokio::process::Command::new("sh");
    command.arg("-c").arg(script).arg(name);
    command
}
