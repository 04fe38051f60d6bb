// Ermittelt die Pfade der externen Programme (ffmpeg, ffprobe, file).
// Keine Konfigurationsdatei – nur Umgebungsvariablen und PATH.

use std::path::PathBuf;

pub const FFMPEG_ENV: &str = "FFMPEG_PATH";
pub const FFPROBE_ENV: &str = "FFPROBE_PATH";
pub const FILE_ENV: &str = "FILE_PATH";

/// Sucht ein Binary in folgender Reihenfolge:
/// 1. Umgebungsvariable `env_var` (nur wenn der Pfad existiert)
/// 2. Neben dem aktuellen Binary (gleicher Ordner wie std::env::current_exe())
/// 3. PATH (einfacher Name, wird vom OS aufgeloest)
pub fn find_binary(name: &str, env_var: &str) -> PathBuf {
    resolve_binary(name, env_var, std::env::var(env_var).ok())
}

/// Wie `find_binary`, aber mit bereits gelesenem Wert der Umgebungsvariable.
fn resolve_binary(name: &str, env_var: &str, env_value: Option<String>) -> PathBuf {
    // 1. Env var
    if let Some(path) = env_value {
        let p = PathBuf::from(&path);
        if p.exists() {
            return p;
        }
        tracing::warn!(env_var, path, "Pfad aus Umgebungsvariable existiert nicht, ignoriert");
    }

    // 2. Neben aktuellem Binary
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    // 3. PATH Fallback
    PathBuf::from(name)
}

pub fn ffmpeg_path() -> PathBuf {
    find_binary("ffmpeg", FFMPEG_ENV)
}

pub fn ffprobe_path() -> PathBuf {
    find_binary("ffprobe", FFPROBE_ENV)
}

pub fn file_path() -> PathBuf {
    find_binary("file", FILE_ENV)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_wins_when_path_exists() {
        let exe = std::env::current_exe().unwrap();
        let value = exe.to_string_lossy().to_string();
        assert_eq!(resolve_binary("does-not-matter", FFMPEG_ENV, Some(value)), exe);
    }

    #[test]
    fn missing_env_path_falls_back_to_name() {
        assert_eq!(
            resolve_binary(
                "ffmpeg-xyz-not-installed",
                FFMPEG_ENV,
                Some("/nonexistent/ffmpeg-xyz".to_string())
            ),
            PathBuf::from("ffmpeg-xyz-not-installed")
        );
    }

    #[test]
    fn unset_env_falls_back_to_name() {
        assert_eq!(
            resolve_binary("ffmpeg-xyz-not-installed", FFMPEG_ENV, None),
            PathBuf::from("ffmpeg-xyz-not-installed")
        );
    }

    #[test]
    fn unset_variable_is_read_from_environment() {
        // Wird von keinem Test gesetzt, daher kein Wettlauf mit anderen Threads
        assert_eq!(
            find_binary("ffmpeg-xyz-not-installed", "FFMPEG_PROGRESS_NEVER_SET"),
            PathBuf::from("ffmpeg-xyz-not-installed")
        );
    }
}
