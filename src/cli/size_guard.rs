// `--abort-if-larger`: bricht FFmpeg ab, sobald die Ausgabedatei die
// Eingabedatei ueberholt oder hochgerechnet ueberholen wird.

use std::path::PathBuf;

use crate::ffmpeg::progress::ProgressEvent;
use crate::metrics::OutputSizeEstimate;

pub struct SizeGuard {
    input_size: u64,
    output: PathBuf,
}

impl SizeGuard {
    /// None wenn die Eingabedatei nicht gelesen werden kann.
    pub async fn new(input: PathBuf, output: PathBuf) -> Option<Self> {
        match tokio::fs::metadata(&input).await {
            Ok(meta) => Some(Self {
                input_size: meta.len(),
                output,
            }),
            Err(e) => {
                tracing::warn!(input = %input.display(), error = %e, "Eingabegroesse unbekannt, --abort-if-larger deaktiviert");
                None
            }
        }
    }

    /// Prueft den aktuellen Stand und ruft bei Bedarf `event.abort()` auf.
    /// Gibt true zurueck wenn abgebrochen wurde.
    pub async fn check(&self, event: &ProgressEvent) -> bool {
        if event.total_seconds <= 0.0 {
            return false;
        }
        // Die Ausgabe existiert evtl. noch nicht
        let Ok(meta) = tokio::fs::metadata(&self.output).await else {
            return false;
        };

        let estimate = OutputSizeEstimate {
            input_size: self.input_size,
            current_output_size: meta.len(),
            current_seconds: event.current_seconds,
            total_seconds: event.total_seconds,
        };
        if !estimate.exceeds_input() {
            return false;
        }

        tracing::warn!(
            input_size = self.input_size,
            output_size = meta.len(),
            estimated = estimate.estimated_output_size(),
            "Ausgabe wird groesser als die Eingabe, FFmpeg wird abgebrochen"
        );
        event.abort();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn event(current_seconds: f64, cancel: &CancellationToken) -> ProgressEvent {
        ProgressEvent {
            delta_seconds: 0.0,
            current_seconds,
            total_seconds: 40.0,
            time: String::new(),
            duration: String::new(),
            cancel: cancel.clone(),
        }
    }

    async fn write_temp(name: &str, len: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ffmpeg-progress-{}-{name}", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, vec![0u8; len]).await.unwrap();
        path
    }

    #[tokio::test]
    async fn aborts_when_projection_exceeds_input() {
        let input = write_temp("in", 3000).await;
        let output = write_temp("out", 1000).await;
        let guard = SizeGuard::new(input.clone(), output.clone()).await.unwrap();
        let cancel = CancellationToken::new();

        // 1000 Bytes nach 5s von 40s → 8000 hochgerechnet, aber erst 12.5%
        assert!(guard.check(&event(5.0, &cancel)).await);
        assert!(cancel.is_cancelled());

        let _ = tokio::fs::remove_file(input).await;
        let _ = tokio::fs::remove_file(output).await;
    }

    #[tokio::test]
    async fn keeps_running_when_smaller() {
        let input = write_temp("in", 3000).await;
        let output = write_temp("out", 100).await;
        let guard = SizeGuard::new(input.clone(), output.clone()).await.unwrap();
        let cancel = CancellationToken::new();

        assert!(!guard.check(&event(20.0, &cancel)).await);
        assert!(!cancel.is_cancelled());

        let _ = tokio::fs::remove_file(input).await;
        let _ = tokio::fs::remove_file(output).await;
    }

    #[tokio::test]
    async fn missing_output_is_not_an_error() {
        let input = write_temp("in", 3000).await;
        let guard = SizeGuard::new(input.clone(), PathBuf::from("/nonexistent/out.mp4"))
            .await
            .unwrap();
        let cancel = CancellationToken::new();

        assert!(!guard.check(&event(20.0, &cancel)).await);

        let _ = tokio::fs::remove_file(input).await;
    }

    #[tokio::test]
    async fn missing_input_disables_guard() {
        let guard = SizeGuard::new(PathBuf::from("/nonexistent/in.mp4"), PathBuf::from("out.mp4")).await;
        assert!(guard.is_none());
    }
}
