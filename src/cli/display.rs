// Einzeilige Fortschrittsanzeige, wird per '\r' ueberschrieben.

use crate::ffmpeg::timecode::format_timecode;
use crate::metrics;

/// Ganze Sekunden als Timecode, inf/NaN → "N/A", negative Werte als 0.
fn whole(seconds: f64) -> String {
    // NaN < 0.0 ist false, bleibt also NaN
    let seconds = if seconds < 0.0 { 0.0 } else { seconds };
    format_timecode(seconds.round())
}

/// z.B. "progress=00:00:05/00:00:10 speed=2.0x elapsed=00:00:03 eta=00:00:03"
pub fn format_progress(current_seconds: f64, total_seconds: f64, elapsed_seconds: f64) -> String {
    let speed = metrics::speed(current_seconds, elapsed_seconds);
    let eta = if total_seconds > 0.0 {
        metrics::eta(current_seconds, total_seconds, elapsed_seconds)
    } else {
        f64::NAN
    };
    format!(
        "progress={}/{} speed={:.1}x elapsed={} eta={}",
        whole(current_seconds),
        whole(total_seconds),
        speed,
        whole(elapsed_seconds),
        whole(eta),
    )
}

/// Merkt sich die Laenge der letzten Zeile, damit kuerzere Zeilen die alte
/// komplett ueberschreiben.
#[derive(Debug, Default)]
pub struct StatusLine {
    last_len: usize,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Liefert den zu schreibenden Text inkl. fuehrendem '\r'.
    pub fn redraw(&mut self, message: &str) -> String {
        let width = self.last_len;
        self.last_len = message.chars().count();
        format!("\r{message:<width$}")
    }

    /// true wenn seit dem letzten Abschluss etwas gezeichnet wurde.
    pub fn is_dirty(&self) -> bool {
        self.last_len > 0
    }

    pub fn finish(&mut self) {
        self.last_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_line() {
        assert_eq!(
            format_progress(5.0, 10.0, 2.5),
            "progress=00:00:05/00:00:10 speed=2.0x elapsed=00:00:03 eta=00:00:03"
        );
    }

    #[test]
    fn first_tick_has_no_eta() {
        assert_eq!(
            format_progress(0.0, 10.0, 0.0),
            "progress=00:00:00/00:00:10 speed=NaNx elapsed=00:00:00 eta=N/A"
        );
    }

    #[test]
    fn unknown_total() {
        assert_eq!(
            format_progress(5.0, 0.0, 5.0),
            "progress=00:00:05/00:00:00 speed=1.0x elapsed=00:00:05 eta=N/A"
        );
    }

    #[test]
    fn position_past_total_has_zero_eta() {
        // Bei mehreren Eingaben kann die Position die zuerst gemeldete Dauer ueberholen
        assert_eq!(
            format_progress(13.0, 10.0, 10.0),
            "progress=00:00:13/00:00:10 speed=1.3x elapsed=00:00:10 eta=00:00:00"
        );
    }

    #[test]
    fn shorter_line_is_padded() {
        let mut line = StatusLine::new();
        assert_eq!(line.redraw("abcdef"), "\rabcdef");
        assert_eq!(line.redraw("xy"), "\rxy    ");
        assert_eq!(line.redraw("123"), "\r123");
        assert!(line.is_dirty());
        line.finish();
        assert!(!line.is_dirty());
    }
}
