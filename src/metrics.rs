// Abgeleitete Kennzahlen: Encoding-Tempo, Restzeit und geschaetzte Dateigroesse.
// Division durch 0 ist hier erlaubt (inf/NaN), die Anzeige muss damit umgehen.

/// Encoding-Tempo: verarbeitete Mediensekunden pro echter Sekunde.
/// Beim ersten Tick (elapsed = 0) inf bzw. NaN.
pub fn speed(current_seconds: f64, elapsed_seconds: f64) -> f64 {
    current_seconds / elapsed_seconds
}

/// Geschaetzte Restzeit in echten Sekunden.
pub fn eta(current_seconds: f64, total_seconds: f64, elapsed_seconds: f64) -> f64 {
    (total_seconds - current_seconds) / speed(current_seconds, elapsed_seconds)
}

/// Momentaufnahme fuer die Hochrechnung der Ausgabegroesse.
#[derive(Debug, Clone, Copy)]
pub struct OutputSizeEstimate {
    pub input_size: u64,
    pub current_output_size: u64,
    pub current_seconds: f64,
    pub total_seconds: f64,
}

impl OutputSizeEstimate {
    /// Linear hochgerechnete Groesse der Ausgabedatei in Bytes.
    /// NaN solange `current_seconds` 0 ist.
    pub fn estimated_output_size(&self) -> f64 {
        let current = self.current_output_size as f64;
        let rate = current / self.current_seconds;
        let remaining_seconds = self.total_seconds - self.current_seconds;
        current + rate * remaining_seconds
    }

    /// true wenn die Ausgabe schon groesser als die Eingabe ist, oder ab 10%
    /// Fortschritt voraussichtlich groesser wird.
    pub fn exceeds_input(&self) -> bool {
        if self.current_output_size > self.input_size {
            return true;
        }
        calculate_progress(self.current_seconds, self.total_seconds) >= 0.1
            && self.estimated_output_size() > self.input_size as f64
    }
}

/// Anteil 0.0 – 1.0, 0 solange die Gesamtdauer unbekannt ist.
pub fn calculate_progress(current_seconds: f64, total_seconds: f64) -> f64 {
    if total_seconds.is_nan() || total_seconds <= 0.0 {
        return 0.0;
    }
    (current_seconds / total_seconds).clamp(0.0, 1.0)
}
