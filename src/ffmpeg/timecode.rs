// Umrechnung zwischen FFmpeg-Timecodes ("HH:MM:SS.frac") und Sekunden.
// "N/A" steht fuer eine unbekannte Zeit und wird auf f64::NAN abgebildet.

use crate::error::{Error, Result};

/// Platzhalter den FFmpeg fuer unbekannte Zeiten ausgibt.
pub const NOT_AVAILABLE: &str = "N/A";

/// Parst einen Timecode in Sekunden.
///
/// `"00:01:00.03"` → `60.03`, `"N/A"` → `NaN`.
/// Alles andere als genau drei numerische Felder ist ein Fehler.
pub fn parse_timecode(text: &str) -> Result<f64> {
    if text == NOT_AVAILABLE {
        return Ok(f64::NAN);
    }

    let invalid = || Error::InvalidTimeCode(text.to_string());

    let mut parts = text.split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours: f64 = h.parse().map_err(|_| invalid())?;
    let minutes: f64 = m.parse().map_err(|_| invalid())?;
    let seconds: f64 = s.parse().map_err(|_| invalid())?;

    Ok((hours * 60.0 + minutes) * 60.0 + seconds)
}

/// Formatiert Sekunden als Timecode.
///
/// Der Nachkommateil wird ziffernweise aus der kanonischen Darstellung der
/// Zahl uebernommen, nicht gerundet: `60.1234` → `"00:01:00.1234"`.
/// NaN (und ±inf) → `"N/A"`.
pub fn format_timecode(seconds: f64) -> String {
    if !seconds.is_finite() {
        return NOT_AVAILABLE.to_string();
    }
    // -0.0 wuerde sonst als "-0" formatiert
    let seconds = if seconds == 0.0 { 0.0 } else { seconds };

    let h = (seconds / 3600.0).floor();
    let m = ((seconds % 3600.0) / 60.0).floor();
    let s = (seconds % 60.0).floor();

    // 60.1234 % 1 waere 0.12339999999999662, deshalb ueber den String
    let canonical = seconds.to_string();
    let fraction = canonical.split_once('.').map_or("", |(_, frac)| frac);

    if fraction.is_empty() {
        format!("{h:02}:{m:02}:{s:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}.{fraction}")
    }
}
