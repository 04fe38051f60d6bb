// Kommandozeilen-Oberflaeche: Argumente, Statuszeile, NDJSON-Ausgabe.

pub mod args;
pub mod display;
pub mod monitor;
pub mod report;
pub mod size_guard;
