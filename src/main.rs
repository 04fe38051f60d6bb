// Einstiegspunkt: startet FFmpeg (oder liest eine Pipe) und zeigt den
// Fortschritt als ueberschriebene Statuszeile bzw. NDJSON auf stdout.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use ffmpeg_progress::cli::args::{self, Command as CliCommand, Options};
use ffmpeg_progress::cli::monitor::{watch, Monitor};
use ffmpeg_progress::cli::report::ProbeReport;
use ffmpeg_progress::cli::size_guard::SizeGuard;
use ffmpeg_progress::config;
use ffmpeg_progress::ffmpeg::progress::FfmpegEvent;
use ffmpeg_progress::ffmpeg::{metadata, probe, runner};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs auf stderr, damit die Statuszeile auf stdout sauber bleibt
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match args::parse_args(std::env::args().skip(1)) {
        CliCommand::Help => {
            println!("{}", args::HELP.trim());
            Ok(())
        }
        CliCommand::Version => {
            println!("ffmpeg-progress {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        CliCommand::Probe(path) => run_probe(&path).await,
        CliCommand::Pipe(options) => run_pipe(options).await,
        CliCommand::Wrap {
            ffmpeg_args,
            options,
        } => run_wrapped(ffmpeg_args, options).await,
    }
}

async fn run_probe(path: &Path) -> Result<()> {
    let metadata = metadata::scan_video(path)
        .await
        .with_context(|| format!("Metadaten von {:?} nicht lesbar", path))?;

    let (duration, resolution) = tokio::join!(probe::probe_duration(path), probe::probe_resolution(path));
    let report = ProbeReport {
        metadata,
        probed_duration: duration
            .inspect_err(|e| tracing::warn!(error = %e, "ffprobe Dauer nicht ermittelbar"))
            .ok(),
        frame_resolution: resolution
            .inspect_err(|e| tracing::warn!(error = %e, "Frame-Aufloesung nicht ermittelbar"))
            .ok(),
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    Ok(())
}

async fn run_pipe(options: Options) -> Result<()> {
    if !options.json {
        println!("reading ffmpeg output from pipe...");
    }

    let (tx, rx) = mpsc::channel::<FfmpegEvent>(256);
    let cancel = CancellationToken::new();
    let reader = tokio::spawn(runner::attach_stream(tokio::io::stdin(), tx, cancel.clone()));

    let mut monitor = Monitor::new(tokio::io::stdout(), options.json, None);
    watch(&mut monitor, rx, reader, &cancel).await??;

    monitor.finish("end of ffmpeg output.").await
}

async fn run_wrapped(ffmpeg_args: Vec<String>, options: Options) -> Result<()> {
    let ffmpeg = config::ffmpeg_path();
    if !options.json {
        println!("> {}", args::display_command("ffmpeg", &ffmpeg_args));
    }

    let size_guard = match args::input_and_output(&ffmpeg_args) {
        Some((input, output)) if options.abort_if_larger => SizeGuard::new(input, output).await,
        _ => None,
    };

    // stdin bleibt beim Terminal, damit FFmpeg "Overwrite? [y/N]" fragen kann
    let child = Command::new(&ffmpeg)
        .args(&ffmpeg_args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("FFmpeg konnte nicht gestartet werden: {:?}", ffmpeg))?;

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::channel::<FfmpegEvent>(256);
    let runner_handle = tokio::spawn(runner::attach_child_process(child, tx, cancel.clone()));

    // Erstes Ctrl-C erreicht FFmpeg ueber die Prozessgruppe (sauberes Beenden),
    // beim zweiten wird hart abgebrochen.
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            let mut interrupts = 0;
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupts += 1;
                if interrupts >= 2 {
                    cancel.cancel();
                    return;
                }
                tracing::debug!("Ctrl-C, warte auf FFmpeg");
            }
        }
    });

    let mut monitor = Monitor::new(tokio::io::stdout(), options.json, size_guard);
    let result = watch(&mut monitor, rx, runner_handle, &cancel).await;
    interrupt.abort();

    match result? {
        Ok(()) => monitor.finish("ffmpeg process finished.").await,
        Err(e) => {
            monitor.fail(&e, &mut std::io::stderr()).await?;
            std::process::exit(1);
        }
    }
}
