// Kommandozeile: alles was nicht uns gehoert wird unveraendert an FFmpeg
// weitergereicht, daher kein Argument-Parser-Framework.

use std::path::PathBuf;

pub const HELP: &str = "
ffmpeg-progress - A progress monitor for FFmpeg operations

USAGE:
  ffmpeg-progress <option>
  ffmpeg-progress [--json] [--abort-if-larger] <ffmpeg-args...>
  ffmpeg <ffmpeg-args...> 2>&1 | ffmpeg-progress [--json]

EXAMPLES:
  # as drop-in replacement for ffmpeg:
  ffmpeg-progress -i input.mp4 -c:v libx264 output.mp4

  # pipe from ffmpeg output (need to redirect stderr):
  ffmpeg -i input.mp4 -c:v libx264 output.mp4 2>&1 | ffmpeg-progress

  # print duration, resolution and sample rate of a file as JSON:
  ffmpeg-progress --probe input.mp4

OPTIONS:
  -h, --help          show this help message and exit
  --version           show version and exit
  --probe <file>      print media metadata as JSON and exit
  --json              print progress as NDJSON instead of a status line
  --abort-if-larger   kill ffmpeg when the output grows beyond the input

ENVIRONMENT:
  FFMPEG_PATH, FFPROBE_PATH, FILE_PATH   override the external programs
  RUST_LOG                               log filter (default: warn)

NOTES:
  - Pipe mode requires redirecting ffmpeg stderr to stdout (2>&1)
  - Wrapped mode automatically captures ffmpeg progress from stderr
  - ffmpeg outputs progress information to stderr, not stdout
  - Ctrl-C stops ffmpeg gracefully, a second Ctrl-C kills it
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options {
    pub json: bool,
    pub abort_if_larger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Version,
    Probe(PathBuf),
    /// Keine FFmpeg-Argumente: Ausgabe kommt ueber stdin
    Pipe(Options),
    Wrap {
        ffmpeg_args: Vec<String>,
        options: Options,
    },
}

/// Parst die Argumente (ohne Programmnamen).
/// Hilfe und Version gewinnen egal an welcher Position.
pub fn parse_args<I>(args: I) -> Command
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();

    for arg in &args {
        match arg.as_str() {
            "-h" | "--help" => return Command::Help,
            "-version" | "--version" => return Command::Version,
            _ => {}
        }
    }

    let mut options = Options::default();
    let mut ffmpeg_args = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => options.json = true,
            "--abort-if-larger" => options.abort_if_larger = true,
            "--probe" => match iter.next() {
                Some(path) => return Command::Probe(PathBuf::from(path)),
                None => return Command::Help,
            },
            _ => ffmpeg_args.push(arg),
        }
    }

    if ffmpeg_args.is_empty() {
        Command::Pipe(options)
    } else {
        Command::Wrap {
            ffmpeg_args,
            options,
        }
    }
}

/// Kommandozeile zum Anzeigen, Argumente mit Leer- oder Sonderzeichen in
/// JSON-Quoting: `ffmpeg -i "my file.mp4" out.mp4`.
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut cmd = program.to_string();
    for arg in args {
        cmd.push(' ');
        if needs_quoting(arg) {
            cmd.push_str(&serde_json::to_string(arg).unwrap_or_else(|_| arg.clone()));
        } else {
            cmd.push_str(arg);
        }
    }
    cmd
}

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty()
        || arg
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '\\' | '$' | '`' | '&' | '|' | ';' | '<' | '>' | '*' | '?'))
}

/// Erstes `-i <datei>` und das letzte Argument (Ausgabedatei).
pub fn input_and_output(ffmpeg_args: &[String]) -> Option<(PathBuf, PathBuf)> {
    let input = ffmpeg_args
        .windows(2)
        .find(|pair| pair[0] == "-i")
        .map(|pair| PathBuf::from(&pair[1]))?;
    let output = ffmpeg_args.last().filter(|last| !last.starts_with('-'))?;
    Some((input, PathBuf::from(output)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_args_is_pipe_mode() {
        assert_eq!(parse_args(Vec::new()), Command::Pipe(Options::default()));
    }

    #[test]
    fn json_without_ffmpeg_args_is_pipe_mode() {
        let cmd = parse_args(args(&["--json"]));
        assert_eq!(
            cmd,
            Command::Pipe(Options {
                json: true,
                abort_if_larger: false
            })
        );
    }

    #[test]
    fn help_anywhere() {
        assert_eq!(parse_args(args(&["-i", "in.mp4", "-h"])), Command::Help);
        assert_eq!(parse_args(args(&["--help"])), Command::Help);
    }

    #[test]
    fn version() {
        assert_eq!(parse_args(args(&["-version"])), Command::Version);
        assert_eq!(parse_args(args(&["--version"])), Command::Version);
    }

    #[test]
    fn probe_takes_path() {
        assert_eq!(
            parse_args(args(&["--probe", "in.mp4"])),
            Command::Probe(PathBuf::from("in.mp4"))
        );
        assert_eq!(parse_args(args(&["--probe"])), Command::Help);
    }

    #[test]
    fn own_flags_are_removed_from_ffmpeg_args() {
        let cmd = parse_args(args(&["--abort-if-larger", "-i", "in.mp4", "--json", "out.mp4"]));
        assert_eq!(
            cmd,
            Command::Wrap {
                ffmpeg_args: args(&["-i", "in.mp4", "out.mp4"]),
                options: Options {
                    json: true,
                    abort_if_larger: true
                },
            }
        );
    }

    #[test]
    fn display_quotes_only_when_needed() {
        let cmd = display_command("ffmpeg", &args(&["-i", "my file.mp4", "-c:v", "libx264", "out.mp4"]));
        assert_eq!(cmd, r#"ffmpeg -i "my file.mp4" -c:v libx264 out.mp4"#);
    }

    #[test]
    fn display_escapes_quotes() {
        let cmd = display_command("ffmpeg", &args(&["-metadata", "title=a \"b\""]));
        assert_eq!(cmd, r#"ffmpeg -metadata "title=a \"b\"""#);
    }

    #[test]
    fn input_and_output_paths() {
        let (input, output) =
            input_and_output(&args(&["-y", "-i", "in.mp4", "-c:v", "libx264", "out.mp4"])).unwrap();
        assert_eq!(input, PathBuf::from("in.mp4"));
        assert_eq!(output, PathBuf::from("out.mp4"));
    }

    #[test]
    fn no_input_no_paths() {
        assert!(input_and_output(&args(&["-formats"])).is_none());
    }
}
