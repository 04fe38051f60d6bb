// Fortschrittsanzeige fuer FFmpeg: parst die Diagnose-Ausgabe auf stderr und
// leitet daraus Position, Tempo und Restzeit ab.

pub mod cli;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod metrics;

pub use error::{Error, Result};
pub use ffmpeg::metadata::{parse_video_metadata, scan_video, VideoMetadata};
pub use ffmpeg::probe::{probe_duration, probe_resolution, Resolution};
pub use ffmpeg::progress::{FfmpegEvent, ProgressEvent, ProgressParser};
pub use ffmpeg::runner::{attach_child_process, attach_stream, convert_file, rotate_video, Rotation};
pub use ffmpeg::timecode::{format_timecode, parse_timecode, NOT_AVAILABLE};
