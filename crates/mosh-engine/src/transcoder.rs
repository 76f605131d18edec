//! External transcoder adapter.
//!
//! The engine never decodes or encodes video itself; the prep and bake
//! stages shell out to a transcoder binary (ffmpeg by default,
//! `MOSH_TRANSCODER` to override) with a fixed command-line contract.
//! Invocations are synchronous, with stderr captured for error reporting.

use crate::options::MoshOptions;
use crate::scene::{PixelFrameSource, Thumbnail, THUMB_DIM, THUMB_LEN};
use mosh_core::error::{MoshError, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use tracing::debug;

/// Environment variable overriding the transcoder binary path.
pub const TRANSCODER_ENV: &str = "MOSH_TRANSCODER";

const DEFAULT_TRANSCODER: &str = "ffmpeg";

/// The transcode capability the pipeline requires.
pub trait Transcode {
    /// Re-encode `input` into a mosh-friendly container: one long GOP,
    /// no scene-change keyframes, B-frames only if allowed.
    fn prep(&self, input: &Path, output: &Path, options: &MoshOptions) -> Result<()>;

    /// Re-encode the moshed stream into a robust delivery format.
    fn bake(&self, input: &Path, output: &Path, options: &MoshOptions) -> Result<()>;
}

fn transcoder_binary() -> PathBuf {
    std::env::var_os(TRANSCODER_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_TRANSCODER))
}

fn spawn_error(binary: &Path, source: std::io::Error) -> MoshError {
    if source.kind() == std::io::ErrorKind::NotFound {
        MoshError::DecoderUnavailable(format!(
            "{} not found; install ffmpeg or point {TRANSCODER_ENV} at a transcoder",
            binary.display()
        ))
    } else {
        MoshError::IoAt {
            path: binary.to_path_buf(),
            source,
        }
    }
}

/// Prep-transcode argument vector: long GOP, scene-cut keyframes off,
/// MPEG-4 ASP in AVI.
pub fn prep_args(input: &Path, output: &Path, options: &MoshOptions) -> Vec<String> {
    let mut args = vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-an".into(),
        "-c:v".into(),
        "mpeg4".into(),
        "-q:v".into(),
        "3".into(),
        "-g".into(),
        options.max_gop.to_string(),
        "-sc_threshold".into(),
        "0".into(),
    ];
    if !options.allow_b_frames {
        args.extend(["-bf".into(), "0".into()]);
    }
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Bake-transcode argument vector.
pub fn bake_args(input: &Path, output: &Path, options: &MoshOptions) -> Vec<String> {
    let encoder = match options.bake_codec.as_str() {
        "h264" => "libx264",
        "h265" | "hevc" => "libx265",
        other => other,
    };
    vec![
        "-y".into(),
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-an".into(),
        "-c:v".into(),
        encoder.to_string(),
        "-crf".into(),
        options.bake_crf.to_string(),
        "-pix_fmt".into(),
        "yuv420p".into(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Thumbnail-decode argument vector: raw 16x16 grayscale frames on
/// stdout.
pub fn thumbnail_args(input: &Path) -> Vec<String> {
    vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-i".into(),
        input.to_string_lossy().into_owned(),
        "-an".into(),
        "-vf".into(),
        format!("scale={THUMB_DIM}:{THUMB_DIM}"),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "gray".into(),
        "-".into(),
    ]
}

/// Process-spawning [`Transcode`] implementation.
pub struct CommandTranscoder {
    binary: PathBuf,
}

impl CommandTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Binary from `MOSH_TRANSCODER`, falling back to `ffmpeg` on PATH.
    pub fn from_env() -> Self {
        Self::new(transcoder_binary())
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    fn run(&self, args: &[String]) -> Result<()> {
        debug!(binary = %self.binary.display(), ?args, "invoking transcoder");
        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_error(&self.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MoshError::Io(std::io::Error::other(format!(
                "transcoder exited with {}: {}",
                output.status,
                stderr.trim()
            ))));
        }
        Ok(())
    }
}

impl Transcode for CommandTranscoder {
    fn prep(&self, input: &Path, output: &Path, options: &MoshOptions) -> Result<()> {
        self.run(&prep_args(input, output, options))
    }

    fn bake(&self, input: &Path, output: &Path, options: &MoshOptions) -> Result<()> {
        self.run(&bake_args(input, output, options))
    }
}

/// [`PixelFrameSource`] that pipes raw grayscale thumbnails from the
/// transcoder's stdout.
pub struct TranscoderFrameSource {
    binary: PathBuf,
}

impl TranscoderFrameSource {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(transcoder_binary())
    }
}

impl PixelFrameSource for TranscoderFrameSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Iterator<Item = Result<Thumbnail>>>> {
        let mut child = Command::new(&self.binary)
            .args(thumbnail_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(&self.binary, e))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MoshError::DecoderUnavailable("transcoder stdout pipe missing".to_string())
        })?;

        Ok(Box::new(ThumbnailStream {
            child,
            stdout,
            next_index: 0,
            done: false,
        }))
    }
}

struct ThumbnailStream {
    child: Child,
    stdout: ChildStdout,
    next_index: usize,
    done: bool,
}

impl Iterator for ThumbnailStream {
    type Item = Result<Thumbnail>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut gray = vec![0u8; THUMB_LEN];
        let mut filled = 0usize;
        while filled < THUMB_LEN {
            match self.stdout.read(&mut gray[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(MoshError::Io(e)));
                }
            }
        }

        if filled == 0 {
            // Clean end of stream; surface a decoder failure if the
            // child exited nonzero.
            self.done = true;
            return match self.child.wait() {
                Ok(status) if !status.success() => Some(Err(MoshError::DecoderUnavailable(
                    format!("transcoder exited with {status} while decoding thumbnails"),
                ))),
                Ok(_) => None,
                Err(e) => Some(Err(MoshError::Io(e))),
            };
        }
        if filled < THUMB_LEN {
            self.done = true;
            return Some(Err(MoshError::DecoderUnavailable(format!(
                "truncated thumbnail stream at frame {}",
                self.next_index
            ))));
        }

        let thumbnail = Thumbnail {
            decoding_index: self.next_index,
            gray,
        };
        self.next_index += 1;
        Some(Ok(thumbnail))
    }
}

impl Drop for ThumbnailStream {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
