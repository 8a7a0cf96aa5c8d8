//! MP4 muxer that spools tracks to disk and finalizes with FFmpeg
//!
//! While recording, video frames are written as PNG files, PCM is appended to
//! a raw file and metadata records are kept in memory. `release` writes an
//! ffconcat timeline and an SRT file for the metadata, then runs `ffmpeg` to
//! produce H.264 + AAC + mov_text in one MP4.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::domain::{Configuration, RigError, RigResult, VideoFrame};
use crate::ports::{EncodedBuffer, MediaFormat, Muxer, MIME_RAW_AUDIO, MIME_RAW_VIDEO};

const AUDIO_FILE: &str = "audio.pcm";
const TIMELINE_FILE: &str = "video.ffconcat";
const METADATA_FILE: &str = "metadata.srt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegOptions {
    pub ffmpeg_path: String,
    pub video_bitrate: u32,
    pub audio_bitrate: u32,
}

impl FfmpegOptions {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            video_bitrate: config.video.bitrate,
            audio_bitrate: config.audio.bitrate,
        }
    }
}

enum SpoolTrack {
    Video {
        width: u32,
        height: u32,
        frame_rate: u32,
        frames: Vec<(u64, String)>,
    },
    Audio {
        sample_rate: u32,
        channels: u16,
        file: Option<BufWriter<File>>,
        bytes: u64,
    },
    Metadata {
        records: Vec<(u64, String)>,
    },
}

pub struct FfmpegMuxer {
    output: PathBuf,
    work_dir: PathBuf,
    options: FfmpegOptions,
    tracks: Vec<SpoolTrack>,
    started: bool,
    released: bool,
}

impl FfmpegMuxer {
    /// `output` is resolved against the current directory here; ffmpeg itself
    /// runs inside the spool directory.
    pub fn new(output: impl AsRef<Path>, options: FfmpegOptions) -> RigResult<Self> {
        let output = std::path::absolute(output.as_ref()).map_err(|e| {
            RigError::Muxer(format!(
                "Failed to resolve output path {}: {e}",
                output.as_ref().display()
            ))
        })?;
        let mut work_dir = output.clone().into_os_string();
        work_dir.push(".parts");
        Ok(Self {
            output,
            work_dir: PathBuf::from(work_dir),
            options,
            tracks: Vec::new(),
            started: false,
            released: false,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Spool directory, `<output>.parts`
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn spool_video(
        &self,
        frames: &mut Vec<(u64, String)>,
        width: u32,
        height: u32,
        sample: &EncodedBuffer,
    ) -> RigResult<()> {
        let expected = VideoFrame::byte_len(width, height);
        if sample.data.len() != expected {
            return Err(RigError::Muxer(format!(
                "Video sample is {} bytes, expected {expected}",
                sample.data.len()
            )));
        }
        let name = format!("frame_{:06}.png", frames.len());
        let file = File::create(self.work_dir.join(&name))
            .map_err(|e| RigError::Muxer(format!("Failed to create {name}: {e}")))?;
        let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let png_err = |e: png::EncodingError| RigError::Muxer(format!("Failed to write {name}: {e}"));
        let mut writer = encoder.write_header().map_err(png_err)?;
        writer.write_image_data(&sample.data).map_err(png_err)?;
        writer.finish().map_err(png_err)?;
        frames.push((sample.pts_us, name));
        Ok(())
    }

    fn write_timeline(&self, frames: &[(u64, String)], frame_rate: u32) -> RigResult<()> {
        let mut out = String::from("ffconcat version 1.0\n");
        let default_us = 1_000_000 / u64::from(frame_rate.max(1));
        for (i, (pts, name)) in frames.iter().enumerate() {
            let duration_us = frames
                .get(i + 1)
                .map(|(next, _)| next.saturating_sub(*pts))
                .unwrap_or(default_us);
            out.push_str(&format!("file '{name}'\nduration {:.6}\n", duration_us as f64 / 1e6));
        }
        // The concat demuxer ignores the duration of the final entry unless repeated
        if let Some((_, last)) = frames.last() {
            out.push_str(&format!("file '{last}'\n"));
        }
        self.write_file(TIMELINE_FILE, out.as_bytes())
    }

    fn write_subtitles(&self, records: &[(u64, String)], frame_rate: u32) -> RigResult<()> {
        let default_us = 1_000_000 / u64::from(frame_rate.max(1));
        let mut out = String::new();
        for (i, (pts, text)) in records.iter().enumerate() {
            let end = records
                .get(i + 1)
                .map(|(next, _)| *next)
                .unwrap_or(pts + default_us);
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                srt_time(*pts),
                srt_time(end.max(*pts)),
                text
            ));
        }
        self.write_file(METADATA_FILE, out.as_bytes())
    }

    fn write_file(&self, name: &str, data: &[u8]) -> RigResult<()> {
        fs::write(self.work_dir.join(name), data)
            .map_err(|e| RigError::Muxer(format!("Failed to write {name}: {e}")))
    }

    /// Assemble the ffmpeg argument list for the spooled tracks.
    fn ffmpeg_args(&self) -> Vec<String> {
        let mut inputs: Vec<String> = vec!["-y".into(), "-loglevel".into(), "error".into()];
        let mut maps = Vec::new();
        let mut codecs = Vec::new();

        for (input, track) in self.tracks.iter().enumerate() {
            let map = format!("{input}:0");
            match track {
                SpoolTrack::Video { .. } => {
                    inputs.extend(
                        ["-f", "concat", "-safe", "0", "-i", TIMELINE_FILE].map(String::from),
                    );
                    codecs.extend([
                        "-c:v".to_string(),
                        "libx264".into(),
                        "-pix_fmt".into(),
                        "yuv420p".into(),
                        "-b:v".into(),
                        self.options.video_bitrate.to_string(),
                    ]);
                }
                SpoolTrack::Audio {
                    sample_rate,
                    channels,
                    ..
                } => {
                    inputs.extend([
                        "-f".to_string(),
                        "s16le".into(),
                        "-ar".into(),
                        sample_rate.to_string(),
                        "-ac".into(),
                        channels.to_string(),
                        "-i".into(),
                        AUDIO_FILE.into(),
                    ]);
                    codecs.extend([
                        "-c:a".to_string(),
                        "aac".into(),
                        "-b:a".into(),
                        self.options.audio_bitrate.to_string(),
                    ]);
                }
                SpoolTrack::Metadata { .. } => {
                    inputs.extend(["-i", METADATA_FILE].map(String::from));
                    codecs.extend(
                        ["-c:s", "mov_text", "-metadata:s:s:0", "handler_name=rigcorder status"]
                            .map(String::from),
                    );
                }
            }
            maps.extend(["-map".to_string(), map]);
        }

        let mut args = inputs;
        args.extend(maps);
        args.extend(codecs);
        args.extend(["-movflags", "+faststart"].map(String::from));
        args.push(self.output.to_string_lossy().into_owned());
        args
    }

    fn finalize(&mut self) -> RigResult<()> {
        let mut frame_rate = 10;
        for track in &mut self.tracks {
            if let SpoolTrack::Audio { file, bytes, .. } = track {
                if let Some(mut f) = file.take() {
                    f.flush()
                        .map_err(|e| RigError::Muxer(format!("Failed to flush audio: {e}")))?;
                    log::debug!("Spooled {bytes} bytes of audio");
                }
            }
        }
        for track in &self.tracks {
            if let SpoolTrack::Video {
                frames,
                frame_rate: rate,
                ..
            } = track
            {
                frame_rate = *rate;
                if frames.is_empty() {
                    return Err(RigError::Muxer("No video frames were recorded".into()));
                }
                self.write_timeline(frames, *rate)?;
            }
        }
        for track in &self.tracks {
            if let SpoolTrack::Metadata { records } = track {
                self.write_subtitles(records, frame_rate)?;
            }
        }

        let args = self.ffmpeg_args();
        log::info!("Running {} to finalize {}", self.options.ffmpeg_path, self.output.display());
        log::debug!("ffmpeg args: {args:?}");
        let output = Command::new(&self.options.ffmpeg_path)
            .args(&args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RigError::Muxer(format!("Failed to run {}: {e}", self.options.ffmpeg_path)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RigError::Muxer(format!(
                "ffmpeg failed ({}), spooled tracks kept in {}: {}",
                output.status,
                self.work_dir.display(),
                stderr.trim()
            )));
        }

        if let Err(e) = fs::remove_dir_all(&self.work_dir) {
            log::warn!("Failed to remove {}: {e}", self.work_dir.display());
        }
        log::info!("Wrote {}", self.output.display());
        Ok(())
    }
}

impl Muxer for FfmpegMuxer {
    fn add_track(&mut self, format: &MediaFormat) -> RigResult<usize> {
        if self.started {
            return Err(RigError::Muxer("Cannot add a track after start".into()));
        }
        let track = match format {
            MediaFormat::Video {
                mime,
                width,
                height,
                frame_rate,
                ..
            } if mime == MIME_RAW_VIDEO => SpoolTrack::Video {
                width: *width,
                height: *height,
                frame_rate: *frame_rate,
                frames: Vec::new(),
            },
            MediaFormat::Audio {
                mime,
                sample_rate,
                channels,
                ..
            } if mime == MIME_RAW_AUDIO => SpoolTrack::Audio {
                sample_rate: *sample_rate,
                channels: *channels,
                file: None,
                bytes: 0,
            },
            MediaFormat::Metadata { .. } => SpoolTrack::Metadata {
                records: Vec::new(),
            },
            other => {
                return Err(RigError::Muxer(format!(
                    "Unsupported track format: {}",
                    other.mime()
                )))
            }
        };
        self.tracks.push(track);
        Ok(self.tracks.len() - 1)
    }

    fn start(&mut self) -> RigResult<()> {
        if self.started {
            return Err(RigError::Muxer("Muxer already started".into()));
        }
        fs::create_dir_all(&self.work_dir).map_err(|e| {
            RigError::Muxer(format!("Failed to create {}: {e}", self.work_dir.display()))
        })?;
        for track in &mut self.tracks {
            if let SpoolTrack::Audio { file, .. } = track {
                let f = File::create(self.work_dir.join(AUDIO_FILE))
                    .map_err(|e| RigError::Muxer(format!("Failed to create {AUDIO_FILE}: {e}")))?;
                *file = Some(BufWriter::new(f));
            }
        }
        self.started = true;
        log::debug!("Muxer started with {} tracks", self.tracks.len());
        Ok(())
    }

    fn write_sample(&mut self, track: usize, sample: &EncodedBuffer) -> RigResult<()> {
        if !self.started {
            return Err(RigError::Muxer("Sample written before muxer start".into()));
        }
        // Take the track out so spooling can borrow the rest of self
        let mut spool = match self.tracks.get_mut(track) {
            Some(t) => std::mem::replace(t, SpoolTrack::Metadata { records: Vec::new() }),
            None => return Err(RigError::Muxer(format!("No such track: {track}"))),
        };
        let result = match &mut spool {
            SpoolTrack::Video {
                width,
                height,
                frames,
                ..
            } => self.spool_video(frames, *width, *height, sample),
            SpoolTrack::Audio { file, bytes, .. } => match file {
                Some(f) => f
                    .write_all(&sample.data)
                    .map(|()| *bytes += sample.data.len() as u64)
                    .map_err(|e| RigError::Muxer(format!("Failed to write audio: {e}"))),
                None => Err(RigError::Muxer("Audio spool is closed".into())),
            },
            SpoolTrack::Metadata { records } => {
                let text = String::from_utf8_lossy(&sample.data).trim_end().to_string();
                records.push((sample.pts_us, text));
                Ok(())
            }
        };
        self.tracks[track] = spool;
        result
    }

    fn release(&mut self) -> RigResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        if !self.started {
            log::info!("Muxer never started, no file written");
            return Ok(());
        }
        self.finalize()
    }
}

/// `HH:MM:SS,mmm`
fn srt_time(us: u64) -> String {
    let ms = us / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}
