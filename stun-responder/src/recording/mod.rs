// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Call recording
//!
//! Recording writes the media of a call and a metadata file describing it into a spool
//! directory.  Two backends exist, selected once through a [`RecordingConfig`]:
//!
//! - [`PcapRecording`] writes all packets of a call into a single pcap file.
//! - [`ProcRecording`] writes the packets of each stream into a separate file of length-prefixed
//!   records.
//!
//! The spool directory contains:
//!
//! - `tmp/` metadata files of calls that are still being recorded,
//! - `metadata/` metadata files of finished calls,
//! - `pcaps/` pcap files ([`PcapRecording`] only),
//! - `streams/` per-stream record files ([`ProcRecording`] only).
//!
//! A metadata file looks like the following, with two empty lines between each block:
//!
//! ```text
//! /path/to/recording.pcap
//!
//!
//! SDP mode: offer
//! SDP before RTP packet: 0
//!
//! first SDP
//!
//!
//! SDP mode: answer
//! SDP before RTP packet: 12
//!
//! second SDP
//!
//!
//! start timestamp (YYYY-MM-DDThh:mm:ss)
//! end timestamp (YYYY-MM-DDThh:mm:ss)
//!
//!
//! generic metadata
//! ```
//!
//! Recording is never used by the STUN responder itself.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Local};

use tracing::{debug, info, warn};

mod pcap;
mod process;

pub use pcap::PcapRecording;
pub use process::ProcRecording;

/// The format of the start and end timestamps in a metadata file
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const TMP_DIR: &str = "tmp";
const METADATA_DIR: &str = "metadata";

/// Errors produced while recording
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RecordingError {
    /// A filesystem operation failed.
    #[error("I/O error: {}", .0)]
    Io(#[from] io::Error),
    /// Writing a pcap file failed.
    #[error("pcap error: {}", .0)]
    Pcap(#[from] pcap_file::PcapError),
    /// The recording method is not known.
    #[error("Unknown recording method '{}'", .0)]
    UnknownMethod(String),
    /// The spool directory exists but is not a directory.
    #[error("Spool path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The recording was started by a different backend.
    #[error("Recording was started by the {} backend, not {}", .actual, .expected)]
    WrongBackend {
        /// The backend that was asked to handle the recording
        expected: &'static str,
        /// The backend that started the recording
        actual: &'static str,
    },
    /// The stream was not set up for this recording.
    #[error("Unknown stream {}", .0)]
    UnknownStream(u32),
}

/// Whether an SDP was part of an offer or an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOpMode {
    /// SDP offer
    Offer,
    /// SDP answer
    Answer,
}

impl std::fmt::Display for CallOpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offer => f.write_str("offer"),
            Self::Answer => f.write_str("answer"),
        }
    }
}

/// The available recording backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingMethodKind {
    /// [`PcapRecording`]
    Pcap,
    /// [`ProcRecording`]
    Proc,
}

impl RecordingMethodKind {
    /// The configuration name of this method
    pub fn name(self) -> &'static str {
        match self {
            Self::Pcap => "pcap",
            Self::Proc => "proc",
        }
    }
}

impl std::fmt::Display for RecordingMethodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RecordingMethodKind {
    type Err = RecordingError;

    /// # Examples
    ///
    /// ```
    /// # use stun_responder::recording::RecordingMethodKind;
    /// assert_eq!("pcap".parse::<RecordingMethodKind>().unwrap(), RecordingMethodKind::Pcap);
    /// assert_eq!("proc".parse::<RecordingMethodKind>().unwrap(), RecordingMethodKind::Proc);
    /// assert!("wav".parse::<RecordingMethodKind>().is_err());
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pcap" => Ok(Self::Pcap),
            "proc" => Ok(Self::Proc),
            other => Err(RecordingError::UnknownMethod(other.to_owned())),
        }
    }
}

/// Recording configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingConfig {
    spool_dir: PathBuf,
    method: RecordingMethodKind,
}

impl RecordingConfig {
    /// Create a new [`RecordingConfig`]
    pub fn new(spool_dir: impl Into<PathBuf>, method: RecordingMethodKind) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            method,
        }
    }

    /// The spool directory
    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// The selected recording method
    pub fn method(&self) -> RecordingMethodKind {
        self.method
    }

    /// Construct the configured backend and prepare its spool directory.
    #[tracing::instrument(
        name = "recording_init",
        skip(self),
        fields(
            spool_dir = %self.spool_dir.display(),
            method = %self.method,
        )
    )]
    pub fn init(&self) -> Result<RecordingBackend, RecordingError> {
        let backend = match self.method {
            RecordingMethodKind::Pcap => {
                RecordingBackend::Pcap(PcapRecording::new(self.spool_dir.clone()))
            }
            RecordingMethodKind::Proc => {
                RecordingBackend::Proc(ProcRecording::new(self.spool_dir.clone()))
            }
        };
        backend.create_spool_dir(&self.spool_dir)?;
        info!("recording into {}", self.spool_dir.display());
        Ok(backend)
    }
}

/// A stream of a call that is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingStream {
    index: u32,
}

impl RecordingStream {
    /// The index of this stream within its call
    pub fn index(&self) -> u32 {
        self.index
    }
}

#[derive(Debug)]
pub(crate) enum BackendState {
    Pcap(pcap::PcapState),
    Proc(process::ProcState),
}

impl BackendState {
    fn name(&self) -> &'static str {
        match self {
            Self::Pcap(_) => "pcap",
            Self::Proc(_) => "proc",
        }
    }
}

/// The recording of a single call
#[derive(Debug)]
pub struct Recording {
    call_id: String,
    meta_prefix: String,
    meta_path: PathBuf,
    meta: BufWriter<File>,
    recording_path: PathBuf,
    metadata: Option<String>,
    started: DateTime<Local>,
    packets: u64,
    streams: u32,
    pub(crate) state: BackendState,
}

impl Recording {
    /// Create the metadata file in the spool's `tmp/` directory and write the first block.
    fn create(
        spool_dir: &Path,
        call_id: &str,
        meta_prefix: String,
        recording_path: PathBuf,
        metadata: Option<&str>,
        state: BackendState,
    ) -> Result<Self, RecordingError> {
        let meta_path = spool_dir.join(TMP_DIR).join(format!("{meta_prefix}.meta"));
        let mut meta = BufWriter::new(File::create(&meta_path)?);
        writeln!(meta, "{}", recording_path.display())?;
        writeln!(meta)?;
        meta.flush()?;
        debug!("created metadata file {}", meta_path.display());
        Ok(Self {
            call_id: call_id.to_owned(),
            meta_prefix,
            meta_path,
            meta,
            recording_path,
            metadata: metadata.map(ToOwned::to_owned),
            started: Local::now(),
            packets: 0,
            streams: 0,
            state,
        })
    }

    /// The call identifier as provided
    pub fn call_id(&self) -> &str {
        &self.call_id
    }

    /// The escaped call identifier followed by a random suffix.  All files of this recording are
    /// named after it.
    pub fn meta_prefix(&self) -> &str {
        &self.meta_prefix
    }

    /// Where the media of this recording is written
    pub fn recording_path(&self) -> &Path {
        &self.recording_path
    }

    /// The number of packets recorded so far
    pub fn packet_count(&self) -> u64 {
        self.packets
    }

    /// Replace the generic metadata written at the end of the metadata file
    pub fn set_metadata(&mut self, metadata: impl Into<String>) {
        self.metadata = Some(metadata.into());
    }

    fn write_sdp(&mut self, sdp: &[&[u8]], opmode: CallOpMode) -> Result<usize, RecordingError> {
        let mut written = 0;
        let preamble = format!(
            "\nSDP mode: {opmode}\nSDP before RTP packet: {}\n\n",
            self.packets
        );
        self.meta.write_all(preamble.as_bytes())?;
        written += preamble.len();
        for segment in sdp {
            self.meta.write_all(segment)?;
            written += segment.len();
        }
        self.meta.write_all(b"\n")?;
        written += 1;
        self.meta.flush()?;
        Ok(written)
    }

    fn next_stream(&mut self) -> RecordingStream {
        let index = self.streams;
        self.streams += 1;
        RecordingStream { index }
    }

    /// Write the closing blocks and move the metadata file into `metadata/`.
    fn finish_meta(mut self, spool_dir: &Path) -> Result<PathBuf, RecordingError> {
        let ended = Local::now();
        writeln!(self.meta)?;
        writeln!(self.meta, "{}", self.started.format(TIMESTAMP_FORMAT))?;
        writeln!(self.meta, "{}", ended.format(TIMESTAMP_FORMAT))?;
        if let Some(metadata) = &self.metadata {
            writeln!(self.meta)?;
            writeln!(self.meta)?;
            writeln!(self.meta, "{metadata}")?;
        }
        self.meta.flush()?;
        drop(self.meta);

        let finished = spool_dir
            .join(METADATA_DIR)
            .join(format!("{}.txt", self.meta_prefix));
        fs::rename(&self.meta_path, &finished)?;
        info!(
            "finished recording of call {} with {} packets, metadata in {}",
            self.call_id,
            self.packets,
            finished.display()
        );
        Ok(finished)
    }
}

/// Operations every recording backend provides
pub trait RecordingMethod {
    /// The configuration name of this backend
    fn name(&self) -> &'static str;

    /// Create the spool directory layout below `path`.  Existing directories are reused.
    fn create_spool_dir(&self, path: &Path) -> Result<(), RecordingError>;

    /// Start recording the call `call_id`.
    fn init_call(&self, call_id: &str, metadata: Option<&str>) -> Result<Recording, RecordingError>;

    /// Append the SDP made of `sdp` segments to the metadata file.  Returns the number of bytes
    /// written.
    fn write_meta_sdp(
        &self,
        recording: &mut Recording,
        sdp: &[&[u8]],
        opmode: CallOpMode,
    ) -> Result<usize, RecordingError>;

    /// Record a packet received on `stream`.
    fn dump_packet(
        &self,
        recording: &mut Recording,
        stream: &RecordingStream,
        payload: &[u8],
    ) -> Result<(), RecordingError>;

    /// Stop recording.  Returns the location of the metadata file.
    fn finish(&self, recording: Recording) -> Result<PathBuf, RecordingError>;

    /// Prepare a new stream of `recording` for recording.
    fn setup_stream(&self, recording: &mut Recording) -> Result<RecordingStream, RecordingError>;
}

/// The recording backend selected at startup
#[derive(Debug)]
pub enum RecordingBackend {
    /// Record into pcap files
    Pcap(PcapRecording),
    /// Record into per-stream record files
    Proc(ProcRecording),
}

impl RecordingBackend {
    fn method(&self) -> &dyn RecordingMethod {
        match self {
            Self::Pcap(pcap) => pcap,
            Self::Proc(process) => process,
        }
    }
}

impl RecordingMethod for RecordingBackend {
    fn name(&self) -> &'static str {
        self.method().name()
    }

    fn create_spool_dir(&self, path: &Path) -> Result<(), RecordingError> {
        self.method().create_spool_dir(path)
    }

    fn init_call(&self, call_id: &str, metadata: Option<&str>) -> Result<Recording, RecordingError> {
        self.method().init_call(call_id, metadata)
    }

    fn write_meta_sdp(
        &self,
        recording: &mut Recording,
        sdp: &[&[u8]],
        opmode: CallOpMode,
    ) -> Result<usize, RecordingError> {
        self.method().write_meta_sdp(recording, sdp, opmode)
    }

    fn dump_packet(
        &self,
        recording: &mut Recording,
        stream: &RecordingStream,
        payload: &[u8],
    ) -> Result<(), RecordingError> {
        self.method().dump_packet(recording, stream, payload)
    }

    fn finish(&self, recording: Recording) -> Result<PathBuf, RecordingError> {
        self.method().finish(recording)
    }

    fn setup_stream(&self, recording: &mut Recording) -> Result<RecordingStream, RecordingError> {
        self.method().setup_stream(recording)
    }
}

/// Create `path` and the given subdirectories if they do not exist.
fn create_dirs(path: &Path, subdirs: &[&str]) -> Result<(), RecordingError> {
    if path.exists() && !path.is_dir() {
        warn!("spool path {} is not a directory", path.display());
        return Err(RecordingError::NotADirectory(path.to_owned()));
    }
    for subdir in [TMP_DIR, METADATA_DIR].iter().chain(subdirs) {
        fs::create_dir_all(path.join(subdir))?;
    }
    Ok(())
}

/// Percent-encode everything in a call id except for alphanumerics and `-_.~`.
///
/// # Examples
///
/// ```
/// # use stun_responder::recording::escape_call_id;
/// assert_eq!(escape_call_id("abc-123.host"), "abc-123.host");
/// assert_eq!(escape_call_id("abc@host"), "abc%40host");
/// assert_eq!(escape_call_id("../a b"), "..%2Fa%20b");
/// ```
pub fn escape_call_id(call_id: &str) -> String {
    urlencoding::encode(call_id).into_owned()
}

/// The escaped call id followed by a random hex suffix
fn meta_prefix(call_id: &str) -> String {
    format!("{}-{:016x}", escape_call_id(call_id), rand::random::<u64>())
}
