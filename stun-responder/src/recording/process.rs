// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, WriteBytesExt};

use tracing::{debug, trace};

use super::{
    create_dirs, meta_prefix, BackendState, CallOpMode, Recording, RecordingError,
    RecordingMethod, RecordingStream,
};

const STREAMS_DIR: &str = "streams";

/// Records the packets of each stream of a call into its own file in `streams/`.
///
/// Each packet is stored as a 32-bit big endian length followed by the packet itself.
#[derive(Debug, Clone)]
pub struct ProcRecording {
    spool_dir: PathBuf,
}

#[derive(Debug)]
pub(crate) struct ProcState {
    streams: HashMap<u32, BufWriter<File>>,
}

impl ProcRecording {
    /// Create a new [`ProcRecording`] writing into `spool_dir`
    pub fn new(spool_dir: PathBuf) -> Self {
        Self { spool_dir }
    }

    fn state<'a>(&self, recording: &'a mut Recording) -> Result<&'a mut ProcState, RecordingError> {
        match &mut recording.state {
            BackendState::Proc(state) => Ok(state),
            other => Err(RecordingError::WrongBackend {
                expected: self.name(),
                actual: other.name(),
            }),
        }
    }
}

fn stream_path(recording_path: &Path, index: u32) -> PathBuf {
    let mut name = recording_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(format!("-{index}.rec"));
    recording_path.with_file_name(name)
}

impl RecordingMethod for ProcRecording {
    fn name(&self) -> &'static str {
        "proc"
    }

    fn create_spool_dir(&self, path: &Path) -> Result<(), RecordingError> {
        create_dirs(path, &[STREAMS_DIR])
    }

    #[tracing::instrument(name = "proc_init_call", skip(self, metadata))]
    fn init_call(&self, call_id: &str, metadata: Option<&str>) -> Result<Recording, RecordingError> {
        let prefix = meta_prefix(call_id);
        let recording_path = self.spool_dir.join(STREAMS_DIR).join(&prefix);
        Recording::create(
            &self.spool_dir,
            call_id,
            prefix,
            recording_path,
            metadata,
            BackendState::Proc(ProcState {
                streams: HashMap::new(),
            }),
        )
    }

    fn write_meta_sdp(
        &self,
        recording: &mut Recording,
        sdp: &[&[u8]],
        opmode: CallOpMode,
    ) -> Result<usize, RecordingError> {
        self.state(recording)?;
        recording.write_sdp(sdp, opmode)
    }

    fn dump_packet(
        &self,
        recording: &mut Recording,
        stream: &RecordingStream,
        payload: &[u8],
    ) -> Result<(), RecordingError> {
        let state = self.state(recording)?;
        let Some(writer) = state.streams.get_mut(&stream.index()) else {
            return Err(RecordingError::UnknownStream(stream.index()));
        };
        writer.write_u32::<BigEndian>(payload.len() as u32)?;
        writer.write_all(payload)?;
        recording.packets += 1;
        trace!(
            "recorded packet {} of {} bytes on stream {}",
            recording.packets,
            payload.len(),
            stream.index()
        );
        Ok(())
    }

    fn finish(&self, mut recording: Recording) -> Result<PathBuf, RecordingError> {
        for writer in self.state(&mut recording)?.streams.values_mut() {
            writer.flush()?;
        }
        recording.finish_meta(&self.spool_dir)
    }

    fn setup_stream(&self, recording: &mut Recording) -> Result<RecordingStream, RecordingError> {
        self.state(recording)?;
        let stream = recording.next_stream();
        let path = stream_path(&recording.recording_path, stream.index());
        let writer = BufWriter::new(File::create(&path)?);
        debug!("recording stream {} into {}", stream.index(), path.display());
        self.state(recording)?.streams.insert(stream.index(), writer);
        Ok(stream)
    }
}
