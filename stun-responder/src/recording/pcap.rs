// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use pcap_file::pcap::{PcapHeader, PcapPacket, PcapWriter};
use pcap_file::{DataLink, Endianness};

use tracing::{debug, trace};

use super::{
    create_dirs, meta_prefix, BackendState, CallOpMode, Recording, RecordingError,
    RecordingMethod, RecordingStream,
};

const PCAPS_DIR: &str = "pcaps";
const SNAPLEN: u32 = 65535;

/// Records every packet of a call into a single pcap file in `pcaps/`
#[derive(Debug, Clone)]
pub struct PcapRecording {
    spool_dir: PathBuf,
}

pub(crate) struct PcapState {
    writer: PcapWriter<BufWriter<File>>,
}

impl std::fmt::Debug for PcapState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcapState").finish_non_exhaustive()
    }
}

impl PcapRecording {
    /// Create a new [`PcapRecording`] writing into `spool_dir`
    pub fn new(spool_dir: PathBuf) -> Self {
        Self { spool_dir }
    }

    fn state<'a>(&self, recording: &'a mut Recording) -> Result<&'a mut PcapState, RecordingError> {
        match &mut recording.state {
            BackendState::Pcap(state) => Ok(state),
            other => Err(RecordingError::WrongBackend {
                expected: self.name(),
                actual: other.name(),
            }),
        }
    }
}

fn pcap_header() -> PcapHeader {
    // payloads are stored without any link or network headers
    PcapHeader {
        snaplen: SNAPLEN,
        datalink: DataLink::USER0,
        endianness: Endianness::Little,
        ..Default::default()
    }
}

fn write_packet<W: Write>(
    writer: &mut PcapWriter<W>,
    payload: &[u8],
) -> Result<(), RecordingError> {
    let now = Utc::now();
    let timestamp = Duration::new(now.timestamp() as u64, now.timestamp_subsec_nanos());
    let captured = &payload[..payload.len().min(SNAPLEN as usize)];
    writer.write_packet(&PcapPacket::new(timestamp, payload.len() as u32, captured))?;
    Ok(())
}

impl RecordingMethod for PcapRecording {
    fn name(&self) -> &'static str {
        "pcap"
    }

    fn create_spool_dir(&self, path: &Path) -> Result<(), RecordingError> {
        create_dirs(path, &[PCAPS_DIR])
    }

    #[tracing::instrument(name = "pcap_init_call", skip(self, metadata))]
    fn init_call(&self, call_id: &str, metadata: Option<&str>) -> Result<Recording, RecordingError> {
        let prefix = meta_prefix(call_id);
        let pcap_path = self
            .spool_dir
            .join(PCAPS_DIR)
            .join(format!("{prefix}.pcap"));
        let file = BufWriter::new(File::create(&pcap_path)?);
        let writer = PcapWriter::with_header(file, pcap_header())?;
        debug!("recording call into {}", pcap_path.display());
        Recording::create(
            &self.spool_dir,
            call_id,
            prefix,
            pcap_path,
            metadata,
            BackendState::Pcap(PcapState { writer }),
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
        _stream: &RecordingStream,
        payload: &[u8],
    ) -> Result<(), RecordingError> {
        let state = self.state(recording)?;
        write_packet(&mut state.writer, payload)?;
        recording.packets += 1;
        trace!("recorded packet {} of {} bytes", recording.packets, payload.len());
        Ok(())
    }

    fn finish(&self, mut recording: Recording) -> Result<PathBuf, RecordingError> {
        self.state(&mut recording)?.writer.get_mut().flush()?;
        recording.finish_meta(&self.spool_dir)
    }

    fn setup_stream(&self, recording: &mut Recording) -> Result<RecordingStream, RecordingError> {
        self.state(recording)?;
        Ok(recording.next_stream())
    }
}
