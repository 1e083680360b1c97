use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::Sender;

use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{LegacyPcapReader, PcapBlockOwned, PcapError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dissect::{decode_link, LinkType};
use crate::model::{DecodedPacket, RawFrame};

const READER_CAPACITY: usize = 65536;
/// Upper bound for growing the reader buffer; twice dumpcap's default snaplen.
const MAX_READER_CAPACITY: usize = 512 * 1024;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("capture process has no stdout")]
    NoStdout,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("pcap parse error: {0}")]
    Pcap(String),
}

/// Where frames come from.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Live capture through `dumpcap` writing pcap to its stdout.
    Live { dumpcap: PathBuf, interface: String },
    /// A legacy pcap file on disk.
    File(PathBuf),
}

/// Starts `dumpcap` with pcap output on stdout.
pub fn spawn_dumpcap(dumpcap: &Path, interface: &str) -> Result<Child, CaptureError> {
    Command::new(dumpcap)
        .args(["-i", interface, "-F", "pcap", "-n", "-q", "-w", "-"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| CaptureError::Spawn {
            program: dumpcap.display().to_string(),
            source,
        })
}

/// Reads a legacy pcap stream, dissects every frame and sends it on `tx`.
///
/// Frames are numbered from 1 in arrival order and dissected according to the
/// link type in the file header. The read buffer grows for records larger
/// than it. Returns how many frames were read; stops early without error once
/// the receiving side is gone.
pub fn read_frames<R: Read>(reader: R, tx: &Sender<DecodedPacket>) -> Result<u64, CaptureError> {
    let mut reader = LegacyPcapReader::new(READER_CAPACITY, reader)
        .map_err(|e| CaptureError::Pcap(format!("{e:?}")))?;
    let mut capacity = READER_CAPACITY;
    let mut nanosecond = false;
    let mut link = LinkType::Ethernet;
    let mut count: u64 = 0;

    loop {
        match reader.next() {
            Ok((offset, block)) => {
                let frame = match block {
                    PcapBlockOwned::LegacyHeader(ref hdr) => {
                        nanosecond = hdr.is_nanosecond_precision();
                        link = LinkType::from_pcap(hdr.network.0);
                        if let LinkType::Other(linktype) = link {
                            warn!(linktype, "unsupported link type, frames left undissected");
                        }
                        None
                    }
                    PcapBlockOwned::Legacy(ref pkt) => {
                        let fraction = if nanosecond {
                            u64::from(pkt.ts_usec) / 1000
                        } else {
                            u64::from(pkt.ts_usec)
                        };
                        let timestamp = u64::from(pkt.ts_sec) * 1_000_000 + fraction;
                        count += 1;
                        Some(RawFrame::new(pkt.data.to_vec(), timestamp, count))
                    }
                    PcapBlockOwned::NG(_) => {
                        warn!("pcapng block in legacy pcap stream, skipped");
                        None
                    }
                };
                drop(block);
                reader.consume(offset);

                if let Some(frame) = frame {
                    if tx.send(decode_link(frame, link)).is_err() {
                        info!(frames = count, "packet receiver closed, capture stopped");
                        return Ok(count);
                    }
                }
            }
            Err(PcapError::Eof) => break,
            Err(PcapError::BufferTooSmall) => {
                if capacity >= MAX_READER_CAPACITY {
                    return Err(CaptureError::Pcap(format!(
                        "record larger than {MAX_READER_CAPACITY} bytes"
                    )));
                }
                capacity = (capacity * 2).min(MAX_READER_CAPACITY);
                if !reader.grow(capacity) {
                    return Err(CaptureError::Pcap(format!(
                        "cannot grow read buffer to {capacity} bytes"
                    )));
                }
                debug!(capacity, "read buffer grown");
            }
            Err(PcapError::Incomplete(_)) => {
                reader
                    .refill()
                    .map_err(|e| CaptureError::Pcap(format!("refill error: {e:?}")))?;
            }
            Err(e) => return Err(CaptureError::Pcap(format!("{e:?}"))),
        }
    }

    info!(frames = count, "end of capture stream");
    Ok(count)
}

/// Starts capturing from `source` on a blocking task.
///
/// Returns the `dumpcap` child for live captures so the caller can kill it.
pub fn run_sniffer(
    source: CaptureSource,
    tx: Sender<DecodedPacket>,
) -> Result<Option<Child>, CaptureError> {
    match source {
        CaptureSource::Live { dumpcap, interface } => {
            let mut child = spawn_dumpcap(&dumpcap, &interface)?;
            let stdout = child.stdout.take().ok_or(CaptureError::NoStdout)?;
            info!(%interface, dumpcap = %dumpcap.display(), "live capture started");
            tokio::task::spawn_blocking(move || {
                if let Err(err) = read_frames(stdout, &tx) {
                    warn!(%err, "live capture ended");
                }
            });
            Ok(Some(child))
        }
        CaptureSource::File(path) => {
            let file = File::open(&path)?;
            info!(path = %path.display(), "reading capture file");
            tokio::task::spawn_blocking(move || {
                if let Err(err) = read_frames(BufReader::new(file), &tx) {
                    warn!(%err, path = %path.display(), "capture file read failed");
                }
            });
            Ok(None)
        }
    }
}
