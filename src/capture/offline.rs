//! pcap / pcapng file source.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Utc};
use pcap_parser::traits::PcapReaderIterator;
use pcap_parser::{Block, LegacyPcapReader, Linktype, PcapBlockOwned, PcapError, PcapNGReader};

use super::{Frame, FrameSource};
use crate::error::CaptureError;

const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];
/// Must hold the largest record plus its header. Snap lengths reach 262144,
/// and pcapng blocks add options on top.
const READER_BUFFER_SIZE: usize = 1024 * 1024;
const NANOSECOND_MAGICS: [u32; 2] = [0xa1b2_3c4d, 0x4d3c_b2a1];
const DEFAULT_TSRESOL: u8 = 6;
const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Frames read from a stored capture file.
pub struct OfflineSource {
    inner: Reader,
}

enum Reader {
    Legacy {
        reader: LegacyPcapReader<File>,
        linktype: Linktype,
        nanos: bool,
    },
    Ng {
        reader: PcapNGReader<File>,
        interfaces: Vec<InterfaceInfo>,
    },
}

#[derive(Debug, Clone, Copy)]
struct InterfaceInfo {
    linktype: Linktype,
    tsresol: u8,
}

impl OfflineSource {
    /// Open a pcap or pcapng file, detected from its magic bytes.
    pub fn open(path: &Path) -> Result<Self, CaptureError> {
        let mut file = File::open(path)?;
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        file.seek(SeekFrom::Start(0))?;

        let inner = if magic == PCAPNG_MAGIC {
            let reader = PcapNGReader::new(READER_BUFFER_SIZE, file).map_err(|e| {
                CaptureError::Pcap {
                    context: "pcapng reader init",
                    message: e.to_string(),
                }
            })?;
            Reader::Ng {
                reader,
                interfaces: Vec::new(),
            }
        } else {
            let reader = LegacyPcapReader::new(READER_BUFFER_SIZE, file).map_err(|e| {
                CaptureError::Pcap {
                    context: "pcap reader init",
                    message: e.to_string(),
                }
            })?;
            Reader::Legacy {
                reader,
                linktype: Linktype::ETHERNET,
                nanos: false,
            }
        };

        Ok(Self { inner })
    }
}

impl FrameSource for OfflineSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        loop {
            match &mut self.inner {
                Reader::Legacy {
                    reader,
                    linktype,
                    nanos,
                } => match reader.next() {
                    Ok((offset, block)) => {
                        let frame = match block {
                            PcapBlockOwned::LegacyHeader(header) => {
                                *linktype = header.network;
                                *nanos = NANOSECOND_MAGICS.contains(&header.magic_number);
                                None
                            }
                            PcapBlockOwned::Legacy(packet) => {
                                let nsec = if *nanos {
                                    u64::from(packet.ts_usec)
                                } else {
                                    u64::from(packet.ts_usec) * 1_000
                                };
                                Some(Frame {
                                    data: packet.data.to_vec(),
                                    timestamp: timestamp(packet.ts_sec as i64, nsec),
                                    wire_len: packet.origlen,
                                    link_type: *linktype,
                                })
                            }
                            _ => None,
                        };
                        reader.consume(offset);
                        if frame.is_some() {
                            return Ok(frame);
                        }
                    }
                    Err(PcapError::Eof) => return Ok(None),
                    Err(PcapError::UnexpectedEof) => {
                        tracing::warn!("Capture file truncated mid-record, stopping");
                        return Ok(None);
                    }
                    Err(PcapError::BufferTooSmall) => {
                        return Err(CaptureError::Pcap {
                            context: "pcap reader next",
                            message: "record larger than reader buffer".to_string(),
                        })
                    }
                    Err(PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| CaptureError::Pcap {
                            context: "pcap reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(CaptureError::Pcap {
                            context: "pcap reader next",
                            message: e.to_string(),
                        })
                    }
                },
                Reader::Ng { reader, interfaces } => match reader.next() {
                    Ok((offset, block)) => {
                        let frame = match block {
                            PcapBlockOwned::NG(Block::SectionHeader(_)) => {
                                // Interface ids are scoped to their section.
                                interfaces.clear();
                                None
                            }
                            PcapBlockOwned::NG(Block::InterfaceDescription(idb)) => {
                                interfaces.push(InterfaceInfo {
                                    linktype: idb.linktype,
                                    tsresol: idb.if_tsresol,
                                });
                                None
                            }
                            PcapBlockOwned::NG(Block::EnhancedPacket(packet)) => {
                                let info = interfaces.get(packet.if_id as usize).copied();
                                let tsresol = info.map_or(DEFAULT_TSRESOL, |i| i.tsresol);
                                let ticks = ((packet.ts_high as u64) << 32) | packet.ts_low as u64;
                                let (secs, nsec) = split_ticks(ticks, tsresol);
                                Some(Frame {
                                    data: packet.data.to_vec(),
                                    timestamp: timestamp(secs, u64::from(nsec)),
                                    wire_len: packet.origlen,
                                    link_type: info.map_or(Linktype::ETHERNET, |i| i.linktype),
                                })
                            }
                            _ => None,
                        };
                        reader.consume(offset);
                        if frame.is_some() {
                            return Ok(frame);
                        }
                    }
                    Err(PcapError::Eof) => return Ok(None),
                    Err(PcapError::UnexpectedEof) => {
                        tracing::warn!("Capture file truncated mid-block, stopping");
                        return Ok(None);
                    }
                    Err(PcapError::BufferTooSmall) => {
                        return Err(CaptureError::Pcap {
                            context: "pcapng reader next",
                            message: "block larger than reader buffer".to_string(),
                        })
                    }
                    Err(PcapError::Incomplete(_)) => {
                        reader.refill().map_err(|e| CaptureError::Pcap {
                            context: "pcapng reader refill",
                            message: e.to_string(),
                        })?;
                    }
                    Err(e) => {
                        return Err(CaptureError::Pcap {
                            context: "pcapng reader next",
                            message: e.to_string(),
                        })
                    }
                },
            }
        }
    }
}

/// Build a frame timestamp, carrying whole seconds out of `nsec`.
///
/// Some writers store a full second or more in the sub-second
/// field. Values chrono cannot represent fall back to the epoch.
fn timestamp(secs: i64, nsec: u64) -> DateTime<Utc> {
    let carried = secs.checked_add((nsec / NANOS_PER_SEC) as i64);
    let subsec = (nsec % NANOS_PER_SEC) as u32;
    match carried.and_then(|secs| DateTime::from_timestamp(secs, subsec)) {
        Some(ts) => ts,
        None => {
            tracing::warn!(
                "Frame timestamp {}s + {}ns out of range, using epoch",
                secs,
                nsec
            );
            DateTime::default()
        }
    }
}

/// Split a pcapng timestamp into seconds and nanoseconds.
///
/// `if_tsresol` is a negative power of 10, or of 2 when the high bit is set.
fn split_ticks(ticks: u64, tsresol: u8) -> (i64, u32) {
    let exponent = u32::from(tsresol & 0x7f);
    let units_per_sec = if tsresol & 0x80 == 0 {
        10u64.checked_pow(exponent)
    } else {
        2u64.checked_pow(exponent)
    }
    .filter(|u| *u > 0)
    .unwrap_or(1_000_000);

    let secs = ticks / units_per_sec;
    let frac = ticks % units_per_sec;
    let nsec = (frac as u128 * 1_000_000_000 / units_per_sec as u128) as u32;
    (secs as i64, nsec)
}
