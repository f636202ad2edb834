//! CTAPHID framing (host side)
//!
//! Packet Format:
//! - Initialization packet: CID(4) + CMD(1) + BCNT(2) + DATA(57)
//! - Continuation packet: CID(4) + SEQ(1) + DATA(59)
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#usb-hid-framing>

use crate::error::{Error, Result};

use core::fmt;

/// HID report size used by every FIDO authenticator
pub const PACKET_SIZE: usize = 64;

/// Largest payload that fits in one initialization packet plus 128 continuations
pub const MAX_MESSAGE_SIZE: usize = 7609;

/// Channel used for INIT before a CID has been allocated
pub const BROADCAST_CID: u32 = 0xFFFF_FFFF;

const INIT_DATA_SIZE: usize = PACKET_SIZE - 7;
const CONT_DATA_SIZE: usize = PACKET_SIZE - 5;
const MAX_SEQ: u8 = 0x7F;

/// CTAPHID commands a host sends or receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Cmd {
    Ping = 0x01,
    Msg = 0x03,
    Lock = 0x04,
    Init = 0x06,
    Wink = 0x08,
    Cbor = 0x10,
    Cancel = 0x11,
    Keepalive = 0x3B,
    Error = 0x3F,
}

impl Cmd {
    /// Decode a command byte, ignoring the initialization bit
    pub fn from_u8(value: u8) -> Option<Self> {
        match value & 0x7F {
            0x01 => Some(Cmd::Ping),
            0x03 => Some(Cmd::Msg),
            0x04 => Some(Cmd::Lock),
            0x06 => Some(Cmd::Init),
            0x08 => Some(Cmd::Wink),
            0x10 => Some(Cmd::Cbor),
            0x11 => Some(Cmd::Cancel),
            0x3B => Some(Cmd::Keepalive),
            0x3F => Some(Cmd::Error),
            _ => None,
        }
    }

    /// Command byte as it appears in an initialization packet
    pub fn init_byte(self) -> u8 {
        (self as u8) | 0x80
    }
}

/// Error codes carried by a CTAPHID_ERROR response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidCmd,
    InvalidPar,
    InvalidLen,
    InvalidSeq,
    MsgTimeout,
    ChannelBusy,
    LockRequired,
    InvalidChannel,
    Other(u8),
}

impl ErrorCode {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x01 => ErrorCode::InvalidCmd,
            0x02 => ErrorCode::InvalidPar,
            0x03 => ErrorCode::InvalidLen,
            0x04 => ErrorCode::InvalidSeq,
            0x05 => ErrorCode::MsgTimeout,
            0x06 => ErrorCode::ChannelBusy,
            0x0A => ErrorCode::LockRequired,
            0x0B => ErrorCode::InvalidChannel,
            other => ErrorCode::Other(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidCmd => write!(f, "invalid command"),
            ErrorCode::InvalidPar => write!(f, "invalid parameter"),
            ErrorCode::InvalidLen => write!(f, "invalid length"),
            ErrorCode::InvalidSeq => write!(f, "invalid sequence"),
            ErrorCode::MsgTimeout => write!(f, "message timeout"),
            ErrorCode::ChannelBusy => write!(f, "channel busy"),
            ErrorCode::LockRequired => write!(f, "lock required"),
            ErrorCode::InvalidChannel => write!(f, "invalid channel"),
            ErrorCode::Other(code) => write!(f, "error 0x{:02x}", code),
        }
    }
}

/// One 64-byte HID report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    data: [u8; PACKET_SIZE],
}

impl Packet {
    pub fn from_bytes(data: [u8; PACKET_SIZE]) -> Self {
        Self { data }
    }

    /// Build a packet from a report read off the wire
    ///
    /// Short reads are zero-padded; some HID backends strip trailing zeros.
    pub fn from_report(report: &[u8]) -> Result<Self> {
        if report.is_empty() || report.len() > PACKET_SIZE {
            return Err(Error::InvalidPacket);
        }
        let mut data = [0u8; PACKET_SIZE];
        data[..report.len()].copy_from_slice(report);
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.data
    }

    pub fn cid(&self) -> u32 {
        u32::from_be_bytes([self.data[0], self.data[1], self.data[2], self.data[3]])
    }

    pub fn is_init(&self) -> bool {
        (self.data[4] & 0x80) != 0
    }

    /// Command of an initialization packet
    pub fn cmd(&self) -> Option<Cmd> {
        self.is_init().then(|| Cmd::from_u8(self.data[4])).flatten()
    }

    /// Total message length announced by an initialization packet
    pub fn payload_len(&self) -> Option<usize> {
        self.is_init()
            .then(|| u16::from_be_bytes([self.data[5], self.data[6]]) as usize)
    }

    /// Sequence number of a continuation packet
    pub fn seq(&self) -> Option<u8> {
        (!self.is_init()).then_some(self.data[4])
    }

    pub fn payload(&self) -> &[u8] {
        if self.is_init() {
            &self.data[7..]
        } else {
            &self.data[5..]
        }
    }

    fn init(cid: u32, cmd: Cmd, total_len: usize, chunk: &[u8]) -> Self {
        let mut data = [0u8; PACKET_SIZE];
        data[0..4].copy_from_slice(&cid.to_be_bytes());
        data[4] = cmd.init_byte();
        data[5..7].copy_from_slice(&(total_len as u16).to_be_bytes());
        data[7..7 + chunk.len()].copy_from_slice(chunk);
        Self { data }
    }

    fn continuation(cid: u32, seq: u8, chunk: &[u8]) -> Self {
        let mut data = [0u8; PACKET_SIZE];
        data[0..4].copy_from_slice(&cid.to_be_bytes());
        data[4] = seq;
        data[5..5 + chunk.len()].copy_from_slice(chunk);
        Self { data }
    }
}

/// A complete CTAPHID message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub cid: u32,
    pub cmd: Cmd,
    pub data: Vec<u8>,
}

impl Message {
    pub fn new(cid: u32, cmd: Cmd, data: Vec<u8>) -> Self {
        Self { cid, cmd, data }
    }

    /// Split the message into one initialization packet and its continuations
    pub fn to_packets(&self) -> Result<Vec<Packet>> {
        if self.data.len() > MAX_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge);
        }

        let head = self.data.len().min(INIT_DATA_SIZE);
        let mut packets = vec![Packet::init(
            self.cid,
            self.cmd,
            self.data.len(),
            &self.data[..head],
        )];

        for (seq, chunk) in self.data[head..].chunks(CONT_DATA_SIZE).enumerate() {
            if seq > MAX_SEQ as usize {
                return Err(Error::MessageTooLarge);
            }
            packets.push(Packet::continuation(self.cid, seq as u8, chunk));
        }

        Ok(packets)
    }
}

/// Incremental reassembly of a response as packets arrive
#[derive(Debug)]
pub struct Reassembler {
    cid: u32,
    cmd: Cmd,
    expected: usize,
    next_seq: u8,
    data: Vec<u8>,
}

impl Reassembler {
    /// Start reassembly from an initialization packet
    pub fn start(packet: &Packet) -> Result<Self> {
        let cmd = packet.cmd().ok_or(Error::InvalidCommand)?;
        let expected = packet.payload_len().ok_or(Error::InvalidPacket)?;
        if expected > MAX_MESSAGE_SIZE {
            return Err(Error::MessageTooLarge);
        }

        let mut data = Vec::with_capacity(expected);
        let head = expected.min(INIT_DATA_SIZE);
        data.extend_from_slice(&packet.payload()[..head]);

        Ok(Self {
            cid: packet.cid(),
            cmd,
            expected,
            next_seq: 0,
            data,
        })
    }

    /// Append a continuation packet
    pub fn push(&mut self, packet: &Packet) -> Result<()> {
        if packet.cid() != self.cid {
            return Err(Error::InvalidChannel);
        }
        let seq = packet.seq().ok_or(Error::InvalidSequence)?;
        if seq != self.next_seq || seq > MAX_SEQ {
            return Err(Error::InvalidSequence);
        }
        if self.is_complete() {
            return Err(Error::Truncated);
        }

        let take = (self.expected - self.data.len()).min(CONT_DATA_SIZE);
        self.data.extend_from_slice(&packet.payload()[..take]);
        self.next_seq += 1;
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.data.len() == self.expected
    }

    pub fn finish(self) -> Result<Message> {
        if !self.is_complete() {
            return Err(Error::Truncated);
        }
        Ok(Message::new(self.cid, self.cmd, self.data))
    }

    /// Reassemble a full packet sequence in one go
    pub fn collect(packets: &[Packet]) -> Result<Message> {
        let (first, rest) = packets.split_first().ok_or(Error::InvalidPacket)?;
        let mut reassembler = Self::start(first)?;
        for packet in rest {
            reassembler.push(packet)?;
        }
        reassembler.finish()
    }
}

/// Capability flags advertised in the INIT response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(pub u8);

impl Capabilities {
    pub const WINK: u8 = 0x01;
    pub const CBOR: u8 = 0x04;
    pub const NMSG: u8 = 0x08;

    pub fn wink(self) -> bool {
        self.0 & Self::WINK != 0
    }

    /// Device understands CTAPHID_CBOR, i.e. speaks CTAP2
    pub fn cbor(self) -> bool {
        self.0 & Self::CBOR != 0
    }

    /// Device does not implement CTAPHID_MSG (CTAP1/U2F)
    pub fn no_msg(self) -> bool {
        self.0 & Self::NMSG != 0
    }
}

/// Parsed CTAPHID_INIT response
///
/// Layout: nonce(8) CID(4) protocol(1) major(1) minor(1) build(1) capabilities(1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitResponse {
    pub nonce: [u8; 8],
    pub cid: u32,
    pub protocol_version: u8,
    pub major: u8,
    pub minor: u8,
    pub build: u8,
    pub capabilities: Capabilities,
}

impl InitResponse {
    pub const LEN: usize = 17;

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::LEN {
            return Err(Error::InvalidPacket);
        }
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&data[0..8]);

        Ok(Self {
            nonce,
            cid: u32::from_be_bytes([data[8], data[9], data[10], data[11]]),
            protocol_version: data[12],
            major: data[13],
            minor: data[14],
            build: data[15],
            capabilities: Capabilities(data[16]),
        })
    }

    /// Encode the response, used by test doubles that play the device
    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[0..8].copy_from_slice(&self.nonce);
        out[8..12].copy_from_slice(&self.cid.to_be_bytes());
        out[12] = self.protocol_version;
        out[13] = self.major;
        out[14] = self.minor;
        out[15] = self.build;
        out[16] = self.capabilities.0;
        out
    }
}
