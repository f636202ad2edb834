//! CTAPHID channel (host side)
//!
//! Allocates a channel with CTAPHID_INIT on the broadcast CID, then runs
//! request/response transactions on it. While the authenticator waits for
//! user presence it sends KEEPALIVE packets; these are skipped until the
//! real response arrives or the caller's deadline passes.

use crate::ctaphid::{BROADCAST_CID, Cmd, ErrorCode, InitResponse, Message, Packet, Reassembler};
use crate::error::{Error, Result};

use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// How long to wait for the INIT response
pub const INIT_TIMEOUT: Duration = Duration::from_secs(5);

const KEEPALIVE_PROCESSING: u8 = 0x01;
const KEEPALIVE_UP_NEEDED: u8 = 0x02;

/// Raw packet access to one HID device
pub trait HidIo {
    fn write_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Read one packet, `Ok(None)` when the timeout expires first
    fn read_packet(&mut self, timeout: Duration) -> Result<Option<Packet>>;
}

impl<T: HidIo + ?Sized> HidIo for &mut T {
    fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        (**self).write_packet(packet)
    }

    fn read_packet(&mut self, timeout: Duration) -> Result<Option<Packet>> {
        (**self).read_packet(timeout)
    }
}

/// An allocated CTAPHID channel on one device
pub struct Channel<D: HidIo> {
    device: D,
    info: InitResponse,
}

impl<D: HidIo> Channel<D> {
    /// Run CTAPHID_INIT and take ownership of the device
    pub fn open(mut device: D) -> Result<Self> {
        let nonce: [u8; 8] = rand::random();
        send(&mut device, &Message::new(BROADCAST_CID, Cmd::Init, nonce.to_vec()))?;

        let deadline = Instant::now() + INIT_TIMEOUT;
        let info = loop {
            let message = receive(&mut device, BROADCAST_CID, Cmd::Init, deadline)?;
            let response = InitResponse::parse(&message.data)?;
            if response.nonce == nonce {
                break response;
            }
            // Another host's INIT on the broadcast channel
            trace!("ignoring INIT response with foreign nonce");
        };

        debug!(
            cid = format_args!("{:08x}", info.cid),
            major = info.major,
            minor = info.minor,
            build = info.build,
            capabilities = info.capabilities.0,
            "CTAPHID channel allocated"
        );

        Ok(Self { device, info })
    }

    pub fn cid(&self) -> u32 {
        self.info.cid
    }

    /// Device version and capabilities from INIT
    pub fn info(&self) -> &InitResponse {
        &self.info
    }

    /// Send one message and wait for the response with the same command
    pub fn transact(&mut self, cmd: Cmd, payload: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let cid = self.info.cid;
        send(&mut self.device, &Message::new(cid, cmd, payload.to_vec()))?;
        let message = receive(&mut self.device, cid, cmd, Instant::now() + timeout)?;
        Ok(message.data)
    }

    /// CTAPHID_CBOR: `payload` is the CTAP command byte followed by CBOR
    pub fn cbor(&mut self, payload: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        self.transact(Cmd::Cbor, payload, timeout)
    }

    pub fn into_inner(self) -> D {
        self.device
    }
}

fn send<D: HidIo>(device: &mut D, message: &Message) -> Result<()> {
    trace!(cmd = ?message.cmd, len = message.data.len(), "ctaphid send");
    for packet in message.to_packets()? {
        device.write_packet(&packet)?;
    }
    Ok(())
}

fn receive<D: HidIo>(device: &mut D, cid: u32, expected: Cmd, deadline: Instant) -> Result<Message> {
    let mut pending: Option<Reassembler> = None;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout);
        }
        let Some(packet) = device.read_packet(remaining)? else {
            return Err(Error::Timeout);
        };

        if packet.cid() != cid {
            trace!(cid = format_args!("{:08x}", packet.cid()), "skipping packet for other channel");
            continue;
        }

        if !packet.is_init() {
            match pending.as_mut() {
                Some(reassembler) => reassembler.push(&packet)?,
                // Stray continuation with nothing to continue
                None => continue,
            }
        } else {
            match packet.cmd() {
                Some(Cmd::Keepalive) => {
                    match packet.payload()[0] {
                        KEEPALIVE_UP_NEEDED => debug!("waiting for user presence"),
                        KEEPALIVE_PROCESSING => trace!("authenticator processing"),
                        status => trace!(status, "keepalive"),
                    }
                    continue;
                }
                Some(Cmd::Error) => {
                    return Err(Error::Device(ErrorCode::from_u8(packet.payload()[0])));
                }
                Some(cmd) if cmd == expected => pending = Some(Reassembler::start(&packet)?),
                _ => return Err(Error::InvalidCommand),
            }
        }

        if let Some(reassembler) = pending.take_if(|r| r.is_complete()) {
            let message = reassembler.finish()?;
            trace!(cmd = ?message.cmd, len = message.data.len(), "ctaphid receive");
            return Ok(message);
        }
    }
}
