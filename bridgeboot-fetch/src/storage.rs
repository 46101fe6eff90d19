//! [`FetchStorage`]: a [`Storage`] implementation driven by the packet
//! firmware-fetch protocol, so the TFTF image engine can load a signed
//! image from an interconnect peer exactly as it would from flash.
//!
//! Grounded on `original_source/common/src/gbboot.c`'s `data_load_greybus_*`
//! family (`greybus_ops`) and `gbcore.c`'s manifest/connect bootstrap, folded
//! into the `bridgeboot_traits::Storage` contract the same way
//! `bridgeboot-format`'s engines are: one state machine driving a small
//! transport trait, no full-image buffering.

use bridgeboot_traits::storage::{Storage, StorageError};
use defmt_or_log::debug;

use crate::channel::Channel;
use crate::control::{ControlResponder, MAX_MANIFEST_SIZE};
use crate::error::FetchError;
use crate::frame::{self, op, FrameHeader, HEADER_SIZE, MAX_PAYLOAD};

/// Combined transport/protocol error for fetch-storage operations.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    Channel(E),
    Fetch(FetchError),
}

impl<E> From<FetchError> for Error<E> {
    fn from(value: FetchError) -> Self {
        Error::Fetch(value)
    }
}

/// A [`Storage`] backend driven by a request/response datagram protocol.
///
/// `control` carries the bootstrap dialogue (`ControlResponder`); `channel`
/// carries the firmware-fetch operations proper. In the original these are
/// two distinct UniPro CPorts multiplexed over one physical link; modeling
/// them as two separate [`Channel`] instances keeps that separation without
/// this crate needing to know anything about CPorts.
pub struct FetchStorage<C, R> {
    control: C,
    channel: C,
    responder: R,
    stage: u8,
    poll_budget: u32,
    max_firmware_size: u32,
    firmware_size: u32,
    offset: u32,
    next_id: u16,
    initialized: bool,
    finished: bool,
}

impl<C, R> FetchStorage<C, R>
where
    C: Channel,
    R: ControlResponder,
{
    /// `stage` selects which stage's firmware to request (`FIRMWARE_SIZE`'s
    /// request payload). `max_firmware_size` bounds the reported size against
    /// the caller's RAM window (`original_source`'s `WORKRAM_SIZE` check).
    /// `poll_budget` bounds every individual receive-wait below (default
    /// recommendation: `PlatformConfig::receive_poll_budget`, 512).
    pub fn new(control: C, channel: C, responder: R, stage: u8, max_firmware_size: u32, poll_budget: u32) -> Self {
        Self {
            control,
            channel,
            responder,
            stage,
            poll_budget,
            max_firmware_size,
            firmware_size: 0,
            offset: 0,
            next_id: 0,
            initialized: false,
            finished: false,
        }
    }

    fn take_id(&mut self) -> u16 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    /// Poll `channel` up to `self.poll_budget` times for one inbound frame,
    /// parsing its header out of `buf`. Returns `None` if the budget is
    /// exhausted without a frame arriving.
    async fn poll_frame<'a>(channel: &mut C, buf: &'a mut [u8], budget: u32) -> Result<Option<(FrameHeader, &'a [u8])>, Error<C::Error>> {
        for _ in 0..budget {
            let n = channel.receive(buf).await.map_err(Error::Channel)?;
            if n == 0 {
                continue;
            }
            if n < HEADER_SIZE {
                return Err(FetchError::Recv.into());
            }
            let header_bytes: [u8; HEADER_SIZE] = buf[..HEADER_SIZE].try_into().unwrap_or([0; HEADER_SIZE]);
            let header = FrameHeader::parse(&header_bytes);
            return Ok(Some((header, &buf[HEADER_SIZE..n])));
        }
        Ok(None)
    }

    /// Drive the bootstrap control dialogue to completion: answer every
    /// inbound request on `control` until a `CONNECT` request is handled.
    async fn drive_control_dialogue(&mut self) -> Result<(), Error<C::Error>> {
        let mut buf = [0u8; HEADER_SIZE + MAX_MANIFEST_SIZE];

        for _ in 0..self.poll_budget {
            let Some((header, payload)) = Self::poll_frame(&mut self.control, &mut buf, 1).await? else {
                continue;
            };
            if header.is_response() {
                // The original's control cport handler rejects stray responses
                // on a request-only channel; treat it the same way here.
                return Err(FetchError::ControlCport.into());
            }

            let connected = match header.op() {
                op::CONTROL_PROTOCOL_VERSION => {
                    let (maj, min) = self.responder.protocol_version();
                    self.send_control_response(op::CONTROL_PROTOCOL_VERSION, header.id, &[maj, min]).await?;
                    false
                }
                op::CONTROL_PROBE_AP => {
                    self.responder.probe();
                    self.send_control_response(op::CONTROL_PROBE_AP, header.id, &[]).await?;
                    false
                }
                op::CONTROL_GET_MANIFEST_SIZE => {
                    let len = self.responder.manifest_len();
                    self.send_control_response(op::CONTROL_GET_MANIFEST_SIZE, header.id, &len.to_le_bytes()).await?;
                    false
                }
                op::CONTROL_GET_MANIFEST => {
                    let len = (self.responder.manifest_len() as usize).min(MAX_MANIFEST_SIZE);
                    let mut manifest = [0u8; MAX_MANIFEST_SIZE];
                    self.responder.manifest(&mut manifest[..len]);
                    let manifest = manifest;
                    self.send_control_response(op::CONTROL_GET_MANIFEST, header.id, &manifest[..len]).await?;
                    false
                }
                op::CONTROL_CONNECT => {
                    self.responder.connect();
                    self.send_control_response(op::CONTROL_CONNECT, header.id, &[]).await?;
                    true
                }
                _ => {
                    let _ = payload;
                    false
                }
            };

            if connected {
                return Ok(());
            }
        }

        Err(FetchError::ControlCport.into())
    }

    async fn send_control_response(&mut self, request_op: u8, id: u16, payload: &[u8]) -> Result<(), Error<C::Error>> {
        send_response(&mut self.control, request_op, id, 0, payload).await
    }

    /// Wait for the firmware channel's `AP_READY` request, then fetch the
    /// firmware size for `self.stage`.
    async fn drive_firmware_handshake(&mut self) -> Result<(), Error<C::Error>> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut seen_ap_ready = false;
        for _ in 0..self.poll_budget {
            let Some((header, _)) = Self::poll_frame(&mut self.channel, &mut buf, 1).await? else {
                continue;
            };
            if !header.is_response() && header.op() == op::FW_AP_READY {
                send_response(&mut self.channel, op::FW_AP_READY, header.id, 0, &[]).await?;
                seen_ap_ready = true;
                break;
            }
        }
        if !seen_ap_ready {
            return Err(FetchError::ApReadyTimeout.into());
        }

        let id = self.take_id();
        send_request(&mut self.channel, op::FW_FIRMWARE_SIZE, id, &[self.stage]).await?;
        let mut buf = [0u8; HEADER_SIZE + 4];
        let (header, payload) = self
            .await_response(&mut buf, op::FW_FIRMWARE_SIZE, id)
            .await?
            .ok_or(Error::Fetch(FetchError::FirmwareSize))?;
        if header.status != 0 || payload.len() < 4 {
            return Err(FetchError::FirmwareSize.into());
        }
        let size = u32::from_le_bytes(payload[..4].try_into().unwrap_or([0u8; 4]));
        if size > self.max_firmware_size {
            return Err(FetchError::TooLarge.into());
        }
        self.firmware_size = size;
        self.offset = 0;
        Ok(())
    }

    /// Send a request on the firmware channel and block until a response
    /// with a matching operation code arrives, per `SPEC_FULL.md` §4.F's
    /// "each `send_request` is followed by exactly one `receive`" contract.
    async fn await_response<'a>(&mut self, buf: &'a mut [u8], expected_op: u8, expected_id: u16) -> Result<Option<(FrameHeader, &'a [u8])>, Error<C::Error>> {
        match Self::poll_frame(&mut self.channel, buf, self.poll_budget).await? {
            Some((header, payload)) if header.is_response() && header.op() == expected_op && header.id == expected_id => Ok(Some((header, payload))),
            Some(_) => Err(FetchError::Recv.into()),
            None => Err(FetchError::Timeout.into()),
        }
    }
}

async fn send_request<C: Channel>(channel: &mut C, op: u8, id: u16, payload: &[u8]) -> Result<(), Error<C::Error>> {
    let header = frame::request(op, id, payload.len());
    send_frame(channel, &header, payload).await
}

async fn send_response<C: Channel>(channel: &mut C, op: u8, id: u16, status: u8, payload: &[u8]) -> Result<(), Error<C::Error>> {
    let header = frame::response(op, id, status, payload.len());
    send_frame(channel, &header, payload).await
}

async fn send_frame<C: Channel>(channel: &mut C, header: &FrameHeader, payload: &[u8]) -> Result<(), Error<C::Error>> {
    let mut buf = [0u8; HEADER_SIZE + MAX_PAYLOAD];
    let total = HEADER_SIZE + payload.len();
    buf[..HEADER_SIZE].copy_from_slice(&header.encode());
    buf[HEADER_SIZE..total].copy_from_slice(payload);
    channel.send(&buf[..total]).await.map_err(Error::Channel)
}

impl<C, R> Storage for FetchStorage<C, R>
where
    C: Channel,
    R: ControlResponder,
{
    type Error = Error<C::Error>;

    async fn init(&mut self) -> Result<(), StorageError<Self::Error>> {
        if self.initialized {
            return Err(StorageError::AlreadyFinished);
        }
        self.drive_control_dialogue().await?;
        self.drive_firmware_handshake().await?;
        self.initialized = true;
        debug!("fetch: connected, firmware_size {:?}", self.firmware_size);
        Ok(())
    }

    /// Fetch `dst.len()` bytes starting at the running offset, in chunks of
    /// at most [`MAX_PAYLOAD`]. The `hash` flag is accepted for API parity
    /// with [`Storage`] but is a no-op here: this workspace's TFTF engine
    /// (`bridgeboot-format::tftf::load_image`) hashes every streamed byte
    /// itself, transport-agnostically, rather than delegating to the
    /// backend — see `bridgeboot-format::testutil::MemoryStorage` for the
    /// same convention on the flash side, and `DESIGN.md`'s "hash inline"
    /// Open Question resolution.
    async fn load(&mut self, dst: &mut [u8], _hash: bool) -> Result<(), StorageError<Self::Error>> {
        if !self.initialized {
            return Err(StorageError::NotInitialized);
        }
        if self.finished {
            return Err(StorageError::AlreadyFinished);
        }
        if self.offset as u64 + dst.len() as u64 > self.firmware_size as u64 {
            return Err(StorageError::OutOfRange);
        }

        let mut written = 0;
        while written < dst.len() {
            let chunk_len = (dst.len() - written).min(MAX_PAYLOAD);
            let id = self.take_id();
            let mut req_payload = [0u8; 8];
            req_payload[..4].copy_from_slice(&self.offset.to_le_bytes());
            req_payload[4..].copy_from_slice(&(chunk_len as u32).to_le_bytes());
            send_request(&mut self.channel, op::FW_GET_FIRMWARE, id, &req_payload).await.map_err(StorageError::Other)?;

            let mut buf = [0u8; HEADER_SIZE + MAX_PAYLOAD];
            let (header, payload) = self
                .await_response(&mut buf, op::FW_GET_FIRMWARE, id)
                .await
                .map_err(StorageError::Other)?
                .ok_or(StorageError::Other(Error::Fetch(FetchError::GetFirmware)))?;
            if header.status != 0 || payload.len() != chunk_len {
                return Err(StorageError::Other(Error::Fetch(FetchError::GetFirmware)));
            }
            dst[written..written + chunk_len].copy_from_slice(payload);

            self.offset += chunk_len as u32;
            written += chunk_len;
        }
        Ok(())
    }

    async fn finish(&mut self, valid: bool, secure: bool) -> Result<(), StorageError<Self::Error>> {
        if self.finished {
            return Err(StorageError::AlreadyFinished);
        }
        let status: u8 = if !valid {
            0
        } else if secure {
            2
        } else {
            1
        };
        let id = self.take_id();
        send_request(&mut self.channel, op::FW_READY_TO_BOOT, id, &[status]).await.map_err(StorageError::Other)?;
        let mut buf = [0u8; HEADER_SIZE];
        self.await_response(&mut buf, op::FW_READY_TO_BOOT, id)
            .await
            .map_err(|_| StorageError::Other(Error::Fetch(FetchError::Ready)))?
            .ok_or(StorageError::Other(Error::Fetch(FetchError::Ready)))?;
        self.finished = true;
        debug!("fetch: ready-to-boot sent, status {:?}", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::vec;
    use std::vec::Vec;

    use super::*;

    /// A [`Channel`] test double backed by a fixed script of scripted
    /// request frames to hand back, and a sink for sent frames.
    ///
    /// Styled on `bridgeboot-format::testutil::MemoryStorage`: a flat,
    /// deterministic stand-in for the real transport.
    struct ScriptedChannel {
        inbound: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
    }

    impl ScriptedChannel {
        fn new(inbound: Vec<Vec<u8>>) -> Self {
            Self { inbound: inbound.into(), sent: Vec::new() }
        }
    }

    impl Channel for ScriptedChannel {
        type Error = ();

        async fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
            self.sent.push(frame.to_vec());
            Ok(())
        }

        async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            match self.inbound.pop_front() {
                None => Ok(0),
                Some(datagram) => {
                    buf[..datagram.len()].copy_from_slice(&datagram);
                    Ok(datagram.len())
                }
            }
        }
    }

    struct FixedResponder {
        manifest: Vec<u8>,
    }

    impl ControlResponder for FixedResponder {
        fn protocol_version(&mut self) -> (u8, u8) {
            (0, 1)
        }
        fn probe(&mut self) {}
        fn manifest_len(&mut self) -> u32 {
            self.manifest.len() as u32
        }
        fn manifest(&mut self, dst: &mut [u8]) {
            dst.copy_from_slice(&self.manifest);
        }
        fn connect(&mut self) {}
    }

    fn request_datagram(op: u8, id: u16, payload: &[u8]) -> Vec<u8> {
        let header = frame::request(op, id, payload.len());
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn response_datagram(op: u8, id: u16, status: u8, payload: &[u8]) -> Vec<u8> {
        let header = frame::response(op, id, status, payload.len());
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn init_then_load_then_finish_round_trips() {
        let control_frames = vec![request_datagram(op::CONTROL_CONNECT, 0, &[])];
        let firmware = b"FWFWFWFW".to_vec();
        let firmware_frames = vec![
            request_datagram(op::FW_AP_READY, 0, &[]),
            response_datagram(op::FW_FIRMWARE_SIZE, 0, 0, &(firmware.len() as u32).to_le_bytes()),
            response_datagram(op::FW_GET_FIRMWARE, 1, 0, &firmware),
            response_datagram(op::FW_READY_TO_BOOT, 2, 0, &[]),
        ];

        let control = ScriptedChannel::new(control_frames);
        let channel = ScriptedChannel::new(firmware_frames);
        let responder = FixedResponder { manifest: vec![1, 2, 3] };
        let mut storage = FetchStorage::new(control, channel, responder, 2, 1 << 20, 64);

        embassy_futures::block_on(async {
            storage.init().await.unwrap();
            let mut dst = vec![0u8; firmware.len()];
            storage.load(&mut dst, true).await.unwrap();
            assert_eq!(dst, firmware);
            storage.finish(true, true).await.unwrap();
        });
    }

    #[test]
    fn load_out_of_range_is_rejected_before_any_request() {
        let control = ScriptedChannel::new(vec![request_datagram(op::CONTROL_CONNECT, 0, &[])]);
        let firmware_frames = vec![
            request_datagram(op::FW_AP_READY, 0, &[]),
            response_datagram(op::FW_FIRMWARE_SIZE, 0, 0, &4u32.to_le_bytes()),
        ];
        let channel = ScriptedChannel::new(firmware_frames);
        let responder = FixedResponder { manifest: vec![] };
        let mut storage = FetchStorage::new(control, channel, responder, 2, 1 << 20, 64);

        embassy_futures::block_on(async {
            storage.init().await.unwrap();
            let mut dst = vec![0u8; 8];
            let err = storage.load(&mut dst, false).await.unwrap_err();
            assert!(matches!(err, StorageError::OutOfRange));
        });
    }

    #[test]
    fn firmware_size_over_bound_is_rejected() {
        let control = ScriptedChannel::new(vec![request_datagram(op::CONTROL_CONNECT, 0, &[])]);
        let firmware_frames = vec![
            request_datagram(op::FW_AP_READY, 0, &[]),
            response_datagram(op::FW_FIRMWARE_SIZE, 0, 0, &0x1000u32.to_le_bytes()),
        ];
        let channel = ScriptedChannel::new(firmware_frames);
        let responder = FixedResponder { manifest: vec![] };
        let mut storage = FetchStorage::new(control, channel, responder, 2, 0x800, 64);

        embassy_futures::block_on(async {
            let err = storage.init().await.unwrap_err();
            assert!(matches!(err, StorageError::Other(Error::Fetch(FetchError::TooLarge))));
        });
    }
}
