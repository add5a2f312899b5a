//! Request/response session over a transport
//!
//! The protocol is strictly half-duplex: every method that touches the wire
//! takes `&mut self`, so a second request cannot start before the previous
//! response has been read in full or has failed.

use crate::rtu::{self, EXCEPTION_FRAME_LENGTH, RESPONSE_HEADER_LENGTH};
use pro380_core::{MeterError, MeterResult, REGISTER_WIDTH};
use pro380_transport::{TcpSettings, TcpTransport, TransportLayer};
use std::io::ErrorKind;
use std::time::Duration;

/// Format bytes as space separated hex, for frame logging
pub fn to_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Modbus RTU session bound to one transport and one unit id
#[derive(Debug)]
pub struct RtuSession<T: TransportLayer> {
    transport: T,
    unit_id: u8,
    closed: bool,
    /// Set while a request is on the wire; still set afterwards means the
    /// read position inside the response stream is unknown.
    in_flight: bool,
}

impl RtuSession<TcpTransport> {
    /// Open a TCP session to `host:port` addressing `unit_id`
    ///
    /// No retry is attempted; a failed connect is returned to the caller.
    pub async fn connect(host: &str, port: u16, unit_id: u8, timeout: Option<Duration>) -> MeterResult<Self> {
        let mut settings = TcpSettings::from_host(host, port);
        settings.timeout = timeout;
        let mut session = Self::new(TcpTransport::new(settings), unit_id);
        session.open().await?;
        Ok(session)
    }
}

impl<T: TransportLayer> RtuSession<T> {
    /// Create a new session; the transport is opened by [`RtuSession::open`]
    pub fn new(transport: T, unit_id: u8) -> Self {
        Self {
            transport,
            unit_id,
            closed: true,
            in_flight: false,
        }
    }

    /// Open the session
    pub async fn open(&mut self) -> MeterResult<()> {
        self.transport.open().await?;
        self.closed = false;
        self.in_flight = false;
        log::info!("RTU session opened for unit {}", self.unit_id);
        Ok(())
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Change the read/write timeout of the underlying transport
    pub async fn set_timeout(&mut self, timeout: Option<Duration>) -> MeterResult<()> {
        self.transport.set_timeout(timeout).await
    }

    /// Check if session is closed
    pub fn is_closed(&self) -> bool {
        self.closed || self.transport.is_closed()
    }

    /// Whether an earlier exchange was interrupted or rejected and the session
    /// must be reopened before further use
    pub fn is_desynchronized(&self) -> bool {
        self.in_flight
    }

    /// Mark the session unusable after a framing or checksum failure
    pub fn invalidate(&mut self) {
        self.in_flight = true;
    }

    /// Send a request frame and read the complete response frame
    ///
    /// Reads exactly `3 + expected_payload_len + 2` bytes, however the stream
    /// fragments them. An exception reply is read in full (5 bytes) and
    /// returned as is, so the stream stays aligned.
    pub async fn send_and_receive(&mut self, request: &[u8], expected_payload_len: u16) -> MeterResult<Vec<u8>> {
        if self.is_closed() {
            return Err(MeterError::transport(ErrorKind::NotConnected, "RTU session is closed"));
        }
        if self.in_flight {
            return Err(MeterError::transport(
                ErrorKind::InvalidData,
                "RTU session is desynchronized, reopen it",
            ));
        }

        self.in_flight = true;
        log::debug!("send: {}", to_hex(request));
        self.transport.write_all(request).await?;
        self.transport.flush().await?;

        let mut frame = vec![0u8; rtu::response_len(expected_payload_len)];
        self.transport.read_exact(&mut frame[..RESPONSE_HEADER_LENGTH]).await?;
        if rtu::is_exception(&frame) {
            frame.truncate(EXCEPTION_FRAME_LENGTH);
        }
        self.transport.read_exact(&mut frame[RESPONSE_HEADER_LENGTH..]).await?;
        self.in_flight = false;

        log::debug!("recv: {}", to_hex(&frame));
        Ok(frame)
    }

    /// Read `byte_len` bytes starting at register `address`
    ///
    /// Encodes the request for `byte_len / 2` registers, exchanges it and
    /// returns the checked payload. Framing and checksum failures leave the
    /// session desynchronized.
    pub async fn transact(&mut self, address: u16, byte_len: u16) -> MeterResult<Vec<u8>> {
        if byte_len % REGISTER_WIDTH != 0 {
            return Err(MeterError::InvalidRequest(format!(
                "length {} is not a whole number of registers",
                byte_len
            )));
        }
        let request = rtu::encode_request(self.unit_id, address, byte_len / REGISTER_WIDTH)?;
        let raw = self.send_and_receive(&request, byte_len).await?;
        rtu::decode_response_for(&raw, self.unit_id, byte_len).inspect_err(|e| {
            if e.requires_reopen() {
                self.invalidate();
            }
        })
    }

    /// Close the session. Closing twice is a no-op.
    pub async fn close(&mut self) -> MeterResult<()> {
        if !self.closed {
            self.transport.close().await?;
            self.closed = true;
            log::info!("RTU session closed for unit {}", self.unit_id);
        }
        self.in_flight = false;
        Ok(())
    }
}
