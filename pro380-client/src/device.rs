//! Device client: typed register queries over one RTU session

use async_trait::async_trait;
use pro380_core::{catalog, MeterResult, RegisterDescriptor, Value};
use pro380_session::RtuSession;
use pro380_transport::{TcpTransport, TransportLayer};
use std::time::Duration;

/// Read access to a meter, the seam polling and publishing code depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MeterClient: Send {
    /// Read and decode one register
    async fn query(&mut self, descriptor: RegisterDescriptor) -> MeterResult<Value>;

    /// Release the connection
    async fn close(&mut self) -> MeterResult<()>;
}

/// A meter reachable through one session
///
/// Dropping the device drops the session and with it the socket, so the
/// connection is released on every exit path; [`Device::close`] does the same
/// explicitly and reports shutdown errors.
#[derive(Debug)]
pub struct Device<T: TransportLayer = TcpTransport> {
    session: RtuSession<T>,
}

impl Device<TcpTransport> {
    /// Connect to the meter at `host:port` with the default timeout
    pub async fn connect(host: &str, port: u16, unit_id: u8) -> MeterResult<Self> {
        let session = RtuSession::connect(host, port, unit_id, Some(Duration::from_secs(30))).await?;
        Ok(Self { session })
    }
}

impl<T: TransportLayer> Device<T> {
    /// Wrap an already opened session
    pub fn from_session(session: RtuSession<T>) -> Self {
        Self { session }
    }

    /// Read a register and decode it into a typed value
    ///
    /// Either the full value is produced or an error is returned. After a
    /// framing, checksum, timeout or transport error the device has to be
    /// reopened.
    pub async fn query(&mut self, descriptor: RegisterDescriptor) -> MeterResult<Value> {
        descriptor.validate()?;
        let payload = self.read_raw(descriptor.address(), descriptor.length()).await?;
        descriptor.decode(&payload)
    }

    /// Read a register from the catalog by name
    pub async fn query_named(&mut self, name: &str) -> MeterResult<Value> {
        let descriptor = catalog::get(name)?;
        self.query(descriptor).await
    }

    /// Read `byte_len` payload bytes starting at register `address`
    ///
    /// Encodes the request, exchanges it and validates the response (length,
    /// CRC, echoed unit id, function code and byte count).
    pub async fn read_raw(&mut self, address: u16, byte_len: u16) -> MeterResult<Vec<u8>> {
        self.session.transact(address, byte_len).await.inspect_err(|e| {
            log::debug!("Reading register {:#06x} failed: {}", address, e);
        })
    }

    pub fn unit_id(&self) -> u8 {
        self.session.unit_id()
    }

    /// Whether the device can take another query
    pub fn is_open(&self) -> bool {
        !self.session.is_closed() && !self.session.is_desynchronized()
    }

    /// Reopen after a failure that desynchronized the session
    pub async fn reopen(&mut self) -> MeterResult<()> {
        self.session.close().await?;
        self.session.open().await
    }

    /// Close the connection. Closing twice is a no-op.
    pub async fn close(&mut self) -> MeterResult<()> {
        self.session.close().await
    }

    pub fn session(&self) -> &RtuSession<T> {
        &self.session
    }
}

#[async_trait]
impl<T: TransportLayer> MeterClient for Device<T> {
    async fn query(&mut self, descriptor: RegisterDescriptor) -> MeterResult<Value> {
        Device::query(self, descriptor).await
    }

    async fn close(&mut self) -> MeterResult<()> {
        Device::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DeviceBuilder;
    use pro380_core::{DecodeKind, MeterError};
    use pro380_session::rtu::{self, encode_exception, encode_response};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    enum Reply {
        Frame(Vec<u8>),
        /// Write these bytes, then drop the connection
        Hangup(Vec<u8>),
        Silence,
    }

    /// Fake meter: answers each 8-byte request with the next reply, writing
    /// frames in small fragments. Returns the requests it received.
    async fn fake_meter(replies: Vec<Reply>) -> (u16, JoinHandle<Vec<Vec<u8>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut requests = Vec::new();
            for reply in replies {
                let mut request = vec![0u8; 8];
                if socket.read_exact(&mut request).await.is_err() {
                    break;
                }
                requests.push(request);
                match reply {
                    Reply::Frame(frame) => {
                        for chunk in frame.chunks(3) {
                            socket.write_all(chunk).await.unwrap();
                            socket.flush().await.unwrap();
                            tokio::time::sleep(Duration::from_millis(5)).await;
                        }
                    }
                    Reply::Hangup(partial) => {
                        socket.write_all(&partial).await.unwrap();
                        break;
                    }
                    Reply::Silence => {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        break;
                    }
                }
            }
            requests
        });
        (port, handle)
    }

    async fn connect(port: u16, unit_id: u8) -> Device {
        DeviceBuilder::new()
            .host("127.0.0.1")
            .port(port)
            .unit_id(unit_id)
            .timeout(Some(Duration::from_millis(100)))
            .connect()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_query_float_register() {
        let (port, meter) = fake_meter(vec![Reply::Frame(encode_response(0x01, &[0x43, 0x66, 0x00, 0x00]).unwrap())]).await;
        let mut device = connect(port, 0x01).await;

        let descriptor = RegisterDescriptor::new(0x5008, 4, DecodeKind::Float);
        assert_eq!(assert_ok!(device.query(descriptor).await), Value::Float(230.0));
        assert_ok!(device.close().await);

        let requests = meter.await.unwrap();
        assert_eq!(requests, vec![rtu::encode_request(0x01, 0x5008, 2).unwrap()]);
    }

    #[tokio::test]
    async fn test_query_named_registers_in_sequence() {
        let voltages: Vec<u8> = [230.0f32, 231.5, 229.8]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        let (port, meter) = fake_meter(vec![
            Reply::Frame(encode_response(0x05, &[0x00, 0x12, 0xAB, 0x0F]).unwrap()),
            Reply::Frame(encode_response(0x05, &[0x25, 0x80]).unwrap()),
            Reply::Frame(encode_response(0x05, &voltages).unwrap()),
        ])
        .await;
        let mut device = connect(port, 0x05).await;
        assert_eq!(device.session().unit_id(), 0x05);

        assert_eq!(
            assert_ok!(device.query_named("serial_number").await),
            Value::HexString("0x0012ab0f".to_string())
        );
        assert_eq!(assert_ok!(device.query_named("baud_rate").await), Value::Integer(9600));
        assert_eq!(
            assert_ok!(device.query_named("phase_voltages").await),
            Value::FloatTuple(vec![230.0, 231.5, 229.8f32 as f64])
        );
        assert_ok!(device.close().await);
        assert_ok!(device.close().await);

        let requests = meter.await.unwrap();
        assert_eq!(requests[0], rtu::encode_request(0x05, 0x1000, 2).unwrap());
        assert_eq!(requests[1], rtu::encode_request(0x05, 0x1020, 1).unwrap());
        assert_eq!(requests[2], rtu::encode_request(0x05, 0x5002, 6).unwrap());
    }

    #[tokio::test]
    async fn test_query_unknown_register_sends_nothing() {
        let (port, meter) = fake_meter(Vec::new()).await;
        let mut device = connect(port, 0x01).await;
        assert!(matches!(
            device.query_named("reactive_power").await,
            Err(MeterError::UnknownRegister(_))
        ));
        assert!(device.is_open());
        assert_ok!(device.close().await);
        assert!(meter.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_corrupted_response_is_checksum_error() {
        let mut frame = encode_response(0x01, &[0x43, 0x66, 0x00, 0x00]).unwrap();
        frame[3] = 0x44;
        let (port, _meter) = fake_meter(vec![Reply::Frame(frame)]).await;
        let mut device = connect(port, 0x01).await;

        let err = assert_err!(device.query(catalog::L1_VOLTAGE).await);
        assert!(matches!(err, MeterError::Checksum { .. }));
        assert!(!device.is_open());
        assert!(device.session().is_desynchronized());
        assert!(device.query(catalog::L1_VOLTAGE).await.is_err());
    }

    #[tokio::test]
    async fn test_connection_closed_mid_read_is_transport_error() {
        let frame = encode_response(0x01, &[0x43, 0x66, 0x00, 0x00]).unwrap();
        let (port, meter) = fake_meter(vec![Reply::Hangup(frame[..5].to_vec())]).await;
        let mut device = connect(port, 0x01).await;

        let err = assert_err!(device.query(catalog::GRID_FREQUENCY).await);
        assert!(matches!(err, MeterError::Transport(_)));
        assert!(!device.is_open());
        meter.await.unwrap();
    }

    #[tokio::test]
    async fn test_silent_meter_times_out() {
        let (port, meter) = fake_meter(vec![Reply::Silence]).await;
        let mut device = connect(port, 0x01).await;

        let err = assert_err!(device.query(catalog::TOTAL_ACTIVE_POWER).await);
        assert!(matches!(err, MeterError::Timeout));
        assert!(err.requires_reopen());
        meter.await.unwrap();
    }

    #[tokio::test]
    async fn test_exception_reply_is_surfaced() {
        let (port, _meter) = fake_meter(vec![
            Reply::Frame(encode_exception(0x01, 0x02)),
            Reply::Frame(encode_response(0x01, &[0x00, 0x05]).unwrap()),
        ])
        .await;
        let mut device = connect(port, 0x01).await;

        let err = assert_err!(device.query(catalog::TOTAL_ACTIVE_ENERGY).await);
        assert!(matches!(err, MeterError::Exception { function: 0x83, code: 0x02 }));
        assert!(device.is_open());
        assert_eq!(assert_ok!(device.query(catalog::CT_RATE).await), Value::Integer(5));
    }

    #[tokio::test]
    async fn test_reply_from_other_unit_is_rejected() {
        let (port, _meter) = fake_meter(vec![Reply::Frame(encode_response(0x02, &[0x00, 0x05]).unwrap())]).await;
        let mut device = connect(port, 0x01).await;

        let err = assert_err!(device.query(catalog::METER_AMPS).await);
        assert!(matches!(err, MeterError::UnexpectedReply { unit_id: 0x02, .. }));
        assert!(!device.is_open());
    }

    #[tokio::test]
    async fn test_invalid_descriptor_sends_nothing() {
        let (port, meter) = fake_meter(Vec::new()).await;
        let mut device = connect(port, 0x01).await;
        let descriptor = RegisterDescriptor::new(0x5008, 3, DecodeKind::Float);
        assert!(matches!(device.query(descriptor).await, Err(MeterError::Decode(_))));
        assert!(device.is_open());
        assert_ok!(device.close().await);
        assert!(meter.await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Device::connect("127.0.0.1", port, 1).await;
        assert!(matches!(result, Err(MeterError::Connection(_))));
    }

    #[tokio::test]
    async fn test_meter_client_trait_object() {
        let (port, _meter) = fake_meter(vec![Reply::Frame(encode_response(0x01, &[0x42, 0x48, 0x00, 0x00]).unwrap())]).await;
        let device = connect(port, 0x01).await;

        let mut client: Box<dyn MeterClient> = Box::new(device);
        assert_eq!(assert_ok!(client.query(catalog::GRID_FREQUENCY).await), Value::Float(50.0));
        assert_ok!(client.close().await);
    }
}
