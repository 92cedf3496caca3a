use log::{debug, error, warn};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::frame::{opcode, CommandBuffer};
use crate::receiver::{DriverStatus, RxHandle, Shared};
use crate::response::{Response, ResponseKind};
use crate::transport::RfidTransport;
use crate::types::{PowerMode, Region, TagInfo, TagProtocol, UhfError, VersionInfo};

pub struct M6eNano<T: RfidTransport> {
    transport: T,
    shared: Arc<Shared>,
    command: CommandBuffer,
    config: Config,
}

impl<T: RfidTransport> M6eNano<T> {
    // Continuous read of Gen2 tags through MULTI_PROTOCOL_TAG_OP:
    // timeout 0, option 0x01 (continuous), sub-opcode READ_TAG_ID_MULTIPLE,
    // search flags, Gen2 protocol, then the embedded read plan.
    const START_READING: [u8; 16] = [
        0x00, 0x00, 0x01, 0x22, 0x00, 0x00, 0x05, 0x07, 0x22, 0x10, 0x00, 0x1B, 0x03, 0xE8, 0x01,
        0xFF,
    ];
    const STOP_READING: [u8; 3] = [0x00, 0x00, 0x02];

    const ANTENNA_PORT: [u8; 2] = [0x01, 0x01];
    const MAX_READ_POWER: u16 = 2700;

    const OPTION_KEY_VALUE: u8 = 0x01;
    const OPTION_READ_FILTER: u8 = 0x0C;
    const READ_FILTER_OFF: u8 = 0x00;

    /// Create a new reader bound to `transport`, with default timings
    pub fn new(transport: T) -> Result<Self, UhfError> {
        Self::with_config(transport, Config::default())
    }

    /// Create a new reader bound to `transport`
    ///
    /// The receive handler is attached to the transport here. The reader starts
    /// out waiting for the module's power-up announcement.
    pub fn with_config(mut transport: T, config: Config) -> Result<Self, UhfError> {
        if !transport.is_ready() {
            error!("Bus device is not ready");
            return Err(UhfError::TransportUnavailable);
        }

        let shared = Arc::new(Shared::new());
        transport
            .attach_receiver(RxHandle::new(Arc::clone(&shared)))
            .map_err(|e| {
                error!("Failed to attach receiver: {:?}", e);
                UhfError::TransportUnavailable
            })?;

        Ok(Self {
            transport,
            shared,
            command: CommandBuffer::new(),
            config,
        })
    }

    /// Handle for feeding received bytes by hand
    pub fn rx_handle(&self) -> RxHandle {
        RxHandle::new(Arc::clone(&self.shared))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Register the function called with every completed frame, replacing any previous one
    ///
    /// The callback runs in the transport's receive context and must not
    /// register or clear callbacks itself.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: FnMut(&[u8]) + Send + 'static,
    {
        self.shared.set_callback(Some(Box::new(callback)));
    }

    /// Remove the registered callback
    pub fn clear_callback(&self) {
        self.shared.set_callback(None);
    }

    pub fn get_status(&self) -> DriverStatus {
        self.shared.status.get()
    }

    /// Wait for the module's power-up announcement to be absorbed
    ///
    /// Returns immediately unless the reader is still in `Startup`. If the
    /// announcement never shows up (warm restart) the status is forced to `Clear`.
    pub fn wait_for_startup(&self) {
        if self.get_status() != DriverStatus::Startup {
            return;
        }

        for _ in 0..self.config.slices(self.config.startup_timeout) {
            thread::sleep(self.config.poll_interval);
            if self.get_status() != DriverStatus::Startup {
                debug!("Startup announcement seen");
                return;
            }
        }

        if self.shared.status.replace(DriverStatus::Startup, DriverStatus::Clear) {
            warn!("No startup announcement from module, continuing");
        }
    }

    /// Get the bootloader, hardware and firmware versions
    pub fn get_version(&mut self) -> Result<VersionInfo, UhfError> {
        self.send(opcode::VERSION, &[], true)?;
        self.shared.with_frame(|frame| Response::new(frame).version())
    }

    /// Change the module's baud rate
    ///
    /// The transport must be switched to the same rate by the caller.
    pub fn set_baud(&mut self, baud_rate: u32) -> Result<(), UhfError> {
        debug!("Baud rate: {}", baud_rate);
        self.send(opcode::SET_BAUD_RATE, &baud_rate.to_be_bytes(), true)
    }

    pub fn set_tag_protocol(&mut self, protocol: TagProtocol) -> Result<(), UhfError> {
        // The opcode takes a 16-bit protocol id
        self.send(opcode::SET_TAG_PROTOCOL, &[0x00, protocol as u8], true)
    }

    /// Use antenna port 1 for both transmit and receive
    pub fn set_antenna_port(&mut self) -> Result<(), UhfError> {
        self.send(opcode::SET_ANTENNA_PORT, &Self::ANTENNA_PORT, true)
    }

    /// Set read power in centi-dBm (2700 = 27 dBm)
    ///
    /// Values above 27 dBm are limited to 27 dBm.
    pub fn set_read_power(&mut self, power: u16) -> Result<(), UhfError> {
        let power = if power > Self::MAX_READ_POWER {
            debug!("Power too high, limiting to 27dBm.");
            Self::MAX_READ_POWER
        } else {
            power
        };

        self.send(opcode::SET_READ_TX_POWER, &power.to_be_bytes(), true)
    }

    /// Get write power in centi-dBm
    pub fn get_write_power(&mut self) -> Result<u16, UhfError> {
        self.send(opcode::GET_WRITE_TX_POWER, &[0x00], true)?;
        self.shared.with_frame(|frame| Response::new(frame).write_power())
    }

    pub fn set_region(&mut self, region: Region) -> Result<(), UhfError> {
        self.send(opcode::SET_REGION, &[region as u8], true)
    }

    pub fn set_power_mode(&mut self, mode: PowerMode) -> Result<(), UhfError> {
        self.send(opcode::SET_POWER_MODE, &[mode as u8], true)
    }

    /// Set one of the reader's optional parameters
    pub fn set_reader_optional_params(&mut self, option1: u8, option2: u8) -> Result<(), UhfError> {
        self.send(
            opcode::SET_READER_OPTIONAL_PARAMS,
            &[Self::OPTION_KEY_VALUE, option1, option2],
            true,
        )
    }

    /// Report every sighting of a tag, not only the first one
    pub fn disable_read_filter(&mut self) -> Result<(), UhfError> {
        self.set_reader_optional_params(Self::OPTION_READ_FILTER, Self::READ_FILTER_OFF)
    }

    /// Start continuous reading
    ///
    /// Tag records, keep-alives and temperature reports then arrive through
    /// the callback until [`stop_reading`](Self::stop_reading).
    pub fn start_reading(&mut self) -> Result<(), UhfError> {
        self.disable_read_filter()?;
        self.send(opcode::MULTI_PROTOCOL_TAG_OP, &Self::START_READING, true)
    }

    /// Stop continuous reading. Does not wait for the reply.
    pub fn stop_reading(&mut self) -> Result<(), UhfError> {
        self.send(opcode::MULTI_PROTOCOL_TAG_OP, &Self::STOP_READING, false)
    }

    /// Send an arbitrary command and wait for its reply
    ///
    /// The reply can be read back with [`response_frame`](Self::response_frame).
    pub fn send_generic(&mut self, opcode: u8, payload: &[u8]) -> Result<(), UhfError> {
        self.send(opcode, payload, true)
    }

    /// Classify the last completed frame
    pub fn parse_response(&self) -> Result<ResponseKind, UhfError> {
        self.shared.with_frame(|frame| {
            let result = Response::new(frame).classify();
            if matches!(result, Err(UhfError::CorruptResponse)) {
                warn!("CRC error.");
            }
            result
        })
    }

    /// Copy of the last completed frame
    pub fn response_frame(&self) -> Vec<u8> {
        self.shared.with_frame(<[u8]>::to_vec)
    }

    /// Number of EPC bytes in the last tag record
    pub fn get_tag_epc_bytes(&self) -> usize {
        self.shared.with_frame(|frame| Response::new(frame).tag_epc_bytes())
    }

    /// EPC of the last tag record
    pub fn get_tag_epc(&self) -> Vec<u8> {
        self.shared.with_frame(|frame| {
            Response::new(frame)
                .tag_epc()
                .map(<[u8]>::to_vec)
                .unwrap_or_default()
        })
    }

    /// RSSI of the last tag record, in dBm
    pub fn get_tag_rssi(&self) -> i16 {
        self.shared.with_frame(|frame| Response::new(frame).tag_rssi())
    }

    /// Milliseconds between the last keep-alive and the last tag record
    pub fn get_tag_timestamp(&self) -> u32 {
        self.shared.with_frame(|frame| Response::new(frame).tag_timestamp())
    }

    /// Frequency of the last tag record, in kHz
    pub fn get_tag_freq(&self) -> u32 {
        self.shared.with_frame(|frame| Response::new(frame).tag_freq())
    }

    /// The last frame as a tag, if it is a tag record
    pub fn get_tag_info(&self) -> Option<TagInfo> {
        self.shared.with_frame(|frame| Response::new(frame).tag_info())
    }

    fn send(&mut self, opcode: u8, payload: &[u8], wait_for_reply: bool) -> Result<(), UhfError> {
        self.command.build(opcode, payload)?;
        self.wait_for_startup();

        debug!("Sending command: {:02X?}", self.command.as_bytes());
        for &byte in self.command.as_bytes() {
            // Drop any stale flag so the reply starts a fresh frame
            self.shared.status.set(DriverStatus::Clear);
            self.transport.poll_out(byte).map_err(|e| {
                error!("Write error: {:?}", e);
                UhfError::Transport(format!("{:?}", e))
            })?;
        }

        if !wait_for_reply {
            return Ok(());
        }

        self.wait_for_reply(opcode)
    }

    fn wait_for_reply(&self, opcode: u8) -> Result<(), UhfError> {
        for _ in 0..self.config.slices(self.config.response_timeout) {
            thread::sleep(self.config.poll_interval);

            match self.get_status() {
                DriverStatus::Success => {
                    self.shared.status.set(DriverStatus::Clear);
                    return self.check_reply(opcode);
                }
                DriverStatus::Fail => {
                    self.shared.status.set(DriverStatus::Clear);
                    return Err(UhfError::ResponseFail);
                }
                DriverStatus::ResponseTimeout => {
                    self.shared.status.set(DriverStatus::Clear);
                    return Err(UhfError::CommandResponseTimeout);
                }
                _ => {}
            }
        }

        warn!("Time out: no response to opcode {:02X}", opcode);
        self.shared.status.set(DriverStatus::Clear);
        Err(UhfError::Timeout)
    }

    fn check_reply(&self, opcode: u8) -> Result<(), UhfError> {
        self.shared.with_frame(|frame| {
            debug!("Received {} bytes: {:02X?}", frame.len(), frame);
            let response = Response::new(frame);

            if !response.crc_ok() {
                warn!("Corrupt response");
                return Err(UhfError::CorruptResponse);
            }
            if response.opcode() != opcode {
                warn!("Wrong opcode response");
                return Err(UhfError::WrongOpcodeResponse {
                    expected: opcode,
                    actual: response.opcode(),
                });
            }
            match response.status_word() {
                0 => Ok(()),
                status => Err(UhfError::ModuleStatus(status)),
            }
        })
    }
}
