//! Serial-port link (UART or Bluetooth SPP via `/dev/rfcomm*`), 8N1.

use std::io::{Read, Write};
use std::time::Duration;

use irrigation_traits::{BoxError, Connection, Connector};

use crate::error::HwError;

pub struct SerialConnector {
    port: String,
    baud: u32,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }
}

impl Connector for SerialConnector {
    fn open(&mut self) -> Result<Box<dyn Connection + Send>, BoxError> {
        let initial_timeout = Duration::from_millis(100);
        let port = serialport::new(&self.port, self.baud)
            .timeout(initial_timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .flow_control(serialport::FlowControl::None)
            .open()
            .map_err(HwError::from)?;
        tracing::debug!(port = %self.port, baud = self.baud, "serial port opened");
        Ok(Box::new(SerialConnection {
            port,
            timeout: initial_timeout,
        }))
    }

    fn describe(&self) -> String {
        format!("{}@{}", self.port, self.baud)
    }
}

pub struct SerialConnection {
    port: Box<dyn serialport::SerialPort>,
    timeout: Duration,
}

impl Connection for SerialConnection {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        if timeout != self.timeout {
            self.port.set_timeout(timeout).map_err(HwError::from)?;
            self.timeout = timeout;
        }
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                Err(Box::new(HwError::Disconnected(e.to_string())))
            }
            Err(e) => Err(Box::new(HwError::Io(e))),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        self.port.write_all(bytes).map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BoxError> {
        // The port handle closes on drop; flush whatever is still queued first.
        self.port.flush().map_err(HwError::Io)?;
        Ok(())
    }
}
