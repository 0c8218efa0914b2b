//! # Bluetooth RFCOMM Transport
//!
//! Connects to CTP printers over the Bluetooth Serial Port Profile using a
//! raw `AF_BLUETOOTH` RFCOMM socket.
//!
//! ## Connection Procedure
//!
//! 1. Create the socket non-blocking and start `connect(2)` toward the
//!    printer's address and channel.
//! 2. Poll for writability up to the connect timeout; check `SO_ERROR`.
//! 3. Switch back to blocking mode and arm `SO_SNDTIMEO`/`SO_RCVTIMEO` so
//!    every subsequent write and status read carries the send timeout.
//!
//! ## Chunked Writes
//!
//! Large payloads are written in chunks (default 4096 bytes) so the
//! Bluetooth buffer is never overwhelmed; the kernel ack of each chunk is
//! the transport-level acknowledgment.
//!
//! ## Device Discovery
//!
//! [`scan_for_printers`] shells out to `bluetoothctl` and parses its device
//! lines. CTP printers advertise names starting with `CorePrint`; they sort
//! first in the results. This is a convenience for the CLI, not connection
//! policy.

use std::collections::HashSet;
use std::io;
use std::os::unix::io::RawFd;
use std::process::Command;
use std::time::Duration;

use log::{debug, warn};

use crate::error::{ConnectError, SendError};
use crate::printer::PrinterDescriptor;
use crate::protocol::commands::{self, STATUS_RESPONSE_LEN};
use crate::transport::{Timeouts, Transport, TransportOpener};

/// Default chunk size for writes (bytes)
pub const CHUNK_SIZE: usize = 4096;

/// Bluetooth protocol number for RFCOMM (not exposed by the libc crate)
const BTPROTO_RFCOMM: libc::c_int = 3;

/// `sockaddr_rc` from `<bluetooth/rfcomm.h>`
#[repr(C)]
struct SockaddrRc {
    rc_family: libc::sa_family_t,
    rc_bdaddr: [u8; 6],
    rc_channel: u8,
}

// ============================================================================
// ADDRESS HANDLING
// ============================================================================

/// Validate a Bluetooth MAC address (`XX:XX:XX:XX:XX:XX`).
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split(':').collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Parse a MAC string into the kernel's `bdaddr_t` byte order (reversed).
fn parse_bdaddr(mac: &str) -> Option<[u8; 6]> {
    if !is_valid_mac(mac) {
        return None;
    }
    let mut addr = [0u8; 6];
    for (i, part) in mac.split(':').enumerate() {
        // bdaddr_t stores the address little-endian
        addr[5 - i] = u8::from_str_radix(part, 16).ok()?;
    }
    Some(addr)
}

// ============================================================================
// ERRNO MAPPING
// ============================================================================

/// Map a connect-phase errno to the transport error taxonomy.
fn connect_error(errno: i32, target: &str) -> ConnectError {
    let detail = format!("{}: {}", target, io::Error::from_raw_os_error(errno));
    match errno {
        libc::ENODEV | libc::ENOENT | libc::EHOSTDOWN | libc::EADDRNOTAVAIL => {
            ConnectError::NotFound(detail)
        }
        libc::EACCES | libc::EPERM => ConnectError::PermissionDenied(detail),
        libc::ETIMEDOUT => ConnectError::Timeout(detail),
        _ => ConnectError::RefusedOrUnreachable(detail),
    }
}

/// Map a send/recv-phase errno to the transport error taxonomy.
fn send_error(errno: i32) -> SendError {
    let detail = io::Error::from_raw_os_error(errno).to_string();
    match errno {
        libc::EPIPE | libc::ECONNRESET | libc::ENOTCONN | libc::EBADF | libc::ESHUTDOWN => {
            SendError::Closed(detail)
        }
        libc::EAGAIN | libc::ETIMEDOUT => SendError::Timeout(detail),
        _ => SendError::Io(detail),
    }
}

// ============================================================================
// TRANSPORT
// ============================================================================

/// An open RFCOMM connection.
pub struct RfcommTransport {
    fd: RawFd,
    chunk_size: usize,
}

impl RfcommTransport {
    /// Connect to `descriptor` within the given timeouts.
    pub fn connect(
        descriptor: &PrinterDescriptor,
        timeouts: &Timeouts,
    ) -> Result<Self, ConnectError> {
        let bdaddr = parse_bdaddr(&descriptor.address).ok_or_else(|| {
            ConnectError::NotFound(format!("invalid address {:?}", descriptor.address))
        })?;

        let fd = unsafe {
            libc::socket(
                libc::AF_BLUETOOTH,
                libc::SOCK_STREAM | libc::SOCK_NONBLOCK,
                BTPROTO_RFCOMM,
            )
        };
        if fd < 0 {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return Err(connect_error(errno, &descriptor.address));
        }

        let transport = Self {
            fd,
            chunk_size: CHUNK_SIZE,
        };

        let addr = SockaddrRc {
            rc_family: libc::AF_BLUETOOTH as libc::sa_family_t,
            rc_bdaddr: bdaddr,
            rc_channel: descriptor.channel,
        };

        debug!(
            "connecting rfcomm to {} channel {}",
            descriptor.address, descriptor.channel
        );
        let rc = unsafe {
            libc::connect(
                transport.fd,
                &addr as *const SockaddrRc as *const libc::sockaddr,
                std::mem::size_of::<SockaddrRc>() as libc::socklen_t,
            )
        };
        if rc != 0 {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            if errno != libc::EINPROGRESS {
                return Err(connect_error(errno, &descriptor.address));
            }
            transport.await_connected(timeouts.connect, &descriptor.address)?;
        }

        transport
            .set_blocking_with_timeouts(timeouts.send)
            .map_err(|e| ConnectError::RefusedOrUnreachable(format!("socket setup: {}", e)))?;

        Ok(transport)
    }

    /// Poll the in-progress connect for completion.
    fn await_connected(&self, timeout: Duration, target: &str) -> Result<(), ConnectError> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLOUT,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&mut pfd, 1, timeout.as_millis() as libc::c_int) };
        if rc == 0 {
            return Err(ConnectError::Timeout(format!(
                "{}: no response within {:?}",
                target, timeout
            )));
        }
        if rc < 0 {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return Err(connect_error(errno, target));
        }

        // Connect finished; SO_ERROR says how it went.
        let mut err: libc::c_int = 0;
        let mut len = std::mem::size_of::<libc::c_int>() as libc::socklen_t;
        let rc = unsafe {
            libc::getsockopt(
                self.fd,
                libc::SOL_SOCKET,
                libc::SO_ERROR,
                &mut err as *mut libc::c_int as *mut libc::c_void,
                &mut len,
            )
        };
        if rc != 0 {
            let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
            return Err(connect_error(errno, target));
        }
        if err != 0 {
            return Err(connect_error(err, target));
        }
        Ok(())
    }

    /// Clear O_NONBLOCK and arm the send/receive timeouts.
    fn set_blocking_with_timeouts(&self, timeout: Duration) -> io::Result<()> {
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let rc = unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        let tv = libc::timeval {
            tv_sec: timeout.as_secs() as libc::time_t,
            tv_usec: timeout.subsec_micros() as libc::suseconds_t,
        };
        for option in [libc::SO_SNDTIMEO, libc::SO_RCVTIMEO] {
            let rc = unsafe {
                libc::setsockopt(
                    self.fd,
                    libc::SOL_SOCKET,
                    option,
                    &tv as *const libc::timeval as *const libc::c_void,
                    std::mem::size_of::<libc::timeval>() as libc::socklen_t,
                )
            };
            if rc != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        let mut written = 0;
        while written < bytes.len() {
            let rc = unsafe {
                libc::send(
                    self.fd,
                    bytes[written..].as_ptr() as *const libc::c_void,
                    bytes.len() - written,
                    libc::MSG_NOSIGNAL,
                )
            };
            if rc < 0 {
                let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
                return Err(send_error(errno));
            }
            if rc == 0 {
                return Err(SendError::Closed("peer closed the connection".into()));
            }
            written += rc as usize;
        }
        Ok(())
    }
}

impl RfcommTransport {
    /// Set the chunk size for large writes.
    ///
    /// Larger chunks are faster but can overflow the Bluetooth buffer.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = size.max(1);
    }
}

impl Transport for RfcommTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError> {
        for chunk in bytes.chunks(self.chunk_size) {
            self.write_all(chunk)?;
        }
        Ok(())
    }

    fn request_status(&mut self) -> Result<[u8; STATUS_RESPONSE_LEN], SendError> {
        self.write_all(&commands::status_request())?;

        let mut response = [0u8; STATUS_RESPONSE_LEN];
        let mut read = 0;
        while read < STATUS_RESPONSE_LEN {
            let rc = unsafe {
                libc::recv(
                    self.fd,
                    response[read..].as_mut_ptr() as *mut libc::c_void,
                    STATUS_RESPONSE_LEN - read,
                    0,
                )
            };
            if rc < 0 {
                let errno = io::Error::last_os_error().raw_os_error().unwrap_or(0);
                return Err(send_error(errno));
            }
            if rc == 0 {
                return Err(SendError::Closed("peer closed during status read".into()));
            }
            read += rc as usize;
        }
        Ok(response)
    }
}

impl Drop for RfcommTransport {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.fd);
        }
    }
}

/// Opener producing [`RfcommTransport`] connections.
#[derive(Debug)]
pub struct RfcommOpener {
    pub chunk_size: usize,
}

impl RfcommOpener {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for RfcommOpener {
    fn default() -> Self {
        Self::new(CHUNK_SIZE)
    }
}

impl TransportOpener for RfcommOpener {
    fn open(
        &self,
        descriptor: &PrinterDescriptor,
        timeouts: &Timeouts,
    ) -> Result<Box<dyn Transport>, ConnectError> {
        let mut transport = RfcommTransport::connect(descriptor, timeouts)?;
        transport.set_chunk_size(self.chunk_size);
        Ok(Box::new(transport))
    }
}

// ============================================================================
// DEVICE SCANNING
// ============================================================================

/// A device seen during a Bluetooth scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDevice {
    pub address: String,
    pub name: String,
    pub is_ctp_printer: bool,
}

impl ScannedDevice {
    fn from_parts(address: &str, name: &str) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            is_ctp_printer: name.to_lowercase().starts_with("coreprint"),
        }
    }
}

/// Parse one `bluetoothctl` output line into a device, if it describes one.
///
/// Recognized shapes:
/// ```text
/// Device AA:BB:CC:DD:EE:FF Some Name
/// [NEW] Device AA:BB:CC:DD:EE:FF Some Name
/// ```
fn parse_device_line(line: &str) -> Option<ScannedDevice> {
    let trimmed = line.trim_start_matches("[NEW]").trim_start_matches("[CHG]");
    let rest = trimmed.trim().strip_prefix("Device ")?;
    let (mac, name) = rest.split_at(rest.find(' ')?);
    let name = name.trim();
    if !is_valid_mac(mac) || name.is_empty() || name.starts_with("Name:") {
        return None;
    }
    Some(ScannedDevice::from_parts(mac, name))
}

/// List known and nearby Bluetooth devices via `bluetoothctl`.
///
/// Runs a timed discovery scan, then reads the accumulated device list.
/// CTP printers sort first. Requires bluez; a missing `bluetoothctl` is a
/// `NotFound` connect error.
pub fn scan_for_printers(timeout: Duration) -> Result<Vec<ScannedDevice>, ConnectError> {
    // Active scan populates bluetoothctl's device cache; its own output is
    // noisy, so the cache read below is the source of truth.
    let scan = Command::new("bluetoothctl")
        .args(["--timeout", &timeout.as_secs().max(1).to_string(), "scan", "on"])
        .output();
    if let Err(e) = scan {
        if e.kind() == io::ErrorKind::NotFound {
            return Err(ConnectError::NotFound(
                "bluetoothctl not found; is bluez installed?".into(),
            ));
        }
        warn!("bluetooth scan failed: {}", e);
    }

    let output = Command::new("bluetoothctl")
        .arg("devices")
        .output()
        .map_err(|e| ConnectError::NotFound(format!("bluetoothctl: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut seen = HashSet::new();
    let mut devices: Vec<ScannedDevice> = stdout
        .lines()
        .filter_map(parse_device_line)
        .filter(|d| seen.insert(d.address.clone()))
        .collect();

    devices.sort_by(|a, b| {
        (!a.is_ctp_printer, a.name.as_str()).cmp(&(!b.is_ctp_printer, b.name.as_str()))
    });
    Ok(devices)
}

// ============================================================================
// TESTS
// ============================================================================
