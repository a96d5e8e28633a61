use etherchat_engine::{Link, LinkError};
use etherchat_proto::constants::{CRC_SIZE, ETHERTYPE, HEADER_SIZE, MAX_PAYLOAD_SIZE};
use etherchat_proto::MacAddr;
use parking_lot::Mutex;
use std::io;
use std::os::unix::io::RawFd;
use std::time::Duration;
use tracing::{debug, warn};

/// Largest buffer handed to `recv`: the biggest frame the codec can
/// produce.
const RECV_BUFFER: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE + CRC_SIZE;

/// A raw L2 socket bound to one interface and the protocol ethertype.
///
/// The descriptor lives behind a mutex holding `Option<RawFd>` so that
/// `close` is idempotent and every operation after it fails with
/// `Closed`.
pub struct PacketSocket {
    fd: Mutex<Option<RawFd>>,
    mac: MacAddr,
    interface: String,
}

impl PacketSocket {
    /// Opens the socket on `interface` with the given receive timeout.
    /// Requires CAP_NET_RAW; a permission failure surfaces as an
    /// `Io` error from the `socket(2)` call.
    pub fn open(interface: &str, recv_timeout: Duration) -> Result<Self, LinkError> {
        let fd = unsafe {
            libc::socket(
                libc::AF_PACKET,
                libc::SOCK_RAW,
                ETHERTYPE.to_be() as libc::c_int,
            )
        };
        if fd < 0 {
            return Err(LinkError::Io(io::Error::last_os_error()));
        }

        match Self::configure(fd, interface, recv_timeout) {
            Ok(mac) => {
                debug!("raw socket open on {} as {}", interface, mac);
                Ok(Self {
                    fd: Mutex::new(Some(fd)),
                    mac,
                    interface: interface.to_string(),
                })
            }
            Err(e) => {
                unsafe { libc::close(fd) };
                Err(LinkError::Io(e))
            }
        }
    }

    fn configure(fd: RawFd, interface: &str, recv_timeout: Duration) -> io::Result<MacAddr> {
        let ifindex = if_index(fd, interface)?;
        bind_to_interface(fd, ifindex)?;
        set_recv_timeout(fd, recv_timeout)?;
        hardware_mac(fd, interface)
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    fn current_fd(&self) -> Result<RawFd, LinkError> {
        self.fd.lock().ok_or(LinkError::Closed)
    }
}

impl Link for PacketSocket {
    fn local_mac(&self) -> MacAddr {
        self.mac
    }

    fn send(&self, frame: &[u8]) -> Result<(), LinkError> {
        let fd = self.current_fd()?;
        let rc = unsafe { libc::send(fd, frame.as_ptr() as *const libc::c_void, frame.len(), 0) };
        if rc < 0 {
            return Err(map_errno(io::Error::last_os_error()));
        }
        let written = rc as usize;
        if written != frame.len() {
            return Err(LinkError::ShortWrite {
                written,
                len: frame.len(),
            });
        }
        Ok(())
    }

    fn recv(&self) -> Result<Vec<u8>, LinkError> {
        let fd = self.current_fd()?;
        let mut buf = vec![0u8; RECV_BUFFER];
        let rc = unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) };
        if rc < 0 {
            return Err(map_errno(io::Error::last_os_error()));
        }
        buf.truncate(rc as usize);
        Ok(buf)
    }

    fn close(&self) {
        let mut fd = self.fd.lock();
        if let Some(fd) = fd.take() {
            if unsafe { libc::close(fd) } < 0 {
                warn!("error closing raw socket: {}", io::Error::last_os_error());
            }
        }
    }
}

impl Drop for PacketSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn map_errno(err: io::Error) -> LinkError {
    if err.raw_os_error() == Some(libc::EBADF) {
        return LinkError::Closed;
    }
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted => {
            LinkError::Timeout
        }
        _ => LinkError::Io(err),
    }
}

fn ifreq_for(interface: &str) -> io::Result<libc::ifreq> {
    if interface.is_empty() || interface.len() >= libc::IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid interface name {:?}", interface),
        ));
    }
    let mut req: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in req.ifr_name.iter_mut().zip(interface.as_bytes()) {
        *dst = *src as libc::c_char;
    }
    Ok(req)
}

fn if_index(fd: RawFd, interface: &str) -> io::Result<libc::c_int> {
    let mut req = ifreq_for(interface)?;
    if unsafe { libc::ioctl(fd, libc::SIOCGIFINDEX, &mut req) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(unsafe { req.ifr_ifru.ifru_ifindex })
}

fn hardware_mac(fd: RawFd, interface: &str) -> io::Result<MacAddr> {
    let mut req = ifreq_for(interface)?;
    if unsafe { libc::ioctl(fd, libc::SIOCGIFHWADDR, &mut req) } < 0 {
        return Err(io::Error::last_os_error());
    }
    let data = unsafe { req.ifr_ifru.ifru_hwaddr.sa_data };
    let mut octets = [0u8; 6];
    for (dst, src) in octets.iter_mut().zip(data.iter()) {
        *dst = *src as u8;
    }
    Ok(MacAddr::from(octets))
}

fn bind_to_interface(fd: RawFd, ifindex: libc::c_int) -> io::Result<()> {
    let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
    addr.sll_family = libc::AF_PACKET as libc::c_ushort;
    addr.sll_protocol = ETHERTYPE.to_be();
    addr.sll_ifindex = ifindex;
    let rc = unsafe {
        libc::bind(
            fd,
            &addr as *const libc::sockaddr_ll as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_ll>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

fn set_recv_timeout(fd: RawFd, timeout: Duration) -> io::Result<()> {
    let tv = libc::timeval {
        tv_sec: timeout.as_secs() as libc::time_t,
        tv_usec: libc::suseconds_t::from(timeout.subsec_micros()),
    };
    let rc = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_RCVTIMEO,
            &tv as *const libc::timeval as *const libc::c_void,
            std::mem::size_of::<libc::timeval>() as libc::socklen_t,
        )
    };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::ifreq_for;

    #[test]
    fn test_ifreq_rejects_bad_names() {
        assert!(ifreq_for("").is_err());
        assert!(ifreq_for("an-interface-name-way-too-long").is_err());
    }

    #[test]
    fn test_ifreq_copies_the_name() {
        let req = ifreq_for("eth0").unwrap();
        let name: Vec<u8> = req.ifr_name.iter().map(|&c| c as u8).collect();
        assert!(name.starts_with(b"eth0"));
        assert_eq!(name[4], 0);
    }
}
