//! POSIX backend built directly on `libc`.
//!
//! All addresses and ports cross this boundary in host byte order; the
//! conversion to and from network order happens here and nowhere else.

use std::io::{Error, Result as IoResult};
use std::os::fd::RawFd;

/// Sentinel value for a handle that currently owns no descriptor.
pub(crate) const INVALID_FD: RawFd = -1;

fn sockaddr_in(address: u32, port: u16) -> libc::sockaddr_in {
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    sin.sin_family = libc::AF_INET as libc::sa_family_t;
    sin.sin_addr = libc::in_addr { s_addr: address.to_be() };
    sin.sin_port = port.to_be();
    sin
}

const SIN_LEN: libc::socklen_t = size_of::<libc::sockaddr_in>() as libc::socklen_t;

pub(crate) fn socket(domain: libc::c_int, kind: libc::c_int) -> IoResult<RawFd> {
    let fd = unsafe { libc::socket(domain, kind, 0) };
    if fd < 0 {
        return Err(Error::last_os_error());
    }
    Ok(fd)
}

pub(crate) fn bind(fd: RawFd, address: u32, port: u16) -> IoResult<()> {
    let sin = sockaddr_in(address, port);
    let rc = unsafe { libc::bind(fd, &sin as *const _ as *const libc::sockaddr, SIN_LEN) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn connect(fd: RawFd, address: u32, port: u16) -> IoResult<()> {
    let sin = sockaddr_in(address, port);
    let rc = unsafe { libc::connect(fd, &sin as *const _ as *const libc::sockaddr, SIN_LEN) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn listen(fd: RawFd, backlog: usize) -> IoResult<()> {
    let rc = unsafe { libc::listen(fd, backlog as libc::c_int) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

/// Accepts a pending connection, returning the new descriptor together with
/// the peer address and port already converted to host order.
pub(crate) fn accept(fd: RawFd) -> IoResult<(RawFd, u32, u16)> {
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    let mut len = SIN_LEN;
    let accepted =
        unsafe { libc::accept(fd, &mut sin as *mut _ as *mut libc::sockaddr, &mut len) };
    if accepted < 0 {
        return Err(Error::last_os_error());
    }
    Ok((accepted, u32::from_be(sin.sin_addr.s_addr), u16::from_be(sin.sin_port)))
}

pub(crate) fn set_nonblocking(fd: RawFd, nonblocking: bool) -> IoResult<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(Error::last_os_error());
    }
    let flags = if nonblocking {
        flags | libc::O_NONBLOCK
    } else {
        flags & !libc::O_NONBLOCK
    };
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

pub(crate) fn write(fd: RawFd, data: &[u8]) -> IoResult<usize> {
    let n = unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
    if n < 0 {
        return Err(Error::last_os_error());
    }
    Ok(n as usize)
}

pub(crate) fn read(fd: RawFd, buffer: &mut [u8]) -> IoResult<usize> {
    let n = unsafe { libc::read(fd, buffer.as_mut_ptr() as *mut libc::c_void, buffer.len()) };
    if n < 0 {
        return Err(Error::last_os_error());
    }
    Ok(n as usize)
}

/// Receives one datagram, returning the byte count and the sender address
/// and port in host order.
pub(crate) fn recv_from(fd: RawFd, buffer: &mut [u8]) -> IoResult<(usize, u32, u16)> {
    let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
    let mut len = SIN_LEN;
    let n = unsafe {
        libc::recvfrom(
            fd,
            buffer.as_mut_ptr() as *mut libc::c_void,
            buffer.len(),
            0,
            &mut sin as *mut _ as *mut libc::sockaddr,
            &mut len,
        )
    };
    if n < 0 {
        return Err(Error::last_os_error());
    }
    Ok((n as usize, u32::from_be(sin.sin_addr.s_addr), u16::from_be(sin.sin_port)))
}

pub(crate) fn shutdown(fd: RawFd) -> IoResult<()> {
    let rc = unsafe { libc::shutdown(fd, libc::SHUT_RDWR) };
    if rc < 0 {
        return Err(Error::last_os_error());
    }
    Ok(())
}

/// Releases the descriptor. The result of the underlying call is not
/// reported; there is nothing a caller can do about a failed close.
pub(crate) fn close(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Reports whether the descriptor is still open at the OS level, without
/// touching its state. Used by tests to verify release.
#[cfg(test)]
pub(crate) fn is_open(fd: RawFd) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFD) >= 0 }
}
