use std::net::Ipv4Addr;
use std::os::fd::RawFd;

use crate::sys;

/// The socket address family, fixed at creation time.
///
/// Only IPv4 (`Inet`) addressing is fully supported by the string and
/// numeric address helpers; the remaining families are carried so that a
/// handle can still describe a descriptor obtained elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Unspecified family.
    Unspec,
    /// Local (unix) sockets.
    Unix,
    /// IPv4 internet sockets.
    Inet,
    /// IPv6 internet sockets.
    Inet6,
}

impl Domain {
    fn raw(self) -> libc::c_int {
        match self {
            Domain::Unspec => libc::AF_UNSPEC,
            Domain::Unix => libc::AF_UNIX,
            Domain::Inet => libc::AF_INET,
            Domain::Inet6 => libc::AF_INET6,
        }
    }
}

/// The transport semantics of the socket, fixed at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Connection oriented byte stream (TCP for `Domain::Inet`).
    Stream,
    /// Connectionless datagrams (UDP for `Domain::Inet`).
    Dgram,
    /// Raw protocol access.
    Raw,
}

impl Kind {
    fn raw(self) -> libc::c_int {
        match self {
            Kind::Stream => libc::SOCK_STREAM,
            Kind::Dgram => libc::SOCK_DGRAM,
            Kind::Raw => libc::SOCK_RAW,
        }
    }
}

/// The lifecycle state of a [`Socket`].
///
/// The state advances only on successful operations, so a failed call leaves
/// it where it was. It is used to reject requests that can never succeed
/// (for example [`Socket::listen`] on a datagram socket) before any system
/// call is made; the finer discipline of which operation makes sense when is
/// still the caller's to keep, exactly as it is with the raw descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// No descriptor owned yet.
    Unconfigured,
    /// A live descriptor exists but has no recorded role.
    Created,
    /// The descriptor is bound to a local address.
    Bound,
    /// The descriptor has an established or default peer.
    Connected,
    /// The descriptor is accepting incoming connections.
    Listening,
    /// The descriptor has been released.
    Closed,
}

/// An IPv4 address and port pair, both in host byte order.
///
/// Every endpoint this crate hands out is normalized to host order,
/// including the sender recorded by [`Socket::recv_from`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    address: u32,
    port: u16,
}

impl Endpoint {
    /// Creates an endpoint from a host-order address and port.
    pub fn new(address: u32, port: u16) -> Endpoint {
        Endpoint { address, port }
    }

    /// Returns the address as a 32-bit host-order value.
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Returns the port in host order.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Renders the address in dotted-decimal form.
    pub fn ip(&self) -> String {
        Ipv4Addr::from(self.address).to_string()
    }
}

/// A handle owning one OS socket descriptor and its endpoint bookkeeping.
///
/// `Socket` is a thin lifecycle wrapper around the Berkeley-sockets calls:
/// create, bind, connect, listen, accept, read/write, datagram receive,
/// blocking-mode toggle, shutdown and close. It owns its descriptor
/// exclusively; dropping the handle shuts the connection down and releases
/// the descriptor, whichever exit path was taken.
///
/// All failures are reported in-band: `bool` for operations with no payload,
/// `Option` where a byte count or a new handle is produced. No public
/// operation panics or propagates an OS error; the error detail is logged
/// through the `log` facade instead.
///
/// # Example
///
/// ```rust,no_run
/// use endpoint_socket::{Domain, Kind, Socket};
///
/// let mut server = Socket::with(Domain::Inet, Kind::Stream);
/// assert!(server.create());
/// assert!(server.bind_any(7890));
/// assert!(server.listen());
///
/// while let Some(client) = server.accept() {
///     println!("client connected from {:?}", client.ip());
///     let mut buf = [0u8; 1024];
///     if let Some(n) = client.read(&mut buf) {
///         client.write(&buf[..n]);
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Socket {
    fd: RawFd,
    domain: Option<Domain>,
    kind: Option<Kind>,
    state: State,
    local: Option<Endpoint>,
    peer: Option<Endpoint>,
}

impl Socket {
    /// The wildcard address covering all local interfaces.
    pub const ANY_ADDRESS: &'static str = "0.0.0.0";

    /// Pending-connection queue length used by [`listen`](Socket::listen).
    pub const DEFAULT_BACKLOG: usize = 10;

    /// Creates an empty handle with no descriptor and no declared family or
    /// transport; configure it later with [`create_with`](Socket::create_with).
    pub fn new() -> Socket {
        Socket {
            fd: sys::INVALID_FD,
            domain: None,
            kind: None,
            state: State::Unconfigured,
            local: None,
            peer: None,
        }
    }

    /// Wraps an already-valid descriptor obtained by another mechanism.
    ///
    /// The handle takes ownership of the descriptor and will release it on
    /// drop. The family and transport of such a descriptor are unknown here
    /// and stay untracked; a negative value produces an unconfigured handle.
    pub fn from_raw(fd: RawFd) -> Socket {
        let state = if fd < 0 { State::Unconfigured } else { State::Created };
        Socket {
            fd: if fd < 0 { sys::INVALID_FD } else { fd },
            domain: None,
            kind: None,
            state,
            local: None,
            peer: None,
        }
    }

    /// Declares the family and transport of the handle, deferring the OS
    /// resource acquisition to [`create`](Socket::create).
    pub fn with(domain: Domain, kind: Kind) -> Socket {
        Socket {
            fd: sys::INVALID_FD,
            domain: Some(domain),
            kind: Some(kind),
            state: State::Unconfigured,
            local: None,
            peer: None,
        }
    }

    /// Requests a new OS socket using the recorded family and transport.
    ///
    /// Fails if neither was declared. A handle that already owns a
    /// descriptor releases it first, so repeated calls do not leak.
    /// Never blocks.
    pub fn create(&mut self) -> bool {
        let (Some(domain), Some(kind)) = (self.domain, self.kind) else {
            log::warn!("create called on a handle with no domain/kind declared");
            return false;
        };
        if self.fd != sys::INVALID_FD {
            log::debug!("create replacing live descriptor {}", self.fd);
            self.release();
        }
        match sys::socket(domain.raw(), kind.raw()) {
            Ok(fd) => {
                log::debug!("created {domain:?}/{kind:?} socket with descriptor {fd}");
                self.fd = fd;
                self.state = State::Created;
                self.local = None;
                self.peer = None;
                true
            }
            Err(e) => {
                log::warn!("socket creation failed: {e}");
                self.state = State::Unconfigured;
                false
            }
        }
    }

    /// Records the family and transport, then creates the socket as
    /// [`create`](Socket::create) does.
    ///
    /// The family and transport are write-once: a handle that already fixed
    /// them to different values rejects the call without touching the OS.
    pub fn create_with(&mut self, domain: Domain, kind: Kind) -> bool {
        if matches!(self.domain, Some(d) if d != domain)
            || matches!(self.kind, Some(k) if k != kind)
        {
            log::warn!("create_with would change the fixed domain/kind of this handle");
            return false;
        }
        self.domain = Some(domain);
        self.kind = Some(kind);
        self.create()
    }

    /// Associates the socket with a local address and port.
    ///
    /// On success the handle records the requested values as its local
    /// endpoint; they reflect intent, not a kernel re-query, so a bind to
    /// port 0 records 0 rather than the ephemeral port actually assigned.
    /// Fails on an unset descriptor, an unparsable address or an OS
    /// rejection (address in use, permission denied, ...).
    pub fn bind(&mut self, address: &str, port: u16) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        let Some(numeric) = self.parse_address(address) else {
            return false;
        };
        match sys::bind(self.fd, numeric, port) {
            Ok(()) => {
                log::debug!("bound descriptor {} to {address}:{port}", self.fd);
                self.local = Some(Endpoint::new(numeric, port));
                self.state = State::Bound;
                true
            }
            Err(e) => {
                log::warn!("bind to {address}:{port} failed: {e}");
                false
            }
        }
    }

    /// Binds to the wildcard address [`ANY_ADDRESS`](Socket::ANY_ADDRESS)
    /// on the given port.
    pub fn bind_any(&mut self, port: u16) -> bool {
        self.bind(Self::ANY_ADDRESS, port)
    }

    /// Starts accepting incoming connections, queueing up to
    /// [`DEFAULT_BACKLOG`](Socket::DEFAULT_BACKLOG) of them.
    pub fn listen(&mut self) -> bool {
        self.listen_with(Self::DEFAULT_BACKLOG)
    }

    /// Starts accepting incoming connections with an explicit backlog.
    ///
    /// Listening only has meaning for connection-oriented sockets; calling
    /// this on a handle whose transport is known to be datagram or raw is
    /// rejected before any system call is made.
    pub fn listen_with(&mut self, backlog: usize) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        if matches!(self.kind, Some(Kind::Dgram) | Some(Kind::Raw)) {
            log::warn!("listen rejected: {:?} sockets cannot accept connections", self.kind);
            return false;
        }
        if self.state == State::Connected {
            log::warn!("listen rejected on a connected socket");
            return false;
        }
        match sys::listen(self.fd, backlog) {
            Ok(()) => {
                log::debug!("descriptor {} listening with backlog {backlog}", self.fd);
                self.state = State::Listening;
                true
            }
            Err(e) => {
                log::warn!("listen failed: {e}");
                false
            }
        }
    }

    /// Switches the descriptor between blocking and non-blocking I/O.
    ///
    /// A `false` return means the mode is unknown: either the flag query or
    /// the flag update failed, and the OS may have applied part of the
    /// change. Re-check if it matters.
    pub fn set_blocking(&self, blocking: bool) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        match sys::set_nonblocking(self.fd, !blocking) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("blocking-mode change failed: {e}");
                false
            }
        }
    }

    /// Establishes a connection to (or records a default peer for) the
    /// remote endpoint given in dotted-decimal form.
    ///
    /// Parses the address and then behaves as
    /// [`connect_numeric`](Socket::connect_numeric). Blocks unless the
    /// handle was switched to non-blocking mode.
    pub fn connect(&mut self, address: &str, port: u16) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        let Some(numeric) = self.parse_address(address) else {
            return false;
        };
        self.connect_numeric(numeric, port)
    }

    /// Establishes a connection to the remote endpoint given as a 32-bit
    /// host-order address.
    ///
    /// On success the peer endpoint is recorded on the handle; on failure
    /// the recorded peer is left untouched.
    pub fn connect_numeric(&mut self, address: u32, port: u16) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        if self.state == State::Listening {
            log::warn!("connect rejected on a listening socket");
            return false;
        }
        match sys::connect(self.fd, address, port) {
            Ok(()) => {
                let peer = Endpoint::new(address, port);
                log::debug!("descriptor {} connected to {}:{}", self.fd, peer.ip(), port);
                self.peer = Some(peer);
                self.state = State::Connected;
                true
            }
            Err(e) => {
                log::warn!("connect to {}:{port} failed: {e}", Endpoint::new(address, port).ip());
                false
            }
        }
    }

    /// Waits for an incoming connection and returns a new handle owning the
    /// accepted descriptor, with the peer endpoint recorded on it and the
    /// family and transport inherited from the listener.
    ///
    /// Blocks unless the listener is in non-blocking mode, in which case an
    /// empty queue reports as `None` like any other failure. The listener
    /// itself is untouched either way.
    pub fn accept(&self) -> Option<Socket> {
        if self.fd == sys::INVALID_FD {
            return None;
        }
        match sys::accept(self.fd) {
            Ok((fd, address, port)) => {
                let peer = Endpoint::new(address, port);
                log::debug!("accepted descriptor {fd} from {}:{}", peer.ip(), port);
                Some(Socket {
                    fd,
                    domain: self.domain,
                    kind: self.kind,
                    state: State::Connected,
                    local: self.local,
                    peer: Some(peer),
                })
            }
            Err(e) => {
                log::debug!("accept failed: {e}");
                None
            }
        }
    }

    /// Waits for an incoming connection and returns the accepted raw
    /// descriptor, or the invalid sentinel (-1) on failure.
    ///
    /// The returned descriptor is unowned; wrap it with
    /// [`from_raw`](Socket::from_raw) to give it an owner.
    pub fn accept_raw(&self) -> RawFd {
        if self.fd == sys::INVALID_FD {
            return sys::INVALID_FD;
        }
        match sys::accept(self.fd) {
            Ok((fd, _, _)) => fd,
            Err(e) => {
                log::debug!("accept failed: {e}");
                sys::INVALID_FD
            }
        }
    }

    /// Sends the payload, returning how many bytes the OS accepted.
    ///
    /// The count may be short of `data.len()` on a stream socket; use
    /// [`write_all`](Socket::write_all) when the whole payload must go out.
    /// `None` reports an unset descriptor or an OS error (including
    /// would-block on a non-blocking socket).
    pub fn write(&self, data: &[u8]) -> Option<usize> {
        if self.fd == sys::INVALID_FD {
            return None;
        }
        match sys::write(self.fd, data) {
            Ok(n) => Some(n),
            Err(e) => {
                log::debug!("write of {} bytes failed: {e}", data.len());
                None
            }
        }
    }

    /// Sends the raw bytes of the string, without any terminator.
    pub fn write_str(&self, data: &str) -> Option<usize> {
        self.write(data.as_bytes())
    }

    /// Sends the whole payload, looping over short writes.
    pub fn write_all(&self, data: &[u8]) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        let mut remaining = data;
        while !remaining.is_empty() {
            match self.write(remaining) {
                Some(n) if n > 0 => remaining = &remaining[n..],
                _ => return false,
            }
        }
        true
    }

    /// Reads up to `buffer.len()` bytes, returning how many were stored.
    ///
    /// A single OS read: the count may be less than the buffer size, and
    /// `Some(0)` marks end-of-stream. Blocks unless the handle is in
    /// non-blocking mode, in which case an empty socket reports `None`.
    pub fn read(&self, buffer: &mut [u8]) -> Option<usize> {
        if self.fd == sys::INVALID_FD {
            return None;
        }
        match sys::read(self.fd, buffer) {
            Ok(n) => Some(n),
            Err(e) => {
                log::debug!("read failed: {e}");
                None
            }
        }
    }

    /// Fills the whole buffer, looping over partial reads; fails on an OS
    /// error or on end-of-stream before the buffer is full.
    pub fn read_exact(&self, buffer: &mut [u8]) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        let mut filled = 0;
        while filled < buffer.len() {
            match self.read(&mut buffer[filled..]) {
                Some(n) if n > 0 => filled += n,
                _ => return false,
            }
        }
        true
    }

    /// Receives one datagram (or stream chunk), returning the byte count and
    /// the sender endpoint.
    ///
    /// The sender address and port are normalized to host byte order, the
    /// same convention as every other endpoint this crate reports, and are
    /// also recorded as the handle's peer. Blocks unless the handle is in
    /// non-blocking mode.
    pub fn recv_from(&mut self, buffer: &mut [u8]) -> Option<(usize, Endpoint)> {
        if self.fd == sys::INVALID_FD {
            return None;
        }
        match sys::recv_from(self.fd, buffer) {
            Ok((n, address, port)) => {
                let sender = Endpoint::new(address, port);
                log::debug!("received {n} bytes from {}:{}", sender.ip(), port);
                self.peer = Some(sender);
                Some((n, sender))
            }
            Err(e) => {
                log::debug!("recv_from failed: {e}");
                None
            }
        }
    }

    /// Returns the raw descriptor, or -1 when unset.
    pub fn descriptor(&self) -> RawFd {
        self.fd
    }

    /// Returns the declared address family, if any.
    pub fn domain(&self) -> Option<Domain> {
        self.domain
    }

    /// Returns the declared transport, if any.
    pub fn kind(&self) -> Option<Kind> {
        self.kind
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Returns the local endpoint recorded by the last successful bind.
    pub fn local_endpoint(&self) -> Option<Endpoint> {
        self.local
    }

    /// Returns the peer endpoint recorded by the last successful connect,
    /// accept or datagram receive.
    pub fn peer_endpoint(&self) -> Option<Endpoint> {
        self.peer
    }

    fn endpoint(&self) -> Option<Endpoint> {
        self.peer.or(self.local)
    }

    /// Renders the most recently recorded endpoint address (peer first,
    /// local otherwise) in dotted-decimal form; `None` when the handle has
    /// never completed a bind, connect, accept or receive.
    pub fn ip(&self) -> Option<String> {
        self.endpoint().map(|e| e.ip())
    }

    /// Returns the most recently recorded endpoint address as a 32-bit
    /// host-order value, on the same terms as [`ip`](Socket::ip).
    pub fn ip_numeric(&self) -> Option<u32> {
        self.endpoint().map(|e| e.address())
    }

    /// Returns the most recently recorded endpoint port, on the same terms
    /// as [`ip`](Socket::ip).
    pub fn port(&self) -> Option<u16> {
        self.endpoint().map(|e| e.port())
    }

    /// Tears down both directions of the connection.
    ///
    /// Safe to repeat; the handle keeps its descriptor, and whether the OS
    /// tolerates a second shutdown is host-dependent and reported in-band.
    pub fn shutdown(&mut self) -> bool {
        if self.fd == sys::INVALID_FD {
            return false;
        }
        match sys::shutdown(self.fd) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("shutdown failed: {e}");
                false
            }
        }
    }

    /// Releases the descriptor. Idempotent; also runs automatically when
    /// the handle is dropped.
    pub fn close(&mut self) {
        if self.fd == sys::INVALID_FD {
            return;
        }
        self.release();
        self.state = State::Closed;
    }

    fn release(&mut self) {
        log::debug!("closing descriptor {}", self.fd);
        sys::close(self.fd);
        self.fd = sys::INVALID_FD;
    }

    fn parse_address(&self, address: &str) -> Option<u32> {
        if matches!(self.domain, Some(d) if d != Domain::Inet) {
            log::warn!("string addresses are only parsed for Inet handles, not {:?}", self.domain);
            return None;
        }
        match address.parse::<Ipv4Addr>() {
            Ok(ip) => Some(u32::from(ip)),
            Err(_) => {
                log::warn!("not a valid IPv4 address: {address}");
                None
            }
        }
    }
}

impl Default for Socket {
    fn default() -> Socket {
        Socket::new()
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.fd != sys::INVALID_FD {
            let _ = sys::shutdown(self.fd);
            self.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    // Binding to a fixed port is racy between test runs, so walk a small
    // range until the OS accepts one.
    fn bind_some_port(socket: &mut Socket) -> u16 {
        for port in 42000..42200u16 {
            if socket.bind("127.0.0.1", port) {
                return port;
            }
        }
        panic!("no free port in the probe range");
    }

    fn stream_pair() -> (Socket, Socket, u16) {
        let mut server = Socket::with(Domain::Inet, Kind::Stream);
        assert!(server.create());
        let port = bind_some_port(&mut server);
        assert!(server.listen());
        (server, Socket::with(Domain::Inet, Kind::Stream), port)
    }

    #[test]
    fn unconfigured_handle_rejects_every_operation() {
        let mut socket = Socket::new();
        assert_eq!(socket.descriptor(), -1);
        assert_eq!(socket.state(), State::Unconfigured);

        assert!(!socket.create());
        assert!(!socket.bind("127.0.0.1", 4000));
        assert!(!socket.bind_any(4000));
        assert!(!socket.listen());
        assert!(!socket.connect("127.0.0.1", 4000));
        assert!(!socket.connect_numeric(0x7f000001, 4000));
        assert!(!socket.set_blocking(false));
        assert!(socket.accept().is_none());
        assert_eq!(socket.accept_raw(), -1);
        assert!(socket.write(b"data").is_none());
        assert!(!socket.write_all(b"data"));
        assert!(socket.read(&mut [0u8; 4]).is_none());
        assert!(socket.recv_from(&mut [0u8; 4]).is_none());
        assert!(!socket.shutdown());

        // No side effects: still unconfigured, no endpoints invented.
        assert_eq!(socket.state(), State::Unconfigured);
        assert_eq!(socket.ip(), None);
        assert_eq!(socket.ip_numeric(), None);
        assert_eq!(socket.port(), None);
    }

    #[test]
    fn create_assigns_a_descriptor_for_every_supported_kind() {
        for kind in [Kind::Stream, Kind::Dgram] {
            let mut socket = Socket::with(Domain::Inet, kind);
            assert!(socket.create());
            assert!(socket.descriptor() >= 0);
            assert_eq!(socket.state(), State::Created);
        }
    }

    #[test]
    fn recreate_does_not_leak_the_first_descriptor() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        let first = socket.descriptor();
        assert!(socket.create());
        drop(socket);
        // Whether or not the second create reused the descriptor number,
        // the first one must be closed by now.
        assert!(!sys::is_open(first));
    }

    #[test]
    fn domain_and_kind_are_write_once() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        assert!(!socket.create_with(Domain::Inet, Kind::Dgram));
        assert_eq!(socket.kind(), Some(Kind::Stream));
        // Re-stating the fixed values is allowed.
        assert!(socket.create_with(Domain::Inet, Kind::Stream));
    }

    #[test]
    fn bind_records_the_requested_endpoint() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        let port = bind_some_port(&mut socket);
        assert_eq!(socket.state(), State::Bound);
        assert_eq!(socket.ip().as_deref(), Some("127.0.0.1"));
        assert_eq!(socket.port(), Some(port));
        assert_eq!(socket.local_endpoint(), Some(Endpoint::new(0x7f000001, port)));
        assert_eq!(socket.peer_endpoint(), None);
    }

    #[test]
    fn bind_rejects_garbage_addresses() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        assert!(!socket.bind("not-an-address", 4000));
        assert!(!socket.bind("300.1.2.3", 4000));
        assert_eq!(socket.local_endpoint(), None);
    }

    #[test]
    fn listen_is_rejected_for_datagram_sockets() {
        let mut socket = Socket::with(Domain::Inet, Kind::Dgram);
        assert!(socket.create());
        bind_some_port(&mut socket);
        assert!(!socket.listen());
        assert_eq!(socket.state(), State::Bound);
    }

    #[test]
    fn accepted_handle_reports_the_client_endpoint() {
        let (server, mut client, port) = stream_pair();
        assert!(client.create());
        let t = std::thread::spawn(move || {
            assert!(client.connect("127.0.0.1", port));
            assert_eq!(client.state(), State::Connected);
            assert_eq!(client.ip().as_deref(), Some("127.0.0.1"));
            assert_eq!(client.port(), Some(port));
            // Hold the connection open until the server side is done.
            let mut buf = [0u8; 1];
            let _ = client.read(&mut buf);
        });

        let accepted = server.accept().expect("accept failed");
        assert_eq!(accepted.state(), State::Connected);
        assert_eq!(accepted.kind(), Some(Kind::Stream));
        assert_eq!(accepted.ip().as_deref(), Some("127.0.0.1"));
        assert!(accepted.port().is_some_and(|p| p != 0));
        drop(accepted);
        t.join().unwrap();
    }

    #[test]
    fn stream_bytes_survive_fragmented_reads() {
        let (server, mut client, port) = stream_pair();
        let payload: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let expected = payload.clone();

        assert!(client.create());
        let t = std::thread::spawn(move || {
            assert!(client.connect("127.0.0.1", port));
            assert!(client.write_all(&payload));
        });

        let accepted = server.accept().expect("accept failed");
        let mut collected = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match accepted.read(&mut buf) {
                Some(0) => break,
                Some(n) => {
                    assert!(n <= buf.len());
                    collected.extend_from_slice(&buf[..n]);
                }
                None => panic!("read error mid-stream"),
            }
        }
        assert_eq!(collected, expected);
        t.join().unwrap();
    }

    #[test]
    fn write_all_and_read_exact_round_trip() {
        let (server, mut client, port) = stream_pair();
        let payload: Vec<u8> = (0..64 * 1024u32).map(|i| (i % 239) as u8).collect();
        let expected = payload.clone();

        assert!(client.create());
        let t = std::thread::spawn(move || {
            assert!(client.connect("127.0.0.1", port));
            assert!(client.write_all(&payload));
        });

        let accepted = server.accept().expect("accept failed");
        let mut received = vec![0u8; expected.len()];
        assert!(accepted.read_exact(&mut received));
        assert_eq!(received, expected);
        t.join().unwrap();
    }

    #[test]
    fn nonblocking_read_returns_immediately_and_blocking_read_waits() {
        let (server, mut client, port) = stream_pair();
        assert!(client.create());
        let t = std::thread::spawn(move || {
            assert!(client.connect("127.0.0.1", port));
            std::thread::sleep(Duration::from_millis(200));
            assert!(client.write_all(b"late data"));
        });

        let accepted = server.accept().expect("accept failed");
        let mut buf = [0u8; 16];

        assert!(accepted.set_blocking(false));
        let start = Instant::now();
        assert!(accepted.read(&mut buf).is_none());
        assert!(start.elapsed() < Duration::from_millis(100));

        assert!(accepted.set_blocking(true));
        let start = Instant::now();
        let n = accepted.read(&mut buf).expect("blocking read failed");
        assert!(n > 0);
        assert!(start.elapsed() >= Duration::from_millis(100));
        t.join().unwrap();
    }

    #[test]
    fn drop_releases_the_descriptor() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        let fd = socket.descriptor();
        assert!(sys::is_open(fd));
        drop(socket);
        assert!(!sys::is_open(fd));
    }

    #[test]
    fn close_is_explicit_and_idempotent() {
        let mut socket = Socket::with(Domain::Inet, Kind::Stream);
        assert!(socket.create());
        let fd = socket.descriptor();
        socket.close();
        assert_eq!(socket.descriptor(), -1);
        assert_eq!(socket.state(), State::Closed);
        assert!(!sys::is_open(fd));
        // A second close and a drop afterwards must both be harmless.
        socket.close();
    }

    #[test]
    fn datagram_sender_endpoint_is_host_order() {
        let mut receiver = Socket::with(Domain::Inet, Kind::Dgram);
        assert!(receiver.create());
        let port = bind_some_port(&mut receiver);

        let mut sender = Socket::with(Domain::Inet, Kind::Dgram);
        assert!(sender.create());
        let sender_port = bind_some_port(&mut sender);
        assert!(sender.connect("127.0.0.1", port));
        assert!(sender.write_all(b"ping"));

        let mut buf = [0u8; 16];
        let (n, from) = receiver.recv_from(&mut buf).expect("recv_from failed");
        assert_eq!(&buf[..n], b"ping");
        // Host order: a network-order leak would render 127.0.0.1 as 1.0.0.127.
        assert_eq!(from.ip(), "127.0.0.1");
        assert_eq!(from.address(), 0x7f000001);
        assert_eq!(from.port(), sender_port);
        // The sender is also recorded as the handle's peer.
        assert_eq!(receiver.peer_endpoint(), Some(from));
    }

    #[test]
    fn accept_raw_descriptor_can_be_wrapped() {
        let (server, mut client, port) = stream_pair();
        assert!(client.create());
        let t = std::thread::spawn(move || {
            assert!(client.connect("127.0.0.1", port));
            assert!(client.write_all(b"hello"));
        });

        let fd = server.accept_raw();
        assert!(fd >= 0);
        let wrapped = Socket::from_raw(fd);
        assert_eq!(wrapped.state(), State::Created);
        assert_eq!(wrapped.domain(), None);
        let mut buf = [0u8; 5];
        assert!(wrapped.read_exact(&mut buf));
        assert_eq!(&buf, b"hello");
        t.join().unwrap();
        drop(wrapped);
        assert!(!sys::is_open(fd));
    }

    #[test]
    fn endpoint_rendering() {
        let e = Endpoint::new(0xc0a80101, 8080);
        assert_eq!(e.ip(), "192.168.1.1");
        assert_eq!(e.address(), 0xc0a80101);
        assert_eq!(e.port(), 8080);
    }
}
