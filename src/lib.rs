//! # Endpoint Socket - Owned Berkeley-Socket Handle Library
//!
//! Endpoint Socket is a Rust library that provides a single owned handle type
//! over the operating system's Berkeley-sockets interface. One [`Socket`]
//! value owns one OS descriptor together with its address family, transport
//! kind and the local/peer endpoints recorded along the way, and exposes the
//! whole socket lifecycle: create, bind, listen, accept, connect, read,
//! write, datagram receive, blocking-mode toggle, shutdown and close.
//!
//! ## Key Features
//!
//! - **Exclusive Ownership**: each descriptor belongs to exactly one handle,
//!   and the handle releases it on every exit path, explicit close, error
//!   return or drop alike
//! - **Checked Lifecycle**: the handle tracks an explicit [`State`] so that
//!   requests that can never succeed (listening on a datagram socket,
//!   operating on an unset descriptor) are rejected before any system call
//! - **In-Band Failures**: every operation reports failure through its
//!   return value; nothing in the public API panics or propagates an OS
//!   error, and the error detail goes to the `log` facade instead
//! - **Host-Order Endpoints**: addresses and ports cross the API boundary in
//!   host byte order only; network-order conversion stays inside the
//!   platform layer
//!
//! ## How It Works
//!
//! The library sits below `std::net`: it talks to the socket system calls
//! directly through a per-platform capability module (POSIX today) and keeps
//! the bookkeeping, descriptor, family, transport, lifecycle state and the
//! last recorded local/peer endpoint, on the handle. Blocking behavior is
//! whatever the OS provides; switching a handle to non-blocking mode makes
//! the same calls return immediately with an in-band failure instead.
//!
//! ## Basic Usage
//!
//! ### Server Side
//!
//! ```rust,no_run
//! use endpoint_socket::{Domain, Kind, Socket};
//!
//! let mut server = Socket::with(Domain::Inet, Kind::Stream);
//! assert!(server.create());
//! assert!(server.bind_any(8080));
//! assert!(server.listen());
//!
//! // Accept connections; each accepted handle owns its own descriptor.
//! while let Some(client) = server.accept() {
//!     println!("Accepted connection from {:?}", client.ip());
//!     let mut buffer = [0u8; 1024];
//!     if let Some(n) = client.read(&mut buffer) {
//!         client.write(&buffer[..n]);
//!     }
//! }
//! ```
//!
//! ### Client Side
//!
//! ```rust,no_run
//! use endpoint_socket::{Domain, Kind, Socket};
//!
//! let mut client = Socket::with(Domain::Inet, Kind::Stream);
//! assert!(client.create());
//! assert!(client.connect("127.0.0.1", 8080));
//! assert!(client.write_all(b"Hello from endpoint-socket!"));
//!
//! let mut response = [0u8; 1024];
//! if let Some(n) = client.read(&mut response) {
//!     println!("Response: {}", String::from_utf8_lossy(&response[..n]));
//! }
//! ```
//!
//! ## Datagram Sockets
//!
//! Datagram handles use the same lifecycle; [`Socket::recv_from`] returns
//! the sender [`Endpoint`] alongside the byte count, normalized to host
//! byte order like every other endpoint in the API.
//!
//! ## Scope
//!
//! This is a primitive, not a framework: no framing, no TLS, no pooling,
//! no event-loop integration, no timeouts and no retry-on-interrupt. A
//! higher layer integrating the handle into an event loop adds those on
//! top. Addressing is IPv4 numeric/dotted-decimal; the platform layer is
//! POSIX, with other hosts left as an explicit port point in `sys`.

#![warn(missing_docs)]

mod socket;
mod sys;

pub use socket::*;
