//! Platform capability layer.
//!
//! Everything that touches an actual system call lives behind this module so
//! that `socket.rs` only ever deals in host-order addresses and `io::Result`
//! values. Each supported host gets its own submodule with the same set of
//! functions; today only the POSIX backend exists.

#[cfg(unix)]
mod unix;
#[cfg(unix)]
pub(crate) use unix::*;

#[cfg(not(unix))]
compile_error!(
    "endpoint-socket only provides a POSIX backend; \
     add a sys submodule for this platform to port it"
);
