use std::io;
use std::net::{SocketAddr, ToSocketAddrs};

/// Trait for blocking name resolution
///
/// Implement this trait to control how host names are turned into socket
/// addresses. The endpoint cache calls resolve() only on its refresh path,
/// so implementations may block on network I/O. Failure is a normal outcome
/// (transient DNS trouble, daemon not up yet) and is reported as an Err,
/// never a panic.
pub trait Resolve: Send + Sync {
    /// Resolve a host name into socket addresses for the given port.
    ///
    /// An empty address list is treated as a resolution failure by callers.
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Default resolver backed by the operating system
///
/// Uses the platform name-resolution machinery via `ToSocketAddrs`. Respects
/// /etc/hosts, DNS configuration and any system-level caching.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl Resolve for SystemResolver {
    fn resolve(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();

        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses returned for {}", host),
            ));
        }

        Ok(addrs)
    }
}

/// Pick the address to cache from a resolver result
///
/// Prefers IPv4 when both families are present, otherwise takes the first
/// address. Returns None on an empty list.
pub(crate) fn select_address(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
