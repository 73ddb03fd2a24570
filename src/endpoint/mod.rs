//! Resolved-endpoint cache for the trace collector daemon
//!
//! Every emission to the daemon needs a resolved socket address. Callers sit
//! on the request hot path, so resolve() must be cheap enough to call
//! unconditionally: cache hits take a read lock and a clock read, nothing
//! else. Name resolution only happens on the refresh path, at most once per
//! TTL window no matter how many threads hit an expired entry at once.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::errors::{TraceError, TraceResult};

pub mod resolver;

pub use resolver::{Resolve, SystemResolver};

/// Maximum host name length accepted for resolution (practical DNS limit)
pub const MAX_HOST_LEN: usize = 253;

/// Highest valid port number
pub const MAX_PORT: i32 = 65535;

/// Default refresh interval in seconds
pub const DEFAULT_TTL_SECS: u64 = 60;

/// Cache entry with refresh-time tracking
///
/// Replaced as a whole on every refresh so readers never see an address from
/// one refresh paired with a timestamp from another.
struct CacheEntry {
    addr: SocketAddr,
    refreshed_at: Instant,
}

impl CacheEntry {
    fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            refreshed_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.refreshed_at.elapsed() >= ttl
    }
}

/// Cache metrics for monitoring
///
/// Counters never feed back into control flow; they exist so operators can
/// see hit rates and resolution failures without extra instrumentation.
#[derive(Debug, Clone)]
pub struct EndpointMetrics {
    pub hits: u64,
    pub refreshes: u64,
    pub failures: u64,
    pub taken_at: DateTime<Utc>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    refreshes: AtomicU64,
    failures: AtomicU64,
}

/// Caching resolver for a single (host, port) endpoint
///
/// Owns one host/port pair for its lifetime and one mutable cache slot shared
/// by all callers. Construction performs no I/O and never fails; malformed
/// host or port values are detected at resolution time and reported as an
/// absent result.
///
/// Concurrency discipline: readers on a fresh entry never wait on a refresh.
/// When the entry expires, exactly one caller re-resolves while the rest keep
/// serving the previous address. Only the very first resolution (nothing
/// cached yet) makes concurrent callers wait, and they all coalesce onto a
/// single resolver call.
pub struct EndpointCache {
    host: String,
    port: i32,
    ttl: Duration,
    entry: RwLock<Option<CacheEntry>>,
    refresh_gate: Mutex<()>,
    resolver: Box<dyn Resolve>,
    counters: Counters,
}

impl EndpointCache {
    /// Create a cache with the default TTL
    pub fn new(host: impl Into<String>, port: i32) -> Self {
        Self::with_ttl(host, port, DEFAULT_TTL_SECS)
    }

    /// Create a cache with an explicit TTL in seconds
    pub fn with_ttl(host: impl Into<String>, port: i32, ttl_secs: u64) -> Self {
        Self::with_resolver(host, port, ttl_secs, Box::new(SystemResolver))
    }

    /// Create a cache with an explicit TTL and a custom resolver
    pub fn with_resolver(
        host: impl Into<String>,
        port: i32,
        ttl_secs: u64,
        resolver: Box<dyn Resolve>,
    ) -> Self {
        let host = host.into();
        let ttl_secs = if ttl_secs == 0 { DEFAULT_TTL_SECS } else { ttl_secs };

        log::debug!("🔗 Endpoint cache created for {}:{} (ttl {}s)", host, port, ttl_secs);

        Self {
            host,
            port,
            ttl: Duration::from_secs(ttl_secs),
            entry: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            resolver,
            counters: Counters::default(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> i32 {
        self.port
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Resolve the endpoint, serving from cache when fresh
    ///
    /// Returns the resolved address (or None) together with a flag that is
    /// true only when this call performed a successful network resolution.
    ///
    /// Invalid host/port values and resolution failures both surface as an
    /// absent address, never a panic: transient DNS trouble is a normal
    /// outcome here. A refresh failure after a previous success keeps the
    /// last good address servable, so an outage does not blind callers that
    /// were already working.
    pub fn resolve(&self) -> (Option<SocketAddr>, bool) {
        if let Err(e) = self.validate() {
            log::debug!("Endpoint validation failed: {}", e);
            return (None, false);
        }

        // Fast path: fresh cached entry, no I/O
        {
            let entry = self.entry.read();
            if let Some(cached) = entry.as_ref() {
                if !cached.is_expired(self.ttl) {
                    self.counters.hits.fetch_add(1, Ordering::Relaxed);
                    return (Some(cached.addr), false);
                }
            }
        }

        self.refresh()
    }

    /// Check the stored host/port without touching the network
    pub fn validate(&self) -> TraceResult<()> {
        let reason = if self.host.is_empty() {
            Some("host is empty")
        } else if self.host.len() > MAX_HOST_LEN {
            Some("host name too long")
        } else if self.port < 0 || self.port > MAX_PORT {
            Some("port out of range")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(TraceError::InvalidEndpoint {
                host: self.host.clone(),
                port: self.port,
                reason: reason.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Get current metrics
    pub fn metrics(&self) -> EndpointMetrics {
        EndpointMetrics {
            hits: self.counters.hits.load(Ordering::Relaxed),
            refreshes: self.counters.refreshes.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            taken_at: Utc::now(),
        }
    }

    /// Refresh path: at most one in-flight resolution per instance
    fn refresh(&self) -> (Option<SocketAddr>, bool) {
        let had_entry = self.entry.read().is_some();

        // With a previous address on hand there is no reason to wait behind a
        // sibling refresh; serve stale and move on. Only the first resolution
        // blocks, so that every cold-start caller coalesces onto one lookup.
        let _gate: MutexGuard<'_, ()> = if had_entry {
            match self.refresh_gate.try_lock() {
                Some(gate) => gate,
                None => {
                    let entry = self.entry.read();
                    return (entry.as_ref().map(|cached| cached.addr), false);
                }
            }
        } else {
            self.refresh_gate.lock()
        };

        // Re-check under the gate: a sibling may have refreshed while we
        // waited, and repeating its work would break the once-per-TTL bound.
        {
            let entry = self.entry.read();
            if let Some(cached) = entry.as_ref() {
                if !cached.is_expired(self.ttl) {
                    return (Some(cached.addr), false);
                }
            }
        }

        match self.resolver.resolve(&self.host, self.port as u16) {
            Ok(addrs) => match resolver::select_address(&addrs) {
                Some(addr) => {
                    *self.entry.write() = Some(CacheEntry::new(addr));
                    self.counters.refreshes.fetch_add(1, Ordering::Relaxed);
                    log::debug!("✅ Resolved {}:{} -> {}", self.host, self.port, addr);
                    (Some(addr), true)
                }
                None => self.resolution_failed(None),
            },
            Err(e) => {
                let err = TraceError::Resolution {
                    host: self.host.clone(),
                    source: e,
                };
                self.resolution_failed(Some(err))
            }
        }
    }

    /// Record a failed resolution, keeping any previous address servable
    fn resolution_failed(&self, err: Option<TraceError>) -> (Option<SocketAddr>, bool) {
        self.counters.failures.fetch_add(1, Ordering::Relaxed);

        match err {
            Some(err) => log::warn!("❌ Endpoint resolution failed: {}", err),
            None => log::warn!("❌ Endpoint resolution for {} returned no addresses", self.host),
        }

        let entry = self.entry.read();
        (entry.as_ref().map(|cached| cached.addr), false)
    }
}

impl std::fmt::Debug for EndpointCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointCache")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ttl", &self.ttl)
            .finish()
    }
}
