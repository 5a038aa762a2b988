//! IPv4 address allocation for PDU sessions
//!
//! The allocator owns all host addresses of one CIDR block as an ordered
//! free list. Released addresses return to the head of the list, so a
//! session that releases and reacquires in quick succession tends to get
//! the same address back.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Errors returned by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IpamError {
    /// The CIDR string could not be parsed.
    #[error("invalid CIDR {0}")]
    InvalidCidr(String),

    /// The free list is empty.
    #[error("no available IP addresses")]
    Exhausted,

    /// The (SUPI, session) pair holds no address.
    #[error("user does not have an allocated IP")]
    NotAllocated,
}

#[derive(Debug)]
struct Inner {
    free: VecDeque<Ipv4Addr>,
    allocated: HashMap<String, Ipv4Addr>,
    ip_to_user: HashMap<Ipv4Addr, String>,
}

/// Bijective (SUPI, session id) to IPv4 allocator.
///
/// Internally locked; callers need no external serialization.
#[derive(Debug)]
pub struct IpAllocator {
    inner: Mutex<Inner>,
}

fn user_key(supi: &str, session_id: i32) -> String {
    format!("{supi}-{session_id}")
}

impl IpAllocator {
    /// Creates an allocator over all host addresses of `cidr`
    /// (e.g. `"12.1.0.0/16"`), excluding network and broadcast addresses.
    pub fn new(cidr: &str) -> Result<Self, IpamError> {
        let (addr, prefix) = cidr
            .split_once('/')
            .ok_or_else(|| IpamError::InvalidCidr(cidr.to_string()))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|_| IpamError::InvalidCidr(cidr.to_string()))?;
        let prefix: u32 = prefix
            .parse()
            .map_err(|_| IpamError::InvalidCidr(cidr.to_string()))?;
        if prefix > 32 {
            return Err(IpamError::InvalidCidr(cidr.to_string()));
        }

        let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
        let network = u32::from(addr) & mask;
        let count = 1u64 << (32 - prefix);

        let mut ips: Vec<Ipv4Addr> = (0..count)
            .map(|i| Ipv4Addr::from(network.wrapping_add(i as u32)))
            .collect();
        if ips.len() > 2 {
            ips = ips[1..ips.len() - 1].to_vec();
        }

        Ok(Self {
            inner: Mutex::new(Inner {
                free: ips.into(),
                allocated: HashMap::new(),
                ip_to_user: HashMap::new(),
            }),
        })
    }

    /// Allocates an address for the (SUPI, session) pair.
    ///
    /// Idempotent: an existing binding is returned unchanged.
    pub async fn allocate(&self, supi: &str, session_id: i32) -> Result<Ipv4Addr, IpamError> {
        let mut inner = self.inner.lock().await;
        let key = user_key(supi, session_id);

        if let Some(ip) = inner.allocated.get(&key) {
            return Ok(*ip);
        }

        let ip = inner.free.pop_front().ok_or(IpamError::Exhausted)?;
        inner.allocated.insert(key.clone(), ip);
        inner.ip_to_user.insert(ip, key);
        Ok(ip)
    }

    /// Releases the binding of the (SUPI, session) pair and returns the
    /// freed address to the head of the free list.
    pub async fn release(&self, supi: &str, session_id: i32) -> Result<Ipv4Addr, IpamError> {
        let mut inner = self.inner.lock().await;
        let key = user_key(supi, session_id);

        let ip = inner.allocated.remove(&key).ok_or(IpamError::NotAllocated)?;
        inner.ip_to_user.remove(&ip);
        inner.free.push_front(ip);
        Ok(ip)
    }

    /// Resolves an address back to its (SUPI, session id) binding.
    pub async fn lookup(&self, ip: Ipv4Addr) -> Option<(String, i32)> {
        let inner = self.inner.lock().await;
        let key = match inner.ip_to_user.get(&ip) {
            Some(key) => key,
            None => {
                debug!("user not found for {ip}");
                return None;
            }
        };
        let (supi, session) = key.rsplit_once('-')?;
        let session_id: i32 = session.parse().ok()?;
        Some((supi.to_string(), session_id))
    }

    /// Number of addresses currently available.
    pub async fn available(&self) -> usize {
        self.inner.lock().await.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_is_idempotent() {
        let ipam = IpAllocator::new("12.1.0.0/24").unwrap();
        let first = ipam.allocate("001010000000001", 1).await.unwrap();
        let again = ipam.allocate("001010000000001", 1).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(ipam.available().await, 253);
    }

    #[tokio::test]
    async fn test_lookup_resolves_binding() {
        let ipam = IpAllocator::new("12.1.0.0/24").unwrap();
        let ip = ipam.allocate("001010000000001", 2).await.unwrap();
        assert_eq!(
            ipam.lookup(ip).await,
            Some(("001010000000001".to_string(), 2))
        );
        assert_eq!(ipam.lookup(Ipv4Addr::new(10, 0, 0, 1)).await, None);
    }

    #[tokio::test]
    async fn test_release_then_lookup_misses() {
        let ipam = IpAllocator::new("12.1.0.0/24").unwrap();
        let ip = ipam.allocate("001010000000001", 1).await.unwrap();
        ipam.release("001010000000001", 1).await.unwrap();
        assert_eq!(ipam.lookup(ip).await, None);
    }

    #[tokio::test]
    async fn test_release_unknown_binding() {
        let ipam = IpAllocator::new("12.1.0.0/24").unwrap();
        let err = ipam.release("001010000000001", 9).await.unwrap_err();
        assert_eq!(err, IpamError::NotAllocated);
    }

    #[tokio::test]
    async fn test_lifo_reuse_of_freed_address() {
        let ipam = IpAllocator::new("12.1.0.0/24").unwrap();
        let a = ipam.allocate("ue1", 1).await.unwrap();
        let _b = ipam.allocate("ue2", 1).await.unwrap();

        ipam.release("ue1", 1).await.unwrap();
        let c = ipam.allocate("ue3", 1).await.unwrap();
        assert_eq!(a, c);
    }

    #[tokio::test]
    async fn test_slash_30_pool_exhaustion() {
        // A /30 leaves two usable host addresses.
        let ipam = IpAllocator::new("10.0.0.0/30").unwrap();
        assert_eq!(ipam.available().await, 2);

        ipam.allocate("ue1", 1).await.unwrap();
        ipam.allocate("ue2", 1).await.unwrap();
        let err = ipam.allocate("ue3", 1).await.unwrap_err();
        assert_eq!(err, IpamError::Exhausted);

        let freed = ipam.release("ue1", 1).await.unwrap();
        let next = ipam.allocate("ue3", 1).await.unwrap();
        assert_eq!(freed, next);
    }

    #[tokio::test]
    async fn test_pool_excludes_network_and_broadcast() {
        let ipam = IpAllocator::new("192.168.1.0/30").unwrap();
        let first = ipam.allocate("ue1", 1).await.unwrap();
        let second = ipam.allocate("ue2", 1).await.unwrap();
        assert_eq!(first, Ipv4Addr::new(192, 168, 1, 1));
        assert_eq!(second, Ipv4Addr::new(192, 168, 1, 2));
    }

    #[test]
    fn test_invalid_cidr_rejected() {
        assert!(IpAllocator::new("not-a-cidr").is_err());
        assert!(IpAllocator::new("10.0.0.0/33").is_err());
        assert!(IpAllocator::new("10.0.0.0").is_err());
    }
}
