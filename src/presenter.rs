//! Name lookups and responder address display.

use std::io;
use std::net::IpAddr;

use dns_lookup::{lookup_addr, lookup_host};
use tracing::debug;

/// Forward and reverse name resolution.
pub trait NameService {
    /// Addresses for a host name or literal.
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>>;

    /// PTR names for an address. Empty when there are none or the lookup fails.
    fn reverse(&self, addr: IpAddr) -> Vec<String>;
}

impl<N: NameService + ?Sized> NameService for &N {
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        (**self).lookup_host(host)
    }

    fn reverse(&self, addr: IpAddr) -> Vec<String> {
        (**self).reverse(addr)
    }
}

/// System resolver via `getaddrinfo`/`getnameinfo`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemNameService;

impl NameService for SystemNameService {
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        lookup_host(host)
    }

    fn reverse(&self, addr: IpAddr) -> Vec<String> {
        match lookup_addr(&addr) {
            // getnameinfo falls back to the numeric form when no PTR exists
            Ok(name) if name != addr.to_string() => vec![name],
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!(%addr, error = %e, "reverse lookup failed");
                Vec::new()
            }
        }
    }
}

/// Forward lookups only; addresses are always shown numerically.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericNameService;

impl NameService for NumericNameService {
    fn lookup_host(&self, host: &str) -> io::Result<Vec<IpAddr>> {
        lookup_host(host)
    }

    fn reverse(&self, _addr: IpAddr) -> Vec<String> {
        Vec::new()
    }
}

/// Formats the responders of one hop as `[addr (name)  addr]`.
pub struct AddressPresenter<N> {
    names: N,
}

impl<N: NameService> AddressPresenter<N> {
    pub fn new(names: N) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &N {
        &self.names
    }

    pub fn present(&self, addresses: &[IpAddr]) -> String {
        let entries: Vec<String> = collapse(addresses)
            .iter()
            .map(|addr| self.entry(*addr))
            .collect();
        format!("[{}]", entries.join("  "))
    }

    fn entry(&self, addr: IpAddr) -> String {
        let names: Vec<String> = self
            .names
            .reverse(addr)
            .iter()
            .map(|name| name.trim_end_matches('.'))
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();
        if names.is_empty() {
            addr.to_string()
        } else {
            format!("{} ({})", addr, names.join("  "))
        }
    }
}

/// A list of identical addresses shows as one entry; mixed lists keep every entry.
fn collapse(addresses: &[IpAddr]) -> &[IpAddr] {
    match addresses.split_first() {
        Some((first, rest)) if rest.iter().all(|addr| addr == first) => &addresses[..1],
        _ => addresses,
    }
}
