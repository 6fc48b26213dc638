//! Guards every link scraped from page content before it is fetched.
//!
//! Only absolute http(s) URLs pointing at public hosts pass. Hostnames can
//! optionally be resolved so a public-looking name that points at an
//! internal address is rejected too.

use crate::common::error::{Result, ScraperError};
use reqwest::Url;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    !(ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64))
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_v4(v4);
    }
    let first = ip.segments()[0];
    !(ip.is_loopback()
        || ip.is_unspecified()
        || (first & 0xfe00) == 0xfc00
        || (first & 0xffc0) == 0xfe80)
}

pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

/// Host as compared by the guard: lowercase, brackets and trailing root
/// dots removed, so `LOCALHOST.` and `localhost` are the same name.
fn bare_host(url: &Url) -> Option<String> {
    let host = url
        .host_str()?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();
    (!host.is_empty()).then_some(host)
}

fn host_ip(url: &Url) -> Option<IpAddr> {
    bare_host(url).and_then(|h| h.parse::<IpAddr>().ok())
}

/// Syntactic check: scheme, host name and literal addresses.
pub fn check(raw: &str) -> Result<Url> {
    let reject = || ScraperError::UnsafeUrl(raw.trim().to_string());
    let url = Url::parse(raw.trim()).map_err(|_| reject())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(reject());
    }
    let Some(host) = bare_host(&url) else {
        return Err(reject());
    };
    if host == "localhost" || host.ends_with(".localhost") {
        return Err(reject());
    }
    if let Some(ip) = host_ip(&url) {
        if !is_public_ip(ip) {
            return Err(reject());
        }
    }
    Ok(url)
}

pub fn is_safe(raw: &str) -> bool {
    check(raw).is_ok()
}

/// Resolves `href` against the page it was found on, then checks it.
pub fn resolve_link(base: &str, href: &str) -> Result<Url> {
    let base = Url::parse(base).map_err(|_| ScraperError::UnsafeUrl(base.to_string()))?;
    let joined = base
        .join(href.trim())
        .map_err(|_| ScraperError::UnsafeUrl(href.trim().to_string()))?;
    check(joined.as_str())
}

/// DNS-level check. Every address the host resolves to must be public.
/// A failed lookup is an I/O error, not a security rejection.
pub async fn check_resolved(url: &Url) -> Result<()> {
    if let Some(ip) = host_ip(url) {
        return if is_public_ip(ip) {
            Ok(())
        } else {
            Err(ScraperError::UnsafeUrl(url.to_string()))
        };
    }
    let Some(host) = url.host_str() else {
        return Err(ScraperError::UnsafeUrl(url.to_string()));
    };
    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = tokio::net::lookup_host((host, port)).await?;
    for addr in addrs {
        if !is_public_ip(addr.ip()) {
            debug!(host, ip = %addr.ip(), "host resolves to a non-public address");
            return Err(ScraperError::UnsafeUrl(url.to_string()));
        }
    }
    Ok(())
}

/// Full check for a URL about to be fetched. DNS is consulted only when
/// `resolve_hosts` is set.
pub async fn check_fetchable(url: &Url, resolve_hosts: bool) -> Result<()> {
    check(url.as_str())?;
    if resolve_hosts {
        check_resolved(url).await?;
    }
    Ok(())
}
