//! Sources of export bytes.
//!
//! The `/post` command either carries the JSON inline, points at a URL, or
//! comes with an attached file. Each producer implements [`ByteSource`]; the
//! chat adapter picks one and the pipeline only ever sees bytes.

use std::{
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    time::Duration,
};

use async_trait::async_trait;

use crate::{errors::Error, Result};

#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Short label for logs ("inline", "url", "attachment").
    fn kind(&self) -> &'static str;

    async fn fetch(&self) -> Result<Vec<u8>>;
}

/// JSON pasted directly after the command.
pub struct InlineSource {
    text: String,
}

impl InlineSource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ByteSource for InlineSource {
    fn kind(&self) -> &'static str {
        "inline"
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        Ok(self.text.as_bytes().to_vec())
    }
}

/// True when `arg` should be fetched instead of parsed.
pub fn is_url(arg: &str) -> bool {
    let t = arg.trim();
    (t.starts_with("https://") || t.starts_with("http://")) && !t.contains(char::is_whitespace)
}

/// Export published at a public `https://` URL.
///
/// The host is resolved and checked before the request; loopback, private,
/// link-local and other non-routable targets are refused. The shared client
/// must not follow redirects, otherwise the check can be bypassed.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
    max_bytes: u64,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(
        client: reqwest::Client,
        url: impl Into<String>,
        max_bytes: u64,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            max_bytes,
            timeout,
        }
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    fn kind(&self) -> &'static str {
        "url"
    }

    async fn fetch(&self) -> Result<Vec<u8>> {
        let url = check_target(&self.url).await?;

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Fetch(format!("GET {} failed: {e}", self.url)))?;
        if resp.status().is_redirection() {
            return Err(Error::Fetch(format!(
                "GET {} answered {}, redirects are not followed",
                self.url,
                resp.status()
            )));
        }

        if let Some(len) = resp.content_length() {
            check_size(len, self.max_bytes)?;
        }

        read_limited(resp, self.max_bytes).await
    }
}

/// Read the body chunk by chunk, giving up as soon as it passes `max_bytes`.
pub async fn read_limited(mut resp: reqwest::Response, max_bytes: u64) -> Result<Vec<u8>> {
    let url = resp.url().to_string();
    let mut body = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| Error::Fetch(format!("reading {url} failed: {e}")))?
    {
        check_size((body.len() + chunk.len()) as u64, max_bytes)?;
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Reject payloads above `max_bytes` before handing them to the decoder.
pub fn check_size(len: u64, max_bytes: u64) -> Result<()> {
    if len > max_bytes {
        return Err(Error::PayloadTooLarge {
            len,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Parse `raw` and make sure it names a public https host.
///
/// Every address the host resolves to must be publicly routable.
pub async fn check_target(raw: &str) -> Result<reqwest::Url> {
    let blocked = || Error::BlockedUrl(raw.to_string());

    let url = reqwest::Url::parse(raw.trim()).map_err(|_| blocked())?;
    if url.scheme() != "https" || !url.username().is_empty() || url.password().is_some() {
        return Err(blocked());
    }
    let host = url
        .host_str()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']'))
        .ok_or_else(blocked)?;
    let port = url.port_or_known_default().unwrap_or(443);

    if let Ok(ip) = host.parse::<IpAddr>() {
        return if is_public(ip) { Ok(url) } else { Err(blocked()) };
    }

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::Fetch(format!("resolving {host} failed: {e}")))?
        .map(|a| a.ip())
        .collect();
    if addrs.is_empty() {
        return Err(Error::Fetch(format!("{host} has no addresses")));
    }
    if let Some(ip) = addrs.iter().find(|ip| !is_public(**ip)) {
        tracing::warn!(%host, %ip, "refusing non-public fetch target");
        return Err(blocked());
    }
    Ok(url)
}

fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => is_public_v6(v6),
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 0.0.0.0/8 and 100.64.0.0/10 (carrier-grade NAT)
    let reserved = a == 0 || (a == 100 && (b & 0xc0) == 64);
    !(reserved
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast())
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_public_v4(v4);
    }
    let first = ip.segments()[0];
    let unique_local = (first & 0xfe00) == 0xfc00;
    let link_local = (first & 0xffc0) == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}
