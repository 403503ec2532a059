//! Minimal OSC 1.0 over UDP: float-only messages, no bundles.
//!
//! Wire layout of a message:
//! ```text
//! address  "/weather/temp\0\0\0"   NUL-terminated, padded to 4 bytes
//! tags     ",f\0\0"                one 'f' per argument, padded likewise
//! args     [f32 big-endian; n]
//! ```

use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::UdpSocket;

use crate::config::Config;
use crate::weather::{Parameter, MONITOR_PORT_OFFSET};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet truncated")]
    Truncated,
    #[error("string is not valid UTF-8")]
    InvalidString,
    #[error("type tag string must start with ','")]
    MissingTypeTags,
    #[error("unsupported type tag '{0}'")]
    UnsupportedTag(char),
}

/// An OSC message carrying float32 arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct OscMessage {
    pub address: String,
    pub args: Vec<f32>,
}

impl OscMessage {
    /// Single-float message, the only shape the bridge sends.
    pub fn float(address: &str, value: f32) -> Self {
        Self {
            address: address.to_string(),
            args: vec![value],
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let tags: String = std::iter::once(',')
            .chain(self.args.iter().map(|_| 'f'))
            .collect();

        let mut bytes = Vec::with_capacity(
            padded_len(self.address.len()) + padded_len(tags.len()) + 4 * self.args.len(),
        );
        write_padded(&mut bytes, &self.address);
        write_padded(&mut bytes, &tags);
        for arg in &self.args {
            bytes.extend_from_slice(&arg.to_be_bytes());
        }
        bytes
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut pos = 0;
        let address = read_padded(bytes, &mut pos)?.to_string();
        let tags = read_padded(bytes, &mut pos)?;

        let tags = tags.strip_prefix(',').ok_or(DecodeError::MissingTypeTags)?;
        let mut args = Vec::with_capacity(tags.len());
        for tag in tags.chars() {
            if tag != 'f' {
                return Err(DecodeError::UnsupportedTag(tag));
            }
            let raw = bytes.get(pos..pos + 4).ok_or(DecodeError::Truncated)?;
            let mut buffer = [0u8; 4];
            buffer.copy_from_slice(raw);
            args.push(f32::from_be_bytes(buffer));
            pos += 4;
        }

        Ok(Self { address, args })
    }
}

/// Length of an OSC string including its terminator and padding.
fn padded_len(len: usize) -> usize {
    (len + 4) & !3
}

fn write_padded(bytes: &mut Vec<u8>, s: &str) {
    bytes.extend_from_slice(s.as_bytes());
    let padding = padded_len(s.len()) - s.len();
    bytes.extend(std::iter::repeat(0u8).take(padding));
}

fn read_padded<'a>(bytes: &'a [u8], pos: &mut usize) -> Result<&'a str, DecodeError> {
    let rest = bytes.get(*pos..).ok_or(DecodeError::Truncated)?;
    let len = rest.iter().position(|&b| b == 0).ok_or(DecodeError::Truncated)?;
    let s = std::str::from_utf8(&rest[..len]).map_err(|_| DecodeError::InvalidString)?;
    let next = *pos + padded_len(len);
    if next > bytes.len() {
        return Err(DecodeError::Truncated);
    }
    *pos = next;
    Ok(s)
}

/// Socket addresses of the five parameter ports and the monitor port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destinations {
    parameters: [SocketAddr; 5],
    monitor: SocketAddr,
}

impl Destinations {
    pub fn new(ip: IpAddr, base_port: u16) -> Self {
        Self {
            parameters: Parameter::ALL.map(|p| SocketAddr::new(ip, base_port + p.port_offset())),
            monitor: SocketAddr::new(ip, base_port + MONITOR_PORT_OFFSET),
        }
    }

    /// Resolve `config.host` once; hostnames such as `localhost` are allowed.
    pub async fn resolve(config: &Config) -> io::Result<Self> {
        let addr = tokio::net::lookup_host((config.host.as_str(), config.base_port))
            .await?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("could not resolve host '{}'", config.host),
                )
            })?;
        Ok(Self::new(addr.ip(), config.base_port))
    }

    pub fn parameter(&self, parameter: Parameter) -> SocketAddr {
        self.parameters[parameter.port_offset() as usize]
    }

    pub fn monitor(&self) -> SocketAddr {
        self.monitor
    }

    fn is_ipv6(&self) -> bool {
        self.monitor.is_ipv6()
    }
}

/// Fire-and-forget delivery of OSC messages.
#[async_trait]
pub trait OscSink: Send + Sync {
    async fn send(&self, target: SocketAddr, message: &OscMessage) -> io::Result<()>;
}

/// Sends every message from one unconnected UDP socket.
pub struct UdpOscSink {
    socket: UdpSocket,
}

impl UdpOscSink {
    /// Bind an ephemeral local port of the same address family as `destinations`.
    pub async fn bind_for(destinations: &Destinations) -> io::Result<Self> {
        let local: IpAddr = if destinations.is_ipv6() {
            Ipv6Addr::UNSPECIFIED.into()
        } else {
            Ipv4Addr::UNSPECIFIED.into()
        };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0)).await?;
        log::debug!("OSC socket bound to {}", socket.local_addr()?);
        Ok(Self { socket })
    }
}

#[async_trait]
impl OscSink for UdpOscSink {
    async fn send(&self, target: SocketAddr, message: &OscMessage) -> io::Result<()> {
        let packet = message.encode();
        self.socket.send_to(&packet, target).await?;
        log::trace!("sent {} {:?} to {}", message.address, message.args, target);
        Ok(())
    }
}
