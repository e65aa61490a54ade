use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::Error;
use crate::forward::frame::MAX_FRAME_SIZE;
use crate::headers::ethernet::ETHERNET_HEADER_LEN;

const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);
const DEFAULT_MTU: u16 = 1500;
/// Smallest MTU every IPv4 link must support.
const MIN_MTU: u16 = 68;

/// Framing of the packets exchanged with the interface.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    /// Raw IP packets.
    #[default]
    Tun,
    /// Ethernet frames.
    Tap,
}

/// Settings that can be stored in a TOML file; everything is optional and
/// command line values take precedence.
#[derive(Clone, Debug, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub interface: Option<String>,
    pub mode: Option<LinkMode>,
    pub verbose: Option<bool>,
    pub address: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
    pub mtu: Option<u16>,
}

impl ConfigToml {
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_owned(),
            source,
        })
    }
}

/// Fully resolved settings of a reflector run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReflectorConfig {
    pub interface: String,
    pub mode: LinkMode,
    pub verbose: bool,
    pub address: Option<Ipv4Addr>,
    pub netmask: Ipv4Addr,
    pub mtu: u16,
}

impl ReflectorConfig {
    /// Reads the config file named on the command line (if any) and applies the command line on top.
    pub fn from_args(args: &Args) -> Result<Self, Error> {
        let file = match &args.config {
            Some(path) => ConfigToml::from_file(path)?,
            None => ConfigToml::default(),
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: ConfigToml) -> Result<Self, Error> {
        let interface = args
            .interface
            .clone()
            .or(file.interface)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::Config("name of interface to use is mandatory".to_string()))?;
        let mode = args.mode().or(file.mode).unwrap_or_default();
        let mtu = args.mtu.or(file.mtu).unwrap_or(DEFAULT_MTU);

        let link_overhead = match mode {
            LinkMode::Tun => 0,
            LinkMode::Tap => ETHERNET_HEADER_LEN,
        };
        if mtu < MIN_MTU || usize::from(mtu) + link_overhead > MAX_FRAME_SIZE {
            return Err(Error::Config(format!(
                "MTU {mtu} out of range ({MIN_MTU}..={})",
                MAX_FRAME_SIZE - link_overhead
            )));
        }

        Ok(Self {
            interface,
            mode,
            verbose: args.debug || file.verbose.unwrap_or(false),
            address: args.address.or(file.address),
            netmask: args.netmask.or(file.netmask).unwrap_or(DEFAULT_NETMASK),
            mtu,
        })
    }
}
