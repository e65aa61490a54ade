use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

use crate::config::LinkMode;

/// Reflects UDP datagrams received on a TUN/TAP interface back to their sender
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Name of interface to use (mandatory, here or in the config file)
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Use TUN (default)
    #[arg(short = 'u', long, conflicts_with = "tap")]
    pub tun: bool,
    /// Use TAP
    #[arg(short = 'a', long)]
    pub tap: bool,
    /// Outputs debug information while running
    #[arg(short, long)]
    pub debug: bool,
    /// Path of a TOML file with the same settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// IPv4 address to assign to the interface
    #[arg(long)]
    pub address: Option<Ipv4Addr>,
    /// Netmask of the interface address
    #[arg(long)]
    pub netmask: Option<Ipv4Addr>,
    /// Maximum Transmission Unit (bytes)
    #[arg(long)]
    pub mtu: Option<u16>,
}

impl Args {
    /// Link mode selected on the command line, if any.
    pub fn mode(&self) -> Option<LinkMode> {
        if self.tap {
            Some(LinkMode::Tap)
        } else if self.tun {
            Some(LinkMode::Tun)
        } else {
            None
        }
    }
}
