use tun2::{Configuration, Layer};

use crate::config::{LinkMode, ReflectorConfig};
use crate::error::Error;
use crate::forward::transport::{PacketTransport, TunTransport};

/// Allocates the TUN/TAP interface described by `config` and wraps it as a packet transport.
/// Must be called from within the runtime.
pub fn open_transport(config: &ReflectorConfig) -> Result<impl PacketTransport, Error> {
    let tun_config = tun_configuration(config);
    let device = tun2::create(&tun_config).map_err(|source| Error::Device {
        name: config.interface.clone(),
        source,
    })?;
    TunTransport::new(device).map_err(Error::Readiness)
}

fn tun_configuration(config: &ReflectorConfig) -> Configuration {
    let mut tun_config = Configuration::default();
    tun_config
        .tun_name(&config.interface)
        .layer(layer(config.mode))
        .mtu(config.mtu.into())
        .up();

    if let Some(address) = config.address {
        tun_config.address(address).netmask(config.netmask);
    }

    // frames must start right at the IP (or Ethernet) header
    #[cfg(target_os = "linux")]
    tun_config.platform_config(|platform| {
        platform.packet_information(false);
    });

    tun_config
}

fn layer(mode: LinkMode) -> Layer {
    match mode {
        LinkMode::Tun => Layer::L3,
        LinkMode::Tap => Layer::L2,
    }
}
