//! Bring-up of the full chain: HID bridge, SMBus engine, expander

use crate::bridge::{BridgeConfig, Cp2112Bridge};
use crate::expander::Mcp23017;
use crate::ports::{DeviceConnector, I2cBus, PortSource};
use chargewatch_errors::Result;
use chargewatch_hid_common::{HidApiTransport, HidTransport};
use hid_cp2112_protocol::{CP2112_PRODUCT_ID, CP2112_VENDOR_ID};
use tracing::info;

/// Configure the bridge and initialise the expander behind it.
pub fn open_charger<T: HidTransport + 'static>(
    transport: T,
    bridge_config: BridgeConfig,
    bus_speed_hz: u32,
) -> Result<Mcp23017<Cp2112Bridge<T>>> {
    let mut bridge = Cp2112Bridge::new(transport, bridge_config);
    bridge.configure(bus_speed_hz)?;
    let mut expander = Mcp23017::new(bridge);
    expander.init()?;
    Ok(expander)
}

/// Opens the first CP2112 on the system through hidapi.
#[derive(Debug, Clone)]
pub struct HidApiConnector {
    pub serial: Option<String>,
    pub bus_speed_hz: u32,
    pub bridge_config: BridgeConfig,
}

impl HidApiConnector {
    pub fn new(serial: Option<String>, bus_speed_hz: u32) -> Self {
        Self {
            serial,
            bus_speed_hz,
            bridge_config: BridgeConfig::default(),
        }
    }
}

impl DeviceConnector for HidApiConnector {
    fn connect(&mut self) -> Result<Box<dyn PortSource>> {
        let transport =
            HidApiTransport::open(CP2112_VENDOR_ID, CP2112_PRODUCT_ID, self.serial.as_deref())?;
        let expander = open_charger(transport, self.bridge_config.clone(), self.bus_speed_hz)?;
        info!(bus = %expander.bus().transport().device_info().display_name(), "Charger ready");
        Ok(Box::new(expander))
    }

    fn describe(&self) -> String {
        match &self.serial {
            Some(serial) => format!("CP2112 {CP2112_VENDOR_ID:04x}:{CP2112_PRODUCT_ID:04x} ({serial})"),
            None => format!("CP2112 {CP2112_VENDOR_ID:04x}:{CP2112_PRODUCT_ID:04x}"),
        }
    }
}
