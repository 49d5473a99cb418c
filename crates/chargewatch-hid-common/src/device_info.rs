//! Device information for an attached HID bridge

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial_number: Option<String>,
    pub manufacturer: Option<String>,
    pub product_name: Option<String>,
    pub path: String,
}

impl HidDeviceInfo {
    pub fn new(vendor_id: u16, product_id: u16, path: impl Into<String>) -> Self {
        Self {
            vendor_id,
            product_id,
            serial_number: None,
            manufacturer: None,
            product_name: None,
            path: path.into(),
        }
    }

    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = Some(serial.into());
        self
    }

    pub fn with_product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    /// `true` when no serial filter is given or the serial matches exactly.
    pub fn matches_serial(&self, serial: Option<&str>) -> bool {
        match serial {
            None => true,
            Some(wanted) => self.serial_number.as_deref() == Some(wanted),
        }
    }

    pub fn display_name(&self) -> String {
        let base = self
            .product_name
            .clone()
            .or_else(|| self.manufacturer.clone())
            .unwrap_or_else(|| format!("{:04x}:{:04x}", self.vendor_id, self.product_id));
        match &self.serial_number {
            Some(serial) if !serial.is_empty() => format!("{base} ({serial})"),
            _ => base,
        }
    }
}
