//! USB identifiers and report IDs for the CP2112

pub const CP2112_VENDOR_ID: u16 = 0x10C4;
pub const CP2112_PRODUCT_ID: u16 = 0xEA90;

pub mod report_ids {
    pub const GPIO_CONFIG: u8 = 0x02;
    pub const SMBUS_CONFIG: u8 = 0x06;
    pub const DATA_READ_REQUEST: u8 = 0x10;
    pub const DATA_WRITE_READ_REQUEST: u8 = 0x11;
    pub const DATA_READ_FORCE_SEND: u8 = 0x12;
    pub const DATA_READ_RESPONSE: u8 = 0x13;
    pub const DATA_WRITE: u8 = 0x14;
    pub const TRANSFER_STATUS_REQUEST: u8 = 0x15;
    pub const TRANSFER_STATUS_RESPONSE: u8 = 0x16;
    pub const CANCEL_TRANSFER: u8 = 0x17;
}

/// Feature report lengths, report ID included.
pub mod feature_lengths {
    pub const GPIO_CONFIG: usize = 5;
    pub const SMBUS_CONFIG: usize = 14;
}
