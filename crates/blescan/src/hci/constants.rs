//! HCI protocol constants
//!
//! This module contains constants used in the Bluetooth HCI protocol and the
//! Linux raw HCI socket interface.

// Bluetooth socket constants
pub const AF_BLUETOOTH: i32 = 31;
pub const BTPROTO_HCI: i32 = 1;
pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;
pub const HCI_CHANNEL_RAW: u16 = 0;

// Controller enumeration (from <bluetooth/hci.h>)
pub const HCI_MAX_DEV: usize = 16;
pub const HCI_UP: u32 = 0;
pub const HCIGETDEVLIST: u64 = 0x8004_48D2; // _IOR('H', 210, int)
pub const HCIGETDEVINFO: u64 = 0x8004_48D3; // _IOR('H', 211, int)

// HCI packet types
pub const HCI_COMMAND_PKT: u8 = 0x01;
pub const HCI_EVENT_PKT: u8 = 0x04;

// Size limits
pub const HCI_EVENT_HDR_SIZE: usize = 2;
pub const HCI_MAX_EVENT_SIZE: usize = 260;

// Opcode Group Field
pub const OGF_LE: u8 = 0x08;

// LE Command OCF values (OGF: 0x08)
pub const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
pub const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

// HCI Events
pub const EVT_CMD_COMPLETE: u8 = 0x0E;
pub const EVT_CMD_STATUS: u8 = 0x0F;
pub const EVT_LE_META_EVENT: u8 = 0x3E;

// LE Meta Events
pub const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// Advertising event types
pub const ADV_IND: u8 = 0x00;
pub const ADV_DIRECT_IND: u8 = 0x01;
pub const ADV_SCAN_IND: u8 = 0x02;
pub const ADV_NONCONN_IND: u8 = 0x03;
pub const SCAN_RSP: u8 = 0x04;

// Address types
pub const PUBLIC_DEVICE_ADDRESS: u8 = 0x00;
pub const RANDOM_DEVICE_ADDRESS: u8 = 0x01;
pub const PUBLIC_IDENTITY_ADDRESS: u8 = 0x02;
pub const RANDOM_IDENTITY_ADDRESS: u8 = 0x03;

/// RSSI value the controller reports when no reading is available.
pub const RSSI_UNAVAILABLE: i8 = 127;

// LE scan parameters
pub const LE_SCAN_INTERVAL: u16 = 0x0010; // 10 ms
pub const LE_SCAN_WINDOW: u16 = 0x0010; // 10 ms
pub const LE_FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

// Advertising Data Types
pub const AD_TYPE_FLAGS: u8 = 0x01;
pub const AD_TYPE_16BIT_SERVICE_UUID_PARTIAL: u8 = 0x02;
pub const AD_TYPE_16BIT_SERVICE_UUID_COMPLETE: u8 = 0x03;
pub const AD_TYPE_32BIT_SERVICE_UUID_PARTIAL: u8 = 0x04;
pub const AD_TYPE_32BIT_SERVICE_UUID_COMPLETE: u8 = 0x05;
pub const AD_TYPE_128BIT_SERVICE_UUID_PARTIAL: u8 = 0x06;
pub const AD_TYPE_128BIT_SERVICE_UUID_COMPLETE: u8 = 0x07;
pub const AD_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const AD_TYPE_SERVICE_DATA: u8 = 0x16;
pub const AD_TYPE_MANUFACTURER_SPECIFIC: u8 = 0xFF;
