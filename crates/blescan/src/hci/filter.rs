//! Kernel-side HCI socket filter
//!
//! Mirrors `struct hci_filter` so it can be read and written with
//! `getsockopt`/`setsockopt(SOL_HCI, HCI_FILTER)`.

const HCI_FLT_TYPE_BITS: u8 = 31;
const HCI_FLT_EVENT_BITS: u8 = 63;

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    /// A filter that passes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass packets of the given HCI packet type.
    pub fn set_ptype(&mut self, ptype: u8) -> &mut Self {
        self.type_mask |= 1 << (ptype & HCI_FLT_TYPE_BITS);
        self
    }

    /// Pass events with the given event code.
    pub fn set_event(&mut self, event: u8) -> &mut Self {
        let bit = event & HCI_FLT_EVENT_BITS;
        self.event_mask[(bit >> 5) as usize] |= 1 << (bit & 31);
        self
    }

    /// Restrict Command Complete/Status events to one opcode.
    pub fn set_opcode(&mut self, opcode: u16) -> &mut Self {
        self.opcode = opcode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hci::constants::*;

    #[test]
    fn test_le_meta_filter_bits() {
        let mut filter = HciFilter::new();
        filter
            .set_ptype(HCI_EVENT_PKT)
            .set_event(EVT_LE_META_EVENT);

        assert_eq!(filter.type_mask, 1 << 4);
        assert_eq!(filter.event_mask, [0, 1 << (0x3E - 32)]);
        assert_eq!(filter.opcode, 0);

        filter.set_event(EVT_CMD_COMPLETE).set_opcode(0x200C);
        assert_eq!(filter.event_mask, [1 << EVT_CMD_COMPLETE, 1 << (0x3E - 32)]);
        assert_eq!(filter.opcode, 0x200C);
    }

    #[test]
    fn test_layout_matches_kernel() {
        assert_eq!(std::mem::size_of::<HciFilter>(), 16);
    }
}
