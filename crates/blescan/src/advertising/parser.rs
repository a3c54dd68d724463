//! LE Advertising Report decoding

use super::{AdvertisingResponse, Flags, LeAdvertisingEventType, Name};
use crate::address::{AddressType, BdAddr};
use crate::error::ProtocolError;
use crate::hci::constants::*;
use crate::uuid::Uuid;
use byteorder::ReadBytesExt;
use std::io::Cursor;

/// Bounds-checked reader that reports failures by field name and offset.
struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    fn offset(&self) -> usize {
        self.cursor.position() as usize
    }

    fn remaining(&self) -> usize {
        self.cursor.get_ref().len() - self.offset()
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        let offset = self.offset();
        self.cursor
            .read_u8()
            .map_err(|_| ProtocolError::Truncated { field, offset })
    }

    fn i8(&mut self, field: &'static str) -> Result<i8, ProtocolError> {
        let offset = self.offset();
        self.cursor
            .read_i8()
            .map_err(|_| ProtocolError::Truncated { field, offset })
    }

    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        let offset = self.offset();
        if self.remaining() < len {
            return Err(ProtocolError::Truncated { field, offset });
        }
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((offset + len) as u64);
        Ok(&data[offset..offset + len])
    }
}

/// Decodes an LE Advertising Report event into one response per report.
///
/// `packet` is a whole packet as read from a raw HCI socket, starting with
/// the packet-type indicator. Any structural problem fails the whole packet;
/// no partial result is returned.
pub fn parse_packet(packet: &[u8]) -> Result<Vec<AdvertisingResponse>, ProtocolError> {
    let mut r = Reader::new(packet);

    let ptype = r.u8("packet type")?;
    if ptype != HCI_EVENT_PKT {
        return Err(ProtocolError::NotAnEvent(ptype));
    }
    let event_code = r.u8("event code")?;
    if event_code != EVT_LE_META_EVENT {
        return Err(ProtocolError::UnexpectedEvent(event_code));
    }
    let declared = r.u8("parameter length")? as usize;
    if declared != r.remaining() {
        return Err(ProtocolError::ParameterLength {
            declared,
            actual: r.remaining(),
        });
    }
    let subevent = r.u8("subevent")?;
    if subevent != EVT_LE_ADVERTISING_REPORT {
        return Err(ProtocolError::UnexpectedSubevent(subevent));
    }

    let num_reports = r.u8("report count")?;
    let mut responses = Vec::with_capacity(num_reports as usize);
    for _ in 0..num_reports {
        responses.push(parse_report(&mut r)?);
    }

    if r.remaining() != 0 {
        return Err(ProtocolError::TrailingBytes {
            count: r.remaining(),
            offset: r.offset(),
        });
    }
    Ok(responses)
}

fn parse_report(r: &mut Reader<'_>) -> Result<AdvertisingResponse, ProtocolError> {
    let offset = r.offset();
    let value = r.u8("event type")?;
    let event_type = LeAdvertisingEventType::try_from(value)
        .map_err(|value| ProtocolError::UnknownEventType { value, offset })?;

    let offset = r.offset();
    let value = r.u8("address type")?;
    let address_type = AddressType::try_from(value)
        .map_err(|value| ProtocolError::UnknownAddressType { value, offset })?;

    let mut address = [0u8; 6];
    address.copy_from_slice(r.take(6, "address")?);

    let len = r.u8("data length")? as usize;
    let data_offset = r.offset();
    let data = r.take(len, "advertising data")?;
    let rssi = r.i8("rssi")?;

    let mut response =
        AdvertisingResponse::new(BdAddr::new(address), address_type, event_type, rssi);
    decode_ad_structures(&mut response, data, data_offset)?;
    Ok(response)
}

/// Walks the AD structures in `data`; `base` is its offset in the packet.
fn decode_ad_structures(
    response: &mut AdvertisingResponse,
    data: &[u8],
    base: usize,
) -> Result<(), ProtocolError> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;

        // A zero length ends the data early; only padding may follow. The
        // terminator and padding are kept as the last raw entry.
        if len == 0 {
            if let Some(pos) = data[i + 1..].iter().position(|&b| b != 0) {
                return Err(ProtocolError::NonZeroPadding {
                    offset: base + i + 1 + pos,
                });
            }
            response.raw_packet.push(data[i..].to_vec());
            break;
        }

        let remaining = data.len() - i - 1;
        if len > remaining {
            return Err(ProtocolError::AdOverrun {
                offset: base + i,
                declared: len,
                remaining,
            });
        }

        let structure = &data[i..i + 1 + len];
        response.raw_packet.push(structure.to_vec());
        apply_ad_structure(response, structure[1], &structure[2..], base + i)?;
        i += 1 + len;
    }
    Ok(())
}

fn apply_ad_structure(
    response: &mut AdvertisingResponse,
    ad_type: u8,
    payload: &[u8],
    offset: usize,
) -> Result<(), ProtocolError> {
    match ad_type {
        AD_TYPE_FLAGS => {
            if response.flags.is_some() {
                return Err(ProtocolError::DuplicateFlags { offset });
            }
            response.flags = Some(Flags::new(payload.to_vec()));
        }

        AD_TYPE_16BIT_SERVICE_UUID_PARTIAL | AD_TYPE_16BIT_SERVICE_UUID_COMPLETE => {
            push_uuids(response, payload, 2, offset)?;
            response.uuid_16_bit_complete |= ad_type == AD_TYPE_16BIT_SERVICE_UUID_COMPLETE;
        }
        AD_TYPE_32BIT_SERVICE_UUID_PARTIAL | AD_TYPE_32BIT_SERVICE_UUID_COMPLETE => {
            push_uuids(response, payload, 4, offset)?;
            response.uuid_32_bit_complete |= ad_type == AD_TYPE_32BIT_SERVICE_UUID_COMPLETE;
        }
        AD_TYPE_128BIT_SERVICE_UUID_PARTIAL | AD_TYPE_128BIT_SERVICE_UUID_COMPLETE => {
            push_uuids(response, payload, 16, offset)?;
            response.uuid_128_bit_complete |= ad_type == AD_TYPE_128BIT_SERVICE_UUID_COMPLETE;
        }

        // A second name has nowhere typed to go; keep it with the unparsed data.
        AD_TYPE_SHORT_LOCAL_NAME | AD_TYPE_COMPLETE_LOCAL_NAME if response.local_name.is_none() => {
            response.local_name = Some(Name {
                name: String::from_utf8_lossy(payload).into_owned(),
                complete: ad_type == AD_TYPE_COMPLETE_LOCAL_NAME,
            });
        }

        AD_TYPE_MANUFACTURER_SPECIFIC => {
            response.manufacturer_specific_data.push(payload.to_vec());
        }
        AD_TYPE_SERVICE_DATA => {
            response.service_data.push(payload.to_vec());
        }

        _ => {
            response
                .unparsed_data_with_types
                .push((ad_type, payload.to_vec()));
        }
    }
    Ok(())
}

fn push_uuids(
    response: &mut AdvertisingResponse,
    payload: &[u8],
    width: usize,
    offset: usize,
) -> Result<(), ProtocolError> {
    if payload.len() % width != 0 {
        return Err(ProtocolError::UuidListLength {
            width: width * 8,
            len: payload.len(),
            offset,
        });
    }
    response.uuids.extend(
        payload
            .chunks_exact(width)
            .filter_map(Uuid::try_from_slice_le),
    );
    Ok(())
}
