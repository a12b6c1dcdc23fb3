//! Property-based tests for the frame codec using proptest

use coil_modbus::frame::{
    decode_read_coils_response, decode_response, decode_write_coil_response, encode_pdu,
    encode_request,
};
use coil_modbus::{ModbusError, ModbusFunction, PduBuilder, TransactionTracker};
use proptest::prelude::*;

/// Pack coil states LSB-first, optionally setting the padding bits
fn pack_coils(coils: &[bool], dirty_padding: bool) -> Vec<u8> {
    let mut bytes = vec![0u8; coils.len().div_ceil(8)];
    for (i, &coil) in coils.iter().enumerate() {
        if coil {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    if dirty_padding && coils.len() % 8 != 0 {
        if let Some(last) = bytes.last_mut() {
            *last |= 0xFF << (coils.len() % 8);
        }
    }
    bytes
}

fn coils_strategy() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..=2000)
}

proptest! {
    #[test]
    fn write_coil_request_round_trips(
        tid in any::<u16>(),
        unit in any::<u8>(),
        address in any::<u16>(),
        value in any::<bool>(),
    ) {
        let pdu = PduBuilder::build_write_single_coil(address, value).unwrap();
        let bytes = encode_pdu(tid, unit, &pdu).unwrap();

        let frame = decode_response(&bytes).unwrap();
        prop_assert_eq!(frame.transaction_id(), tid);
        prop_assert_eq!(frame.unit_id(), unit);
        prop_assert_eq!(frame.function, ModbusFunction::WriteSingleCoil.to_u8());

        let payload = frame.expect_function(ModbusFunction::WriteSingleCoil).unwrap();
        prop_assert_eq!(decode_write_coil_response(payload).unwrap(), (address, value));
    }

    #[test]
    fn read_coils_unpacks_exactly_quantity(
        coils in coils_strategy(),
        dirty_padding in any::<bool>(),
    ) {
        let data = pack_coils(&coils, dirty_padding);
        let mut payload = vec![data.len() as u8];
        payload.extend_from_slice(&data);

        let decoded = decode_read_coils_response(&payload, coils.len() as u16).unwrap();
        prop_assert_eq!(decoded, coils);
    }

    #[test]
    fn length_field_must_match_pdu(
        payload in prop::collection::vec(any::<u8>(), 0..64),
        delta in prop_oneof![-3i32..0, 1i32..4],
    ) {
        let mut bytes = encode_request(1, 1, 0x01, &payload).unwrap().to_vec();
        let length = u16::from_be_bytes([bytes[4], bytes[5]]) as i32;
        let forged = (length + delta).max(0) as u16;
        bytes[4..6].copy_from_slice(&forged.to_be_bytes());

        let is_framing_error = matches!(decode_response(&bytes), Err(ModbusError::Framing { .. }));
        prop_assert!(is_framing_error);
    }

    #[test]
    fn mismatched_transaction_ids_are_rejected(sent in any::<u16>(), received in any::<u16>()) {
        let result = TransactionTracker::validate(sent, received);
        prop_assert_eq!(result.is_ok(), sent == received);
    }
}
