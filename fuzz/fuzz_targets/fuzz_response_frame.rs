#![no_main]

use coil_modbus::frame::{decode_read_coils_response, decode_response, decode_write_coil_response};
use coil_modbus::ModbusFunction;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = decode_response(data) else {
        return;
    };

    if let Ok(payload) = frame.expect_function(ModbusFunction::WriteSingleCoil) {
        let _ = decode_write_coil_response(payload);
    }
    if let Ok(payload) = frame.expect_function(ModbusFunction::ReadCoils) {
        let quantity = (frame.transaction_id() % 2000).max(1);
        let _ = decode_read_coils_response(payload, quantity);
    }
});
