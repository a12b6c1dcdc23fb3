use criterion::{black_box, criterion_group, criterion_main, Criterion};

use coil_modbus::frame::{decode_read_coils_response, decode_response, encode_pdu};
use coil_modbus::PduBuilder;

fn bench_encode_write_coil(c: &mut Criterion) {
    c.bench_function("encode_write_coil", |b| {
        b.iter(|| {
            let pdu = PduBuilder::build_write_single_coil(black_box(1), black_box(true)).unwrap();
            encode_pdu(black_box(1), black_box(1), &pdu).unwrap()
        })
    });
}

fn bench_decode_response(c: &mut Criterion) {
    let frame = [
        0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x01, 0x05, 0x00, 0x01, 0xFF, 0x00,
    ];
    c.bench_function("decode_write_coil_response", |b| {
        b.iter(|| decode_response(black_box(&frame)).unwrap())
    });
}

fn bench_unpack_coils(c: &mut Criterion) {
    let mut payload = vec![250u8];
    payload.extend((0..250).map(|i| i as u8));
    c.bench_function("unpack_2000_coils", |b| {
        b.iter(|| decode_read_coils_response(black_box(&payload), black_box(2000)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_encode_write_coil,
    bench_decode_response,
    bench_unpack_coils
);
criterion_main!(benches);
