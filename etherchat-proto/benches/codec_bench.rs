use criterion::{criterion_group, criterion_main, Criterion};
use etherchat_proto::{Frame, FrameType, MacAddr};
use std::hint::black_box;

fn bench_codec(c: &mut Criterion) {
    let frame = Frame {
        dst: MacAddr::BROADCAST,
        src: MacAddr::new([0x02, 0x00, 0x5E, 0x10, 0x00, 0x01]),
        frame_type: FrameType::File,
        transfer_id: 7,
        fragment_no: 3,
        total_frags: 12,
        payload: vec![0xA5; 1400],
    };

    c.bench_function("encode_1400", |b| {
        b.iter(|| black_box(&frame).encode().unwrap())
    });

    let bytes = frame.encode().unwrap();
    c.bench_function("decode_1400", |b| {
        b.iter(|| Frame::decode(black_box(&bytes)).unwrap())
    });
}

criterion_group!(benches, bench_codec);
criterion_main!(benches);
