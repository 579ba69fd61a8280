// Wire codec benchmarks.
//
// Covers full-transaction encoding and decoding, identity derivation via
// build(), and decoding throughput as the attachment blob grows.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tessera_protocol::transaction::{
    Attachment, EncryptedData, EncryptedMessage, Message, PublicKey, Signature, Transaction,
    TransactionBuilder,
};

fn decorated(message_len: usize) -> Transaction {
    TransactionBuilder::new(Attachment::OrdinaryPayment)
        .sender_public_key(PublicKey::new([7; 32]))
        .recipient_id(1_234_567)
        .amount(5_000_000)
        .fee(100_000_000)
        .timestamp(40_000_000)
        .signature(Signature::new([3; 64]))
        .ec_block_height(720)
        .ec_block_id(0xABCD)
        .message(Message::new(vec![0x42; message_len]))
        .encrypted_message(EncryptedMessage::new(
            EncryptedData::new(vec![0x24; message_len], [9; 32]),
            false,
        ))
        .build()
        .unwrap()
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("codec/build_payment", |b| {
        b.iter(|| decorated(64));
    });
}

fn bench_encode(c: &mut Criterion) {
    let tx = decorated(64);
    c.bench_function("codec/to_bytes", |b| {
        b.iter(|| tx.to_bytes());
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec/from_bytes");

    for len in [0, 128, 512, 1000] {
        let bytes = decorated(len).to_bytes();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &bytes, |b, bytes| {
            b.iter(|| Transaction::from_bytes(bytes).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_encode, bench_decode);
criterion_main!(benches);
