// Transaction store benchmarks.
//
// Covers batch saves of one block at various sizes and the three lookup
// paths against a pre-populated temporary database.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};

use tessera_protocol::storage::{LedgerDb, TransactionStore};
use tessera_protocol::transaction::{
    Attachment, Message, PublicKey, Transaction, TransactionBuilder,
};

fn block_of(block_id: u64, size: u32) -> Vec<Transaction> {
    (0..size)
        .map(|i| {
            TransactionBuilder::new(Attachment::OrdinaryPayment)
                .sender_public_key(PublicKey::new([(i % 251) as u8; 32]))
                .recipient_id(u64::from(i) + 1)
                .amount(i64::from(i) * 100)
                .fee(100_000_000)
                .timestamp(40_000_000 + i)
                .message(Message::text("bench"))
                .block(block_id, 1, 40_000_000)
                .build()
                .unwrap()
        })
        .collect()
}

fn bench_save_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("store/save_all");

    for size in [10u32, 100, 500] {
        group.throughput(Throughput::Elements(u64::from(size)));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let store = TransactionStore::new(LedgerDb::open_temporary().unwrap());
                    (store, block_of(1, size))
                },
                |(store, batch)| store.save_all(&batch).unwrap(),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn bench_lookups(c: &mut Criterion) {
    let store = TransactionStore::new(LedgerDb::open_temporary().unwrap());
    let batch = block_of(9, 200);
    store.save_all(&batch).unwrap();
    let probe = &batch[100];

    c.bench_function("store/find_by_id", |b| {
        b.iter(|| store.find_by_id(probe.id()).unwrap());
    });
    c.bench_function("store/find_by_full_hash", |b| {
        b.iter(|| store.find_by_full_hash(probe.full_hash()).unwrap());
    });
    c.bench_function("store/find_by_block_200", |b| {
        b.iter(|| store.find_by_block(9).unwrap());
    });
}

criterion_group!(benches, bench_save_all, bench_lookups);
criterion_main!(benches);
