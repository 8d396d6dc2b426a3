//! # Strata Publication Benchmarks
//!
//! | Path | Measured |
//! |------|----------|
//! | Full flow | Encode → Register → Upload → Certify on the devnet |
//! | Retrieval | Structured fetch plus resource materialization |

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_publisher::{
    AccountAddress, Amount, DevnetLedger, DevnetStorage, FlowRequest, MediaType,
    MockResourceStore, PublicationApi, PublicationService, PublisherConfig, RetrievalApi,
    RetrievalService, SourceObject, TracingStatusReporter,
};
use tokio::runtime::Runtime;

struct Bench {
    owner: AccountAddress,
    storage: Arc<DevnetStorage>,
    publisher: PublicationService<DevnetStorage, DevnetLedger>,
}

fn devnet(shards: usize) -> Bench {
    let owner = AccountAddress::new("0xbench");
    let ledger = Arc::new(DevnetLedger::new(owner.clone(), Amount::from_base_units(1)));
    ledger.fund(&owner, Amount::from_coins(1_000_000));
    let storage = Arc::new(DevnetStorage::new(Arc::clone(&ledger), shards));
    let publisher = PublicationService::new(
        PublisherConfig::default(),
        Arc::clone(&storage),
        ledger,
        Arc::new(TracingStatusReporter),
    );
    Bench {
        owner,
        storage,
        publisher,
    }
}

fn bench_full_flow(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("publish-full-flow");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_024usize, 64 * 1_024, 1_024 * 1_024] {
        let bench = devnet(10);
        let mut counter = 0u64;
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("devnet", size), &size, |b, &size| {
            b.iter(|| {
                // Distinct bytes per iteration so every flow registers a new blob.
                counter += 1;
                let mut bytes = vec![0u8; size];
                bytes[..8].copy_from_slice(&counter.to_le_bytes());
                let source = SourceObject::new(bytes, "bench.bin", MediaType::octet_stream());
                let request = FlowRequest::new(source, 1, bench.owner.clone());
                black_box(rt.block_on(bench.publisher.run_full_flow(request)).is_ok())
            })
        });
    }
    group.finish();
}

fn bench_retrieval(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let bench = devnet(4);
    let source = SourceObject::new(vec![42u8; 256 * 1_024], "blob.bin", MediaType::octet_stream());
    let outcome = rt
        .block_on(
            bench
                .publisher
                .run_full_flow(FlowRequest::new(source, 1, bench.owner.clone())),
        )
        .expect("publish");
    let id = outcome
        .primary_content_id()
        .expect("content id")
        .to_string();

    let retrieval = RetrievalService::new(
        Arc::clone(&bench.storage),
        Arc::new(MockResourceStore::default()),
        Arc::new(TracingStatusReporter),
    );

    c.bench_function("retrieval-structured-fetch", |b| {
        b.iter(|| black_box(rt.block_on(retrieval.fetch_by_identifier(&id)).is_ok()))
    });
}

criterion_group!(benches, bench_full_flow, bench_retrieval);
criterion_main!(benches);
