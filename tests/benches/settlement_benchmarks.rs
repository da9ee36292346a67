//! # Commitment Finality Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Single submission below threshold | < 10µs |
//! | Cascade over a backlog of qualified heights | linear in depth |
//! | Threshold arithmetic | < 10ns |

use commitment_finality::domain::{AcceptanceEngine, ConsensusState};
use commitment_finality::{
    AttesterId, BlockCommitment, CustodianId,
    InMemoryStakeLedger, ManualClock, NoopSlashingHook, SettlementConfig, StakeOracle,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

const TOKEN: CustodianId = CustodianId([0x7a; 20]);

fn attester(n: u8) -> AttesterId {
    AttesterId([n; 32])
}

fn staked_ledger(attesters: u8) -> InMemoryStakeLedger {
    let ledger = InMemoryStakeLedger::new(Arc::new(ManualClock::new(0)));
    let config = SettlementConfig::default().with_custodians(vec![TOKEN]);
    ledger
        .register_domain(&config.registration())
        .expect("register domain");
    for n in 1..=attesters {
        ledger.stake(TOKEN, attester(n), 10).expect("stake");
    }
    ledger
}

// ============================================================================
// Submission
// ============================================================================

fn bench_single_submission(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement-submission");
    group.measurement_time(Duration::from_secs(5));

    for attesters in [4u8, 16, 64] {
        let ledger = staked_ledger(attesters);
        let engine = AcceptanceEngine::new(&ledger, &NoopSlashingHook);

        group.bench_with_input(
            BenchmarkId::new("below_threshold", attesters),
            &attesters,
            |b, _| {
                b.iter_batched(
                    || ConsensusState::new(10, 0),
                    |mut state| {
                        let commitment = BlockCommitment::new(1, [1; 32], [1; 32]);
                        black_box(engine.submit(&mut state, attester(1), commitment).is_ok())
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

// ============================================================================
// Cascade
// ============================================================================

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("settlement-cascade");
    group.measurement_time(Duration::from_secs(5));

    let ledger = staked_ledger(3);
    let engine = AcceptanceEngine::new(&ledger, &NoopSlashingHook);

    for depth in [8u64, 64, 256] {
        // Heights 2..=depth already carry a supermajority; the last
        // commitment at height 1 releases the whole backlog.
        let mut primed = ConsensusState::new(depth + 1, 0);
        for height in 2..=depth {
            for n in 1..=3 {
                let commitment = BlockCommitment::new(height, [2; 32], [2; 32]);
                engine
                    .submit(&mut primed, attester(n), commitment)
                    .expect("prime backlog");
            }
        }
        for n in 1..=2 {
            engine
                .submit(&mut primed, attester(n), BlockCommitment::new(1, [1; 32], [1; 32]))
                .expect("prime height 1");
        }

        group.throughput(Throughput::Elements(depth));
        group.bench_with_input(BenchmarkId::new("release_backlog", depth), &depth, |b, _| {
            b.iter_batched(
                || primed.clone(),
                |mut state| {
                    let commitment = BlockCommitment::new(1, [1; 32], [1; 32]);
                    let outcome = engine
                        .submit(&mut state, attester(3), commitment)
                        .expect("cascade");
                    black_box(outcome.accepted.len())
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// Threshold
// ============================================================================

fn bench_threshold(c: &mut Criterion) {
    c.bench_function("supermajority_threshold", |b| {
        b.iter(|| {
            commitment_finality::domain::supermajority_threshold(black_box(u128::MAX - 7))
        })
    });
}

criterion_group!(benches, bench_single_submission, bench_cascade, bench_threshold);
criterion_main!(benches);
