//! # Integration Test Flows
//!
//! The settlement service wired to the in-memory stake ledger, a manual clock
//! and the event notifiers.
//!
//! ## Flows Tested:
//!
//! 1. **Cascade**: commitments for later heights wait, then finalize in one submission
//! 2. **Minority**: deviating and absent attesters reach the slashing hook
//! 3. **Epochs**: the ledger is rolled forward before a height is tallied
//! 4. **Atomicity**: a failed rollover or slashing hook leaves no trace of the submission
//! 5. **Batches**: processing stops at the first invalid item
//! 6. **Concurrency**: parallel submitters are serialized by the service

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;
    use tokio_stream::StreamExt;

    use commitment_finality::domain::{HeightState, MinorityOffense, MinorityRecord};
    use commitment_finality::events::{BlockAcceptedEvent, CommitmentBatch, SettlementEvent};
    use commitment_finality::{
        AttesterId, BlockCommitment, BroadcastNotifier, CommitmentApi, CustodianId,
        DomainRegistration, Epoch, InMemoryEventLog, InMemoryStakeLedger, ManualClock,
        MinorityRecorder, NoopSlashingHook, NotificationSink, SettlementConfig, SettlementError,
        SettlementResult, SettlementService, SignedCommitment, SlashingHook, Stake, StakeOracle,
    };

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const TOKEN: CustodianId = CustodianId([0x7a; 20]);
    const EPOCH_SECS: u64 = 100;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    }

    fn attester(n: u8) -> AttesterId {
        AttesterId([n; 32])
    }

    fn config() -> SettlementConfig {
        SettlementConfig::default()
            .with_tolerance(5)
            .with_epoch_duration(EPOCH_SECS)
            .with_custodians(vec![TOKEN])
    }

    struct Harness<O: StakeOracle, H: SlashingHook, N: NotificationSink> {
        service: Arc<SettlementService<O, H, N>>,
        ledger: Arc<InMemoryStakeLedger>,
        clock: Arc<ManualClock>,
    }

    /// Service over a fresh ledger at time zero, with attesters 1..=n staked
    /// in registry order.
    fn harness<O, H, N>(
        oracle: impl FnOnce(Arc<InMemoryStakeLedger>) -> Arc<O>,
        slashing: Arc<H>,
        notifier: Arc<N>,
        stakes: &[Stake],
    ) -> Harness<O, H, N>
    where
        O: StakeOracle,
        H: SlashingHook,
        N: NotificationSink,
    {
        init_tracing();
        let clock = Arc::new(ManualClock::new(0));
        let ledger = Arc::new(InMemoryStakeLedger::new(clock.clone()));
        let service =
            SettlementService::new(config(), oracle(ledger.clone()), slashing, notifier).unwrap();
        for (i, stake) in stakes.iter().enumerate() {
            ledger.stake(TOKEN, attester(i as u8 + 1), *stake).unwrap();
        }
        Harness {
            service: Arc::new(service),
            ledger,
            clock,
        }
    }

    fn logged(
        stakes: &[Stake],
    ) -> (
        Harness<InMemoryStakeLedger, NoopSlashingHook, InMemoryEventLog>,
        Arc<InMemoryEventLog>,
    ) {
        let log = Arc::new(InMemoryEventLog::new());
        let h = harness(|l| l, Arc::new(NoopSlashingHook), log.clone(), stakes);
        (h, log)
    }

    /// Ledger wrapper whose rollovers can be made to fail.
    struct FlakyOracle {
        inner: Arc<InMemoryStakeLedger>,
        fail_rollover: Arc<AtomicBool>,
    }

    impl StakeOracle for FlakyOracle {
        fn register_domain(&self, registration: &DomainRegistration) -> SettlementResult<()> {
            self.inner.register_domain(registration)
        }

        fn stake_for_attester_at_epoch(
            &self,
            epoch: Epoch,
            custodian: &CustodianId,
            attester: &AttesterId,
        ) -> SettlementResult<Stake> {
            self.inner
                .stake_for_attester_at_epoch(epoch, custodian, attester)
        }

        fn total_stake_for_epoch(
            &self,
            epoch: Epoch,
            custodian: &CustodianId,
        ) -> SettlementResult<Stake> {
            self.inner.total_stake_for_epoch(epoch, custodian)
        }

        fn custodians_for_domain(&self) -> SettlementResult<Vec<CustodianId>> {
            self.inner.custodians_for_domain()
        }

        fn attesters_for_domain(&self) -> SettlementResult<Vec<AttesterId>> {
            self.inner.attesters_for_domain()
        }

        fn current_epoch(&self) -> SettlementResult<Epoch> {
            self.inner.current_epoch()
        }

        fn current_epoch_by_time(&self) -> SettlementResult<Epoch> {
            self.inner.current_epoch_by_time()
        }

        fn roll_over_epoch(&self, epoch: Epoch) -> SettlementResult<()> {
            if self.fail_rollover.load(Ordering::SeqCst) {
                return Err(SettlementError::StakeQueryFailed {
                    reason: "ledger unavailable".into(),
                });
            }
            self.inner.roll_over_epoch(epoch)
        }
    }

    // =============================================================================
    // INTEGRATION TESTS: CASCADE
    // =============================================================================

    /// Later heights wait for the frontier, then finalize together
    #[tokio::test]
    async fn test_cascade_finalizes_waiting_heights() {
        let notifier = Arc::new(BroadcastNotifier::from_config(
            &config().with_event_channel_capacity(64),
        ));
        assert_eq!(notifier.capacity(), 64);
        let mut stream = notifier.subscribe();
        let h = harness(|l| l, Arc::new(NoopSlashingHook), notifier.clone(), &[10, 10, 9]);
        let service = &h.service;

        for height in [2, 3] {
            for n in [1, 2] {
                service
                    .submit_commitment(attester(n), height, [height as u8; 32], [0xb0; 32])
                    .await
                    .unwrap();
            }
        }
        assert_eq!(service.get_last_accepted_height().await, 0);
        assert_eq!(service.get_height_state(2).await, HeightState::Pending);

        service
            .submit_commitment(attester(1), 1, [1; 32], [0xb0; 32])
            .await
            .unwrap();
        assert_eq!(service.get_last_accepted_height().await, 0);

        let backing = service
            .submit_commitment(attester(2), 1, [1; 32], [0xb0; 32])
            .await
            .unwrap();
        assert_eq!(backing, 20);
        assert_eq!(service.get_last_accepted_height().await, 3);
        assert_eq!(service.get_max_tolerable_height().await, 8);
        for height in 1..=3 {
            let accepted = service.get_accepted_commitment(height).await.unwrap();
            assert_eq!(accepted.commitment_hash, [height as u8; 32]);
        }

        let mut events = Vec::new();
        while events.len() < 9 {
            let event = timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("event not delivered")
                .unwrap();
            events.push(event);
        }
        let accepted: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SettlementEvent::BlockAccepted(BlockAcceptedEvent { height, .. }) => Some(*height),
                _ => None,
            })
            .collect();
        assert_eq!(accepted, vec![1, 2, 3]);
        assert!(matches!(events[5], SettlementEvent::CommitmentSubmitted(_)));
        assert_eq!(events[5].correlation_id(), events[8].correlation_id());
        assert_eq!(notifier.events_published(), 9);
    }

    // =============================================================================
    // INTEGRATION TESTS: MINORITY IDENTIFICATION
    // =============================================================================

    #[tokio::test]
    async fn test_minority_reaches_slashing_hook() {
        let recorder = Arc::new(MinorityRecorder::new());
        let h = harness(
            |l| l,
            recorder.clone(),
            Arc::new(InMemoryEventLog::new()),
            &[10, 10, 9],
        );
        let service = &h.service;

        service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        service
            .submit_commitment(attester(3), 1, [9; 32], [9; 32])
            .await
            .unwrap();
        service
            .submit_commitment(attester(2), 1, [1; 32], [1; 32])
            .await
            .unwrap();

        assert_eq!(
            recorder.minority_at(1).unwrap(),
            vec![MinorityRecord {
                attester: attester(3),
                offense: MinorityOffense::Deviated {
                    commitment_hash: [9; 32]
                },
            }]
        );
        // Losing bucket keeps its stake for queries.
        assert_eq!(service.get_commitment_stake(1, [9; 32]).await, 9);

        for n in [1, 2] {
            service
                .submit_commitment(attester(n), 2, [2; 32], [2; 32])
                .await
                .unwrap();
        }
        assert_eq!(
            recorder.minority_at(2).unwrap(),
            vec![MinorityRecord {
                attester: attester(3),
                offense: MinorityOffense::Absent,
            }]
        );
        assert_eq!(recorder.recorded_heights(), vec![1, 2]);
    }

    // =============================================================================
    // INTEGRATION TESTS: EPOCHS
    // =============================================================================

    /// A height first seen in a later epoch is tallied against that epoch's
    /// stake, after the pending unstake has taken effect
    #[tokio::test]
    async fn test_height_tallied_against_rolled_epoch() {
        let (h, log) = logged(&[10, 10, 9]);
        let service = &h.service;
        h.ledger.unstake(TOKEN, attester(3), 9).unwrap();
        h.clock.set(EPOCH_SECS + EPOCH_SECS / 2);

        service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        assert_eq!(service.get_epoch_by_height(1).await, Some(1));
        assert_eq!(service.get_current_epoch().await.unwrap(), 1);
        assert_eq!(service.get_total_stake_for_epoch(1).await.unwrap(), 20);
        assert_eq!(service.get_current_epoch_stake(attester(3)).await.unwrap(), 0);
        assert_eq!(service.get_last_accepted_height().await, 0);

        service
            .submit_commitment(attester(2), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        assert_eq!(service.get_last_accepted_height().await, 1);

        let accepted = log
            .events()
            .into_iter()
            .find_map(|e| match e {
                SettlementEvent::BlockAccepted(ev) => Some(ev),
                _ => None,
            })
            .unwrap();
        assert_eq!(accepted.epoch, 1);
        assert_eq!(accepted.participating_stake_percent, 100);
    }

    #[tokio::test]
    async fn test_acceptance_rolls_over_when_time_moved_on() {
        let (h, _) = logged(&[10, 10, 9]);
        let service = &h.service;

        service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        h.clock.set(3 * EPOCH_SECS);
        service
            .submit_commitment(attester(2), 1, [1; 32], [1; 32])
            .await
            .unwrap();

        assert_eq!(service.get_epoch_by_height(1).await, Some(0));
        assert_eq!(service.get_current_epoch().await.unwrap(), 1);
        assert_eq!(service.get_current_epoch_by_time().await.unwrap(), 3);

        // The next height catches the ledger up to the time epoch.
        service
            .submit_commitment(attester(1), 2, [2; 32], [2; 32])
            .await
            .unwrap();
        assert_eq!(service.get_current_epoch().await.unwrap(), 3);
        assert_eq!(service.get_total_stake_for_epoch(3).await.unwrap(), 29);
    }

    // =============================================================================
    // INTEGRATION TESTS: ATOMICITY
    // =============================================================================

    #[tokio::test]
    async fn test_failed_rollover_leaves_no_trace() {
        let log = Arc::new(InMemoryEventLog::new());
        let fail_rollover = Arc::new(AtomicBool::new(true));
        let flag = fail_rollover.clone();
        let h = harness(
            move |inner| {
                Arc::new(FlakyOracle {
                    inner,
                    fail_rollover: flag,
                })
            },
            Arc::new(NoopSlashingHook),
            log.clone(),
            &[10, 10, 9],
        );
        let service = &h.service;
        h.clock.set(EPOCH_SECS);
        let before = service.snapshot();

        let result = service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await;
        assert!(matches!(
            result,
            Err(SettlementError::EpochRolloverFailed { epoch: 0, .. })
        ));
        assert_eq!(service.snapshot(), before);
        assert_eq!(service.get_commitment(1, attester(1)).await, None);
        assert_eq!(service.get_epoch_by_height(1).await, None);
        assert!(log.is_empty());

        // The same commitment goes through once the ledger recovers.
        fail_rollover.store(false, Ordering::SeqCst);
        let stake = service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        assert_eq!(stake, 10);
        assert_eq!(service.get_epoch_by_height(1).await, Some(1));
    }

    /// Slashing strategy that fails once the frontier reaches `fail_at`.
    struct OfflinePenaltyLedger {
        fail_at: u64,
    }

    impl SlashingHook for OfflinePenaltyLedger {
        fn slash_minority(
            &self,
            context: &commitment_finality::SlashingContext,
        ) -> SettlementResult<()> {
            if context.accepted.height >= self.fail_at {
                return Err(SettlementError::StakeQueryFailed {
                    reason: "penalty ledger offline".into(),
                });
            }
            Ok(())
        }
    }

    /// Heights finalized earlier in the same cascade are undone too
    #[tokio::test]
    async fn test_slashing_failure_rolls_back_whole_cascade() {
        let log = Arc::new(InMemoryEventLog::new());
        let h = harness(
            |l| l,
            Arc::new(OfflinePenaltyLedger { fail_at: 3 }),
            log.clone(),
            &[10, 10, 9],
        );
        let service = &h.service;

        for height in [2, 3] {
            for n in [1, 2] {
                service
                    .submit_commitment(attester(n), height, [height as u8; 32], [0; 32])
                    .await
                    .unwrap();
            }
        }
        service
            .submit_commitment(attester(1), 1, [1; 32], [0; 32])
            .await
            .unwrap();
        let before = service.snapshot();
        let logged_before = log.len();

        let result = service
            .submit_commitment(attester(2), 1, [1; 32], [0; 32])
            .await;

        assert!(matches!(
            result,
            Err(SettlementError::SlashingFailed { height: 3, .. })
        ));
        assert_eq!(service.snapshot(), before);
        assert_eq!(service.get_last_accepted_height().await, 0);
        assert_eq!(service.get_accepted_commitment(1).await, None);
        assert_eq!(service.get_accepted_commitment(2).await, None);
        assert_eq!(service.get_commitment_stake(1, [1; 32]).await, 10);
        // Nothing is announced for a submission that did not happen.
        assert_eq!(log.len(), logged_before);
    }

    // =============================================================================
    // INTEGRATION TESTS: BATCHES
    // =============================================================================

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let (h, log) = logged(&[10, 10, 9]);
        let service = &h.service;

        let batch = CommitmentBatch::new(vec![
            SignedCommitment::new(attester(1), BlockCommitment::new(1, [1; 32], [1; 32])),
            SignedCommitment::new(attester(1), BlockCommitment::new(50, [1; 32], [1; 32])),
            SignedCommitment::new(attester(2), BlockCommitment::new(1, [1; 32], [1; 32])),
        ]);

        match service.submit_batch(batch).await {
            Err(SettlementError::BatchItemFailed {
                index,
                applied,
                source,
            }) => {
                assert_eq!(index, 1);
                assert_eq!(applied, vec![10]);
                assert!(matches!(*source, SettlementError::TooFarAhead { .. }));
            }
            other => panic!("unexpected batch result: {:?}", other),
        }

        assert!(service.get_commitment(1, attester(1)).await.is_some());
        assert!(service.get_commitment(1, attester(2)).await.is_none());
        assert_eq!(service.get_height_state(1).await, HeightState::Pending);

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SettlementEvent::CommitmentSubmitted(_)));
        assert!(matches!(events[1], SettlementEvent::CommitmentRejected(_)));
    }

    #[tokio::test]
    async fn test_batch_can_finalize_heights() {
        let (h, log) = logged(&[10, 10, 9]);
        let service = &h.service;

        let mut commitments = Vec::new();
        for height in 1..=4 {
            for n in [1, 2] {
                commitments.push(SignedCommitment::new(
                    attester(n),
                    BlockCommitment::new(height, [height as u8; 32], [0; 32]),
                ));
            }
        }

        let stakes = service
            .submit_batch(CommitmentBatch::new(commitments))
            .await
            .unwrap();
        assert_eq!(stakes, vec![10, 20, 10, 20, 10, 20, 10, 20]);
        assert_eq!(service.get_last_accepted_height().await, 4);
        assert_eq!(log.accepted_heights(), vec![1, 2, 3, 4]);
    }

    // =============================================================================
    // INTEGRATION TESTS: CONCURRENCY
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_submitters_are_serialized() {
        let (h, log) = logged(&[10, 10, 10, 10]);

        let mut handles = Vec::new();
        for n in 1..=4u8 {
            let service = h.service.clone();
            handles.push(tokio::spawn(async move {
                for height in 1..=4 {
                    service
                        .submit_commitment(attester(n), height, [height as u8; 32], [0; 32])
                        .await?;
                }
                Ok::<_, SettlementError>(())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(h.service.get_last_accepted_height().await, 4);
        // Delivery happens outside the lock, so tasks may publish out of order.
        let mut accepted = log.accepted_heights();
        accepted.sort_unstable();
        assert_eq!(accepted, vec![1, 2, 3, 4]);
        for height in 1..=4 {
            assert_eq!(h.service.get_commitment_stake(height, [height as u8; 32]).await, 40);
        }
    }

    #[tokio::test]
    async fn test_duplicate_commitment_rejected_across_api() {
        let (h, log) = logged(&[10, 10, 9]);
        let service = &h.service;

        service
            .submit_commitment(attester(1), 1, [1; 32], [1; 32])
            .await
            .unwrap();
        let again = service
            .submit_commitment(attester(1), 1, [2; 32], [2; 32])
            .await;
        assert!(matches!(
            again,
            Err(SettlementError::AlreadyCommitted { height: 1, .. })
        ));
        assert_eq!(
            service.get_commitment(1, attester(1)).await.unwrap().commitment_hash,
            [1; 32]
        );
        assert_eq!(service.get_commitment_stake(1, [2; 32]).await, 0);
        assert_eq!(log.len(), 2);
    }
}
