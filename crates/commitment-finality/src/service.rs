//! Settlement Service - wiring of state, engine and collaborators
//!
//! ## Critical section
//!
//! The consensus state sits behind one `RwLock`. Every submission (and every
//! batch) holds the write lock for its whole duration, stake oracle calls and
//! cascade included. Queries take the read lock.
//!
//! Events are collected while the lock is held and handed to the
//! notification sink only after it is released, so delivery can never undo a
//! state change.

use crate::adapters::UnimplementedGenesisGate;
use crate::config::SettlementConfig;
use crate::domain::{
    AcceptanceEngine, AttesterId, BlockCommitment, BlockHeight, ConsensusState, CustodianId,
    Epoch, Hash, HeightState, SignedCommitment, Stake,
};
use crate::error::{SettlementError, SettlementResult};
use crate::events::{
    BlockAcceptedEvent, CommitmentBatch, CommitmentRejectedEvent, CommitmentSubmittedEvent,
    CorrelationId, RejectionReason, SettlementEvent,
};
use crate::metrics;
use crate::ports::inbound::CommitmentApi;
use crate::ports::outbound::{GenesisGate, NotificationSink, SlashingHook, StakeOracle};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

pub struct SettlementService<O, H, N>
where
    O: StakeOracle,
    H: SlashingHook,
    N: NotificationSink,
{
    config: SettlementConfig,
    state: Arc<RwLock<ConsensusState>>,
    oracle: Arc<O>,
    slashing: Arc<H>,
    notifier: Arc<N>,
    genesis_gate: Arc<dyn GenesisGate>,
}

impl<O, H, N> SettlementService<O, H, N>
where
    O: StakeOracle,
    H: SlashingHook,
    N: NotificationSink,
{
    /// Validate `config`, register the domain with the oracle and start with
    /// an empty state at `config.initial_accepted_height`.
    pub fn new(
        config: SettlementConfig,
        oracle: Arc<O>,
        slashing: Arc<H>,
        notifier: Arc<N>,
    ) -> SettlementResult<Self> {
        config.validate()?;
        oracle.register_domain(&config.registration())?;

        info!(
            tolerance = config.leading_block_tolerance,
            frontier = config.initial_accepted_height,
            epoch_duration_secs = config.epoch_duration_secs,
            custodians = config.custodians.len(),
            "[finality] settlement service initialized"
        );

        let state = ConsensusState::new(
            config.leading_block_tolerance,
            config.initial_accepted_height,
        );

        Ok(Self {
            config,
            state: Arc::new(RwLock::new(state)),
            oracle,
            slashing,
            notifier,
            genesis_gate: Arc::new(UnimplementedGenesisGate),
        })
    }

    /// Replace the default genesis gate.
    pub fn with_genesis_gate(mut self, gate: Arc<dyn GenesisGate>) -> Self {
        self.genesis_gate = gate;
        self
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    /// Copy of the current consensus state.
    pub fn snapshot(&self) -> ConsensusState {
        self.state.read().clone()
    }

    fn engine(&self) -> AcceptanceEngine<'_> {
        AcceptanceEngine::new(self.oracle.as_ref(), self.slashing.as_ref())
    }

    /// One submission against an already-locked state.
    fn submit_locked(
        &self,
        state: &mut ConsensusState,
        signed: SignedCommitment,
        correlation_id: CorrelationId,
        events: &mut Vec<SettlementEvent>,
    ) -> SettlementResult<Stake> {
        let SignedCommitment {
            attester,
            commitment,
        } = signed;

        match self.engine().submit(state, attester, commitment) {
            Ok(outcome) => {
                metrics::record_commitment_submitted();
                events.push(SettlementEvent::CommitmentSubmitted(
                    CommitmentSubmittedEvent {
                        correlation_id,
                        attester,
                        height: commitment.height,
                        block_id: commitment.block_id,
                        commitment_hash: commitment.commitment_hash,
                        attester_stake: outcome.attester_stake,
                        accumulated_stake: outcome.accumulated_stake,
                    },
                ));
                if !outcome.accepted.is_empty() {
                    metrics::record_cascade(outcome.accepted.len(), state.last_accepted_height());
                }
                events.extend(outcome.accepted.iter().map(|block| {
                    SettlementEvent::BlockAccepted(BlockAcceptedEvent::from_block(
                        correlation_id,
                        block,
                    ))
                }));
                Ok(outcome.accumulated_stake)
            }
            Err(e) => {
                metrics::record_commitment_rejected(e.label());
                if let Some(reason) = RejectionReason::from_error(&e) {
                    warn!(
                        height = commitment.height,
                        attester = %attester,
                        ?reason,
                        "[finality] commitment rejected"
                    );
                    events.push(SettlementEvent::CommitmentRejected(
                        CommitmentRejectedEvent {
                            correlation_id,
                            attester,
                            height: commitment.height,
                            reason,
                        },
                    ));
                }
                Err(e)
            }
        }
    }

    fn publish(&self, events: Vec<SettlementEvent>) {
        for event in events {
            self.notifier.notify(event);
        }
    }
}

#[async_trait]
impl<O, H, N> CommitmentApi for SettlementService<O, H, N>
where
    O: StakeOracle + 'static,
    H: SlashingHook + 'static,
    N: NotificationSink + 'static,
{
    async fn submit_commitment(
        &self,
        attester: AttesterId,
        height: BlockHeight,
        commitment_hash: Hash,
        block_id: Hash,
    ) -> SettlementResult<Stake> {
        let signed =
            SignedCommitment::new(attester, BlockCommitment::new(height, commitment_hash, block_id));
        let mut events = Vec::new();
        let result = {
            let mut state = self.state.write();
            self.submit_locked(&mut state, signed, Uuid::new_v4(), &mut events)
        };
        self.publish(events);
        result
    }

    async fn submit_batch(&self, batch: CommitmentBatch) -> SettlementResult<Vec<Stake>> {
        let correlation_id = Uuid::new_v4();
        let mut events = Vec::new();
        let mut applied = Vec::with_capacity(batch.len());
        let mut failure = None;
        {
            let mut state = self.state.write();
            for (index, signed) in batch.commitments.into_iter().enumerate() {
                match self.submit_locked(&mut state, signed, correlation_id, &mut events) {
                    Ok(stake) => applied.push(stake),
                    Err(e) => {
                        failure = Some((index, e));
                        break;
                    }
                }
            }
        }
        self.publish(events);

        match failure {
            None => Ok(applied),
            Some((index, source)) => {
                warn!(
                    index,
                    applied = applied.len(),
                    error = %source,
                    "[finality] batch stopped at first failure"
                );
                Err(SettlementError::BatchItemFailed {
                    index,
                    applied,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn get_commitment(
        &self,
        height: BlockHeight,
        attester: AttesterId,
    ) -> Option<BlockCommitment> {
        self.state.read().commitment(height, &attester)
    }

    async fn get_accepted_commitment(&self, height: BlockHeight) -> Option<BlockCommitment> {
        self.state.read().accepted_commitment(height)
    }

    async fn get_height_state(&self, height: BlockHeight) -> HeightState {
        self.state.read().height_state(height)
    }

    async fn get_attesters(&self) -> SettlementResult<Vec<AttesterId>> {
        self.oracle.attesters_for_domain()
    }

    async fn get_max_tolerable_height(&self) -> BlockHeight {
        self.state.read().max_tolerable_height()
    }

    async fn get_last_accepted_height(&self) -> BlockHeight {
        self.state.read().last_accepted_height()
    }

    async fn get_epoch_by_height(&self, height: BlockHeight) -> Option<Epoch> {
        self.state.read().epoch_for(height)
    }

    async fn get_commitment_stake(&self, height: BlockHeight, commitment_hash: Hash) -> Stake {
        self.state.read().commitment_stake(height, &commitment_hash)
    }

    async fn get_current_epoch(&self) -> SettlementResult<Epoch> {
        self.oracle.current_epoch()
    }

    async fn get_current_epoch_by_time(&self) -> SettlementResult<Epoch> {
        self.oracle.current_epoch_by_time()
    }

    async fn get_attester_stake_at_epoch(
        &self,
        epoch: Epoch,
        custodian: CustodianId,
        attester: AttesterId,
    ) -> SettlementResult<Stake> {
        self.oracle
            .stake_for_attester_at_epoch(epoch, &custodian, &attester)
    }

    async fn get_current_epoch_stake(&self, attester: AttesterId) -> SettlementResult<Stake> {
        self.engine().current_epoch_stake(&attester)
    }

    async fn get_total_stake_for_epoch(&self, epoch: Epoch) -> SettlementResult<Stake> {
        self.engine().total_epoch_stake(epoch)
    }

    async fn accept_genesis_ceremony(&self) -> SettlementResult<()> {
        self.genesis_gate.accept_genesis_ceremony()
    }
}
