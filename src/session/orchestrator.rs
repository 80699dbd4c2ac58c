//! Betting Session
//!
//! Owns everything one participant needs to place confidential bets: the
//! encryption context, the submission client, the bet ledger and the match
//! book. Validates each request, encodes and proves it, submits it, and
//! records the outcome.
//!
//! No lock is held across an `.await`, so ledger reads and further
//! encodings proceed while a submission is in flight.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::chain::{Address, CreatedMatch, LedgerRpc, Signer, SubmissionClient};
use crate::config::SessionConfig;
use crate::core::amount::to_base_units;
use crate::core::hash::short_hex;
use crate::crypto::{EncryptionContext, EncryptionService, Plaintext};
use crate::error::{BetError, Result};
use crate::ledger::{Bet, BetId, BetLedger, BetOutcome, BetStatus};
use crate::market::{Match, MatchBook, MatchId, MatchMetadata, Side};

/// A participant's request to wager on a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRequest {
    /// Target match.
    pub match_id: MatchId,
    /// Side backed.
    pub side: Side,
    /// Amount wagered.
    pub amount: Decimal,
}

impl BetRequest {
    /// Typed request.
    pub fn new(match_id: MatchId, side: Side, amount: Decimal) -> Self {
        Self { match_id, side, amount }
    }

    /// Request from raw form input: a match id string, a side code
    /// (1 or 2) and a decimal amount string.
    pub fn from_choice(match_id: &str, side_code: u8, amount: &str) -> Result<Self> {
        let match_id = MatchId::from_str(match_id)?;
        let side = Side::try_from(side_code)?;
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| BetError::InvalidAmount(format!("not a number: {:?}", amount)))?;
        Ok(Self { match_id, side, amount })
    }
}

/// One participant's betting session.
pub struct BettingSession {
    config: SessionConfig,
    encryption: Arc<dyn EncryptionService>,
    context: RwLock<Option<Arc<EncryptionContext>>>,
    client: SubmissionClient,
    ledger: BetLedger,
    matches: MatchBook,
}

/// Coordinator of the bet pipeline.
pub type BettingOrchestrator = BettingSession;

impl BettingSession {
    /// Session over an encryption service and a ledger transport.
    pub fn new(config: SessionConfig, encryption: Arc<dyn EncryptionService>, rpc: Arc<dyn LedgerRpc>) -> Self {
        let client = SubmissionClient::new(rpc, config.client.clone());
        Self {
            config,
            encryption,
            context: RwLock::new(None),
            client,
            ledger: BetLedger::new(),
            matches: MatchBook::new(),
        }
    }

    /// Install the network's public key. Replaces any earlier context for
    /// later calls; values already produced are unaffected.
    pub fn initialize(&self, public_key: impl AsRef<[u8]>) -> Result<()> {
        let ctx = EncryptionContext::initialize(public_key)?;
        info!(key = %short_hex(ctx.fingerprint()), "encryption context initialized");
        *self.context.write() = Some(Arc::new(ctx));
        Ok(())
    }

    /// Active encryption context.
    pub fn context(&self) -> Result<Arc<EncryptionContext>> {
        self.context.read().clone().ok_or(BetError::UninitializedKey)
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Place a confidential bet.
    ///
    /// Validation failures return before any encryption or network work and
    /// leave the ledger untouched. The bet is recorded as `Submitting`
    /// before anything is sent, then settled: `Confirmed` on success,
    /// `Unknown` on timeout or if this future is dropped, `Failed`
    /// otherwise, with the error propagated.
    #[instrument(skip_all, fields(match_id = %request.match_id))]
    pub async fn place_bet(&self, request: &BetRequest, signer: Option<&dyn Signer>) -> Result<Bet> {
        let units = to_base_units(request.amount)?;
        let signer = match signer {
            Some(s) if s.is_connected() => s,
            _ => return Err(BetError::NotConnected),
        };
        let ctx = self.context()?;

        let encrypted_amount = self.encryption.encode_amount(&ctx, request.amount)?;
        let encrypted_side = self.encryption.encode_side(&ctx, request.side)?;
        let proof = self
            .encryption
            .prove(&ctx, &encrypted_amount, &Plaintext::Amount(units))?;
        debug!(
            amount = %request.amount,
            side = ?request.side,
            amount_ct = %short_hex(&encrypted_amount.digest()),
            "bet encoded"
        );

        let mut bet = Bet::new(
            signer.address(),
            request.match_id,
            request.side,
            request.amount,
            encrypted_amount,
            encrypted_side,
            proof,
        );
        bet.begin_submission()?;
        self.ledger.record(bet.clone())?;
        let in_flight = InFlight {
            ledger: &self.ledger,
            id: bet.id(),
            settled: false,
        };

        let submitted = self
            .client
            .submit_bet(
                request.match_id,
                bet.encrypted_amount(),
                bet.encrypted_side(),
                bet.proof(),
                request.amount,
                Some(signer),
                self.config.submit_timeout,
            )
            .await;

        match submitted {
            Ok(transaction_id) => {
                let bet = in_flight.settle(BetStatus::Confirmed, Some(transaction_id))?;
                info!(bet = %bet.id(), tx = bet.transaction_id().unwrap_or_default(), "bet confirmed");
                Ok(bet)
            }
            Err(e) => {
                let status = if e.is_outcome_unknown() {
                    BetStatus::Unknown
                } else {
                    BetStatus::Failed
                };
                let bet = in_flight.settle(status, None)?;
                warn!(bet = %bet.id(), status = ?bet.status(), error = %e, "bet not confirmed");
                Err(e)
            }
        }
    }

    /// Create a match and cache its opening snapshot.
    pub async fn create_match(
        &self,
        metadata: MatchMetadata,
        start_time: u64,
        duration: u64,
        signer: Option<&dyn Signer>,
    ) -> Result<CreatedMatch> {
        let created = self
            .client
            .create_match(&metadata, start_time, duration, signer, self.config.submit_timeout)
            .await?;

        // create_match only succeeds with a connected signer
        let organizer = signer.map(|s| s.address().to_string()).unwrap_or_default();
        self.matches.upsert(Match {
            id: created.match_id,
            metadata,
            organizer,
            start_time,
            end_time: start_time.saturating_add(duration),
            is_active: true,
            is_resolved: false,
            winning_side: None,
        });
        Ok(created)
    }

    /// Read a match from the ledger and cache the snapshot.
    pub async fn query_match(&self, match_id: MatchId) -> Result<Match> {
        let snapshot = self.client.query_match(match_id, self.config.query_timeout).await?;
        self.matches.upsert(snapshot.clone());
        Ok(snapshot)
    }

    /// Re-read every match `bettor` holds a confirmed bet on.
    ///
    /// Returns how many snapshots were refreshed. Failures are logged and
    /// skipped; the previous snapshot, if any, stays in place.
    pub async fn refresh_resolutions(&self, bettor: &Address) -> usize {
        let match_ids: BTreeSet<MatchId> = self
            .ledger
            .list_bets(bettor)
            .iter()
            .filter(|b| b.status() == BetStatus::Confirmed)
            .map(Bet::match_id)
            .collect();

        let mut refreshed = 0;
        for match_id in match_ids {
            match self.query_match(match_id).await {
                Ok(_) => refreshed += 1,
                Err(e) => warn!(match_id = %match_id, error = %e, "could not refresh match"),
            }
        }
        refreshed
    }

    /// Cached matches that are active and unresolved.
    pub fn active_matches(&self) -> Vec<Match> {
        self.matches.active()
    }

    /// Bets placed by `bettor`, in order.
    pub fn list_bets(&self, bettor: &Address) -> Vec<Bet> {
        self.ledger.list_bets(bettor)
    }

    /// Sum wagered by `bettor`.
    pub fn total_wagered(&self, bettor: &Address) -> Decimal {
        self.ledger.total_wagered(bettor)
    }

    /// Win rate of `bettor` against cached resolutions.
    pub fn win_rate(&self, bettor: &Address) -> f64 {
        self.ledger.win_rate(bettor, &self.matches)
    }

    /// Bets recorded for `bettor`.
    pub fn bet_count(&self, bettor: &Address) -> usize {
        self.ledger.bet_count(bettor)
    }

    /// Outcome of each of `bettor`'s bets, in order.
    pub fn bet_outcomes(&self, bettor: &Address) -> Vec<(BetId, BetOutcome)> {
        self.ledger
            .list_bets(bettor)
            .iter()
            .map(|bet| (bet.id(), bet.outcome(self.matches.get(bet.match_id()).map(|m| m.resolution()))))
            .collect()
    }

    /// Underlying ledger.
    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    /// Cached match snapshots.
    pub fn matches(&self) -> &MatchBook {
        &self.matches
    }
}

/// A recorded submission. Settles as `Unknown` if dropped unsettled.
struct InFlight<'a> {
    ledger: &'a BetLedger,
    id: BetId,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, status: BetStatus, transaction_id: Option<String>) -> Result<Bet> {
        self.settled = true;
        self.ledger.settle(self.id, status, transaction_id)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        match self.ledger.settle(self.id, BetStatus::Unknown, None) {
            Ok(_) => warn!(bet = %self.id, "submission abandoned, outcome unknown"),
            Err(e) => warn!(bet = %self.id, error = %e, "could not settle abandoned submission"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures_util::future::join_all;
    use rust_decimal_macros::dec;
    use x25519_dalek::{PublicKey, StaticSecret};

    use crate::chain::{Fault, LocalSigner, SimulatedLedger};
    use crate::crypto::{DeterministicService, SealedBoxService};
    use crate::testing::sample_match;

    struct Harness {
        ledger: Arc<SimulatedLedger>,
        session: BettingSession,
        signer: LocalSigner,
        match_id: MatchId,
    }

    fn harness_with(ledger: SimulatedLedger, encryption: Arc<dyn EncryptionService>) -> Harness {
        let ledger = Arc::new(ledger);
        let match_id = ledger.seed_match(sample_match(0).metadata, "0xorganizer", 1_700_000_000, 7200);
        let session = BettingSession::new(SessionConfig::default(), encryption, ledger.clone());
        let signer = LocalSigner::generate(ledger.clone());
        Harness { ledger, session, signer, match_id }
    }

    fn harness() -> Harness {
        harness_with(SimulatedLedger::new(), Arc::new(DeterministicService::new(42)))
    }

    fn initialized() -> Harness {
        let h = harness();
        h.session.initialize(b"k1").unwrap();
        h
    }

    #[tokio::test]
    async fn test_successful_bet_is_confirmed_and_listed() {
        let h = initialized();
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1.0));

        let bet = h.session.place_bet(&request, Some(&h.signer)).await.unwrap();

        assert_eq!(bet.status(), BetStatus::Confirmed);
        assert!(!bet.transaction_id().unwrap().is_empty());

        let listed = h.session.list_bets(&h.signer.address());
        assert_eq!(listed, vec![bet]);
        assert_eq!(h.session.total_wagered(&h.signer.address()), dec!(1.0));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_before_any_work() {
        let h = initialized();
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(0));

        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();

        assert!(matches!(err, BetError::InvalidAmount(_)));
        assert!(h.session.ledger().is_empty());
        assert_eq!(h.ledger.request_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_signer_makes_no_call() {
        let h = initialized();
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1));

        let err = h.session.place_bet(&request, None).await.unwrap_err();
        assert!(matches!(err, BetError::NotConnected));

        h.signer.disconnect();
        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();
        assert!(matches!(err, BetError::NotConnected));

        assert_eq!(h.ledger.request_count(), 0);
        assert!(h.session.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_uninitialized_key() {
        let h = harness();
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1));

        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();
        assert!(matches!(err, BetError::UninitializedKey));
        assert!(h.session.ledger().is_empty());
        assert!(matches!(h.session.initialize(b""), Err(BetError::UninitializedKey)));
    }

    #[tokio::test]
    async fn test_rejected_bet_is_failed_and_listed() {
        let h = initialized();
        h.ledger.inject(Fault::Reject("insufficient funds".into()));
        let request = BetRequest::new(h.match_id, Side::SideB, dec!(3));

        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();
        assert!(matches!(err, BetError::Rejected(_)));

        let listed = h.session.list_bets(&h.signer.address());
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status(), BetStatus::Failed);
        assert!(listed[0].transaction_id().is_none());
        assert_eq!(h.session.total_wagered(&h.signer.address()), dec!(3));
    }

    #[tokio::test]
    async fn test_network_failure_is_failed() {
        let h = initialized();
        h.ledger.inject(Fault::Network);
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1));

        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();
        assert!(matches!(err, BetError::NetworkError(_)));
        assert_eq!(h.session.list_bets(&h.signer.address())[0].status(), BetStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_records_unknown() {
        let h = initialized();
        h.ledger.inject(Fault::Stall);
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1));

        let err = h.session.place_bet(&request, Some(&h.signer)).await.unwrap_err();
        assert!(matches!(err, BetError::Timeout(d) if d == Duration::from_secs(60)));

        let bets = h.session.list_bets(&h.signer.address());
        assert_eq!(bets[0].status(), BetStatus::Unknown);
        assert_eq!(
            h.session.bet_outcomes(&h.signer.address()),
            vec![(bets[0].id(), BetOutcome::Unknown)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_submission_is_unknown() {
        let h = initialized();
        h.ledger.inject(Fault::Stall);
        let request = BetRequest::new(h.match_id, Side::SideA, dec!(1));

        let cancelled = tokio::time::timeout(
            Duration::from_secs(5),
            h.session.place_bet(&request, Some(&h.signer)),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(h.ledger.request_count(), 1);

        let bets = h.session.list_bets(&h.signer.address());
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].status(), BetStatus::Unknown);
        assert!(bets[0].transaction_id().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_continues_while_submission_suspended() {
        let h = initialized();
        let me = h.signer.address();
        h.ledger.inject(Fault::Stall);

        let first = BetRequest::new(h.match_id, Side::SideA, dec!(2));
        let stalled = h.session.place_bet(&first, Some(&h.signer));
        tokio::pin!(stalled);
        assert!(tokio::time::timeout(Duration::from_secs(1), &mut stalled).await.is_err());

        // Ledger reads see the in-flight bet
        let listed = h.session.list_bets(&me);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status(), BetStatus::Submitting);
        assert_eq!(h.session.total_wagered(&me), dec!(2));

        // Encoding is not blocked
        let ctx = h.session.context().unwrap();
        let encoded = h.session.encryption.encode_amount(&ctx, dec!(2)).unwrap();
        assert_ne!(&encoded, listed[0].encrypted_amount());

        // Nor is a second submission
        h.ledger.clear_fault();
        let second = h
            .session
            .place_bet(&BetRequest::new(h.match_id, Side::SideB, dec!(1)), Some(&h.signer))
            .await
            .unwrap();
        assert_eq!(second.status(), BetStatus::Confirmed);

        let err = stalled.await.unwrap_err();
        assert!(matches!(err, BetError::Timeout(_)));
        let statuses: Vec<_> = h.session.list_bets(&me).iter().map(Bet::status).collect();
        assert_eq!(statuses, vec![BetStatus::Unknown, BetStatus::Confirmed]);
    }

    #[tokio::test]
    async fn test_concurrent_placements() {
        let h = initialized();
        let requests: Vec<_> = (1..=5)
            .map(|i| BetRequest::new(h.match_id, Side::SideA, Decimal::from(i)))
            .collect();

        let results = join_all(requests.iter().map(|r| h.session.place_bet(r, Some(&h.signer)))).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(h.session.bet_count(&h.signer.address()), 5);
        assert_eq!(h.session.total_wagered(&h.signer.address()), dec!(15));
        assert_eq!(h.ledger.placed_bets().len(), 5);
    }

    #[tokio::test]
    async fn test_win_rate_follows_resolutions() {
        let h = initialized();
        let me = h.signer.address();
        let other = h.ledger.seed_match(sample_match(0).metadata, "0xorganizer", 1_700_000_000, 7200);

        h.session
            .place_bet(&BetRequest::new(h.match_id, Side::SideA, dec!(1)), Some(&h.signer))
            .await
            .unwrap();
        h.session
            .place_bet(&BetRequest::new(other, Side::SideA, dec!(1)), Some(&h.signer))
            .await
            .unwrap();

        assert_eq!(h.session.win_rate(&me), 0.0);

        h.ledger.resolve_match(h.match_id, Some(Side::SideA));
        h.ledger.resolve_match(other, Some(Side::SideB));
        assert_eq!(h.session.win_rate(&me), 0.0);

        assert_eq!(h.session.refresh_resolutions(&me).await, 2);
        assert_eq!(h.session.win_rate(&me), 0.5);

        let outcomes: Vec<_> = h.session.bet_outcomes(&me).into_iter().map(|(_, o)| o).collect();
        assert_eq!(outcomes, vec![BetOutcome::Won, BetOutcome::Lost]);
    }

    #[tokio::test]
    async fn test_create_and_query_match() {
        let h = initialized();
        let metadata = sample_match(0).metadata;

        let created = h
            .session
            .create_match(metadata.clone(), 1_800_000_000, 3600, Some(&h.signer))
            .await
            .unwrap();
        let active = h.session.active_matches();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, created.match_id);

        let err = h
            .session
            .create_match(metadata, 1_800_000_000, 3600, None)
            .await
            .unwrap_err();
        assert!(matches!(err, BetError::NotConnected));

        h.ledger.close_match(created.match_id);
        let snapshot = h.session.query_match(created.match_id).await.unwrap();
        assert!(!snapshot.is_active);
        assert!(h.session.active_matches().is_empty());

        let err = h.session.query_match(MatchId(404)).await.unwrap_err();
        assert!(matches!(err, BetError::NotFound(404)));
    }

    #[tokio::test]
    async fn test_reinitialize_keeps_existing_bets() {
        let h = initialized();
        let first = h
            .session
            .place_bet(&BetRequest::new(h.match_id, Side::SideA, dec!(1)), Some(&h.signer))
            .await
            .unwrap();
        let old_key = *h.session.context().unwrap().fingerprint();

        h.session.initialize(b"k2").unwrap();
        let second = h
            .session
            .place_bet(&BetRequest::new(h.match_id, Side::SideA, dec!(1)), Some(&h.signer))
            .await
            .unwrap();

        assert_eq!(first.proof().key_fingerprint(), Some(old_key));
        assert_ne!(second.proof().key_fingerprint(), Some(old_key));
        assert_eq!(h.session.ledger().get(first.id()), Some(first));
    }

    #[tokio::test]
    async fn test_sealed_box_end_to_end() {
        let secret = StaticSecret::random_from_rng(rand::rngs::OsRng);
        let public = PublicKey::from(&secret);
        let ledger = SimulatedLedger::new().with_network_key(public.as_bytes());
        let h = harness_with(ledger, Arc::new(SealedBoxService::new()));
        h.session.initialize(public.as_bytes()).unwrap();

        let bet = h
            .session
            .place_bet(&BetRequest::new(h.match_id, Side::SideB, dec!(0.25)), Some(&h.signer))
            .await
            .unwrap();

        let ctx = h.session.context().unwrap();
        let side = SealedBoxService::open(&secret.to_bytes(), &ctx, bet.encrypted_side(), b"side").unwrap();
        assert_eq!(side, vec![Side::SideB.code()]);
        assert!(bet.proof().is_bound_to(bet.encrypted_amount()));
        assert_eq!(h.ledger.escrow(h.match_id), 250_000_000_000_000_000);
    }

    #[tokio::test]
    async fn test_foreign_key_proofs_rejected() {
        let ledger = SimulatedLedger::new().with_network_key(&[9u8; 32]);
        let h = harness_with(ledger, Arc::new(DeterministicService::new(1)));
        h.session.initialize(b"k1").unwrap();

        let err = h
            .session
            .place_bet(&BetRequest::new(h.match_id, Side::SideA, dec!(1)), Some(&h.signer))
            .await
            .unwrap_err();
        assert!(matches!(err, BetError::Rejected(_)));
    }

    #[test]
    fn test_request_from_choice() {
        let request = BetRequest::from_choice("7", 2, "1.5").unwrap();
        assert_eq!(request, BetRequest::new(MatchId(7), Side::SideB, dec!(1.5)));

        assert!(matches!(BetRequest::from_choice("seven", 1, "1"), Err(BetError::InvalidMatchId(_))));
        assert!(matches!(BetRequest::from_choice("7", 3, "1"), Err(BetError::InvalidSide(3))));
        assert!(matches!(BetRequest::from_choice("7", 1, "lots"), Err(BetError::InvalidAmount(_))));
    }
}
