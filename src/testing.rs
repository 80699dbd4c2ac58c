//! Shared fixtures for unit tests.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::chain::signer::Address;
use crate::core::amount::to_base_units;
use crate::crypto::{DeterministicService, EncryptionContext, EncryptionService, Plaintext};
use crate::ledger::Bet;
use crate::market::{Match, MatchId, MatchMetadata, Side};

/// Active, unresolved match.
pub(crate) fn sample_match(id: u64) -> Match {
    Match {
        id: MatchId(id),
        metadata: MatchMetadata {
            game: "Valorant".into(),
            tournament: "Champions".into(),
            side_a: "Sentinels".into(),
            side_b: "Fnatic".into(),
        },
        organizer: "0xorganizer".into(),
        start_time: 1_700_000_000,
        end_time: 1_700_007_200,
        is_active: true,
        is_resolved: false,
        winning_side: None,
    }
}

/// Same match, resolved with `winner`.
pub(crate) fn resolved_match(id: u64, winner: Option<Side>) -> Match {
    Match {
        is_active: false,
        is_resolved: true,
        winning_side: winner,
        ..sample_match(id)
    }
}

/// Context over a fixed test key.
pub(crate) fn test_context() -> EncryptionContext {
    EncryptionContext::initialize([7u8; 32]).unwrap()
}

/// Bet in `Created` state with deterministic ciphertexts.
pub(crate) fn sample_bet(bettor: &str, match_id: u64, side: Side, amount: &str) -> Bet {
    let ctx = test_context();
    let service = DeterministicService::new(match_id ^ 0x5eed);
    let amount = Decimal::from_str(amount).unwrap();

    let encrypted_amount = service.encode_amount(&ctx, amount).unwrap();
    let encrypted_side = service.encode_side(&ctx, side).unwrap();
    let units = to_base_units(amount).unwrap();
    let proof = service
        .prove(&ctx, &encrypted_amount, &Plaintext::Amount(units))
        .unwrap();

    Bet::new(
        Address::new(bettor),
        MatchId(match_id),
        side,
        amount,
        encrypted_amount,
        encrypted_side,
        proof,
    )
}

/// `sample_bet` advanced to `Confirmed`.
pub(crate) fn confirmed_bet(bettor: &str, match_id: u64, side: Side, amount: &str) -> Bet {
    let mut bet = sample_bet(bettor, match_id, side, amount);
    bet.begin_submission().unwrap();
    bet.confirm(format!("0xtx{match_id}")).unwrap();
    bet
}
