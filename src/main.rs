//! Cipher Bet demo
//!
//! Runs one participant's session end to end: create a match, place
//! confidential bets, adjudicate, and report the ledger aggregates.
//! Uses the in-process ledger unless `CIPHER_BET_RPC_URL` is set, in which
//! case `CIPHER_BET_NETWORK_KEY` (hex x25519 public key) is required too.

use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use rand::rngs::OsRng;
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use x25519_dalek::{PublicKey, StaticSecret};

use cipher_bet::{
    chain::LedgerRpc, BetRequest, BettingSession, LocalSigner, MatchMetadata, SealedBoxService,
    SessionConfig, Side, Signer, SimulatedLedger, WsRpc, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;

    info!("Cipher Bet v{}", VERSION);

    let config = SessionConfig::from_env();
    info!("Chain ID: {}", config.client.chain_id);
    info!("Contract: {}", config.client.contract);

    match config.client.rpc_url.clone() {
        Some(url) => run_remote(config, &url).await,
        None => run_simulated(config).await,
    }
}

/// Full lifecycle against the in-process ledger.
async fn run_simulated(config: SessionConfig) -> anyhow::Result<()> {
    info!("=== Simulated settlement ledger ===");

    let network_secret = StaticSecret::random_from_rng(OsRng);
    let network_key = PublicKey::from(&network_secret);
    let ledger = Arc::new(
        SimulatedLedger::new()
            .with_chain_id(config.client.chain_id)
            .with_network_key(network_key.as_bytes()),
    );

    let session = BettingSession::new(config, Arc::new(SealedBoxService::new()), ledger.clone());
    session.initialize(network_key.as_bytes())?;

    let signer = LocalSigner::generate(ledger.clone());
    let bettor = signer.address();
    info!("Bettor: {}", bettor);

    let created = session
        .create_match(demo_metadata(), Utc::now().timestamp().max(0) as u64, 7200, Some(&signer))
        .await?;
    info!("Created match {} (tx {})", created.match_id, created.transaction_id);

    for (side, amount) in [(Side::SideA, Decimal::new(10, 1)), (Side::SideB, Decimal::new(25, 2))] {
        let request = BetRequest::new(created.match_id, side, amount);
        match session.place_bet(&request, Some(&signer)).await {
            Ok(bet) => info!(
                "Bet {} confirmed: tx {}",
                bet.id(),
                bet.transaction_id().unwrap_or_default()
            ),
            Err(e) => warn!("Bet failed: {}", e),
        }
    }

    // Validation failures leave no record
    let invalid = BetRequest::new(created.match_id, Side::SideA, Decimal::ZERO);
    if let Err(e) = session.place_bet(&invalid, Some(&signer)).await {
        info!("Zero-amount bet refused: {}", e);
    }

    ledger.resolve_match(created.match_id, Some(Side::SideA));
    let refreshed = session.refresh_resolutions(&bettor).await;
    info!("Refreshed {} match(es)", refreshed);

    report(&session, &signer);
    info!("Escrowed on match {}: {} base units", created.match_id, ledger.escrow(created.match_id));
    Ok(())
}

/// Place one bet against a remote ledger.
async fn run_remote(config: SessionConfig, url: &str) -> anyhow::Result<()> {
    info!("=== Remote settlement ledger at {} ===", url);

    let key_hex = std::env::var("CIPHER_BET_NETWORK_KEY")
        .context("CIPHER_BET_NETWORK_KEY is required with CIPHER_BET_RPC_URL")?;
    let network_key = hex::decode(key_hex.trim_start_matches("0x")).context("network key is not hex")?;
    if network_key.len() != 32 {
        bail!("network key must be 32 bytes, got {}", network_key.len());
    }

    let rpc: Arc<dyn LedgerRpc> = Arc::new(WsRpc::connect(url).await?);
    let session = BettingSession::new(config, Arc::new(SealedBoxService::new()), rpc.clone());
    session.initialize(&network_key)?;

    let signer = LocalSigner::generate(rpc);
    info!("Bettor: {}", signer.address());

    let match_id = std::env::var("CIPHER_BET_MATCH_ID")
        .context("CIPHER_BET_MATCH_ID is required with CIPHER_BET_RPC_URL")?
        .parse()?;
    let snapshot = session.query_match(match_id).await?;
    info!(
        "Match {}: {} vs {} ({})",
        snapshot.id,
        snapshot.metadata.side_a,
        snapshot.metadata.side_b,
        if snapshot.is_open() { "open" } else { "closed" }
    );

    let request = BetRequest::new(match_id, Side::SideA, Decimal::new(1, 2));
    match session.place_bet(&request, Some(&signer)).await {
        Ok(bet) => info!("Bet {} confirmed: tx {}", bet.id(), bet.transaction_id().unwrap_or_default()),
        Err(e) if e.is_outcome_unknown() => warn!("Bet outcome unknown, check the ledger: {}", e),
        Err(e) => warn!("Bet failed: {}", e),
    }

    report(&session, &signer);
    Ok(())
}

fn demo_metadata() -> MatchMetadata {
    MatchMetadata {
        game: "Valorant".to_string(),
        tournament: "Champions".to_string(),
        side_a: "Sentinels".to_string(),
        side_b: "Fnatic".to_string(),
    }
}

fn report(session: &BettingSession, signer: &LocalSigner) {
    let bettor = signer.address();
    info!("=== Ledger for {} ===", bettor);
    for bet in session.list_bets(&bettor) {
        info!("  {} on match {}: {:?}", bet.id(), bet.match_id(), bet.status());
    }
    for (id, outcome) in session.bet_outcomes(&bettor) {
        info!("  {} -> {:?}", id, outcome);
    }
    info!("Bets placed: {}", session.bet_count(&bettor));
    info!("Total wagered: {}", session.total_wagered(&bettor));
    info!("Win rate: {:.1}%", session.win_rate(&bettor) * 100.0);
}
