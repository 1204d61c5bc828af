//! Simulation controller.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use tokenkit_common::{AccountId, Amount, EventRecord, TokenError};
use tokenkit_governance::{GovernanceConfig, ShareRegistry, VoteMode};
use tokenkit_ledger::SharedState;
use tokenkit_permission::{PermissionConfig, PermissionToken, PermissionUsage};
use tokenkit_voting::{PollConfig, VotingEngine};

use crate::metrics::{Outcome, SimulationMetrics};
use crate::scenario::{Scenario, ScenarioKind};

/// Result of one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub name: String,
    pub description: String,
    pub result: serde_json::Value,
}

/// Controls the simulation.
pub struct SimulationController {
    /// Random number generator.
    rng: StdRng,
    /// Simulation metrics.
    metrics: Arc<RwLock<SimulationMetrics>>,
}

impl SimulationController {
    /// Create a new simulation controller.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            rng,
            metrics: Arc::new(RwLock::new(SimulationMetrics::new())),
        }
    }

    /// Run a scenario.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> anyhow::Result<ScenarioReport> {
        info!("Running scenario: {} - {}", scenario.name, scenario.description);

        let result = match scenario.kind {
            ScenarioKind::Poll {
                voters,
                candidates,
                turnout,
            } => self.run_poll(voters, candidates, turnout).await?,
            ScenarioKind::Shares {
                holders,
                delegations,
            } => self.run_shares(holders, delegations).await?,
            ScenarioKind::Permissions {
                users,
                attempts,
                usage,
            } => self.run_permissions(users, attempts, usage).await?,
        };

        Ok(ScenarioReport {
            name: scenario.name,
            description: scenario.description,
            result,
        })
    }

    /// Get simulation metrics.
    pub async fn get_metrics(&self) -> SimulationMetrics {
        self.metrics.read().await.clone()
    }

    async fn run_poll(
        &mut self,
        voters: usize,
        candidates: usize,
        turnout: f64,
    ) -> anyhow::Result<serde_json::Value> {
        let referee = AccountId::from("referee");
        let mut engine = VotingEngine::init(
            PollConfig::from_env(),
            referee.clone(),
            voters.max(1) as Amount,
            "Simulated poll",
            "VOTE",
        )?;
        let subscriber = self.spawn_subscriber(engine.subscribe());

        let candidate_ids = accounts("candidate", candidates.max(1));
        let voter_ids = accounts("voter", voters.max(1));
        for candidate in &candidate_ids {
            let started = Instant::now();
            let result = engine.add_candidate(&referee, candidate).map(|_| true);
            self.record(&result, started).await;
            result?;
        }
        for voter in &voter_ids {
            let started = Instant::now();
            let result = engine.register_voter(&referee, voter).map(|_| true);
            self.record(&result, started).await;
            result?;
        }

        // Over the supply: refused with RosterFull.
        let started = Instant::now();
        let result = engine
            .register_voter(&referee, &AccountId::from("late-voter"))
            .map(|_| true);
        self.record(&result, started).await;

        engine.start(&referee)?;
        info!(
            voters = engine.voters_count(),
            candidates = engine.candidates_count(),
            "Ballots distributed"
        );

        let turnout = if turnout.is_nan() { 0.0 } else { turnout.clamp(0.0, 1.0) };
        let mut ballots = Vec::new();
        for voter in &voter_ids {
            if self.rng.gen_bool(turnout) {
                let choice = self.rng.gen_range(0..candidate_ids.len());
                ballots.push((voter.clone(), candidate_ids[choice].clone()));
            }
        }
        let cast = ballots.len();
        let repeat = ballots.first().cloned();

        let shared = SharedState::new(engine);
        let mut handles = Vec::with_capacity(ballots.len());
        for (voter, candidate) in ballots {
            let poll = shared.clone();
            let metrics = self.metrics.clone();
            handles.push(tokio::spawn(async move {
                let started = Instant::now();
                let result = poll.write(|poll| poll.vote(&voter, &candidate));
                metrics
                    .write()
                    .await
                    .record(outcome_of(&result), elapsed_us(started));
            }));
        }
        for handle in handles {
            handle.await?;
        }

        // Voting twice: refused while in progress, rejected once completed.
        if let Some((voter, candidate)) = repeat {
            let started = Instant::now();
            let result = shared.write(|poll| poll.vote(&voter, &candidate));
            self.record(&result, started).await;
        }

        let summary = shared.write(|poll| {
            if poll.is_vote_in_progress() {
                let winner = poll.interrupt(&referee)?;
                info!(winner = %winner, "Referee interrupted the poll");
            }
            Ok::<_, TokenError>(poll.summary())
        })?;

        if let Some(winner) = summary.ranking.first() {
            info!(
                winner = %winner.candidate,
                score = %winner.score,
                phase = %summary.phase,
                "Poll stopped"
            );
        }
        info!(
            "Participation: {}",
            summary
                .participation
                .map(|p| p.round_dp(4).to_string())
                .unwrap_or_default()
        );

        shared.write(|poll| poll.clear(&referee))?;
        drop(shared);
        subscriber.await?;

        Ok(json!({
            "ballots_cast": cast,
            "summary": summary,
        }))
    }

    async fn run_shares(
        &mut self,
        holders: usize,
        delegations: usize,
    ) -> anyhow::Result<serde_json::Value> {
        let founder = AccountId::from("founder");
        let mut registry = ShareRegistry::init(
            GovernanceConfig::from_env()?,
            founder.clone(),
            "Simulated Corp",
            "SIM",
            1000,
        )?;
        let subscriber = self.spawn_subscriber(registry.subscribe());

        let holder_ids = accounts("holder", holders.saturating_sub(1).max(1));
        let slice = registry.total_shares() / (holder_ids.len() as Amount + 1);
        for holder in &holder_ids {
            let amount = self.rng.gen_range(1..=slice.max(1));
            let started = Instant::now();
            let result = registry.transfer(&founder, holder, amount);
            self.record(&result, started).await;
        }

        let mut everyone = vec![founder.clone()];
        everyone.extend(holder_ids.iter().cloned());
        for _ in 0..delegations {
            let from = &everyone[self.rng.gen_range(0..everyone.len())];
            let to = &everyone[self.rng.gen_range(0..everyone.len())];
            let started = Instant::now();
            let result = registry.set_delegate(from, to).map(|_| true);
            if let Err(e) = &result {
                debug!(from = %from, to = %to, error = %e, "Delegation rejected");
            }
            self.record(&result, started).await;
        }

        let dollar = weigh(&registry, &everyone)?;
        registry.set_vote_mode(&founder, VoteMode::PersonWeighted)?;
        let person = weigh(&registry, &everyone)?;
        registry.set_vote_mode(&founder, VoteMode::DollarWeighted)?;
        registry.set_dividend(&founder, Decimal::new(5, 2))?;

        info!(
            shareholders = registry.total_shareholders(),
            delegating = registry.delegations().len(),
            "Shareholder assembly weighed"
        );

        drop(registry);
        subscriber.await?;

        Ok(json!({
            "shareholders": everyone.len(),
            "dollar_weighted": dollar,
            "person_weighted": person,
        }))
    }

    async fn run_permissions(
        &mut self,
        users: usize,
        attempts: usize,
        usage: PermissionUsage,
    ) -> anyhow::Result<serde_json::Value> {
        let authority = AccountId::from("authority");
        let config = PermissionConfig {
            usage,
            ..PermissionConfig::from_env()?
        };
        let mut token = PermissionToken::init(
            config,
            authority.clone(),
            "Simulated pass",
            "PASS",
            users.max(1) as Amount,
        )?;
        let subscriber = self.spawn_subscriber(token.subscribe());

        let user_ids = accounts("user", users.max(1));
        for user in user_ids.iter().step_by(2) {
            let started = Instant::now();
            let result = token.grant(&authority, user, 1);
            self.record(&result, started).await;
        }

        let mut granted = 0usize;
        let mut denied = 0usize;
        for attempt in 0..attempts {
            if attempt == attempts / 2 {
                token.freeze(&authority, true)?;
                warn!("Permissions frozen");
            } else if attempt == attempts * 3 / 4 {
                token.freeze(&authority, false)?;
                info!("Permissions unfrozen");
            }

            let user = &user_ids[self.rng.gen_range(0..user_ids.len())];
            let started = Instant::now();
            let result = token.require_access(user);
            match result {
                Ok(true) => granted += 1,
                Ok(false) => denied += 1,
                Err(_) => {}
            }
            self.record(&result, started).await;
        }

        if let Some(user) = user_ids.first() {
            token.revoke(&authority, user, 1)?;
        }

        let report = json!({
            "usage": usage,
            "granted": granted,
            "denied": denied,
            "allowed_users": token.allowed_users_count(),
            "allowed_tokens": token.allowed_tokens_count(),
            "total_supply": token.total_supply(),
        });
        info!(granted, denied, usage = %usage, "Access attempts processed");

        drop(token);
        subscriber.await?;
        Ok(report)
    }

    /// Count every event of a stream until its ledger goes away.
    fn spawn_subscriber(&self, mut rx: broadcast::Receiver<EventRecord>) -> JoinHandle<()> {
        let metrics = self.metrics.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => metrics.write().await.record_event(record.event.kind()),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "Event subscriber lagged");
                        metrics.write().await.record_lag(missed);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    async fn record(&self, result: &tokenkit_common::Result<bool>, started: Instant) {
        self.metrics
            .write()
            .await
            .record(outcome_of(result), elapsed_us(started));
    }
}

fn outcome_of(result: &tokenkit_common::Result<bool>) -> Outcome {
    match result {
        Ok(true) => Outcome::Applied,
        Ok(false) => Outcome::Refused,
        Err(_) => Outcome::Failed,
    }
}

fn elapsed_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

fn accounts(prefix: &str, count: usize) -> Vec<AccountId> {
    (0..count)
        .map(|i| AccountId::new(format!("{prefix}-{i}")))
        .collect()
}

/// Heaviest shareholder and majority holders under the current mode.
fn weigh(registry: &ShareRegistry, everyone: &[AccountId]) -> anyhow::Result<serde_json::Value> {
    let eval = registry.evaluator();
    let mut heaviest: Option<(&AccountId, Decimal)> = None;
    let mut majority = Vec::new();

    for account in everyone.iter().filter(|a| registry.is_shareholder(a)) {
        let weight = eval.weight(account)?;
        if heaviest.map_or(true, |(_, w)| weight > w) {
            heaviest = Some((account, weight));
        }
        if eval.is_majority(account)? {
            majority.push(account.to_string());
        }
    }

    let (top, weight) = heaviest.ok_or_else(|| anyhow::anyhow!("no shareholder left"))?;
    Ok(json!({
        "mode": eval.mode(),
        "total_votes": eval.total_votes(),
        "heaviest": top.to_string(),
        "heaviest_weight": weight.round_dp(4),
        "heaviest_rights": eval.rights(top)?.len(),
        "majority": majority,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioSize;

    fn size(participants: usize) -> ScenarioSize {
        ScenarioSize {
            participants,
            candidates: 3,
            turnout: 0.7,
        }
    }

    #[tokio::test]
    async fn test_full_turnout_completes() {
        let mut controller = SimulationController::new(Some(7));
        let report = controller
            .run_scenario(Scenario::load("full-turnout", size(20)).unwrap())
            .await
            .unwrap();

        assert_eq!(report.result["ballots_cast"], 20);
        assert_eq!(report.result["summary"]["phase"], "COMPLETED");

        let metrics = controller.get_metrics().await;
        assert_eq!(metrics.events_by_kind["ballot_cast"], 20);
        assert_eq!(metrics.events_by_kind["poll_completed"], 1);
        // The late voter and the repeated ballot.
        assert_eq!(metrics.failed_operations, 2);
    }

    #[tokio::test]
    async fn test_every_scenario_runs() {
        let mut controller = SimulationController::new(Some(42));
        for scenario in Scenario::all(size(12)).unwrap() {
            controller.run_scenario(scenario).await.unwrap();
        }

        let metrics = controller.get_metrics().await;
        assert!(metrics.total_operations > 0);
        assert!(metrics.events_by_kind.contains_key("poll_cleared"));
        assert!(metrics.events_by_kind.contains_key("access_granted"));
    }
}
