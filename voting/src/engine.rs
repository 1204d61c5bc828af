//! Poll engine: roster management, ballot distribution, casting and tally.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use tokenkit_common::{
    elapsed, ratio, system_clock, AccountId, Amount, EventRecord, LedgerId, PollPhase, Result,
    SharedClock, StopReason, TokenError, TokenEvent,
};
use tokenkit_ledger::Ledger;

use crate::config::PollConfig;
use crate::poll::{CandidateScore, PollState, PollSummary};
use crate::tally::Tally;

/// A poll whose ballots are unit tokens of its own ledger.
///
/// The referee (the token creator) registers candidates and voters while the
/// poll is not started. Starting hands one ballot to every voter; casting a
/// vote moves that ballot into the chosen candidate's account. The poll
/// completes on its own once no ballot is left, or stops when the referee
/// interrupts it. Ballots never move any other way: there is no free
/// transfer on a poll ledger.
pub struct VotingEngine {
    ledger: Ledger,
    state: PollState,
    clock: SharedClock,
}

impl VotingEngine {
    /// Create a poll with `supply` ballots, refereed by `referee`.
    pub fn init(
        config: PollConfig,
        referee: AccountId,
        supply: Amount,
        name: impl Into<String>,
        symbol: impl Into<String>,
    ) -> Result<Self> {
        Self::with_clock(config, referee, supply, name, symbol, system_clock())
    }

    /// Create a poll using the given clock for timestamps.
    pub fn with_clock(
        config: PollConfig,
        referee: AccountId,
        supply: Amount,
        name: impl Into<String>,
        symbol: impl Into<String>,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        let ledger = Ledger::with_clock(
            config.ledger,
            name,
            symbol,
            referee.clone(),
            supply,
            clock.clone(),
        )?;

        info!(
            poll_id = %ledger.id(),
            referee = %referee,
            supply = ledger.total_supply(),
            "Poll initialized"
        );

        Ok(Self {
            ledger,
            state: PollState::new(referee),
            clock,
        })
    }

    // Properties

    /// Poll identity.
    pub fn id(&self) -> LedgerId {
        self.ledger.id()
    }

    /// Underlying ballot ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The referee.
    pub fn referee(&self) -> &AccountId {
        &self.state.referee
    }

    /// Current phase.
    pub fn phase(&self) -> PollPhase {
        self.state.phase()
    }

    /// Why the poll stopped, if it did.
    pub fn stop_reason(&self) -> StopReason {
        self.state.stop_reason
    }

    /// Check if ballots are being cast.
    pub fn is_vote_in_progress(&self) -> bool {
        self.phase() == PollPhase::InProgress
    }

    /// When the current vote began.
    pub fn began_at(&self) -> Option<DateTime<Utc>> {
        self.state.began_at
    }

    /// When the current vote ended.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.state.ended_at
    }

    /// Current ballot supply.
    pub fn total_supply(&self) -> Amount {
        self.ledger.total_supply()
    }

    /// Ballots held by an account.
    pub fn balance_of(&self, account: &AccountId) -> Result<Amount> {
        self.ledger.balance_of(account)
    }

    /// Candidates in registration order.
    pub fn candidates(&self) -> &[AccountId] {
        &self.state.candidates
    }

    /// Number of candidates.
    pub fn candidates_count(&self) -> usize {
        self.state.candidates.len()
    }

    /// Number of registered voters.
    pub fn voters_count(&self) -> usize {
        // The referee and every candidate always have an entry.
        self.ledger
            .holders_count()
            .saturating_sub(self.state.candidates.len() + 1)
    }

    /// Registered voters, in account order.
    pub fn voters(&self) -> Vec<AccountId> {
        self.ledger
            .accounts()
            .filter(|(account, _)| self.is_voter(account))
            .map(|(account, _)| account.clone())
            .collect()
    }

    /// Check if the address is a registered voter.
    pub fn is_voter(&self, account: &AccountId) -> bool {
        self.ledger.contains(account)
            && *account != self.state.referee
            && !self.state.is_candidate(account)
    }

    /// Check if the address is a candidate.
    pub fn is_candidate(&self, account: &AccountId) -> bool {
        self.state.is_candidate(account)
    }

    /// Attach a subscriber to the poll's event stream.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EventRecord> {
        self.ledger.subscribe()
    }

    // Supply

    /// Create ballots. Referee only, before the poll starts.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn mint(&mut self, actor: &AccountId, amount: Amount) -> Result<Amount> {
        self.ensure_referee(actor, "mint ballots")?;
        self.ensure_phase(PollPhase::NotStarted, "mint ballots")?;
        let referee = self.state.referee.clone();
        self.ledger.mint(&referee, amount)
    }

    /// Destroy ballots. Referee only, before the poll starts, and never
    /// below the number of registered voters.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn burn(&mut self, actor: &AccountId, amount: Amount) -> Result<Amount> {
        self.ensure_referee(actor, "burn ballots")?;
        self.ensure_phase(PollPhase::NotStarted, "burn ballots")?;
        let referee = self.state.referee.clone();
        self.ledger.require(&referee, amount)?;

        let remaining_supply = self.ledger.total_supply() - amount;
        if remaining_supply < self.voters_count() as Amount {
            return Err(TokenError::RosterFull {
                voters: self.voters_count(),
                supply: remaining_supply,
            });
        }

        self.ledger.burn(&referee, amount)
    }

    // Allowances

    /// Let `spender` cast ballots on behalf of `actor`.
    pub fn approve(
        &mut self,
        actor: &AccountId,
        spender: &AccountId,
        amount: Amount,
    ) -> Result<bool> {
        self.ledger.approve(actor, spender, amount)
    }

    /// Change the number of ballots `spender` may cast on behalf of `actor`.
    pub fn update_approve(
        &mut self,
        actor: &AccountId,
        spender: &AccountId,
        delta: Amount,
    ) -> Result<Amount> {
        self.ledger.update_approve(actor, spender, delta)
    }

    /// Ballots `spender` may still cast on behalf of `owner`.
    pub fn allowance_of(&self, owner: &AccountId, spender: &AccountId) -> Amount {
        self.ledger.allowance_of(owner, spender)
    }

    // Roster management

    /// Register a voter for the next vote. Returns the new voter count.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn register_voter(&mut self, actor: &AccountId, voter: &AccountId) -> Result<usize> {
        self.ensure_referee(actor, "register voters")?;
        self.ensure_phase(PollPhase::NotStarted, "register voters")?;

        if *voter == self.state.referee || self.state.is_candidate(voter) {
            return Err(TokenError::DuplicateParticipant(voter.clone()));
        }
        if self.is_voter(voter) {
            return Ok(self.voters_count());
        }
        self.ensure_roster_not_full()?;

        self.ledger.open_account(voter)?;
        debug!(voter = %voter, voters = self.voters_count(), "Voter registered");
        Ok(self.voters_count())
    }

    /// Remove a voter from the next vote. Returns the new voter count.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn strike_off_voter(&mut self, actor: &AccountId, voter: &AccountId) -> Result<usize> {
        self.ensure_referee(actor, "strike off voters")?;
        self.ensure_phase(PollPhase::NotStarted, "strike off voters")?;

        if self.is_voter(voter) {
            self.ledger.close_account(voter)?;
            debug!(voter = %voter, "Voter struck off");
        }
        Ok(self.voters_count())
    }

    /// Add a candidate to the next vote. A registered voter who becomes a
    /// candidate leaves the electoral list. Returns the candidate count.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn add_candidate(&mut self, actor: &AccountId, candidate: &AccountId) -> Result<usize> {
        self.ensure_referee(actor, "add candidates")?;
        self.ensure_phase(PollPhase::NotStarted, "add candidates")?;

        if *candidate == self.state.referee || self.state.is_candidate(candidate) {
            return Err(TokenError::DuplicateParticipant(candidate.clone()));
        }
        if !self.is_voter(candidate) {
            self.ensure_roster_not_full()?;
        }

        self.ledger.open_account(candidate)?;
        self.state.candidates.push(candidate.clone());
        info!(candidate = %candidate, "Candidate added");
        Ok(self.candidates_count())
    }

    /// Remove a candidate from the next vote. Returns the candidate count.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn remove_candidate(&mut self, actor: &AccountId, candidate: &AccountId) -> Result<usize> {
        self.ensure_referee(actor, "remove candidates")?;
        self.ensure_phase(PollPhase::NotStarted, "remove candidates")?;
        self.ensure_candidate(candidate)?;

        self.ledger.close_account(candidate)?;
        self.state.candidates.retain(|c| c != candidate);
        info!(candidate = %candidate, "Candidate removed");
        Ok(self.candidates_count())
    }

    // Lifecycle

    /// Freeze the roster and hand one ballot to every voter.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn start(&mut self, actor: &AccountId) -> Result<bool> {
        self.ensure_referee(actor, "start the poll")?;
        self.ensure_phase(PollPhase::NotStarted, "start the poll")?;

        let voters = self.voters();
        if voters.is_empty() || self.state.candidates.is_empty() {
            return Err(TokenError::EmptyRoster);
        }

        let referee = self.state.referee.clone();
        let available = self.ledger.balance_of(&referee)?;
        if available < voters.len() as Amount {
            return Err(TokenError::RosterFull {
                voters: voters.len(),
                supply: available,
            });
        }

        self.state.begin(self.clock.now())?;
        for voter in &voters {
            if !self.ledger.transfer(&referee, voter, 1)? {
                return Err(TokenError::InsufficientBalance {
                    account: referee,
                    required: 1,
                    available: 0,
                });
            }
        }

        info!(
            voters = voters.len(),
            candidates = self.candidates_count(),
            "Poll started"
        );
        self.ledger.emit(TokenEvent::PollStarted {
            voters_count: voters.len(),
            candidates: self.state.candidates.clone(),
        });
        Ok(true)
    }

    /// Put the caller's ballot in the candidate's urn.
    ///
    /// Returns `Ok(false)` if the caller holds no ballot: they already voted
    /// or are not a registered voter.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn vote(&mut self, actor: &AccountId, candidate: &AccountId) -> Result<bool> {
        self.cast(actor, candidate, None)
    }

    /// Put `voter`'s ballot in the candidate's urn on their behalf, using an
    /// allowance they granted to the caller.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn vote_from(
        &mut self,
        actor: &AccountId,
        voter: &AccountId,
        candidate: &AccountId,
    ) -> Result<bool> {
        self.cast(voter, candidate, Some(actor))
    }

    /// Manually stop the vote. Returns the winner.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn interrupt(&mut self, actor: &AccountId) -> Result<AccountId> {
        self.ensure_referee(actor, "interrupt the poll")?;
        self.ensure_phase(PollPhase::InProgress, "interrupt the poll")?;

        self.state.stop(StopReason::Interrupted, self.clock.now())?;
        let winner = self.get_winner()?;
        let duration_ms = self.get_vote_duration()?.num_milliseconds();

        info!(winner = %winner, duration_ms, "Poll interrupted");
        self.ledger.emit(TokenEvent::PollInterrupted {
            winner: winner.clone(),
            duration_ms,
        });
        Ok(winner)
    }

    /// Reset the poll: timestamps forgotten, candidates removed, every ballot
    /// back to the referee. Voters stay registered.
    #[instrument(skip(self), fields(poll_id = %self.id()))]
    pub fn clear(&mut self, actor: &AccountId) -> Result<bool> {
        self.ensure_referee(actor, "clear the poll")?;
        let phase = self.phase();
        if phase == PollPhase::InProgress {
            warn!("Refusing to clear a running poll");
            return Err(TokenError::invalid_poll_state("clear the poll", phase));
        }

        let referee = self.state.referee.clone();
        self.ledger.sweep_to(&referee)?;
        let candidates = std::mem::take(&mut self.state.candidates);
        let closed = self
            .ledger
            .close_empty_accounts(|account| candidates.contains(account));
        debug!(closed, "Candidate urns closed");
        self.state.reset()?;

        info!(voters = self.voters_count(), "Poll cleared");
        self.ledger.emit(TokenEvent::PollCleared { referee });
        Ok(true)
    }

    // Poll info

    /// Check if the voter already cast their ballot in the current vote.
    pub fn has_voted(&self, voter: &AccountId) -> bool {
        self.state.is_started()
            && self.is_voter(voter)
            && self.ledger.balance_of(voter).map(|b| b == 0).unwrap_or(false)
    }

    /// Number of voters who have not cast their ballot yet.
    pub fn get_remaining_votes(&self) -> Result<usize> {
        self.ensure_started("count remaining votes")?;
        let cast = usize::try_from(self.tally().cast()).unwrap_or(usize::MAX);
        Ok(self.voters_count().saturating_sub(cast))
    }

    /// Share of voters who cast their ballot.
    pub fn get_participation(&self) -> Result<Decimal> {
        let remaining = self.get_remaining_votes()?;
        Ok(Decimal::ONE - ratio(remaining as Amount, self.voters_count() as Amount))
    }

    /// Duration of the vote; keeps growing until the poll stops.
    pub fn get_vote_duration(&self) -> Result<Duration> {
        self.ensure_started("measure the vote duration")?;
        let began_at = self.state.began_at.unwrap_or_else(|| self.clock.now());
        let ended_at = self.state.ended_at.unwrap_or_else(|| self.clock.now());
        Ok(elapsed(began_at, ended_at))
    }

    /// Share of all voters who chose the candidate. Stopped polls only.
    pub fn get_score(&self, candidate: &AccountId) -> Result<Decimal> {
        self.ensure_stopped("read scores")?;
        self.ensure_candidate(candidate)?;
        self.tally()
            .score(candidate)
            .ok_or_else(|| TokenError::UnknownCandidate(candidate.clone()))
    }

    /// Candidates by descending score; equal scores keep registration order.
    /// Stopped polls only.
    pub fn get_ranking(&self) -> Result<Vec<AccountId>> {
        self.ensure_stopped("read the ranking")?;
        Ok(self
            .tally()
            .ranking()
            .into_iter()
            .map(|(candidate, _)| candidate)
            .collect())
    }

    /// Best ranked candidate. Stopped polls only.
    pub fn get_winner(&self) -> Result<AccountId> {
        self.ensure_stopped("read the winner")?;
        self.tally().winner().ok_or(TokenError::EmptyRoster)
    }

    /// Snapshot of the poll for reports.
    pub fn summary(&self) -> PollSummary {
        let tally = self.tally();
        let ranking = if self.phase().is_stopped() {
            tally
                .ranking()
                .into_iter()
                .map(|(candidate, ballots)| CandidateScore {
                    score: tally.score(&candidate).unwrap_or(Decimal::ZERO),
                    candidate,
                    ballots,
                })
                .collect()
        } else {
            Vec::new()
        };

        PollSummary {
            poll_id: self.id(),
            name: self.ledger.metadata().name.clone(),
            phase: self.phase(),
            voters_count: self.voters_count(),
            ranking,
            participation: self.get_participation().ok(),
            duration_ms: self.get_vote_duration().ok().map(|d| d.num_milliseconds()),
        }
    }

    // Internals

    fn cast(
        &mut self,
        voter: &AccountId,
        candidate: &AccountId,
        delegate: Option<&AccountId>,
    ) -> Result<bool> {
        self.ensure_phase(PollPhase::InProgress, "vote")?;
        self.ensure_candidate(candidate)?;

        if !self.is_voter(voter) {
            debug!(voter = %voter, "Ballot refused: not a voter");
            return Ok(false);
        }

        let cast = match delegate {
            None => self.ledger.transfer(voter, candidate, 1)?,
            Some(delegate) => self.ledger.transfer_from(delegate, voter, candidate, 1)?,
        };
        if !cast {
            debug!(voter = %voter, "Ballot refused: no ballot left");
            return Ok(false);
        }

        let remaining_votes = self.get_remaining_votes()?;
        let participation = self.get_participation()?;
        debug!(
            voter = %voter,
            candidate = %candidate,
            remaining_votes,
            "Ballot cast"
        );
        self.ledger.emit(TokenEvent::BallotCast {
            voter: voter.clone(),
            candidate: candidate.clone(),
            participation,
            remaining_votes,
        });

        if remaining_votes == 0 {
            self.state.stop(StopReason::Completed, self.clock.now())?;
            let winner = self.get_winner()?;
            let duration_ms = self.get_vote_duration()?.num_milliseconds();

            info!(winner = %winner, duration_ms, "Poll completed");
            self.ledger.emit(TokenEvent::PollCompleted {
                winner,
                duration_ms,
            });
        }
        Ok(true)
    }

    fn tally(&self) -> Tally {
        let counts = self
            .state
            .candidates
            .iter()
            .map(|c| (c.clone(), self.ledger.balance_of(c).unwrap_or(0)))
            .collect();
        Tally::new(counts, self.voters_count())
    }

    fn ensure_referee(&self, actor: &AccountId, action: &str) -> Result<()> {
        if *actor != self.state.referee {
            warn!(actor = %actor, action, "Unauthorized poll action");
            return Err(TokenError::unauthorized(actor, action));
        }
        Ok(())
    }

    fn ensure_phase(&self, expected: PollPhase, action: &str) -> Result<()> {
        let phase = self.phase();
        if phase != expected {
            return Err(TokenError::invalid_poll_state(action, phase));
        }
        Ok(())
    }

    fn ensure_started(&self, action: &str) -> Result<()> {
        if !self.state.is_started() {
            return Err(TokenError::invalid_poll_state(action, self.phase()));
        }
        Ok(())
    }

    fn ensure_stopped(&self, action: &str) -> Result<()> {
        let phase = self.phase();
        if !phase.is_stopped() {
            return Err(TokenError::invalid_poll_state(action, phase));
        }
        Ok(())
    }

    fn ensure_candidate(&self, candidate: &AccountId) -> Result<()> {
        if !self.state.is_candidate(candidate) {
            return Err(TokenError::UnknownCandidate(candidate.clone()));
        }
        Ok(())
    }

    fn ensure_roster_not_full(&self) -> Result<()> {
        let voters = self.voters_count();
        if voters as Amount >= self.ledger.total_supply() {
            return Err(TokenError::RosterFull {
                voters,
                supply: self.ledger.total_supply(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for VotingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VotingEngine")
            .field("poll_id", &self.id())
            .field("phase", &self.phase())
            .field("voters", &self.voters_count())
            .field("candidates", &self.state.candidates)
            .finish()
    }
}
