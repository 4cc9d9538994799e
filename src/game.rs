use crate::*;

/// The two sides of a game. Side 1 learns; side 2 is a static policy or
/// an externally driven (human) collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Learner,
    Opponent,
}

/// The geometrically legal targets for one side's next decision, handed
/// to the external input collaborator so it can offer only valid cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidates {
    pub steps: Vec<Cell>,
    pub guesses: Vec<Cell>,
}

/// Result of asking the game to play one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A round was resolved; the flags report which sides were not frozen.
    Played {
        learner_moved: bool,
        opponent_moved: bool,
    },
    /// The game was already terminal; nothing changed.
    AlreadyOver,
}

/// The game board and turn engine.
///
/// Owns both agents and drives the round loop: simultaneous decisions,
/// freeze resolution, the learner's update, position bookkeeping, and
/// termination. A side is frozen for the round when the other side
/// predicted its step target exactly. A side wins by reaching the goal
/// row; simultaneous arrival is a draw and increments neither counter.
#[derive(Debug)]
pub struct Game {
    lattice: Lattice,
    config: Config,
    learner: Agent,
    opponent: Agent,
    round: usize,
    over: bool,
}

impl Game {
    pub fn new(lattice: Lattice, config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lattice,
            config,
            learner: Agent::new(lattice, config.seed),
            opponent: Agent::new(lattice, config.seed.map(|s| s.wrapping_add(1))),
            round: 0,
            over: false,
        })
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }
    pub fn config(&self) -> &Config {
        &self.config
    }
    pub fn round(&self) -> usize {
        self.round
    }
    pub fn is_over(&self) -> bool {
        self.over
    }
    pub fn agent(&self, side: Side) -> &Agent {
        match side {
            Side::Learner => &self.learner,
            Side::Opponent => &self.opponent,
        }
    }
    /// Mutable learner access for strategy persistence.
    pub fn learner_mut(&mut self) -> &mut Agent {
        &mut self.learner
    }
    /// Snapshot of all four matrices: learner step, learner prediction,
    /// opponent step, opponent prediction.
    pub fn matrices(&self) -> [&ProbMatrix; 4] {
        [
            self.learner.steps(),
            self.learner.guesses(),
            self.opponent.steps(),
            self.opponent.guesses(),
        ]
    }
    pub fn wins(&self, side: Side) -> u32 {
        self.agent(side).wins()
    }

    /// Legal `(step, guess)` candidate cells for a side, bounded by the
    /// lattice geometry alone. The external input collaborator offers
    /// these to the human and hands back one concrete pair.
    pub fn candidates(&self, side: Side) -> Candidates {
        let agent = self.agent(side);
        let legal = |from: Cell| {
            from.forward()
                .into_iter()
                .filter(|cell| self.lattice.contains(*cell))
                .collect::<Vec<_>>()
        };
        Candidates {
            steps: legal(agent.position()),
            guesses: legal(agent.belief()),
        }
    }

    /// Plays one round with both sides deciding from their own policies.
    pub fn step(&mut self) -> Result<Step> {
        if self.over {
            log::debug!("[board] step requested but the game is already over");
            return Ok(Step::AlreadyOver);
        }
        let mine = self.learner.decide(self.config.explore_learner)?;
        let theirs = self.opponent.decide(self.config.explore_opponent)?;
        self.advance(mine, theirs)
    }

    /// Plays one round with side 2's decision supplied externally.
    ///
    /// The decision is validated against the opponent's matrices first;
    /// an [`Error::InvalidMove`] leaves the game untouched so the caller
    /// can re-prompt.
    pub fn step_manual(&mut self, theirs: Decision) -> Result<Step> {
        if self.over {
            log::debug!("[board] step requested but the game is already over");
            return Ok(Step::AlreadyOver);
        }
        let theirs = self.opponent.confirm(theirs)?;
        let mine = self.learner.decide(self.config.explore_learner)?;
        self.advance(mine, theirs)
    }

    /// Resolves one round from the two simultaneous decisions.
    fn advance(&mut self, mine: Decision, theirs: Decision) -> Result<Step> {
        let learner_frozen = theirs.guess == mine.step;
        let opponent_frozen = mine.guess == theirs.step;
        let feedback = Feedback {
            i_can_step: !learner_frozen,
            opp_can_step: !opponent_frozen,
            mine,
            theirs,
        };
        // the learner updates before any position changes: the backprop
        // rules read predecessor weights at the pre-move positions
        self.config
            .learning
            .apply(&mut self.learner, &feedback, self.config.learning_constant)?;
        if !learner_frozen {
            self.learner.relocate(mine.step);
            self.opponent.suspect(mine.step);
        }
        if !opponent_frozen {
            self.opponent.relocate(theirs.step);
            self.learner.suspect(theirs.step);
        }
        self.round += 1;
        log::debug!(
            "[board] round {}: learner {} opponent {}",
            self.round,
            self.learner.position(),
            self.opponent.position(),
        );
        let learner_home = self.learner.position().row == self.lattice.goal();
        let opponent_home = self.opponent.position().row == self.lattice.goal();
        match (learner_home, opponent_home) {
            (true, false) => {
                self.learner.record_win();
                self.over = true;
                log::debug!("[board] learner wins after {} rounds", self.round);
            }
            (false, true) => {
                self.opponent.record_win();
                self.over = true;
                log::debug!("[board] opponent wins after {} rounds", self.round);
            }
            (true, true) => {
                self.over = true;
                log::debug!("[board] draw after {} rounds", self.round);
            }
            (false, false) => {}
        }
        Ok(Step::Played {
            learner_moved: !learner_frozen,
            opponent_moved: !opponent_frozen,
        })
    }

    /// Returns both sides to the start cell and clears the round counter
    /// and terminal flag. Win counters and learned matrices persist; use
    /// [`Game::reset_wins`] at session boundaries.
    pub fn reset(&mut self) {
        let start = self.lattice.start();
        self.learner.relocate(start);
        self.learner.suspect(start);
        self.opponent.relocate(start);
        self.opponent.suspect(start);
        self.round = 0;
        self.over = false;
    }

    /// Zeroes both win counters.
    pub fn reset_wins(&mut self) {
        self.learner.reset_wins();
        self.opponent.reset_wins();
    }
}
