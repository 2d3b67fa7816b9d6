use crate::game::rules::{
    self, HAND_SIZE, MAX_PLAYERS, MIN_PLAYERS, Termination, check_termination,
    deal_initial_hands, determine_first_attacker, refill_hands,
};
use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::hand::Hand;
use crate::model::suit::Suit;
use crate::model::table::{Board, Phase};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("{card} is not a legal {phase} move")]
    IllegalMove { card: Card, phase: Phase },
    #[error("match is already over")]
    MatchOver,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("durak needs between 2 and 5 players, got {0}")]
    InvalidPlayerCount(usize),
    #[error("attacker {attacker} and defender {defender} must be distinct seats below {players}")]
    InvalidRoles {
        attacker: usize,
        defender: usize,
        players: usize,
    },
    #[error("seat {seat} is out of range for {players} players")]
    InvalidSeat { seat: usize, players: usize },
    #[error("{0} appears more than once")]
    DuplicateCard(Card),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResolution {
    Next {
        attacker: usize,
        defender: usize,
        took: bool,
    },
    Finished {
        loser: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Played { player: usize, card: Card },
    Resolved(RoundResolution),
}

#[derive(Debug, Clone)]
pub struct MatchState {
    hands: Vec<Hand>,
    deck: Deck,
    trump_suit: Suit,
    attacker: usize,
    defender: usize,
    board: Board,
    phase: Phase,
    discard: Vec<Card>,
    move_count: u32,
    seed: u64,
    termination: Termination,
}

impl MatchState {
    /// Shuffles with a seed drawn from `rng` so the match can be replayed
    /// from [`MatchState::seed`].
    pub fn new_match<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> Result<Self, MatchError> {
        let seed: u64 = rng.r#gen();
        Self::with_seed(player_count, seed)
    }

    pub fn with_seed(player_count: usize, seed: u64) -> Result<Self, MatchError> {
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&player_count) {
            return Err(MatchError::InvalidPlayerCount(player_count));
        }
        let deck = Deck::shuffled_with_seed(seed);
        let (hands, deck) = deal_initial_hands(deck, player_count, HAND_SIZE);
        let trump_suit = deck
            .trump_card()
            .map(|card| card.suit)
            .ok_or(MatchError::InvalidPlayerCount(player_count))?;
        let attacker = determine_first_attacker(&hands, trump_suit);
        let defender = (attacker + 1) % player_count;

        let mut state = Self::from_parts(hands, deck, trump_suit, attacker, defender);
        state.seed = seed;
        Ok(state)
    }

    /// Assembles a mid-match position directly. Used by tests and snapshot restore.
    pub fn from_parts(
        hands: Vec<Hand>,
        deck: Deck,
        trump_suit: Suit,
        attacker: usize,
        defender: usize,
    ) -> Self {
        debug_assert!(attacker < hands.len() && defender < hands.len());
        Self {
            hands,
            deck,
            trump_suit,
            attacker,
            defender,
            board: Board::new(),
            phase: Phase::Attack,
            discard: Vec::new(),
            move_count: 0,
            seed: 0,
            termination: Termination::Ongoing,
        }
    }

    pub(crate) fn restore_table(
        &mut self,
        board: Board,
        phase: Phase,
        discard: Vec<Card>,
        move_count: u32,
        seed: u64,
        termination: Termination,
    ) {
        self.board = board;
        self.phase = phase;
        self.discard = discard;
        self.move_count = move_count;
        self.seed = seed;
        self.termination = termination;
    }

    pub fn player_count(&self) -> usize {
        self.hands.len()
    }

    pub fn hands(&self) -> &[Hand] {
        &self.hands
    }

    pub fn hand(&self, player: usize) -> &Hand {
        &self.hands[player]
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn trump_suit(&self) -> Suit {
        self.trump_suit
    }

    pub fn attacker(&self) -> usize {
        self.attacker
    }

    pub fn defender(&self) -> usize {
        self.defender
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn discard(&self) -> &[Card] {
        &self.discard
    }

    pub fn move_count(&self) -> u32 {
        self.move_count
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn is_over(&self) -> bool {
        self.termination.is_over()
    }

    /// Seat expected to move next.
    pub fn actor(&self) -> usize {
        match self.phase {
            Phase::Attack => self.attacker,
            Phase::Defend => self.defender,
        }
    }

    /// Whether the attacker may put another card down right now.
    pub fn can_add_attack(&self) -> bool {
        self.board.all_defended()
            && self.board.undefended_count() < self.hands[self.defender].len()
    }

    /// Cards the actor may play. Passing (`None`) is always accepted by
    /// [`MatchState::apply_move`] and is not listed here.
    pub fn legal_moves(&self) -> Vec<Card> {
        if self.is_over() {
            return Vec::new();
        }
        match self.phase {
            Phase::Attack => {
                if !self.can_add_attack() {
                    return Vec::new();
                }
                rules::valid_attack_cards(&self.hands[self.attacker], &self.board)
            }
            Phase::Defend => match self.board.first_undefended() {
                Some(attack) => {
                    rules::valid_defense_cards(&self.hands[self.defender], attack, self.trump_suit)
                }
                None => Vec::new(),
            },
        }
    }

    /// Everything `player` can see: their own hand, the table, the discard
    /// pile and the face-up trump indicator.
    pub fn visible_cards_for(&self, player: usize) -> Vec<Card> {
        let mut visible: Vec<Card> = self.hands[player].iter().copied().collect();
        visible.extend(self.board.cards());
        visible.extend(self.discard.iter().copied());
        visible.extend(self.deck.trump_card());
        visible
    }

    /// The seat `player` is duelling with this round.
    pub fn opponent_of(&self, player: usize) -> usize {
        if player == self.defender {
            self.attacker
        } else {
            self.defender
        }
    }

    pub fn opponent_hand_size(&self, player: usize) -> usize {
        self.hands[self.opponent_of(player)].len()
    }

    /// `Some(card)` plays for the actor; `None` passes when attacking and
    /// takes the table when defending.
    pub fn apply_move(&mut self, mv: Option<Card>) -> Result<MoveOutcome, MoveError> {
        if self.is_over() {
            return Err(MoveError::MatchOver);
        }
        let player = self.actor();
        let phase = self.phase;

        let Some(card) = mv else {
            self.move_count += 1;
            let took = phase == Phase::Defend;
            return Ok(MoveOutcome::Resolved(self.resolve_round(took)));
        };

        if !self.legal_moves().contains(&card) {
            return Err(MoveError::IllegalMove { card, phase });
        }
        let removed = self.hands[player].remove(card);
        debug_assert!(removed, "legal card must come from the actor's hand");

        match phase {
            Phase::Attack => {
                self.board.attack(card);
                self.phase = Phase::Defend;
            }
            Phase::Defend => {
                self.board
                    .defend(card)
                    .map_err(|_| MoveError::IllegalMove { card, phase })?;
                self.phase = Phase::Attack;
            }
        }
        self.move_count += 1;
        Ok(MoveOutcome::Played { player, card })
    }

    /// Ends the current round: the table goes to the defender or the discard
    /// pile, hands are refilled attacker first, then roles rotate or the
    /// match finishes.
    pub fn resolve_round(&mut self, defender_took: bool) -> RoundResolution {
        let table = self.board.clear();
        if defender_took {
            self.hands[self.defender].extend(table);
        } else {
            self.discard.extend(table);
        }
        self.phase = Phase::Attack;

        refill_hands(&mut self.hands, &mut self.deck, self.attacker, HAND_SIZE);

        if self.deck.is_empty() {
            let termination = check_termination(&self.hands, true);
            if let Termination::Over { loser } = termination {
                self.termination = termination;
                return RoundResolution::Finished { loser };
            }
        }

        // A taker forfeits their turn to attack: an emptied attacker hands
        // the lead to the first holder after the taker, never the taker.
        let attacker = match (defender_took, self.hands[self.attacker].is_empty()) {
            (true, false) => Some(self.attacker),
            (true, true) => self.next_active(self.defender, self.defender),
            (false, _) => self.active_or_next(self.defender),
        };
        let defender = attacker.and_then(|a| {
            if defender_took && a == self.attacker {
                self.next_active(self.defender, a)
            } else {
                self.next_active(a, a)
            }
        });

        match (attacker, defender) {
            (Some(attacker), Some(defender)) => {
                self.attacker = attacker;
                self.defender = defender;
                RoundResolution::Next {
                    attacker,
                    defender,
                    took: defender_took,
                }
            }
            _ => {
                let loser = self.hands.iter().position(|hand| !hand.is_empty());
                self.termination = Termination::Over { loser };
                RoundResolution::Finished { loser }
            }
        }
    }

    fn active_or_next(&self, seat: usize) -> Option<usize> {
        if !self.hands[seat].is_empty() {
            Some(seat)
        } else {
            self.next_active(seat, usize::MAX)
        }
    }

    /// First seat after `from` in turn order holding cards, never `skip`.
    /// `from` itself is the last candidate.
    fn next_active(&self, from: usize, skip: usize) -> Option<usize> {
        let count = self.hands.len();
        (1..=count)
            .map(|offset| (from + offset) % count)
            .find(|&seat| seat != skip && !self.hands[seat].is_empty())
    }
}
