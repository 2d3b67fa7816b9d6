use super::match_state::{MatchError, MatchState};
use crate::game::rules::{MAX_PLAYERS, MIN_PLAYERS, Termination};
use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::hand::Hand;
use crate::model::suit::Suit;
use crate::model::table::{Board, Phase, TableEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Table contents as stored alongside knowledge records.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub entries: Vec<TableEntry>,
}

impl BoardSnapshot {
    pub fn capture(board: &Board) -> Self {
        Self {
            entries: board.entries().to_vec(),
        }
    }

    pub fn restore(&self) -> Board {
        Board::from_entries(self.entries.clone())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Ongoing,
    Over { loser: Option<usize> },
}

impl From<Termination> for SnapshotStatus {
    fn from(value: Termination) -> Self {
        match value {
            Termination::Ongoing => SnapshotStatus::Ongoing,
            Termination::Over { loser } => SnapshotStatus::Over { loser },
        }
    }
}

impl From<SnapshotStatus> for Termination {
    fn from(value: SnapshotStatus) -> Self {
        match value {
            SnapshotStatus::Ongoing => Termination::Ongoing,
            SnapshotStatus::Over { loser } => Termination::Over { loser },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSnapshot {
    pub seed: u64,
    pub trump_suit: Suit,
    #[serde(default)]
    pub trump_card: Option<Card>,
    pub attacker: usize,
    pub defender: usize,
    pub phase: Phase,
    pub hands: Vec<Vec<Card>>,
    pub deck: Vec<Card>,
    pub board: BoardSnapshot,
    #[serde(default)]
    pub discard: Vec<Card>,
    #[serde(default)]
    pub move_count: u32,
    pub status: SnapshotStatus,
}

impl MatchSnapshot {
    pub fn capture(state: &MatchState) -> Self {
        MatchSnapshot {
            seed: state.seed(),
            trump_suit: state.trump_suit(),
            trump_card: state.deck().trump_card(),
            attacker: state.attacker(),
            defender: state.defender(),
            phase: state.phase(),
            hands: state.hands().iter().map(|hand| hand.cards().to_vec()).collect(),
            deck: state.deck().cards().to_vec(),
            board: BoardSnapshot::capture(state.board()),
            discard: state.discard().to_vec(),
            move_count: state.move_count(),
            status: state.termination().into(),
        }
    }

    /// Rebuilds the position, rejecting snapshots no legal match could
    /// have produced.
    pub fn restore(self) -> Result<MatchState, MatchError> {
        self.validate()?;
        let deck = match self.trump_card {
            Some(trump) => Deck::with_trump(self.deck, trump),
            None => Deck::from_cards(self.deck),
        };
        let hands = self.hands.into_iter().map(Hand::with_cards).collect();
        let mut state =
            MatchState::from_parts(hands, deck, self.trump_suit, self.attacker, self.defender);
        state.restore_table(
            self.board.restore(),
            self.phase,
            self.discard,
            self.move_count,
            self.seed,
            self.status.into(),
        );
        Ok(state)
    }

    fn validate(&self) -> Result<(), MatchError> {
        let players = self.hands.len();
        if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&players) {
            return Err(MatchError::InvalidPlayerCount(players));
        }
        if self.attacker >= players || self.defender >= players || self.attacker == self.defender {
            return Err(MatchError::InvalidRoles {
                attacker: self.attacker,
                defender: self.defender,
                players,
            });
        }
        if let SnapshotStatus::Over { loser: Some(seat) } = self.status {
            if seat >= players {
                return Err(MatchError::InvalidSeat { seat, players });
            }
        }

        let table = self
            .board
            .entries
            .iter()
            .flat_map(|entry| std::iter::once(entry.attack).chain(entry.defense));
        let mut seen = HashSet::new();
        for card in self
            .hands
            .iter()
            .flatten()
            .copied()
            .chain(self.deck.iter().copied())
            .chain(self.trump_card)
            .chain(table)
            .chain(self.discard.iter().copied())
        {
            if !seen.insert(card) {
                return Err(MatchError::DuplicateCard(card));
            }
        }
        Ok(())
    }

    pub fn to_json(state: &MatchState) -> serde_json::Result<String> {
        let snapshot = Self::capture(state);
        serde_json::to_string_pretty(&snapshot)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::{BoardSnapshot, MatchSnapshot, SnapshotStatus};
    use crate::game::match_state::{MatchError, MatchState};
    use crate::model::card::Card;
    use crate::model::rank::Rank;
    use crate::model::suit::Suit;
    use crate::model::table::Phase;

    #[test]
    fn snapshot_serializes_structured_board() {
        let mut state = MatchState::with_seed(2, 99).unwrap();
        let opening = state.legal_moves()[0];
        state.apply_move(Some(opening)).unwrap();

        let json = MatchSnapshot::to_json(&state).unwrap();
        assert!(json.contains("\"seed\": 99"));
        assert!(json.contains("\"phase\": \"defend\""));
        assert!(json.contains("\"status\": \"ongoing\""));
        assert!(json.contains("\"attack\""));
    }

    #[test]
    fn snapshot_roundtrip_restores_position() {
        let mut state = MatchState::with_seed(3, 123).unwrap();
        let opening = state.legal_moves()[0];
        state.apply_move(Some(opening)).unwrap();

        let snapshot = MatchSnapshot::capture(&state);
        let restored = snapshot.clone().restore().unwrap();
        assert_eq!(restored.seed(), 123);
        assert_eq!(restored.hands(), state.hands());
        assert_eq!(restored.deck(), state.deck());
        assert_eq!(restored.board(), state.board());
        assert_eq!(restored.phase(), Phase::Defend);
        assert_eq!(restored.legal_moves(), state.legal_moves());
        assert_eq!(MatchSnapshot::capture(&restored), snapshot);
    }

    #[test]
    fn snapshot_from_json_defaults_optional_fields() {
        let minimal = r#"{
            "seed": 7,
            "trump_suit": "hearts",
            "attacker": 1,
            "defender": 0,
            "phase": "attack",
            "hands": [[{"rank": 6, "suit": "spades"}], []],
            "deck": [],
            "board": {"entries": []},
            "status": {"status": "over", "loser": 0}
        }"#;

        let snapshot = MatchSnapshot::from_json(minimal).unwrap();
        assert_eq!(snapshot.trump_card, None);
        assert!(snapshot.discard.is_empty());
        assert_eq!(snapshot.status, SnapshotStatus::Over { loser: Some(0) });
        assert!(snapshot.restore().unwrap().is_over());
    }

    #[test]
    fn restore_rejects_out_of_range_roles() {
        let json = r#"{
            "seed": 1,
            "trump_suit": "hearts",
            "attacker": 5,
            "defender": 0,
            "phase": "attack",
            "hands": [[{"rank": 6, "suit": "spades"}], [{"rank": 7, "suit": "spades"}]],
            "deck": [],
            "board": {"entries": []},
            "status": {"status": "ongoing"}
        }"#;
        let snapshot = MatchSnapshot::from_json(json).unwrap();
        assert_eq!(
            snapshot.restore().unwrap_err(),
            MatchError::InvalidRoles {
                attacker: 5,
                defender: 0,
                players: 2,
            }
        );
    }

    #[test]
    fn restore_rejects_bad_player_counts_and_losers() {
        let state = MatchState::with_seed(2, 8).unwrap();
        let mut lonely = MatchSnapshot::capture(&state);
        lonely.hands.truncate(1);
        assert_eq!(lonely.restore().unwrap_err(), MatchError::InvalidPlayerCount(1));

        let mut ghost_loser = MatchSnapshot::capture(&state);
        ghost_loser.status = SnapshotStatus::Over { loser: Some(4) };
        assert_eq!(
            ghost_loser.restore().unwrap_err(),
            MatchError::InvalidSeat { seat: 4, players: 2 }
        );
    }

    #[test]
    fn restore_rejects_duplicated_cards() {
        let state = MatchState::with_seed(2, 8).unwrap();
        let mut snapshot = MatchSnapshot::capture(&state);
        let copied = snapshot.hands[0][0];
        snapshot.discard.push(copied);
        assert_eq!(snapshot.restore().unwrap_err(), MatchError::DuplicateCard(copied));

        let mut twice = MatchSnapshot::capture(&state);
        let ace = Card::new(Rank::Ace, Suit::Spades);
        twice.hands[0].retain(|card| *card != ace);
        twice.hands[1].retain(|card| *card != ace);
        twice.deck.retain(|card| *card != ace);
        twice.hands[0].push(ace);
        twice.hands[1].push(ace);
        assert_eq!(twice.restore().unwrap_err(), MatchError::DuplicateCard(ace));
    }

    #[test]
    fn board_snapshot_is_lossless() {
        let mut state = MatchState::with_seed(2, 5).unwrap();
        let opening = state.legal_moves()[0];
        state.apply_move(Some(opening)).unwrap();
        let snap = BoardSnapshot::capture(state.board());
        assert_eq!(&snap.restore(), state.board());
    }
}
