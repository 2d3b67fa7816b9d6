use crate::model::card::Card;
use crate::model::rank::Rank;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Sub-turn within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Attack,
    Defend,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Phase::Attack => "attack",
            Phase::Defend => "defend",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableEntry {
    pub attack: Card,
    pub defense: Option<Card>,
}

impl TableEntry {
    pub const fn open(attack: Card) -> Self {
        Self {
            attack,
            defense: None,
        }
    }

    pub const fn is_defended(&self) -> bool {
        self.defense.is_some()
    }
}

/// Attack/defense pairs of the round in play.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Board {
    entries: Vec<TableEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    NothingToCover,
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardError::NothingToCover => write!(f, "every attack on the board is already covered"),
        }
    }
}

impl std::error::Error for BoardError {}

impl Board {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(6),
        }
    }

    pub fn from_entries(entries: Vec<TableEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[TableEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn attack(&mut self, card: Card) {
        self.entries.push(TableEntry::open(card));
    }

    /// Covers the oldest undefended attack.
    pub fn defend(&mut self, card: Card) -> Result<(), BoardError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.defense.is_none())
            .ok_or(BoardError::NothingToCover)?;
        entry.defense = Some(card);
        Ok(())
    }

    pub fn first_undefended(&self) -> Option<Card> {
        self.entries
            .iter()
            .find(|entry| entry.defense.is_none())
            .map(|entry| entry.attack)
    }

    pub fn undefended_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_defended()).count()
    }

    pub fn all_defended(&self) -> bool {
        self.entries.iter().all(TableEntry::is_defended)
    }

    pub fn contains_rank(&self, rank: Rank) -> bool {
        self.entries.iter().any(|entry| {
            entry.attack.rank == rank || entry.defense.is_some_and(|card| card.rank == rank)
        })
    }

    pub fn ranks(&self) -> Vec<Rank> {
        let mut ranks: Vec<Rank> = self.cards().map(|card| card.rank).collect();
        ranks.sort();
        ranks.dedup();
        ranks
    }

    /// Every card on the table, attack before defense for each entry.
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.entries
            .iter()
            .flat_map(|entry| std::iter::once(entry.attack).chain(entry.defense))
    }

    pub fn card_count(&self) -> usize {
        self.entries.len() + self.entries.iter().filter(|e| e.is_defended()).count()
    }

    /// Empties the table, handing back the cards it held.
    pub fn clear(&mut self) -> Vec<Card> {
        let cards = self.cards().collect();
        self.entries.clear();
        cards
    }
}
