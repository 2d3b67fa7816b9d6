//! Legality predicates and the deal/refill/termination rules.
//!
//! Everything here is a pure function of its inputs. [`MatchState`] composes
//! these into the turn loop.
//!
//! [`MatchState`]: crate::game::match_state::MatchState

use crate::model::card::Card;
use crate::model::deck::Deck;
use crate::model::hand::Hand;
use crate::model::suit::Suit;
use crate::model::table::Board;

pub const HAND_SIZE: usize = 6;
pub const MIN_PLAYERS: usize = 2;
pub const MAX_PLAYERS: usize = 5;

pub fn can_beat(attack: Card, defense: Card, trump: Suit) -> bool {
    if defense.suit == trump && attack.suit != trump {
        return true;
    }
    defense.suit == attack.suit && defense.rank > attack.rank
}

pub fn valid_attack_cards(hand: &Hand, board: &Board) -> Vec<Card> {
    if board.is_empty() {
        return hand.cards().to_vec();
    }
    hand.iter()
        .copied()
        .filter(|card| board.contains_rank(card.rank))
        .collect()
}

pub fn valid_defense_cards(hand: &Hand, attack: Card, trump: Suit) -> Vec<Card> {
    hand.iter()
        .copied()
        .filter(|&card| can_beat(attack, card, trump))
        .collect()
}

/// Deals `hand_size` rounds from the top of the pile, one card per player per
/// round, then reserves the bottom card as the trump indicator.
pub fn deal_initial_hands(mut deck: Deck, player_count: usize, hand_size: usize) -> (Vec<Hand>, Deck) {
    let mut hands = vec![Hand::new(); player_count];
    for _ in 0..hand_size {
        for hand in hands.iter_mut() {
            if let Some(card) = deck.draw() {
                hand.add(card);
            }
        }
    }
    deck.reserve_trump();
    (hands, deck)
}

/// Holder of the lowest trump starts. Nobody holding a trump falls back to seat 0.
pub fn determine_first_attacker(hands: &[Hand], trump: Suit) -> usize {
    hands
        .iter()
        .enumerate()
        .filter_map(|(idx, hand)| hand.lowest_of_suit(trump).map(|card| (idx, card.rank)))
        .min_by_key(|(_, rank)| *rank)
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Tops up hands in rotation starting at `start` until each holds `hand_size`
/// or the deck runs dry.
pub fn refill_hands(hands: &mut [Hand], deck: &mut Deck, start: usize, hand_size: usize) {
    let count = hands.len();
    if count == 0 {
        return;
    }
    for offset in 0..count {
        let hand = &mut hands[(start + offset) % count];
        while hand.len() < hand_size {
            match deck.draw() {
                Some(card) => hand.add(card),
                None => return,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Ongoing,
    /// `loser` is `None` when every hand emptied at once.
    Over { loser: Option<usize> },
}

impl Termination {
    pub const fn is_over(self) -> bool {
        matches!(self, Termination::Over { .. })
    }

    pub const fn loser(self) -> Option<usize> {
        match self {
            Termination::Over { loser } => loser,
            Termination::Ongoing => None,
        }
    }
}

pub fn check_termination(hands: &[Hand], deck_empty: bool) -> Termination {
    if !deck_empty {
        return Termination::Ongoing;
    }
    let mut holders = hands
        .iter()
        .enumerate()
        .filter(|(_, hand)| !hand.is_empty())
        .map(|(idx, _)| idx);
    match (holders.next(), holders.next()) {
        (None, _) => Termination::Over { loser: None },
        (Some(idx), None) => Termination::Over { loser: Some(idx) },
        _ => Termination::Ongoing,
    }
}
