use crate::model::card::Card;
use crate::model::rank::Rank;
use crate::model::suit::Suit;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub const DECK_SIZE: usize = 36;

/// Draw pile. The tail of `cards` is the top of the stack; the reserved
/// trump indicator sits underneath everything and is drawn last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
    trump_card: Option<Card>,
}

impl Deck {
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for suit in Suit::ALL.iter().copied() {
            for rank in Rank::ORDERED.iter().copied() {
                cards.push(Card::new(rank, suit));
            }
        }
        Self {
            cards,
            trump_card: None,
        }
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            cards,
            trump_card: None,
        }
    }

    /// Builds a pile with an already reserved trump indicator.
    pub fn with_trump(cards: Vec<Card>, trump_card: Card) -> Self {
        Self {
            cards,
            trump_card: Some(trump_card),
        }
    }

    pub fn shuffled<R: rand::Rng + ?Sized>(rng: &mut R) -> Self {
        let mut deck = Self::standard();
        deck.shuffle_in_place(rng);
        deck
    }

    pub fn shuffled_with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::shuffled(&mut rng)
    }

    pub fn shuffle_in_place<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Moves the bottom card out of the pile into the trump indicator slot.
    /// No-op when a trump card is already reserved or the pile is empty.
    pub fn reserve_trump(&mut self) -> Option<Card> {
        if self.trump_card.is_none() && !self.cards.is_empty() {
            self.trump_card = Some(self.cards.remove(0));
        }
        self.trump_card
    }

    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop().or_else(|| self.trump_card.take())
    }

    pub fn trump_card(&self) -> Option<Card> {
        self.trump_card
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Cards left in the pile, not counting the trump indicator.
    pub fn pile_len(&self) -> usize {
        self.cards.len()
    }

    /// Everything still drawable, trump indicator included.
    pub fn len(&self) -> usize {
        self.cards.len() + usize::from(self.trump_card.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty() && self.trump_card.is_none()
    }
}
