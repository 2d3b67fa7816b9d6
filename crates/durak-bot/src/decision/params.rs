/// Tunable constants for every difficulty tier.
///
/// Defaults reproduce the canonical tier presets; the bench overrides
/// individual fields when sweeping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionParams {
    // === Card valuation ===
    /// Trump premium multiplier in the keep-value of a card (default: 1.0 -> +20)
    pub trump_conservation: f64,
    /// Discount multiplier for ranks held in pairs (default: 1.0 -> -5)
    pub aggressive_factor: f64,

    // === Easy ===
    /// Chance of leading the worst card on purpose (default: 0.4)
    pub easy_worst_pick: f64,
    /// Chance of taking despite holding a cover (default: 0.2)
    pub easy_take: f64,

    // === Medium ===
    /// Chance of the single best attack instead of a random top-half pick (default: 0.7)
    pub medium_best_pick: f64,
    /// Chance of taking despite holding a cover (default: 0.1)
    pub medium_take: f64,

    // === Hard ===
    /// Keep-value excess over the attack that makes covering too expensive (default: 15.0)
    pub hard_overspend_margin: f64,
    /// Overspend guard only kicks in above this hand size (default: 4)
    pub hard_overspend_min_hand: usize,

    // === Continue attacking ===
    pub continue_easy: f64,
    pub continue_medium: f64,
    pub continue_hard: f64,
    pub continue_expert: f64,
    /// Keep-value below which a card counts as cheap for medium (default: 15.0)
    pub medium_cheap_value: f64,
    /// Keep-value below which a card counts as cheap for hard/expert (default: 12.0)
    pub strong_cheap_value: f64,
    /// Pile size at or under which expert presses every attack (default: 5)
    pub expert_pressure_deck: usize,
    /// Estimated defender strength at or under which expert always piles on
    /// a cheap card (default: 0.25)
    pub expert_weak_opponent: f64,

    // === Expert: endgame solver ===
    /// Own plus opponent cards at or under which the solver runs (default: 8)
    pub endgame_card_threshold: usize,
    /// Plies searched before falling back to the static evaluator (default: 24)
    pub endgame_max_depth: usize,
    /// Hard cap on visited positions per decision (default: 40000)
    pub endgame_node_budget: usize,

    // === Expert: tactics ===
    /// Minimum confidence for a tactic to be considered (default: 0.2)
    pub tactic_confidence_floor: f64,
    /// Quality (success * confidence) at which a tactic always fires (default: 0.5)
    pub tactic_quality_cap: f64,

    // === Expert: heuristic attack ===
    pub attack_strength_weight: f64,
    pub attack_unbeatable_weight: f64,
    pub attack_learned_weight: f64,
    pub attack_duplicate_weight: f64,
    /// Bonus for opening with a low non-trump while the pile is deep (default: 5.0)
    pub attack_opening_bonus: f64,
    /// Penalty for attacking with trump while the pile holds more than ten (default: 4.0)
    pub attack_early_trump_penalty: f64,

    // === Expert: heuristic defense ===
    pub defense_waste_weight: f64,
    /// Cost added to trump covers while the pile holds more than ten (default: 15.0)
    pub defense_early_trump_cost: f64,
    pub defense_learned_weight: f64,
    /// Cost relief when behind on cards with an empty pile (default: 5.0)
    pub defense_endgame_push: f64,
    /// Excess over the attack value that triggers a take when ahead (default: 10.0)
    pub defense_overspend_margin: f64,
}

impl Default for DecisionParams {
    fn default() -> Self {
        Self {
            trump_conservation: 1.0,
            aggressive_factor: 1.0,

            easy_worst_pick: 0.4,
            easy_take: 0.2,

            medium_best_pick: 0.7,
            medium_take: 0.1,

            hard_overspend_margin: 15.0,
            hard_overspend_min_hand: 4,

            continue_easy: 0.3,
            continue_medium: 0.5,
            continue_hard: 0.65,
            continue_expert: 0.8,
            medium_cheap_value: 15.0,
            strong_cheap_value: 12.0,
            expert_pressure_deck: 5,
            expert_weak_opponent: 0.25,

            endgame_card_threshold: 8,
            endgame_max_depth: 24,
            endgame_node_budget: 40_000,

            tactic_confidence_floor: 0.2,
            tactic_quality_cap: 0.5,

            attack_strength_weight: 0.5,
            attack_unbeatable_weight: 10.0,
            attack_learned_weight: 3.0,
            attack_duplicate_weight: 2.0,
            attack_opening_bonus: 5.0,
            attack_early_trump_penalty: 4.0,

            defense_waste_weight: 0.8,
            defense_early_trump_cost: 15.0,
            defense_learned_weight: 2.0,
            defense_endgame_push: 5.0,
            defense_overspend_margin: 10.0,
        }
    }
}
