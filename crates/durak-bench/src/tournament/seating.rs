/// Deterministic seat assignments: entry `s` is the agent index playing seat `s`.
pub struct SeatRotation {
    agents: usize,
    rotate: bool,
}

impl SeatRotation {
    pub fn new(agents: usize, rotate: bool) -> Self {
        Self { agents, rotate }
    }

    /// With rotation on, every agent moves one seat per match so the
    /// first-attack advantage is shared out evenly.
    pub fn for_match(&self, match_index: usize) -> Vec<usize> {
        let shift = if self.rotate { match_index % self.agents.max(1) } else { 0 };
        (0..self.agents)
            .map(|seat| (seat + shift) % self.agents)
            .collect()
    }
}
