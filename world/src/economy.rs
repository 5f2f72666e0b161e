//! Player-facing counters and session status.

use detour_defence_core::{EconomySnapshot, PlacementError, SessionStatus};

use crate::Config;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Economy {
    money: u32,
    lives: u32,
    wave: u32,
    score: u32,
    status: SessionStatus,
}

impl Economy {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            money: config.starting_money,
            lives: config.starting_lives,
            wave: 0,
            score: 0,
            status: SessionStatus::Playing,
        }
    }

    pub(crate) const fn status(&self) -> SessionStatus {
        self.status
    }

    pub(crate) const fn wave(&self) -> u32 {
        self.wave
    }

    pub(crate) const fn is_playing(&self) -> bool {
        matches!(self.status, SessionStatus::Playing)
    }

    /// Deducts `cost`, leaving the balance untouched when it is insufficient.
    pub(crate) fn spend(&mut self, cost: u32) -> Result<(), PlacementError> {
        if self.money < cost {
            return Err(PlacementError::InsufficientFunds {
                cost,
                available: self.money,
            });
        }
        self.money -= cost;
        Ok(())
    }

    pub(crate) const fn can_afford(&self, cost: u32) -> bool {
        self.money >= cost
    }

    /// Credits a kill reward to both money and score.
    pub(crate) fn credit(&mut self, reward: u32) {
        self.money = self.money.saturating_add(reward);
        self.score = self.score.saturating_add(reward);
    }

    pub(crate) fn next_wave(&mut self) -> u32 {
        self.wave = self.wave.saturating_add(1);
        self.wave
    }

    /// Removes lives, returning `true` when this ended the session.
    pub(crate) fn lose_lives(&mut self, count: u32) -> bool {
        self.lives = self.lives.saturating_sub(count);
        if self.lives == 0 && self.is_playing() {
            self.status = SessionStatus::GameOver;
            return true;
        }
        false
    }

    /// Declares victory once enough waves were cleared, returning `true` on the transition.
    pub(crate) fn check_victory(&mut self, waves_to_win: Option<u32>) -> bool {
        let Some(required) = waves_to_win else {
            return false;
        };
        if self.is_playing() && self.wave >= required {
            self.status = SessionStatus::Victory;
            return true;
        }
        false
    }

    pub(crate) const fn snapshot(&self) -> EconomySnapshot {
        EconomySnapshot {
            money: self.money,
            lives: self.lives,
            wave: self.wave,
            score: self.score,
            status: self.status,
        }
    }
}
