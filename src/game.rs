//! The `Game` value type farmed by a bot, and the sort order applied to it.

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A single title with card drops pending.
///
/// Identity is `app_id` alone: two `Game`s with the same `app_id` are equal
/// and hash identically regardless of `name`, `hours_played`, or
/// `cards_remaining`.
#[derive(Debug, Clone)]
pub struct Game {
    pub app_id: u32,
    pub name: String,
    /// Monotonically non-decreasing while the bot is farming this title.
    pub hours_played: f32,
    /// Monotonically non-increasing; resampled from the web endpoint.
    pub cards_remaining: u16,
}

impl Game {
    pub fn new(app_id: u32, name: impl Into<String>, hours_played: f32, cards_remaining: u16) -> Self {
        Self {
            app_id,
            name: name.into(),
            hours_played,
            cards_remaining,
        }
    }

    /// Whether this title has accrued the 2-hour restricted-account bump.
    pub fn has_bumped(&self, hours_to_bump: f32) -> bool {
        self.hours_played >= hours_to_bump
    }
}

impl PartialEq for Game {
    fn eq(&self, other: &Self) -> bool {
        self.app_id == other.app_id
    }
}

impl Eq for Game {}

impl Hash for Game {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.app_id.hash(state);
    }
}

/// Sort order applied to `GamesToFarm` after a badge scan.
///
/// `CardsRemaining` is the default: titles closest to completion are farmed
/// first. Present in the original configuration surface; the distilled
/// per-bot table omits it, but `CardsFarmer`'s round algorithm treats the
/// order as a parameter, so it must be configurable (see SPEC_FULL.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FarmingOrder {
    Unordered,
    AppIdsAscending,
    AppIdsDescending,
    #[default]
    CardsRemainingAscending,
    CardsRemainingDescending,
    HoursAscending,
    HoursDescending,
    NameAscending,
}

/// Sort `games` in place per `order`.
pub fn sort_games(games: &mut [Game], order: FarmingOrder) {
    match order {
        FarmingOrder::Unordered => {}
        FarmingOrder::AppIdsAscending => games.sort_by_key(|g| g.app_id),
        FarmingOrder::AppIdsDescending => games.sort_by_key(|g| std::cmp::Reverse(g.app_id)),
        FarmingOrder::CardsRemainingAscending => games.sort_by_key(|g| g.cards_remaining),
        FarmingOrder::CardsRemainingDescending => {
            games.sort_by_key(|g| std::cmp::Reverse(g.cards_remaining));
        }
        FarmingOrder::HoursAscending => {
            games.sort_by(|a, b| a.hours_played.total_cmp(&b.hours_played));
        }
        FarmingOrder::HoursDescending => {
            games.sort_by(|a, b| b.hours_played.total_cmp(&a.hours_played));
        }
        FarmingOrder::NameAscending => games.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_and_hash_are_app_id_only() {
        let a = Game::new(440, "TF2", 1.0, 3);
        let b = Game::new(440, "Team Fortress 2", 99.0, 0);
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }

    #[test]
    fn sort_cards_remaining_ascending_is_default() {
        let mut games = vec![
            Game::new(1, "A", 0.0, 5),
            Game::new(2, "B", 0.0, 1),
            Game::new(3, "C", 0.0, 3),
        ];
        sort_games(&mut games, FarmingOrder::default());
        assert_eq!(
            games.iter().map(|g| g.app_id).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
    }

    #[test]
    fn sort_hours_descending() {
        let mut games = vec![
            Game::new(1, "A", 1.0, 0),
            Game::new(2, "B", 3.0, 0),
            Game::new(3, "C", 2.0, 0),
        ];
        sort_games(&mut games, FarmingOrder::HoursDescending);
        assert_eq!(
            games.iter().map(|g| g.app_id).collect::<Vec<_>>(),
            vec![2, 3, 1]
        );
    }

    #[test]
    fn has_bumped_threshold() {
        let g = Game::new(1, "A", 1.999, 0);
        assert!(!g.has_bumped(2.0));
        let g = Game::new(1, "A", 2.0, 0);
        assert!(g.has_bumped(2.0));
    }
}
