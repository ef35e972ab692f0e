//! Category-based skill estimation.

use crate::types::{BattingStyle, BowlingStyle, Player, PlayerRole};

/// Batting category score: Reliable 6, So-So 3, Tailend 1
pub fn batting_score(style: BattingStyle) -> i32 {
    match style {
        BattingStyle::Reliable => 6,
        BattingStyle::SoSo => 3,
        BattingStyle::Tailend => 1,
        BattingStyle::Unknown => 0,
    }
}

/// Bowling category score: Fast 5, Medium 3, DNB 1
pub fn bowling_score(style: BowlingStyle) -> i32 {
    match style {
        BowlingStyle::Fast => 5,
        BowlingStyle::Medium => 3,
        BowlingStyle::Dnb => 1,
        BowlingStyle::Unknown => 0,
    }
}

/// Combined skill score used by the team balancer
pub fn skill_score(player: &Player) -> i32 {
    batting_score(player.batting_style) + bowling_score(player.bowling_style)
}

/// Role decision table. Branch order matters: a player can match several rows.
pub fn player_role(player: &Player) -> PlayerRole {
    let batting = batting_score(player.batting_style);
    let bowling = bowling_score(player.bowling_style);

    if player.bowling_style == BowlingStyle::Dnb {
        PlayerRole::Batsman
    } else if player.batting_style == BattingStyle::Tailend && bowling >= 3 {
        PlayerRole::Bowler
    } else if batting >= 3 && bowling >= 3 {
        PlayerRole::Allrounder
    } else if batting > bowling {
        PlayerRole::Batsman
    } else {
        PlayerRole::Bowler
    }
}

/// Legacy 1-10 skill level shown in exports: base 5, style bonuses, star bonus
pub fn legacy_skill_level(player: &Player) -> u8 {
    let mut level: u8 = 5;
    level += match player.batting_style {
        BattingStyle::Reliable => 2,
        BattingStyle::SoSo => 1,
        _ => 0,
    };
    level += match player.bowling_style {
        BowlingStyle::Fast => 2,
        BowlingStyle::Medium => 1,
        _ => 0,
    };
    if player.is_star {
        level += 2;
    }
    level.min(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(batting: BattingStyle, bowling: BowlingStyle) -> Player {
        Player::new(1, "Test", batting, bowling, false)
    }

    #[test]
    fn test_skill_score_sums_categories() {
        assert_eq!(skill_score(&player(BattingStyle::Reliable, BowlingStyle::Fast)), 11);
        assert_eq!(skill_score(&player(BattingStyle::SoSo, BowlingStyle::Medium)), 6);
        assert_eq!(skill_score(&player(BattingStyle::Tailend, BowlingStyle::Dnb)), 2);
    }

    #[test]
    fn test_unknown_style_scores_zero() {
        assert_eq!(skill_score(&player(BattingStyle::Unknown, BowlingStyle::Fast)), 5);
        assert_eq!(skill_score(&player(BattingStyle::Reliable, BowlingStyle::Unknown)), 6);
    }

    #[test]
    fn test_role_decision_table() {
        // DNB always bats, even as a tailender
        assert_eq!(player_role(&player(BattingStyle::Tailend, BowlingStyle::Dnb)), PlayerRole::Batsman);
        assert_eq!(player_role(&player(BattingStyle::Tailend, BowlingStyle::Fast)), PlayerRole::Bowler);
        assert_eq!(player_role(&player(BattingStyle::Tailend, BowlingStyle::Medium)), PlayerRole::Bowler);
        assert_eq!(player_role(&player(BattingStyle::Reliable, BowlingStyle::Fast)), PlayerRole::Allrounder);
        assert_eq!(player_role(&player(BattingStyle::SoSo, BowlingStyle::Medium)), PlayerRole::Allrounder);
        // Falls through to the score comparison
        assert_eq!(player_role(&player(BattingStyle::Reliable, BowlingStyle::Unknown)), PlayerRole::Batsman);
        assert_eq!(player_role(&player(BattingStyle::Unknown, BowlingStyle::Medium)), PlayerRole::Bowler);
        assert_eq!(player_role(&player(BattingStyle::Tailend, BowlingStyle::Unknown)), PlayerRole::Batsman);
    }

    #[test]
    fn test_legacy_skill_level_caps_at_ten() {
        let mut star = player(BattingStyle::Reliable, BowlingStyle::Fast);
        star.is_star = true;
        assert_eq!(legacy_skill_level(&star), 10);
        assert_eq!(legacy_skill_level(&player(BattingStyle::Tailend, BowlingStyle::Dnb)), 5);
        assert_eq!(legacy_skill_level(&player(BattingStyle::SoSo, BowlingStyle::Medium)), 7);
    }
}
