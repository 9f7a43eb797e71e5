//! User-facing text produced by the engine.

use crate::models::{GuildConfig, MemberRecord, RatingChange};

/// Announcement for a member reaching a better bracket
pub fn promotion_message(mention: &str, bracket_name: &str) -> String {
    format!("Congrats {}, you are now in {}!", mention, bracket_name)
}

/// Ratings of every enabled gamemode, one per line
///
/// ```text
/// player:
/// 1v1: 1400
/// 2v2: None
/// Highest: 1400
/// ```
pub fn rating_summary(name: &str, member: &MemberRecord, guild: &GuildConfig) -> String {
    let modes = guild.enabled_gamemodes();
    let mut lines = Vec::with_capacity(modes.len() + 2);
    lines.push(format!("{}:", name));

    for &mode in &modes {
        let rating = member.new_rating(mode).or(member.current_rating(mode));
        lines.push(format!("{}: {}", mode.display_name(), format_rating(rating)));
    }

    if let Some(highest) = member.highest_rating(&modes) {
        lines.push(format!("Highest: {}", highest));
    }

    lines.push(String::new());
    lines.join("\n")
}

/// Rating changes of one pass grouped by member, `None` if nothing moved
pub fn update_message(changes: &[RatingChange]) -> Option<String> {
    if changes.is_empty() {
        return None;
    }

    let mut out = String::from("Elo updated!\n");
    let mut last_member: Option<&str> = None;

    for change in changes {
        if last_member != Some(change.member_id.as_str()) {
            out.push_str(&format!("\n<@{}>:\n", change.member_id));
            last_member = Some(change.member_id.as_str());
        }
        out.push_str(&format!(
            "{} Elo: {} -> {}\n",
            change.gamemode.display_name(),
            format_rating(change.previous),
            format_rating(change.current)
        ));
    }

    Some(out.trim_end().to_string())
}

fn format_rating(rating: Option<i32>) -> String {
    rating.map_or_else(|| "None".to_string(), |r| r.to_string())
}
