//! Sentiment score → display category.
//!
//! The score line is split into five half-open tiers:
//! `(-inf, 2)`, `[2, 4)`, `[4, 6)`, `[6, 8)`, `[8, +inf)`.
//! Every input lands in exactly one tier; NaN is treated as the lowest.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodColor {
    Green,
    Emerald,
    Amber,
    Orange,
    Red,
}

impl MoodColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoodColor::Green => "green",
            MoodColor::Emerald => "emerald",
            MoodColor::Amber => "amber",
            MoodColor::Orange => "orange",
            MoodColor::Red => "red",
        }
    }

    pub fn trend_phrase(&self) -> &'static str {
        match self {
            MoodColor::Green => "You've been feeling great!",
            MoodColor::Emerald => "You've been doing well overall.",
            MoodColor::Amber => "You've been feeling okay.",
            MoodColor::Orange => "Things have been challenging.",
            MoodColor::Red => "You've been having a tough time.",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            MoodColor::Green => "😊",
            MoodColor::Emerald => "🙂",
            MoodColor::Amber => "😐",
            MoodColor::Orange => "😔",
            MoodColor::Red => "😢",
        }
    }

    pub fn classes(&self) -> MoodColorClasses {
        let c = self.as_str();
        MoodColorClasses {
            bg: format!("bg-{}-50", c),
            text: format!("text-{}-700", c),
            border: format!("border-{}-200", c),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoodColorClasses {
    pub bg: String,
    pub text: String,
    pub border: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodCategory {
    pub color_tag: MoodColor,
    pub trend_phrase: &'static str,
    pub emoji: &'static str,
}

pub fn color_for(score: f64) -> MoodColor {
    // Written as `>=` chains so NaN falls through to Red.
    if score >= 8.0 {
        MoodColor::Green
    } else if score >= 6.0 {
        MoodColor::Emerald
    } else if score >= 4.0 {
        MoodColor::Amber
    } else if score >= 2.0 {
        MoodColor::Orange
    } else {
        MoodColor::Red
    }
}

pub fn classify(score: f64) -> MoodCategory {
    let color = color_for(score);
    MoodCategory {
        color_tag: color,
        trend_phrase: color.trend_phrase(),
        emoji: color.emoji(),
    }
}

/// Display form of a free-text mood label: first character upper-cased.
pub fn display_label(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_inclusive_on_lower_edge() {
        assert_eq!(color_for(8.0), MoodColor::Green);
        assert_eq!(color_for(7.999), MoodColor::Emerald);
        assert_eq!(color_for(6.0), MoodColor::Emerald);
        assert_eq!(color_for(5.999), MoodColor::Amber);
        assert_eq!(color_for(4.0), MoodColor::Amber);
        assert_eq!(color_for(3.999), MoodColor::Orange);
        assert_eq!(color_for(2.0), MoodColor::Orange);
        assert_eq!(color_for(1.999), MoodColor::Red);
    }

    #[test]
    fn test_integer_scores_match_tiers() {
        let expected = [
            (10.0, "green"),
            (8.0, "green"),
            (7.0, "emerald"),
            (6.0, "emerald"),
            (5.0, "amber"),
            (4.0, "amber"),
            (3.0, "orange"),
            (2.0, "orange"),
            (1.0, "red"),
            (0.0, "red"),
        ];
        for (score, color) in expected {
            assert_eq!(color_for(score).as_str(), color, "score {}", score);
        }
    }

    #[test]
    fn test_out_of_range_scores_clamp_to_outer_tiers() {
        assert_eq!(color_for(-5.0), MoodColor::Red);
        assert_eq!(color_for(f64::NEG_INFINITY), MoodColor::Red);
        assert_eq!(color_for(42.0), MoodColor::Green);
        assert_eq!(color_for(f64::INFINITY), MoodColor::Green);
        assert_eq!(color_for(f64::NAN), MoodColor::Red);
    }

    #[test]
    fn test_partition_has_no_gaps_or_overlaps() {
        // Walk the line in small steps; the tier must never move backwards
        // and must change exactly at the four boundaries.
        let order = [
            MoodColor::Red,
            MoodColor::Orange,
            MoodColor::Amber,
            MoodColor::Emerald,
            MoodColor::Green,
        ];
        let rank = |c: MoodColor| order.iter().position(|o| *o == c).unwrap();

        let mut transitions = Vec::new();
        let mut prev = color_for(-1.0);
        let mut step = -100;
        while step <= 1100 {
            let score = step as f64 / 100.0;
            let current = color_for(score);
            assert!(rank(current) >= rank(prev));
            if current != prev {
                transitions.push(score);
            }
            prev = current;
            step += 1;
        }
        assert_eq!(transitions, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_classify_carries_phrase_and_emoji() {
        let great = classify(9.0);
        assert_eq!(great.color_tag, MoodColor::Green);
        assert_eq!(great.trend_phrase, "You've been feeling great!");
        assert_eq!(great.emoji, "😊");

        let tough = classify(0.5);
        assert_eq!(tough.color_tag, MoodColor::Red);
        assert_eq!(tough.trend_phrase, "You've been having a tough time.");
        assert_eq!(tough.emoji, "😢");

        assert_eq!(classify(5.0).emoji, "😐");
        assert_eq!(classify(3.0).trend_phrase, "Things have been challenging.");
        assert_eq!(classify(6.5).emoji, "🙂");
    }

    #[test]
    fn test_color_classes() {
        let classes = MoodColor::Amber.classes();
        assert_eq!(classes.bg, "bg-amber-50");
        assert_eq!(classes.text, "text-amber-700");
        assert_eq!(classes.border, "border-amber-200");
    }

    #[test]
    fn test_display_label() {
        assert_eq!(display_label("happy"), "Happy");
        assert_eq!(display_label("Anxious"), "Anxious");
        assert_eq!(display_label("élan"), "Élan");
        assert_eq!(display_label(""), "");
    }
}
