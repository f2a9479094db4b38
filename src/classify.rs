//! Tag predicates deciding which features a stage cares about.
//!
//! Tag values are compared case-insensitively after trimming.

use crate::data::Tags;
use serde::{Deserialize, Serialize};

fn value(tags: &Tags, key: &str) -> Option<String> {
    tags.get(key).map(|v| v.trim().to_ascii_lowercase())
}

fn is(tags: &Tags, key: &str, expected: &str) -> bool {
    value(tags, key).is_some_and(|v| v == expected)
}

fn is_any(tags: &Tags, key: &str, expected: &[&str]) -> bool {
    value(tags, key).is_some_and(|v| expected.contains(&v.as_str()))
}

fn contains(tags: &Tags, key: &str, needle: &str) -> bool {
    value(tags, key).is_some_and(|v| v.contains(needle))
}

/// `yes`, `true` and `1` count as set.
pub fn truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "1")
}

/// First decimal number in a tag value; `,` is accepted as decimal separator.
pub fn first_number(v: &str) -> Option<f64> {
    let normalized = v.replace(',', ".");
    let bytes = normalized.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;
    let start = if start > 0 && bytes[start - 1] == b'-' {
        start - 1
    } else {
        start
    };
    let mut end = start + 1;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => {}
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }
    normalized[start..end].trim_end_matches('.').parse().ok()
}

// --- Point categories ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointCategory {
    Fountain,
    PostBox,
    Monument,
    CaveEntrance,
    WaterSource,
    Windsock,
}

impl PointCategory {
    pub const ALL: [PointCategory; 6] = [
        PointCategory::Fountain,
        PointCategory::PostBox,
        PointCategory::Monument,
        PointCategory::CaveEntrance,
        PointCategory::WaterSource,
        PointCategory::Windsock,
    ];

    pub fn stage_name(&self) -> &'static str {
        match self {
            PointCategory::Fountain => "fountains",
            PointCategory::PostBox => "post_boxes",
            PointCategory::Monument => "monuments",
            PointCategory::CaveEntrance => "cave_entrances",
            PointCategory::WaterSource => "water_sources",
            PointCategory::Windsock => "windsocks",
        }
    }

    pub fn from_stage_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.stage_name() == name)
    }

    pub fn matches(&self, tags: &Tags) -> bool {
        match self {
            PointCategory::Fountain => is_fountain(tags),
            PointCategory::PostBox => is_post_box(tags),
            PointCategory::Monument => is_monument(tags),
            PointCategory::CaveEntrance => is_cave_entrance(tags),
            PointCategory::WaterSource => is_water_source(tags),
            PointCategory::Windsock => is_windsock(tags),
        }
    }

    /// Block stacked as the marker pillar.
    pub fn material(&self) -> &'static str {
        match self {
            PointCategory::Fountain => "minecraft:water",
            PointCategory::PostBox => "minecraft:red_concrete",
            PointCategory::Monument => "minecraft:polished_andesite",
            PointCategory::CaveEntrance => "minecraft:cobblestone",
            PointCategory::WaterSource => "minecraft:cauldron",
            PointCategory::Windsock => "minecraft:orange_wool",
        }
    }

    pub fn default_height(&self) -> i32 {
        match self {
            PointCategory::Fountain => 8,
            PointCategory::PostBox => 2,
            PointCategory::Monument => 5,
            PointCategory::CaveEntrance => 1,
            PointCategory::WaterSource => 1,
            PointCategory::Windsock => 6,
        }
    }

    fn height_key(&self) -> &'static str {
        match self {
            PointCategory::Fountain => "fountain:height",
            PointCategory::PostBox => "post_box:height",
            PointCategory::Monument => "monument:height",
            PointCategory::CaveEntrance => "cave:height",
            PointCategory::WaterSource => "water_source:height",
            PointCategory::Windsock => "windsock:height",
        }
    }

    /// Pillar height from `<category>:height` or `height`, clamped to 1..=64.
    pub fn pillar_height(&self, tags: &Tags) -> i32 {
        [self.height_key(), "height"]
            .iter()
            .filter_map(|k| tags.get(*k))
            .find_map(|v| first_number(v))
            .map(|h| (h.round() as i32).clamp(1, 64))
            .unwrap_or_else(|| self.default_height())
    }
}

pub fn is_fountain(tags: &Tags) -> bool {
    is(tags, "amenity", "fountain")
        || is(tags, "man_made", "fountain")
        || contains(tags, "water_feature", "fountain")
        || value(tags, "fountain").is_some_and(|v| v == "yes" || v.contains("fountain"))
}

pub fn is_post_box(tags: &Tags) -> bool {
    is_any(tags, "amenity", &["post_box", "letter_box", "mailbox"])
        || is_any(tags, "man_made", &["post_box", "letter_box"])
}

pub fn is_monument(tags: &Tags) -> bool {
    is(tags, "tourism", "artwork")
        || is(tags, "amenity", "artwork")
        || is_any(
            tags,
            "man_made",
            &["statue", "sculpture", "memorial", "monument", "obelisk"],
        )
        || is_any(tags, "historic", &["memorial", "monument", "obelisk"])
        || is_any(
            tags,
            "memorial",
            &["yes", "statue", "bust", "plaque", "stele", "stela", "war_memorial"],
        )
        || is_any(
            tags,
            "memorial:type",
            &["statue", "bust", "obelisk", "stele", "plaque"],
        )
        || is(tags, "street_art", "yes")
        || is_any(
            tags,
            "artwork_type",
            &["mural", "street_art", "graffiti", "relief", "fresco"],
        )
}

pub fn is_cave_entrance(tags: &Tags) -> bool {
    is(tags, "natural", "cave_entrance") || is(tags, "entrance", "cave")
}

/// Drinking water points; decorative fountains are left to the fountain stage.
pub fn is_water_source(tags: &Tags) -> bool {
    if is(tags, "amenity", "fountain") {
        return false;
    }
    is_any(tags, "amenity", &["drinking_water", "water_point", "water"])
        || is_any(tags, "man_made", &["water_well", "water_tap"])
        || is(tags, "natural", "spring")
}

pub fn is_windsock(tags: &Tags) -> bool {
    is(tags, "aeroway", "windsock")
        || (is(tags, "man_made", "flagpole")
            && (is(tags, "flag:type", "windsock") || is(tags, "flag", "windsock")))
}

// --- Linear infrastructure ---

pub fn is_road_candidate(tags: &Tags) -> bool {
    if ["railway", "waterway", "barrier"]
        .iter()
        .any(|k| tags.contains_key(*k))
    {
        return false;
    }
    tags.contains_key("highway") || is_any(tags, "aeroway", &["runway", "taxiway", "taxilane"])
}

/// Elevated or buried ways are drawn by dedicated stages, not on the surface.
pub fn is_bridge_or_tunnel(tags: &Tags) -> bool {
    let flagged = |k: &str| tags.get(k).is_some_and(|v| truthy(v));
    if flagged("bridge") || flagged("tunnel") {
        return true;
    }
    tags.get("layer")
        .and_then(|v| first_number(v))
        .is_some_and(|layer| layer != 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("12"), Some(12.0));
        assert_eq!(first_number("approx 7,5 m"), Some(7.5));
        assert_eq!(first_number("-3"), Some(-3.0));
        assert_eq!(first_number("4.5.6"), Some(4.5));
        assert_eq!(first_number("10."), Some(10.0));
        assert_eq!(first_number("none"), None);
    }

    #[test]
    fn test_truthy() {
        assert!(truthy("yes"));
        assert!(truthy(" TRUE "));
        assert!(truthy("1"));
        assert!(!truthy("no"));
    }

    #[test]
    fn test_fountain_variants() {
        assert!(is_fountain(&tags(&[("amenity", "Fountain")])));
        assert!(is_fountain(&tags(&[("water_feature", "wall_fountain")])));
        assert!(is_fountain(&tags(&[("fountain", "yes")])));
        assert!(!is_fountain(&tags(&[("amenity", "bench")])));
    }

    #[test]
    fn test_water_source_excludes_fountain() {
        assert!(is_water_source(&tags(&[("amenity", "drinking_water")])));
        assert!(is_water_source(&tags(&[("natural", "spring")])));
        assert!(!is_water_source(&tags(&[
            ("amenity", "fountain"),
            ("man_made", "water_tap")
        ])));
    }

    #[test]
    fn test_monument_and_others() {
        assert!(is_monument(&tags(&[("historic", "memorial")])));
        assert!(is_monument(&tags(&[("artwork_type", "mural")])));
        assert!(is_post_box(&tags(&[("amenity", "letter_box")])));
        assert!(is_cave_entrance(&tags(&[("entrance", "cave")])));
        assert!(is_windsock(&tags(&[("man_made", "flagpole"), ("flag:type", "windsock")])));
        assert!(!is_windsock(&tags(&[("man_made", "flagpole")])));
    }

    #[test]
    fn test_category_round_trips_stage_name() {
        for category in PointCategory::ALL {
            assert_eq!(PointCategory::from_stage_name(category.stage_name()), Some(category));
        }
        assert_eq!(PointCategory::from_stage_name("roads"), None);
    }

    #[test]
    fn test_pillar_height() {
        let fountain = PointCategory::Fountain;
        assert_eq!(fountain.pillar_height(&Tags::new()), 8);
        assert_eq!(fountain.pillar_height(&tags(&[("height", "3 m")])), 3);
        assert_eq!(
            fountain.pillar_height(&tags(&[("fountain:height", "12"), ("height", "3")])),
            12
        );
        assert_eq!(fountain.pillar_height(&tags(&[("height", "500")])), 64);
        assert_eq!(fountain.pillar_height(&tags(&[("height", "0")])), 1);
        assert_eq!(fountain.pillar_height(&tags(&[("height", "tall")])), 8);
    }

    #[test]
    fn test_road_candidates() {
        assert!(is_road_candidate(&tags(&[("highway", "residential")])));
        assert!(is_road_candidate(&tags(&[("aeroway", "runway")])));
        assert!(!is_road_candidate(&tags(&[("aeroway", "apron")])));
        assert!(!is_road_candidate(&tags(&[("highway", "service"), ("railway", "rail")])));
    }

    #[test]
    fn test_bridge_or_tunnel() {
        assert!(is_bridge_or_tunnel(&tags(&[("bridge", "yes")])));
        assert!(is_bridge_or_tunnel(&tags(&[("tunnel", "1")])));
        assert!(is_bridge_or_tunnel(&tags(&[("layer", "-1")])));
        assert!(!is_bridge_or_tunnel(&tags(&[("tunnel", "no"), ("layer", "0")])));
        assert!(!is_bridge_or_tunnel(&tags(&[("highway", "primary")])));
    }
}
