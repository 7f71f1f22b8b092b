//! Deterministic prompt enhancement for scene illustration.
//!
//! Cache keys are derived from the enhanced prompt, so this must be a pure
//! function: identical scene text always yields byte-identical output.

/// Fixed style lead-in applied to every illustration prompt.
const STYLE_PHRASE: &str = "RPG dungeon scene, atmospheric, detailed";

/// Fixed trailer applied after the atmosphere phrase.
const SUFFIX: &str = "cinematic lighting, high fantasy digital painting";

/// Atmosphere used when no category keyword matches.
const DEFAULT_ATMOSPHERE: &str = "moody torchlit gloom";

/// Ordered category rules; the first category with a keyword hit wins.
const CATEGORIES: &[(&str, &[&str], &str)] = &[
    (
        "town",
        &["town", "village", "tavern", "market", "inn", "shop"],
        "bustling medieval streets, warm lantern glow",
    ),
    (
        "field",
        &["field", "forest", "plains", "meadow", "road", "river"],
        "open wilderness, rolling hills, golden daylight",
    ),
    (
        "dungeon",
        &["dungeon", "corridor", "cave", "crypt", "tunnel", "cell"],
        "dark stone walls, flickering torches, deep shadows",
    ),
    (
        "boss",
        &["boss", "dragon", "demon", "giant", "lich"],
        "towering menacing foe, dramatic confrontation",
    ),
    (
        "castle",
        &["castle", "throne", "fortress", "keep", "tower"],
        "grand stone architecture, banners in torchlit halls",
    ),
    (
        "magic",
        &["magic", "spell", "arcane", "ritual", "rune"],
        "glowing arcane energy, mystical haze",
    ),
];

/// Augment raw scene text with style and atmosphere modifiers, producing
/// the prompt actually sent to the image backend.
pub fn enhance(scene_text: &str) -> String {
    let lowered = scene_text.to_lowercase();
    let atmosphere = CATEGORIES
        .iter()
        .find(|(_, keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, _, atmosphere)| *atmosphere)
        .unwrap_or(DEFAULT_ATMOSPHERE);

    format!("{scene_text}, {STYLE_PHRASE}, {atmosphere}, {SUFFIX}")
}
