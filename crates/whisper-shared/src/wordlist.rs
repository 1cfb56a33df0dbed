//! Fixed recovery wordlist.
//!
//! The list and the way words are selected from it are frozen: every
//! existing identity is recovered by mapping its phrase back through exactly
//! these 256 entries. Add a new versioned list instead of editing this one.

/// Version tag of [`WORDLIST_V1`].
pub const WORDLIST_VERSION: u32 = 1;

pub const WORDLIST_V1: [&str; 256] = [
    "able", "about", "above", "acid", "actor", "adapt", "admit", "adult", "agent",
    "agree", "ahead", "alarm", "album", "alert", "alien", "alley", "alpha", "amber",
    "anchor", "angle", "animal", "ankle", "apple", "april", "arch", "arena",
    "argue", "armor", "army", "arrow", "artist", "atom", "audit", "august", "aunt",
    "autumn", "avocado", "awake", "axis", "baby", "bacon", "badge", "bagel",
    "baker", "balance", "bamboo", "banana", "banner", "barrel", "basket", "battle",
    "beach", "beacon", "bean", "beard", "beauty", "bench", "berry", "bicycle",
    "bird", "biscuit", "blade", "blanket", "blossom", "board", "boat", "bonus",
    "book", "border", "bottle", "brain", "brave", "bread", "breeze", "brick",
    "bridge", "bronze", "brush", "bubble", "bucket", "buffalo", "butter", "cabin",
    "cactus", "camel", "camera", "canal", "candle", "canvas", "canyon", "captain",
    "carbon", "carpet", "castle", "cattle", "cedar", "cereal", "chalk", "chapter",
    "cherry", "chess", "chicken", "cinema", "circle", "citizen", "clay", "cliff",
    "clock", "cloud", "clover", "coast", "cobalt", "coconut", "coffee", "comet",
    "copper", "coral", "cotton", "cousin", "cradle", "crane", "crater", "cricket",
    "crystal", "cube", "curtain", "cushion", "dance", "dawn", "delta", "desert",
    "diamond", "dinner", "dolphin", "donkey", "dragon", "dream", "drum", "eagle",
    "earth", "echo", "eclipse", "elbow", "ember", "emerald", "engine", "envelope",
    "falcon", "feather", "fence", "fiber", "fiddle", "field", "finger", "flame",
    "flute", "forest", "fossil", "fountain", "fox", "galaxy", "garden", "garlic",
    "gazelle", "giant", "ginger", "giraffe", "glacier", "glove", "goat", "golden",
    "gorilla", "grape", "gravel", "guitar", "hammer", "harbor", "harvest", "hawk",
    "hazel", "helmet", "hero", "hollow", "honey", "horizon", "husky", "igloo",
    "island", "ivory", "jacket", "jaguar", "jelly", "jewel", "jungle", "kettle",
    "kingdom", "kitten", "ladder", "lagoon", "lantern", "lemon", "leopard",
    "letter", "lilac", "lizard", "lobster", "lotus", "lunar", "magnet", "mango",
    "maple", "marble", "meadow", "melody", "mirror", "monkey", "mosaic", "mountain",
    "museum", "needle", "nickel", "noodle", "nutmeg", "oasis", "ocean", "olive",
    "onion", "orbit", "orchid", "otter", "oyster", "paddle", "palace", "panda",
    "paper", "parrot", "pebble", "pepper", "piano", "pillow", "pilot", "planet",
    "plum", "pocket", "pony", "puzzle", "quartz", "rabbit", "radar", "raven",
    "ribbon", "river", "rocket", "saddle", "salmon", "sapphire",
];

/// Membership check against a sorted list, ignoring case and surrounding
/// whitespace.
pub fn contains(list: &[&str], word: &str) -> bool {
    let word = word.trim().to_lowercase();
    list.binary_search(&word.as_str()).is_ok()
}
