//! Zufaellige Raumnamen (`adjektiv-farbe-tier`)
//!
//! Nur fuer die Anzeige; Eindeutigkeit ist nicht garantiert.

use rand::seq::IndexedRandom;
use rand::Rng;

const ADJEKTIVE: &[&str] = &[
    "brave", "calm", "clever", "cozy", "curious", "daring", "eager", "fancy", "fluffy", "gentle",
    "giddy", "happy", "humble", "jolly", "kind", "lively", "lucky", "mellow", "merry", "mighty",
    "nimble", "noisy", "plucky", "proud", "quiet", "quick", "shy", "silly", "sleepy", "sneaky",
    "sunny", "swift", "tidy", "wacky", "witty", "zany",
];

const FARBEN: &[&str] = &[
    "amber", "aqua", "azure", "beige", "black", "blue", "bronze", "coral", "crimson", "cyan",
    "gold", "gray", "green", "indigo", "ivory", "lavender", "lime", "magenta", "maroon", "mint",
    "navy", "olive", "orange", "peach", "pink", "plum", "purple", "red", "rose", "ruby", "salmon",
    "silver", "tan", "teal", "violet", "white", "yellow",
];

const TIERE: &[&str] = &[
    "alpaca", "badger", "beaver", "bison", "camel", "cheetah", "crane", "dolphin", "duck",
    "eagle", "ferret", "flamingo", "fox", "gecko", "giraffe", "goose", "hedgehog", "heron",
    "koala", "lemur", "lynx", "magpie", "marmot", "moose", "narwhal", "otter", "owl", "panda",
    "pelican", "penguin", "puffin", "rabbit", "raccoon", "seal", "sloth", "swan", "tiger",
    "toucan", "walrus", "wombat", "yak", "zebra",
];

/// Erzeugt einen Raumnamen wie `sleepy-teal-duck`
pub fn generate_room_name() -> String {
    let mut rng = rand::rng();
    format!(
        "{}-{}-{}",
        zufaellig(ADJEKTIVE, &mut rng),
        zufaellig(FARBEN, &mut rng),
        zufaellig(TIERE, &mut rng)
    )
}

fn zufaellig<R: Rng + ?Sized>(woerter: &'static [&'static str], rng: &mut R) -> &'static str {
    woerter.choose(rng).copied().unwrap_or_default()
}
