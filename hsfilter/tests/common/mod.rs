use std::str::FromStr;

use hsfilter::{Dict, Value};
use tracing::Level;

// Initialize tracing for tests
#[ctor::ctor]
fn init_tracing() {
    // if LOG_LEVEL env var is set, use it
    if let Ok(level) = std::env::var("LOG_LEVEL") {
        tracing_subscriber::fmt().with_max_level(Level::from_str(&level).unwrap()).with_test_writer().init();
    } else {
        tracing_subscriber::fmt().with_max_level(Level::INFO).with_test_writer().init();
    }
}

/// Build an entity from `(tag, literal)` pairs, e.g. `("curVal", "72°F")`.
#[allow(unused)]
pub fn entity(tags: &[(&str, &str)]) -> Dict {
    tags.iter().map(|(name, literal)| (name.to_string(), Value::from_str(literal).unwrap())).collect()
}
