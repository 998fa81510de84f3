//! Numeric token extraction from free-form ASCII replies.
//!
//! Anything that is not a floating-point literal (unit labels, `=`, `;`,
//! whitespace) is skipped. Parsing never fails.

use std::sync::LazyLock;

use regex::Regex;

static FLOAT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?").expect("float token regex")
});

/// Iterate the numeric tokens in `text`, left to right.
pub fn ascii_values(text: &str) -> impl Iterator<Item = f64> + '_ {
    FLOAT_TOKEN
        .find_iter(text)
        .filter_map(|token| token.as_str().parse::<f64>().ok())
}

/// Collect the numeric tokens in `text`.
pub fn parse_ascii(text: &str) -> Vec<f64> {
    ascii_values(text).collect()
}
