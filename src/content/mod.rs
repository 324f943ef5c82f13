/*!
 * Content Model
 * Pages, posts and the typed blocks pages are composed from
 */
pub mod blocks;
pub mod hierarchy;
pub mod slug;

use regex::Regex;

pub use blocks::{BlockContent, BlockError, BlockType};
pub use hierarchy::{flatten, validate_parent, Change, HierarchicalPage, HierarchyError, PageList};
pub use slug::{generate_slug, is_valid_slug, unique_slug};

lazy_static::lazy_static! {
    static ref HEX_COLOR: Regex = Regex::new(r"^#(?:[0-9a-fA-F]{3}){1,2}$").unwrap();
}

/// `#RGB` or `#RRGGBB`.
pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#000000"));
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#A1b2C3"));
        assert!(!is_hex_color("000000"));
        assert!(!is_hex_color("#12345"));
        assert!(!is_hex_color("#gggggg"));
        assert!(!is_hex_color("red"));
    }
}
