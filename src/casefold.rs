//! Canonical case-folding.
//!
//! Every key into `by_name` maps, every terminator match, and every
//! reference-to-definition comparison in this crate goes through
//! [`casefold`], so that "identity" for a VBScript identifier means the
//! same thing everywhere (§9 design note: "Encapsulate it once").

/// The canonical case-insensitive form of a VBScript identifier.
pub fn casefold(name: &str) -> String {
    name.to_lowercase()
}

/// Compare two identifiers for VBScript identity.
pub fn casefold_eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || casefold(a) == casefold(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_casefold_eq() {
        assert!(casefold_eq("AddNumbers", "addnumbers"));
        assert!(casefold_eq("ADDNUMBERS", "AddNumbers"));
        assert!(!casefold_eq("Foo", "Bar"));
    }
}
