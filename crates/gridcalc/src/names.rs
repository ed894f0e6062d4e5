//! Named areas
//!
//! Names are matched case-insensitively and keep the spelling they were
//! defined with.

use ahash::AHashMap;
use gridcalc_core::{Error, Position, Region, Result};

/// Map-wide table of named regions
#[derive(Debug, Clone, Default)]
pub struct NamedAreas {
    /// lowercase name -> (defined spelling, region)
    areas: AHashMap<String, (String, Region)>,
}

impl NamedAreas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine a name, returning the previous region
    pub fn insert(&mut self, name: &str, region: Region) -> Option<Region> {
        self.areas
            .insert(name.to_lowercase(), (name.to_string(), region))
            .map(|(_, old)| old)
    }

    pub fn remove(&mut self, name: &str) -> Option<Region> {
        self.areas.remove(&name.to_lowercase()).map(|(_, region)| region)
    }

    pub fn get(&self, name: &str) -> Option<&Region> {
        self.areas.get(&name.to_lowercase()).map(|(_, region)| region)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.areas.contains_key(&name.to_lowercase())
    }

    /// Defined names in their original spelling, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.areas.values().map(|(name, _)| name.as_str()).collect();
        names.sort_unstable_by_key(|name| name.to_lowercase());
        names
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }
}

/// Check that a name can be used in formulas
///
/// A name starts with a letter or `_`, continues with letters, digits, `_`
/// or `.`, and must not read as a cell address or a boolean.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidName("name cannot be empty".into()));
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err(Error::InvalidName(format!(
            "'{}' must start with a letter or '_'",
            name
        )));
    }
    if let Some(c) = chars.find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '.')) {
        return Err(Error::InvalidName(format!(
            "'{}' contains '{}'",
            name, c
        )));
    }
    if Position::parse(name).is_ok() {
        return Err(Error::InvalidName(format!("'{}' is a cell address", name)));
    }
    if name.eq_ignore_ascii_case("true") || name.eq_ignore_ascii_case("false") {
        return Err(Error::InvalidName(format!("'{}' is a boolean", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridcalc_core::{Rect, SheetId};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_names_are_case_insensitive() {
        let mut names = NamedAreas::new();
        let region = Region::from_rect(Rect::new(1, 1, 2, 2), SheetId(1));
        assert!(names.insert("TaxRate", region.clone()).is_none());
        assert_eq!(names.get("taxrate"), Some(&region));
        assert_eq!(names.names(), vec!["TaxRate"]);

        assert!(names.insert("TAXRATE", Region::new()).is_some());
        assert_eq!(names.len(), 1);
        assert_eq!(names.names(), vec!["TAXRATE"]);
        assert!(names.remove("taxRate").is_some());
        assert!(names.is_empty());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Sales_2024").is_ok());
        assert!(validate_name("_total").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("1st").is_err());
        assert!(validate_name("B12").is_err());
        assert!(validate_name("two words").is_err());
        assert!(validate_name("True").is_err());
    }
}
