use std::collections::BTreeMap;

/// Name of the platform being built (eg. `fabric`)
pub const PLATFORM_NAME: &str = "architectury.platform.name";

/// Package segment for platform implementation classes, if it differs from the platform name
pub const PLATFORM_PACKAGE: &str = "architectury.platform.package";

/// Namespace under which injected classes are generated
pub const UNIQUE_IDENTIFIER: &str = "architectury.unique.identifier";

/// Set to anything other than `true` to turn off all injection
pub const INJECT_INJECTABLES: &str = "architectury.inject.injectables";

/// Flat string-keyed property bag
///
/// This is populated either from text in the `.properties` format or from individual
/// `key=value` pairs. Later values for a key replace earlier ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Properties {
        Properties(BTreeMap::new())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Add every property from the other bag, replacing existing values
    pub fn extend(&mut self, other: &Properties) {
        for (key, value) in other.iter() {
            self.set(key, value);
        }
    }

    /// Parse a single `key=value` pair (as passed on a command line)
    ///
    /// A pair without `=` sets the key to the empty string.
    pub fn parse_pair(pair: &str) -> (String, String) {
        match pair.split_once('=') {
            Some((key, value)) => (key.trim().to_owned(), value.to_owned()),
            None => (pair.trim().to_owned(), String::new()),
        }
    }

    /// Parse text in the `.properties` format
    ///
    /// Only the subset build tools write is understood: `#` and `!` comment lines, and `=` or `:`
    /// between key and value. Keys and values are trimmed. A line with no separator sets the key
    /// to the empty string.
    pub fn parse(text: &str) -> Properties {
        let mut properties = Properties::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match line.split_once(&['=', ':'][..]) {
                Some((key, value)) => properties.set(key.trim_end(), value.trim_start()),
                None => properties.set(line, ""),
            }
        }
        properties
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_properties_text() {
        let properties = Properties::parse(
            "# build settings\n\
             ! another comment\n\
             architectury.platform.name=fabric\n\
             architectury.unique.identifier : gen/mymod\n\
             \x20 spaced = value with spaces  \n\
             \n\
             url=https://example.com/a=b\n\
             flag\n",
        );
        assert_eq!(properties.get(PLATFORM_NAME), Some("fabric"));
        assert_eq!(properties.get(UNIQUE_IDENTIFIER), Some("gen/mymod"));
        assert_eq!(properties.get("spaced"), Some("value with spaces"));
        assert_eq!(properties.get("url"), Some("https://example.com/a=b"));
        assert_eq!(properties.get("flag"), Some(""));
        assert!(!properties.contains("# build settings"));
        assert_eq!(properties.iter().count(), 5);
    }

    #[test]
    fn later_values_win() {
        let mut properties = Properties::parse("a=1\nb=2\na=3");
        assert_eq!(properties.get("a"), Some("3"));

        let mut overrides = Properties::new();
        overrides.set("b", "4");
        properties.extend(&overrides);
        assert_eq!(properties.get("b"), Some("4"));
    }

    #[test]
    fn parse_pairs() {
        assert_eq!(
            Properties::parse_pair("architectury.platform.name=forge"),
            (PLATFORM_NAME.to_owned(), "forge".to_owned())
        );
        assert_eq!(
            Properties::parse_pair("key=a=b"),
            ("key".to_owned(), "a=b".to_owned())
        );
        assert_eq!(
            Properties::parse_pair("flag"),
            ("flag".to_owned(), String::new())
        );
    }
}
