use crate::jvm::{BinaryName, Name};
use crate::transform::markers::PLATFORM_METHODS;
use crate::transform::properties::{
    Properties, INJECT_INJECTABLES, PLATFORM_NAME, PLATFORM_PACKAGE, UNIQUE_IDENTIFIER,
};
use crate::transform::Error;

/// Build-wide configuration, read once from the global properties and shared by all transforms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionConfig {
    /// Platform being built (eg. `fabric`, `forge`)
    pub platform_name: Option<String>,

    /// Package segment of platform implementation classes, if not derived from the platform name
    pub platform_package: Option<String>,

    /// Namespace for injected classes
    pub unique_identifier: Option<String>,

    /// When `false`, every transform leaves its input untouched
    pub inject_enabled: bool,
}

impl InjectionConfig {
    pub fn from_properties(properties: &Properties) -> InjectionConfig {
        let owned = |key: &str| properties.get(key).map(String::from);
        InjectionConfig {
            platform_name: owned(PLATFORM_NAME),
            platform_package: owned(PLATFORM_PACKAGE),
            unique_identifier: owned(UNIQUE_IDENTIFIER),
            inject_enabled: properties
                .get(INJECT_INJECTABLES)
                .map_or(true, |value| value == "true"),
        }
    }

    /// Platform name, which must be configured
    pub fn platform_name(&self) -> Result<&str, Error> {
        self.platform_name
            .as_deref()
            .ok_or(Error::MissingProperty(PLATFORM_NAME))
    }

    /// Name of the injected platform methods class
    ///
    /// The unique identifier supplied to the transformer takes precedence over the global one.
    pub fn platform_methods_class(
        &self,
        unique_identifier: Option<&str>,
    ) -> Result<BinaryName, Error> {
        let unique_identifier = unique_identifier
            .or(self.unique_identifier.as_deref())
            .ok_or(Error::MissingProperty(UNIQUE_IDENTIFIER))?;
        BinaryName::from_string(format!("{}/{}", unique_identifier, PLATFORM_METHODS))
            .map_err(Error::MalformedName)
    }
}

impl Default for InjectionConfig {
    fn default() -> Self {
        InjectionConfig::from_properties(&Properties::new())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn injection_switch() {
        let mut properties = Properties::new();
        assert!(InjectionConfig::from_properties(&properties).inject_enabled);

        properties.set(INJECT_INJECTABLES, "true");
        assert!(InjectionConfig::from_properties(&properties).inject_enabled);

        for disabled in ["false", "TRUE", "yes", ""] {
            properties.set(INJECT_INJECTABLES, disabled);
            assert!(!InjectionConfig::from_properties(&properties).inject_enabled);
        }
    }

    #[test]
    fn missing_platform_name() {
        let config = InjectionConfig::default();
        assert!(matches!(
            config.platform_name(),
            Err(Error::MissingProperty(PLATFORM_NAME))
        ));
    }

    #[test]
    fn platform_methods_class_name() {
        let mut properties = Properties::new();
        properties.set(UNIQUE_IDENTIFIER, "gen/global");
        let config = InjectionConfig::from_properties(&properties);

        assert_eq!(
            config.platform_methods_class(None).unwrap().as_str(),
            "gen/global/PlatformMethods"
        );
        assert_eq!(
            config
                .platform_methods_class(Some("gen/local"))
                .unwrap()
                .as_str(),
            "gen/local/PlatformMethods"
        );
        assert!(matches!(
            InjectionConfig::default().platform_methods_class(None),
            Err(Error::MissingProperty(UNIQUE_IDENTIFIER))
        ));
        assert!(matches!(
            config.platform_methods_class(Some("bad;name")),
            Err(Error::MalformedName(_))
        ));
    }
}
