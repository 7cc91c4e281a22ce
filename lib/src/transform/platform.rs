use crate::jvm::{BinaryName, Name};
use crate::transform::{Error, InjectionConfig};

/// Package segment under which implementations for the platform live
///
/// The explicit package comes first, then the configured package, and finally the platform name
/// itself. Quilt loads Fabric mods, so it shares their implementations.
pub fn platform_package<'a>(
    config: &'a InjectionConfig,
    platform_package: Option<&'a str>,
) -> Result<&'a str, Error> {
    if let Some(package) = platform_package.or(config.platform_package.as_deref()) {
        return Ok(package);
    }
    match config.platform_name()? {
        "quilt" => Ok("fabric"),
        platform => Ok(platform),
    }
}

/// Class implementing the expect-platform methods of `lookup_class` on the current platform
///
/// The implementation class is in a sub-package named after the platform, and its name is that of
/// the lookup class (flattened if nested) with an `Impl` suffix. For example, `com/foo/Bar$Inner`
/// resolves to `com/foo/fabric/BarInnerImpl` when building for Fabric.
pub fn platform_class(
    config: &InjectionConfig,
    platform_package: Option<&str>,
    lookup_class: &BinaryName,
) -> Result<BinaryName, Error> {
    let platform = self::platform_package(config, platform_package)?;
    let (package, simple_name) = lookup_class.split_package();
    let simple_name = simple_name.replace('$', "");
    let platform_class = match package {
        Some(package) => format!(
            "{}/{}/{}Impl",
            package.replace('$', ""),
            platform,
            simple_name
        ),
        None => format!("{}/{}Impl", platform, simple_name),
    };
    BinaryName::from_string(platform_class).map_err(Error::MalformedName)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::transform::properties::{Properties, PLATFORM_NAME, PLATFORM_PACKAGE};

    fn config(properties: &[(&str, &str)]) -> InjectionConfig {
        let mut bag = Properties::new();
        for (key, value) in properties {
            bag.set(*key, *value);
        }
        InjectionConfig::from_properties(&bag)
    }

    fn resolve(config: &InjectionConfig, package: Option<&str>, class: &str) -> String {
        let class = BinaryName::from_string(class.to_owned()).unwrap();
        platform_class(config, package, &class)
            .unwrap()
            .as_str()
            .to_owned()
    }

    #[test]
    fn resolve_from_platform_name() {
        let fabric = config(&[(PLATFORM_NAME, "fabric")]);
        assert_eq!(resolve(&fabric, None, "com/foo/Bar"), "com/foo/fabric/BarImpl");
        assert_eq!(
            resolve(&fabric, None, "com/foo/Bar$Inner"),
            "com/foo/fabric/BarInnerImpl"
        );
        assert_eq!(resolve(&fabric, None, "Bar"), "fabric/BarImpl");

        let forge = config(&[(PLATFORM_NAME, "forge")]);
        assert_eq!(resolve(&forge, None, "com/foo/Bar"), "com/foo/forge/BarImpl");
    }

    #[test]
    fn quilt_uses_fabric_implementations() {
        let quilt = config(&[(PLATFORM_NAME, "quilt")]);
        let fabric = config(&[(PLATFORM_NAME, "fabric")]);
        assert_eq!(
            resolve(&quilt, None, "com/foo/Bar"),
            resolve(&fabric, None, "com/foo/Bar")
        );

        // Only a fallback: an explicit package is used as-is
        assert_eq!(
            resolve(&quilt, Some("quilt"), "com/foo/Bar"),
            "com/foo/quilt/BarImpl"
        );
    }

    #[test]
    fn package_precedence() {
        let config = config(&[(PLATFORM_NAME, "fabric"), (PLATFORM_PACKAGE, "global")]);
        assert_eq!(resolve(&config, None, "com/foo/Bar"), "com/foo/global/BarImpl");
        assert_eq!(
            resolve(&config, Some("local"), "com/foo/Bar"),
            "com/foo/local/BarImpl"
        );
    }

    #[test]
    fn missing_platform_name() {
        let class = BinaryName::from_string("com/foo/Bar".to_owned()).unwrap();
        assert!(matches!(
            platform_class(&config(&[]), None, &class),
            Err(Error::MissingProperty(PLATFORM_NAME))
        ));

        // A package is enough, even without the platform name
        assert!(platform_class(&config(&[]), Some("neoforge"), &class).is_ok());
    }
}
