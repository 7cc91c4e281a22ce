//! Annotation descriptors and class names recognized in user code
//!
//! These have to match the annotation library exactly.

/// Marks a method as being implemented separately for every platform
pub const EXPECT_PLATFORM: &str = "Ldev/architectury/injectables/annotations/ExpectPlatform;";

/// Legacy spelling of [`EXPECT_PLATFORM`]
pub const EXPECT_PLATFORM_LEGACY: &str = "Lme/shedaniel/architectury/ExpectPlatform;";

/// Legacy spelling of [`EXPECT_PLATFORM`]
pub const EXPECT_PLATFORM_LEGACY2: &str = "Lme/shedaniel/architectury/annotations/ExpectPlatform;";

/// Added to methods after they've been turned into forwarding stubs
pub const EXPECT_PLATFORM_TRANSFORMED: &str =
    "Ldev/architectury/injectables/annotations/ExpectPlatform$Transformed;";

/// Marks a member as present on one platform only. Never turned into a forwarding stub.
pub const PLATFORM_ONLY: &str = "Ldev/architectury/injectables/annotations/PlatformOnly;";

/// Legacy spelling of [`PLATFORM_ONLY`]
pub const PLATFORM_ONLY_LEGACY: &str = "Lme/shedaniel/architectury/annotations/PlatformOnly;";

/// Placeholder class which user code calls, standing in for the injected platform methods class
pub const ARCHITECTURY_TARGET: &str = "dev/architectury/injectables/targets/ArchitecturyTarget";

/// Simple name of the injected class (under the unique identifier namespace)
pub const PLATFORM_METHODS: &str = "PlatformMethods";

/// Recognized spellings of the expect-platform annotation
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ExpectPlatform {
    Current,
    Legacy,
    LegacyAnnotations,
}

impl ExpectPlatform {
    pub const ALL: [ExpectPlatform; 3] = [
        ExpectPlatform::Current,
        ExpectPlatform::Legacy,
        ExpectPlatform::LegacyAnnotations,
    ];

    pub fn descriptor(&self) -> &'static str {
        match self {
            ExpectPlatform::Current => EXPECT_PLATFORM,
            ExpectPlatform::Legacy => EXPECT_PLATFORM_LEGACY,
            ExpectPlatform::LegacyAnnotations => EXPECT_PLATFORM_LEGACY2,
        }
    }

    pub fn from_descriptor(descriptor: &str) -> Option<ExpectPlatform> {
        ExpectPlatform::ALL
            .iter()
            .copied()
            .find(|spelling| spelling.descriptor() == descriptor)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn expect_platform_spellings() {
        for spelling in ExpectPlatform::ALL {
            assert_eq!(
                ExpectPlatform::from_descriptor(spelling.descriptor()),
                Some(spelling)
            );
        }
        assert_eq!(ExpectPlatform::from_descriptor(EXPECT_PLATFORM_TRANSFORMED), None);
    }

    #[test]
    fn platform_only_does_not_forward() {
        assert_eq!(ExpectPlatform::from_descriptor(PLATFORM_ONLY), None);
        assert_eq!(ExpectPlatform::from_descriptor(PLATFORM_ONLY_LEGACY), None);
    }
}
