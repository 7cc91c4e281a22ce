#![allow(dead_code)]

use platform_inject::jvm::class_file::Version;
use platform_inject::jvm::model::{Annotation, Class, Method};
use platform_inject::jvm::{
    BinaryName, ClassAccessFlags, MethodAccessFlags, MethodDescriptor, Name, ParseDescriptor,
    UnqualifiedName,
};
use platform_inject::transform::properties::{PLATFORM_NAME, UNIQUE_IDENTIFIER};
use platform_inject::transform::{Injector, Properties};

pub const TARGET: &str = "dev/architectury/injectables/targets/ArchitecturyTarget";
pub const TARGET_DESCRIPTOR: &str = "Ldev/architectury/injectables/targets/ArchitecturyTarget;";
pub const PLATFORM_METHODS: &str = "gen/mymod/PlatformMethods";

pub fn binary_name(name: &str) -> BinaryName {
    BinaryName::from_string(name.to_owned()).unwrap()
}

pub fn unqualified_name(name: &str) -> UnqualifiedName {
    UnqualifiedName::from_string(name.to_owned()).unwrap()
}

pub fn properties(pairs: &[(&str, &str)]) -> Properties {
    let mut properties = Properties::new();
    for (key, value) in pairs {
        properties.set(*key, *value);
    }
    properties
}

/// Injector for a Fabric build of `gen/mymod`, with any extra properties
pub fn injector(extra: &[(&str, &str)]) -> Injector {
    let mut properties = properties(&[(PLATFORM_NAME, "fabric"), (UNIQUE_IDENTIFIER, "gen/mymod")]);
    properties.extend(&self::properties(extra));
    Injector::new(&properties)
}

pub fn class(name: &str) -> Class {
    Class::new(
        Version::JAVA8,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        binary_name(name),
        Some(BinaryName::OBJECT),
    )
}

pub fn static_method(name: &str, descriptor: &str) -> Method {
    Method::new(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        unqualified_name(name),
        MethodDescriptor::parse(descriptor).unwrap(),
    )
}

pub fn annotated(mut method: Method, descriptor: &str, visible: bool) -> Method {
    let annotation = Annotation::marker(descriptor);
    if visible {
        method.annotations.visible.push(annotation);
    } else {
        method.annotations.invisible.push(annotation);
    }
    method
}
