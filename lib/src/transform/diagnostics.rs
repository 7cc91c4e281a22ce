use crate::jvm::{BinaryName, UnqualifiedName};
use std::fmt;

/// Problem in the classes being transformed which doesn't stop the build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// `@ExpectPlatform` on an instance method (which is left as it is)
    NonStaticExpectPlatform {
        class: BinaryName,
        method: UnqualifiedName,
        descriptor: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::NonStaticExpectPlatform {
                class,
                method,
                descriptor,
            } => write!(
                f,
                "@ExpectPlatform can only apply to static methods! ({}.{}{})",
                class, method, descriptor
            ),
        }
    }
}

/// Diagnostics collected over a build
#[derive(Debug, Default)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics(vec![])
    }

    /// Log the diagnostic and keep it around
    pub fn report(&mut self, diagnostic: Diagnostic) {
        log::error!("{}", diagnostic);
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
