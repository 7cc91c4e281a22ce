use std::fmt;

/// Opaque position in a method body
///
/// Labels are assigned when code is decoded (in the order of the offsets they stand for) or
/// generated fresh when building new code. They only become concrete offsets once the code is
/// laid out again.
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct Label(pub usize);

impl fmt::Debug for Label {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_fmt(format_args!("L{}", self.0))
    }
}
