/// What the host build currently allows transforms to do
///
/// Transforms are expected to respect these flags. Nothing checks that they do.
pub trait TransformerContext {
    /// Add arguments to the command that will run the build output
    fn append_argument(&self, arguments: &[String]);

    fn can_modify_assets(&self) -> bool;

    fn can_append_argument(&self) -> bool;

    fn can_add_classes(&self) -> bool;
}

/// Context with fixed capabilities and a callback for appended arguments
pub struct SimpleTransformerContext<F> {
    append_argument: F,
    can_modify_assets: bool,
    can_append_argument: bool,
    can_add_classes: bool,
}

impl<F: Fn(&[String])> SimpleTransformerContext<F> {
    pub fn new(
        append_argument: F,
        can_modify_assets: bool,
        can_append_argument: bool,
        can_add_classes: bool,
    ) -> SimpleTransformerContext<F> {
        SimpleTransformerContext {
            append_argument,
            can_modify_assets,
            can_append_argument,
            can_add_classes,
        }
    }
}

impl<F: Fn(&[String])> TransformerContext for SimpleTransformerContext<F> {
    fn append_argument(&self, arguments: &[String]) {
        (self.append_argument)(arguments)
    }

    fn can_modify_assets(&self) -> bool {
        self.can_modify_assets
    }

    fn can_append_argument(&self) -> bool {
        self.can_append_argument
    }

    fn can_add_classes(&self) -> bool {
        self.can_add_classes
    }
}
