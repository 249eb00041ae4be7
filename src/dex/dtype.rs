use std::fmt::{Debug, Display};
use std::rc::Rc;

use crate::desc_names::pretty_desc;

/// A type as referenced from the type pool: the full JVM-style descriptor,
/// including any array dimensions.
///
/// @see https://source.android.com/docs/core/runtime/dex-format#typedescriptor
#[derive(PartialEq, Eq)]
pub struct DexType {
    pub descriptor: Rc<String>,
}

impl DexType {
    pub fn new(descriptor: Rc<String>) -> DexType {
        DexType { descriptor }
    }

    /// The human readable name of this type, e.g. `java.lang.String[]`
    /// for `[Ljava/lang/String;`.
    pub fn display_name(&self) -> String {
        pretty_desc(&self.descriptor)
    }

    /// Number of array dimensions.
    pub fn dim(&self) -> usize {
        self.descriptor.chars().take_while(|c| *c == '[').count()
    }

    /// Whether the element type is primitive (or `void`).
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.descriptor[self.dim()..].as_bytes().first(),
            Some(b'V' | b'Z' | b'B' | b'S' | b'C' | b'I' | b'J' | b'F' | b'D')
        )
    }
}

impl Display for DexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor)
    }
}

impl Debug for DexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DexType({})", self.descriptor.escape_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(desc: &str) -> DexType {
        DexType::new(Rc::new(desc.to_string()))
    }

    #[test]
    fn test_display_name() {
        assert_eq!(ty("Ljava/lang/Object;").display_name(), "java.lang.Object");
        assert_eq!(ty("[[I").display_name(), "int[][]");
    }

    #[test]
    fn test_shape() {
        assert_eq!(ty("[[I").dim(), 2);
        assert!(ty("[[I").is_primitive());
        assert!(!ty("[Lfoo/Bar;").is_primitive());
    }
}
