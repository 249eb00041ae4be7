//! The renderer contract used by front-ends.
//!
//! This crate decodes; it does not print. Disassembler front-ends plug in
//! [`Renderer`] implementations and look them up by name through a
//! [`RendererRegistry`] they own. Registration is explicit: a renderer is
//! added by calling [`RendererRegistry::register`], nothing is discovered
//! at runtime.

use std::collections::BTreeMap;
use std::io::{Read, Seek, Write};

use crate::file::{Dex, DexClass, DexMethod};
use crate::Result;

/// Output options honored by class rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayOptions {
    /// prefix each instruction with its absolute file offset
    pub emit_offsets: bool,

    /// emit the raw code units next to each mnemonic
    pub emit_raw_bytes: bool,
}

/// A rendering strategy over decoded entities. Implementations resolve
/// pool references carried by instruction operands as they see fit; the
/// decoder leaves them unresolved.
pub trait Renderer<R: Read + Seek> {
    /// Stable name this renderer is registered under.
    fn name(&self) -> &'static str;

    /// Filename extension for output produced by this renderer, without
    /// the leading dot.
    fn extension(&self) -> &'static str;

    fn render_class(
        &self,
        dex: &mut Dex<R>,
        class: &DexClass,
        options: DisplayOptions,
        out: &mut dyn Write,
    ) -> Result<()>;

    fn render_method(
        &self,
        dex: &mut Dex<R>,
        class: &DexClass,
        method: &DexMethod,
        out: &mut dyn Write,
        indent: usize,
        emit_raw_bytes: bool,
    ) -> Result<()>;
}

/// Name-keyed registry of renderers, owned by the front-end.
pub struct RendererRegistry<R: Read + Seek> {
    renderers: BTreeMap<&'static str, Box<dyn Renderer<R>>>,
}

impl<R: Read + Seek> RendererRegistry<R> {
    pub fn new() -> RendererRegistry<R> {
        RendererRegistry {
            renderers: BTreeMap::new(),
        }
    }

    /// Registers a renderer under its own name. A later registration with
    /// the same name replaces the earlier one.
    pub fn register(&mut self, renderer: Box<dyn Renderer<R>>) {
        log::debug!("registering renderer {:?}", renderer.name());
        self.renderers.insert(renderer.name(), renderer);
    }

    /// The names of all registered renderers.
    pub fn names(&self) -> Vec<&'static str> {
        self.renderers.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Renderer<R>> {
        self.renderers.get(name).map(|r| r.as_ref())
    }
}

impl<R: Read + Seek> Default for RendererRegistry<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct NullRenderer;

    impl Renderer<Cursor<Vec<u8>>> for NullRenderer {
        fn name(&self) -> &'static str {
            "null"
        }

        fn extension(&self) -> &'static str {
            "txt"
        }

        fn render_class(
            &self,
            _: &mut Dex<Cursor<Vec<u8>>>,
            _: &DexClass,
            _: DisplayOptions,
            _: &mut dyn Write,
        ) -> Result<()> {
            Ok(())
        }

        fn render_method(
            &self,
            _: &mut Dex<Cursor<Vec<u8>>>,
            _: &DexClass,
            _: &DexMethod,
            _: &mut dyn Write,
            _: usize,
            _: bool,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_registry() {
        let mut registry = RendererRegistry::new();
        assert!(registry.get("null").is_none());

        registry.register(Box::new(NullRenderer));
        assert_eq!(registry.names(), vec!["null"]);

        let renderer = registry.get("null").unwrap();
        assert_eq!(renderer.extension(), "txt");
    }
}
