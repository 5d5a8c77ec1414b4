//! Optional per-root rewriting of CSS text before insertion.

use core::fmt;

/// A text-to-text function applied to CSS installed under one root.
pub struct CssTransformHook(Box<dyn Fn(&str) -> String>);

impl CssTransformHook {
    #[inline]
    pub fn new(transform: impl Fn(&str) -> String + 'static) -> Self {
        Self(Box::new(transform))
    }

    #[inline]
    pub fn apply(&self, css: &str) -> String {
        (self.0)(css)
    }
}

impl fmt::Debug for CssTransformHook {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("CssTransformHook")
    }
}
