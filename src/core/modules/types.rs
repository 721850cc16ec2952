use super::error::ModuleError;

/// Result type returned by module producers and factories.
pub type ModuleResult<T> = std::result::Result<T, ModuleError>;

/// A rendered `(text, visible)` pair, as published into an output slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Render {
    pub text: String,
    pub visible: bool,
}

impl Render {
    /// Visible render with the given text.
    pub fn shown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            visible: true,
        }
    }

    /// Empty, hidden render.
    pub fn hidden() -> Self {
        Self::default()
    }
}
