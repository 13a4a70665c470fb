//! Validation-only resolution.
//!
//! A dry run is not a separate traversal. The same resolver walks the same
//! graph with [`Mode::DryRun`] set, performing every structural check while
//! skipping producer bodies and wired functions. Where a live run would hand
//! back a value, a dry run hands back [`Slot::Placeholder`].

/// Whether a resolution produces values or only validates the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mode {
    /// Run producers, populate caches and targets.
    #[default]
    Live,
    /// Check that every dependency is satisfiable without running anything.
    DryRun,
}

impl Mode {
    /// Returns `true` for [`Mode::DryRun`].
    #[must_use]
    pub fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

/// A resolved value, or the placeholder standing in for it during a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    /// A live value.
    Filled(T),
    /// The value a live run would have produced.
    Placeholder,
}

impl<T> Slot<T> {
    /// Converts into an `Option`, mapping the placeholder to `None`.
    #[must_use]
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Filled(value) => Some(value),
            Self::Placeholder => None,
        }
    }

    /// Returns `true` for [`Slot::Placeholder`].
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }

    /// Maps a filled value, keeping placeholders as they are.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Slot<U> {
        match self {
            Self::Filled(value) => Slot::Filled(f(value)),
            Self::Placeholder => Slot::Placeholder,
        }
    }
}

impl<T> From<Option<T>> for Slot<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Placeholder, Self::Filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_live() {
        assert_eq!(Mode::default(), Mode::Live);
        assert!(Mode::DryRun.is_dry_run());
    }

    #[test]
    fn placeholder_maps_to_none() {
        let slot: Slot<u8> = Slot::Placeholder;
        assert!(slot.is_placeholder());
        assert_eq!(slot.map(u16::from).into_option(), None);
        assert_eq!(Slot::Filled(3).into_option(), Some(3));
    }
}
