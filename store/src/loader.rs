use std::sync::atomic::{AtomicBool, Ordering};

/// Operation classes with a loading flag.
///
/// One flag per class: concurrent calls of the same class share it, and the
/// first of them to settle clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoaderKind {
    FetchObjects,
    FetchObjectDetails,
    CreateObjectAttribute,
    CreateAttributeOption,
    FetchValues,
    CreateValue,
}

impl LoaderKind {
    fn index(self) -> usize {
        match self {
            LoaderKind::FetchObjects => 0,
            LoaderKind::FetchObjectDetails => 1,
            LoaderKind::CreateObjectAttribute => 2,
            LoaderKind::CreateAttributeOption => 3,
            LoaderKind::FetchValues => 4,
            LoaderKind::CreateValue => 5,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Loaders {
    flags: [AtomicBool; 6],
}

impl Loaders {
    pub(crate) fn is_loading(&self, kind: LoaderKind) -> bool {
        self.flags[kind.index()].load(Ordering::SeqCst)
    }

    /// Raise the flag for `kind` until the guard is dropped.
    pub(crate) fn start(&self, kind: LoaderKind) -> LoadingGuard<'_> {
        self.flags[kind.index()].store(true, Ordering::SeqCst);
        LoadingGuard { loaders: self, kind }
    }
}

pub(crate) struct LoadingGuard<'a> {
    loaders: &'a Loaders,
    kind: LoaderKind,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loaders.flags[self.kind.index()].store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_lowers_flag_on_drop() {
        let loaders = Loaders::default();
        let guard = loaders.start(LoaderKind::FetchValues);
        assert!(loaders.is_loading(LoaderKind::FetchValues));
        assert!(!loaders.is_loading(LoaderKind::CreateValue));
        drop(guard);
        assert!(!loaders.is_loading(LoaderKind::FetchValues));
    }

    #[test]
    fn concurrent_calls_share_one_flag() {
        let loaders = Loaders::default();
        let first = loaders.start(LoaderKind::FetchObjects);
        let second = loaders.start(LoaderKind::FetchObjects);
        drop(first);
        // The second call is still running, but the class flag is down.
        assert!(!loaders.is_loading(LoaderKind::FetchObjects));
        drop(second);
    }
}
