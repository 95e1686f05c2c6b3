use std::{fmt::Display, ops::Deref, sync::Arc};

/// Either a borrowed reference or a shared owned pointer to `T`. Lets writers and services
/// accept `&DB` from short-lived call sites and `Arc<DB>` from long-lived ones.
pub enum Refs<'a, T> {
    Ref(&'a T),
    Arc(Arc<T>),
}

impl<T> AsRef<T> for Refs<'_, T> {
    fn as_ref(&self) -> &T {
        match self {
            Refs::Ref(r) => r,
            Refs::Arc(a) => a,
        }
    }
}

impl<T> Deref for Refs<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl<'a, T> From<&'a T> for Refs<'a, T> {
    fn from(r: &'a T) -> Self {
        Self::Ref(r)
    }
}

impl<T> From<Arc<T>> for Refs<'_, T> {
    fn from(a: Arc<T>) -> Self {
        Self::Arc(a)
    }
}

impl<T: Display> Display for Refs<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_ref().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refs_deref() {
        let owned = Arc::new(5u64);
        let by_arc: Refs<'_, u64> = owned.clone().into();
        let by_ref: Refs<'_, u64> = owned.as_ref().into();
        assert_eq!(*by_arc, *by_ref);
        assert_eq!(Arc::strong_count(&owned), 2);
        assert_eq!(by_ref.to_string(), "5");
    }
}
