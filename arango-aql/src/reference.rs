use std::sync::Arc;

/// Kind of a server-side data source a [`NamedReference`] points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ReferenceKind {
    /// A document or edge collection.
    Collection,
    /// An ArangoSearch or search-alias view.
    View,
}

/// Name of a collection or view, tagged as such by the handle that produced it.
///
/// Interpolating a `NamedReference` into a query binds its name as a
/// collection bind parameter (`@@valueN`) instead of a plain value.
///
/// Clones share the underlying name allocation, which is what the template
/// engine uses as the reference's identity: interpolating clones of one
/// reference several times yields a single bind variable, while two
/// references created separately with the same name do not.
#[derive(Clone, Debug)]
pub struct NamedReference {
    kind: ReferenceKind,
    name: Arc<str>,
}

impl NamedReference {
    /// Creates a reference to the collection with the given name.
    pub fn collection(name: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ReferenceKind::Collection,
            name: name.into(),
        }
    }

    /// Creates a reference to the view with the given name.
    pub fn view(name: impl Into<Arc<str>>) -> Self {
        Self {
            kind: ReferenceKind::View,
            name: name.into(),
        }
    }

    /// Kind of the referenced data source.
    pub fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// Name of the referenced data source.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.name) as *const u8 as usize
    }
}

/// Implemented by handles that can be interpolated as a collection or view.
pub trait AsNamedReference {
    /// Returns the reference carried by this handle.
    fn named_reference(&self) -> &NamedReference;
}

impl AsNamedReference for NamedReference {
    fn named_reference(&self) -> &NamedReference {
        self
    }
}
