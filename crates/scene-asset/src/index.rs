use std::{
    cmp::Ordering,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
};

/// Typed position of an entity inside one of the arrays owned by an
/// [`Asset`](crate::asset::Asset).
///
/// A handle is only meaningful for the asset that produced it.
pub struct Index<T> {
    value: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Index<T> {
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    pub fn value(self) -> usize {
        self.value as usize
    }

    /// Handle for a raw document index that is checked later. Values that do
    /// not fit saturate, so they still fail the check.
    pub(crate) fn from_raw(value: usize) -> Self {
        Self::new(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Index<T> {}

impl<T> PartialEq for Index<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Index<T> {}

impl<T> PartialOrd for Index<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Index<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Index<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> Debug for Index<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.value)
    }
}

impl<T> Display for Index<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

/// Name of the document array an entity lives in, used to report broken
/// references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetArray {
    Accessors,
    Animations,
    AnimationSamplers,
    Buffers,
    BufferViews,
    Cameras,
    /// Elements of one accessor, targeted by sparse indices.
    Elements,
    Images,
    Lights,
    Materials,
    Meshes,
    Nodes,
    Samplers,
    Scenes,
    Skins,
    Textures,
}

impl Display for AssetArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetArray::Accessors => "accessors",
            AssetArray::Animations => "animations",
            AssetArray::AnimationSamplers => "animation samplers",
            AssetArray::Buffers => "buffers",
            AssetArray::BufferViews => "bufferViews",
            AssetArray::Cameras => "cameras",
            AssetArray::Elements => "accessor elements",
            AssetArray::Images => "images",
            AssetArray::Lights => "lights",
            AssetArray::Materials => "materials",
            AssetArray::Meshes => "meshes",
            AssetArray::Nodes => "nodes",
            AssetArray::Samplers => "samplers",
            AssetArray::Scenes => "scenes",
            AssetArray::Skins => "skins",
            AssetArray::Textures => "textures",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::Index;

    struct Dummy;

    #[test]
    fn handles_compare_by_value() {
        let a: Index<Dummy> = Index::new(3);
        let b = a;
        assert_eq!(a, b);
        assert!(Index::<Dummy>::new(1) < a);

        let set: HashSet<Index<Dummy>> = [a, b, Index::new(4)].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{:?}", a), "#3");
        assert_eq!(a.value(), 3);
    }
}
