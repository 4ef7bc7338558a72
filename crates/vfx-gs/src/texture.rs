//! Reference-counted texture handles.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::ColorFormat;

/// Identifier of a texture inside its owning graphics implementation.
pub type TextureId = u64;

/// Backend object behind a texture (e.g. an `ID3D11Texture2D*` or GL name).
///
/// Opaque to filters; handed to compute SDKs that alias texture memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeTexture(pub u64);

/// Releases backend resources when the last [`Texture`] handle drops.
pub trait TextureRelease: Send + Sync {
    fn release(&self, id: TextureId);
}

struct TextureInner {
    id: TextureId,
    width: u32,
    height: u32,
    format: ColorFormat,
    native: NativeTexture,
    owner: Weak<dyn TextureRelease>,
}

impl Drop for TextureInner {
    fn drop(&mut self) {
        // Owner may already be gone at host shutdown.
        if let Some(owner) = self.owner.upgrade() {
            owner.release(self.id);
        }
    }
}

/// Handle to a GPU texture.
///
/// Cloning shares the texture; the backend resource is released when the
/// last clone drops.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

impl Texture {
    /// Wrap a backend texture. Called by [`Graphics`](crate::Graphics) implementations.
    pub fn new(
        id: TextureId,
        width: u32,
        height: u32,
        format: ColorFormat,
        native: NativeTexture,
        owner: Weak<dyn TextureRelease>,
    ) -> Self {
        Self {
            inner: Arc::new(TextureInner { id, width, height, format, native, owner }),
        }
    }

    pub fn id(&self) -> TextureId {
        self.inner.id
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// (width, height).
    pub fn size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn format(&self) -> ColorFormat {
        self.inner.format
    }

    /// Backend object, for zero-copy interop.
    pub fn native(&self) -> NativeTexture {
        self.inner.native
    }

    /// True if both handles refer to the same texture.
    pub fn ptr_eq(&self, other: &Texture) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("format", &self.inner.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<TextureId>>);

    impl TextureRelease for Recorder {
        fn release(&self, id: TextureId) {
            self.0.lock().unwrap().push(id);
        }
    }

    #[test]
    fn released_on_last_drop() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let owner: Arc<dyn TextureRelease> = recorder.clone();
        let tex = Texture::new(7, 4, 4, ColorFormat::Rgba8Unorm, NativeTexture(7), Arc::downgrade(&owner));
        let copy = tex.clone();
        assert!(copy.ptr_eq(&tex));

        drop(tex);
        assert!(recorder.0.lock().unwrap().is_empty());
        drop(copy);
        assert_eq!(*recorder.0.lock().unwrap(), vec![7]);
    }

    #[test]
    fn dropped_owner_is_ignored() {
        let owner: Arc<dyn TextureRelease> = Arc::new(Recorder(Mutex::new(Vec::new())));
        let tex = Texture::new(1, 1, 1, ColorFormat::Rgba8Unorm, NativeTexture(1), Arc::downgrade(&owner));
        drop(owner);
        drop(tex);
    }
}
