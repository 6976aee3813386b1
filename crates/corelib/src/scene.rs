//! Tiny scene: a flat list of drawables, each with a transform, a mesh kind
//! and a flat material.

use crate::transform::Transform;

/// Index of a drawable inside its [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawableId(u32);

/// Built-in meshes that need no external assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    /// Axis-aligned cube with side 1 centred on the origin.
    UnitCube,
}

/// Single-colour material, linear RGBA.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlatMaterial {
    pub color: [f32; 4],
}

impl FlatMaterial {
    /// Opaque colour from a `0xRRGGBB` literal.
    pub fn from_hex(rgb: u32) -> Self {
        let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
        Self {
            color: [channel(16), channel(8), channel(0), 1.0],
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Drawable {
    pub mesh: MeshKind,
    pub material: FlatMaterial,
    pub transform: Transform,
}

impl Drawable {
    pub fn new(mesh: MeshKind, material: FlatMaterial) -> Self {
        Self {
            mesh,
            material,
            transform: Transform::identity(),
        }
    }
}

/// Scene root. Drawables are never removed, so ids stay valid.
#[derive(Default)]
pub struct Scene {
    drawables: Vec<Drawable>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, drawable: Drawable) -> DrawableId {
        let id = DrawableId(self.drawables.len() as u32);
        self.drawables.push(drawable);
        id
    }

    #[inline]
    pub fn drawable(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(id.0 as usize)
    }

    /// Mutable access to a drawable (for animation).
    #[inline]
    pub fn drawable_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.drawables.get_mut(id.0 as usize)
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.drawables.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_green_is_pure_green() {
        let m = FlatMaterial::from_hex(0x00ff00);
        assert_eq!(m.color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn ids_address_their_drawable() {
        let mut scene = Scene::new();
        assert!(scene.is_empty());
        let a = scene.add(Drawable::new(MeshKind::UnitCube, FlatMaterial::from_hex(0xff0000)));
        let b = scene.add(Drawable::new(MeshKind::UnitCube, FlatMaterial::from_hex(0x0000ff)));
        assert_ne!(a, b);
        assert_eq!(scene.len(), 2);

        scene.drawable_mut(b).unwrap().transform.translation.x = 3.0;
        assert_eq!(scene.drawable(b).unwrap().transform.translation.x, 3.0);
        assert_eq!(scene.drawable(a).unwrap().transform, Transform::identity());
    }
}
