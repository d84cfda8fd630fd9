//! Element topology of refinement-tree entities.

use serde::{Deserialize, Serialize};

/// Element topology of a cell or face, as recorded in its refinement tree.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ElementType {
    /// 2D simplex (triangle face).
    Triangle,
    /// 2D tensor-product face (quad).
    #[default]
    Quadrilateral,
    /// 3D simplex (tet).
    Tetrahedron,
    /// 3D tensor-product cell (hex).
    Hexahedron,
    /// 3D wedge/prism.
    Prism,
    /// 3D pyramid.
    Pyramid,
}

impl ElementType {
    /// Returns the topological dimension of the element.
    pub fn dimension(self) -> u8 {
        match self {
            ElementType::Triangle | ElementType::Quadrilateral => 2,
            ElementType::Tetrahedron
            | ElementType::Hexahedron
            | ElementType::Prism
            | ElementType::Pyramid => 3,
        }
    }

    /// Number of children one isotropic refinement event produces.
    pub fn children_per_generation(self) -> usize {
        match self {
            ElementType::Triangle | ElementType::Quadrilateral => 4,
            ElementType::Tetrahedron | ElementType::Hexahedron | ElementType::Prism => 8,
            ElementType::Pyramid => 10,
        }
    }

    /// Stable integer code used on the wire.
    pub fn code(self) -> u32 {
        match self {
            ElementType::Triangle => 0,
            ElementType::Quadrilateral => 1,
            ElementType::Tetrahedron => 2,
            ElementType::Hexahedron => 3,
            ElementType::Prism => 4,
            ElementType::Pyramid => 5,
        }
    }

    /// Guess a polygon type from its point count.
    pub fn from_face_arity(n_points: usize) -> Option<Self> {
        match n_points {
            3 => Some(ElementType::Triangle),
            4 => Some(ElementType::Quadrilateral),
            _ => None,
        }
    }

    /// Guess a cell type from the point counts of its faces.
    pub fn from_face_arities(arities: &[usize]) -> Option<Self> {
        let tris = arities.iter().filter(|&&n| n == 3).count();
        let quads = arities.iter().filter(|&&n| n == 4).count();
        match (arities.len(), tris, quads) {
            (4, 4, 0) => Some(ElementType::Tetrahedron),
            (5, 2, 3) => Some(ElementType::Prism),
            (5, 4, 1) => Some(ElementType::Pyramid),
            (6, 0, 6) => Some(ElementType::Hexahedron),
            _ => None,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => ElementType::Triangle,
            1 => ElementType::Quadrilateral,
            2 => ElementType::Tetrahedron,
            3 => ElementType::Hexahedron,
            4 => ElementType::Prism,
            5 => ElementType::Pyramid,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(ElementType::from_code(3), Some(ElementType::Hexahedron));
        assert_eq!(ElementType::from_code(42), None);
    }

    #[test]
    fn children_counts() {
        assert_eq!(ElementType::Hexahedron.children_per_generation(), 8);
        assert_eq!(ElementType::Quadrilateral.children_per_generation(), 4);
        assert_eq!(ElementType::Pyramid.dimension(), 3);
    }

    #[test]
    fn guess_from_face_arities() {
        assert_eq!(
            ElementType::from_face_arities(&[4, 4, 4, 4, 4, 4]),
            Some(ElementType::Hexahedron)
        );
        assert_eq!(
            ElementType::from_face_arities(&[3, 4, 4, 3, 4]),
            Some(ElementType::Prism)
        );
        assert_eq!(ElementType::from_face_arities(&[3, 3, 3]), None);
        assert_eq!(ElementType::from_face_arity(3), Some(ElementType::Triangle));
    }
}
