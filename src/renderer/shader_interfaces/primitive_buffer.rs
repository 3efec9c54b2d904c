use bytemuck::{Pod, Zeroable};
use glam::Vec4;

pub type PrimitiveKindUnit = u32;

/// Set in the `kind` field of a record consumed as an operand of a boolean operation. The kernel
/// only draws records where this bit is clear.
pub const OPERAND_FLAG: PrimitiveKindUnit = 0x80000000;
/// Bits of the `kind` field holding the shape/operation code.
pub const KIND_CODE_MASK: PrimitiveKindUnit = !OPERAND_FLAG;

/// Indicates an unused material or operand index
pub const INDEX_NONE: i32 = -1;

/// Shape and operation codes stored in the lower bits of [`PrimitiveRecord::kind`].
///
/// _Must match the kernel's primitive type enum_
#[rustfmt::skip]
#[allow(dead_code)]
pub mod kind_codes {
    use super::PrimitiveKindUnit;
    pub const SPHERE:           PrimitiveKindUnit = 0;
    pub const PLANE:            PrimitiveKindUnit = 1;
    pub const DUAL_SIDED_PLANE: PrimitiveKindUnit = 2;
    pub const UNION:            PrimitiveKindUnit = 3;
    pub const INTERSECT:        PrimitiveKindUnit = 4;
    pub const SUBTRACT:         PrimitiveKindUnit = 5;
    pub const SMOOTH_UNION:     PrimitiveKindUnit = 6;
    pub const SMOOTH_INTERSECT: PrimitiveKindUnit = 7;
    pub const SMOOTH_SUBTRACT:  PrimitiveKindUnit = 8;
    /// Reserved for domain repetition in the kernel. Nothing in the scene emits it yet.
    pub const REPEAT:           PrimitiveKindUnit = 9;
}

/// Typed view of the kind code. The flat record keeps the raw code so the operand flag can share
/// the same 32 bits.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PrimitiveKind {
    Sphere,
    Plane,
    DualSidedPlane,
    Union,
    Intersect,
    Subtract,
    SmoothUnion,
    SmoothIntersect,
    SmoothSubtract,
    Repeat,
}

impl PrimitiveKind {
    pub const fn code(self) -> PrimitiveKindUnit {
        match self {
            Self::Sphere => kind_codes::SPHERE,
            Self::Plane => kind_codes::PLANE,
            Self::DualSidedPlane => kind_codes::DUAL_SIDED_PLANE,
            Self::Union => kind_codes::UNION,
            Self::Intersect => kind_codes::INTERSECT,
            Self::Subtract => kind_codes::SUBTRACT,
            Self::SmoothUnion => kind_codes::SMOOTH_UNION,
            Self::SmoothIntersect => kind_codes::SMOOTH_INTERSECT,
            Self::SmoothSubtract => kind_codes::SMOOTH_SUBTRACT,
            Self::Repeat => kind_codes::REPEAT,
        }
    }

    pub const fn from_code(code: PrimitiveKindUnit) -> Option<Self> {
        Some(match code {
            kind_codes::SPHERE => Self::Sphere,
            kind_codes::PLANE => Self::Plane,
            kind_codes::DUAL_SIDED_PLANE => Self::DualSidedPlane,
            kind_codes::UNION => Self::Union,
            kind_codes::INTERSECT => Self::Intersect,
            kind_codes::SUBTRACT => Self::Subtract,
            kind_codes::SMOOTH_UNION => Self::SmoothUnion,
            kind_codes::SMOOTH_INTERSECT => Self::SmoothIntersect,
            kind_codes::SMOOTH_SUBTRACT => Self::SmoothSubtract,
            kind_codes::REPEAT => Self::Repeat,
            _ => return None,
        })
    }

    /// Boolean operations reference two operand records
    pub const fn is_boolean_op(self) -> bool {
        matches!(
            self,
            Self::Union
                | Self::Intersect
                | Self::Subtract
                | Self::SmoothUnion
                | Self::SmoothIntersect
                | Self::SmoothSubtract
        )
    }
}

/// One entry of the `_Primitives` storage buffer.
///
/// _Layout must match the kernel's primitive struct (32 bytes, std430)_
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PrimitiveRecord {
    /// Kind code in the lower 31 bits, [`OPERAND_FLAG`] in the top bit
    pub kind: PrimitiveKindUnit,
    pub material_index: i32,
    pub operand_a: i32,
    pub operand_b: i32,
    /// sphere: (cx, cy, cz, r) plane: (nx, ny, nz, d) boolean op: (smoothness, 0, 0, 0)
    pub payload: [f32; 4],
}

impl PrimitiveRecord {
    /// Leaf shapes default to material 0 and reference no operands.
    pub fn shape(kind: PrimitiveKind, payload: Vec4) -> Self {
        Self {
            kind: kind.code(),
            material_index: 0,
            operand_a: INDEX_NONE,
            operand_b: INDEX_NONE,
            payload: payload.to_array(),
        }
    }

    /// Boolean operations carry no material of their own unless they are drawn at the top level.
    pub fn boolean_op(kind: PrimitiveKind, operand_a: usize, operand_b: usize, smoothness: f32) -> Self {
        Self {
            kind: kind.code(),
            material_index: INDEX_NONE,
            operand_a: operand_a as i32,
            operand_b: operand_b as i32,
            payload: [smoothness, 0., 0., 0.],
        }
    }

    #[inline]
    pub fn kind_code(&self) -> PrimitiveKindUnit {
        self.kind & KIND_CODE_MASK
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_code(self.kind_code())
    }

    #[inline]
    pub fn is_operand(&self) -> bool {
        self.kind & OPERAND_FLAG != 0
    }

    #[inline]
    pub fn set_operand(&mut self) {
        self.kind |= OPERAND_FLAG;
    }

    pub fn payload(&self) -> Vec4 {
        Vec4::from_array(self.payload)
    }
}
