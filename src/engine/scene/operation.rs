use crate::renderer::shader_interfaces::primitive_buffer::PrimitiveKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum BooleanOp {
    /// Combination of both operands. Equivalent to OR.
    #[default]
    Union,
    /// Region covered by both operands. Equivalent to AND.
    Intersection,
    /// Subtract the second operand from the first.
    Difference,
}

impl BooleanOp {
    /// Record kind emitted for this operation. Any smoothness above zero selects the smooth
    /// variant; zero, negative and NaN select the sharp one.
    pub fn primitive_kind(&self, smoothness: f32) -> PrimitiveKind {
        let smooth = smoothness > 0.;
        match (*self, smooth) {
            (Self::Union, false) => PrimitiveKind::Union,
            (Self::Intersection, false) => PrimitiveKind::Intersect,
            (Self::Difference, false) => PrimitiveKind::Subtract,
            (Self::Union, true) => PrimitiveKind::SmoothUnion,
            (Self::Intersection, true) => PrimitiveKind::SmoothIntersect,
            (Self::Difference, true) => PrimitiveKind::SmoothSubtract,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::Union => "Union",
            Self::Intersection => "Intersection",
            Self::Difference => "Difference",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_smoothness_is_sharp() {
        assert_eq!(BooleanOp::Union.primitive_kind(0.), PrimitiveKind::Union);
        assert_eq!(
            BooleanOp::Intersection.primitive_kind(0.),
            PrimitiveKind::Intersect
        );
        assert_eq!(
            BooleanOp::Difference.primitive_kind(0.),
            PrimitiveKind::Subtract
        );
    }

    #[test]
    fn positive_smoothness_is_smooth() {
        assert_eq!(
            BooleanOp::Union.primitive_kind(f32::MIN_POSITIVE),
            PrimitiveKind::SmoothUnion
        );
        assert_eq!(
            BooleanOp::Intersection.primitive_kind(0.25),
            PrimitiveKind::SmoothIntersect
        );
        assert_eq!(
            BooleanOp::Difference.primitive_kind(3.),
            PrimitiveKind::SmoothSubtract
        );
    }

    #[test]
    fn negative_and_nan_smoothness_are_sharp() {
        assert_eq!(BooleanOp::Union.primitive_kind(-1.), PrimitiveKind::Union);
        assert_eq!(
            BooleanOp::Difference.primitive_kind(f32::NAN),
            PrimitiveKind::Subtract
        );
    }
}
