use super::{material::Material, operation::BooleanOp};
use crate::{
    engine::{
        config_engine::DEFAULT_RADIUS,
        flatten::{FlattenWarning, RecordSink},
    },
    renderer::shader_interfaces::primitive_buffer::{PrimitiveKind, PrimitiveRecord},
};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Number of operands a boolean operation consumes
pub const BOOLEAN_OPERAND_COUNT: usize = 2;

/// A node of the scene's CSG forest. Nodes own their operands so the tree is acyclic by
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    /// Ignored by the kernel when the node is an operand of a boolean operation
    pub material: Material,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Plane {
        /// Surface normal, normalized on emission
        normal: Vec3,
        /// Any point on the plane
        position: Vec3,
        dual_sided: bool,
    },
    Boolean {
        operation: BooleanOp,
        /// Blend radius. Values above zero select the smooth operation variant.
        smoothness: f32,
        operands: Vec<SceneNode>,
    },
}

impl SceneNode {
    pub fn sphere(name: impl Into<String>, center: Vec3, radius: f32) -> Self {
        Self {
            name: name.into(),
            material: Material::default(),
            kind: NodeKind::Sphere { center, radius },
        }
    }

    pub fn unit_sphere(name: impl Into<String>, center: Vec3) -> Self {
        Self::sphere(name, center, DEFAULT_RADIUS)
    }

    /// Planes are dual-sided unless changed with [`Self::single_sided`]
    pub fn plane(name: impl Into<String>, normal: Vec3, position: Vec3) -> Self {
        Self {
            name: name.into(),
            material: Material::default(),
            kind: NodeKind::Plane {
                normal,
                position,
                dual_sided: true,
            },
        }
    }

    pub fn boolean(
        name: impl Into<String>,
        operation: BooleanOp,
        smoothness: f32,
        operands: impl IntoIterator<Item = SceneNode>,
    ) -> Self {
        Self {
            name: name.into(),
            material: Material::default(),
            kind: NodeKind::Boolean {
                operation,
                smoothness: smoothness.max(0.),
                operands: operands.into_iter().collect(),
            },
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn single_sided(mut self) -> Self {
        if let NodeKind::Plane { dual_sided, .. } = &mut self.kind {
            *dual_sided = false;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            NodeKind::Sphere { .. } => "Sphere",
            NodeKind::Plane { .. } => "Plane",
            NodeKind::Boolean { operation, .. } => operation.name(),
        }
    }

    /// Appends this node's records to `sink`, operands first, and returns the slot of the record
    /// representing this node.
    ///
    /// Returns `None` if this node or one of its operands is a malformed boolean operation, in
    /// which case nothing from this subtree is left in the sink.
    pub fn emit_record(&self, sink: &mut RecordSink) -> Option<usize> {
        match &self.kind {
            NodeKind::Sphere { center, radius } => Some(sink.push(PrimitiveRecord::shape(
                PrimitiveKind::Sphere,
                center.extend(*radius),
            ))),

            NodeKind::Plane {
                normal,
                position,
                dual_sided,
            } => {
                let normal = normal.normalize_or_zero();
                let kind = if *dual_sided {
                    PrimitiveKind::DualSidedPlane
                } else {
                    PrimitiveKind::Plane
                };
                let payload = normal.extend(-normal.dot(*position));
                Some(sink.push(PrimitiveRecord::shape(kind, payload)))
            }

            NodeKind::Boolean {
                operation,
                smoothness,
                operands,
            } => {
                if let Some(warning) = operand_count_warning(&self.name, operands.len()) {
                    let skip_node = operands.len() < BOOLEAN_OPERAND_COUNT;
                    sink.warn(warning);
                    if skip_node {
                        return None;
                    }
                }

                let subtree_start = sink.len();
                let mut operand_slots = [0_usize; BOOLEAN_OPERAND_COUNT];
                for (slot, operand) in operand_slots.iter_mut().zip(operands) {
                    match operand.emit_record(sink) {
                        Some(operand_slot) => {
                            sink.mark_operand(operand_slot);
                            *slot = operand_slot;
                        }
                        None => {
                            sink.truncate(subtree_start);
                            sink.warn(FlattenWarning::OperandSkipped {
                                node: self.name.clone(),
                                operand: operand.name.clone(),
                            });
                            return None;
                        }
                    }
                }

                let smoothness = smoothness.max(0.);
                let record = PrimitiveRecord::boolean_op(
                    operation.primitive_kind(smoothness),
                    operand_slots[0],
                    operand_slots[1],
                    smoothness,
                );
                Some(sink.push(record))
            }
        }
    }

    /// Collects authoring defects in this subtree without flattening it
    pub fn validate(&self, warnings: &mut Vec<FlattenWarning>) {
        if let NodeKind::Boolean { operands, .. } = &self.kind {
            if let Some(warning) = operand_count_warning(&self.name, operands.len()) {
                warnings.push(warning);
            }
            for operand in operands {
                operand.validate(warnings);
            }
        }
    }
}

fn operand_count_warning(node: &str, operand_count: usize) -> Option<FlattenWarning> {
    if operand_count < BOOLEAN_OPERAND_COUNT {
        Some(FlattenWarning::MissingOperands {
            node: node.to_owned(),
            operand_count,
        })
    } else if operand_count > BOOLEAN_OPERAND_COUNT {
        Some(FlattenWarning::ExtraOperands {
            node: node.to_owned(),
            operand_count,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::shader_interfaces::primitive_buffer::INDEX_NONE;
    use glam::Vec4;

    #[test]
    fn sphere_payload() {
        let mut sink = RecordSink::default();
        let slot = SceneNode::sphere("s", Vec3::new(1., 2., 3.), 4.)
            .emit_record(&mut sink)
            .unwrap();
        let records = sink.into_records();

        assert_eq!(slot, 0);
        assert_eq!(records[0].primitive_kind(), Some(PrimitiveKind::Sphere));
        assert_eq!(records[0].payload, [1., 2., 3., 4.]);
        assert_eq!(records[0].operand_a, INDEX_NONE);
        assert_eq!(records[0].operand_b, INDEX_NONE);
    }

    #[test]
    fn plane_payload_is_normal_and_offset() {
        let mut sink = RecordSink::default();
        SceneNode::plane("floor", Vec3::new(0., 2., 0.), Vec3::new(5., -1., 3.))
            .single_sided()
            .emit_record(&mut sink)
            .unwrap();
        let records = sink.into_records();

        assert_eq!(records[0].primitive_kind(), Some(PrimitiveKind::Plane));
        assert_eq!(records[0].payload(), Vec4::new(0., 1., 0., 1.));
    }

    #[test]
    fn planes_default_to_dual_sided() {
        let mut sink = RecordSink::default();
        SceneNode::plane("p", Vec3::Y, Vec3::ZERO)
            .emit_record(&mut sink)
            .unwrap();
        assert_eq!(
            sink.into_records()[0].primitive_kind(),
            Some(PrimitiveKind::DualSidedPlane)
        );
    }

    #[test]
    fn boolean_emits_operands_first() {
        let node = SceneNode::boolean(
            "cut",
            BooleanOp::Difference,
            0.,
            [
                SceneNode::unit_sphere("a", Vec3::ZERO),
                SceneNode::unit_sphere("b", Vec3::X),
            ],
        );
        let mut sink = RecordSink::default();
        let slot = node.emit_record(&mut sink).unwrap();
        let records = sink.into_records();

        assert_eq!(slot, 2);
        assert_eq!(records[2].primitive_kind(), Some(PrimitiveKind::Subtract));
        assert_eq!((records[2].operand_a, records[2].operand_b), (0, 1));
        assert_eq!(records[2].material_index, INDEX_NONE);
        assert!(records[0].is_operand() && records[1].is_operand());
        assert!(!records[2].is_operand());
    }

    #[test]
    fn skipped_operand_truncates_its_parent() {
        let node = SceneNode::boolean(
            "outer",
            BooleanOp::Union,
            0.,
            [
                SceneNode::unit_sphere("kept", Vec3::ZERO),
                SceneNode::boolean(
                    "inner",
                    BooleanOp::Intersection,
                    0.,
                    [SceneNode::unit_sphere("lonely", Vec3::X)],
                ),
            ],
        );
        let mut sink = RecordSink::default();

        assert_eq!(node.emit_record(&mut sink), None);
        assert!(sink.is_empty());
        assert_eq!(
            sink.warnings(),
            &[
                FlattenWarning::MissingOperands {
                    node: "inner".to_owned(),
                    operand_count: 1,
                },
                FlattenWarning::OperandSkipped {
                    node: "outer".to_owned(),
                    operand: "inner".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn negative_smoothness_is_clamped() {
        let node = SceneNode::boolean(
            "u",
            BooleanOp::Union,
            -2.,
            [
                SceneNode::unit_sphere("a", Vec3::ZERO),
                SceneNode::unit_sphere("b", Vec3::X),
            ],
        );
        let mut sink = RecordSink::default();
        node.emit_record(&mut sink).unwrap();
        let records = sink.into_records();

        assert_eq!(records[2].primitive_kind(), Some(PrimitiveKind::Union));
        assert_eq!(records[2].payload[0], 0.);
    }

    #[test]
    fn validate_reports_nested_defects() {
        let node = SceneNode::boolean(
            "outer",
            BooleanOp::Union,
            0.,
            [
                SceneNode::boolean("inner", BooleanOp::Intersection, 0., []),
                SceneNode::unit_sphere("a", Vec3::ZERO),
                SceneNode::unit_sphere("b", Vec3::X),
            ],
        );
        let mut warnings = Vec::new();
        node.validate(&mut warnings);

        assert_eq!(
            warnings,
            vec![
                FlattenWarning::ExtraOperands {
                    node: "outer".to_owned(),
                    operand_count: 3
                },
                FlattenWarning::MissingOperands {
                    node: "inner".to_owned(),
                    operand_count: 0
                },
            ]
        );
    }
}
