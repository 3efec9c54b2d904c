//! Converts the scene's CSG forest into the flat record arrays read by the raytracing kernel.
//!
//! Boolean operations reference their operands by slot index. Operands are always emitted before
//! the operation that consumes them, so every operand index is lower than the index of the record
//! referencing it and the kernel can evaluate the array in a single forward pass. Records consumed
//! as operands carry [`OPERAND_FLAG`] so the kernel doesn't draw them on their own.
//!
//! Slot indices are only valid for the pass that produced them; every call starts from scratch.

use super::scene::Scene;
use crate::renderer::shader_interfaces::{
    light_buffer::LightRecord,
    material_buffer::MaterialRecord,
    primitive_buffer::{PrimitiveRecord, OPERAND_FLAG},
};
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

/// Record indices are stored as `i32` in the gpu layout
pub const MAX_PRIMITIVE_COUNT: usize = i32::MAX as usize;

/// Scene authoring defects found while flattening. None of these abort the flatten pass.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FlattenWarning {
    #[error("missing arguments for boolean operation '{node}' ({operand_count} of 2), skipping it")]
    MissingOperands { node: String, operand_count: usize },
    #[error("too many arguments for boolean operation '{node}' ({operand_count} of 2), only the first two are used")]
    ExtraOperands { node: String, operand_count: usize },
    #[error("boolean operation '{node}' skipped because its operand '{operand}' could not be flattened")]
    OperandSkipped { node: String, operand: String },
}

/// Primitive records emitted so far in a flatten pass
#[derive(Debug, Default)]
pub struct RecordSink {
    primitives: Vec<PrimitiveRecord>,
    warnings: Vec<FlattenWarning>,
}

impl RecordSink {
    /// Appends a record and returns its slot index
    pub fn push(&mut self, record: PrimitiveRecord) -> usize {
        debug_assert!(self.primitives.len() < MAX_PRIMITIVE_COUNT);
        self.primitives.push(record);
        self.primitives.len() - 1
    }

    pub fn mark_operand(&mut self, slot: usize) {
        self.primitives[slot].set_operand();
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Drops every record from `len` onwards
    pub fn truncate(&mut self, len: usize) {
        self.primitives.truncate(len);
    }

    pub fn warn(&mut self, warning: FlattenWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[FlattenWarning] {
        &self.warnings
    }

    pub fn into_records(self) -> Vec<PrimitiveRecord> {
        self.primitives
    }

    fn set_material_index(&mut self, slot: usize, material_index: usize) {
        self.primitives[slot].material_index = material_index as i32;
    }
}

/// Output of a flatten pass: the three arrays uploaded to the kernel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedScene {
    pub primitives: Vec<PrimitiveRecord>,
    /// One material per top-level (drawable) primitive
    pub materials: Vec<MaterialRecord>,
    pub lights: Vec<LightRecord>,
    pub warnings: Vec<FlattenWarning>,
}

impl FlattenedScene {
    /// Records the kernel draws directly, i.e. without [`OPERAND_FLAG`]
    pub fn drawable_count(&self) -> usize {
        self.primitives
            .iter()
            .filter(|p| p.kind & OPERAND_FLAG == 0)
            .count()
    }
}

/// Flattens every top-level node of `scene` in enumeration order, then collects its lights.
///
/// Each top-level node gets exactly one material record. Operands of boolean operations only get
/// a primitive record.
pub fn flatten_scene(scene: &Scene) -> FlattenedScene {
    let mut sink = RecordSink::default();
    let mut materials = Vec::with_capacity(scene.nodes.len());

    for node in &scene.nodes {
        let Some(slot) = node.emit_record(&mut sink) else {
            debug!("top-level node '{}' not flattened", node.name);
            continue;
        };
        trace!(
            "flattened {} '{}' into slot {} (material {})",
            node.type_name(),
            node.name,
            slot,
            materials.len()
        );
        sink.set_material_index(slot, materials.len());
        materials.push(node.material.to_record());
    }

    let lights = scene
        .lights
        .iter()
        .map(|light| light.to_light_record())
        .collect::<Vec<_>>();

    let warnings = sink.warnings().to_vec();
    let primitives = sink.into_records();
    debug!(
        "flattened scene: {} primitives, {} materials, {} lights, {} warnings",
        primitives.len(),
        materials.len(),
        lights.len(),
        warnings.len()
    );

    FlattenedScene {
        primitives,
        materials,
        lights,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::scene::{
            light::Light, material::Material, operation::BooleanOp, scene_node::SceneNode,
        },
        renderer::shader_interfaces::primitive_buffer::{PrimitiveKind, INDEX_NONE},
    };
    use glam::{Vec3, Vec4};

    fn sphere(name: &str, x: f32) -> SceneNode {
        SceneNode::sphere(name, Vec3::new(x, 0., 0.), 1.)
    }

    fn nested_scene() -> Scene {
        let mut scene = Scene::new();
        scene
            .push_node(SceneNode::plane("floor", Vec3::Y, Vec3::ZERO))
            .push_node(
                SceneNode::boolean(
                    "outer",
                    BooleanOp::Difference,
                    0.,
                    [
                        SceneNode::boolean(
                            "inner",
                            BooleanOp::Union,
                            0.2,
                            [sphere("a", 0.), sphere("b", 1.)],
                        ),
                        SceneNode::boolean(
                            "cutter",
                            BooleanOp::Intersection,
                            0.,
                            [sphere("c", 2.), sphere("d", 3.)],
                        ),
                    ],
                )
                .with_material(Material::with_albedo(Vec4::new(1., 0., 0., 1.))),
            )
            .push_node(sphere("lone", 5.))
            .push_light(Light::new(Vec3::new(0., 4., 0.)))
            .push_light(Light::new(Vec3::new(2., 4., 0.)));
        scene
    }

    #[test]
    fn sphere_and_plane_scene() {
        let mut scene = Scene::new();
        scene
            .push_node(SceneNode::sphere("ball", Vec3::ZERO, 2.))
            .push_node(SceneNode::plane("floor", Vec3::Y, Vec3::ZERO));

        let flat = flatten_scene(&scene);

        assert_eq!(flat.primitives.len(), 2);
        assert_eq!(flat.materials.len(), 2);
        assert!(flat.primitives.iter().all(|p| !p.is_operand()));
        assert_eq!(flat.primitives[0].material_index, 0);
        assert_eq!(flat.primitives[1].material_index, 1);
        assert_eq!(flat.primitives[0].payload, [0., 0., 0., 2.]);
        assert!(flat.warnings.is_empty());
    }

    #[test]
    fn smooth_union_of_two_spheres() {
        let mut scene = Scene::new();
        scene.push_node(SceneNode::boolean(
            "blob",
            BooleanOp::Union,
            0.5,
            [sphere("a", 0.), sphere("b", 1.5)],
        ));

        let flat = flatten_scene(&scene);

        assert_eq!(flat.primitives.len(), 3);
        assert!(flat.primitives[0].is_operand());
        assert!(flat.primitives[1].is_operand());
        assert_eq!(
            flat.primitives[0].primitive_kind(),
            Some(PrimitiveKind::Sphere)
        );

        let op = flat.primitives[2];
        assert!(!op.is_operand());
        assert_eq!(op.primitive_kind(), Some(PrimitiveKind::SmoothUnion));
        assert_eq!((op.operand_a, op.operand_b), (0, 1));
        assert_eq!(op.payload[0], 0.5);
        // a top-level boolean operation is drawable so it owns the only material
        assert_eq!(op.material_index, 0);
        assert_eq!(flat.materials.len(), 1);
    }

    #[test]
    fn operands_precede_their_operation() {
        let flat = flatten_scene(&nested_scene());

        for (slot, record) in flat.primitives.iter().enumerate() {
            let is_op = record.primitive_kind().unwrap().is_boolean_op();
            if is_op {
                assert!((0..slot as i32).contains(&record.operand_a));
                assert!((0..slot as i32).contains(&record.operand_b));
                assert_ne!(record.operand_a, record.operand_b);
            } else {
                assert_eq!(record.operand_a, INDEX_NONE);
                assert_eq!(record.operand_b, INDEX_NONE);
            }
        }
    }

    #[test]
    fn drawable_records_match_top_level_nodes() {
        let scene = nested_scene();
        let flat = flatten_scene(&scene);

        assert_eq!(flat.primitives.len(), 1 + 7 + 1);
        assert_eq!(flat.drawable_count(), scene.nodes.len());
        assert_eq!(flat.materials.len(), scene.nodes.len());

        let drawable_materials = flat
            .primitives
            .iter()
            .filter(|p| !p.is_operand())
            .map(|p| p.material_index)
            .collect::<Vec<_>>();
        assert_eq!(drawable_materials, vec![0, 1, 2]);
        assert_eq!(flat.materials[1].albedo, [1., 0., 0., 1.]);
        assert_eq!(flat.lights.len(), 2);
    }

    #[test]
    fn nested_operations_are_flagged_operands() {
        let flat = flatten_scene(&nested_scene());
        // floor, a, b, inner, c, d, cutter, outer, lone
        let inner = flat.primitives[3];
        assert!(inner.is_operand());
        assert_eq!(inner.primitive_kind(), Some(PrimitiveKind::SmoothUnion));
        assert_eq!(inner.material_index, INDEX_NONE);

        let outer = flat.primitives[7];
        assert!(!outer.is_operand());
        assert_eq!(outer.primitive_kind(), Some(PrimitiveKind::Subtract));
        assert_eq!((outer.operand_a, outer.operand_b), (3, 6));
    }

    #[test]
    fn reflatten_is_byte_identical() {
        let scene = nested_scene();
        let first = flatten_scene(&scene);
        let second = flatten_scene(&scene);

        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&first.primitives),
            bytemuck::cast_slice::<_, u8>(&second.primitives)
        );
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&first.materials),
            bytemuck::cast_slice::<_, u8>(&second.materials)
        );
        assert_eq!(
            bytemuck::cast_slice::<_, u8>(&first.lights),
            bytemuck::cast_slice::<_, u8>(&second.lights)
        );
    }

    #[test]
    fn empty_scene_flattens_to_nothing() {
        let flat = flatten_scene(&Scene::new());
        assert!(flat.primitives.is_empty());
        assert!(flat.materials.is_empty());
        assert!(flat.lights.is_empty());
    }

    #[test]
    fn extra_operands_use_first_two() {
        let mut scene = Scene::new();
        scene.push_node(SceneNode::boolean(
            "crowded",
            BooleanOp::Intersection,
            0.,
            [sphere("a", 0.), sphere("b", 1.), sphere("c", 2.)],
        ));

        let flat = flatten_scene(&scene);

        assert_eq!(flat.primitives.len(), 3);
        assert_eq!(flat.primitives[1].payload[0], 1.);
        assert_eq!(
            flat.primitives[2].primitive_kind(),
            Some(PrimitiveKind::Intersect)
        );
        assert_eq!(
            flat.warnings,
            vec![FlattenWarning::ExtraOperands {
                node: "crowded".to_owned(),
                operand_count: 3
            }]
        );
    }

    #[test]
    fn malformed_subtree_is_skipped_without_stopping_the_pass() {
        let mut scene = Scene::new();
        scene
            .push_node(sphere("before", 0.))
            .push_node(SceneNode::boolean(
                "broken-parent",
                BooleanOp::Union,
                0.,
                [
                    sphere("kept-then-dropped", 1.),
                    SceneNode::boolean("lonely", BooleanOp::Difference, 0., [sphere("x", 2.)]),
                ],
            ))
            .push_node(sphere("after", 3.));

        let flat = flatten_scene(&scene);

        assert_eq!(flat.primitives.len(), 2);
        assert_eq!(flat.primitives[0].payload[0], 0.);
        assert_eq!(flat.primitives[1].payload[0], 3.);
        assert_eq!(flat.primitives[1].material_index, 1);
        assert_eq!(flat.materials.len(), 2);
        assert_eq!(flat.warnings.len(), 2);
        assert!(matches!(
            flat.warnings[1],
            FlattenWarning::OperandSkipped { .. }
        ));
        assert_eq!(scene.validate().len(), 1);
    }
}
