//! Per-entity update phases
//!
//! Each phase is a transition over one [`EntityView`]. An entity missing a
//! component a phase needs is left untouched by that phase. The strategies in
//! [`scheduler`](super::scheduler) decide only how views are distributed over
//! threads, so every strategy produces the same per-entity results.
//!
//! Bone upload closes the light phase. Every chunk reports its
//! [`bone_demand`], the strategy turns those into per-chunk bases, and
//! [`upload`] hands out offsets in slot order from each base.

use crate::ecs::components::{LightEnvironment, RenderState};
use crate::ecs::{EntityChunk, EntityView};
use crate::foundation::math::Vec3;
use crate::foundation::time::FrameState;
use crate::render::primitives::CameraView;
use crate::render::skeleton::BoneBuffer;

/// Shared read-only inputs of one update
#[derive(Clone, Copy)]
pub struct TickInputs<'a> {
    /// Tick counters and world time
    pub frame: &'a FrameState,
    /// Camera culled against
    pub camera: &'a dyn CameraView,
    /// Terrain and time used to resolve body lights
    pub lights: LightEnvironment<'a>,
    /// Shared bone staging
    pub bones: &'a BoneBuffer,
}

/// One of the update phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Parent transform and animation advance
    Animate,
    /// Bounding box transform and frustum test
    Cull,
    /// Body light and pose evaluation, visible entities only
    Light,
    /// All three in order for one entity
    Fused,
}

impl Phase {
    /// Phases in the order the barrier-based strategies run them
    pub const SEQUENCE: [Self; 3] = [Self::Animate, Self::Cull, Self::Light];

    /// Apply this phase to one entity
    pub fn apply(self, view: &mut EntityView<'_>, inputs: &TickInputs<'_>) {
        match self {
            Self::Animate => animate(view, inputs.frame),
            Self::Cull => cull(view, inputs.camera),
            Self::Light => light(view, &inputs.lights),
            Self::Fused => fused(view, inputs),
        }
    }
}

/// Apply `phase` to every renderable entity of `chunk`
pub fn run(chunk: &mut EntityChunk<'_>, phase: Phase, inputs: &TickInputs<'_>) {
    for mut view in chunk.entities() {
        phase.apply(&mut view, inputs);
    }
}

/// Pose the skeleton under its entity and advance the animation.
///
/// Runs whether or not the entity was visible last frame.
pub fn animate(view: &mut EntityView<'_>, frame: &FrameState) {
    let (Some(attachment), Some(position), Some(skeleton), Some(animation)) = (
        view.attachment,
        view.position,
        view.skeleton.as_deref_mut(),
        view.animation.as_deref_mut(),
    ) else {
        return;
    };

    let model = attachment.model();
    skeleton.instance.set_parent(&position.angle, &position.position, position.scale);
    skeleton.instance.play_animation(model, animation, model.play_speed * frame.update_time);
}

/// Move the entity's bounds into world space and test them against the camera.
///
/// Models with meshes and a global box are culled by that box; anything else
/// re-transforms the entity's own box.
pub fn cull(view: &mut EntityView<'_>, camera: &dyn CameraView) {
    let (Some(attachment), Some(position), Some(state), Some(bounds)) = (
        view.attachment,
        view.position,
        view.render_state.as_deref_mut(),
        view.bounding_box.as_deref_mut(),
    ) else {
        return;
    };

    let model = attachment.model();
    let source = match model.global_bbox {
        Some(global) if model.has_meshes() => global,
        _ => *bounds,
    };

    let mut world = source.transformed(&position.to_matrix());
    world.order();
    *bounds = world;
    state.set_visible(camera.is_box_visible(&world.min, &world.max));
}

/// Resolve the body light and evaluate the pose.
///
/// Invisible entities keep last frame's light and skeleton offset.
pub fn light(view: &mut EntityView<'_>, lights: &LightEnvironment<'_>) {
    let (Some(attachment), Some(light), Some(position), Some(state), Some(skeleton), Some(animation)) = (
        view.attachment,
        view.light,
        view.position,
        view.render_state.as_deref_mut(),
        view.skeleton.as_deref_mut(),
        view.animation.as_deref(),
    ) else {
        return;
    };
    if !state.is_visible() {
        return;
    }

    let model = attachment.model();
    state.body_light = light.resolve(&position.position, lights);
    skeleton.instance.animate(model, animation.current(), animation.prior(), &Vec3::zeros());
}

/// Animate, cull, then light if the entity survived culling
pub fn fused(view: &mut EntityView<'_>, inputs: &TickInputs<'_>) {
    animate(view, inputs.frame);
    cull(view, inputs.camera);
    light(view, &inputs.lights);
}

/// Whether the light phase posed this entity
fn is_posed(view: &EntityView<'_>) -> bool {
    view.attachment.is_some()
        && view.light.is_some()
        && view.position.is_some()
        && view.animation.is_some()
        && view.skeleton.is_some()
        && view.render_state.as_deref().is_some_and(RenderState::is_visible)
}

/// Bones the posed entities of `chunk` will upload
pub fn bone_demand(chunk: &mut EntityChunk<'_>) -> usize {
    chunk
        .entities()
        .filter(|view| is_posed(view))
        .filter_map(|view| view.skeleton.as_deref().map(|skeleton| skeleton.instance.bone_count()))
        .sum()
}

/// Upload the posed skeletons of `chunk` in slot order, the first at bone `base`.
///
/// An entity whose bones would run past the buffer gets `Unset`; later entities
/// keep the offsets they would have had anyway.
pub fn upload(chunk: &mut EntityChunk<'_>, base: usize, bones: &BoneBuffer) {
    let mut next = base;
    for mut view in chunk.entities() {
        if !is_posed(&view) {
            continue;
        }
        let Some(skeleton) = view.skeleton.as_deref_mut() else {
            continue;
        };

        let count = skeleton.instance.bone_count();
        skeleton.offset = bones.slot(next, count);
        if let Some(offset) = skeleton.offset.get() {
            skeleton.instance.upload(bones, offset);
        }
        next += count;
    }
}

/// Reserve and upload the bones of a single chunk
pub fn stage_bones(chunk: &mut EntityChunk<'_>, bones: &BoneBuffer) {
    bones.reserve(bone_demand(chunk));
    upload(chunk, 0, bones);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TerrainConfig;
    use crate::ecs::components::{
        Animation, Attachment, BoundingBox, Light, Position, RenderState, Renderable, Skeleton,
    };
    use crate::ecs::{Entity, EntityStore};
    use crate::foundation::math::Vec4;
    use crate::render::backends::RecordingDevice;
    use crate::render::model::{Mesh, Model};
    use crate::render::primitives::Camera;
    use crate::render::skeleton::{RigidPose, SkeletonOffset};
    use crate::terrain::Terrain;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    struct Scene {
        store: EntityStore,
        terrain: Terrain,
        bones: BoneBuffer,
        camera: crate::render::primitives::CameraSnapshot,
        frame: FrameState,
    }

    impl Scene {
        fn new(bone_capacity: usize) -> Self {
            let mut device = RecordingDevice::new();
            Self {
                store: EntityStore::new(),
                terrain: Terrain::new(TerrainConfig::default()),
                bones: BoneBuffer::new(&mut device, bone_capacity).unwrap(),
                camera: Camera::default().snapshot(),
                frame: FrameState { update_count: 1, update_time: 2.0, world_time: 40.0, luminosity: 1.0 },
            }
        }

        fn spawn(&mut self, model: &Arc<Model>, at: Vec3) -> Entity {
            let entity = self.store.spawn();
            self.store.insert(entity, Renderable);
            self.store.insert(entity, Attachment::new(Arc::clone(model)));
            self.store.insert(entity, Position::at(at));
            self.store.insert(entity, Animation::playing(1));
            self.store.insert(entity, Skeleton::new(Box::new(RigidPose::new(100.0))));
            self.store.insert(entity, BoundingBox::default());
            self.store.insert(entity, RenderState::default());
            self.store.insert(entity, Light::Fixed { color: Vec3::new(0.3, 0.6, 0.9) });
            entity
        }

        fn run(&mut self, phase: Phase) {
            let inputs = TickInputs {
                frame: &self.frame,
                camera: &self.camera,
                lights: LightEnvironment { terrain: &self.terrain, world_time: self.frame.world_time },
                bones: &self.bones,
            };
            run(&mut self.store.chunk_all(), phase, &inputs);
        }

        fn tick(&mut self) {
            for phase in Phase::SEQUENCE {
                self.run(phase);
            }
            stage_bones(&mut self.store.chunk_all(), &self.bones);
        }

        fn offset(&self, entity: Entity) -> SkeletonOffset {
            self.store.get::<Skeleton>(entity).unwrap().offset
        }
    }

    fn model() -> Arc<Model> {
        Arc::new(Model {
            meshes: vec![Mesh::default()],
            global_bbox: Some(BoundingBox::new(Vec3::new(-10.0, -10.0, 0.0), Vec3::new(10.0, 10.0, 20.0))),
            play_speed: 0.5,
            ..Model::default()
        })
    }

    #[test]
    fn test_animate_scales_speed_by_tick_time() {
        let mut scene = Scene::new(16);
        let entity = scene.spawn(&model(), Vec3::zeros());
        scene.run(Phase::Animate);

        let animation = scene.store.get::<Animation>(entity).unwrap();
        assert_relative_eq!(animation.current_frame, 1.0);
        assert_relative_eq!(animation.prior_frame, 0.0);
    }

    #[test]
    fn test_cull_uses_global_box_and_orders_it() {
        let mut scene = Scene::new(16);
        let near = scene.spawn(&model(), Vec3::new(100.0, 0.0, 0.0));
        let behind = scene.spawn(&model(), Vec3::new(0.0, -5000.0, 0.0));
        scene
            .store
            .get_mut::<Position>(near)
            .unwrap()
            .angle = Vec3::new(0.0, 0.0, 180.0);
        scene.run(Phase::Cull);

        let bounds = scene.store.get::<BoundingBox>(near).unwrap();
        assert!(bounds.is_ordered());
        assert_relative_eq!(bounds.min, Vec3::new(90.0, -10.0, 0.0), epsilon = 1e-4);
        assert_relative_eq!(bounds.max, Vec3::new(110.0, 10.0, 20.0), epsilon = 1e-4);
        assert!(scene.store.get::<RenderState>(near).unwrap().is_visible());
        assert!(!scene.store.get::<RenderState>(behind).unwrap().is_visible());
    }

    #[test]
    fn test_cull_falls_back_to_entity_box() {
        let mut scene = Scene::new(16);
        let meshless = Arc::new(Model { global_bbox: model().global_bbox, ..Model::default() });
        let entity = scene.spawn(&meshless, Vec3::new(5.0, 5.0, 0.0));
        scene
            .store
            .insert(entity, BoundingBox::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(-1.0, -1.0, -1.0)));
        scene.run(Phase::Cull);

        let bounds = scene.store.get::<BoundingBox>(entity).unwrap();
        assert_relative_eq!(bounds.min, Vec3::new(4.0, 4.0, -1.0));
        assert_relative_eq!(bounds.max, Vec3::new(6.0, 6.0, 1.0));
    }

    #[test]
    fn test_light_phase_skips_invisible_entities() {
        let mut scene = Scene::new(16);
        let visible = scene.spawn(&model(), Vec3::zeros());
        let hidden = scene.spawn(&model(), Vec3::new(0.0, -5000.0, 0.0));
        scene.tick();

        let state = scene.store.get::<RenderState>(visible).unwrap();
        assert_relative_eq!(state.body_light, Vec4::new(0.3, 0.6, 0.9, 1.0));
        assert_eq!(scene.store.get::<Skeleton>(visible).unwrap().offset, SkeletonOffset::Offset(0));

        let state = scene.store.get::<RenderState>(hidden).unwrap();
        assert_eq!(state.body_light, RenderState::default().body_light);
        assert_eq!(scene.store.get::<Skeleton>(hidden).unwrap().offset, SkeletonOffset::Unset);
        assert_eq!(scene.bones.len(), 1);
    }

    #[test]
    fn test_overflow_leaves_offset_unset() {
        let mut scene = Scene::new(1);
        let first = scene.spawn(&model(), Vec3::zeros());
        let second = scene.spawn(&model(), Vec3::new(50.0, 0.0, 0.0));
        scene.run(Phase::Fused);
        stage_bones(&mut scene.store.chunk_all(), &scene.bones);

        assert_eq!(scene.offset(first), SkeletonOffset::Offset(0));
        assert_eq!(scene.offset(second), SkeletonOffset::Unset);
        assert_eq!(scene.bones.len(), 1);
    }

    #[test]
    fn test_entity_leaving_view_keeps_offset() {
        let mut scene = Scene::new(16);
        let entity = scene.spawn(&model(), Vec3::zeros());
        scene.tick();
        assert_eq!(scene.offset(entity), SkeletonOffset::Offset(0));
        let lit = scene.store.get::<RenderState>(entity).unwrap().body_light;

        scene.store.get_mut::<Position>(entity).unwrap().position = Vec3::new(0.0, -5000.0, 0.0);
        scene.tick();

        assert!(!scene.store.get::<RenderState>(entity).unwrap().is_visible());
        assert_eq!(scene.offset(entity), SkeletonOffset::Offset(0));
        assert_eq!(scene.store.get::<RenderState>(entity).unwrap().body_light, lit);
        assert!(scene.bones.is_empty());
    }

    #[test]
    fn test_upload_assigns_offsets_in_slot_order() {
        let mut scene = Scene::new(16);
        let model = model();
        let first = scene.spawn(&model, Vec3::zeros());
        let hidden = scene.spawn(&model, Vec3::new(0.0, -5000.0, 0.0));
        let second = scene.spawn(&model, Vec3::new(40.0, 0.0, 0.0));
        let third = scene.spawn(&model, Vec3::new(-40.0, 0.0, 0.0));
        scene.run(Phase::Fused);

        let mut chunk = scene.store.chunk_all();
        assert_eq!(bone_demand(&mut chunk), 3);
        scene.bones.reserve(8);
        upload(&mut chunk, 5, &scene.bones);

        assert_eq!(scene.offset(first), SkeletonOffset::Offset(5));
        assert_eq!(scene.offset(hidden), SkeletonOffset::Unset);
        assert_eq!(scene.offset(second), SkeletonOffset::Offset(6));
        assert_eq!(scene.offset(third), SkeletonOffset::Offset(7));
    }

    #[test]
    fn test_missing_components_are_ignored() {
        let mut scene = Scene::new(16);
        let entity = scene.spawn(&model(), Vec3::zeros());
        scene.store.remove::<Light>(entity);
        scene.run(Phase::Fused);
        stage_bones(&mut scene.store.chunk_all(), &scene.bones);

        assert!(scene.store.get::<RenderState>(entity).unwrap().is_visible());
        assert_eq!(scene.store.get::<Skeleton>(entity).unwrap().offset, SkeletonOffset::Unset);
        assert!(scene.bones.is_empty());
    }

    #[test]
    fn test_fused_matches_sequence() {
        let mut sequential = Scene::new(16);
        let mut fused = Scene::new(16);
        let model = model();
        let positions = [Vec3::zeros(), Vec3::new(0.0, -5000.0, 0.0), Vec3::new(200.0, 300.0, 10.0)];
        let entities: Vec<_> = positions.iter().map(|p| (sequential.spawn(&model, *p), fused.spawn(&model, *p))).collect();

        sequential.tick();
        fused.run(Phase::Fused);
        stage_bones(&mut fused.store.chunk_all(), &fused.bones);

        for (a, b) in entities {
            assert_eq!(sequential.store.get::<RenderState>(a), fused.store.get::<RenderState>(b));
            assert_eq!(sequential.store.get::<BoundingBox>(a), fused.store.get::<BoundingBox>(b));
            assert_eq!(
                sequential.store.get::<Skeleton>(a).unwrap().offset,
                fused.store.get::<Skeleton>(b).unwrap().offset
            );
        }
        assert_eq!(sequential.bones.snapshot(), fused.bones.snapshot());
    }
}
