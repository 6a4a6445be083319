//! The viewer session: all mutable viewer state plus the per-frame update.
//!
//! Event handlers mutate the session synchronously; `tick` reads the latest
//! state once per frame and drives the engine. Everything here is plain data
//! so the session can be exercised in tests with a mock engine and no window.

mod camera;
mod input;
mod spin;

pub use camera::FlyCamera;
pub use input::{InputState, KeyAction};
pub use spin::{is_spin_part, SpinAxis, SpinSettings};

use crate::assets::LoadEvent;
use crate::config::ViewerConfig;
use crate::engine::{NodeId, RenderEngine};
use crossbeam_channel::{Receiver, TryRecvError};
use glam::Vec3;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use winit::keyboard::PhysicalKey;

/// Cooperative shutdown flag for the frame loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// Host-provided frame cadence. The windowing shell is one implementation
/// (display refresh); tests drive a manual clock.
pub trait FrameClock {
    /// Block until the next frame is due. `false` means the host clock ended.
    fn next_frame(&mut self) -> bool;
}

pub struct ViewerSession {
    pub input: InputState,
    pub camera: FlyCamera,
    pub spin: SpinSettings,
    spin_parts: Vec<NodeId>,
    load_rx: Option<Receiver<LoadEvent>>,
    move_speed: f32,
    rotate_sensitivity: f32,
    dolly_step: f32,
    model_scale: f32,
    model_offset: Vec3,
}

impl ViewerSession {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            input: InputState::default(),
            camera: FlyCamera::new(Vec3::from(config.camera_position)),
            spin: SpinSettings::default(),
            spin_parts: Vec::new(),
            load_rx: None,
            move_speed: config.move_speed,
            rotate_sensitivity: config.rotate_sensitivity,
            dolly_step: config.dolly_step,
            model_scale: config.model_scale,
            model_offset: Vec3::from(config.model_offset),
        }
    }

    /// Node handles collected at load time. Empty until the load resolves.
    pub fn spin_parts(&self) -> &[NodeId] {
        &self.spin_parts
    }

    /// Hand the session the receiving end of an in-flight model load.
    pub fn begin_load(&mut self, rx: Receiver<LoadEvent>) {
        self.load_rx = Some(rx);
    }

    pub fn key_event(&mut self, key: PhysicalKey, pressed: bool) {
        match self.input.handle_key(key, pressed) {
            KeyAction::CycleSpinAxis => self.spin.cycle_axis(),
            KeyAction::SpinSpeedUp => self.spin.increase_speed(),
            KeyAction::SpinSpeedDown => self.spin.decrease_speed(),
            KeyAction::None => {}
        }
    }

    /// Begin a drag. The position may be unknown if the button went down
    /// before the pointer ever moved over the window; the drag reference is
    /// then seeded from the first move instead, so that move rotates nothing.
    pub fn pointer_down(&mut self, position: Option<(f32, f32)>) {
        self.input.mouse_down = true;
        self.input.last_pointer = position;
    }

    pub fn pointer_up(&mut self) {
        self.input.mouse_down = false;
    }

    /// Mouse-look. No-op unless the button is held.
    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        if !self.input.mouse_down {
            return;
        }
        let Some((last_x, last_y)) = self.input.last_pointer else {
            self.input.last_pointer = Some((x, y));
            return;
        };
        self.camera
            .look(x - last_x, y - last_y, self.rotate_sensitivity);
        self.input.last_pointer = Some((x, y));
    }

    /// Dolly along the view direction; positive steps move forward.
    pub fn wheel(&mut self, steps: f32) {
        self.camera.dolly(steps * self.dolly_step);
    }

    /// One frame: drain loader events, apply held movement, spin the fan
    /// parts, render. Total; a failed or missing load just means zero parts.
    pub fn tick<E: RenderEngine>(&mut self, engine: &mut E) {
        self.poll_load(engine);

        let forward = self.camera.forward();
        let right = self.camera.right();
        let mut step = Vec3::ZERO;
        if self.input.move_forward {
            step += forward;
        }
        if self.input.move_backward {
            step -= forward;
        }
        if self.input.move_left {
            step -= right;
        }
        if self.input.move_right {
            step += right;
        }
        if self.input.move_up {
            step += Vec3::Y;
        }
        if self.input.move_down {
            step -= Vec3::Y;
        }
        self.camera.position += step * self.move_speed;
        engine.set_camera(self.camera.position, self.camera.orientation());

        for &node in &self.spin_parts {
            engine.rotate_local(node, self.spin.axis, self.spin.speed);
        }

        engine.render();
    }

    /// Drive `tick` from a host frame clock until stopped. The windowing
    /// shell has its own redraw loop; this explicit form exists so headless
    /// callers and tests get a clean shutdown path.
    pub fn run_until_stopped<E: RenderEngine>(
        &mut self,
        engine: &mut E,
        clock: &mut dyn FrameClock,
        stop: &StopHandle,
    ) {
        while !stop.is_stopped() && clock.next_frame() {
            self.tick(engine);
        }
    }

    fn poll_load<E: RenderEngine>(&mut self, engine: &mut E) {
        let Some(rx) = &self.load_rx else {
            return;
        };
        let mut finished = false;
        loop {
            match rx.try_recv() {
                Ok(LoadEvent::Progress { loaded, total }) => {
                    if total > 0 {
                        log::debug!(
                            "Loading model: {:.0}%",
                            loaded as f64 / total as f64 * 100.0
                        );
                    } else {
                        log::debug!("Loading model: {} bytes", loaded);
                    }
                }
                Ok(LoadEvent::Ready(mut model)) => {
                    model.apply_placement(self.model_scale, self.model_offset);
                    let nodes = engine.attach_model(model);
                    let total_nodes = nodes.len();
                    for node in nodes {
                        if is_spin_part(&node.name) {
                            log::info!("Found spin part: {}", node.name);
                            self.spin_parts.push(node.id);
                        }
                    }
                    log::info!(
                        "Model attached: {} nodes, {} spin parts",
                        total_nodes,
                        self.spin_parts.len()
                    );
                    finished = true;
                }
                Ok(LoadEvent::Failed(err)) => {
                    // Non-fatal: the viewer keeps running with no model.
                    log::warn!("Model load failed: {}", err);
                    finished = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    finished = true;
                    break;
                }
            }
        }
        if finished {
            self.load_rx = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{LoadError, MeshPrimitive, ModelGraph, ModelNode, Transform};
    use crate::engine::NamedNode;
    use glam::Quat;
    use std::collections::HashMap;
    use winit::keyboard::KeyCode;

    /// Engine double that records camera poses and accumulated local
    /// rotations per node/axis.
    #[derive(Default)]
    struct MockEngine {
        attached_nodes: usize,
        rotations: HashMap<(NodeId, &'static str), f32>,
        camera_poses: usize,
        frames: usize,
    }

    impl RenderEngine for MockEngine {
        fn attach_model(&mut self, model: ModelGraph) -> Vec<NamedNode> {
            let named = crate::engine::number_nodes(self.attached_nodes, &model.nodes);
            self.attached_nodes += model.nodes.len();
            named
        }

        fn set_camera(&mut self, _position: Vec3, _orientation: Quat) {
            self.camera_poses += 1;
        }

        fn rotate_local(&mut self, node: NodeId, axis: SpinAxis, radians: f32) {
            *self.rotations.entry((node, axis.label())).or_default() += radians;
        }

        fn resize(&mut self, _width: u32, _height: u32) {}

        fn render(&mut self) {
            self.frames += 1;
        }
    }

    fn named_node(name: &str) -> ModelNode {
        ModelNode {
            name: Some(name.to_string()),
            parent: None,
            transform: Transform::default(),
        }
    }

    fn test_model() -> ModelGraph {
        ModelGraph {
            root: Transform::default(),
            nodes: vec![
                named_node("LeftFanBlade"),
                named_node("Propeller_01"),
                named_node("Body"),
            ],
            primitives: Vec::<MeshPrimitive>::new(),
        }
    }

    fn session() -> ViewerSession {
        ViewerSession::new(&ViewerConfig::default())
    }

    fn deliver_model(session: &mut ViewerSession, engine: &mut MockEngine, model: ModelGraph) {
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(LoadEvent::Ready(model)).unwrap();
        session.begin_load(rx);
        session.tick(engine);
    }

    #[test]
    fn load_collects_only_matching_parts() {
        let mut session = session();
        let mut engine = MockEngine::default();
        deliver_model(&mut session, &mut engine, test_model());
        assert_eq!(engine.attached_nodes, 3);
        assert_eq!(session.spin_parts(), &[NodeId(0), NodeId(1)]);
    }

    #[test]
    fn zero_speed_leaves_parts_unrotated() {
        let mut session = session();
        let mut engine = MockEngine::default();
        deliver_model(&mut session, &mut engine, test_model());
        for _ in 0..50 {
            session.tick(&mut engine);
        }
        assert!(engine.rotations.values().all(|angle| *angle == 0.0));
    }

    #[test]
    fn ten_ticks_at_five_hundredths_spin_half_a_radian_around_y() {
        let mut session = session();
        let mut engine = MockEngine::default();
        deliver_model(&mut session, &mut engine, test_model());
        session.spin.axis = SpinAxis::Y;
        session.spin.speed = 0.05;
        for _ in 0..10 {
            session.tick(&mut engine);
        }
        for id in [NodeId(0), NodeId(1)] {
            let y = engine.rotations.get(&(id, "Y")).copied().unwrap_or(0.0);
            assert!((y - 0.5).abs() < 1e-5, "expected 0.5 around Y, got {}", y);
            assert_eq!(engine.rotations.get(&(id, "X")).copied().unwrap_or(0.0), 0.0);
            assert_eq!(engine.rotations.get(&(id, "Z")).copied().unwrap_or(0.0), 0.0);
        }
        // The non-matching body never spins.
        assert!(!engine.rotations.keys().any(|(id, _)| *id == NodeId(2)));
    }

    #[test]
    fn load_failure_leaves_viewer_ticking_with_no_parts() {
        let mut session = session();
        let mut engine = MockEngine::default();
        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(LoadEvent::Progress {
            loaded: 10,
            total: 100,
        })
        .unwrap();
        tx.send(LoadEvent::Failed(LoadError::EmptyScene)).unwrap();
        session.begin_load(rx);
        for _ in 0..5 {
            session.tick(&mut engine);
        }
        assert!(session.spin_parts().is_empty());
        assert_eq!(engine.frames, 5);
        assert_eq!(engine.camera_poses, 5);
    }

    #[test]
    fn movement_flags_compose_additively() {
        let mut session = session();
        let mut engine = MockEngine::default();
        let start = session.camera.position;
        session.key_event(PhysicalKey::Code(KeyCode::KeyW), true);
        session.key_event(PhysicalKey::Code(KeyCode::KeyD), true);
        session.key_event(PhysicalKey::Code(KeyCode::Space), true);
        session.tick(&mut engine);
        let moved = session.camera.position - start;
        // Forward is -Z for a level camera; right is +X; up is world +Y.
        assert!((moved - Vec3::new(0.1, 0.1, -0.1)).length() < 1e-6);

        // Opposing flags cancel.
        session.key_event(PhysicalKey::Code(KeyCode::KeyS), true);
        session.key_event(PhysicalKey::Code(KeyCode::KeyA), true);
        session.key_event(PhysicalKey::Code(KeyCode::ShiftLeft), true);
        let before = session.camera.position;
        session.tick(&mut engine);
        assert!((session.camera.position - before).length() < 1e-6);
    }

    #[test]
    fn pointer_look_requires_button_held() {
        let mut session = session();
        session.pointer_moved(100.0, 100.0);
        assert_eq!(session.camera.yaw, 0.0);
        assert_eq!(session.camera.pitch, 0.0);

        session.pointer_down(Some((100.0, 100.0)));
        session.pointer_moved(120.0, 110.0);
        assert!((session.camera.yaw - (-20.0 * 0.005)).abs() < 1e-6);
        assert!((session.camera.pitch - (-10.0 * 0.005)).abs() < 1e-6);

        // Reference point advanced: the same position again is a no-op.
        let yaw = session.camera.yaw;
        session.pointer_moved(120.0, 110.0);
        assert_eq!(session.camera.yaw, yaw);

        session.pointer_up();
        session.pointer_moved(500.0, 500.0);
        assert_eq!(session.camera.yaw, yaw);
    }

    #[test]
    fn press_without_known_position_seeds_from_first_move() {
        let mut session = session();
        session.pointer_down(None);

        // First move only establishes the reference point.
        session.pointer_moved(640.0, 360.0);
        assert_eq!(session.camera.yaw, 0.0);
        assert_eq!(session.camera.pitch, 0.0);

        // Subsequent moves rotate relative to that seed.
        session.pointer_moved(650.0, 360.0);
        assert!((session.camera.yaw - (-10.0 * 0.005)).abs() < 1e-6);
    }

    #[test]
    fn wheel_dollies_along_forward() {
        let mut session = session();
        let start = session.camera.position;
        session.wheel(1.0);
        assert!((session.camera.position - (start + Vec3::NEG_Z * 0.5)).length() < 1e-6);
        session.wheel(-1.0);
        assert!((session.camera.position - start).length() < 1e-6);
    }

    struct ManualClock {
        frames_left: usize,
    }

    impl FrameClock for ManualClock {
        fn next_frame(&mut self) -> bool {
            if self.frames_left == 0 {
                return false;
            }
            self.frames_left -= 1;
            true
        }
    }

    #[test]
    fn run_until_stopped_honors_clock_and_stop_handle() {
        let mut session = session();
        let mut engine = MockEngine::default();
        let stop = StopHandle::new();
        let mut clock = ManualClock { frames_left: 7 };
        session.run_until_stopped(&mut engine, &mut clock, &stop);
        assert_eq!(engine.frames, 7);

        stop.stop();
        let mut clock = ManualClock { frames_left: 7 };
        session.run_until_stopped(&mut engine, &mut clock, &stop);
        assert_eq!(engine.frames, 7);
    }
}
