//! Viewer state and the per-frame update step. Everything here is GPU-free:
//! the viewer reads the session after `handle_input` and rebuilds GPU
//! resources when the keys below change.

use glam::Vec3;
use svbrdf_core::constants::{
    DEFAULT_VERTICAL_FOV, FAR_Z, LIGHT_MAX_INTENSITY, LIGHT_POS_EXTENT, LIGHT_POS_INCREMENT,
    MAX_LIGHTS, NEAR_Z, QUAD_DIM, QUICK_PRESET_COUNT,
};
use svbrdf_core::displacement::{build_quad_mesh, QuadParams};
use svbrdf_core::math::{perspective_inverse_z, FpsCamera};
use svbrdf_core::mesh::{refine_uniform, refinement_level};
use svbrdf_core::{
    compute_constants, AntialiasingMode, DisplacementMode, FrameConstants, Light,
    LightingMode, LightingPrecision, Material, MeshData, MeshMode, NormalMode, RenderModes,
    RenderingState, ShadowMode, ViewSnapshot,
};
use winit::keyboard::KeyCode;

use crate::collections::step_index;
use crate::controls::Controls;
use crate::vr::VrSession;

/// Camera translation per frame while a movement key is held.
pub const MOVE_SPEED: f32 = 0.05;
/// Camera rotation per frame in radians while an arrow key is held.
pub const TURN_SPEED: f32 = 0.02;

const PRESET_KEYS: [KeyCode; QUICK_PRESET_COUNT] = [
    KeyCode::F1,
    KeyCode::F2,
    KeyCode::F3,
    KeyCode::F4,
    KeyCode::F5,
    KeyCode::F6,
    KeyCode::F7,
    KeyCode::F8,
    KeyCode::F9,
    KeyCode::F10,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetAction {
    Load(usize),
    Save(usize),
    ReloadLast,
}

/// What the viewer must act on after an input step.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct InputChanges {
    pub material_step: i32,
    pub mesh_step: i32,
    /// Density changed: loaded meshes need new tessellation factors.
    pub density_changed: bool,
    pub vr_toggled: bool,
    pub preset: Option<PresetAction>,
    pub toggle_frame_timing: bool,
    pub quit: bool,
}

/// Structural parameters of the active renderer. A difference means the
/// renderer is rebuilt.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererKey {
    pub mesh_mode: MeshMode,
    pub displacement: DisplacementMode,
    pub lighting: LightingMode,
    pub precision: LightingPrecision,
    pub shadows: ShadowMode,
    pub material: String,
    pub mesh: String,
    pub density: f32,
    pub magnitude: f32,
    pub light_count: usize,
    pub shadow_lights: u32,
    pub shadow_resolution: u32,
}

pub fn needs_rebuild(prev: Option<&RendererKey>, next: &RendererKey) -> bool {
    prev != Some(next)
}

/// Parameters of the antialiasing targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AaKey {
    pub mode: AntialiasingMode,
    pub vr_active: bool,
    pub output: (u32, u32),
}

pub fn needs_aa_rebuild(prev: Option<&AaKey>, next: &AaKey) -> bool {
    prev != Some(next)
}

/// Geometry for the current modes and its position scale.
///
/// GPU displacement refines the coarse mesh on the CPU to one global
/// subdivision level; the vertex stage then displaces every refined vertex.
pub fn build_geometry(
    modes: &RenderModes,
    state: &RenderingState,
    material: &Material,
    loaded: Option<&MeshData>,
) -> (MeshData, f32) {
    let (base, scale) = match (modes.mesh, loaded) {
        (MeshMode::LoadedMesh, Some(mesh)) => {
            let scale = if mesh.scale > 0.0 {
                QUAD_DIM / mesh.scale
            } else {
                1.0
            };
            (mesh.clone(), scale)
        }
        _ => {
            let quad = build_quad_mesh(&QuadParams {
                material_size: material.size(),
                height_map: material.height_map.as_ref(),
                mode: modes.displacement,
                density: state.displacement_density,
                magnitude: state.displacement_magnitude,
            });
            (quad, 1.0)
        }
    };

    if modes.displacement != DisplacementMode::Gpu {
        return (base, scale);
    }
    let level = refinement_level(&base);
    let refined = refine_uniform(&base, level);
    log::info!(
        "Refined {} triangles at level {level} into {}",
        base.triangle_count(),
        refined.triangle_count()
    );
    (refined, scale)
}

/// Mutable viewer state: the persisted rendering state plus structural
/// modes, the camera and the light selection.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: RenderingState,
    pub modes: RenderModes,
    pub camera: FpsCamera,
    pub selected_light: usize,
    pub vr_enabled: bool,
    pub show_help: bool,
}

impl Session {
    pub fn new(state: RenderingState) -> Self {
        let mut session = Self {
            camera: camera_from_state(&state),
            state: RenderingState::default(),
            modes: RenderModes::default(),
            selected_light: 0,
            vr_enabled: false,
            show_help: false,
        };
        session.apply_preset(state, false);
        session
    }

    /// Replace the rendering state with a preset and reset the structural
    /// modes to the preset defaults. `mesh_found` tells whether the preset's
    /// mesh exists in the mesh collection.
    pub fn apply_preset(&mut self, mut preset: RenderingState, mesh_found: bool) {
        if preset.lights.is_empty() {
            preset.lights.push(Light::default());
        }
        self.state = preset;

        self.modes.mesh = if mesh_found {
            MeshMode::LoadedMesh
        } else {
            MeshMode::SingleQuad
        };
        self.modes.displacement = DisplacementMode::None;
        self.modes.lighting = LightingMode::Forward;
        self.modes.shadows = ShadowMode::None;
        self.modes.precision = LightingPrecision::default();
        match self.modes.mesh {
            MeshMode::SingleQuad => {
                self.modes.normals = NormalMode::Constant;
                self.modes.use_normal_mapping = true;
            }
            MeshMode::LoadedMesh => {
                self.modes.normals = NormalMode::Interpolated;
                self.modes.use_normal_mapping = self.modes.displacement == DisplacementMode::None;
            }
        }

        self.camera = camera_from_state(&self.state);
        self.selected_light = self.selected_light.min(self.state.lights.len() - 1);
        self.state.shadow_lights = self.state.clamped_shadow_lights();
    }

    /// Copy the selected light's position into a new white light and select it.
    pub fn add_light(&mut self) {
        if self.state.lights.len() >= MAX_LIGHTS as usize {
            log::warn!("Light limit of {MAX_LIGHTS} reached");
            return;
        }
        let position = self
            .state
            .lights
            .get(self.selected_light)
            .map_or(Vec3::ZERO, |l| l.position);
        self.state.lights.push(Light {
            position,
            falloff: 1.0,
            color: Vec3::ONE,
        });
        self.selected_light = self.state.lights.len() - 1;
        log::info!("Lights: {}", self.state.lights.len());
    }

    /// Remove the selected light, keeping at least one.
    pub fn remove_light(&mut self) {
        if self.state.lights.len() <= 1 {
            return;
        }
        let index = self.selected_light.min(self.state.lights.len() - 1);
        self.state.lights.remove(index);
        self.selected_light = index.min(self.state.lights.len() - 1);
        self.state.shadow_lights = self.state.clamped_shadow_lights();
        log::info!("Lights: {}", self.state.lights.len());
    }

    /// Apply one frame of keyboard input.
    pub fn handle_input(&mut self, controls: &Controls, vr: &mut dyn VrSession) -> InputChanges {
        let mut changes = InputChanges {
            preset: preset_action(controls),
            ..Default::default()
        };

        self.update_camera(controls);
        if controls.toggle("Show help", KeyCode::Tab, &mut self.show_help) && self.show_help {
            log::info!("\n{}", help_text());
        }

        let ambient = &mut self.state.ambient;
        for channel in [&mut ambient.x, &mut ambient.y, &mut ambient.z] {
            controls.adjust_multiplied(
                KeyCode::PageUp,
                KeyCode::PageDown,
                channel,
                1.1,
                0.0,
                1.0,
                false,
            );
        }

        self.update_lights(controls);

        let modes = &mut self.modes;
        controls.cycle("Mesh mode", KeyCode::Digit1, &mut modes.mesh);
        controls.cycle("Displacement mode", KeyCode::Digit2, &mut modes.displacement);
        controls.cycle("Shadows", KeyCode::Digit3, &mut modes.shadows);
        controls.cycle("Antialiasing", KeyCode::Digit4, &mut self.state.aa_mode);
        controls.cycle("Normals", KeyCode::Digit5, &mut modes.normals);
        controls.toggle("Normal mapping", KeyCode::Digit6, &mut modes.use_normal_mapping);
        controls.cycle("Tone mapping", KeyCode::Digit7, &mut self.state.tonemap_mode);
        controls.cycle("Lighting", KeyCode::Digit8, &mut modes.lighting);
        controls.toggle("Wireframe", KeyCode::Delete, &mut modes.wireframe);

        changes.vr_toggled = controls.toggle("VR rendering", KeyCode::Enter, &mut self.vr_enabled);
        controls.step_clamped(KeyCode::KeyI, KeyCode::KeyK, &mut self.state.vr_scale, -1, 10);
        if self.vr_enabled && !vr.is_connected() {
            log::info!("VR headset not found. VR rendering disabled.");
            self.vr_enabled = false;
        }
        if controls.pressed(KeyCode::Space) {
            vr.recenter();
        }

        changes.material_step = controls.step(KeyCode::KeyX, KeyCode::KeyZ);
        changes.mesh_step = controls.step(KeyCode::KeyV, KeyCode::KeyC);

        controls.adjust_multiplied(
            KeyCode::KeyR,
            KeyCode::KeyF,
            &mut self.state.displacement_magnitude,
            1.1,
            0.0,
            1.0,
            false,
        );
        changes.density_changed = controls.adjust_multiplied(
            KeyCode::KeyT,
            KeyCode::KeyG,
            &mut self.state.displacement_density,
            2.0,
            0.5,
            64.0,
            true,
        );

        changes.toggle_frame_timing = controls.pressed(KeyCode::Home);
        changes.quit = controls.pressed(KeyCode::Escape);
        changes
    }

    /// Correct mode combinations the renderer cannot draw.
    pub fn enforce_policy(&mut self, has_height_map: bool, has_mesh: bool) {
        let modes = &mut self.modes;
        if modes.mesh == MeshMode::LoadedMesh && !has_mesh {
            log::info!("No valid mesh for .OBJ mesh rendering. Switching to single quad.");
            modes.mesh = MeshMode::SingleQuad;
        }
        if modes.mesh == MeshMode::LoadedMesh {
            if modes.lighting == LightingMode::TextureSpace {
                log::info!("Texture space lighting needs the single quad. Using forward lighting.");
                modes.lighting = LightingMode::Forward;
            }
            if modes.normals == NormalMode::Constant {
                log::info!("Constant normals need the single quad. Using interpolated normals.");
                modes.normals = NormalMode::Interpolated;
            }
        }
        if modes.displacement != DisplacementMode::None && !has_height_map {
            log::info!("No valid height map, displacement mapping disabled.");
            modes.displacement = DisplacementMode::None;
        }
        self.state.shadow_lights = self.state.clamped_shadow_lights();
        self.selected_light = self.selected_light.min(self.state.lights.len().saturating_sub(1));
    }

    pub fn renderer_key(&self, material: &str, mesh: &str) -> RendererKey {
        RendererKey {
            mesh_mode: self.modes.mesh,
            displacement: self.modes.displacement,
            lighting: self.modes.lighting,
            precision: self.modes.precision,
            shadows: self.modes.shadows,
            material: material.to_string(),
            mesh: match self.modes.mesh {
                MeshMode::LoadedMesh => mesh.to_string(),
                MeshMode::SingleQuad => String::new(),
            },
            density: self.state.displacement_density,
            magnitude: self.state.displacement_magnitude,
            light_count: self.state.lights.len(),
            shadow_lights: self.state.shadow_lights,
            shadow_resolution: self.state.shadow_resolution,
        }
    }

    pub fn aa_key(&self, vr_active: bool, output: (u32, u32)) -> AaKey {
        AaKey {
            mode: self.state.aa_mode,
            vr_active,
            output,
        }
    }

    pub fn constants(&self, view: ViewSnapshot) -> FrameConstants {
        compute_constants(&self.state, &self.modes, view)
    }

    /// The monitor camera for an output of `width` x `height`.
    pub fn monitor_view(&self, width: u32, height: u32) -> ViewSnapshot {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        let projection = perspective_inverse_z(DEFAULT_VERTICAL_FOV, aspect, NEAR_Z, FAR_Z);
        ViewSnapshot {
            view_proj: projection * self.camera.view(),
            camera_position: self.camera.position,
        }
    }

    /// Write the active names and camera back into the persisted state.
    pub fn sync_state(&mut self, material: &str, mesh: Option<&str>) {
        self.state.svbrdf_name = material.to_string();
        self.state.mesh_name = match (self.modes.mesh, mesh) {
            (MeshMode::LoadedMesh, Some(name)) => name.to_string(),
            _ => String::new(),
        };
        self.state.camera_position = self.camera.position;
        self.state.camera_yaw_degrees = self.camera.yaw.to_degrees();
        self.state.camera_pitch_degrees = self.camera.pitch.to_degrees();
    }

    fn update_camera(&mut self, controls: &Controls) {
        let step = controls.increment(MOVE_SPEED);
        let mut movement = Vec3::ZERO;
        if controls.held(KeyCode::KeyW) {
            movement.z -= step;
        } else if controls.held(KeyCode::KeyS) {
            movement.z += step;
        }
        if controls.held(KeyCode::KeyA) {
            movement.x -= step;
        } else if controls.held(KeyCode::KeyD) {
            movement.x += step;
        }

        let mut yaw = 0.0;
        if controls.held(KeyCode::ArrowLeft) {
            yaw += TURN_SPEED;
        } else if controls.held(KeyCode::ArrowRight) {
            yaw -= TURN_SPEED;
        }
        let mut pitch = 0.0;
        if controls.held(KeyCode::ArrowUp) {
            pitch += TURN_SPEED;
        } else if controls.held(KeyCode::ArrowDown) {
            pitch -= TURN_SPEED;
        }

        self.camera.advance(movement, yaw, pitch);
    }

    fn update_lights(&mut self, controls: &Controls) {
        let count = self.state.lights.len();
        let step = controls.step(KeyCode::Numpad3, KeyCode::Numpad1);
        if step != 0 {
            self.selected_light = step_index(self.selected_light, step, count);
            log::info!("Selected light: {}", self.selected_light);
        }

        if let Some(light) = self.state.lights.get_mut(self.selected_light) {
            let axes = [
                (KeyCode::Numpad6, KeyCode::Numpad4, &mut light.position.x),
                (KeyCode::Numpad9, KeyCode::Numpad7, &mut light.position.y),
                (KeyCode::Numpad8, KeyCode::Numpad5, &mut light.position.z),
            ];
            for (increase, decrease, value) in axes {
                controls.adjust_clamped(
                    increase,
                    decrease,
                    value,
                    LIGHT_POS_INCREMENT,
                    -LIGHT_POS_EXTENT,
                    LIGHT_POS_EXTENT,
                );
            }
            let color = &mut light.color;
            for channel in [&mut color.x, &mut color.y, &mut color.z] {
                controls.adjust_multiplied(
                    KeyCode::NumpadMultiply,
                    KeyCode::NumpadDivide,
                    channel,
                    1.1,
                    0.0,
                    LIGHT_MAX_INTENSITY,
                    false,
                );
            }
        }

        if controls.pressed(KeyCode::NumpadAdd) {
            self.add_light();
        }
        if controls.pressed(KeyCode::NumpadSubtract) {
            self.remove_light();
        }

        let max_shadow = self.state.lights.len() as u32;
        if controls.pressed(KeyCode::NumpadDecimal) && self.state.shadow_lights < max_shadow {
            self.state.shadow_lights += 1;
            log::info!("Lights with shadows: {}", self.state.shadow_lights);
        }
        if controls.pressed(KeyCode::Numpad0) && self.state.shadow_lights > 0 {
            self.state.shadow_lights -= 1;
            log::info!("Lights with shadows: {}", self.state.shadow_lights);
        }
    }
}

fn camera_from_state(state: &RenderingState) -> FpsCamera {
    FpsCamera::from_degrees(
        state.camera_position,
        state.camera_yaw_degrees,
        state.camera_pitch_degrees,
    )
}

fn preset_action(controls: &Controls) -> Option<PresetAction> {
    if let Some(slot) = PRESET_KEYS.iter().position(|&k| controls.pressed(k)) {
        return Some(if controls.ctrl() {
            PresetAction::Save(slot)
        } else {
            PresetAction::Load(slot)
        });
    }
    controls
        .pressed(KeyCode::F11)
        .then_some(PresetAction::ReloadLast)
}

pub fn help_text() -> String {
    [
        ("Move camera", "WASD (hold Ctrl for speed)"),
        ("Turn camera", "Arrows"),
        ("Material / mesh", "Z X / C V"),
        ("Mesh mode", "1"),
        ("Displacement", "2"),
        ("Shadows", "3"),
        ("Antialiasing", "4"),
        ("Normals", "5"),
        ("Normal mapping", "6"),
        ("Tone mapping", "7"),
        ("Lighting", "8"),
        ("Displacement density", "T G"),
        ("Displacement magnitude", "R F"),
        ("VR rendering / scale / recenter", "Enter / I K / Space"),
        ("Add / remove light", "Numpad + -"),
        ("Lights with shadows", "Numpad . 0"),
        ("Selected light", "Numpad 1 3"),
        ("Move light", "Numpad 4 6 7 9 5 8"),
        ("Light intensity", "Numpad * /"),
        ("Ambient intensity", "PgUp PgDn"),
        ("Load / save preset", "F1..F10 / Ctrl + F1..F10"),
        ("Reload last preset", "F11"),
        ("Wireframe", "Del"),
        ("Frame time measurement", "Home"),
        ("Help", "Tab"),
    ]
    .iter()
    .map(|(action, keys)| format!("  {action:<34}({keys})"))
    .collect::<Vec<_>>()
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vr::NoHeadset;
    use svbrdf_core::FloatImage;
    use winit::event::ElementState;

    fn press(keys: &[KeyCode]) -> Controls {
        let mut controls = Controls::new();
        for &key in keys {
            controls.handle_key(key, ElementState::Pressed);
        }
        controls
    }

    fn material(size: u32, with_height: bool) -> Material {
        let tiny = FloatImage::new(1, 1, 4);
        Material {
            name: "test".into(),
            path: "test".into(),
            width: size,
            height: size,
            diffuse_albedo: tiny.clone(),
            specular_albedo: tiny.clone(),
            specular_shape: tiny.clone(),
            normals: tiny,
            height_map: with_height.then(|| FloatImage::new(size, size, 1)),
            alpha: 1.0,
        }
    }

    #[test]
    fn test_new_session_uses_quad_defaults() {
        let session = Session::new(RenderingState::default());
        assert_eq!(session.modes.mesh, MeshMode::SingleQuad);
        assert_eq!(session.modes.normals, NormalMode::Constant);
        assert!(session.modes.use_normal_mapping);
        assert_eq!(session.camera.position, Vec3::new(-5.5, -5.0, 2.5));
    }

    #[test]
    fn test_add_light_copies_selected_position() {
        let mut session = Session::new(RenderingState::default());
        session.state.lights[0].color = Vec3::splat(3.0);
        session.add_light();
        assert_eq!(session.state.lights.len(), 2);
        assert_eq!(session.selected_light, 1);
        let added = session.state.lights[1];
        assert_eq!(added.position, Vec3::splat(3.0));
        assert_eq!(added.color, Vec3::ONE);
        assert_eq!(added.falloff, 1.0);
    }

    #[test]
    fn test_remove_light_keeps_one_and_clamps() {
        let mut session = Session::new(RenderingState::default());
        session.remove_light();
        assert_eq!(session.state.lights.len(), 1);

        session.add_light();
        session.add_light();
        session.state.shadow_lights = 3;
        session.remove_light();
        assert_eq!(session.state.lights.len(), 2);
        assert_eq!(session.selected_light, 1);
        assert_eq!(session.state.shadow_lights, 2);
    }

    #[test]
    fn test_loaded_mesh_forces_forward_lighting() {
        let mut session = Session::new(RenderingState::default());
        session.modes.mesh = MeshMode::LoadedMesh;
        session.modes.lighting = LightingMode::TextureSpace;
        session.modes.normals = NormalMode::Constant;
        session.enforce_policy(true, true);
        assert_eq!(session.modes.lighting, LightingMode::Forward);
        assert_eq!(session.modes.normals, NormalMode::Interpolated);
    }

    #[test]
    fn test_quad_keeps_texture_space_lighting() {
        let mut session = Session::new(RenderingState::default());
        session.modes.lighting = LightingMode::TextureSpace;
        session.enforce_policy(true, false);
        assert_eq!(session.modes.lighting, LightingMode::TextureSpace);
        assert_eq!(session.modes.normals, NormalMode::Constant);
    }

    #[test]
    fn test_missing_inputs_fall_back() {
        let mut session = Session::new(RenderingState::default());
        session.modes.mesh = MeshMode::LoadedMesh;
        session.modes.displacement = DisplacementMode::Cpu;
        session.enforce_policy(false, false);
        assert_eq!(session.modes.mesh, MeshMode::SingleQuad);
        assert_eq!(session.modes.displacement, DisplacementMode::None);
    }

    #[test]
    fn test_rebuild_on_structure_not_on_light_motion() {
        let mut session = Session::new(RenderingState::default());
        let key = session.renderer_key("wood", "");
        assert!(needs_rebuild(None, &key));

        session.state.lights[0].position.x += 1.0;
        session.state.ambient *= 2.0;
        assert!(!needs_rebuild(Some(&key), &session.renderer_key("wood", "")));

        session.state.displacement_density *= 2.0;
        assert!(needs_rebuild(Some(&key), &session.renderer_key("wood", "")));
        assert!(needs_rebuild(Some(&key), &session.renderer_key("stone", "")));
    }

    #[test]
    fn test_mesh_name_ignored_for_quad() {
        let session = Session::new(RenderingState::default());
        assert_eq!(session.renderer_key("wood", "bunny").mesh, "");
    }

    #[test]
    fn test_aa_rebuild_on_mode_or_size() {
        let mut session = Session::new(RenderingState::default());
        let key = session.aa_key(false, (800, 600));
        assert!(!needs_aa_rebuild(Some(&key), &session.aa_key(false, (800, 600))));
        assert!(needs_aa_rebuild(Some(&key), &session.aa_key(false, (1024, 600))));
        assert!(needs_aa_rebuild(Some(&key), &session.aa_key(true, (800, 600))));
        session.state.aa_mode = AntialiasingMode::Msaa4x;
        assert!(needs_aa_rebuild(Some(&key), &session.aa_key(false, (800, 600))));
    }

    #[test]
    fn test_apply_preset_resets_modes() {
        let mut session = Session::new(RenderingState::default());
        session.modes.shadows = ShadowMode::ShadowMapping;
        session.modes.displacement = DisplacementMode::Gpu;
        session.selected_light = 0;

        let preset = RenderingState {
            camera_position: Vec3::new(1.0, 2.0, 3.0),
            camera_yaw_degrees: 90.0,
            lights: Vec::new(),
            ..Default::default()
        };
        session.apply_preset(preset, true);
        assert_eq!(session.modes.mesh, MeshMode::LoadedMesh);
        assert_eq!(session.modes.normals, NormalMode::Interpolated);
        assert_eq!(session.modes.shadows, ShadowMode::None);
        assert_eq!(session.modes.displacement, DisplacementMode::None);
        assert_eq!(session.state.lights.len(), 1);
        assert_eq!(session.camera.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((session.camera.yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_mode_keys_cycle() {
        let mut session = Session::new(RenderingState::default());
        let controls = press(&[KeyCode::Digit8, KeyCode::Digit3, KeyCode::Digit4]);
        session.handle_input(&controls, &mut NoHeadset);
        assert_eq!(session.modes.lighting, LightingMode::TextureSpace);
        assert_eq!(session.modes.shadows, ShadowMode::ShadowMapping);
        assert_eq!(session.state.aa_mode, AntialiasingMode::Ssaa2x);
    }

    #[test]
    fn test_preset_keys() {
        let mut session = Session::new(RenderingState::default());
        let changes = session.handle_input(&press(&[KeyCode::F3]), &mut NoHeadset);
        assert_eq!(changes.preset, Some(PresetAction::Load(2)));

        let changes =
            session.handle_input(&press(&[KeyCode::ControlLeft, KeyCode::F1]), &mut NoHeadset);
        assert_eq!(changes.preset, Some(PresetAction::Save(0)));

        let changes = session.handle_input(&press(&[KeyCode::F11]), &mut NoHeadset);
        assert_eq!(changes.preset, Some(PresetAction::ReloadLast));
    }

    #[test]
    fn test_vr_without_headset_falls_back() {
        let mut session = Session::new(RenderingState::default());
        let changes = session.handle_input(&press(&[KeyCode::Enter]), &mut NoHeadset);
        assert!(changes.vr_toggled);
        assert!(!session.vr_enabled);
    }

    #[test]
    fn test_density_keys_double_and_clamp() {
        let mut session = Session::new(RenderingState::default());
        let changes = session.handle_input(&press(&[KeyCode::KeyT]), &mut NoHeadset);
        assert!(changes.density_changed);
        assert_eq!(session.state.displacement_density, 32.0);
        session.handle_input(&press(&[KeyCode::KeyT]), &mut NoHeadset);
        session.handle_input(&press(&[KeyCode::KeyT]), &mut NoHeadset);
        assert_eq!(session.state.displacement_density, 64.0);
    }

    #[test]
    fn test_shadow_light_keys_bounded_by_light_count() {
        let mut session = Session::new(RenderingState::default());
        assert_eq!(session.state.shadow_lights, 1);
        session.handle_input(&press(&[KeyCode::NumpadDecimal]), &mut NoHeadset);
        assert_eq!(session.state.shadow_lights, 1);
        session.handle_input(&press(&[KeyCode::Numpad0]), &mut NoHeadset);
        assert_eq!(session.state.shadow_lights, 0);
        session.handle_input(&press(&[KeyCode::Numpad0]), &mut NoHeadset);
        assert_eq!(session.state.shadow_lights, 0);
    }

    #[test]
    fn test_forward_key_moves_camera() {
        let mut session = Session::new(RenderingState::default());
        let before = session.camera.position;
        session.handle_input(&press(&[KeyCode::KeyW]), &mut NoHeadset);
        let moved = (session.camera.position - before).length();
        assert!((moved - MOVE_SPEED).abs() < 1e-5);
    }

    #[test]
    fn test_sync_state_writes_camera_and_names() {
        let mut session = Session::new(RenderingState::default());
        session.camera.position = Vec3::new(1.0, 1.0, 1.0);
        session.sync_state("wood", Some("bunny"));
        assert_eq!(session.state.svbrdf_name, "wood");
        assert_eq!(session.state.mesh_name, "");
        assert_eq!(session.state.camera_position, Vec3::ONE);

        session.modes.mesh = MeshMode::LoadedMesh;
        session.sync_state("wood", Some("bunny"));
        assert_eq!(session.state.mesh_name, "bunny");
    }

    #[test]
    fn test_quad_geometry_without_displacement() {
        let session = Session::new(RenderingState::default());
        let (mesh, scale) = build_geometry(&session.modes, &session.state, &material(64, true), None);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_gpu_displacement_refines_coarse_grid() {
        let mut session = Session::new(RenderingState::default());
        session.modes.displacement = DisplacementMode::Gpu;
        session.state.displacement_density = 8.0;
        let material = material(512, true);

        let coarse = build_quad_mesh(&QuadParams {
            material_size: material.size(),
            height_map: material.height_map.as_ref(),
            mode: DisplacementMode::Gpu,
            density: 8.0,
            magnitude: session.state.displacement_magnitude,
        });
        let (refined, _) = build_geometry(&session.modes, &session.state, &material, None);
        assert!(refined.triangle_count() > coarse.triangle_count());
        assert_eq!(refined.triangle_count() % coarse.triangle_count(), 0);
    }

    #[test]
    fn test_loaded_mesh_scaled_to_quad_size() {
        let mut session = Session::new(RenderingState::default());
        session.modes.mesh = MeshMode::LoadedMesh;
        let mesh = MeshData {
            scale: 2.0,
            ..build_quad_mesh(&QuadParams {
                material_size: (4, 4),
                height_map: None,
                mode: DisplacementMode::None,
                density: 1.0,
                magnitude: 0.0,
            })
        };
        let (geometry, scale) =
            build_geometry(&session.modes, &session.state, &material(4, false), Some(&mesh));
        assert_eq!(geometry.vertices.len(), mesh.vertices.len());
        assert!((scale - QUAD_DIM / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_help_lists_preset_keys() {
        let text = help_text();
        assert!(text.contains("F1..F10"));
        assert!(text.contains("Tab"));
    }
}
