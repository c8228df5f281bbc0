//! Window, GPU resources and the frame loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use glam::Quat;
use svbrdf_core::constants::quick_preset_filename;
use svbrdf_core::math::view_matrix;
use svbrdf_core::mesh::{compute_tessellation_factors, target_triangle_area};
use svbrdf_core::preset::{load_preset, save_preset};
use svbrdf_core::{Material, MeshData, RenderingState, ViewSnapshot};
use svbrdf_render::blit::Blitter;
use svbrdf_render::texture::GpuTexture;
use svbrdf_render::{
    init_gpu, AaTargets, GpuContext, LightIndicator, MaterialRenderer, MaterialTextures,
    RendererDesc, ShadowConfig, MAX_VIEWS,
};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowId};

use crate::collections::{step_index, MaterialCollection, MeshCollection};
use crate::config::ViewerConfig;
use crate::controls::Controls;
use crate::error::ViewerError;
use crate::session::{
    build_geometry, needs_aa_rebuild, needs_rebuild, AaKey, PresetAction, RendererKey, Session,
};
use crate::timing::FrameTimer;
use crate::vr::{eye_camera, EyeView, NoHeadset, VrSession};

/// Startup settings resolved from the command line and config file.
#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub data_dir: PathBuf,
    pub rw_presets: bool,
    pub config: ViewerConfig,
}

/// winit handler. The viewer itself is created once the window can be.
pub struct Viewer {
    options: ViewerOptions,
    app: Option<ViewerApp>,
    error: Option<ViewerError>,
}

impl Viewer {
    pub fn new(options: ViewerOptions) -> Self {
        Self {
            options,
            app: None,
            error: None,
        }
    }

    /// Run until the window closes. Returns the error that stopped the
    /// viewer, if any.
    pub fn run(mut self) -> Result<(), ViewerError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{error}");
        self.error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(app) = &self.app {
            app.window.request_redraw();
            return;
        }
        match ViewerApp::new(event_loop, &self.options) {
            Ok(app) => {
                app.window.request_redraw();
                self.app = Some(app);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        if window_id != app.window.id() {
            return;
        }

        match event {
            WindowEvent::RedrawRequested => {
                if app.frame() {
                    app.window.request_redraw();
                } else {
                    log::info!("Shutting down");
                    event_loop.exit();
                }
            }
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app.gpu.resize(size.width, size.height),
            WindowEvent::Focused(false) => app.controls.reset(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => app.controls.handle_key(code, state),
            _ => {}
        }
    }
}

struct ViewerApp {
    window: Arc<Window>,
    gpu: GpuContext,
    data_dir: PathBuf,
    rw_presets: bool,
    vsync: bool,
    anisotropy: u16,
    max_lights_hint: u32,

    session: Session,
    controls: Controls,
    vr: Box<dyn VrSession>,
    timer: FrameTimer,
    last_preset: Option<usize>,

    materials: MaterialCollection,
    material_index: usize,
    material: Material,
    textures: MaterialTextures,
    meshes: MeshCollection,
    mesh_index: usize,
    mesh: Option<MeshData>,

    renderer: Option<(RendererKey, MaterialRenderer)>,
    targets: Option<(AaKey, AaTargets)>,
    eye_textures: Vec<GpuTexture>,
    indicator: LightIndicator,
    mirror: Blitter,
}

impl ViewerApp {
    fn new(event_loop: &ActiveEventLoop, options: &ViewerOptions) -> Result<Self, ViewerError> {
        let config = &options.config;
        let data_dir = options.data_dir.clone();

        let materials = MaterialCollection::scan(&data_dir);
        if materials.is_empty() {
            return Err(ViewerError::NoMaterials(data_dir));
        }
        let meshes = MeshCollection::scan(&data_dir);

        let initial = match &config.initial_preset {
            Some(name) => load_preset(&data_dir.join(name)).unwrap_or_else(|e| {
                log::warn!("{e}, starting from defaults");
                RenderingState::default()
            }),
            None => RenderingState::default(),
        };
        let material_index = materials.index_of(&initial.svbrdf_name).unwrap_or(0);
        let preset_mesh = meshes.index_of(&initial.mesh_name);
        let mut session = Session::new(RenderingState::default());
        session.apply_preset(initial, preset_mesh.is_some());
        if let Some(modes) = config.initial_modes {
            session.modes = modes;
        }

        let material = materials.load(material_index)?;
        let mesh_index = preset_mesh.unwrap_or(0);
        let target = target_triangle_area(
            material.width,
            material.height,
            session.state.displacement_density,
        );
        let mesh = load_mesh(&meshes, mesh_index, target);

        let window = Arc::new(
            event_loop.create_window(
                Window::default_attributes()
                    .with_title(config.window_title.clone())
                    .with_inner_size(PhysicalSize::new(config.window_width, config.window_height)),
            )?,
        );
        let gpu = init_gpu(
            window.clone(),
            config.window_width,
            config.window_height,
            config.vsync,
        )?;

        let textures = MaterialTextures::new(&gpu.device, &gpu.queue, &material);
        let indicator = LightIndicator::new(&gpu.device, gpu.surface_format);
        let mirror = Blitter::new(&gpu.device, gpu.surface_format);
        log::info!("Press Tab for the key bindings");

        Ok(Self {
            window,
            data_dir,
            rw_presets: options.rw_presets,
            vsync: config.vsync,
            anisotropy: config.anisotropy,
            max_lights_hint: config.max_lights_hint,
            session,
            controls: Controls::new(),
            vr: Box::new(NoHeadset),
            timer: FrameTimer::new(),
            last_preset: None,
            materials,
            material_index,
            material,
            textures,
            meshes,
            mesh_index,
            mesh,
            renderer: None,
            targets: None,
            eye_textures: Vec::new(),
            indicator,
            mirror,
            gpu,
        })
    }

    /// One frame: input, resource updates, rendering. Returns false to quit.
    fn frame(&mut self) -> bool {
        let changes = self.session.handle_input(&self.controls, self.vr.as_mut());
        self.controls.end_frame();
        if changes.quit {
            return false;
        }

        if let Some(action) = changes.preset {
            self.handle_preset(action);
        }
        if changes.material_step != 0 {
            let index = step_index(self.material_index, changes.material_step, self.materials.len());
            self.load_material(index);
        }
        if changes.mesh_step != 0 && !self.meshes.is_empty() {
            self.mesh_index = step_index(self.mesh_index, changes.mesh_step, self.meshes.len());
            self.mesh = load_mesh(&self.meshes, self.mesh_index, self.target_area());
        }
        if changes.density_changed {
            self.retessellate();
        }
        if changes.toggle_frame_timing {
            let measuring = self.timer.toggle();
            log::info!("Frame time measurement: {measuring}");
            self.gpu.set_vsync(self.vsync && !measuring);
        }

        self.session
            .enforce_policy(self.material.has_height_map(), self.mesh.is_some());
        self.ensure_renderer();

        let lights = &self.session.state.lights;
        if let Some((_, renderer)) = self.renderer.as_mut() {
            renderer.update_lights(&self.gpu.queue, lights);
        }
        self.indicator
            .update(&self.gpu.queue, lights, self.session.selected_light);

        let mesh_name = self.mesh_name();
        self.session
            .sync_state(&self.material.name, mesh_name.as_deref());

        self.render();

        if let Some(mean) = self.timer.frame_finished(Instant::now()) {
            log::info!("Frame time: {:.3} ms", mean.as_secs_f64() * 1000.0);
        }
        true
    }

    fn handle_preset(&mut self, action: PresetAction) {
        match action {
            PresetAction::Load(slot) => self.load_slot(slot),
            PresetAction::ReloadLast => match self.last_preset {
                Some(slot) => self.load_slot(slot),
                None => log::info!("No preset loaded yet"),
            },
            PresetAction::Save(slot) => {
                if !self.rw_presets {
                    log::info!("Preset saving disabled, run with --rw-presets to enable it");
                    return;
                }
                let path = self.data_dir.join(quick_preset_filename(slot));
                if let Err(e) = save_preset(&path, &self.session.state) {
                    log::error!("{e}");
                }
            }
        }
    }

    fn load_slot(&mut self, slot: usize) {
        let path = self.data_dir.join(quick_preset_filename(slot));
        match load_preset(&path) {
            Ok(state) => {
                self.last_preset = Some(slot);
                self.apply_state(state);
            }
            Err(e) => log::warn!("{e}"),
        }
    }

    fn apply_state(&mut self, state: RenderingState) {
        if state.lights.len() > self.max_lights_hint as usize {
            log::warn!(
                "Preset has {} lights, more than the configured hint of {}",
                state.lights.len(),
                self.max_lights_hint
            );
        }
        let material_index = self.materials.index_of(&state.svbrdf_name).unwrap_or(0);
        let mesh_index = self.meshes.index_of(&state.mesh_name);
        self.session.apply_preset(state, mesh_index.is_some());

        if material_index != self.material_index {
            self.load_material(material_index);
        }
        match mesh_index {
            Some(index) if index != self.mesh_index || self.mesh.is_none() => {
                self.mesh_index = index;
                self.mesh = load_mesh(&self.meshes, index, self.target_area());
            }
            _ => self.retessellate(),
        }
    }

    /// Switch materials. A material that fails to load leaves the current one.
    fn load_material(&mut self, index: usize) {
        match self.materials.load(index) {
            Ok(material) => {
                self.textures = MaterialTextures::new(&self.gpu.device, &self.gpu.queue, &material);
                log::info!(
                    "SVBRDF: {} ({}x{})",
                    material.name,
                    material.width,
                    material.height
                );
                self.material = material;
                self.material_index = index;
                self.retessellate();
            }
            Err(e) => log::error!("Failed to load SVBRDF: {e}"),
        }
    }

    fn target_area(&self) -> f32 {
        target_triangle_area(
            self.material.width,
            self.material.height,
            self.session.state.displacement_density,
        )
    }

    fn retessellate(&mut self) {
        let target = self.target_area();
        if let Some(mesh) = self.mesh.as_mut() {
            compute_tessellation_factors(mesh, target);
        }
    }

    fn mesh_name(&self) -> Option<String> {
        self.mesh.as_ref().and_then(|_| self.meshes.name(self.mesh_index))
    }

    fn ensure_renderer(&mut self) {
        let mesh_name = self.mesh_name().unwrap_or_default();
        let key = self.session.renderer_key(&self.material.name, &mesh_name);
        if !needs_rebuild(self.renderer.as_ref().map(|(k, _)| k), &key) {
            return;
        }

        let (geometry, mesh_scale) = build_geometry(
            &self.session.modes,
            &self.session.state,
            &self.material,
            self.mesh.as_ref(),
        );
        let constants = self.session.constants(ViewSnapshot::default());
        let renderer = MaterialRenderer::new(
            &self.gpu.device,
            &RendererDesc {
                mesh: &geometry,
                mesh_scale,
                material: &self.textures,
                lighting: self.session.modes.lighting,
                precision: self.session.modes.precision,
                output_format: self.gpu.surface_format,
                shadow: ShadowConfig::from_constants(&constants, self.session.state.lights.len()),
                anisotropy: self.anisotropy,
            },
        );
        log::info!(
            "Renderer: {:?} mesh, {:?} lighting, {:?} displacement, {} triangles",
            key.mesh_mode,
            key.lighting,
            key.displacement,
            geometry.triangle_count()
        );
        self.renderer = Some((key, renderer));
    }

    /// Color and depth targets for the current views, plus eye textures in VR.
    fn ensure_targets(&mut self, eyes: &[EyeView]) {
        let sizes: Vec<(u32, u32)> = if eyes.is_empty() {
            vec![self.gpu.size()]
        } else {
            eyes.iter().map(|e| e.size).collect()
        };
        let key = self.session.aa_key(!eyes.is_empty(), sizes[0]);
        if !needs_aa_rebuild(self.targets.as_ref().map(|(k, _)| k), &key) {
            return;
        }

        let device = &self.gpu.device;
        let format = self.gpu.surface_format;
        self.targets = Some((key, AaTargets::new(device, key.mode, format, &sizes)));
        self.eye_textures = if eyes.is_empty() {
            Vec::new()
        } else {
            sizes
                .iter()
                .map(|&size| eye_texture(device, format, size))
                .collect()
        };
    }

    /// Camera of every view rendered this frame, with its orientation.
    fn views(&self, eyes: &[EyeView]) -> Vec<(ViewSnapshot, Quat)> {
        let camera = &self.session.camera;
        if eyes.is_empty() {
            let (width, height) = self.gpu.size();
            return vec![(self.session.monitor_view(width, height), camera.rotation())];
        }
        let multiplier = self.session.state.head_position_multiplier();
        eyes.iter()
            .map(|eye| {
                let (position, rotation) =
                    eye_camera(camera.position, camera.rotation(), eye, multiplier);
                let view = ViewSnapshot {
                    view_proj: eye.projection * view_matrix(position, rotation),
                    camera_position: position,
                };
                (view, rotation)
            })
            .collect()
    }

    fn render(&mut self) {
        let mut eyes = if self.session.vr_enabled && self.vr.is_active() {
            self.vr.eye_views()
        } else {
            Vec::new()
        };
        eyes.truncate(MAX_VIEWS as usize);
        self.ensure_targets(&eyes);
        let views = self.views(&eyes);

        let Self {
            gpu,
            session,
            vr,
            renderer,
            targets,
            eye_textures,
            indicator,
            mirror,
            ..
        } = self;
        let (Some((_, renderer)), Some((_, targets))) = (renderer.as_mut(), targets.as_ref()) else {
            return;
        };
        let Some(&(first_view, _)) = views.first() else {
            return;
        };

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost) => {
                gpu.surface.configure(&gpu.device, &gpu.surface_config);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("GPU out of memory");
                return;
            }
            Err(e) => {
                log::error!("Surface error: {e:?}");
                return;
            }
        };
        let surface_view = output.texture.create_view(&Default::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        // 1. Shadow maps, shared by every view
        let constants = session.constants(first_view);
        renderer.render_viewport_independent(
            &gpu.device,
            &gpu.queue,
            &mut encoder,
            &constants,
            &session.state.lights,
        );

        // 2. Each view into its antialiasing target, resolved to its output
        let sample_count = targets.sample_count();
        for (i, &(view, rotation)) in views.iter().enumerate() {
            let Some(target) = targets.view(i) else {
                continue;
            };
            let output_view = eye_textures.get(i).map_or(&surface_view, |t| &t.view);
            let view_index = i as u32;
            renderer.prepare_view(
                &gpu.device,
                &gpu.queue,
                &mut encoder,
                view_index,
                &constants.with_view(view),
            );
            indicator.prepare_view(&gpu.queue, view_index, view.view_proj, rotation);
            {
                let mut pass = target.begin_pass(&mut encoder, output_view);
                renderer.draw(&mut pass, view_index, sample_count, session.modes.wireframe);
                indicator.draw(&mut pass, view_index, sample_count);
            }
            targets.resolve(&gpu.device, &mut encoder, i, output_view);
        }

        // 3. Mirror the first eye on the monitor
        if let Some(eye) = eye_textures.first() {
            mirror.blit(&gpu.device, &mut encoder, &eye.view, &surface_view);
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        if !eye_textures.is_empty() {
            let eyes: Vec<&wgpu::Texture> = eye_textures.iter().map(|t| &t.texture).collect();
            vr.submit_frame(&eyes);
        }
        output.present();
    }
}

/// Load a mesh, logging failures. An empty collection gives no mesh.
fn load_mesh(meshes: &MeshCollection, index: usize, target_area: f32) -> Option<MeshData> {
    if meshes.is_empty() {
        return None;
    }
    match meshes.load(index, target_area) {
        Ok(mesh) => {
            log::info!(
                "Mesh: {} ({} triangles)",
                meshes.name(index).unwrap_or_default(),
                mesh.triangle_count()
            );
            Some(mesh)
        }
        Err(e) => {
            log::error!("Failed to load mesh: {e}");
            None
        }
    }
}

fn eye_texture(device: &wgpu::Device, format: wgpu::TextureFormat, (width, height): (u32, u32)) -> GpuTexture {
    GpuTexture::new(
        device,
        &wgpu::TextureDescriptor {
            label: Some("eye-color"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        },
    )
}
