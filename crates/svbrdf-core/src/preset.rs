//! Line-oriented preset format.
//!
//! Each line is `key value...`; `#` starts a comment. A `light` line opens a
//! new light record and the following `light_*` lines apply to it.

use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;

use glam::Vec3;

use crate::error::SvbrdfError;
use crate::modes::{AntialiasingMode, TonemapMode};
use crate::state::{Light, RenderingState};

fn aa_token(mode: AntialiasingMode) -> (&'static str, &'static str) {
    match mode {
        AntialiasingMode::None => ("0", "No antialiasing"),
        AntialiasingMode::Ssaa2x => ("2", "SSAA 2x"),
        AntialiasingMode::Ssaa4x => ("4", "SSAA 4x"),
        AntialiasingMode::Msaa4x => ("m", "MSAA 4x"),
    }
}

fn parse_aa(token: &str) -> AntialiasingMode {
    match token.chars().next() {
        Some('2') => AntialiasingMode::Ssaa2x,
        Some('4') => AntialiasingMode::Ssaa4x,
        Some('m' | 'M') => AntialiasingMode::Msaa4x,
        _ => AntialiasingMode::None,
    }
}

fn tonemap_token(mode: TonemapMode) -> (&'static str, &'static str) {
    match mode {
        TonemapMode::Identity => ("0", "Identity tone mapping"),
        TonemapMode::Reinhard => ("r", "Reinhard tone mapping"),
        TonemapMode::ReinhardModified => {
            ("m", "Reinhard modified tone mapping with fixed exposure")
        }
    }
}

fn parse_tonemap(token: &str) -> TonemapMode {
    match token.chars().next() {
        Some('r' | 'R') => TonemapMode::Reinhard,
        Some('m' | 'M') => TonemapMode::ReinhardModified,
        _ => TonemapMode::Identity,
    }
}

/// Serialize a state into preset text.
pub fn write_preset(state: &RenderingState) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_preset_into(&mut out, state);
    out
}

fn write_preset_into(out: &mut String, state: &RenderingState) -> std::fmt::Result {
    writeln!(out, "# Comments start with '#'")?;
    writeln!(
        out,
        "svbrdf {}    # Material name from the data directory",
        state.svbrdf_name
    )?;
    if state.mesh_name.is_empty() {
        writeln!(out, "# mesh <mesh-name>    # Mesh name from the data directory")?;
    } else {
        writeln!(
            out,
            "mesh {}    # Mesh name from the data directory",
            state.mesh_name
        )?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "vr_scale     {}    # Head position multiplied by 10^({} / 4)",
        state.vr_scale, state.vr_scale
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "displacement_density   {}    # About {} heightmap pixels per vertex. 0 = disabled.",
        state.displacement_density, state.displacement_density
    )?;
    writeln!(out, "displacement_magnitude {}", state.displacement_magnitude)?;
    writeln!(out)?;

    let (aa, aa_comment) = aa_token(state.aa_mode);
    writeln!(out, "aa {aa}    # {aa_comment}")?;
    let (tm, tm_comment) = tonemap_token(state.tonemap_mode);
    writeln!(out, "tonemap {tm}    # {tm_comment}")?;
    writeln!(out)?;

    let p = state.camera_position;
    writeln!(out, "camera_position      {} {} {}", p.x, p.y, p.z)?;
    writeln!(out, "camera_yaw_degrees   {}", state.camera_yaw_degrees)?;
    writeln!(out, "camera_pitch_degrees {}", state.camera_pitch_degrees)?;
    writeln!(out)?;

    let a = state.ambient;
    writeln!(
        out,
        "ambient {} {} {}    # Constant diffuse HDR ambient",
        a.x, a.y, a.z
    )?;
    writeln!(out)?;

    writeln!(
        out,
        "shadow_lights                  {}    # First {} lights will have shadows",
        state.shadow_lights, state.shadow_lights
    )?;
    writeln!(
        out,
        "shadow_resolution              {}    # Shadow map resolution",
        state.shadow_resolution
    )?;
    writeln!(out, "shadow_depth_bias              {}", state.shadow_depth_bias)?;
    writeln!(
        out,
        "shadow_slope_scaled_depth_bias {}",
        state.shadow_ss_depth_bias
    )?;

    for light in &state.lights {
        writeln!(out)?;
        writeln!(out, "light")?;
        let p = light.position;
        writeln!(out, "light_position {} {} {}", p.x, p.y, p.z)?;
        writeln!(
            out,
            "light_falloff  {}          # Multiplier for falloff",
            light.falloff
        )?;
        let c = light.color;
        writeln!(out, "light_color    {} {} {}    # HDR color", c.x, c.y, c.z)?;
    }
    Ok(())
}

fn scalar<T: FromStr>(args: &[&str]) -> Option<T> {
    args.first().and_then(|a| a.parse().ok())
}

fn vec3(args: &[&str]) -> Option<Vec3> {
    if args.len() < 3 {
        return None;
    }
    Some(Vec3::new(
        args[0].parse().ok()?,
        args[1].parse().ok()?,
        args[2].parse().ok()?,
    ))
}

/// Parse preset text. Absent keys keep their default values.
///
/// Malformed or unknown lines are skipped with a warning; parsing never fails.
pub fn parse_preset(text: &str) -> RenderingState {
    let mut state = RenderingState {
        lights: Vec::new(),
        ..Default::default()
    };

    for (line_no, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            continue;
        };
        let args: Vec<&str> = parts.collect();

        let applied = match key {
            "svbrdf" => args.first().map(|s| state.svbrdf_name = s.to_string()),
            "mesh" => args.first().map(|s| state.mesh_name = s.to_string()),
            "vr_scale" => scalar(&args).map(|v| state.vr_scale = v),
            "displacement_density" => scalar(&args).map(|v| state.displacement_density = v),
            "displacement_magnitude" => scalar(&args).map(|v| state.displacement_magnitude = v),
            "aa" => args.first().map(|t| state.aa_mode = parse_aa(t)),
            "tonemap" => args.first().map(|t| state.tonemap_mode = parse_tonemap(t)),
            "camera_position" => vec3(&args).map(|v| state.camera_position = v),
            "camera_yaw_degrees" => scalar(&args).map(|v| state.camera_yaw_degrees = v),
            "camera_pitch_degrees" => scalar(&args).map(|v| state.camera_pitch_degrees = v),
            "ambient" => vec3(&args).map(|v| state.ambient = v),
            "shadow_lights" => scalar(&args).map(|v| state.shadow_lights = v),
            "shadow_resolution" => scalar(&args).map(|v| state.shadow_resolution = v),
            "shadow_depth_bias" => scalar(&args).map(|v| state.shadow_depth_bias = v),
            "shadow_slope_scaled_depth_bias" => {
                scalar(&args).map(|v| state.shadow_ss_depth_bias = v)
            }
            "light" => {
                state.lights.push(Light::default());
                Some(())
            }
            "light_position" | "light_falloff" | "light_color" => {
                let Some(light) = state.lights.last_mut() else {
                    log::warn!(
                        "Preset line {}: '{key}' before any 'light' line, ignored",
                        line_no + 1
                    );
                    continue;
                };
                match key {
                    "light_position" => vec3(&args).map(|v| light.position = v),
                    "light_falloff" => scalar(&args).map(|v| light.falloff = v),
                    _ => vec3(&args).map(|v| light.color = v),
                }
            }
            other => {
                log::warn!("Preset line {}: unknown key '{other}'", line_no + 1);
                continue;
            }
        };

        if applied.is_none() {
            log::warn!("Preset line {}: malformed value for '{key}'", line_no + 1);
        }
    }

    if !(state.displacement_density >= 1.0) {
        state.displacement_density = 0.0;
    }

    if state.lights.is_empty() {
        state.lights = RenderingState::default().lights;
    }

    state
}

/// Write a preset file.
pub fn save_preset(path: &Path, state: &RenderingState) -> Result<(), SvbrdfError> {
    std::fs::write(path, write_preset(state)).map_err(|e| SvbrdfError::io(path, e))?;
    log::info!("Saved preset \"{}\"", path.display());
    Ok(())
}

/// Read a preset file.
pub fn load_preset(path: &Path) -> Result<RenderingState, SvbrdfError> {
    let text = std::fs::read_to_string(path).map_err(|e| SvbrdfError::io(path, e))?;
    log::info!("Loaded preset \"{}\"", path.display());
    Ok(parse_preset(&text))
}
