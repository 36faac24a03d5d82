//! Window side: capture-space panels as sprites, balls as ellipse meshes, and the
//! calibration quad as gizmos.
//!
//! Everything here reads simulation state; nothing writes back to it.

use bevy::asset::RenderAssetUsages;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;
use image::RgbaImage;

use super::systems::{Capture, SimClock};
use super::world::{CalibrationMode, SimulationWorld};
use crate::paint::PaintLayer;
use crate::vision::FrameProcessor;

/// Opacity of the mask drawn over the paint when presenting with input shown.
const PRESENTATION_MASK_ALPHA: f32 = 0.35;

/// A capture-sized panel on screen: top-left corner in window pixels and a uniform scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Panel {
    pub origin: Vec2,
    pub scale: f32,
}

impl Panel {
    /// Capture point (y down) to Bevy 2D world (origin at window centre, y up).
    pub fn to_world(&self, p: Vec2, window: Vec2) -> Vec2 {
        let screen = self.origin + p * self.scale;
        Vec2::new(screen.x - window.x * 0.5, window.y * 0.5 - screen.y)
    }
}

/// Where the raw frame, mask and presentation (paint + balls) go this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub raw: Panel,
    pub mask: Panel,
    pub presentation: Panel,
}

impl Layout {
    /// Raw frame 1:1 in the top-left, mask beside it, presentation underneath.
    pub fn calibrating(capture: Vec2) -> Self {
        let at = |origin| Panel { origin, scale: 1.0 };
        Self {
            raw: at(Vec2::ZERO),
            mask: at(Vec2::new(capture.x, 0.0)),
            presentation: at(Vec2::new(0.0, capture.y)),
        }
    }

    /// Everything fitted to the window, centred, sharing one panel.
    pub fn presenting(capture: Vec2, window: Vec2) -> Self {
        let scale = (window / capture).min_element();
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        let panel = Panel {
            origin: (window - capture * scale) * 0.5,
            scale,
        };
        Self {
            raw: panel,
            mask: panel,
            presentation: panel,
        }
    }

    pub fn for_mode(mode: CalibrationMode, capture: Vec2, window: Vec2) -> Self {
        match mode {
            CalibrationMode::CalibratingIo => Self::calibrating(capture),
            CalibrationMode::Presenting => Self::presenting(capture, window),
        }
    }
}

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelSprite {
    Raw,
    Mask,
    Paint,
}

#[derive(Resource)]
pub struct PanelTextures {
    pub raw: Handle<Image>,
    pub mask: Handle<Image>,
    pub paint: Handle<Image>,
}

/// Pooled ball entities; index `i` shows body `i`.
#[derive(Component)]
pub struct BallSlot(pub usize);

#[derive(Resource)]
pub struct BallAssets {
    pub mesh: Handle<Mesh>,
    pub material: Handle<ColorMaterial>,
}

fn panel_image(width: u32, height: u32) -> Image {
    Image::new_fill(
        Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[255, 255, 255, 255],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

/// Copy an RGBA raster into a texture, recreating it if the size changed.
fn upload(images: &mut Assets<Image>, handle: &Handle<Image>, src: &RgbaImage) {
    let Some(mut image) = images.get_mut(handle) else {
        return;
    };
    let (w, h) = src.dimensions();
    if image.width() != w || image.height() != h {
        *image = panel_image(w, h);
    }
    image.data = Some(src.as_raw().clone());
}

fn grey_to_rgba(mask: &image::GrayImage) -> RgbaImage {
    RgbaImage::from_fn(mask.width(), mask.height(), |x, y| {
        let v = mask.get_pixel(x, y).0[0];
        image::Rgba([v, v, v, 255])
    })
}

pub fn setup_display(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    world: Res<SimulationWorld>,
) {
    commands.spawn(Camera2d);

    let capture = world.context().capture;
    let (w, h) = (capture.x as u32, capture.y as u32);
    let textures = PanelTextures {
        raw: images.add(panel_image(w, h)),
        mask: images.add(panel_image(w, h)),
        paint: images.add(panel_image(w, h)),
    };
    for (kind, handle, z) in [
        (PanelSprite::Paint, &textures.paint, 0.0),
        (PanelSprite::Raw, &textures.raw, 0.0),
        (PanelSprite::Mask, &textures.mask, 1.0),
    ] {
        commands.spawn((
            kind,
            Sprite {
                image: handle.clone(),
                custom_size: Some(capture),
                ..default()
            },
            Transform::from_xyz(0.0, 0.0, z),
        ));
    }
    commands.insert_resource(textures);

    let grey = world.params().ball_colour / 255.0;
    commands.insert_resource(BallAssets {
        mesh: meshes.add(Circle::new(1.0)),
        material: materials.add(Color::srgb(grey, grey, grey)),
    });
}

/// Push the latest raw frame, mask and paint layer to their textures.
pub fn upload_textures(
    textures: Res<PanelTextures>,
    capture: Res<Capture>,
    processor: Res<FrameProcessor>,
    paint: Res<PaintLayer>,
    mut images: ResMut<Assets<Image>>,
) {
    upload(&mut images, &textures.raw, capture.source.last_frame());
    upload(&mut images, &textures.mask, &grey_to_rgba(processor.mask()));
    upload(&mut images, &textures.paint, paint.image());
}

/// Place and show/hide the panel sprites for the current mode.
pub fn layout_panels(
    windows: Query<&Window, With<PrimaryWindow>>,
    world: Res<SimulationWorld>,
    mut sprites: Query<(&PanelSprite, &mut Sprite, &mut Transform, &mut Visibility)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let window = window.size();
    let capture = world.context().capture;
    let mode = world.calibration().mode;
    let layout = Layout::for_mode(mode, capture, window);
    let presenting = mode == CalibrationMode::Presenting;

    for (kind, mut sprite, mut transform, mut visibility) in &mut sprites {
        let (panel, shown, alpha) = match kind {
            PanelSprite::Raw => (layout.raw, !presenting, 1.0),
            PanelSprite::Paint => (layout.presentation, true, 1.0),
            PanelSprite::Mask if presenting => (
                layout.mask,
                world.params().show_input_in_presentation,
                PRESENTATION_MASK_ALPHA,
            ),
            PanelSprite::Mask => (layout.mask, true, 1.0),
        };
        let centre = panel.to_world(capture * 0.5, window);
        transform.translation.x = centre.x;
        transform.translation.y = centre.y;
        sprite.custom_size = Some(capture * panel.scale);
        sprite.color = Color::srgba(1.0, 1.0, 1.0, alpha);
        *visibility = if shown {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
    }
}

/// One ellipse mesh per live body, pooled and reused across frames.
pub fn sync_balls(
    mut commands: Commands,
    windows: Query<&Window, With<PrimaryWindow>>,
    world: Res<SimulationWorld>,
    clock: Res<SimClock>,
    assets: Res<BallAssets>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut slots: Query<(&BallSlot, &mut Transform, &mut Visibility)>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let window = window.size();
    let capture = world.context().capture;
    let panel = Layout::for_mode(world.calibration().mode, capture, window).presentation;

    if let Some(mut material) = materials.get_mut(&assets.material) {
        let grey = world.params().ball_colour / 255.0;
        material.color = Color::srgb(grey, grey, grey);
    }

    let ellipses: Vec<_> = world.ellipses(clock.0).collect();
    let mut pooled = 0;
    for (slot, mut transform, mut visibility) in &mut slots {
        pooled += 1;
        let Some(e) = ellipses.get(slot.0) else {
            *visibility = Visibility::Hidden;
            continue;
        };
        let centre = panel.to_world(e.center, window);
        // y flips between capture and world space, so the heading does too.
        *transform = Transform::from_xyz(centre.x, centre.y, 2.0)
            .with_rotation(Quat::from_rotation_z(-e.rotation))
            .with_scale((e.radii * panel.scale).extend(1.0));
        *visibility = Visibility::Visible;
    }

    // Grow the pool; new slots show up next frame.
    for i in pooled..ellipses.len() {
        commands.spawn((
            BallSlot(i),
            Mesh2d(assets.mesh.clone()),
            MeshMaterial2d(assets.material.clone()),
            Transform::from_xyz(0.0, 0.0, 2.0),
            Visibility::Hidden,
        ));
    }
}

/// Calibration quad and corner handles over the raw frame.
pub fn draw_calibration_overlay(
    mut gizmos: Gizmos,
    windows: Query<&Window, With<PrimaryWindow>>,
    world: Res<SimulationWorld>,
) {
    let calibration = world.calibration();
    if calibration.mode != CalibrationMode::CalibratingIo {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    let window = window.size();
    let panel = Layout::calibrating(world.context().capture).raw;

    let outline = calibration.quad.outline().map(|p| panel.to_world(p, window));
    let colour = Color::srgb(1.0, 0.2, 0.2);
    gizmos.linestrip_2d(outline.into_iter().chain(outline.first().copied()), colour);
    for p in outline {
        gizmos.circle_2d(p, 4.0, colour);
    }
}
