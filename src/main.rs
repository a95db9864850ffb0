use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use landscape::{
    asset::target_patches_from_alpha,
    generation::NoiseSettings,
    read_landscape, write_landscape, Frustum, LandscapeBuilder, Layer, LayerDesc, MeshUpdate,
    Terrain, TerrainBuffers, TerrainRenderer, TerrainSettings,
};

use bevy::{
    math::Ray,
    pbr::wireframe::WireframePlugin,
    prelude::*,
    render::{
        settings::{WgpuFeatures, WgpuSettings},
        RenderPlugin,
    },
    window::PrimaryWindow,
};
use bevy_fly_camera::{FlyCamera, FlyCameraPlugin};
use ndarray::Array2;

const SETTINGS_PATH: &str = "landscape.toml";
const REVEAL_RADIUS: f32 = 48.0;

/// Marks the entity carrying the terrain mesh.
#[derive(Component)]
struct TerrainMesh;

#[derive(Resource)]
struct FogTexture(Handle<Image>);

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(RenderPlugin {
            wgpu_settings: WgpuSettings {
                features: WgpuFeatures::POLYGON_MODE_LINE,
                ..default()
            },
        }))
        .add_plugin(WireframePlugin)
        .add_plugin(FlyCameraPlugin)
        .add_startup_system(setup_terrain)
        .add_system(update_terrain)
        .add_system(pick_terrain)
        .run();
}

fn load_settings() -> TerrainSettings {
    if !Path::new(SETTINGS_PATH).exists() {
        return TerrainSettings::default();
    }

    TerrainSettings::load(SETTINGS_PATH).unwrap_or_else(|err| {
        warn!("ignoring {}: {}", SETTINGS_PATH, err);
        TerrainSettings::default()
    })
}

fn generate_terrain(settings: &TerrainSettings) -> landscape::Result<Terrain> {
    let (width, height) = (257, 257);
    let world_size = Vec2::splat(1024.);
    let height_multiplier = world_size.x * 0.25;

    let noise = NoiseSettings {
        floor: 0.4,
        ..Default::default()
    };

    let builder =
        LandscapeBuilder::from_noise(world_size, 0., height_multiplier, (width, height), 2, noise)?;
    let patch_count = builder.patch_count();

    // Rock only where the terrain rises above its lowlands
    let rock_line = 0.6 * height_multiplier;
    let rock_alpha: Array2<u8> = builder
        .heightmap()
        .heights()
        .mapv(|h| if h > rock_line { 255 } else { 0 });

    let asset = builder
        .with_layer(LayerDesc {
            technique: "Base".into(),
            color_texture: "grass.png".into(),
            alpha_texture: "grass_alpha.png".into(),
            normal_texture: None,
            target_patches: vec![true; patch_count.0 * patch_count.1],
        })
        .with_layer(LayerDesc {
            technique: "Layer".into(),
            color_texture: "rock.png".into(),
            alpha_texture: "rock_alpha.png".into(),
            normal_texture: Some("rock_normal.png".into()),
            target_patches: target_patches_from_alpha(&rock_alpha, patch_count),
        })
        .build()?;

    // Go through the serialized form the game would ship with
    let bytes = write_landscape(&asset);
    info!("landscape asset is {} bytes", bytes.len());

    Terrain::from_asset(read_landscape(&bytes)?, settings)
}

fn setup_terrain(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut images: ResMut<Assets<Image>>,
) {
    let settings = load_settings();
    let terrain = match generate_terrain(&settings) {
        Ok(terrain) => terrain,
        Err(err) => {
            error!("failed to build terrain: {}", err);
            return;
        }
    };

    let start_height = terrain.landscape().heightmap().size().z;

    commands
        .spawn(PbrBundle {
            mesh: meshes.add(Mesh::from(shape::Plane::default())),
            material: materials.add(StandardMaterial {
                base_color: Color::hex("ffd891").unwrap_or(Color::BEIGE),
                perceptual_roughness: 0.5,
                unlit: false,
                ..default()
            }),
            // Terrain space is Z up
            transform: Transform::from_rotation(Quat::from_rotation_x(-FRAC_PI_2)),
            ..default()
        })
        .insert(TerrainMesh)
        .insert(bevy::pbr::wireframe::Wireframe);

    let fog = images.add(terrain.fog().to_image());
    commands.spawn(ImageBundle {
        style: Style {
            size: Size::new(Val::Px(128.), Val::Px(128.)),
            position_type: PositionType::Absolute,
            ..default()
        },
        image: UiImage::new(fog.clone()),
        ..default()
    });
    commands.insert_resource(FogTexture(fog));
    commands.insert_resource(terrain);

    add_camera(&mut commands, start_height);
    add_lights(&mut commands);
}

/// Hands the terrain streams to the Bevy mesh asset.
struct BevyMeshRenderer<'a> {
    meshes: &'a mut Assets<Mesh>,
    handle: &'a Handle<Mesh>,
}

impl TerrainRenderer for BevyMeshRenderer<'_> {
    fn upload(&mut self, buffers: &TerrainBuffers, update: MeshUpdate) {
        if let Some(mesh) = self.meshes.get_mut(self.handle) {
            *mesh = buffers.to_render_mesh(None);
        }
        debug!(
            "uploaded terrain mesh (vertices: {}, indices: {})",
            update.vertices, update.indices
        );
    }

    // The mesh entity is drawn by Bevy's own pipeline
    fn draw(&mut self, _buffers: &TerrainBuffers, _layers: &[Layer]) {}
}

fn update_terrain(
    terrain: Option<ResMut<Terrain>>,
    mut meshes: ResMut<Assets<Mesh>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    terrain_meshes: Query<(&GlobalTransform, &Handle<Mesh>), With<TerrainMesh>>,
) {
    let Some(mut terrain) = terrain else { return };
    let Ok((camera, camera_transform)) = cameras.get_single() else { return };
    let Ok((terrain_transform, handle)) = terrain_meshes.get_single() else { return };

    let model = terrain_transform.compute_matrix();
    let view = camera_transform.compute_matrix().inverse();
    let frustum = Frustum::from_view_projection(camera.projection_matrix() * view * model);
    let eye = model.inverse().transform_point3(camera_transform.translation());

    let update = terrain.update(eye, &frustum);
    terrain.present(
        &mut BevyMeshRenderer {
            meshes: &mut meshes,
            handle,
        },
        update,
    );
}

fn pick_terrain(
    terrain: Option<ResMut<Terrain>>,
    fog: Option<Res<FogTexture>>,
    mut images: ResMut<Assets<Image>>,
    buttons: Res<Input<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform)>,
    terrain_meshes: Query<&GlobalTransform, With<TerrainMesh>>,
) {
    if !buttons.just_pressed(MouseButton::Right) {
        return;
    }

    let (Some(mut terrain), Some(fog)) = (terrain, fog) else { return };
    let Ok(window) = windows.get_single() else { return };
    let Some(cursor) = window.cursor_position() else { return };
    let Ok((camera, camera_transform)) = cameras.get_single() else { return };
    let Ok(terrain_transform) = terrain_meshes.get_single() else { return };

    let Some(ray) = camera.viewport_to_world(camera_transform, cursor) else { return };

    let to_terrain = terrain_transform.compute_matrix().inverse();
    let ray = Ray {
        origin: to_terrain.transform_point3(ray.origin),
        direction: to_terrain.transform_vector3(ray.direction),
    };

    let Some(hit) = terrain.intersect(ray) else {
        info!("no terrain under the cursor");
        return;
    };

    info!(
        "picked terrain at ({:.1}, {:.1}, {:.1}), normal {:?}",
        hit.x,
        hit.y,
        hit.z,
        terrain.normal(hit.x, hit.y)
    );

    let fog_mask = terrain.fog_mut();
    fog_mask.draw_visible_area(REVEAL_RADIUS, hit.x, hit.y);
    fog_mask.refresh();

    if let Some(image) = images.get_mut(&fog.0) {
        *image = fog_mask.to_image();
    }
}

fn add_camera(commands: &mut Commands, start_height: f32) {
    commands
        .spawn(Camera3dBundle {
            transform: Transform::from_translation(Vec3 {
                x: 0.0,
                y: start_height,
                z: 0.0,
            }),
            ..default()
        })
        .insert(FlyCamera::default());
}

fn add_lights(commands: &mut Commands) {
    commands.insert_resource(AmbientLight {
        color: Color::ORANGE_RED,
        brightness: 0.02,
    });

    commands.spawn(DirectionalLightBundle {
        directional_light: DirectionalLight {
            illuminance: 1000.,
            shadows_enabled: false,
            ..default()
        },
        transform: Transform::from_rotation(Quat::from_rotation_x(-0.25 * std::f32::consts::PI)),
        ..default()
    });
}
