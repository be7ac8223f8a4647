use std::sync::Arc;

use plotgen_blocks::{BiomeTag, Block, BlockRegistry, VoxelState};
use plotgen_chunk::RegionWriteBuffer;
use plotgen_schem::Clipboard;
use plotgen_world::generator::surface_voxel;
use plotgen_world::{
    ColumnKind, Fragments, HostWorld, HybridGen, PlotArea, PlotGenerator, PlotWorldsFile,
};

struct World;

impl HostWorld for World {
    fn name(&self) -> &str {
        "plots"
    }
    fn min_height(&self) -> i32 {
        0
    }
    fn max_height(&self) -> i32 {
        127
    }
}

fn registry() -> Arc<BlockRegistry> {
    Arc::new(
        BlockRegistry::from_toml_str(
            r#"
            biomes = ["plains", "desert"]
            [[blocks]]
            name = "air"
            [[blocks]]
            name = "stone"
            [[blocks]]
            name = "grass_block"
            [[blocks]]
            name = "stone_slab"
            [[blocks]]
            name = "cobblestone"
            [[blocks]]
            name = "quartz_block"
            [[blocks]]
            name = "bedrock"
            [[blocks]]
            name = "oak_sign"
            state_schema = { rotation = ["0","1","2","3","4","5","6","7","8","9","10","11","12","13","14","15"] }
        "#,
        )
        .unwrap(),
    )
}

fn area() -> PlotArea {
    let file = PlotWorldsFile::from_toml_str(
        r#"
        [settings.schematics]
        root = "no-such-fragment-root"
        [[area]]
        world = "plots"
        plot_width = 32
        road_width = 6
        road_height = 10
        plot_height = 10
        wall_height = 10
        wall_filling = "cobblestone"
        biome = "plains"
        "#,
    )
    .unwrap();
    PlotArea::new(&file.areas[0], &file.settings, registry(), &World).unwrap()
}

fn id(reg: &BlockRegistry, name: &str) -> u16 {
    reg.id_by_name(name).unwrap()
}

fn chunk(area: &PlotArea, cx: i32, cz: i32) -> RegionWriteBuffer {
    let mut buf = RegionWriteBuffer::for_chunk(cx, cz, 0, 127, true);
    HybridGen.generate_chunk(area, &mut buf);
    buf
}

#[test]
fn plain_columns_follow_layout() {
    let area = area();
    let reg = area.registry();
    let buf = chunk(&area, 0, 0);
    let block_at = |x, y, z| buf.get_voxel(x, y, z).map(|v| v.block.id);

    // x = 0 is road (below path_width_lower = 2)
    assert_eq!(block_at(0, 0, 8), Some(id(reg, "bedrock")));
    assert_eq!(block_at(0, 10, 8), Some(id(reg, "quartz_block")));
    assert_eq!(block_at(0, 11, 8), None);

    // x = 2 is the wall line
    assert_eq!(block_at(2, 5, 8), Some(id(reg, "cobblestone")));
    assert_eq!(block_at(2, 11, 8), Some(id(reg, "stone_slab")));
    assert_eq!(block_at(2, 12, 8), None);

    // (8, 8) is inside the plot
    assert_eq!(block_at(8, 9, 8), Some(id(reg, "stone")));
    assert_eq!(block_at(8, 10, 8), Some(id(reg, "grass_block")));
    assert_eq!(block_at(8, 11, 8), None);

    assert_eq!(buf.get_biome(8, 40, 8), Some(BiomeTag(0)));
}

#[test]
fn road_offset_shifts_layout() {
    let file = PlotWorldsFile::from_toml_str(
        r#"
        [[area]]
        world = "plots"
        plot_width = 32
        road_width = 6
        road_height = 10
        plot_height = 10
        wall_height = 10
        road_offset_x = 8
        wall_filling = "cobblestone"
        "#,
    )
    .unwrap();
    let area = PlotArea::new(&file.areas[0], &file.settings, registry(), &World).unwrap();
    let buf = chunk(&area, 0, 0);
    let reg = area.registry();
    // x = 8 now sits at relative 0: road
    assert_eq!(buf.get_voxel(8, 10, 8).map(|v| v.block.id), Some(id(reg, "quartz_block")));
    let (y, v) = surface_voxel(&area, ColumnKind::Road, 8, 8);
    assert_eq!(y, 10);
    assert_eq!(buf.get_voxel(8, y, 8), Some(v));
}

#[test]
fn regeneration_is_deterministic() {
    let area = area();
    let a = chunk(&area, -3, 5);
    let b = chunk(&area, -3, 5);
    assert_eq!(a.iter_voxels().collect::<Vec<_>>(), b.iter_voxels().collect::<Vec<_>>());
}

#[test]
fn overlay_is_stamped_and_entities_deferred() {
    let area = area();
    let reg = area.registry();
    let sign_block = reg.block_from_key("oak_sign[rotation=4]").unwrap();
    let mut road = Clipboard::new(1, 3, 1);
    road.set(0, 0, 0, VoxelState::new(Block::new(id(reg, "stone"), 0)));
    road.set(0, 1, 0, VoxelState::with_rot(sign_block, 4));
    road.set_biome(0, 0, Some(BiomeTag(1)));
    area.install_fragments(&Fragments {
        sideroad: Some(road),
        ..Fragments::default()
    });
    let overlay = area.overlay();
    assert!(overlay.road_schematic_enabled());
    assert_eq!(overlay.schem_y(), 10);

    // unrotated arm: (-3, 3) -> (35, 3); chunk 2 covers x 32..47
    let buf = chunk(&area, 2, 0);
    assert_eq!(buf.get_voxel(3, 10, 3).map(|v| v.block.id), Some(id(reg, "stone")));
    assert_eq!(buf.get_voxel(3, 11, 3), None);
    assert_eq!(buf.get_biome(3, 0, 3), Some(BiomeTag(1)));
    // road overlay suppresses the wall cap
    assert_eq!(buf.get_voxel(2 + 38 - 32, 11, 8), None);

    let mut pop = RegionWriteBuffer::for_chunk(2, 0, 0, 127, false);
    assert!(HybridGen.populate_chunk(&area, &mut pop));
    assert_eq!(pop.get_voxel(3, 11, 3), Some(VoxelState::with_rot(sign_block, 4)));
    assert_eq!(pop.get_voxel(3, 10, 3), None);

    let mut elsewhere = RegionWriteBuffer::for_chunk(1, 1, 0, 127, false);
    assert!(!HybridGen.populate_chunk(&area, &mut elsewhere));
    assert!(elsewhere.is_empty());
}
