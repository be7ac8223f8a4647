use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use plotgen_blocks::{Block, BlockRegistry, VoxelState};
use plotgen_schem::{Clipboard, FragmentSource, SchematicError};
use plotgen_world::{HostWorld, PlotArea, PlotWorldsFile};

struct World;

impl HostWorld for World {
    fn name(&self) -> &str {
        "plots"
    }
    fn min_height(&self) -> i32 {
        -64
    }
    fn max_height(&self) -> i32 {
        319
    }
}

enum Entry {
    Clip(Clipboard),
    Garbage,
}

/// Fragments keyed by file stem (`plot`, `sideroad`, `intersection`).
#[derive(Default)]
struct MemorySource {
    entries: HashMap<&'static str, Entry>,
}

impl MemorySource {
    fn with(mut self, stem: &'static str, clip: Clipboard) -> Self {
        self.entries.insert(stem, Entry::Clip(clip));
        self
    }

    fn garbage(mut self, stem: &'static str) -> Self {
        self.entries.insert(stem, Entry::Garbage);
        self
    }
}

impl FragmentSource for MemorySource {
    fn load(&self, path: &Path) -> Result<Option<Clipboard>, SchematicError> {
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        match self.entries.get(stem) {
            None => Ok(None),
            Some(Entry::Clip(c)) => Ok(Some(c.clone())),
            Some(Entry::Garbage) => Err(SchematicError::unsupported(path, "bad magic")),
        }
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
            name = "bedrock"
            [[blocks]]
            name = "oak_stairs"
            state_schema = { facing = ["north", "east", "south", "west"], half = ["bottom", "top"] }
        "#,
        )
        .unwrap(),
    )
}

fn area(plot_width: i32, road_width: i32, extra: &str) -> PlotArea {
    let file = PlotWorldsFile::from_toml_str(&format!(
        r#"
        [settings.schematics]
        root = "no-such-fragment-root"
        {extra}
        [[area]]
        world = "plots"
        plot_width = {plot_width}
        road_width = {road_width}
        main_block = "stone"
        top_block = "stone"
        wall_block = "stone"
        wall_filling = "stone"
        road_block = "stone"
        "#
    ))
    .unwrap();
    PlotArea::new(&file.areas[0], &file.settings, registry(), &World).unwrap()
}

fn stone() -> VoxelState {
    VoxelState::new(Block::new(1, 0))
}

fn single(voxel: VoxelState) -> Clipboard {
    let mut c = Clipboard::new(1, 1, 1);
    c.set(0, 0, 0, voxel);
    c
}

#[test]
fn no_fragments_leave_overlay_empty() {
    let area = area(32, 7, "");
    let summary = area.setup_overlay(&MemorySource::default()).unwrap();
    let overlay = area.overlay();
    assert!(overlay.is_empty());
    assert!(!overlay.road_schematic_enabled());
    assert!(!overlay.plot_schematic_enabled());
    assert_eq!(summary.columns, 0);
}

#[test]
fn small_plot_template_is_centered() {
    let area = area(32, 7, "");
    let mut plot = Clipboard::new(10, 5, 10);
    let mut expected = Vec::new();
    for x in 0..10 {
        for y in 0..5 {
            for z in 0..10 {
                if (x + y + z) % 3 == 0 {
                    plot.set(x, y, z, stone());
                    expected.push((x as i32, y, z as i32));
                }
            }
        }
    }
    area.setup_overlay(&MemorySource::default().with("plot", plot)).unwrap();
    let overlay = area.overlay();
    assert!(overlay.plot_schematic_enabled());
    assert!(!overlay.road_schematic_enabled());
    // shift 3 + oddshift 1 + center (32 - 10) / 2
    let base = 3 + 1 + 11;
    let plot_y = overlay.anchors().plot_y as usize;
    for (x, y, z) in &expected {
        let column = overlay.column(x + base, z + base).unwrap();
        assert_eq!(column.len(), 5);
        assert_eq!(column[y + plot_y], Some(stone()), "({x},{y},{z})");
    }
    assert_eq!(overlay.summary().voxels, expected.len());
}

#[test]
fn wide_plot_template_requires_road_overlay() {
    let area = area(8, 4, "");
    let mut plot = Clipboard::new(10, 2, 4);
    plot.set(0, 0, 0, stone());
    area.setup_overlay(&MemorySource::default().with("plot", plot)).unwrap();
    let overlay = area.overlay();
    assert!(overlay.road_schematic_enabled());
    // center_x = (8 - 10) / 2 = -1, kept negative
    assert!(overlay.column(2 + 0 - 1, 2 + 2).is_some());
}

#[test]
fn road_segment_writes_both_arms() {
    let area = area(32, 6, "");
    area.setup_overlay(&MemorySource::default().with("sideroad", single(stone())))
        .unwrap();
    let overlay = area.overlay();
    assert!(overlay.road_schematic_enabled());
    assert!(!overlay.plot_schematic_enabled());
    assert_eq!(overlay.size(), 38);
    let road_y = overlay.anchors().road_y as usize;
    // (-3, 3) wraps to (35, 3); rotated arm lands on (3, 2)
    assert_eq!(overlay.column(35, 3).unwrap()[road_y], Some(stone()));
    assert_eq!(overlay.column(3, 2).unwrap()[road_y], Some(stone()));
    assert_eq!(overlay.column_count(), 2);
}

#[test]
fn mirrored_arm_is_rotated() {
    let reg = registry();
    let stairs = reg.block_from_key("oak_stairs[facing=north,half=top]").unwrap();
    let area = area(32, 6, "");
    area.setup_overlay(&MemorySource::default().with("sideroad", single(VoxelState::new(stairs))))
        .unwrap();
    let overlay = area.overlay();
    let ty = reg.get(stairs.id).unwrap();
    let straight = overlay.column(35, 3).unwrap()[0].unwrap();
    let turned = overlay.column(3, 2).unwrap()[0].unwrap();
    assert_eq!(ty.state_prop_value(straight.block.state, "facing"), Some("north"));
    assert_eq!(ty.state_prop_value(turned.block.state, "facing"), Some("west"));
    assert_eq!(ty.state_prop_value(turned.block.state, "half"), Some("top"));
}

#[test]
fn entity_rotation_tag_turns_on_mirrored_arm() {
    let area = area(32, 6, "");
    let sign = VoxelState::with_rot(Block::new(1, 0), 8);
    area.setup_overlay(&MemorySource::default().with("sideroad", single(sign)))
        .unwrap();
    let overlay = area.overlay();
    assert_eq!(overlay.column(35, 3).unwrap()[0].unwrap().rot, Some(8));
    assert_eq!(overlay.column(3, 2).unwrap()[0].unwrap().rot, Some(4));
    assert!(overlay.has_entity_data(3, 2));
    assert_eq!(overlay.summary().entity_voxels, 2);
}

#[test]
fn intersection_alone_is_placed() {
    let area = area(32, 6, "");
    area.setup_overlay(&MemorySource::default().with("intersection", single(stone())))
        .unwrap();
    let overlay = area.overlay();
    assert!(overlay.road_schematic_enabled());
    assert_eq!(overlay.column(35, 35).unwrap()[0], Some(stone()));
    assert_eq!(overlay.column_count(), 1);
}

#[test]
fn zero_road_width_skips_road_fragments() {
    let area = area(32, 0, "");
    area.setup_overlay(&MemorySource::default().with("sideroad", single(stone())))
        .unwrap();
    let overlay = area.overlay();
    assert!(!overlay.road_schematic_enabled());
    assert!(overlay.is_empty());
}

#[test]
fn road_columns_grow_when_wall_height_ignored() {
    // road 62 == wall 62: nothing to add
    let area = area(32, 6, "use_wall_in_road_schem_height = false");
    let file = PlotWorldsFile::from_toml_str(
        r#"
        [settings.schematics]
        root = "no-such-fragment-root"
        use_wall_in_road_schem_height = false
        [[area]]
        world = "plots"
        plot_width = 32
        road_width = 6
        road_height = 65
        main_block = "stone"
        top_block = "stone"
        wall_block = "stone"
        wall_filling = "stone"
        road_block = "stone"
        "#,
    )
    .unwrap();
    let raised = PlotArea::new(&file.areas[0], &file.settings, registry(), &World).unwrap();
    let road = {
        let mut c = Clipboard::new(1, 2, 1);
        c.set(0, 0, 0, stone());
        c
    };
    area.setup_overlay(&MemorySource::default().with("sideroad", road.clone()))
        .unwrap();
    raised
        .setup_overlay(&MemorySource::default().with("sideroad", road))
        .unwrap();
    assert_eq!(area.overlay().column(35, 3).unwrap().len(), 2);
    assert_eq!(raised.overlay().column(35, 3).unwrap().len(), 5);
}

#[test]
fn setup_is_idempotent() {
    let area = area(32, 7, "");
    let mut plot = Clipboard::new(3, 2, 3);
    plot.set(1, 1, 1, stone());
    let source = MemorySource::default()
        .with("plot", plot)
        .with("sideroad", single(stone()))
        .with("intersection", single(stone()));
    area.setup_overlay(&source).unwrap();
    let first = area.overlay();
    area.setup_overlay(&source).unwrap();
    let second = area.overlay();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn undecodable_fragment_leaves_empty_overlay() {
    let area = area(32, 7, "");
    area.setup_overlay(&MemorySource::default().with("sideroad", single(stone())))
        .unwrap();
    assert!(!area.overlay().is_empty());

    let source = MemorySource::default()
        .with("plot", single(stone()))
        .garbage("intersection");
    let err = area.setup_overlay(&source).unwrap_err();
    assert!(err.is_unsupported_format());
    assert_eq!(err.kind(), plotgen_schem::FragmentKind::Intersection);
    let overlay = area.overlay();
    assert!(overlay.is_empty());
    assert!(!overlay.road_schematic_enabled());
    assert!(!overlay.plot_schematic_enabled());
}

fn solid(w: usize, h: usize, l: usize) -> Clipboard {
    let mut c = Clipboard::new(w, h, l);
    for x in 0..w {
        for y in 0..h {
            for z in 0..l {
                c.set(x, y, z, stone());
            }
        }
    }
    c
}

#[test]
fn every_paste_toggle_keeps_all_fragment_voxels() {
    for (on_top, road_on_top) in [(true, true), (true, false), (false, true), (false, false)] {
        let area = area(
            32,
            6,
            &format!("paste_on_top = {on_top}\npaste_road_on_top = {road_on_top}"),
        );
        let source = MemorySource::default()
            .with("plot", solid(2, 5, 2))
            .with("sideroad", solid(1, 5, 1));
        area.setup_overlay(&source).unwrap();
        let overlay = area.overlay();
        let a = overlay.anchors();
        let label = format!("on_top={on_top} road_on_top={road_on_top} {a:?}");

        // 20 plot voxels, 5 on each road arm
        assert_eq!(overlay.summary().voxels, 30, "{label}");
        // shift 3 + center (32 - 2) / 2
        let base = 3 + 15;
        for x in 0..2 {
            for z in 0..2 {
                let column = overlay.column(base + x, base + z).unwrap();
                for y in 0..5 {
                    assert_eq!(column[(a.plot_y + y) as usize], Some(stone()), "{label}");
                }
            }
        }
        for (x, z) in [(35, 3), (3, 2)] {
            let column = overlay.column(x, z).unwrap();
            for y in 0..5 {
                assert_eq!(column[(a.road_y + y) as usize], Some(stone()), "{label}");
            }
        }
    }
}

#[test]
fn floor_pinned_road_lifts_plot_template() {
    let area = area(32, 6, "paste_on_top = false\npaste_road_on_top = false");
    let source = MemorySource::default()
        .with("plot", solid(2, 5, 2))
        .with("sideroad", solid(1, 5, 1));
    area.setup_overlay(&source).unwrap();
    let overlay = area.overlay();
    let a = overlay.anchors();
    assert_eq!((a.schem_y, a.road_y), (-63, 0));
    // the template sits on the plot surface, above the road layer
    assert_eq!(a.schem_y + a.plot_y, 62);
    let column = overlay.column(18, 18).unwrap();
    assert_eq!(column.len(), (a.plot_y + 5) as usize);
    assert!(column[..a.plot_y as usize].iter().all(Option::is_none));
}
