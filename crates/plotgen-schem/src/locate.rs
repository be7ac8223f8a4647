use std::fmt;
use std::path::{Path, PathBuf};

/// The three fragment files a plot world may carry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    Plot,
    SideRoad,
    Intersection,
}

impl FragmentKind {
    /// Load order: road fragments before the plot template, so a bad
    /// road file is the error reported when several are broken.
    pub const ALL: [FragmentKind; 3] = [
        FragmentKind::SideRoad,
        FragmentKind::Intersection,
        FragmentKind::Plot,
    ];

    pub fn file_stem(self) -> &'static str {
        match self {
            FragmentKind::Plot => "plot",
            FragmentKind::SideRoad => "sideroad",
            FragmentKind::Intersection => "intersection",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// `<root>/<world>/<id>` when that directory exists, else `<root>/<world>`.
pub fn fragment_root(root: &Path, world: &str, area_id: Option<&str>) -> PathBuf {
    let world_dir = root.join(world);
    if let Some(id) = area_id {
        let area_dir = world_dir.join(id);
        if area_dir.is_dir() {
            return area_dir;
        }
    }
    world_dir
}

/// Prefer `<stem>.schem`; otherwise the legacy `<stem>.schematic` path,
/// whether or not it exists.
pub fn fragment_path(dir: &Path, kind: FragmentKind) -> PathBuf {
    let stem = kind.file_stem();
    let modern = dir.join(format!("{stem}.schem"));
    if modern.is_file() {
        return modern;
    }
    dir.join(format!("{stem}.schematic"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("plotgen-locate-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_order_puts_roads_first() {
        let stems: Vec<_> = FragmentKind::ALL.iter().map(|k| k.file_stem()).collect();
        assert_eq!(stems, ["sideroad", "intersection", "plot"]);
    }

    #[test]
    fn area_dir_wins_only_when_present() {
        let root = scratch("root");
        fs::create_dir_all(root.join("plots").join("east")).unwrap();
        assert_eq!(fragment_root(&root, "plots", Some("east")), root.join("plots").join("east"));
        assert_eq!(fragment_root(&root, "plots", Some("west")), root.join("plots"));
        assert_eq!(fragment_root(&root, "plots", None), root.join("plots"));
        let _ = fs::remove_dir_all(&root);
    }

    #[test]
    fn schem_preferred_over_schematic() {
        let dir = scratch("ext");
        assert_eq!(fragment_path(&dir, FragmentKind::Plot), dir.join("plot.schematic"));
        fs::write(dir.join("plot.schem"), b"").unwrap();
        assert_eq!(fragment_path(&dir, FragmentKind::Plot), dir.join("plot.schem"));
        assert_eq!(
            fragment_path(&dir, FragmentKind::SideRoad),
            dir.join("sideroad.schematic")
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
