//! Line color assignment
//!
//! Without clustering, groups take palette entries in the order they were
//! selected. With k > 0 every line is colored by its cluster label instead.

use std::collections::BTreeMap;

/// Fixed categorical palette (colorblind-safe entries first)
pub const PALETTE: [&str; 12] = [
    "#56b4e9", // sky blue
    "#d55e00", // vermillion
    "#cc79a7", // pink
    "#009e73", // green
    "#f0e442", // yellow
    "#e69f00", // orange
    "#0072b2", // blue
    "#000000",
    "#996636", // brown
    "#666666",
    "#808000", // olive
    "#cccccc",
];

/// Color of the n-th palette slot, wrapping around
pub fn palette_color(index: usize) -> &'static str {
    PALETTE[index % PALETTE.len()]
}

/// Group -> color, following selection order
pub fn group_colors(active_groups: &[String]) -> BTreeMap<String, &'static str> {
    active_groups
        .iter()
        .enumerate()
        .map(|(i, g)| (g.clone(), palette_color(i)))
        .collect()
}

/// Color of a cluster label
pub fn cluster_color(cluster: u32) -> &'static str {
    palette_color(cluster as usize)
}
