//! Grid layout of freshly normalized nodes.
//!
//! Placement proceeds in tiers: a node is placed once its mother has a
//! position, one horizontal gap to the right or left of it. For UTXO graphs
//! this yields source → transaction → address; account graphs have a single
//! tier. Nodes whose mother never resolves keep `position: None`.

use crate::graph::{Node, NodeId, Position};
use crate::occupancy::OccupancyGrid;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub horizontal_gap: i64,
    pub vertical_gap: i64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_gap: 200,
            vertical_gap: 100,
        }
    }
}

/// How siblings sharing a column are stacked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Fan out around the parent row: `0, +gap, -gap, ...`.
    #[default]
    Balanced,
    /// Walk downward from the parent row.
    Column,
}

pub struct LayoutEngine {
    config: LayoutConfig,
    placement: Placement,
    known: AHashMap<NodeId, Position>,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            placement: Placement::default(),
            known: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Positions of nodes outside the batch that may act as mothers.
    #[must_use]
    pub fn with_known_positions(
        mut self,
        positions: impl IntoIterator<Item = (NodeId, Position)>,
    ) -> Self {
        self.known.extend(positions);
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Fills in missing positions and reserves every newly assigned cell in `grid`.
    ///
    /// A node carrying the anchor's id takes the anchor position. Nodes that
    /// already have a position are kept as they are.
    pub fn layout(&self, mut nodes: Vec<Node>, anchor: &Node, grid: &mut OccupancyGrid) -> Vec<Node> {
        let Some(anchor_position) = anchor.position else {
            warn!("Layout anchor {} has no position; leaving batch unplaced", anchor.id);
            return nodes;
        };

        let mut resolved = self.known.clone();
        resolved.insert(anchor.id.clone(), anchor_position);

        let mut pending = Vec::new();
        for (index, node) in nodes.iter_mut().enumerate() {
            if let Some(position) = node.position {
                resolved.insert(node.id.clone(), position);
            } else if node.id == anchor.id {
                node.position = Some(anchor_position);
                if !grid.reserve(anchor_position) {
                    debug!("Anchor cell {} already claimed", anchor_position);
                }
            } else {
                pending.push(index);
            }
        }

        while !pending.is_empty() {
            let groups = Self::ready_groups(&nodes, &pending, &resolved);
            if groups.is_empty() {
                break;
            }

            let mut placed = Vec::new();
            for (mother, members) in groups {
                let Some(&origin) = resolved.get(&mother) else {
                    continue;
                };
                // Right side first so outgoing flow claims the parent row.
                for right in [true, false] {
                    let x = if right {
                        origin.x + self.config.horizontal_gap
                    } else {
                        origin.x - self.config.horizontal_gap
                    };
                    let side: Vec<usize> = members
                        .iter()
                        .copied()
                        .filter(|&i| nodes[i].is_right == right)
                        .collect();
                    for index in side {
                        let y = self.free_row(grid, x, origin.y);
                        let position = Position::new(x, y);
                        grid.reserve(position);
                        nodes[index].position = Some(position);
                        placed.push(index);
                    }
                }
            }

            for &index in &placed {
                if let Some(position) = nodes[index].position {
                    resolved.insert(nodes[index].id.clone(), position);
                }
            }
            pending.retain(|i| !placed.contains(i));
        }

        for &index in &pending {
            debug!("No placed mother for node {}; leaving it unpositioned", nodes[index].id);
        }
        nodes
    }

    /// Cell for a single node added next to `source`.
    pub fn place_next_to(&self, source: &Node, is_right: bool, grid: &mut OccupancyGrid) -> Option<Position> {
        let origin = source.position?;
        let x = if is_right {
            origin.x + self.config.horizontal_gap
        } else {
            origin.x - self.config.horizontal_gap
        };
        let y = grid.nearest_free_along_y(x, origin.y, self.config.vertical_gap);
        let position = Position::new(x, y);
        grid.reserve(position);
        Some(position)
    }

    fn free_row(&self, grid: &OccupancyGrid, x: i64, y_start: i64) -> i64 {
        match self.placement {
            Placement::Balanced => grid.nearest_free_balanced(x, y_start, self.config.vertical_gap),
            Placement::Column => grid.nearest_free_along_y(x, y_start, self.config.vertical_gap),
        }
    }

    /// Pending nodes whose mother is placed, grouped by mother in order of
    /// first appearance.
    fn ready_groups(
        nodes: &[Node],
        pending: &[usize],
        resolved: &AHashMap<NodeId, Position>,
    ) -> Vec<(NodeId, Vec<usize>)> {
        let mut groups: Vec<(NodeId, Vec<usize>)> = Vec::new();
        for &index in pending {
            let Some(mother) = nodes[index].mother_node.as_ref() else {
                continue;
            };
            if !resolved.contains_key(mother) {
                continue;
            }
            match groups.iter_mut().find(|(m, _)| m == mother) {
                Some((_, members)) => members.push(index),
                None => groups.push((mother.clone(), vec![index])),
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{make_address_node, make_main_node, make_transaction_node};
    use crate::graph::Amount;
    use crate::network::Network;
    use crate::records::AddressInfo;

    fn anchor() -> Node {
        make_main_node("main", Network::Eth, &AddressInfo::default()).with_position(Position::ORIGIN)
    }

    fn address(id: &str, is_right: bool, mother: &str) -> Node {
        make_address_node(id, is_right, Some(mother), Network::Eth, &AddressInfo::default())
    }

    #[test]
    fn test_balanced_siblings() {
        let engine = LayoutEngine::new(LayoutConfig {
            horizontal_gap: 200,
            vertical_gap: 80,
        });
        let mut grid = OccupancyGrid::new();
        let nodes = vec![
            address("a", true, "main"),
            address("b", true, "main"),
            address("c", true, "main"),
        ];
        let placed = engine.layout(nodes, &anchor(), &mut grid);
        let ys: Vec<i64> = placed.iter().map(|n| n.position.unwrap().y).collect();
        assert_eq!(ys, vec![0, 80, -80]);
        assert!(placed.iter().all(|n| n.position.unwrap().x == 200));
        assert_eq!(grid.len(), 3);
    }

    #[test]
    fn test_left_and_right_sides() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::from_positions([Position::ORIGIN]);
        let placed = engine.layout(
            vec![address("in", false, "main"), address("out", true, "main")],
            &anchor(),
            &mut grid,
        );
        assert_eq!(placed[0].position, Some(Position::new(-200, 0)));
        assert_eq!(placed[1].position, Some(Position::new(200, 0)));
    }

    #[test]
    fn test_two_level_placement() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::new();
        let tx = make_transaction_node("tx1", true, None, Amount::ZERO, None, vec![], Some("main"));
        let nodes = vec![address("a", true, "tx1"), tx, address("b", true, "tx1")];
        let placed = engine.layout(nodes, &anchor(), &mut grid);

        assert_eq!(placed[1].position, Some(Position::new(200, 0)));
        assert_eq!(placed[0].position, Some(Position::new(400, 0)));
        assert_eq!(placed[2].position, Some(Position::new(400, 100)));
    }

    #[test]
    fn test_unresolved_mother_stays_unplaced() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::new();
        let placed = engine.layout(vec![address("orphan", true, "ghost")], &anchor(), &mut grid);
        assert!(placed[0].position.is_none());
        assert!(grid.is_empty());
    }

    #[test]
    fn test_anchor_id_takes_anchor_position() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::new();
        let main = make_main_node("main", Network::Eth, &AddressInfo::default());
        let placed = engine.layout(vec![main, address("a", true, "main")], &anchor(), &mut grid);
        assert_eq!(placed[0].position, Some(Position::ORIGIN));
        assert_eq!(placed[1].position, Some(Position::new(200, 0)));
    }

    #[test]
    fn test_avoids_occupied_cells() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::from_positions([Position::new(200, 0), Position::new(200, 100)]);
        let placed = engine.layout(vec![address("a", true, "main")], &anchor(), &mut grid);
        assert_eq!(placed[0].position, Some(Position::new(200, -100)));
    }

    #[test]
    fn test_place_next_to_walks_down() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let mut grid = OccupancyGrid::from_positions([Position::new(-200, 0)]);
        let position = engine.place_next_to(&anchor(), false, &mut grid);
        assert_eq!(position, Some(Position::new(-200, 100)));
        assert!(grid.is_occupied(&Position::new(-200, 100)));
    }
}
