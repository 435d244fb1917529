//! Map graphs.
//!
//! Maps are built once from the player count and never change. Layouts for
//! 2, 3 and 5 players are hand-made; any other count gets a ring of
//! three-territory clusters. Every layout also fixes which territories each
//! player starts with. Edges are stored in both directions.

use std::collections::BTreeSet;

use thiserror::Error;

use super::territory::TerritoryId;

/// Errors raised while building a map.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("a map needs at least 2 players, got {0}")]
    TooFewPlayers(usize),
}

/// A static layout: territory names and sizes, undirected edges, and the
/// starting group for each player.
struct Layout {
    territories: &'static [(&'static str, u32)],
    edges: &'static [(usize, usize)],
    groups: &'static [&'static [usize]],
}

const DUEL: Layout = Layout {
    territories: &[
        ("Ashford", 2),
        ("Brackwater", 1),
        ("Coldharbour", 3),
        ("Dunmore", 2),
        ("Eastmarch", 3),
        ("Fellreach", 1),
    ],
    edges: &[(0, 1), (0, 2), (1, 2), (1, 3), (2, 4), (3, 4), (3, 5), (4, 5)],
    groups: &[&[0, 1, 2], &[3, 4, 5]],
};

const TRIAD: Layout = Layout {
    territories: &[
        ("Ashford", 2),
        ("Brackwater", 1),
        ("Coldharbour", 3),
        ("Dunmore", 2),
        ("Eastmarch", 3),
        ("Fellreach", 1),
        ("Greywater", 1),
        ("Highmoor", 2),
        ("Ironvale", 3),
    ],
    edges: &[
        (0, 1),
        (1, 2),
        (0, 2),
        (3, 4),
        (4, 5),
        (3, 5),
        (6, 7),
        (7, 8),
        (6, 8),
        (2, 3),
        (5, 6),
        (8, 0),
        (1, 4),
        (4, 7),
        (7, 1),
    ],
    groups: &[&[0, 1, 2], &[3, 4, 5], &[6, 7, 8]],
};

const PENTAD: Layout = Layout {
    territories: &[
        ("Ashford", 2),
        ("Brackwater", 1),
        ("Coldharbour", 3),
        ("Dunmore", 2),
        ("Eastmarch", 3),
        ("Fellreach", 1),
        ("Greywater", 1),
        ("Highmoor", 2),
        ("Ironvale", 3),
        ("Juniper", 3),
        ("Kestrel", 1),
        ("Lowmarsh", 2),
        ("Mistral", 2),
        ("Northwold", 3),
        ("Oakheart", 1),
    ],
    edges: &[
        (0, 1),
        (1, 2),
        (0, 2),
        (3, 4),
        (4, 5),
        (3, 5),
        (6, 7),
        (7, 8),
        (6, 8),
        (9, 10),
        (10, 11),
        (9, 11),
        (12, 13),
        (13, 14),
        (12, 14),
        (2, 3),
        (5, 6),
        (8, 9),
        (11, 12),
        (14, 0),
        (1, 7),
        (4, 10),
        (7, 13),
        (10, 1),
        (13, 4),
    ],
    groups: &[&[0, 1, 2], &[3, 4, 5], &[6, 7, 8], &[9, 10, 11], &[12, 13, 14]],
};

/// Cluster member names and sizes for generated ring maps.
const RING_MEMBERS: [(&str, u32); 3] = [("North", 2), ("Mid", 1), ("South", 3)];

/// An immutable territory graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    names: Vec<String>,
    sizes: Vec<u32>,
    adjacency: Vec<Vec<TerritoryId>>,
    groups: Vec<Vec<TerritoryId>>,
}

impl Map {
    /// Builds the map for a game with `player_count` players.
    pub fn for_players(player_count: usize) -> Result<Map, MapError> {
        match player_count {
            0 | 1 => Err(MapError::TooFewPlayers(player_count)),
            2 => Ok(Map::from_layout(&DUEL)),
            3 => Ok(Map::from_layout(&TRIAD)),
            5 => Ok(Map::from_layout(&PENTAD)),
            n => Ok(Map::ring(n)),
        }
    }

    fn from_layout(layout: &Layout) -> Map {
        let territories = layout
            .territories
            .iter()
            .map(|&(name, size)| (name.to_string(), size))
            .collect();
        let groups = layout
            .groups
            .iter()
            .map(|g| g.iter().map(|&i| TerritoryId(i)).collect())
            .collect();
        Map::build(territories, layout.edges, groups)
    }

    /// Ring of `n` clusters. Each cluster is a triangle; cluster `i` borders
    /// cluster `i + 1` through two edges.
    fn ring(n: usize) -> Map {
        let mut territories = Vec::with_capacity(n * RING_MEMBERS.len());
        let mut edges = Vec::new();
        let mut groups = Vec::with_capacity(n);

        for cluster in 0..n {
            let base = cluster * 3;
            for (name, size) in RING_MEMBERS {
                territories.push((format!("{}{}", name, cluster + 1), size));
            }
            edges.extend([(base, base + 1), (base + 1, base + 2), (base, base + 2)]);
            let next = ((cluster + 1) % n) * 3;
            edges.extend([(base + 2, next), (base + 1, next + 1)]);
            groups.push((base..base + 3).map(TerritoryId).collect());
        }

        Map::build(territories, &edges, groups)
    }

    fn build(
        territories: Vec<(String, u32)>,
        edges: &[(usize, usize)],
        groups: Vec<Vec<TerritoryId>>,
    ) -> Map {
        let mut sets = vec![BTreeSet::new(); territories.len()];
        for &(a, b) in edges {
            if a != b {
                sets[a].insert(TerritoryId(b));
                sets[b].insert(TerritoryId(a));
            }
        }
        let (names, sizes) = territories.into_iter().unzip();
        Map {
            names,
            sizes,
            adjacency: sets.into_iter().map(|s| s.into_iter().collect()).collect(),
            groups,
        }
    }

    /// Number of territories.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// All territory ids in index order.
    pub fn ids(&self) -> impl Iterator<Item = TerritoryId> {
        (0..self.names.len()).map(TerritoryId)
    }

    pub fn name(&self, id: TerritoryId) -> &str {
        &self.names[id.0]
    }

    pub fn size(&self, id: TerritoryId) -> u32 {
        self.sizes[id.0]
    }

    /// Neighbors of a territory, sorted by id.
    pub fn neighbors(&self, id: TerritoryId) -> &[TerritoryId] {
        &self.adjacency[id.0]
    }

    pub fn is_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.adjacency[a.0].binary_search(&b).is_ok()
    }

    /// Looks a territory up by exact name.
    pub fn find(&self, name: &str) -> Option<TerritoryId> {
        self.names.iter().position(|n| n == name).map(TerritoryId)
    }

    /// Starting territories, one group per player.
    pub fn starting_groups(&self) -> &[Vec<TerritoryId>] {
        &self.groups
    }
}
