//! A single grid map: its geometry, portals, obstacles, and the players
//! currently standing on it.
//!
//! [`Map::generate_random_obstacles`] is the procedural maze carver: it
//! randomized-DFS-carves a connected path from `start_point` to one or more
//! targets, then verifies the result by BFS before accepting it.

use std::collections::{HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MapGenError;
use crate::player::PlayerId;
use crate::point::Point;

/// Attempts allowed before [`Map::generate_random_portal`] gives up.
const PORTAL_ATTEMPTS: u32 = 100;
/// Attempts allowed to seed dummy carving targets before retrying the whole
/// generation.
const DUMMY_SEED_ATTEMPTS: u32 = 100;
/// Outer retries for the whole obstacle-carving attempt before giving up.
const OBSTACLE_OUTER_ATTEMPTS: u32 = 10;

const NEIGHBOR_DIRECTIONS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// A cell that teleports a player onto another map's `start_point`.
#[derive(Debug, Clone, Serialize)]
pub struct Portal {
    pub position: Point,
    pub name: String,
    pub linked_map_name: String,
}

/// A grid with start/end points, portals, obstacles, and in-map players.
#[derive(Debug, Clone)]
pub struct Map {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub start_point: Point,
    pub end_point: Option<Point>,
    pub portals: Vec<Portal>,
    obstacles: HashSet<Point>,
    players: Vec<PlayerId>,
}

impl Map {
    pub fn new(name: impl Into<String>, width: i32, height: i32, start_point: Point) -> Self {
        Map {
            name: name.into(),
            width,
            height,
            start_point,
            end_point: None,
            portals: Vec::new(),
            obstacles: HashSet::new(),
            players: Vec::new(),
        }
    }

    pub fn with_end_point(mut self, end_point: Point) -> Self {
        self.end_point = Some(end_point);
        self
    }

    /// Minimum Manhattan distance a portal (or the maze's required dummy
    /// target) must keep from `start_point`.
    fn min_portal_distance(&self) -> i32 {
        (self.width + self.height) / 2
    }

    /// The interior, half-open on each side: `(1..width-1, 1..height-1)`.
    fn interior_contains(&self, p: Point) -> bool {
        p.x > 0 && p.y > 0 && p.x < self.width - 1 && p.y < self.height - 1
    }

    pub fn add_player(&mut self, player_id: PlayerId) -> bool {
        if self.players.contains(&player_id) {
            return false;
        }
        self.players.push(player_id.clone());
        debug!(map = %self.name, player = %player_id, total = self.players.len(), "player entered map");
        true
    }

    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p != player_id);
        let removed = self.players.len() != before;
        if removed {
            debug!(map = %self.name, player = %player_id, total = self.players.len(), "player left map");
        }
        removed
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn is_portal(&self, pos: Point) -> bool {
        self.portals.iter().any(|p| p.position == pos)
    }

    pub fn portal_at(&self, pos: Point) -> Option<&Portal> {
        self.portals.iter().find(|p| p.position == pos)
    }

    pub fn is_obstacle(&self, pos: Point) -> bool {
        self.obstacles.contains(&pos)
    }

    pub fn is_valid_position(&self, pos: Point) -> bool {
        self.interior_contains(pos) && !self.is_obstacle(pos)
    }

    /// The maze's carving target for this map: `end_point` on a terminal
    /// map, else the first portal's position.
    pub fn main_target(&self) -> Option<Point> {
        self.end_point
            .or_else(|| self.portals.first().map(|p| p.position))
    }

    /// Sample a point in the interior, away from `start_point`/`end_point`/
    /// existing portals and at least `min_portal_distance` from
    /// `start_point`. Gives up after [`PORTAL_ATTEMPTS`].
    pub fn generate_random_portal(
        &mut self,
        linked_map_name: impl Into<String>,
    ) -> Result<String, MapGenError> {
        let linked_map_name = linked_map_name.into();
        let min_distance = self.min_portal_distance();
        let mut rng = rand::thread_rng();

        for _ in 0..PORTAL_ATTEMPTS {
            let candidate = Point::new(
                rng.gen_range(1..self.width - 1),
                rng.gen_range(1..self.height - 1),
            );

            if Some(candidate) == Some(self.start_point)
                || Some(candidate) == self.end_point
                || candidate.manhattan_distance(self.start_point) < min_distance
                || self.portals.iter().any(|p| p.position == candidate)
            {
                continue;
            }

            let name = format!("{}-{}", self.name, self.portals.len() + 1);
            self.portals.push(Portal {
                position: candidate,
                name: name.clone(),
                linked_map_name,
            });
            return Ok(name);
        }

        Err(MapGenError::PortalExhausted {
            min_distance,
            attempts: PORTAL_ATTEMPTS,
        })
    }

    /// Randomized-DFS-carve a connected maze through the interior.
    ///
    /// See the module doc for the algorithm summary; this mirrors the
    /// source's `generate_random_obstacles`: initialize the interior as
    /// fully obstacled, carve a randomized path from `start_point` to the
    /// main target and several dummy targets, then verify BFS connectivity
    /// and a minimum remaining-obstacle floor before accepting the result.
    pub fn generate_random_obstacles(&mut self, is_terminal: bool) -> Result<(), MapGenError> {
        let main_target = if is_terminal {
            self.end_point.expect("terminal map must have an end_point")
        } else {
            self.portals
                .first()
                .expect("non-terminal map must have at least one portal before carving")
                .position
        };

        let min_distance = self.min_portal_distance();
        let dummy_count = ((self.width * self.height) / 70).max(1) as usize;
        let floor = 2 * ((self.width - 2) + (self.height - 2));

        let mut rng = rand::thread_rng();

        for attempt in 1..=OBSTACLE_OUTER_ATTEMPTS {
            let mut obstacles: HashSet<Point> = HashSet::new();
            for x in 1..self.width - 1 {
                for y in 1..self.height - 1 {
                    obstacles.insert(Point::new(x, y));
                }
            }

            let mut targets = vec![main_target];
            let mut saw_far_dummy = false;

            for _ in 0..DUMMY_SEED_ATTEMPTS {
                if targets.len() >= dummy_count + 1 {
                    break;
                }
                let candidate = Point::new(
                    rng.gen_range(1..self.width - 1),
                    rng.gen_range(1..self.height - 1),
                );
                if Some(candidate) == Some(self.start_point)
                    || Some(candidate) == self.end_point
                    || self.is_portal(candidate)
                    || targets.contains(&candidate)
                {
                    continue;
                }
                if candidate.manhattan_distance(self.start_point) >= min_distance {
                    saw_far_dummy = true;
                }
                targets.push(candidate);
            }

            let seeded = targets.len() >= dummy_count + 1;
            if !seeded || !saw_far_dummy {
                debug!(map = %self.name, attempt, "dummy target seeding incomplete, retrying generation");
                continue;
            }

            for &target in &targets {
                carve_path_to(self.start_point, target, self.width, self.height, &mut obstacles, &mut rng);
            }

            let connected = is_connected(self.start_point, main_target, self.width, self.height, &obstacles);
            let remaining = obstacles.len() as i32;

            if connected && remaining >= floor {
                self.obstacles = obstacles;
                debug!(map = %self.name, attempt, remaining, "maze generation succeeded");
                return Ok(());
            }

            warn!(map = %self.name, attempt, connected, remaining, floor, "maze generation attempt rejected, retrying");
        }

        Err(MapGenError::ObstacleExhausted {
            attempts: OBSTACLE_OUTER_ATTEMPTS,
        })
    }

    pub fn extract_map_info(&self) -> MapInfo {
        MapInfo {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            start: self.start_point,
            end: self.end_point,
            portals: self
                .portals
                .iter()
                .map(|p| PortalInfo {
                    x: p.position.x,
                    y: p.position.y,
                    name: p.name.clone(),
                    linked_map: p.linked_map_name.clone(),
                })
                .collect(),
            obstacles: self.obstacles.iter().map(|&p| ObstacleInfo { x: p.x, y: p.y }).collect(),
        }
    }
}

/// Carve a randomized-DFS path from `start` to `target`, removing cells from
/// `obstacles` as it goes. Stops carving as soon as `target` is reached;
/// backtracks when a branch runs out of unobstructed neighbors.
fn carve_path_to(
    start: Point,
    target: Point,
    width: i32,
    height: i32,
    obstacles: &mut HashSet<Point>,
    rng: &mut impl Rng,
) {
    let mut stack = vec![start];
    obstacles.remove(&start);

    while let Some(&current) = stack.last() {
        if current == target {
            return;
        }

        let mut neighbors: Vec<Point> = NEIGHBOR_DIRECTIONS
            .iter()
            .map(|&(dx, dy)| Point::new(current.x + dx, current.y + dy))
            .filter(|p| p.x > 0 && p.y > 0 && p.x < width - 1 && p.y < height - 1)
            .filter(|p| obstacles.contains(p))
            .collect();

        if neighbors.is_empty() {
            stack.pop();
            continue;
        }

        neighbors.shuffle(rng);
        let next = neighbors[0];
        obstacles.remove(&next);
        stack.push(next);
    }
}

/// BFS from `start` to `target` over non-obstacle interior cells.
fn is_connected(
    start: Point,
    target: Point,
    width: i32,
    height: i32,
    obstacles: &HashSet<Point>,
) -> bool {
    let is_valid = |p: Point| p.x > 0 && p.y > 0 && p.x < width - 1 && p.y < height - 1 && !obstacles.contains(&p);

    if start == target {
        return true;
    }

    let mut queue = VecDeque::new();
    let mut visited = HashSet::new();
    queue.push_back(start);
    visited.insert(start);

    while let Some(current) = queue.pop_front() {
        for &(dx, dy) in &NEIGHBOR_DIRECTIONS {
            let next = Point::new(current.x + dx, current.y + dy);
            if next == target {
                return true;
            }
            if is_valid(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    false
}

/// JSON shape for [`Map::extract_map_info`].
#[derive(Debug, Clone, Serialize)]
pub struct MapInfo {
    pub name: String,
    pub width: i32,
    pub height: i32,
    pub start: Point,
    pub end: Option<Point>,
    pub portals: Vec<PortalInfo>,
    pub obstacles: Vec<ObstacleInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortalInfo {
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub linked_map: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ObstacleInfo {
    pub x: i32,
    pub y: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal_map() -> Map {
        Map::new("C", 15, 15, Point::new(1, 1)).with_end_point(Point::new(14, 14))
    }

    fn non_terminal_map() -> Map {
        Map::new("A", 15, 15, Point::new(1, 1))
    }

    #[test]
    fn portal_is_interior_and_far_enough_from_start() {
        let mut map = non_terminal_map();
        let name = map.generate_random_portal("B").unwrap();
        let portal = map.portals.iter().find(|p| p.name == name).unwrap();

        assert!(map.interior_contains(portal.position));
        assert_ne!(portal.position, map.start_point);
        assert!(portal.position.manhattan_distance(map.start_point) >= map.min_portal_distance());
    }

    #[test]
    fn second_portal_is_interior_and_unique() {
        let mut map = non_terminal_map();
        let first = map.generate_random_portal("B").unwrap();
        let second = map.generate_random_portal("C").unwrap();
        assert_ne!(first, second);

        let positions: Vec<Point> = map.portals.iter().map(|p| p.position).collect();
        assert_eq!(positions.len(), 2);
        assert_ne!(positions[0], positions[1]);
        for pos in positions {
            assert!(map.interior_contains(pos));
        }
    }

    #[test]
    fn terminal_maze_connects_start_to_end() {
        let mut map = terminal_map();
        map.generate_random_obstacles(true).unwrap();

        assert!(is_connected(
            map.start_point,
            map.end_point.unwrap(),
            map.width,
            map.height,
            &map.obstacles
        ));

        let floor = 2 * ((map.width - 2) + (map.height - 2));
        assert!(map.obstacles.len() as i32 >= floor);
    }

    #[test]
    fn non_terminal_maze_connects_start_to_first_portal() {
        let mut map = non_terminal_map();
        map.generate_random_portal("B").unwrap();
        map.generate_random_obstacles(false).unwrap();

        let target = map.main_target().unwrap();
        assert!(is_connected(map.start_point, target, map.width, map.height, &map.obstacles));
    }

    #[test]
    fn add_and_remove_player_tracks_membership() {
        let mut map = non_terminal_map();
        assert!(map.add_player("p1".to_string()));
        assert!(!map.add_player("p1".to_string()));
        assert!(map.remove_player(&"p1".to_string()));
        assert!(!map.remove_player(&"p1".to_string()));
    }

    #[test]
    fn is_valid_position_rejects_boundary_and_obstacles() {
        let mut map = terminal_map();
        map.generate_random_obstacles(true).unwrap();

        assert!(!map.is_valid_position(Point::new(0, 5)));
        assert!(!map.is_valid_position(Point::new(map.width - 1, 5)));
        assert!(map.is_valid_position(map.start_point));
    }
}
