//! Authoritative world state: players, coins and the fixed-step simulation.

use crate::physics::{circles_overlap, intent_velocity, Bounds, Vector2};
use log::{debug, info};
use rand::Rng;
use shared::{
    CoinState, Intent, PlayerState, Snapshot, BOUNDARY_INSET, COIN_RADIUS, COIN_SPAWN_INTERVAL,
    COIN_SPAWN_MARGIN, PLAYER_RADIUS, PLAYER_SPAWN_MARGIN, PLAYER_SPEED, WORLD_HEIGHT,
    WORLD_WIDTH,
};
use std::collections::BTreeMap;
use std::net::SocketAddr;

/// Tunable world geometry and pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameRules {
    pub world_width: f32,
    pub world_height: f32,
    pub player_speed: f32,
    pub player_radius: f32,
    pub coin_radius: f32,
    pub boundary_inset: f32,
    pub coin_spawn_interval: f32,
    pub coin_spawn_margin: f32,
    pub player_spawn_margin: f32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            world_width: WORLD_WIDTH,
            world_height: WORLD_HEIGHT,
            player_speed: PLAYER_SPEED,
            player_radius: PLAYER_RADIUS,
            coin_radius: COIN_RADIUS,
            boundary_inset: BOUNDARY_INSET,
            coin_spawn_interval: COIN_SPAWN_INTERVAL,
            coin_spawn_margin: COIN_SPAWN_MARGIN,
            player_spawn_margin: PLAYER_SPAWN_MARGIN,
        }
    }
}

impl GameRules {
    /// Region a player's centre is confined to.
    pub fn player_bounds(&self) -> Bounds {
        Bounds::inset(
            self.world_width,
            self.world_height,
            self.player_radius - self.boundary_inset,
        )
    }

    fn inset_area(&self, margin: f32) -> Bounds {
        Bounds::inset(self.world_width, self.world_height, margin)
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: u32,
    pub position: Vector2,
    /// Last commanded velocity. Overwritten by each input, never accumulated.
    pub velocity: Vector2,
    pub score: u32,
    pub last_input_at: f64,
    /// Where snapshots go. Unknown until the first input arrives.
    pub addr: Option<SocketAddr>,
}

impl Player {
    pub fn new(id: u32, position: Vector2) -> Self {
        Self {
            id,
            position,
            velocity: Vector2::ZERO,
            score: 0,
            last_input_at: 0.0,
            addr: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub id: u32,
    pub position: Vector2,
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub tick: u64,
    /// Simulated seconds, the sum of every tick's dt.
    pub elapsed: f64,
    pub players: BTreeMap<u32, Player>,
    pub coins: Vec<Coin>,
    rules: GameRules,
    next_player_id: u32,
    next_coin_id: u32,
    coin_timer: f32,
    last_capture_time: f64,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(GameRules::default())
    }
}

impl GameState {
    pub fn new(rules: GameRules) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            players: BTreeMap::new(),
            coins: Vec::new(),
            rules,
            next_player_id: 1,
            next_coin_id: 1,
            coin_timer: 0.0,
            last_capture_time: f64::NEG_INFINITY,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Adds a player at a random position away from the walls.
    pub fn add_player<R: Rng + ?Sized>(&mut self, rng: &mut R) -> u32 {
        let area = self.rules.inset_area(self.rules.player_spawn_margin);
        let position = random_point(rng, &area);
        self.add_player_at(position)
    }

    pub fn add_player_at(&mut self, position: Vector2) -> u32 {
        let id = self.next_player_id;
        self.next_player_id += 1;

        let position = self.rules.player_bounds().clamp(position);
        info!("Added player {} at ({:.1}, {:.1})", id, position.x, position.y);
        self.players.insert(id, Player::new(id, position));
        id
    }

    pub fn remove_player(&mut self, player_id: u32) -> bool {
        if self.players.remove(&player_id).is_some() {
            info!("Removed player {}", player_id);
            true
        } else {
            false
        }
    }

    /// Applies one input command as the player's new velocity.
    ///
    /// Binds `from` as the player's address if none is known yet. Returns
    /// false when the player does not exist.
    pub fn apply_intent(&mut self, player_id: u32, intent: &Intent, from: SocketAddr, now: f64) -> bool {
        let speed = self.rules.player_speed;
        let Some(player) = self.players.get_mut(&player_id) else {
            return false;
        };

        if player.addr.is_none() {
            debug!("Player {} bound to {}", player_id, from);
            player.addr = Some(from);
        }
        player.velocity = intent_velocity(intent, speed);
        player.last_input_at = now;
        true
    }

    /// Advances the world by `dt` seconds.
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        self.integrate(dt);
        self.advance_coin_timer(dt, rng);
        self.resolve_coin_collisions();

        self.tick += 1;
        self.elapsed += dt as f64;
    }

    fn integrate(&mut self, dt: f32) {
        let bounds = self.rules.player_bounds();
        for player in self.players.values_mut() {
            let moved = player.position.add(&player.velocity.scale(dt));
            player.position = bounds.clamp(moved);
        }
    }

    fn advance_coin_timer<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        self.coin_timer += dt;
        if self.coin_timer >= self.rules.coin_spawn_interval {
            self.coin_timer = 0.0;
            let area = self.rules.inset_area(self.rules.coin_spawn_margin);
            let position = random_point(rng, &area);
            self.spawn_coin_at(position);
        }
    }

    pub fn spawn_coin_at(&mut self, position: Vector2) -> u32 {
        let id = self.next_coin_id;
        self.next_coin_id += 1;
        debug!("Spawned coin {} at ({:.1}, {:.1})", id, position.x, position.y);
        self.coins.push(Coin { id, position });
        id
    }

    /// Awards each touched coin to the first touching player in id order.
    ///
    /// Consumed coins are removed only after every coin has been checked.
    /// Returns the number of coins consumed.
    fn resolve_coin_collisions(&mut self) -> usize {
        let player_radius = self.rules.player_radius;
        let coin_radius = self.rules.coin_radius;
        let mut consumed = Vec::new();

        for coin in &self.coins {
            let winner = self.players.values_mut().find(|player| {
                circles_overlap(player.position, player_radius, coin.position, coin_radius)
            });
            if let Some(player) = winner {
                player.score += 1;
                consumed.push(coin.id);
                debug!("Player {} collected coin {} (score {})", player.id, coin.id, player.score);
            }
        }

        if !consumed.is_empty() {
            self.coins.retain(|coin| !consumed.contains(&coin.id));
        }
        consumed.len()
    }

    /// Captures the public state of the world.
    ///
    /// Capture times never go backwards, even if the wall clock does.
    pub fn capture_snapshot(&mut self, now: f64) -> Snapshot {
        let time = now.max(self.last_capture_time);
        self.last_capture_time = time;

        Snapshot {
            time,
            players: self
                .players
                .values()
                .map(|player| {
                    (
                        player.id,
                        PlayerState {
                            x: player.position.x,
                            y: player.position.y,
                            score: player.score,
                        },
                    )
                })
                .collect(),
            coins: self
                .coins
                .iter()
                .map(|coin| CoinState {
                    id: coin.id,
                    x: coin.position.x,
                    y: coin.position.y,
                })
                .collect(),
        }
    }

    /// Addresses of every player that has sent at least one input.
    pub fn known_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.players
            .values()
            .filter_map(|player| player.addr.map(|addr| (player.id, addr)))
            .collect()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

fn random_point<R: Rng + ?Sized>(rng: &mut R, area: &Bounds) -> Vector2 {
    Vector2 {
        x: rng.gen_range(area.min.x..=area.max.x),
        y: rng.gen_range(area.min.y..=area.max.y),
    }
}
