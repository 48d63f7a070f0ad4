use crate::interpolation::RenderState;
use macroquad::prelude::*;
use shared::{PlayerState, COIN_RADIUS, PLAYER_RADIUS};

const BACKGROUND: Color = Color::new(18.0 / 255.0, 18.0 / 255.0, 18.0 / 255.0, 1.0);
const OWN_PLAYER: Color = Color::new(0.0, 200.0 / 255.0, 1.0, 1.0);
const OTHER_PLAYER: Color = Color::new(200.0 / 255.0, 50.0 / 255.0, 50.0 / 255.0, 1.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Circle,
    Square,
    Triangle,
    Diamond,
}

/// Each player keeps one shape for the whole game, chosen from its id.
pub fn player_shape(player_id: u32) -> Shape {
    match player_id % 4 {
        0 => Shape::Circle,
        1 => Shape::Square,
        2 => Shape::Triangle,
        _ => Shape::Diamond,
    }
}

pub fn player_label(player_id: u32, player: &PlayerState) -> String {
    format!("P{} S:{}", player_id, player.score)
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Draws one frame. `status` is shown centered when there is something to report.
    pub fn render(&self, world: Option<&RenderState>, own_id: Option<u32>, status: Option<&str>) {
        clear_background(BACKGROUND);

        if let Some(world) = world {
            for coin in &world.coins {
                draw_circle(coin.x, coin.y, COIN_RADIUS, GOLD);
            }

            for (&id, player) in &world.players {
                let color = if Some(id) == own_id { OWN_PLAYER } else { OTHER_PLAYER };
                self.draw_player(id, player, color);
            }
        }

        if let Some(id) = own_id {
            draw_text(&format!("You: P{}", id), 10.0, 24.0, 24.0, WHITE);
        }

        if let Some(status) = status {
            self.draw_status(status);
        }
    }

    fn draw_player(&self, id: u32, player: &PlayerState, color: Color) {
        let (x, y, r) = (player.x, player.y, PLAYER_RADIUS);

        match player_shape(id) {
            Shape::Circle => draw_circle(x, y, r, color),
            Shape::Square => draw_rectangle(x - r, y - r, r * 2.0, r * 2.0, color),
            Shape::Triangle => draw_triangle(
                vec2(x, y - r),
                vec2(x - r, y + r),
                vec2(x + r, y + r),
                color,
            ),
            Shape::Diamond => draw_poly(x, y, 4, r, 0.0, color),
        }

        draw_text(&player_label(id, player), x + r + 4.0, y - r, 18.0, WHITE);
    }

    fn draw_status(&self, status: &str) {
        let font_size = 28.0;
        let size = measure_text(status, None, font_size as u16, 1.0);
        draw_text(
            status,
            (self.width - size.width) / 2.0,
            self.height / 2.0,
            font_size,
            LIGHTGRAY,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_cycles_with_id() {
        assert_eq!(player_shape(0), Shape::Circle);
        assert_eq!(player_shape(1), Shape::Square);
        assert_eq!(player_shape(2), Shape::Triangle);
        assert_eq!(player_shape(3), Shape::Diamond);
        assert_eq!(player_shape(5), Shape::Square);
    }

    #[test]
    fn test_player_label() {
        let player = PlayerState {
            x: 0.0,
            y: 0.0,
            score: 12,
        };
        assert_eq!(player_label(3, &player), "P3 S:12");
    }
}
