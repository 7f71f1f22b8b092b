//! Player status tracked alongside the conversation.

use serde::{Deserialize, Serialize};

/// The adventurer's health and inventory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub health: u32,
    pub max_health: u32,
    pub inventory: Vec<String>,
}

impl Default for Player {
    fn default() -> Self {
        Self {
            health: 100,
            max_health: 100,
            inventory: Vec::new(),
        }
    }
}

impl Player {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, item: impl Into<String>) {
        self.inventory.push(item.into());
    }

    pub fn remove_item(&mut self, item: &str) {
        if let Some(pos) = self.inventory.iter().position(|i| i == item) {
            self.inventory.remove(pos);
        }
    }

    pub fn has_item(&self, item: &str) -> bool {
        self.inventory.iter().any(|i| i == item)
    }

    /// Apply a health change, clamped to `0..=max_health`.
    pub fn modify_health(&mut self, delta: i32) {
        let health = self.health as i64 + delta as i64;
        self.health = health.clamp(0, self.max_health as i64) as u32;
    }

    /// Display string shown with every scene.
    pub fn status_line(&self) -> String {
        let inventory = if self.inventory.is_empty() {
            "Nothing".to_string()
        } else {
            self.inventory.join(", ")
        };
        format!(
            "Health: {}/{} | Inventory: {}",
            self.health, self.max_health, inventory
        )
    }
}
