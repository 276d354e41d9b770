//! Terminal renderer
//!
//! Prints records as they resolve. The showcase section is reprinted
//! wholesale on every refresh, mirroring the engine's idempotent redraw
//! contract.

use super::{BadgeCategory, ProfileView, Render};
use crate::engine::{BadgeDefinition, BadgeKey};

#[derive(Debug, Default)]
pub struct TermRender;

impl TermRender {
    pub fn new() -> Self {
        Self
    }
}

impl Render for TermRender {
    fn show_profile(&mut self, profile: &ProfileView) {
        println!();
        println!("{}", profile.display_name);
        println!("  {}", profile.identity);
        if !profile.bio.is_empty() {
            println!("  {}", profile.bio);
        }
        if !profile.image_url.is_empty() {
            println!("  image: {}", profile.image_url);
        }
    }

    fn show_badge(&mut self, key: &BadgeKey, definition: &BadgeDefinition, category: BadgeCategory) {
        println!("[{}] {} ({})", category, definition.name, key);
        if !definition.description.is_empty() {
            println!("    {}", definition.description);
        }
    }

    fn refresh_showcase(&mut self, entries: &[(BadgeKey, BadgeDefinition)]) {
        println!("showcase ({} badges):", entries.len());
        for (key, definition) in entries {
            println!("  {} ({})", definition.name, key);
        }
    }

    fn clear_all(&mut self) {
        println!("{}", "-".repeat(40));
    }

    fn set_status(&mut self, text: &str) {
        println!("status: {text}");
    }

    fn show_modal(&mut self, definition: &BadgeDefinition) {
        println!("{}", definition.name);
        println!("  {}", definition.description);
        if !definition.image_url.is_empty() {
            println!("  image: {}", definition.image_url);
        }
        println!("  issuer: {}", definition.issuer);
    }

    fn hide_modal(&mut self) {}
}
