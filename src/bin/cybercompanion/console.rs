//! Terminal stand-in for the on-screen body: prints what a window would show.

use std::path::Path;

use anyhow::{bail, Result};
use cybercompanion::director::Presentation;
use cybercompanion::entropy::Edge;
use cybercompanion::script::Script;

#[derive(Debug, Default)]
pub(crate) struct ConsolePresentation {
    visible: bool,
    visual: String,
}

impl ConsolePresentation {
    fn say(&self, script: Option<&Script>) {
        if let Some(script) = script {
            println!("  \"{}\"", script.text);
        }
    }
}

impl Presentation for ConsolePresentation {
    fn set_state_by_name(&mut self, name: &str, _as_base: bool) -> bool {
        if self.visual != name {
            self.visual = name.to_string();
            if self.visible {
                println!("[companion] visual -> {name}");
            }
        }
        true
    }

    fn set_ascii_content(&mut self, content: &str) {
        println!("{content}");
    }

    fn set_sprite_content(&mut self, path: &Path) -> Result<()> {
        if !path.is_file() {
            bail!("sprite {} not found", path.display());
        }
        println!("[companion] sprite {}", path.display());
        Ok(())
    }

    fn summon(&mut self, edge: Edge, y: i32, script: Option<&Script>) {
        self.visible = true;
        println!("[companion] slides in from the {} edge at y={y}", edge.label());
        self.say(script);
    }

    fn enter(&mut self, script: Option<&Script>) {
        self.visible = true;
        println!("[companion] steps out after the entrance");
        self.say(script);
    }

    fn peek(&mut self, edge: Edge, y: i32) {
        self.visible = true;
        println!("[companion] peeks from the {} edge at y={y}", edge.label());
    }

    fn flee(&mut self) -> bool {
        if self.visible {
            println!("[companion] runs off");
        }
        self.visible = false;
        false
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn set_autonomous_enabled(&mut self, _enabled: bool) {}

    fn is_visible(&self) -> bool {
        self.visible
    }
}
