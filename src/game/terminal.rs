//! Line-oriented front end for `codyssey play`.
//!
//! Each input line is one command; the reply is plain text. What a command
//! means depends on the open modal, mirroring how the scene gates input.

use std::io::{BufRead, Write};

use crate::game::actions::ActionEffect;
use crate::game::dialog::{DialogView, Selection};
use crate::game::scene::{Direction, Nearby, SceneController, SceneEvent, UiState};

const HELP: &str = "[W/A/S/D] move  [E] interact  [I]nventory  [G]uide  [M]enu  [L]ook  [Q]uit";

/// Turns command lines into scene calls and scene events into text.
#[derive(Default)]
pub struct TerminalFrontend;

impl TerminalFrontend {
    pub fn new() -> Self {
        TerminalFrontend
    }

    /// Process one command. `None` means the player asked to quit.
    pub async fn process(&self, scene: &mut SceneController, command: &str) -> Option<String> {
        let upper = command.trim().to_uppercase();
        if upper == "Q" || upper == "QUIT" {
            return None;
        }
        let in_dialogue = matches!(scene.ui(), UiState::Dialogue(_));
        let reply = if scene.ui().is_idle() {
            self.handle_idle(scene, &upper).await
        } else if in_dialogue {
            self.handle_dialogue(scene, &upper).await
        } else {
            self.handle_modal(scene, &upper)
        };
        Some(reply)
    }

    async fn handle_idle(&self, scene: &mut SceneController, cmd: &str) -> String {
        let direction = match cmd {
            "W" => Some(Direction::Up),
            "A" => Some(Direction::Left),
            "S" => Some(Direction::Down),
            "D" => Some(Direction::Right),
            _ => None,
        };
        if let Some(direction) = direction {
            scene.move_player(direction);
            return self.look(scene);
        }
        match cmd {
            "E" => match scene.interact().await {
                Ok(event) => render_event(&event),
                Err(e) => format!("{}\n", e),
            },
            "I" => match scene.open_inventory() {
                Ok(()) => render_inventory(scene),
                Err(e) => format!("{}\n", e),
            },
            "G" => match scene.open_guide() {
                Ok(()) => format!("{}\n[X] close\n", scene.guide_text()),
                Err(e) => format!("{}\n", e),
            },
            "M" => match scene.open_menu() {
                Ok(()) => format!("Menu\n{}\n[X] close\n", HELP),
                Err(e) => format!("{}\n", e),
            },
            "L" | "" => self.look(scene),
            _ => format!("Unknown command.\n{}\n", HELP),
        }
    }

    async fn handle_dialogue(&self, scene: &mut SceneController, cmd: &str) -> String {
        let selection = match cmd {
            "" | "C" => Selection::Continue,
            n => match n.parse::<usize>() {
                Ok(i) if i >= 1 => Selection::Choice(i - 1),
                _ => return "Press Enter to continue or type a choice number.\n".to_string(),
            },
        };
        match scene.dialog_select(selection).await {
            Ok(event) => render_event(&event),
            Err(e) => format!("{}\n", e),
        }
    }

    fn handle_modal(&self, scene: &mut SceneController, cmd: &str) -> String {
        match cmd {
            "X" | "" => {
                scene.close_modal();
                self.look(scene)
            }
            _ => "[X] close\n".to_string(),
        }
    }

    /// Where the player is and what is in reach.
    pub fn look(&self, scene: &SceneController) -> String {
        let (x, y) = scene.player_position();
        let place = scene
            .location()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| "Nowhere".to_string());
        let mut out = format!("{} ({:.0}, {:.0})\n", place, x, y);
        for npc in scene.npcs().iter() {
            out.push_str(&format!("  {} at ({:.0}, {:.0})\n", npc.tag, npc.x, npc.y));
        }
        for door in scene.doors() {
            let to = door
                .door_to
                .and_then(|id| scene.repo().location(id))
                .map(|l| l.name.as_str())
                .unwrap_or("somewhere");
            out.push_str(&format!(
                "  door to {} at ({:.0}, {:.0})\n",
                to, door.x, door.y
            ));
        }
        match scene.nearby() {
            Some(Nearby::Npc { tag }) => out.push_str(&format!("[E] talk to {}\n", tag)),
            Some(Nearby::Door { .. }) => out.push_str("[E] go through the door\n"),
            None => {}
        }
        out
    }
}

fn render_view(view: &DialogView) -> String {
    let mut out = format!("{}: {}\n", view.speaker, view.text);
    if view.has_choices() {
        for (i, choice) in view.choices.iter().enumerate() {
            out.push_str(&format!("  {}) {}\n", i + 1, choice.text));
        }
    } else {
        out.push_str("  [Enter] continue\n");
    }
    out
}

fn render_effect(effect: &ActionEffect) -> Option<String> {
    match effect {
        ActionEffect::None => None,
        ActionEffect::Moved { tag, .. } => Some(format!("* {} walks away.", tag)),
        ActionEffect::Spawned { tag, .. } => Some(format!("* {} appears.", tag)),
        ActionEffect::Removed { tag } => Some(format!("* {} is gone.", tag)),
        ActionEffect::WalkedOff { tag, .. } => Some(format!("* {} walks off and disappears.", tag)),
    }
}

pub fn render_event(event: &SceneEvent) -> String {
    let mut out = String::new();
    let push_effect = |out: &mut String, effect: &ActionEffect| {
        if let Some(line) = render_effect(effect) {
            out.push_str(&line);
            out.push('\n');
        }
    };
    match event {
        SceneEvent::Nothing => out.push_str("There is nobody here.\n"),
        SceneEvent::Silent { tag } => out.push_str(&format!("{} has nothing to say.\n", tag)),
        SceneEvent::Dialogue { view, effect } => {
            push_effect(&mut out, effect);
            out.push_str(&render_view(view));
        }
        SceneEvent::Notice { text, view, effect } => {
            push_effect(&mut out, effect);
            out.push_str(&format!("{}\n", text));
            out.push_str(&render_view(view));
        }
        SceneEvent::DialogueClosed { effect, narration } => {
            push_effect(&mut out, effect);
            if let Some(view) = narration {
                out.push_str(&render_view(view));
            }
        }
        SceneEvent::EnteredLocation {
            name, narration, ..
        } => {
            out.push_str(&format!("You enter {}.\n", name));
            if let Some(view) = narration {
                out.push_str(&render_view(view));
            }
        }
    }
    out
}

fn render_inventory(scene: &SceneController) -> String {
    let items = scene.inventory_view();
    let mut out = String::from("Inventory\n");
    if items.is_empty() {
        out.push_str("  (empty)\n");
    }
    for (name, amount) in items {
        out.push_str(&format!("  {} x{}\n", name, amount));
    }
    out.push_str("[X] close\n");
    out
}

/// Read commands until EOF or quit.
pub async fn run_terminal<R: BufRead, W: Write>(
    scene: &mut SceneController,
    input: R,
    mut output: W,
) -> std::io::Result<()> {
    let frontend = TerminalFrontend::new();
    writeln!(output, "Welcome to The Codyssey!\n{}", HELP)?;
    match scene.ui() {
        UiState::Dialogue(dialog) => {
            if let Some(view) = dialog.current() {
                write!(output, "{}", render_view(&view))?;
            }
        }
        _ => write!(output, "{}", frontend.look(scene))?,
    }
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        match frontend.process(scene, &line).await {
            Some(reply) => write!(output, "{}", reply)?,
            None => break,
        }
        output.flush()?;
    }
    writeln!(output, "Goodbye!")?;
    Ok(())
}
