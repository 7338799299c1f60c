//! Dialogue engine.
//!
//! A [`Dialog`] walks a linear chain of dialogue lines. Lines with choices
//! wait for a pick; lines without are continued. Picking or continuing runs
//! the line's NPC action, then applies a package (the choice's, else the
//! line's). A package the player cannot pay for keeps the dialogue on the
//! same line and shows the choice's alternate text instead.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::content::{active_subquest_of, ChoiceRecord, DialogueRecord};
use crate::game::actions::{ActionEffect, NpcAction, NpcPlacements};
use crate::game::client::ProgressApi;
use crate::game::repository::ContentRepository;

/// Shown when a choice without alternate text cannot be afforded.
pub const DEFAULT_REFUSAL: &str = "You can't do that yet.";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DialogError {
    #[error("pick one of the choices to continue")]
    ChoiceRequired,
    #[error("there is no choice {0}")]
    NoSuchChoice(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogKind {
    Npc { position_id: u32, tag: String },
    Narrator { subquest_id: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceView {
    pub choice_id: u32,
    pub text: String,
}

/// One rendered text box.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogView {
    pub dialogue_id: u32,
    pub speaker: String,
    pub text: String,
    pub choices: Vec<ChoiceView>,
    /// 1-based position in the chain.
    pub step: usize,
    pub total: usize,
}

impl DialogView {
    pub fn has_choices(&self) -> bool {
        !self.choices.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Continue,
    /// Zero-based index into the current line's choices.
    Choice(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogStep {
    Node(DialogView),
    /// The package was refused; the dialogue stays on `node`.
    Notice { text: String, node: DialogView },
    Finished,
}

/// Result of one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub step: DialogStep,
    pub effect: ActionEffect,
}

#[derive(Debug)]
pub struct Dialog {
    repo: Arc<ContentRepository>,
    kind: DialogKind,
    chain: Vec<u32>,
    count: usize,
}

impl Dialog {
    pub fn new(repo: Arc<ContentRepository>, kind: DialogKind, chain: Vec<u32>) -> Self {
        Self {
            repo,
            kind,
            chain,
            count: 0,
        }
    }

    /// What the NPC standing at `position_id` says while `active` is the current subquest.
    pub fn for_npc(
        repo: Arc<ContentRepository>,
        position_id: u32,
        tag: &str,
        active: Option<u32>,
    ) -> Self {
        let chain = repo.npc_chain(position_id, active);
        Self::new(
            repo,
            DialogKind::Npc {
                position_id,
                tag: tag.to_string(),
            },
            chain,
        )
    }

    pub fn narrator(repo: Arc<ContentRepository>, subquest_id: u32) -> Self {
        let chain = repo.narrator_chain(subquest_id);
        Self::new(repo, DialogKind::Narrator { subquest_id }, chain)
    }

    pub fn kind(&self) -> &DialogKind {
        &self.kind
    }

    /// How many lines have been advanced past.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Rewind to the first line and render it.
    pub fn show_dialogs(&mut self) -> DialogStep {
        self.count = 0;
        match self.current() {
            Some(view) => DialogStep::Node(view),
            None => DialogStep::Finished,
        }
    }

    /// The line under the cursor.
    pub fn current(&self) -> Option<DialogView> {
        let id = *self.chain.get(self.count)?;
        self.update_dialog(id)
    }

    /// Render a line and its choices. `None` if the line does not exist.
    pub fn update_dialog(&self, dialogue_id: u32) -> Option<DialogView> {
        let node = self.repo.dialogue(dialogue_id)?;
        let choices = self
            .repo
            .choices_for(dialogue_id)
            .iter()
            .map(|c| ChoiceView {
                choice_id: c.choice_id,
                text: c.text.clone(),
            })
            .collect();
        let step = self
            .chain
            .iter()
            .position(|id| *id == dialogue_id)
            .map_or(0, |i| i + 1);
        Some(DialogView {
            dialogue_id,
            speaker: self.speaker_of(node),
            text: node.text.clone(),
            choices,
            step,
            total: self.chain.len(),
        })
    }

    fn speaker_of(&self, node: &DialogueRecord) -> String {
        if let Some(speaker) = &node.speaker {
            return speaker.clone();
        }
        match &self.kind {
            DialogKind::Npc { tag, .. } => tag.clone(),
            DialogKind::Narrator { .. } => "Narrator".to_string(),
        }
    }

    /// React to the player continuing or picking a choice on the current line.
    pub async fn select(
        &mut self,
        selection: Selection,
        api: &dyn ProgressApi,
        npcs: &mut NpcPlacements,
    ) -> Result<Turn, DialogError> {
        let Some(&node_id) = self.chain.get(self.count) else {
            return Ok(Turn {
                step: DialogStep::Finished,
                effect: ActionEffect::None,
            });
        };
        let repo = Arc::clone(&self.repo);
        let Some(node) = repo.dialogue(node_id) else {
            warn!("Dialogue {} vanished from the chain, closing", node_id);
            self.count = self.chain.len();
            return Ok(Turn {
                step: DialogStep::Finished,
                effect: ActionEffect::None,
            });
        };
        let choice = pick_choice(repo.choices_for(node_id), selection)?;

        let effect = match node.action_id {
            Some(action_id) => match repo.action(action_id) {
                Some(action) => npcs.perform(&NpcAction::from_record(action), &repo),
                None => {
                    warn!("Dialogue {} refers to missing action {}", node_id, action_id);
                    ActionEffect::None
                }
            },
            None => ActionEffect::None,
        };

        let package_id = choice.and_then(|c| c.package_id).or(node.package_id);
        if let Some(package_id) = package_id {
            if !self.update_inventory(package_id, api).await {
                let text = choice
                    .and_then(|c| c.alt_text.clone())
                    .unwrap_or_else(|| DEFAULT_REFUSAL.to_string());
                let step = match self.update_dialog(node_id) {
                    Some(node) => DialogStep::Notice { text, node },
                    None => DialogStep::Finished,
                };
                return Ok(Turn { step, effect });
            }
        }

        self.count += 1;
        let step = match self.current() {
            Some(view) => DialogStep::Node(view),
            None => {
                debug!("Dialogue chain done after {} lines", self.count);
                self.count = self.chain.len();
                DialogStep::Finished
            }
        };
        Ok(Turn { step, effect })
    }

    /// Apply a package for the player. Returns `false`, having changed
    /// nothing, when a cost cannot be covered or checked.
    ///
    /// Deltas go out in item order. A milestone item ends the package: the
    /// active subquest is completed and the next one opened through a single
    /// advance call.
    pub async fn update_inventory(&self, package_id: u32, api: &dyn ProgressApi) -> bool {
        let details = self.repo.package_details(package_id);
        if details.is_empty() {
            warn!("Package {} has no contents", package_id);
            return true;
        }

        for detail in details.iter().filter(|d| d.is_cost()) {
            match api.inventory_amount(detail.item_id).await {
                Ok(have) if have + detail.amount >= 0 => {}
                Ok(have) => {
                    info!(
                        "Player {} cannot pay {} x {} (has {})",
                        api.player_id(),
                        -detail.amount,
                        self.repo.item_name(detail.item_id),
                        have
                    );
                    return false;
                }
                Err(e) => {
                    warn!("Could not check item {}: {}", detail.item_id, e);
                    return false;
                }
            }
        }

        for detail in details {
            let milestone = self
                .repo
                .item(detail.item_id)
                .map(|item| item.is_milestone())
                .unwrap_or(false);
            if milestone {
                self.complete_active_subquest(api).await;
                return true;
            }
            if let Err(e) = api.add_inventory(detail.item_id, detail.amount).await {
                warn!(
                    "Inventory update for item {} failed: {}",
                    detail.item_id, e
                );
            }
        }
        true
    }

    async fn complete_active_subquest(&self, api: &dyn ProgressApi) {
        let progress = match api.player_progress().await {
            Ok(progress) => progress,
            Err(e) => {
                warn!("Could not read progress: {}", e);
                return;
            }
        };
        let Some(current) = active_subquest_of(&progress) else {
            warn!("Milestone reached with no subquest in progress");
            return;
        };
        let next = self.repo.next_subquest(current).map(|s| s.subquest_id);
        if let Err(e) = api.advance_progress(current, next).await {
            warn!("Advancing past subquest {} failed: {}", current, e);
        }
    }
}

fn pick_choice(
    choices: &[ChoiceRecord],
    selection: Selection,
) -> Result<Option<&ChoiceRecord>, DialogError> {
    match selection {
        Selection::Continue if choices.is_empty() => Ok(None),
        Selection::Continue => Err(DialogError::ChoiceRequired),
        Selection::Choice(i) => choices
            .get(i)
            .map(Some)
            .ok_or(DialogError::NoSuchChoice(i)),
    }
}
