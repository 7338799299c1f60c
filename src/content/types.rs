use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONTENT_SCHEMA_VERSION: u8 = 1;
pub const PROGRESS_SCHEMA_VERSION: u8 = 1;
pub const USER_SCHEMA_VERSION: u8 = 1;

/// Zero-padded key fragment so sled's byte ordering matches numeric ordering.
pub fn id_key(id: u32) -> String {
    format!("{:010}", id)
}

/// A storable record. Each record type lives in its own sled tree named by
/// [`Record::COLLECTION`], which doubles as its API route segment.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const SCHEMA_VERSION: u8 = CONTENT_SCHEMA_VERSION;

    fn record_key(&self) -> String;

    /// Shape checks applied before every write.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Records addressed by a single numeric id (`GET /{collection}/{id}`).
pub trait KeyedRecord: Record {
    fn id(&self) -> u32;
}

// ============================================================================
// Quest hierarchy
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuestRecord {
    pub quest_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl QuestRecord {
    pub fn new(quest_id: u32, title: &str) -> Self {
        Self {
            quest_id,
            title: title.to_string(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubquestRecord {
    pub subquest_id: u32,
    pub quest_id: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Hint shown in the guide modal while this subquest is active.
    #[serde(default)]
    pub guide: Option<String>,
}

impl SubquestRecord {
    pub fn new(subquest_id: u32, quest_id: u32, title: &str) -> Self {
        Self {
            subquest_id,
            quest_id,
            title: title.to_string(),
            description: String::new(),
            guide: None,
        }
    }

    pub fn with_guide(mut self, guide: &str) -> Self {
        self.guide = Some(guide.to_string());
        self
    }
}

// ============================================================================
// World layout
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    #[default]
    Outdoor,
    Indoor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRecord {
    pub location_id: u32,
    pub name: String,
    #[serde(default)]
    pub kind: LocationKind,
    pub width: f32,
    pub height: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
}

impl LocationRecord {
    pub fn new(location_id: u32, name: &str, kind: LocationKind, width: f32, height: f32) -> Self {
        Self {
            location_id,
            name: name.to_string(),
            kind,
            width,
            height,
            spawn_x: width / 2.0,
            spawn_y: height / 2.0,
        }
    }

    pub fn with_spawn(mut self, x: f32, y: f32) -> Self {
        self.spawn_x = x;
        self.spawn_y = y;
        self
    }

    pub fn clamp(&self, x: f32, y: f32) -> (f32, f32) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }
}

/// Binds an NPC (or door) tag to map coordinates, optionally gated on a subquest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionRecord {
    pub position_id: u32,
    pub tag: String,
    pub location_id: u32,
    #[serde(default)]
    pub subquest_id: Option<u32>,
    pub x: f32,
    pub y: f32,
    /// When set, this position is a door leading to the given location.
    #[serde(default)]
    pub door_to: Option<u32>,
    /// Waypoints are action targets only and never spawn anything.
    #[serde(default)]
    pub waypoint: bool,
}

impl PositionRecord {
    pub fn new(position_id: u32, tag: &str, location_id: u32, x: f32, y: f32) -> Self {
        Self {
            position_id,
            tag: tag.to_string(),
            location_id,
            subquest_id: None,
            x,
            y,
            door_to: None,
            waypoint: false,
        }
    }

    pub fn waypoint(position_id: u32, location_id: u32, x: f32, y: f32) -> Self {
        Self {
            waypoint: true,
            ..Self::new(position_id, "waypoint", location_id, x, y)
        }
    }

    pub fn during(mut self, subquest_id: u32) -> Self {
        self.subquest_id = Some(subquest_id);
        self
    }

    pub fn door_to(mut self, location_id: u32) -> Self {
        self.door_to = Some(location_id);
        self
    }

    pub fn is_door(&self) -> bool {
        self.door_to.is_some()
    }

    /// Ungated positions are always visible; gated ones only while their subquest is active.
    pub fn visible_during(&self, active: Option<u32>) -> bool {
        if self.waypoint {
            return false;
        }
        match self.subquest_id {
            None => true,
            Some(gate) => active == Some(gate),
        }
    }
}

/// NPC placement command attached to a dialogue node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    pub action_id: u32,
    /// `move`, `spawn`, `remove` or `move_remove`; other values are ignored at dispatch.
    pub action_type: String,
    pub tag: String,
    #[serde(default)]
    pub position_id: Option<u32>,
}

impl ActionRecord {
    pub fn new(action_id: u32, action_type: &str, tag: &str, position_id: Option<u32>) -> Self {
        Self {
            action_id,
            action_type: action_type.to_string(),
            tag: tag.to_string(),
            position_id,
        }
    }
}

// ============================================================================
// Dialogue
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueRecord {
    pub dialogue_id: u32,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    /// Narrator lines carry the subquest they belong to and no position.
    #[serde(default)]
    pub subquest_id: Option<u32>,
    #[serde(default)]
    pub position_id: Option<u32>,
    #[serde(default)]
    pub package_id: Option<u32>,
    #[serde(default)]
    pub action_id: Option<u32>,
}

impl DialogueRecord {
    pub fn new(dialogue_id: u32, text: &str) -> Self {
        Self {
            dialogue_id,
            text: text.to_string(),
            speaker: None,
            subquest_id: None,
            position_id: None,
            package_id: None,
            action_id: None,
        }
    }

    pub fn spoken_by(mut self, speaker: &str) -> Self {
        self.speaker = Some(speaker.to_string());
        self
    }

    pub fn at_position(mut self, position_id: u32) -> Self {
        self.position_id = Some(position_id);
        self
    }

    pub fn for_subquest(mut self, subquest_id: u32) -> Self {
        self.subquest_id = Some(subquest_id);
        self
    }

    pub fn with_package(mut self, package_id: u32) -> Self {
        self.package_id = Some(package_id);
        self
    }

    pub fn with_action(mut self, action_id: u32) -> Self {
        self.action_id = Some(action_id);
        self
    }

    pub fn is_narration(&self) -> bool {
        self.position_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChoiceRecord {
    pub choice_id: u32,
    pub dialogue_id: u32,
    pub text: String,
    #[serde(default)]
    pub package_id: Option<u32>,
    /// Shown instead of advancing when the choice's package cannot be paid.
    #[serde(default)]
    pub alt_text: Option<String>,
}

impl ChoiceRecord {
    pub fn new(choice_id: u32, dialogue_id: u32, text: &str) -> Self {
        Self {
            choice_id,
            dialogue_id,
            text: text.to_string(),
            package_id: None,
            alt_text: None,
        }
    }

    pub fn with_package(mut self, package_id: u32) -> Self {
        self.package_id = Some(package_id);
        self
    }

    pub fn with_alt_text(mut self, alt_text: &str) -> Self {
        self.alt_text = Some(alt_text.to_string());
        self
    }
}

// ============================================================================
// Items, packages and inventory
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    #[default]
    Item,
    /// Granting a milestone completes the active subquest instead of filling a slot.
    Milestone,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemRecord {
    pub item_id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub item_type: ItemKind,
}

impl ItemRecord {
    pub fn new(item_id: u32, name: &str) -> Self {
        Self {
            item_id,
            name: name.to_string(),
            description: String::new(),
            item_type: ItemKind::Item,
        }
    }

    pub fn milestone(item_id: u32, name: &str) -> Self {
        Self {
            item_type: ItemKind::Milestone,
            ..Self::new(item_id, name)
        }
    }

    pub fn is_milestone(&self) -> bool {
        self.item_type == ItemKind::Milestone
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageRecord {
    pub package_id: u32,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl PackageRecord {
    pub fn new(package_id: u32, name: &str) -> Self {
        Self {
            package_id,
            name: name.to_string(),
            description: String::new(),
        }
    }
}

/// One signed inventory delta inside a package. Negative amounts are costs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageDetailRecord {
    pub package_id: u32,
    pub item_id: u32,
    pub amount: i64,
}

impl PackageDetailRecord {
    pub fn new(package_id: u32, item_id: u32, amount: i64) -> Self {
        Self {
            package_id,
            item_id,
            amount,
        }
    }

    pub fn is_cost(&self) -> bool {
        self.amount < 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryRecord {
    pub player_id: String,
    pub item_id: u32,
    pub amount: i64,
}

impl InventoryRecord {
    pub fn new(player_id: &str, item_id: u32, amount: i64) -> Self {
        Self {
            player_id: player_id.to_string(),
            item_id,
            amount,
        }
    }

    pub fn key_for(player_id: &str, item_id: u32) -> String {
        format!("{}:{}", player_id, id_key(item_id))
    }
}

// ============================================================================
// Player progress
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ProgressStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::InProgress => write!(f, "In Progress"),
            ProgressStatus::Completed => write!(f, "Completed"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerProgressRecord {
    pub player_id: String,
    pub subquest_id: u32,
    pub status: ProgressStatus,
    /// Creation order; the entry with the highest `seq` is the player's current state.
    #[serde(default)]
    pub seq: u64,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl PlayerProgressRecord {
    pub fn new(player_id: &str, subquest_id: u32, status: ProgressStatus) -> Self {
        Self {
            player_id: player_id.to_string(),
            subquest_id,
            status,
            seq: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn key_for(player_id: &str, subquest_id: u32) -> String {
        format!("{}:{}", player_id, id_key(subquest_id))
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == ProgressStatus::InProgress
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Player,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn key_for(username: &str) -> String {
        username.to_ascii_lowercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub token: String,
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// ============================================================================
// Record impls
// ============================================================================

impl Record for QuestRecord {
    const COLLECTION: &'static str = "quest";
    fn record_key(&self) -> String {
        id_key(self.quest_id)
    }
    fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("quest title must not be empty".to_string());
        }
        Ok(())
    }
}

impl KeyedRecord for QuestRecord {
    fn id(&self) -> u32 {
        self.quest_id
    }
}

impl Record for SubquestRecord {
    const COLLECTION: &'static str = "subquest";
    fn record_key(&self) -> String {
        id_key(self.subquest_id)
    }
}

impl KeyedRecord for SubquestRecord {
    fn id(&self) -> u32 {
        self.subquest_id
    }
}

impl Record for LocationRecord {
    const COLLECTION: &'static str = "location";
    fn record_key(&self) -> String {
        id_key(self.location_id)
    }
    fn validate(&self) -> Result<(), String> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(format!("location {} must have a positive size", self.location_id));
        }
        Ok(())
    }
}

impl KeyedRecord for LocationRecord {
    fn id(&self) -> u32 {
        self.location_id
    }
}

impl Record for PositionRecord {
    const COLLECTION: &'static str = "position";
    fn record_key(&self) -> String {
        id_key(self.position_id)
    }
    fn validate(&self) -> Result<(), String> {
        if self.tag.trim().is_empty() {
            return Err("position tag must not be empty".to_string());
        }
        Ok(())
    }
}

impl KeyedRecord for PositionRecord {
    fn id(&self) -> u32 {
        self.position_id
    }
}

impl Record for ActionRecord {
    const COLLECTION: &'static str = "action";
    fn record_key(&self) -> String {
        id_key(self.action_id)
    }
}

impl KeyedRecord for ActionRecord {
    fn id(&self) -> u32 {
        self.action_id
    }
}

impl Record for DialogueRecord {
    const COLLECTION: &'static str = "dialogue";
    fn record_key(&self) -> String {
        id_key(self.dialogue_id)
    }
}

impl KeyedRecord for DialogueRecord {
    fn id(&self) -> u32 {
        self.dialogue_id
    }
}

impl Record for ChoiceRecord {
    const COLLECTION: &'static str = "choice";
    fn record_key(&self) -> String {
        format!("{}:{}", id_key(self.dialogue_id), id_key(self.choice_id))
    }
}

impl Record for ItemRecord {
    const COLLECTION: &'static str = "item";
    fn record_key(&self) -> String {
        id_key(self.item_id)
    }
}

impl KeyedRecord for ItemRecord {
    fn id(&self) -> u32 {
        self.item_id
    }
}

impl Record for PackageRecord {
    const COLLECTION: &'static str = "package";
    fn record_key(&self) -> String {
        id_key(self.package_id)
    }
}

impl KeyedRecord for PackageRecord {
    fn id(&self) -> u32 {
        self.package_id
    }
}

impl Record for PackageDetailRecord {
    const COLLECTION: &'static str = "package_detail";
    fn record_key(&self) -> String {
        format!("{}:{}", id_key(self.package_id), id_key(self.item_id))
    }
    fn validate(&self) -> Result<(), String> {
        if self.amount == 0 {
            return Err("package detail amount must be non-zero".to_string());
        }
        Ok(())
    }
}

impl Record for InventoryRecord {
    const COLLECTION: &'static str = "inventory";
    const SCHEMA_VERSION: u8 = PROGRESS_SCHEMA_VERSION;
    fn record_key(&self) -> String {
        Self::key_for(&self.player_id, self.item_id)
    }
    fn validate(&self) -> Result<(), String> {
        if self.amount < 0 {
            return Err(format!("inventory amount for item {} cannot be negative", self.item_id));
        }
        Ok(())
    }
}

impl Record for PlayerProgressRecord {
    const COLLECTION: &'static str = "player_progress";
    const SCHEMA_VERSION: u8 = PROGRESS_SCHEMA_VERSION;
    fn record_key(&self) -> String {
        Self::key_for(&self.player_id, self.subquest_id)
    }
}

impl Record for UserRecord {
    const COLLECTION: &'static str = "users";
    const SCHEMA_VERSION: u8 = USER_SCHEMA_VERSION;
    fn record_key(&self) -> String {
        Self::key_for(&self.username)
    }
}

impl Record for SessionRecord {
    const COLLECTION: &'static str = "sessions";
    const SCHEMA_VERSION: u8 = USER_SCHEMA_VERSION;
    fn record_key(&self) -> String {
        self.token.clone()
    }
}

/// Every content table at once: the seed file format and the scene's content snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentBundle {
    #[serde(default)]
    pub quests: Vec<QuestRecord>,
    #[serde(default)]
    pub subquests: Vec<SubquestRecord>,
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default)]
    pub positions: Vec<PositionRecord>,
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
    #[serde(default)]
    pub dialogues: Vec<DialogueRecord>,
    #[serde(default)]
    pub choices: Vec<ChoiceRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(default)]
    pub packages: Vec<PackageRecord>,
    #[serde(default)]
    pub package_details: Vec<PackageDetailRecord>,
}

impl ContentBundle {
    pub fn record_count(&self) -> usize {
        self.quests.len()
            + self.subquests.len()
            + self.locations.len()
            + self.positions.len()
            + self.actions.len()
            + self.dialogues.len()
            + self.choices.len()
            + self.items.len()
            + self.packages.len()
            + self.package_details.len()
    }
}
