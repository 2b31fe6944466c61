//! Asset, inventory, sale and wearable classifications.
//!
//! Each enum carries its numeric wire code and, where the task-inventory text
//! format uses one, its short string name. Unknown codes and names map to an
//! `Unknown`/`Not` variant instead of failing; the server is authoritative.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Asset category of an item, or the preferred contents of a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    Unknown,
    Texture,
    Sound,
    CallingCard,
    Landmark,
    Clothing,
    Object,
    Notecard,
    Folder,
    RootFolder,
    LSLText,
    LSLBytecode,
    TextureTGA,
    Bodypart,
    TrashFolder,
    SnapshotFolder,
    LostAndFoundFolder,
    SoundWAV,
    ImageTGA,
    ImageJPEG,
    Animation,
    Gesture,
    Simstate,
    FavoriteFolder,
    Link,
    LinkFolder,
    CurrentOutfitFolder,
    OutfitFolder,
    MyOutfitsFolder,
    Mesh,
}

const ASSET_TYPES: &[(AssetType, i8, &str)] = &[
    (AssetType::Texture, 0, "texture"),
    (AssetType::Sound, 1, "sound"),
    (AssetType::CallingCard, 2, "callcard"),
    (AssetType::Landmark, 3, "landmark"),
    (AssetType::Clothing, 5, "clothing"),
    (AssetType::Object, 6, "object"),
    (AssetType::Notecard, 7, "notecard"),
    (AssetType::Folder, 8, "category"),
    (AssetType::RootFolder, 9, "root"),
    (AssetType::LSLText, 10, "lsltext"),
    (AssetType::LSLBytecode, 11, "lslbyte"),
    (AssetType::TextureTGA, 12, "txtr_tga"),
    (AssetType::Bodypart, 13, "bodypart"),
    (AssetType::TrashFolder, 14, "trash"),
    (AssetType::SnapshotFolder, 15, "snapshot"),
    (AssetType::LostAndFoundFolder, 16, "lstndfnd"),
    (AssetType::SoundWAV, 17, "snd_wav"),
    (AssetType::ImageTGA, 18, "img_tga"),
    (AssetType::ImageJPEG, 19, "jpeg"),
    (AssetType::Animation, 20, "animatn"),
    (AssetType::Gesture, 21, "gesture"),
    (AssetType::Simstate, 22, "simstate"),
    (AssetType::FavoriteFolder, 23, "favorite"),
    (AssetType::Link, 24, "link"),
    (AssetType::LinkFolder, 25, "link_f"),
    (AssetType::CurrentOutfitFolder, 46, "current"),
    (AssetType::OutfitFolder, 47, "outfit"),
    (AssetType::MyOutfitsFolder, 48, "my_otfts"),
    (AssetType::Mesh, 49, "mesh"),
];

impl AssetType {
    pub fn from_code(code: i8) -> Self {
        ASSET_TYPES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
            .unwrap_or(AssetType::Unknown)
    }

    pub fn code(self) -> i8 {
        ASSET_TYPES
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, c, _)| *c)
            .unwrap_or(-1)
    }

    /// Parse the short name used by task-inventory listings
    pub fn from_name(name: &str) -> Self {
        ASSET_TYPES
            .iter()
            .find(|(_, _, n)| *n == name)
            .map(|(t, _, _)| *t)
            .unwrap_or(AssetType::Unknown)
    }

    pub fn name(self) -> &'static str {
        ASSET_TYPES
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, _, n)| *n)
            .unwrap_or("unknown")
    }

    /// Name given to a freshly created folder that prefers this type
    pub fn default_folder_name(self) -> &'static str {
        match self {
            AssetType::Texture => "Textures",
            AssetType::Sound => "Sounds",
            AssetType::CallingCard => "Calling Cards",
            AssetType::Landmark => "Landmarks",
            AssetType::Clothing => "Clothing",
            AssetType::Object => "Objects",
            AssetType::Notecard => "Notecards",
            AssetType::RootFolder => "Inventory",
            AssetType::LSLText | AssetType::LSLBytecode => "Scripts",
            AssetType::TextureTGA | AssetType::ImageTGA | AssetType::ImageJPEG => {
                "Uncompressed Images"
            }
            AssetType::Bodypart => "Body Parts",
            AssetType::TrashFolder => "Trash",
            AssetType::SnapshotFolder => "Photo Album",
            AssetType::LostAndFoundFolder => "Lost And Found",
            AssetType::SoundWAV => "Uncompressed Sounds",
            AssetType::Animation => "Animations",
            AssetType::Gesture => "Gestures",
            _ => "New Folder",
        }
    }
}

/// How the viewer treats an item, independent of its asset payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryType {
    Unknown,
    Texture,
    Sound,
    CallingCard,
    Landmark,
    Object,
    Notecard,
    Folder,
    RootCategory,
    LSL,
    Snapshot,
    Attachment,
    Wearable,
    Animation,
    Gesture,
    Mesh,
}

const INVENTORY_TYPES: &[(InventoryType, i8, &str)] = &[
    (InventoryType::Texture, 0, "texture"),
    (InventoryType::Sound, 1, "sound"),
    (InventoryType::CallingCard, 2, "callcard"),
    (InventoryType::Landmark, 3, "landmark"),
    (InventoryType::Object, 6, "object"),
    (InventoryType::Notecard, 7, "notecard"),
    (InventoryType::Folder, 8, "category"),
    (InventoryType::RootCategory, 9, "root"),
    (InventoryType::LSL, 10, "script"),
    (InventoryType::Snapshot, 15, "snapshot"),
    (InventoryType::Attachment, 17, "attach"),
    (InventoryType::Wearable, 18, "wearable"),
    (InventoryType::Animation, 19, "animation"),
    (InventoryType::Gesture, 20, "gesture"),
    (InventoryType::Mesh, 22, "mesh"),
];

impl InventoryType {
    pub fn from_code(code: i8) -> Self {
        INVENTORY_TYPES
            .iter()
            .find(|(_, c, _)| *c == code)
            .map(|(t, _, _)| *t)
            .unwrap_or(InventoryType::Unknown)
    }

    pub fn code(self) -> i8 {
        INVENTORY_TYPES
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, c, _)| *c)
            .unwrap_or(-1)
    }

    pub fn from_name(name: &str) -> Self {
        INVENTORY_TYPES
            .iter()
            .find(|(_, _, n)| *n == name)
            .map(|(t, _, _)| *t)
            .unwrap_or(InventoryType::Unknown)
    }

    pub fn name(self) -> &'static str {
        INVENTORY_TYPES
            .iter()
            .find(|(t, _, _)| *t == self)
            .map(|(_, _, n)| *n)
            .unwrap_or("unknown")
    }
}

/// Sale mode of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SaleType {
    #[default]
    Not,
    Original,
    Copy,
    Contents,
}

impl SaleType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => SaleType::Original,
            2 => SaleType::Copy,
            3 => SaleType::Contents,
            _ => SaleType::Not,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SaleType::Not => 0,
            SaleType::Original => 1,
            SaleType::Copy => 2,
            SaleType::Contents => 3,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "orig" => SaleType::Original,
            "copy" => SaleType::Copy,
            "cntn" => SaleType::Contents,
            _ => SaleType::Not,
        }
    }
}

/// Body slot of a wearable item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WearableType {
    Shape = 0,
    Skin = 1,
    Hair = 2,
    Eyes = 3,
    Shirt = 4,
    Pants = 5,
    Shoes = 6,
    Socks = 7,
    Jacket = 8,
    Gloves = 9,
    Undershirt = 10,
    Underpants = 11,
    Skirt = 12,
    Alpha = 13,
    Tattoo = 14,
    Physics = 15,
    Invalid = 255,
}

impl WearableType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

bitflags! {
    /// Ordering requested for a folder's descendents
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SortOrder: u32 {
        const BY_DATE = 1;
        const FOLDERS_BY_NAME = 2;
        const SYSTEM_FOLDERS_TO_TOP = 4;
    }
}

impl SortOrder {
    /// Alphabetical ordering; the absence of every other flag
    pub const BY_NAME: SortOrder = SortOrder::empty();
}
