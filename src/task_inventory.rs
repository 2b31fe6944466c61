//! Task Inventory Parser
//!
//! Reads the plain-text listing of an object's contents: one `inv_object`
//! block per folder and one `inv_item` block per item, items carrying nested
//! `permissions` and `sale_info` blocks. Each line is `key value...`; values
//! are whitespace-collapsed. Blocks are tracked by brace counting, so an
//! unbalanced block consumes the rest of the input.

use crate::inventory::{
    unix_to_datetime, AssetType, InventoryFolder, InventoryItem, InventoryNode, InventoryType,
    Permissions, SaleType,
};
use crate::types::ZERO_ID;
use tracing::{debug, warn};
use uuid::Uuid;

/// Key that obfuscated `shadow_id` asset ids are XORed with
const SHADOW_MAGIC: Uuid = Uuid::from_u128(0x3c115e51_04f4_523c_9fa6_98aff1034730);

/// Parse a task-inventory listing into unlinked nodes
pub fn parse_task_inventory(text: &str) -> Vec<InventoryNode> {
    TaskInventoryParser::new(text).parse()
}

struct TaskInventoryParser<'a> {
    lines: Vec<(&'a str, String)>,
    pos: usize,
}

impl<'a> TaskInventoryParser<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .filter_map(|raw| {
                let mut tokens = raw.split_whitespace();
                let key = tokens.next()?;
                Some((key, tokens.collect::<Vec<_>>().join(" ")))
            })
            .collect();
        Self { lines, pos: 0 }
    }

    fn advance(&mut self) -> Option<(&'a str, String)> {
        let line = self.lines.get(self.pos)?.clone();
        self.pos += 1;
        Some(line)
    }

    /// Consume an opening brace if it is the next line
    fn open_block(&mut self) -> bool {
        match self.lines.get(self.pos) {
            Some(("{", _)) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    /// Skip to the brace closing a block whose opening brace was consumed
    fn skip_block(&mut self) {
        let mut depth = 1usize;
        while let Some((key, _)) = self.advance() {
            match key {
                "{" => depth += 1,
                "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    fn parse(mut self) -> Vec<InventoryNode> {
        let mut nodes = Vec::new();
        while let Some((key, _)) = self.advance() {
            match key {
                "inv_object" => {
                    if let Some(folder) = self.parse_object() {
                        nodes.push(InventoryNode::Folder(folder));
                    }
                }
                "inv_item" => {
                    if let Some(item) = self.parse_item() {
                        nodes.push(InventoryNode::Item(item));
                    }
                }
                "{" => self.skip_block(),
                "}" => {}
                other => {
                    warn!(key = other, "Unrecognized token in task inventory");
                    if self.open_block() {
                        self.skip_block();
                    }
                }
            }
        }
        nodes
    }

    fn parse_object(&mut self) -> Option<InventoryFolder> {
        if !self.open_block() {
            warn!("inv_object without a block");
            return None;
        }
        let mut folder = InventoryFolder::new(ZERO_ID);
        folder.needs_update = false;

        while let Some((key, value)) = self.advance() {
            match key {
                "}" => break,
                "{" => self.skip_block(),
                "obj_id" => folder.id = parse_uuid(key, &value),
                "parent_id" => folder.parent_id = parse_uuid(key, &value),
                "type" => folder.preferred_type = AssetType::from_name(&value),
                "name" => folder.name = truncate_at_pipe(&value),
                other => debug!(key = other, "Ignoring inv_object field"),
            }
        }
        Some(folder)
    }

    fn parse_item(&mut self) -> Option<InventoryItem> {
        if !self.open_block() {
            warn!("inv_item without a block");
            return None;
        }
        let mut item = InventoryItem::new(ZERO_ID);

        while let Some((key, value)) = self.advance() {
            match key {
                "}" => break,
                "{" => self.skip_block(),
                "permissions" => self.parse_permissions(&mut item.permissions),
                "sale_info" => self.parse_sale_info(&mut item),
                "item_id" => item.id = parse_uuid(key, &value),
                "parent_id" => item.parent_id = parse_uuid(key, &value),
                "asset_id" => item.asset_id = parse_uuid(key, &value),
                "shadow_id" => {
                    let shadow = parse_uuid(key, &value);
                    item.asset_id = Uuid::from_u128(shadow.as_u128() ^ SHADOW_MAGIC.as_u128());
                }
                "type" => item.asset_type = AssetType::from_name(&value),
                "inv_type" => item.inventory_type = InventoryType::from_name(&value),
                "flags" => item.flags = parse_hex(key, &value),
                "name" => item.name = truncate_at_pipe(&value),
                "desc" => item.description = truncate_at_pipe(&value),
                "creation_date" => {
                    let seconds = value.parse::<i64>().unwrap_or_else(|_| {
                        warn!(value = %value, "Bad creation_date in task inventory");
                        0
                    });
                    item.creation_date = unix_to_datetime(seconds);
                }
                other => debug!(key = other, "Ignoring inv_item field"),
            }
        }
        item.owner_id = item.permissions.owner_id;
        Some(item)
    }

    fn parse_permissions(&mut self, perms: &mut Permissions) {
        if !self.open_block() {
            return;
        }
        while let Some((key, value)) = self.advance() {
            match key {
                "}" => return,
                "{" => self.skip_block(),
                "base_mask" => perms.base_mask = parse_hex(key, &value),
                "owner_mask" => perms.owner_mask = parse_hex(key, &value),
                "group_mask" => perms.group_mask = parse_hex(key, &value),
                "everyone_mask" => perms.everyone_mask = parse_hex(key, &value),
                "next_owner_mask" => perms.next_owner_mask = parse_hex(key, &value),
                "creator_id" => perms.creator_id = parse_uuid(key, &value),
                "owner_id" => perms.owner_id = parse_uuid(key, &value),
                "last_owner_id" => perms.last_owner_id = parse_uuid(key, &value),
                "group_id" => perms.group_id = parse_uuid(key, &value),
                "group_owned" => perms.group_owned = value == "1",
                other => debug!(key = other, "Ignoring permissions field"),
            }
        }
    }

    fn parse_sale_info(&mut self, item: &mut InventoryItem) {
        if !self.open_block() {
            return;
        }
        while let Some((key, value)) = self.advance() {
            match key {
                "}" => return,
                "{" => self.skip_block(),
                "sale_type" => item.sale_type = SaleType::from_name(&value),
                "sale_price" => item.sale_price = value.parse().unwrap_or(0),
                other => debug!(key = other, "Ignoring sale_info field"),
            }
        }
    }
}

/// Names and descriptions carry a trailing mask suffix after `|`
fn truncate_at_pipe(value: &str) -> String {
    value.split('|').next().unwrap_or_default().to_string()
}

fn parse_uuid(key: &str, value: &str) -> Uuid {
    Uuid::parse_str(value).unwrap_or_else(|_| {
        warn!(key, value, "Bad id in task inventory");
        ZERO_ID
    })
}

fn parse_hex(key: &str, value: &str) -> u32 {
    u32::from_str_radix(value, 16).unwrap_or_else(|_| {
        warn!(key, value, "Bad hex value in task inventory");
        0
    })
}
