//! Room membership lookups built on raw database queries.
//!
//! Membership lives in `MicroMsg.db`: `ChatRoom.RoomData` holds a protobuf
//! [`RoomData`](crate::protocol::proto::RoomData) blob per room, and global
//! nicknames come from `Contact(UserName, NickName)`. Both helpers degrade
//! instead of failing when the blob is missing or undecodable.

use std::collections::HashMap;

use tracing::debug;

use crate::protocol::proto::{DbRow, RoomData, RpcContact};
use crate::rows::{RawField, first_field};

pub const CONTACT_DB: &str = "MicroMsg.db";

pub const ALL_NICKNAMES_SQL: &str = "SELECT UserName, NickName FROM Contact;";

pub fn nickname_sql(wxid: &str) -> String {
    format!(
        "SELECT NickName FROM Contact WHERE UserName = '{}';",
        quote(wxid)
    )
}

pub fn room_data_sql(room_id: &str) -> String {
    format!(
        "SELECT RoomData FROM ChatRoom WHERE ChatRoomName = '{}';",
        quote(room_id)
    )
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

/// `UserName -> NickName` from the all-contacts query.
pub fn nickname_table(rows: &[DbRow]) -> HashMap<String, String> {
    rows.iter()
        .filter_map(|row| {
            let wxid = row.fields.first().map(RawField::new)?;
            let name = row.fields.get(1).map(RawField::new)?;
            Some((wxid.as_text().into_owned(), name.as_text().into_owned()))
        })
        .collect()
}

fn decode_room_data(rows: &[DbRow]) -> Option<RoomData> {
    let field = first_field(rows, 0)?;
    match field.as_structured::<RoomData>() {
        Ok(data) => Some(data),
        Err(error) => {
            debug!(%error, "room data is not decodable");
            None
        }
    }
}

/// Room members with empty in-room names filled from `nicknames`.
pub fn resolve_members(room_rows: &[DbRow], nicknames: &HashMap<String, String>) -> Vec<RpcContact> {
    let Some(room) = decode_room_data(room_rows) else {
        return Vec::new();
    };

    room.members
        .into_iter()
        .map(|member| {
            let name = if member.name.is_empty() {
                nicknames.get(&member.wxid).cloned().unwrap_or_default()
            } else {
                member.name
            };
            RpcContact {
                wxid: member.wxid,
                name,
                ..Default::default()
            }
        })
        .collect()
}

/// In-room alias of `wxid`, falling back to the global nickname.
pub fn resolve_alias(wxid: &str, nickname_rows: &[DbRow], room_rows: &[DbRow]) -> String {
    let nickname = first_field(nickname_rows, 0)
        .map(|field| field.as_text().into_owned())
        .unwrap_or_default();

    let Some(room) = decode_room_data(room_rows) else {
        return nickname;
    };

    room.members
        .into_iter()
        .find(|member| member.wxid == wxid)
        .map(|member| member.name)
        .filter(|name| !name.is_empty())
        .unwrap_or(nickname)
}
