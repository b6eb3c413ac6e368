use serde::Serialize;

use crate::protocol::proto::RpcContact;

pub const CHAT_ROOM_SUFFIX: &str = "@chatroom";
pub const OFFICIAL_ACCOUNT_PREFIX: &str = "gh_";

/// Built-in service accounts that show up in the contact list.
pub const SYSTEM_SERVICES: &[&str] = &[
    "mphelper",
    "fmessage",
    "medianote",
    "floatbottle",
    "filehelper",
    "newsapp",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IdentityKind {
    Friend,
    ChatRoom,
    OfficialAccount,
    SystemService,
}

pub fn classify_identity(wxid: &str) -> IdentityKind {
    if wxid.ends_with(CHAT_ROOM_SUFFIX) {
        IdentityKind::ChatRoom
    } else if wxid.starts_with(OFFICIAL_ACCOUNT_PREFIX) {
        IdentityKind::OfficialAccount
    } else if SYSTEM_SERVICES.contains(&wxid) {
        IdentityKind::SystemService
    } else {
        IdentityKind::Friend
    }
}

pub fn filter_by_kind(contacts: Vec<RpcContact>, kind: IdentityKind) -> Vec<RpcContact> {
    contacts
        .into_iter()
        .filter(|contact| classify_identity(&contact.wxid) == kind)
        .collect()
}

pub fn friends(contacts: Vec<RpcContact>) -> Vec<RpcContact> {
    filter_by_kind(contacts, IdentityKind::Friend)
}

pub fn chat_rooms(contacts: Vec<RpcContact>) -> Vec<RpcContact> {
    filter_by_kind(contacts, IdentityKind::ChatRoom)
}
