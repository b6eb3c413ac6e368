use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::envelope::{self, EnvelopeError};
use crate::identity;
use crate::protocol::proto::{self, Functions, request::Msg};
use crate::room;
use crate::rows;
use crate::transport::{Transport, TransportError};

/// Scene code for friend requests added by scanning a QR code.
pub const DEFAULT_ACCEPT_SCENE: i32 = 30;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("invalid request: {0}")]
    Envelope(#[from] EnvelopeError),
    #[error("{} failed with status {status}", .function.as_str_name())]
    Failed { function: Functions, status: i32 },
}

impl ClientError {
    /// Raw status code for remote failures.
    pub fn status(&self) -> Option<i32> {
        match self {
            ClientError::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Typed command surface over a [`Transport`].
///
/// The transport sits behind a mutex, so a shared client serialises its
/// round trips and every method is safe to call concurrently.
pub struct CmdClient<T> {
    transport: Mutex<T>,
}

impl<T: Transport> CmdClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Mutex::new(transport),
        }
    }

    /// Releases the command channel. Later calls fail at the transport.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.transport.lock().await.close().await?;
        Ok(())
    }

    pub async fn call(&self, function: Functions, msg: Option<Msg>) -> Result<proto::Response, ClientError> {
        let request = envelope::build(function, msg)?;
        let response = {
            let mut transport = self.transport.lock().await;
            transport.call(request).await?
        };
        debug!(function = function.as_str_name(), status = response.status(), "command completed");
        Ok(response)
    }

    async fn call_status(&self, function: Functions, msg: Option<Msg>) -> Result<(), ClientError> {
        let status = self.call(function, msg).await?.status();
        if envelope::status_convention(function).is_success(status) {
            Ok(())
        } else {
            Err(ClientError::Failed { function, status })
        }
    }

    pub async fn is_login(&self) -> Result<bool, ClientError> {
        let response = self.call(Functions::FuncIsLogin, None).await?;
        Ok(response.status() == 1)
    }

    pub async fn get_self_wxid(&self) -> Result<String, ClientError> {
        Ok(self.call(Functions::FuncGetSelfWxid, None).await?.into_str())
    }

    pub async fn get_user_info(&self) -> Result<Option<proto::UserInfo>, ClientError> {
        Ok(self.call(Functions::FuncGetUserInfo, None).await?.into_user_info())
    }

    pub async fn get_msg_types(&self) -> Result<HashMap<i32, String>, ClientError> {
        Ok(self.call(Functions::FuncGetMsgTypes, None).await?.into_msg_types())
    }

    pub async fn get_contacts(&self) -> Result<Vec<proto::RpcContact>, ClientError> {
        Ok(self.call(Functions::FuncGetContacts, None).await?.into_contacts())
    }

    /// Personal contacts: no rooms, official accounts or built-in services.
    pub async fn get_friends(&self) -> Result<Vec<proto::RpcContact>, ClientError> {
        Ok(identity::friends(self.get_contacts().await?))
    }

    pub async fn get_chat_rooms(&self) -> Result<Vec<proto::RpcContact>, ClientError> {
        Ok(identity::chat_rooms(self.get_contacts().await?))
    }

    /// First contact in the full list with this identity.
    pub async fn find_contact(&self, wxid: &str) -> Result<Option<proto::RpcContact>, ClientError> {
        let contacts = self.get_contacts().await?;
        Ok(contacts.into_iter().find(|contact| contact.wxid == wxid))
    }

    /// Asks the service for a single contact's details.
    pub async fn get_info_by_wxid(&self, wxid: &str) -> Result<Option<proto::RpcContact>, ClientError> {
        let response = self
            .call(Functions::FuncGetContactInfo, Some(Msg::Str(wxid.to_string())))
            .await?;
        Ok(response.into_contacts().into_iter().next())
    }

    pub async fn get_db_names(&self) -> Result<Vec<String>, ClientError> {
        Ok(self.call(Functions::FuncGetDbNames, None).await?.into_db_names())
    }

    pub async fn get_db_tables(&self, db: &str) -> Result<Vec<proto::DbTable>, ClientError> {
        let response = self
            .call(Functions::FuncGetDbTables, Some(Msg::Str(db.to_string())))
            .await?;
        Ok(response.into_tables())
    }

    /// Runs SQL against one of the service's databases. Page large results.
    pub async fn db_sql_query(&self, db: &str, sql: &str) -> Result<Vec<proto::DbRow>, ClientError> {
        let query = proto::DbQuery {
            db: db.to_string(),
            sql: sql.to_string(),
        };
        let response = self.call(Functions::FuncExecDbQuery, Some(Msg::Query(query))).await?;
        Ok(response.into_rows())
    }

    /// [`Self::db_sql_query`] flattened by column; see [`rows::rows_to_map`].
    pub async fn db_sql_query_map(&self, db: &str, sql: &str) -> Result<HashMap<String, Vec<u8>>, ClientError> {
        Ok(rows::rows_to_map(self.db_sql_query(db, sql).await?))
    }

    /// Sends text to a contact or room. Each wxid in `aters` needs a matching
    /// `@` in `msg`; `notify@all` mentions everyone.
    pub async fn send_txt(&self, msg: &str, receiver: &str, aters: &[String]) -> Result<(), ClientError> {
        let txt = proto::TextMsg {
            msg: msg.to_string(),
            receiver: receiver.to_string(),
            aters: aters.join(","),
        };
        self.call_status(Functions::FuncSendTxt, Some(Msg::Txt(txt))).await
    }

    pub async fn send_img(&self, path: &str, receiver: &str) -> Result<(), ClientError> {
        self.call_status(Functions::FuncSendImg, Some(path_msg(path, receiver)))
            .await
    }

    pub async fn send_file(&self, path: &str, receiver: &str) -> Result<(), ClientError> {
        self.call_status(Functions::FuncSendFile, Some(path_msg(path, receiver)))
            .await
    }

    pub async fn send_emotion(&self, path: &str, receiver: &str) -> Result<(), ClientError> {
        self.call_status(Functions::FuncSendEmotion, Some(path_msg(path, receiver)))
            .await
    }

    /// `xml_type` selects the card kind, e.g. `0x21` for mini programs.
    pub async fn send_xml(&self, path: &str, content: &str, receiver: &str, xml_type: i32) -> Result<(), ClientError> {
        let xml = proto::XmlMsg {
            receiver: receiver.to_string(),
            content: content.to_string(),
            path: path.to_string(),
            r#type: xml_type,
        };
        self.call_status(Functions::FuncSendXml, Some(Msg::Xml(xml))).await
    }

    pub async fn send_rich_txt(&self, rich: proto::RichText) -> Result<(), ClientError> {
        self.call_status(Functions::FuncSendRichTxt, Some(Msg::Rt(rich)))
            .await
    }

    pub async fn send_pat_msg(&self, room_id: &str, wxid: &str) -> Result<(), ClientError> {
        let pat = proto::PatMsg {
            roomid: room_id.to_string(),
            wxid: wxid.to_string(),
        };
        self.call_status(Functions::FuncSendPatMsg, Some(Msg::Pm(pat))).await
    }

    pub async fn forward_msg(&self, msg_id: u64, receiver: &str) -> Result<(), ClientError> {
        let forward = proto::ForwardMsg {
            id: msg_id,
            receiver: receiver.to_string(),
        };
        self.call_status(Functions::FuncForwardMsg, Some(Msg::Fm(forward)))
            .await
    }

    pub async fn revoke_msg(&self, msg_id: u64) -> Result<(), ClientError> {
        self.call_status(Functions::FuncRevokeMsg, Some(Msg::Ui64(msg_id)))
            .await
    }

    /// `v3`/`v4` and `scene` come from the friend request message.
    pub async fn accept_new_friend(&self, v3: &str, v4: &str, scene: i32) -> Result<(), ClientError> {
        let verification = proto::Verification {
            v3: v3.to_string(),
            v4: v4.to_string(),
            scene,
        };
        self.call_status(Functions::FuncAcceptFriend, Some(Msg::V(verification)))
            .await
    }

    pub async fn receive_transfer(&self, wxid: &str, transfer_id: &str, transaction_id: &str) -> Result<(), ClientError> {
        let transfer = proto::Transfer {
            wxid: wxid.to_string(),
            tfid: transfer_id.to_string(),
            taid: transaction_id.to_string(),
        };
        self.call_status(Functions::FuncRecvTransfer, Some(Msg::Tf(transfer)))
            .await
    }

    /// Refreshes the moments feed starting at `id`; `0` is the newest page.
    pub async fn refresh_pyq(&self, id: u64) -> Result<(), ClientError> {
        self.call_status(Functions::FuncRefreshPyq, Some(Msg::Ui64(id)))
            .await
    }

    pub async fn add_chat_room_members(&self, room_id: &str, wxids: &[String]) -> Result<(), ClientError> {
        self.call_status(Functions::FuncAddRoomMembers, Some(members_msg(room_id, wxids)))
            .await
    }

    pub async fn del_chat_room_members(&self, room_id: &str, wxids: &[String]) -> Result<(), ClientError> {
        self.call_status(Functions::FuncDelRoomMembers, Some(members_msg(room_id, wxids)))
            .await
    }

    pub async fn invite_chat_room_members(&self, room_id: &str, wxids: &[String]) -> Result<(), ClientError> {
        self.call_status(Functions::FuncInvRoomMembers, Some(members_msg(room_id, wxids)))
            .await
    }

    /// Members of a room with their in-room names, or the global nickname
    /// when they never set one. Empty when the room data cannot be read.
    pub async fn get_chat_room_members(&self, room_id: &str) -> Result<Vec<proto::RpcContact>, ClientError> {
        let users = self
            .db_sql_query(room::CONTACT_DB, room::ALL_NICKNAMES_SQL)
            .await?;
        let nicknames = room::nickname_table(&users);
        let rooms = self
            .db_sql_query(room::CONTACT_DB, &room::room_data_sql(room_id))
            .await?;
        Ok(room::resolve_members(&rooms, &nicknames))
    }

    /// Display name of `wxid` inside a room, falling back to the global nickname.
    pub async fn get_alias_in_chat_room(&self, wxid: &str, room_id: &str) -> Result<String, ClientError> {
        let users = self
            .db_sql_query(room::CONTACT_DB, &room::nickname_sql(wxid))
            .await?;
        let rooms = self
            .db_sql_query(room::CONTACT_DB, &room::room_data_sql(room_id))
            .await?;
        Ok(room::resolve_alias(wxid, &users, &rooms))
    }

    /// Starts a background transfer; poll with [`Self::decrypt_image`] or
    /// use [`Self::download_image`].
    pub async fn download_attach(&self, msg_id: u64, thumb: &str, extra: &str) -> Result<(), ClientError> {
        let attach = proto::AttachMsg {
            id: msg_id,
            thumb: thumb.to_string(),
            extra: extra.to_string(),
        };
        self.call_status(Functions::FuncDownloadAttach, Some(Msg::Att(attach)))
            .await
    }

    /// Decrypts a downloaded image into `dir`. Empty until the transfer
    /// started by [`Self::download_attach`] has landed.
    pub async fn decrypt_image(&self, src: &str, dir: &str) -> Result<String, ClientError> {
        let dec = proto::DecPath {
            src: src.to_string(),
            dst: dir.to_string(),
        };
        Ok(self
            .call(Functions::FuncDecryptImage, Some(Msg::Dec(dec)))
            .await?
            .into_str())
    }

    /// Starts pushing inbound messages; `pyq` includes moments.
    pub async fn enable_msg_server(&self, pyq: bool) -> Result<(), ClientError> {
        self.call_status(Functions::FuncEnableRecvTxt, Some(Msg::Flag(pyq)))
            .await
    }

    pub async fn disable_msg_server(&self) -> Result<(), ClientError> {
        self.call_status(Functions::FuncDisableRecvTxt, None).await
    }
}

fn path_msg(path: &str, receiver: &str) -> Msg {
    Msg::File(proto::PathMsg {
        path: path.to_string(),
        receiver: receiver.to_string(),
    })
}

fn members_msg(room_id: &str, wxids: &[String]) -> Msg {
    Msg::M(proto::MemberMgmt {
        roomid: room_id.to_string(),
        wxids: wxids.join(","),
    })
}
