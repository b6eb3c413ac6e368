/// Command channel schema, generated from `proto/*.proto` by `build.rs`.
pub mod proto {
    include!(concat!(env!("OUT_DIR"), "/wcf.rs"));
}

pub use proto::Functions;

impl proto::Response {
    /// Status code, or `0` when the reply carries another variant.
    pub fn status(&self) -> i32 {
        match &self.msg {
            Some(proto::response::Msg::Status(status)) => *status,
            _ => 0,
        }
    }

    pub fn str(&self) -> &str {
        match &self.msg {
            Some(proto::response::Msg::Str(value)) => value,
            _ => "",
        }
    }

    pub fn into_str(self) -> String {
        match self.msg {
            Some(proto::response::Msg::Str(value)) => value,
            _ => String::new(),
        }
    }

    pub fn into_contacts(self) -> Vec<proto::RpcContact> {
        match self.msg {
            Some(proto::response::Msg::Contacts(contacts)) => contacts.contacts,
            _ => Vec::new(),
        }
    }

    pub fn into_db_names(self) -> Vec<String> {
        match self.msg {
            Some(proto::response::Msg::Dbs(dbs)) => dbs.names,
            _ => Vec::new(),
        }
    }

    pub fn into_tables(self) -> Vec<proto::DbTable> {
        match self.msg {
            Some(proto::response::Msg::Tables(tables)) => tables.tables,
            _ => Vec::new(),
        }
    }

    pub fn into_rows(self) -> Vec<proto::DbRow> {
        match self.msg {
            Some(proto::response::Msg::Rows(rows)) => rows.rows,
            _ => Vec::new(),
        }
    }

    pub fn into_msg_types(self) -> std::collections::HashMap<i32, String> {
        match self.msg {
            Some(proto::response::Msg::Types(types)) => types.types,
            _ => std::collections::HashMap::new(),
        }
    }

    pub fn into_user_info(self) -> Option<proto::UserInfo> {
        match self.msg {
            Some(proto::response::Msg::Ui(info)) => Some(info),
            _ => None,
        }
    }
}
