#[allow(dead_code)]
mod support;

use std::collections::HashMap;
use std::sync::Arc;

use prost::Message;
use wcferry::proto::{self, Functions, request::Msg as Payload, response::Msg as Reply};
use wcferry::{ClientError, CmdClient};

use support::{Exchange, StubTransport, bytes_row, contact, response, rows, status, text_row};

#[tokio::test]
async fn is_login_maps_status_one_to_true() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 1));
    let client = CmdClient::new(transport);
    assert!(client.is_login().await.expect("is_login"));

    let request = handle.last();
    assert_eq!(request.func(), Functions::FuncIsLogin);
    assert!(request.msg.is_none());

    let (transport, _) = StubTransport::new(|request| status(request.func(), 0));
    assert!(!CmdClient::new(transport).is_login().await.expect("is_login"));
}

#[tokio::test]
async fn string_and_record_projections_pass_values_through() {
    let (transport, _) = StubTransport::new(|request| match request.func() {
        Functions::FuncGetSelfWxid => response(request.func(), Reply::Str("wxid_self".to_string())),
        Functions::FuncGetUserInfo => response(
            request.func(),
            Reply::Ui(proto::UserInfo {
                wxid: "wxid_self".to_string(),
                name: "Me".to_string(),
                mobile: "123".to_string(),
                home: "C:/WeChat Files/".to_string(),
            }),
        ),
        Functions::FuncGetMsgTypes => response(
            request.func(),
            Reply::Types(proto::MsgTypes {
                types: HashMap::from([(1, "text".to_string()), (3, "image".to_string())]),
            }),
        ),
        Functions::FuncGetDbNames => response(
            request.func(),
            Reply::Dbs(proto::DbNames {
                names: vec!["MicroMsg.db".to_string(), "MSG0.db".to_string()],
            }),
        ),
        other => panic!("unexpected {other:?}"),
    });
    let client = CmdClient::new(transport);

    assert_eq!(client.get_self_wxid().await.expect("wxid"), "wxid_self");
    let info = client.get_user_info().await.expect("user info").expect("present");
    assert_eq!(info.name, "Me");
    let types = client.get_msg_types().await.expect("types");
    assert_eq!(types.get(&3).map(String::as_str), Some("image"));
    assert_eq!(
        client.get_db_names().await.expect("db names"),
        vec!["MicroMsg.db".to_string(), "MSG0.db".to_string()]
    );
}

#[tokio::test]
async fn decode_misses_read_as_empty_values() {
    let (transport, _) = StubTransport::new(|request| status(request.func(), 0));
    let client = CmdClient::new(transport);

    assert_eq!(client.get_self_wxid().await.expect("wxid"), "");
    assert!(client.get_user_info().await.expect("user info").is_none());
    assert!(client.get_contacts().await.expect("contacts").is_empty());
    assert!(client.get_db_tables("MicroMsg.db").await.expect("tables").is_empty());
    assert!(client.db_sql_query("MicroMsg.db", "SELECT 1;").await.expect("rows").is_empty());
    assert!(client.get_info_by_wxid("wxid_a").await.expect("info").is_none());
    assert_eq!(client.decrypt_image("a.dat", "C:/out").await.expect("decrypt"), "");
}

#[tokio::test]
async fn send_commands_carry_their_payloads() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 0));
    let client = CmdClient::new(transport);

    client
        .send_txt("hi @A", "123@chatroom", &["wxid_a".to_string(), "wxid_b".to_string()])
        .await
        .expect("send text");
    assert_eq!(
        handle.last().msg,
        Some(Payload::Txt(proto::TextMsg {
            msg: "hi @A".to_string(),
            receiver: "123@chatroom".to_string(),
            aters: "wxid_a,wxid_b".to_string(),
        }))
    );

    client.send_img("C:/a.jpg", "filehelper").await.expect("send image");
    let request = handle.last();
    assert_eq!(request.func(), Functions::FuncSendImg);
    assert_eq!(
        request.msg,
        Some(Payload::File(proto::PathMsg {
            path: "C:/a.jpg".to_string(),
            receiver: "filehelper".to_string(),
        }))
    );

    client.send_file("C:/a.pdf", "filehelper").await.expect("send file");
    assert_eq!(handle.last().func(), Functions::FuncSendFile);

    client.send_emotion("C:/a.gif", "filehelper").await.expect("send emotion");
    assert_eq!(handle.last().func(), Functions::FuncSendEmotion);

    client
        .send_xml("C:/cover.jpg", "<msg/>", "filehelper", 0x21)
        .await
        .expect("send xml");
    assert_eq!(
        handle.last().msg,
        Some(Payload::Xml(proto::XmlMsg {
            receiver: "filehelper".to_string(),
            content: "<msg/>".to_string(),
            path: "C:/cover.jpg".to_string(),
            r#type: 0x21,
        }))
    );

    let rich = proto::RichText {
        title: "title".to_string(),
        url: "https://example.com".to_string(),
        receiver: "filehelper".to_string(),
        ..Default::default()
    };
    client.send_rich_txt(rich.clone()).await.expect("send rich text");
    assert_eq!(handle.last().msg, Some(Payload::Rt(rich)));

    client.enable_msg_server(true).await.expect("enable");
    assert_eq!(handle.last().msg, Some(Payload::Flag(true)));

    client.disable_msg_server().await.expect("disable");
    let request = handle.last();
    assert_eq!(request.func(), Functions::FuncDisableRecvTxt);
    assert!(request.msg.is_none());
}

#[tokio::test]
async fn zero_success_commands_report_other_codes_as_failures() {
    let (transport, _) = StubTransport::new(|request| status(request.func(), -1));
    let client = CmdClient::new(transport);

    let error = client
        .send_txt("hi", "filehelper", &[])
        .await
        .expect_err("negative status fails");
    assert!(matches!(
        error,
        ClientError::Failed {
            function: Functions::FuncSendTxt,
            status: -1
        }
    ));
    assert_eq!(error.status(), Some(-1));

    // a status of one is a failure for zero-success commands
    let (transport, _) = StubTransport::new(|request| status(request.func(), 1));
    let client = CmdClient::new(transport);
    assert!(client.send_img("C:/a.jpg", "filehelper").await.is_err());
}

#[tokio::test]
async fn one_success_commands_follow_their_convention() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 1));
    let client = CmdClient::new(transport);

    client.revoke_msg(42).await.expect("revoke");
    assert_eq!(handle.last().msg, Some(Payload::Ui64(42)));

    client.refresh_pyq(0).await.expect("refresh");
    assert_eq!(handle.last().func(), Functions::FuncRefreshPyq);

    client.accept_new_friend("v3_x", "v4_y", 30).await.expect("accept");
    assert_eq!(
        handle.last().msg,
        Some(Payload::V(proto::Verification {
            v3: "v3_x".to_string(),
            v4: "v4_y".to_string(),
            scene: 30,
        }))
    );

    client.receive_transfer("wxid_a", "tf1", "ta1").await.expect("transfer");
    assert_eq!(
        handle.last().msg,
        Some(Payload::Tf(proto::Transfer {
            wxid: "wxid_a".to_string(),
            tfid: "tf1".to_string(),
            taid: "ta1".to_string(),
        }))
    );

    let wxids = vec!["wxid_a".to_string(), "wxid_b".to_string()];
    client.add_chat_room_members("1@chatroom", &wxids).await.expect("add");
    client.del_chat_room_members("1@chatroom", &wxids).await.expect("del");
    client.invite_chat_room_members("1@chatroom", &wxids).await.expect("invite");
    let request = handle.last();
    assert_eq!(request.func(), Functions::FuncInvRoomMembers);
    assert_eq!(
        request.msg,
        Some(Payload::M(proto::MemberMgmt {
            roomid: "1@chatroom".to_string(),
            wxids: "wxid_a,wxid_b".to_string(),
        }))
    );

    client.send_pat_msg("1@chatroom", "wxid_a").await.expect("pat");
    client.forward_msg(7, "filehelper").await.expect("forward");
    assert_eq!(
        handle.last().msg,
        Some(Payload::Fm(proto::ForwardMsg {
            id: 7,
            receiver: "filehelper".to_string(),
        }))
    );

    // zero is a failure for one-success commands
    let (transport, _) = StubTransport::new(|request| status(request.func(), 0));
    let client = CmdClient::new(transport);
    let error = client.revoke_msg(42).await.expect_err("zero fails");
    assert_eq!(error.status(), Some(0));
}

#[tokio::test]
async fn contact_filters_and_lookups() {
    let contacts = vec![
        contact("wxid_alice", "Alice"),
        contact("123@chatroom", "Room"),
        contact("gh_news", "News"),
        contact("fmessage", "Friend recommendations"),
        contact("wxid_alice", "Alice (dup)"),
        contact("wxid_bob", "Bob"),
    ];
    let (transport, handle) = StubTransport::replying(Reply::Contacts(proto::RpcContacts {
        contacts: contacts.clone(),
    }));
    let client = CmdClient::new(transport);

    let friends: Vec<_> = client
        .get_friends()
        .await
        .expect("friends")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(friends, vec!["Alice", "Alice (dup)", "Bob"]);

    let rooms = client.get_chat_rooms().await.expect("rooms");
    assert_eq!(rooms, vec![contact("123@chatroom", "Room")]);

    let found = client.find_contact("wxid_alice").await.expect("find");
    assert_eq!(found.map(|c| c.name), Some("Alice".to_string()));
    assert!(client.find_contact("wxid_nobody").await.expect("find").is_none());

    let info = client.get_info_by_wxid("wxid_alice").await.expect("info");
    assert_eq!(info.map(|c| c.name), Some("Alice".to_string()));
    assert_eq!(
        handle.last().msg,
        Some(Payload::Str("wxid_alice".to_string()))
    );
    assert_eq!(handle.count(Functions::FuncGetContacts), 4);
}

#[tokio::test]
async fn db_queries_and_map_projection() {
    let (transport, handle) = StubTransport::replying(rows(vec![
        text_row(&[("UserName", "wxid_a"), ("NickName", "first")]),
        text_row(&[("NickName", "second")]),
    ]));
    let client = CmdClient::new(transport);

    let map = client
        .db_sql_query_map("MicroMsg.db", "SELECT UserName, NickName FROM Contact;")
        .await
        .expect("query map");
    assert_eq!(map.get("NickName"), Some(&b"second".to_vec()));
    assert_eq!(map.get("UserName"), Some(&b"wxid_a".to_vec()));
    assert_eq!(
        handle.last().msg,
        Some(Payload::Query(proto::DbQuery {
            db: "MicroMsg.db".to_string(),
            sql: "SELECT UserName, NickName FROM Contact;".to_string(),
        }))
    );

    let (transport, handle) = StubTransport::replying(Reply::Tables(proto::DbTables {
        tables: vec![proto::DbTable {
            name: "Contact".to_string(),
            sql: "CREATE TABLE Contact(...)".to_string(),
        }],
    }));
    let client = CmdClient::new(transport);
    let tables = client.get_db_tables("MicroMsg.db").await.expect("tables");
    assert_eq!(tables[0].name, "Contact");
    assert_eq!(handle.last().msg, Some(Payload::Str("MicroMsg.db".to_string())));
}

#[tokio::test]
async fn requests_survive_the_wire_encoding() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 0));
    let client = CmdClient::new(transport);
    client
        .download_attach(u64::MAX, "thumb.dat", "extra.dat")
        .await
        .expect("download attach");

    let sent = handle.last();
    let decoded = proto::Request::decode(sent.encode_to_vec().as_slice()).expect("decode");
    assert_eq!(decoded, sent);
    assert_eq!(
        decoded.msg,
        Some(Payload::Att(proto::AttachMsg {
            id: u64::MAX,
            thumb: "thumb.dat".to_string(),
            extra: "extra.dat".to_string(),
        }))
    );
}

#[tokio::test]
async fn concurrent_callers_share_one_transport() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 0));
    let client = Arc::new(CmdClient::new(transport));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .send_img(&format!("C:/img{i}.jpg"), "filehelper")
                .await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("send image");
    }
    assert_eq!(handle.count(Functions::FuncSendImg), 16);

    let journal = handle.journal();
    assert_eq!(journal.len(), 32);
    for (seq, pair) in journal.chunks(2).enumerate() {
        assert_eq!(pair, [Exchange::Received(seq), Exchange::Answered(seq)], "{journal:?}");
    }
}

#[tokio::test]
async fn close_releases_the_transport() {
    let (transport, handle) = StubTransport::new(|request| status(request.func(), 1));
    let client = CmdClient::new(transport);
    client.close().await.expect("close");
    assert!(handle.is_closed());

    let error = client.is_login().await.expect_err("closed channel");
    assert!(matches!(error, ClientError::Transport(_)));
}

fn room_blob(members: &[(&str, &str)]) -> Vec<u8> {
    proto::RoomData {
        members: members
            .iter()
            .map(|(wxid, name)| proto::room_data::RoomMember {
                wxid: wxid.to_string(),
                name: name.to_string(),
                state: 0,
            })
            .collect(),
    }
    .encode_to_vec()
}

fn query_of(request: &proto::Request) -> proto::DbQuery {
    match &request.msg {
        Some(Payload::Query(query)) => query.clone(),
        other => panic!("expected a db query, got {other:?}"),
    }
}

#[tokio::test]
async fn room_members_join_room_data_with_nicknames() {
    let blob = room_blob(&[("wxid_a", ""), ("wxid_b", "Bee in room")]);
    let (transport, handle) = StubTransport::new(move |request| {
        let query = query_of(request);
        let reply = if query.sql.contains("FROM Contact") {
            rows(vec![
                text_row(&[("UserName", "wxid_a"), ("NickName", "Alice")]),
                text_row(&[("UserName", "wxid_b"), ("NickName", "Bob")]),
            ])
        } else {
            rows(vec![bytes_row(&[("RoomData", blob.clone())])])
        };
        response(request.func(), reply)
    });
    let client = CmdClient::new(transport);

    let members = client
        .get_chat_room_members("123@chatroom")
        .await
        .expect("members");
    let names: Vec<_> = members
        .iter()
        .map(|member| (member.wxid.as_str(), member.name.as_str()))
        .collect();
    assert_eq!(names, [("wxid_a", "Alice"), ("wxid_b", "Bee in room")]);

    let queries: Vec<_> = handle.requests().iter().map(query_of).collect();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|query| query.db == "MicroMsg.db"));
    assert_eq!(queries[0].sql, "SELECT UserName, NickName FROM Contact;");
    assert_eq!(
        queries[1].sql,
        "SELECT RoomData FROM ChatRoom WHERE ChatRoomName = '123@chatroom';"
    );
}

#[tokio::test]
async fn room_alias_falls_back_to_the_nickname() {
    let blob = room_blob(&[("wxid_a", ""), ("wxid_b", "Bee in room")]);
    let (transport, handle) = StubTransport::new(move |request| {
        let query = query_of(request);
        let reply = if query.sql.contains("FROM Contact") {
            rows(vec![text_row(&[("NickName", "Alice")])])
        } else {
            rows(vec![bytes_row(&[("RoomData", blob.clone())])])
        };
        response(request.func(), reply)
    });
    let client = CmdClient::new(transport);

    let alias = client
        .get_alias_in_chat_room("wxid_a", "123@chatroom")
        .await
        .expect("alias");
    assert_eq!(alias, "Alice");

    let queries: Vec<_> = handle.requests().iter().map(query_of).collect();
    assert_eq!(
        queries[0].sql,
        "SELECT NickName FROM Contact WHERE UserName = 'wxid_a';"
    );
    assert_eq!(
        queries[1].sql,
        "SELECT RoomData FROM ChatRoom WHERE ChatRoomName = '123@chatroom';"
    );
    assert!(queries.iter().all(|query| query.db == "MicroMsg.db"));
}
