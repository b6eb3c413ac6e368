mod output;

use clap::{ArgAction, Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use wcferry::client::DEFAULT_ACCEPT_SCENE;
use wcferry::config::Config;
use wcferry::{CmdClient, WsTransport, logging, proto};

use crate::output::{ContactListOutput, RowListOutput};

#[derive(Parser)]
#[command(
    name = "wcf",
    version,
    about = "WeChatFerry command client",
    after_help = "Examples:\n  wcf status\n  wcf contacts friends\n  wcf contacts get --wxid filehelper --json\n  wcf rooms members --room 123456@chatroom\n  wcf db query --db MicroMsg.db --sql \"SELECT UserName, NickName FROM Contact LIMIT 5;\"\n  wcf send text --to filehelper --text \"hello\"\n  wcf send image --to filehelper --path C:/pics/cat.jpg\n  wcf download image --id 123 --extra C:/WeChat/FileStorage/xx.dat --timeout 10"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "Output JSON instead of a table")]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Print the resolved configuration")]
    Config,
    #[command(about = "Show login state and the logged-in account")]
    Status,
    #[command(about = "Show the logged-in account's profile")]
    Me,
    #[command(about = "List message type codes")]
    MsgTypes,
    #[command(about = "List and look up contacts")]
    Contacts {
        #[command(subcommand)]
        command: ContactsCommand,
    },
    #[command(about = "Inspect and manage chat rooms")]
    Rooms {
        #[command(subcommand)]
        command: RoomsCommand,
    },
    #[command(about = "Query the service's databases")]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    #[command(about = "Send messages")]
    Send {
        #[command(subcommand)]
        command: SendCommand,
    },
    #[command(about = "Revoke a sent message")]
    Revoke(MessageIdArgs),
    #[command(about = "Accept a friend request")]
    AcceptFriend(AcceptFriendArgs),
    #[command(about = "Accept a money transfer")]
    ReceiveTransfer(ReceiveTransferArgs),
    #[command(about = "Refresh the moments feed")]
    RefreshPyq(RefreshPyqArgs),
    #[command(about = "Download message attachments")]
    Download {
        #[command(subcommand)]
        command: DownloadCommand,
    },
    #[command(about = "Start or stop the inbound message server")]
    MsgServer {
        #[command(subcommand)]
        command: MsgServerCommand,
    },
}

#[derive(Subcommand)]
enum ContactsCommand {
    #[command(about = "List every contact, room and service account")]
    List,
    #[command(about = "List personal friends only")]
    Friends,
    #[command(about = "List chat rooms only")]
    Rooms,
    #[command(about = "Find a contact in the contact list by wxid")]
    Get(WxidArgs),
    #[command(about = "Ask the service for a contact's details")]
    Info(WxidArgs),
}

#[derive(Args)]
struct WxidArgs {
    #[arg(long, help = "Contact wxid")]
    wxid: String,
}

#[derive(Subcommand)]
enum RoomsCommand {
    #[command(about = "List room members with their display names")]
    Members(RoomArgs),
    #[command(about = "Show a member's display name in a room")]
    Alias(RoomAliasArgs),
    #[command(about = "Add members to a room")]
    Add(RoomMembersArgs),
    #[command(about = "Remove members from a room")]
    Remove(RoomMembersArgs),
    #[command(about = "Invite members to a room")]
    Invite(RoomMembersArgs),
}

#[derive(Args)]
struct RoomArgs {
    #[arg(long, help = "Room id (ends with @chatroom)")]
    room: String,
}

#[derive(Args)]
struct RoomAliasArgs {
    #[arg(long, help = "Room id (ends with @chatroom)")]
    room: String,

    #[arg(long, help = "Member wxid")]
    wxid: String,
}

#[derive(Args)]
struct RoomMembersArgs {
    #[arg(long, help = "Room id (ends with @chatroom)")]
    room: String,

    #[arg(
        long = "wxid",
        value_name = "WXID",
        required = true,
        action = ArgAction::Append,
        value_delimiter = ',',
        help = "Member wxid. Repeatable or comma-separated."
    )]
    wxids: Vec<String>,
}

#[derive(Subcommand)]
enum DbCommand {
    #[command(about = "List database names")]
    Names,
    #[command(about = "List tables of a database")]
    Tables(DbArgs),
    #[command(about = "Run a SQL query")]
    Query(DbQueryArgs),
}

#[derive(Args)]
struct DbArgs {
    #[arg(long, help = "Database name, e.g. MicroMsg.db")]
    db: String,
}

#[derive(Args)]
struct DbQueryArgs {
    #[arg(long, help = "Database name, e.g. MicroMsg.db")]
    db: String,

    #[arg(long, help = "SQL to execute; page large results")]
    sql: String,

    #[arg(long, help = "Merge all rows into one column -> value map")]
    map: bool,
}

#[derive(Subcommand)]
enum SendCommand {
    #[command(about = "Send a text message")]
    Text(SendTextArgs),
    #[command(about = "Send an image")]
    Image(SendPathArgs),
    #[command(about = "Send a file")]
    File(SendPathArgs),
    #[command(about = "Send an emotion (gif/sticker)")]
    Emotion(SendPathArgs),
    #[command(about = "Send an XML card")]
    Xml(SendXmlArgs),
    #[command(about = "Send a rich link card")]
    Rich(SendRichArgs),
    #[command(about = "Pat a room member")]
    Pat(RoomAliasArgs),
    #[command(about = "Forward a message")]
    Forward(ForwardArgs),
}

#[derive(Args)]
struct SendTextArgs {
    #[arg(long, help = "Receiver wxid or room id")]
    to: String,

    #[arg(long, help = "Message text; include one @ per mentioned member")]
    text: String,

    #[arg(
        long = "at",
        value_name = "WXID",
        action = ArgAction::Append,
        value_delimiter = ',',
        help = "Member to mention. Repeatable; notify@all mentions everyone."
    )]
    aters: Vec<String>,
}

#[derive(Args)]
struct SendPathArgs {
    #[arg(long, help = "Receiver wxid or room id")]
    to: String,

    #[arg(long, help = "Path on the machine running the service")]
    path: String,
}

#[derive(Args)]
struct SendXmlArgs {
    #[arg(long, help = "Receiver wxid or room id")]
    to: String,

    #[arg(long, help = "XML content")]
    content: String,

    #[arg(long, default_value = "", help = "Cover image path")]
    path: String,

    #[arg(long = "type", help = "XML type, e.g. 33 (0x21) for mini programs")]
    xml_type: i32,
}

#[derive(Args)]
struct SendRichArgs {
    #[arg(long, help = "Receiver wxid or room id")]
    to: String,

    #[arg(long, help = "Card title")]
    title: String,

    #[arg(long, help = "Link URL")]
    url: String,

    #[arg(long, default_value = "", help = "Summary shown under the title")]
    digest: String,

    #[arg(long, default_value = "", help = "Thumbnail URL")]
    thumb_url: String,

    #[arg(long, default_value = "", help = "Display name of the source account")]
    name: String,

    #[arg(long, default_value = "", help = "Official account id of the source")]
    account: String,
}

#[derive(Args)]
struct ForwardArgs {
    #[arg(long, help = "Message id")]
    id: u64,

    #[arg(long, help = "Receiver wxid or room id")]
    to: String,
}

#[derive(Args)]
struct MessageIdArgs {
    #[arg(long, help = "Message id")]
    id: u64,
}

#[derive(Args)]
struct AcceptFriendArgs {
    #[arg(long, help = "Encrypted user name (v3_...) from the request")]
    v3: String,

    #[arg(long, help = "Ticket (v4_...) from the request")]
    v4: String,

    #[arg(long, default_value_t = DEFAULT_ACCEPT_SCENE, help = "Request scene")]
    scene: i32,
}

#[derive(Args)]
struct ReceiveTransferArgs {
    #[arg(long, help = "Sender wxid")]
    wxid: String,

    #[arg(long, help = "transferid from the transfer message")]
    transfer_id: String,

    #[arg(long, help = "transactionid from the transfer message")]
    transaction_id: String,
}

#[derive(Args)]
struct RefreshPyqArgs {
    #[arg(long, default_value_t = 0, help = "Start id; 0 is the newest page")]
    id: u64,
}

#[derive(Subcommand)]
enum DownloadCommand {
    #[command(about = "Download and decrypt a message image")]
    Image(DownloadImageArgs),
}

#[derive(Args)]
struct DownloadImageArgs {
    #[arg(long, help = "Message id")]
    id: u64,

    #[arg(long, help = "The message's extra field")]
    extra: String,

    #[arg(long, help = "Existing directory to save into (defaults to WCF_DOWNLOAD_DIR)")]
    dir: Option<String>,

    #[arg(long, help = "Seconds to wait (defaults to WCF_DOWNLOAD_TIMEOUT)")]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum MsgServerCommand {
    #[command(about = "Start forwarding inbound messages")]
    Enable(MsgServerEnableArgs),
    #[command(about = "Stop forwarding inbound messages")]
    Disable,
}

#[derive(Args)]
struct MsgServerEnableArgs {
    #[arg(long, help = "Also forward moments")]
    pyq: bool,
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();
    logging::init(&config.log_filter);

    if let Command::Config = cli.command {
        return print_config(&config, cli.json);
    }

    let transport = WsTransport::connect(&config.cmd_url).await?;
    let client = CmdClient::new(transport);

    let result = execute(cli.command, cli.json, &client, &config).await;
    if let Err(error) = client.close().await {
        tracing::debug!(%error, "closing command channel failed");
    }
    result
}

fn print_config(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        output::print_json(config)?;
    } else {
        println!("cmd url:          {}", config.cmd_url);
        println!("download dir:     {}", config.download_dir.display());
        println!("download timeout: {}s", config.download_timeout_secs);
        println!("poll interval:    {}ms", config.poll_interval_ms);
        println!("log filter:       {}", config.log_filter);
    }
    Ok(())
}

async fn execute(
    command: Command,
    json: bool,
    client: &CmdClient<WsTransport>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Config => print_config(config, json)?,
        Command::Status => {
            let logged_in = client.is_login().await?;
            let wxid = if logged_in {
                client.get_self_wxid().await?
            } else {
                String::new()
            };
            if json {
                output::print_json(&serde_json::json!({ "loggedIn": logged_in, "wxid": wxid }))?;
            } else if logged_in {
                println!("Logged in as {wxid}.");
            } else {
                println!("Not logged in.");
            }
        }
        Command::Me => match client.get_user_info().await? {
            Some(info) => {
                if json {
                    output::print_json(&info)?;
                } else {
                    println!("wxid:   {}", info.wxid);
                    println!("name:   {}", info.name);
                    println!("mobile: {}", info.mobile);
                    println!("home:   {}", info.home);
                }
            }
            None => return Err("The service returned no user info".into()),
        },
        Command::MsgTypes => {
            let types = client.get_msg_types().await?;
            output::print_msg_types(&types, json)?;
        }
        Command::Contacts { command } => {
            let contacts = match command {
                ContactsCommand::List => client.get_contacts().await?,
                ContactsCommand::Friends => client.get_friends().await?,
                ContactsCommand::Rooms => client.get_chat_rooms().await?,
                ContactsCommand::Get(args) => match client.find_contact(&args.wxid).await? {
                    Some(contact) => vec![contact],
                    None => return Err(format!("Contact {} not found", args.wxid).into()),
                },
                ContactsCommand::Info(args) => match client.get_info_by_wxid(&args.wxid).await? {
                    Some(contact) => vec![contact],
                    None => return Err(format!("Contact {} not found", args.wxid).into()),
                },
            };
            output::print_contacts(&ContactListOutput::new(contacts), json)?;
        }
        Command::Rooms { command } => match command {
            RoomsCommand::Members(args) => {
                let members = client.get_chat_room_members(&args.room).await?;
                output::print_contacts(&ContactListOutput::new(members), json)?;
            }
            RoomsCommand::Alias(args) => {
                let alias = client.get_alias_in_chat_room(&args.wxid, &args.room).await?;
                if json {
                    output::print_json(&serde_json::json!({ "wxid": args.wxid, "alias": alias }))?;
                } else {
                    println!("{alias}");
                }
            }
            RoomsCommand::Add(args) => {
                client.add_chat_room_members(&args.room, &args.wxids).await?;
                output::print_ack(&format!("Added {} member(s) to {}.", args.wxids.len(), args.room), json)?;
            }
            RoomsCommand::Remove(args) => {
                client.del_chat_room_members(&args.room, &args.wxids).await?;
                output::print_ack(&format!("Removed {} member(s) from {}.", args.wxids.len(), args.room), json)?;
            }
            RoomsCommand::Invite(args) => {
                client.invite_chat_room_members(&args.room, &args.wxids).await?;
                output::print_ack(&format!("Invited {} member(s) to {}.", args.wxids.len(), args.room), json)?;
            }
        },
        Command::Db { command } => match command {
            DbCommand::Names => {
                let names = client.get_db_names().await?;
                output::print_lines(&names, json)?;
            }
            DbCommand::Tables(args) => {
                let tables = client.get_db_tables(&args.db).await?;
                output::print_tables(&tables, json)?;
            }
            DbCommand::Query(args) => {
                if args.map {
                    let map = client.db_sql_query_map(&args.db, &args.sql).await?;
                    output::print_column_map(&map, json)?;
                } else {
                    let rows = client.db_sql_query(&args.db, &args.sql).await?;
                    output::print_rows(&RowListOutput::new(&rows), json)?;
                }
            }
        },
        Command::Send { command } => {
            match command {
                SendCommand::Text(args) => client.send_txt(&args.text, &args.to, &args.aters).await?,
                SendCommand::Image(args) => client.send_img(&args.path, &args.to).await?,
                SendCommand::File(args) => client.send_file(&args.path, &args.to).await?,
                SendCommand::Emotion(args) => client.send_emotion(&args.path, &args.to).await?,
                SendCommand::Xml(args) => {
                    client
                        .send_xml(&args.path, &args.content, &args.to, args.xml_type)
                        .await?
                }
                SendCommand::Rich(args) => {
                    let rich = proto::RichText {
                        name: args.name,
                        account: args.account,
                        title: args.title,
                        digest: args.digest,
                        url: args.url,
                        thumburl: args.thumb_url,
                        receiver: args.to,
                    };
                    client.send_rich_txt(rich).await?
                }
                SendCommand::Pat(args) => client.send_pat_msg(&args.room, &args.wxid).await?,
                SendCommand::Forward(args) => client.forward_msg(args.id, &args.to).await?,
            }
            output::print_ack("Sent.", json)?;
        }
        Command::Revoke(args) => {
            client.revoke_msg(args.id).await?;
            output::print_ack(&format!("Revoked message {}.", args.id), json)?;
        }
        Command::AcceptFriend(args) => {
            client.accept_new_friend(&args.v3, &args.v4, args.scene).await?;
            output::print_ack("Friend request accepted.", json)?;
        }
        Command::ReceiveTransfer(args) => {
            client
                .receive_transfer(&args.wxid, &args.transfer_id, &args.transaction_id)
                .await?;
            output::print_ack("Transfer received.", json)?;
        }
        Command::RefreshPyq(args) => {
            client.refresh_pyq(args.id).await?;
            output::print_ack("Moments refreshed.", json)?;
        }
        Command::Download { command } => match command {
            DownloadCommand::Image(args) => {
                let dir = args
                    .dir
                    .unwrap_or_else(|| config.download_dir.to_string_lossy().into_owned());
                let options = config.download_options(args.timeout);
                let cancel = CancellationToken::new();
                let ctrl_c = {
                    let cancel = cancel.clone();
                    tokio::spawn(async move {
                        if tokio::signal::ctrl_c().await.is_ok() {
                            cancel.cancel();
                        }
                    })
                };
                let result = client
                    .download_image_with(args.id, &args.extra, &dir, &options, &cancel)
                    .await;
                ctrl_c.abort();
                let path = result?;
                if json {
                    output::print_json(&serde_json::json!({ "path": path }))?;
                } else {
                    println!("{path}");
                }
            }
        },
        Command::MsgServer { command } => match command {
            MsgServerCommand::Enable(args) => {
                client.enable_msg_server(args.pyq).await?;
                output::print_ack("Message server enabled.", json)?;
            }
            MsgServerCommand::Disable => {
                client.disable_msg_server().await?;
                output::print_ack("Message server disabled.", json)?;
            }
        },
    }
    Ok(())
}
