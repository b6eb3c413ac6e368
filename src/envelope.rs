use thiserror::Error;

use crate::protocol::proto::{self, Functions, request::Msg};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("{function:?} does not accept a {found} payload (expected {expected})")]
    PayloadMismatch {
        function: Functions,
        expected: PayloadKind,
        found: PayloadKind,
    },
    #[error("{0:?} is not a callable function")]
    Reserved(Functions),
}

/// Payload variants a request may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    None,
    Str,
    Ui64,
    Flag,
    Txt,
    File,
    Xml,
    Query,
    Verification,
    Transfer,
    Members,
    Attach,
    DecPath,
    RichText,
    Pat,
    Forward,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            PayloadKind::None => "empty",
            PayloadKind::Str => "string",
            PayloadKind::Ui64 => "u64",
            PayloadKind::Flag => "bool",
            PayloadKind::Txt => "text message",
            PayloadKind::File => "path message",
            PayloadKind::Xml => "xml message",
            PayloadKind::Query => "db query",
            PayloadKind::Verification => "verification",
            PayloadKind::Transfer => "transfer",
            PayloadKind::Members => "member list",
            PayloadKind::Attach => "attachment",
            PayloadKind::DecPath => "decrypt path",
            PayloadKind::RichText => "rich text",
            PayloadKind::Pat => "pat message",
            PayloadKind::Forward => "forward message",
        };
        f.write_str(label)
    }
}

impl PayloadKind {
    pub fn of(msg: Option<&Msg>) -> Self {
        match msg {
            None | Some(Msg::Empty(_)) => PayloadKind::None,
            Some(Msg::Str(_)) => PayloadKind::Str,
            Some(Msg::Ui64(_)) => PayloadKind::Ui64,
            Some(Msg::Flag(_)) => PayloadKind::Flag,
            Some(Msg::Txt(_)) => PayloadKind::Txt,
            Some(Msg::File(_)) => PayloadKind::File,
            Some(Msg::Xml(_)) => PayloadKind::Xml,
            Some(Msg::Query(_)) => PayloadKind::Query,
            Some(Msg::V(_)) => PayloadKind::Verification,
            Some(Msg::Tf(_)) => PayloadKind::Transfer,
            Some(Msg::M(_)) => PayloadKind::Members,
            Some(Msg::Att(_)) => PayloadKind::Attach,
            Some(Msg::Dec(_)) => PayloadKind::DecPath,
            Some(Msg::Rt(_)) => PayloadKind::RichText,
            Some(Msg::Pm(_)) => PayloadKind::Pat,
            Some(Msg::Fm(_)) => PayloadKind::Forward,
        }
    }
}

/// How a function reports success through the response status.
///
/// The remote service is not consistent here: sending and the message
/// server toggles answer `0` on success, while most account and room
/// management commands answer `1`. The numbers are passed through as-is;
/// only the interpretation is centralised.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusConvention {
    ZeroIsSuccess,
    OneIsSuccess,
    /// The reply carries data instead of a status.
    Data,
}

impl StatusConvention {
    pub fn is_success(self, status: i32) -> bool {
        match self {
            StatusConvention::ZeroIsSuccess => status == 0,
            StatusConvention::OneIsSuccess => status == 1,
            StatusConvention::Data => true,
        }
    }
}

/// Legal payload and status convention for every function.
pub fn contract(function: Functions) -> Option<(PayloadKind, StatusConvention)> {
    use PayloadKind as P;
    use StatusConvention as S;

    let entry = match function {
        Functions::FuncReserved => return None,
        Functions::FuncIsLogin => (P::None, S::OneIsSuccess),
        Functions::FuncGetSelfWxid => (P::None, S::Data),
        Functions::FuncGetMsgTypes => (P::None, S::Data),
        Functions::FuncGetContacts => (P::None, S::Data),
        Functions::FuncGetDbNames => (P::None, S::Data),
        Functions::FuncGetDbTables => (P::Str, S::Data),
        Functions::FuncGetUserInfo => (P::None, S::Data),
        Functions::FuncSendTxt => (P::Txt, S::ZeroIsSuccess),
        Functions::FuncSendImg => (P::File, S::ZeroIsSuccess),
        Functions::FuncSendFile => (P::File, S::ZeroIsSuccess),
        Functions::FuncSendXml => (P::Xml, S::ZeroIsSuccess),
        Functions::FuncSendEmotion => (P::File, S::ZeroIsSuccess),
        Functions::FuncSendRichTxt => (P::RichText, S::ZeroIsSuccess),
        Functions::FuncSendPatMsg => (P::Pat, S::OneIsSuccess),
        Functions::FuncForwardMsg => (P::Forward, S::OneIsSuccess),
        Functions::FuncEnableRecvTxt => (P::Flag, S::ZeroIsSuccess),
        Functions::FuncDisableRecvTxt => (P::None, S::ZeroIsSuccess),
        Functions::FuncExecDbQuery => (P::Query, S::Data),
        Functions::FuncAcceptFriend => (P::Verification, S::OneIsSuccess),
        Functions::FuncRecvTransfer => (P::Transfer, S::OneIsSuccess),
        Functions::FuncRefreshPyq => (P::Ui64, S::OneIsSuccess),
        Functions::FuncDownloadAttach => (P::Attach, S::ZeroIsSuccess),
        Functions::FuncGetContactInfo => (P::Str, S::Data),
        Functions::FuncRevokeMsg => (P::Ui64, S::OneIsSuccess),
        Functions::FuncDecryptImage => (P::DecPath, S::Data),
        Functions::FuncAddRoomMembers => (P::Members, S::OneIsSuccess),
        Functions::FuncDelRoomMembers => (P::Members, S::OneIsSuccess),
        Functions::FuncInvRoomMembers => (P::Members, S::OneIsSuccess),
    };
    Some(entry)
}

pub fn status_convention(function: Functions) -> StatusConvention {
    contract(function)
        .map(|(_, convention)| convention)
        .unwrap_or(StatusConvention::Data)
}

/// Builds a request, rejecting payloads the function does not take.
pub fn build(function: Functions, msg: Option<Msg>) -> Result<proto::Request, EnvelopeError> {
    let (expected, _) = contract(function).ok_or(EnvelopeError::Reserved(function))?;
    let found = PayloadKind::of(msg.as_ref());
    if found != expected {
        return Err(EnvelopeError::PayloadMismatch {
            function,
            expected,
            found,
        });
    }

    // bare functions go out without a payload, like the reference clients
    let msg = match msg {
        Some(Msg::Empty(_)) => None,
        other => other,
    };
    Ok(proto::Request {
        func: function as i32,
        msg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_registered_payload() {
        let request = build(
            Functions::FuncSendTxt,
            Some(Msg::Txt(proto::TextMsg {
                msg: "hi".to_string(),
                receiver: "filehelper".to_string(),
                aters: String::new(),
            })),
        )
        .expect("text payload is legal");
        assert_eq!(request.func(), Functions::FuncSendTxt);
        assert!(matches!(request.msg, Some(Msg::Txt(_))));
    }

    #[test]
    fn rejects_a_payload_of_the_wrong_kind() {
        let error = build(Functions::FuncRevokeMsg, Some(Msg::Str("42".to_string())))
            .expect_err("revoke takes a u64");
        assert_eq!(
            error,
            EnvelopeError::PayloadMismatch {
                function: Functions::FuncRevokeMsg,
                expected: PayloadKind::Ui64,
                found: PayloadKind::Str,
            }
        );
    }

    #[test]
    fn rejects_missing_payloads() {
        assert!(build(Functions::FuncExecDbQuery, None).is_err());
    }

    #[test]
    fn explicit_empty_is_sent_as_no_payload() {
        let request = build(Functions::FuncIsLogin, Some(Msg::Empty(proto::Empty {})))
            .expect("empty payload is legal");
        assert!(request.msg.is_none());
    }

    #[test]
    fn reserved_function_is_not_callable() {
        assert_eq!(
            build(Functions::FuncReserved, None),
            Err(EnvelopeError::Reserved(Functions::FuncReserved))
        );
    }

    #[test]
    fn status_conventions_follow_the_service() {
        assert!(status_convention(Functions::FuncSendImg).is_success(0));
        assert!(!status_convention(Functions::FuncSendImg).is_success(1));
        assert!(status_convention(Functions::FuncRevokeMsg).is_success(1));
        assert!(!status_convention(Functions::FuncRevokeMsg).is_success(0));
        assert!(status_convention(Functions::FuncDownloadAttach).is_success(0));
        assert!(status_convention(Functions::FuncAddRoomMembers).is_success(1));
        assert_eq!(
            status_convention(Functions::FuncDecryptImage),
            StatusConvention::Data
        );
    }
}
