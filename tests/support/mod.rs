use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use wcferry::proto::{self, Functions, response::Msg as Reply};
use wcferry::{Transport, TransportError};

type Responder = Box<dyn FnMut(&proto::Request) -> proto::Response + Send>;

/// In-memory transport that answers with a scripted responder and keeps
/// every request it saw.
pub struct StubTransport {
    responder: Responder,
    requests: Arc<Mutex<Vec<proto::Request>>>,
    journal: Arc<Mutex<Vec<Exchange>>>,
    closed: Arc<Mutex<bool>>,
}

/// One edge of a round trip, keyed by the order the request arrived in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exchange {
    Received(usize),
    Answered(usize),
}

#[derive(Clone)]
pub struct StubHandle {
    requests: Arc<Mutex<Vec<proto::Request>>>,
    journal: Arc<Mutex<Vec<Exchange>>>,
    closed: Arc<Mutex<bool>>,
}

impl StubTransport {
    pub fn new<F>(responder: F) -> (Self, StubHandle)
    where
        F: FnMut(&proto::Request) -> proto::Response + Send + 'static,
    {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let journal = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));
        let handle = StubHandle {
            requests: requests.clone(),
            journal: journal.clone(),
            closed: closed.clone(),
        };
        (
            Self {
                responder: Box::new(responder),
                requests,
                journal,
                closed,
            },
            handle,
        )
    }

    /// Answers every request with the same reply.
    pub fn replying(reply: Reply) -> (Self, StubHandle) {
        Self::new(move |request| response(request.func(), reply.clone()))
    }
}

impl StubHandle {
    pub fn requests(&self) -> Vec<proto::Request> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, function: Functions) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.func() == function)
            .count()
    }

    pub fn last(&self) -> proto::Request {
        self.requests().pop().expect("at least one request")
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().expect("closed lock")
    }

    pub fn journal(&self) -> Vec<Exchange> {
        self.journal.lock().expect("journal lock").clone()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn call(&mut self, request: proto::Request) -> Result<proto::Response, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let seq = {
            let mut journal = self.journal.lock().expect("journal lock");
            let seq = journal.iter().filter(|e| matches!(e, Exchange::Received(_))).count();
            journal.push(Exchange::Received(seq));
            seq
        };
        // Give other callers a chance to run while this request is outstanding.
        tokio::task::yield_now().await;
        let response = (self.responder)(&request);
        tokio::task::yield_now().await;
        self.requests.lock().expect("requests lock").push(request);
        self.journal
            .lock()
            .expect("journal lock")
            .push(Exchange::Answered(seq));
        Ok(response)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        *self.closed.lock().expect("closed lock") = true;
        Ok(())
    }
}

impl StubTransport {
    fn is_closed(&self) -> bool {
        *self.closed.lock().expect("closed lock")
    }
}

pub fn response(function: Functions, reply: Reply) -> proto::Response {
    proto::Response {
        func: function as i32,
        msg: Some(reply),
    }
}

pub fn status(function: Functions, status: i32) -> proto::Response {
    response(function, Reply::Status(status))
}

pub fn contact(wxid: &str, name: &str) -> proto::RpcContact {
    proto::RpcContact {
        wxid: wxid.to_string(),
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn text_row(values: &[(&str, &str)]) -> proto::DbRow {
    bytes_row(
        &values
            .iter()
            .map(|(column, text)| (*column, text.as_bytes().to_vec()))
            .collect::<Vec<_>>(),
    )
}

pub fn bytes_row(values: &[(&str, Vec<u8>)]) -> proto::DbRow {
    proto::DbRow {
        fields: values
            .iter()
            .map(|(column, content)| proto::DbField {
                r#type: 0,
                column: column.to_string(),
                content: content.clone(),
            })
            .collect(),
    }
}

pub fn rows(rows: Vec<proto::DbRow>) -> Reply {
    Reply::Rows(proto::DbRows { rows })
}
