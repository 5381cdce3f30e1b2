//! Mock JSON-RPC node over raw TCP
//!
//! Every connection carries one HTTP request and gets one response with
//! `Connection: close`. Batch requests (JSON arrays) are answered element by
//! element. Behavior is supplied by a handler closure, or by [`MockChain`], a
//! tiny in-memory chain with a transaction pool.

use crate::codec::{blake2_256, parse_hex, to_hex};
use crate::test_utils::metadata::{test_metadata_bytes, TEST_SPEC_VERSION, TEST_TX_VERSION};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// How the node answers one JSON-RPC request
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error {
        code: i64,
        message: String,
        data: Option<Value>,
    },
    /// Accept the request and never answer
    Hang,
    /// Close the connection without answering
    Close,
    /// Answer with a non-200 status
    Status(u16),
}

impl Reply {
    pub fn ok(value: impl Into<Value>) -> Self {
        Reply::Result(value.into())
    }

    pub fn error(code: i64, message: &str) -> Self {
        Reply::Error {
            code,
            message: message.to_string(),
            data: None,
        }
    }

    fn to_json(&self, id: &Value) -> Value {
        match self {
            Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Reply::Error {
                code,
                message,
                data,
            } => {
                let mut error = json!({ "code": code, "message": message });
                if let Some(data) = data {
                    error["data"] = data.clone();
                }
                json!({ "jsonrpc": "2.0", "id": id, "error": error })
            }
            Reply::Hang | Reply::Close | Reply::Status(_) => Value::Null,
        }
    }
}

/// Handler arguments: method, params, and how many times the method was called before
type Handler = dyn Fn(&str, &Value, usize) -> Reply + Send + Sync;

#[derive(Default)]
struct Calls {
    counts: HashMap<String, usize>,
    params: Vec<(String, Value)>,
}

/// A running mock node
pub struct MockNode {
    pub url: String,
    calls: Arc<Mutex<Calls>>,
}

impl MockNode {
    pub async fn start<F>(handler: F) -> MockNode
    where
        F: Fn(&str, &Value, usize) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let calls = Arc::new(Mutex::new(Calls::default()));
        let handler: Arc<Handler> = Arc::new(handler);

        let node_calls = calls.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((socket, _)) => {
                        let handler = handler.clone();
                        let calls = node_calls.clone();
                        tokio::spawn(serve(socket, handler, calls));
                    }
                    Err(_) => break,
                }
            }
        });

        MockNode { url, calls }
    }

    /// Serve a shared [`MockChain`]
    pub async fn chain(chain: Arc<Mutex<MockChain>>) -> MockNode {
        MockNode::start(move |method, params, _| chain.lock().unwrap().reply(method, params)).await
    }

    /// Number of times `method` was called
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .counts
            .get(method)
            .copied()
            .unwrap_or_default()
    }

    /// Params of every call to `method`, in order
    pub fn params(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .params
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

async fn serve(mut socket: TcpStream, handler: Arc<Handler>, calls: Arc<Mutex<Calls>>) {
    let Some(body) = read_request(&mut socket).await else {
        return;
    };
    let Ok(request) = serde_json::from_slice::<Value>(&body) else {
        let _ = respond(&mut socket, 400, "").await;
        return;
    };

    let requests = match &request {
        Value::Array(items) => items.clone(),
        single => vec![single.clone()],
    };
    let mut answers = Vec::with_capacity(requests.len());
    for item in &requests {
        let method = item["method"].as_str().unwrap_or_default().to_string();
        let params = item.get("params").cloned().unwrap_or(Value::Null);
        let nth = {
            let mut calls = calls.lock().unwrap();
            calls.params.push((method.clone(), params.clone()));
            let count = calls.counts.entry(method.clone()).or_default();
            *count += 1;
            *count - 1
        };
        answers.push((item["id"].clone(), handler(&method, &params, nth)));
    }

    for (_, reply) in &answers {
        match reply {
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                return;
            }
            Reply::Close => return,
            Reply::Status(status) => {
                let _ = respond(&mut socket, *status, "").await;
                return;
            }
            _ => {}
        }
    }

    let body = match request {
        Value::Array(_) => Value::Array(
            answers
                .iter()
                .map(|(id, reply)| reply.to_json(id))
                .collect(),
        ),
        _ => answers[0].1.to_json(&answers[0].0),
    };
    let _ = respond(&mut socket, 200, &body.to_string()).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Some(buf[header_end..header_end + content_length].to_vec())
}

async fn respond(socket: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let status_text = match status {
        200 => "200 OK",
        400 => "400 Bad Request",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "502 Bad Gateway",
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

/// In-memory chain with a transaction pool
///
/// Each query for the best header (`chain_getHeader` without params) produces
/// a new block holding the whole pool, and finalizes the block before it.
pub struct MockChain {
    pub spec_version: u32,
    pub pool: Vec<String>,
    /// Extrinsics per block; block 0 is genesis
    pub blocks: Vec<Vec<String>>,
    pub finalized: usize,
    /// Produce blocks on best-header queries
    pub produce_blocks: bool,
    /// Drop pool entries instead of including them
    pub evict_pool: bool,
}

impl Default for MockChain {
    fn default() -> Self {
        MockChain {
            spec_version: TEST_SPEC_VERSION,
            pool: Vec::new(),
            blocks: vec![Vec::new()],
            finalized: 0,
            produce_blocks: true,
            evict_pool: false,
        }
    }
}

impl MockChain {
    pub fn shared() -> Arc<Mutex<MockChain>> {
        Arc::new(Mutex::new(MockChain::default()))
    }

    pub fn block_hash(number: usize) -> String {
        format!("0x{:064x}", number + 0xb10c)
    }

    fn block_number(hash: &str) -> Option<usize> {
        let n = usize::from_str_radix(hash.trim_start_matches("0x"), 16).ok()?;
        n.checked_sub(0xb10c)
    }

    fn header(&self, number: usize) -> Value {
        json!({
            "number": format!("0x{:x}", number),
            "parentHash": MockChain::block_hash(number.saturating_sub(1)),
        })
    }

    fn best(&self) -> usize {
        self.blocks.len() - 1
    }

    fn produce_block(&mut self) {
        let extrinsics = if self.evict_pool {
            self.pool.clear();
            Vec::new()
        } else {
            std::mem::take(&mut self.pool)
        };
        self.blocks.push(extrinsics);
        self.finalized = self.best() - 1;
    }

    fn known(&self, extrinsic: &str) -> bool {
        self.pool.iter().any(|x| x == extrinsic)
            || self.blocks.iter().flatten().any(|x| x == extrinsic)
    }

    pub fn reply(&mut self, method: &str, params: &Value) -> Reply {
        match method {
            "state_getMetadata" => Reply::ok(to_hex(&test_metadata_bytes())),
            "state_getRuntimeVersion" => Reply::ok(json!({
                "specName": "polymesh_testnet",
                "implName": "polymesh_testnet",
                "authoringVersion": 1,
                "specVersion": self.spec_version,
                "implVersion": 0,
                "transactionVersion": TEST_TX_VERSION,
                "stateVersion": 1,
            })),
            "system_chain" => Reply::ok("Polymesh Testnet"),
            "author_submitExtrinsic" => {
                let hex = params[0].as_str().unwrap_or_default().to_string();
                let Ok(bytes) = parse_hex(&hex) else {
                    return Reply::error(1002, "Verification Error: Could not decode extrinsic");
                };
                if self.known(&hex) {
                    return Reply::error(1013, "Transaction Already Imported");
                }
                self.pool.push(hex);
                Reply::ok(to_hex(&blake2_256(&bytes)))
            }
            "author_pendingExtrinsics" => Reply::ok(json!(self.pool)),
            "chain_getHeader" => match params.get(0).and_then(Value::as_str) {
                Some(hash) => match MockChain::block_number(hash).filter(|n| *n <= self.best()) {
                    Some(n) => Reply::ok(self.header(n)),
                    None => Reply::ok(Value::Null),
                },
                None => {
                    if self.produce_blocks {
                        self.produce_block();
                    }
                    Reply::ok(self.header(self.best()))
                }
            },
            "chain_getBlockHash" => match params.get(0).and_then(Value::as_u64) {
                Some(n) if n as usize <= self.best() => {
                    Reply::ok(MockChain::block_hash(n as usize))
                }
                _ => Reply::ok(Value::Null),
            },
            "chain_getBlock" => {
                let number = params
                    .get(0)
                    .and_then(Value::as_str)
                    .and_then(MockChain::block_number)
                    .filter(|n| *n <= self.best());
                match number {
                    Some(n) => Reply::ok(json!({
                        "block": {
                            "header": self.header(n),
                            "extrinsics": self.blocks[n],
                        },
                        "justifications": null,
                    })),
                    None => Reply::ok(Value::Null),
                }
            }
            "chain_getFinalizedHead" => Reply::ok(MockChain::block_hash(self.finalized)),
            _ => Reply::error(-32601, "Method not found"),
        }
    }
}
