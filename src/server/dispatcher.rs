//! The query dispatcher: a serial request/reply loop multiplexing
//! several loaded indexes.
//!
//! For a phrase query the dispatcher walks the request's index
//! preferences in order and returns the first non-error, non-empty
//! response; the final preference is queried with `force` set so the
//! client always receives an answer. Transport errors are logged and the
//! loop continues.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use log::{info, warn};

use crate::error::Result;
use crate::query::response::Response;
use crate::server::backend::{Backend, BackendReply};
use crate::server::protocol::{QUERY_TYPE_STATS, QueryRequest, StatsReply};

pub struct Dispatcher {
    backends: Vec<Backend>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Dispatcher {
            backends: Vec::new(),
        }
    }

    pub fn add_backend(&mut self, backend: Backend) {
        info!("dispatcher serving index '{}'", backend.tag());
        self.backends.push(backend);
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    fn backend(&self, tag: &str) -> Option<&Backend> {
        self.backends.iter().find(|b| b.tag() == tag)
    }

    fn preferences(request: &QueryRequest) -> Vec<String> {
        request
            .index_pref
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Answer a phrase query by walking the preference list.
    fn handle_phrase(&self, request: &QueryRequest) -> Response {
        let prefs = Self::preferences(request);
        if prefs.is_empty() {
            return Response::error("No index preference supplied");
        }

        let mut response =
            Response::error(format!("No loaded indexes could process prefs: {}", request.index_pref));

        for (i, tag) in prefs.iter().enumerate() {
            let Some(backend) = self.backend(tag) else {
                warn!("no loaded index for preference '{tag}'");
                continue;
            };

            let mut forwarded = request.clone();
            if i == prefs.len() - 1 {
                // The last resort always answers.
                forwarded.force = true;
            }

            match backend.ask(forwarded) {
                Ok(BackendReply::Search(mut r)) => {
                    r.source = tag.clone();
                    let failed = r.is_error();
                    response = r;
                    if failed {
                        warn!("index '{tag}' failed [{}]; trying next", response.error);
                        continue;
                    }
                    break;
                }
                Ok(BackendReply::Stats(_)) => {
                    response = Response::error("backend returned a stats reply to a phrase query");
                }
                Err(e) => {
                    warn!("backend '{tag}' unreachable: {e}");
                    response = Response::error(e.to_string());
                }
            }
        }

        response
    }

    /// Answer a stats query from the most preferred loaded index.
    fn handle_stats(&self, request: &QueryRequest) -> StatsReply {
        for tag in Self::preferences(request) {
            let Some(backend) = self.backend(&tag) else {
                continue;
            };
            return match backend.ask(request.clone()) {
                Ok(BackendReply::Stats(mut stats)) => {
                    stats.source = tag;
                    stats
                }
                Ok(BackendReply::Search(_)) => {
                    StatsReply::error("backend returned a search reply to a stats query")
                }
                Err(e) => StatsReply::error(e.to_string()),
            };
        }
        StatsReply::error(format!(
            "No loaded indexes could process prefs: {}",
            request.index_pref
        ))
    }

    /// Handle one request line, returning the reply line.
    pub fn handle_line(&self, line: &str) -> String {
        let request: QueryRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                let response = Response::error(format!("bad request: {e}"));
                return serde_json::to_string(&response).expect("response serialises");
            }
        };

        if request.query_type == QUERY_TYPE_STATS {
            let reply = self.handle_stats(&request);
            serde_json::to_string(&reply).expect("stats reply serialises")
        } else {
            let reply = self.handle_phrase(&request);
            serde_json::to_string(&reply).expect("response serialises")
        }
    }

    fn serve_connection(&self, stream: TcpStream) -> Result<()> {
        let peer = stream.peer_addr()?;
        info!("client connected from {peer}");
        let mut writer = stream.try_clone()?;
        let reader = BufReader::new(stream);

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let reply = self.handle_line(&line);
            writer.write_all(reply.as_bytes())?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        info!("client {peer} disconnected");
        Ok(())
    }

    /// Accept connections forever, one at a time.
    pub fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("dispatcher listening on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = self.serve_connection(stream) {
                        warn!("connection failed: {e}");
                    }
                }
                Err(e) => warn!("accept failed: {e}"),
            }
        }
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
