//! One backend worker per loaded index.
//!
//! A backend owns its index and an engine registry and answers requests
//! over an in-process request/reply channel pair, keeping each ranker
//! single-threaded relative to its index while backends run in parallel.

use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded, unbounded};
use log::debug;

use crate::error::{Result, TrawlError};
use crate::index::Index;
use crate::query::response::Response;
use crate::query::{EngineRegistry, evaluate};
use crate::server::protocol::{QUERY_TYPE_STATS, QueryRequest, StatsReply};

/// A backend's answer: either a ranked response or a stats report.
#[derive(Debug, Clone)]
pub enum BackendReply {
    Search(Response),
    Stats(StatsReply),
}

struct BackendRequest {
    request: QueryRequest,
    reply: Sender<BackendReply>,
}

/// Handle to a running backend worker.
pub struct Backend {
    tag: String,
    tx: Option<Sender<BackendRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl Backend {
    /// Spawn a worker thread owning `index` and `engines`.
    pub fn spawn(tag: impl Into<String>, index: Index, engines: EngineRegistry) -> Backend {
        let tag = tag.into();
        let (tx, rx) = unbounded::<BackendRequest>();
        let worker_tag = tag.clone();

        let worker = std::thread::spawn(move || {
            for BackendRequest { request, reply } in rx {
                debug!("backend '{}' handling query '{}'", worker_tag, request.id);
                let out = if request.query_type == QUERY_TYPE_STATS {
                    BackendReply::Stats(Self::stats(&index, &request))
                } else {
                    BackendReply::Search(evaluate(
                        &index,
                        &engines,
                        &request.engine,
                        &request.text,
                        request.query_thresh,
                        request.force,
                    ))
                };
                let _ = reply.send(out);
            }
        });

        Backend {
            tag,
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Send one request and wait for its reply.
    pub fn ask(&self, request: QueryRequest) -> Result<BackendReply> {
        let (reply_tx, reply_rx) = bounded(1);
        self.tx
            .as_ref()
            .expect("backend channel open while running")
            .send(BackendRequest {
                request,
                reply: reply_tx,
            })
            .map_err(|_| TrawlError::corrupt("backend worker terminated"))?;
        reply_rx
            .recv()
            .map_err(|_| TrawlError::corrupt("backend worker terminated"))
    }

    fn stats(index: &Index, request: &QueryRequest) -> StatsReply {
        let tokens = match index.analyze_query(&request.text) {
            Ok(tokens) => tokens,
            Err(e) => return StatsReply::error(e.to_string()),
        };
        let Some(first) = tokens.first() else {
            return StatsReply::error("no query terms survived analysis");
        };

        match index.term_report(&first.text) {
            Ok(Some(report)) => StatsReply {
                term: first.text.clone(),
                idf: report.idf,
                df: report.df,
                tf: report.tf,
                posting_list: report.posting_list,
                error: String::new(),
                source: String::new(),
            },
            Ok(None) => StatsReply::error(format!("term '{}' not found", first.text)),
            Err(e) => StatsReply::error(e.to_string()),
        }
    }
}

impl Drop for Backend {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
