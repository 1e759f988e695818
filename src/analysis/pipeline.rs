//! The cooperative filter pipeline used at indexing time.
//!
//! Each filter runs on its own thread, reading one bounded channel and
//! writing the next. A stage terminates when its input closes, dropping
//! its output sender so the shutdown cascades to the tail.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};

use crate::analysis::filter::{Filter, run_filter};
use crate::analysis::token::Token;

/// Queue depth between adjacent stages.
const STAGE_QUEUE: usize = 10;

/// A running pipeline: push tokens into `head`, read filtered tokens from
/// `tail`. Dropping the head sender shuts the stages down in order.
pub struct Pipeline {
    head: Sender<Token>,
    tail: Receiver<Token>,
    stages: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Spawn one thread per filter, chained head to tail. An empty filter
    /// list yields a direct head-to-tail channel.
    pub fn start(filters: Vec<Box<dyn Filter>>) -> Pipeline {
        let (head, mut upstream) = bounded::<Token>(STAGE_QUEUE);
        let mut stages = Vec::with_capacity(filters.len());

        for mut filter in filters {
            let (tx, downstream) = bounded::<Token>(STAGE_QUEUE);
            let rx = upstream;
            stages.push(std::thread::spawn(move || {
                let mut batch = Vec::new();
                for token in rx {
                    run_filter(filter.as_mut(), token, &mut batch);
                    for out in batch.drain(..) {
                        if tx.send(out).is_err() {
                            return;
                        }
                    }
                }
            }));
            upstream = downstream;
        }

        Pipeline {
            head,
            tail: upstream,
            stages,
        }
    }

    pub fn sender(&self) -> Sender<Token> {
        self.head.clone()
    }

    pub fn receiver(&self) -> Receiver<Token> {
        self.tail.clone()
    }

    /// Close the head and wait for every stage to drain.
    pub fn shutdown(self) {
        drop(self.head);
        drop(self.tail);
        for stage in self.stages {
            let _ = stage.join();
        }
    }
}
