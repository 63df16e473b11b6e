//! Scripted command handles for unit tests.

use async_trait::async_trait;
use redis::{Cmd, ErrorKind, Pipeline, RedisError, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::client::CommandExecutor;
use crate::error::{Error, Result};
use crate::load_balancer::Instance;
use crate::pool::PoolStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Nil,
    Fail,
}

/// A handle whose command replies follow a script.
///
/// Once the script runs out every command gets the fallback reply.
/// Failures carry the handle's name as error detail so tests can tell
/// which instance produced them.
pub struct ScriptedExecutor {
    name: String,
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    pub calls: AtomicUsize,
    pub probes: AtomicUsize,
    pub probe_ok: AtomicBool,
    pub fail_close: AtomicBool,
    pub closed: AtomicBool,
    pub stats: Mutex<PoolStats>,
}

impl ScriptedExecutor {
    pub fn new(name: &str, fallback: Reply) -> Arc<Self> {
        Self::with_script(name, [], fallback)
    }

    pub fn with_script(
        name: &str,
        script: impl IntoIterator<Item = Reply>,
        fallback: Reply,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            probe_ok: AtomicBool::new(true),
            fail_close: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            stats: Mutex::new(PoolStats::default()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    fn failure(&self) -> Error {
        Error::Redis(RedisError::from((
            ErrorKind::ResponseError,
            "scripted failure",
            self.name.clone(),
        )))
    }
}

/// Instance wrapping a scripted handle.
pub fn instance(executor: &Arc<ScriptedExecutor>) -> Arc<Instance> {
    Arc::new(Instance::new(executor.name.clone(), executor.clone()))
}

/// Name of the scripted handle that produced `err`.
pub fn failure_source(err: &Error) -> Option<&str> {
    match err {
        Error::Redis(e) => e.detail(),
        _ => None,
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, _cmd: &Cmd) -> Result<Value> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        match reply {
            Reply::Ok => Ok(Value::Okay),
            Reply::Nil => Err(Error::Nil),
            Reply::Fail => Err(self.failure()),
        }
    }

    async fn execute_pipeline(&self, pipe: &Pipeline) -> Result<Vec<Value>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(pipe.cmd_iter().map(|_| Value::Okay).collect())
    }

    async fn probe(&self) -> Result<()> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(self.failure())
        }
    }

    fn pool_stats(&self) -> PoolStats {
        *self.stats.lock().unwrap()
    }

    fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.fail_close.load(Ordering::SeqCst) {
            Err(self.failure())
        } else {
            Ok(())
        }
    }
}
