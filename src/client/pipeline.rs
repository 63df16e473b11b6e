//! Pipelines bound to a single instance.
//!
//! A batch is sent over one connection and cannot be replayed safely on
//! another instance, so pipelines get no failover: the instance is chosen
//! once, when the pipeline is created.

use redis::{Pipeline, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::error::Result;
use crate::load_balancer::Instance;

/// A `redis::Pipeline` together with the instance it will run on.
///
/// Derefs to the pipeline for building.
pub struct BoundPipeline {
    instance: Arc<Instance>,
    pipe: Pipeline,
}

impl fmt::Debug for BoundPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundPipeline")
            .field("addr", &self.instance.addr())
            .field("commands", &self.pipe.cmd_iter().count())
            .finish()
    }
}

impl BoundPipeline {
    pub fn new(instance: Arc<Instance>) -> Self {
        Self {
            instance,
            pipe: redis::pipe(),
        }
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Send every queued command and collect the replies.
    pub async fn exec(self) -> Result<Vec<Value>> {
        self.instance.client().execute_pipeline(&self.pipe).await
    }
}

impl Deref for BoundPipeline {
    type Target = Pipeline;

    fn deref(&self) -> &Self::Target {
        &self.pipe
    }
}

impl DerefMut for BoundPipeline {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.pipe
    }
}
