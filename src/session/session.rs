use crate::binding::{FromRow, Parameter};
use crate::error::MapperResult;
use crate::mapper::{MapperContract, MapperDispatcher};
use crate::models::WriteResult;
use crate::session::SessionExecutor;
use std::sync::Arc;

/// Typed statement operations.
///
/// A session holds no connection between calls; each operation leases one
/// and returns it before completing. Sessions are cheap to clone.
#[derive(Clone, Debug)]
pub struct Session {
    executor: Arc<SessionExecutor>,
}

impl Session {
    pub(crate) fn new(executor: Arc<SessionExecutor>) -> Self {
        Self { executor }
    }

    /// At most one row, bound onto `R`. More than one row is
    /// [`TooManyResults`](crate::MapperError::TooManyResults).
    pub async fn select_one<P, R>(&self, statement_id: &str, param: &P) -> MapperResult<Option<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        self.executor.select_one(statement_id, param).await
    }

    pub async fn select_list<P, R>(&self, statement_id: &str, param: &P) -> MapperResult<Vec<R>>
    where
        P: Parameter,
        R: FromRow,
    {
        self.executor.select_list(statement_id, param).await
    }

    pub async fn insert<P: Parameter>(&self, statement_id: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.executor.insert(statement_id, param).await
    }

    pub async fn update<P: Parameter>(&self, statement_id: &str, param: &mut P) -> MapperResult<WriteResult> {
        self.executor.update(statement_id, param).await
    }

    pub async fn delete<P: Parameter>(&self, statement_id: &str, param: &P) -> MapperResult<u64> {
        self.executor.delete(statement_id, param).await
    }

    /// Implementation of a repository contract declared with
    /// [`mapper!`](crate::mapper). Every method is checked against its
    /// statement here, so a mismatch fails now rather than on first call.
    pub fn get_mapper<C: MapperContract>(&self) -> MapperResult<C> {
        let dispatcher = MapperDispatcher::new(
            Arc::clone(&self.executor),
            C::NAMESPACE,
            &C::methods(),
        )?;
        Ok(C::from_dispatcher(dispatcher))
    }
}
