use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::*;
use serde::{de::DeserializeOwned, Serialize};

use infra::ids::{Entity, Id};
use infra::persistence::{Filter, Storage};

pub trait Request {
    type Resp;
}

pub trait Queryable<Req>
where
    Req: Request,
{
    fn query(&self, req: Req) -> Result<Req::Resp>;
}

pub trait Commandable<Req>
where
    Req: Request,
{
    fn execute(&self, req: Req) -> Result<Req::Resp>;
}

#[derive(Debug)]
pub struct List<T> {
    pub filter: Filter,
    phantom: PhantomData<T>,
}

pub struct Get<T>(pub Id<T>);

#[derive(Debug)]
pub struct Create<T>(pub T);

pub struct Update<T>(pub Id<T>, pub T);

pub struct Delete<T>(pub Id<T>);

#[derive(Debug)]
pub struct Upload<T>(pub Vec<T>);

impl<T> List<T> {
    pub fn all() -> Self {
        List::matching(Filter::all())
    }

    pub fn matching(filter: Filter) -> Self {
        List {
            filter,
            phantom: PhantomData,
        }
    }
}

impl<T> Request for List<T> {
    type Resp = Vec<T>;
}

impl<T> Request for Get<T> {
    type Resp = Option<T>;
}

impl<T> Request for Create<T> {
    type Resp = T;
}

impl<T> Request for Update<T> {
    type Resp = ();
}

impl<T> Request for Delete<T> {
    type Resp = ();
}

impl<T> Request for Upload<T> {
    type Resp = ();
}

/// Record access for every collection the back-office manages. Each request
/// is a single round trip to the storage.
#[derive(Debug)]
pub struct Backend<S> {
    storage: Arc<S>,
}

impl<S> Backend<S> {
    pub fn new(storage: S) -> Self {
        Backend {
            storage: Arc::new(storage),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S> Clone for Backend<S> {
    fn clone(&self) -> Self {
        let storage = self.storage.clone();
        Backend { storage }
    }
}

impl<S: Storage, T: Entity + DeserializeOwned> Queryable<List<T>> for Backend<S> {
    fn query(&self, req: List<T>) -> Result<Vec<T>> {
        debug!("List {} where {:?}", T::PREFIX, req.filter);
        let items = self
            .storage
            .list(&req.filter)
            .with_context(|| format!("list {}", T::PREFIX))?;
        Ok(items)
    }
}

impl<S: Storage, T: Entity + DeserializeOwned> Queryable<Get<T>> for Backend<S> {
    fn query(&self, Get(id): Get<T>) -> Result<Option<T>> {
        debug!("Get {}/{}", T::PREFIX, id);
        let item = self
            .storage
            .load(&id)
            .with_context(|| format!("load {}/{}", T::PREFIX, id))?;
        Ok(item)
    }
}

impl<S: Storage, T: Entity + Serialize + DeserializeOwned> Commandable<Create<T>> for Backend<S> {
    fn execute(&self, Create(doc): Create<T>) -> Result<T> {
        info!("Create in {}", T::PREFIX);
        let saved = self
            .storage
            .create(&doc)
            .with_context(|| format!("create in {}", T::PREFIX))?;
        Ok(saved)
    }
}

impl<S: Storage, T: Entity + Serialize> Commandable<Update<T>> for Backend<S> {
    fn execute(&self, Update(id, doc): Update<T>) -> Result<()> {
        info!("Update {}/{}", T::PREFIX, id);
        self.storage
            .update(&id, &doc)
            .with_context(|| format!("update {}/{}", T::PREFIX, id))?;
        Ok(())
    }
}

impl<S: Storage, T: Entity> Commandable<Delete<T>> for Backend<S> {
    fn execute(&self, Delete(id): Delete<T>) -> Result<()> {
        info!("Delete {}/{}", T::PREFIX, id);
        self.storage
            .delete(&id)
            .with_context(|| format!("delete {}/{}", T::PREFIX, id))?;
        Ok(())
    }
}

impl<S: Storage, T: Entity + Serialize> Commandable<Upload<T>> for Backend<S> {
    fn execute(&self, Upload(docs): Upload<T>) -> Result<()> {
        info!("Upload {} rows to {}", docs.len(), T::PREFIX);
        self.storage
            .upload(&docs)
            .with_context(|| format!("upload to {}", T::PREFIX))?;
        Ok(())
    }
}
