//! The list-plus-form screen shared by every entity: a list fetched from the
//! backend, a working form, and edit mode keyed by record id. Every mutation
//! is followed by a full refetch; nothing is patched into the list locally.

use std::fmt;

use log::*;

use infra::documents::HasMeta;
use infra::ids::{Entity, Id};
use infra::persistence::Filter;

use crate::errors::{user_message, Operation, ValidationError};
use crate::services::{Commandable, Create, Delete, Get, List, Queryable, Update, Upload};

/// A form's working state and how it maps to and from a stored record.
pub trait Form: Clone {
    type Record: Entity + HasMeta + Clone + fmt::Debug;

    /// Required-field and numeric checks; produces the record to send.
    fn to_record(&self) -> Result<Self::Record, ValidationError>;
    /// Working state for editing `record`, keeping any settings this form
    /// was built with.
    fn with_record(&self, record: &Self::Record) -> Self;
    /// The blank form shown after a successful submit.
    fn reset(&self) -> Self;
}

pub struct Screen<F: Form> {
    pub items: Vec<F::Record>,
    pub form: F,
    pub editing: Option<Id<F::Record>>,
    pub error: Option<String>,
    filter: Filter,
}

impl<F: Form> Screen<F> {
    pub fn new(form: F, filter: Filter) -> Self {
        Screen {
            items: Vec::new(),
            form,
            editing: None,
            error: None,
            filter,
        }
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn with_form(self, form: F) -> Self {
        Screen { form, ..self }
    }

    pub fn update_form<G: FnOnce(F) -> F>(self, f: G) -> Self {
        let Screen {
            items,
            form,
            editing,
            error,
            filter,
        } = self;
        Screen {
            items,
            form: f(form),
            editing,
            error,
            filter,
        }
    }

    /// Refetch with a different filter, eg: after a restaurant is picked.
    pub fn with_filter(self, filter: Filter) -> Self {
        Screen { filter, ..self }
    }

    pub fn refresh<B>(self, backend: &B) -> Self
    where
        B: Queryable<List<F::Record>>,
    {
        let req = List::matching(self.filter.clone());
        match Queryable::<List<F::Record>>::query(backend, req) {
            Ok(items) => {
                debug!("Fetched {} {}", items.len(), <F::Record as Entity>::PREFIX);
                Screen { items, ..self }
            }
            Err(e) => self.failed(Operation::Fetch, &e),
        }
    }

    /// Enters edit mode by copying a listed record into the form.
    pub fn edit(self, id: &Id<F::Record>) -> Self {
        let found = self.items.iter().find(|r| r.id() == Some(id)).cloned();
        match found {
            Some(record) => self.editing_record(record),
            None => Screen {
                error: Some("Record not found".to_string()),
                ..self
            },
        }
    }

    /// Enters edit mode with a freshly fetched copy of the record.
    pub fn open<B>(self, id: &Id<F::Record>, backend: &B) -> Self
    where
        B: Queryable<Get<F::Record>>,
    {
        match Queryable::<Get<F::Record>>::query(backend, Get(id.clone())) {
            Ok(Some(record)) => self.editing_record(record),
            Ok(None) => Screen {
                error: Some("Record not found".to_string()),
                ..self
            },
            Err(e) => self.failed(Operation::Fetch, &e),
        }
    }

    fn editing_record(self, record: F::Record) -> Self {
        Screen {
            form: self.form.with_record(&record),
            editing: record.id().cloned(),
            error: None,
            ..self
        }
    }

    pub fn cancel(self) -> Self {
        let form = self.form.reset();
        Screen {
            form,
            editing: None,
            error: None,
            ..self
        }
    }

    /// Update when editing, create otherwise.
    pub fn submit<B>(self, backend: &B) -> Self
    where
        B: Commandable<Create<F::Record>>
            + Commandable<Update<F::Record>>
            + Queryable<List<F::Record>>,
    {
        let record = match self.form.to_record() {
            Ok(record) => record,
            Err(invalid) => return self.failed(Operation::Save, &invalid.into()),
        };
        let res = match self.editing.clone() {
            Some(id) => Commandable::<Update<F::Record>>::execute(backend, Update(id, record)),
            None => Commandable::<Create<F::Record>>::execute(backend, Create(record)).map(|_| ()),
        };
        match res {
            Ok(()) => {
                let form = self.form.reset();
                Screen {
                    form,
                    editing: None,
                    error: None,
                    ..self
                }
                .refresh(backend)
            }
            Err(e) => self.failed(Operation::Save, &e),
        }
    }

    pub fn delete<B>(self, id: &Id<F::Record>, backend: &B) -> Self
    where
        B: Commandable<Delete<F::Record>> + Queryable<List<F::Record>>,
    {
        match Commandable::<Delete<F::Record>>::execute(backend, Delete(id.clone())) {
            Ok(()) => {
                let me = if self.editing.as_ref() == Some(id) {
                    self.cancel()
                } else {
                    Screen { error: None, ..self }
                };
                me.refresh(backend)
            }
            Err(e) => self.failed(Operation::Delete, &e),
        }
    }

    pub fn upload<B>(self, rows: Vec<F::Record>, backend: &B) -> Self
    where
        B: Commandable<Upload<F::Record>> + Queryable<List<F::Record>>,
    {
        if rows.is_empty() {
            return Screen {
                error: Some("Nothing to upload".to_string()),
                ..self
            };
        }
        match Commandable::<Upload<F::Record>>::execute(backend, Upload(rows)) {
            Ok(()) => Screen { error: None, ..self }.refresh(backend),
            Err(e) => self.failed(Operation::Upload, &e),
        }
    }

    fn failed(self, op: Operation, err: &anyhow::Error) -> Self {
        warn!("{:?} {} failed: {:#}", op, <F::Record as Entity>::PREFIX, err);
        Screen {
            error: Some(user_message(op, err)),
            ..self
        }
    }
}

impl<F: Form> Clone for Screen<F> {
    fn clone(&self) -> Self {
        Screen {
            items: self.items.clone(),
            form: self.form.clone(),
            editing: self.editing.clone(),
            error: self.error.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<F: Form + fmt::Debug> fmt::Debug for Screen<F> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Screen")
            .field("items", &self.items)
            .field("form", &self.form)
            .field("editing", &self.editing)
            .field("error", &self.error)
            .field("filter", &self.filter)
            .finish()
    }
}
