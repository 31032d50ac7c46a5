//! In-process connection double that records what reaches the store.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use orm_lite::prelude::*;

#[derive(Default)]
struct State {
    statements: RefCell<Vec<(String, Vec<Literal>)>>,
    rows: RefCell<Vec<Row>>,
    failure: RefCell<Option<String>>,
    opened: Cell<usize>,
    committed: Cell<usize>,
    closed: Cell<usize>,
}

/// Records every executed statement; returns scripted rows for queries.
#[derive(Clone, Default)]
pub struct RecordingConnection {
    dialect: Dialect,
    state: Rc<State>,
}

impl RecordingConnection {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            state: Rc::default(),
        }
    }

    /// Rows every query returns.
    pub fn returning(self, rows: Vec<Row>) -> Self {
        *self.state.rows.borrow_mut() = rows;
        self
    }

    /// Make every execute fail with `message`.
    pub fn failing(self, message: &str) -> Self {
        *self.state.failure.borrow_mut() = Some(message.to_string());
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<Literal>)> {
        self.state.statements.borrow().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn opened(&self) -> usize {
        self.state.opened.get()
    }

    pub fn committed(&self) -> usize {
        self.state.committed.get()
    }

    pub fn closed(&self) -> usize {
        self.state.closed.get()
    }
}

pub struct RecordingCursor {
    state: Rc<State>,
}

impl Connection for RecordingConnection {
    type Cursor = RecordingCursor;

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn cursor(&self) -> OrmResult<RecordingCursor> {
        self.state.opened.set(self.state.opened.get() + 1);
        Ok(RecordingCursor {
            state: Rc::clone(&self.state),
        })
    }
}

impl Cursor for RecordingCursor {
    async fn execute(
        &mut self,
        sql: &str,
        params: &[Literal],
        _kind: StatementKind,
    ) -> OrmResult<u64> {
        self.state
            .statements
            .borrow_mut()
            .push((sql.to_string(), params.to_vec()));
        match self.state.failure.borrow().as_deref() {
            Some(message) => Err(OrmError::execution("execute", message)),
            None => Ok(1),
        }
    }

    async fn fetch_all(&mut self) -> OrmResult<Vec<Row>> {
        Ok(self.state.rows.borrow().clone())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        self.state.committed.set(self.state.committed.get() + 1);
        Ok(())
    }

    async fn close(self) -> OrmResult<()> {
        self.state.closed.set(self.state.closed.get() + 1);
        Ok(())
    }
}

orm_lite::entity! {
    pub struct User: "users" {
        id: ("int", "pk"),
        username: ("varchar(255)"),
    }
}

orm_lite::entity! {
    pub struct Post: "posts" {
        id: ("int", "pk"),
        post: ("varchar(255)"),
        user_id: ("int", "fk", "users.id"),
    }
}

pub fn row(columns: &[&str], values: Vec<Value>) -> Row {
    Row::new(columns.iter().map(|c| c.to_string()).collect(), values)
}
