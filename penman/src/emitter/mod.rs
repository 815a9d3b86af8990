//! Emission state machine.
//!
//! Walks the record sequence once, front to back, and writes bracketed
//! sections into a [`Script`]:
//!
//! ```text
//! AwaitingSourceSystem ──▶ EmittingSourceTables ──▶ EmittingSourceColumns ─┐
//!        ▲                                                                  │
//!        └──────────────────────────────────────────────────────────────────┘
//!        │ (next record is not a source table/column)
//!        ▼
//! AwaitingServingTable ──▶ EmittingServingTables ──▶ EmittingServingColumns ┐
//!        ▲                                                                  │
//!        └──────────────────────────────────────────────────────────────────┘
//!        │ (next record is not a serving table/column)
//!        ▼
//!       Done
//! ```
//!
//! Group ends are never marked in the data. Each phase looks only at the
//! record under the cursor and stops as soon as its role (or, under
//! [`BoundaryPolicy::Split`], its source system) changes. Phases take a
//! cursor and return the advanced cursor; a run is complete when the
//! final cursor equals the number of records.

pub mod script;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EmitError, EmitResult};
use crate::metaload::{self, STATEMENT_PREFIX, STATEMENT_SUFFIX};
use crate::models::{Environment, Literal, Mode, Record, SourceSystem};

pub use script::{banner, Script, ScriptLine, BANNER_WIDTH};

/// Default ceiling on the groups each outer phase may open.
///
/// Every group consumes at least one record, so the limit caps the number
/// of source-system groups (and of serving table groups) per run. Inputs
/// with more groups need a larger `iteration_limit`.
pub const ITERATION_LIMIT: usize = 5000;

/// How adjacent source-table rows of different systems are grouped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Start a new system group whenever `src_name` changes.
    #[default]
    Split,
    /// Only a change of role ends a group; the first row names the system.
    Merge,
}

/// Layout settings for emitted scripts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    pub banner_width: usize,
    pub iteration_limit: usize,
    pub system_boundary: BoundaryPolicy,
    pub statement_prefix: String,
    pub statement_suffix: String,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            banner_width: BANNER_WIDTH,
            iteration_limit: ITERATION_LIMIT,
            system_boundary: BoundaryPolicy::default(),
            statement_prefix: STATEMENT_PREFIX.to_string(),
            statement_suffix: STATEMENT_SUFFIX.to_string(),
        }
    }
}

/// Emitter states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    AwaitingSourceSystem,
    EmittingSourceTables { system: Literal },
    EmittingSourceColumns { system: Literal },
    AwaitingServingTable,
    EmittingServingTables,
    EmittingServingColumns,
    Done,
}

/// Result of a full emission run.
#[derive(Debug, Clone)]
pub struct Emission {
    pub script: Script,
    /// Index of the first unconsumed record.
    pub cursor: usize,
    pub total: usize,
}

impl Emission {
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total
    }
}

/// Drives the state machine over one record sequence.
pub struct Emitter<'a> {
    records: &'a [Record],
    env_id: &'a Literal,
    options: &'a EmitOptions,
    script: Script,
}

impl<'a> Emitter<'a> {
    pub fn new(records: &'a [Record], env_id: &'a Literal, options: &'a EmitOptions) -> Self {
        Self {
            records,
            env_id,
            options,
            script: Script::new(),
        }
    }

    pub fn script(&self) -> &Script {
        &self.script
    }

    fn banner(&mut self, title: &str) {
        self.script
            .push(ScriptLine::Comment(banner(title, self.options.banner_width)));
    }

    fn statement(&mut self, call: String) {
        trace!(statement = %call, "emit");
        let line = metaload::decorate(
            Some(&call),
            &self.options.statement_prefix,
            &self.options.statement_suffix,
        );
        self.script.push(ScriptLine::Statement(line));
    }

    fn set_env(&mut self) {
        self.script.push(ScriptLine::Blank);
        self.statement(metaload::set_env(self.env_id));
    }

    /// Environment selection and source-system registration.
    pub fn emit_general(&mut self, systems: &[SourceSystem]) {
        self.set_env();
        self.banner("ADD SOURCE_SYSTEMS");
        for system in systems {
            self.statement(metaload::add_source_system(system));
        }
        debug!(systems = systems.len(), "source systems emitted");
    }

    fn mode_at(&self, cursor: usize) -> Option<Mode> {
        self.records.get(cursor).map(Record::mode)
    }

    /// Whether the record at `cursor` continues the current run of `mode`.
    fn continues(&self, cursor: usize, mode: Mode, system: Option<&Literal>) -> bool {
        let Some(record) = self.records.get(cursor) else {
            return false;
        };
        if record.mode() != mode {
            return false;
        }
        match (self.options.system_boundary, system) {
            (BoundaryPolicy::Split, Some(system)) => record.source_name() == Some(system),
            _ => true,
        }
    }

    /// Source-system groups, starting at `cursor`. Returns the advanced cursor.
    pub fn emit_source_systems(&mut self, cursor: usize) -> EmitResult<usize> {
        self.drive(State::AwaitingSourceSystem, cursor, |s| {
            matches!(s, State::AwaitingServingTable)
        })
    }

    /// Serving tables and columns, starting at `cursor`. Returns the advanced cursor.
    pub fn emit_serving_layers(&mut self, cursor: usize) -> EmitResult<usize> {
        self.banner("ADD SERVING_LAYERS");
        self.set_env();
        self.drive(State::AwaitingServingTable, cursor, |s| matches!(s, State::Done))
    }

    /// Run both record phases and hand back the script.
    pub fn run(mut self, cursor: usize) -> EmitResult<Emission> {
        let cursor = self.emit_source_systems(cursor)?;
        let cursor = self.emit_serving_layers(cursor)?;
        Ok(Emission {
            script: self.script,
            cursor,
            total: self.records.len(),
        })
    }

    fn drive(
        &mut self,
        mut state: State,
        mut cursor: usize,
        stop: impl Fn(&State) -> bool,
    ) -> EmitResult<usize> {
        let mut groups = 0;
        while !stop(&state) {
            let opens_group = match state {
                State::AwaitingSourceSystem => {
                    self.mode_at(cursor).is_some_and(|m| m.is_source_table_role())
                }
                State::AwaitingServingTable => {
                    self.mode_at(cursor).is_some_and(|m| m.is_serving_role())
                }
                _ => false,
            };
            if opens_group {
                groups += 1;
                if groups > self.options.iteration_limit {
                    return Err(EmitError::RunawayLoop {
                        phase: phase_name(&state),
                        iterations: groups - 1,
                        cursor,
                    });
                }
            }
            let (next, advanced) = self.step(state, cursor)?;
            state = next;
            cursor = advanced;
        }
        Ok(cursor)
    }

    /// One transition. Every state consumes zero or more records.
    pub fn step(&mut self, state: State, cursor: usize) -> EmitResult<(State, usize)> {
        match state {
            State::AwaitingSourceSystem => {
                let system = self
                    .records
                    .get(cursor)
                    .filter(|r| r.mode().is_source_table_role())
                    .and_then(Record::source_name)
                    .cloned();
                match system {
                    Some(system) => {
                        self.banner(&format!("ADD SOURCE_SYSTEM {}", system.bare().replace('\'', "")));
                        self.set_env();
                        Ok((State::EmittingSourceTables { system }, cursor))
                    }
                    None => Ok((State::AwaitingServingTable, cursor)),
                }
            }
            State::EmittingSourceTables { system } => {
                let cursor = self.emit_source_tables(cursor, &system)?;
                Ok((State::EmittingSourceColumns { system }, cursor))
            }
            State::EmittingSourceColumns { system } => {
                let cursor = self.emit_source_columns(cursor, &system)?;
                self.banner(&format!("END SOURCE_SYSTEM {}", system.bare().replace('\'', "")));
                Ok((State::AwaitingSourceSystem, cursor))
            }
            State::AwaitingServingTable => {
                if self.mode_at(cursor).is_some_and(|m| m.is_serving_role()) {
                    Ok((State::EmittingServingTables, cursor))
                } else {
                    self.banner("END SERVING_LAYERS");
                    Ok((State::Done, cursor))
                }
            }
            State::EmittingServingTables => {
                let cursor = self.emit_serving_tables(cursor)?;
                Ok((State::EmittingServingColumns, cursor))
            }
            State::EmittingServingColumns => {
                let cursor = self.emit_serving_columns(cursor)?;
                Ok((State::AwaitingServingTable, cursor))
            }
            State::Done => Ok((State::Done, cursor)),
        }
    }

    fn emit_source_tables(&mut self, mut cursor: usize, system: &Literal) -> EmitResult<usize> {
        let (records, env_id) = (self.records, self.env_id);
        let start = cursor;
        self.banner("ADD SOURCE_TABLES");
        while self.continues(cursor, Mode::SrcTable, Some(system)) {
            if let Record::SourceTable(table) = &records[cursor] {
                self.statement(metaload::add_source_table(env_id, table));
            }
            cursor += 1;
        }
        self.banner("END SOURCE_TABLES");
        debug!(system = %system, tables = cursor - start, "source tables emitted");
        Ok(cursor)
    }

    fn emit_source_columns(&mut self, mut cursor: usize, system: &Literal) -> EmitResult<usize> {
        let (records, env_id) = (self.records, self.env_id);
        let start = cursor;
        self.banner("ADD SOURCE_COLUMNS");
        while self.continues(cursor, Mode::SrcColumn, Some(system)) {
            if let Record::SourceColumn(column) = &records[cursor] {
                self.statement(metaload::add_source_column(env_id, column));
            }
            cursor += 1;
        }
        self.banner("END SOURCE_COLUMNS");
        debug!(system = %system, columns = cursor - start, "source columns emitted");
        Ok(cursor)
    }

    fn emit_serving_tables(&mut self, mut cursor: usize) -> EmitResult<usize> {
        let (records, env_id) = (self.records, self.env_id);
        let start = cursor;
        self.banner("ADD SERVING_TABLES");
        while self.continues(cursor, Mode::ServTable, None) {
            if let Record::ServingTable(table) = &records[cursor] {
                let call = metaload::add_serving_table(env_id, table)
                    .map_err(|source| EmitError::Naming { row: table.row, source })?;
                self.statement(call);
            }
            cursor += 1;
        }
        self.banner("END SERVING_TABLES");
        debug!(tables = cursor - start, "serving tables emitted");
        Ok(cursor)
    }

    fn emit_serving_columns(&mut self, mut cursor: usize) -> EmitResult<usize> {
        let (records, env_id) = (self.records, self.env_id);
        let start = cursor;
        self.banner("ADD SERVING_COLUMNS");
        while self.continues(cursor, Mode::ServColumn, None) {
            if let Record::ServingColumn(column) = &records[cursor] {
                let call = metaload::add_serving_column(env_id, column)
                    .map_err(|source| EmitError::Naming { row: column.row, source })?;
                self.statement(call);
            }
            cursor += 1;
        }
        self.banner("END SERVING_COLUMNS");
        debug!(columns = cursor - start, "serving columns emitted");
        Ok(cursor)
    }
}

fn phase_name(state: &State) -> &'static str {
    match state {
        State::AwaitingServingTable => "serving layers",
        _ => "source systems",
    }
}

/// Emit the complete script: general section, source systems, serving layers.
pub fn emit_script(
    environment: &Environment,
    systems: &[SourceSystem],
    records: &[Record],
    options: &EmitOptions,
) -> EmitResult<Emission> {
    let mut emitter = Emitter::new(records, &environment.env_id, options);
    emitter.emit_general(systems);
    emitter.run(0)
}
