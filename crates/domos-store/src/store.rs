//! The [`Store`]: every query the hub and the engines run
//!
//! One `Store` wraps one SQLite connection. Methods follow a naming
//! convention: `get_*` looks up by id and treats a missing row as
//! [`StoreError::NotFound`], `find_*` looks up by natural key and returns
//! `Option`. Compound writes go through [`Store::with_tx`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, types::Type, Connection, Row};
use tracing::{debug, info};

use domos_core::{
    ActionId, EdgeId, ExpressionId, ModuleDescriptor, ModuleId, RpcArgId, RpcId, RpcKind,
    SensorId, TriggerActionId, TriggerId,
};

use crate::error::{StoreError, StoreResult};
use crate::models::{
    Action, ActionArg, HistoryRecord, Module, ModuleRpc, NewSensor, RpcArg, Sensor,
    SensorArgValue, SensorEdge, SensorListing, Trigger, TriggerAction, TriggerEdge,
};
use crate::schema::SCHEMA;

/// One session against the hub database.
///
/// Workers never share a session; each opens its own `Store` against the
/// same file and coordinates through the database. WAL mode plus the busy
/// timeout make that layout safe.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open the database at `path`, creating it (and its parent directory)
    /// if needed, and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "store opened");
        Ok(store)
    }

    /// An in-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            PRAGMA foreign_keys = ON;
        "#,
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Run `f` inside a transaction: commit on `Ok`, roll back on `Err`.
    ///
    /// The error type only needs a conversion from [`StoreError`], so callers
    /// can run their own validation inside the transaction. Transactions do
    /// not nest; `f` must only call plain store methods.
    pub fn with_tx<T, E: From<StoreError>>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let tx = self.conn.unchecked_transaction().map_err(StoreError::from)?;
        let out = f(self)?;
        tx.commit().map_err(StoreError::from)?;
        Ok(out)
    }

    // Modules and their RPCs

    /// Persist a registration descriptor: the module row plus every RPC and
    /// RPC argument, in one transaction.
    pub fn add_module(&self, desc: &ModuleDescriptor) -> StoreResult<ModuleId> {
        self.with_tx(|s| {
            s.conn.execute(
                "INSERT INTO modules (name, queue, descr) VALUES (?1, ?2, ?3)",
                params![desc.name, desc.queue, desc.descr],
            )?;
            let module_id = ModuleId::new(s.conn.last_insert_rowid());
            for rpc in &desc.rpcs {
                s.conn.execute(
                    "INSERT INTO module_rpcs (module_id, kind, key, descr)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![module_id.as_i64(), rpc.kind.as_str(), rpc.key, rpc.descr],
                )?;
                let rpc_id = s.conn.last_insert_rowid();
                for arg in &rpc.args {
                    s.conn.execute(
                        "INSERT INTO rpc_args (rpc_id, name, arg_type, optional, descr)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![rpc_id, arg.name, arg.arg_type, arg.optional, arg.descr],
                    )?;
                }
            }
            debug!(module = %desc.name, id = %module_id, "module stored");
            Ok(module_id)
        })
    }

    pub fn get_module(&self, id: ModuleId) -> StoreResult<Module> {
        self.query_opt(
            "SELECT id, name, queue, active, descr FROM modules WHERE id = ?1",
            params![id.as_i64()],
            module_from_row,
        )?
        .ok_or_else(|| StoreError::not_found("module", id.as_i64()))
    }

    pub fn find_module(&self, name: &str) -> StoreResult<Option<Module>> {
        self.query_opt(
            "SELECT id, name, queue, active, descr FROM modules WHERE name = ?1",
            params![name],
            module_from_row,
        )
    }

    pub fn list_modules(&self) -> StoreResult<Vec<Module>> {
        self.query_vec(
            "SELECT id, name, queue, active, descr FROM modules ORDER BY name",
            [],
            module_from_row,
        )
    }

    pub fn set_module_active(&self, id: ModuleId, active: bool) -> StoreResult<()> {
        let n = self.conn.execute(
            "UPDATE modules SET active = ?2 WHERE id = ?1",
            params![id.as_i64(), active],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("module", id.as_i64()));
        }
        Ok(())
    }

    pub fn module_rpcs(&self, module_id: ModuleId) -> StoreResult<Vec<ModuleRpc>> {
        self.query_vec(
            "SELECT id, module_id, kind, key, descr FROM module_rpcs
             WHERE module_id = ?1 ORDER BY id",
            params![module_id.as_i64()],
            rpc_from_row,
        )
    }

    /// The dispatch key of the module's first RPC of `kind`, if it has one.
    pub fn rpc_key(&self, module_id: ModuleId, kind: RpcKind) -> StoreResult<Option<String>> {
        self.query_opt(
            "SELECT key FROM module_rpcs WHERE module_id = ?1 AND kind = ?2
             ORDER BY id LIMIT 1",
            params![module_id.as_i64(), kind.as_str()],
            |row| row.get(0),
        )
    }

    pub fn rpc_args(&self, rpc_id: RpcId) -> StoreResult<Vec<RpcArg>> {
        self.query_vec(
            "SELECT id, rpc_id, name, arg_type, optional, descr FROM rpc_args
             WHERE rpc_id = ?1 ORDER BY id",
            params![rpc_id.as_i64()],
            rpc_arg_from_row,
        )
    }

    /// Look up a declared argument on the module's RPC of the given kind.
    pub fn find_rpc_arg(
        &self,
        module_id: ModuleId,
        kind: RpcKind,
        name: &str,
    ) -> StoreResult<Option<RpcArg>> {
        self.query_opt(
            "SELECT a.id, a.rpc_id, a.name, a.arg_type, a.optional, a.descr
             FROM rpc_args a
             JOIN module_rpcs r ON r.id = a.rpc_id
             WHERE r.module_id = ?1 AND r.kind = ?2 AND a.name = ?3
             ORDER BY a.id LIMIT 1",
            params![module_id.as_i64(), kind.as_str(), name],
            rpc_arg_from_row,
        )
    }

    // Sensors and their history

    /// Insert a sensor plus its provisioning arguments, in one transaction.
    pub fn add_sensor(&self, module_id: ModuleId, new: &NewSensor) -> StoreResult<SensorId> {
        self.with_tx(|s| {
            s.get_module(module_id)?;
            s.conn.execute(
                "INSERT INTO sensors (module_id, ident, instant, descr)
                 VALUES (?1, ?2, ?3, ?4)",
                params![module_id.as_i64(), new.ident, new.instant, new.descr],
            )?;
            let sensor_id = SensorId::new(s.conn.last_insert_rowid());
            for (rpc_arg, value) in &new.args {
                s.conn.execute(
                    "INSERT INTO sensor_args (sensor_id, rpc_arg_id, value)
                     VALUES (?1, ?2, ?3)",
                    params![sensor_id.as_i64(), rpc_arg.as_i64(), value],
                )?;
            }
            debug!(sensor = %new.ident, id = %sensor_id, "sensor stored");
            Ok(sensor_id)
        })
    }

    pub fn get_sensor(&self, id: SensorId) -> StoreResult<Sensor> {
        self.query_opt(
            "SELECT id, module_id, ident, active, instant, descr FROM sensors WHERE id = ?1",
            params![id.as_i64()],
            sensor_from_row,
        )?
        .ok_or_else(|| StoreError::not_found("sensor", id.as_i64()))
    }

    /// First sensor with the given ident, searching across all modules.
    pub fn find_sensor_by_ident(&self, ident: &str) -> StoreResult<Option<Sensor>> {
        self.query_opt(
            "SELECT id, module_id, ident, active, instant, descr FROM sensors
             WHERE ident = ?1 ORDER BY id LIMIT 1",
            params![ident],
            sensor_from_row,
        )
    }

    pub fn module_sensors(&self, module_id: ModuleId) -> StoreResult<Vec<Sensor>> {
        self.query_vec(
            "SELECT id, module_id, ident, active, instant, descr FROM sensors
             WHERE module_id = ?1 ORDER BY id",
            params![module_id.as_i64()],
            sensor_from_row,
        )
    }

    /// All sensors joined with their module's name, optionally filtered to
    /// one module.
    pub fn list_sensors(&self, module: Option<&str>) -> StoreResult<Vec<SensorListing>> {
        const BASE: &str = "SELECT s.id, s.module_id, s.ident, s.active, s.instant, s.descr, \
                            m.name FROM sensors s JOIN modules m ON m.id = s.module_id";
        match module {
            Some(name) => self.query_vec(
                &format!("{BASE} WHERE m.name = ?1 ORDER BY m.name, s.ident"),
                params![name],
                listing_from_row,
            ),
            None => self.query_vec(
                &format!("{BASE} ORDER BY m.name, s.ident"),
                [],
                listing_from_row,
            ),
        }
    }

    /// Provisioning arguments of a sensor, joined with the RPC argument
    /// names they satisfy.
    pub fn sensor_args(&self, sensor_id: SensorId) -> StoreResult<Vec<SensorArgValue>> {
        self.query_vec(
            "SELECT ra.name, sa.value FROM sensor_args sa
             JOIN rpc_args ra ON ra.id = sa.rpc_arg_id
             WHERE sa.sensor_id = ?1 ORDER BY sa.id",
            params![sensor_id.as_i64()],
            |row| {
                Ok(SensorArgValue {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            },
        )
    }

    pub fn set_sensor_active(&self, id: SensorId, active: bool) -> StoreResult<()> {
        let n = self.conn.execute(
            "UPDATE sensors SET active = ?2 WHERE id = ?1",
            params![id.as_i64(), active],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("sensor", id.as_i64()));
        }
        Ok(())
    }

    /// Append one history record. The caller supplies the timestamp so that
    /// replays and tests stay deterministic.
    pub fn add_sensor_value(
        &self,
        sensor_id: SensorId,
        value: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO sensor_values (sensor_id, value, timestamp) VALUES (?1, ?2, ?3)",
            params![sensor_id.as_i64(), value, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Newest-first history. Ties on timestamp break on insertion order.
    pub fn sensor_history(
        &self,
        sensor_id: SensorId,
        limit: usize,
    ) -> StoreResult<Vec<HistoryRecord>> {
        self.query_vec(
            "SELECT value, timestamp FROM sensor_values WHERE sensor_id = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
            params![sensor_id.as_i64(), limit as i64],
            history_from_row,
        )
    }

    // Expressions and their dependency edges

    pub fn add_expression(&self, text: &str) -> StoreResult<ExpressionId> {
        self.conn
            .execute("INSERT INTO expressions (text) VALUES (?1)", params![text])?;
        Ok(ExpressionId::new(self.conn.last_insert_rowid()))
    }

    pub fn expression_text(&self, id: ExpressionId) -> StoreResult<String> {
        self.query_opt(
            "SELECT text FROM expressions WHERE id = ?1",
            params![id.as_i64()],
            |row| row.get(0),
        )?
        .ok_or_else(|| StoreError::not_found("expression", id.as_i64()))
    }

    /// Rewrite stored formula text. Called once per expression, while the
    /// defining transaction replaces `{name}` placeholders with edge tokens;
    /// expressions are immutable afterwards.
    pub fn set_expression_text(&self, id: ExpressionId, text: &str) -> StoreResult<()> {
        let n = self.conn.execute(
            "UPDATE expressions SET text = ?2 WHERE id = ?1",
            params![id.as_i64(), text],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("expression", id.as_i64()));
        }
        Ok(())
    }

    /// Insert a sensor dependency edge. The returned [`EdgeId`] is the
    /// number embedded in the expression's `__sens<id>__` token. The source
    /// sensor must be active.
    pub fn add_sensor_edge(
        &self,
        expression_id: ExpressionId,
        sensor_id: SensorId,
        function: &str,
        args: &[String],
    ) -> StoreResult<EdgeId> {
        let sensor = self.get_sensor(sensor_id)?;
        if !sensor.active {
            return Err(StoreError::SensorInactive(sensor_id));
        }
        self.conn.execute(
            "INSERT INTO var_sensors (expression_id, sensor_id, function, args)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                expression_id.as_i64(),
                sensor_id.as_i64(),
                function,
                serde_json::to_string(args)?
            ],
        )?;
        Ok(EdgeId::new(self.conn.last_insert_rowid()))
    }

    /// Insert a trigger dependency edge. Rejected when the expression
    /// belongs to `trigger_id` itself: a trigger never watches its own
    /// output.
    pub fn add_trigger_edge(
        &self,
        expression_id: ExpressionId,
        trigger_id: TriggerId,
        function: &str,
        args: &[String],
    ) -> StoreResult<EdgeId> {
        self.get_trigger(trigger_id)?;
        let owner: Option<i64> = self.query_opt(
            "SELECT id FROM triggers WHERE expression_id = ?1",
            params![expression_id.as_i64()],
            |row| row.get(0),
        )?;
        if owner == Some(trigger_id.as_i64()) {
            return Err(StoreError::SelfReference(trigger_id));
        }
        self.conn.execute(
            "INSERT INTO var_triggers (expression_id, trigger_id, function, args)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                expression_id.as_i64(),
                trigger_id.as_i64(),
                function,
                serde_json::to_string(args)?
            ],
        )?;
        Ok(EdgeId::new(self.conn.last_insert_rowid()))
    }

    pub fn sensor_edges(&self, expression_id: ExpressionId) -> StoreResult<Vec<SensorEdge>> {
        self.query_vec(
            "SELECT id, expression_id, sensor_id, function, args FROM var_sensors
             WHERE expression_id = ?1 ORDER BY id",
            params![expression_id.as_i64()],
            sensor_edge_from_row,
        )
    }

    pub fn trigger_edges(&self, expression_id: ExpressionId) -> StoreResult<Vec<TriggerEdge>> {
        self.query_vec(
            "SELECT id, expression_id, trigger_id, function, args FROM var_triggers
             WHERE expression_id = ?1 ORDER BY id",
            params![expression_id.as_i64()],
            trigger_edge_from_row,
        )
    }

    // Triggers and their history

    pub fn add_trigger(
        &self,
        name: &str,
        expression_id: ExpressionId,
        record: bool,
        descr: Option<&str>,
    ) -> StoreResult<TriggerId> {
        self.conn.execute(
            "INSERT INTO triggers (name, expression_id, record, descr)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, expression_id.as_i64(), record, descr],
        )?;
        let id = TriggerId::new(self.conn.last_insert_rowid());
        debug!(trigger = %name, id = %id, "trigger stored");
        Ok(id)
    }

    pub fn get_trigger(&self, id: TriggerId) -> StoreResult<Trigger> {
        self.query_opt(
            "SELECT id, name, expression_id, record, lastvalue, descr
             FROM triggers WHERE id = ?1",
            params![id.as_i64()],
            trigger_from_row,
        )?
        .ok_or_else(|| StoreError::not_found("trigger", id.as_i64()))
    }

    pub fn list_triggers(&self) -> StoreResult<Vec<Trigger>> {
        self.query_vec(
            "SELECT id, name, expression_id, record, lastvalue, descr
             FROM triggers ORDER BY id",
            [],
            trigger_from_row,
        )
    }

    /// Record the canonical value of the latest recomputation.
    pub fn update_lastvalue(&self, id: TriggerId, value: &str) -> StoreResult<()> {
        let n = self.conn.execute(
            "UPDATE triggers SET lastvalue = ?2 WHERE id = ?1",
            params![id.as_i64(), value],
        )?;
        if n == 0 {
            return Err(StoreError::not_found("trigger", id.as_i64()));
        }
        Ok(())
    }

    pub fn add_trigger_value(
        &self,
        trigger_id: TriggerId,
        value: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO trigger_values (trigger_id, value, timestamp) VALUES (?1, ?2, ?3)",
            params![trigger_id.as_i64(), value, at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn trigger_history(
        &self,
        trigger_id: TriggerId,
        limit: usize,
    ) -> StoreResult<Vec<HistoryRecord>> {
        self.query_vec(
            "SELECT value, timestamp FROM trigger_values WHERE trigger_id = ?1
             ORDER BY timestamp DESC, id DESC LIMIT ?2",
            params![trigger_id.as_i64(), limit as i64],
            history_from_row,
        )
    }

    // Dependency index

    /// Triggers whose expression takes the sensor as an input: one row per
    /// dependent trigger, however many edges its expression has over the
    /// sensor.
    pub fn triggers_watching_sensor(&self, sensor_id: SensorId) -> StoreResult<Vec<Trigger>> {
        self.query_vec(
            "SELECT DISTINCT t.id, t.name, t.expression_id, t.record, t.lastvalue, t.descr
             FROM triggers t
             JOIN var_sensors v ON v.expression_id = t.expression_id
             WHERE v.sensor_id = ?1 ORDER BY t.id",
            params![sensor_id.as_i64()],
            trigger_from_row,
        )
    }

    /// Triggers whose expression takes another trigger as an input. The
    /// source trigger itself is never among the dependents.
    pub fn triggers_watching_trigger(&self, trigger_id: TriggerId) -> StoreResult<Vec<Trigger>> {
        self.query_vec(
            "SELECT DISTINCT t.id, t.name, t.expression_id, t.record, t.lastvalue, t.descr
             FROM triggers t
             JOIN var_triggers v ON v.expression_id = t.expression_id
             WHERE v.trigger_id = ?1 AND t.id != ?1 ORDER BY t.id",
            params![trigger_id.as_i64()],
            trigger_from_row,
        )
    }

    // Actions and trigger bindings

    pub fn add_action(
        &self,
        module_id: ModuleId,
        ident: &str,
        descr: Option<&str>,
    ) -> StoreResult<ActionId> {
        self.get_module(module_id)?;
        self.conn.execute(
            "INSERT INTO actions (module_id, ident, descr) VALUES (?1, ?2, ?3)",
            params![module_id.as_i64(), ident, descr],
        )?;
        Ok(ActionId::new(self.conn.last_insert_rowid()))
    }

    pub fn get_action(&self, id: ActionId) -> StoreResult<Action> {
        self.query_opt(
            "SELECT id, module_id, ident, descr FROM actions WHERE id = ?1",
            params![id.as_i64()],
            action_from_row,
        )?
        .ok_or_else(|| StoreError::not_found("action", id.as_i64()))
    }

    pub fn add_action_arg(
        &self,
        action_id: ActionId,
        rpc_arg_id: RpcArgId,
        expression_id: ExpressionId,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO action_args (action_id, rpc_arg_id, expression_id)
             VALUES (?1, ?2, ?3)",
            params![action_id.as_i64(), rpc_arg_id.as_i64(), expression_id.as_i64()],
        )?;
        Ok(())
    }

    /// Arguments of an action, joined with the RPC argument names they fill.
    pub fn action_args(&self, action_id: ActionId) -> StoreResult<Vec<ActionArg>> {
        self.query_vec(
            "SELECT ra.name, aa.expression_id FROM action_args aa
             JOIN rpc_args ra ON ra.id = aa.rpc_arg_id
             WHERE aa.action_id = ?1 ORDER BY aa.id",
            params![action_id.as_i64()],
            |row| {
                Ok(ActionArg {
                    name: row.get(0)?,
                    expression_id: ExpressionId::new(row.get(1)?),
                })
            },
        )
    }

    pub fn add_trigger_action(
        &self,
        trigger_id: TriggerId,
        action_id: ActionId,
        expression_id: ExpressionId,
    ) -> StoreResult<TriggerActionId> {
        self.conn.execute(
            "INSERT INTO trigger_actions (trigger_id, action_id, expression_id)
             VALUES (?1, ?2, ?3)",
            params![trigger_id.as_i64(), action_id.as_i64(), expression_id.as_i64()],
        )?;
        Ok(TriggerActionId::new(self.conn.last_insert_rowid()))
    }

    /// Action bindings of a trigger, in creation order.
    pub fn actions_for_trigger(&self, trigger_id: TriggerId) -> StoreResult<Vec<TriggerAction>> {
        self.query_vec(
            "SELECT id, trigger_id, action_id, expression_id FROM trigger_actions
             WHERE trigger_id = ?1 ORDER BY id",
            params![trigger_id.as_i64()],
            trigger_action_from_row,
        )
    }

    // Query plumbing

    fn query_vec<T, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        f: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, f)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn query_opt<T, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        f: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Option<T>> {
        match self.conn.query_row(sql, params, f) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn module_from_row(row: &Row<'_>) -> rusqlite::Result<Module> {
    Ok(Module {
        id: ModuleId::new(row.get(0)?),
        name: row.get(1)?,
        queue: row.get(2)?,
        active: row.get(3)?,
        descr: row.get(4)?,
    })
}

fn rpc_from_row(row: &Row<'_>) -> rusqlite::Result<ModuleRpc> {
    let kind: String = row.get(2)?;
    let kind = kind
        .parse::<RpcKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?;
    Ok(ModuleRpc {
        id: RpcId::new(row.get(0)?),
        module_id: ModuleId::new(row.get(1)?),
        kind,
        key: row.get(3)?,
        descr: row.get(4)?,
    })
}

fn rpc_arg_from_row(row: &Row<'_>) -> rusqlite::Result<RpcArg> {
    Ok(RpcArg {
        id: RpcArgId::new(row.get(0)?),
        rpc_id: RpcId::new(row.get(1)?),
        name: row.get(2)?,
        arg_type: row.get(3)?,
        optional: row.get(4)?,
        descr: row.get(5)?,
    })
}

fn sensor_from_row(row: &Row<'_>) -> rusqlite::Result<Sensor> {
    Ok(Sensor {
        id: SensorId::new(row.get(0)?),
        module_id: ModuleId::new(row.get(1)?),
        ident: row.get(2)?,
        active: row.get(3)?,
        instant: row.get(4)?,
        descr: row.get(5)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<SensorListing> {
    Ok(SensorListing {
        sensor: sensor_from_row(row)?,
        module_name: row.get(6)?,
    })
}

fn trigger_from_row(row: &Row<'_>) -> rusqlite::Result<Trigger> {
    Ok(Trigger {
        id: TriggerId::new(row.get(0)?),
        name: row.get(1)?,
        expression_id: ExpressionId::new(row.get(2)?),
        record: row.get(3)?,
        lastvalue: row.get(4)?,
        descr: row.get(5)?,
    })
}

fn action_from_row(row: &Row<'_>) -> rusqlite::Result<Action> {
    Ok(Action {
        id: ActionId::new(row.get(0)?),
        module_id: ModuleId::new(row.get(1)?),
        ident: row.get(2)?,
        descr: row.get(3)?,
    })
}

fn trigger_action_from_row(row: &Row<'_>) -> rusqlite::Result<TriggerAction> {
    Ok(TriggerAction {
        id: TriggerActionId::new(row.get(0)?),
        trigger_id: TriggerId::new(row.get(1)?),
        action_id: ActionId::new(row.get(2)?),
        expression_id: ExpressionId::new(row.get(3)?),
    })
}

fn sensor_edge_from_row(row: &Row<'_>) -> rusqlite::Result<SensorEdge> {
    Ok(SensorEdge {
        id: EdgeId::new(row.get(0)?),
        expression_id: ExpressionId::new(row.get(1)?),
        sensor_id: SensorId::new(row.get(2)?),
        function: row.get(3)?,
        args: edge_args(row, 4)?,
    })
}

fn trigger_edge_from_row(row: &Row<'_>) -> rusqlite::Result<TriggerEdge> {
    Ok(TriggerEdge {
        id: EdgeId::new(row.get(0)?),
        expression_id: ExpressionId::new(row.get(1)?),
        trigger_id: TriggerId::new(row.get(2)?),
        function: row.get(3)?,
        args: edge_args(row, 4)?,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRecord> {
    let raw: String = row.get(1)?;
    let at = DateTime::parse_from_rfc3339(&raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
    Ok(HistoryRecord {
        value: row.get(0)?,
        at,
    })
}

fn edge_args(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
